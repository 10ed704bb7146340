//! Order intake: request/response models, validation and HTTP handlers.

pub mod handlers;
pub mod models;
pub mod validation;
