//! Generators module - business logic for turning a persisted order into
//! filled form documents.
//!
//! The pipeline, leaves first:
//! - `total` - order total from selections and catalog (validation gate)
//! - `mapping` - declarative field tables, one per document type
//! - `writer` - applies a field-value map onto a loaded template
//! - `signature` - decodes and composites the insured person's signature
//! - `assembler` - picks the documents for a request and bundles them

pub mod assembler;
pub mod mapping;
pub mod signature;
pub mod total;
pub mod writer;

pub use assembler::{DocumentAssembler, PdfKind};
pub use mapping::{FieldValue, FieldValueMap};
pub use writer::FormFieldWriter;

use thiserror::Error;

/// Errors that are fatal to a single generation request. Field-level and
/// image-level faults are recovered inside their component and never show
/// up here.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("failed to read template {name}: {source}")]
    TemplateIo {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse template {name}: {source}")]
    TemplateParse {
        name: String,
        #[source]
        source: lopdf::Error,
    },
    #[error("failed to serialize filled document: {0}")]
    PdfSave(#[source] std::io::Error),
    #[error("failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("mapping table does not match template {template}: missing fields {missing:?}")]
    FieldTableMismatch {
        template: String,
        missing: Vec<String>,
    },
}

/// Result of a successful document generation.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}
