//! Order persistence behind a trait so the HTTP layer never depends on a
//! concrete backend, plus the shared application state handed to every
//! handler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::generators::{DocumentAssembler, GeneratorError};
use crate::order::models::Order;
use crate::settings::Settings;
use crate::templates::TemplateSet;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order);
    async fn get(&self, id: Uuid) -> Option<Order>;
}

/// Process-local store. Orders are short-lived working data for document
/// generation, not records of business; losing them on restart is fine.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) {
        self.orders.write().insert(order.id, order);
    }

    async fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.read().get(&id).cloned()
    }
}

pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub assembler: DocumentAssembler,
    pub catalog: Catalog,
    pub settings: Settings,
}

impl AppState {
    /// Load the templates from disk and build the shared state. Fails when
    /// a template is unreadable, unparsable, or (in strict mode) does not
    /// carry the fields the mapping tables expect.
    pub fn new(settings: Settings) -> Result<Self, GeneratorError> {
        let templates = Arc::new(TemplateSet::load(&settings.template_dir)?);
        if settings.strict_template_fields {
            templates.validate_mapping_tables()?;
        }
        Ok(Self::with_templates(settings, templates))
    }

    pub fn with_templates(settings: Settings, templates: Arc<TemplateSet>) -> Self {
        AppState {
            store: Arc::new(InMemoryOrderStore::new()),
            assembler: DocumentAssembler::new(templates),
            catalog: Catalog::new(),
            settings,
        }
    }
}
