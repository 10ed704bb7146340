//! Static product catalog.
//!
//! The catalog is a fixed table of care-supply products, loaded once at
//! process start and handed to the generators by reference. There is no
//! mutation path after startup.

use serde::Serialize;
use utoipa::ToSchema;

/// Monthly budget limit in euro. Orders above this are rejected at creation.
pub const BUDGET_LIMIT: f64 = 42.00;

/// A single catalog entry. `factor` converts one purchased unit into the
/// billing unit printed on the application form (e.g. one pack of 50 pads
/// is billed as 50 pieces).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    #[schema(example = "pads")]
    pub id: &'static str,
    #[schema(example = "Bettschutzeinlagen")]
    pub name: &'static str,
    pub meta: &'static str,
    #[schema(example = 24.40)]
    pub price: f64,
    pub factor: u32,
    #[serde(rename = "pos")]
    #[schema(example = "54.45.01.0001")]
    pub position_code: &'static str,
    pub unit: &'static str,
    #[serde(rename = "hasSize", skip_serializing_if = "std::ops::Not::not")]
    pub has_size: bool,
}

const PRODUCTS: &[Product] = &[
    Product { id: "pads", name: "Bettschutzeinlagen", meta: "Einmalgebrauch", price: 24.40, factor: 50, position_code: "54.45.01.0001", unit: "1 Stück", has_size: false },
    Product { id: "fingerlings", name: "Fingerlinge", meta: "unsteril", price: 5.95, factor: 100, position_code: "54.99.01.0001", unit: "1 Stück", has_size: false },
    Product { id: "gloves", name: "Einmalhandschuhe", meta: "100 Stk", price: 9.25, factor: 100, position_code: "54.99.01.1001", unit: "1 Stück", has_size: true },
    Product { id: "medMasks", name: "Medizinische Gesichtsmasken", meta: "50 Stk", price: 4.99, factor: 100, position_code: "54.99.01.2001", unit: "1 Stück", has_size: false },
    Product { id: "ffp2", name: "FFP2-Masken", meta: "10 Stk", price: 4.99, factor: 100, position_code: "54.99.01.5001", unit: "1 Stück", has_size: false },
    Product { id: "aprons", name: "Schutzschürzen", meta: "Einmalgebrauch", price: 14.28, factor: 100, position_code: "54.99.01.3001", unit: "1 Stück", has_size: false },
    Product { id: "apronsReusable", name: "Schutzschürzen", meta: "wiederverwendbar", price: 25.60, factor: 1, position_code: "54.99.01.3002", unit: "1 Stück", has_size: false },
    Product { id: "serviettes", name: "Schutzservietten", meta: "Einmalgebrauch", price: 14.28, factor: 100, position_code: "54.99.01.4001", unit: "1 Stück", has_size: false },
    Product { id: "handdes", name: "Händedesinfektionsmittel", meta: "500 ml", price: 7.14, factor: 5, position_code: "54.99.02.0001", unit: "100 ml", has_size: false },
    Product { id: "surfacedes", name: "Flächendesinfektionsmittel", meta: "500 ml", price: 6.79, factor: 5, position_code: "54.99.02.0002", unit: "100 ml", has_size: false },
    Product { id: "hand_wipes", name: "Händedesinfektionstücher", meta: "80-100 Stk", price: 7.14, factor: 60, position_code: "54.99.02.0014", unit: "1 Stück", has_size: false },
    Product { id: "surface_wipes", name: "Flächendesinfektionstücher", meta: "80-100 Stk", price: 9.52, factor: 80, position_code: "54.99.02.0015", unit: "1 Stück", has_size: false },
];

/// Read-only view over the product table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    pub fn new() -> Self {
        Catalog
    }

    pub fn get(&self, product_id: &str) -> Option<&'static Product> {
        PRODUCTS.iter().find(|p| p.id == product_id)
    }

    pub fn products(&self) -> &'static [Product] {
        PRODUCTS
    }
}
