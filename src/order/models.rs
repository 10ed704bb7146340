use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One line of an order: a catalog product id, a purchase quantity and an
/// optional size variant (only meaningful for size-capable products).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSelection {
    #[schema(example = "pads")]
    pub product_id: String,
    #[schema(example = 1)]
    pub quantity: u32,
    /// Size variant, e.g. "S", "M", "L", "XL" for gloves.
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerInfo {
    #[schema(example = "2")]
    pub pflegegrad: String,
    #[schema(example = "Frau")]
    pub anrede: String,
    #[serde(default)]
    pub titel: Option<String>,
    #[schema(example = "Erika")]
    pub vorname: String,
    #[schema(example = "Mustermann")]
    pub nachname: String,
    pub strasse: String,
    pub hausnr: String,
    #[serde(default)]
    pub adresszusatz: Option<String>,
    pub plz: String,
    pub stadt: String,
    /// Birth date as DD.MM.YYYY, taken over verbatim into the forms.
    #[schema(example = "01.02.1950")]
    pub geburtsdatum: String,
    #[serde(default)]
    pub abweichende_adresse: Option<String>,
    #[serde(default)]
    pub hinweis: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InsuranceInfo {
    /// "gesetzlich" or "privat".
    #[schema(example = "gesetzlich")]
    pub versicherungsart: String,
    #[serde(default)]
    pub beihilfe: bool,
    #[serde(default)]
    pub beihilfe_prozent: Option<String>,
    #[schema(example = "AOK Nordost")]
    pub krankenkasse: String,
    pub versichertennummer: String,
    #[serde(default)]
    pub telefon: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the customer already receives care supplies from another
    /// provider. Controls whether the switch declaration is generated.
    #[serde(default)]
    pub bezieht_bereits: bool,
    #[serde(default)]
    pub bemerkung: Option<String>,
    pub consent1: bool,
    pub consent2: bool,
    /// Base64-encoded PNG of the insured person's signature, optionally
    /// carrying a data-URI prefix. Required.
    pub signature_insured: String,
    #[serde(default)]
    pub signature_care: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderCreate {
    pub products: Vec<ProductSelection>,
    pub customer: CustomerInfo,
    pub insurance: InsuranceInfo,
    /// Extra washable bed pads on top of the regular selection.
    #[serde(default)]
    pub extra_washable: u32,
}

/// A persisted order. Created exactly once and immutable thereafter;
/// `total` is computed server-side at creation and never re-derived from
/// client-supplied values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    #[schema(example = "f1e2d3c4-b5a6-7890-1234-567890abcdef")]
    pub id: Uuid,
    pub products: Vec<ProductSelection>,
    pub customer: CustomerInfo,
    pub insurance: InsuranceInfo,
    #[serde(default)]
    pub extra_washable: u32,
    #[schema(example = 33.65)]
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(create: OrderCreate, total: f64) -> Self {
        Order {
            id: Uuid::new_v4(),
            products: create.products,
            customer: create.customer,
            insurance: create.insurance,
            extra_washable: create.extra_washable,
            total,
            created_at: Utc::now(),
        }
    }

    /// First eight characters of the order id, used as a short reference
    /// code on the order form and in download filenames.
    pub fn short_id(&self) -> String {
        self.id.to_string().chars().take(8).collect()
    }
}
