//! Declarative field-mapping tables, one per document type.
//!
//! Every field name a generated document can carry is declared here, never
//! discovered from a template at request time. The tables are versioned so
//! that a template revision can be tied to the table revision it was
//! authored against.
//!
//! Output is always a pure field-value map; malformed or unmapped inputs
//! produce fewer entries, never errors.

use chrono::{Datelike, NaiveDate};

use crate::catalog::{Catalog, Product};
use crate::order::models::{Order, ProductSelection};

/// Revision of the tables below. Bump together with template revisions.
pub const MAPPING_VERSION: u32 = 1;

/// Value to be written into a single template field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// Sentinel for checkbox-like fields; the writer resolves the widget's
    /// actual on-state name.
    Checked,
}

/// Ordered field-name → value map for one (order, document type) pair.
pub type FieldValueMap = Vec<(String, FieldValue)>;

/// Mapping result for documents that can drop rows.
#[derive(Debug)]
pub struct MappingOutcome {
    pub fields: FieldValueMap,
    /// Selections that did not fit the row limit. Surfaced so callers can
    /// warn instead of truncating silently.
    pub dropped_rows: usize,
}

/// The main application form duplicates the provider block as static page
/// text; this field's visual background would print it twice, so the field
/// is removed before filling.
pub const REMOVED_MAIN_FIELD: &str = "leistungserbringer_name_addr";

/// Placeholder widget marking where the insured person's signature is
/// composited onto the main document.
pub const SIGNATURE_FIELD: &str = "Image1";

/// The order form has twelve printed rows; anything beyond is dropped.
pub const MAX_ORDER_ROWS: usize = 12;

const PROVIDER_EMPLOYEE: &str = "Marina Bittner";
const PROVIDER_IK_NUMBER: &str = "330522443";

/// Product id → quantity field on the main form. `qty6` without the
/// underscore is a quirk of the hand-authored template, not a typo here.
const MAIN_QUANTITY_FIELDS: &[(&str, &str)] = &[
    ("pads", "qty_1"),
    ("fingerlings", "qty_2"),
    ("gloves", "qty_3"),
    ("medMasks", "qty_4"),
    ("ffp2", "qty_5"),
    ("aprons", "qty6"),
    ("apronsReusable", "qty_7"),
    ("serviettes", "qty_8"),
    ("handdes", "qty_9"),
    ("surfacedes", "qty_10"),
    ("hand_wipes", "qty_11"),
    ("surface_wipes", "qty_12"),
];

/// Approval and consultation checkboxes that are always affirmed on
/// generation; the workflow reaching this pipeline is pre-approved.
const MAIN_CHECKED_FIELDS: &[&str] = &[
    "chk_pg54",
    "chk_beratung_bestaetigt",
    "chk_form_1",
    "chk_form_2",
    "chk_beraten_1",
    "chk_beraten_2",
    "chk_bestaetigung_1",
    "chk_bestaetigung_2",
    "genehm_pg54",
];

const MAIN_BEIHILFE_FIELD: &str = "genehm_pg54_beihilfe";

const MAIN_IDENTITY_FIELDS: &[&str] = &[
    "name_vorname",
    "geb_1",
    "anschrift",
    "pflegekasse",
    "ver_nr",
    "mitarbeiter",
    "ik_nr",
    "datum_beratung",
    "datum_unterschrift",
];

const ORDER_FORM_HEADER_FIELDS: &[&str] =
    &["K_NAME", "K_STRASSE", "K_ORT", "DATUM", "LS_NR", "KUNDEN_NR"];

const SWITCH_FIELDS: &[&str] = &[
    "txt_name",
    "txt_vorname",
    "txt_geburtsdatum",
    "txt_versichertennummer",
    "txt_pflegekasse",
    "txt_versorgungsbeginn_ab",
    "txt_ort_datum",
];

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Size suffix for a size-capable product with a supplied size variant.
fn size_suffix(selection: &ProductSelection, product: &Product) -> Option<String> {
    if !product.has_size {
        return None;
    }
    selection
        .size
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!(" (Gr. {s})"))
}

/// First calendar day of the month following `today`, rolling December
/// into January of the next year.
pub fn coverage_start(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

/// Field map for the main application form (Anlage 2).
pub fn main_form_fields(order: &Order, catalog: &Catalog, today: NaiveDate) -> FieldValueMap {
    let customer = &order.customer;
    let insurance = &order.insurance;
    let mut fields = FieldValueMap::new();

    let full_name = format!("{}, {}", customer.nachname, customer.vorname);
    let full_address = match customer.adresszusatz.as_deref().filter(|z| !z.trim().is_empty()) {
        Some(zusatz) => format!(
            "{} {}, {}, {} {}",
            customer.strasse, customer.hausnr, zusatz, customer.plz, customer.stadt
        ),
        None => format!(
            "{} {}, {} {}",
            customer.strasse, customer.hausnr, customer.plz, customer.stadt
        ),
    };

    fields.push(("name_vorname".into(), FieldValue::Text(full_name)));
    fields.push(("geb_1".into(), FieldValue::Text(customer.geburtsdatum.clone())));
    fields.push(("anschrift".into(), FieldValue::Text(full_address)));
    fields.push(("pflegekasse".into(), FieldValue::Text(insurance.krankenkasse.clone())));
    fields.push(("ver_nr".into(), FieldValue::Text(insurance.versichertennummer.clone())));

    for selection in &order.products {
        if selection.quantity == 0 {
            continue;
        }
        let Some(product) = catalog.get(&selection.product_id) else {
            continue;
        };
        let Some(&(_, field_name)) = MAIN_QUANTITY_FIELDS
            .iter()
            .find(|(id, _)| *id == product.id)
        else {
            continue;
        };
        // The template bills in packaging units, not purchase units.
        let mut value = (u64::from(selection.quantity) * u64::from(product.factor)).to_string();
        if let Some(suffix) = size_suffix(selection, product) {
            value.push_str(&suffix);
        }
        fields.push((field_name.to_string(), FieldValue::Text(value)));
    }

    let date = format_date(today);
    fields.push(("mitarbeiter".into(), FieldValue::Text(PROVIDER_EMPLOYEE.into())));
    fields.push(("ik_nr".into(), FieldValue::Text(PROVIDER_IK_NUMBER.into())));
    fields.push(("datum_beratung".into(), FieldValue::Text(date.clone())));
    fields.push(("datum_unterschrift".into(), FieldValue::Text(date)));

    for name in MAIN_CHECKED_FIELDS {
        fields.push(((*name).into(), FieldValue::Checked));
    }
    if insurance.beihilfe {
        fields.push((MAIN_BEIHILFE_FIELD.into(), FieldValue::Checked));
    }

    fields
}

/// Field map for the order form: header plus up to twelve numbered rows,
/// in the relative order of the non-zero selections.
pub fn order_form_fields(order: &Order, catalog: &Catalog, today: NaiveDate) -> MappingOutcome {
    let customer = &order.customer;
    let mut fields = FieldValueMap::new();

    fields.push((
        "K_NAME".into(),
        FieldValue::Text(format!("{} {}", customer.vorname, customer.nachname)),
    ));
    fields.push((
        "K_STRASSE".into(),
        FieldValue::Text(format!("{} {}", customer.strasse, customer.hausnr)),
    ));
    fields.push((
        "K_ORT".into(),
        FieldValue::Text(format!("{} {}", customer.plz, customer.stadt)),
    ));
    fields.push(("DATUM".into(), FieldValue::Text(format_date(today))));
    fields.push((
        "LS_NR".into(),
        FieldValue::Text(order.short_id().to_uppercase()),
    ));
    fields.push((
        "KUNDEN_NR".into(),
        FieldValue::Text(order.insurance.versichertennummer.clone()),
    ));

    let mut row = 1usize;
    let mut dropped_rows = 0usize;
    for selection in &order.products {
        if selection.quantity == 0 {
            continue;
        }
        let Some(product) = catalog.get(&selection.product_id) else {
            continue;
        };
        if row > MAX_ORDER_ROWS {
            dropped_rows += 1;
            continue;
        }

        fields.push((format!("POS_{row:02}"), FieldValue::Text(row.to_string())));
        fields.push((
            format!("PN_{row:02}"),
            FieldValue::Text(product.position_code.to_string()),
        ));
        fields.push((
            format!("MENGE_{row:02}"),
            FieldValue::Text(selection.quantity.to_string()),
        ));
        let mut description = product.name.to_string();
        if let Some(suffix) = size_suffix(selection, product) {
            description.push_str(&suffix);
        }
        fields.push((format!("BEZ_{row:02}"), FieldValue::Text(description)));
        row += 1;
    }

    MappingOutcome {
        fields,
        dropped_rows,
    }
}

/// Field map for the switch declaration.
pub fn switch_form_fields(order: &Order, today: NaiveDate) -> FieldValueMap {
    let customer = &order.customer;
    let insurance = &order.insurance;
    let mut fields = FieldValueMap::new();

    fields.push(("txt_name".into(), FieldValue::Text(customer.nachname.clone())));
    fields.push(("txt_vorname".into(), FieldValue::Text(customer.vorname.clone())));
    fields.push((
        "txt_geburtsdatum".into(),
        FieldValue::Text(customer.geburtsdatum.clone()),
    ));
    fields.push((
        "txt_versichertennummer".into(),
        FieldValue::Text(insurance.versichertennummer.clone()),
    ));
    fields.push((
        "txt_pflegekasse".into(),
        FieldValue::Text(insurance.krankenkasse.clone()),
    ));
    fields.push((
        "txt_versorgungsbeginn_ab".into(),
        FieldValue::Text(format_date(coverage_start(today))),
    ));
    fields.push((
        "txt_ort_datum".into(),
        FieldValue::Text(format!("{}, {}", customer.stadt, format_date(today))),
    ));

    fields
}

/// Every field name the table for a document type can emit. Used by the
/// strict startup check against a template's actual field set.
pub fn declared_main_fields() -> Vec<String> {
    let mut names: Vec<String> = MAIN_IDENTITY_FIELDS.iter().map(|s| s.to_string()).collect();
    names.extend(MAIN_QUANTITY_FIELDS.iter().map(|(_, f)| f.to_string()));
    names.extend(MAIN_CHECKED_FIELDS.iter().map(|s| s.to_string()));
    names.push(MAIN_BEIHILFE_FIELD.to_string());
    names
}

pub fn declared_order_form_fields() -> Vec<String> {
    let mut names: Vec<String> = ORDER_FORM_HEADER_FIELDS
        .iter()
        .map(|s| s.to_string())
        .collect();
    for row in 1..=MAX_ORDER_ROWS {
        names.push(format!("POS_{row:02}"));
        names.push(format!("PN_{row:02}"));
        names.push(format!("MENGE_{row:02}"));
        names.push(format!("BEZ_{row:02}"));
    }
    names
}

pub fn declared_switch_fields() -> Vec<String> {
    SWITCH_FIELDS.iter().map(|s| s.to_string()).collect()
}
