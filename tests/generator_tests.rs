//! End-to-end generation tests against synthetic templates.

mod common;

use std::io::Cursor;

use chrono::NaiveDate;
use lopdf::{Dictionary, Document, Object};

use common::{build_form, sample_order, selection, template_set, PageFields};
use pflegebox_server::generators::{DocumentAssembler, GeneratorError, PdfKind};
use pflegebox_server::templates::{Template, TemplateKind, TemplateSet};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assembler() -> DocumentAssembler {
    DocumentAssembler::new(template_set())
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Root field dictionary with the given name, if present.
fn field_dict<'a>(doc: &'a Document, name: &str) -> Option<&'a Dictionary> {
    let root_id = doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
    let catalog = doc.get_object(root_id).ok()?.as_dict().ok()?;
    let form = resolve_dict(doc, catalog.get(b"AcroForm").ok()?)?;
    let fields = match form.get(b"Fields").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        Object::Array(items) => items,
        _ => return None,
    };
    fields
        .iter()
        .filter_map(|entry| resolve_dict(doc, entry))
        .find(|dict| {
            dict.get(b"T")
                .ok()
                .and_then(|o| o.as_str().ok())
                .map(|bytes| bytes == name.as_bytes())
                .unwrap_or(false)
        })
}

/// Decoded /V of a text field, handling both literal and UTF-16BE values.
fn text_value(doc: &Document, name: &str) -> Option<String> {
    match field_dict(doc, name)?.get(b"V").ok()? {
        Object::String(bytes, _) => {
            if bytes.starts_with(&[0xFE, 0xFF]) {
                let units: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            } else {
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
        }
        _ => None,
    }
}

fn page_xobject_names(doc: &Document, page_number: u32) -> Vec<String> {
    let Some(&page_id) = doc.get_pages().get(&page_number) else {
        return vec![];
    };
    let Some(page) = doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok()) else {
        return vec![];
    };
    let Some(resources) = page.get(b"Resources").ok().and_then(|o| resolve_dict(doc, o))
    else {
        return vec![];
    };
    let Some(xobjects) = resources.get(b"XObject").ok().and_then(|o| resolve_dict(doc, o))
    else {
        return vec![];
    };
    xobjects
        .iter()
        .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
        .collect()
}

#[test]
fn test_main_document_fills_removes_and_signs() {
    let order = sample_order(vec![selection("pads", 1, None)], 24.40);
    let doc = assembler()
        .generate_on(&order, PdfKind::Main, date(2024, 6, 15))
        .unwrap();
    assert_eq!(
        doc.filename,
        format!("Anlage2_Antrag_Mustermann_{}.pdf", order.short_id())
    );
    assert_eq!(doc.media_type, "application/pdf");

    let pdf = Document::load_mem(&doc.bytes).unwrap();
    assert_eq!(
        text_value(&pdf, "name_vorname").as_deref(),
        Some("Mustermann, Erika")
    );
    assert_eq!(text_value(&pdf, "qty_1").as_deref(), Some("50"));
    assert_eq!(text_value(&pdf, "mitarbeiter").as_deref(), Some("Marina Bittner"));
    assert_eq!(text_value(&pdf, "ik_nr").as_deref(), Some("330522443"));
    assert_eq!(
        field_dict(&pdf, "chk_pg54").unwrap().get(b"V").unwrap(),
        &Object::Name(b"Yes".to_vec())
    );
    // provider field removed before filling
    assert!(field_dict(&pdf, "leistungserbringer_name_addr").is_none());
    // signature composited onto the page carrying the placeholder
    assert!(page_xobject_names(&pdf, 2).contains(&"PbSig".to_string()));
}

#[test]
fn test_main_document_survives_unusable_signature() {
    let mut order = sample_order(vec![selection("pads", 1, None)], 24.40);
    order.insurance.signature_insured = "%%%not-base64%%%".into();
    let doc = assembler()
        .generate_on(&order, PdfKind::Main, date(2024, 6, 15))
        .unwrap();

    let pdf = Document::load_mem(&doc.bytes).unwrap();
    // still filled, just unsigned
    assert!(text_value(&pdf, "name_vorname").is_some());
    assert!(!page_xobject_names(&pdf, 2).contains(&"PbSig".to_string()));
}

#[test]
fn test_beihilfe_checkbox_only_when_flagged() {
    let mut order = sample_order(vec![], 0.0);
    order.insurance.beihilfe = true;
    let doc = assembler()
        .generate_on(&order, PdfKind::Main, date(2024, 6, 15))
        .unwrap();
    let pdf = Document::load_mem(&doc.bytes).unwrap();
    assert_eq!(
        field_dict(&pdf, "genehm_pg54_beihilfe").unwrap().get(b"V").ok(),
        Some(&Object::Name(b"Yes".to_vec()))
    );

    let order = sample_order(vec![], 0.0);
    let doc = assembler()
        .generate_on(&order, PdfKind::Main, date(2024, 6, 15))
        .unwrap();
    let pdf = Document::load_mem(&doc.bytes).unwrap();
    // the field exists in the template but carries no value
    assert!(field_dict(&pdf, "genehm_pg54_beihilfe")
        .unwrap()
        .get(b"V")
        .is_err());
}

#[test]
fn test_order_form_rows_and_header() {
    let order = sample_order(
        vec![
            selection("handdes", 2, None),
            selection("gloves", 1, Some("L")),
        ],
        33.53,
    );
    let doc = assembler()
        .generate_on(&order, PdfKind::OrderForm, date(2024, 6, 15))
        .unwrap();
    assert_eq!(
        doc.filename,
        format!("Bestellformular_Mustermann_{}.pdf", order.short_id())
    );

    let pdf = Document::load_mem(&doc.bytes).unwrap();
    assert_eq!(text_value(&pdf, "K_NAME").as_deref(), Some("Erika Mustermann"));
    assert_eq!(text_value(&pdf, "DATUM").as_deref(), Some("15.06.2024"));
    assert_eq!(
        text_value(&pdf, "LS_NR"),
        Some(order.short_id().to_uppercase())
    );
    assert_eq!(text_value(&pdf, "POS_01").as_deref(), Some("1"));
    assert_eq!(text_value(&pdf, "PN_01").as_deref(), Some("54.99.02.0001"));
    assert_eq!(text_value(&pdf, "MENGE_01").as_deref(), Some("2"));
    assert_eq!(
        text_value(&pdf, "BEZ_02").as_deref(),
        Some("Einmalhandschuhe (Gr. L)")
    );
    assert!(text_value(&pdf, "POS_03").is_none());
}

#[test]
fn test_switch_document_dates() {
    let mut order = sample_order(vec![], 0.0);
    order.insurance.bezieht_bereits = true;
    let doc = assembler()
        .generate_on(&order, PdfKind::Switch, date(2024, 12, 15))
        .unwrap();
    assert_eq!(
        doc.filename,
        format!("Wechselerklaerung_Mustermann_{}.pdf", order.short_id())
    );

    let pdf = Document::load_mem(&doc.bytes).unwrap();
    assert_eq!(
        text_value(&pdf, "txt_versorgungsbeginn_ab").as_deref(),
        Some("01.01.2025")
    );
    assert_eq!(
        text_value(&pdf, "txt_ort_datum").as_deref(),
        Some("Berlin, 15.12.2024")
    );
}

#[test]
fn test_bundle_without_switch_declaration() {
    let order = sample_order(vec![selection("pads", 1, None)], 24.40);
    let doc = assembler()
        .generate_on(&order, PdfKind::All, date(2024, 6, 15))
        .unwrap();
    assert_eq!(doc.media_type, "application/zip");
    assert_eq!(
        doc.filename,
        format!("Marina_Pflegebox_Mustermann_{}.zip", order.short_id())
    );

    let mut archive = zip::ZipArchive::new(Cursor::new(doc.bytes)).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "Anlage2_Antrag_Mustermann.pdf".to_string(),
            "Bestellformular_Mustermann.pdf".to_string(),
        ]
    );
}

#[test]
fn test_bundle_includes_switch_declaration_when_switching() {
    let mut order = sample_order(vec![selection("pads", 1, None)], 24.40);
    order.insurance.bezieht_bereits = true;
    let doc = assembler()
        .generate_on(&order, PdfKind::All, date(2024, 6, 15))
        .unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(doc.bytes)).unwrap();
    assert_eq!(archive.len(), 3);
    let mut entry = archive.by_name("Wechselerklaerung_Mustermann.pdf").unwrap();
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut entry, &mut bytes).unwrap();
    assert!(Document::load_mem(&bytes).is_ok());
}

#[test]
fn test_mapping_tables_match_synthetic_templates() {
    assert!(template_set().validate_mapping_tables().is_ok());
}

#[test]
fn test_strict_check_reports_missing_fields() {
    // A switch template that forgot one field.
    let bytes = build_form(&[PageFields {
        text: vec![
            "txt_name".into(),
            "txt_vorname".into(),
            "txt_geburtsdatum".into(),
            "txt_versichertennummer".into(),
            "txt_pflegekasse".into(),
            "txt_versorgungsbeginn_ab".into(),
        ],
        checkbox: vec![],
    }]);
    let incomplete =
        Template::from_bytes(TemplateKind::Switch, "wechsel.pdf".into(), bytes).unwrap();
    let set = TemplateSet {
        main: common::main_template(),
        order_form: common::order_form_template(),
        switch: incomplete,
    };
    match set.validate_mapping_tables() {
        Err(GeneratorError::FieldTableMismatch { template, missing }) => {
            assert_eq!(template, "wechsel.pdf");
            assert_eq!(missing, vec!["txt_ort_datum".to_string()]);
        }
        other => panic!("expected field table mismatch, got {other:?}"),
    }
}
