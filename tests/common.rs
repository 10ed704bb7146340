//! Shared helpers: synthetic AcroForm templates and sample orders.
//!
//! The real templates are licensed government forms and are not shipped
//! with the repository, so the tests build structurally equivalent PDFs
//! with the same field names.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object};

use pflegebox_server::order::models::{
    CustomerInfo, InsuranceInfo, Order, OrderCreate, ProductSelection,
};
use pflegebox_server::templates::{Template, TemplateKind, TemplateSet};

#[derive(Default)]
pub struct PageFields {
    pub text: Vec<String>,
    pub checkbox: Vec<String>,
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Build a multi-page AcroForm PDF carrying the given widgets. Every
/// widget doubles as a root field entry, like the hand-authored forms.
pub fn build_form(pages: &[PageFields]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let mut all_fields = Vec::new();
    let mut page_ids = Vec::new();

    for page in pages {
        let mut annots = Vec::new();
        let mut y = 800.0f32;
        for name in &page.text {
            let id = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "T" => Object::string_literal(name.as_str()),
                "Rect" => vec![
                    50.0f32.into(), y.into(), 250.0f32.into(), (y + 20.0).into(),
                ],
            });
            annots.push(Object::Reference(id));
            y -= 25.0;
        }
        for name in &page.checkbox {
            let id = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Btn",
                "T" => Object::string_literal(name.as_str()),
                "Rect" => vec![
                    300.0f32.into(), y.into(), 312.0f32.into(), (y + 12.0).into(),
                ],
                "AP" => dictionary! {
                    "N" => dictionary! {
                        "Yes" => Object::Null,
                        "Off" => Object::Null,
                    },
                },
            });
            annots.push(Object::Reference(id));
            y -= 18.0;
        }
        all_fields.extend(annots.clone());

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Annots" => Object::Array(annots),
        });
        page_ids.push(page_id);
    }

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().copied().map(Object::Reference).collect::<Vec<_>>(),
        "Count" => page_ids.len() as i64,
    });
    for page_id in &page_ids {
        if let Ok(page) = doc.get_object_mut(*page_id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let form_id = doc.add_object(dictionary! {
        "Fields" => Object::Array(all_fields),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(form_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Two-page main application form with the full field complement,
/// including the removed provider field and the signature placeholder.
pub fn main_template() -> Template {
    let page1 = PageFields {
        text: strings(&[
            "name_vorname",
            "geb_1",
            "anschrift",
            "pflegekasse",
            "ver_nr",
            "qty_1",
            "qty_2",
            "qty_3",
            "qty_4",
            "qty_5",
            "qty6",
            "qty_7",
            "qty_8",
            "qty_9",
            "qty_10",
            "qty_11",
            "qty_12",
            "leistungserbringer_name_addr",
        ]),
        checkbox: strings(&["chk_pg54"]),
    };
    let page2 = PageFields {
        text: strings(&[
            "mitarbeiter",
            "ik_nr",
            "datum_beratung",
            "datum_unterschrift",
            "Image1",
        ]),
        checkbox: strings(&[
            "chk_beratung_bestaetigt",
            "chk_form_1",
            "chk_form_2",
            "chk_beraten_1",
            "chk_beraten_2",
            "chk_bestaetigung_1",
            "chk_bestaetigung_2",
            "genehm_pg54",
            "genehm_pg54_beihilfe",
        ]),
    };
    let bytes = build_form(&[page1, page2]);
    Template::from_bytes(TemplateKind::Main, "richtige-pdf.pdf".into(), bytes).unwrap()
}

pub fn order_form_template() -> Template {
    let mut text = strings(&["K_NAME", "K_STRASSE", "K_ORT", "DATUM", "LS_NR", "KUNDEN_NR"]);
    for row in 1..=12 {
        text.push(format!("POS_{row:02}"));
        text.push(format!("PN_{row:02}"));
        text.push(format!("MENGE_{row:02}"));
        text.push(format!("BEZ_{row:02}"));
    }
    let bytes = build_form(&[PageFields {
        text,
        checkbox: vec![],
    }]);
    Template::from_bytes(TemplateKind::OrderForm, "bestellformular.pdf".into(), bytes).unwrap()
}

pub fn switch_template() -> Template {
    let bytes = build_form(&[PageFields {
        text: strings(&[
            "txt_name",
            "txt_vorname",
            "txt_geburtsdatum",
            "txt_versichertennummer",
            "txt_pflegekasse",
            "txt_versorgungsbeginn_ab",
            "txt_ort_datum",
        ]),
        checkbox: vec![],
    }]);
    Template::from_bytes(TemplateKind::Switch, "wechsel.pdf".into(), bytes).unwrap()
}

pub fn template_set() -> Arc<TemplateSet> {
    Arc::new(TemplateSet {
        main: main_template(),
        order_form: order_form_template(),
        switch: switch_template(),
    })
}

/// A small hand-drawn stroke on a transparent background, as a canvas
/// export would deliver it.
pub fn signature_png_base64() -> String {
    let mut image = RgbaImage::from_pixel(60, 20, Rgba([0, 0, 0, 0]));
    for x in 10..50 {
        image.put_pixel(x, 10, Rgba([20, 20, 60, 255]));
    }
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", BASE64.encode(&bytes))
}

pub fn selection(product_id: &str, quantity: u32, size: Option<&str>) -> ProductSelection {
    ProductSelection {
        product_id: product_id.into(),
        quantity,
        size: size.map(String::from),
    }
}

pub fn sample_order_create(products: Vec<ProductSelection>) -> OrderCreate {
    OrderCreate {
        products,
        customer: CustomerInfo {
            pflegegrad: "3".into(),
            anrede: "Frau".into(),
            titel: None,
            vorname: "Erika".into(),
            nachname: "Mustermann".into(),
            strasse: "Musterstraße".into(),
            hausnr: "12".into(),
            adresszusatz: None,
            plz: "10115".into(),
            stadt: "Berlin".into(),
            geburtsdatum: "01.02.1950".into(),
            abweichende_adresse: None,
            hinweis: None,
        },
        insurance: InsuranceInfo {
            versicherungsart: "gesetzlich".into(),
            beihilfe: false,
            beihilfe_prozent: None,
            krankenkasse: "AOK Nordost".into(),
            versichertennummer: "A123456789".into(),
            telefon: None,
            email: None,
            bezieht_bereits: false,
            bemerkung: None,
            consent1: true,
            consent2: true,
            signature_insured: signature_png_base64(),
            signature_care: None,
        },
        extra_washable: 0,
    }
}

pub fn sample_order(products: Vec<ProductSelection>, total: f64) -> Order {
    Order::new(sample_order_create(products), total)
}
