//! The three form templates, loaded once at startup.
//!
//! A template is read-only source material: its bytes, the set of field
//! names it actually declares, and the geometry of the signature
//! placeholder widget. Generation opens a fresh editable copy per request,
//! so nothing here is ever mutated after load.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use lopdf::{Document, Object};

use crate::generators::mapping;
use crate::generators::writer::collect_fields;
use crate::generators::GeneratorError;

pub const MAIN_TEMPLATE_FILE: &str = "richtige-pdf.pdf";
pub const ORDER_FORM_TEMPLATE_FILE: &str = "bestellformular.pdf";
pub const SWITCH_TEMPLATE_FILE: &str = "wechsel.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Main,
    OrderForm,
    Switch,
}

/// Page-relative geometry of the signature placeholder widget.
#[derive(Debug, Clone)]
pub struct SignatureAnchor {
    /// 1-based page number the widget sits on.
    pub page_number: u32,
    /// Widget rect as [x1, y1, x2, y2] in PDF points.
    pub rect: [f32; 4],
}

pub struct Template {
    pub kind: TemplateKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Field names the template actually declares, discovered once here.
    pub field_names: HashSet<String>,
    /// Present only on the main template, and only if the placeholder
    /// widget exists.
    pub signature_anchor: Option<SignatureAnchor>,
}

impl Template {
    pub fn from_bytes(
        kind: TemplateKind,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<Self, GeneratorError> {
        let doc = Document::load_mem(&bytes).map_err(|e| GeneratorError::TemplateParse {
            name: file_name.clone(),
            source: e,
        })?;
        let field_names = collect_fields(&doc)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let signature_anchor = match kind {
            TemplateKind::Main => find_widget_anchor(&doc, mapping::SIGNATURE_FIELD),
            _ => None,
        };
        Ok(Template {
            kind,
            file_name,
            bytes,
            field_names,
            signature_anchor,
        })
    }

    fn load(kind: TemplateKind, dir: &Path, file_name: &str) -> Result<Self, GeneratorError> {
        let path = dir.join(file_name);
        let bytes = fs::read(&path).map_err(|e| GeneratorError::TemplateIo {
            name: path.display().to_string(),
            source: e,
        })?;
        Self::from_bytes(kind, file_name.to_string(), bytes)
    }
}

pub struct TemplateSet {
    pub main: Template,
    pub order_form: Template,
    pub switch: Template,
}

impl TemplateSet {
    pub fn load(dir: &Path) -> Result<Self, GeneratorError> {
        let set = TemplateSet {
            main: Template::load(TemplateKind::Main, dir, MAIN_TEMPLATE_FILE)?,
            order_form: Template::load(TemplateKind::OrderForm, dir, ORDER_FORM_TEMPLATE_FILE)?,
            switch: Template::load(TemplateKind::Switch, dir, SWITCH_TEMPLATE_FILE)?,
        };
        if set.main.signature_anchor.is_none() {
            log::warn!(
                "signature placeholder {} not found in {}, documents will be generated unsigned",
                mapping::SIGNATURE_FIELD,
                set.main.file_name
            );
        }
        Ok(set)
    }

    /// Strict startup check: every field a mapping table can emit must
    /// exist in its template. Opt-in alternative to the default
    /// skip-and-log tolerance.
    pub fn validate_mapping_tables(&self) -> Result<(), GeneratorError> {
        check_declared(&self.main, mapping::declared_main_fields())?;
        check_declared(&self.order_form, mapping::declared_order_form_fields())?;
        check_declared(&self.switch, mapping::declared_switch_fields())?;
        Ok(())
    }
}

fn check_declared(template: &Template, declared: Vec<String>) -> Result<(), GeneratorError> {
    let missing: Vec<String> = declared
        .into_iter()
        .filter(|name| !template.field_names.contains(name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(GeneratorError::FieldTableMismatch {
            template: template.file_name.clone(),
            missing,
        })
    }
}

/// Find the widget annotation carrying the given field name and return
/// its page number and rect.
fn find_widget_anchor(doc: &Document, field_name: &str) -> Option<SignatureAnchor> {
    for (page_number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
            continue;
        };
        let Some(annots) = page.get(b"Annots").ok().and_then(|o| resolve_array(doc, o)) else {
            continue;
        };
        for annot in &annots {
            let Some(dict) = resolve_dict(doc, annot) else {
                continue;
            };
            let name_matches = dict
                .get(b"T")
                .ok()
                .and_then(|o| o.as_str().ok())
                .map(|bytes| bytes == field_name.as_bytes())
                .unwrap_or(false);
            if !name_matches {
                continue;
            }
            if let Some(rect) = dict.get(b"Rect").ok().and_then(|o| parse_rect(doc, o)) {
                return Some(SignatureAnchor { page_number, rect });
            }
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a lopdf::Dictionary> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn resolve_array(doc: &Document, object: &Object) -> Option<Vec<Object>> {
    match object {
        Object::Reference(id) => Some(doc.get_object(*id).ok()?.as_array().ok()?.clone()),
        Object::Array(items) => Some(items.clone()),
        _ => None,
    }
}

fn parse_rect(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let items = resolve_array(doc, object)?;
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0f32; 4];
    for (slot, item) in rect.iter_mut().zip(items.iter()) {
        *slot = match item {
            Object::Integer(value) => *value as f32,
            Object::Real(value) => *value,
            _ => return None,
        };
    }
    Some(rect)
}
