//! Applies a field-value map onto a loaded form template.
//!
//! Every call opens its own editable copy of the template bytes, so
//! concurrent requests never share mutable document state. Templates are
//! hand-authored and may drift from the mapping tables; a declared field
//! that is absent from the template is recorded and skipped, never an
//! error, so partial application cannot abort generation.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use super::mapping::{FieldValue, FieldValueMap};
use super::GeneratorError;
use crate::templates::Template;

pub struct FormFieldWriter<'a> {
    template: &'a Template,
    doc: Document,
    fields: Vec<(String, ObjectId)>,
    missing: Vec<String>,
}

impl<'a> FormFieldWriter<'a> {
    /// Open an editable working copy of the template.
    pub fn open(template: &'a Template) -> Result<Self, GeneratorError> {
        let doc = Document::load_mem(&template.bytes).map_err(|e| {
            GeneratorError::TemplateParse {
                name: template.file_name.clone(),
                source: e,
            }
        })?;
        let fields = collect_fields(&doc);
        Ok(FormFieldWriter {
            template,
            doc,
            fields,
            missing: Vec::new(),
        })
    }

    /// Remove a named field from the AcroForm field list and from every
    /// page's annotation list, as a pure filter producing new arrays.
    /// Static page content is untouched. Idempotent; returns the number of
    /// entries removed.
    pub fn remove_field(&mut self, name: &str) -> usize {
        let mut removed = remove_from_acroform_fields(&mut self.doc, name);
        let page_ids: Vec<ObjectId> = self.doc.get_pages().values().copied().collect();
        for page_id in page_ids {
            removed += remove_from_page_annots(&mut self.doc, page_id, name);
        }
        self.fields.retain(|(n, _)| n != name);
        removed
    }

    /// Set every declared field that exists in the template. Mismatches
    /// are recorded and filling continues.
    pub fn set_fields(&mut self, values: &FieldValueMap) {
        for (name, value) in values {
            let Some(field_id) = self
                .fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, id)| *id)
            else {
                log::warn!(
                    "field {name} declared for {} but absent from template, skipping",
                    self.template.file_name
                );
                self.missing.push(name.clone());
                continue;
            };
            match value {
                FieldValue::Text(text) => set_text_value(&mut self.doc, field_id, text),
                FieldValue::Checked => {
                    let on_state = checkbox_on_state(&self.doc, field_id);
                    set_checkbox_value(&mut self.doc, field_id, &on_state);
                }
            }
        }
    }

    /// Names of the fields the template field set could not satisfy.
    pub fn missing_fields(&self) -> &[String] {
        &self.missing
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Serialize the filled document. `NeedAppearances` is set so viewers
    /// regenerate the widget appearances for the written values.
    pub fn finish(mut self) -> Result<Vec<u8>, GeneratorError> {
        with_acroform_dict_mut(&mut self.doc, |form| {
            form.set("NeedAppearances", true);
        });
        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(GeneratorError::PdfSave)?;
        Ok(bytes)
    }
}

/// Resolve an object that may be a reference into its dictionary.
fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Resolve an object that may be a reference into an owned array.
fn resolve_array(doc: &Document, object: &Object) -> Option<Vec<Object>> {
    match object {
        Object::Reference(id) => Some(doc.get_object(*id).ok()?.as_array().ok()?.clone()),
        Object::Array(items) => Some(items.clone()),
        _ => None,
    }
}

fn acroform_dict(doc: &Document) -> Option<&Dictionary> {
    let root_id = doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
    let catalog = doc.get_object(root_id).ok()?.as_dict().ok()?;
    resolve_dict(doc, catalog.get(b"AcroForm").ok()?)
}

/// Run a mutation against the AcroForm dictionary, whether it is an
/// indirect object or stored inline in the catalog.
fn with_acroform_dict_mut(doc: &mut Document, mutate: impl FnOnce(&mut Dictionary)) {
    let Some(root_id) = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|o| o.as_reference().ok())
    else {
        return;
    };
    let form_ref = doc
        .get_object(root_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|o| o.as_reference().ok());
    match form_ref {
        Some(form_id) => {
            if let Ok(form) = doc.get_object_mut(form_id).and_then(Object::as_dict_mut) {
                mutate(form);
            }
        }
        None => {
            if let Ok(catalog) = doc.get_object_mut(root_id).and_then(Object::as_dict_mut) {
                if let Ok(Object::Dictionary(form)) = catalog.get_mut(b"AcroForm") {
                    mutate(form);
                }
            }
        }
    }
}

/// Partial field name of an entry in a Fields or Annots array.
fn entry_name(doc: &Document, entry: &Object) -> Option<String> {
    let dict = resolve_dict(doc, entry)?;
    let name = dict.get(b"T").ok()?.as_str().ok()?;
    Some(String::from_utf8_lossy(name).into_owned())
}

/// Walk the AcroForm field tree and collect fully-qualified field names
/// with the object id of their terminal (value-carrying) dictionary.
pub(crate) fn collect_fields(doc: &Document) -> Vec<(String, ObjectId)> {
    let mut out = Vec::new();
    let Some(form) = acroform_dict(doc) else {
        return out;
    };
    let Some(entries) = form
        .get(b"Fields")
        .ok()
        .and_then(|o| resolve_array(doc, o))
    else {
        return out;
    };
    for entry in &entries {
        collect_field_entry(doc, entry, None, &mut out);
    }
    out
}

fn collect_field_entry(
    doc: &Document,
    entry: &Object,
    prefix: Option<&str>,
    out: &mut Vec<(String, ObjectId)>,
) {
    let Ok(id) = entry.as_reference() else {
        return;
    };
    let Ok(dict) = doc.get_object(id).and_then(Object::as_dict) else {
        return;
    };
    let own_name = dict
        .get(b"T")
        .ok()
        .and_then(|o| o.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
    let qualified = match (prefix, own_name.as_deref()) {
        (Some(p), Some(n)) => Some(format!("{p}.{n}")),
        (None, Some(n)) => Some(n.to_string()),
        (Some(p), None) => Some(p.to_string()),
        (None, None) => None,
    };
    let kids = dict.get(b"Kids").ok().and_then(|o| resolve_array(doc, o));
    match kids {
        Some(kids) if !kids.is_empty() => {
            for kid in &kids {
                collect_field_entry(doc, kid, qualified.as_deref(), out);
            }
        }
        _ => {
            if let Some(name) = qualified {
                out.push((name, id));
            }
        }
    }
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn pdf_text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::string_literal(value)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Literal)
    }
}

fn set_text_value(doc: &mut Document, field_id: ObjectId, text: &str) {
    if let Ok(field) = doc.get_object_mut(field_id).and_then(Object::as_dict_mut) {
        field.set("V", pdf_text_string(text));
        // Stale appearance streams would keep showing the empty field.
        field.remove(b"AP");
    }
}

/// The widget's on-state name, read from its normal appearance dictionary.
fn checkbox_on_state(doc: &Document, field_id: ObjectId) -> Vec<u8> {
    let state = doc
        .get_object(field_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|dict| dict.get(b"AP").ok())
        .and_then(|ap| resolve_dict(doc, ap))
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|n| resolve_dict(doc, n))
        .and_then(|normal| {
            normal
                .iter()
                .map(|(key, _)| key.clone())
                .find(|key| key.as_slice() != &b"Off"[..])
        });
    state.unwrap_or_else(|| b"Yes".to_vec())
}

fn set_checkbox_value(doc: &mut Document, field_id: ObjectId, on_state: &[u8]) {
    if let Ok(field) = doc.get_object_mut(field_id).and_then(Object::as_dict_mut) {
        field.set("V", Object::Name(on_state.to_vec()));
        field.set("AS", Object::Name(on_state.to_vec()));
    }
}

fn remove_from_acroform_fields(doc: &mut Document, name: &str) -> usize {
    let Some(fields_obj) = acroform_dict(doc).and_then(|form| form.get(b"Fields").ok().cloned())
    else {
        return 0;
    };
    let (slot, entries): (Option<ObjectId>, Vec<Object>) = match &fields_obj {
        Object::Reference(id) => {
            match doc.get_object(*id).ok().and_then(|o| o.as_array().ok()) {
                Some(array) => (Some(*id), array.clone()),
                None => return 0,
            }
        }
        Object::Array(array) => (None, array.clone()),
        _ => return 0,
    };

    let kept: Vec<Object> = entries
        .iter()
        .filter(|entry| entry_name(doc, entry).as_deref() != Some(name))
        .cloned()
        .collect();
    let removed = entries.len() - kept.len();
    if removed == 0 {
        return 0;
    }

    match slot {
        Some(array_id) => {
            if let Ok(array) = doc.get_object_mut(array_id).and_then(Object::as_array_mut) {
                *array = kept;
            }
        }
        None => with_acroform_dict_mut(doc, |form| {
            form.set("Fields", Object::Array(kept));
        }),
    }
    removed
}

fn remove_from_page_annots(doc: &mut Document, page_id: ObjectId, name: &str) -> usize {
    let Some(annots_obj) = doc
        .get_object(page_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|page| page.get(b"Annots").ok().cloned())
    else {
        return 0;
    };
    let (slot, entries): (Option<ObjectId>, Vec<Object>) = match &annots_obj {
        Object::Reference(id) => {
            match doc.get_object(*id).ok().and_then(|o| o.as_array().ok()) {
                Some(array) => (Some(*id), array.clone()),
                None => return 0,
            }
        }
        Object::Array(array) => (None, array.clone()),
        _ => return 0,
    };

    let kept: Vec<Object> = entries
        .iter()
        .filter(|entry| entry_name(doc, entry).as_deref() != Some(name))
        .cloned()
        .collect();
    let removed = entries.len() - kept.len();
    if removed == 0 {
        return 0;
    }

    match slot {
        Some(array_id) => {
            if let Ok(array) = doc.get_object_mut(array_id).and_then(Object::as_array_mut) {
                *array = kept;
            }
        }
        None => {
            if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
                page.set("Annots", Object::Array(kept));
            }
        }
    }
    removed
}
