//! Picks and produces the documents for a download request.
//!
//! One assembler instance is shared across requests; it owns the loaded
//! template set and hands each generation its own working copy, so there
//! is no cross-request mutable state.

use std::io::{Cursor, Write};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{mapping, signature, GeneratedDocument, GeneratorError};
use crate::catalog::Catalog;
use crate::generators::writer::FormFieldWriter;
use crate::order::models::Order;
use crate::templates::TemplateSet;

const PDF_MEDIA_TYPE: &str = "application/pdf";
const ZIP_MEDIA_TYPE: &str = "application/zip";

/// Which document(s) a download request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfKind {
    Main,
    OrderForm,
    Switch,
    All,
}

impl PdfKind {
    /// Parse the `pdf_type` query value. Unrecognized values fall back to
    /// the main document, matching the historical download links.
    pub fn parse(value: &str) -> PdfKind {
        match value {
            "bestellung" => PdfKind::OrderForm,
            "wechsel" => PdfKind::Switch,
            "all" => PdfKind::All,
            _ => PdfKind::Main,
        }
    }
}

pub struct DocumentAssembler {
    templates: Arc<TemplateSet>,
    catalog: Catalog,
}

impl DocumentAssembler {
    pub fn new(templates: Arc<TemplateSet>) -> Self {
        DocumentAssembler {
            templates,
            catalog: Catalog::new(),
        }
    }

    /// Produce the requested document for an order, dated today.
    pub fn generate(
        &self,
        order: &Order,
        kind: PdfKind,
    ) -> Result<GeneratedDocument, GeneratorError> {
        self.generate_on(order, kind, Utc::now().date_naive())
    }

    /// Same as [`generate`](Self::generate) with an explicit document date.
    pub fn generate_on(
        &self,
        order: &Order,
        kind: PdfKind,
        today: NaiveDate,
    ) -> Result<GeneratedDocument, GeneratorError> {
        let name = file_name_part(&order.customer.nachname);
        let id8 = order.short_id();
        match kind {
            PdfKind::Main => Ok(GeneratedDocument {
                filename: format!("Anlage2_Antrag_{name}_{id8}.pdf"),
                bytes: self.main_document(order, today)?,
                media_type: PDF_MEDIA_TYPE,
            }),
            PdfKind::OrderForm => Ok(GeneratedDocument {
                filename: format!("Bestellformular_{name}_{id8}.pdf"),
                bytes: self.order_form_document(order, today)?,
                media_type: PDF_MEDIA_TYPE,
            }),
            PdfKind::Switch => Ok(GeneratedDocument {
                filename: format!("Wechselerklaerung_{name}_{id8}.pdf"),
                bytes: self.switch_document(order, today)?,
                media_type: PDF_MEDIA_TYPE,
            }),
            PdfKind::All => self.bundle(order, today),
        }
    }

    /// The main application form: removed provider field, mapped values,
    /// composited signature. Signature faults downgrade to an unsigned
    /// document.
    fn main_document(&self, order: &Order, today: NaiveDate) -> Result<Vec<u8>, GeneratorError> {
        let mut writer = FormFieldWriter::open(&self.templates.main)?;
        writer.remove_field(mapping::REMOVED_MAIN_FIELD);
        writer.set_fields(&mapping::main_form_fields(order, &self.catalog, today));

        match (
            &self.templates.main.signature_anchor,
            signature::prepare(&order.insurance.signature_insured),
        ) {
            (Some(anchor), Ok(prepared)) => {
                if let Err(e) = signature::embed(writer.doc_mut(), anchor, &prepared) {
                    log::warn!("order {}: signature not embedded: {e}", order.id);
                }
            }
            (None, _) => {
                log::warn!(
                    "order {}: no signature placeholder in template, document left unsigned",
                    order.id
                );
            }
            (_, Err(e)) => {
                log::warn!(
                    "order {}: signature image unusable, document left unsigned: {e}",
                    order.id
                );
            }
        }
        writer.finish()
    }

    fn order_form_document(
        &self,
        order: &Order,
        today: NaiveDate,
    ) -> Result<Vec<u8>, GeneratorError> {
        let outcome = mapping::order_form_fields(order, &self.catalog, today);
        if outcome.dropped_rows > 0 {
            log::warn!(
                "order {}: {} selections beyond the printed rows were dropped",
                order.id,
                outcome.dropped_rows
            );
        }
        let mut writer = FormFieldWriter::open(&self.templates.order_form)?;
        writer.set_fields(&outcome.fields);
        writer.finish()
    }

    fn switch_document(&self, order: &Order, today: NaiveDate) -> Result<Vec<u8>, GeneratorError> {
        let mut writer = FormFieldWriter::open(&self.templates.switch)?;
        writer.set_fields(&mapping::switch_form_fields(order, today));
        writer.finish()
    }

    /// All documents for the order in one archive. The switch declaration
    /// is included only when the customer already receives supplies from
    /// another provider.
    fn bundle(&self, order: &Order, today: NaiveDate) -> Result<GeneratedDocument, GeneratorError> {
        let name = file_name_part(&order.customer.nachname);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
        archive.start_file(format!("Anlage2_Antrag_{name}.pdf"), options)?;
        archive.write_all(&self.main_document(order, today)?)?;
        archive.start_file(format!("Bestellformular_{name}.pdf"), options)?;
        archive.write_all(&self.order_form_document(order, today)?)?;
        if order.insurance.bezieht_bereits {
            archive.start_file(format!("Wechselerklaerung_{name}.pdf"), options)?;
            archive.write_all(&self.switch_document(order, today)?)?;
        }
        let bytes = archive.finish()?.into_inner();

        Ok(GeneratedDocument {
            filename: format!("Marina_Pflegebox_{name}_{}.zip", order.short_id()),
            bytes,
            media_type: ZIP_MEDIA_TYPE,
        })
    }
}

/// Surname as it appears in download filenames: anything that could upset
/// a filesystem or a Content-Disposition header becomes an underscore.
fn file_name_part(nachname: &str) -> String {
    let cleaned: String = nachname
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "Kunde".to_string()
    } else {
        cleaned
    }
}
