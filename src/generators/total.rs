//! Order total calculation.

use thiserror::Error;

use crate::catalog::Catalog;
use crate::order::models::ProductSelection;
use crate::settings::UnknownProductPolicy;

#[derive(Debug, Error, PartialEq)]
#[error("Unbekanntes Produkt: {0}")]
pub struct UnknownProduct(pub String);

/// Sum `price × quantity` over all selections whose product id resolves in
/// the catalog, rounded to two decimals. Under `UnknownProductPolicy::Skip`
/// an unresolvable id contributes zero; under `Reject` it fails the
/// computation with the offending id. Pure, no I/O.
pub fn compute_total(
    selections: &[ProductSelection],
    catalog: &Catalog,
    policy: UnknownProductPolicy,
) -> Result<f64, UnknownProduct> {
    let mut total = 0.0;
    for selection in selections {
        match catalog.get(&selection.product_id) {
            Some(product) => total += product.price * f64::from(selection.quantity),
            None => match policy {
                UnknownProductPolicy::Skip => {
                    log::warn!(
                        "unknown product id {} in order, contributes 0.00",
                        selection.product_id
                    );
                }
                UnknownProductPolicy::Reject => {
                    return Err(UnknownProduct(selection.product_id.clone()));
                }
            },
        }
    }
    Ok((total * 100.0).round() / 100.0)
}
