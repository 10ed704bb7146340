use actix_web::http::header;
use actix_web::web::{self, Path, Query};
use actix_web::{HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;

use crate::catalog::BUDGET_LIMIT;
use crate::generators::{total, PdfKind};
use crate::order::models::{Order, OrderCreate};
use crate::order::validation::validate_order;
use crate::store::AppState;
use crate::ErrorResponse;

#[derive(Deserialize)]
pub struct PdfQuery {
    pub pdf_type: Option<String>,
}

#[utoipa::path(
    context_path = "/api",
    tag = "Orders",
    get,
    path = "/products",
    responses(
        (status = 200, description = "The product catalog and the monthly budget limit")
    )
)]
pub async fn list_products(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "products": data.catalog.products(),
        "budget_limit": BUDGET_LIMIT,
    }))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Orders",
    post,
    path = "/orders",
    request_body = OrderCreate,
    responses(
        (status = 201, description = "Order accepted", body = Order),
        (status = 400, description = "Order rejected", body = ErrorResponse)
    )
)]
pub async fn create_order(
    req: web::Json<OrderCreate>,
    data: web::Data<AppState>,
) -> impl Responder {
    let create = req.into_inner();

    let total = match total::compute_total(
        &create.products,
        &data.catalog,
        data.settings.unknown_product_policy,
    ) {
        Ok(total) => total,
        Err(e) => {
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()));
        }
    };
    if let Err(e) = validate_order(&create, total) {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()));
    }

    let order = Order::new(create, total);
    log::info!("order {} accepted, total {:.2}", order.id, order.total);
    data.store.insert(order.clone()).await;
    HttpResponse::Created().json(order)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Orders",
    get,
    path = "/orders/{id}",
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Order id")
    )
)]
pub async fn get_order(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    match data.store.get(id.into_inner()).await {
        Some(order) => HttpResponse::Ok().json(order),
        None => HttpResponse::NotFound().json(ErrorResponse::not_found("Order not found")),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Documents",
    get,
    path = "/orders/{id}/pdf",
    responses(
        (status = 200, description = "Filled document, or a ZIP archive for pdf_type=all"),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 500, description = "Document generation failed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("pdf_type" = Option<String>, Query, description = "main (default), bestellung, wechsel or all")
    )
)]
pub async fn download_pdf(
    id: Path<Uuid>,
    query: Query<PdfQuery>,
    data: web::Data<AppState>,
) -> impl Responder {
    let Some(order) = data.store.get(id.into_inner()).await else {
        return HttpResponse::NotFound().json(ErrorResponse::not_found("Order not found"));
    };

    let kind = PdfKind::parse(query.pdf_type.as_deref().unwrap_or("main"));
    let order_id = order.id;
    // PDF parsing, image work and deflation are CPU-bound; keep them off
    // the async workers.
    let generated = web::block(move || data.assembler.generate(&order, kind)).await;
    match generated {
        Ok(Ok(doc)) => HttpResponse::Ok()
            .content_type(doc.media_type)
            .insert_header(header::ContentDisposition {
                disposition: header::DispositionType::Attachment,
                parameters: vec![header::DispositionParam::Filename(doc.filename)],
            })
            .body(doc.bytes),
        Ok(Err(e)) => {
            log::error!("order {order_id}: document generation failed: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&format!(
                "PDF-Generierung fehlgeschlagen: {e}"
            )))
        }
        Err(e) => {
            log::error!("order {order_id}: generation task failed: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(
                "PDF-Generierung fehlgeschlagen",
            ))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Service",
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up")
    )
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Service",
    get,
    path = "/",
    responses(
        (status = 200, description = "Service info")
    )
)]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Marina Pflegebox Konfigurator API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
