use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod catalog;
pub mod generators;
pub mod order;
pub mod settings;
pub mod store;
pub mod templates;

pub use crate::store::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::order::handlers::index,
        crate::order::handlers::health,
        crate::order::handlers::list_products,
        crate::order::handlers::create_order,
        crate::order::handlers::get_order,
        crate::order::handlers::download_pdf
    ),
    components(
        schemas(
            catalog::Product,
            order::models::ProductSelection,
            order::models::CustomerInfo,
            order::models::InsuranceInfo,
            order::models::OrderCreate,
            order::models::Order,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Service", description = "Service info and health."),
        (name = "Orders", description = "Catalog and order intake."),
        (name = "Documents", description = "Filled government-form downloads.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost")
    )
)]
struct ApiDoc;

/// Register the API routes on an app. Shared between the server below and
/// the in-process test harness.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("/").route(web::get().to(order::handlers::index)))
            .service(web::resource("/health").route(web::get().to(order::handlers::health)))
            .service(web::resource("/products").route(web::get().to(order::handlers::list_products)))
            .service(web::resource("/orders").route(web::post().to(order::handlers::create_order)))
            .service(web::resource("/orders/{id}").route(web::get().to(order::handlers::get_order)))
            .service(
                web::resource("/orders/{id}/pdf").route(web::get().to(order::handlers::download_pdf)),
            ),
    );
}

pub async fn run() -> std::io::Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = settings::Settings::from_env();
    let bind_addr = settings.bind_addr.clone();
    let cors_origins = settings.cors_origins.clone();
    let app_state = match AppState::new(settings) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!(
                "Failed to load form templates. Please check PDF_TEMPLATE_DIR and the template files. Error: {e}"
            );
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("pflegebox_server")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus metrics middleware");

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);
        if cors_origins.is_empty() {
            cors = cors.allow_any_origin();
        } else {
            for origin in &cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .configure(configure_api)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
