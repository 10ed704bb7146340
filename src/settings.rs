//! Process configuration, read once from the environment at startup.

use std::env;
use std::path::PathBuf;

/// How the total calculation treats a selection whose product id does not
/// resolve in the catalog. `Skip` keeps the historical behavior (the
/// selection contributes zero); `Reject` fails order creation outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownProductPolicy {
    Skip,
    Reject,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the three form templates.
    pub template_dir: PathBuf,
    pub unknown_product_policy: UnknownProductPolicy,
    /// When set, the field-mapping tables are checked against each
    /// template's actual field set at startup and the process fails fast
    /// on any mismatch, instead of skipping unknown fields per request.
    pub strict_template_fields: bool,
    pub bind_addr: String,
    /// Allowed CORS origins. Empty means any origin is accepted.
    pub cors_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        let template_dir = env::var("PDF_TEMPLATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./templates"));

        let unknown_product_policy = match env::var("UNKNOWN_PRODUCT_POLICY").as_deref() {
            Ok("reject") => UnknownProductPolicy::Reject,
            _ => UnknownProductPolicy::Skip,
        };

        let strict_template_fields = matches!(
            env::var("STRICT_TEMPLATE_FIELDS").as_deref(),
            Ok("true") | Ok("1")
        );

        let bind_addr =
            env::var("BIND_ADDR").unwrap_or_else(|_| String::from("0.0.0.0:8080"));

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Settings {
            template_dir,
            unknown_product_policy,
            strict_template_fields,
            bind_addr,
            cors_origins,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            template_dir: PathBuf::from("./templates"),
            unknown_product_policy: UnknownProductPolicy::Skip,
            strict_template_fields: false,
            bind_addr: String::from("0.0.0.0:8080"),
            cors_origins: Vec::new(),
        }
    }
}
