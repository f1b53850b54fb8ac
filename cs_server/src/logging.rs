//! Structured logging configuration.
//!
//! The core library logs through the `log` facade; the subscriber installed
//! here forwards those records into `tracing` alongside the server's own
//! events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable through the `RUST_LOG` environment variable.
///
/// # Example
///
/// ```no_run
/// use cs_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a refused request at the security boundary
///
/// # Example
///
/// ```
/// use cs_server::logging::log_security_event;
///
/// log_security_event("admin_required", Some(42), "POST /api/v1/tournaments");
/// ```
pub fn log_security_event(event_type: &str, user_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}

/// Log a finished API request against its route template.
///
/// Server failures log at error, refused requests (a full category, a match
/// reported twice) at warn, everything else at info.
pub fn log_api_request(method: &str, route: &str, status_code: u16, duration_ms: u64) {
    match status_code {
        500..=u16::MAX => tracing::error!(
            http_method = method,
            http_route = route,
            http_status = status_code,
            duration_ms,
            "API request failed"
        ),
        400..=499 => tracing::warn!(
            http_method = method,
            http_route = route,
            http_status = status_code,
            duration_ms,
            "API request refused"
        ),
        _ => tracing::info!(
            http_method = method,
            http_route = route,
            http_status = status_code,
            duration_ms,
            "API request completed"
        ),
    }
}
