//! Authentication middleware for protected endpoints.
//!
//! [`auth_middleware`] validates the bearer token and injects the caller's
//! [`Principal`] into request extensions. [`require_admin`] runs after it on
//! administrative routes.
//!
//! # Extracting the caller
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use courtside::auth::Principal;
//!
//! async fn protected_handler(Extension(principal): Extension<Principal>) -> String {
//!     format!("Authenticated as user {}", principal.user_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use courtside::auth::{AuthError, Principal};

use super::AppState;
use super::error::auth_error;
use crate::logging::log_security_event;

/// Validate `Authorization: Bearer <token>` and inject the [`Principal`]
///
/// - **Success**: token valid, principal injected, next handler called
/// - **Missing header or bad format**: `401 Unauthorized`
/// - **Invalid or expired token**: `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return auth_error(&AuthError::MissingToken).into_response();
    };

    match state.verifier.verify(token) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => {
            log_security_event("invalid_token", None, &e.to_string());
            auth_error(&e).into_response()
        }
    }
}

/// Refuse callers without the admin flag with `403 Forbidden`
pub async fn require_admin(request: Request, next: Next) -> Response {
    let principal = request.extensions().get::<Principal>().copied();
    match principal {
        Some(p) if p.is_admin => next.run(request).await,
        Some(p) => {
            log_security_event(
                "admin_required",
                Some(p.user_id),
                &format!("{} {}", request.method(), request.uri().path()),
            );
            auth_error(&AuthError::AdminRequired).into_response()
        }
        None => auth_error(&AuthError::MissingToken).into_response(),
    }
}
