use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::domain::identity::{Caller, Role};
use crate::domain::order::OrderError;

// ============================================================================
// Identity Provider
// ============================================================================
//
// Resolves the authenticated caller for a request. Token verification happens
// upstream; the shipped provider reads the identity the gateway forwards.
//
// ============================================================================

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

pub trait IdentityProvider: Send + Sync {
    fn current_caller(&self, req: &HttpRequest) -> Result<Caller, OrderError>;
}

/// Trusts `X-User-Id` / `X-User-Role` set by the authenticating gateway
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderIdentityProvider;

impl IdentityProvider for HeaderIdentityProvider {
    fn current_caller(&self, req: &HttpRequest) -> Result<Caller, OrderError> {
        let id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or(OrderError::Unauthorized)?;

        let role = req
            .headers()
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(Role::parse_lenient)
            .unwrap_or(Role::Customer);

        Ok(Caller::new(id, role))
    }
}

impl FromRequest for Caller {
    type Error = OrderError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<dyn IdentityProvider>>() {
            Some(provider) => provider.current_caller(req),
            None => {
                tracing::error!("No identity provider registered; rejecting request");
                Err(OrderError::Unauthorized)
            }
        };

        ready(result)
    }
}
