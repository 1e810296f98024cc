use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::json;

use crate::domain::order::OrderError;

// ============================================================================
// HTTP Error Mapping
// ============================================================================
//
// Every failure leaves as `{ "error": <message> }`. Store failures are
// logged where they occur and reach the client only as a generic message.
//
// ============================================================================

impl ResponseError for OrderError {
    fn status_code(&self) -> StatusCode {
        match self {
            OrderError::InvalidRequest(_)
            | OrderError::ItemUnavailable(_)
            | OrderError::InvalidStatus(_)
            | OrderError::InvalidStatusTransition(_) => StatusCode::BAD_REQUEST,
            OrderError::Unauthorized => StatusCode::UNAUTHORIZED,
            OrderError::Forbidden => StatusCode::FORBIDDEN,
            OrderError::NotFound => StatusCode::NOT_FOUND,
            OrderError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            OrderError::Persistence(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    OrderError::InvalidRequest(format!("Malformed request body: {err}")).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    OrderError::InvalidRequest(format!("Malformed query string: {err}")).into()
}

pub fn path_error_handler(err: PathError, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "Unparsable path parameter");
    OrderError::NotFound.into()
}

pub async fn api_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "API endpoint not found" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_status_codes() {
        assert_eq!(OrderError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(OrderError::ItemUnavailable(9).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(OrderError::InvalidStatus("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(OrderError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(OrderError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(OrderError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            OrderError::Persistence(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_persistence_detail_is_hidden() {
        let err = OrderError::Persistence(StoreError::Corrupt("orders row 12".into()));
        let resp = err.error_response();
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "Internal server error");
    }
}
