//! Error taxonomy for the authentication service
//!
//! Every failure is converted to the standard JSON envelope
//! `{success, message, error?}` at the request boundary. Internal
//! error detail is included in `error` only outside production mode.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::repositories::StoreError;

/// Custom error type for the authentication service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Duplicate email or username
    #[error("User with this email or username already exists")]
    Conflict,

    /// Missing or invalid bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad credentials. The same message covers unknown accounts so the
    /// response never reveals whether the email exists.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Absent, mismatched, or expired OTP; the cases are not distinguished
    #[error("Invalid or expired OTP")]
    InvalidOtp,

    /// No such resource
    #[error("{0}")]
    NotFound(String),

    /// The account exists but has not completed OTP verification.
    /// A fresh OTP was already sent before this error is returned.
    #[error("Account not verified. A new OTP has been sent to your email.")]
    Unverified { user_id: Uuid },

    /// The OTP mail could not be delivered. Distinct from validation so
    /// the caller retries by logging in instead of re-registering.
    #[error("Could not send the verification email. Log in to request a new code.")]
    MailDelivery(#[source] anyhow::Error),

    /// Credential store failure
    #[error("Internal server error")]
    Store(#[source] StoreError),

    /// Anything else
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // Unique-violation race during create maps to the same
            // conflict as the pre-check.
            StoreError::Conflict => ApiError::Conflict,
            other => ApiError::Store(other),
        }
    }
}

fn is_production() -> bool {
    std::env::var("APP_ENV").is_ok_and(|v| v == "production")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::Conflict | ApiError::InvalidOtp => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unverified { .. } => StatusCode::FORBIDDEN,
            ApiError::MailDelivery(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut body = json!({
            "success": false,
            "message": self.to_string(),
        });

        if let ApiError::Unverified { user_id } = &self {
            body["userId"] = json!(user_id);
        }

        let detail = match &self {
            ApiError::MailDelivery(e) => {
                error!("Mail delivery failed: {:#}", e);
                Some(format!("{:#}", e))
            }
            ApiError::Store(e) => {
                error!("Store error: {}", e);
                Some(e.to_string())
            }
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                Some(format!("{:#}", e))
            }
            _ => None,
        };

        if let Some(detail) = detail {
            if !is_production() {
                body["error"] = json!(detail);
            }
        }

        (status, Json(body)).into_response()
    }
}

/// Type alias for handler results
pub type ApiResult<T> = Result<T, ApiError>;

/// Json extractor whose rejection uses the standard envelope.
///
/// axum's default Json extractor answers a missing or malformed body
/// with a plain-text 422 before the handler runs; routing the
/// rejection through [`ApiError::Validation`] keeps every response in
/// the `{success, message}` shape with a 400.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serial_test::serial;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (
                ApiError::Validation("username is required".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::Conflict, StatusCode::BAD_REQUEST),
            (ApiError::InvalidOtp, StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (
                ApiError::NotFound("User not found".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Unverified {
                    user_id: Uuid::new_v4(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::MailDelivery(anyhow::anyhow!("mail API unreachable")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);

            let body = body_json(response).await;
            assert_eq!(body["success"], false);
            assert!(body["message"].is_string());
        }
    }

    #[tokio::test]
    async fn test_api_json_rejection_uses_envelope() {
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Payload {
            name: String,
        }

        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();

        let result = ApiJson::<Payload>::from_request(req, &()).await;
        let err = result.err().unwrap();
        assert!(matches!(err, ApiError::Validation(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_unverified_body_carries_user_id() {
        let user_id = Uuid::new_v4();
        let response = ApiError::Unverified { user_id }.into_response();
        let body = body_json(response).await;

        assert_eq!(body["userId"], json!(user_id));
    }

    #[tokio::test]
    #[serial]
    async fn test_internal_detail_suppressed_in_production() {
        unsafe {
            std::env::set_var("APP_ENV", "production");
        }

        let response = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("error").is_none());

        unsafe {
            std::env::remove_var("APP_ENV");
        }

        let response = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "boom");
    }
}
