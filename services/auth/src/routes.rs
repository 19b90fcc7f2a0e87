//! Authentication service routes
//!
//! The handlers implement the account lifecycle: registration creates
//! an unverified account with a pending OTP, OTP verification flips the
//! account to verified and issues a session token, and login either
//! issues a token (verified) or regenerates and resends the OTP
//! (unverified).

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiJson, ApiResult},
    models::{NewUser, ProfileUpdate, Role, User},
    otp, password, validation,
};

/// Request for user registration
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Request for OTP verification
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub user_id: String,
    pub otp: String,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request for profile updates; absent fields are left untouched
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Short user object returned by the auth flows
#[derive(Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

/// Full non-secret record returned by the profile routes
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_verified: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            is_verified: user.is_verified,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            address: user.address.clone(),
        }
    }
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/profile", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/login", post(login))
        .merge(protected)
        .fallback(route_not_found)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Fallback for unmatched routes
pub async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route Not Found"
        })),
    )
}

/// User registration endpoint
///
/// Creates an unverified account with a pending OTP and mails the code.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Registration attempt for username: {}", payload.username);

    validation::validate_username(&payload.username).map_err(ApiError::Validation)?;
    validation::validate_email(&payload.email).map_err(ApiError::Validation)?;
    validation::validate_password(&payload.password).map_err(ApiError::Validation)?;

    let role = match payload.role.as_deref() {
        Some(role) => role.parse::<Role>().map_err(ApiError::Validation)?,
        None => Role::default(),
    };

    if state
        .store
        .find_by_email_or_username(&payload.email, &payload.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict);
    }

    let password_hash = password::hash(&payload.password)?;
    let (code, expires_at) = otp::generate();

    let user = state
        .store
        .create(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash,
            role,
            otp_code: code.clone(),
            otp_expires_at: expires_at,
        })
        .await?;

    // The account is committed at this point. A failed send is reported
    // distinctly so the caller can log in to get a fresh code instead
    // of re-registering.
    state
        .mailer
        .send_otp(&user.email, &user.username, &code)
        .await
        .map_err(ApiError::MailDelivery)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful. An OTP has been sent to your email.",
            "userId": user.id,
        })),
    ))
}

/// OTP verification endpoint
///
/// A valid code flips the account to verified, clears the OTP fields,
/// and issues a session token.
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = payload
        .user_id
        .parse::<Uuid>()
        .map_err(|_| ApiError::Validation("userId must be a valid UUID".to_string()))?;

    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !otp::verify(&user, &payload.otp) {
        return Err(ApiError::InvalidOtp);
    }

    state.store.mark_verified(user.id).await?;
    info!("User {} verified", user.id);

    let token = state.jwt_service.issue(&user)?;

    Ok(Json(json!({
        "success": true,
        "message": "Account verified successfully",
        "token": token,
        "user": UserSummary::from(&user),
    })))
}

/// User login endpoint
///
/// A verified account with matching credentials gets a session token.
/// An unverified account gets a regenerated OTP by mail and a 403 so
/// the client can route to the verification step.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Login attempt for email: {}", payload.email);

    let Some(user) = state.store.find_by_email(&payload.email).await? else {
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify(&payload.password, &user.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_verified {
        let (code, expires_at) = otp::generate();
        state.store.set_otp(user.id, &code, expires_at).await?;
        state
            .mailer
            .send_otp(&user.email, &user.username, &code)
            .await
            .map_err(ApiError::MailDelivery)?;

        return Err(ApiError::Unverified { user_id: user.id });
    }

    let token = state.jwt_service.issue(&user)?;

    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": UserSummary::from(&user),
    })))
}

/// Profile read endpoint; requires a valid bearer token
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "user": UserProfile::from(&user),
    })))
}

/// Profile update endpoint; merges only the supplied fields
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let update = ProfileUpdate {
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone_number: payload.phone_number,
        address: payload.address,
    };

    let user = state
        .store
        .update_profile(user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "user": UserProfile::from(&user),
    })))
}
