#[cfg(feature = "axum")]
use crate::errors::AccountsError;
#[cfg(feature = "axum")]
use crate::models::{UserBadge, UserProfile};
#[cfg(feature = "axum")]
use crate::service::AccountsService;
#[cfg(feature = "axum")]
use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
#[cfg(feature = "axum")]
use serde::Deserialize;
#[cfg(feature = "axum")]
use std::sync::Arc;
#[cfg(feature = "axum")]
use uuid::Uuid;

#[cfg(feature = "axum")]
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountsService>,
}

#[cfg(feature = "axum")]
#[derive(Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[cfg(feature = "axum")]
#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[cfg(feature = "axum")]
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub referred_by: Option<Uuid>,
}

#[cfg(feature = "axum")]
#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[cfg(feature = "axum")]
#[derive(Deserialize)]
pub struct MiningRequest {
    pub user_id: Uuid,
}

#[cfg(feature = "axum")]
impl IntoResponse for AccountsError {
    fn into_response(self) -> Response {
        let status = match self {
            AccountsError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AccountsError::CodeNotFound
            | AccountsError::CodeExpired
            | AccountsError::TooManyAttempts
            | AccountsError::InvalidCode
            | AccountsError::VerificationRequired
            | AccountsError::EmailTaken
            | AccountsError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AccountsError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountsError::UserNotFound => StatusCode::NOT_FOUND,
            AccountsError::EmailError(_)
            | AccountsError::DatabaseError(_)
            | AccountsError::StorageError(_)
            | AccountsError::HashError(_)
            | AccountsError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal detail stays out of responses; clients get the stable
        // kind plus actionable wording.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(serde_json::json!({
            "error": message,
            "reason": self.kind(),
        }));

        (status, body).into_response()
    }
}

#[cfg(feature = "axum")]
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(feature = "axum")]
pub async fn request_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RequestCodeRequest>,
) -> Result<Json<serde_json::Value>, AccountsError> {
    let ip = client_ip(&headers);
    state
        .accounts
        .request_code(&payload.email, ip.as_deref())
        .await?;
    Ok(Json(
        serde_json::json!({ "message": "Verification code sent" }),
    ))
}

#[cfg(feature = "axum")]
pub async fn verify_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<serde_json::Value>, AccountsError> {
    let ip = client_ip(&headers);
    state
        .accounts
        .verify_code(&payload.email, &payload.code, ip.as_deref())
        .await?;
    Ok(Json(serde_json::json!({ "message": "Email verified" })))
}

#[cfg(feature = "axum")]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserProfile>, AccountsError> {
    let profile = state
        .accounts
        .register(&payload.email, &payload.password, payload.referred_by)
        .await?;
    Ok(Json(profile))
}

#[cfg(feature = "axum")]
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<UserProfile>, AccountsError> {
    let ip = client_ip(&headers);
    let profile = state
        .accounts
        .sign_in(&payload.email, &payload.password, ip.as_deref())
        .await?;
    Ok(Json(profile))
}

#[cfg(feature = "axum")]
pub async fn start_mining(
    State(state): State<AppState>,
    Json(payload): Json<MiningRequest>,
) -> Result<Json<UserProfile>, AccountsError> {
    let profile = state.accounts.start_mining(payload.user_id).await?;
    Ok(Json(profile))
}

#[cfg(feature = "axum")]
pub async fn stop_mining(
    State(state): State<AppState>,
    Json(payload): Json<MiningRequest>,
) -> Result<Json<UserProfile>, AccountsError> {
    let profile = state.accounts.stop_mining(payload.user_id).await?;
    Ok(Json(profile))
}

#[cfg(feature = "axum")]
pub async fn list_badges(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserBadge>>, AccountsError> {
    let badges = state.accounts.badges(user_id).await?;
    Ok(Json(badges))
}

/// Development/admin surface: force a recomputation pass and return the
/// resulting badge list.
#[cfg(feature = "axum")]
pub async fn recompute_badges(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserBadge>>, AccountsError> {
    let badges = state.accounts.recompute_badges(user_id).await?;
    Ok(Json(badges))
}

#[cfg(feature = "axum")]
pub fn accounts_router(accounts: Arc<AccountsService>) -> Router {
    let state = AppState { accounts };
    Router::new()
        .route("/request-code", post(request_code))
        .route("/verify-code", post(verify_code))
        .route("/register", post(register))
        .route("/sign-in", post(sign_in))
        .route("/mining/start", post(start_mining))
        .route("/mining/stop", post(stop_mining))
        .route("/users/{user_id}/badges", get(list_badges))
        .route("/users/{user_id}/badges/recompute", post(recompute_badges))
        .with_state(state)
}
