//! Route handlers for the Mercury API.
//!
//! All handlers receive `SharedState` via Axum state extraction. Vendor and
//! database failures are rendered by `AppError`.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::accounts::{password, reset, settings, users, validate};
use crate::error::{AppError, TokenError};
use crate::hue::{self, HueCredentials};
use crate::oauth::ExchangeRequest;
use crate::store::UserId;
use crate::SharedState;

const DEXCOM_FETCH_FAILED: &str = "Error fetching Dexcom data";
const NO_HUE_TOKENS: &str = "No Hue tokens found for this user";

pub fn app_router(state: SharedState) -> Router {
    Router::new()
        // ── Health ───────────────────────────────────────────────────────
        .route("/", get(hello))
        .route("/status", get(status))
        // ── Dexcom ───────────────────────────────────────────────────────
        .route("/exchangeCode", post(exchange_code))
        .route("/getDexcomData/{user_id}", get(dexcom_data))
        .route("/devices/{user_id}", get(dexcom_devices))
        .route("/removeSensor/{user_id}", delete(remove_sensor))
        // ── Accounts ─────────────────────────────────────────────────────
        .route("/addUser", post(add_user))
        .route("/login", post(login))
        .route(
            "/checkUsernameAvailability/{username}",
            get(check_username_availability),
        )
        .route("/requestReset", post(request_reset))
        .route("/verifyCode", post(verify_code))
        .route("/resetPassword", post(reset_password))
        // ── Settings ─────────────────────────────────────────────────────
        .route("/getUserSettings/{user_id}", get(get_user_settings))
        .route("/updateUserSettings/{user_id}", post(update_user_settings))
        // ── Hue ──────────────────────────────────────────────────────────
        .route("/hueAuth", post(hue_auth))
        .route("/getHueTokens/{user_id}", get(hue_tokens))
        .route("/updateHueDevices/{user_id}", post(hue_update_devices))
        .route("/getHueDevices/{user_id}", get(hue_devices))
        .route("/toggleHueLight", post(hue_toggle_light))
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn hello() -> &'static str {
    "Hello World!"
}

async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "mercury-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// Dexcom Endpoints
// =============================================================================

/// POST /exchangeCode: trade an authorization code for a stored token pair.
async fn exchange_code(
    State(state): State<SharedState>,
    Json(body): Json<ExchangeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .exchanger
        .exchange(&body)
        .await
        .map_err(AppError::Exchange)?;

    Ok(Json(json!({ "message": "Tokens exchanged and stored successfully" })))
}

/// GET /getDexcomData/:user_id: estimated glucose values, passed through.
async fn dexcom_data(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let egvs = state
        .dexcom
        .egvs(user_id)
        .await
        .map_err(|e| AppError::vendor(DEXCOM_FETCH_FAILED, e))?;

    Ok(Json(egvs))
}

async fn dexcom_devices(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, AppError> {
    let devices = state
        .dexcom
        .devices(user_id)
        .await
        .map_err(|e| AppError::vendor(DEXCOM_FETCH_FAILED, e))?;

    Ok(Json(devices))
}

/// DELETE /removeSensor/:user_id: forget the user's Dexcom tokens.
async fn remove_sensor(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = state.tokens.delete(user_id).await.map_err(|e| match e {
        TokenError::Store(msg) => AppError::Database(msg),
        other => AppError::Internal(other.to_string()),
    })?;

    if !removed {
        return Err(AppError::NotFound(
            "No Dexcom sensor information found for this user".into(),
        ));
    }

    info!(user_id, "Dexcom tokens removed");
    Ok(Json(json!({ "message": "Dexcom sensor information deleted successfully" })))
}

// =============================================================================
// Account Endpoints
// =============================================================================

#[derive(Deserialize)]
struct AddUserBody {
    username: String,
    password: String,
    email: String,
    birthdate: String,
}

async fn add_user(
    State(state): State<SharedState>,
    Json(body): Json<AddUserBody>,
) -> Result<Json<users::User>, AppError> {
    let username = validate::username(&body.username)?;
    validate::password(&body.password)?;
    let email = validate::email(&body.email)?;
    let birthdate = validate::birthdate(&body.birthdate)?;

    let password_hash = password::hash(body.password).await?;
    let user = users::create_user(
        &state.pool,
        &users::NewUser {
            username,
            password_hash,
            email,
            birthdate,
        },
    )
    .await?;

    info!(user_id = user.id, "User registered");
    Ok(Json(user))
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(
    State(state): State<SharedState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let username = validate::username(&body.username).map_err(|_| AppError::InvalidCredentials)?;

    let Some((user_id, stored)) = users::credentials_for(&state.pool, &username).await? else {
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify(body.password, stored).await? {
        return Err(AppError::InvalidCredentials);
    }

    Ok(Json(json!({ "message": "Login successful", "user_id": user_id })))
}

async fn check_username_availability(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let taken = users::username_exists(&state.pool, username.trim()).await?;
    Ok(Json(json!({ "isAvailable": !taken })))
}

#[derive(Deserialize)]
struct RequestResetBody {
    email: String,
}

/// POST /requestReset: email a six-digit code to a registered address.
async fn request_reset(
    State(state): State<SharedState>,
    Json(body): Json<RequestResetBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = validate::email(&body.email)?;
    if !users::email_exists(&state.pool, &email).await? {
        return Err(AppError::NotFound("Email not found".into()));
    }

    let code = reset::generate_code();
    reset::store_code(&state.pool, &email, &code).await?;
    state
        .mailer
        .send_reset_code(&email, &code)
        .await
        .map_err(|e| {
            error!("Failed to send reset code: {e}");
            AppError::Internal(e.to_string())
        })?;

    Ok(Json(json!({ "message": "Email Sent" })))
}

#[derive(Deserialize)]
struct VerifyCodeBody {
    email: String,
    code: String,
}

async fn verify_code(
    State(state): State<SharedState>,
    Json(body): Json<VerifyCodeBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = validate::email(&body.email)?;
    let code = validate::reset_code(&body.code)?;

    match reset::check_code(&state.pool, &email, &code).await? {
        reset::CodeCheck::Valid => Ok(Json(json!({ "message": "Verification successful" }))),
        reset::CodeCheck::Expired => Err(AppError::BadRequest("Verification code expired".into())),
        reset::CodeCheck::Incorrect => {
            Err(AppError::BadRequest("Verification code incorrect".into()))
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordBody {
    email: String,
    new_password: String,
}

async fn reset_password(
    State(state): State<SharedState>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = validate::email(&body.email)?;
    validate::password(&body.new_password)?;

    let password_hash = password::hash(body.new_password).await?;
    if !users::update_password(&state.pool, &email, &password_hash).await? {
        return Err(AppError::NotFound("Email not found".into()));
    }
    reset::clear_codes(&state.pool, &email).await?;

    Ok(Json(json!({ "message": "Password reset successful" })))
}

// =============================================================================
// Settings Endpoints
// =============================================================================

async fn get_user_settings(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<settings::UserSettings>, AppError> {
    Ok(Json(settings::get_or_create(&state.pool, user_id).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettingsBody {
    high_threshold: i32,
    low_threshold: i32,
}

async fn update_user_settings(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
    Json(body): Json<UpdateSettingsBody>,
) -> Result<Json<settings::UserSettings>, AppError> {
    let updated =
        settings::upsert(&state.pool, user_id, body.high_threshold, body.low_threshold).await?;
    Ok(Json(updated))
}

// =============================================================================
// Hue Endpoints
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HueAuthBody {
    ip_address: Option<String>,
    #[serde(rename = "user_id")]
    user_id: Option<UserId>,
    username: Option<String>,
    clientkey: Option<String>,
}

/// POST /hueAuth: remember a bridge pairing for the user.
async fn hue_auth(
    State(state): State<SharedState>,
    Json(body): Json<HueAuthBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(ip_address), Some(user_id), Some(username), Some(clientkey)) = (
        present(body.ip_address),
        body.user_id,
        present(body.username),
        present(body.clientkey),
    ) else {
        return Err(AppError::BadRequest("Missing required parameters".into()));
    };

    hue::save_credentials(
        &state.pool,
        &HueCredentials {
            user_id,
            username,
            clientkey,
            ip_address,
        },
    )
    .await?;

    Ok(Json(json!({ "message": "Authenticated successfully" })))
}

async fn require_hue_credentials(
    state: &SharedState,
    user_id: UserId,
) -> Result<HueCredentials, AppError> {
    hue::credentials(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(NO_HUE_TOKENS.into()))
}

async fn hue_tokens(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<HueCredentials>, AppError> {
    Ok(Json(require_hue_credentials(&state, user_id).await?))
}

/// POST /updateHueDevices/:user_id: refresh the cached light list from the bridge.
async fn hue_update_devices(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let creds = require_hue_credentials(&state, user_id).await?;
    let lights = state
        .hue
        .list_lights(&creds.ip_address, &creds.username)
        .await?;
    let saved = hue::save_lights(&state.pool, user_id, &lights).await?;

    info!(user_id, lights = saved, "Hue light list updated");
    Ok(Json(json!({ "message": "Device list updated successfully" })))
}

async fn hue_devices(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<String>>, AppError> {
    let creds = require_hue_credentials(&state, user_id).await?;
    let lights = state
        .hue
        .list_lights(&creds.ip_address, &creds.username)
        .await?;

    Ok(Json(lights.into_iter().map(|l| l.name).collect()))
}

#[derive(Deserialize)]
struct ToggleLightBody {
    user_id: UserId,
    lightname: String,
    on: bool,
}

async fn hue_toggle_light(
    State(state): State<SharedState>,
    Json(body): Json<ToggleLightBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(light) = hue::find_light(&state.pool, body.user_id, &body.lightname).await? else {
        warn!(user_id = body.user_id, "Toggle requested for unknown light");
        return Err(AppError::BadRequest("No Hue light found for this user".into()));
    };
    let creds = require_hue_credentials(&state, body.user_id).await?;

    state
        .hue
        .set_light_on(&creds.ip_address, &creds.username, &light.rid, body.on)
        .await?;

    let verb = if body.on { "turned on" } else { "turned off" };
    Ok(Json(json!({ "message": format!("Light {verb} successfully") })))
}
