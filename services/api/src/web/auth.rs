//! services/api/src/web/auth.rs
//!
//! Account endpoints: registration, login/logout, email confirmation, password
//! reset and the signed-in user's profile.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use aikido_live_core::{
    validation::{validate_email, validate_password, validate_registration},
    NewRegistration, PortError, ProfileUpdate, ProfileUpdateOutcome, Registration, Role, User,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::web::session::{sign_in, sign_out};
use crate::web::state::{AppState, CurrentUser};

pub type HandlerError = (StatusCode, String);

/// Logs a port failure and hides its details from the client.
pub fn internal(context: &str, e: PortError) -> HandlerError {
    error!("{}: {:?}", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong. Please try again.".to_string(),
    )
}

/// Logs a session store failure and hides its details from the client.
pub fn session_failure(e: tower_sessions::session::Error) -> HandlerError {
    error!("Session store error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong. Please try again.".to_string(),
    )
}

fn bad_request(message: impl ToString) -> HandlerError {
    (StatusCode::BAD_REQUEST, message.to_string())
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, IntoParams)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_new_password: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub is_email_confirmed: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: match user.role {
                Role::Admin => "Admin".to_string(),
                Role::User => "User".to_string(),
            },
            is_email_confirmed: user.is_email_confirmed,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new account pending email confirmation
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered; confirmation email queued", body = UserResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_registration(
        &req.first_name,
        &req.last_name,
        &req.email,
        &req.password,
        &req.confirm_password,
    )
    .map_err(bad_request)?;

    let outcome = state
        .auth
        .register(NewRegistration {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
        })
        .await
        .map_err(|e| internal("Failed to register user", e))?;

    match outcome {
        Registration::Registered(user) => {
            Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
        }
        Registration::EmailInUse => Err((
            StatusCode::CONFLICT,
            "Email is already in use.".to_string(),
        )),
        Registration::NotSaved => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Registration could not be saved. Please try again.".to_string(),
        )),
    }
}

/// POST /auth/login - Login with an existing, confirmed account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state
        .auth
        .authenticate(&req.email, &req.password)
        .await
        .map_err(|e| internal("Failed to authenticate", e))?
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        ))?;

    sign_in(&session, &user.email)
        .await
        .map_err(session_failure)?;

    Ok(Json(UserResponse::from(&user)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(session: Session) -> Result<impl IntoResponse, HandlerError> {
    sign_out(&session).await.map_err(session_failure)?;
    Ok(StatusCode::OK)
}

/// GET /auth/confirm-email - Confirm an email address with the emailed token
#[utoipa::path(
    get,
    path = "/auth/confirm-email",
    params(TokenQuery),
    responses(
        (status = 200, description = "Email confirmed", body = MessageResponse),
        (status = 400, description = "Token is invalid or expired")
    )
)]
pub async fn confirm_email_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let confirmed = state
        .auth
        .confirm_email(&query.token)
        .await
        .map_err(|e| internal("Failed to confirm email", e))?;

    if confirmed {
        Ok(message("Your email has been confirmed. You can now log in."))
    } else {
        Err(bad_request(
            "The confirmation link is invalid or has expired.",
        ))
    }
}

/// POST /auth/forgot-password - Request a password reset email
///
/// Always answers the same way, whether or not the email is registered.
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse),
        (status = 400, description = "Invalid email"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_email(&req.email).map_err(bad_request)?;

    let accepted = state
        .auth
        .send_password_reset_email(&req.email)
        .await
        .map_err(|e| internal("Failed to start password reset", e))?;

    if !accepted {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong. Please try again.".to_string(),
        ));
    }
    Ok(message(
        "If an account exists for that email, a password reset link has been sent.",
    ))
}

/// GET /auth/reset-password - Check an emailed reset token before choosing a password
///
/// The token is not redeemed; `POST /auth/reset-password` does that.
#[utoipa::path(
    get,
    path = "/auth/reset-password",
    params(TokenQuery),
    responses(
        (status = 200, description = "Token is valid", body = MessageResponse),
        (status = 400, description = "Token is invalid or expired")
    )
)]
pub async fn check_reset_token_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let valid = state
        .auth
        .reset_token_is_valid(&query.token)
        .await
        .map_err(|e| internal("Failed to check reset token", e))?;

    if valid {
        Ok(message("Choose a new password."))
    } else {
        Err(bad_request("The reset link is invalid or has expired."))
    }
}

/// POST /auth/reset-password - Choose a new password with the emailed token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid password or token")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_password(&req.new_password, &req.confirm_password).map_err(bad_request)?;

    let reset = state
        .auth
        .reset_password(&req.token, &req.new_password)
        .await
        .map_err(|e| internal("Failed to reset password", e))?;

    if reset {
        Ok(message("Your password has been reset. You can now log in."))
    } else {
        Err(bad_request("The reset link is invalid or has expired."))
    }
}

/// GET /account/profile - The signed-in user's profile
#[utoipa::path(
    get,
    path = "/account/profile",
    responses(
        (status = 200, description = "Current profile", body = UserResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state
        .auth
        .user_by_email(&current.email)
        .await
        .map_err(|e| internal("Failed to load profile", e))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found.".to_string()))?;
    Ok(Json(UserResponse::from(&user)))
}

/// PUT /account/profile - Update name, email and optionally password
///
/// Changing the email signs the user out. Other sessions still hold the old
/// email, which no longer resolves to a user.
#[utoipa::path(
    put,
    path = "/account/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = MessageResponse),
        (status = 400, description = "Validation failure, e.g. current password incorrect"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    session: Session,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(bad_request("First and last name are required."));
    }
    validate_email(&req.email).map_err(bad_request)?;
    if let Some(new_password) = req.new_password.as_deref().filter(|p| !p.is_empty()) {
        validate_password(new_password, req.confirm_new_password.as_deref().unwrap_or(""))
            .map_err(bad_request)?;
    }

    let outcome = state
        .auth
        .update_profile(
            &current.email,
            ProfileUpdate {
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                current_password: req.current_password,
                new_password: req.new_password,
            },
        )
        .await
        .map_err(|e| internal("Failed to update profile", e))?;

    match outcome {
        ProfileUpdateOutcome::Updated { email_changed } => {
            if email_changed {
                sign_out(&session).await.map_err(session_failure)?;
                return Ok(message(
                    "Profile updated. Please log in again with your new email.",
                ));
            }
            Ok(message("Profile updated successfully!"))
        }
        ProfileUpdateOutcome::UserNotFound => {
            Err((StatusCode::UNAUTHORIZED, "User not found.".to_string()))
        }
        ProfileUpdateOutcome::CurrentPasswordRequired => Err(bad_request(
            "Current password is required to change password.",
        )),
        ProfileUpdateOutcome::CurrentPasswordIncorrect => {
            Err(bad_request("Current password is incorrect."))
        }
        ProfileUpdateOutcome::EmailInUse => Err((
            StatusCode::CONFLICT,
            "Email is already in use by another account.".to_string(),
        )),
        ProfileUpdateOutcome::NotSaved => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to update profile. Please try again.".to_string(),
        )),
    }
}
