use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
};
use validator::Validate;

use crate::{
    AppState,
    auth::{self, AuthUser},
    errors::{AppError, AppResult, ErrorResponse},
    models::{LoginForm, NewUser, RegisterUserRequest, TokenResponse, User},
    password,
};

/// register
///
/// [Public Route] Creates an account. The password is checked against the length
/// policy, hashed with Argon2 and never echoed back.
///
/// Duplicate usernames/emails are rejected up front; a concurrent insert that
/// slips past the check still surfaces as the same 400 through the unique constraint.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input or already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    password::check_policy(&payload.password)?;
    payload.validate()?;

    if state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username already registered".to_string()));
    }
    if state.repo.get_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&payload.password)?;

    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash,
            role: payload.role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Exchanges form-encoded credentials for a bearer token.
/// Unknown usernames and wrong passwords are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let user = match state.repo.get_user_by_username(&form.username).await? {
        Some(stored) if password::verify_password(&form.password, &stored.password_hash) => {
            stored.user
        }
        _ => {
            tracing::debug!(username = %form.username, "login rejected");
            return Err(AppError::Unauthorized(
                "Incorrect username or password".to_string(),
            ));
        }
    };

    let access_token = auth::issue_token(&user.username, &state.config)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// me
///
/// [Authenticated Route] Profile of the token's owner.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    AuthUser { username, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<User>> {
    let stored = state
        .repo
        .get_user_by_username(&username)
        .await?
        .ok_or_else(AppError::user_not_found)?;
    Ok(Json(stored.user))
}
