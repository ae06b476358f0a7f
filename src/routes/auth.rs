use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{password::verify_password, AuthenticatedUser},
    error::{AppError, AppResult},
    models::User,
    schema::users,
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in_minutes: i64,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let mut conn = state.db()?;

    let user: Option<User> = users::table
        .filter(users::username.eq(&payload.username))
        .first(&mut conn)
        .optional()?;

    let Some(user) = user else {
        return Err(AppError::unauthorized());
    };

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::unauthorized());
    }

    let access_token = state
        .jwt
        .generate_token(user.id, &user.username, &user.role)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in_minutes: state.config.jwt_expiry_minutes,
    }))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
