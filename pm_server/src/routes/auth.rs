//! Registration, login and user directory.

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;

use super::AppState;
use crate::auth::CurrentUser;
use crate::error::TrackerResult;
use crate::models::user::{Credentials, NewUser, TokenResponse, UserProfile};
use crate::services::user_service;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/users", get(list_users))
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> TrackerResult<Json<TokenResponse>> {
    user_service::register(&state.db, &state.tokens, state.config.bcrypt_cost, request)
        .await
        .map(Json)
}

async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> TrackerResult<Json<TokenResponse>> {
    user_service::login(&state.db, &state.tokens, credentials)
        .await
        .map(Json)
}

async fn me(user: CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user.0))
}

async fn list_users(State(state): State<AppState>) -> TrackerResult<Json<Vec<UserProfile>>> {
    user_service::list_users(&state.db).await.map(Json)
}
