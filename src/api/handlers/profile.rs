use super::{error_response, ApiError, ErrorBody};
use crate::accounts::{AccountService, Profile};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    get,
    path= "/profile/{username}",
    params(
        ("username" = String, Path, description = "Account username (case-sensitive)")
    ),
    responses (
        (status = 200, description = "Account profile", body = Profile, content_type = "application/json"),
        (status = 404, description = "No account with this username", body = ErrorBody),
    ),
    tag= "accounts"
)]
// axum handler for profile
#[instrument(skip(service))]
pub async fn profile(service: Extension<Arc<AccountService>>, Path(username): Path<String>) -> Response {
    match service.profile(&username).await {
        Ok(Some(account)) => (StatusCode::OK, Json(Profile::from(&account))).into_response(),
        Ok(None) => {
            debug!("Profile not found");

            error_response(StatusCode::NOT_FOUND, "Not found")
        }
        Err(e) => ApiError(e).into_response(),
    }
}
