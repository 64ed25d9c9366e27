use super::{error_response, ApiError, ErrorBody};
use crate::accounts::{AccountService, Credentials, Profile};
use axum::{
    extract::{rejection::FormRejection, Extension, Form},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

// No Debug: the password must not reach the logs.
#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    username: String,
    #[schema(format = Password)]
    password: String,
}

#[utoipa::path(
    post,
    path= "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Login successful", body = Profile, content_type = "application/json"),
        (status = 400, description = "Malformed form", body = ErrorBody),
        (status = 401, description = "Invalid username or password", body = ErrorBody),
        (status = 413, description = "Request body too large", body = ErrorBody),
    ),
    tag= "accounts"
)]
// axum handler for login
#[instrument(skip(service, payload))]
pub async fn login(
    service: Extension<Arc<AccountService>>,
    payload: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = match payload {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("Rejected login request: {}", rejection.body_text());

            return error_response(rejection.status(), rejection.body_text());
        }
    };

    let credentials = Credentials {
        username: form.username,
        password: SecretString::from(form.password),
    };

    match service.login(credentials).await {
        Ok(account) => (StatusCode::OK, Json(Profile::from(&account))).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
