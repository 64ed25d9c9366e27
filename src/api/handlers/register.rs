use super::{error_response, ApiError, ErrorBody};
use crate::accounts::{AccountService, AvatarUpload, Profile, Registration};
use axum::{
    extract::{multipart::MultipartRejection, Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, instrument};
use utoipa::ToSchema;

const AVATAR_FIELD: &str = "avatar";

/// Multipart fields accepted by `POST /register` (documentation only; the
/// handler reads the stream field by field).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct RegisterForm {
    username: String,
    #[schema(format = Password)]
    password: String,
    #[schema(format = Password)]
    password_repeat: String,
    email: String,
    name: String,
    nickname: String,
    phone: String,
    gender: String,
    #[schema(value_type = Option<String>, format = Binary)]
    avatar: Option<Vec<u8>>,
}

#[utoipa::path(
    post,
    path= "/register",
    request_body(content = RegisterForm, content_type = "multipart/form-data"),
    responses (
        (status = 201, description = "Registration successful", body = Profile, content_type = "application/json"),
        (status = 400, description = "Missing field, malformed form or passwords do not match", body = ErrorBody),
        (status = 409, description = "User with the specified username already exists", body = ErrorBody),
        (status = 413, description = "Request body too large", body = ErrorBody),
    ),
    tag= "accounts"
)]
// axum handler for register
#[instrument(skip(service, multipart))]
pub async fn register(
    service: Extension<Arc<AccountService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Rejected registration request: {}", rejection.body_text());

            return error_response(rejection.status(), rejection.body_text());
        }
    };

    let registration = match read_registration(multipart).await {
        Ok(registration) => registration,
        Err((status, message)) => {
            debug!("Rejected registration form: {}", message);

            return error_response(status, message);
        }
    };

    match service.register(registration).await {
        Ok(account) => (StatusCode::CREATED, Json(Profile::from(&account))).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn read_registration(mut multipart: Multipart) -> Result<Registration, (StatusCode, String)> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut avatar = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };

        if name == AVATAR_FIELD {
            let filename = field.file_name().map(ToString::to_string);
            let bytes = field.bytes().await.map_err(|e| (e.status(), e.body_text()))?;

            avatar = Some(AvatarUpload {
                filename,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(|e| (e.status(), e.body_text()))?;

            fields.insert(name, value);
        }
    }

    let mut take = |key: &str| {
        fields
            .remove(key)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Missing field: {key}")))
    };

    Ok(Registration {
        username: take("username")?,
        password: SecretString::from(take("password")?),
        password_repeat: SecretString::from(take("password_repeat")?),
        email: take("email")?,
        full_name: take("name")?,
        nickname: take("nickname")?,
        phone: take("phone")?,
        gender: take("gender")?,
        avatar,
    })
}
