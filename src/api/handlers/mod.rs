pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod profile;
pub use self::profile::profile;

pub mod register;
pub use self::register::register;

// common types for the handlers
use crate::accounts::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// Error response with a JSON body.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Maps account errors to HTTP responses. Internal failures are logged and
/// reported without details.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::MissingUsername | Error::PasswordMismatch => StatusCode::BAD_REQUEST,
            Error::UsernameTaken => StatusCode::CONFLICT,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Storage(_) | Error::Hashing => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);

            return error_response(status, "Internal server error");
        }

        error_response(status, self.0.to_string())
    }
}
