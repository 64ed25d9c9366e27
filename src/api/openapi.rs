use crate::accounts::Profile;
use crate::api::handlers::{
    self,
    health::Health,
    login::LoginForm,
    register::RegisterForm,
    ErrorBody,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "signet", description = "User account and credential store"),
    paths(
        handlers::health::health,
        handlers::register::register,
        handlers::login::login,
        handlers::profile::profile,
    ),
    components(schemas(Health, Profile, RegisterForm, LoginForm, ErrorBody)),
    tags(
        (name = "accounts", description = "Registration, login and profiles"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
