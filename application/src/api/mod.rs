//! HTTP API definitions.

pub mod auth;
pub mod profile;
pub mod user;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};

use crate::{context, AnonymousPaths, Service};

pub use self::user::User;

/// Builds a [`Router`] serving the HTTP API with the provided [`Service`].
///
/// Every route, except [`AnonymousPaths`], requires authentication.
pub fn router(service: Service, anonymous: AnonymousPaths) -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/profile", get(profile::profile))
        .route_layer(middleware::from_fn(context::authenticate))
        .layer(Extension(anonymous))
        .layer(Extension(service))
}
