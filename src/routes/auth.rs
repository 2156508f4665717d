use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Credential Router Module
///
/// The token issued by `/login` is not checked by any route, including these.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /register
        // Creates a user; 400 when the email is already registered.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Verifies credentials and returns a signed token.
        .route("/login", post(handlers::login_user))
        // GET /users, GET /users/{id}
        // Read-only projections. The password hash is never included.
        .route("/users", get(handlers::list_users))
        .route("/users/{id}", get(handlers::get_user))
}
