use crate::{
    AppState,
    collection::Record,
    handlers,
    models::{ClothingItem, Comment, Testimonial},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Resource Router Module
///
/// Every collection exposes the same five operations (plus `PATCH`):
///
/// - `POST {create_path}`: insert, 201 with the new id
/// - `GET {list_path}`: list all
/// - `GET|PUT|PATCH|DELETE {list_path}/{id}`: fetch, replace, merge, delete
///
/// The create path is a separate verb-style URL rather than `POST {list_path}`, matching
/// the paths existing clients already call.
fn collection_routes<T: Record>(create_path: &str, list_path: &str) -> Router<AppState> {
    Router::new()
        .route(create_path, post(handlers::create_record::<T>))
        .route(list_path, get(handlers::list_records::<T>))
        .route(
            &format!("{list_path}/{{id}}"),
            get(handlers::get_record::<T>)
                .put(handlers::replace_record::<T>)
                .patch(handlers::merge_record::<T>)
                .delete(handlers::delete_record::<T>),
        )
}

/// Clothing items. Mounted in every variant of the service.
pub fn clothing_routes() -> Router<AppState> {
    collection_routes::<ClothingItem>("/create-winter-clothes", "/winter-clothes")
}

/// Testimonials and comments. Mounted only when `AppConfig::community_routes` is set.
pub fn community_routes() -> Router<AppState> {
    Router::new()
        .merge(collection_routes::<Testimonial>("/create-testimonial", "/testimonials"))
        .merge(collection_routes::<Comment>("/create-comment", "/comments"))
}
