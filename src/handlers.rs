use crate::{
    auth::{AuthError, CredentialStore},
    collection::{Collection, Record},
    error::ApiError,
    extract::ApiJson,
    models::{
        ApiResponse, CreatedResponse, DeleteOutcome, LoginRequest, RegisterRequest,
        ServerStatus, Stored, TokenResponse, UserView,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

// --- System ---

/// server_status
///
/// Liveness banner served at the root, with the server's current time.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Server is up", body = ServerStatus))
)]
pub async fn server_status() -> Json<ServerStatus> {
    Json(ServerStatus {
        message: "Server is running smoothly".to_string(),
        timestamp: Utc::now(),
    })
}

// --- Credentials ---

/// register_user
///
/// Creates a user with a bcrypt-hashed password. A taken email is answered with 400.
/// The generated user id is returned; the password and its hash never are.
#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = ApiResponse<CreatedResponse>),
        (status = 400, description = "Email already registered")
    )
)]
pub async fn register_user(
    State(store): State<CredentialStore>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedResponse>>), ApiError> {
    let id = store.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            "User registered successfully",
            CreatedResponse { id },
        )),
    ))
}

/// login_user
///
/// Checks the credentials and issues a signed token. Unknown email and wrong password
/// produce the same 401 response.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login_user(
    State(store): State<CredentialStore>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let token = store.login(payload).await?;
    Ok(Json(ApiResponse::with_data("Login successful", token)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses((status = 200, description = "All users", body = ApiResponse<Vec<UserView>>))
)]
pub async fn list_users(
    State(store): State<CredentialStore>,
) -> Result<Json<ApiResponse<Vec<UserView>>>, ApiError> {
    let users = store
        .list_users()
        .await
        .map_err(|err| ApiError::internal("Error fetching users", err))?;
    Ok(Json(ApiResponse::data(users)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = ApiResponse<UserView>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(store): State<CredentialStore>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserView>>, ApiError> {
    let user = store.get_user(&id).await.map_err(|err| match err {
        AuthError::UserNotFound => ApiError::from(err),
        other => ApiError::internal("Error fetching user", other),
    })?;
    Ok(Json(ApiResponse::data(user)))
}

// --- Resource Collections ---
//
// One generic handler per operation, instantiated per record type in `routes::resources`.
// The record's `LABEL` names it in every message ("Cloth added successfully").

pub async fn create_record<T: Record>(
    State(collection): State<Collection<T>>,
    ApiJson(fields): ApiJson<T>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedResponse>>), ApiError> {
    let id = collection
        .create(fields)
        .await
        .map_err(|err| ApiError::from_collection(err, T::LABEL, "adding"))?;

    tracing::debug!(%id, collection = T::COLLECTION, "record created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            format!("{} added successfully", T::LABEL),
            CreatedResponse { id },
        )),
    ))
}

pub async fn list_records<T: Record>(
    State(collection): State<Collection<T>>,
) -> Result<Json<ApiResponse<Vec<Stored<T>>>>, ApiError> {
    let records = collection
        .list_all()
        .await
        .map_err(|err| ApiError::from_collection(err, T::LABEL, "fetching"))?;
    Ok(Json(ApiResponse::data(records)))
}

pub async fn get_record<T: Record>(
    State(collection): State<Collection<T>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Stored<T>>>, ApiError> {
    let record = collection
        .get_by_id(&id)
        .await
        .map_err(|err| ApiError::from_collection(err, T::LABEL, "fetching"))?;
    Ok(Json(ApiResponse::data(record)))
}

/// replace_record
///
/// `PUT`: full replacement. Fields missing from the body are removed from the record.
pub async fn replace_record<T: Record>(
    State(collection): State<Collection<T>>,
    Path(id): Path<String>,
    ApiJson(fields): ApiJson<T>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    collection
        .replace_by_id(&id, fields)
        .await
        .map_err(|err| ApiError::from_collection(err, T::LABEL, "updating"))?;
    Ok(Json(ApiResponse::message(format!(
        "{} updated successfully",
        T::LABEL
    ))))
}

/// merge_record
///
/// `PATCH`: only the fields present in the body change.
pub async fn merge_record<T: Record>(
    State(collection): State<Collection<T>>,
    Path(id): Path<String>,
    ApiJson(fields): ApiJson<T>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    collection
        .merge_by_id(&id, fields)
        .await
        .map_err(|err| ApiError::from_collection(err, T::LABEL, "updating"))?;
    Ok(Json(ApiResponse::message(format!(
        "{} updated successfully",
        T::LABEL
    ))))
}

/// delete_record
///
/// Always 200 unless the store fails; `deletedCount` tells whether anything was removed.
pub async fn delete_record<T: Record>(
    State(collection): State<Collection<T>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteOutcome>>, ApiError> {
    let deleted_count = collection
        .delete_by_id(&id)
        .await
        .map_err(|err| ApiError::from_collection(err, T::LABEL, "deleting"))?;

    let message = if deleted_count > 0 {
        format!("{} deleted successfully", T::LABEL)
    } else {
        format!("{} not found", T::LABEL)
    };
    Ok(Json(ApiResponse::with_data(
        message,
        DeleteOutcome { deleted_count },
    )))
}
