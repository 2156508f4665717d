use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use winter_clothes_api::{
    auth::{AuthError, CredentialStore, decode_token, hash_password, issue_token, verify_password},
    models::{LoginRequest, RegisterRequest},
    repository::{MemoryRepository, Repository, RepositoryState},
};

const SECRET: &str = "auth-test-secret";

// --- Test Context ---

fn store_with(repo: RepositoryState) -> CredentialStore {
    CredentialStore::new(repo, SECRET.to_string(), Duration::hours(1), 4)
}

fn register_request(name: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

// --- Password Hashing ---

#[tokio::test]
async fn test_hash_is_salted_and_verifiable() {
    let first = hash_password("pw".to_string(), 4).await.unwrap();
    let second = hash_password("pw".to_string(), 4).await.unwrap();

    assert_ne!(first, "pw");
    assert_ne!(first, second, "each hash must carry its own salt");
    assert!(verify_password("pw".to_string(), first.clone()).await.unwrap());
    assert!(!verify_password("wrong".to_string(), first).await.unwrap());
}

#[tokio::test]
async fn test_verify_against_corrupt_hash_is_an_error() {
    let result = verify_password("pw".to_string(), "not-a-bcrypt-hash".to_string()).await;
    assert!(matches!(result, Err(AuthError::PasswordHash(_))));
}

// --- Tokens ---

#[test]
fn test_issued_token_round_trips_claims() {
    let issued = issue_token("a@x.com", SECRET, Duration::minutes(30)).unwrap();
    let claims = decode_token(&issued.token, SECRET).unwrap();

    assert_eq!(claims.email, "a@x.com");
    assert!(claims.exp > Utc::now().timestamp());
    assert_eq!(claims.exp, issued.expires_at.timestamp());
    assert!(claims.iat <= claims.exp);
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let issued = issue_token("a@x.com", SECRET, Duration::minutes(30)).unwrap();
    assert!(matches!(
        decode_token(&issued.token, "another-secret"),
        Err(AuthError::Token(_))
    ));
}

#[test]
fn test_expired_token_is_rejected() {
    // Well past the default 60s leeway of the validator.
    let issued = issue_token("a@x.com", SECRET, Duration::minutes(-10)).unwrap();
    assert!(matches!(
        decode_token(&issued.token, SECRET),
        Err(AuthError::Token(_))
    ));
}

#[test]
fn test_unrepresentable_expiry_is_an_error() {
    assert!(matches!(
        issue_token("a@x.com", SECRET, Duration::weeks(100_000_000)),
        Err(AuthError::ExpiryOutOfRange)
    ));
}

// --- Registration ---

#[tokio::test]
async fn test_register_stores_hash_not_password() {
    let repo = Arc::new(MemoryRepository::new());
    let store = store_with(repo.clone());

    let id = store
        .register(register_request("A", "a@x.com", "pw"))
        .await
        .unwrap();

    let doc = repo
        .find_by_id(CredentialStore::COLLECTION, id)
        .await
        .unwrap()
        .expect("registered user must be stored");
    assert_eq!(doc.body["name"], "A");
    assert_eq!(doc.body["email"], "a@x.com");
    assert!(doc.body.get("password").is_none());

    let hash = doc.body["passwordHash"].as_str().unwrap();
    assert!(hash.starts_with("$2"));
    assert_ne!(hash, "pw");
}

#[tokio::test]
async fn test_register_twice_conflicts_and_keeps_one_record() {
    let repo = Arc::new(MemoryRepository::new());
    let store = store_with(repo.clone());

    store
        .register(register_request("A", "a@x.com", "pw"))
        .await
        .unwrap();
    let second = store
        .register(register_request("Other", "a@x.com", "different"))
        .await;
    assert!(matches!(second, Err(AuthError::UserAlreadyExists)));

    let matching = repo
        .find_all(CredentialStore::COLLECTION)
        .await
        .unwrap()
        .into_iter()
        .filter(|doc| doc.body["email"] == Value::from("a@x.com"))
        .count();
    assert_eq!(matching, 1);
}

// --- Login ---

#[tokio::test]
async fn test_login_with_correct_credentials_issues_token() {
    let store = store_with(Arc::new(MemoryRepository::new()));
    store
        .register(register_request("A", "a@x.com", "pw"))
        .await
        .unwrap();

    let issued = store.login(login_request("a@x.com", "pw")).await.unwrap();
    let claims = decode_token(&issued.token, SECRET).unwrap();

    assert_eq!(claims.email, "a@x.com");
    assert!(issued.expires_at > Utc::now());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let store = store_with(Arc::new(MemoryRepository::new()));
    store
        .register(register_request("A", "a@x.com", "pw"))
        .await
        .unwrap();

    let wrong_password = store
        .login(login_request("a@x.com", "wrong"))
        .await
        .unwrap_err();
    let unknown_email = store
        .login(login_request("nobody@x.com", "pw"))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn test_login_surfaces_store_failure() {
    let store = store_with(Arc::new(MemoryRepository::new_failing()));
    let result = store.login(login_request("a@x.com", "pw")).await;
    assert!(matches!(result, Err(AuthError::Store(_))));
}

// --- Projections ---

#[tokio::test]
async fn test_user_projections_omit_password_hash() {
    let store = store_with(Arc::new(MemoryRepository::new()));
    let id = store
        .register(register_request("A", "a@x.com", "pw"))
        .await
        .unwrap();

    let users = store.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, id);

    let user = store.get_user(&id.to_string()).await.unwrap();
    assert_eq!(user, users[0]);

    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["_id"], id.to_string());
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn test_get_user_with_bad_or_unknown_id_is_not_found() {
    let store = store_with(Arc::new(MemoryRepository::new()));

    assert!(matches!(
        store.get_user("not-an-id").await,
        Err(AuthError::UserNotFound)
    ));
    assert!(matches!(
        store.get_user(&uuid::Uuid::new_v4().to_string()).await,
        Err(AuthError::UserNotFound)
    ));
}
