//! Tests for the user repository.

use crate::test_fixtures::TestDatabase;
use vitrine_core::{CreateUserRequest, Error, UserRepository, UserRole};

fn admin_req(email: &str) -> CreateUserRequest {
    CreateUserRequest {
        email: email.to_string(),
        password_hash: "$argon2id$stub".to_string(),
        name: "Admin".to_string(),
        role: UserRole::Admin,
    }
}

#[tokio::test]
async fn test_create_and_fetch() {
    let test_db = TestDatabase::new().await;
    let users = &test_db.db.users;

    assert_eq!(users.count().await.unwrap(), 0);

    let created = users.create(admin_req("admin@example.com")).await.unwrap();
    assert_eq!(users.count().await.unwrap(), 1);
    assert_eq!(created.role, UserRole::Admin);

    let by_email = users
        .find_by_email("admin@example.com")
        .await
        .unwrap()
        .expect("fetch by email");
    assert_eq!(by_email.id, created.id);

    let by_id = users.get(created.id).await.unwrap().expect("fetch by id");
    assert_eq!(by_id.email, "admin@example.com");

    assert!(users
        .find_by_email("nobody@example.com")
        .await
        .unwrap()
        .is_none());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let test_db = TestDatabase::new().await;
    let users = &test_db.db.users;

    users.create(admin_req("admin@example.com")).await.unwrap();
    let err = users
        .create(admin_req("admin@example.com"))
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, Error::Conflict(_)));

    test_db.cleanup().await;
}
