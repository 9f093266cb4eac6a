use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    error::AccountError,
    repo_types::{NewUser, User},
};

/// Canonical form of an email address used as the uniqueness key.
///
/// Trims surrounding whitespace and lower-cases the domain part (after the
/// last `@`). The local part is kept as supplied, so `Bob@Example.COM` and
/// `bob@example.com` are different accounts. Input without `@` is returned
/// trimmed; format checks belong to the HTTP layer.
pub fn normalize_email(raw: &str) -> Result<String, AccountError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(AccountError::validation("users must have an email address"));
    }
    Ok(match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    })
}

/// Persistence for user records.
///
/// `insert` must be atomic with respect to the email: of two concurrent
/// inserts for the same normalized email exactly one succeeds and the other
/// gets [`AccountError::EmailTaken`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, AccountError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError>;
    /// Same contract as `insert`, but the row is written with superuser and
    /// staff privileges in the same statement.
    async fn insert_superuser(&self, user: NewUser) -> Result<User, AccountError>;
}

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn insert_row(&self, user: NewUser, privileged: bool) -> Result<User, AccountError> {
        let sql = format!(
            "INSERT INTO users (email, name, password_hash, is_staff, is_superuser) \
             VALUES ($1, $2, $3, $4, $4) RETURNING {USER_COLUMNS}"
        );
        let res = sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(privileged)
            .fetch_one(&self.db)
            .await;
        match res {
            Ok(u) => Ok(u),
            // users_email_key decides races between concurrent registrations
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AccountError::EmailTaken)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, AccountError> {
        self.insert_row(user, false).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn insert_superuser(&self, user: NewUser) -> Result<User, AccountError> {
        self.insert_row(user, true).await
    }
}

/// Process-local store keyed by normalized email. Used when no database is
/// configured and by the tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert_row(&self, user: NewUser, privileged: bool) -> Result<User, AccountError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.email) {
            return Err(AccountError::EmailTaken);
        }
        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            is_active: true,
            is_staff: privileged,
            is_superuser: privileged,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.email.clone(), record.clone());
        Ok(record)
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, AccountError> {
        self.insert_row(user, false).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        Ok(self.users.lock().await.get(email).cloned())
    }

    async fn insert_superuser(&self, user: NewUser) -> Result<User, AccountError> {
        self.insert_row(user, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: "Full Name".into(),
            password_hash: "$argon2id$placeholder".into(),
        }
    }

    #[test]
    fn normalize_lowercases_domain_only() {
        assert_eq!(normalize_email("test@EMAIL.COM").unwrap(), "test@email.com");
        assert_eq!(normalize_email("Test.User@Example.Org").unwrap(), "Test.User@example.org");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["a@B.c", "User@Mixed.Case.COM", "plain@lower.com", "no-at-sign"] {
            let once = normalize_email(raw).unwrap();
            assert_eq!(normalize_email(&once).unwrap(), once);
        }
    }

    #[test]
    fn normalize_noop_for_lowercase_domain() {
        assert_eq!(normalize_email("User_Test@email.com").unwrap(), "User_Test@email.com");
    }

    #[test]
    fn normalize_splits_on_last_at() {
        assert_eq!(normalize_email("\"a@b\"@EXAMPLE.com").unwrap(), "\"a@b\"@example.com");
    }

    #[test]
    fn normalize_rejects_empty() {
        assert!(matches!(normalize_email(""), Err(AccountError::Validation(_))));
        assert!(matches!(normalize_email("   "), Err(AccountError::Validation(_))));
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.expect("first insert");
        let err = store.insert(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn memory_store_concurrent_inserts_have_one_winner() {
        let store = Arc::new(MemoryUserStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(new_user("race@example.com")).await })
            })
            .collect();

        let mut ok = 0;
        let mut taken = 0;
        for h in handles {
            match h.await.expect("task joined") {
                Ok(_) => ok += 1,
                Err(AccountError::EmailTaken) => taken += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(taken, 7);
    }

    #[tokio::test]
    async fn memory_store_find_and_privileged_insert() {
        let store = MemoryUserStore::new();
        let plain = store.insert(new_user("b@example.com")).await.unwrap();
        assert!(!plain.is_superuser && !plain.is_staff);
        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());

        let admin = store.insert_superuser(new_user("admin@example.com")).await.unwrap();
        assert!(admin.is_superuser);
        assert!(admin.is_staff);

        let found = store.find_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(found.is_superuser);

        let err = store.insert_superuser(new_user("b@example.com")).await.unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));
        assert!(!store.find_by_email("b@example.com").await.unwrap().unwrap().is_superuser);
    }
}
