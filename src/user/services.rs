use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{
    error::AccountError,
    password::hash_password,
    repo::{normalize_email, UserStore},
    repo_types::{NewUser, User},
};

/// Optional profile fields accepted at registration.
#[derive(Debug, Clone, Default)]
pub struct NewUserFields {
    pub name: String,
}

/// Registration and privileged elevation of accounts.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    min_password_len: usize,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, min_password_len: usize) -> Self {
        Self {
            store,
            min_password_len,
        }
    }

    /// Normalizes the email, applies the password policy and hashes. Runs
    /// before any write, so a rejected request leaves no record behind.
    fn prepare(
        &self,
        email: &str,
        password: &str,
        fields: NewUserFields,
    ) -> Result<NewUser, AccountError> {
        let email = normalize_email(email)?;

        if password.chars().count() < self.min_password_len {
            warn!("password too short");
            return Err(AccountError::validation(format!(
                "password must be at least {} characters",
                self.min_password_len
            )));
        }

        Ok(NewUser {
            email,
            name: fields.name,
            password_hash: hash_password(password)?,
        })
    }

    /// Creates an unprivileged, active account.
    #[instrument(skip(self, password, fields))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        fields: NewUserFields,
    ) -> Result<User, AccountError> {
        let new_user = self.prepare(email, password, fields)?;
        let user = self
            .store
            .insert(new_user)
            .await
            .inspect_err(log_taken)?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Creates an account with superuser and staff privileges in a single
    /// write. Not exposed over HTTP.
    #[instrument(skip(self, password))]
    pub async fn elevate_to_superuser(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        let new_user = self.prepare(email, password, NewUserFields::default())?;
        let user = self
            .store
            .insert_superuser(new_user)
            .await
            .inspect_err(log_taken)?;

        info!(user_id = %user.id, "superuser created");
        Ok(user)
    }
}

fn log_taken(e: &AccountError) {
    if matches!(e, AccountError::EmailTaken) {
        warn!("email already registered");
    }
}
