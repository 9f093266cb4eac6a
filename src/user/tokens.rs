use std::{sync::Arc, time::Duration};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    error::AccountError,
    password::{verify_against_dummy, verify_password},
    repo::{normalize_email, UserStore},
};
use crate::config::{JwtConfig, MAX_TTL_MINUTES};

/// JWT payload bound to a user id. Carries no credential material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.clamp(0, MAX_TTL_MINUTES) as u64 * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Checks credentials and mints bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    /// Every rejection is [`AccountError::InvalidCredentials`], so callers
    /// cannot tell an unknown account from a wrong password.
    #[instrument(skip(self, password))]
    pub async fn issue_token(&self, email: &str, password: &str) -> Result<String, AccountError> {
        if email.trim().is_empty() || password.is_empty() {
            warn!("missing credentials");
            return Err(AccountError::InvalidCredentials);
        }
        let email = normalize_email(email).map_err(|_| AccountError::InvalidCredentials)?;

        let Some(user) = self.store.find_by_email(&email).await? else {
            verify_against_dummy(password);
            warn!("login unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AccountError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login inactive user");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.keys.sign(user.id)?;
        info!(user_id = %user.id, "token issued");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AccountError> {
        self.keys
            .verify(token)
            .map_err(|_| AccountError::InvalidCredentials)
    }
}
