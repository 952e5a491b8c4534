use std::sync::Arc;

use lazy_static::lazy_static;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    error::UserError,
    model::{NewUser, User},
    repo::UserRepository,
};
use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    geoip::GeoIpLookup,
};

lazy_static! {
    // Verified against when the email is unknown so both login failures cost the same.
    static ref DUMMY_HASH: Option<String> = hash_password("geoauth-timing-equalizer").ok();
}

/// Registration input that already passed boundary validation.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub ip: String,
    pub password: String,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    geoip: Arc<dyn GeoIpLookup>,
    keys: JwtKeys,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, geoip: Arc<dyn GeoIpLookup>, keys: JwtKeys) -> Self {
        lazy_static::initialize(&DUMMY_HASH);
        Self { repo, geoip, keys }
    }

    /// Enriches with the caller's country, hashes the password and persists.
    /// Nothing is written unless the lookup succeeds.
    #[instrument(skip(self, input), fields(email = %input.email, ip = %input.ip))]
    pub async fn register(&self, input: Registration) -> Result<User, UserError> {
        let ip = input.ip.trim();
        if ip.is_empty() {
            warn!("user IP is empty");
            return Err(UserError::InvalidInput("user IP is required".into()));
        }

        let country = self.geoip.lookup(ip).await.map_err(|e| {
            error!(error = %e, "geoip lookup failed");
            UserError::EnrichmentFailed(e)
        })?;

        let password_hash = hash_password(&input.password).map_err(UserError::Hashing)?;

        let user = self
            .repo
            .save(NewUser {
                name: input.name,
                email: input.email,
                ip: ip.to_string(),
                country,
                password_hash,
            })
            .await
            .map_err(|e| {
                error!(error = %e, "save user failed");
                UserError::PersistenceFailed(e)
            })?;

        info!(user_id = %user.id, country = ?user.country, "user saved");
        Ok(user)
    }

    /// Returns a signed token for valid credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, UserError> {
        let user = self
            .repo
            .get_by_email(email)
            .await
            .map_err(UserError::Repository)?;

        let Some(user) = user else {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                // only the time spent matters here
                let _ = verify_password(password, dummy);
            }
            warn!("login unknown email");
            return Err(UserError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash).map_err(UserError::Hashing)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(UserError::InvalidCredentials);
        }

        let token = self.keys.sign(&user.email).map_err(|e| {
            error!(error = %e, "generate token failed");
            UserError::TokenIssuanceFailed(e)
        })?;

        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    pub async fn list(&self) -> Result<Vec<User>, UserError> {
        let users = self.repo.get_all().await.map_err(UserError::Repository)?;
        info!(count = users.len(), "users fetched");
        Ok(users)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        self.repo.get_by_id(id).await.map_err(UserError::Repository)
    }
}
