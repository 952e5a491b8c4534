//! In-memory collaborators for unit and router tests.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    geoip::{GeoIpError, GeoIpLookup},
    users::{
        model::{NewUser, User},
        repo::{RepoError, UserRepository},
    },
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
    save_calls: AtomicUsize,
}

impl InMemoryUserRepository {
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: NewUser) -> Result<User, RepoError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::DuplicateEmail);
        }
        let stored = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            ip: user.ip,
            country: Some(user.country),
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(stored.clone());
        Ok(stored)
    }

    async fn get_all(&self) -> Result<Vec<User>, RepoError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}

/// Returns a fixed country, or fails every lookup.
pub struct StubGeoIp {
    country: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubGeoIp {
    pub fn country(code: &str) -> Self {
        Self {
            country: Some(code.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            country: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answers with `code` only after `delay`.
    pub fn slow(code: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::country(code)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoIpLookup for StubGeoIp {
    async fn lookup(&self, ip: &str) -> Result<String, GeoIpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.country {
            Some(code) => Ok(code.clone()),
            None => Err(GeoIpError::Rejected {
                ip: ip.to_string(),
                message: "stub failure".into(),
            }),
        }
    }
}
