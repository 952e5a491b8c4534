use std::net::IpAddr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{model::User, service::Registration};

pub const MIN_PASSWORD_LEN: usize = 6;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for user registration.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[schema(example = "Bob")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "bob@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "1.1.1.1")]
    pub ip: String,
    #[serde(default)]
    #[schema(min_length = 6)]
    pub password: String,
}

impl RegisterRequest {
    /// Normalizes the email and checks every field, returning the first problem.
    pub fn validate(self) -> Result<Registration, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("name is required".into());
        }
        let email = self.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err("invalid email address".into());
        }
        let ip = self.ip.trim().to_string();
        if ip.parse::<IpAddr>().is_err() {
            return Err("invalid IP address".into());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        Ok(Registration {
            name,
            email,
            ip,
            password: self.password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(mut self) -> Result<Self, String> {
        self.email = self.email.trim().to_lowercase();
        if !is_valid_email(&self.email) {
            return Err("invalid email address".into());
        }
        if self.password.is_empty() {
            return Err("password is required".into());
        }
        Ok(self)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "UA")]
    pub country: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            ip: u.ip,
            country: u.country,
            created_at: u.created_at,
        }
    }
}
