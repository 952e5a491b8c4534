use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::{claims::Claims, error::TokenError};
use crate::{config::JwtConfig, state::AppState};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Parses a lifetime such as `24h`, `90s` or `1h30m`.
///
/// Supported units are `ms`, `s`, `m`, `h` and `d`. Segments must be
/// contiguous and cover the whole input.
pub fn parse_ttl(raw: &str) -> Result<Duration, TokenError> {
    lazy_static! {
        static ref SEGMENT_RE: Regex = Regex::new(r"(\d+)(ms|s|m|h|d)").unwrap();
    }
    let invalid = || TokenError::InvalidConfiguration(format!("unparseable ttl {raw:?}"));

    let raw_trimmed = raw.trim();
    let mut cursor = 0;
    let mut total = Duration::ZERO;
    for caps in SEGMENT_RE.captures_iter(raw_trimmed) {
        let whole = caps.get(0).ok_or_else(invalid)?;
        if whole.start() != cursor {
            return Err(invalid());
        }
        cursor = whole.end();

        let amount: u64 = caps[1].parse().map_err(|_| invalid())?;
        let unit_ms: u64 = match &caps[2] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(invalid()),
        };
        let segment = amount.checked_mul(unit_ms).ok_or_else(invalid)?;
        total = total
            .checked_add(Duration::from_millis(segment))
            .ok_or_else(invalid)?;
    }

    if cursor == 0 || cursor != raw_trimmed.len() {
        return Err(invalid());
    }
    if total < Duration::from_secs(1) {
        return Err(TokenError::InvalidConfiguration(format!(
            "ttl {raw:?} is shorter than one second"
        )));
    }
    Ok(total)
}

pub fn issue(subject: &str, secret: &str, ttl: &str) -> Result<String, TokenError> {
    issue_at(subject, secret, ttl, OffsetDateTime::now_utc())
}

/// Signs an HS256 token for `subject` valid from `now` for `ttl`.
pub fn issue_at(
    subject: &str,
    secret: &str,
    ttl: &str,
    now: OffsetDateTime,
) -> Result<String, TokenError> {
    let ttl = parse_ttl(ttl)?;
    if secret.is_empty() {
        return Err(TokenError::InvalidConfiguration("empty signing secret".into()));
    }
    let lifetime = i64::try_from(ttl.as_secs())
        .map(TimeDuration::seconds)
        .map_err(|_| TokenError::InvalidConfiguration("ttl out of range".into()))?;
    let exp = now
        .checked_add(lifetime)
        .ok_or_else(|| TokenError::InvalidConfiguration("ttl out of range".into()))?;

    let claims = Claims {
        sub: subject.to_string(),
        iat: now.unix_timestamp(),
        exp: exp.unix_timestamp(),
    };
    let token = encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)?;
    debug!(sub = %subject, exp = claims.exp, "jwt signed");
    Ok(token)
}

/// Verifies signature, algorithm and expiry, returning the subject.
pub fn verify(token: &str, secret: &str) -> Result<String, TokenError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(TokenError::InvalidToken)?;
    // jsonwebtoken only rejects once `exp` is in the past; the expiry second is already invalid
    if data.claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
        return Err(TokenError::InvalidToken(ErrorKind::ExpiredSignature.into()));
    }
    debug!(sub = %data.claims.sub, "jwt verified");
    Ok(data.claims.sub)
}

/// Signing material derived from the application config.
#[derive(Clone)]
pub struct JwtKeys {
    pub secret: String,
    pub ttl: String,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(jwt: &JwtConfig) -> Self {
        Self {
            secret: jwt.secret.clone(),
            ttl: jwt.ttl.clone(),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, subject: &str) -> Result<String, TokenError> {
        issue(subject, &self.secret, &self.ttl)
    }

    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        verify(token, &self.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "dev-secret";
    // {"alg":"none","typ":"JWT"} . {} . <empty signature>
    const NONE_ALG_TOKEN: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.e30.";

    #[test]
    fn parse_ttl_accepts_simple_and_compound_values() {
        assert_eq!(parse_ttl("24h").unwrap(), Duration::from_secs(24 * 3600));
        assert_eq!(parse_ttl("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_ttl("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_ttl("1500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_ttl(" 7d ").unwrap(), Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn parse_ttl_rejects_garbage() {
        for raw in ["", "h", "24", "24x", "1h 30m", "abc1h", "1h!", "0s", "999ms"] {
            assert!(
                matches!(parse_ttl(raw), Err(TokenError::InvalidConfiguration(_))),
                "{raw:?} should be rejected"
            );
        }
        assert!(parse_ttl("99999999999999999999h").is_err());
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let token = issue("bob@example.com", SECRET, "1h").expect("sign");
        let sub = verify(&token, SECRET).expect("verify");
        assert_eq!(sub, "bob@example.com");
    }

    #[test]
    fn issue_rejects_unparseable_ttl_and_empty_secret() {
        assert!(matches!(
            issue("bob@example.com", SECRET, "forever"),
            Err(TokenError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            issue("bob@example.com", "", "1h"),
            Err(TokenError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let token = issue_at("bob@example.com", SECRET, "1h", issued).expect("sign");
        assert!(matches!(
            verify(&token, SECRET),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_is_rejected_in_its_expiry_second() {
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(1);
        let token = issue_at("bob@example.com", SECRET, "1h", issued).expect("sign");
        assert!(matches!(
            verify(&token, SECRET),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_near_expiry_is_still_valid() {
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(59);
        let token = issue_at("bob@example.com", SECRET, "1h", issued).expect("sign");
        assert!(verify(&token, SECRET).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue("bob@example.com", "secret-A", "1h").expect("sign");
        assert!(matches!(
            verify(&token, "secret-B"),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: "bob@example.com".into(),
            iat: now.unix_timestamp(),
            exp: (now + TimeDuration::hours(1)).unix_timestamp(),
        };
        let hs512 = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(verify(&hs512, SECRET).is_err());
        assert!(verify(NONE_ALG_TOKEN, SECRET).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify("", SECRET).is_err());
        assert!(verify("not.a.jwt", SECRET).is_err());
    }

    #[test]
    fn keys_from_state_use_configured_secret() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign("alice@example.com").unwrap();
        assert_eq!(keys.verify(&token).unwrap(), "alice@example.com");
        assert_eq!(verify(&token, &state.config.jwt.secret).unwrap(), "alice@example.com");
    }
}
