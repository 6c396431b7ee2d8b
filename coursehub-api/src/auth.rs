use std::fmt;

use crate::{Error, Time, UserId};

/// Bearer credential handed out by the backend at login
///
/// Only its shape is checked here: a JWT made of exactly three non-empty
/// dot-separated segments. Signature and expiry are the server's business.
#[derive(Clone, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(..)")
    }
}

impl AuthToken {
    pub fn parse(raw: &str) -> Result<AuthToken, Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::MissingToken);
        }
        let segments = raw.split('.').collect::<Vec<_>>();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(Error::MalformedToken);
        }
        Ok(AuthToken(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the payload segment, without verifying anything
    pub fn claims(&self) -> Result<Claims, Error> {
        let payload = self.0.split('.').nth(1).ok_or(Error::MalformedToken)?;
        let payload = base64::decode_config(payload.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
            .map_err(|_| Error::MalformedToken)?;
        serde_json::from_slice(&payload).map_err(|_| Error::MalformedToken)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Claims {
    pub id: UserId,

    /// Seconds since the epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn is_expired_at(&self, now: Time) -> bool {
        match self.exp {
            Some(exp) => exp.saturating_mul(1000) < now.timestamp_millis(),
            None => false,
        }
    }
}
