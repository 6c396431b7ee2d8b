use crate::api::{self, AuthToken, Claims, Time, UserId};

/// Credential of the logged-in user, with whatever its payload says
///
/// The claims are read without checking the signature: they only drive
/// local decisions (whose profile to load, which comments are ours) and the
/// server re-checks everything.
#[derive(Clone, Debug)]
pub struct Session {
    token: AuthToken,
    claims: Option<Claims>,
}

impl Session {
    pub fn new(token: AuthToken) -> Session {
        let claims = match token.claims() {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(error = %e, "could not decode the token payload");
                None
            }
        };
        Session { token, claims }
    }

    pub fn from_raw(raw: &str) -> Result<Session, api::Error> {
        AuthToken::parse(raw).map(Session::new)
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.claims.as_ref().map(|c| &c.id)
    }

    pub fn require_user(&self) -> Result<&UserId, api::Error> {
        self.user_id().ok_or(api::Error::MalformedToken)
    }

    pub fn is_expired_at(&self, now: Time) -> bool {
        self.claims.as_ref().map_or(false, |c| c.is_expired_at(now))
    }

    pub fn ensure_fresh(&self, now: Time) -> Result<(), api::Error> {
        match self.is_expired_at(now) {
            true => Err(api::Error::ExpiredToken),
            false => Ok(()),
        }
    }
}

/// Credential to send for a call that requires being logged in
pub(crate) fn require(session: Option<&Session>) -> Result<&AuthToken, api::Error> {
    session.map(Session::token).ok_or(api::Error::MissingToken)
}
