use std::error::Error;
use std::fmt;

use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    Expired,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Missing => write!(
                f,
                "no credentials configured; set an API key for reads or an access token"
            ),
            AuthError::Expired => write!(f, "access token is expired or was rejected"),
        }
    }
}

impl Error for AuthError {}

/// Bearer token obtained by an external sign-in flow.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<OffsetDateTime>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<OffsetDateTime>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAuth<'a> {
    ApiKey(&'a str),
    Bearer(&'a str),
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    api_key: Option<String>,
    access_token: Option<AccessToken>,
}

impl Credentials {
    pub fn new(api_key: Option<String>, access_token: Option<AccessToken>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            access_token: access_token.filter(|token| !token.secret.trim().is_empty()),
        }
    }

    /// Reads prefer the API key and fall back to the bearer token.
    pub fn for_read(&self, now: OffsetDateTime) -> Result<ReadAuth<'_>, AuthError> {
        if let Some(key) = self.api_key.as_deref() {
            return Ok(ReadAuth::ApiKey(key));
        }
        self.bearer(now).map(ReadAuth::Bearer)
    }

    /// Writes need a signed-in session; an API key alone is read-only.
    pub fn for_write(&self, now: OffsetDateTime) -> Result<&str, AuthError> {
        self.bearer(now)
    }

    fn bearer(&self, now: OffsetDateTime) -> Result<&str, AuthError> {
        match &self.access_token {
            None => Err(AuthError::Missing),
            Some(token) if token.is_expired(now) => Err(AuthError::Expired),
            Some(token) => Ok(token.secret()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token)
            .finish()
    }
}
