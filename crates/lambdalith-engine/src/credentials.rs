use std::fmt;

use crate::error::CredentialError;

pub const UPSTASH_EMAIL: &str = "UPSTASH_EMAIL";
pub const UPSTASH_API_KEY: &str = "UPSTASH_API_KEY";

/// Credentials of the managed cache provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub upstash_email: String,
    pub upstash_api_key: String,
}

impl Credentials {
    /// Read credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` naming every variable that is unset or blank.
    pub fn from_env() -> std::result::Result<Self, CredentialError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`. Blank values count as missing.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` naming every variable that is unset or blank.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, CredentialError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let email = read(UPSTASH_EMAIL);
        let api_key = read(UPSTASH_API_KEY);
        match (email, api_key) {
            (Some(upstash_email), Some(upstash_api_key)) => Ok(Self {
                upstash_email,
                upstash_api_key,
            }),
            (email, api_key) => {
                let mut names = Vec::new();
                if email.is_none() {
                    names.push(UPSTASH_EMAIL);
                }
                if api_key.is_none() {
                    names.push(UPSTASH_API_KEY);
                }
                Err(CredentialError::MissingCredential { names })
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("upstash_email", &self.upstash_email)
            .field("upstash_api_key", &"<redacted>")
            .finish()
    }
}
