// External crates
use std::fmt;
use std::future::Future;

/// No credential could be produced.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The token is unset or blank.
    #[error("Synq API token is not set, pass --synq-token or set the SYNQ_TOKEN environment variable")]
    MissingToken,
}

/// Yields the bearer credential sent with every Synq call.
pub trait CredentialProvider {
    /// Token sent as `authorization: Bearer <token>`.
    fn access_token(&self) -> impl Future<Output = Result<String, CredentialError>> + Send;
}

/// Uses the configured long-lived token as the bearer credential.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Surrounding whitespace is trimmed. An empty token fails at upload time.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String, CredentialError> {
        if self.token.is_empty() {
            return Err(CredentialError::MissingToken);
        }
        Ok(self.token.clone())
    }
}
