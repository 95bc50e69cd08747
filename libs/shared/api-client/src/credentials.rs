/// Supplies the bearer token attached to outgoing API requests.
///
/// Implementations own the session lifecycle; the client only asks for the
/// current token at request time, so a logout takes effect on the next call.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed credentials, mainly for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()) }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
