use std::fmt;
use std::sync::RwLock;

use tracing::{info, warn};

use shared_api_client::CredentialProvider;
use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::jwt::decode_session;

/// An authenticated session: the decoded user plus the raw bearer token.
#[derive(Clone)]
pub struct Session {
    pub user: User,
    token: String,
}

impl Session {
    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Email when the token carried one, then name, then the user id.
    pub fn display_name(&self) -> &str {
        self.user
            .email
            .as_deref()
            .or(self.user.name.as_deref())
            .unwrap_or(&self.user.id)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Holds the current session from login until explicit logout, and hands
/// its token to the API client.
pub struct SessionStore {
    jwt_secret: Option<String>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.session_jwt_secret.clone(),
            current: RwLock::new(None),
        }
    }

    pub fn login(&self, token: &str) -> Result<Session, AppError> {
        let user = decode_session(token, self.jwt_secret.as_deref()).map_err(|e| {
            warn!("Rejected session token: {}", e);
            AppError::Auth(e)
        })?;

        let session = Session {
            user,
            token: token.to_string(),
        };

        info!("Session started for user {} as {}", session.user_id(), session.role());
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());

        Ok(session)
    }

    pub fn logout(&self) {
        let previous = self.current.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(session) = previous {
            info!("Session ended for user {}", session.user_id());
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.current().map(|session| session.role())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl CredentialProvider for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|session| session.token.clone())
    }
}
