//! Identity and authorization state of an execution context
//!
//! Identity crosses execution units only as an [`IdentitySnapshot`]: plain
//! values copied out of the caller's [`UserFacade`] and rebound in the new
//! context through an [`Authenticator`]. No live reference to the caller's
//! user state is ever shared.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::IdentityError;

/// Opaque handle of an existing login session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoginHandle(String);

impl LoginHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
}

/// Identity facts copied by value out of a calling context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub username: Option<String>,
    pub login_handle: Option<LoginHandle>,
    pub authz_disabled: bool,
}

/// The identity subsystem: turns handles and usernames into principals
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login_by_handle(&self, handle: &LoginHandle) -> Result<Principal, IdentityError>;

    async fn login_by_username(&self, username: &str) -> Result<Principal, IdentityError>;
}

/// How an identity was re-established in a new context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebind {
    Handle,
    Username,
    Anonymous,
}

/// Per-context user state
#[derive(Debug, Default)]
pub struct UserFacade {
    principal: Option<Principal>,
    login_handle: Option<LoginHandle>,
    authz_disabled: bool,
    tarpit_disabled: bool,
}

impl UserFacade {
    pub fn username(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.username.as_str())
    }

    pub fn login_handle(&self) -> Option<&LoginHandle> {
        self.login_handle.as_ref()
    }

    pub fn is_authz_bypassed(&self) -> bool {
        self.authz_disabled
    }

    pub fn bypass_authz(&mut self) {
        self.authz_disabled = true;
    }

    pub fn suppress_rate_limiting(&mut self) {
        self.tarpit_disabled = true;
    }

    pub fn is_rate_limiting_suppressed(&self) -> bool {
        self.tarpit_disabled
    }

    /// Bind a principal directly, optionally with the session handle it came from
    pub fn login(&mut self, principal: Principal, handle: Option<LoginHandle>) {
        self.principal = Some(principal);
        self.login_handle = handle;
    }

    pub async fn login_by_username(
        &mut self,
        authenticator: &dyn Authenticator,
        username: &str,
    ) -> Result<(), IdentityError> {
        let principal = authenticator.login_by_username(username).await?;
        self.login(principal, None);
        Ok(())
    }

    pub fn logout(&mut self) {
        self.principal = None;
        self.login_handle = None;
    }

    pub fn snapshot(&self) -> IdentitySnapshot {
        IdentitySnapshot {
            username: self.username().map(String::from),
            login_handle: self.login_handle.clone(),
            authz_disabled: self.authz_disabled,
        }
    }

    /// Re-establish the identity in `snapshot`: the session handle wins,
    /// then the username, otherwise the context stays anonymous.
    /// Authorization posture is not touched here.
    pub async fn restore(
        &mut self,
        snapshot: &IdentitySnapshot,
        authenticator: &dyn Authenticator,
    ) -> Result<Rebind, IdentityError> {
        if let Some(handle) = &snapshot.login_handle {
            let principal = authenticator.login_by_handle(handle).await?;
            debug!("Rebound login session for {}", principal.username);
            self.login(principal, Some(handle.clone()));
            return Ok(Rebind::Handle);
        }

        match snapshot.username.as_deref() {
            Some(username) if !username.is_empty() => {
                self.login_by_username(authenticator, username).await?;
                debug!("Logged in {} in new context", username);
                Ok(Rebind::Username)
            }
            _ => {
                warn!("No user to put in new execution context, rendering anonymously");
                Ok(Rebind::Anonymous)
            }
        }
    }
}
