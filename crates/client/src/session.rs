use api_types::{
    MessageResponse,
    auth::{LoginRequest, RegisterRequest},
    user::UserProfile,
};

use crate::{Kaizen, error::Result};

/// Authentication state of a [`Kaizen`] context.
#[derive(Clone)]
pub struct Session {
    kaizen: Kaizen,
}

impl Session {
    pub(crate) fn new(kaizen: Kaizen) -> Self {
        Self { kaizen }
    }

    pub fn is_authenticated(&self) -> bool {
        self.kaizen.tokens().has_tokens()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let payload = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let res = self.kaizen.api().auth_login(&payload).await?;
        tracing::info!(user_id = res.user.id, "logged in");
        Ok(res.user)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<UserProfile> {
        let payload = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let res = self.kaizen.api().auth_register(&payload).await?;
        tracing::info!(user_id = res.user.id, "registered");
        Ok(res.user)
    }

    /// Ends this session. Credentials and cached data are dropped even when
    /// the server call fails; its error is still returned.
    pub async fn logout(&self) -> Result<MessageResponse> {
        let res = self.kaizen.api().auth_logout().await;
        self.kaizen.cache().clear().await;
        res
    }

    /// Ends every session of the account, with the same local cleanup as
    /// [`Session::logout`].
    pub async fn logout_all(&self) -> Result<MessageResponse> {
        let res = self.kaizen.api().auth_logout_all().await;
        self.kaizen.cache().clear().await;
        res
    }

    /// Cached profile of the logged-in user.
    pub async fn profile(&self) -> Result<UserProfile> {
        let profile = self.kaizen.profile().fetch().await?;
        Ok(profile.as_ref().clone())
    }

    /// Resolves the current user, or `None` when there is no usable
    /// session. Non-auth failures are returned as errors.
    pub async fn check_auth(&self) -> Result<Option<UserProfile>> {
        if !self.is_authenticated() {
            return Ok(None);
        }
        match self.kaizen.profile().refetch().await {
            Ok(profile) => Ok(Some(profile.as_ref().clone())),
            Err(err) if err.kind() == crate::ErrorKind::Auth => {
                tracing::debug!("stored session rejected: {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
