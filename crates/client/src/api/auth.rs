use api_types::{
    MessageResponse,
    auth::{AuthResponse, LoginRequest, RegisterRequest},
};

use crate::{error::Result, http::ApiClient};

impl ApiClient {
    /// Registers an account and stores the returned credential pair.
    pub async fn auth_register(&self, payload: &RegisterRequest) -> Result<AuthResponse> {
        let res: AuthResponse = self.post_public("/auth/register", payload).await?;
        self.tokens()
            .set_tokens(&res.access_token, &res.refresh_token)?;
        Ok(res)
    }

    /// Logs in and stores the returned credential pair.
    pub async fn auth_login(&self, payload: &LoginRequest) -> Result<AuthResponse> {
        let res: AuthResponse = self.post_public("/auth/login", payload).await?;
        self.tokens()
            .set_tokens(&res.access_token, &res.refresh_token)?;
        Ok(res)
    }

    /// Ends the current session. Local credentials are cleared whatever the
    /// server answers.
    pub async fn auth_logout(&self) -> Result<MessageResponse> {
        let res = self.post_empty("/auth/logout").await;
        self.clear_after_logout();
        res
    }

    /// Ends every session of the account. Local credentials are cleared
    /// whatever the server answers.
    pub async fn auth_logout_all(&self) -> Result<MessageResponse> {
        let res = self.post_empty("/auth/logout-all").await;
        self.clear_after_logout();
        res
    }

    fn clear_after_logout(&self) {
        if let Err(err) = self.tokens().clear_tokens() {
            tracing::warn!("failed to clear stored credentials: {err}");
        }
    }
}
