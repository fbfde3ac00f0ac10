use api_types::{
    MessageResponse,
    user::{ApiKey, ApiKeyCreate, ApiKeyCreated, ProfileUpdate, User},
};

use crate::{error::Result, http::ApiClient};

impl ApiClient {
    pub async fn me_get(&self) -> Result<User> {
        self.get("/users/me").await
    }

    pub async fn me_update(&self, payload: &ProfileUpdate) -> Result<User> {
        self.put("/users/me", payload).await
    }

    pub async fn api_keys_list(&self) -> Result<Vec<ApiKey>> {
        self.get("/users/api-keys").await
    }

    pub async fn api_key_create(&self, payload: &ApiKeyCreate) -> Result<ApiKeyCreated> {
        self.post("/users/api-keys", payload).await
    }

    pub async fn api_key_delete(&self, id: i64) -> Result<MessageResponse> {
        self.delete(&format!("/users/api-keys/{id}")).await
    }
}
