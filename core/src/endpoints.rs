//! One method per vault API endpoint.
//!
//! Each method checks its credential precondition before anything is sent,
//! then describes path, query and body and lets the verb helpers do the rest.
//! Returned results are tagged with the envelope shape the endpoint produces.
//!
//! The trailing `options` argument is the per-call driver configuration. It
//! overrides the driver's base options; the session token header still wins
//! over both.

use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::client::{RequestParams, StoredSafeClient};
use crate::driver::RequestDriver;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::types::{
    CheckData, CreateObjectData, LoginData, LoginType, LogoutData, ObjectData, PasswordData,
    PasswordParams, PoliciesData, StatusData, TemplateData, UsersData, VaultData,
    VaultMembersData, VaultObjectsData, VaultsData, VersionData,
};

/// Result of an endpoint call on driver `D`.
pub type Reply<T, D> = Result<ApiResponse<T, <D as RequestDriver>::Handle>, ApiError>;

impl<D: RequestDriver> StoredSafeClient<D> {
    fn authed(&self, options: Option<D::Options>) -> Result<RequestParams<D::Options>, ApiError> {
        let mut params = RequestParams::new();
        params.headers = self.auth_headers()?;
        params.options = options;
        Ok(params)
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    /// Log in with a one-time-passcode key: the server receives passphrase,
    /// apikey and OTP concatenated.
    pub async fn login_yubikey(
        &mut self,
        username: &str,
        passphrase: &str,
        otp: &str,
        options: Option<D::Options>,
    ) -> Reply<LoginData, D> {
        let apikey = self.require_apikey()?;
        let keys = format!("{passphrase}{apikey}{otp}");
        let body = json!({ "username": username, "keys": keys });
        self.login(RequestParams::new().body(body), options, username).await
    }

    pub async fn login_totp(
        &mut self,
        username: &str,
        passphrase: &str,
        otp: &str,
        options: Option<D::Options>,
    ) -> Reply<LoginData, D> {
        let apikey = self.require_apikey()?;
        let body = json!({
            "username": username,
            "passphrase": passphrase,
            "otp": otp,
            "logintype": LoginType::Totp.as_str(),
            "apikey": apikey,
        });
        self.login(RequestParams::new().body(body), options, username).await
    }

    /// Certificate login, sent to the mutual-TLS port. The client
    /// certificate itself is the driver's business.
    pub async fn login_smartcard(
        &mut self,
        username: &str,
        passphrase: &str,
        options: Option<D::Options>,
    ) -> Reply<LoginData, D> {
        let apikey = self.require_apikey()?;
        let body = json!({
            "username": username,
            "passphrase": passphrase,
            "logintype": LoginType::Smartcard.as_str(),
            "apikey": apikey,
        });
        self.login(RequestParams::new().body(body).mtls(), options, username).await
    }

    async fn login(
        &mut self,
        mut params: RequestParams<D::Options>,
        options: Option<D::Options>,
        username: &str,
    ) -> Reply<LoginData, D> {
        params.options = options;
        let response = self.post("/auth", params).await;
        self.store_token(&response);
        debug!(username, token_stored = self.token().is_some(), "login finished");
        Ok(response.cast())
    }

    /// End the session. The local token is cleared whatever the server says,
    /// even when no reply arrives.
    pub async fn logout(&mut self, options: Option<D::Options>) -> Reply<LogoutData, D> {
        let params = self.authed(options)?;
        let response = self.get("/auth/logout", params).await;
        if !response.success {
            warn!(status = response.status, "logout not confirmed by server");
        }
        self.clear_token();
        Ok(response.cast())
    }

    pub async fn check(&self, options: Option<D::Options>) -> Reply<CheckData, D> {
        let params = self.authed(options)?;
        Ok(self.post("/auth/check", params).await.cast())
    }

    // -----------------------------------------------------------------------
    // Vaults
    // -----------------------------------------------------------------------

    pub async fn list_vaults(&self, options: Option<D::Options>) -> Reply<VaultsData, D> {
        let params = self.authed(options)?;
        Ok(self.get("/vault", params).await.cast())
    }

    pub async fn vault_objects(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<VaultObjectsData, D> {
        let params = self.authed(options)?;
        Ok(self.get(&format!("/vault/{}", id.to_string()), params).await.cast())
    }

    pub async fn vault_members(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<VaultMembersData, D> {
        let params = self.authed(options)?;
        let path = format!("/vault/{}/members", id.to_string());
        Ok(self.get(&path, params).await.cast())
    }

    pub async fn create_vault(
        &self,
        params: &impl Serialize,
        options: Option<D::Options>,
    ) -> Reply<VaultData, D> {
        let auth = self.authed(options)?;
        let params = auth.body(serde_json::to_value(params)?);
        Ok(self.post("/vault", params).await.cast())
    }

    pub async fn edit_vault(
        &self,
        id: impl ToString,
        params: &impl Serialize,
        options: Option<D::Options>,
    ) -> Reply<VaultData, D> {
        let auth = self.authed(options)?;
        let params = auth.body(serde_json::to_value(params)?);
        Ok(self.put(&format!("/vault/{}", id.to_string()), params).await.cast())
    }

    pub async fn delete_vault(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<StatusData, D> {
        let params = self.authed(options)?;
        Ok(self.delete(&format!("/vault/{}", id.to_string()), params).await.cast())
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Fetch an object without its children (`children=false` is sent).
    pub async fn get_object(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<ObjectData, D> {
        self.get_object_with_children(id, false, options).await
    }

    pub async fn get_object_with_children(
        &self,
        id: impl ToString,
        children: bool,
        options: Option<D::Options>,
    ) -> Reply<ObjectData, D> {
        let params = self.authed(options)?.query("children", children);
        Ok(self.get(&format!("/object/{}", id.to_string()), params).await.cast())
    }

    pub async fn decrypt_object(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<ObjectData, D> {
        let params = self.authed(options)?.query("decrypt", true);
        Ok(self.get(&format!("/object/{}", id.to_string()), params).await.cast())
    }

    pub async fn get_file(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<ObjectData, D> {
        let params = self.authed(options)?.query("filedata", true);
        Ok(self.get(&format!("/object/{}", id.to_string()), params).await.cast())
    }

    pub async fn create_object(
        &self,
        params: &impl Serialize,
        options: Option<D::Options>,
    ) -> Reply<CreateObjectData, D> {
        let auth = self.authed(options)?;
        let params = auth.body(serde_json::to_value(params)?);
        Ok(self.post("/object", params).await.cast())
    }

    pub async fn edit_object(
        &self,
        id: impl ToString,
        params: &impl Serialize,
        options: Option<D::Options>,
    ) -> Reply<CreateObjectData, D> {
        let auth = self.authed(options)?;
        let params = auth.body(serde_json::to_value(params)?);
        Ok(self.put(&format!("/object/{}", id.to_string()), params).await.cast())
    }

    pub async fn delete_object(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<StatusData, D> {
        let params = self.authed(options)?;
        Ok(self.delete(&format!("/object/{}", id.to_string()), params).await.cast())
    }

    pub async fn find(&self, needle: &str, options: Option<D::Options>) -> Reply<ObjectData, D> {
        let params = self.authed(options)?.query("needle", needle);
        Ok(self.get("/find", params).await.cast())
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub async fn list_templates(&self, options: Option<D::Options>) -> Reply<TemplateData, D> {
        let params = self.authed(options)?;
        Ok(self.get("/template", params).await.cast())
    }

    pub async fn get_template(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<TemplateData, D> {
        let params = self.authed(options)?;
        Ok(self.get(&format!("/template/{}", id.to_string()), params).await.cast())
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub async fn list_users(&self, options: Option<D::Options>) -> Reply<UsersData, D> {
        let params = self.authed(options)?;
        Ok(self.get("/user", params).await.cast())
    }

    pub async fn get_user(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<UsersData, D> {
        let params = self.authed(options)?;
        Ok(self.get(&format!("/user/{}", id.to_string()), params).await.cast())
    }

    pub async fn create_user(
        &self,
        params: &impl Serialize,
        options: Option<D::Options>,
    ) -> Reply<UsersData, D> {
        let auth = self.authed(options)?;
        let params = auth.body(serde_json::to_value(params)?);
        Ok(self.post("/user", params).await.cast())
    }

    pub async fn delete_user(
        &self,
        id: impl ToString,
        options: Option<D::Options>,
    ) -> Reply<UsersData, D> {
        let params = self.authed(options)?;
        Ok(self.delete(&format!("/user/{}", id.to_string()), params).await.cast())
    }

    // -----------------------------------------------------------------------
    // Utils
    // -----------------------------------------------------------------------

    pub async fn status_values(&self, options: Option<D::Options>) -> Reply<StatusData, D> {
        let params = self.authed(options)?;
        Ok(self.get("/utils/statusvalues", params).await.cast())
    }

    pub async fn password_policies(&self, options: Option<D::Options>) -> Reply<PoliciesData, D> {
        let params = self.authed(options)?;
        Ok(self.get("/utils/policies", params).await.cast())
    }

    pub async fn version(&self, options: Option<D::Options>) -> Reply<VersionData, D> {
        let params = self.authed(options)?;
        Ok(self.get("/utils/version", params).await.cast())
    }

    pub async fn generate_password(
        &self,
        generator: &PasswordParams,
        options: Option<D::Options>,
    ) -> Reply<PasswordData, D> {
        let mut params = self.authed(options)?;
        params.query = generator.to_query();
        Ok(self.get("/utils/pwgen", params).await.cast())
    }
}
