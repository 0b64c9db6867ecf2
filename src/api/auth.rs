use crate::api::{AuthSession, IdentityProvider};
use crate::error::AuthError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Value, json};

/// Email/password identity provider over the identity toolkit REST API.
pub struct IdentityClient {
    pub http: HttpClient,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Map a provider error code (e.g. `INVALID_PASSWORD : detail`) onto the error taxonomy.
pub fn classify_error(message: &str) -> AuthError {
    let code = message.split([' ', ':']).next().unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" | "USER_DISABLED" => {
            AuthError::BadCredential
        }
        _ => AuthError::Rejected(code.to_string()),
    }
}

impl IdentityClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_http(HttpClient::new(), base_url, api_key)
    }

    pub fn with_http(http: HttpClient, base_url: &str, api_key: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key: api_key.to_string() }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, action, self.api_key)
    }

    async fn call(&self, action: &str, body: Value) -> Result<Value, AuthError> {
        let resp = self
            .http
            .post(self.endpoint(action))
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let status = resp.status();
        let json: Value = resp.json().await.map_err(|e| AuthError::Transport(e.to_string()))?;
        if !status.is_success() {
            let message = json
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("UNKNOWN");
            log::warn!("identity provider {action} failed with HTTP {status}: {message}");
            return Err(classify_error(message));
        }
        Ok(json)
    }

    async fn account(&self, action: &str, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let json = self
            .call(action, json!({ "email": email, "password": password, "returnSecureToken": true }))
            .await?;
        let acct: AccountResponse =
            serde_json::from_value(json).map_err(|e| AuthError::Rejected(format!("malformed response: {e}")))?;
        Ok(AuthSession {
            uid: acct.local_id,
            email: if acct.email.is_empty() { email.to_string() } else { acct.email },
            id_token: acct.id_token,
            refresh_token: acct.refresh_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.account("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.account("signUp", email, password).await
    }

    async fn update_display_name(&self, session: &AuthSession, name: &str) -> Result<(), AuthError> {
        self.call("update", json!({ "idToken": session.id_token, "displayName": name, "returnSecureToken": false }))
            .await
            .map(|_| ())
    }

    // ID tokens are bearer tokens with a fixed lifetime; signing out means forgetting them.
    async fn sign_out(&self, session: &AuthSession) -> Result<(), AuthError> {
        log::info!("signed out {}", session.email);
        Ok(())
    }
}
