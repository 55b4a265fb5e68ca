//! services/app/src/adapters/firebase_auth.rs
//!
//! `IdentityService` backed by the Firebase Auth (Identity Toolkit) REST API.
//!
//! The adapter keeps the signed-in user's ID token in memory so the Firestore
//! adapter can authorize its requests. Tokens are refreshed through the secure
//! token endpoint shortly before they expire.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shortcut_core::domain::Session;
use shortcut_core::ports::{AuthError, IdentityService, PortResult, SessionStream};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::session_events::SessionBroadcaster;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Refresh this long before the provider's stated expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    /// Seconds, sent as a string.
    expires_in: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

/// The secure token endpoint answers in snake_case.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
struct Tokens {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Tokens {
    fn new(id_token: String, refresh_token: String, expires_in: &str) -> Self {
        let seconds = expires_in.trim().parse::<i64>().unwrap_or(3600);
        Self {
            id_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(seconds - EXPIRY_MARGIN_SECS),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

//=========================================================================================
// Adapter
//=========================================================================================

pub struct FirebaseAuthAdapter {
    client: Client,
    api_key: String,
    tokens: RwLock<Option<Tokens>>,
    events: SessionBroadcaster,
}

impl FirebaseAuthAdapter {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            tokens: RwLock::new(None),
            events: SessionBroadcaster::new(None),
        }
    }

    /// A valid ID token for the signed-in user, refreshing it if it has expired.
    pub async fn id_token(&self) -> Option<String> {
        let current = self.tokens.read().await.clone()?;
        if !current.is_expired() {
            return Some(current.id_token);
        }

        match self.refresh(&current.refresh_token).await {
            Ok(fresh) => {
                let token = fresh.id_token.clone();
                *self.tokens.write().await = Some(fresh);
                debug!("ID token refreshed.");
                Some(token)
            }
            Err(e) => {
                warn!("ID token refresh failed: {e}");
                None
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Tokens, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let response = self
            .client
            .post(format!("{}?key={}", SECURE_TOKEN_URL, self.api_key))
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let body: RefreshResponse = read_json(response).await?;
        Ok(Tokens::new(body.id_token, body.refresh_token, &body.expires_in))
    }

    async fn post_account<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, AuthError> {
        let url = format!(
            "{}/accounts:{}?key={}",
            IDENTITY_TOOLKIT_URL, method, self.api_key
        );
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        read_json(response).await
    }

    async fn establish(&self, account: AccountResponse) -> Session {
        let session = Session {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name.filter(|n| !n.is_empty()),
        };
        *self.tokens.write().await = Some(Tokens::new(
            account.id_token,
            account.refresh_token,
            &account.expires_in,
        ));
        self.events.publish(Some(session.clone()));
        session
    }
}

/// Decodes a success body, or maps the provider's error code.
async fn read_json<R: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<R, AuthError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<R>()
            .await
            .map_err(|e| AuthError::Unexpected(e.to_string()));
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => Err(AuthError::from_provider_code(&envelope.error.message)),
        Err(_) => {
            error!(status = %status, error = %text, "Identity provider returned an unreadable error.");
            Err(AuthError::Unexpected(format!("HTTP {}", status)))
        }
    }
}

#[async_trait]
impl IdentityService for FirebaseAuthAdapter {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let account: AccountResponse = self
            .post_account(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        let session = self.establish(account).await;
        info!(uid = %session.uid, "Signed in.");
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        let mut account: AccountResponse = self
            .post_account(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        // The account exists at this point; a failed profile update only loses the name.
        let update: Result<ProfileUpdateResponse, AuthError> = self
            .post_account(
                "update",
                &ProfileUpdateRequest {
                    id_token: &account.id_token,
                    display_name,
                    return_secure_token: true,
                },
            )
            .await;
        match update {
            Ok(updated) => {
                account.display_name = updated.display_name.or(Some(display_name.to_string()));
                if let (Some(id), Some(refresh), Some(expires)) =
                    (updated.id_token, updated.refresh_token, updated.expires_in)
                {
                    account.id_token = id;
                    account.refresh_token = refresh;
                    account.expires_in = expires;
                }
            }
            Err(e) => warn!(uid = %account.local_id, "Could not set display name: {e}"),
        }

        let session = self.establish(account).await;
        info!(uid = %session.uid, "Account created.");
        Ok(session)
    }

    async fn sign_out(&self) -> PortResult<()> {
        self.tokens.write().await.take();
        self.events.publish(None);
        info!("Signed out.");
        Ok(())
    }

    async fn current_session(&self) -> Option<Session> {
        self.events.current()
    }

    fn session_events(&self) -> SessionStream {
        self.events.stream()
    }
}
