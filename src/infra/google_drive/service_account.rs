// =============================================================================
// SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// Exchanges a Google service-account key for a short-lived access token and
// hands it to the core as an opaque `Session`.
//
// **Setup:**
// 1. Create a service account in Google Cloud Console and enable the Drive API
// 2. Create a JSON key for it
// 3. Share the textbook folder with the service account email (Viewer)
// 4. Set one of:
//    - `GOOGLE_SERVICE_ACCOUNT_KEY` - Path to the JSON key file
//    - `GOOGLE_SERVICE_ACCOUNT_JSON` - The JSON content directly (for deployment)

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::core::books::{BookError, Session};
use crate::core::diagnostics::{DiagnosticEvent, DiagnosticSink};

const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    /// The service account email (used as issuer in JWT).
    client_email: String,

    /// The private key in PEM format.
    private_key: String,

    /// Where to exchange the JWT for an access token.
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    /// Max 1 hour after `iat`.
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Authenticator for Drive with service account credentials.
pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    pub async fn from_file(path: &str) -> Result<Self, BookError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, BookError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)
            .map_err(|e| BookError::Auth(format!("invalid service account JSON: {}", e)))?;
        Ok(Self {
            credentials,
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Loads credentials from the environment.
    ///
    /// Returns `MissingCredentials` when neither variable is set, so callers
    /// can tell "not configured" apart from "configured but broken".
    pub async fn from_env() -> Result<Self, BookError> {
        if let Ok(path) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            return Self::from_file(&path).await;
        }

        if let Ok(json) = std::env::var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            return Self::from_json(&json);
        }

        Err(BookError::MissingCredentials)
    }

    #[allow(dead_code)]
    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    /// A session with a valid access token, refreshing it if necessary.
    pub async fn session(&self) -> Result<Session, BookError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + Duration::from_secs(60) {
                    return Ok(Session::new(token.token.clone()));
                }
            }
        }

        let (new_token, lifetime) = self.fetch_new_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(CachedToken {
                token: new_token.clone(),
                expires_at: SystemTime::now() + lifetime,
            });
        }

        tracing::debug!(account = %self.credentials.client_email, "Obtained Drive access token");
        Ok(Session::new(new_token))
    }

    async fn fetch_new_token(&self) -> Result<(String, Duration), BookError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| BookError::Auth(e.to_string()))?
            .as_secs();

        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: DRIVE_READONLY_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| BookError::Auth(format!("invalid private key: {}", e)))?;
        let jwt = encode(&header, &claims, &key).map_err(|e| BookError::Auth(e.to_string()))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BookError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BookError::Auth(format!(
                "Token exchange failed ({}): {}",
                status, text
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| BookError::Auth(e.to_string()))?;

        // Google issues hour-long tokens; refresh a little early either way.
        let lifetime = token_response
            .expires_in
            .map(|secs| Duration::from_secs(secs.saturating_sub(300)))
            .unwrap_or(Duration::from_secs(55 * 60));

        Ok((token_response.access_token, lifetime))
    }
}

/// Turns loaded credentials into a session, or `None` when there is none.
///
/// "Not configured" is only a warning. A key that is present but unusable, or
/// a failed token exchange, is recorded as `credentials_failed` so the log
/// tells the two apart.
pub async fn acquire_session(
    loaded: Result<ServiceAccountAuth, BookError>,
    diagnostics: &dyn DiagnosticSink,
) -> Option<Session> {
    let result = match loaded {
        Ok(auth) => auth.session().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(session) => Some(session),
        Err(BookError::MissingCredentials) => {
            tracing::warn!("No Google service account configured");
            None
        }
        Err(e) => {
            tracing::error!("Failed to obtain Drive access token: {}", e);
            diagnostics.record(DiagnosticEvent::new(
                "credentials_failed",
                serde_json::json!({ "error": e.to_string() }),
            ));
            None
        }
    }
}
