use crate::rest::{RestClient, TokenResponse};
use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const APP_NAME: &str = "steelworks";
const TOKEN_KEY: &str = "backend_session";

/// Refresh when less than this much lifetime is left.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredTokens {
    pub fn from_response(response: &TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at: now + Duration::seconds(response.expires_in),
        }
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// The claims we read from an access token. The signature is the
/// backend's business; this is only used for display and expiry.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
}

pub fn decode_claims(token: &str) -> Result<Claims> {
    let payload = token
        .split('.')
        .nth(1)
        .context("Access token is not a JWT")?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("Access token payload is not base64url")?;
    serde_json::from_slice(&bytes).context("Access token payload is not valid JSON")
}

/// Session tokens kept in the OS keyring.
pub struct TokenStore;

impl TokenStore {
    fn entry(&self) -> Result<Entry> {
        Entry::new(APP_NAME, TOKEN_KEY).map_err(|e| anyhow::anyhow!("Keyring error: {}", e))
    }

    pub fn load(&self) -> Result<Option<StoredTokens>> {
        match self.entry()?.get_password() {
            Ok(serialized) => serde_json::from_str(&serialized)
                .map(Some)
                .context("Failed to deserialize session tokens"),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Keyring error: {}", e)),
        }
    }

    pub fn save(&self, tokens: &StoredTokens) -> Result<()> {
        let serialized =
            serde_json::to_string(tokens).context("Failed to serialize session tokens")?;
        self.entry()?
            .set_password(&serialized)
            .map_err(|e| anyhow::anyhow!("Keyring error: {}", e))
    }

    pub fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Keyring error: {}", e)),
        }
    }
}

/// Picks up a stored session, refreshing it when it is about to expire.
/// A session that cannot be refreshed is dropped.
pub async fn restore_session(client: &RestClient, store: &TokenStore) -> Result<Option<StoredTokens>> {
    let Some(tokens) = store.load()? else {
        return Ok(None);
    };
    if !tokens.needs_refresh(Utc::now()) {
        client.set_access_token(Some(tokens.access_token.clone()));
        return Ok(Some(tokens));
    }

    match client.refresh(&tokens.refresh_token).await {
        Ok(response) => {
            let fresh = StoredTokens::from_response(&response, Utc::now());
            store.save(&fresh)?;
            client.set_access_token(Some(fresh.access_token.clone()));
            info!("Refreshed stored session");
            Ok(Some(fresh))
        }
        Err(e) => {
            warn!("Stored session could not be refreshed: {}", e);
            store.clear()?;
            Ok(None)
        }
    }
}

pub async fn sign_in(
    client: &RestClient,
    store: &TokenStore,
    email: &str,
    password: &str,
) -> Result<StoredTokens> {
    let response = client
        .sign_in_with_password(email, password)
        .await
        .context("Sign-in rejected")?;
    let tokens = StoredTokens::from_response(&response, Utc::now());
    store.save(&tokens)?;
    client.set_access_token(Some(tokens.access_token.clone()));
    info!("Signed in as {}", response.user.email.as_deref().unwrap_or(email));
    Ok(tokens)
}
