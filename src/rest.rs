use crate::auth::decode_claims;
use crate::gateway::{Gateway, GatewayError};
use crate::models::{GalleryImage, ImageId, Message, MessageId, MessageStatus, NewGalleryImage, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Client, Method, Request, StatusCode};
use hyper_rustls::HttpsConnector;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{debug, warn};

const MESSAGES_TABLE: &str = "messages";
const GALLERY_TABLE: &str = "gallery";
const GALLERY_BUCKET: &str = "gallery";
const JSON: &str = "application/json";

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: AuthUser,
}

#[derive(Serialize)]
struct StatusPatch {
    status: MessageStatus,
}

/// Talks to the hosted backend's REST, auth and storage endpoints.
pub struct RestClient {
    http: Client<HttpsConnector<HttpConnector>>,
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl RestClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, GatewayError> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();
        Ok(Self {
            http: Client::builder().build(https),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: RwLock::new(None),
        })
    }

    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.access_token.write() {
            *slot = token;
        }
    }

    fn access_token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|t| t.clone())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<(Vec<u8>, &str)>,
        prefer: Option<&str>,
    ) -> Result<Bytes, GatewayError> {
        let bearer = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer));
        if let Some(prefer) = prefer {
            builder = builder.header("Prefer", prefer);
        }
        let request = match body {
            Some((bytes, content_type)) => builder
                .header(CONTENT_TYPE, content_type)
                .body(Body::from(bytes))?,
            None => builder.body(Body::empty())?,
        };

        debug!("{} {}", method, path);
        let response = self.http.request(request).await?;
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized);
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let bytes = self.send(Method::GET, path, None, None).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        prefer: Option<&str>,
    ) -> Result<T, GatewayError> {
        let payload = serde_json::to_vec(body)?;
        let bytes = self.send(method, path, Some((payload, JSON)), prefer).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, GatewayError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send_json(Method::POST, "/auth/v1/token?grant_type=password", &body, None)
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, GatewayError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        self.send_json(Method::POST, "/auth/v1/token?grant_type=refresh_token", &body, None)
            .await
    }
}

fn in_filter(ids: &[i64]) -> String {
    let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("in.({})", joined.join(","))
}

fn messages_by_ids(ids: &[MessageId]) -> String {
    format!("/rest/v1/{}?id={}", MESSAGES_TABLE, in_filter(ids))
}

fn public_object_url(base_url: &str, bucket: &str, name: &str) -> String {
    format!("{}/storage/v1/object/public/{}/{}", base_url, bucket, name)
}

#[async_trait]
impl Gateway for RestClient {
    async fn list_messages(&self) -> Result<Vec<Message>, GatewayError> {
        self.get_json(&format!("/rest/v1/{}?select=*&order=id.desc", MESSAGES_TABLE))
            .await
    }

    async fn update_message_status(
        &self,
        ids: &[MessageId],
        status: MessageStatus,
    ) -> Result<(), GatewayError> {
        if ids.is_empty() {
            return Ok(());
        }
        let payload = serde_json::to_vec(&StatusPatch { status })?;
        self.send(
            Method::PATCH,
            &messages_by_ids(ids),
            Some((payload, JSON)),
            Some("return=minimal"),
        )
        .await?;
        Ok(())
    }

    async fn delete_messages(&self, ids: &[MessageId]) -> Result<(), GatewayError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.send(Method::DELETE, &messages_by_ids(ids), None, Some("return=minimal"))
            .await?;
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, GatewayError> {
        let Some(token) = self.access_token() else {
            return Ok(None);
        };
        let user: AuthUser = match self.get_json("/auth/v1/user").await {
            Ok(user) => user,
            Err(GatewayError::Unauthorized) => return Ok(None),
            Err(e) => return Err(e),
        };
        let claims = decode_claims(&token).ok();
        let expires_at = claims
            .as_ref()
            .and_then(|c| DateTime::from_timestamp(c.exp, 0))
            .unwrap_or_else(Utc::now);
        if let Some(c) = claims.as_ref().filter(|c| c.sub != user.id) {
            warn!("Token subject {} differs from user {}", c.sub, user.id);
        }
        Ok(Some(Session {
            access_token: token,
            user_id: user.id,
            email: user.email.or_else(|| claims.and_then(|c| c.email)),
            expires_at,
        }))
    }

    async fn list_gallery(&self) -> Result<Vec<GalleryImage>, GatewayError> {
        self.get_json(&format!(
            "/rest/v1/{}?select=*&order=created_at.desc",
            GALLERY_TABLE
        ))
        .await
    }

    async fn upload_object(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        let path = format!("/storage/v1/object/{}/{}", GALLERY_BUCKET, name);
        self.send(Method::POST, &path, Some((bytes, content_type)), None)
            .await?;
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        public_object_url(&self.base_url, GALLERY_BUCKET, name)
    }

    async fn insert_gallery_image(
        &self,
        image: &NewGalleryImage,
    ) -> Result<GalleryImage, GatewayError> {
        let mut rows: Vec<GalleryImage> = self
            .send_json(
                Method::POST,
                &format!("/rest/v1/{}", GALLERY_TABLE),
                &[image],
                Some("return=representation"),
            )
            .await?;
        rows.pop().ok_or_else(|| GatewayError::Status {
            status: 200,
            body: "insert returned no row".to_string(),
        })
    }

    async fn delete_gallery_image(&self, id: ImageId) -> Result<(), GatewayError> {
        let path = format!("/rest/v1/{}?id=eq.{}", GALLERY_TABLE, id);
        self.send(Method::DELETE, &path, None, Some("return=minimal"))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_filter() {
        assert_eq!(in_filter(&[3, 1, 2]), "in.(3,1,2)");
        assert_eq!(in_filter(&[7]), "in.(7)");
    }

    #[test]
    fn test_messages_by_ids_path() {
        assert_eq!(messages_by_ids(&[1, 2]), "/rest/v1/messages?id=in.(1,2)");
    }

    #[test]
    fn test_public_object_url() {
        assert_eq!(
            public_object_url("https://abc.supabase.co", "gallery", "1700000000000.jpg"),
            "https://abc.supabase.co/storage/v1/object/public/gallery/1700000000000.jpg"
        );
    }

    #[test]
    fn test_status_patch_body() {
        let body = serde_json::to_string(&StatusPatch {
            status: MessageStatus::Read,
        })
        .unwrap();
        assert_eq!(body, r#"{"status":"read"}"#);
    }

    #[test]
    fn test_token_response_shape() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","token_type":"bearer","expires_in":3600,
                "refresh_token":"r","user":{"id":"u1","email":"admin@example.com"}}"#,
        )
        .unwrap();
        assert_eq!(response.user.id, "u1");
        assert_eq!(response.expires_in, 3600);
    }
}
