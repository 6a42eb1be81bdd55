use crate::models::{GalleryImage, ImageId, Message, MessageId, MessageStatus, NewGalleryImage, Session};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] hyper::Error),
    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("not signed in")]
    Unauthorized,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the admin area needs from the hosted backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// All contact messages, highest id first.
    async fn list_messages(&self) -> Result<Vec<Message>, GatewayError>;

    /// Sets `status` on every id in one request.
    async fn update_message_status(
        &self,
        ids: &[MessageId],
        status: MessageStatus,
    ) -> Result<(), GatewayError>;

    async fn delete_messages(&self, ids: &[MessageId]) -> Result<(), GatewayError>;

    async fn get_session(&self) -> Result<Option<Session>, GatewayError>;

    async fn list_gallery(&self) -> Result<Vec<GalleryImage>, GatewayError>;

    async fn upload_object(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GatewayError>;

    fn public_url(&self, name: &str) -> String;

    async fn insert_gallery_image(
        &self,
        image: &NewGalleryImage,
    ) -> Result<GalleryImage, GatewayError>;

    async fn delete_gallery_image(&self, id: ImageId) -> Result<(), GatewayError>;
}
