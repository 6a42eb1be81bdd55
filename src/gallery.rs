use crate::cache::{GALLERY_DATASET, ListCache};
use crate::gateway::{Gateway, GatewayError};
use crate::models::{GalleryImage, ImageId, NewGalleryImage, Session};
use chrono::Utc;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const MAX_CATEGORIES: usize = 3;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("not allowed to delete image {0}")]
    Forbidden(ImageId),
    #[error("not signed in")]
    NotSignedIn,
    #[error("an image needs between 1 and 3 categories, got {0}")]
    InvalidCategories(usize),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("could not read image file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    All,
    Tag(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryNotice {
    LoadFailed,
    Forbidden,
    InvalidCategories,
    Uploaded,
    UploadFailed,
    Deleted,
    DeleteFailed,
}

pub struct Gallery {
    images: Vec<GalleryImage>,
    categories: Vec<String>,
    filter: Category,
    pending_delete: Option<ImageId>,
    admin_ids: Vec<String>,
    notice: Option<(GalleryNotice, Instant)>,
    notice_ttl: Duration,
}

impl Gallery {
    pub fn new(categories: Vec<String>, admin_ids: Vec<String>, notice_ttl: Duration) -> Self {
        Self {
            images: Vec::new(),
            categories,
            filter: Category::All,
            pending_delete: None,
            admin_ids,
            notice: None,
            notice_ttl,
        }
    }

    #[cfg(test)]
    pub fn images(&self) -> &[GalleryImage] {
        &self.images
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn filter(&self) -> &Category {
        &self.filter
    }

    pub fn pending_delete(&self) -> Option<ImageId> {
        self.pending_delete
    }

    pub fn notice(&self) -> Option<GalleryNotice> {
        self.notice
            .filter(|(_, at)| at.elapsed() < self.notice_ttl)
            .map(|(kind, _)| kind)
    }

    fn raise(&mut self, kind: GalleryNotice) {
        self.notice = Some((kind, Instant::now()));
    }

    /// Cache first; the backend is only asked when the cached list is
    /// missing or stale.
    pub async fn load<G: Gateway + ?Sized>(
        &mut self,
        gw: &G,
        cache: &ListCache,
    ) -> Result<(), GalleryError> {
        match cache.get::<Vec<GalleryImage>>(GALLERY_DATASET).await {
            Ok(Some(images)) => {
                debug!("Gallery served from cache ({} images)", images.len());
                self.images = images;
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => warn!("Gallery cache read failed: {}", e),
        }

        match gw.list_gallery().await {
            Ok(images) => {
                if let Err(e) = cache.put(GALLERY_DATASET, &images).await {
                    warn!("Gallery cache write failed: {}", e);
                }
                info!("Loaded {} gallery images", images.len());
                self.images = images;
                Ok(())
            }
            Err(e) => {
                error!("Loading gallery failed: {}", e);
                self.raise(GalleryNotice::LoadFailed);
                Err(e.into())
            }
        }
    }

    /// Drops the cached list and fetches again.
    pub async fn reload<G: Gateway + ?Sized>(
        &mut self,
        gw: &G,
        cache: &ListCache,
    ) -> Result<(), GalleryError> {
        invalidate(cache).await;
        self.load(gw, cache).await
    }

    pub fn set_filter(&mut self, filter: Category) {
        self.filter = filter;
    }

    /// Steps through `All` and then each configured category.
    pub fn cycle_filter(&mut self, forward: bool) {
        let len = self.categories.len() + 1;
        let current = match &self.filter {
            Category::All => 0,
            Category::Tag(tag) => self
                .categories
                .iter()
                .position(|c| c == tag)
                .map_or(0, |i| i + 1),
        };
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.filter = match next {
            0 => Category::All,
            i => Category::Tag(self.categories[i - 1].clone()),
        };
    }

    pub fn visible(&self) -> Vec<&GalleryImage> {
        self.images
            .iter()
            .filter(|img| match &self.filter {
                Category::All => true,
                Category::Tag(tag) => img.categories.iter().any(|c| c == tag),
            })
            .collect()
    }

    /// Admins may delete anything, everyone else only their own uploads.
    pub fn may_delete(&self, image: &GalleryImage, session: &Session) -> bool {
        self.admin_ids.iter().any(|id| *id == session.user_id)
            || image.user_id.as_deref() == Some(session.user_id.as_str())
    }

    pub fn request_delete(
        &mut self,
        id: ImageId,
        session: Option<&Session>,
    ) -> Result<(), GalleryError> {
        let Some(session) = session else {
            self.raise(GalleryNotice::Forbidden);
            return Err(GalleryError::NotSignedIn);
        };
        let Some(image) = self.images.iter().find(|i| i.id == id) else {
            return Ok(());
        };
        if !self.may_delete(image, session) {
            warn!("User {} may not delete image {}", session.user_id, id);
            self.raise(GalleryNotice::Forbidden);
            return Err(GalleryError::Forbidden(id));
        }
        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub async fn confirm_delete<G: Gateway + ?Sized>(
        &mut self,
        gw: &G,
        cache: &ListCache,
    ) -> Result<(), GalleryError> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(());
        };
        match gw.delete_gallery_image(id).await {
            Ok(()) => {
                self.images.retain(|i| i.id != id);
                invalidate(cache).await;
                info!("Deleted gallery image {}", id);
                self.raise(GalleryNotice::Deleted);
                Ok(())
            }
            Err(e) => {
                error!("Deleting gallery image {} failed: {}", id, e);
                self.raise(GalleryNotice::DeleteFailed);
                Err(e.into())
            }
        }
    }

    pub async fn upload<G: Gateway + ?Sized>(
        &mut self,
        gw: &G,
        cache: &ListCache,
        session: Option<&Session>,
        path: &Path,
        categories: &[String],
    ) -> Result<GalleryImage, GalleryError> {
        if categories.is_empty() || categories.len() > MAX_CATEGORIES {
            self.raise(GalleryNotice::InvalidCategories);
            return Err(GalleryError::InvalidCategories(categories.len()));
        }
        let Some(session) = session else {
            self.raise(GalleryNotice::UploadFailed);
            return Err(GalleryError::NotSignedIn);
        };

        match self.store(gw, session, path, categories).await {
            Ok(image) => {
                invalidate(cache).await;
                self.images.insert(0, image.clone());
                self.raise(GalleryNotice::Uploaded);
                Ok(image)
            }
            Err(e) => {
                error!("Uploading {} failed: {}", path.display(), e);
                self.raise(GalleryNotice::UploadFailed);
                Err(e)
            }
        }
    }

    async fn store<G: Gateway + ?Sized>(
        &self,
        gw: &G,
        session: &Session,
        path: &Path,
        categories: &[String],
    ) -> Result<GalleryImage, GalleryError> {
        let bytes = tokio::fs::read(path).await?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "jpg".to_string());
        let name = format!("{}.{}", Utc::now().timestamp_millis(), ext);

        gw.upload_object(&name, bytes, content_type_for(&ext)).await?;
        let record = NewGalleryImage {
            image_url: gw.public_url(&name),
            categories: categories.to_vec(),
            user_id: session.user_id.clone(),
        };
        let image = gw.insert_gallery_image(&record).await?;
        info!("Uploaded {} as gallery image {}", name, image.id);
        Ok(image)
    }
}

async fn invalidate(cache: &ListCache) {
    if let Err(e) = cache.invalidate(GALLERY_DATASET).await {
        warn!("Gallery cache invalidation failed: {}", e);
    }
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "image/jpeg",
    }
}
