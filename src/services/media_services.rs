use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use log::{debug, warn};
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

use crate::dtos::media_dtos::ImageUpload;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Uploads taller than this or wider than `RESIZE_TRIGGER_WIDTH` get downscaled...
const RESIZE_TRIGGER_HEIGHT: u32 = 1080;
const RESIZE_TRIGGER_WIDTH: u32 = 1920;
/// ...to fit inside this box.
const THUMBNAIL_MAX_WIDTH: u32 = 1080;
const THUMBNAIL_MAX_HEIGHT: u32 = 1920;

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid file type. Only JPEG, PNG, GIF, and WEBP are allowed.")]
    UnsupportedType(String),
    #[error("Invalid base64 image data")]
    InvalidBase64,
    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    InvalidImage,
    #[error("File too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),
    #[error("Invalid media path")]
    InvalidPath,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Image worker failed: {0}")]
    Worker(String),
}

impl MediaError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MediaError::UnsupportedType(_)
                | MediaError::InvalidBase64
                | MediaError::InvalidImage
                | MediaError::TooLarge(..)
                | MediaError::InvalidPath
        )
    }
}

/// An upload that decoded as an image. Only ever built on a blocking thread.
#[derive(Debug)]
pub struct DecodedUpload {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub image: DynamicImage,
}

/// Checks type and size, then decodes. CPU bound; call through `spawn_blocking`.
pub fn decode_upload(upload: &ImageUpload, max_bytes: usize) -> Result<DecodedUpload, MediaError> {
    let content_type = upload.content_type.trim().to_lowercase();
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(MediaError::UnsupportedType(content_type));
    }

    // data:image/png;base64,<payload>
    let payload = match upload.image_data.split_once(',') {
        Some((_, data)) => data,
        None => upload.image_data.as_str(),
    };
    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| MediaError::InvalidBase64)?;
    if bytes.len() > max_bytes {
        return Err(MediaError::TooLarge(bytes.len(), max_bytes));
    }

    let format = image::guess_format(&bytes).map_err(|_| MediaError::InvalidImage)?;
    let image = image::load_from_memory_with_format(&bytes, format)
        .map_err(|_| MediaError::InvalidImage)?;
    Ok(DecodedUpload {
        bytes,
        format,
        image,
    })
}

/// Target size for a `width` x `height` image, or None when it is left alone.
pub fn thumbnail_size(width: u32, height: u32) -> Option<(u32, u32)> {
    if height <= RESIZE_TRIGGER_HEIGHT && width <= RESIZE_TRIGGER_WIDTH {
        return None;
    }
    let ratio = (THUMBNAIL_MAX_WIDTH as f64 / width as f64)
        .min(THUMBNAIL_MAX_HEIGHT as f64 / height as f64);
    if ratio >= 1.0 {
        return None;
    }
    let new_width = ((width as f64 * ratio).round() as u32).max(1);
    let new_height = ((height as f64 * ratio).round() as u32).max(1);
    Some((new_width, new_height))
}

fn extension_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        _ => "png",
    }
}

/// Re-encodes oversized images. Returns the bytes to store and their extension.
pub fn downscale_if_needed(upload: DecodedUpload) -> Result<(Vec<u8>, &'static str), MediaError> {
    let (width, height) = upload.image.dimensions();

    let Some((new_width, new_height)) = thumbnail_size(width, height) else {
        return Ok((upload.bytes, extension_for(upload.format)));
    };
    debug!(
        "downscaling {}x{} image to {}x{}",
        width, height, new_width, new_height
    );

    let resized = upload.image.resize_exact(new_width, new_height, FilterType::Lanczos3);
    let (output, ext) = match upload.format {
        ImageFormat::Jpeg => (ImageOutputFormat::Jpeg(JPEG_QUALITY), "jpg"),
        ImageFormat::Gif => (ImageOutputFormat::Gif, "gif"),
        _ => (ImageOutputFormat::Png, "png"),
    };
    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, output)?;
    Ok((out.into_inner(), ext))
}

fn slug_strip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"))
}

fn slug_dash_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-\s]+").expect("valid slug regex"))
}

/// `"John.Doe@Mail.com"` -> `"johndoemailcom"`.
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let stripped = slug_strip_regex().replace_all(&lowered, "");
    slug_dash_regex()
        .replace_all(&stripped, "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

pub fn content_type_for(path: &str) -> mime::Mime {
    match Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        Some("gif") => mime::IMAGE_GIF,
        Some("webp") => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Files under `MEDIA_ROOT`, addressed by '/'-separated relative paths.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
    max_upload_bytes: usize,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: &str, max_upload_bytes: usize) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_upload_bytes,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, relative: &str) -> String {
        let encoded: Vec<String> = relative
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.base_url, encoded.join("/"))
    }

    /// Rejects absolute paths and any `..` component.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let path = Path::new(relative);
        if relative.is_empty()
            || !path.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(MediaError::InvalidPath);
        }
        Ok(self.root.join(path))
    }

    /// Runs `work` on the decoded upload without holding up the async workers.
    async fn process_blocking<T, F>(&self, upload: &ImageUpload, work: F) -> Result<T, MediaError>
    where
        T: Send + 'static,
        F: FnOnce(DecodedUpload) -> Result<T, MediaError> + Send + 'static,
    {
        let upload = upload.clone();
        let max_bytes = self.max_upload_bytes;
        tokio::task::spawn_blocking(move || work(decode_upload(&upload, max_bytes)?))
            .await
            .map_err(|e| MediaError::Worker(e.to_string()))?
    }

    /// Validates, downscales and stores a post image under `YYYY/MM/DD/`.
    pub async fn save_post_image(&self, upload: &ImageUpload) -> Result<String, MediaError> {
        let (bytes, ext) = self.process_blocking(upload, downscale_if_needed).await?;

        let relative = format!(
            "{}/post-{}.{}",
            Utc::now().format("%Y/%m/%d"),
            Uuid::new_v4(),
            ext
        );
        self.write(&relative, &bytes).await?;
        Ok(relative)
    }

    /// Validates and stores a profile picture as uploaded.
    pub async fn save_profile_picture(
        &self,
        email: &str,
        upload: &ImageUpload,
    ) -> Result<String, MediaError> {
        let (bytes, ext) = self
            .process_blocking(upload, |decoded| {
                Ok((decoded.bytes, extension_for(decoded.format)))
            })
            .await?;
        let relative = format!(
            "profile_pictures/{}-{}.{}",
            slugify(email),
            Uuid::new_v4(),
            ext
        );
        self.write(&relative, &bytes).await?;
        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> Result<Option<Vec<u8>>, MediaError> {
        let path = self.resolve(relative)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Best effort; used to roll back a file whose database row was never written.
    pub async fn remove(&self, relative: &str) {
        let Ok(path) = self.resolve(relative) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("failed to remove media file {}: {}", path.display(), e);
        }
    }

    async fn write(&self, relative: &str, bytes: &[u8]) -> Result<(), MediaError> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!("stored {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png_upload(width: u32, height: u32) -> ImageUpload {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([10, 120, 200])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
        ImageUpload {
            image_data: format!(
                "data:image/png;base64,{}",
                general_purpose::STANDARD.encode(buf.into_inner())
            ),
            file_name: "photo.png".into(),
            content_type: "image/png".into(),
        }
    }

    #[test]
    fn small_images_are_left_alone() {
        assert_eq!(thumbnail_size(800, 600), None);
        assert_eq!(thumbnail_size(1920, 1080), None);
        // wider than the box but under both triggers
        assert_eq!(thumbnail_size(1500, 800), None);
    }

    #[test]
    fn oversized_images_fit_the_box() {
        assert_eq!(thumbnail_size(2400, 1200), Some((1080, 540)));
        assert_eq!(thumbnail_size(1000, 4000), Some((480, 1920)));
        // taller than the trigger but already inside the box
        assert_eq!(thumbnail_size(1000, 1500), None);
    }

    #[test]
    fn decode_rejects_wrong_type_and_garbage() {
        let mut upload = png_upload(4, 4);
        upload.content_type = "application/pdf".into();
        assert!(matches!(
            decode_upload(&upload, 1024 * 1024),
            Err(MediaError::UnsupportedType(_))
        ));
        assert!(decode_upload(&png_upload(4, 4), 1024 * 1024).is_ok());

        let garbage = ImageUpload {
            image_data: general_purpose::STANDARD.encode(b"definitely not an image"),
            file_name: "x.png".into(),
            content_type: "image/png".into(),
        };
        assert!(matches!(
            decode_upload(&garbage, 1024 * 1024),
            Err(MediaError::InvalidImage)
        ));
    }

    #[test]
    fn decode_enforces_size_limit() {
        let upload = png_upload(16, 16);
        assert!(matches!(decode_upload(&upload, 10), Err(MediaError::TooLarge(_, 10))));
    }

    #[test]
    fn downscale_produces_smaller_image() {
        let decoded = decode_upload(&png_upload(2400, 1200), usize::MAX).unwrap();
        let (bytes, ext) = downscale_if_needed(decoded).unwrap();
        assert_eq!(ext, "png");
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.dimensions(), (1080, 540));
    }

    #[test]
    fn slugify_matches_expected_shape() {
        assert_eq!(slugify("John.Doe@Mail.com"), "johndoemailcom");
        assert_eq!(slugify("  Hello   World -- x "), "hello-world-x");
    }

    #[test]
    fn resolve_blocks_traversal() {
        let storage = MediaStorage::new("/tmp/media", "/media", 1024);
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
        assert!(storage.resolve("2024/01/02/post-x.png").is_ok());
    }

    #[test]
    fn urls_are_percent_encoded_per_segment() {
        let storage = MediaStorage::new("/tmp/media", "/media/", 1024);
        assert_eq!(storage.url_for("a b/c.png"), "/media/a%20b/c.png");
    }

    #[test]
    fn content_types_from_extension() {
        assert_eq!(content_type_for("x.JPG"), mime::IMAGE_JPEG);
        assert_eq!(content_type_for("x.webp").to_string(), "image/webp");
        assert_eq!(content_type_for("x.bin"), mime::APPLICATION_OCTET_STREAM);
    }

    #[tokio::test]
    async fn saved_post_image_is_downscaled_once_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media", 10 * 1024 * 1024);
        let relative = storage.save_post_image(&png_upload(1000, 4000)).await.unwrap();
        assert!(relative.ends_with(".png"));
        let stored = storage.read(&relative).await.unwrap().unwrap();
        let img = image::load_from_memory(&stored).unwrap();
        assert_eq!(img.dimensions(), (480, 1920));

        let mut bad = png_upload(4, 4);
        bad.image_data = general_purpose::STANDARD.encode(b"not an image");
        assert!(matches!(
            storage.save_post_image(&bad).await,
            Err(MediaError::InvalidImage)
        ));
    }

    #[tokio::test]
    async fn saved_profile_picture_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media", 1024 * 1024);
        let relative = storage
            .save_profile_picture("ann@example.com", &png_upload(8, 8))
            .await
            .unwrap();
        assert!(relative.starts_with("profile_pictures/annexamplecom-"));
        assert!(relative.ends_with(".png"));
        assert!(storage.read(&relative).await.unwrap().is_some());

        storage.remove(&relative).await;
        assert!(storage.read(&relative).await.unwrap().is_none());
    }
}
