use std::path::PathBuf;

use anyhow::Context;
use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Image bytes decoded from a `data:image/<ext>;base64,<data>` URI.
#[derive(Debug, PartialEq)]
pub struct DecodedImage {
    pub ext: String,
    pub bytes: Vec<u8>,
}

pub fn parse_data_uri(value: &str) -> AppResult<DecodedImage> {
    let rest = value
        .strip_prefix("data:image/")
        .ok_or_else(|| AppError::invalid("image", "Image must be a base64 data URI"))?;
    let (ext, data) = rest
        .split_once(";base64,")
        .ok_or_else(|| AppError::invalid("image", "Image must be a base64 data URI"))?;

    let ext = ext.to_ascii_lowercase();
    check_extension(&ext)?;

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|_| AppError::invalid("image", "Image payload is not valid base64"))?;
    if bytes.is_empty() {
        return Err(AppError::invalid("image", "Image payload is empty"));
    }

    Ok(DecodedImage { ext, bytes })
}

pub fn check_extension(ext: &str) -> AppResult<()> {
    if !ALLOWED_EXTENSIONS.contains(&ext) {
        return Err(AppError::invalid("image", "Unsupported image type"));
    }
    Ok(())
}

/// Recipe images on local disk, served under `url`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url: String,
}

impl MediaStore {
    pub fn new(root: PathBuf, url: String) -> Self {
        Self { root, url }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Writes the image as `recipes/<uuid>/temp.<ext>` and returns that
    /// relative path.
    pub async fn save(&self, image: &DecodedImage) -> AppResult<String> {
        let relative = format!("recipes/{}/temp.{}", Uuid::new_v4(), image.ext);
        let path = self.root.join(&relative);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        fs::write(&path, &image.bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(path = %relative, bytes = image.bytes.len(), "stored recipe image");
        Ok(relative)
    }

    /// Best effort; a stale file is only logged.
    pub async fn discard(&self, relative: &str) {
        let path = self.root.join(relative);
        if let Err(err) = fs::remove_file(&path).await {
            tracing::warn!(error = %err, path = %path.display(), "failed to remove image");
            return;
        }
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir(dir).await;
        }
    }

    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.url, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_data_uri() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"pixels"));
        let image = parse_data_uri(&uri).unwrap();
        assert_eq!(image.ext, "png");
        assert_eq!(image.bytes, b"pixels");
    }

    #[test]
    fn rejects_non_image_uri() {
        assert!(matches!(
            parse_data_uri("data:text/plain;base64,aGk="),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(matches!(
            parse_data_uri("data:image/jpeg;base64,@@@"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(parse_data_uri("data:image/tiff;base64,aGk=").is_err());
    }

    #[test]
    fn url_joins_media_prefix() {
        let store = MediaStore::new(PathBuf::from("media"), "/media".into());
        assert_eq!(
            store.url_for("recipes/x/temp.png"),
            "/media/recipes/x/temp.png"
        );
    }
}
