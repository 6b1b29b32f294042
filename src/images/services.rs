use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};

use crate::auth::repo_types::DEFAULT_IMAGE_FILE;
use crate::state::AppState;

const PICTURE_PREFIX: &str = "profile_pics";
pub const PRESIGN_TTL_SECS: u64 = 10 * 60;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "png", "jpeg"];

/// A picture as received from the client.
pub struct PictureUpload {
    pub file_name: String,
    pub body: Bytes,
}

/// Lowercased extension and content type of an accepted picture name.
pub fn picture_kind(file_name: &str) -> Option<(&'static str, &'static str)> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" => Some(("jpg", "image/jpeg")),
        "jpeg" => Some(("jpeg", "image/jpeg")),
        "png" => Some(("png", "image/png")),
        _ => None,
    }
}

pub fn object_key(image_file: &str) -> String {
    format!("{PICTURE_PREFIX}/{image_file}")
}

fn random_file_stem() -> String {
    let bytes: [u8; 8] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Stores the picture under a fresh random name and returns that name.
pub async fn save_picture(st: &AppState, upload: PictureUpload) -> anyhow::Result<String> {
    let (ext, content_type) = picture_kind(&upload.file_name)
        .with_context(|| format!("unsupported picture {}", upload.file_name))?;
    let image_file = format!("{}.{}", random_file_stem(), ext);
    let key = object_key(&image_file);
    st.storage
        .put_object(&key, upload.body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    info!(%key, "profile picture stored");
    Ok(image_file)
}

/// Drops a replaced picture. The shared default is never deleted and a
/// failed delete only leaves an orphan object behind.
pub async fn discard_picture(st: &AppState, image_file: &str) {
    if image_file == DEFAULT_IMAGE_FILE {
        return;
    }
    let key = object_key(image_file);
    if let Err(e) = st.storage.delete_object(&key).await {
        warn!(error = %e, %key, "could not delete replaced picture");
    }
}

pub async fn picture_url(st: &AppState, image_file: &str) -> anyhow::Result<String> {
    let key = object_key(image_file);
    st.storage
        .presign_get(&key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {}", key))
}
