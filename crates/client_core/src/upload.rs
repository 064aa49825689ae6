use anyhow::{anyhow, Result};
use shared::domain::UserId;
use tracing::{info, warn};

use crate::ObjectStorage;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// `{folder}/{user_id}/{filename}`, keeping only the final component of the
/// supplied filename.
pub fn object_path(folder: &str, user_id: UserId, filename: &str) -> Result<String> {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if basename.is_empty() || basename == "." || basename == ".." {
        return Err(anyhow!("upload filename '{filename}' has no usable name"));
    }

    let folder = folder.trim_matches('/');
    Ok(format!("{folder}/{user_id}/{basename}"))
}

/// Uploads with overwrite semantics and returns the object's public URL.
pub async fn try_upload_file(
    storage: &dyn ObjectStorage,
    file: &UploadFile,
    folder: &str,
    user_id: UserId,
) -> Result<String> {
    let path = object_path(folder, user_id, &file.filename)?;
    let content_type = file
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    storage
        .upload_object(&path, file.content.clone(), content_type, true)
        .await?;
    let public_url = storage.public_url(&path)?;

    info!(
        %path,
        size_bytes = file.content.len(),
        "upload: stored object"
    );
    Ok(public_url)
}

/// Best-effort variant: any failure is logged and reported as `None`.
pub async fn upload_file(
    storage: &dyn ObjectStorage,
    file: &UploadFile,
    folder: &str,
    user_id: UserId,
) -> Option<String> {
    match try_upload_file(storage, file, folder, user_id).await {
        Ok(url) => Some(url),
        Err(error) => {
            warn!(
                filename = %file.filename,
                folder,
                %user_id,
                %error,
                "upload: failed; continuing without a public url"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_nests_filename_under_folder_and_user() {
        let user_id = UserId::new_v4();
        assert_eq!(
            object_path("logos", user_id, "acme.png").expect("path"),
            format!("logos/{user_id}/acme.png")
        );
    }

    #[test]
    fn object_path_strips_client_directories() {
        let user_id = UserId::new_v4();
        assert_eq!(
            object_path("/logos/", user_id, "C:\\Users\\me\\acme.png").expect("path"),
            format!("logos/{user_id}/acme.png")
        );
        assert!(object_path("logos", user_id, "uploads/").is_err());
    }
}
