//! File helpers: data URLs and saving payloads to disk.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::{
    fs::{create_dir_all, File},
    io::AsyncWriteExt,
};

use super::request::last_path_segment;
use crate::core::{ProKitError, ProKitResult};

pub const DEFAULT_MIME: &str = "application/octet-stream";

/// A decoded `data:` URL
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime: String,
    pub data: Bytes,
}

/// Decodes a base64 data URL such as `data:image/png;base64,iVBORw0...`.
pub fn parse_data_url(data_url: &str) -> ProKitResult<DataUrl> {
    let (detail, content) = data_url
        .split_once(',')
        .ok_or_else(|| ProKitError::Encoding("data url has no ',' separator".to_string()))?;

    let header = detail
        .strip_prefix("data:")
        .ok_or_else(|| ProKitError::Encoding("data url must start with 'data:'".to_string()))?;

    let (mime, encoding) = header
        .split_once(';')
        .ok_or_else(|| ProKitError::Encoding("data url is missing its mime type".to_string()))?;
    if encoding != "base64" {
        return Err(ProKitError::Encoding(format!(
            "unsupported data url encoding '{encoding}'"
        )));
    }

    let data = STANDARD
        .decode(content.trim())
        .map_err(|e| ProKitError::encoding_error("Invalid data url payload", e))?;

    Ok(DataUrl {
        mime: mime.to_string(),
        data: Bytes::from(data),
    })
}

/// Writes `data` to `path`, prefixed with an optional byte order mark.
///
/// Parent directories are created as needed. Returns the number of bytes written.
pub async fn download_by_data(path: &Path, data: &[u8], bom: Option<&[u8]>) -> ProKitResult<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent).await?;
    }

    let bom = bom.unwrap_or_default();
    let mut buf = BytesMut::with_capacity(bom.len() + data.len());
    buf.put_slice(bom);
    buf.put_slice(data);

    let mut file = File::create(path).await?;
    file.write_all(&buf).await?;
    file.flush().await?;

    log::debug!("Saved {} bytes to {}", buf.len(), path.display());
    Ok(buf.len())
}

/// Decodes a data URL and saves it as `dir/filename`.
pub async fn download_by_base64(dir: &Path, filename: &str, data_url: &str) -> ProKitResult<PathBuf> {
    let decoded = parse_data_url(data_url)?;
    let path = dir.join(filename);
    download_by_data(&path, &decoded.data, None).await?;
    Ok(path)
}

/// File name to save a remote resource under: `file_name` if given, else the
/// last path segment of `url`.
pub fn file_name_from_url(url: &str, file_name: Option<&str>) -> Option<String> {
    file_name
        .filter(|name| !name.is_empty())
        .or_else(|| last_path_segment(url))
        .map(str::to_string)
}
