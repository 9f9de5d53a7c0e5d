//! Atomic `tmp`-then-`rename` JSON writes for manifests and the
//! latest-pointer; a reader never observes a partially written file.

use serde::Serialize;
use std::io;
use std::path::Path;

pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension(match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    });
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&tmp_path, &body).await?;
    tokio::fs::rename(&tmp_path, path).await
}
