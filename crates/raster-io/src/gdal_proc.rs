//! Subprocess wrappers around the GDAL CLI tools: resolve the binary, run
//! it to completion, capture stdout/stderr, and turn nonzero exits into
//! typed errors.

use crate::error::{RasterIoError, RasterIoResult};
use tokio::process::Command;

/// Resolves a GDAL CLI tool name to an invocable binary path: the bare
/// name (letting `PATH` resolve it) unless `GDAL_BIN_DIR` pins a directory.
pub fn gdal_bin(tool: &str) -> String {
    match std::env::var("GDAL_BIN_DIR") {
        Ok(dir) if !dir.is_empty() => format!("{}/{}", dir.trim_end_matches('/'), tool),
        _ => tool.to_string(),
    }
}

/// Runs a GDAL CLI tool to completion and returns its captured stdout.
pub async fn run_gdal(tool: &str, args: &[&str]) -> RasterIoResult<String> {
    let bin = gdal_bin(tool);
    let output = Command::new(&bin).args(args).output().await.map_err(|e| RasterIoError::ToolNotFound {
        tool: bin.clone(),
        detail: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(RasterIoError::SubprocessFailed {
            tool: bin,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
