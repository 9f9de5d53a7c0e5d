//! Error taxonomy for the GDAL-subprocess boundary and Gate 1 validation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterIoError {
    #[error("GDAL tool '{tool}' not found or failed to launch: {detail}")]
    ToolNotFound { tool: String, detail: String },

    #[error("GDAL tool '{tool}' exited with failure: {stderr}")]
    SubprocessFailed { tool: String, stderr: String },

    #[error("gdalinfo output for {path} was not valid JSON: {detail}")]
    InvalidGdalinfoJson { path: String, detail: String },

    #[error("io error writing {path}: {detail}")]
    Io { path: String, detail: String },
}

pub type RasterIoResult<T> = Result<T, RasterIoError>;
