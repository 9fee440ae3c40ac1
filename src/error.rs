use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FlowError {
    #[error("wrong signal type: {0} (expected \"signal p-value\" or \"fold change over control\")")]
    WrongSignalType(String),

    #[error("wrong genome assembly: {0} (expected \"GRCh38\" or \"hg19\")")]
    WrongGenomeAssembly(String),

    #[error("no experiment ids given")]
    NoExperiments,

    #[error("invalid experiment id: {0:?}")]
    InvalidExperimentId(String),

    #[error("invalid extra option: {0}")]
    InvalidExtraOption(String),

    #[error("missing config file at {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("ENCODE request failed: {0}")]
    EncodeHttp(String),

    #[error("ENCODE returned status {status}: {message}")]
    EncodeStatus { status: u16, message: String },

    #[error("malformed ENCODE metadata for {experiment}: {message}")]
    MalformedMetadata { experiment: String, message: String },

    #[error("transfer interrupted: {0}")]
    Transfer(#[source] io::Error),

    #[error("download of {accession} failed after {attempts} attempts: {message}")]
    DownloadFailed {
        accession: String,
        attempts: u32,
        message: String,
    },

    #[error("{0}")]
    DataNotFound(String),

    #[error("matrix already exists at {0}, aborting to prevent overwriting")]
    #[diagnostic(help("move or delete the existing matrix, or choose another output directory"))]
    OutputCollision(PathBuf),

    #[error("sample sheet error: {0}")]
    Manifest(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to launch {program}: {message}")]
    #[diagnostic(help("make sure deepTools is installed and on PATH"))]
    ToolSpawn { program: String, message: String },

    #[error("{program} exited with status {code:?}")]
    ToolFailed { program: String, code: Option<i32> },
}

impl FlowError {
    pub fn is_transient(&self) -> bool {
        match self {
            FlowError::EncodeHttp(_) => true,
            FlowError::EncodeStatus { status, .. } => is_retryable_status(*status),
            FlowError::Transfer(err) => err.kind() != io::ErrorKind::StorageFull,
            _ => false,
        }
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = FlowError::EncodeStatus {
            status: 503,
            message: "busy".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn not_found_is_not_transient() {
        let err = FlowError::EncodeStatus {
            status: 404,
            message: "gone".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn full_disk_is_not_transient() {
        let err = FlowError::Transfer(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        assert!(!err.is_transient());
        let err = FlowError::Transfer(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(err.is_transient());
    }

    #[test]
    fn configuration_errors_are_not_transient() {
        assert!(!FlowError::WrongSignalType("raw".to_string()).is_transient());
        assert!(!FlowError::DataNotFound("x".to_string()).is_transient());
    }
}
