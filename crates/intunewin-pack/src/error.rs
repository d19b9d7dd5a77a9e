use std::fmt;
use std::path::PathBuf;

use intunewin_crypto::CryptoError;
use thiserror::Error;

pub type PackResult<T> = Result<T, PackError>;

/// Pipeline stage a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Archiving,
    Encryption,
    MetadataRendering,
    FinalAssembly,
    Writing,
    Inspection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Archiving => "archiving",
            Stage::Encryption => "encryption",
            Stage::MetadataRendering => "metadata rendering",
            Stage::FinalAssembly => "final assembly",
            Stage::Writing => "writing output",
            Stage::Inspection => "inspection",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("{stage}: I/O failure on {}: {source}", .path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: archive error: {source}")]
    Archive {
        stage: Stage,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("encryption: {0}")]
    Crypto(#[from] CryptoError),

    #[error("metadata rendering: {0}")]
    Serialization(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PackError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            PackError::Io { stage, .. } | PackError::Archive { stage, .. } => *stage,
            PackError::Crypto(_) => Stage::Encryption,
            PackError::Serialization(_) => Stage::MetadataRendering,
            PackError::InvalidInput(_) => Stage::Validation,
        }
    }

    pub(crate) fn io(stage: Stage, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PackError::Io {
            stage,
            path,
            source,
        }
    }

    pub(crate) fn archive(stage: Stage) -> impl FnOnce(zip::result::ZipError) -> Self {
        move |source| PackError::Archive { stage, source }
    }
}
