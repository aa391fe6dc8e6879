//! Where the header logo comes from.
//!
//! Fetching is the one step of an export that may fail without failing the
//! export: the caller falls back to a text placeholder.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::{NcrError, NcrResult};

/// Supplier of logo image bytes (PNG/JPEG)
#[async_trait(?Send)]
pub trait LogoSource {
    async fn fetch_logo(&self) -> NcrResult<Vec<u8>>;
}

/// No logo configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogo;

#[async_trait(?Send)]
impl LogoSource for NoLogo {
    async fn fetch_logo(&self) -> NcrResult<Vec<u8>> {
        Err(NcrError::export("no logo configured"))
    }
}

/// Logo bytes already in memory
#[derive(Debug, Clone, Default)]
pub struct StaticLogo(pub Vec<u8>);

#[async_trait(?Send)]
impl LogoSource for StaticLogo {
    async fn fetch_logo(&self) -> NcrResult<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// Logo read from a file
#[derive(Debug, Clone)]
pub struct FileLogo {
    pub path: PathBuf,
}

impl FileLogo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLogo { path: path.into() }
    }
}

#[async_trait(?Send)]
impl LogoSource for FileLogo {
    async fn fetch_logo(&self) -> NcrResult<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            NcrError::file_error("read logo", self.path.display().to_string(), e.to_string())
        })
    }
}
