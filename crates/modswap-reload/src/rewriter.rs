//! Binary identity rewriter
//!
//! The host module system refuses a second module with a name it has already
//! seen. Before a replacement is loaded its module name is rewritten to
//! `{original}-{suffix}`, where the suffix is the wall clock in nanoseconds,
//! forced strictly greater than every suffix this process handed out before.
//! The file on disk is never touched.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use modswap_kernel::image::{ImageError, ModuleImage};

static LAST_SUFFIX: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RewriteError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed module {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// A renamed module image, ready to hand to the module system
#[derive(Debug, Clone)]
pub struct RewrittenImage {
    /// File the image was read from
    pub source: PathBuf,
    /// Module name before rewriting (file stem if the module had none)
    pub original_name: String,
    /// Freshly issued module name
    pub new_name: String,
    pub bytes: Vec<u8>,
}

/// Next unique suffix: nanoseconds since the epoch, strictly increasing
pub fn next_suffix() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();

    let mut last = LAST_SUFFIX.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_SUFFIX.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

pub struct IdentityRewriter;

impl IdentityRewriter {
    /// Read `path` and return its image under a never-used module name
    pub fn rewrite(path: &Path) -> Result<RewrittenImage, RewriteError> {
        let bytes = std::fs::read(path).map_err(|source| RewriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module");

        let (original_name, new_name, bytes) =
            Self::rewrite_bytes(&bytes, fallback).map_err(|source| RewriteError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            "Rewrote module identity {} -> {} ({})",
            original_name,
            new_name,
            path.display()
        );
        Ok(RewrittenImage {
            source: path.to_path_buf(),
            original_name,
            new_name,
            bytes,
        })
    }

    /// Rename an in-memory image; `fallback` names modules without a name
    pub fn rewrite_bytes(
        bytes: &[u8],
        fallback: &str,
    ) -> Result<(String, String, Vec<u8>), ImageError> {
        let mut image = ModuleImage::parse(bytes)?;
        let original_name = image
            .module_name()?
            .unwrap_or_else(|| fallback.to_string());
        let new_name = format!("{}-{}", original_name, next_suffix());
        image.set_module_name(&new_name)?;
        Ok((original_name, new_name, image.to_bytes()))
    }
}
