use std::fs;
use std::path::{Path, PathBuf};

use lambdalith_domain::{ContentDigest, DomainValidationError};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::TriggerError;

/// Compute the content trigger of a single file.
///
/// Only the file bytes are hashed; timestamps and other metadata do not
/// influence the result.
///
/// # Errors
///
/// Returns `ContentUnavailable` when the file cannot be read.
pub fn digest_file(path: &Path) -> std::result::Result<ContentDigest, TriggerError> {
    let bytes = fs::read(path).map_err(|source| TriggerError::ContentUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let digest = sha256_bytes(&bytes).map_err(|source| TriggerError::InvalidDigest {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), digest = %digest.short(), "computed content trigger");
    Ok(digest)
}

/// Compute triggers for independent files in parallel, keeping input order.
///
/// # Errors
///
/// Returns the error of the first path (in input order) that cannot be read.
pub fn digest_files(paths: &[PathBuf]) -> std::result::Result<Vec<ContentDigest>, TriggerError> {
    let mut digested = paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| (index, digest_file(path)))
        .collect::<Vec<_>>();
    digested.sort_by_key(|(index, _)| *index);

    digested.into_iter().map(|(_index, digest)| digest).collect()
}

pub(crate) fn sha256_bytes(
    data: &[u8],
) -> std::result::Result<ContentDigest, DomainValidationError> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    ContentDigest::new(format!("{:x}", hasher.finalize()))
}
