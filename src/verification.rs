//! Verification protocol (spec §4.9).
//!
//! `start_verification` writes a known blob under a random prefix and
//! exercises `move_blob`; `end_verification` cleans it up. Used by the
//! coordinator to check connectivity and write access to the backend.

use anyhow::anyhow;
use base64::Engine;
use rand::RngCore;

use crate::backend::BlobBackend;
use crate::error::{RepositoryError, Result};
use crate::layout::{
    verification_container_path, VERIFICATION_MASTER_NAME, VERIFICATION_MASTER_TMP_NAME,
};

/// Opaque token returned by `start_verification`; also the random seed
/// used to name the scratch container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken(String);

impl VerificationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn random_seed() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a token, write `master.dat-temp`, then `move_blob` it to
/// `master.dat` under `tests-<seed>/` — exercising both `write` and
/// `move` against the backend (spec §4.9 steps 2-4).
pub fn start_verification(backend: &dyn BlobBackend) -> Result<VerificationToken> {
    let seed = random_seed();
    let container = backend.container(&verification_container_path(&seed));

    container
        .write(VERIFICATION_MASTER_TMP_NAME, seed.as_bytes())
        .map_err(|e| wrap_verification_error(&seed, e))?;

    container
        .move_blob(VERIFICATION_MASTER_TMP_NAME, VERIFICATION_MASTER_NAME)
        .map_err(|e| wrap_verification_error(&seed, e))?;

    Ok(VerificationToken(seed))
}

/// Recursively delete `tests-<seed>/` (spec §4.9 `end_verification`).
pub fn end_verification(backend: &dyn BlobBackend, token: &VerificationToken) -> Result<()> {
    let container = backend.container(&verification_container_path(&token.0));
    container
        .delete_container()
        .map_err(|e| wrap_verification_error(&token.0, e))
}

fn wrap_verification_error(seed: &str, err: RepositoryError) -> RepositoryError {
    RepositoryError::VerificationError {
        path: verification_container_path(seed),
        source: anyhow!(err),
    }
}
