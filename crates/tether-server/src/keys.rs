//! Key directory.
//!
//! One private JWK per `*.jwk` file. File names are informational; keys are
//! addressed by thumbprint, never by name. Hidden files are skipped so a key
//! can be retired by renaming it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tether_crypto::{Curve, KeyMaterial, ThumbprintAlgorithm};
use tracing::{debug, info};

use crate::error::ServerError;

/// Extension of key files.
pub const KEY_EXTENSION: &str = "jwk";

/// Read every key in `dir`, in file-name order.
///
/// # Errors
///
/// - `KeyStore`: the directory or a key file cannot be read or parsed
/// - `Config`: the directory holds no key files
pub fn load(dir: &Path) -> Result<Vec<KeyMaterial>, ServerError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| ServerError::key_store(dir, err))? {
        let path = entry.map_err(|err| ServerError::key_store(dir, err))?.path();
        if is_key_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(ServerError::Config(format!(
            "no *.{KEY_EXTENSION} files in {}",
            dir.display()
        )));
    }

    let mut keys = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = fs::read(&path).map_err(|err| ServerError::key_store(&path, err))?;
        let key = KeyMaterial::from_json(&bytes).map_err(|err| ServerError::key_store(&path, err))?;
        debug!(path = %path.display(), role = ?key.classify(), "loaded key");
        keys.push(key);
    }

    info!(dir = %dir.display(), count = keys.len(), "key directory loaded");
    Ok(keys)
}

/// Generate one exchange key and one signing key on `curve` into `dir`.
///
/// Each is written as `<SHA-256 thumbprint>.jwk`, readable only by the
/// owner on Unix. The directory is created if missing.
///
/// # Errors
///
/// - `KeyStore`: the directory or a file cannot be written
/// - `Protocol`: key generation failed
pub fn generate(dir: &Path, curve: Curve) -> Result<Vec<PathBuf>, ServerError> {
    fs::create_dir_all(dir).map_err(|err| ServerError::key_store(dir, err))?;

    let exchange = KeyMaterial::generate_exchange(curve).map_err(tether_core::ProtocolError::from)?;
    let signing = KeyMaterial::generate_signing(curve).map_err(tether_core::ProtocolError::from)?;

    let mut written = Vec::with_capacity(2);
    for key in [exchange, signing] {
        let name = format!("{}.{KEY_EXTENSION}", key.thumbprint(ThumbprintAlgorithm::Sha256));
        let path = dir.join(name);
        let json = key.to_json().map_err(|err| ServerError::key_store(&path, err))?;
        write_private(&path, &json)?;
        info!(path = %path.display(), role = ?key.classify(), %curve, "generated key");
        written.push(path);
    }
    Ok(written)
}

fn is_key_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_none_or(|name| name.starts_with('.'));
    !hidden && path.is_file() && path.extension().is_some_and(|ext| ext == KEY_EXTENSION)
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<(), ServerError> {
    use std::{io::Write, os::unix::fs::OpenOptionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .map_err(|err| ServerError::key_store(path, err))?;
    file.write_all(contents).map_err(|err| ServerError::key_store(path, err))
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<(), ServerError> {
    fs::write(path, contents).map_err(|err| ServerError::key_store(path, err))
}
