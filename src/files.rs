use crate::config::SessionConfig;
use crate::constants::{CIPHERTEXT_FILE, KEY_FILE, OUTPUT_FILE, TRAILER_FILE};
use crate::error::SessionError;
use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;

/// Locations of the four session files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFiles {
    pub key: PathBuf,
    pub ciphertext: PathBuf,
    pub output: PathBuf,
    pub trailer: PathBuf,
}

/// Everything sent to the device, loaded before the link is touched.
#[derive(Debug, Clone)]
pub struct SessionInputs {
    pub key: Bytes,
    pub ciphertext: Bytes,
    pub trailer: Bytes,
}

impl Default for SessionFiles {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

impl SessionFiles {
    /// `key.bin`, `enc1.bin`, `dec1.bin` and `end.bin` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            key: dir.join(KEY_FILE),
            ciphertext: dir.join(CIPHERTEXT_FILE),
            output: dir.join(OUTPUT_FILE),
            trailer: dir.join(TRAILER_FILE),
        }
    }

    /// Load key, ciphertext and trailer.
    ///
    /// Only the first `key_len` bytes of the key file are used. The ciphertext
    /// is rejected here when it is not block aligned, so the output file is
    /// never created for bad input.
    pub fn load(&self, config: &SessionConfig) -> Result<SessionInputs, SessionError> {
        config.validate()?;
        let key = read_prefix(&self.key, config.key_len)?;
        if key.len() < config.key_len {
            return Err(SessionError::KeyTooShort {
                expected: config.key_len,
                actual: key.len(),
            });
        }

        let ciphertext = read_all(&self.ciphertext)?;
        let blocks = config.block_count(ciphertext.len())?;
        let trailer = read_all(&self.trailer)?;

        info!(
            key = %self.key.display(),
            ciphertext = %self.ciphertext.display(),
            blocks,
            trailer_bytes = trailer.len(),
            "Loaded session inputs"
        );

        Ok(SessionInputs {
            key: Bytes::from(key),
            ciphertext: Bytes::from(ciphertext),
            trailer: Bytes::from(trailer),
        })
    }

    /// Create (or truncate) the response file.
    pub fn create_output(&self) -> Result<File, SessionError> {
        File::create(&self.output).map_err(|e| with_path(e, &self.output))
    }
}

fn read_prefix(path: &Path, len: usize) -> Result<Vec<u8>, SessionError> {
    let file = File::open(path).map_err(|e| with_path(e, path))?;
    let mut buf = Vec::with_capacity(len);
    file.take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|e| with_path(e, path))?;
    Ok(buf)
}

fn read_all(path: &Path) -> Result<Vec<u8>, SessionError> {
    std::fs::read(path).map_err(|e| with_path(e, path))
}

fn with_path(e: io::Error, path: &Path) -> SessionError {
    SessionError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
}
