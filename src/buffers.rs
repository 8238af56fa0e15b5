use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::err::InputError;

/// In-memory copy of a test case payload.
///
/// Loaded once during `prepare`; the timed phase never goes back to the
/// filesystem.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    bytes: Vec<u8>,
}

impl InputBuffer {
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let path = path
            .canonicalize()
            .map_err(|e| InputError::FailedToOpenFile {
                path: path.to_owned(),
                source: e,
            })?;
        let mut file = File::open(&path).map_err(|e| InputError::FailedToOpenFile {
            path: path.clone(),
            source: e,
        })?;

        let capacity = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        let mut bytes = Vec::with_capacity(capacity);
        file.read_to_end(&mut bytes)
            .map_err(|e| InputError::FailedToRead { path, source: e })?;

        Ok(InputBuffer { bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        InputBuffer { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reusable output target for the timed phase. `reset` drops the content
/// but keeps the allocation, so steady-state iterations do not pay for
/// growth again.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn writer(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
