use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::driver::Phase;

pub type Result<T> = std::result::Result<T, BenchError>;
pub type CodecResult<T> = std::result::Result<T, CodecError>;
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
pub type ParamResult<T> = std::result::Result<T, ParameterError>;

/// Crate-level error, one variant per concern.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("a lifecycle rule was violated")]
    Lifecycle(#[from] LifecycleError),

    #[error("a configuration parameter could not be resolved")]
    Parameter(#[from] ParameterError),

    #[error("failed to bridge the event stream")]
    Bridge(#[from] BridgeError),

    #[error("failed to load benchmark input")]
    Input(#[from] InputError),

    #[error("driver `{driver}` failed during `{operation}` of test case `{test_case}`")]
    Codec {
        driver: String,
        operation: &'static str,
        test_case: String,
        source: CodecError,
    },

    #[error("failed to normalize input for test case `{test_case}`")]
    Normalize {
        test_case: String,
        source: Box<BenchError>,
    },

    #[error("failed to load suite configuration {}", path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("driver `{0}` is not registered")]
    UnknownDriver(String),
}

impl BenchError {
    pub fn during(
        driver: &str,
        operation: &'static str,
        test_case: &str,
        source: CodecError,
    ) -> Self {
        BenchError::Codec {
            driver: driver.to_string(),
            operation,
            test_case: test_case.to_string(),
            source,
        }
    }
}

/// Phase ordering violations. Fatal for the driver instance that raised them.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("`{operation}` called while driver `{driver}` is {phase}")]
    OutOfOrder {
        driver: String,
        operation: &'static str,
        phase: Phase,
    },

    #[error("driver `{driver}` was already initialized")]
    DoubleInitialize { driver: String },

    #[error("driver `{driver}` failed in an earlier phase and must be re-created")]
    Poisoned { driver: String },

    #[error("input {} loaded into an empty buffer", path.display())]
    EmptyInput { path: PathBuf },
}

/// Typed parameter lookups fail loudly; callers that want a default apply it
/// explicitly on a missing key, never on a mismatched one.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("parameter `{name}` holds a {actual}, but a {requested} was requested")]
    TypeMismatch {
        name: String,
        requested: &'static str,
        actual: &'static str,
    },

    #[error("parameter `{name}` has unrecognized value `{value}`")]
    InvalidValue { name: String, value: String },
}

/// Event stream failures observed while bridging. The index identifies the
/// offending event so partial sink output can be correlated.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("the source failed while producing event {index}")]
    Source { index: usize, source: CodecError },

    #[error("the sink rejected event {index}")]
    Sink { index: usize, source: CodecError },

    #[error("document truncated after event {index}: {open_elements} element(s) left open")]
    Truncated { index: usize, open_elements: usize },

    #[error("event {index} closes `{found}` but `{expected}` is open")]
    MismatchedClose {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("event {index} is out of order: {what}")]
    OutOfOrder { index: usize, what: &'static str },

    #[error("event {index} references undeclared namespace prefix `{prefix}`")]
    UndeclaredPrefix { index: usize, prefix: String },
}

impl BridgeError {
    /// Index of the offending event. For truncation this is the last event
    /// that was processed successfully.
    pub fn event_index(&self) -> usize {
        match self {
            BridgeError::Source { index, .. }
            | BridgeError::Sink { index, .. }
            | BridgeError::Truncated { index, .. }
            | BridgeError::MismatchedClose { index, .. }
            | BridgeError::OutOfOrder { index, .. }
            | BridgeError::UndeclaredPrefix { index, .. } => *index,
        }
    }

    /// The codec failure underneath, when one side of the bridge failed.
    pub fn into_codec_error(self) -> Option<CodecError> {
        match self {
            BridgeError::Source { source, .. } | BridgeError::Sink { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure inside one of the collaborating codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed XML text")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed compact document")]
    Compact(#[from] CompactError),

    #[error("data binding failed")]
    Bind(#[from] serde_json::Error),

    #[error("an I/O error has occurred")]
    Io(#[from] io::Error),

    #[error("failed to encode string as {encoding}: {message}")]
    Encoding {
        encoding: &'static str,
        message: String,
    },
}

/// Errors in the compact wire format.
#[derive(Debug, Error)]
pub enum CompactError {
    #[error("invalid compact document magic, expected `XBC1`, found `{found:02X?}`")]
    InvalidMagic { found: [u8; 4] },

    #[error("unsupported compact format version {version}")]
    UnsupportedVersion { version: u8 },

    #[error("unknown compact header flags value: {value:#04x}")]
    UnknownHeaderFlags { value: u8 },

    #[error("offset {offset}: an I/O error has occurred while trying to read {what}")]
    FailedToRead {
        what: &'static str,
        offset: u64,
        source: io::Error,
    },

    #[error("offset {offset}: tried to read an invalid byte `{value:#04x}` as a compact token")]
    InvalidToken { value: u8, offset: u64 },

    #[error("offset {offset}: tried to read an invalid byte `{value:#04x}` as a string slot")]
    InvalidStringSlot { value: u8, offset: u64 },

    #[error("offset {offset}: string index {index} is not in the vocabulary")]
    UnknownStringIndex { index: u32, offset: u64 },

    #[error("offset {offset}: close token without an open element")]
    UnbalancedClose { offset: u64 },

    #[error("offset {offset}: failed to decode a {encoding} string: {message}")]
    FailedToDecodeString {
        encoding: String,
        offset: u64,
        message: String,
    },

    #[error("unknown string encoding label `{label}` in compact header")]
    UnknownEncodingLabel { label: String },

    #[error("document was encoded against an external vocabulary, but none was supplied")]
    ExternalVocabularyRequired,

    #[error("body checksum mismatch: trailer has {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("compact document continues past the end-of-document token")]
    TrailingData,
}

/// Failures while loading benchmark inputs from disk. These can only occur
/// during `prepare`; the timed phase never touches the filesystem.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open input file {}", path.display())]
    FailedToOpenFile { path: PathBuf, source: io::Error },

    #[error("failed to read input {}", path.display())]
    FailedToRead { path: PathBuf, source: io::Error },
}
