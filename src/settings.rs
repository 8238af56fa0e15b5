use std::fmt;

use encoding::label::encoding_from_whatwg_label;
use encoding::{EncodingRef, all::UTF_8};
use log::debug;

use crate::err::{ParamResult, ParameterError};
use crate::params::Params;

/// Knob names read from [`Params`].
pub const STRING_INTERNING: &str = "stringInterning";
pub const INDEXED_CONTENT_LEVEL: &str = "indexedContentLevel";
pub const MAX_CHUNK_SIZE: &str = "maxChunkSize";
pub const MAX_ATTRIBUTE_VALUE_SIZE: &str = "maxAttributeValueSize";
pub const USE_EXTERNAL_VOCABULARY: &str = "useExternalVocabulary";
pub const NORMALIZE_BEFORE_TIMING: &str = "normalizeBeforeTiming";
pub const ENCODING: &str = "encoding";
pub const REPORT_OUTPUT_SIZE: &str = "reportOutputSize";

/// How aggressively the compact codec indexes character content and
/// attribute values into its vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexedContentLevel {
    /// Value indexing disabled entirely.
    None,
    /// The codec's built-in limits, no override.
    #[default]
    Default,
    /// Effectively unbounded indexing.
    Full,
    /// Built-in limits overridden by `maxChunkSize`/`maxAttributeValueSize`.
    Custom,
}

impl IndexedContentLevel {
    fn from_param(name: &str, value: &str) -> ParamResult<Self> {
        match value {
            "none" => Ok(IndexedContentLevel::None),
            "default" => Ok(IndexedContentLevel::Default),
            "full" => Ok(IndexedContentLevel::Full),
            "custom" => Ok(IndexedContentLevel::Custom),
            other => Err(ParameterError::InvalidValue {
                name: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexedContentLevel::None => "none",
            IndexedContentLevel::Default => "default",
            IndexedContentLevel::Full => "full",
            IndexedContentLevel::Custom => "custom",
        }
    }
}

/// Static codec configuration, resolved once from [`Params`] and passed by
/// reference into every driver's `initialize`. There is no process-global
/// counterpart; two drivers can run with different settings side by side.
#[derive(Clone)]
pub struct CodecSettings {
    string_interning: bool,
    indexed_content: IndexedContentLevel,
    max_chunk_size: Option<i64>,
    max_attribute_value_size: Option<i64>,
    use_external_vocabulary: bool,
    normalize_before_timing: bool,
    string_encoding: EncodingRef,
    report_output_size: bool,
}

impl CodecSettings {
    pub fn new() -> Self {
        Default::default()
    }

    /// Reads every knob this crate understands. Missing keys keep their
    /// documented default; a key holding the wrong type or an unrecognized
    /// enumerated value is an error, never a silent fallback.
    pub fn from_params(params: &Params) -> ParamResult<Self> {
        let mut settings = CodecSettings::default();

        if let Some(flag) = params.get_boolean(STRING_INTERNING)? {
            settings.string_interning = flag;
        }
        if let Some(level) = params.get_string(INDEXED_CONTENT_LEVEL)? {
            settings.indexed_content = IndexedContentLevel::from_param(INDEXED_CONTENT_LEVEL, level)?;
        }
        // The size knobs only exist at the custom level.
        if settings.indexed_content == IndexedContentLevel::Custom {
            settings.max_chunk_size = params.get_long(MAX_CHUNK_SIZE)?;
            settings.max_attribute_value_size = params.get_long(MAX_ATTRIBUTE_VALUE_SIZE)?;
        }
        if let Some(flag) = params.get_boolean(USE_EXTERNAL_VOCABULARY)? {
            settings.use_external_vocabulary = flag;
        }
        if let Some(flag) = params.get_boolean(NORMALIZE_BEFORE_TIMING)? {
            settings.normalize_before_timing = flag;
        }
        if let Some(label) = params.get_string(ENCODING)? {
            settings.string_encoding =
                encoding_from_whatwg_label(label).ok_or_else(|| ParameterError::InvalidValue {
                    name: ENCODING.to_string(),
                    value: label.to_string(),
                })?;
        }
        if let Some(flag) = params.get_boolean(REPORT_OUTPUT_SIZE)? {
            settings.report_output_size = flag;
        }

        debug!("resolved codec settings: {settings:?}");
        Ok(settings)
    }

    pub fn string_interning(mut self, interning: bool) -> Self {
        self.string_interning = interning;
        self
    }

    pub fn indexed_content(mut self, level: IndexedContentLevel) -> Self {
        self.indexed_content = level;
        self
    }

    pub fn max_chunk_size(mut self, size: i64) -> Self {
        self.max_chunk_size = Some(size);
        self
    }

    pub fn max_attribute_value_size(mut self, size: i64) -> Self {
        self.max_attribute_value_size = Some(size);
        self
    }

    pub fn use_external_vocabulary(mut self, use_it: bool) -> Self {
        self.use_external_vocabulary = use_it;
        self
    }

    pub fn normalize_before_timing(mut self, normalize: bool) -> Self {
        self.normalize_before_timing = normalize;
        self
    }

    pub fn string_encoding(mut self, encoding: EncodingRef) -> Self {
        self.string_encoding = encoding;
        self
    }

    pub fn report_output_size(mut self, report: bool) -> Self {
        self.report_output_size = report;
        self
    }

    pub fn should_intern_strings(&self) -> bool {
        self.string_interning
    }

    pub fn indexed_content_level(&self) -> IndexedContentLevel {
        self.indexed_content
    }

    pub fn custom_chunk_size(&self) -> Option<i64> {
        self.max_chunk_size
    }

    pub fn custom_attribute_value_size(&self) -> Option<i64> {
        self.max_attribute_value_size
    }

    pub fn should_use_external_vocabulary(&self) -> bool {
        self.use_external_vocabulary
    }

    pub fn should_normalize_before_timing(&self) -> bool {
        self.normalize_before_timing
    }

    pub fn payload_encoding(&self) -> EncodingRef {
        self.string_encoding
    }

    pub fn should_report_output_size(&self) -> bool {
        self.report_output_size
    }
}

impl Default for CodecSettings {
    fn default() -> Self {
        CodecSettings {
            string_interning: false,
            indexed_content: IndexedContentLevel::Default,
            max_chunk_size: None,
            max_attribute_value_size: None,
            use_external_vocabulary: false,
            normalize_before_timing: false,
            string_encoding: UTF_8 as EncodingRef,
            report_output_size: true,
        }
    }
}

impl fmt::Debug for CodecSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSettings")
            .field("string_interning", &self.string_interning)
            .field("indexed_content", &self.indexed_content)
            .field("max_chunk_size", &self.max_chunk_size)
            .field("max_attribute_value_size", &self.max_attribute_value_size)
            .field("use_external_vocabulary", &self.use_external_vocabulary)
            .field("normalize_before_timing", &self.normalize_before_timing)
            .field("string_encoding", &self.string_encoding.name())
            .field("report_output_size", &self.report_output_size)
            .finish()
    }
}

impl PartialEq for CodecSettings {
    fn eq(&self, other: &Self) -> bool {
        self.string_interning == other.string_interning
            && self.indexed_content == other.indexed_content
            && self.max_chunk_size == other.max_chunk_size
            && self.max_attribute_value_size == other.max_attribute_value_size
            && self.use_external_vocabulary == other.use_external_vocabulary
            && self.normalize_before_timing == other.normalize_before_timing
            && self.string_encoding.name() == other.string_encoding.name()
            && self.report_output_size == other.report_output_size
    }
}
