use hashbrown::HashMap as FastMap;
use log::warn;

use crate::bridge::EventCursor;
use crate::codec::text::TextCursor;
use crate::err::CodecResult;
use crate::model::event::XmlEvent;
use crate::settings::{CodecSettings, IndexedContentLevel, MAX_ATTRIBUTE_VALUE_SIZE, MAX_CHUNK_SIZE};

pub const DEFAULT_MAX_CHUNK_SIZE: usize = 32;
pub const DEFAULT_MAX_ATTRIBUTE_VALUE_SIZE: usize = 32;

/// Size thresholds controlling which content strings are added to the
/// vocabulary. Names are always indexed; only character chunks and
/// attribute values are gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabularyLimits {
    pub max_chunk_size: usize,
    pub max_attribute_value_size: usize,
}

impl VocabularyLimits {
    pub fn none() -> Self {
        VocabularyLimits {
            max_chunk_size: 0,
            max_attribute_value_size: 0,
        }
    }

    pub fn full() -> Self {
        VocabularyLimits {
            max_chunk_size: usize::MAX,
            max_attribute_value_size: usize::MAX,
        }
    }

    pub fn from_settings(settings: &CodecSettings) -> Self {
        match settings.indexed_content_level() {
            IndexedContentLevel::None => Self::none(),
            IndexedContentLevel::Default => Self::default(),
            IndexedContentLevel::Full => Self::full(),
            IndexedContentLevel::Custom => {
                let mut limits = Self::default();
                if let Some(size) = settings.custom_chunk_size() {
                    if size > 0 {
                        limits.max_chunk_size = size as usize;
                    } else {
                        warn!("ignoring non-positive `{MAX_CHUNK_SIZE}` of {size}");
                    }
                }
                if let Some(size) = settings.custom_attribute_value_size() {
                    if size > 0 {
                        limits.max_attribute_value_size = size as usize;
                    } else {
                        warn!("ignoring non-positive `{MAX_ATTRIBUTE_VALUE_SIZE}` of {size}");
                    }
                }
                limits
            }
        }
    }

    pub fn indexes_chunk(&self, len: usize) -> bool {
        len > 0 && len <= self.max_chunk_size
    }

    pub fn indexes_attribute_value(&self, len: usize) -> bool {
        len > 0 && len <= self.max_attribute_value_size
    }
}

impl Default for VocabularyLimits {
    fn default() -> Self {
        VocabularyLimits {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_attribute_value_size: DEFAULT_MAX_ATTRIBUTE_VALUE_SIZE,
        }
    }
}

/// A string table shared by both directions of the compact codec.
///
/// Indices are handed out in first-appearance order, so the same document
/// always produces the same table. The map only answers lookups; it is
/// never iterated into the output.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entries: Vec<String>,
    index: FastMap<String, u32, ahash::RandomState>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Vocabulary {
            entries: Vec::new(),
            index: FastMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// Returns the existing index for `value`, or appends it.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.index.get(value) {
            return index;
        }
        let index = self.entries.len() as u32;
        self.entries.push(value.to_string());
        self.index.insert(value.to_string(), index);
        index
    }

    pub fn resolve(&self, index: u32) -> Option<&str> {
        self.entries.get(index as usize).map(String::as_str)
    }

    /// Builds an external vocabulary from a textual document.
    ///
    /// Only names go in: element and attribute names, namespace bindings,
    /// processing-instruction targets and entity names. Content strings are
    /// left for the encoder to index against its own limits.
    pub fn train(&mut self, input: &[u8]) -> CodecResult<()> {
        let mut cursor = TextCursor::new(input);
        while let Some(event) = cursor.next_event()? {
            match event {
                XmlEvent::StartElement(element) => {
                    self.intern(&element.name.to_string());
                    for binding in &element.bindings {
                        self.intern(&binding.prefix);
                        self.intern(&binding.uri);
                    }
                    for attribute in &element.attributes {
                        self.intern(&attribute.name.to_string());
                    }
                }
                XmlEvent::ProcessingInstruction(pi) => {
                    self.intern(&pi.target);
                }
                XmlEvent::EntityRef(name) => {
                    self.intern(&name);
                }
                _ => {}
            }
        }
        Ok(())
    }
}
