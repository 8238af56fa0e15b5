use std::borrow::Cow;
use std::io::{self, Cursor, Read};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use encoding::label::encoding_from_whatwg_label;
use encoding::{DecoderTrap, EncoderTrap, EncodingRef};

use crate::bridge::{EventCursor, EventSink, bridge};
use crate::codec::text::TextCursor;
use crate::codec::vocab::{Vocabulary, VocabularyLimits};
use crate::err::{BridgeResult, CodecError, CodecResult, CompactError};
use crate::model::event::{NsBinding, XmlAttribute, XmlElement, XmlEvent, XmlName, XmlPI};
use crate::settings::CodecSettings;

pub const COMPACT_MAGIC: &[u8; 4] = b"XBC1";
pub const FORMAT_VERSION: u8 = 1;

const TOKEN_ELEMENT_START: u8 = 0x01;
const TOKEN_ELEMENT_END: u8 = 0x02;
const TOKEN_CHARACTERS: u8 = 0x03;
const TOKEN_CDATA: u8 = 0x04;
const TOKEN_COMMENT: u8 = 0x05;
const TOKEN_PI: u8 = 0x06;
const TOKEN_ENTITY_REF: u8 = 0x07;
const TOKEN_DOCTYPE: u8 = 0x08;
const TOKEN_END_OF_DOCUMENT: u8 = 0x0F;

const SLOT_LITERAL: u8 = 0x00;
const SLOT_LITERAL_INDEXED: u8 = 0x01;
const SLOT_REFERENCE: u8 = 0x02;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u8 {
        const EXTERNAL_VOCABULARY = 0b0000_0001;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompactToken {
    ElementStart,
    ElementEnd,
    Characters,
    CData,
    Comment,
    ProcessingInstruction,
    EntityRef,
    DocType,
    EndOfDocument,
}

impl CompactToken {
    fn from_u8(byte: u8) -> Option<CompactToken> {
        match byte {
            TOKEN_ELEMENT_START => Some(CompactToken::ElementStart),
            TOKEN_ELEMENT_END => Some(CompactToken::ElementEnd),
            TOKEN_CHARACTERS => Some(CompactToken::Characters),
            TOKEN_CDATA => Some(CompactToken::CData),
            TOKEN_COMMENT => Some(CompactToken::Comment),
            TOKEN_PI => Some(CompactToken::ProcessingInstruction),
            TOKEN_ENTITY_REF => Some(CompactToken::EntityRef),
            TOKEN_DOCTYPE => Some(CompactToken::DocType),
            TOKEN_END_OF_DOCUMENT => Some(CompactToken::EndOfDocument),
            _ => None,
        }
    }
}

/// Push sink producing a compact document.
///
/// The layout is `XBC1`, a version byte, header flags, the encoding label,
/// then the token stream, then a CRC32 of the token stream. Names are always
/// indexed into the vocabulary; character chunks and attribute values only
/// within the configured limits.
pub struct CompactSink<'a> {
    out: &'a mut Vec<u8>,
    encoding: EncodingRef,
    limits: VocabularyLimits,
    vocab: Vocabulary,
    external: bool,
    body_start: usize,
}

impl<'a> CompactSink<'a> {
    pub fn new(out: &'a mut Vec<u8>, settings: &CodecSettings) -> Self {
        Self::with_table(out, settings, Vocabulary::new(), false)
    }

    /// Encodes against a pre-trained vocabulary. The flags byte records
    /// this, and decoding will demand the same table.
    pub fn with_vocabulary(
        out: &'a mut Vec<u8>,
        settings: &CodecSettings,
        vocabulary: Vocabulary,
    ) -> Self {
        Self::with_table(out, settings, vocabulary, true)
    }

    fn with_table(
        out: &'a mut Vec<u8>,
        settings: &CodecSettings,
        vocab: Vocabulary,
        external: bool,
    ) -> Self {
        CompactSink {
            out,
            encoding: settings.payload_encoding(),
            limits: VocabularyLimits::from_settings(settings),
            vocab,
            external,
            body_start: 0,
        }
    }

    fn write_name_slot(&mut self, name: &str) -> CodecResult<()> {
        self.write_slot(name, true)
    }

    fn write_slot(&mut self, value: &str, indexable: bool) -> CodecResult<()> {
        if indexable {
            if let Some(index) = self.vocab.lookup(value) {
                self.out.push(SLOT_REFERENCE);
                self.out.write_u32::<LittleEndian>(index)?;
                return Ok(());
            }
            self.vocab.intern(value);
            self.out.push(SLOT_LITERAL_INDEXED);
        } else {
            self.out.push(SLOT_LITERAL);
        }
        self.write_string(value)
    }

    fn write_string(&mut self, value: &str) -> CodecResult<()> {
        let bytes = self
            .encoding
            .encode(value, EncoderTrap::Strict)
            .map_err(|message| CodecError::Encoding {
                encoding: self.encoding.name(),
                message: message.into_owned(),
            })?;
        self.out.write_u32::<LittleEndian>(bytes.len() as u32)?;
        self.out.extend_from_slice(&bytes);
        Ok(())
    }
}

impl EventSink for CompactSink<'_> {
    fn visit_start_document(&mut self) -> CodecResult<()> {
        self.out.extend_from_slice(COMPACT_MAGIC);
        self.out.push(FORMAT_VERSION);
        let mut flags = HeaderFlags::empty();
        if self.external {
            flags |= HeaderFlags::EXTERNAL_VOCABULARY;
        }
        self.out.push(flags.bits());
        let label = self.encoding.name();
        self.out.write_u16::<LittleEndian>(label.len() as u16)?;
        self.out.extend_from_slice(label.as_bytes());
        self.body_start = self.out.len();
        Ok(())
    }

    fn visit_end_document(&mut self) -> CodecResult<()> {
        self.out.push(TOKEN_END_OF_DOCUMENT);
        let checksum = crc32fast::hash(&self.out[self.body_start..]);
        self.out.write_u32::<LittleEndian>(checksum)?;
        Ok(())
    }

    fn visit_open_start_element(&mut self, element: &XmlElement<'_>) -> CodecResult<()> {
        self.out.push(TOKEN_ELEMENT_START);
        self.write_name_slot(&element.name.to_string())?;
        self.out
            .write_u16::<LittleEndian>(element.bindings.len() as u16)?;
        for binding in &element.bindings {
            self.write_name_slot(&binding.prefix)?;
            self.write_name_slot(&binding.uri)?;
        }
        self.out
            .write_u16::<LittleEndian>(element.attributes.len() as u16)?;
        for attribute in &element.attributes {
            self.write_name_slot(&attribute.name.to_string())?;
            let indexable = self.limits.indexes_attribute_value(attribute.value.len());
            self.write_slot(&attribute.value, indexable)?;
        }
        Ok(())
    }

    fn visit_close_element(&mut self, _name: &XmlName<'_>) -> CodecResult<()> {
        // The decoder tracks open elements itself, so no name goes out.
        self.out.push(TOKEN_ELEMENT_END);
        Ok(())
    }

    fn visit_characters(&mut self, text: &str) -> CodecResult<()> {
        self.out.push(TOKEN_CHARACTERS);
        let indexable = self.limits.indexes_chunk(text.len());
        self.write_slot(text, indexable)
    }

    fn visit_cdata_section(&mut self, text: &str) -> CodecResult<()> {
        self.out.push(TOKEN_CDATA);
        let indexable = self.limits.indexes_chunk(text.len());
        self.write_slot(text, indexable)
    }

    fn visit_comment(&mut self, text: &str) -> CodecResult<()> {
        self.out.push(TOKEN_COMMENT);
        self.write_string(text)
    }

    fn visit_processing_instruction(&mut self, pi: &XmlPI<'_>) -> CodecResult<()> {
        self.out.push(TOKEN_PI);
        self.write_name_slot(&pi.target)?;
        self.write_string(&pi.data)
    }

    fn visit_entity_reference(&mut self, name: &str) -> CodecResult<()> {
        self.out.push(TOKEN_ENTITY_REF);
        self.write_name_slot(name)
    }

    fn visit_doctype(&mut self, content: &str) -> CodecResult<()> {
        self.out.push(TOKEN_DOCTYPE);
        self.write_string(content)
    }
}

#[derive(Debug)]
enum Slot {
    Fresh(String),
    Table(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Header,
    InBody,
    Ended,
}

/// Pull cursor over a compact document held in memory.
///
/// With string interning on, vocabulary hits borrow straight from the
/// table; otherwise every event carries freshly allocated strings.
pub struct CompactCursor<'a> {
    cursor: Cursor<&'a [u8]>,
    interning: bool,
    seed: Option<Vocabulary>,
    vocab: Vocabulary,
    encoding: EncodingRef,
    open_elements: Vec<String>,
    state: DecoderState,
    body_start: u64,
}

impl<'a> CompactCursor<'a> {
    pub fn new(input: &'a [u8], settings: &CodecSettings) -> Self {
        Self::with_table(input, settings, None)
    }

    pub fn with_vocabulary(
        input: &'a [u8],
        settings: &CodecSettings,
        vocabulary: Vocabulary,
    ) -> Self {
        Self::with_table(input, settings, Some(vocabulary))
    }

    fn with_table(input: &'a [u8], settings: &CodecSettings, seed: Option<Vocabulary>) -> Self {
        let vocab = match &seed {
            Some(seed) => seed.clone(),
            None => Vocabulary::new(),
        };
        CompactCursor {
            cursor: Cursor::new(input),
            interning: settings.should_intern_strings(),
            seed,
            vocab,
            encoding: encoding::all::UTF_8,
            open_elements: Vec::new(),
            state: DecoderState::Header,
            body_start: 0,
        }
    }

    fn read_header(&mut self) -> CodecResult<()> {
        let mut magic = [0_u8; 4];
        self.cursor
            .read_exact(&mut magic)
            .map_err(|e| CompactError::FailedToRead {
                what: "compact magic",
                offset: 0,
                source: e,
            })?;
        if &magic != COMPACT_MAGIC {
            return Err(CompactError::InvalidMagic { found: magic }.into());
        }

        let version = try_read!(self.cursor, u8, "format version");
        if version != FORMAT_VERSION {
            return Err(CompactError::UnsupportedVersion { version }.into());
        }

        let value = try_read!(self.cursor, u8, "header flags");
        let flags =
            HeaderFlags::from_bits(value).ok_or(CompactError::UnknownHeaderFlags { value })?;

        let label_len = usize::from(try_read!(self.cursor, u16, "encoding label length"));
        let offset = self.cursor.position();
        let data = *self.cursor.get_ref();
        let start = offset as usize;
        let bytes =
            data.get(start..start + label_len)
                .ok_or_else(|| CompactError::FailedToRead {
                    what: "encoding label",
                    offset,
                    source: io::Error::from(io::ErrorKind::UnexpectedEof),
                })?;
        let label = String::from_utf8_lossy(bytes).into_owned();
        self.cursor.set_position((start + label_len) as u64);

        self.encoding = encoding_from_whatwg_label(&label)
            .ok_or(CompactError::UnknownEncodingLabel { label })?;

        if flags.contains(HeaderFlags::EXTERNAL_VOCABULARY) && self.seed.is_none() {
            return Err(CompactError::ExternalVocabularyRequired.into());
        }

        self.body_start = self.cursor.position();
        Ok(())
    }

    fn read_string(&mut self, what: &'static str) -> CodecResult<String> {
        let len = try_read!(self.cursor, u32, what) as usize;
        let offset = self.cursor.position();
        let data = *self.cursor.get_ref();
        let start = offset as usize;
        let bytes = data
            .get(start..start + len)
            .ok_or_else(|| CompactError::FailedToRead {
                what,
                offset,
                source: io::Error::from(io::ErrorKind::UnexpectedEof),
            })?;
        let value = self
            .encoding
            .decode(bytes, DecoderTrap::Strict)
            .map_err(|message| CompactError::FailedToDecodeString {
                encoding: self.encoding.name().to_string(),
                offset,
                message: message.into_owned(),
            })?;
        self.cursor.set_position((start + len) as u64);
        Ok(value)
    }

    fn read_slot(&mut self, what: &'static str) -> CodecResult<Slot> {
        let offset = self.cursor.position();
        let kind = try_read!(self.cursor, u8, what);
        match kind {
            SLOT_LITERAL => Ok(Slot::Fresh(self.read_string(what)?)),
            SLOT_LITERAL_INDEXED => {
                let value = self.read_string(what)?;
                let index = self.vocab.intern(&value);
                if self.interning {
                    Ok(Slot::Table(index))
                } else {
                    Ok(Slot::Fresh(value))
                }
            }
            SLOT_REFERENCE => {
                let index = try_read!(self.cursor, u32, what);
                match self.vocab.resolve(index) {
                    Some(resolved) if !self.interning => Ok(Slot::Fresh(resolved.to_string())),
                    Some(_) => Ok(Slot::Table(index)),
                    None => Err(CompactError::UnknownStringIndex { index, offset }.into()),
                }
            }
            value => Err(CompactError::InvalidStringSlot { value, offset }.into()),
        }
    }

    fn slot_text(&self, slot: &Slot) -> String {
        match slot {
            Slot::Fresh(value) => value.clone(),
            // Index was validated when the slot was read.
            Slot::Table(index) => self.vocab.resolve(*index).unwrap_or("").to_string(),
        }
    }

    fn resolve_slot(&self, slot: Slot) -> Cow<'_, str> {
        match slot {
            Slot::Fresh(value) => Cow::Owned(value),
            // Index was validated when the slot was read.
            Slot::Table(index) => Cow::Borrowed(self.vocab.resolve(index).unwrap_or("")),
        }
    }

    fn name_from_slot(&self, slot: Slot) -> XmlName<'_> {
        match self.resolve_slot(slot) {
            Cow::Borrowed(name) => XmlName::parse(name),
            Cow::Owned(name) => XmlName::parse(&name).into_owned(),
        }
    }
}

impl EventCursor for CompactCursor<'_> {
    fn rewind(&mut self) -> CodecResult<()> {
        self.cursor.set_position(0);
        self.vocab = match &self.seed {
            Some(seed) => seed.clone(),
            None => Vocabulary::new(),
        };
        self.open_elements.clear();
        self.state = DecoderState::Header;
        self.body_start = 0;
        Ok(())
    }

    fn next_event(&mut self) -> CodecResult<Option<XmlEvent<'_>>> {
        match self.state {
            DecoderState::Ended => return Ok(None),
            DecoderState::Header => {
                self.read_header()?;
                self.state = DecoderState::InBody;
                return Ok(Some(XmlEvent::StartDocument));
            }
            DecoderState::InBody => {}
        }

        let offset = self.cursor.position();
        let byte = try_read!(self.cursor, u8, "compact token");
        let token = CompactToken::from_u8(byte)
            .ok_or(CompactError::InvalidToken { value: byte, offset })?;

        match token {
            CompactToken::ElementStart => {
                let name = self.read_slot("element name")?;
                let binding_count = try_read!(self.cursor, u16, "namespace binding count");
                let mut bindings = Vec::with_capacity(usize::from(binding_count));
                for _ in 0..binding_count {
                    let prefix = self.read_slot("namespace prefix")?;
                    let uri = self.read_slot("namespace uri")?;
                    bindings.push((prefix, uri));
                }
                let attribute_count = try_read!(self.cursor, u16, "attribute count");
                let mut attributes = Vec::with_capacity(usize::from(attribute_count));
                for _ in 0..attribute_count {
                    let attr_name = self.read_slot("attribute name")?;
                    let value = self.read_slot("attribute value")?;
                    attributes.push((attr_name, value));
                }

                self.open_elements.push(self.slot_text(&name));

                let element = XmlElement {
                    name: self.name_from_slot(name),
                    bindings: bindings
                        .into_iter()
                        .map(|(prefix, uri)| NsBinding {
                            prefix: self.resolve_slot(prefix),
                            uri: self.resolve_slot(uri),
                        })
                        .collect(),
                    attributes: attributes
                        .into_iter()
                        .map(|(attr_name, value)| XmlAttribute {
                            name: self.name_from_slot(attr_name),
                            value: self.resolve_slot(value),
                        })
                        .collect(),
                };
                Ok(Some(XmlEvent::StartElement(element)))
            }
            CompactToken::ElementEnd => {
                let name = self
                    .open_elements
                    .pop()
                    .ok_or(CompactError::UnbalancedClose { offset })?;
                Ok(Some(XmlEvent::EndElement(XmlName::parse(&name).into_owned())))
            }
            CompactToken::Characters => {
                let slot = self.read_slot("character data")?;
                Ok(Some(XmlEvent::Characters(self.resolve_slot(slot))))
            }
            CompactToken::CData => {
                let slot = self.read_slot("cdata section")?;
                Ok(Some(XmlEvent::CData(self.resolve_slot(slot))))
            }
            CompactToken::Comment => {
                let text = self.read_string("comment")?;
                Ok(Some(XmlEvent::Comment(text.into())))
            }
            CompactToken::ProcessingInstruction => {
                let target = self.read_slot("processing-instruction target")?;
                let data = self.read_string("processing-instruction data")?;
                Ok(Some(XmlEvent::ProcessingInstruction(XmlPI {
                    target: self.resolve_slot(target),
                    data: data.into(),
                })))
            }
            CompactToken::EntityRef => {
                let slot = self.read_slot("entity name")?;
                Ok(Some(XmlEvent::EntityRef(self.resolve_slot(slot))))
            }
            CompactToken::DocType => {
                let text = self.read_string("doctype")?;
                Ok(Some(XmlEvent::DocType(text.into())))
            }
            CompactToken::EndOfDocument => {
                let data = *self.cursor.get_ref();
                let body_end = self.cursor.position() as usize;
                let computed = crc32fast::hash(&data[self.body_start as usize..body_end]);
                let expected = try_read!(self.cursor, u32, "checksum trailer");
                if expected != computed {
                    return Err(CompactError::ChecksumMismatch { expected, computed }.into());
                }
                if (self.cursor.position() as usize) != data.len() {
                    return Err(CompactError::TrailingData.into());
                }
                self.state = DecoderState::Ended;
                Ok(Some(XmlEvent::EndDocument))
            }
        }
    }
}

/// Encodes a textual document into a fresh compact buffer.
pub fn transcode(
    input: &[u8],
    settings: &CodecSettings,
    vocabulary: Option<&Vocabulary>,
) -> BridgeResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut cursor = TextCursor::new(input);
    match vocabulary {
        Some(vocab) => {
            let mut sink = CompactSink::with_vocabulary(&mut out, settings, vocab.clone());
            bridge(&mut cursor, &mut sink)?;
        }
        None => {
            let mut sink = CompactSink::new(&mut out, settings);
            bridge(&mut cursor, &mut sink)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::buffer::EventBuffer;
    use crate::settings::IndexedContentLevel;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = concat!(
        r#"<inv:list xmlns:inv="urn:inventory" rev="7">"#,
        r#"<item sku="A-110">widget</item>"#,
        r#"<item sku="A-110">widget</item>"#,
        r#"<!-- replicated nightly -->"#,
        r#"</inv:list>"#
    );

    fn text_events(xml: &str) -> EventBuffer {
        let mut cursor = TextCursor::new(xml.as_bytes());
        let mut buffer = EventBuffer::new();
        bridge(&mut cursor, &mut buffer).unwrap();
        buffer
    }

    fn compact_events(doc: &[u8], settings: &CodecSettings) -> EventBuffer {
        let mut cursor = CompactCursor::new(doc, settings);
        let mut buffer = EventBuffer::new();
        bridge(&mut cursor, &mut buffer).unwrap();
        buffer
    }

    fn decode_error(doc: &[u8], settings: &CodecSettings) -> CompactError {
        let mut cursor = CompactCursor::new(doc, settings);
        let mut buffer = EventBuffer::new();
        match bridge(&mut cursor, &mut buffer) {
            Ok(_) => panic!("decoding should have failed"),
            Err(e) => match e.into_codec_error() {
                Some(CodecError::Compact(compact)) => compact,
                other => panic!("unexpected error: {other:?}"),
            },
        }
    }

    #[test]
    fn transcoding_preserves_the_event_stream() {
        let settings = CodecSettings::new();
        let doc = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();

        assert_eq!(&doc[..4], COMPACT_MAGIC);
        assert_eq!(compact_events(&doc, &settings), text_events(SAMPLE));
    }

    #[test]
    fn encoding_is_deterministic() {
        let settings = CodecSettings::new();
        let first = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();
        let second = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn interning_does_not_change_the_events() {
        let settings = CodecSettings::new();
        let doc = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();

        let interned = CodecSettings::new().string_interning(true);
        assert_eq!(compact_events(&doc, &interned), compact_events(&doc, &settings));
    }

    #[test]
    fn repeated_names_are_referenced_not_repeated() {
        let settings = CodecSettings::new().indexed_content(IndexedContentLevel::None);
        let one = "<list><inventory-line-item>x</inventory-line-item></list>";
        let two = "<list><inventory-line-item>x</inventory-line-item>\
                   <inventory-line-item>x</inventory-line-item></list>";

        let doc_one = transcode(one.as_bytes(), &settings, None).unwrap();
        let doc_two = transcode(two.as_bytes(), &settings, None).unwrap();

        // The second item re-uses its name slot; only references are added.
        let growth = doc_two.len() - doc_one.len();
        let repeated_source = two.len() - one.len();
        assert!(growth < repeated_source, "growth {growth} >= {repeated_source}");
    }

    #[test]
    fn full_indexing_shrinks_repeated_content() {
        let xml = format!(
            "<log>{}</log>",
            "<line>a rather long repeated payload string 0123456789</line>".repeat(20)
        );
        let none = CodecSettings::new().indexed_content(IndexedContentLevel::None);
        let full = CodecSettings::new().indexed_content(IndexedContentLevel::Full);

        let doc_none = transcode(xml.as_bytes(), &none, None).unwrap();
        let doc_full = transcode(xml.as_bytes(), &full, None).unwrap();

        assert!(doc_full.len() < doc_none.len());
        assert_eq!(compact_events(&doc_full, &full), text_events(&xml));
    }

    #[test]
    fn external_vocabulary_round_trips_and_shrinks() {
        let settings = CodecSettings::new().use_external_vocabulary(true);
        let mut vocab = Vocabulary::new();
        vocab.train(SAMPLE.as_bytes()).unwrap();

        let seeded = transcode(SAMPLE.as_bytes(), &settings, Some(&vocab)).unwrap();
        let bare = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();
        assert!(seeded.len() < bare.len());

        let mut cursor = CompactCursor::with_vocabulary(&seeded, &settings, vocab);
        let mut buffer = EventBuffer::new();
        bridge(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, text_events(SAMPLE));
    }

    #[test]
    fn external_vocabulary_is_demanded_by_the_header() {
        let settings = CodecSettings::new().use_external_vocabulary(true);
        let mut vocab = Vocabulary::new();
        vocab.train(SAMPLE.as_bytes()).unwrap();
        let doc = transcode(SAMPLE.as_bytes(), &settings, Some(&vocab)).unwrap();

        assert!(matches!(
            decode_error(&doc, &settings),
            CompactError::ExternalVocabularyRequired
        ));
    }

    #[test]
    fn header_corruption_is_named_precisely() {
        let settings = CodecSettings::new();
        let doc = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();

        let mut bad_magic = doc.clone();
        bad_magic[0] = b'Y';
        assert!(matches!(
            decode_error(&bad_magic, &settings),
            CompactError::InvalidMagic { .. }
        ));

        let mut bad_version = doc.clone();
        bad_version[4] = 9;
        assert!(matches!(
            decode_error(&bad_version, &settings),
            CompactError::UnsupportedVersion { version: 9 }
        ));

        let mut bad_flags = doc.clone();
        bad_flags[5] = 0x80;
        assert!(matches!(
            decode_error(&bad_flags, &settings),
            CompactError::UnknownHeaderFlags { value: 0x80 }
        ));
    }

    #[test]
    fn flipped_payload_byte_fails_the_checksum() {
        let settings = CodecSettings::new().indexed_content(IndexedContentLevel::None);
        let doc = transcode(b"<r>Zebra crossing, mind the gap</r>", &settings, None).unwrap();

        let mut corrupt = doc.clone();
        let pos = corrupt.iter().position(|&b| b == b'Z').unwrap();
        corrupt[pos] ^= 0x01;

        assert!(matches!(
            decode_error(&corrupt, &settings),
            CompactError::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn bytes_after_the_trailer_are_rejected() {
        let settings = CodecSettings::new();
        let mut doc = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();
        doc.push(0x00);

        assert!(matches!(
            decode_error(&doc, &settings),
            CompactError::TrailingData
        ));
    }

    #[test]
    fn truncated_document_reports_the_missing_field() {
        let settings = CodecSettings::new();
        let doc = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();

        assert!(matches!(
            decode_error(&doc[..doc.len() - 6], &settings),
            CompactError::FailedToRead { .. } | CompactError::InvalidToken { .. }
        ));
    }

    #[test]
    fn rewind_decodes_identically() {
        let settings = CodecSettings::new().string_interning(true);
        let doc = transcode(SAMPLE.as_bytes(), &settings, None).unwrap();

        let mut cursor = CompactCursor::new(&doc, &settings);
        let mut first = EventBuffer::new();
        bridge(&mut cursor, &mut first).unwrap();

        cursor.rewind().unwrap();
        let mut second = EventBuffer::new();
        bridge(&mut cursor, &mut second).unwrap();

        assert_eq!(first, second);
    }
}
