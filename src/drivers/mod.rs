//! The concrete benchmark subjects.
//!
//! Every adapter implements [`Driver`] directly; what varies between them is
//! which side of a codec the timed region exercises. Shared concerns
//! (loading and normalizing the input, building the compact form, recording
//! sizes) live here as free helpers rather than in a base type.

mod bind;
mod byte_stream;
mod parse;
mod roundtrip;
mod serialize;

pub use bind::{BindMarshalDriver, BindUnmarshalDriver};
pub use byte_stream::ByteStreamDriver;
pub use parse::ParseDriver;
pub use roundtrip::RoundtripDriver;
pub use serialize::SerializeDriver;

use crate::bridge::{EventCursor, EventSink};
use crate::buffers::InputBuffer;
use crate::codec::Codec;
use crate::codec::compact::{CompactCursor, CompactSink, transcode};
use crate::codec::text::{TextCursor, TextSink};
use crate::codec::vocab::Vocabulary;
use crate::driver::{Driver, load_case_input};
use crate::err::{BenchError, Result};
use crate::normalize::normalize;
use crate::settings::CodecSettings;
use crate::suite::{RESULT_INPUT_KB, RESULT_OUTPUT_KB, TestCase};

/// Registry names, stable across releases; suite configs refer to these.
pub const DRIVER_NAMES: &[&str] = &[
    "byte-stream",
    "text-parse",
    "compact-parse",
    "text-serialize",
    "compact-serialize",
    "text-roundtrip",
    "compact-roundtrip",
    "bind-unmarshal-text",
    "bind-unmarshal-compact",
    "bind-marshal-text",
    "bind-marshal-compact",
];

/// Builds a driver by registry name.
pub fn create(name: &str) -> Result<Box<dyn Driver + Send>> {
    let driver: Box<dyn Driver + Send> = match name {
        "byte-stream" => Box::new(ByteStreamDriver::new()),
        "text-parse" => Box::new(ParseDriver::new(Codec::Text)),
        "compact-parse" => Box::new(ParseDriver::new(Codec::Compact)),
        "text-serialize" => Box::new(SerializeDriver::new(Codec::Text)),
        "compact-serialize" => Box::new(SerializeDriver::new(Codec::Compact)),
        "text-roundtrip" => Box::new(RoundtripDriver::new(Codec::Text)),
        "compact-roundtrip" => Box::new(RoundtripDriver::new(Codec::Compact)),
        "bind-unmarshal-text" => Box::new(BindUnmarshalDriver::new(Codec::Text)),
        "bind-unmarshal-compact" => Box::new(BindUnmarshalDriver::new(Codec::Compact)),
        "bind-marshal-text" => Box::new(BindMarshalDriver::new(Codec::Text)),
        "bind-marshal-compact" => Box::new(BindMarshalDriver::new(Codec::Compact)),
        other => return Err(BenchError::UnknownDriver(other.to_string())),
    };
    Ok(driver)
}

/// Loads a case's bytes, applying the untimed canonicalization pass when the
/// normalize knob is set. Everything the timed phase reads descends from the
/// buffer returned here.
fn text_payload(case: &TestCase, settings: &CodecSettings) -> Result<InputBuffer> {
    let input = load_case_input(case)?;
    if !settings.should_normalize_before_timing() {
        return Ok(input);
    }
    let normalized = normalize(input.bytes()).map_err(|e| BenchError::Normalize {
        test_case: case.name().to_string(),
        source: Box::new(e.into()),
    })?;
    Ok(InputBuffer::from_bytes(normalized))
}

/// The in-memory document a driver's timed region reads from: the textual
/// payload itself, or its compact transcoding built once during `prepare`.
struct PreparedDocument {
    codec: Codec,
    payload: InputBuffer,
    vocabulary: Option<Vocabulary>,
}

impl PreparedDocument {
    fn build(
        driver: &'static str,
        codec: Codec,
        case: &TestCase,
        settings: &CodecSettings,
    ) -> Result<Self> {
        let text = text_payload(case, settings)?;
        match codec {
            Codec::Text => Ok(PreparedDocument {
                codec,
                payload: text,
                vocabulary: None,
            }),
            Codec::Compact => {
                let vocabulary = trained_vocabulary(driver, case, settings, text.bytes())?;
                let doc = transcode(text.bytes(), settings, vocabulary.as_ref())?;
                Ok(PreparedDocument {
                    codec,
                    payload: InputBuffer::from_bytes(doc),
                    vocabulary,
                })
            }
        }
    }

    fn len(&self) -> usize {
        self.payload.len()
    }

    fn cursor<'a>(&'a self, settings: &CodecSettings) -> Box<dyn EventCursor + 'a> {
        match (self.codec, &self.vocabulary) {
            (Codec::Text, _) => Box::new(TextCursor::new(self.payload.bytes())),
            (Codec::Compact, None) => Box::new(CompactCursor::new(self.payload.bytes(), settings)),
            (Codec::Compact, Some(vocab)) => Box::new(CompactCursor::with_vocabulary(
                self.payload.bytes(),
                settings,
                vocab.clone(),
            )),
        }
    }
}

/// Push sink for one codec, writing into a reusable output buffer.
fn codec_sink<'a>(
    codec: Codec,
    out: &'a mut Vec<u8>,
    settings: &CodecSettings,
    vocabulary: Option<&Vocabulary>,
) -> Box<dyn EventSink + 'a> {
    match (codec, vocabulary) {
        (Codec::Text, _) => Box::new(TextSink::new(out)),
        (Codec::Compact, None) => Box::new(CompactSink::new(out, settings)),
        (Codec::Compact, Some(vocab)) => {
            Box::new(CompactSink::with_vocabulary(out, settings, vocab.clone()))
        }
    }
}

/// Trains the names-only external vocabulary when the knob asks for one.
fn trained_vocabulary(
    driver: &'static str,
    case: &TestCase,
    settings: &CodecSettings,
    text: &[u8],
) -> Result<Option<Vocabulary>> {
    if !settings.should_use_external_vocabulary() {
        return Ok(None);
    }
    let mut vocabulary = Vocabulary::new();
    vocabulary
        .train(text)
        .map_err(|e| BenchError::during(driver, "prepare", case.name(), e))?;
    Ok(Some(vocabulary))
}

/// Attaches the size results to a finished case. Input size is always
/// recorded, output size only when the operation produced bytes; the
/// `reportOutputSize` knob suppresses both without erroring.
fn record_sizes(
    settings: &CodecSettings,
    case: &mut TestCase,
    input_len: usize,
    output_len: Option<usize>,
) {
    if !settings.should_report_output_size() {
        return;
    }
    case.set_result(RESULT_INPUT_KB, input_len as f64 / 1024.0);
    if let Some(len) = output_len {
        case.set_result(RESULT_OUTPUT_KB, len as f64 / 1024.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_registered_name_constructs_its_driver() {
        for name in DRIVER_NAMES {
            let driver = create(name).unwrap();
            assert_eq!(&driver.name(), name);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = create("sax-parse").err().unwrap();
        assert!(matches!(err, BenchError::UnknownDriver(name) if name == "sax-parse"));
    }
}
