use serde_json::Value;

use crate::bind::{TreeCursor, TreeSink};
use crate::bridge::bridge;
use crate::buffers::OutputBuffer;
use crate::codec::Codec;
use crate::codec::text::TextCursor;
use crate::codec::vocab::Vocabulary;
use crate::driver::{Driver, Phase, out_of_order};
use crate::err::{BenchError, Result};
use crate::settings::CodecSettings;
use crate::suite::TestCase;

use super::{PreparedDocument, codec_sink, record_sizes, text_payload, trained_vocabulary};

/// Measures unmarshalling: the timed region decodes the prepared document
/// and builds the bound value tree. Comments and processing instructions
/// are dropped by the binding layer.
pub struct BindUnmarshalDriver {
    codec: Codec,
    settings: Option<CodecSettings>,
    doc: Option<PreparedDocument>,
    tree: Option<Value>,
}

impl BindUnmarshalDriver {
    pub fn new(codec: Codec) -> Self {
        BindUnmarshalDriver {
            codec,
            settings: None,
            doc: None,
            tree: None,
        }
    }

    /// Tree built by the most recent run.
    pub fn tree(&self) -> Option<&Value> {
        self.tree.as_ref()
    }
}

impl Driver for BindUnmarshalDriver {
    fn name(&self) -> &'static str {
        match self.codec {
            Codec::Text => "bind-unmarshal-text",
            Codec::Compact => "bind-unmarshal-compact",
        }
    }

    fn initialize(&mut self, settings: &CodecSettings) -> Result<()> {
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn prepare(&mut self, case: &TestCase) -> Result<()> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| out_of_order(self.name(), "prepare", Phase::Uninitialized))?;
        self.doc = Some(PreparedDocument::build(
            self.name(),
            self.codec,
            case,
            settings,
        )?);
        self.tree = None;
        Ok(())
    }

    fn run(&mut self, case: &TestCase) -> Result<()> {
        let (Some(settings), Some(doc)) = (&self.settings, &self.doc) else {
            return Err(out_of_order(self.name(), "run", Phase::Initialized));
        };
        let name = self.name();
        let tree = {
            let mut cursor = doc.cursor(settings);
            let mut sink = TreeSink::new();
            bridge(&mut *cursor, &mut sink)?;
            sink.into_tree()
                .map_err(|e| BenchError::during(name, "run", case.name(), e))?
        };
        self.tree = Some(tree);
        Ok(())
    }

    fn finish(&mut self, case: &mut TestCase) -> Result<()> {
        let (Some(settings), Some(doc)) = (&self.settings, &self.doc) else {
            return Err(out_of_order(self.name(), "finish", Phase::Uninitialized));
        };
        record_sizes(settings, case, doc.len(), None);
        Ok(())
    }
}

/// Measures marshalling: `prepare` unmarshals the input once, untimed, into
/// the bound tree; the timed region replays the tree through the codec's
/// sink into the output buffer.
pub struct BindMarshalDriver {
    codec: Codec,
    settings: Option<CodecSettings>,
    tree: Option<Value>,
    vocabulary: Option<Vocabulary>,
    output: OutputBuffer,
    input_len: usize,
}

impl BindMarshalDriver {
    pub fn new(codec: Codec) -> Self {
        BindMarshalDriver {
            codec,
            settings: None,
            tree: None,
            vocabulary: None,
            output: OutputBuffer::new(),
            input_len: 0,
        }
    }

    /// Bytes produced by the most recent run.
    pub fn output(&self) -> &[u8] {
        self.output.bytes()
    }
}

impl Driver for BindMarshalDriver {
    fn name(&self) -> &'static str {
        match self.codec {
            Codec::Text => "bind-marshal-text",
            Codec::Compact => "bind-marshal-compact",
        }
    }

    fn initialize(&mut self, settings: &CodecSettings) -> Result<()> {
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn prepare(&mut self, case: &TestCase) -> Result<()> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| out_of_order(self.name(), "prepare", Phase::Uninitialized))?;

        let text = text_payload(case, settings)?;
        let mut cursor = TextCursor::new(text.bytes());
        let mut sink = TreeSink::new();
        bridge(&mut cursor, &mut sink)?;
        let tree = sink
            .into_tree()
            .map_err(|e| BenchError::during(self.name(), "prepare", case.name(), e))?;

        self.vocabulary = match self.codec {
            Codec::Text => None,
            Codec::Compact => trained_vocabulary(self.name(), case, settings, text.bytes())?,
        };
        self.input_len = text.len();
        self.tree = Some(tree);
        self.output = OutputBuffer::new();
        Ok(())
    }

    fn run(&mut self, _case: &TestCase) -> Result<()> {
        let name = self.name();
        let BindMarshalDriver {
            codec,
            settings,
            tree,
            vocabulary,
            output,
            ..
        } = self;
        let (Some(settings), Some(tree)) = (settings.as_ref(), tree.as_ref()) else {
            return Err(out_of_order(name, "run", Phase::Initialized));
        };

        output.reset();
        let mut cursor = TreeCursor::new(tree);
        let mut sink = codec_sink(*codec, output.writer(), settings, vocabulary.as_ref());
        bridge(&mut cursor, &mut *sink)?;
        Ok(())
    }

    fn finish(&mut self, case: &mut TestCase) -> Result<()> {
        let Some(settings) = &self.settings else {
            return Err(out_of_order(self.name(), "finish", Phase::Uninitialized));
        };
        record_sizes(settings, case, self.input_len, Some(self.output.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    const XML: &str = r#"<order id="77"><line>nuts</line><line>bolts</line></order>"#;

    fn case() -> (tempfile::NamedTempFile, TestCase) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(XML.as_bytes()).unwrap();
        let case = TestCase::new("order", file.path(), Params::new());
        (file, case)
    }

    #[test]
    fn unmarshalling_builds_the_same_tree_from_either_codec() {
        let (_file, case) = case();
        let expected = json!({
            "order": {
                "#attributes": {"id": "77"},
                "line": [{"#text": "nuts"}, {"#text": "bolts"}]
            }
        });

        for codec in [Codec::Text, Codec::Compact] {
            let mut driver = BindUnmarshalDriver::new(codec);
            driver.initialize(&CodecSettings::new()).unwrap();
            driver.prepare(&case).unwrap();
            driver.run(&case).unwrap();
            assert_eq!(driver.tree(), Some(&expected));
        }
    }

    #[test]
    fn marshalling_replays_the_tree_built_during_prepare() {
        let (_file, case) = case();
        let mut driver = BindMarshalDriver::new(Codec::Text);
        driver.initialize(&CodecSettings::new()).unwrap();
        driver.prepare(&case).unwrap();
        driver.run(&case).unwrap();

        let written = String::from_utf8(driver.output().to_vec()).unwrap();
        assert!(written.ends_with(XML));
    }

    #[test]
    fn marshal_output_size_is_stable() {
        let (_file, case) = case();
        let mut driver = BindMarshalDriver::new(Codec::Compact);
        driver.initialize(&CodecSettings::new()).unwrap();
        driver.prepare(&case).unwrap();

        driver.run(&case).unwrap();
        let first = driver.output().len();
        for _ in 0..3 {
            driver.run(&case).unwrap();
            assert_eq!(driver.output().len(), first);
        }
    }
}
