use crate::bridge::bridge;
use crate::buffers::OutputBuffer;
use crate::codec::Codec;
use crate::driver::{Driver, Phase, out_of_order};
use crate::err::Result;
use crate::settings::CodecSettings;
use crate::suite::TestCase;

use super::{PreparedDocument, codec_sink, record_sizes};

/// Measures a full decode-and-reencode: the timed region parses the
/// prepared document and serializes it straight back through the bridge
/// into the output buffer, one streaming pass, no intermediate tree.
pub struct RoundtripDriver {
    codec: Codec,
    settings: Option<CodecSettings>,
    doc: Option<PreparedDocument>,
    output: OutputBuffer,
}

impl RoundtripDriver {
    pub fn new(codec: Codec) -> Self {
        RoundtripDriver {
            codec,
            settings: None,
            doc: None,
            output: OutputBuffer::new(),
        }
    }

    /// Bytes produced by the most recent run.
    pub fn output(&self) -> &[u8] {
        self.output.bytes()
    }
}

impl Driver for RoundtripDriver {
    fn name(&self) -> &'static str {
        match self.codec {
            Codec::Text => "text-roundtrip",
            Codec::Compact => "compact-roundtrip",
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
        self.output = OutputBuffer::new();
        Ok(())
    }

    fn run(&mut self, _case: &TestCase) -> Result<()> {
        let name = self.name();
        let RoundtripDriver {
            codec,
            settings,
            doc,
            output,
        } = self;
        let (Some(settings), Some(doc)) = (settings.as_ref(), doc.as_ref()) else {
            return Err(out_of_order(name, "run", Phase::Initialized));
        };

        output.reset();
        let mut cursor = doc.cursor(settings);
        let mut sink = codec_sink(*codec, output.writer(), settings, doc.vocabulary.as_ref());
        bridge(&mut *cursor, &mut *sink)?;
        Ok(())
    }

    fn finish(&mut self, case: &mut TestCase) -> Result<()> {
        let (Some(settings), Some(doc)) = (&self.settings, &self.doc) else {
            return Err(out_of_order(self.name(), "finish", Phase::Uninitialized));
        };
        record_sizes(settings, case, doc.len(), Some(self.output.len()));
        Ok(())
    }
}
