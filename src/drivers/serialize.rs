use crate::bridge::bridge;
use crate::buffers::OutputBuffer;
use crate::codec::Codec;
use crate::codec::text::TextCursor;
use crate::codec::vocab::Vocabulary;
use crate::driver::{Driver, Phase, out_of_order};
use crate::err::Result;
use crate::model::buffer::EventBuffer;
use crate::settings::CodecSettings;
use crate::suite::TestCase;

use super::{codec_sink, record_sizes, text_payload, trained_vocabulary};

/// Measures pure encoding: `prepare` parses the textual input once into a
/// replayable event buffer, and the timed region replays it through the
/// codec's sink into the output buffer.
pub struct SerializeDriver {
    codec: Codec,
    settings: Option<CodecSettings>,
    events: Option<EventBuffer>,
    vocabulary: Option<Vocabulary>,
    output: OutputBuffer,
    input_len: usize,
}

impl SerializeDriver {
    pub fn new(codec: Codec) -> Self {
        SerializeDriver {
            codec,
            settings: None,
            events: None,
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

impl Driver for SerializeDriver {
    fn name(&self) -> &'static str {
        match self.codec {
            Codec::Text => "text-serialize",
            Codec::Compact => "compact-serialize",
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
        let mut events = EventBuffer::new();
        let mut cursor = TextCursor::new(text.bytes());
        bridge(&mut cursor, &mut events)?;

        self.vocabulary = match self.codec {
            Codec::Text => None,
            Codec::Compact => trained_vocabulary(self.name(), case, settings, text.bytes())?,
        };
        self.input_len = text.len();
        self.events = Some(events);
        self.output = OutputBuffer::new();
        Ok(())
    }

    fn run(&mut self, _case: &TestCase) -> Result<()> {
        let name = self.name();
        let SerializeDriver {
            codec,
            settings,
            events,
            vocabulary,
            output,
            ..
        } = self;
        let (Some(settings), Some(events)) = (settings.as_ref(), events.as_ref()) else {
            return Err(out_of_order(name, "run", Phase::Initialized));
        };

        output.reset();
        let mut cursor = events.cursor();
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
