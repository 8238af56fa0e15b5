use crate::bridge::{NullSink, bridge};
use crate::codec::Codec;
use crate::driver::{Driver, Phase, out_of_order};
use crate::err::Result;
use crate::settings::CodecSettings;
use crate::suite::TestCase;

use super::{PreparedDocument, record_sizes};

/// Measures pure decoding: every event of the prepared document is pulled
/// through the bridge into a counting null sink, so all names, attribute
/// values and character chunks are materialized but nothing is written.
///
/// For the compact codec the textual input is transcoded once, untimed,
/// during `prepare`; the timed region then decodes the compact form.
pub struct ParseDriver {
    codec: Codec,
    settings: Option<CodecSettings>,
    doc: Option<PreparedDocument>,
    events: usize,
}

impl ParseDriver {
    pub fn new(codec: Codec) -> Self {
        ParseDriver {
            codec,
            settings: None,
            doc: None,
            events: 0,
        }
    }

    /// Events observed by the most recent run.
    pub fn events(&self) -> usize {
        self.events
    }
}

impl Driver for ParseDriver {
    fn name(&self) -> &'static str {
        match self.codec {
            Codec::Text => "text-parse",
            Codec::Compact => "compact-parse",
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
        self.events = 0;
        Ok(())
    }

    fn run(&mut self, _case: &TestCase) -> Result<()> {
        let (Some(settings), Some(doc)) = (&self.settings, &self.doc) else {
            return Err(out_of_order(self.name(), "run", Phase::Initialized));
        };
        let stats = {
            let mut cursor = doc.cursor(settings);
            let mut sink = NullSink::new();
            bridge(&mut *cursor, &mut sink)?
        };
        self.events = stats.events;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const XML: &str = r#"<list rev="3"><item>alpha</item><item>beta</item></list>"#;

    fn case() -> (tempfile::NamedTempFile, TestCase) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(XML.as_bytes()).unwrap();
        let case = TestCase::new("list", file.path(), Params::new());
        (file, case)
    }

    #[test]
    fn text_and_compact_observe_the_same_events() {
        let (_file, case) = case();

        let mut text = ParseDriver::new(Codec::Text);
        text.initialize(&CodecSettings::new()).unwrap();
        text.prepare(&case).unwrap();
        text.run(&case).unwrap();

        let mut compact = ParseDriver::new(Codec::Compact);
        compact.initialize(&CodecSettings::new()).unwrap();
        compact.prepare(&case).unwrap();
        compact.run(&case).unwrap();

        assert_eq!(text.events(), compact.events());
        assert!(text.events() > 0);
    }

    #[test]
    fn repeated_runs_observe_identical_event_counts() {
        let (_file, case) = case();
        let mut driver = ParseDriver::new(Codec::Compact);
        driver.initialize(&CodecSettings::new()).unwrap();
        driver.prepare(&case).unwrap();

        driver.run(&case).unwrap();
        let first = driver.events();
        for _ in 0..4 {
            driver.run(&case).unwrap();
            assert_eq!(driver.events(), first);
        }
    }

    #[test]
    fn malformed_input_fails_the_iteration() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<open><unclosed>").unwrap();
        let case = TestCase::new("broken", file.path(), Params::new());

        let mut driver = ParseDriver::new(Codec::Text);
        driver.initialize(&CodecSettings::new()).unwrap();
        driver.prepare(&case).unwrap();
        assert!(driver.run(&case).is_err());
    }
}
