use crate::buffers::InputBuffer;
use crate::driver::{Driver, Phase, out_of_order};
use crate::err::Result;
use crate::settings::CodecSettings;
use crate::suite::TestCase;

use super::{record_sizes, text_payload};

/// The measurement floor: consumes the input bytes with no parsing at all.
/// Every other driver's cost is read against this one.
pub struct ByteStreamDriver {
    settings: Option<CodecSettings>,
    input: Option<InputBuffer>,
    checksum: u64,
}

impl ByteStreamDriver {
    pub fn new() -> Self {
        ByteStreamDriver {
            settings: None,
            input: None,
            checksum: 0,
        }
    }
}

impl Default for ByteStreamDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for ByteStreamDriver {
    fn name(&self) -> &'static str {
        "byte-stream"
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
        self.input = Some(text_payload(case, settings)?);
        self.checksum = 0;
        Ok(())
    }

    fn run(&mut self, _case: &TestCase) -> Result<()> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| out_of_order(self.name(), "run", Phase::Initialized))?;
        // A fold the optimizer cannot drop, so the loop actually touches
        // every byte.
        let mut acc = 0_u64;
        for &byte in input.bytes() {
            acc = acc.rotate_left(5) ^ u64::from(byte);
        }
        self.checksum = std::hint::black_box(acc);
        Ok(())
    }

    fn finish(&mut self, case: &mut TestCase) -> Result<()> {
        let (Some(settings), Some(input)) = (&self.settings, &self.input) else {
            return Err(out_of_order(self.name(), "finish", Phase::Uninitialized));
        };
        record_sizes(settings, case, input.len(), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;
    use crate::suite::RESULT_INPUT_KB;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn case_with_bytes(bytes: &[u8]) -> (tempfile::NamedTempFile, TestCase) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        let case = TestCase::new("bytes", file.path(), Params::new());
        (file, case)
    }

    #[test]
    fn records_the_input_size_in_kilobytes() {
        let (_file, mut case) = case_with_bytes(&[b'x'; 2048]);
        let mut driver = ByteStreamDriver::new();
        driver.initialize(&CodecSettings::new()).unwrap();
        driver.prepare(&case).unwrap();
        driver.run(&case).unwrap();
        driver.finish(&mut case).unwrap();

        assert_eq!(case.result(RESULT_INPUT_KB), Some(2.0));
    }

    #[test]
    fn size_reporting_can_be_disabled() {
        let (_file, mut case) = case_with_bytes(b"<r/>");
        let mut driver = ByteStreamDriver::new();
        driver
            .initialize(&CodecSettings::new().report_output_size(false))
            .unwrap();
        driver.prepare(&case).unwrap();
        driver.run(&case).unwrap();
        driver.finish(&mut case).unwrap();

        assert_eq!(case.result(RESULT_INPUT_KB), None);
    }

    #[test]
    fn run_before_prepare_is_an_ordering_error() {
        let mut driver = ByteStreamDriver::new();
        driver.initialize(&CodecSettings::new()).unwrap();
        assert!(driver.run(&TestCase::new("t", "t.xml", Params::new())).is_err());
    }
}
