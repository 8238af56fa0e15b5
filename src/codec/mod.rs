use std::fmt;

pub mod compact;
pub mod text;
pub mod vocab;

/// The wire family a driver exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Textual XML through quick-xml.
    Text,
    /// The in-crate compact binary encoding.
    Compact,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Text => "text",
            Codec::Compact => "compact",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
