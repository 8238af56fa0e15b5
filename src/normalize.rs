//! Canonical rewrite of textual XML, applied to inputs before timing so
//! every codec sees the same byte stream regardless of how the fixture was
//! authored.
//!
//! The canonical form always carries an XML declaration, expands empty
//! elements, folds CDATA into character data and resolves the predefined
//! entities. It is a fixpoint: normalizing twice yields the first result.

use crate::bridge::bridge;
use crate::codec::text::{TextCursor, TextSink};
use crate::err::BridgeResult;

pub fn normalize(input: &[u8]) -> BridgeResult<Vec<u8>> {
    let mut cursor = TextCursor::new(input);
    let mut out = Vec::with_capacity(input.len());
    let mut sink = TextSink::canonical(&mut out);
    bridge(&mut cursor, &mut sink)?;
    Ok(out)
}
