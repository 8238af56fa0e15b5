//! A micro-benchmark harness for XML codecs.
//!
//! Interchangeable encoding strategies (textual XML, a compact binary
//! encoding, and a data-binding layer on top of either) are driven through
//! one uniform lifecycle so their timings are comparable: all I/O happens
//! before the timed region, and every codec speaks the same event stream.
//!
//! The crate splits into three layers:
//!
//! - the event model and [`bridge`], which copy a document's structural
//!   events from any pull cursor onto any push sink;
//! - the codecs under [`codec`] and [`bind`], each exposing a cursor and a
//!   sink over in-memory buffers;
//! - the measurement machinery: the [`driver::Driver`] lifecycle, the
//!   concrete [`drivers`], and the [`harness`] that times them and renders
//!   a [`report::Report`].

#[macro_use]
mod macros;

pub mod bind;
pub mod bridge;
pub mod buffers;
pub mod codec;
pub mod driver;
pub mod drivers;
pub mod err;
pub mod harness;
pub mod model;
pub mod normalize;
pub mod params;
pub mod report;
pub mod settings;
pub mod suite;

pub use bridge::{BridgeStats, EventCursor, EventSink, NullSink, bridge};
pub use buffers::{InputBuffer, OutputBuffer};
pub use driver::{Driver, Lifecycle, Phase};
pub use err::{BenchError, Result};
pub use harness::{IterationPlan, Measurement, run_suite};
pub use params::{ParamValue, Params};
pub use report::Report;
pub use settings::{CodecSettings, IndexedContentLevel};
pub use suite::{SuiteConfig, TestCase};
