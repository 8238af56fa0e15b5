pub mod buffer;
pub mod event;

pub use buffer::{EventBuffer, EventBufferCursor};
pub use event::{NsBinding, XmlAttribute, XmlElement, XmlEvent, XmlName, XmlPI};
