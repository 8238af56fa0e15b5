use log::trace;

use crate::err::{BridgeError, BridgeResult, CodecResult};
use crate::model::event::{XmlElement, XmlEvent, XmlName, XmlPI};

/// Pull side of a codec: yields one document's events in order, positioned
/// over an in-memory buffer. `rewind` must not touch any external source.
pub trait EventCursor {
    fn rewind(&mut self) -> CodecResult<()>;

    /// The next event, or `None` once the document is exhausted.
    fn next_event(&mut self) -> CodecResult<Option<XmlEvent<'_>>>;
}

/// Push side of a codec. Adapter between the event model and whatever the
/// concrete writer underneath understands.
pub trait EventSink {
    fn visit_start_document(&mut self) -> CodecResult<()>;
    fn visit_end_document(&mut self) -> CodecResult<()>;
    fn visit_open_start_element(&mut self, element: &XmlElement<'_>) -> CodecResult<()>;
    fn visit_close_element(&mut self, name: &XmlName<'_>) -> CodecResult<()>;
    fn visit_characters(&mut self, text: &str) -> CodecResult<()>;
    fn visit_cdata_section(&mut self, text: &str) -> CodecResult<()>;
    fn visit_comment(&mut self, text: &str) -> CodecResult<()>;
    fn visit_processing_instruction(&mut self, pi: &XmlPI<'_>) -> CodecResult<()>;
    fn visit_entity_reference(&mut self, name: &str) -> CodecResult<()>;
    fn visit_doctype(&mut self, content: &str) -> CodecResult<()>;

    fn flush(&mut self) -> CodecResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeStats {
    /// Events successfully replayed onto the sink.
    pub events: usize,
    /// Deepest element nesting observed.
    pub max_depth: usize,
}

/// One open element: its lexical name for close matching, and the prefixes
/// it declared, which stay resolvable for the whole subtree.
struct OpenScope {
    name: String,
    prefixes: Vec<String>,
}

/// Copies one complete document from `source` onto `sink`.
///
/// Single streaming pass; the only retained state is the open-element stack,
/// so memory is bounded by nesting depth, never document size. Event order
/// is preserved exactly, including attribute order and the point at which
/// namespace bindings enter and leave scope. On failure the sink keeps
/// whatever was already written; callers reset it before retrying.
pub fn bridge<C, S>(source: &mut C, sink: &mut S) -> BridgeResult<BridgeStats>
where
    C: EventCursor + ?Sized,
    S: EventSink + ?Sized,
{
    let mut stack: Vec<OpenScope> = Vec::new();
    let mut index = 0usize;
    let mut max_depth = 0usize;
    let mut root_closed = false;
    let mut ended = false;

    loop {
        let event = match source.next_event() {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(source_err) => {
                return Err(BridgeError::Source {
                    index,
                    source: source_err,
                });
            }
        };

        trace!("bridging event {index}: {}", event.kind());

        if ended {
            return Err(BridgeError::OutOfOrder {
                index,
                what: "event after end of document",
            });
        }

        match &event {
            XmlEvent::StartDocument => {
                if index != 0 {
                    return Err(BridgeError::OutOfOrder {
                        index,
                        what: "start document after the first event",
                    });
                }
                sink.visit_start_document()
                    .map_err(|e| sink_failed(index, e))?;
            }
            XmlEvent::EndDocument => {
                if !stack.is_empty() {
                    return Err(BridgeError::Truncated {
                        index: index.saturating_sub(1),
                        open_elements: stack.len(),
                    });
                }
                sink.visit_end_document().map_err(|e| sink_failed(index, e))?;
                ended = true;
            }
            XmlEvent::StartElement(element) => {
                if index == 0 {
                    return Err(BridgeError::OutOfOrder {
                        index,
                        what: "document must begin with a start-document event",
                    });
                }
                if root_closed {
                    return Err(BridgeError::OutOfOrder {
                        index,
                        what: "second root element",
                    });
                }
                // An element's own declarations are in scope for its own
                // name and attributes, so push before checking.
                stack.push(OpenScope {
                    name: element.name.to_string(),
                    prefixes: element
                        .bindings
                        .iter()
                        .map(|binding| binding.prefix.to_string())
                        .collect(),
                });
                max_depth = max_depth.max(stack.len());

                check_prefix(&stack, &element.name, index)?;
                for attribute in &element.attributes {
                    check_prefix(&stack, &attribute.name, index)?;
                }

                sink.visit_open_start_element(element)
                    .map_err(|e| sink_failed(index, e))?;
            }
            XmlEvent::EndElement(name) => {
                let open = stack.pop().ok_or(BridgeError::OutOfOrder {
                    index,
                    what: "close without an open element",
                })?;
                let found = name.to_string();
                if open.name != found {
                    return Err(BridgeError::MismatchedClose {
                        index,
                        expected: open.name,
                        found,
                    });
                }
                sink.visit_close_element(name)
                    .map_err(|e| sink_failed(index, e))?;
                if stack.is_empty() {
                    root_closed = true;
                }
            }
            XmlEvent::Characters(text) => {
                sink.visit_characters(text).map_err(|e| sink_failed(index, e))?;
            }
            XmlEvent::CData(text) => {
                sink.visit_cdata_section(text)
                    .map_err(|e| sink_failed(index, e))?;
            }
            XmlEvent::Comment(text) => {
                sink.visit_comment(text).map_err(|e| sink_failed(index, e))?;
            }
            XmlEvent::ProcessingInstruction(pi) => {
                sink.visit_processing_instruction(pi)
                    .map_err(|e| sink_failed(index, e))?;
            }
            XmlEvent::EntityRef(name) => {
                sink.visit_entity_reference(name)
                    .map_err(|e| sink_failed(index, e))?;
            }
            XmlEvent::DocType(content) => {
                sink.visit_doctype(content).map_err(|e| sink_failed(index, e))?;
            }
        }

        index += 1;
    }

    if !ended {
        return Err(BridgeError::Truncated {
            index: index.saturating_sub(1),
            open_elements: stack.len(),
        });
    }

    sink.flush().map_err(|e| sink_failed(index, e))?;

    Ok(BridgeStats {
        events: index,
        max_depth,
    })
}

fn sink_failed(index: usize, source: crate::err::CodecError) -> BridgeError {
    BridgeError::Sink { index, source }
}

fn check_prefix(stack: &[OpenScope], name: &XmlName<'_>, index: usize) -> BridgeResult<()> {
    let Some(prefix) = name.prefix.as_deref() else {
        return Ok(());
    };
    // `xml` is bound implicitly; `xmlns` never resolves to a namespace.
    if prefix == "xml" || prefix == "xmlns" {
        return Ok(());
    }
    let declared = stack
        .iter()
        .rev()
        .any(|scope| scope.prefixes.iter().any(|p| p == prefix));
    if declared {
        Ok(())
    } else {
        Err(BridgeError::UndeclaredPrefix {
            index,
            prefix: prefix.to_string(),
        })
    }
}

/// Discards every event, counting as it goes. Used by parse-only drivers so
/// the timed region covers event materialization without any output cost.
#[derive(Debug, Default)]
pub struct NullSink {
    pub events: usize,
    pub text_bytes: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Default::default()
    }
}

impl EventSink for NullSink {
    fn visit_start_document(&mut self) -> CodecResult<()> {
        self.events += 1;
        Ok(())
    }

    fn visit_end_document(&mut self) -> CodecResult<()> {
        self.events += 1;
        Ok(())
    }

    fn visit_open_start_element(&mut self, element: &XmlElement<'_>) -> CodecResult<()> {
        self.events += 1;
        for attribute in &element.attributes {
            self.text_bytes += attribute.value.len() as u64;
        }
        Ok(())
    }

    fn visit_close_element(&mut self, _name: &XmlName<'_>) -> CodecResult<()> {
        self.events += 1;
        Ok(())
    }

    fn visit_characters(&mut self, text: &str) -> CodecResult<()> {
        self.events += 1;
        self.text_bytes += text.len() as u64;
        Ok(())
    }

    fn visit_cdata_section(&mut self, text: &str) -> CodecResult<()> {
        self.events += 1;
        self.text_bytes += text.len() as u64;
        Ok(())
    }

    fn visit_comment(&mut self, text: &str) -> CodecResult<()> {
        self.events += 1;
        self.text_bytes += text.len() as u64;
        Ok(())
    }

    fn visit_processing_instruction(&mut self, pi: &XmlPI<'_>) -> CodecResult<()> {
        self.events += 1;
        self.text_bytes += pi.data.len() as u64;
        Ok(())
    }

    fn visit_entity_reference(&mut self, name: &str) -> CodecResult<()> {
        self.events += 1;
        self.text_bytes += name.len() as u64;
        Ok(())
    }

    fn visit_doctype(&mut self, content: &str) -> CodecResult<()> {
        self.events += 1;
        self.text_bytes += content.len() as u64;
        Ok(())
    }
}
