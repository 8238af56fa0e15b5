use crate::bridge::{EventCursor, EventSink};
use crate::err::CodecResult;
use crate::model::event::{XmlElement, XmlEvent, XmlName, XmlPI};

/// A fully materialized event sequence, replayable any number of times.
///
/// This is the streaming analog of a parsed document: serialize-only
/// drivers fill one during `prepare` so their timed region replays events
/// without re-parsing. It doubles as a sink, so filling it is just another
/// bridge pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBuffer {
    events: Vec<XmlEvent<'static>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn events(&self) -> &[XmlEvent<'static>] {
        &self.events
    }

    pub fn push_owned(&mut self, event: XmlEvent<'static>) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn cursor(&self) -> EventBufferCursor<'_> {
        EventBufferCursor {
            events: &self.events,
            pos: 0,
        }
    }
}

impl EventSink for EventBuffer {
    fn visit_start_document(&mut self) -> CodecResult<()> {
        self.events.push(XmlEvent::StartDocument);
        Ok(())
    }

    fn visit_end_document(&mut self) -> CodecResult<()> {
        self.events.push(XmlEvent::EndDocument);
        Ok(())
    }

    fn visit_open_start_element(&mut self, element: &XmlElement<'_>) -> CodecResult<()> {
        self.events.push(XmlEvent::StartElement(element.to_static()));
        Ok(())
    }

    fn visit_close_element(&mut self, name: &XmlName<'_>) -> CodecResult<()> {
        self.events
            .push(XmlEvent::EndElement(name.borrowed().into_owned()));
        Ok(())
    }

    fn visit_characters(&mut self, text: &str) -> CodecResult<()> {
        self.events
            .push(XmlEvent::Characters(text.to_string().into()));
        Ok(())
    }

    fn visit_cdata_section(&mut self, text: &str) -> CodecResult<()> {
        self.events.push(XmlEvent::CData(text.to_string().into()));
        Ok(())
    }

    fn visit_comment(&mut self, text: &str) -> CodecResult<()> {
        self.events.push(XmlEvent::Comment(text.to_string().into()));
        Ok(())
    }

    fn visit_processing_instruction(&mut self, pi: &XmlPI<'_>) -> CodecResult<()> {
        self.events
            .push(XmlEvent::ProcessingInstruction(pi.borrowed().into_owned()));
        Ok(())
    }

    fn visit_entity_reference(&mut self, name: &str) -> CodecResult<()> {
        self.events
            .push(XmlEvent::EntityRef(name.to_string().into()));
        Ok(())
    }

    fn visit_doctype(&mut self, content: &str) -> CodecResult<()> {
        self.events
            .push(XmlEvent::DocType(content.to_string().into()));
        Ok(())
    }
}

/// Replays a buffer's events as borrowed views, so repeated runs over the
/// same buffer cost no allocation.
#[derive(Debug)]
pub struct EventBufferCursor<'a> {
    events: &'a [XmlEvent<'static>],
    pos: usize,
}

impl EventCursor for EventBufferCursor<'_> {
    fn rewind(&mut self) -> CodecResult<()> {
        self.pos = 0;
        Ok(())
    }

    fn next_event(&mut self) -> CodecResult<Option<XmlEvent<'_>>> {
        match self.events.get(self.pos) {
            Some(event) => {
                self.pos += 1;
                Ok(Some(event.borrowed()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replay_preserves_order_and_rewinds() {
        let mut buffer = EventBuffer::new();
        buffer.push_owned(XmlEvent::StartDocument);
        buffer.push_owned(XmlEvent::StartElement(XmlElement {
            name: XmlName::local("root").into_owned(),
            bindings: vec![],
            attributes: vec![],
        }));
        buffer.push_owned(XmlEvent::EndElement(XmlName::local("root").into_owned()));
        buffer.push_owned(XmlEvent::EndDocument);

        let mut cursor = buffer.cursor();
        let mut kinds = vec![];
        while let Some(event) = cursor.next_event().unwrap() {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec!["start document", "start element", "end element", "end document"]
        );

        cursor.rewind().unwrap();
        assert!(cursor.next_event().unwrap().is_some());
    }

    #[test]
    fn sink_side_materializes_owned_events() {
        let mut buffer = EventBuffer::new();
        {
            let text = String::from("transient");
            buffer.visit_characters(&text).unwrap();
        }
        assert_eq!(buffer.len(), 1);

        let mut cursor = buffer.cursor();
        match cursor.next_event().unwrap() {
            Some(XmlEvent::Characters(text)) => assert_eq!(text, "transient"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
