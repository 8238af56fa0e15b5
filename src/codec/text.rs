use std::borrow::Cow;
use std::io::Write;
use std::str;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{
    BytesCData, BytesDecl, BytesEnd, BytesPI, BytesRef, BytesStart, BytesText, Event,
};

use crate::bridge::{EventCursor, EventSink};
use crate::err::{CodecError, CodecResult};
use crate::model::event::{NsBinding, XmlAttribute, XmlElement, XmlEvent, XmlName, XmlPI};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    NotStarted,
    InDocument,
    Ended,
}

/// Pull cursor over textual XML held in memory.
///
/// Wraps a borrowing quick-xml reader; names are sliced straight out of the
/// input, so repeated runs over the same buffer stay allocation-light.
pub struct TextCursor<'a> {
    input: &'a [u8],
    reader: Reader<&'a [u8]>,
    state: CursorState,
    pending_close: Option<XmlName<'static>>,
}

impl<'a> TextCursor<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        TextCursor {
            input,
            reader: Self::make_reader(input),
            state: CursorState::NotStarted,
            pending_close: None,
        }
    }

    fn make_reader(input: &'a [u8]) -> Reader<&'a [u8]> {
        let mut reader = Reader::from_reader(input);
        // Empty elements arrive as a start/end pair, matching every other
        // cursor in the harness.
        reader.config_mut().expand_empty_elements = true;
        reader
    }

    fn utf8(bytes: &[u8]) -> CodecResult<&str> {
        str::from_utf8(bytes).map_err(|e| CodecError::Encoding {
            encoding: "utf-8",
            message: e.to_string(),
        })
    }

    fn element_from_start(start: &BytesStart<'a>) -> CodecResult<XmlElement<'static>> {
        let name_bytes = start.name();
        let name = XmlName::parse(Self::utf8(name_bytes.as_ref())?).into_owned();

        let mut bindings = Vec::new();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = attribute.key.as_ref();
            if key == b"xmlns" {
                bindings.push(NsBinding {
                    prefix: Cow::Borrowed(""),
                    uri: attribute.unescape_value()?,
                }
                .into_owned());
            } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                bindings.push(NsBinding {
                    prefix: Cow::Borrowed(Self::utf8(prefix)?),
                    uri: attribute.unescape_value()?,
                }
                .into_owned());
            } else {
                attributes.push(XmlAttribute {
                    name: XmlName::parse(Self::utf8(key)?),
                    value: attribute.unescape_value()?,
                }
                .into_owned());
            }
        }

        Ok(XmlElement {
            name,
            bindings,
            attributes,
        })
    }

    /// Resolves the predefined XML entities and numeric character
    /// references; anything else stays a reference event.
    fn resolve_entity(name: &str) -> Option<String> {
        match name {
            "amp" => return Some("&".to_string()),
            "lt" => return Some("<".to_string()),
            "gt" => return Some(">".to_string()),
            "quot" => return Some("\"".to_string()),
            "apos" => return Some("'".to_string()),
            _ => {}
        }
        let digits = name.strip_prefix('#')?;
        let code = match digits.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => digits.parse::<u32>().ok()?,
        };
        char::from_u32(code).map(|c| c.to_string())
    }
}

impl EventCursor for TextCursor<'_> {
    fn rewind(&mut self) -> CodecResult<()> {
        self.reader = Self::make_reader(self.input);
        self.state = CursorState::NotStarted;
        self.pending_close = None;
        Ok(())
    }

    fn next_event(&mut self) -> CodecResult<Option<XmlEvent<'_>>> {
        match self.state {
            CursorState::NotStarted => {
                self.state = CursorState::InDocument;
                return Ok(Some(XmlEvent::StartDocument));
            }
            CursorState::Ended => return Ok(None),
            CursorState::InDocument => {}
        }

        if let Some(name) = self.pending_close.take() {
            return Ok(Some(XmlEvent::EndElement(name)));
        }

        loop {
            match self.reader.read_event()? {
                Event::Decl(_) => continue,
                Event::Start(start) => {
                    return Ok(Some(XmlEvent::StartElement(Self::element_from_start(
                        &start,
                    )?)));
                }
                Event::Empty(start) => {
                    let element = Self::element_from_start(&start)?;
                    self.pending_close = Some(element.name.borrowed().into_owned());
                    return Ok(Some(XmlEvent::StartElement(element)));
                }
                Event::End(end) => {
                    let name = XmlName::parse(Self::utf8(end.name().as_ref())?).into_owned();
                    return Ok(Some(XmlEvent::EndElement(name)));
                }
                Event::Text(text) => {
                    return Ok(Some(XmlEvent::Characters(text.decode().map_err(quick_xml::Error::from)?)));
                }
                Event::CData(cdata) => {
                    let raw = cdata.into_inner();
                    return Ok(Some(XmlEvent::CData(match raw {
                        Cow::Borrowed(bytes) => Cow::Borrowed(Self::utf8(bytes)?),
                        Cow::Owned(bytes) => Cow::Owned(
                            Self::utf8(&bytes)?.to_string(),
                        ),
                    })));
                }
                Event::Comment(comment) => {
                    let raw = comment.into_inner();
                    return Ok(Some(XmlEvent::Comment(match raw {
                        Cow::Borrowed(bytes) => Cow::Borrowed(Self::utf8(bytes)?),
                        Cow::Owned(bytes) => Cow::Owned(
                            Self::utf8(&bytes)?.to_string(),
                        ),
                    })));
                }
                Event::PI(pi) => {
                    let content = Self::utf8(pi.as_ref())?.to_string();
                    let (target, data) = match content.split_once(char::is_whitespace) {
                        Some((target, data)) => (target.to_string(), data.to_string()),
                        None => (content, String::new()),
                    };
                    return Ok(Some(XmlEvent::ProcessingInstruction(XmlPI {
                        target: target.into(),
                        data: data.into(),
                    })));
                }
                Event::DocType(doctype) => {
                    let raw = doctype.into_inner();
                    return Ok(Some(XmlEvent::DocType(match raw {
                        Cow::Borrowed(bytes) => Cow::Borrowed(Self::utf8(bytes)?),
                        Cow::Owned(bytes) => Cow::Owned(
                            Self::utf8(&bytes)?.to_string(),
                        ),
                    })));
                }
                Event::GeneralRef(general_ref) => {
                    let name = Self::utf8(general_ref.as_ref())?.to_string();
                    return Ok(Some(match Self::resolve_entity(&name) {
                        Some(resolved) => XmlEvent::Characters(resolved.into()),
                        None => XmlEvent::EntityRef(name.into()),
                    }));
                }
                Event::Eof => {
                    self.state = CursorState::Ended;
                    return Ok(Some(XmlEvent::EndDocument));
                }
            }
        }
    }
}

/// Push sink writing textual XML through quick-xml.
///
/// The canonical flavor folds CDATA into ordinary character data, so a
/// canonicalized document re-canonicalizes to the same bytes.
pub struct TextSink<W: Write> {
    writer: Writer<W>,
    cdata_to_characters: bool,
}

impl<W: Write> TextSink<W> {
    pub fn new(inner: W) -> Self {
        TextSink {
            writer: Writer::new(inner),
            cdata_to_characters: false,
        }
    }

    pub fn canonical(inner: W) -> Self {
        TextSink {
            writer: Writer::new(inner),
            cdata_to_characters: true,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> EventSink for TextSink<W> {
    fn visit_start_document(&mut self) -> CodecResult<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn visit_end_document(&mut self) -> CodecResult<()> {
        Ok(())
    }

    fn visit_open_start_element(&mut self, element: &XmlElement<'_>) -> CodecResult<()> {
        let mut start = BytesStart::new(element.name.to_string());
        for binding in &element.bindings {
            if binding.prefix.is_empty() {
                start.push_attribute(("xmlns", binding.uri.as_ref()));
            } else {
                let key = format!("xmlns:{}", binding.prefix);
                start.push_attribute((key.as_str(), binding.uri.as_ref()));
            }
        }
        for attribute in &element.attributes {
            let key = attribute.name.to_string();
            start.push_attribute((key.as_str(), attribute.value.as_ref()));
        }
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    fn visit_close_element(&mut self, name: &XmlName<'_>) -> CodecResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name.to_string())))?;
        Ok(())
    }

    fn visit_characters(&mut self, text: &str) -> CodecResult<()> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn visit_cdata_section(&mut self, text: &str) -> CodecResult<()> {
        if self.cdata_to_characters {
            return self.visit_characters(text);
        }
        self.writer
            .write_event(Event::CData(BytesCData::new(text)))?;
        Ok(())
    }

    fn visit_comment(&mut self, text: &str) -> CodecResult<()> {
        self.writer
            .write_event(Event::Comment(BytesText::from_escaped(text)))?;
        Ok(())
    }

    fn visit_processing_instruction(&mut self, pi: &XmlPI<'_>) -> CodecResult<()> {
        let content = if pi.data.is_empty() {
            pi.target.to_string()
        } else {
            format!("{} {}", pi.target, pi.data)
        };
        self.writer.write_event(Event::PI(BytesPI::new(content)))?;
        Ok(())
    }

    fn visit_entity_reference(&mut self, name: &str) -> CodecResult<()> {
        self.writer
            .write_event(Event::GeneralRef(BytesRef::new(name)))?;
        Ok(())
    }

    fn visit_doctype(&mut self, content: &str) -> CodecResult<()> {
        self.writer
            .write_event(Event::DocType(BytesText::from_escaped(content)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::bridge;
    use pretty_assertions::assert_eq;

    fn pull_all(xml: &str) -> Vec<XmlEvent<'static>> {
        let mut cursor = TextCursor::new(xml.as_bytes());
        let mut events = vec![];
        while let Some(event) = cursor.next_event().unwrap() {
            events.push(event.into_owned());
        }
        events
    }

    #[test]
    fn cursor_frames_the_document_with_start_and_end() {
        let events = pull_all("<root/>");
        assert_eq!(events.first(), Some(&XmlEvent::StartDocument));
        assert_eq!(events.last(), Some(&XmlEvent::EndDocument));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn namespace_declarations_are_split_from_attributes() {
        let events = pull_all(r#"<r b="2" xmlns:p="urn:x" a="1"/>"#);
        match &events[1] {
            XmlEvent::StartElement(element) => {
                assert_eq!(
                    element.bindings,
                    vec![NsBinding {
                        prefix: "p".into(),
                        uri: "urn:x".into()
                    }]
                );
                let names: Vec<String> =
                    element.attributes.iter().map(|a| a.name.to_string()).collect();
                assert_eq!(names, vec!["b", "a"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn predefined_entities_become_character_data() {
        let events = pull_all("<r>a&amp;b</r>");
        let text: String = events
            .iter()
            .filter_map(|event| match event {
                XmlEvent::Characters(text) => Some(text.as_ref()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "a&b");
    }

    #[test]
    fn numeric_references_are_resolved() {
        assert_eq!(TextCursor::resolve_entity("#65"), Some("A".to_string()));
        assert_eq!(TextCursor::resolve_entity("#x41"), Some("A".to_string()));
        assert_eq!(TextCursor::resolve_entity("copy"), None);
    }

    #[test]
    fn rewind_replays_from_the_top() {
        let xml = "<root><a>1</a></root>";
        let mut cursor = TextCursor::new(xml.as_bytes());
        let mut first = 0;
        while cursor.next_event().unwrap().is_some() {
            first += 1;
        }
        cursor.rewind().unwrap();
        let mut second = 0;
        while cursor.next_event().unwrap().is_some() {
            second += 1;
        }
        assert_eq!(first, second);
    }

    #[test]
    fn sink_writes_a_canonical_document() {
        let xml = r#"<?xml version="1.0"?><root a="1"><p:c xmlns:p="urn:x">v</p:c></root>"#;
        let mut cursor = TextCursor::new(xml.as_bytes());
        let mut out = Vec::new();
        let mut sink = TextSink::canonical(&mut out);
        bridge(&mut cursor, &mut sink).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<?xml version="1.0" encoding="UTF-8"?><root a="1"><p:c xmlns:p="urn:x">v</p:c></root>"#
        );
    }

    #[test]
    fn canonical_sink_folds_cdata() {
        let xml = "<r><![CDATA[a<b]]></r>";
        let mut cursor = TextCursor::new(xml.as_bytes());
        let mut out = Vec::new();
        let mut sink = TextSink::canonical(&mut out);
        bridge(&mut cursor, &mut sink).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<?xml version="1.0" encoding="UTF-8"?><r>a&lt;b</r>"#
        );
    }

    #[test]
    fn lossless_sink_preserves_cdata() {
        let xml = "<r><![CDATA[a<b]]></r>";
        let mut cursor = TextCursor::new(xml.as_bytes());
        let mut out = Vec::new();
        let mut sink = TextSink::new(&mut out);
        bridge(&mut cursor, &mut sink).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<?xml version="1.0" encoding="UTF-8"?><r><![CDATA[a<b]]></r>"#
        );
    }
}
