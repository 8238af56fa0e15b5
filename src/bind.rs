//! Data-binding layer between event streams and `serde_json::Value` trees.
//!
//! Elements become objects keyed by qualified name, attributes and
//! namespace declarations live under `#attributes`, character data under
//! `#text`, and repeated siblings collapse into arrays. Comments and
//! processing instructions are not represented; mixed-content ordering is
//! flattened to map order.

use std::borrow::Cow;

use serde::de::Error as _;
use serde_json::{Map, Value};

use crate::bridge::{EventCursor, EventSink};
use crate::err::{CodecError, CodecResult};
use crate::model::event::{NsBinding, XmlAttribute, XmlElement, XmlEvent, XmlName, XmlPI};

pub const ATTRIBUTES_KEY: &str = "#attributes";
pub const TEXT_KEY: &str = "#text";

fn bind_error(message: &str) -> CodecError {
    CodecError::Bind(serde_json::Error::custom(message))
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

struct OpenNode {
    name: String,
    map: Map<String, Value>,
    text: String,
}

/// Push sink building a bound tree out of the event stream.
#[derive(Default)]
pub struct TreeSink {
    stack: Vec<OpenNode>,
    root: Option<(String, Value)>,
}

impl TreeSink {
    pub fn new() -> Self {
        Default::default()
    }

    /// The finished tree: a single-key object named after the root element.
    pub fn into_tree(self) -> CodecResult<Value> {
        match self.root {
            Some((name, value)) => {
                let mut map = Map::with_capacity(1);
                map.insert(name, value);
                Ok(Value::Object(map))
            }
            None => Err(bind_error("document produced no element tree")),
        }
    }
}

fn insert_child(container: &mut Map<String, Value>, name: String, value: Value) {
    match container.get_mut(&name) {
        None => {
            container.insert(name, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

impl EventSink for TreeSink {
    fn visit_start_document(&mut self) -> CodecResult<()> {
        Ok(())
    }

    fn visit_end_document(&mut self) -> CodecResult<()> {
        Ok(())
    }

    fn visit_open_start_element(&mut self, element: &XmlElement<'_>) -> CodecResult<()> {
        let mut map = Map::new();
        if !(element.bindings.is_empty() && element.attributes.is_empty()) {
            let mut attrs = Map::with_capacity(element.bindings.len() + element.attributes.len());
            for binding in &element.bindings {
                let key = if binding.prefix.is_empty() {
                    "xmlns".to_string()
                } else {
                    format!("xmlns:{}", binding.prefix)
                };
                attrs.insert(key, Value::String(binding.uri.to_string()));
            }
            for attribute in &element.attributes {
                attrs.insert(
                    attribute.name.to_string(),
                    Value::String(attribute.value.to_string()),
                );
            }
            map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attrs));
        }
        self.stack.push(OpenNode {
            name: element.name.to_string(),
            map,
            text: String::new(),
        });
        Ok(())
    }

    fn visit_close_element(&mut self, _name: &XmlName<'_>) -> CodecResult<()> {
        let node = self
            .stack
            .pop()
            .ok_or_else(|| bind_error("close without an open element"))?;
        let mut map = node.map;
        if !node.text.trim().is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(node.text));
        }
        let value = Value::Object(map);
        match self.stack.last_mut() {
            Some(parent) => insert_child(&mut parent.map, node.name, value),
            None => self.root = Some((node.name, value)),
        }
        Ok(())
    }

    fn visit_characters(&mut self, text: &str) -> CodecResult<()> {
        match self.stack.last_mut() {
            Some(open) => {
                open.text.push_str(text);
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(bind_error("character data outside the document root")),
        }
    }

    fn visit_cdata_section(&mut self, text: &str) -> CodecResult<()> {
        self.visit_characters(text)
    }

    fn visit_comment(&mut self, _text: &str) -> CodecResult<()> {
        Ok(())
    }

    fn visit_processing_instruction(&mut self, _pi: &XmlPI<'_>) -> CodecResult<()> {
        Ok(())
    }

    fn visit_entity_reference(&mut self, _name: &str) -> CodecResult<()> {
        Err(bind_error("unresolved entity references cannot be bound"))
    }

    fn visit_doctype(&mut self, _content: &str) -> CodecResult<()> {
        Ok(())
    }
}

enum WalkStep<'tree> {
    Open { name: &'tree str, node: &'tree Value },
    Text(Cow<'tree, str>),
    Close(&'tree str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    NotStarted,
    InDocument,
    Ended,
}

/// Pull cursor replaying a bound tree as an event stream.
pub struct TreeCursor<'tree> {
    tree: &'tree Value,
    steps: Vec<WalkStep<'tree>>,
    state: WalkState,
}

impl<'tree> TreeCursor<'tree> {
    pub fn new(tree: &'tree Value) -> Self {
        TreeCursor {
            tree,
            steps: Vec::new(),
            state: WalkState::NotStarted,
        }
    }

    fn element_from_map(
        name: &'tree str,
        map: &'tree Map<String, Value>,
    ) -> CodecResult<XmlElement<'tree>> {
        let mut bindings = Vec::new();
        let mut attributes = Vec::new();
        if let Some(attrs) = map.get(ATTRIBUTES_KEY) {
            let attrs = attrs
                .as_object()
                .ok_or_else(|| bind_error("`#attributes` must be an object"))?;
            for (key, value) in attrs {
                let value =
                    scalar_text(value).ok_or_else(|| bind_error("attribute values must be scalars"))?;
                if key == "xmlns" {
                    bindings.push(NsBinding {
                        prefix: Cow::Borrowed(""),
                        uri: value,
                    });
                } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                    bindings.push(NsBinding {
                        prefix: Cow::Borrowed(prefix),
                        uri: value,
                    });
                } else {
                    attributes.push(XmlAttribute {
                        name: XmlName::parse(key),
                        value,
                    });
                }
            }
        }
        Ok(XmlElement {
            name: XmlName::parse(name),
            bindings,
            attributes,
        })
    }

    fn open(&mut self, name: &'tree str, node: &'tree Value) -> CodecResult<XmlEvent<'tree>> {
        match node {
            Value::Object(map) => {
                self.steps.push(WalkStep::Close(name));
                let mut children = Vec::new();
                for (key, value) in map {
                    if key == ATTRIBUTES_KEY {
                        continue;
                    }
                    if key == TEXT_KEY {
                        let text = scalar_text(value)
                            .ok_or_else(|| bind_error("`#text` must be a scalar"))?;
                        children.push(WalkStep::Text(text));
                        continue;
                    }
                    match value {
                        Value::Array(items) => {
                            for item in items {
                                if matches!(item, Value::Array(_)) {
                                    return Err(bind_error("nested arrays cannot become elements"));
                                }
                                children.push(WalkStep::Open { name: key, node: item });
                            }
                        }
                        other => children.push(WalkStep::Open { name: key, node: other }),
                    }
                }
                for child in children.into_iter().rev() {
                    self.steps.push(child);
                }
                Ok(XmlEvent::StartElement(Self::element_from_map(name, map)?))
            }
            Value::Array(_) => Err(bind_error("nested arrays cannot become elements")),
            scalar => {
                self.steps.push(WalkStep::Close(name));
                if let Some(text) = scalar_text(scalar) {
                    self.steps.push(WalkStep::Text(text));
                }
                Ok(XmlEvent::StartElement(XmlElement {
                    name: XmlName::parse(name),
                    bindings: Vec::new(),
                    attributes: Vec::new(),
                }))
            }
        }
    }
}

impl EventCursor for TreeCursor<'_> {
    fn rewind(&mut self) -> CodecResult<()> {
        self.steps.clear();
        self.state = WalkState::NotStarted;
        Ok(())
    }

    fn next_event(&mut self) -> CodecResult<Option<XmlEvent<'_>>> {
        match self.state {
            WalkState::Ended => return Ok(None),
            WalkState::NotStarted => {
                let root = self
                    .tree
                    .as_object()
                    .filter(|map| map.len() == 1)
                    .ok_or_else(|| bind_error("tree root must be an object with a single key"))?;
                if let Some((name, node)) = root.iter().next() {
                    self.steps.push(WalkStep::Open { name, node });
                }
                self.state = WalkState::InDocument;
                return Ok(Some(XmlEvent::StartDocument));
            }
            WalkState::InDocument => {}
        }

        match self.steps.pop() {
            None => {
                self.state = WalkState::Ended;
                Ok(Some(XmlEvent::EndDocument))
            }
            Some(WalkStep::Open { name, node }) => Ok(Some(self.open(name, node)?)),
            Some(WalkStep::Text(text)) => Ok(Some(XmlEvent::Characters(text))),
            Some(WalkStep::Close(name)) => Ok(Some(XmlEvent::EndElement(XmlName::parse(name)))),
        }
    }
}
