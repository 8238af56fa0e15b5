use std::borrow::Cow;
use std::fmt;

/// A possibly-prefixed XML name. Only the lexical form is carried; prefix
/// resolution happens against the namespace scopes active while bridging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlName<'a> {
    pub prefix: Option<Cow<'a, str>>,
    pub local: Cow<'a, str>,
}

impl<'a> XmlName<'a> {
    pub fn local(local: impl Into<Cow<'a, str>>) -> Self {
        XmlName {
            prefix: None,
            local: local.into(),
        }
    }

    pub fn prefixed(prefix: impl Into<Cow<'a, str>>, local: impl Into<Cow<'a, str>>) -> Self {
        XmlName {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    /// Splits a lexical qualified name on its first colon.
    pub fn parse(qualified: &'a str) -> Self {
        match qualified.split_once(':') {
            Some((prefix, local)) => XmlName::prefixed(prefix, local),
            None => XmlName::local(qualified),
        }
    }

    pub fn borrowed(&self) -> XmlName<'_> {
        XmlName {
            prefix: self.prefix.as_deref().map(Cow::Borrowed),
            local: Cow::Borrowed(self.local.as_ref()),
        }
    }

    pub fn into_owned(self) -> XmlName<'static> {
        XmlName {
            prefix: self.prefix.map(|p| Cow::Owned(p.into_owned())),
            local: Cow::Owned(self.local.into_owned()),
        }
    }
}

impl fmt::Display for XmlName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute<'a> {
    pub name: XmlName<'a>,
    pub value: Cow<'a, str>,
}

impl XmlAttribute<'_> {
    pub fn borrowed(&self) -> XmlAttribute<'_> {
        XmlAttribute {
            name: self.name.borrowed(),
            value: Cow::Borrowed(self.value.as_ref()),
        }
    }

    pub fn into_owned(self) -> XmlAttribute<'static> {
        XmlAttribute {
            name: self.name.into_owned(),
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

/// One `xmlns` declaration. An empty prefix is the default namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NsBinding<'a> {
    pub prefix: Cow<'a, str>,
    pub uri: Cow<'a, str>,
}

impl NsBinding<'_> {
    pub fn borrowed(&self) -> NsBinding<'_> {
        NsBinding {
            prefix: Cow::Borrowed(self.prefix.as_ref()),
            uri: Cow::Borrowed(self.uri.as_ref()),
        }
    }

    pub fn into_owned(self) -> NsBinding<'static> {
        NsBinding {
            prefix: Cow::Owned(self.prefix.into_owned()),
            uri: Cow::Owned(self.uri.into_owned()),
        }
    }
}

/// An element start: name, namespace bindings in declaration order, and
/// attributes in document order. Both orders are significant and preserved
/// end to end, since compact encodings assign dictionary slots by first
/// occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement<'a> {
    pub name: XmlName<'a>,
    pub bindings: Vec<NsBinding<'a>>,
    pub attributes: Vec<XmlAttribute<'a>>,
}

impl XmlElement<'_> {
    pub fn borrowed(&self) -> XmlElement<'_> {
        XmlElement {
            name: self.name.borrowed(),
            bindings: self.bindings.iter().map(NsBinding::borrowed).collect(),
            attributes: self.attributes.iter().map(XmlAttribute::borrowed).collect(),
        }
    }

    pub fn into_owned(self) -> XmlElement<'static> {
        XmlElement {
            name: self.name.into_owned(),
            bindings: self.bindings.into_iter().map(NsBinding::into_owned).collect(),
            attributes: self
                .attributes
                .into_iter()
                .map(XmlAttribute::into_owned)
                .collect(),
        }
    }

    pub fn to_static(&self) -> XmlElement<'static> {
        self.clone().into_owned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlPI<'a> {
    pub target: Cow<'a, str>,
    pub data: Cow<'a, str>,
}

impl XmlPI<'_> {
    pub fn borrowed(&self) -> XmlPI<'_> {
        XmlPI {
            target: Cow::Borrowed(self.target.as_ref()),
            data: Cow::Borrowed(self.data.as_ref()),
        }
    }

    pub fn into_owned(self) -> XmlPI<'static> {
        XmlPI {
            target: Cow::Owned(self.target.into_owned()),
            data: Cow::Owned(self.data.into_owned()),
        }
    }
}

/// The structural events every codec in the harness speaks.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    StartDocument,
    EndDocument,
    StartElement(XmlElement<'a>),
    EndElement(XmlName<'a>),
    Characters(Cow<'a, str>),
    CData(Cow<'a, str>),
    Comment(Cow<'a, str>),
    ProcessingInstruction(XmlPI<'a>),
    EntityRef(Cow<'a, str>),
    DocType(Cow<'a, str>),
}

impl XmlEvent<'_> {
    pub fn borrowed(&self) -> XmlEvent<'_> {
        match self {
            XmlEvent::StartDocument => XmlEvent::StartDocument,
            XmlEvent::EndDocument => XmlEvent::EndDocument,
            XmlEvent::StartElement(element) => XmlEvent::StartElement(element.borrowed()),
            XmlEvent::EndElement(name) => XmlEvent::EndElement(name.borrowed()),
            XmlEvent::Characters(text) => XmlEvent::Characters(Cow::Borrowed(text.as_ref())),
            XmlEvent::CData(text) => XmlEvent::CData(Cow::Borrowed(text.as_ref())),
            XmlEvent::Comment(text) => XmlEvent::Comment(Cow::Borrowed(text.as_ref())),
            XmlEvent::ProcessingInstruction(pi) => XmlEvent::ProcessingInstruction(pi.borrowed()),
            XmlEvent::EntityRef(name) => XmlEvent::EntityRef(Cow::Borrowed(name.as_ref())),
            XmlEvent::DocType(text) => XmlEvent::DocType(Cow::Borrowed(text.as_ref())),
        }
    }

    pub fn into_owned(self) -> XmlEvent<'static> {
        match self {
            XmlEvent::StartDocument => XmlEvent::StartDocument,
            XmlEvent::EndDocument => XmlEvent::EndDocument,
            XmlEvent::StartElement(element) => XmlEvent::StartElement(element.into_owned()),
            XmlEvent::EndElement(name) => XmlEvent::EndElement(name.into_owned()),
            XmlEvent::Characters(text) => XmlEvent::Characters(Cow::Owned(text.into_owned())),
            XmlEvent::CData(text) => XmlEvent::CData(Cow::Owned(text.into_owned())),
            XmlEvent::Comment(text) => XmlEvent::Comment(Cow::Owned(text.into_owned())),
            XmlEvent::ProcessingInstruction(pi) => {
                XmlEvent::ProcessingInstruction(pi.into_owned())
            }
            XmlEvent::EntityRef(name) => XmlEvent::EntityRef(Cow::Owned(name.into_owned())),
            XmlEvent::DocType(text) => XmlEvent::DocType(Cow::Owned(text.into_owned())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            XmlEvent::StartDocument => "start document",
            XmlEvent::EndDocument => "end document",
            XmlEvent::StartElement(_) => "start element",
            XmlEvent::EndElement(_) => "end element",
            XmlEvent::Characters(_) => "characters",
            XmlEvent::CData(_) => "cdata",
            XmlEvent::Comment(_) => "comment",
            XmlEvent::ProcessingInstruction(_) => "processing instruction",
            XmlEvent::EntityRef(_) => "entity reference",
            XmlEvent::DocType(_) => "doctype",
        }
    }
}
