//! Node Model
//!
//! Values handed to handlers while streaming:
//! - XmlElement: name, namespace, attributes, ancestors and a one-shot handle
//! - XmlText: a run of character data
//! - XmlElementAttributes: attribute map with bare-name resolution

mod attributes;
mod element;
mod text;

pub use attributes::XmlElementAttributes;
pub use element::XmlElement;
pub use text::XmlText;

use std::fmt;

/// Either kind of node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(XmlText),
}

impl XmlNode {
    /// Local name; [`XmlText::NAME`] for text
    pub fn name(&self) -> &str {
        match self {
            XmlNode::Element(element) => element.name(),
            XmlNode::Text(_) => XmlText::NAME,
        }
    }

    /// Namespace URI; always empty for text
    pub fn namespace(&self) -> &str {
        match self {
            XmlNode::Element(element) => element.namespace(),
            XmlNode::Text(_) => "",
        }
    }

    pub fn parents(&self) -> &[XmlElement] {
        match self {
            XmlNode::Element(element) => element.parents(),
            XmlNode::Text(text) => text.parents(),
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, XmlNode::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, XmlNode::Text(_))
    }

    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&XmlText> {
        match self {
            XmlNode::Text(text) => Some(text),
            XmlNode::Element(_) => None,
        }
    }

    pub fn into_element(self) -> Option<XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        }
    }

    pub fn into_text(self) -> Option<XmlText> {
        match self {
            XmlNode::Text(text) => Some(text),
            XmlNode::Element(_) => None,
        }
    }
}

impl From<XmlElement> for XmlNode {
    fn from(element: XmlElement) -> Self {
        XmlNode::Element(element)
    }
}

impl From<XmlText> for XmlNode {
    fn from(text: XmlText) -> Self {
        XmlNode::Text(text)
    }
}

impl fmt::Display for XmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlNode::Element(element) => fmt::Display::fmt(element, f),
            XmlNode::Text(text) => fmt::Display::fmt(text, f),
        }
    }
}
