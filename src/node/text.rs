use super::element::{join_names, XmlElement};
use std::fmt;
use std::rc::Rc;

/// A run of character data directly inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlText {
    text: String,
    parents: Rc<[XmlElement]>,
}

impl XmlText {
    /// Name under which text nodes are dispatched. The NUL byte keeps it
    /// apart from every valid element name.
    pub const NAME: &'static str = "\0text";

    pub fn new(text: impl Into<String>, parents: impl Into<Rc<[XmlElement]>>) -> Self {
        XmlText {
            text: text.into(),
            parents: parents.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ancestor chain, root first
    pub fn parents(&self) -> &[XmlElement] {
        &self.parents
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for XmlText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XmlText({:?}", self.text)?;
        if !self.parents.is_empty() {
            write!(f, ", parents={}", join_names(&self.parents))?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::XmlElementAttributes;

    #[test]
    fn test_display() {
        let root = XmlElement::new("root", XmlElementAttributes::default(), Vec::new());
        let text = XmlText::new("Hello", vec![root]);
        assert_eq!(text.to_string(), r#"XmlText("Hello", parents=root)"#);
        assert_eq!(XmlText::new("x", Vec::new()).to_string(), r#"XmlText("x")"#);
    }
}
