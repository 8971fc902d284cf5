use super::attributes::XmlElementAttributes;
use super::XmlNode;
use crate::error::{Result, UsageError};
use crate::handler::{Dispatcher, Handler, Results};
use crate::traverse::{last_item_or_none, Children, Handle};
use std::fmt;
use std::rc::Rc;

/// An element met while streaming.
///
/// Besides its name and attributes, an element handed out by the parser
/// carries a one-shot handle on the stream: [`iter_from`](Self::iter_from),
/// [`return_from`](Self::return_from) and [`text`](Self::text) each consume
/// it. The handle is only valid until the parser moves past the element.
#[derive(Clone)]
pub struct XmlElement {
    name: String,
    namespace: String,
    attributes: XmlElementAttributes,
    parents: Rc<[XmlElement]>,
    handle: Option<Handle>,
}

/// Split a Clark notation tag into `(namespace, local name)`.
fn split_clark(tag: &str) -> (&str, &str) {
    tag.strip_prefix('{')
        .and_then(|rest| rest.split_once('}'))
        .unwrap_or(("", tag))
}

/// Local names of an ancestor chain, joined by `>`
pub(crate) fn join_names(parents: &[XmlElement]) -> String {
    let names: Vec<&str> = parents.iter().map(|parent| parent.name.as_str()).collect();
    names.join(">")
}

impl XmlElement {
    /// A detached element. `tag` may be in Clark notation (`{uri}local`).
    pub fn new(
        tag: impl AsRef<str>,
        attributes: XmlElementAttributes,
        parents: impl Into<Rc<[XmlElement]>>,
    ) -> Self {
        let (namespace, name) = split_clark(tag.as_ref());
        XmlElement {
            name: name.to_string(),
            namespace: namespace.to_string(),
            attributes,
            parents: parents.into(),
            handle: None,
        }
    }

    /// A detached element with an explicit namespace. An empty namespace
    /// lets `name` be split as in [`new`](Self::new).
    pub fn with_namespace(
        name: impl AsRef<str>,
        namespace: impl Into<String>,
        attributes: XmlElementAttributes,
        parents: impl Into<Rc<[XmlElement]>>,
    ) -> Self {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return XmlElement::new(name, attributes, parents);
        }
        XmlElement {
            name: name.as_ref().to_string(),
            namespace,
            attributes,
            parents: parents.into(),
            handle: None,
        }
    }

    pub(crate) fn attach(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Local name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI, empty when the element has none
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attributes(&self) -> &XmlElementAttributes {
        &self.attributes
    }

    /// Ancestor chain, root first
    pub fn parents(&self) -> &[XmlElement] {
        &self.parents
    }

    /// Ancestor chain of this element's children
    fn child_parents(&self) -> Rc<[XmlElement]> {
        let mut chain = Vec::with_capacity(self.parents.len() + 1);
        chain.extend(self.parents.iter().cloned());
        chain.push(XmlElement {
            handle: None,
            ..self.clone()
        });
        chain.into()
    }

    /// Stream the element's children through `handler`.
    ///
    /// Fails on first pull if the element was already handled, or if the
    /// parser already moved past it.
    pub fn iter_from<T: 'static>(&self, handler: impl Into<Handler<T>>) -> Children<T> {
        match handler.into().compile() {
            Ok(dispatcher) => self.iter_with(Rc::new(dispatcher)),
            Err(e) => Children::failed(e),
        }
    }

    pub(crate) fn iter_with<T: 'static>(&self, dispatcher: Rc<Dispatcher<T>>) -> Children<T> {
        match &self.handle {
            Some(handle) => handle.descend(dispatcher, self.child_parents()),
            None => Children::failed(UsageError::AlreadyHandled.into()),
        }
    }

    /// Like [`iter_from`](Self::iter_from), keeping only the last item.
    pub fn return_from<T: 'static>(&self, handler: impl Into<Handler<T>>) -> Result<Option<T>> {
        last_item_or_none(self.iter_from(handler))
    }

    /// Text content of the element and its descendants.
    ///
    /// Each text run is trimmed. Two runs are separated by a single space
    /// when there was whitespace between them, and joined directly
    /// otherwise: `<p>Hello <b>big</b>world</p>` gives `"Hello bigworld"`.
    pub fn text(&self) -> Result<String> {
        let mut output = String::new();
        let mut last_ends_with_space = false;
        for text in self.iter_from(Handler::catchall(collect_text)) {
            let text = text?;
            if text.is_empty() {
                continue;
            }
            let stripped = text.trim();
            if (last_ends_with_space || !text.starts_with(stripped)) && !output.is_empty() {
                output.push(' ');
            }
            output.push_str(stripped);
            last_ends_with_space = !text.ends_with(stripped);
        }
        Ok(output)
    }
}

/// Every text run under a node, in document order
fn collect_text(node: XmlNode) -> Results<String> {
    match node {
        XmlNode::Text(text) => Box::new(std::iter::once(Ok(text.into_string()))),
        XmlNode::Element(element) => Box::new(element.iter_from(Handler::catchall(collect_text))),
    }
}

impl PartialEq for XmlElement {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.namespace == other.namespace
            && self.attributes == other.attributes
            && self.parents == other.parents
    }
}

impl Eq for XmlElement {}

impl fmt::Debug for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlElement")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("attributes", &self.attributes)
            .field("parents", &join_names(&self.parents))
            .finish_non_exhaustive()
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("XmlElement(")?;
        if !self.namespace.is_empty() {
            write!(f, "{{{}}}", self.namespace)?;
        }
        f.write_str(&self.name)?;
        if !self.attributes.is_empty() {
            write!(f, ", attributes={}", self.attributes)?;
        }
        if !self.parents.is_empty() {
            write!(f, ", parents={}", join_names(&self.parents))?;
        }
        f.write_str(")")
    }
}
