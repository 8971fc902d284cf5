//! Handler Declarations
//!
//! Handlers decide what a traversal produces. Every declaration boils down
//! to leaves registered at paths of node names:
//! - a catchall receives every node it is given
//! - a path-bound callback receives the nodes at the end of its path
//! - stateful handlers ([`HandlerClass`], [`HandlerObject`]) register an
//!   instantiating leaf or their bound methods
//!
//! Path segments are local names (any namespace), `{uri}name` (that
//! namespace only) or `{}name` (no namespace only). [`XmlText::NAME`] as
//! last segment addresses text.

mod class;
mod trie;

pub use class::{HandlerClass, HandlerObject, XmlHandler};
pub(crate) use trie::Dispatcher;

use crate::error::{Error, Result};
use crate::node::{XmlElement, XmlNode, XmlText};
use crate::traverse::Children;
use std::fmt;
use std::rc::Rc;

/// Lazy output of a handler.
pub type Results<T> = Box<dyn Iterator<Item = Result<T>>>;

/// A compiled leaf: turns a node into output.
pub type NodeFn<T> = Rc<dyn Fn(XmlNode) -> Results<T>>;

pub(crate) fn nothing<T: 'static>() -> Results<T> {
    Box::new(std::iter::empty())
}

/// Values a handler callback may return.
pub trait IntoResults<T> {
    fn into_results(self) -> Results<T>;
}

impl<T: 'static> IntoResults<T> for () {
    fn into_results(self) -> Results<T> {
        nothing()
    }
}

impl<T: 'static> IntoResults<T> for Option<T> {
    fn into_results(self) -> Results<T> {
        Box::new(self.into_iter().map(Ok))
    }
}

impl<T: 'static> IntoResults<T> for Vec<T> {
    fn into_results(self) -> Results<T> {
        Box::new(self.into_iter().map(Ok))
    }
}

impl<T: 'static> IntoResults<T> for Children<T> {
    fn into_results(self) -> Results<T> {
        Box::new(self)
    }
}

impl<T: 'static> IntoResults<T> for Results<T> {
    fn into_results(self) -> Results<T> {
        self
    }
}

impl<T, R, E> IntoResults<T> for std::result::Result<R, E>
where
    T: 'static,
    R: IntoResults<T>,
    E: Into<Error>,
{
    fn into_results(self) -> Results<T> {
        match self {
            Ok(results) => results.into_results(),
            Err(e) => Box::new(std::iter::once(Err(e.into()))),
        }
    }
}

/// Sequence of node names.
pub trait IntoPath {
    fn into_path(self) -> Vec<String>;
}

impl IntoPath for &str {
    fn into_path(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoPath for String {
    fn into_path(self) -> Vec<String> {
        vec![self]
    }
}

impl<const N: usize> IntoPath for [&str; N] {
    fn into_path(self) -> Vec<String> {
        self.iter().map(|segment| segment.to_string()).collect()
    }
}

impl IntoPath for &[&str] {
    fn into_path(self) -> Vec<String> {
        self.iter().map(|segment| segment.to_string()).collect()
    }
}

impl IntoPath for Vec<&str> {
    fn into_path(self) -> Vec<String> {
        self.as_slice().into_path()
    }
}

impl IntoPath for Vec<String> {
    fn into_path(self) -> Vec<String> {
        self
    }
}

pub(crate) fn text_path(path: impl IntoPath) -> Vec<String> {
    let mut path = path.into_path();
    path.push(XmlText::NAME.to_string());
    path
}

/// A handler declaration.
pub enum Handler<T> {
    /// Receives every node; no path registration may coexist with it.
    Catchall(NodeFn<T>),
    /// Receives the nodes at the end of a path. An empty path is a catchall.
    At(Vec<String>, NodeFn<T>),
    /// Declarations compiled together
    Group(Vec<Handler<T>>),
}

impl<T: 'static> Handler<T> {
    /// Callback receiving every node.
    pub fn catchall<F, R>(callback: F) -> Self
    where
        F: Fn(XmlNode) -> R + 'static,
        R: IntoResults<T>,
    {
        Handler::Catchall(Rc::new(move |node: XmlNode| callback(node).into_results()))
    }

    /// Callback receiving the nodes at `path`.
    pub fn on<F, R>(path: impl IntoPath, callback: F) -> Self
    where
        F: Fn(XmlNode) -> R + 'static,
        R: IntoResults<T>,
    {
        Handler::At(path.into_path(), Rc::new(move |node: XmlNode| callback(node).into_results()))
    }

    /// Callback receiving the elements at `path`.
    pub fn on_element<F, R>(path: impl IntoPath, callback: F) -> Self
    where
        F: Fn(XmlElement) -> R + 'static,
        R: IntoResults<T>,
    {
        Handler::At(
            path.into_path(),
            Rc::new(move |node: XmlNode| match node {
                XmlNode::Element(element) => callback(element).into_results(),
                XmlNode::Text(_) => nothing(),
            }),
        )
    }

    /// Callback receiving the text directly inside the elements at `path`.
    pub fn on_text<F, R>(path: impl IntoPath, callback: F) -> Self
    where
        F: Fn(XmlText) -> R + 'static,
        R: IntoResults<T>,
    {
        Handler::At(
            text_path(path),
            Rc::new(move |node: XmlNode| match node {
                XmlNode::Text(text) => callback(text).into_results(),
                XmlNode::Element(_) => nothing(),
            }),
        )
    }

    /// Yield the nodes at `path` themselves.
    pub fn path(path: impl IntoPath) -> Self
    where
        T: From<XmlNode>,
    {
        Handler::At(
            path.into_path(),
            Rc::new(|node: XmlNode| -> Results<T> { Box::new(std::iter::once(Ok(T::from(node)))) }),
        )
    }

    /// Move every registration under `prefix`.
    pub(crate) fn prefixed(self, prefix: &[String]) -> Self {
        let join = |path: Vec<String>| {
            let mut full = prefix.to_vec();
            full.extend(path);
            full
        };
        match self {
            Handler::Catchall(leaf) => Handler::At(prefix.to_vec(), leaf),
            Handler::At(path, leaf) => Handler::At(join(path), leaf),
            Handler::Group(handlers) => {
                Handler::Group(handlers.into_iter().map(|h| h.prefixed(prefix)).collect())
            }
        }
    }

    fn collect(self, out: &mut Vec<(Vec<String>, NodeFn<T>)>) {
        match self {
            Handler::Catchall(leaf) => out.push((Vec::new(), leaf)),
            Handler::At(path, leaf) => out.push((path, leaf)),
            Handler::Group(handlers) => {
                for handler in handlers {
                    handler.collect(out);
                }
            }
        }
    }

    /// Build the dispatch trie. Fails on overlapping registrations.
    pub(crate) fn compile(self) -> Result<Dispatcher<T>> {
        let mut registrations = Vec::new();
        self.collect(&mut registrations);
        Dispatcher::build(registrations)
    }
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        match self {
            Handler::Catchall(leaf) => Handler::Catchall(Rc::clone(leaf)),
            Handler::At(path, leaf) => Handler::At(path.clone(), Rc::clone(leaf)),
            Handler::Group(handlers) => Handler::Group(handlers.clone()),
        }
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Catchall(_) => f.write_str("Catchall"),
            Handler::At(path, _) => f.debug_tuple("At").field(path).finish(),
            Handler::Group(handlers) => f.debug_list().entries(handlers).finish(),
        }
    }
}

/// Builder for a set of handler declarations.
///
/// ```
/// use lazyxml::{Handlers, Parser, XmlElement};
///
/// let parser = Parser::new(b"<list><item>a</item><item>b</item></list>");
/// let handlers = Handlers::new().on_element(["list", "item"], |item: XmlElement| item.text().map(Some));
/// let items: Vec<String> = parser.iter_from(handlers).collect::<Result<_, _>>().unwrap();
/// assert_eq!(items, ["a", "b"]);
/// ```
pub struct Handlers<T> {
    handlers: Vec<Handler<T>>,
}

impl<T> Default for Handlers<T> {
    fn default() -> Self {
        Handlers {
            handlers: Vec::new(),
        }
    }
}

impl<T: 'static> Handlers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add any declaration.
    pub fn add(mut self, handler: impl Into<Handler<T>>) -> Self {
        self.handlers.push(handler.into());
        self
    }

    /// See [`Handler::catchall`].
    pub fn catchall<F, R>(self, callback: F) -> Self
    where
        F: Fn(XmlNode) -> R + 'static,
        R: IntoResults<T>,
    {
        self.add(Handler::catchall(callback))
    }

    /// See [`Handler::on`].
    pub fn on<F, R>(self, path: impl IntoPath, callback: F) -> Self
    where
        F: Fn(XmlNode) -> R + 'static,
        R: IntoResults<T>,
    {
        self.add(Handler::on(path, callback))
    }

    /// See [`Handler::on_element`].
    pub fn on_element<F, R>(self, path: impl IntoPath, callback: F) -> Self
    where
        F: Fn(XmlElement) -> R + 'static,
        R: IntoResults<T>,
    {
        self.add(Handler::on_element(path, callback))
    }

    /// See [`Handler::on_text`].
    pub fn on_text<F, R>(self, path: impl IntoPath, callback: F) -> Self
    where
        F: Fn(XmlText) -> R + 'static,
        R: IntoResults<T>,
    {
        self.add(Handler::on_text(path, callback))
    }

    /// See [`Handler::path`].
    pub fn path(self, path: impl IntoPath) -> Self
    where
        T: From<XmlNode>,
    {
        self.add(Handler::path(path))
    }

    /// Register a stateful handler type.
    pub fn class<H: 'static, M: 'static>(self, class: HandlerClass<H, M, T>) -> Self {
        self.add(class)
    }

    /// Register a type through its [`XmlHandler`] description.
    pub fn handler_type<H>(self) -> Self
    where
        H: XmlHandler<Output = T>,
    {
        self.add(H::describe())
    }

    /// Register the bound methods of an existing instance.
    pub fn object<H: 'static>(self, object: HandlerObject<H, T>) -> Self {
        self.add(object)
    }
}

impl<T> From<Handlers<T>> for Handler<T> {
    fn from(handlers: Handlers<T>) -> Self {
        Handler::Group(handlers.handlers)
    }
}

impl<T> fmt::Debug for Handlers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.handlers).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UsageError;

    fn paths(handler: Handler<u8>) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        handler.collect(&mut out);
        out.into_iter().map(|(path, _)| path).collect()
    }

    #[test]
    fn test_into_path() {
        assert_eq!("a".into_path(), ["a"]);
        assert_eq!(["a", "b"].into_path(), ["a", "b"]);
        assert_eq!(vec!["a".to_string()].into_path(), ["a"]);
        assert_eq!(text_path("p"), ["p", "\0text"]);
    }

    #[test]
    fn test_into_results() {
        let items: Vec<Result<u8>> = Some(3u8).into_results().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(IntoResults::<u8>::into_results(()).count(), 0);
        let failed: Result<Option<u8>, UsageError> = Err(UsageError::HandlerBusy);
        let mut results: Results<u8> = failed.into_results();
        assert!(matches!(results.next(), Some(Err(Error::Usage(UsageError::HandlerBusy)))));
    }

    #[test]
    fn test_prefixed_paths() {
        let handler = Handler::Group(vec![
            Handler::catchall(|_| ()),
            Handler::on(["b", "c"], |_| ()),
        ])
        .prefixed(&["a".to_string()]);
        assert_eq!(paths(handler), [vec!["a"], vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_builder_collects_in_order() {
        let handlers: Handlers<u8> = Handlers::new()
            .on("a", |_| ())
            .on_text("b", |_| ())
            .on_element(["c", "d"], |_| ());
        assert_eq!(
            paths(handlers.into()),
            [vec!["a"], vec!["b", "\0text"], vec!["c", "d"]]
        );
    }
}
