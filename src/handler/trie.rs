//! Dispatch Trie
//!
//! Compiled form of a handler set. Each trie node is either a leaf, called
//! with the node it matched, or a branch keyed by path segment. A branch
//! matched by an element descends into it and dispatches its children with
//! the sub-branch; a branch matched by text produces nothing.

use super::{nothing, NodeFn, Results};
use crate::error::{Result, UsageError};
use crate::node::XmlNode;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

pub(crate) enum Dispatcher<T> {
    Leaf(NodeFn<T>),
    Branch(HashMap<String, Rc<Dispatcher<T>>>),
}

fn conflict(path: &[String], reason: &'static str) -> UsageError {
    UsageError::ConflictingHandlers {
        path: format!("{path:?}"),
        reason,
    }
}

impl<T: 'static> Dispatcher<T> {
    /// Compile `(path, leaf)` registrations. An empty path registers a
    /// catchall.
    pub(crate) fn build<I>(registrations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Vec<String>, NodeFn<T>)>,
    {
        let mut root = Dispatcher::Branch(HashMap::new());
        for (path, leaf) in registrations {
            root.insert(&path, leaf, &path)?;
        }
        Ok(root)
    }

    fn insert(&mut self, path: &[String], leaf: NodeFn<T>, full: &[String]) -> Result<()> {
        let Some((segment, rest)) = path.split_first() else {
            let taken = match self {
                Dispatcher::Branch(children) if children.is_empty() => None,
                Dispatcher::Branch(_) => Some("handlers exist"),
                Dispatcher::Leaf(_) if full.is_empty() => Some("catchall handler exists"),
                Dispatcher::Leaf(_) => Some("handler already registered"),
            };
            if let Some(reason) = taken {
                return Err(conflict(full, reason).into());
            }
            *self = Dispatcher::Leaf(leaf);
            return Ok(());
        };
        match self {
            Dispatcher::Leaf(_) => Err(conflict(full, "catchall handler exists").into()),
            Dispatcher::Branch(children) => {
                let child = children
                    .entry(segment.clone())
                    .or_insert_with(|| Rc::new(Dispatcher::Branch(HashMap::new())));
                Rc::make_mut(child).insert(rest, leaf, full)
            }
        }
    }

    /// Route `node` and return what the matching leaf produces.
    ///
    /// Keys are tried from the most specific: `{namespace}name` (`{}name`
    /// for nodes without namespace), then the bare name.
    pub(crate) fn dispatch(&self, node: XmlNode) -> Results<T> {
        let children = match self {
            Dispatcher::Leaf(leaf) => return leaf(node),
            Dispatcher::Branch(children) => children,
        };
        let qualified = format!("{{{}}}{}", node.namespace(), node.name());
        let Some(route) = children.get(&qualified).or_else(|| children.get(node.name())) else {
            return nothing();
        };
        match (&**route, node) {
            (Dispatcher::Leaf(leaf), node) => leaf(node),
            (Dispatcher::Branch(_), XmlNode::Element(element)) => {
                trace!(name = element.name(), "descending into branch");
                Box::new(element.iter_with(Rc::clone(route)))
            }
            (Dispatcher::Branch(_), XmlNode::Text(_)) => nothing(),
        }
    }
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        match self {
            Dispatcher::Leaf(leaf) => Dispatcher::Leaf(Rc::clone(leaf)),
            Dispatcher::Branch(children) => Dispatcher::Branch(children.clone()),
        }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatcher::Leaf(_) => f.write_str("Leaf"),
            Dispatcher::Branch(children) => f.debug_map().entries(children.iter()).finish(),
        }
    }
}
