//! Traversal Engine
//!
//! All traversals of a document share one [`RollbackCursor`] over the
//! tokenizer events. A traversal of the element at depth `d` reacts to:
//! - a start at depth `d + 1`: a child, handed to the dispatcher
//! - text at depth `d`: character data directly inside the element
//! - an end at depth `d` or less: the element closed; the event is rolled
//!   back so the enclosing traversal sees it too
//!
//! Everything else belongs to a child subtree that was already handled or
//! abandoned and is skipped without being kept.
//!
//! A traversal kept past the end of its element would read whatever follows
//! as its own children. The events count the closing tags delivered at each
//! depth, and a traversal whose element has closed fails as out of order.

use crate::error::{Error, Result, UsageError};
use crate::handler::{Dispatcher, Results};
use crate::node::{XmlElement, XmlElementAttributes, XmlNode, XmlText};
use crate::reader::events::XmlEvent;
use crate::reader::rollback::RollbackCursor;
use crate::reader::tokenizer::XmlTokenizer;
use crate::stream::StreamChain;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Tokenizer events with the error moved aside, so that events can be
/// replayed by the cursor.
pub(crate) struct Events {
    tokenizer: XmlTokenizer<StreamChain>,
    error: Option<Error>,
    /// Closing tags delivered so far, indexed by depth
    closed: Vec<u64>,
}

impl Events {
    pub(crate) fn new(tokenizer: XmlTokenizer<StreamChain>) -> Self {
        Events {
            tokenizer,
            error: None,
            closed: Vec::new(),
        }
    }

    /// Number of elements closed so far at `depth`
    fn closed(&self, depth: usize) -> u64 {
        self.closed.get(depth).copied().unwrap_or(0)
    }

    /// The error that ended the events, if any, handed out once
    fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

impl Iterator for Events {
    type Item = XmlEvent;

    fn next(&mut self) -> Option<XmlEvent> {
        match self.tokenizer.next()? {
            Ok(event) => {
                if let XmlEvent::End { depth, .. } = event {
                    if self.closed.len() <= depth {
                        self.closed.resize(depth + 1, 0);
                    }
                    self.closed[depth] += 1;
                }
                Some(event)
            }
            Err(error) => {
                self.error = Some(error);
                None
            }
        }
    }
}

pub(crate) type SharedCursor = Rc<RefCell<RollbackCursor<Events>>>;

/// One-shot right to walk the children of an element.
#[derive(Clone)]
pub(crate) struct Handle {
    cursor: SharedCursor,
    /// Cursor iteration right after the element's start
    iteration: u64,
    depth: usize,
    /// Elements closed at `depth` before this one started
    closed: u64,
    used: Rc<Cell<bool>>,
}

impl Handle {
    pub(crate) fn new(cursor: SharedCursor, iteration: u64, depth: usize) -> Self {
        let closed = cursor.borrow_mut().get_mut().closed(depth);
        Handle {
            cursor,
            iteration,
            depth,
            closed,
            used: Rc::new(Cell::new(false)),
        }
    }

    /// Consume the handle and walk the children with `dispatcher`.
    pub(crate) fn descend<T: 'static>(
        &self,
        dispatcher: Rc<Dispatcher<T>>,
        parents: Rc<[XmlElement]>,
    ) -> Children<T> {
        if self.used.replace(true) {
            return Children::failed(UsageError::AlreadyHandled.into());
        }
        Children {
            walk: Some(Walk {
                cursor: Rc::clone(&self.cursor),
                dispatcher,
                depth: self.depth,
                closed: self.closed,
                parents,
                expected: Some(self.iteration),
                current: None,
            }),
            failure: None,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("iteration", &self.iteration)
            .field("depth", &self.depth)
            .field("used", &self.used.get())
            .finish()
    }
}

/// Lazy output of a traversal: whatever the handlers produce for the
/// children of one element, in document order.
///
/// Nothing is read from the stream until the iterator is pulled. The first
/// error ends the iteration.
pub struct Children<T> {
    walk: Option<Walk<T>>,
    failure: Option<Error>,
}

struct Walk<T> {
    cursor: SharedCursor,
    dispatcher: Rc<Dispatcher<T>>,
    depth: usize,
    closed: u64,
    /// Ancestor chain given to children
    parents: Rc<[XmlElement]>,
    /// Iteration the cursor must be at when the walk starts
    expected: Option<u64>,
    /// Output of the last dispatched node, drained before reading on
    current: Option<Results<T>>,
}

impl<T> Children<T> {
    /// A traversal that yields `error` and stops.
    pub(crate) fn failed(error: Error) -> Self {
        Children {
            walk: None,
            failure: Some(error),
        }
    }
}

impl<T: 'static> Walk<T> {
    fn pull(&self) -> Result<Option<XmlEvent>> {
        let mut cursor = self.cursor.borrow_mut();
        if cursor.get_mut().closed(self.depth) != self.closed {
            return Err(UsageError::OutOfOrder.into());
        }
        match cursor.next() {
            Some(event) => Ok(Some(event)),
            None => cursor.get_mut().take_error().map_or(Ok(None), Err),
        }
    }

    fn child(&self, depth: usize, tag: &str, attributes: Vec<(String, String)>) -> Result<XmlElement> {
        let attributes = XmlElementAttributes::new(attributes)?;
        let iteration = self.cursor.borrow().iteration();
        let handle = Handle::new(Rc::clone(&self.cursor), iteration, depth);
        Ok(XmlElement::new(tag, attributes, Rc::clone(&self.parents)).attach(handle))
    }

    fn next_item(&mut self) -> Option<Result<T>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }

            if let Some(expected) = self.expected.take() {
                if self.cursor.borrow().iteration() != expected {
                    return Some(Err(UsageError::OutOfOrder.into()));
                }
            }

            let event = match self.pull() {
                Ok(Some(event)) => event,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            match event {
                XmlEvent::Start {
                    depth,
                    tag,
                    attributes,
                } if depth == self.depth + 1 => {
                    trace!(depth, tag = %tag, "child element");
                    let element = match self.child(depth, &tag, attributes) {
                        Ok(element) => element,
                        Err(e) => return Some(Err(e)),
                    };
                    self.current = Some(self.dispatcher.dispatch(XmlNode::Element(element)));
                }
                XmlEvent::Text { depth, text } if depth == self.depth => {
                    let text = XmlText::new(text, Rc::clone(&self.parents));
                    self.current = Some(self.dispatcher.dispatch(XmlNode::Text(text)));
                }
                XmlEvent::End { depth, .. } if depth <= self.depth => {
                    self.cursor.borrow_mut().rollback();
                    return None;
                }
                _ => {}
            }
        }
    }
}

impl<T: 'static> Iterator for Children<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if let Some(error) = self.failure.take() {
            return Some(Err(error));
        }
        let walk = self.walk.as_mut()?;
        let item = walk.next_item();
        if !matches!(item, Some(Ok(_))) {
            self.walk = None;
        }
        item
    }
}

impl<T> fmt::Debug for Children<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.walk {
            Some(walk) => f
                .debug_struct("Children")
                .field("depth", &walk.depth)
                .field("expected", &walk.expected)
                .finish_non_exhaustive(),
            None => f.debug_struct("Children").field("failure", &self.failure).finish(),
        }
    }
}

/// Last item of a sequence of results, or `None` when it is empty.
///
/// Stops at the first error.
pub fn last_item_or_none<T, I>(items: I) -> Result<Option<T>>
where
    I: IntoIterator<Item = Result<T>>,
{
    let mut last = None;
    for item in items {
        last = Some(item?);
    }
    Ok(last)
}
