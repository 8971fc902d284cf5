//! Parser Entry Point
//!
//! Wires the input stream to the tokenizer, wraps the events in the shared
//! rollback cursor and hands out the root-level traversal.

use crate::error::Result;
use crate::handler::Handler;
use crate::reader::buffered::DEFAULT_BUFFER_SIZE;
use crate::reader::rollback::RollbackCursor;
use crate::reader::tokenizer::{TokenizerOptions, XmlTokenizer};
use crate::stream::{IntoStreamable, StreamChain};
use crate::traverse::{last_item_or_none, Children, Events, Handle};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    insecurely_allow_entities: bool,
    read_size: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            insecurely_allow_entities: false,
            read_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept entity declarations in the document type and expand them.
    ///
    /// Only for trusted documents: entity expansion is how billion laughs
    /// style documents exhaust memory. External entities stay unresolved.
    pub fn insecurely_allow_entities(mut self, allow: bool) -> Self {
        self.insecurely_allow_entities = allow;
        self
    }

    /// Bytes pulled from the input per read. Zero fails on first read.
    pub fn read_size(mut self, size: usize) -> Self {
        self.read_size = size;
        self
    }

    pub fn allows_entities(&self) -> bool {
        self.insecurely_allow_entities
    }
}

/// Streaming parser over one document.
///
/// The document is read as the output of [`iter_from`](Self::iter_from) is
/// pulled; only the root level may be traversed, once.
#[derive(Debug)]
pub struct Parser {
    root: Handle,
}

impl Parser {
    pub fn new(stream: impl IntoStreamable) -> Self {
        Self::with_options(stream, ParserOptions::default())
    }

    pub fn with_options(stream: impl IntoStreamable, options: ParserOptions) -> Self {
        if options.insecurely_allow_entities {
            warn!("entity expansion enabled: parse only documents from trusted sources");
        }
        debug!(read_size = options.read_size, "creating parser");
        let tokenizer = XmlTokenizer::new(
            StreamChain::new(stream),
            TokenizerOptions {
                allow_entities: options.insecurely_allow_entities,
                read_size: options.read_size,
            },
        );
        let cursor = Rc::new(RefCell::new(RollbackCursor::new(Events::new(tokenizer))));
        Parser {
            root: Handle::new(cursor, 0, 0),
        }
    }

    /// Stream the root level of the document through `handler`.
    pub fn iter_from<T: 'static>(&self, handler: impl Into<Handler<T>>) -> Children<T> {
        match handler.into().compile() {
            Ok(dispatcher) => self.root.descend(Rc::new(dispatcher), Rc::from(Vec::new())),
            Err(e) => Children::failed(e),
        }
    }

    /// Like [`iter_from`](Self::iter_from), keeping only the last item.
    pub fn return_from<T: 'static>(&self, handler: impl Into<Handler<T>>) -> Result<Option<T>> {
        last_item_or_none(self.iter_from(handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, UsageError};
    use crate::handler::Handlers;
    use crate::node::XmlNode;

    fn names(node: XmlNode) -> Option<String> {
        Some(node.name().to_string())
    }

    #[test]
    fn test_root_element() {
        let parser = Parser::new(b"<root><a/></root>");
        let items: Vec<String> = parser
            .iter_from(Handlers::new().catchall(names))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items, ["root"]);
    }

    #[test]
    fn test_root_traversed_once() {
        let parser = Parser::new(b"<root/>");
        assert_eq!(parser.return_from(Handlers::new().catchall(names)).unwrap().as_deref(), Some("root"));
        let err = parser.return_from(Handlers::new().catchall(names)).unwrap_err();
        assert_eq!(err.as_usage(), Some(&UsageError::AlreadyHandled));
    }

    #[test]
    fn test_conflict_reported_without_consuming() {
        let parser = Parser::new(b"<root/>");
        let conflicting = Handlers::new().catchall(names).on("root", names);
        assert!(matches!(parser.return_from(conflicting), Err(Error::Usage(UsageError::ConflictingHandlers { .. }))));
        assert!(parser.return_from(Handlers::new().catchall(names)).is_ok());
    }

    #[test]
    fn test_zero_read_size() {
        let parser = Parser::with_options(b"<root/>", ParserOptions::new().read_size(0));
        let err = parser.return_from(Handlers::new().catchall(names)).unwrap_err();
        assert_eq!(err.as_usage(), Some(&UsageError::InvalidReadSize(0)));
    }

    #[test]
    fn test_options() {
        let options = ParserOptions::new().insecurely_allow_entities(true);
        assert!(options.allows_entities());
        assert!(!ParserOptions::default().allows_entities());
    }
}
