//! lazyxml - Streaming XML traversal with bounded memory
//!
//! A document is read as the caller pulls output. Handlers receive the
//! nodes of one level and decide whether to descend into each element;
//! subtrees nobody descends into are skipped without being kept.
//!
//! Layers:
//! - stream: flattens buffers, readers and sequences into one byte source
//! - reader: incremental tokenizer and the shared rollback cursor
//! - traverse: per-element pull iterators over the cursor
//! - handler: path-based dispatch, callbacks and stateful handlers
//! - node: elements, text and attributes handed to handlers
//!
//! ```
//! use lazyxml::{Handlers, Parser, XmlElement};
//!
//! let parser = Parser::new(b"<comments><comment>Test</comment><comment><p>Hello everyone!</p></comment></comments>");
//! let texts: Vec<String> = parser
//!     .iter_from(Handlers::new().on_element(["comments", "comment"], |c: XmlElement| c.text().map(Some)))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(texts, ["Test", "Hello everyone!"]);
//! ```

mod core;
mod error;
mod handler;
mod node;
mod parser;
mod reader;
mod stream;
mod traverse;

pub use error::{BoxError, Error, Result, UsageError};
pub use handler::{
    Handler, HandlerClass, HandlerObject, Handlers, IntoPath, IntoResults, NodeFn, Results, XmlHandler,
};
pub use node::{XmlElement, XmlElementAttributes, XmlNode, XmlText};
pub use parser::{Parser, ParserOptions};
pub use stream::{IntoStreamable, StreamChain, Streamable};
pub use traverse::{last_item_or_none, Children};
