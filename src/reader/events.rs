//! XML Event Types
//!
//! Events delivered by the tokenizer to the traversal engine. Every event
//! carries its absolute depth so a traversal can tell its own children from
//! the content of a subtree it chose not to enter.

/// XML parsing event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Start of an element. `depth` counts open elements including this one,
    /// so the root element starts at depth 1.
    Start {
        depth: usize,
        /// Clark notation name (`{uri}local` or `local`)
        tag: String,
        /// Clark notation attribute names with decoded values, document order
        attributes: Vec<(String, String)>,
    },
    /// End of an element, at the same depth as its start
    End { depth: usize, tag: String },
    /// A coalesced run of character data (CDATA included) directly inside the
    /// element open at `depth`. Never empty.
    Text { depth: usize, text: String },
}
