//! XML Reader Module
//!
//! Turns the flattened input stream into numbered events:
//! - BufferedReader: growable window over any `Read` source
//! - Tokenizer: incremental pull tokenizer producing events
//! - Events: event types shared with the traversal engine
//! - Rollback: iteration counter with one-step pushback

pub mod buffered;
pub mod events;
pub mod rollback;
pub mod tokenizer;
