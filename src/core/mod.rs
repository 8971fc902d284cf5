//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks of the tokenizer:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Entities: reference decoding with Cow (zero-copy when possible)
//! - Attributes: raw attribute extraction from start tags
//! - Encoding: BOM detection and streaming UTF-16 conversion
//! - Namespace: prefix scopes and Clark-notation names
//! - DTD: entity declarations of the internal subset

pub mod attributes;
pub mod dtd;
pub mod encoding;
pub mod entities;
pub mod namespace;
pub mod scanner;
