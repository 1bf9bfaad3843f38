//! Core markup scanning primitives
//!
//! - Scanner: memchr-accelerated delimiter detection
//! - Tokenizer: splits markup into raw text and tags, with a position marker
//! - Attributes: attribute parsing and rendering
//! - Encoding: BOM, XML declaration and charset handling

pub mod attributes;
pub mod encoding;
pub mod scanner;
pub mod tokenizer;
