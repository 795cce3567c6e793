//! Data model for DCS control processor configuration dumps.
//!
//! A dump file holds one record per configured block, each a sequence of
//! `KEY = VALUE` lines terminated by a line containing `END`. This crate
//! parses dump text into [`Block`] values and decomposes the
//! `<compound>:<block>.<parameter>` references that wire blocks together.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod block;
mod parse;

pub use block::Block;
pub use parse::{connection_parts, parse_dump, ConnectionParts, DumpError};
