use std::{collections::HashMap, sync::OnceLock};

use regex::Regex;

use crate::Block;

/// Failure to parse a dump record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DumpError {
    /// A block record whose `NAME` is not of the form `compound:block`.
    #[error("malformed block name `{0}`: expected `compound:block`")]
    MalformedName(String),
    /// A block record with no `NAME` entry at all.
    #[error("block record missing NAME")]
    MissingName,
}

/// Decomposed `<compound>:<block>.<parameter>` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionParts<'a> {
    /// Source compound; empty means "same compound as the referencing block".
    pub compound: &'a str,
    /// Source block name.
    pub block: &'a str,
    /// Source parameter name.
    pub parameter: &'a str,
}

fn connection_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<compound>[0-9A-Za-z_]*):(?P<block>[0-9A-Za-z_]+)\.(?P<parameter>.+)$")
            .expect("connection pattern is valid")
    })
}

/// Split a config value of the form `<compound>:<block>.<parameter>`.
///
/// Returns `None` when the value is not a connection reference.
pub fn connection_parts(value: &str) -> Option<ConnectionParts<'_>> {
    let captures = connection_re().captures(value)?;
    Some(ConnectionParts {
        compound: captures.name("compound").map_or("", |m| m.as_str()),
        block: captures.name("block").map_or("", |m| m.as_str()),
        parameter: captures.name("parameter").map_or("", |m| m.as_str()),
    })
}

/// Parse the text of one CP dump file into blocks.
///
/// Records are separated by a line containing exactly `END`; within a record
/// each line is `KEY = VALUE`, split on the first `=` with both sides
/// trimmed. A record whose `TYPE` is `COMPND` uses `NAME` as both compound
/// and block name; every other record requires `NAME` to be
/// `compound:block`. `cp` is the dump file stem, carried as block metadata.
pub fn parse_dump(text: &str, cp: &str) -> Result<Vec<Block>, DumpError> {
    text.trim()
        .split("\nEND\n")
        .map(|record| parse_record(record, cp))
        .collect()
}

fn parse_record(record: &str, cp: &str) -> Result<Block, DumpError> {
    let config: HashMap<String, String> = record
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let name = config.get("NAME").ok_or(DumpError::MissingName)?;

    let (compound, name) = if config.get("TYPE").is_some_and(|t| t == "COMPND") {
        (name.clone(), name.clone())
    } else {
        match name.split(':').collect::<Vec<_>>()[..] {
            [compound, block] => (compound.to_string(), block.to_string()),
            _ => return Err(DumpError::MalformedName(name.clone())),
        }
    };

    Ok(Block {
        compound,
        name,
        cp: cp.to_string(),
        config,
    })
}
