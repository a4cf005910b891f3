//! Attribute key encoding.
//!
//! | Key                     | Form                                 |
//! |-------------------------|--------------------------------------|
//! | string `foo`            | `.foo`                               |
//! | well-known symbol       | `@Symbol.iterator`                   |
//! | other symbol            | `~<id>\|<description>` or `~<id>`    |
//!
//! The description of a symbol key is everything after the first `|`, so
//! descriptions may themselves contain `|`.

use crate::node::{Id, STRUCTURAL_FIELDS};

pub fn encode_named(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 1);
    key.push('.');
    key.push_str(name);
    key
}

pub fn encode_builtin(name: &str) -> String {
    format!("@{name}")
}

pub fn encode_token(id: Id, description: Option<&str>) -> String {
    match description {
        Some(description) => format!("~{id}|{description}"),
        None => format!("~{id}"),
    }
}

/// A composite field name, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyForm<'a> {
    Named(&'a str),
    Builtin(&'a str),
    /// `id` is `None` when the id part is empty or not a positive integer.
    Token {
        id: Option<Id>,
        description: Option<&'a str>,
    },
    /// `type`, `id`, `prototype`, `source`: part of the node, not a key.
    Structural,
    Unrecognized,
}

pub fn parse_key(key: &str) -> KeyForm<'_> {
    if let Some(name) = key.strip_prefix('.') {
        return KeyForm::Named(name);
    }
    if let Some(name) = key.strip_prefix('@') {
        return KeyForm::Builtin(name);
    }
    if let Some(rest) = key.strip_prefix('~') {
        let (id_text, description) = match rest.find('|') {
            Some(bar) => (&rest[..bar], Some(&rest[bar + 1..])),
            None => (rest, None),
        };
        return KeyForm::Token {
            id: Id::parse(id_text),
            description,
        };
    }
    if STRUCTURAL_FIELDS.contains(&key) {
        return KeyForm::Structural;
    }
    KeyForm::Unrecognized
}
