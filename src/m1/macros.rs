// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Macro table construction. `DEFINE name value` consumes exactly the
//! two tokens following the DEFINE atom; the table is shared across
//! every input file of one build so a macro defined in one file can be
//! used in any other.

use std::collections::HashMap;

use crate::core::error::{CodecError, CodecErrorKind};

use super::tokens::{M1Token, M1TokenKind};

#[derive(Debug, Clone)]
pub struct MacroValue {
    pub text: String,
    pub is_string: bool,
}

#[derive(Debug, Default)]
pub struct MacroTable {
    map: HashMap<String, MacroValue>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&MacroValue> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Scans one file's tokens for DEFINE forms and records them.
    /// A duplicate name anywhere in the build is fatal.
    pub fn collect(&mut self, tokens: &[M1Token], file: &str) -> Result<(), CodecError> {
        let mut iter = tokens.iter();
        while let Some(token) = iter.next() {
            if !matches!(&token.kind, M1TokenKind::Atom(a) if a == "DEFINE") {
                continue;
            }
            let line = token.line;
            let name = match iter.next() {
                None => return Err(uncompleted(file, line)),
                Some(t) => match &t.kind {
                    M1TokenKind::Atom(a) => a.clone(),
                    M1TokenKind::Str(_) => {
                        return Err(CodecError::new(
                            CodecErrorKind::Structure,
                            "String used as macro name",
                            None,
                        )
                        .with_file(file)
                        .with_line(line));
                    }
                    M1TokenKind::Newline => return Err(newline_in_define(file, line)),
                },
            };
            let value = match iter.next() {
                None => return Err(uncompleted(file, line)),
                Some(t) => match &t.kind {
                    M1TokenKind::Atom(a) => MacroValue {
                        text: a.clone(),
                        is_string: false,
                    },
                    M1TokenKind::Str(s) => MacroValue {
                        text: s.clone(),
                        is_string: true,
                    },
                    M1TokenKind::Newline => return Err(newline_in_define(file, line)),
                },
            };
            if self.map.contains_key(&name) {
                return Err(CodecError::new(
                    CodecErrorKind::Symbol,
                    "Duplicate macro definition",
                    Some(&name),
                )
                .with_file(file)
                .with_line(line));
            }
            self.map.insert(name, value);
        }
        Ok(())
    }
}

fn uncompleted(file: &str, line: u32) -> CodecError {
    CodecError::new(CodecErrorKind::Structure, "File ended with uncompleted DEFINE", None)
        .with_file(file)
        .with_line(line)
}

fn newline_in_define(file: &str, line: u32) -> CodecError {
    CodecError::new(CodecErrorKind::Structure, "Newline inside DEFINE", None)
        .with_file(file)
        .with_line(line)
}
