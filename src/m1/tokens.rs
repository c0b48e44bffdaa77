// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Token reader for M1 source. Three token kinds: atoms, quoted
//! strings, and newlines. Comments vanish but preserve the newline
//! they end on, and every file's stream ends with a trailing newline
//! token so downstream passes never have to special-case EOF.

use crate::core::error::{CodecError, CodecErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum M1TokenKind {
    Atom(String),
    Str(String),
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct M1Token {
    pub kind: M1TokenKind,
    pub line: u32,
}

impl M1Token {
    fn new(kind: M1TokenKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// Splits one file's text into tokens. Strings open with `"` or `'`
/// and run to the matching quote, uninterrupted by comments or
/// newlines. A quote still open at EOF is fatal.
pub fn tokenize_m1(text: &str, file: &str) -> Result<Vec<M1Token>, CodecError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut line: u32 = 1;
    let mut pos = 0usize;
    while pos < bytes.len() {
        let c = bytes[pos];
        pos += 1;
        match c {
            b'"' | b'\'' => {
                let quote = c;
                let start = pos;
                loop {
                    if pos >= bytes.len() {
                        return Err(CodecError::new(
                            CodecErrorKind::Structure,
                            "Unmatched quote",
                            None,
                        )
                        .with_file(file)
                        .with_line(line));
                    }
                    if bytes[pos] == quote {
                        break;
                    }
                    pos += 1;
                }
                let body = String::from_utf8_lossy(&bytes[start..pos]).into_owned();
                pos += 1;
                tokens.push(M1Token::new(M1TokenKind::Str(body), line));
            }
            b'#' | b';' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
                if pos < bytes.len() {
                    pos += 1;
                    tokens.push(M1Token::new(M1TokenKind::Newline, line));
                    line += 1;
                }
            }
            b'\n' => {
                tokens.push(M1Token::new(M1TokenKind::Newline, line));
                line += 1;
            }
            b' ' | b'\t' => {}
            _ => {
                let start = pos - 1;
                while pos < bytes.len() && !matches!(bytes[pos], b' ' | b'\t' | b'\n') {
                    pos += 1;
                }
                let atom = String::from_utf8_lossy(&bytes[start..pos]).into_owned();
                tokens.push(M1Token::new(M1TokenKind::Atom(atom), line));
                if pos < bytes.len() && bytes[pos] == b'\n' {
                    pos += 1;
                    tokens.push(M1Token::new(M1TokenKind::Newline, line));
                    line += 1;
                }
            }
        }
    }
    tokens.push(M1Token::new(M1TokenKind::Newline, line));
    Ok(tokens)
}
