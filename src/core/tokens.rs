// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Tokenizer for the hex1/hex2 tape formats.
//!
//! A small state machine over raw bytes: hex digits are emitted one nibble at
//! a time (the caller pairs them), `:`/`@`/`$`/`&` open a name buffer that is
//! terminated by whitespace, and `#`/`;` start a comment that runs to end of
//! line. Everything else is ignored, matching the permissive behavior of the
//! hardware bootstrap assemblers.

use crate::core::error::{CodecError, CodecErrorKind};

/// Which reference sigils the tape dialect recognizes.
///
/// hex1 knows only `:label` and `@label`; in that dialect `$` and `&` are
/// garbage bytes and get skipped like any other non-hex character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeDialect {
    Hex1,
    Hex2,
}

/// One token of a hex1/hex2 tape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapeToken {
    /// A single hex digit, already decoded to its nibble value.
    Nibble(u8),
    /// `:name` label declaration.
    Label(String),
    /// `@name` relative reference (2 output bytes).
    Rel(String),
    /// `$name` absolute pointer reference (2 output bytes, hex2 only).
    AbsPointer(String),
    /// `&name` absolute address reference (4 output bytes, hex2 only).
    AbsAddress(String),
}

/// Byte-cursor tokenizer over a whole tape held in memory.
#[derive(Debug)]
pub struct TapeTokenizer<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    dialect: TapeDialect,
}

impl<'a> TapeTokenizer<'a> {
    pub fn new(text: &'a str, dialect: TapeDialect) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
            dialect,
        }
    }

    /// Line number of the byte most recently consumed. 1-based.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Pull the next token, or `None` at end of input.
    ///
    /// An end-of-input inside a name buffer is a structural error: a
    /// label/reference must be terminated by whitespace before the tape ends.
    pub fn next_token(&mut self) -> Result<Option<TapeToken>, CodecError> {
        while let Some(c) = self.bump() {
            match c {
                b'#' | b';' => self.skip_comment(),
                b':' => return self.read_name(c).map(|n| Some(TapeToken::Label(n))),
                b'@' => return self.read_name(c).map(|n| Some(TapeToken::Rel(n))),
                b'$' if self.dialect == TapeDialect::Hex2 => {
                    return self.read_name(c).map(|n| Some(TapeToken::AbsPointer(n)));
                }
                b'&' if self.dialect == TapeDialect::Hex2 => {
                    return self.read_name(c).map(|n| Some(TapeToken::AbsAddress(n)));
                }
                _ => {
                    if let Some(nibble) = decode_hex_byte(c) {
                        return Ok(Some(TapeToken::Nibble(nibble)));
                    }
                    // Anything else is skipped, by design.
                }
            }
        }
        Ok(None)
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.bump() {
            if c == b'\n' {
                break;
            }
        }
    }

    fn read_name(&mut self, sigil: u8) -> Result<String, CodecError> {
        let start_line = self.line;
        let mut buf = Vec::new();
        while let Some(c) = self.bump() {
            if c == b' ' || c == b'\t' || c == b'\n' {
                return Ok(String::from_utf8_lossy(&buf).into_owned());
            }
            buf.push(c);
        }
        Err(CodecError::new(
            CodecErrorKind::Structure,
            "Tape ended inside a label or reference",
            Some(&format!("{}{}", sigil as char, String::from_utf8_lossy(&buf))),
        )
        .with_line(start_line))
    }
}

/// Decode one input byte as a hex digit.
///
/// Backtick (0x60) decodes as 9: the hardware reference assembler folds
/// lowercase to uppercase by masking bit 5, which drags 0x60 down to 0x40
/// ('@' + masking math lands on digit value 9). Both tape dialects and hex0
/// must reproduce that fold bit-for-bit. Only here, though. Backtick is not
/// a hex digit for any other purpose.
pub fn decode_hex_byte(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'`' => Some(9),
        _ => None,
    }
}
