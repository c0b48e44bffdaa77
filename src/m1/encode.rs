// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Substitution pass. Walks the token streams a second time, replacing
//! macro uses and lowering plain atoms, and writes out hex2-format
//! text for the downstream label resolver.

use std::fmt::Write as _;

use crate::core::error::{CodecError, CodecErrorKind};

use super::macros::MacroTable;
use super::tokens::{M1Token, M1TokenKind};

/// Leading characters that make an atom pass through untouched for the
/// hex2 pass to interpret. The set has drifted between toolchain
/// releases, so it is a parameter rather than a constant.
#[derive(Debug, Clone)]
pub struct SigilSet {
    chars: Vec<char>,
}

impl SigilSet {
    /// The hex2 sigils, the set current builds use.
    pub fn hex2() -> Self {
        Self {
            chars: vec![':', '@', '$', '&'],
        }
    }

    /// The wider set accepted by older builds.
    pub fn extended() -> Self {
        Self {
            chars: vec!['!', '@', '$', '~', '%', '&', ':', '^'],
        }
    }

    pub fn from_chars(chars: &str) -> Self {
        Self {
            chars: chars.chars().collect(),
        }
    }

    fn leads(&self, atom: &str) -> Option<char> {
        let first = atom.chars().next()?;
        self.chars.contains(&first).then_some(first)
    }
}

impl Default for SigilSet {
    fn default() -> Self {
        Self::hex2()
    }
}

/// Emits hex2 text for one file's tokens. DEFINE forms were consumed
/// by the table pass and produce no output here.
pub fn emit_hex2(
    tokens: &[M1Token],
    file: &str,
    table: &MacroTable,
    sigils: &SigilSet,
    out: &mut String,
) -> Result<(), CodecError> {
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        match &token.kind {
            M1TokenKind::Atom(atom) if atom == "DEFINE" => {
                iter.next();
                iter.next();
            }
            M1TokenKind::Atom(atom) => {
                if let Some(value) = table.lookup(atom) {
                    if value.is_string {
                        push_string_bytes(out, &value.text);
                    } else {
                        out.push_str(&value.text);
                    }
                } else {
                    emit_plain_atom(atom, file, token.line, sigils, out)?;
                }
            }
            M1TokenKind::Str(body) => {
                // Inline strings are NUL terminated; macro string
                // values above are substituted without one.
                push_string_bytes(out, body);
                out.push_str("00");
            }
            M1TokenKind::Newline => out.push('\n'),
        }
    }
    Ok(())
}

fn emit_plain_atom(
    atom: &str,
    file: &str,
    line: u32,
    sigils: &SigilSet,
    out: &mut String,
) -> Result<(), CodecError> {
    if let Some(hex) = atom.strip_prefix("0x") {
        let value = u64::from_str_radix(hex, 16).map_err(|_| {
            CodecError::new(CodecErrorKind::Literal, "Can't be parsed to hex", Some(atom))
                .with_file(file)
                .with_line(line)
        })?;
        let _ = write!(out, "{:04x}", value as u16);
    } else if let Some(sigil) = sigils.leads(atom) {
        // A space keeps a reference from fusing with the previous
        // emitted pair. Labels separate themselves.
        if sigil != ':' {
            out.push(' ');
        }
        out.push_str(atom);
    } else {
        let value: i64 = atom.parse().map_err(|_| {
            CodecError::new(
                CodecErrorKind::Literal,
                "Can't be parsed to decimal",
                Some(atom),
            )
            .with_file(file)
            .with_line(line)
        })?;
        let _ = write!(out, "{:04x}", value as u16);
    }
    Ok(())
}

fn push_string_bytes(out: &mut String, body: &str) {
    for b in body.bytes() {
        let _ = write!(out, "{b:02x}");
    }
}

/// Which macro names are actually referenced outside their DEFINEs.
/// Sorted for stable tooling output.
pub fn defs_used(files: &[(String, Vec<M1Token>)], table: &MacroTable) -> Vec<String> {
    let mut used = Vec::new();
    for (_, tokens) in files {
        let mut iter = tokens.iter();
        while let Some(token) = iter.next() {
            match &token.kind {
                M1TokenKind::Atom(atom) if atom == "DEFINE" => {
                    iter.next();
                    iter.next();
                }
                M1TokenKind::Atom(atom) => {
                    if table.contains(atom) && !used.contains(atom) {
                        used.push(atom.clone());
                    }
                }
                _ => {}
            }
        }
    }
    used.sort();
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::m1::tokens::tokenize_m1;

    fn emit(text: &str) -> Result<String, CodecError> {
        let tokens = tokenize_m1(text, "t.M1")?;
        let mut table = MacroTable::new();
        table.collect(&tokens, "t.M1")?;
        let mut out = String::new();
        emit_hex2(&tokens, "t.M1", &table, &SigilSet::hex2(), &mut out)?;
        Ok(out)
    }

    #[test]
    fn macro_substitution_is_exact_match() {
        let err = emit("DEFINE ADDI 0E\nADDI ADDIX").unwrap_err();
        // ADDIX is not a macro so it falls through to decimal parsing.
        assert_eq!(err.kind(), CodecErrorKind::Literal);
    }

    #[test]
    fn hex_atoms_are_two_bytes() {
        assert_eq!(emit("0x20").unwrap(), "0020\n");
        assert_eq!(emit("0xFFFF").unwrap(), "ffff\n");
    }

    #[test]
    fn decimal_atoms_wrap_to_sixteen_bits() {
        assert_eq!(emit("8").unwrap(), "0008\n");
        assert_eq!(emit("-1").unwrap(), "ffff\n");
    }

    #[test]
    fn sigil_atoms_pass_through() {
        assert_eq!(emit(":loop").unwrap(), ":loop\n");
        assert_eq!(emit("@loop").unwrap(), " @loop\n");
        assert_eq!(emit("$ptr").unwrap(), " $ptr\n");
        assert_eq!(emit("&addr").unwrap(), " &addr\n");
    }

    #[test]
    fn custom_sigil_sets_change_what_passes_through() {
        let tokens = tokenize_m1("%here", "t.M1").unwrap();
        let table = MacroTable::new();

        let mut out = String::new();
        let err = emit_hex2(&tokens, "t.M1", &table, &SigilSet::hex2(), &mut out).unwrap_err();
        assert_eq!(err.kind(), CodecErrorKind::Literal);

        let mut out = String::new();
        emit_hex2(&tokens, "t.M1", &table, &SigilSet::from_chars("%"), &mut out).unwrap();
        assert_eq!(out, " %here\n");
    }

    #[test]
    fn inline_strings_are_nul_terminated() {
        assert_eq!(emit("\"Hi\"").unwrap(), "486900\n");
    }

    #[test]
    fn macro_string_values_have_no_terminator() {
        let out = emit("DEFINE greet \"Hi\"\ngreet").unwrap();
        assert_eq!(out, "\n4869\n");
    }

    #[test]
    fn define_forms_emit_nothing() {
        let out = emit("DEFINE NOP 00000000\nNOP").unwrap();
        assert_eq!(out, "\n00000000\n");
    }

    #[test]
    fn bad_literal_names_the_atom() {
        let err = emit("12junk").unwrap_err();
        assert_eq!(err.kind(), CodecErrorKind::Literal);
        assert!(err.message().contains("12junk"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn defs_used_reports_sorted_references() {
        let tokens = tokenize_m1("DEFINE B 2\nDEFINE A 1\nB A B", "t.M1").unwrap();
        let mut table = MacroTable::new();
        table.collect(&tokens, "t.M1").unwrap();
        let files = vec![("t.M1".to_string(), tokens)];
        assert_eq!(defs_used(&files, &table), vec!["A", "B"]);
    }
}
