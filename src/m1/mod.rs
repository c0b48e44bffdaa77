// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The M1 macro preprocessor. Lowers `DEFINE`-based macro source to
//! hex2 text, and optionally all the way to bytes via the hex2 label
//! resolver. Three passes in total: macro table, substitution, then
//! hex2's own label collection and resolution.

pub mod encode;
pub mod macros;
pub mod tokens;

pub use encode::{defs_used, emit_hex2, SigilSet};
pub use macros::{MacroTable, MacroValue};
pub use tokens::{tokenize_m1, M1Token, M1TokenKind};

use crate::codec::bytes_from_hex2;
use crate::core::error::CodecError;

/// Tokenizes every input, builds the one shared macro table, and emits
/// the combined hex2 text. Inputs are `(file name, contents)` pairs in
/// build order.
pub fn m1_to_hex2(inputs: &[(String, String)], sigils: &SigilSet) -> Result<String, CodecError> {
    let mut files = Vec::with_capacity(inputs.len());
    let mut table = MacroTable::new();
    for (file, text) in inputs {
        let tokens = tokenize_m1(text, file)?;
        table.collect(&tokens, file)?;
        files.push((file.clone(), tokens));
    }
    let mut out = String::new();
    for (file, tokens) in &files {
        emit_hex2(tokens, file, &table, sigils, &mut out)?;
    }
    Ok(out)
}

/// Full pipeline to bytes. The intermediate hex2 text never touches
/// disk.
pub fn m1_to_bytes(inputs: &[(String, String)], sigils: &SigilSet) -> Result<Vec<u8>, CodecError> {
    let text = m1_to_hex2(inputs, sigils)?;
    let file = inputs.first().map(|(f, _)| f.as_str()).unwrap_or("<m1>");
    bytes_from_hex2(&text, file)
}
