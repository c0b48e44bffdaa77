// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! hex0: the bottom of the bootstrap chain.
//!
//! Hex digit pairs are packed big-endian-nibble-first into output bytes,
//! `#`/`;` comment to end of line, and every other byte is silently skipped.
//! Skipping is the contract, not an error path.

use crate::core::tokens::decode_hex_byte;

/// Pack a hex0 tape into raw bytes. Never fails; garbage is ignored.
pub fn bytes_from_hex0(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut high_nibble: Option<u8> = None;
    let mut in_comment = false;
    for &c in text.as_bytes() {
        if in_comment {
            if c == b'\n' {
                in_comment = false;
            }
            continue;
        }
        if c == b'#' || c == b';' {
            in_comment = true;
            continue;
        }
        if let Some(nibble) = decode_hex_byte(c) {
            match high_nibble.take() {
                None => high_nibble = Some(nibble),
                Some(high) => out.push((high << 4) | nibble),
            }
        }
    }
    // A dangling odd nibble never reaches the output.
    out
}
