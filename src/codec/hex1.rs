// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! hex1 adds `:label` declarations and 16-bit `@label` relative
//! references on top of the raw hex0 byte language.

use crate::core::error::CodecError;
use crate::core::tokens::TapeDialect;

use super::assemble_tape;

pub fn bytes_from_hex1(text: &str, file: &str) -> Result<Vec<u8>, CodecError> {
    assemble_tape(text, file, TapeDialect::Hex1)
}
