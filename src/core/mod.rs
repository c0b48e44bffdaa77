// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Shared tape-format plumbing: structural errors, the hex1/hex2 tokenizer
//! and the label table consulted during reference resolution.

pub mod error;
pub mod labels;
pub mod tokens;

pub use error::{CodecError, CodecErrorKind};
pub use labels::LabelTable;
pub use tokens::{TapeDialect, TapeToken, TapeTokenizer};
