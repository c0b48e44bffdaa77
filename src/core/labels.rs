// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Label table built during the first assembly pass and consulted read-only
//! during the second.

use std::collections::HashMap;

use crate::core::error::{CodecError, CodecErrorKind};

/// Symbol name to resolved byte address, one table per assembly unit.
///
/// Redefining a label is a structural error, the same policy the M1
/// preprocessor applies to duplicate DEFINEs.
#[derive(Debug, Default)]
pub struct LabelTable {
    labels: HashMap<String, u32>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, address: u32, line: u32) -> Result<(), CodecError> {
        if self.labels.contains_key(name) {
            return Err(CodecError::new(
                CodecErrorKind::Symbol,
                "Duplicate label declaration",
                Some(name),
            )
            .with_line(line));
        }
        self.labels.insert(name.to_string(), address);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.labels.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
