// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Structural (encode-time) error type shared by the codecs and the M1
//! preprocessor. These are always fatal for the build step that raised them.

use std::fmt;

/// Categories of structural errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecErrorKind {
    /// Malformed or incomplete token stream (unterminated name, bad DEFINE).
    Structure,
    /// A symbolic name that cannot be resolved or is defined twice.
    Symbol,
    /// An atom that parses as neither hex nor decimal.
    Literal,
}

/// A structural error with the file and line it was raised from.
#[derive(Debug, Clone)]
pub struct CodecError {
    kind: CodecErrorKind,
    message: String,
    file: Option<String>,
    line: Option<u32>,
}

impl CodecError {
    pub fn new(kind: CodecErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
            file: None,
            line: None,
        }
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn kind(&self) -> CodecErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{file}:{line}: {}", self.message),
            (Some(file), None) => write!(f, "{file}: {}", self.message),
            (None, Some(line)) => write!(f, "line {line}: {}", self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CodecError {}

fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_file_and_line() {
        let err = CodecError::new(CodecErrorKind::Symbol, "Unknown label", Some("foo"))
            .with_file("boot.hex2")
            .with_line(12);
        assert_eq!(err.to_string(), "boot.hex2:12: Unknown label: foo");
        assert_eq!(err.kind(), CodecErrorKind::Symbol);
    }

    #[test]
    fn display_without_location() {
        let err = CodecError::new(CodecErrorKind::Literal, "bad atom", None);
        assert_eq!(err.to_string(), "bad atom");
    }
}
