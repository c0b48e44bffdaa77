// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! hex2 extends hex1 with absolute references: `$label` emits the
//! label address as 2 big-endian bytes, `&label` as 4.

use crate::core::error::CodecError;
use crate::core::tokens::TapeDialect;

use super::assemble_tape;

pub fn bytes_from_hex2(text: &str, file: &str) -> Result<Vec<u8>, CodecError> {
    assemble_tape(text, file, TapeDialect::Hex2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CodecErrorKind;

    #[test]
    fn relative_reference_round_trip() {
        let out = bytes_from_hex2(":top\nFF @top\n", "t.hex2").unwrap();
        assert_eq!(out, vec![0xFF, 0xFF, 0xFD]);
    }

    #[test]
    fn absolute_pointer_is_two_bytes() {
        let out = bytes_from_hex2("00 00 :data AB $data\n", "t.hex2").unwrap();
        assert_eq!(out, vec![0x00, 0x00, 0xAB, 0x00, 0x02]);
    }

    #[test]
    fn absolute_address_is_four_bytes() {
        let out = bytes_from_hex2("&far 00 :far\n", "t.hex2").unwrap();
        assert_eq!(out, vec![0x00, 0x00, 0x00, 0x05, 0x00]);
    }

    #[test]
    fn reference_widths_advance_position() {
        // @ and $ occupy 2 bytes, & occupies 4, a pair occupies 1.
        let out = bytes_from_hex2("@a $a &a :a\n", "t.hex2").unwrap();
        assert_eq!(out, vec![0x00, 0x06, 0x00, 0x08, 0x00, 0x00, 0x00, 0x08]);
    }

    #[test]
    fn unknown_label_names_the_symbol() {
        let err = bytes_from_hex2("$nowhere\n", "t.hex2").unwrap_err();
        assert_eq!(err.kind(), CodecErrorKind::Symbol);
        assert!(err.message().contains("nowhere"));
    }

    #[test]
    fn label_positions_skip_comments() {
        let out = bytes_from_hex2("; header\n01 :after $after\n", "t.hex2").unwrap();
        assert_eq!(out, vec![0x01, 0x00, 0x01]);
    }
}
