// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

mod common;

use std::fs;

use common::{boot, mount_input_tape, mount_output_tape, sha256_hex, unmount_tape_bytes};
use knightforge::codec::{bytes_from_hex0, bytes_from_hex1, bytes_from_hex2};
use knightforge::m1::{m1_to_bytes, SigilSet};
use knightforge::vm::hal::{DEVICE_TAPE_1, DEVICE_TAPE_2};
use knightforge::vm::{RegisterWidth, Vm};

#[test]
fn hex0_and_hex1_agree_on_sigil_free_text() {
    let text = "45 AC ; comment here\n# another\nE0 2d 99\n";
    assert_eq!(
        bytes_from_hex0(text),
        bytes_from_hex1(text, "t.hex1").unwrap()
    );
}

#[test]
fn backtick_decodes_as_nine_in_every_codec() {
    let text = "`0";
    assert_eq!(bytes_from_hex0(text), vec![0x90]);
    assert_eq!(bytes_from_hex1(text, "t").unwrap(), vec![0x90]);
    assert_eq!(bytes_from_hex2(text, "t").unwrap(), vec![0x90]);
}

#[test]
fn forward_reference_resolves_to_the_declared_position() {
    let bytes = bytes_from_hex2("@foo\n01\n:foo\n", "t.hex2").unwrap();
    // The label sits right after the 2-byte reference and the pair, so
    // the offset from past-the-reference is 1.
    assert_eq!(bytes, vec![0x00, 0x01, 0x01]);
}

#[test]
fn assembled_image_checksum_gate() {
    let text = ":start\nE0 00 2D 20 41 41 ; LOADUI r0 0x4141\nFF 00 00 00\n$start &start @start\n";
    let bytes = bytes_from_hex2(text, "gate.hex2").unwrap();
    assert_eq!(bytes.len(), 18);
    assert_eq!(
        sha256_hex(&bytes),
        "63ccd401f2a53b146ad66f1f66cec5604fb2df2425b81eb437e11f449f28d86f"
    );
}

/// Copies tape 1 to tape 2 byte by byte until EOF.
const TAPE_COPY_ROM: &[u8] = &[
    0xE0, 0x00, 0x2D, 0x21, 0x11, 0x00, // 0: LOADUI r1 tape_01
    0x42, 0x10, 0x01, 0x00, // 6: FGETC r0
    0xE0, 0x00, 0xA0, 0x30, 0xFF, 0xFF, // 10: CMPSKIPI.NE r0 -1
    0x3C, 0x00, 0x00, 0x0E, // 16: JUMP +14 (to HALT)
    0xE0, 0x00, 0x2D, 0x21, 0x11, 0x01, // 20: LOADUI r1 tape_02
    0x42, 0x10, 0x02, 0x00, // 26: FPUTC r0
    0x3C, 0x00, 0xFF, 0xDE, // 30: JUMP -34 (back to top)
    0xFF, 0x00, 0x00, 0x00, // 34: HALT
];

fn run_tape_copy(input: &[u8]) -> (Vec<u8>, u64) {
    let mut vm = boot(TAPE_COPY_ROM);
    mount_input_tape(&mut vm, DEVICE_TAPE_1, input);
    mount_output_tape(&mut vm, DEVICE_TAPE_2);
    let executed = vm.run().expect("program runs to HALT");
    (unmount_tape_bytes(&mut vm, DEVICE_TAPE_2), executed)
}

#[test]
fn tape_copy_program_echoes_its_input() {
    let (out, _) = run_tape_copy(b"knight");
    assert_eq!(out, b"knight");
}

#[test]
fn same_rom_and_input_is_deterministic() {
    let (out_a, count_a) = run_tape_copy(b"determinism");
    let (out_b, count_b) = run_tape_copy(b"determinism");
    assert_eq!(out_a, out_b);
    assert_eq!(count_a, count_b);
}

#[test]
fn m1_source_assembles_and_runs() {
    // The same tape-copy program written as M1 macro source.
    let src = "\
DEFINE LOADUI_R0 E0002D20
DEFINE LOADUI_R1 E0002D21
DEFINE FGETC 42100100
DEFINE FPUTC 42100200
DEFINE CMPSKIPI.NE_R0 E000A030
DEFINE JUMP 3C00
DEFINE HALT FF000000

:top
LOADUI_R1 0x1100
FGETC
CMPSKIPI.NE_R0 -1
JUMP @done
LOADUI_R1 0x1101
FPUTC
JUMP @top
:done
HALT
";
    let inputs = vec![("copy.M1".to_string(), src.to_string())];
    let rom = m1_to_bytes(&inputs, &SigilSet::hex2()).unwrap();

    let mut vm = boot(&rom);
    mount_input_tape(&mut vm, DEVICE_TAPE_1, b"bootstrap");
    mount_output_tape(&mut vm, DEVICE_TAPE_2);
    vm.run().expect("program runs to HALT");
    assert_eq!(unmount_tape_bytes(&mut vm, DEVICE_TAPE_2), b"bootstrap");
}

#[test]
fn macros_shared_across_input_files() {
    let defs = "DEFINE HALT FF000000".to_string();
    let prog = "HALT".to_string();
    let inputs = vec![("defs.M1".to_string(), defs), ("prog.M1".to_string(), prog)];
    let rom = m1_to_bytes(&inputs, &SigilSet::hex2()).unwrap();
    assert_eq!(rom, vec![0xFF, 0x00, 0x00, 0x00]);

    let mut vm = boot(&rom);
    vm.run().unwrap();
    assert!(vm.halted);
    assert_eq!(vm.performance_counter, 1);
}

#[test]
fn file_tapes_round_trip_through_the_hal() {
    let dir = tempfile::tempdir().unwrap();
    let tape2 = dir.path().join("tape_02");
    let rom: &[u8] = &[
        0xE0, 0x00, 0x2D, 0x20, 0x11, 0x01, // LOADUI r0 tape_02
        0x42, 0x10, 0x00, 0x01, // FOPEN_WRITE
        0xE0, 0x00, 0x2D, 0x20, 0x00, 0x4B, // LOADUI r0 'K'
        0xE0, 0x00, 0x2D, 0x21, 0x11, 0x01, // LOADUI r1 tape_02
        0x42, 0x10, 0x02, 0x00, // FPUTC r0
        0xE0, 0x00, 0x2D, 0x20, 0x11, 0x01, // LOADUI r0 tape_02
        0x42, 0x10, 0x00, 0x02, // FCLOSE
        0xFF, 0x00, 0x00, 0x00, // HALT
    ];
    let mut vm = boot(rom);
    vm.tapes.set_tape_paths(None, Some(tape2.clone()));
    vm.run().unwrap();
    assert_eq!(fs::read(&tape2).unwrap(), vec![0x4B]);
}

#[test]
fn widths_agree_where_semantics_are_width_free() {
    // AND r0 r1 r2 then HALT.
    let rom: &[u8] = &[0x05, 0x02, 0x00, 0x12, 0xFF, 0x00, 0x00, 0x00];
    let mut results = Vec::new();
    for width in [RegisterWidth::W16, RegisterWidth::W32, RegisterWidth::W64] {
        let mut vm = Vm::new(width, 1 << 12);
        vm.load_rom(rom);
        vm.registers[1] = 0x1234;
        vm.registers[2] = 0x00FF;
        vm.run().unwrap();
        results.push(vm.registers[0]);
    }
    assert_eq!(results, vec![0x34, 0x34, 0x34]);
}
