// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

#![allow(dead_code)]

use std::io::{Cursor, Read, Seek, SeekFrom};

use sha2::{Digest, Sha256};

use knightforge::vm::{RegisterWidth, Vm};

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// A 32-bit machine with the ROM loaded and room to run.
pub fn boot(rom: &[u8]) -> Vm {
    let mut vm = Vm::new(RegisterWidth::W32, 0);
    vm.load_rom(rom);
    vm.grow_memory(1 << 16);
    vm
}

pub fn mount_input_tape(vm: &mut Vm, device: u64, bytes: &[u8]) {
    vm.tapes.mount(device, Box::new(Cursor::new(bytes.to_vec())));
}

pub fn mount_output_tape(vm: &mut Vm, device: u64) {
    vm.tapes.mount(device, Box::new(Cursor::new(Vec::new())));
}

pub fn unmount_tape_bytes(vm: &mut Vm, device: u64) -> Vec<u8> {
    let mut tape = vm.tapes.unmount(device).expect("tape mounted");
    tape.seek(SeekFrom::Start(0)).expect("rewind tape");
    let mut bytes = Vec::new();
    tape.read_to_end(&mut bytes).expect("drain tape");
    bytes
}
