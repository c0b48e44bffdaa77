// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction fetch and field extraction. The base encoding is four
//! bytes; the two immediate-bearing classes read a further two. All
//! multi-byte fields are big-endian.

use super::{Vm, VmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionClass {
    Nop,
    FourOp,
    ThreeOp,
    TwoOp,
    OneOp,
    TwoOpImm,
    OneOpImm,
    ZeroOpImm,
    Hal,
    Halt,
}

/// One fetched instruction, discarded after dispatch.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub class: InstructionClass,
    pub raw: [u8; 4],
    /// Extended opcode. Width depends on class, zero where unused.
    pub xop: u32,
    /// Register-index nibbles, class-dependent count, unused slots zero.
    pub regs: [u8; 4],
    /// Raw 16-bit immediate for the 6-byte classes, embedded immediate
    /// for the 0OPI class.
    pub imm: u16,
    /// 24-bit HAL code for the 0x42 class.
    pub hal_code: u32,
    pub ip: u64,
    pub next_ip: u64,
}

/// Fetches and field-extracts the instruction at `ip`. Immediate bytes
/// are bounds-checked here, before anything is evaluated.
pub fn decode(vm: &Vm, ip: u64) -> Result<Decoded, VmError> {
    // The last base byte may be out of bounds even when ip is not.
    let last = ip
        .checked_add(3)
        .ok_or_else(|| vm.out_of_world(u64::MAX))?;
    if last as usize >= vm.memory.len() {
        return Err(vm.out_of_world(last));
    }
    let start = ip as usize;
    let raw: [u8; 4] = vm.memory[start..start + 4].try_into().unwrap();

    let mut decoded = Decoded {
        class: InstructionClass::Halt,
        raw,
        xop: 0,
        regs: [0; 4],
        imm: 0,
        hal_code: 0,
        ip,
        next_ip: ip + 4,
    };
    match raw[0] {
        0x00 => {
            if raw != [0, 0, 0, 0] {
                return Err(vm.illegal(ip, &raw));
            }
            decoded.class = InstructionClass::Nop;
        }
        0x01 => {
            decoded.class = InstructionClass::FourOp;
            decoded.xop = u32::from(raw[1]);
            decoded.regs = [raw[2] >> 4, raw[2] & 0xF, raw[3] >> 4, raw[3] & 0xF];
        }
        0x05 => {
            decoded.class = InstructionClass::ThreeOp;
            decoded.xop = u32::from(raw[1]) * 0x10 + u32::from(raw[2] >> 4);
            decoded.regs = [raw[2] & 0xF, raw[3] >> 4, raw[3] & 0xF, 0];
        }
        0x09 => {
            decoded.class = InstructionClass::TwoOp;
            decoded.xop = u32::from(raw[1]) * 0x100 + u32::from(raw[2]);
            decoded.regs = [raw[3] >> 4, raw[3] & 0xF, 0, 0];
        }
        0x0D => {
            decoded.class = InstructionClass::OneOp;
            decoded.xop =
                u32::from(raw[1]) * 0x1000 + u32::from(raw[2]) * 0x10 + u32::from(raw[3] >> 4);
            decoded.regs = [raw[3] & 0xF, 0, 0, 0];
        }
        0xE1 => {
            decoded.class = InstructionClass::TwoOpImm;
            decoded.xop = u32::from(raw[2]);
            decoded.regs = [raw[3] >> 4, raw[3] & 0xF, 0, 0];
            decoded.imm = read_immediate(vm, ip + 4)?;
            decoded.next_ip = ip + 6;
        }
        0xE0 => {
            decoded.class = InstructionClass::OneOpImm;
            decoded.xop = u32::from(raw[2]) * 0x10 + u32::from(raw[3] >> 4);
            decoded.regs = [raw[3] & 0xF, 0, 0, 0];
            decoded.imm = read_immediate(vm, ip + 4)?;
            decoded.next_ip = ip + 6;
        }
        0x3C => {
            decoded.class = InstructionClass::ZeroOpImm;
            decoded.xop = u32::from(raw[1]);
            decoded.imm = u16::from(raw[2]) << 8 | u16::from(raw[3]);
        }
        0x42 => {
            decoded.class = InstructionClass::Hal;
            decoded.hal_code =
                u32::from(raw[1]) * 0x10000 + u32::from(raw[2]) * 0x100 + u32::from(raw[3]);
        }
        0xFF => decoded.class = InstructionClass::Halt,
        _ => return Err(vm.illegal(ip, &raw)),
    }
    Ok(decoded)
}

fn read_immediate(vm: &Vm, at: u64) -> Result<u16, VmError> {
    let last = at + 1;
    if last as usize >= vm.memory.len() {
        return Err(vm.out_of_world(last));
    }
    Ok(u16::from(vm.memory[at as usize]) << 8 | u16::from(vm.memory[at as usize + 1]))
}

/// Length of the instruction starting at `at`. The conditional-skip
/// family needs this to hop over a variable-length successor.
pub fn instruction_size_at(vm: &Vm, at: u64) -> Result<u64, VmError> {
    if at as usize >= vm.memory.len() {
        return Err(vm.out_of_world(at));
    }
    Ok(match vm.memory[at as usize] {
        0xE0 | 0xE1 => 6,
        _ => 4,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::RegisterWidth;

    fn vm_with(rom: &[u8]) -> Vm {
        let mut vm = Vm::new(RegisterWidth::W32, 64);
        vm.load_rom(rom);
        vm
    }

    #[test]
    fn three_op_fields() {
        let vm = vm_with(&[0x05, 0x00, 0x01, 0x23]);
        let d = decode(&vm, 0).unwrap();
        assert_eq!(d.class, InstructionClass::ThreeOp);
        assert_eq!(d.xop, 0x000);
        assert_eq!(&d.regs[..3], &[1, 2, 3]);
        assert_eq!(d.next_ip, 4);
    }

    #[test]
    fn one_op_packs_twenty_bits() {
        let vm = vm_with(&[0x0D, 0x00, 0x00, 0x35]);
        let d = decode(&vm, 0).unwrap();
        assert_eq!(d.class, InstructionClass::OneOp);
        assert_eq!(d.xop, 0x00003);
        assert_eq!(d.regs[0], 5);
    }

    #[test]
    fn immediate_classes_are_six_bytes() {
        let vm = vm_with(&[0xE1, 0x00, 0x0E, 0x01, 0x12, 0x34]);
        let d = decode(&vm, 0).unwrap();
        assert_eq!(d.class, InstructionClass::TwoOpImm);
        assert_eq!(d.xop, 0x0E);
        assert_eq!(d.regs[0], 0);
        assert_eq!(d.regs[1], 1);
        assert_eq!(d.imm, 0x1234);
        assert_eq!(d.next_ip, 6);
    }

    #[test]
    fn immediate_bytes_are_bounds_checked() {
        let mut vm = Vm::new(RegisterWidth::W32, 5);
        vm.load_rom(&[0xE0, 0x00, 0x2D, 0x10, 0x00]);
        let err = decode(&vm, 0).unwrap_err();
        assert!(matches!(err, VmError::OutsideOfWorld { address: 5, .. }));
    }

    #[test]
    fn hal_code_is_twenty_four_bits() {
        let vm = vm_with(&[0x42, 0x10, 0x02, 0x00]);
        let d = decode(&vm, 0).unwrap();
        assert_eq!(d.class, InstructionClass::Hal);
        assert_eq!(d.hal_code, 0x100200);
    }

    #[test]
    fn zero_op_embeds_its_immediate() {
        let vm = vm_with(&[0x3C, 0x00, 0xFF, 0xFC]);
        let d = decode(&vm, 0).unwrap();
        assert_eq!(d.class, InstructionClass::ZeroOpImm);
        assert_eq!(d.imm, 0xFFFC);
        assert_eq!(d.xop, 0);
    }

    #[test]
    fn size_predicate_sees_six_byte_forms() {
        let vm = vm_with(&[0xE0, 0, 0, 0, 0, 0, 0x05, 0, 0, 0]);
        assert_eq!(instruction_size_at(&vm, 0).unwrap(), 6);
        assert_eq!(instruction_size_at(&vm, 6).unwrap(), 4);
    }
}
