// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! One handler per mnemonic, dispatched on (class, extended opcode).
//! Every arithmetic result is masked to the register width before it
//! is stored; signed views are two's-complement reinterpretations
//! computed at the point of use.

use super::decode::{instruction_size_at, Decoded, InstructionClass};
use super::{condition, hal, RegisterWidth, Vm, VmError};

pub(crate) fn eval(vm: &mut Vm, d: &Decoded) -> Result<u64, VmError> {
    match d.class {
        InstructionClass::Nop => Ok(d.next_ip),
        InstructionClass::Halt => {
            vm.halted = true;
            Ok(d.next_ip)
        }
        InstructionClass::Hal => {
            hal::dispatch(vm, d)?;
            Ok(d.next_ip)
        }
        InstructionClass::ZeroOpImm => {
            // JUMP is the only populated slot in this class.
            if d.xop == 0x00 {
                Ok(offset_ip(d.next_ip, d.imm))
            } else {
                Err(vm.illegal(d.ip, &d.raw))
            }
        }
        // The four-register class is architecturally reserved; nothing
        // dispatches through it.
        InstructionClass::FourOp => Err(vm.illegal(d.ip, &d.raw)),
        InstructionClass::ThreeOp => eval_three_op(vm, d),
        InstructionClass::TwoOp => eval_two_op(vm, d),
        InstructionClass::OneOp => eval_one_op(vm, d),
        InstructionClass::TwoOpImm => eval_two_op_imm(vm, d),
        InstructionClass::OneOpImm => eval_one_op_imm(vm, d),
    }
}

fn eval_three_op(vm: &mut Vm, d: &Decoded) -> Result<u64, VmError> {
    let w = vm.width();
    let (r0, r1, r2) = (
        d.regs[0] as usize,
        d.regs[1] as usize,
        d.regs[2] as usize,
    );
    let a = vm.registers[r1];
    let b = vm.registers[r2];
    let sa = to_signed(w, a);
    let sb = to_signed(w, b);
    let value = match d.xop {
        0x000 | 0x001 => a.wrapping_add(b) & w.mask(),
        0x002 | 0x003 => a.wrapping_sub(b) & w.mask(),
        0x004 => compare_signed(sa, sb),
        0x005 => compare_unsigned(a, b),
        0x006 => mul_low(sa as i128, sb as i128, w),
        0x007 => mul_high(sa as i128 * sb as i128, w),
        0x008 => mul_low(a as i128, b as i128, w),
        0x009 => mul_high(a as i128 * b as i128, w),
        0x00A => {
            let q = checked_signed_div(vm, d, sa, sb)?.0;
            (q as u64) & w.mask()
        }
        0x00B => {
            let r = checked_signed_div(vm, d, sa, sb)?.1;
            (r as u64) & w.mask()
        }
        0x00C => {
            if b == 0 {
                return Err(vm.illegal(d.ip, &d.raw));
            }
            a / b
        }
        0x00D => {
            if b == 0 {
                return Err(vm.illegal(d.ip, &d.raw));
            }
            a % b
        }
        0x010 => if sa >= sb { a } else { b },
        0x011 => a.max(b),
        0x012 => if sa <= sb { a } else { b },
        0x013 => a.min(b),
        0x020 => a & b,
        0x021 => a | b,
        0x022 => a ^ b,
        0x023 => !(a & b) & w.mask(),
        0x024 => !(a | b) & w.mask(),
        0x025 => !(a ^ b) & w.mask(),
        0x030 => shift_left_zero(w, a, b),
        0x031 => shift_right_arith(w, a, b),
        0x032 => shift_left_zero(w, a, b),
        0x033 => shift_right_zero(w, a, b),
        0x034 => shift_left_one(w, a, b),
        0x035 => shift_right_one(w, a, b),
        0x036 => rotate_left(w, a, b),
        0x037 => rotate_right(w, a, b),
        0x038 => {
            let addr = indexed_address(vm, a, b)?;
            vm.read_bytes(addr, w.bytes())?
        }
        0x03A => {
            let addr = indexed_address(vm, a, b)?;
            vm.read_bytes(addr, 1)?
        }
        0x03B => {
            let addr = indexed_address(vm, a, b)?;
            sign_extend(w, vm.read_bytes(addr, 2)?, 16)
        }
        0x03C => {
            let addr = indexed_address(vm, a, b)?;
            vm.read_bytes(addr, 2)?
        }
        0x03D => {
            let addr = indexed_address(vm, a, b)?;
            sign_extend(w, vm.read_bytes(addr, 4)?, 32)
        }
        0x03E => {
            let addr = indexed_address(vm, a, b)?;
            vm.read_bytes(addr, 4)?
        }
        0x048 | 0x049 | 0x04A | 0x04B => {
            // STOREX family: the dst operand supplies the value, the
            // other two form the address.
            let addr = indexed_address(vm, a, b)?;
            let count = match d.xop {
                0x048 => w.bytes(),
                0x049 => 1,
                0x04A => 2,
                _ => 4,
            };
            vm.write_bytes(addr, count, vm.registers[r0])?;
            return Ok(d.next_ip);
        }
        0x050..=0x055 | 0x060 | 0x061 | 0x064 | 0x065 => {
            // CMPJUMP family: compare the first two registers, branch
            // to the address in the third.
            let x = vm.registers[r0];
            let y = vm.registers[r1];
            let taken = match d.xop {
                0x050 => to_signed(w, x) > to_signed(w, y),
                0x051 => to_signed(w, x) >= to_signed(w, y),
                0x052 => x == y,
                0x053 => x != y,
                0x054 => to_signed(w, x) <= to_signed(w, y),
                0x055 => to_signed(w, x) < to_signed(w, y),
                0x060 => x > y,
                0x061 => x >= y,
                0x064 => x <= y,
                _ => x < y,
            };
            return Ok(if taken { vm.registers[r2] } else { d.next_ip });
        }
        _ => return Err(vm.illegal(d.ip, &d.raw)),
    };
    vm.registers[r0] = value;
    Ok(d.next_ip)
}

fn eval_two_op(vm: &mut Vm, d: &Decoded) -> Result<u64, VmError> {
    let w = vm.width();
    let (r0, r1) = (d.regs[0] as usize, d.regs[1] as usize);
    let a = vm.registers[r1];
    match d.xop {
        0x0000 => vm.registers[r0] = (to_signed(w, a).wrapping_neg() as u64) & w.mask(),
        0x0001 => vm.registers[r0] = (to_signed(w, a).wrapping_abs() as u64) & w.mask(),
        0x0002 => {
            vm.registers[r0] = (to_signed(w, a).wrapping_abs().wrapping_neg() as u64) & w.mask()
        }
        0x0003 => vm.registers.swap(r0, r1),
        0x0004 => vm.registers[r0] = a,
        0x0005 => {
            vm.registers[r0] = a;
            vm.registers[r1] = 0;
        }
        0x0006 => vm.registers[r0] = !a & w.mask(),
        0x0100 => {
            // BRANCH: spill the return address at the second register,
            // transfer to the first.
            vm.write_bytes(vm.registers[r1], w.bytes(), d.next_ip)?;
            return Ok(vm.registers[r0]);
        }
        0x0101 => {
            // CALL is BRANCH plus a stack-pointer bump.
            vm.write_bytes(vm.registers[r1], w.bytes(), d.next_ip)?;
            vm.registers[r1] = vm.registers[r1].wrapping_add(w.bytes()) & w.mask();
            return Ok(vm.registers[r0]);
        }
        0x0200 | 0x0201 | 0x0202 | 0x0203 => {
            let count = match d.xop {
                0x0200 => w.bytes(),
                0x0201 => 1,
                0x0202 => 2,
                _ => 4,
            };
            vm.write_bytes(vm.registers[r1], count, vm.registers[r0])?;
            vm.registers[r1] = vm.registers[r1].wrapping_add(count) & w.mask();
        }
        0x0280..=0x0286 => {
            let (count, signed) = match d.xop {
                0x0280 => (w.bytes(), false),
                0x0281 => (1, true),
                0x0282 => (1, false),
                0x0283 => (2, true),
                0x0284 => (2, false),
                0x0285 => (4, true),
                _ => (4, false),
            };
            let sp = vm.registers[r1].wrapping_sub(count) & w.mask();
            let mut value = vm.read_bytes(sp, count)?;
            if signed && count < w.bytes() {
                value = sign_extend(w, value, (count * 8) as u32);
            }
            // Popped slots are zeroed, stack hygiene the self-hosting
            // toolchain depends on.
            vm.write_bytes(sp, count, 0)?;
            vm.registers[r0] = value;
            vm.registers[r1] = sp;
        }
        0x0300 | 0x0301 | 0x0302 | 0x0304 | 0x0305 | 0x0380 | 0x0381 | 0x0384 | 0x0385 => {
            let x = vm.registers[r0];
            let y = vm.registers[r1];
            let taken = match d.xop {
                0x0300 => to_signed(w, x) > to_signed(w, y),
                0x0301 => to_signed(w, x) >= to_signed(w, y),
                0x0302 => x == y,
                0x0304 => x != y,
                0x0305 => to_signed(w, x) < to_signed(w, y),
                0x0380 => x > y,
                0x0381 => x >= y,
                0x0384 => x <= y,
                _ => x < y,
            };
            return skip_if(vm, d.next_ip, taken);
        }
        _ => return Err(vm.illegal(d.ip, &d.raw)),
    }
    Ok(d.next_ip)
}

fn eval_one_op(vm: &mut Vm, d: &Decoded) -> Result<u64, VmError> {
    let w = vm.width();
    let r0 = d.regs[0] as usize;
    match d.xop {
        0x00000 => vm.registers[r0] = d.next_ip & w.mask(),
        // Identifies the register file by its byte width.
        0x00001 => vm.registers[r0] = w.bytes(),
        0x00002 => vm.registers[r0] = 0,
        0x00003 => vm.registers[r0] = w.mask(),
        0x01000 => {
            // JSR_COROUTINE swaps the register with the flow of
            // control.
            let target = vm.registers[r0];
            vm.registers[r0] = d.next_ip & w.mask();
            return Ok(target);
        }
        0x01001 | 0x02001 => {
            // RET and POPPC: pop the return address, zero the slot.
            let sp = vm.registers[r0].wrapping_sub(w.bytes()) & w.mask();
            let target = vm.read_bytes(sp, w.bytes())?;
            vm.write_bytes(sp, w.bytes(), 0)?;
            vm.registers[r0] = sp;
            return Ok(target);
        }
        0x02000 => {
            vm.write_bytes(vm.registers[r0], w.bytes(), d.next_ip)?;
            vm.registers[r0] = vm.registers[r0].wrapping_add(w.bytes()) & w.mask();
        }
        _ => return Err(vm.illegal(d.ip, &d.raw)),
    }
    Ok(d.next_ip)
}

fn eval_two_op_imm(vm: &mut Vm, d: &Decoded) -> Result<u64, VmError> {
    let w = vm.width();
    let (r0, r1) = (d.regs[0] as usize, d.regs[1] as usize);
    let a = vm.registers[r1];
    let signed_imm = sign_extend(w, u64::from(d.imm), 16);
    let raw_imm = u64::from(d.imm);
    match d.xop {
        0x0E => vm.registers[r0] = a.wrapping_add(signed_imm) & w.mask(),
        0x0F => vm.registers[r0] = a.wrapping_add(raw_imm) & w.mask(),
        0x10 => vm.registers[r0] = a.wrapping_sub(signed_imm) & w.mask(),
        0x11 => vm.registers[r0] = a.wrapping_sub(raw_imm) & w.mask(),
        0x12 => vm.registers[r0] = compare_signed(to_signed(w, a), to_signed(w, signed_imm)),
        0x1F => vm.registers[r0] = compare_unsigned(a, raw_imm),
        0x13..=0x19 => {
            let addr = displaced_address(a, d.imm);
            vm.registers[r0] = match d.xop {
                0x13 => vm.read_bytes(addr, w.bytes())?,
                0x14 => sign_extend(w, vm.read_bytes(addr, 1)?, 8),
                0x15 => vm.read_bytes(addr, 1)?,
                0x16 => sign_extend(w, vm.read_bytes(addr, 2)?, 16),
                0x17 => vm.read_bytes(addr, 2)?,
                0x18 => sign_extend(w, vm.read_bytes(addr, 4)?, 32),
                _ => vm.read_bytes(addr, 4)?,
            };
        }
        0x20..=0x23 => {
            let addr = displaced_address(a, d.imm);
            let count = match d.xop {
                0x20 => w.bytes(),
                0x21 => 1,
                0x22 => 2,
                _ => 4,
            };
            vm.write_bytes(addr, count, vm.registers[r0])?;
        }
        0xB0 => vm.registers[r0] = a & raw_imm,
        0xB1 => vm.registers[r0] = a | raw_imm,
        0xB2 => vm.registers[r0] = a ^ raw_imm,
        0xB3 => vm.registers[r0] = !(a & raw_imm) & w.mask(),
        0xB4 => vm.registers[r0] = !(a | raw_imm) & w.mask(),
        0xB5 => vm.registers[r0] = !(a ^ raw_imm) & w.mask(),
        0xC0..=0xC5 | 0xD0 | 0xD1 | 0xD4 | 0xD5 => {
            let x = vm.registers[r0];
            let y = vm.registers[r1];
            let taken = match d.xop {
                0xC0 => to_signed(w, x) > to_signed(w, y),
                0xC1 => to_signed(w, x) >= to_signed(w, y),
                0xC2 => x == y,
                0xC3 => x != y,
                0xC4 => to_signed(w, x) <= to_signed(w, y),
                0xC5 => to_signed(w, x) < to_signed(w, y),
                0xD0 => x > y,
                0xD1 => x >= y,
                0xD4 => x <= y,
                _ => x < y,
            };
            return Ok(if taken {
                offset_ip(d.next_ip, d.imm)
            } else {
                d.next_ip
            });
        }
        _ => return Err(vm.illegal(d.ip, &d.raw)),
    }
    Ok(d.next_ip)
}

fn eval_one_op_imm(vm: &mut Vm, d: &Decoded) -> Result<u64, VmError> {
    let w = vm.width();
    let r0 = d.regs[0] as usize;
    let a = vm.registers[r0];
    let signed_imm = sign_extend(w, u64::from(d.imm), 16);
    let raw_imm = u64::from(d.imm);
    match d.xop {
        // Condition-bit tested jumps.
        0x2C0 => return jump_if(d, a & condition::CARRY != 0),
        0x2C1 => return jump_if(d, a & condition::BORROW != 0),
        0x2C2 => return jump_if(d, a & condition::OVERFLOW != 0),
        0x2C3 => return jump_if(d, a & condition::GT != 0),
        0x2C4 => return jump_if(d, a & (condition::GT | condition::EQ) != 0),
        0x2C5 => return jump_if(d, a & condition::EQ != 0),
        0x2C6 => return jump_if(d, a & condition::EQ == 0),
        0x2C7 => return jump_if(d, a & (condition::LT | condition::EQ) != 0),
        0x2C8 => return jump_if(d, a & condition::LT != 0),
        // Whole-value and sign-bit tested jumps.
        0x2C9 => return jump_if(d, a == 0),
        0x2CA => return jump_if(d, a != 0),
        0x2CB => return jump_if(d, a & w.sign_bit() == 0),
        0x2CC => return jump_if(d, a & w.sign_bit() != 0),
        0x2D0 => {
            vm.write_bytes(a, w.bytes(), d.next_ip)?;
            vm.registers[r0] = a.wrapping_add(w.bytes()) & w.mask();
            return Ok(offset_ip(d.next_ip, d.imm));
        }
        0x2D1 => vm.registers[r0] = signed_imm,
        0x2D2 => vm.registers[r0] = raw_imm,
        0x2D3 => vm.registers[r0] = shift_left_zero(w, a, raw_imm),
        0x2D4 => vm.registers[r0] = shift_right_arith(w, a, raw_imm),
        0x2D5 => vm.registers[r0] = shift_left_zero(w, a, raw_imm),
        0x2D6 => vm.registers[r0] = shift_right_zero(w, a, raw_imm),
        0x2D7 => vm.registers[r0] = shift_left_one(w, a, raw_imm),
        0x2D8 => vm.registers[r0] = shift_right_one(w, a, raw_imm),
        0x2E0..=0x2E6 => {
            // LOADR family addresses relative to the next instruction.
            let addr = displaced_address(d.next_ip, d.imm);
            vm.registers[r0] = match d.xop {
                0x2E0 => vm.read_bytes(addr, w.bytes())?,
                0x2E1 => sign_extend(w, vm.read_bytes(addr, 1)?, 8),
                0x2E2 => vm.read_bytes(addr, 1)?,
                0x2E3 => sign_extend(w, vm.read_bytes(addr, 2)?, 16),
                0x2E4 => vm.read_bytes(addr, 2)?,
                0x2E5 => sign_extend(w, vm.read_bytes(addr, 4)?, 32),
                _ => vm.read_bytes(addr, 4)?,
            };
        }
        0x2F0..=0x2F3 => {
            let addr = displaced_address(d.next_ip, d.imm);
            let count = match d.xop {
                0x2F0 => w.bytes(),
                0x2F1 => 1,
                0x2F2 => 2,
                _ => 4,
            };
            vm.write_bytes(addr, count, a)?;
        }
        0xA00..=0xA05 | 0xA10 | 0xA11 | 0xA14 | 0xA15 => {
            let sa = to_signed(w, a);
            let si = to_signed(w, signed_imm);
            let taken = match d.xop {
                0xA00 => sa > si,
                0xA01 => sa >= si,
                0xA02 => a == signed_imm,
                0xA03 => a != signed_imm,
                0xA04 => sa <= si,
                0xA05 => sa < si,
                0xA10 => a > raw_imm,
                0xA11 => a >= raw_imm,
                0xA14 => a <= raw_imm,
                _ => a < raw_imm,
            };
            return skip_if(vm, d.next_ip, taken);
        }
        _ => return Err(vm.illegal(d.ip, &d.raw)),
    }
    Ok(d.next_ip)
}

// Width helpers.

fn to_signed(w: RegisterWidth, value: u64) -> i64 {
    if value & w.sign_bit() != 0 {
        (value | !w.mask()) as i64
    } else {
        value as i64
    }
}

/// Sign-extends the low `bits` of `value` out to the register width,
/// then re-masks.
fn sign_extend(w: RegisterWidth, value: u64, bits: u32) -> u64 {
    let sign = 1u64 << (bits - 1);
    if value & sign != 0 {
        (value | !((sign << 1).wrapping_sub(1))) & w.mask()
    } else {
        value
    }
}

fn compare_signed(a: i64, b: i64) -> u64 {
    match a.cmp(&b) {
        std::cmp::Ordering::Greater => condition::GT,
        std::cmp::Ordering::Equal => condition::EQ,
        std::cmp::Ordering::Less => condition::LT,
    }
}

fn compare_unsigned(a: u64, b: u64) -> u64 {
    match a.cmp(&b) {
        std::cmp::Ordering::Greater => condition::GT,
        std::cmp::Ordering::Equal => condition::EQ,
        std::cmp::Ordering::Less => condition::LT,
    }
}

fn mul_low(a: i128, b: i128, w: RegisterWidth) -> u64 {
    ((a.wrapping_mul(b)) as u64) & w.mask()
}

fn mul_high(product: i128, w: RegisterWidth) -> u64 {
    ((product >> w.bits()) as u64) & w.mask()
}

fn checked_signed_div(
    vm: &Vm,
    d: &Decoded,
    a: i64,
    b: i64,
) -> Result<(i64, i64), VmError> {
    if b == 0 {
        return Err(vm.illegal(d.ip, &d.raw));
    }
    Ok((a.wrapping_div(b), a.wrapping_rem(b)))
}

fn shift_left_zero(w: RegisterWidth, value: u64, count: u64) -> u64 {
    if count >= u64::from(w.bits()) {
        0
    } else {
        (value << count) & w.mask()
    }
}

fn shift_right_zero(w: RegisterWidth, value: u64, count: u64) -> u64 {
    if count >= u64::from(w.bits()) {
        0
    } else {
        value >> count
    }
}

fn shift_right_arith(w: RegisterWidth, value: u64, count: u64) -> u64 {
    let signed = to_signed(w, value);
    let count = count.min(u64::from(w.bits() - 1));
    ((signed >> count) as u64) & w.mask()
}

fn shift_left_one(w: RegisterWidth, value: u64, count: u64) -> u64 {
    if count >= u64::from(w.bits()) {
        w.mask()
    } else {
        ((value << count) | ((1u64 << count) - 1)) & w.mask()
    }
}

fn shift_right_one(w: RegisterWidth, value: u64, count: u64) -> u64 {
    if count >= u64::from(w.bits()) {
        w.mask()
    } else {
        let fill = w.mask() & !(w.mask() >> count);
        (value >> count) | fill
    }
}

fn rotate_left(w: RegisterWidth, value: u64, count: u64) -> u64 {
    let bits = u64::from(w.bits());
    let count = count % bits;
    if count == 0 {
        value
    } else {
        ((value << count) | (value >> (bits - count))) & w.mask()
    }
}

fn rotate_right(w: RegisterWidth, value: u64, count: u64) -> u64 {
    let bits = u64::from(w.bits());
    let count = count % bits;
    if count == 0 {
        value
    } else {
        ((value >> count) | (value << (bits - count))) & w.mask()
    }
}

/// Base-plus-index addressing for the LOADX/STOREX family. The sum is
/// not masked to the register width; an overflowing sum lands outside
/// the world and faults there.
fn indexed_address(vm: &Vm, base: u64, index: u64) -> Result<u64, VmError> {
    base.checked_add(index).ok_or_else(|| vm.out_of_world(u64::MAX))
}

/// Base register or instruction pointer plus a signed 16-bit
/// displacement, in flat address space.
fn displaced_address(base: u64, imm: u16) -> u64 {
    base.wrapping_add((imm as i16) as i64 as u64)
}

fn offset_ip(next_ip: u64, imm: u16) -> u64 {
    next_ip.wrapping_add((imm as i16) as i64 as u64)
}

fn jump_if(d: &Decoded, taken: bool) -> Result<u64, VmError> {
    Ok(if taken {
        offset_ip(d.next_ip, d.imm)
    } else {
        d.next_ip
    })
}

/// Conditional skip: hop over the next instruction, whose length
/// depends on its own opcode byte.
fn skip_if(vm: &Vm, next_ip: u64, taken: bool) -> Result<u64, VmError> {
    if taken {
        Ok(next_ip + instruction_size_at(vm, next_ip)?)
    } else {
        Ok(next_ip)
    }
}
