// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The Knight register machine. Sixteen registers of a uniform width
//! picked at creation, a growable flat byte memory, and a fetch,
//! decode, evaluate loop that runs until HALT or a fatal fault.

pub mod decode;
pub mod hal;
mod instructions;

pub use decode::{instruction_size_at, Decoded, InstructionClass};
pub use hal::{Tape, TapeDeck};

use thiserror::Error;
use tracing::{debug, trace};

/// Register width in bits. Immutable for a VM's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWidth {
    W16,
    W32,
    W64,
}

impl RegisterWidth {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            16 => Some(Self::W16),
            32 => Some(Self::W32),
            64 => Some(Self::W64),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    pub fn bytes(self) -> u64 {
        u64::from(self.bits() / 8)
    }

    /// All representable values fit under this mask.
    pub fn mask(self) -> u64 {
        match self {
            Self::W16 => 0xFFFF,
            Self::W32 => 0xFFFF_FFFF,
            Self::W64 => u64::MAX,
        }
    }

    pub fn sign_bit(self) -> u64 {
        1 << (self.bits() - 1)
    }
}

/// Fatal machine faults. Every variant is terminal for the run.
#[derive(Debug, Error)]
pub enum VmError {
    #[error(
        "Within {perf_count} instructions, address {address:#x} fell outside of allocated memory"
    )]
    OutsideOfWorld { address: u64, perf_count: u64 },
    #[error("Within {perf_count} instructions, illegal instruction {bytes} at {address:#x}")]
    IllegalInstruction {
        address: u64,
        perf_count: u64,
        bytes: String,
    },
    #[error("Invalid HAL code {code:#x}")]
    InvalidHalCode { code: u32 },
    #[error("Invalid HAL device {device:#x}")]
    InvalidDevice { device: u64 },
    #[error("Write to protected address {address:#x}")]
    WriteProtected { address: u64 },
    #[error("Tape {0} is not open")]
    TapeNotOpen(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Condition bit masks written by the compare family and tested by
/// conditional jumps.
pub mod condition {
    pub const CARRY: u64 = 1 << 5;
    pub const BORROW: u64 = 1 << 4;
    pub const OVERFLOW: u64 = 1 << 3;
    pub const GT: u64 = 1 << 2;
    pub const EQ: u64 = 1 << 1;
    pub const LT: u64 = 1 << 0;
}

pub struct Vm {
    pub ip: u64,
    pub registers: [u64; 16],
    pub memory: Vec<u8>,
    pub halted: bool,
    pub exception: bool,
    pub performance_counter: u64,
    width: RegisterWidth,
    /// Writes below this boundary fault, when set.
    protect_below: Option<u64>,
    pub tapes: TapeDeck,
}

impl Vm {
    pub fn new(width: RegisterWidth, memory_size: usize) -> Self {
        Self {
            ip: 0,
            registers: [0; 16],
            memory: vec![0; memory_size],
            halted: false,
            exception: false,
            performance_counter: 0,
            width,
            protect_below: None,
            tapes: TapeDeck::new(),
        }
    }

    pub fn width(&self) -> RegisterWidth {
        self.width
    }

    /// Memory only ever grows.
    pub fn grow_memory(&mut self, amount: usize) {
        self.memory.resize(self.memory.len() + amount, 0);
    }

    /// Places a ROM image at address zero. Grows memory if the image
    /// is larger than what is allocated.
    pub fn load_rom(&mut self, rom: &[u8]) {
        if rom.len() > self.memory.len() {
            self.memory.resize(rom.len(), 0);
        }
        self.memory[..rom.len()].copy_from_slice(rom);
    }

    /// Loads a hex0-format text ROM, packing digit pairs to bytes.
    pub fn load_hex_rom(&mut self, text: &str) {
        let rom = crate::codec::bytes_from_hex0(text);
        self.load_rom(&rom);
    }

    /// Writes below the boundary will fault. Used by harnesses to
    /// catch programs scribbling over their own code.
    pub fn protect_below(&mut self, boundary: u64) {
        self.protect_below = Some(boundary);
    }

    pub(crate) fn out_of_world(&self, address: u64) -> VmError {
        VmError::OutsideOfWorld {
            address,
            perf_count: self.performance_counter,
        }
    }

    pub(crate) fn illegal(&self, address: u64, raw: &[u8]) -> VmError {
        let bytes = raw
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        VmError::IllegalInstruction {
            address,
            perf_count: self.performance_counter,
            bytes,
        }
    }

    /// Big-endian read of `count` bytes. Both ends are checked before
    /// any byte is touched.
    pub(crate) fn read_bytes(&self, address: u64, count: u64) -> Result<u64, VmError> {
        self.check_range(address, count)?;
        let start = address as usize;
        let mut value: u64 = 0;
        for b in &self.memory[start..start + count as usize] {
            value = (value << 8) | u64::from(*b);
        }
        Ok(value)
    }

    /// Big-endian write of the low `count` bytes of `value`.
    pub(crate) fn write_bytes(&mut self, address: u64, count: u64, value: u64) -> Result<(), VmError> {
        self.check_range(address, count)?;
        if let Some(boundary) = self.protect_below {
            if address < boundary {
                return Err(VmError::WriteProtected { address });
            }
        }
        let start = address as usize;
        for i in 0..count {
            let shift = 8 * (count - 1 - i);
            self.memory[start + i as usize] = ((value >> shift) & 0xFF) as u8;
        }
        Ok(())
    }

    fn check_range(&self, address: u64, count: u64) -> Result<(), VmError> {
        let last = address
            .checked_add(count.saturating_sub(1))
            .ok_or_else(|| self.out_of_world(u64::MAX))?;
        if address as usize >= self.memory.len() || last as usize >= self.memory.len() {
            return Err(self.out_of_world(if (address as usize) < self.memory.len() {
                last
            } else {
                address
            }));
        }
        Ok(())
    }

    /// One fetch-decode-evaluate cycle. Returns false once halted.
    pub fn step(&mut self) -> Result<bool, VmError> {
        if self.halted {
            return Ok(false);
        }
        trace!(ip = self.ip, count = self.performance_counter, "step");
        let next = decode::decode(self, self.ip)
            .and_then(|decoded| instructions::eval(self, &decoded))
            .map_err(|err| {
                self.halted = true;
                self.exception = true;
                err
            })?;
        self.performance_counter += 1;
        self.ip = next;
        Ok(!self.halted)
    }

    /// Runs to HALT. Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, VmError> {
        let start = self.performance_counter;
        while self.step()? {}
        debug!(
            instructions = self.performance_counter - start,
            ip = self.ip,
            "vm halted"
        );
        Ok(self.performance_counter - start)
    }
}
