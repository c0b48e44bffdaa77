// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Hardware abstraction layer. Two tape files plus host stdio,
//! selected by a device register, driven by 24-bit codes embedded in
//! the 0x42 instruction class.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use tracing::trace;

use super::{Decoded, Vm, VmError};

pub const HAL_FOPEN_READ: u32 = 0x100000;
pub const HAL_FOPEN_WRITE: u32 = 0x100001;
pub const HAL_FCLOSE: u32 = 0x100002;
pub const HAL_REWIND: u32 = 0x100003;
pub const HAL_FSEEK: u32 = 0x100004;
pub const HAL_FGETC: u32 = 0x100100;
pub const HAL_FPUTC: u32 = 0x100200;
pub const HAL_MEM: u32 = 0x110000;

pub const DEVICE_STDIO: u64 = 0x0;
pub const DEVICE_TAPE_1: u64 = 0x1100;
pub const DEVICE_TAPE_2: u64 = 0x1101;

// The I/O codes take the device in register 1 and data in register 0.
// The file-management codes take the device in register 0.
const DATA_REGISTER: usize = 0;
const DEVICE_REGISTER: usize = 1;
const FILE_DEVICE_REGISTER: usize = 0;
const SEEK_OFFSET_REGISTER: usize = 1;

/// Anything a tape needs to support. Plain files qualify, and tests
/// mount `io::Cursor` buffers.
pub trait Tape: Read + Write + Seek {}
impl<T: Read + Write + Seek> Tape for T {}

#[derive(Default)]
pub struct TapeDeck {
    tape1_path: Option<PathBuf>,
    tape2_path: Option<PathBuf>,
    tape1: Option<Box<dyn Tape>>,
    tape2: Option<Box<dyn Tape>>,
}

impl TapeDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tape_paths(&mut self, tape1: Option<PathBuf>, tape2: Option<PathBuf>) {
        self.tape1_path = tape1;
        self.tape2_path = tape2;
    }

    /// Mounts an already-open tape, bypassing the path-based open.
    pub fn mount(&mut self, device: u64, tape: Box<dyn Tape>) {
        match device {
            DEVICE_TAPE_1 => self.tape1 = Some(tape),
            DEVICE_TAPE_2 => self.tape2 = Some(tape),
            _ => {}
        }
    }

    /// Consumes a mounted tape, for inspecting what a program wrote.
    pub fn unmount(&mut self, device: u64) -> Option<Box<dyn Tape>> {
        match device {
            DEVICE_TAPE_1 => self.tape1.take(),
            DEVICE_TAPE_2 => self.tape2.take(),
            _ => None,
        }
    }

    fn path_for(&self, device: u64) -> Result<&PathBuf, VmError> {
        let path = match device {
            DEVICE_TAPE_1 => self.tape1_path.as_ref(),
            DEVICE_TAPE_2 => self.tape2_path.as_ref(),
            _ => return Err(VmError::InvalidDevice { device }),
        };
        path.ok_or(VmError::TapeNotOpen("path"))
    }

    fn slot(&mut self, device: u64) -> Result<&mut Option<Box<dyn Tape>>, VmError> {
        match device {
            DEVICE_TAPE_1 => Ok(&mut self.tape1),
            DEVICE_TAPE_2 => Ok(&mut self.tape2),
            _ => Err(VmError::InvalidDevice { device }),
        }
    }

    fn open_tape(&mut self, device: u64) -> Result<&mut Box<dyn Tape>, VmError> {
        self.slot(device)?
            .as_mut()
            .ok_or(VmError::TapeNotOpen("device"))
    }
}

/// Executes one HAL instruction. Unknown codes and unknown devices are
/// fatal.
pub(crate) fn dispatch(vm: &mut Vm, decoded: &Decoded) -> Result<(), VmError> {
    trace!(code = format_args!("{:#x}", decoded.hal_code), "hal");
    match decoded.hal_code {
        HAL_FOPEN_READ => {
            let device = vm.registers[FILE_DEVICE_REGISTER];
            let path = vm.tapes.path_for(device)?.clone();
            let file = File::open(path)?;
            vm.tapes.mount(device, Box::new(ReadOnlyTape(file)));
            Ok(())
        }
        HAL_FOPEN_WRITE => {
            let device = vm.registers[FILE_DEVICE_REGISTER];
            let path = vm.tapes.path_for(device)?.clone();
            let file = File::create(path)?;
            vm.tapes.mount(device, Box::new(WriteOnlyTape(file)));
            Ok(())
        }
        HAL_FCLOSE => {
            let device = vm.registers[FILE_DEVICE_REGISTER];
            vm.tapes.slot(device)?.take();
            Ok(())
        }
        HAL_REWIND => {
            let device = vm.registers[FILE_DEVICE_REGISTER];
            vm.tapes.open_tape(device)?.seek(SeekFrom::Start(0))?;
            Ok(())
        }
        HAL_FSEEK => {
            let device = vm.registers[FILE_DEVICE_REGISTER];
            let offset = to_signed(vm, vm.registers[SEEK_OFFSET_REGISTER]);
            vm.tapes
                .open_tape(device)?
                .seek(SeekFrom::Current(offset))?;
            Ok(())
        }
        HAL_FGETC => {
            let device = vm.registers[DEVICE_REGISTER];
            let byte = match device {
                DEVICE_STDIO => read_one(&mut io::stdin().lock())?,
                _ => read_one(vm.tapes.open_tape(device)?)?,
            };
            // EOF reads back as the all-ones pattern, width-wide -1.
            vm.registers[DATA_REGISTER] = match byte {
                Some(b) => u64::from(b),
                None => vm.width().mask(),
            };
            Ok(())
        }
        HAL_FPUTC => {
            let device = vm.registers[DEVICE_REGISTER];
            let byte = (vm.registers[DATA_REGISTER] & 0xFF) as u8;
            match device {
                DEVICE_STDIO => {
                    let mut out = io::stdout().lock();
                    out.write_all(&[byte])?;
                    out.flush()?;
                }
                _ => {
                    vm.tapes.open_tape(device)?.write_all(&[byte])?;
                }
            }
            Ok(())
        }
        HAL_MEM => {
            vm.registers[DATA_REGISTER] = vm.memory.len() as u64 & vm.width().mask();
            Ok(())
        }
        code => Err(VmError::InvalidHalCode { code }),
    }
}

fn to_signed(vm: &Vm, value: u64) -> i64 {
    let width = vm.width();
    if value & width.sign_bit() != 0 {
        (value | !width.mask()) as i64
    } else {
        value as i64
    }
}

fn read_one<R: Read>(reader: &mut R) -> Result<Option<u8>, VmError> {
    let mut buf = [0u8; 1];
    match reader.read(&mut buf) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(buf[0])),
        Err(err) => Err(err.into()),
    }
}

// Seek-capable wrappers so File halves satisfy the Tape trait bounds
// with the unused direction rejected at runtime by the OS.
struct ReadOnlyTape(File);

impl Read for ReadOnlyTape {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}
impl Write for ReadOnlyTape {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "tape opened for reading",
        ))
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
impl Seek for ReadOnlyTape {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

struct WriteOnlyTape(File);

impl Read for WriteOnlyTape {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "tape opened for writing",
        ))
    }
}
impl Write for WriteOnlyTape {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
impl Seek for WriteOnlyTape {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::RegisterWidth;
    use std::io::Cursor;

    fn hal_vm(code: u32) -> Vm {
        let raw = [
            0x42,
            (code >> 16) as u8,
            (code >> 8) as u8,
            code as u8,
            0xFF,
            0x00,
            0x00,
            0x00,
        ];
        let mut vm = Vm::new(RegisterWidth::W32, 64);
        vm.load_rom(&raw);
        vm
    }

    #[test]
    fn fgetc_reads_tape_bytes_then_eof() {
        let mut vm = hal_vm(HAL_FGETC);
        vm.tapes
            .mount(DEVICE_TAPE_1, Box::new(Cursor::new(vec![0x41])));
        vm.registers[DEVICE_REGISTER] = DEVICE_TAPE_1;
        vm.step().unwrap();
        assert_eq!(vm.registers[DATA_REGISTER], 0x41);

        vm.ip = 0;
        vm.step().unwrap();
        assert_eq!(vm.registers[DATA_REGISTER], 0xFFFF_FFFF);
    }

    #[test]
    fn fputc_writes_low_byte() {
        let mut vm = hal_vm(HAL_FPUTC);
        vm.tapes
            .mount(DEVICE_TAPE_2, Box::new(Cursor::new(Vec::new())));
        vm.registers[DEVICE_REGISTER] = DEVICE_TAPE_2;
        vm.registers[DATA_REGISTER] = 0x1_4A;
        vm.run().unwrap();
        let mut tape = vm.tapes.unmount(DEVICE_TAPE_2).unwrap();
        let mut written = Vec::new();
        tape.seek(SeekFrom::Start(0)).unwrap();
        tape.read_to_end(&mut written).unwrap();
        assert_eq!(written, vec![0x4A]);
    }

    #[test]
    fn rewind_returns_to_start() {
        let mut vm = hal_vm(HAL_FGETC);
        vm.tapes
            .mount(DEVICE_TAPE_1, Box::new(Cursor::new(vec![0x07, 0x08])));
        vm.registers[DEVICE_REGISTER] = DEVICE_TAPE_1;
        vm.step().unwrap();
        assert_eq!(vm.registers[DATA_REGISTER], 0x07);

        let mut vm2 = hal_vm(HAL_REWIND);
        vm2.tapes = std::mem::take(&mut vm.tapes);
        vm2.registers[FILE_DEVICE_REGISTER] = DEVICE_TAPE_1;
        vm2.step().unwrap();
        let mut tape = vm2.tapes.unmount(DEVICE_TAPE_1).unwrap();
        assert_eq!(tape.stream_position().unwrap(), 0);
    }

    #[test]
    fn fseek_moves_backward_on_a_negative_offset() {
        let mut vm = hal_vm(HAL_FGETC);
        vm.tapes
            .mount(DEVICE_TAPE_1, Box::new(Cursor::new(vec![0x5A, 0x5B])));
        vm.registers[DEVICE_REGISTER] = DEVICE_TAPE_1;
        vm.step().unwrap();
        assert_eq!(vm.registers[DATA_REGISTER], 0x5A);

        // Offset register holds -1 in the 32-bit two's-complement view.
        let mut vm2 = hal_vm(HAL_FSEEK);
        vm2.tapes = std::mem::take(&mut vm.tapes);
        vm2.registers[FILE_DEVICE_REGISTER] = DEVICE_TAPE_1;
        vm2.registers[SEEK_OFFSET_REGISTER] = 0xFFFF_FFFF;
        vm2.step().unwrap();
        let mut tape = vm2.tapes.unmount(DEVICE_TAPE_1).unwrap();
        assert_eq!(tape.stream_position().unwrap(), 0);
    }

    #[test]
    fn fopen_read_on_a_missing_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut vm = hal_vm(HAL_FOPEN_READ);
        vm.tapes
            .set_tape_paths(Some(dir.path().join("absent_tape")), None);
        vm.registers[FILE_DEVICE_REGISTER] = DEVICE_TAPE_1;
        let err = vm.run().unwrap_err();
        assert!(matches!(err, VmError::Io(_)));
        assert!(vm.halted);
    }

    #[test]
    fn mem_code_reports_world_size() {
        let mut vm = hal_vm(HAL_MEM);
        vm.run().unwrap();
        assert_eq!(vm.registers[DATA_REGISTER], 64);
    }

    #[test]
    fn unknown_code_is_fatal() {
        let mut vm = hal_vm(0x123456);
        let err = vm.run().unwrap_err();
        assert!(matches!(err, VmError::InvalidHalCode { code: 0x123456 }));
        assert!(vm.halted);
    }

    #[test]
    fn unknown_device_is_fatal() {
        let mut vm = hal_vm(HAL_FGETC);
        vm.registers[DEVICE_REGISTER] = 0x9999;
        let err = vm.run().unwrap_err();
        assert!(matches!(err, VmError::InvalidDevice { device: 0x9999 }));
    }
}
