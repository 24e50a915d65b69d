//! ATA PIO driver for the primary channel, master drive only.
//!
//! No DMA, no secondary channel, no slave drive — the spec this mirrors
//! explicitly scopes this to a single legacy PIO device, which keeps the
//! whole driver a straightforward register-poll state machine.

use core::fmt;
use spin::Mutex;
use x86_64::instructions::port::Port;

const IO_BASE: u16 = 0x1F0;
const CTRL_BASE: u16 = 0x3F6;

const REG_DATA: u16 = IO_BASE;
const REG_ERROR: u16 = IO_BASE + 1;
const REG_SECCOUNT0: u16 = IO_BASE + 2;
const REG_LBA0: u16 = IO_BASE + 3;
const REG_LBA1: u16 = IO_BASE + 4;
const REG_LBA2: u16 = IO_BASE + 5;
const REG_HDDEVSEL: u16 = IO_BASE + 6;
const REG_COMMAND: u16 = IO_BASE + 7;
const REG_STATUS: u16 = IO_BASE + 7;

const CMD_READ_PIO: u8 = 0x20;
const CMD_WRITE_PIO: u8 = 0x30;
const CMD_CACHE_FLUSH: u8 = 0xE7;
const CMD_IDENTIFY: u8 = 0xEC;

const SR_ERR: u8 = 0x01;
const SR_DRQ: u8 = 0x08;
const SR_DF: u8 = 0x20;
const SR_BSY: u8 = 0x80;

const TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaError {
    NotPresent,
    InvalidArgument,
    Timeout,
    DeviceError,
}

impl fmt::Display for AtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AtaError::NotPresent => "no ATA device present",
            AtaError::InvalidArgument => "invalid argument",
            AtaError::Timeout => "operation timed out",
            AtaError::DeviceError => "device reported an error",
        };
        f.write_str(msg)
    }
}

/// Identity information extracted from the IDENTIFY response.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub model: [u8; 41],
    pub serial: [u8; 21],
    pub firmware: [u8; 9],
    pub total_sectors: u64,
}

impl DeviceInfo {
    fn empty() -> Self {
        DeviceInfo {
            model: [0; 41],
            serial: [0; 21],
            firmware: [0; 9],
            total_sectors: 0,
        }
    }

    pub fn model_str(&self) -> &str {
        cstr(&self.model)
    }

    pub fn serial_str(&self) -> &str {
        cstr(&self.serial)
    }

    pub fn firmware_str(&self) -> &str {
        cstr(&self.firmware)
    }
}

fn cstr(buf: &[u8]) -> &str {
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    core::str::from_utf8(&buf[..len]).unwrap_or("")
}

struct AtaState {
    present: bool,
    info: DeviceInfo,
}

static STATE: Mutex<AtaState> = Mutex::new(AtaState {
    present: false,
    info: DeviceInfo {
        model: [0; 41],
        serial: [0; 21],
        firmware: [0; 9],
        total_sectors: 0,
    },
});

fn elapsed_ms(start: u64) -> u64 {
    crate::pit::millis().saturating_sub(start)
}

fn wait_busy_clear() -> Result<(), AtaError> {
    let start = crate::pit::millis();
    let mut status_port: Port<u8> = Port::new(REG_STATUS);
    loop {
        let status = unsafe { status_port.read() };
        if status & SR_BSY == 0 {
            if status & (SR_ERR | SR_DF) != 0 {
                return Err(AtaError::DeviceError);
            }
            return Ok(());
        }
        if elapsed_ms(start) > TIMEOUT_MS {
            return Err(AtaError::Timeout);
        }
    }
}

fn wait_drq() -> Result<(), AtaError> {
    let start = crate::pit::millis();
    let mut status_port: Port<u8> = Port::new(REG_STATUS);
    loop {
        let status = unsafe { status_port.read() };
        if status & (SR_ERR | SR_DF) != 0 {
            return Err(AtaError::DeviceError);
        }
        if status & SR_DRQ != 0 {
            return Ok(());
        }
        if elapsed_ms(start) > TIMEOUT_MS {
            return Err(AtaError::Timeout);
        }
    }
}

fn select_drive(lba: u32) {
    let mut port: Port<u8> = Port::new(REG_HDDEVSEL);
    unsafe { port.write(0xE0 | (((lba >> 24) & 0x0F) as u8)) };
}

/// Trims trailing spaces from an ATA identify string, writing a NUL
/// terminator. The word-swap itself already happened once, when the words
/// were unpacked high-byte-first into `buf`; swapping again here would undo
/// it.
fn fixup_ata_string(buf: &mut [u8]) {
    let mut end = buf.len();
    while end > 0 && (buf[end - 1] == b' ' || buf[end - 1] == 0) {
        end -= 1;
    }
    if end < buf.len() {
        buf[end] = 0;
    }
}

/// Probes the primary channel's master drive with IDENTIFY. Leaves
/// `present = false` on anything but a clean ATA response.
pub fn init() {
    let mut state = STATE.lock();
    state.present = false;
    state.info = DeviceInfo::empty();

    let mut ctrl: Port<u8> = Port::new(CTRL_BASE);
    let mut seccount: Port<u8> = Port::new(REG_SECCOUNT0);
    let mut lba0: Port<u8> = Port::new(REG_LBA0);
    let mut lba1: Port<u8> = Port::new(REG_LBA1);
    let mut lba2: Port<u8> = Port::new(REG_LBA2);
    let mut command: Port<u8> = Port::new(REG_COMMAND);
    let mut status_port: Port<u8> = Port::new(REG_STATUS);

    unsafe {
        ctrl.write(0u8);
    }
    select_drive(0);
    unsafe {
        seccount.write(0u8);
        lba0.write(0u8);
        lba1.write(0u8);
        lba2.write(0u8);
        command.write(CMD_IDENTIFY);
    }

    let mut status = unsafe { status_port.read() };
    if status == 0 {
        return;
    }

    let start = crate::pit::millis();
    while status & SR_BSY != 0 {
        status = unsafe { status_port.read() };
        if elapsed_ms(start) > TIMEOUT_MS {
            return;
        }
    }

    let l1 = unsafe { lba1.read() };
    let l2 = unsafe { lba2.read() };
    if l1 != 0 || l2 != 0 {
        return;
    }

    let start = crate::pit::millis();
    while status & SR_DRQ == 0 && status & SR_ERR == 0 {
        status = unsafe { status_port.read() };
        if elapsed_ms(start) > TIMEOUT_MS {
            return;
        }
    }
    if status & SR_ERR != 0 {
        return;
    }

    let mut buffer = [0u16; 256];
    let mut data: Port<u16> = Port::new(REG_DATA);
    for word in buffer.iter_mut() {
        *word = unsafe { data.read() };
    }

    let mut info = DeviceInfo::empty();
    for (i, word) in buffer[27..47].iter().enumerate() {
        info.model[i * 2] = (word >> 8) as u8;
        info.model[i * 2 + 1] = (word & 0xFF) as u8;
    }
    fixup_ata_string(&mut info.model[..40]);

    for (i, word) in buffer[10..20].iter().enumerate() {
        info.serial[i * 2] = (word >> 8) as u8;
        info.serial[i * 2 + 1] = (word & 0xFF) as u8;
    }
    fixup_ata_string(&mut info.serial[..20]);

    for (i, word) in buffer[23..27].iter().enumerate() {
        info.firmware[i * 2] = (word >> 8) as u8;
        info.firmware[i * 2 + 1] = (word & 0xFF) as u8;
    }
    fixup_ata_string(&mut info.firmware[..8]);

    if buffer[83] & 0x400 != 0 {
        info.total_sectors = (buffer[100] as u64)
            | ((buffer[101] as u64) << 16)
            | ((buffer[102] as u64) << 32)
            | ((buffer[103] as u64) << 48);
    } else {
        info.total_sectors = (buffer[60] as u64) | ((buffer[61] as u64) << 16);
    }

    state.info = info;
    state.present = true;
}

pub fn is_available() -> bool {
    STATE.lock().present
}

pub fn device_info() -> Option<DeviceInfo> {
    let state = STATE.lock();
    if state.present {
        Some(state.info.clone())
    } else {
        None
    }
}

fn transfer(lba: u32, sector_count: u16, buffer: &mut [u8], write: bool) -> Result<(), AtaError> {
    if !STATE.lock().present || sector_count == 0 {
        return Err(AtaError::NotPresent);
    }
    if buffer.len() < sector_count as usize * 512 {
        return Err(AtaError::InvalidArgument);
    }

    let mut remaining = sector_count as u32;
    let mut lba = lba;
    let mut offset = 0usize;

    let mut seccount_port: Port<u8> = Port::new(REG_SECCOUNT0);
    let mut lba0_port: Port<u8> = Port::new(REG_LBA0);
    let mut lba1_port: Port<u8> = Port::new(REG_LBA1);
    let mut lba2_port: Port<u8> = Port::new(REG_LBA2);
    let mut command_port: Port<u8> = Port::new(REG_COMMAND);
    let mut data_port: Port<u16> = Port::new(REG_DATA);

    while remaining > 0 {
        let chunk = if remaining > 256 { 256 } else { remaining };
        let sector_value = if chunk == 256 { 0 } else { chunk as u8 };

        select_drive(lba);
        unsafe {
            seccount_port.write(sector_value);
            lba0_port.write((lba & 0xFF) as u8);
            lba1_port.write(((lba >> 8) & 0xFF) as u8);
            lba2_port.write(((lba >> 16) & 0xFF) as u8);
            command_port.write(if write { CMD_WRITE_PIO } else { CMD_READ_PIO });
        }

        for _ in 0..chunk {
            wait_busy_clear()?;
            wait_drq()?;
            for w in 0..256 {
                if write {
                    let lo = buffer[offset + w * 2] as u16;
                    let hi = buffer[offset + w * 2 + 1] as u16;
                    unsafe { data_port.write(lo | (hi << 8)) };
                } else {
                    let word = unsafe { data_port.read() };
                    buffer[offset + w * 2] = (word & 0xFF) as u8;
                    buffer[offset + w * 2 + 1] = (word >> 8) as u8;
                }
            }
            offset += 512;
        }

        if write {
            unsafe { command_port.write(CMD_CACHE_FLUSH) };
            let _ = wait_busy_clear();
        }

        lba += chunk;
        remaining -= chunk;
    }

    Ok(())
}

pub fn read_sectors(lba: u32, sector_count: u16, buffer: &mut [u8]) -> Result<(), AtaError> {
    transfer(lba, sector_count, buffer, false)
}

pub fn write_sectors(lba: u32, sector_count: u16, buffer: &mut [u8]) -> Result<(), AtaError> {
    transfer(lba, sector_count, buffer, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixup_trims_trailing_spaces() {
        let mut buf = *b"AB  ";
        fixup_ata_string(&mut buf);
        assert_eq!(&buf[..2], b"AB");
        assert_eq!(buf[2], 0);
    }

    #[test]
    fn cstr_stops_at_first_nul() {
        let mut buf = [0u8; 8];
        buf[..5].copy_from_slice(b"toast");
        assert_eq!(cstr(&buf), "toast");
    }
}
