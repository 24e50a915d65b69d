//! Programmable Interval Timer (8254) channel 0 driver.
//!
//! Programmed once at boot into mode 3 (square wave) with a 16-bit divisor;
//! the timer ISR (`interrupts::irq_timer`) bumps the tick counter on every
//! fire. Everything else in the kernel that needs wall-clock-ish timing
//! (the ATA driver's 5 s timeout, the shell's 60 s autosave) derives it from
//! [`ticks`] and [`frequency`].

use core::sync::atomic::{AtomicU64, AtomicU32, Ordering};
use x86_64::instructions::port::Port;

const BASE_FREQUENCY: u32 = 1_193_182;
const COMMAND_PORT: u16 = 0x43;
const CHANNEL0_PORT: u16 = 0x40;

static FREQUENCY: AtomicU32 = AtomicU32::new(0);
static TICKS: AtomicU64 = AtomicU64::new(0);

/// Programs channel 0 to fire at `frequency_hz` (0 is treated as 100 Hz,
/// matching the original driver's fallback).
pub fn init(frequency_hz: u32) {
    let frequency_hz = if frequency_hz == 0 { 100 } else { frequency_hz };
    FREQUENCY.store(frequency_hz, Ordering::SeqCst);

    let divisor = (BASE_FREQUENCY / frequency_hz) as u16;

    let mut command: Port<u8> = Port::new(COMMAND_PORT);
    let mut channel0: Port<u8> = Port::new(CHANNEL0_PORT);
    unsafe {
        command.write(0x36u8); // channel 0, lobyte/hibyte, mode 3
        channel0.write((divisor & 0xFF) as u8);
        channel0.write(((divisor >> 8) & 0xFF) as u8);
    }

    crate::println!("[pit] configured to {} Hz", frequency_hz);
}

/// Called from the timer ISR only.
pub fn handle_tick() {
    TICKS.fetch_add(1, Ordering::SeqCst);
}

pub fn ticks() -> u64 {
    TICKS.load(Ordering::SeqCst)
}

pub fn frequency() -> u32 {
    FREQUENCY.load(Ordering::SeqCst)
}

/// Milliseconds elapsed since boot, or 0 if the PIT has not been
/// initialized yet (frequency of 0 would otherwise divide by zero).
pub fn millis() -> u64 {
    let freq = frequency();
    if freq == 0 {
        return 0;
    }
    ticks() * 1000 / freq as u64
}

pub fn seconds() -> u64 {
    let freq = frequency();
    if freq == 0 {
        return 0;
    }
    ticks() / freq as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_is_zero_before_init() {
        FREQUENCY.store(0, Ordering::SeqCst);
        assert_eq!(seconds(), 0);
        assert_eq!(millis(), 0);
    }

    #[test]
    fn ticks_accumulate() {
        TICKS.store(0, Ordering::SeqCst);
        FREQUENCY.store(100, Ordering::SeqCst);
        for _ in 0..250 {
            handle_tick();
        }
        assert_eq!(ticks(), 250);
        assert_eq!(seconds(), 2);
    }
}
