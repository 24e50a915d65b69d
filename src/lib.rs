//! Kernel library: every subsystem lives in its own module here, with
//! [`main.rs`](../src/main.rs) reduced to the bare `_start` entry point and
//! bring-up sequencing.
//!
//! Built `#![no_std]` outside of `cargo test`; under `cargo test` `std` is
//! available so the pure-logic modules' `#[cfg(test)]` suites can run as
//! ordinary host binaries instead of needing a `no_std` test runner or a
//! QEMU harness.

#![cfg_attr(not(test), no_std)]
#![allow(internal_features)]
#![feature(abi_x86_interrupt)]

extern crate alloc;
extern crate rlibc;

use core::panic::PanicInfo;

pub mod allocator;
pub mod ata;
pub mod fs;
pub mod gdt;
pub mod interrupts;
pub mod keyboard;
pub mod pit;
pub mod serial;
pub mod shell;
pub mod sysctl;
pub mod vga_buffer;

/// Brings up every subsystem in dependency order: the terminal first (so
/// later stages can log through it), then the heap, then the GDT/IDT and
/// their interrupt sources, and finally storage and the filesystem built on
/// top of it. Interrupts are left disabled until the PIC is remapped and
/// the keyboard's ring buffer exists, so no IRQ can land on an unready
/// handler.
pub fn init() {
    vga_buffer::init();
    ok!("terminal ready");

    allocator::init();
    ok!("heap initialized ({} bytes)", allocator::HEAP_SIZE);

    gdt::init();
    ok!("GDT/TSS loaded");

    interrupts::init();
    ok!("IDT loaded, PIC remapped");

    pit::init(0);
    ok!("PIT programmed at {} Hz", pit::frequency());

    keyboard::init();
    interrupts::enable();
    ok!("interrupts enabled");

    ata::init();
    if ata::is_available() {
        let info = ata::device_info().expect("present drive has device info");
        ok!("ATA drive detected: {}", info.model_str());
    } else {
        warn!("no ATA drive detected, filesystem persistence disabled");
    }

    fs::init();
    ok!("filesystem ready");
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    interrupts::disable();
    println!("\x1b[91m");
    println!("KERNEL PANIC: {}", info);
    serial_println!("KERNEL PANIC: {}", info);
    loop {
        x86_64::instructions::hlt();
    }
}
