//! Machine power control: halt, ACPI-free poweroff, and keyboard-controller
//! triggered reboot.
//!
//! None of these return, so every public function here has a `-> !`
//! signature and ends in [`halt`]. There is no ACPI shutdown path (see the
//! kernel's non-goals); poweroff relies on the QEMU/Bochs debug-exit ports,
//! which is the conventional way to power off a freestanding kernel under
//! emulation without implementing ACPI.

use x86_64::instructions::port::Port;

/// Disables interrupts and parks the core in an infinite `hlt` loop. Never
/// returns.
pub fn halt() -> ! {
    loop {
        crate::interrupts::disable();
        x86_64::instructions::hlt();
    }
}

/// Signals the QEMU/Bochs debug-exit device, then falls back to [`halt`] if
/// the caller isn't running under an emulator that implements it.
pub fn poweroff() -> ! {
    unsafe {
        let mut qemu_exit: Port<u16> = Port::new(0x604);
        qemu_exit.write(0x2000u16);
        let mut bochs_exit: Port<u16> = Port::new(0xB004);
        bochs_exit.write(0x2000u16);
    }
    halt()
}

/// Pulses the keyboard controller's reset line. Waits for the input buffer
/// to drain (bit 0x02 of the status register) before pulsing, since writing
/// while the controller is still processing a prior command is undefined.
pub fn reboot() -> ! {
    let mut status_port: Port<u8> = Port::new(0x64);
    let mut command_port: Port<u8> = Port::new(0x64);
    loop {
        let status = unsafe { status_port.read() };
        if status & 0x02 == 0 {
            break;
        }
    }
    unsafe {
        command_port.write(0xFEu8);
    }
    halt()
}
