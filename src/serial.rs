//! UART 16550 serial port, used only as a redundant diagnostic channel.
//!
//! The exception pretty-printer and panic handler write through both
//! [`crate::vga_buffer`] and this module, so a developer running under QEMU
//! with `-serial stdio` gets a scroll-preserving trace even after the VGA
//! screen has stopped updating (the machine is halted by the time a human
//! would scroll back). Nothing else in the kernel depends on this module;
//! it is diagnostic-only, never read from.

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

const COM1_PORT: u16 = 0x3F8;

lazy_static! {
    pub static ref SERIAL1: Mutex<SerialPort> = {
        let mut serial_port = unsafe { SerialPort::new(COM1_PORT) };
        serial_port.init();
        Mutex::new(serial_port)
    };
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    use core::fmt::Write;
    use x86_64::instructions::interrupts;

    interrupts::without_interrupts(|| {
        SERIAL1
            .lock()
            .write_fmt(args)
            .expect("serial write failed");
    });
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => ($crate::serial::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}
