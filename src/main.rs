//! Kernel entry point. A bootloader hands control here already in 64-bit
//! long mode with a valid stack (see `SPEC_FULL.md` §6) — everything below
//! `_start` is in scope; everything that gets us to `_start` is not.
//!
//! The `#[panic_handler]` lives in `lib.rs`, not here: this binary links the
//! `myos` library and that's the only panic lang item in the final image.

#![no_std]
#![no_main]

/// Single entry point a bootloader jumps to. Never returns: bring-up hands
/// off to the shell's read-execute loop, which itself only exits through
/// `poweroff`/`reboot`.
#[no_mangle]
pub extern "C" fn _start() -> ! {
    myos::init();
    myos::shell::run();
}
