//! PS/2 scancode decoder and the ISR-to-task ring buffer it feeds.
//!
//! The decoder is a small state machine (shift/ctrl latches plus an
//! `0xE0`-prefix flag) that turns raw AT scancodes into a 16-bit code
//! stream: codes below 256 are literal bytes, codes at or above
//! [`SPECIAL_BASE`] name a non-printable key. The ring buffer itself is a
//! [`crossbeam_queue::ArrayQueue`], the same SPSC-safe structure the
//! original kernel's async keyboard task used, repurposed here for the
//! synchronous cooperative shell loop.

use crossbeam_queue::ArrayQueue;
use lazy_static::lazy_static;
use spin::Mutex;

pub const SPECIAL_BASE: u16 = 0x100;
pub const KEY_UP: u16 = 0x100;
pub const KEY_DOWN: u16 = 0x101;
pub const KEY_LEFT: u16 = 0x102;
pub const KEY_RIGHT: u16 = 0x103;
pub const KEY_TAB: u16 = 0x104;
pub const KEY_CTRL_R: u16 = 0x105;

const RING_CAPACITY: usize = 128;

const KEYMAP_LOWER: [u8; 90] = [
    0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 8, b'\t', b'q',
    b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, b'a', b's', b'd',
    b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v', b'b',
    b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, b'7',
    b'8', b'9', b'-', b'4', b'5', b'6', b'+', b'1', b'2', b'3', b'0', b'.',
];

const KEYMAP_UPPER: [u8; 90] = [
    0, 27, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 8, b'\t', b'Q',
    b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0, b'A', b'S', b'D',
    b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|', b'Z', b'X', b'C', b'V', b'B',
    b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, b'7',
    b'8', b'9', b'-', b'4', b'5', b'6', b'+', b'1', b'2', b'3', b'0', b'.',
];

lazy_static! {
    static ref RING: ArrayQueue<u16> = ArrayQueue::new(RING_CAPACITY);
}

/// Latched modifier/prefix state. Only ever touched from IRQ1 context, so
/// it needs no synchronization beyond being a single owner.
struct DecoderState {
    shift: bool,
    ctrl: bool,
    e0_pending: bool,
}

static STATE: Mutex<DecoderState> = Mutex::new(DecoderState {
    shift: false,
    ctrl: false,
    e0_pending: false,
});

/// Decodes one raw scancode and, if it produces a key, pushes it onto the
/// ring buffer. Called only from the IRQ1 handler; performs no allocation
/// and takes no lock that a task-context consumer could also be holding.
pub fn handle_scancode(scancode: u8) {
    let mut state = STATE.lock();

    if scancode == 0xE0 {
        state.e0_pending = true;
        return;
    }

    match scancode {
        0x2A | 0x36 => {
            state.shift = true;
            return;
        }
        0xAA | 0xB6 => {
            state.shift = false;
            return;
        }
        0x1D => {
            state.ctrl = true;
            return;
        }
        0x9D => {
            state.ctrl = false;
            return;
        }
        _ => {}
    }

    if scancode & 0x80 != 0 {
        state.e0_pending = false;
        return;
    }

    if state.e0_pending {
        state.e0_pending = false;
        let code = match scancode {
            0x48 => Some(KEY_UP),
            0x50 => Some(KEY_DOWN),
            0x4B => Some(KEY_LEFT),
            0x4D => Some(KEY_RIGHT),
            _ => None,
        };
        if let Some(code) = code {
            let _ = RING.push(code);
        }
        return;
    }

    if scancode == 0x0F {
        let _ = RING.push(KEY_TAB);
        return;
    }

    if state.ctrl && scancode == 0x13 {
        let _ = RING.push(KEY_CTRL_R);
        return;
    }

    let c = if (scancode as usize) < KEYMAP_LOWER.len() {
        if state.shift {
            KEYMAP_UPPER[scancode as usize]
        } else {
            KEYMAP_LOWER[scancode as usize]
        }
    } else {
        0
    };

    if c != 0 {
        let _ = RING.push(c as u16);
    }
}

/// Blocks (via `hlt`) until a code is available, then returns it.
pub fn read_code() -> u16 {
    loop {
        if let Some(code) = RING.pop() {
            return code;
        }
        x86_64::instructions::hlt();
    }
}

/// Non-blocking poll; returns `None` when the ring is empty.
pub fn try_read_code() -> Option<u16> {
    RING.pop()
}

pub fn init() {
    while RING.pop().is_some() {}
    let mut state = STATE.lock();
    state.shift = false;
    state.ctrl = false;
    state.e0_pending = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset() {
        init();
    }

    #[test]
    fn lowercase_letter_roundtrip() {
        reset();
        handle_scancode(0x1E); // 'a'
        assert_eq!(try_read_code(), Some(b'a' as u16));
    }

    #[test]
    fn shift_produces_uppercase() {
        reset();
        handle_scancode(0x2A); // left shift down
        handle_scancode(0x1E);
        assert_eq!(try_read_code(), Some(b'A' as u16));
        handle_scancode(0xAA); // left shift up
        handle_scancode(0x1E);
        assert_eq!(try_read_code(), Some(b'a' as u16));
    }

    #[test]
    fn key_release_is_ignored() {
        reset();
        handle_scancode(0x1E | 0x80);
        assert_eq!(try_read_code(), None);
    }

    #[test]
    fn e0_prefixed_arrow_keys() {
        reset();
        handle_scancode(0xE0);
        handle_scancode(0x48);
        assert_eq!(try_read_code(), Some(KEY_UP));
        handle_scancode(0xE0);
        handle_scancode(0x50);
        assert_eq!(try_read_code(), Some(KEY_DOWN));
    }

    #[test]
    fn ctrl_r_emits_reverse_search_code() {
        reset();
        handle_scancode(0x1D); // ctrl down
        handle_scancode(0x13); // 'r'
        assert_eq!(try_read_code(), Some(KEY_CTRL_R));
    }

    #[test]
    fn tab_emits_special_code() {
        reset();
        handle_scancode(0x0F);
        assert_eq!(try_read_code(), Some(KEY_TAB));
    }

    #[test]
    fn ring_overflow_drops_new_codes() {
        reset();
        for _ in 0..(RING_CAPACITY + 10) {
            handle_scancode(0x1E);
        }
        let mut count = 0;
        while try_read_code().is_some() {
            count += 1;
        }
        assert_eq!(count, RING_CAPACITY);
    }
}
