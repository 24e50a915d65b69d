//! VGA text-mode terminal: an 80x25 character framebuffer at `0xB8000`
//! driven through a small ANSI CSI parser (SGR, cursor motion, erase, and
//! cursor visibility). Writes go through [`Writer`], a `Mutex`-guarded
//! `core::fmt::Write` implementation, and the [`print!`]/[`println!`]
//! macros layered on top of it.

use core::fmt;
use spin::Mutex;
use volatile::Volatile;
use x86_64::instructions::port::Port;

const VGA_WIDTH: usize = 80;
const VGA_HEIGHT: usize = 25;
const VGA_ADDRESS: usize = 0xB8000;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGrey = 7,
    DarkGrey = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    LightMagenta = 13,
    LightBrown = 14,
    White = 15,
}

impl Color {
    fn from_nibble(n: u8) -> Color {
        match n & 0x0F {
            0 => Color::Black,
            1 => Color::Blue,
            2 => Color::Green,
            3 => Color::Cyan,
            4 => Color::Red,
            5 => Color::Magenta,
            6 => Color::Brown,
            7 => Color::LightGrey,
            8 => Color::DarkGrey,
            9 => Color::LightBlue,
            10 => Color::LightGreen,
            11 => Color::LightCyan,
            12 => Color::LightRed,
            13 => Color::LightMagenta,
            14 => Color::LightBrown,
            _ => Color::White,
        }
    }

    fn bright(self) -> Color {
        Color::from_nibble(self as u8 + 8)
    }

    fn from_ansi_base(base: i32, bright: bool) -> Color {
        let color = Color::from_nibble((base % 10) as u8);
        if bright && (color as u8) < 8 {
            color.bright()
        } else {
            color
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct ColorCode(u8);

impl ColorCode {
    fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode((background as u8) << 4 | (foreground as u8))
    }

    fn foreground(self) -> Color {
        Color::from_nibble(self.0)
    }

    fn background(self) -> Color {
        Color::from_nibble(self.0 >> 4)
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
struct ScreenChar {
    ascii_character: u8,
    color_code: ColorCode,
}

#[repr(transparent)]
struct Buffer {
    chars: [[Volatile<ScreenChar>; VGA_WIDTH]; VGA_HEIGHT],
}

pub struct Writer {
    row: usize,
    column: usize,
    color_code: ColorCode,
    default_color_code: ColorCode,
    bold: bool,
    cursor_visible: bool,
    buffer: &'static mut Buffer,
    ansi: AnsiParser,
}

/// Parser state for an in-progress `ESC [ ... <cmd>` sequence, carried
/// across successive `write_str` calls so a sequence split at a buffer
/// boundary still decodes correctly.
#[derive(PartialEq, Eq, Clone, Copy)]
enum AnsiStage {
    Idle,
    SawEsc,
    InParams,
}

struct AnsiParser {
    stage: AnsiStage,
    params: [i32; 16],
    param_count: usize,
    current: i32,
    has_digit: bool,
    private_prefix: bool,
}

impl AnsiParser {
    const fn new() -> AnsiParser {
        AnsiParser {
            stage: AnsiStage::Idle,
            params: [0; 16],
            param_count: 0,
            current: 0,
            has_digit: false,
            private_prefix: false,
        }
    }

    fn reset(&mut self) {
        self.stage = AnsiStage::Idle;
        self.params = [0; 16];
        self.param_count = 0;
        self.current = 0;
        self.has_digit = false;
        self.private_prefix = false;
    }

    fn param(&self, index: usize) -> i32 {
        self.params.get(index).copied().unwrap_or(0)
    }
}

impl Writer {
    fn make_vga(c: u8, color: ColorCode) -> ScreenChar {
        ScreenChar {
            ascii_character: c,
            color_code: color,
        }
    }

    fn update_cursor(&self) {
        let position = (self.row * VGA_WIDTH + self.column) as u16;
        let mut index_port: Port<u8> = Port::new(0x3D4);
        let mut data_port: Port<u8> = Port::new(0x3D5);
        unsafe {
            index_port.write(0x0Fu8);
            data_port.write((position & 0xFF) as u8);
            index_port.write(0x0Eu8);
            data_port.write(((position >> 8) & 0xFF) as u8);
        }
    }

    fn fill_row(&mut self, row: usize, color: ColorCode) {
        let blank = Writer::make_vga(b' ', color);
        for col in 0..VGA_WIDTH {
            self.buffer.chars[row][col].write(blank);
        }
    }

    pub fn clear(&mut self) {
        for row in 0..VGA_HEIGHT {
            self.fill_row(row, self.color_code);
        }
        self.row = 0;
        self.column = 0;
        self.update_cursor();
    }

    pub fn set_color(&mut self, fg: Color, bg: Color) {
        self.color_code = ColorCode::new(fg, bg);
        self.default_color_code = self.color_code;
        self.bold = false;
    }

    fn scroll(&mut self) {
        for row in 1..VGA_HEIGHT {
            for col in 0..VGA_WIDTH {
                let c = self.buffer.chars[row][col].read();
                self.buffer.chars[row - 1][col].write(c);
            }
        }
        self.fill_row(VGA_HEIGHT - 1, self.color_code);
        self.row = VGA_HEIGHT - 1;
        self.column = 0;
        self.update_cursor();
    }

    fn newline(&mut self) {
        self.column = 0;
        self.row += 1;
        if self.row >= VGA_HEIGHT {
            self.scroll();
        } else {
            self.update_cursor();
        }
    }

    fn clear_line_from_cursor(&mut self) {
        let color = self.color_code;
        for col in self.column..VGA_WIDTH {
            self.buffer.chars[self.row][col].write(Writer::make_vga(b' ', color));
        }
    }

    fn clear_line_to_cursor(&mut self) {
        let color = self.color_code;
        for col in 0..=self.column {
            self.buffer.chars[self.row][col].write(Writer::make_vga(b' ', color));
        }
    }

    fn clear_entire_line(&mut self) {
        self.fill_row(self.row, self.color_code);
    }

    pub fn set_cursor(&mut self, row: usize, column: usize) {
        self.row = row.min(VGA_HEIGHT - 1);
        self.column = column.min(VGA_WIDTH - 1);
        self.update_cursor();
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.column)
    }

    fn apply_sgr(&mut self, code: i32) {
        match code {
            0 => {
                self.color_code = self.default_color_code;
                self.bold = false;
            }
            1 => {
                self.bold = true;
                let fg = self.color_code.foreground();
                let bg = self.color_code.background();
                let fg = if (fg as u8) < 8 { fg.bright() } else { fg };
                self.color_code = ColorCode::new(fg, bg);
            }
            3 | 4 => {}
            7 => {
                let fg = self.color_code.foreground();
                let bg = self.color_code.background();
                self.color_code = ColorCode::new(bg, fg);
            }
            30..=37 => {
                let mut fg = Color::from_ansi_base(code, false);
                let bg = self.color_code.background();
                if self.bold && (fg as u8) < 8 {
                    fg = fg.bright();
                }
                self.color_code = ColorCode::new(fg, bg);
            }
            40..=47 => {
                let fg = self.color_code.foreground();
                let bg = Color::from_ansi_base(code - 10, false);
                self.color_code = ColorCode::new(fg, bg);
            }
            90..=97 => {
                let fg = Color::from_ansi_base(code, true);
                let bg = self.color_code.background();
                self.color_code = ColorCode::new(fg, bg);
            }
            100..=107 => {
                let fg = self.color_code.foreground();
                let bg = Color::from_ansi_base(code - 10, true);
                self.color_code = ColorCode::new(fg, bg);
            }
            _ => {}
        }
    }

    fn run_csi_command(&mut self, command: char) {
        if self.ansi.private_prefix {
            // only `?25l` / `?25h` are recognized, matched loosely on the
            // command byte since the digits were already consumed as params
            if command == 'l' {
                self.cursor_visible = false;
            } else if command == 'h' {
                self.cursor_visible = true;
            }
            return;
        }

        match command {
            'm' => {
                let params = self.ansi.params;
                let count = self.ansi.param_count.max(1);
                for i in 0..count {
                    self.apply_sgr(params[i]);
                }
            }
            'A' => {
                let n = if self.ansi.param(0) != 0 { self.ansi.param(0) as usize } else { 1 };
                self.row = self.row.saturating_sub(n);
                self.update_cursor();
            }
            'B' => {
                let n = if self.ansi.param(0) != 0 { self.ansi.param(0) as usize } else { 1 };
                self.row = (self.row + n).min(VGA_HEIGHT - 1);
                self.update_cursor();
            }
            'C' => {
                let n = if self.ansi.param(0) != 0 { self.ansi.param(0) as usize } else { 1 };
                self.column = (self.column + n).min(VGA_WIDTH - 1);
                self.update_cursor();
            }
            'D' => {
                let n = if self.ansi.param(0) != 0 { self.ansi.param(0) as usize } else { 1 };
                self.column = self.column.saturating_sub(n);
                self.update_cursor();
            }
            'H' | 'f' => {
                let row = if self.ansi.param(0) != 0 { self.ansi.param(0) } else { 1 };
                let col = if self.ansi.param(1) != 0 { self.ansi.param(1) } else { 1 };
                if row > 0 && col > 0 {
                    self.set_cursor((row - 1) as usize, (col - 1) as usize);
                }
            }
            'J' => match self.ansi.param(0) {
                0 => {
                    self.clear_line_from_cursor();
                    for r in (self.row + 1)..VGA_HEIGHT {
                        self.fill_row(r, self.color_code);
                    }
                }
                1 => {
                    self.clear_line_to_cursor();
                    for r in 0..self.row {
                        self.fill_row(r, self.color_code);
                    }
                }
                2 => self.clear(),
                _ => {}
            },
            'K' => match self.ansi.param(0) {
                0 => self.clear_line_from_cursor(),
                1 => self.clear_line_to_cursor(),
                2 => self.clear_entire_line(),
                _ => {}
            },
            _ => {}
        }
    }

    fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.newline(),
            0x08 => {
                if self.column > 0 {
                    self.column -= 1;
                } else if self.row > 0 {
                    self.row -= 1;
                    self.column = VGA_WIDTH - 1;
                }
                let color = self.color_code;
                self.buffer.chars[self.row][self.column].write(Writer::make_vga(b' ', color));
                self.update_cursor();
            }
            byte => {
                let color = self.color_code;
                self.buffer.chars[self.row][self.column].write(Writer::make_vga(byte, color));
                self.column += 1;
                if self.column >= VGA_WIDTH {
                    self.newline();
                } else {
                    self.update_cursor();
                }
            }
        }
    }

    /// Feeds one byte through the CSI state machine. Sequences that never
    /// find `ESC [` (e.g. a lone `ESC` not followed by `[`) fall back to
    /// being written out as ordinary characters, matching the original
    /// parser's "not a recognized sequence" bailout.
    fn feed(&mut self, byte: u8) {
        match self.ansi.stage {
            AnsiStage::Idle => {
                if byte == 0x1B {
                    self.ansi.reset();
                    self.ansi.stage = AnsiStage::SawEsc;
                } else {
                    self.write_byte(byte);
                }
            }
            AnsiStage::SawEsc => {
                if byte == b'[' {
                    self.ansi.stage = AnsiStage::InParams;
                } else {
                    self.ansi.reset();
                    self.write_byte(0x1B);
                    self.write_byte(byte);
                }
            }
            AnsiStage::InParams => {
                let c = byte as char;
                if c == '?' && self.ansi.param_count == 0 && !self.ansi.has_digit {
                    self.ansi.private_prefix = true;
                    return;
                }
                if c.is_ascii_digit() {
                    self.ansi.current = self.ansi.current * 10 + (c as i32 - '0' as i32);
                    self.ansi.has_digit = true;
                    return;
                }
                if c == ';' {
                    if self.ansi.param_count < 16 {
                        self.ansi.params[self.ansi.param_count] = self.ansi.current;
                        self.ansi.param_count += 1;
                    }
                    self.ansi.current = 0;
                    self.ansi.has_digit = false;
                    return;
                }
                if self.ansi.has_digit && self.ansi.param_count < 16 {
                    self.ansi.params[self.ansi.param_count] = self.ansi.current;
                    self.ansi.param_count += 1;
                }
                self.run_csi_command(c);
                self.ansi.reset();
            }
        }
    }
}

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | 0x08 | 0x1B => self.feed(byte),
                _ if self.ansi.stage != AnsiStage::Idle => self.feed(byte),
                _ => self.feed(b' '),
            }
        }
        Ok(())
    }
}

lazy_static::lazy_static! {
    pub static ref WRITER: Mutex<Writer> = Mutex::new(Writer {
        row: 0,
        column: 0,
        color_code: ColorCode::new(Color::LightGrey, Color::Black),
        default_color_code: ColorCode::new(Color::LightGrey, Color::Black),
        bold: false,
        cursor_visible: true,
        buffer: unsafe { &mut *(VGA_ADDRESS as *mut Buffer) },
        ansi: AnsiParser::new(),
    });
}

pub fn init() {
    WRITER.lock().clear();
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    use x86_64::instructions::interrupts;

    interrupts::without_interrupts(|| {
        WRITER.lock().write_fmt(args).unwrap();
    });
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::vga_buffer::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => ($crate::println!("[ INFO ] {}", format_args!($($arg)*)));
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ($crate::println!("[ WARN ] {}", format_args!($($arg)*)));
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => ($crate::println!("[ ERROR ] {}", format_args!($($arg)*)));
}

#[macro_export]
macro_rules! ok {
    ($($arg:tt)*) => ($crate::println!("[  OK  ] {}", format_args!($($arg)*)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_code_packs_fg_and_bg() {
        let code = ColorCode::new(Color::White, Color::Blue);
        assert_eq!(code.foreground(), Color::White);
        assert_eq!(code.background(), Color::Blue);
    }

    #[test]
    fn ansi_base_color_bright_variant() {
        assert_eq!(Color::from_ansi_base(31, false), Color::Red);
        assert_eq!(Color::from_ansi_base(31, true), Color::LightRed);
    }

    #[test]
    fn ansi_base_color_already_bright_is_unchanged() {
        assert_eq!(Color::from_ansi_base(90, true), Color::DarkGrey);
    }
}
