//! Interactive line-editing shell: prompt, command dispatch, history,
//! Tab completion, and a reverse-incremental (Ctrl+R) search, with a
//! periodic autosave of the filesystem to disk.
//!
//! The line editor tracks where the prompt started (`prompt_row`/
//! `prompt_col`) and how much of the line was drawn last time
//! (`rendered_length`), so every edit can be applied by repositioning the
//! cursor and rewriting only what changed — there's no scrollback buffer to
//! diff against, just the one row the cursor started on.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::fs::{self, FsError};
use crate::keyboard::{self, KEY_CTRL_R, KEY_DOWN, KEY_LEFT, KEY_RIGHT, KEY_UP};
use crate::{pit, sysctl, vga_buffer};

const BUFFER_CAPACITY: usize = 256;
const HISTORY_CAPACITY: usize = 50;
const AUTOCOMPLETE_MAX_MATCHES: usize = 32;
const AUTOSAVE_INTERVAL_SECONDS: u64 = 60;
const SCREEN_WIDTH: usize = 80;

const COMMANDS: &[&str] = &[
    "help", "clear", "uptime", "mem", "testmem", "history", "echo", "pwd", "ls", "cd", "touch",
    "cat", "write", "append", "mkdir", "rm", "savefs", "loadfs", "poweroff", "reboot",
];

static LAST_AUTOSAVE_SECONDS: AtomicU64 = AtomicU64::new(0);

struct History {
    entries: Vec<String>,
}

impl History {
    fn new() -> Self {
        History {
            entries: Vec::new(),
        }
    }

    fn push(&mut self, line: &str) {
        if self.entries.last().map(String::as_str) == Some(line) {
            return;
        }
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.remove(0);
        }
        self.entries.push(line.to_string());
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Index of the most recent entry containing `needle`, searching
    /// backward from the end.
    fn search_from_end(&self, needle: &str) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        self.entries.iter().rposition(|entry| entry.contains(needle))
    }
}

fn skip_spaces(s: &str) -> &str {
    s.trim_start_matches(' ')
}

/// Splits off the first whitespace-delimited token, returning it and the
/// (space-skipped) remainder.
fn extract_token(input: &str) -> (&str, &str) {
    let input = skip_spaces(input);
    match input.find(' ') {
        Some(idx) => (&input[..idx], skip_spaces(&input[idx + 1..])),
        None => (input, ""),
    }
}

/// Matches `line` against a bare `command`, accepting either an exact match
/// or `command` followed by a space, and returns whatever follows.
fn match_command<'a>(line: &'a str, command: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(command)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(' ').map(skip_spaces)
    }
}

fn collect_matches(prefix: &str) -> Vec<&'static str> {
    COMMANDS
        .iter()
        .copied()
        .filter(|candidate| candidate.starts_with(prefix))
        .take(AUTOCOMPLETE_MAX_MATCHES)
        .collect()
}

fn common_prefix_length(matches: &[&str]) -> usize {
    let Some(first) = matches.first() else {
        return 0;
    };
    let mut len = matches.iter().map(|m| m.len()).min().unwrap_or(0);
    let first = first.as_bytes();
    for pos in 0..len {
        let ch = first[pos];
        if matches.iter().any(|m| m.as_bytes()[pos] != ch) {
            len = pos;
            break;
        }
    }
    len
}

fn print_fs_error(err: FsError) {
    let msg = match err {
        FsError::NotFound => "Filesystem error: path not found.",
        FsError::AlreadyExists => "Filesystem error: already exists.",
        FsError::NotADirectory => "Filesystem error: not a directory.",
        FsError::IsADirectory => "Filesystem error: path is a directory.",
        FsError::NotEmpty => "Filesystem error: directory not empty.",
        FsError::InvalidArgument => "Filesystem error: invalid path.",
        FsError::OutOfMemory => "Filesystem error: out of memory.",
        FsError::HardwareError => "Filesystem error: disk I/O failure.",
    };
    println!("{}", msg);
}

fn print_prompt() {
    let path = fs::pwd();
    let display = if path == "/" {
        "~".to_string()
    } else {
        format!("~{}", &path[1..])
    };
    print!("\x1b[92mmyos \x1b[96m{} \x1b[92m> \x1b[37m", display);
}

fn position_after(prompt_row: usize, prompt_col: usize, n: usize) -> (usize, usize) {
    let total = prompt_col + n;
    (prompt_row + total / SCREEN_WIDTH, total % SCREEN_WIDTH)
}

fn set_cursor_for(prompt_row: usize, prompt_col: usize, n: usize) {
    let (row, col) = position_after(prompt_row, prompt_col, n);
    vga_buffer::WRITER.lock().set_cursor(row, col);
}

/// Redraws the line in place: rewrites the buffer from the prompt's start,
/// blanks out anything left over from a longer previous render, then moves
/// the cursor back to `cursor_pos`.
fn redraw(prompt_row: usize, prompt_col: usize, buffer: &[u8], cursor_pos: usize, rendered_length: &mut usize) {
    vga_buffer::WRITER.lock().set_cursor(prompt_row, prompt_col);
    if let Ok(text) = core::str::from_utf8(buffer) {
        print!("{}", text);
    }
    if *rendered_length > buffer.len() {
        for _ in 0..(*rendered_length - buffer.len()) {
            print!(" ");
        }
    }
    set_cursor_for(prompt_row, prompt_col, cursor_pos);
    *rendered_length = buffer.len();
}

fn maybe_autosave() -> bool {
    let now = pit::seconds();
    let last = LAST_AUTOSAVE_SECONDS.load(Ordering::Relaxed);
    if last == 0 || now < last {
        LAST_AUTOSAVE_SECONDS.store(now, Ordering::Relaxed);
        return false;
    }
    if !fs::persistence_available() {
        LAST_AUTOSAVE_SECONDS.store(now, Ordering::Relaxed);
        return false;
    }
    if now - last < AUTOSAVE_INTERVAL_SECONDS {
        return false;
    }
    LAST_AUTOSAVE_SECONDS.store(now, Ordering::Relaxed);
    match fs::save() {
        Ok(()) => println!("[autosave] Filesystem snapshot saved."),
        Err(e) => {
            print!("[autosave] ");
            print_fs_error(e);
        }
    }
    true
}

#[allow(clippy::too_many_arguments)]
fn handle_tab(
    buffer: &mut Vec<u8>,
    cursor_pos: &mut usize,
    prompt_row: &mut usize,
    prompt_col: &mut usize,
    rendered_length: &mut usize,
) {
    let mut word_start = *cursor_pos;
    while word_start > 0 && buffer[word_start - 1] != b' ' {
        word_start -= 1;
    }
    let word_len = *cursor_pos - word_start;
    if word_len == 0 {
        print!("\x07");
        return;
    }

    let prefix = match core::str::from_utf8(&buffer[word_start..*cursor_pos]) {
        Ok(p) => p,
        Err(_) => {
            print!("\x07");
            return;
        }
    };

    let matches = collect_matches(prefix);
    if matches.is_empty() {
        print!("\x07");
        return;
    }

    let common_len = common_prefix_length(&matches);
    if common_len > word_len {
        let addition = &matches[0][word_len..common_len];
        if buffer.len() + addition.len() < BUFFER_CAPACITY {
            for (i, b) in addition.bytes().enumerate() {
                buffer.insert(*cursor_pos + i, b);
            }
            *cursor_pos += addition.len();
            redraw(*prompt_row, *prompt_col, buffer, *cursor_pos, rendered_length);
        }
        return;
    }

    if matches.len() == 1 {
        if matches[0].len() == word_len && buffer.len() + 1 < BUFFER_CAPACITY {
            buffer.insert(*cursor_pos, b' ');
            *cursor_pos += 1;
            redraw(*prompt_row, *prompt_col, buffer, *cursor_pos, rendered_length);
        }
        return;
    }

    println!();
    for candidate in &matches {
        println!("  {}", candidate);
    }
    print_prompt();
    let (row, col) = vga_buffer::WRITER.lock().cursor();
    *prompt_row = row;
    *prompt_col = col;
    *rendered_length = 0;
    redraw(*prompt_row, *prompt_col, buffer, *cursor_pos, rendered_length);
}

fn read_line(history: &History) -> String {
    let mut buffer: Vec<u8> = Vec::new();
    let mut cursor_pos: usize = 0;
    let mut current_history = history.len();
    let mut rendered_length: usize = 0;
    let mut in_search = false;
    let mut search_buffer: Vec<u8> = Vec::new();

    let (mut prompt_row, mut prompt_col) = vga_buffer::WRITER.lock().cursor();

    loop {
        let code = loop {
            if let Some(code) = keyboard::try_read_code() {
                break code;
            }
            if maybe_autosave() {
                print_prompt();
                let (row, col) = vga_buffer::WRITER.lock().cursor();
                prompt_row = row;
                prompt_col = col;
                rendered_length = 0;
                redraw(prompt_row, prompt_col, &buffer, cursor_pos, &mut rendered_length);
            }
            x86_64::instructions::hlt();
        };

        if code < 256 {
            let mut byte = code as u8;

            if in_search {
                match byte {
                    0x08 => {
                        if search_buffer.pop().is_some() {
                            print!("\x08 \x08");
                        }
                    }
                    b'\n' | b'\r' => {
                        in_search = false;
                        println!();
                        print_prompt();
                        let (row, col) = vga_buffer::WRITER.lock().cursor();
                        prompt_row = row;
                        prompt_col = col;
                        rendered_length = 0;
                        if let Ok(needle) = core::str::from_utf8(&search_buffer) {
                            if let Some(index) = history.search_from_end(needle) {
                                current_history = index;
                                if let Some(entry) = history.get(index) {
                                    buffer = entry.as_bytes().to_vec();
                                    cursor_pos = buffer.len();
                                }
                            }
                        }
                        redraw(prompt_row, prompt_col, &buffer, cursor_pos, &mut rendered_length);
                    }
                    _ => {
                        if search_buffer.len() + 1 < BUFFER_CAPACITY {
                            search_buffer.push(byte);
                            print!("{}", byte as char);
                        }
                    }
                }
                continue;
            }

            if byte == b'\r' {
                byte = b'\n';
            }

            match byte {
                0x08 => {
                    if cursor_pos > 0 {
                        cursor_pos -= 1;
                        buffer.remove(cursor_pos);
                        redraw(prompt_row, prompt_col, &buffer, cursor_pos, &mut rendered_length);
                    }
                }
                b'\n' => {
                    println!();
                    return String::from_utf8(buffer).unwrap_or_default();
                }
                b'\t' => {
                    handle_tab(
                        &mut buffer,
                        &mut cursor_pos,
                        &mut prompt_row,
                        &mut prompt_col,
                        &mut rendered_length,
                    );
                }
                _ => {
                    if buffer.len() + 1 < BUFFER_CAPACITY {
                        buffer.insert(cursor_pos, byte);
                        cursor_pos += 1;
                        redraw(prompt_row, prompt_col, &buffer, cursor_pos, &mut rendered_length);
                    }
                }
            }
        } else {
            match code {
                KEY_UP => {
                    if current_history > 0 {
                        current_history -= 1;
                        if let Some(entry) = history.get(current_history) {
                            buffer = entry.as_bytes().to_vec();
                            cursor_pos = buffer.len();
                            redraw(prompt_row, prompt_col, &buffer, cursor_pos, &mut rendered_length);
                        }
                    }
                }
                KEY_DOWN => {
                    if current_history < history.len() {
                        current_history += 1;
                        if current_history < history.len() {
                            if let Some(entry) = history.get(current_history) {
                                buffer = entry.as_bytes().to_vec();
                                cursor_pos = buffer.len();
                            }
                        } else {
                            buffer.clear();
                            cursor_pos = 0;
                        }
                        redraw(prompt_row, prompt_col, &buffer, cursor_pos, &mut rendered_length);
                    }
                }
                KEY_LEFT => {
                    if cursor_pos > 0 {
                        cursor_pos -= 1;
                        set_cursor_for(prompt_row, prompt_col, cursor_pos);
                    }
                }
                KEY_RIGHT => {
                    if cursor_pos < buffer.len() {
                        cursor_pos += 1;
                        set_cursor_for(prompt_row, prompt_col, cursor_pos);
                    }
                }
                KEY_CTRL_R => {
                    in_search = true;
                    search_buffer.clear();
                    println!();
                    print!("(reverse-i-search)`': ");
                }
                _ => {}
            }
        }
    }
}

fn cmd_help() {
    println!("Commands:");
    println!("  help       - show this list");
    println!("  clear      - clear the screen");
    println!("  uptime     - show time since boot");
    println!("  mem        - show heap usage");
    println!("  testmem    - test memory allocator");
    println!("  history    - list recent commands");
    println!("  echo TEXT  - print TEXT");
    println!("  pwd        - show current directory");
    println!("  ls [PATH]  - list directory contents");
    println!("  cd PATH    - change directory");
    println!("  touch PATH - create/truncate a file");
    println!("  cat PATH   - print file contents");
    println!("  write PATH DATA  - overwrite file with DATA");
    println!("  append PATH DATA - append DATA to file");
    println!("  mkdir PATH - create directory");
    println!("  rm [-r] PATH - remove file or directory");
    println!("  savefs     - persist filesystem to disk");
    println!("  loadfs     - reload filesystem from disk");
    println!("  poweroff   - shut down the system");
    println!("  reboot     - restart the system");
    println!();
    println!("Shell features:");
    println!("  Up/Down    - navigate command history");
    println!("  Left/Right - move cursor in line");
    println!("  Tab        - autocomplete commands");
    println!("  Ctrl+R     - search history");
    println!("  Autosave   - snapshot every minute when disk is attached");
}

fn cmd_uptime() {
    let mut seconds = pit::seconds();
    const UNITS: [(u64, &str, &str); 4] = [
        (24 * 60 * 60, "day", "days"),
        (60 * 60, "hour", "hours"),
        (60, "min", "mins"),
        (1, "sec", "secs"),
    ];

    print!("Uptime: ");
    let mut printed = false;
    for (unit_seconds, singular, plural) in UNITS {
        if seconds >= unit_seconds {
            let value = seconds / unit_seconds;
            seconds %= unit_seconds;
            if printed {
                print!(", ");
            }
            print!("{} {}", value, if value == 1 { singular } else { plural });
            printed = true;
        }
    }
    if !printed {
        print!("0 secs");
    }
    println!();
}

fn cmd_mem() {
    let stats = crate::allocator::stats();
    let free = stats.heap_size.saturating_sub(stats.bytes_used);
    println!("Heap total: {} bytes", stats.heap_size);
    println!("Heap used:  {} bytes", stats.bytes_used);
    println!("Heap free:  {} bytes", free);
}

/// Exercises the global allocator through ordinary and aligned allocations
/// and reports whether everything it allocated was freed.
fn cmd_testmem() {
    use core::alloc::{GlobalAlloc, Layout};

    println!("Testing memory allocator...");
    let initial_used = crate::allocator::stats().bytes_used;
    println!("Initial memory used: {} bytes", initial_used);

    let mut v1: Vec<u8> = Vec::with_capacity(100);
    v1.resize(100, 0);
    println!("Test 1: Allocated 100 bytes - OK");
    println!("Memory used after alloc: {} bytes", crate::allocator::stats().bytes_used);

    let mut v2: Vec<u8> = Vec::with_capacity(200);
    v2.resize(200, 0);
    let mut v3: Vec<u8> = Vec::with_capacity(50);
    v3.resize(50, 0);
    println!("Test 2: Multiple allocations - OK");

    drop(v2);
    println!("Test 3: Free memory - OK");
    println!("Memory used after free: {} bytes", crate::allocator::stats().bytes_used);

    let layout = Layout::from_size_align(64, 16).expect("valid layout");
    let aligned_ptr = match crate::allocator::ALLOCATOR.alloc_aligned(64, 16) {
        Some(ptr) => ptr,
        None => {
            println!("ERROR: Aligned allocation failed!");
            return;
        }
    };
    if aligned_ptr.as_ptr() as usize & 0xF != 0 {
        println!("ERROR: Alignment incorrect!");
        unsafe { crate::allocator::ALLOCATOR.dealloc(aligned_ptr.as_ptr(), layout) };
        return;
    }
    println!("Test 4: Aligned allocation (16 bytes) - OK");
    unsafe { crate::allocator::ALLOCATOR.dealloc(aligned_ptr.as_ptr(), layout) };

    drop(v1);
    drop(v3);

    let final_used = crate::allocator::stats().bytes_used;
    println!("Final memory used: {} bytes", final_used);
    if final_used == initial_used {
        println!("All tests passed! Memory properly freed.");
    } else {
        println!(
            "WARNING: Memory leak detected! Expected {}, got {} bytes",
            initial_used, final_used
        );
    }
}

fn cmd_echo(args: &str) {
    println!("{}", args);
}

fn cmd_pwd() {
    println!("{}", fs::pwd());
}

fn cmd_ls(args: &str) {
    let path = skip_spaces(args);
    let path = if path.is_empty() { None } else { Some(path) };
    match fs::list_dir(path) {
        Ok(entries) => {
            for entry in entries {
                if entry.is_directory {
                    print!("[DIR] ");
                } else {
                    print!("      ");
                }
                print!("{}", entry.name);
                if !entry.is_directory {
                    print!("  {} bytes", entry.size);
                }
                println!();
            }
        }
        Err(FsError::NotFound) => println!("ls: path not found."),
        Err(FsError::NotADirectory) => println!("ls: not a directory."),
        Err(e) => print_fs_error(e),
    }
}

fn cmd_cd(args: &str) {
    let path = skip_spaces(args);
    let path = if path.is_empty() { "/" } else { path };
    if let Err(e) = fs::change_dir(path) {
        print_fs_error(e);
    }
}

fn cmd_touch(args: &str) {
    let path = skip_spaces(args);
    if path.is_empty() {
        println!("Usage: touch PATH");
        return;
    }
    if fs::is_dir(path) {
        println!("touch: cannot operate on a directory.");
        return;
    }
    let result = match fs::create_file(path) {
        Err(FsError::AlreadyExists) => fs::write_file(path, &[]),
        other => other,
    };
    if let Err(e) = result {
        print_fs_error(e);
    }
}

fn cmd_mkdir(args: &str) {
    let path = skip_spaces(args);
    if path.is_empty() {
        println!("Usage: mkdir PATH");
        return;
    }
    if let Err(e) = fs::mkdir(path) {
        print_fs_error(e);
    }
}

fn cmd_rm(args: &str) {
    let (mut token, mut rest) = extract_token(args);
    let mut recursive = false;
    if token == "-r" || token == "--recursive" {
        recursive = true;
        let (next_token, next_rest) = extract_token(rest);
        token = next_token;
        rest = next_rest;
    }
    let _ = rest;

    if token.is_empty() {
        println!("Usage: rm [-r] PATH");
        return;
    }
    if let Err(e) = fs::remove(token, recursive) {
        print_fs_error(e);
    }
}

fn cmd_savefs() {
    if !fs::persistence_available() {
        println!("Persistence unavailable: attach an ATA disk.");
        return;
    }
    match fs::save() {
        Ok(()) => println!("Filesystem snapshot saved to disk."),
        Err(e) => print_fs_error(e),
    }
}

fn cmd_loadfs() {
    if !fs::persistence_available() {
        println!("Persistence unavailable: attach an ATA disk.");
        return;
    }
    match fs::load() {
        Ok(()) => println!("Filesystem reloaded from disk."),
        Err(e) => print_fs_error(e),
    }
}

fn cmd_poweroff() -> ! {
    if fs::persistence_available() {
        println!("Tip: run 'savefs' to persist changes before shutdown.");
    }
    println!("Powering off...");
    sysctl::poweroff()
}

fn cmd_reboot() -> ! {
    println!("Rebooting...");
    sysctl::reboot()
}

fn cmd_cat(args: &str) {
    let path = skip_spaces(args);
    if path.is_empty() {
        println!("Usage: cat PATH");
        return;
    }
    if !fs::exists(path) {
        println!("cat: file not found.");
        return;
    }
    if fs::is_dir(path) {
        println!("cat: path is a directory.");
        return;
    }
    match fs::read_file(path) {
        Ok(data) => {
            print!("{}", String::from_utf8_lossy(&data));
            println!();
        }
        Err(_) => println!("cat: unable to read file."),
    }
}

fn cmd_writefile(args: &str, append: bool) {
    let command_name = if append { "append" } else { "write" };
    let (path, data) = extract_token(args);
    if path.is_empty() {
        println!("Usage: {} PATH DATA", command_name);
        return;
    }
    if fs::is_dir(path) {
        println!("{}: path is a directory.", command_name);
        return;
    }

    let bytes = data.as_bytes();
    let result = if append {
        match fs::append_file(path, bytes) {
            Err(FsError::NotFound) => match fs::create_file(path) {
                Ok(()) => fs::append_file(path, bytes),
                Err(e) => Err(e),
            },
            other => other,
        }
    } else {
        if !fs::exists(path) {
            match fs::create_file(path) {
                Ok(()) | Err(FsError::AlreadyExists) => {}
                Err(e) => {
                    print_fs_error(e);
                    return;
                }
            }
        }
        fs::write_file(path, bytes)
    };

    if let Err(e) = result {
        print_fs_error(e);
    }
}

fn cmd_history(history: &History) {
    if history.len() == 0 {
        println!("History is empty.");
        return;
    }
    println!("Command history:");
    for i in 0..history.len() {
        if let Some(entry) = history.get(i) {
            println!("  {}: {}", i + 1, entry);
        }
    }
}

fn execute(line: &str, history: &History) {
    if line.is_empty() {
        return;
    }

    match line {
        "help" => return cmd_help(),
        "clear" => {
            vga_buffer::WRITER.lock().clear();
            return;
        }
        "uptime" => return cmd_uptime(),
        "mem" => return cmd_mem(),
        "testmem" => return cmd_testmem(),
        "history" => return cmd_history(history),
        _ => {}
    }

    if let Some(args) = line.strip_prefix("echo ") {
        cmd_echo(args);
        return;
    }
    if line == "echo" {
        cmd_echo("");
        return;
    }

    if let Some(args) = match_command(line, "pwd") {
        let _ = args;
        cmd_pwd();
        return;
    }
    if let Some(args) = match_command(line, "ls") {
        cmd_ls(args);
        return;
    }
    if let Some(args) = match_command(line, "cd") {
        cmd_cd(args);
        return;
    }
    if let Some(args) = match_command(line, "touch") {
        cmd_touch(args);
        return;
    }
    if let Some(args) = match_command(line, "cat") {
        cmd_cat(args);
        return;
    }
    if let Some(args) = match_command(line, "write") {
        cmd_writefile(args, false);
        return;
    }
    if let Some(args) = match_command(line, "append") {
        cmd_writefile(args, true);
        return;
    }
    if let Some(args) = match_command(line, "mkdir") {
        cmd_mkdir(args);
        return;
    }
    if let Some(args) = match_command(line, "rm") {
        cmd_rm(args);
        return;
    }
    if match_command(line, "savefs").is_some() {
        cmd_savefs();
        return;
    }
    if match_command(line, "loadfs").is_some() {
        cmd_loadfs();
        return;
    }
    if match_command(line, "poweroff").is_some() {
        cmd_poweroff();
    }
    if match_command(line, "reboot").is_some() {
        cmd_reboot();
    }

    println!("Unknown command: {}", line);
    println!("Type 'help' for the list of commands.");
}

/// Runs the shell's read-execute loop. Never returns: the only ways out are
/// `poweroff`/`reboot`, which halt the machine instead of returning.
pub fn run() -> ! {
    println!();
    println!("Simple shell ready. Type 'help' to begin.");
    println!("Tip: Use arrow keys for history, Tab for completion, Ctrl+R for search.");

    let mut history = History::new();

    loop {
        maybe_autosave();
        print_prompt();
        let line = read_line(&history);
        if !line.is_empty() {
            history.push(&line);
            execute(&line, &history);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_token_splits_on_first_space() {
        assert_eq!(extract_token("foo bar baz"), ("foo", "bar baz"));
        assert_eq!(extract_token("  foo"), ("foo", ""));
        assert_eq!(extract_token(""), ("", ""));
    }

    #[test]
    fn match_command_requires_exact_or_space_boundary() {
        assert_eq!(match_command("ls", "ls"), Some(""));
        assert_eq!(match_command("ls /etc", "ls"), Some("/etc"));
        assert_eq!(match_command("lsfoo", "ls"), None);
    }

    #[test]
    fn common_prefix_length_handles_divergence() {
        let matches = std::vec!["touch", "testmem"];
        assert_eq!(common_prefix_length(&matches), 1);
        let matches = std::vec!["cat"];
        assert_eq!(common_prefix_length(&matches), 3);
    }

    #[test]
    fn history_deduplicates_consecutive_repeats() {
        let mut history = History::new();
        history.push("ls");
        history.push("ls");
        assert_eq!(history.len(), 1);
        history.push("pwd");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn history_evicts_oldest_when_full() {
        let mut history = History::new();
        for i in 0..HISTORY_CAPACITY + 5 {
            history.push(&std::format!("cmd{}", i));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.get(0), Some("cmd5"));
    }

    #[test]
    fn history_search_from_end_finds_most_recent_match() {
        let mut history = History::new();
        history.push("ls /etc");
        history.push("cat readme");
        history.push("ls /docs");
        assert_eq!(history.search_from_end("ls"), Some(2));
        assert_eq!(history.search_from_end("cat"), Some(1));
        assert_eq!(history.search_from_end("nope"), None);
    }

    #[test]
    fn collect_matches_filters_by_prefix() {
        let matches = collect_matches("l");
        assert_eq!(matches, std::vec!["ls"]);
        let matches = collect_matches("zz");
        assert!(matches.is_empty());
    }
}
