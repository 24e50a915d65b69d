//! IDT installation, 8259 PIC remap, and exception/IRQ dispatch.
//!
//! Gate descriptors are built with `x86_64::structures::idt::
//! InterruptDescriptorTable` rather than hand-packed `GateDescriptor` bytes;
//! the table itself lives in a `lazy_static!` the same way the rest of the
//! kernel's one-time-initialized globals do.

use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::instructions::port::Port;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};

use crate::gdt;

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;
const ICW1_INIT: u8 = 0x10;
const ICW1_ICW4: u8 = 0x01;
const ICW4_8086: u8 = 0x01;
const PIC_EOI: u8 = 0x20;

/// Vector offset IRQ0 is remapped to, clear of the CPU exception range.
pub const IRQ_BASE: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = IRQ_BASE,
    Keyboard = IRQ_BASE + 1,
}

static EXCEPTION_MESSAGES: [&str; 32] = [
    "Divide-by-zero",
    "Debug",
    "Non-maskable interrupt",
    "Breakpoint",
    "Overflow",
    "Bound range exceeded",
    "Invalid opcode",
    "Device not available",
    "Double fault",
    "Coprocessor segment overrun",
    "Invalid TSS",
    "Segment not present",
    "Stack fault",
    "General protection fault",
    "Page fault",
    "Reserved",
    "x87 FPU error",
    "Alignment check",
    "Machine check",
    "SIMD floating point",
    "Virtualization",
    "Security",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
];

/// Prints an exception report and halts. Leaf function by design: no
/// allocation, no lock beyond the terminal's own, never re-enters the
/// shell or line editor.
fn report_exception(vector: u8, error_code: u64, frame: &InterruptStackFrame) -> ! {
    crate::println!();
    crate::print!("\x1b[91m");
    let message = EXCEPTION_MESSAGES
        .get(vector as usize)
        .copied()
        .unwrap_or("Unknown");
    crate::println!("[exception] {} (vector 0x{:X})", message, vector);
    crate::print!("\x1b[37m");
    crate::println!("error code: 0x{:X}", error_code);
    crate::println!("{:#?}", frame);
    crate::serial_println!(
        "[exception] {} (vector 0x{:X}, error 0x{:X})",
        message,
        vector,
        error_code
    );
    loop {
        x86_64::instructions::interrupts::disable();
        x86_64::instructions::hlt();
    }
}

macro_rules! define_exception_noerr {
    ($name:ident, $vector:expr) => {
        extern "x86-interrupt" fn $name(frame: InterruptStackFrame) {
            report_exception($vector, 0, &frame);
        }
    };
}

macro_rules! define_exception_err {
    ($name:ident, $vector:expr) => {
        extern "x86-interrupt" fn $name(frame: InterruptStackFrame, error_code: u64) {
            report_exception($vector, error_code, &frame);
        }
    };
}

define_exception_noerr!(divide_error_handler, 0);
define_exception_noerr!(debug_handler, 1);
define_exception_noerr!(nmi_handler, 2);

extern "x86-interrupt" fn breakpoint_handler(frame: InterruptStackFrame) {
    crate::println!("[breakpoint] {:#?}", frame);
}

define_exception_noerr!(overflow_handler, 4);
define_exception_noerr!(bound_range_handler, 5);
define_exception_noerr!(invalid_opcode_handler, 6);
define_exception_noerr!(device_not_available_handler, 7);

extern "x86-interrupt" fn double_fault_handler(frame: InterruptStackFrame, error_code: u64) -> ! {
    report_exception(8, error_code, &frame);
}

define_exception_noerr!(coprocessor_segment_overrun_handler, 9);
define_exception_err!(invalid_tss_handler, 10);
define_exception_err!(segment_not_present_handler, 11);
define_exception_err!(stack_fault_handler, 12);
define_exception_err!(general_protection_fault_handler, 13);

extern "x86-interrupt" fn page_fault_handler(
    frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    report_exception(14, error_code.bits(), &frame);
}

define_exception_noerr!(x87_fpu_handler, 16);
define_exception_err!(alignment_check_handler, 17);
define_exception_noerr!(machine_check_handler, 18);
define_exception_noerr!(simd_fpu_handler, 19);
define_exception_noerr!(virtualization_handler, 20);
define_exception_noerr!(security_exception_handler, 21);

extern "x86-interrupt" fn timer_interrupt_handler(_frame: InterruptStackFrame) {
    crate::pit::handle_tick();
    send_eoi(InterruptIndex::Timer as u8);
}

extern "x86-interrupt" fn keyboard_interrupt_handler(_frame: InterruptStackFrame) {
    let mut port: Port<u8> = Port::new(0x60);
    let scancode: u8 = unsafe { port.read() };
    crate::keyboard::handle_scancode(scancode);
    send_eoi(InterruptIndex::Keyboard as u8);
}

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.divide_error.set_handler_fn(divide_error_handler);
        idt.debug.set_handler_fn(debug_handler);
        idt.non_maskable_interrupt.set_handler_fn(nmi_handler);
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        idt.overflow.set_handler_fn(overflow_handler);
        idt.bound_range_exceeded.set_handler_fn(bound_range_handler);
        idt.invalid_opcode.set_handler_fn(invalid_opcode_handler);
        idt.device_not_available
            .set_handler_fn(device_not_available_handler);
        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt.invalid_tss.set_handler_fn(invalid_tss_handler);
        idt.segment_not_present
            .set_handler_fn(segment_not_present_handler);
        idt.stack_segment_fault.set_handler_fn(stack_fault_handler);
        idt.general_protection_fault
            .set_handler_fn(general_protection_fault_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.x87_floating_point.set_handler_fn(x87_fpu_handler);
        idt.alignment_check.set_handler_fn(alignment_check_handler);
        idt.machine_check.set_handler_fn(machine_check_handler);
        idt.simd_floating_point.set_handler_fn(simd_fpu_handler);
        idt.virtualization.set_handler_fn(virtualization_handler);
        idt.security_exception
            .set_handler_fn(security_exception_handler);

        idt[InterruptIndex::Timer as usize].set_handler_fn(timer_interrupt_handler);
        idt[InterruptIndex::Keyboard as usize].set_handler_fn(keyboard_interrupt_handler);
        idt
    };
}

struct PicMasks {
    master: u8,
    slave: u8,
}

static PIC_MASKS: Mutex<PicMasks> = Mutex::new(PicMasks {
    master: 0xFC, // unmask IRQ0 (timer) and IRQ1 (keyboard) only
    slave: 0xFF,
});

fn io_wait() {
    let mut port: Port<u8> = Port::new(0x80);
    unsafe { port.write(0u8) };
}

/// Reprograms the 8259 pair so IRQ0..15 land on vectors 0x20..0x2F instead
/// of colliding with the CPU exception range.
fn remap_pic() {
    let mut pic1_cmd: Port<u8> = Port::new(PIC1_COMMAND);
    let mut pic1_data: Port<u8> = Port::new(PIC1_DATA);
    let mut pic2_cmd: Port<u8> = Port::new(PIC2_COMMAND);
    let mut pic2_data: Port<u8> = Port::new(PIC2_DATA);

    unsafe {
        pic1_cmd.write(ICW1_INIT | ICW1_ICW4);
        io_wait();
        pic2_cmd.write(ICW1_INIT | ICW1_ICW4);
        io_wait();
        pic1_data.write(IRQ_BASE);
        io_wait();
        pic2_data.write(IRQ_BASE + 8);
        io_wait();
        pic1_data.write(4u8);
        io_wait();
        pic2_data.write(2u8);
        io_wait();
        pic1_data.write(ICW4_8086);
        io_wait();
        pic2_data.write(ICW4_8086);
        io_wait();

        let masks = PIC_MASKS.lock();
        pic1_data.write(masks.master);
        pic2_data.write(masks.slave);
    }
}

fn send_eoi(irq_vector: u8) {
    let mut pic1_cmd: Port<u8> = Port::new(PIC1_COMMAND);
    let mut pic2_cmd: Port<u8> = Port::new(PIC2_COMMAND);
    let irq = irq_vector - IRQ_BASE;
    unsafe {
        if irq >= 8 {
            pic2_cmd.write(PIC_EOI);
        }
        pic1_cmd.write(PIC_EOI);
    }
}

pub fn init() {
    IDT.load();
    remap_pic();
}

pub fn enable() {
    x86_64::instructions::interrupts::enable();
}

pub fn disable() {
    x86_64::instructions::interrupts::disable();
}

pub fn without_interrupts<F: FnOnce() -> R, R>(f: F) -> R {
    x86_64::instructions::interrupts::without_interrupts(f)
}
