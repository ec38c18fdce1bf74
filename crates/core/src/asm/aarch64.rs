//! Assembler for ARM AArch64, in GNU `as` syntax.

use std::fmt;

use crate::asm::{asm, AssemblyText, Label};
use crate::codegen::{Direction, TargetAssembly, OUT_OF_BOUNDS_MESSAGE};
use crate::target::TargetProfile;

/// Reference to 64-bit register
#[derive(Clone, Copy)]
pub struct X(pub u8);

/// Reference to low 32-bits of the register
#[derive(Clone, Copy)]
pub struct W(pub u8);

// REGISTERS:
//
// w9                 - working byte / scratch constant
const VAL: W = W(9);
// x19 (callee saved) - base address of the tape
const TAPE: X = X(19);
// w20 (callee saved) - index of the current cell
const INDEX: W = W(20);
// w21 (callee saved) - how many more times write_cell should write
const COUNT: W = W(21);
// w22 (callee saved) - length of the tape
const LIMIT: W = W(22);
//
// x0..x2             - system call arguments (x0 is also the result)
// x8                 - system call number
const SYSCALL_NO: X = X(8);
// see: https://en.wikipedia.org/wiki/Calling_convention#ARM_(A64)

/// Condition codes used by `b.cond`.
#[derive(Clone, Copy)]
pub enum Cond {
    Equal,
    NotEqual,
    HigherOrSame,
}

/// Generates ARM AArch64 assembly text for one [TargetProfile].
pub struct AArch64Assembly {
    text: AssemblyText,
    profile: &'static TargetProfile,
}

impl AArch64Assembly {
    pub fn new(profile: &'static TargetProfile) -> Self {
        AArch64Assembly {
            text: AssemblyText::new("//"),
            profile,
        }
    }

    // Instructions
    //
    // Roughly in the order given by Chapter C3 - A64 Instruction Set Encoding

    // Branch, exception generation, and system instructions //////////////////////////////////////

    /// Compare register and Branch if Zero
    pub fn cbz(&mut self, rt: W, label: Label) {
        asm!(self.text, "cbz {}, {}", rt, label);
    }

    /// Compare register and Branch if Not Zero
    pub fn cbnz(&mut self, rt: W, label: Label) {
        asm!(self.text, "cbnz {}, {}", rt, label);
    }

    /// Conditional branch
    pub fn b_cond(&mut self, cond: Cond, target: &str) {
        asm!(self.text, "b.{} {}", cond, target);
    }

    /// Branch and Link
    pub fn bl(&mut self, symbol: &str) {
        asm!(self.text, "bl {}", symbol);
    }

    /// ret (return from subroutine)
    pub fn ret(&mut self) {
        asm!(self.text, "ret");
    }

    /// Supervisor call: the kernel looks at x8 for the call number
    pub fn svc(&mut self) {
        asm!(self.text, "svc #0");
    }

    // Load and stores ////////////////////////////////////////////////////////////////////////////

    /// Load Register Byte (register offset, zero-extended 32-bit index)
    pub fn ldrb(&mut self, wt: W, xn: X, wm: W) {
        asm!(self.text, "ldrb {}, [{}, {}, uxtw]", wt, xn, wm);
    }

    /// Store Register Byte (register offset, zero-extended 32-bit index)
    pub fn strb(&mut self, wt: W, xn: X, wm: W) {
        asm!(self.text, "strb {}, [{}, {}, uxtw]", wt, xn, wm);
    }

    /// Address of a symbol, via its 4K page and the offset within it
    pub fn load_address(&mut self, xd: X, symbol: &str) {
        asm!(self.text, "adrp {}, {}", xd, symbol);
        asm!(self.text, "add {0}, {0}, :lo12:{1}", xd, symbol);
    }

    // Data processing -- immediate ///////////////////////////////////////////////////////////////

    pub fn add(&mut self, wd: W, wn: W, imm: u16) {
        asm!(self.text, "add {}, {}, #{}", wd, wn, imm);
    }

    /// Subract (immediate)
    pub fn sub(&mut self, wd: W, wn: W, imm: u16) {
        asm!(self.text, "sub {}, {}, #{}", wd, wn, imm);
    }

    /// Subtract (immediate), setting flags
    pub fn subs(&mut self, wd: W, wn: W, imm: u16) {
        asm!(self.text, "subs {}, {}, #{}", wd, wn, imm);
    }

    pub fn mov64_imm(&mut self, xd: X, imm: u16) {
        asm!(self.text, "mov {}, #{}", xd, imm);
    }

    pub fn cmp64_imm(&mut self, xn: X, imm: u16) {
        asm!(self.text, "cmp {}, #{}", xn, imm);
    }

    /// Materializes any 32-bit constant with a `movz`, plus a `movk` for the top half.
    pub fn mov_const(&mut self, wd: W, value: u32) {
        let low = value & 0xFFFF;
        let high = value >> 16;

        asm!(self.text, "movz {}, #{:#x}", wd, low);
        if high != 0 {
            asm!(self.text, "movk {}, #{:#x}, lsl #16", wd, high);
        }
    }

    pub fn mov_symbol(&mut self, xd: X, symbol: &str) {
        asm!(self.text, "mov {}, #{}", xd, symbol);
    }

    // Data processing -- register ////////////////////////////////////////////////////////////////

    pub fn add_reg(&mut self, wd: W, wn: W, wm: W) {
        asm!(self.text, "add {}, {}, {}", wd, wn, wm);
    }

    pub fn sub_reg(&mut self, wd: W, wn: W, wm: W) {
        asm!(self.text, "sub {}, {}, {}", wd, wn, wm);
    }

    /// Add a zero-extended 32-bit register to a 64-bit one
    pub fn add_uxtw(&mut self, xd: X, xn: X, wm: W) {
        asm!(self.text, "add {}, {}, {}, uxtw", xd, xn, wm);
    }

    pub fn cmp_reg(&mut self, wn: W, wm: W) {
        asm!(self.text, "cmp {}, {}", wn, wm);
    }

    // Runtime support ////////////////////////////////////////////////////////////////////////////

    fn syscall(&mut self, number: u32) {
        // every Linux system call number fits in 16 bits
        self.mov64_imm(SYSCALL_NO, number as u16);
        self.svc();
    }

    fn sys_exit(&mut self, status: u16) {
        self.mov64_imm(X(0), status);
        self.syscall(self.profile.syscalls.exit);
    }
}

impl TargetAssembly for AArch64Assembly {
    fn prologue(&mut self, tape_len: u32) {
        self.text
            .comment(&format!("generated by brainfold for {}", self.profile));
        asm!(self.text, ".bss");
        asm!(self.text, ".balign 16");
        self.text.symbol("tape");
        asm!(self.text, ".skip {}", tape_len);
        self.text.blank_line();

        asm!(self.text, ".section .rodata");
        self.text.symbol("oob_msg");
        asm!(self.text, ".ascii \"{}\\n\"", OUT_OF_BOUNDS_MESSAGE);
        asm!(self.text, ".equ oob_len, . - oob_msg");
        self.text.blank_line();

        asm!(self.text, ".text");
        asm!(self.text, ".global _start");
        self.text.symbol("_start");
        self.load_address(TAPE, "tape");
        self.mov_const(INDEX, 0);
        self.mov_const(LIMIT, tape_len);
    }

    fn move_pointer(&mut self, direction: Direction, amount: u32, _tape_len: u32) {
        self.mov_const(VAL, amount);
        match direction {
            Direction::Forward => self.add_reg(INDEX, INDEX, VAL),
            Direction::Backward => self.sub_reg(INDEX, INDEX, VAL),
        }
        // unsigned: an index that wrapped below zero is huge
        self.cmp_reg(INDEX, LIMIT);
        self.b_cond(Cond::HigherOrSame, "tape_out_of_bounds");
    }

    fn change_cell(&mut self, direction: Direction, amount: u8) {
        self.ldrb(VAL, TAPE, INDEX);
        match direction {
            Direction::Forward => self.add(VAL, VAL, amount as u16),
            Direction::Backward => self.sub(VAL, VAL, amount as u16),
        }
        self.strb(VAL, TAPE, INDEX);
    }

    fn output(&mut self, amount: u32) {
        self.mov_const(COUNT, amount);
        self.bl("write_cell");
    }

    fn input(&mut self) {
        self.bl("read_cell");
    }

    fn branch_if_zero(&mut self, label: Label) {
        self.ldrb(VAL, TAPE, INDEX);
        self.cbz(VAL, label);
    }

    fn branch_if_nonzero(&mut self, label: Label) {
        self.ldrb(VAL, TAPE, INDEX);
        self.cbnz(VAL, label);
    }

    fn define_label(&mut self, label: Label) {
        self.text.symbol(label);
    }

    fn epilogue(&mut self) {
        self.sys_exit(0);
    }

    fn runtime_support(&mut self) {
        // write_cell: writes the current cell w21 times (w21 > 0)
        self.text.blank_line();
        self.text.symbol("write_cell");
        self.text.symbol(".Lwrite_cell_again");
        self.mov64_imm(X(0), 1);
        self.add_uxtw(X(1), TAPE, INDEX);
        self.mov64_imm(X(2), 1);
        self.syscall(self.profile.syscalls.write);
        self.subs(COUNT, COUNT, 1);
        self.b_cond(Cond::NotEqual, ".Lwrite_cell_again");
        self.ret();

        // read_cell: reads one byte into the current cell, or -1 at end of input
        self.text.blank_line();
        self.text.symbol("read_cell");
        self.mov64_imm(X(0), 0);
        self.add_uxtw(X(1), TAPE, INDEX);
        self.mov64_imm(X(2), 1);
        self.syscall(self.profile.syscalls.read);
        self.cmp64_imm(X(0), 1);
        self.b_cond(Cond::Equal, ".Lread_cell_done");
        self.mov_const(VAL, 0xFF);
        self.strb(VAL, TAPE, INDEX);
        self.text.symbol(".Lread_cell_done");
        self.ret();

        self.text.blank_line();
        self.text.symbol("tape_out_of_bounds");
        self.mov64_imm(X(0), 2);
        self.load_address(X(1), "oob_msg");
        self.mov_symbol(X(2), "oob_len");
        self.syscall(self.profile.syscalls.write);
        self.sys_exit(1);
    }

    fn into_text(self) -> String {
        self.text.into_string()
    }
}

/////////////////////////////////// Traits and implementations ////////////////////////////////////

impl fmt::Display for W {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

impl fmt::Display for X {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let suffix = match self {
            Cond::Equal => "eq",
            Cond::NotEqual => "ne",
            Cond::HigherOrSame => "hs",
        };
        write!(f, "{}", suffix)
    }
}
