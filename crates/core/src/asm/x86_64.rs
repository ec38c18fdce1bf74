//! Assembler for x86-64, in NASM's Intel syntax.

use std::fmt;

use crate::asm::{asm, AssemblyText, Label};
use crate::codegen::{Direction, TargetAssembly, OUT_OF_BOUNDS_MESSAGE};
use crate::target::TargetProfile;

/// Reference to a 64-bit register
#[derive(Clone, Copy)]
pub struct R64(pub &'static str);

/// Reference to the low 32-bits of a register
#[derive(Clone, Copy)]
pub struct R32(pub &'static str);

// REGISTERS:
//
// r12  (callee saved) - base address of the tape
const TAPE: R64 = R64("r12");
// r13d (callee saved) - index of the current cell; writes zero the top half of r13
const INDEX: R32 = R32("r13d");
const INDEX_64: R64 = R64("r13");
// r14d (callee saved) - how many more times write_cell should write
const COUNT: R32 = R32("r14d");
//
// eax, edi, rsi, edx  - system call number and arguments (rcx and r11 are clobbered)
const SYSCALL_NO: R32 = R32("eax");
const ARG0: R32 = R32("edi");
const ARG1: R64 = R64("rsi");
const ARG2: R32 = R32("edx");
const RESULT: R64 = R64("rax");

/// Condition codes used by `jcc`.
#[derive(Clone, Copy)]
pub enum Cond {
    Equal,
    NotEqual,
    AboveOrEqual,
}

/// Generates x86-64 assembly text for one [TargetProfile].
pub struct X86_64Assembly {
    text: AssemblyText,
    profile: &'static TargetProfile,
}

impl X86_64Assembly {
    pub fn new(profile: &'static TargetProfile) -> Self {
        X86_64Assembly {
            text: AssemblyText::new(";"),
            profile,
        }
    }

    // Instructions ///////////////////////////////////////////////////////////////////////////////

    pub fn lea_symbol(&mut self, rd: R64, symbol: &str) {
        // rip-relative thanks to `default rel`
        asm!(self.text, "lea {}, [{}]", rd, symbol);
    }

    pub fn lea_cell(&mut self, rd: R64) {
        asm!(self.text, "lea {}, [{} + {}]", rd, TAPE, INDEX_64);
    }

    pub fn xor32(&mut self, rd: R32, rs: R32) {
        asm!(self.text, "xor {}, {}", rd, rs);
    }

    pub fn mov32_imm(&mut self, rd: R32, imm: u32) {
        asm!(self.text, "mov {}, {:#x}", rd, imm);
    }

    pub fn add32_imm(&mut self, rd: R32, imm: u32) {
        asm!(self.text, "add {}, {:#x}", rd, imm);
    }

    pub fn sub32_imm(&mut self, rd: R32, imm: u32) {
        asm!(self.text, "sub {}, {:#x}", rd, imm);
    }

    pub fn cmp32_imm(&mut self, rd: R32, imm: u32) {
        asm!(self.text, "cmp {}, {:#x}", rd, imm);
    }

    pub fn cmp64_imm(&mut self, rd: R64, imm: i32) {
        asm!(self.text, "cmp {}, {}", rd, imm);
    }

    pub fn dec32(&mut self, rd: R32) {
        asm!(self.text, "dec {}", rd);
    }

    /// `<op> byte [tape + index], imm8`
    fn cell_op(&mut self, mnemonic: &str, imm: u8) {
        asm!(self.text, "{} byte [{} + {}], {:#x}", mnemonic, TAPE, INDEX_64, imm);
    }

    pub fn jcc(&mut self, cond: Cond, target: impl fmt::Display) {
        asm!(self.text, "{} {}", cond, target);
    }

    pub fn call(&mut self, symbol: &str) {
        asm!(self.text, "call {}", symbol);
    }

    pub fn ret(&mut self) {
        asm!(self.text, "ret");
    }

    pub fn syscall(&mut self) {
        asm!(self.text, "syscall");
    }

    // Runtime support ////////////////////////////////////////////////////////////////////////////

    /// `write(fd, buffer, length)`; the buffer address must already be in rsi.
    fn sys_write(&mut self, fd: u32, length: &str) {
        self.mov32_imm(SYSCALL_NO, self.profile.syscalls.write);
        self.mov32_imm(ARG0, fd);
        asm!(self.text, "mov {}, {}", ARG2, length);
        self.syscall();
    }

    fn sys_exit(&mut self, status: u32) {
        self.mov32_imm(SYSCALL_NO, self.profile.syscalls.exit);
        self.mov32_imm(ARG0, status);
        self.syscall();
    }
}

impl TargetAssembly for X86_64Assembly {
    fn prologue(&mut self, tape_len: u32) {
        self.text
            .comment(&format!("generated by brainfold for {}", self.profile));
        asm!(self.text, "bits 64");
        asm!(self.text, "default rel");
        self.text.blank_line();

        asm!(self.text, "section .bss");
        asm!(self.text, "alignb 16");
        self.text.symbol("tape");
        asm!(self.text, "resb {}", tape_len);
        self.text.blank_line();

        asm!(self.text, "section .data");
        self.text.symbol("oob_msg");
        asm!(self.text, "db \"{}\", 10", OUT_OF_BOUNDS_MESSAGE);
        asm!(self.text, "oob_len equ $ - oob_msg");
        self.text.blank_line();

        asm!(self.text, "section .text");
        asm!(self.text, "global _start");
        self.text.symbol("_start");
        self.lea_symbol(TAPE, "tape");
        self.xor32(INDEX, INDEX);
    }

    fn move_pointer(&mut self, direction: Direction, amount: u32, tape_len: u32) {
        match direction {
            Direction::Forward => self.add32_imm(INDEX, amount),
            Direction::Backward => self.sub32_imm(INDEX, amount),
        }
        // unsigned: an index that wrapped below zero is huge
        self.cmp32_imm(INDEX, tape_len);
        self.jcc(Cond::AboveOrEqual, "tape_out_of_bounds");
    }

    fn change_cell(&mut self, direction: Direction, amount: u8) {
        match direction {
            Direction::Forward => self.cell_op("add", amount),
            Direction::Backward => self.cell_op("sub", amount),
        }
    }

    fn output(&mut self, amount: u32) {
        self.mov32_imm(COUNT, amount);
        self.call("write_cell");
    }

    fn input(&mut self) {
        self.call("read_cell");
    }

    fn branch_if_zero(&mut self, label: Label) {
        self.cell_op("cmp", 0);
        self.jcc(Cond::Equal, label);
    }

    fn branch_if_nonzero(&mut self, label: Label) {
        self.cell_op("cmp", 0);
        self.jcc(Cond::NotEqual, label);
    }

    fn define_label(&mut self, label: Label) {
        self.text.symbol(label);
    }

    fn epilogue(&mut self) {
        self.sys_exit(0);
    }

    fn runtime_support(&mut self) {
        // write_cell: writes the current cell r14d times (r14d > 0)
        self.text.blank_line();
        self.text.symbol("write_cell");
        self.text.symbol(".again");
        self.lea_cell(ARG1);
        self.sys_write(1, "1");
        self.dec32(COUNT);
        self.jcc(Cond::NotEqual, ".again");
        self.ret();

        // read_cell: reads one byte into the current cell, or -1 at end of input
        self.text.blank_line();
        self.text.symbol("read_cell");
        self.lea_cell(ARG1);
        self.mov32_imm(SYSCALL_NO, self.profile.syscalls.read);
        self.xor32(ARG0, ARG0);
        self.mov32_imm(ARG2, 1);
        self.syscall();
        self.cmp64_imm(RESULT, 1);
        self.jcc(Cond::Equal, ".done");
        self.cell_op("mov", 0xff);
        self.text.symbol(".done");
        self.ret();

        self.text.blank_line();
        self.text.symbol("tape_out_of_bounds");
        self.lea_symbol(ARG1, "oob_msg");
        self.sys_write(2, "oob_len");
        self.sys_exit(1);
    }

    fn into_text(self) -> String {
        self.text.into_string()
    }
}

impl fmt::Display for R64 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for R32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mnemonic = match self {
            Cond::Equal => "je",
            Cond::NotEqual => "jne",
            Cond::AboveOrEqual => "jae",
        };
        write!(f, "{}", mnemonic)
    }
}
