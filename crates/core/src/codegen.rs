//! Generates assembly text for a given program.
//!
//! There is exactly one walk over the [InstructionStream]; everything that differs between
//! targets lives behind [TargetAssembly].

use std::collections::HashMap;
use std::num::NonZeroU32;

use crate::asm::aarch64::AArch64Assembly;
use crate::asm::x86_64::X86_64Assembly;
use crate::asm::Label;
use crate::ir::{Instruction, InstructionStream, StreamIndex};
use crate::target::{Arch, TargetProfile};

/// Printed (to stderr) by compiled programs whose pointer leaves the tape.
pub const OUT_OF_BOUNDS_MESSAGE: &str = "error: tape pointer out of bounds";

/// Which way an amount is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One fixed template per instruction kind, written in some instruction set.
pub trait TargetAssembly {
    /// Reserves the tape and sets up the tape base and index registers.
    fn prologue(&mut self, tape_len: u32);

    /// Moves the index, then bails out to the out-of-bounds routine if it left the tape.
    fn move_pointer(&mut self, direction: Direction, amount: u32, tape_len: u32);

    fn change_cell(&mut self, direction: Direction, amount: u8);

    /// Writes the current cell `amount` times (`amount > 0`).
    fn output(&mut self, amount: u32);

    fn input(&mut self);

    fn branch_if_zero(&mut self, label: Label);

    fn branch_if_nonzero(&mut self, label: Label);

    fn define_label(&mut self, label: Label);

    /// Exits successfully.
    fn epilogue(&mut self);

    /// The subroutines the body calls into.
    fn runtime_support(&mut self);

    fn into_text(self) -> String;
}

/// Takes an instruction stream and writes it out as assembly.
pub struct CodeGenerator<A: TargetAssembly> {
    asm: A,
    // Maps the index of a bracket to the label placed right after it
    labels: HashMap<StreamIndex, Label>,
}

/// Produces an assembly module for `profile` equivalent to interpreting `stream` on a tape of
/// `tape_len` cells.
pub fn emit_assembly(
    stream: &InstructionStream,
    profile: &'static TargetProfile,
    tape_len: NonZeroU32,
) -> String {
    let tape_len = tape_len.get();
    match profile.arch {
        Arch::X86_64 => CodeGenerator::new(X86_64Assembly::new(profile)).compile(stream, tape_len),
        Arch::AArch64 => {
            CodeGenerator::new(AArch64Assembly::new(profile)).compile(stream, tape_len)
        }
    }
}

impl<A: TargetAssembly> CodeGenerator<A> {
    pub fn new(asm: A) -> Self {
        CodeGenerator {
            asm,
            labels: HashMap::new(),
        }
    }

    pub fn compile(mut self, stream: &InstructionStream, tape_len: u32) -> String {
        self.asm.prologue(tape_len);

        for (i, &instr) in stream.iter().enumerate() {
            self.generate_instruction(StreamIndex(i as u32), instr, tape_len);
        }

        self.asm.epilogue();
        self.asm.runtime_support();

        self.asm.into_text()
    }

    fn generate_instruction(&mut self, index: StreamIndex, instr: Instruction, tape_len: u32) {
        use Direction::*;
        use Instruction::*;

        match instr {
            MovePointerForward(n) => self.asm.move_pointer(Forward, n, tape_len),
            MovePointerBackward(n) => self.asm.move_pointer(Backward, n, tape_len),
            // cells are bytes, so only the amount mod 256 matters
            IncrementCell(n) => self.asm.change_cell(Forward, n as u8),
            DecrementCell(n) => self.asm.change_cell(Backward, n as u8),
            Output(0) | Input(0) => (),
            Output(n) => self.asm.output(n),
            Input(_) => self.asm.input(),
            JumpIfZero(close) => {
                let past_close = self.label_for(close);
                self.asm.branch_if_zero(past_close);
                let here = self.label_for(index);
                self.asm.define_label(here);
            }
            JumpIfNonZero(open) => {
                let past_open = self.label_for(open);
                self.asm.branch_if_nonzero(past_open);
                let here = self.label_for(index);
                self.asm.define_label(here);
            }
        }
    }

    /// Labels are handed out on first use, so only bracket positions ever get one.
    fn label_for(&mut self, index: StreamIndex) -> Label {
        let next = Label(self.labels.len());
        *self.labels.entry(index).or_insert(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use crate::target::{AARCH64_LINUX, X86_64_LINUX, X86_64_MACOS};

    fn compile(source: &str, profile: &'static TargetProfile) -> String {
        let parsed = parse(source.as_bytes(), "test.bf").unwrap();
        emit_assembly(&parsed.stream, profile, cells(30_000))
    }

    fn cells(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().map(str::trim).collect()
    }

    /// A recording [TargetAssembly], so the walk can be checked without any instruction set.
    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl TargetAssembly for Recorder {
        fn prologue(&mut self, tape_len: u32) {
            self.0.push(format!("prologue {}", tape_len));
        }
        fn move_pointer(&mut self, direction: Direction, amount: u32, _tape_len: u32) {
            self.0.push(format!("move {:?} {}", direction, amount));
        }
        fn change_cell(&mut self, direction: Direction, amount: u8) {
            self.0.push(format!("cell {:?} {}", direction, amount));
        }
        fn output(&mut self, amount: u32) {
            self.0.push(format!("output {}", amount));
        }
        fn input(&mut self) {
            self.0.push("input".to_owned());
        }
        fn branch_if_zero(&mut self, label: Label) {
            self.0.push(format!("bz {}", label));
        }
        fn branch_if_nonzero(&mut self, label: Label) {
            self.0.push(format!("bnz {}", label));
        }
        fn define_label(&mut self, label: Label) {
            self.0.push(format!("{}:", label));
        }
        fn epilogue(&mut self) {
            self.0.push("epilogue".to_owned());
        }
        fn runtime_support(&mut self) {
            self.0.push("runtime".to_owned());
        }
        fn into_text(self) -> String {
            self.0.join("\n")
        }
    }

    #[test]
    fn one_template_per_instruction() {
        let parsed = parse(b"+[->>3.,<]-,,", "test.bf").unwrap();
        let text = CodeGenerator::new(Recorder::default()).compile(&parsed.stream, 100);

        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec![
                "prologue 100",
                "cell Forward 1",
                "bz .L0",
                ".L1:",
                "cell Backward 1",
                "move Forward 2",
                "output 3",
                "input",
                "move Backward 1",
                "bnz .L1",
                ".L0:",
                "cell Backward 1",
                "epilogue",
                "runtime",
            ]
        );
    }

    #[test]
    fn only_brackets_get_labels() {
        let parsed = parse(b"+++>>>...", "test.bf").unwrap();
        let text = CodeGenerator::new(Recorder::default()).compile(&parsed.stream, 100);
        assert!(!text.contains(".L"));
    }

    #[test]
    fn nested_loops_have_distinct_labels() {
        let parsed = parse(b"[[]]", "test.bf").unwrap();
        let text = CodeGenerator::new(Recorder::default()).compile(&parsed.stream, 100);
        let defined: Vec<_> = text.lines().filter(|l| l.ends_with(':')).collect();
        assert_eq!(defined, vec![".L1:", ".L3:", ".L2:", ".L0:"]);
    }

    #[test]
    fn cell_amounts_wrap() {
        let parsed = parse(b"300+", "test.bf").unwrap();
        let text = CodeGenerator::new(Recorder::default()).compile(&parsed.stream, 100);
        assert!(text.contains("cell Forward 44"));
    }

    #[test]
    fn x86_64_linux_uses_linux_syscalls() {
        let text = compile("65+.,", &X86_64_LINUX);
        let lines = lines(&text);

        assert!(lines.contains(&"global _start"));
        assert!(lines.contains(&"resb 30000"));
        assert!(lines.contains(&"lea r12, [tape]"));
        assert!(lines.contains(&"add byte [r12 + r13], 0x41"));
        assert!(lines.contains(&"mov r14d, 0x1"));
        assert!(lines.contains(&"call write_cell"));
        assert!(lines.contains(&"call read_cell"));
        // write, read, exit
        assert!(lines.contains(&"mov eax, 0x1"));
        assert!(lines.contains(&"mov eax, 0x0"));
        assert!(lines.contains(&"mov eax, 0x3c"));
    }

    #[test]
    fn x86_64_macos_uses_bsd_syscalls() {
        let text = compile(".", &X86_64_MACOS);
        let lines = lines(&text);

        assert!(lines.contains(&"mov eax, 0x2000004"));
        assert!(lines.contains(&"mov eax, 0x2000003"));
        assert!(lines.contains(&"mov eax, 0x2000001"));
    }

    #[test]
    fn x86_64_loops_compare_and_branch() {
        let text = compile("[-]", &X86_64_LINUX);
        let lines = lines(&text);
        let start = lines.iter().position(|&l| l == "_start:").unwrap();

        assert_eq!(
            &lines[start + 3..start + 10],
            &[
                "cmp byte [r12 + r13], 0x0",
                "je .L0",
                ".L1:",
                "sub byte [r12 + r13], 0x1",
                "cmp byte [r12 + r13], 0x0",
                "jne .L1",
                ".L0:",
            ]
        );
    }

    #[test]
    fn x86_64_moves_are_bounds_checked() {
        let text = compile("<", &X86_64_LINUX);
        let lines = lines(&text);
        let at = lines.iter().position(|&l| l == "sub r13d, 0x1").unwrap();

        assert_eq!(lines[at + 1], "cmp r13d, 0x7530");
        assert_eq!(lines[at + 2], "jae tape_out_of_bounds");
    }

    #[test]
    fn aarch64_linux_program() {
        let text = compile("[>+.]", &AARCH64_LINUX);
        let lines = lines(&text);

        assert!(lines.contains(&".global _start"));
        assert!(lines.contains(&".skip 30000"));
        assert!(lines.contains(&"adrp x19, tape"));
        assert!(lines.contains(&"movz w22, #0x7530"));
        assert!(lines.contains(&"ldrb w9, [x19, w20, uxtw]"));
        assert!(lines.contains(&"cbz w9, .L0"));
        assert!(lines.contains(&"cbnz w9, .L1"));
        assert!(lines.contains(&"add w20, w20, w9"));
        assert!(lines.contains(&"b.hs tape_out_of_bounds"));
        assert!(lines.contains(&"bl write_cell"));
        // write, read, exit
        assert!(lines.contains(&"mov x8, #64"));
        assert!(lines.contains(&"mov x8, #63"));
        assert!(lines.contains(&"mov x8, #93"));
    }

    #[test]
    fn aarch64_syscalls_take_general_registers() {
        let text = compile(".", &AARCH64_LINUX);
        let lines = lines(&text);

        assert!(lines.contains(&"add x1, x19, w20, uxtw"));
        assert!(lines.contains(&"mov x2, #1"));
        assert!(!text.contains("sp"));
    }

    #[test]
    fn aarch64_large_constants_use_movk() {
        let parsed = parse(b">", "test.bf").unwrap();
        let text = emit_assembly(&parsed.stream, &AARCH64_LINUX, cells(1_000_000));
        let lines = lines(&text);

        assert!(lines.contains(&"movz w22, #0x4240"));
        assert!(lines.contains(&"movk w22, #0xf, lsl #16"));
    }

    #[test]
    fn single_cell_tape() {
        let parsed = parse(b"+>", "test.bf").unwrap();

        let x86 = emit_assembly(&parsed.stream, &X86_64_LINUX, cells(1));
        assert!(lines(&x86).contains(&"resb 1"));
        assert!(lines(&x86).contains(&"cmp r13d, 0x1"));

        let arm = emit_assembly(&parsed.stream, &AARCH64_LINUX, cells(1));
        assert!(lines(&arm).contains(&".skip 1"));
        assert!(lines(&arm).contains(&"movz w22, #0x1"));
    }

    #[test]
    fn disabled_input_emits_nothing() {
        let text = compile(",,", &X86_64_LINUX);
        assert!(!lines(&text).contains(&"call read_cell"));
    }
}
