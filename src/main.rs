extern crate brainfold;
extern crate brainfold_core;
extern crate structopt;

use std::error::Error;
use std::fs;
use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process;

use structopt::StructOpt;

use brainfold::toolchain::{build_executable, Toolchain};
use brainfold_core::ir::disassemble;
use brainfold_core::target::{Arch, TargetProfile};
use brainfold_core::{
    emit_assembly, parse, BrainfoldProgram, Interpreter, ParsedProgram, Tape, DEFAULT_TAPE_LEN,
};

#[derive(StructOpt)]
#[structopt(name = "brainfold", about = "Interprets or compiles Brainfuck programs")]
enum Opt {
    /// Interpret a program, reading stdin and writing stdout
    Run {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
        /// Number of cells on the tape
        #[structopt(long, parse(try_from_str = parse_tape_size))]
        tape_size: Option<NonZeroU32>,
    },
    /// Compile a program to a native executable
    Build {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
        /// Where to write the executable (default: the source file's name, minus extension)
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
        /// Target triple or profile name (x86_64-linux, x86_64-macos, aarch64-linux)
        #[structopt(long)]
        target: Option<String>,
        /// Number of cells on the tape
        #[structopt(long, parse(try_from_str = parse_tape_size))]
        tape_size: Option<NonZeroU32>,
        /// Only write the assembly; do not assemble or link
        #[structopt(long)]
        emit_asm: bool,
        /// Keep the assembly and object files around after linking
        #[structopt(long)]
        keep_intermediates: bool,
        /// Assembler to run instead of the target's default
        #[structopt(long)]
        assembler: Option<String>,
        /// Linker to run instead of the target's default
        #[structopt(long)]
        linker: Option<String>,
    },
    /// Print the instruction stream
    Disasm {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
}

fn main() {
    let opt = Opt::from_args();

    if let Err(e) = run(opt) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn Error>> {
    match opt {
        Opt::Run { file, tape_size } => {
            let program = load(&file)?;
            let mut tape = Tape::allocate(tape_len(tape_size).get() as usize)?;
            Interpreter::new(&program.stream).run(&mut tape)?;
        }
        Opt::Build {
            file,
            output,
            target,
            tape_size,
            emit_asm,
            keep_intermediates,
            assembler,
            linker,
        } => {
            let profile = match target {
                Some(name) => TargetProfile::from_name(&name)?,
                None => TargetProfile::host()?,
            };
            let program = load(&file)?;
            let assembly = emit_assembly(&program.stream, profile, tape_len(tape_size));

            let executable = output.unwrap_or_else(|| default_output(&file));
            if emit_asm {
                let path = if executable.extension().is_some() {
                    executable
                } else {
                    executable.with_extension(assembly_extension(profile))
                };
                fs::write(&path, assembly)
                    .map_err(|e| format!("error: could not write {}: {}", path.display(), e))?;
                return Ok(());
            }

            let mut toolchain = Toolchain::for_profile(profile);
            if let Some(assembler) = assembler {
                toolchain.assembler = assembler;
            }
            if let Some(linker) = linker {
                toolchain.linker = linker;
            }

            build_executable(
                &assembly,
                profile,
                &toolchain,
                &executable,
                keep_intermediates,
            )?;
        }
        Opt::Disasm { file } => {
            let program = load(&file)?;
            let stdout = io::stdout();
            disassemble(&program.stream, &mut stdout.lock())?;
        }
    }

    Ok(())
}

/// Reads and parses a source file, printing any warnings.
fn load(file: &Path) -> Result<ParsedProgram, Box<dyn Error>> {
    let source = fs::read(file)
        .map_err(|e| format!("error: could not read {}: {}", file.display(), e))?;
    let program = parse(&source, &file.to_string_lossy())?;

    for warning in &program.warnings {
        eprintln!("{}", warning);
    }

    Ok(program)
}

const DEFAULT_TAPE_SIZE: NonZeroU32 = match NonZeroU32::new(DEFAULT_TAPE_LEN as u32) {
    Some(len) => len,
    None => panic!("the default tape has no cells"),
};

fn tape_len(requested: Option<NonZeroU32>) -> NonZeroU32 {
    requested.unwrap_or(DEFAULT_TAPE_SIZE)
}

fn parse_tape_size(s: &str) -> Result<NonZeroU32, String> {
    match s.parse::<u32>() {
        Ok(n) => NonZeroU32::new(n).ok_or_else(|| String::from("the tape needs at least one cell")),
        Err(e) => Err(e.to_string()),
    }
}

fn default_output(source: &Path) -> PathBuf {
    source
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("a.out"))
}

fn assembly_extension(profile: &TargetProfile) -> &'static str {
    match profile.arch {
        Arch::X86_64 => "asm",
        Arch::AArch64 => "s",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tape_size_of(args: &[&str]) -> Option<NonZeroU32> {
        match Opt::from_iter_safe(args).unwrap() {
            Opt::Run { tape_size, .. } | Opt::Build { tape_size, .. } => tape_size,
            Opt::Disasm { .. } => panic!("no tape size on disasm"),
        }
    }

    #[test]
    fn tape_size_defaults_to_the_interpreter_tape() {
        for args in [&["brainfold", "run", "a.bf"][..], &["brainfold", "build", "a.bf"][..]] {
            let len = tape_len(tape_size_of(args));
            assert_eq!(len.get() as usize, DEFAULT_TAPE_LEN);
        }
    }

    #[test]
    fn tape_size_can_be_set() {
        let size = tape_size_of(&["brainfold", "run", "--tape-size", "16", "a.bf"]);
        assert_eq!(tape_len(size).get(), 16);
    }

    #[test]
    fn empty_tape_is_refused() {
        assert!(Opt::from_iter_safe(&["brainfold", "build", "--tape-size", "0", "a.bf"]).is_err());
    }
}
