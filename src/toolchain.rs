//! Turns emitted assembly into an executable by shelling out to an assembler and a linker.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use brainfold_core::target::{Arch, Os, TargetProfile};

/// The external programs used to build an executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub assembler: String,
    pub linker: String,
}

/// Files that only exist between emitting assembly and linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intermediates {
    pub assembly: PathBuf,
    pub object: PathBuf,
}

/// Anything that goes wrong while building an executable. All of them are fatal.
#[derive(Debug)]
pub enum BuildError {
    Write { path: PathBuf, source: io::Error },
    Spawn { tool: String, source: io::Error },
    ToolFailed { tool: String, status: ExitStatus },
    Cleanup { path: PathBuf, source: io::Error },
}

impl Toolchain {
    /// The usual tools for a profile: NASM for x86-64, GNU as for AArch64, and `ld`.
    pub fn for_profile(profile: &TargetProfile) -> Self {
        let assembler = match profile.arch {
            Arch::X86_64 => "nasm",
            Arch::AArch64 => "as",
        };

        Toolchain {
            assembler: assembler.to_owned(),
            linker: "ld".to_owned(),
        }
    }

    pub fn assemble_command(
        &self,
        profile: &TargetProfile,
        assembly: &Path,
        object: &Path,
    ) -> Command {
        let mut command = Command::new(&self.assembler);
        if profile.arch == Arch::X86_64 {
            command.args(["-f", profile.object_format]);
        }
        command.arg("-o").arg(object).arg(assembly);

        command
    }

    pub fn link_command(&self, profile: &TargetProfile, object: &Path, executable: &Path) -> Command {
        let mut command = Command::new(&self.linker);
        command.arg("-o").arg(executable).arg(object);
        if profile.os == Os::MacOs {
            command.args(["-e", "_start", "-static"]);
        }

        command
    }
}

impl Intermediates {
    /// Intermediate files are named after the executable they will become.
    pub fn beside(executable: &Path, profile: &TargetProfile) -> Self {
        let extension = match profile.arch {
            Arch::X86_64 => ".asm",
            Arch::AArch64 => ".s",
        };

        Intermediates {
            assembly: with_suffix(executable, extension),
            object: with_suffix(executable, ".o"),
        }
    }

    /// Deletes both files. Failing to do so is an error.
    pub fn remove(&self) -> Result<(), BuildError> {
        for path in [&self.assembly, &self.object] {
            fs::remove_file(path).map_err(|source| BuildError::Cleanup {
                path: path.clone(),
                source,
            })?;
        }

        Ok(())
    }
}

/// Assembles and links `assembly` into `executable`.
///
/// On failure, intermediate files are left behind for inspection.
pub fn build_executable(
    assembly: &str,
    profile: &TargetProfile,
    toolchain: &Toolchain,
    executable: &Path,
    keep_intermediates: bool,
) -> Result<(), BuildError> {
    let files = Intermediates::beside(executable, profile);

    fs::write(&files.assembly, assembly).map_err(|source| BuildError::Write {
        path: files.assembly.clone(),
        source,
    })?;

    run_tool(
        toolchain.assemble_command(profile, &files.assembly, &files.object),
        &toolchain.assembler,
    )?;
    run_tool(
        toolchain.link_command(profile, &files.object, executable),
        &toolchain.linker,
    )?;

    if !keep_intermediates {
        files.remove()?;
    }

    Ok(())
}

fn run_tool(mut command: Command, tool: &str) -> Result<(), BuildError> {
    let status = command.status().map_err(|source| BuildError::Spawn {
        tool: tool.to_owned(),
        source,
    })?;

    if !status.success() {
        return Err(BuildError::ToolFailed {
            tool: tool.to_owned(),
            status,
        });
    }

    Ok(())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Write { source, .. }
            | BuildError::Spawn { source, .. }
            | BuildError::Cleanup { source, .. } => Some(source),
            BuildError::ToolFailed { .. } => None,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::Write { path, source } => {
                write!(f, "error: could not write {}: {}", path.display(), source)
            }
            BuildError::Spawn { tool, source } => {
                write!(f, "error: could not run '{}': {}", tool, source)
            }
            BuildError::ToolFailed { tool, status } => {
                write!(f, "error: '{}' failed ({})", tool, status)
            }
            BuildError::Cleanup { path, source } => {
                write!(f, "error: could not remove {}: {}", path.display(), source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainfold_core::target::{AARCH64_LINUX, X86_64_LINUX, X86_64_MACOS};

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn nasm_gets_the_object_format() {
        let toolchain = Toolchain::for_profile(&X86_64_MACOS);
        let command =
            toolchain.assemble_command(&X86_64_MACOS, Path::new("hi.asm"), Path::new("hi.o"));

        assert_eq!(command.get_program(), "nasm");
        assert_eq!(args(&command), vec!["-f", "macho64", "-o", "hi.o", "hi.asm"]);
    }

    #[test]
    fn gnu_as_needs_no_format() {
        let toolchain = Toolchain::for_profile(&AARCH64_LINUX);
        let command =
            toolchain.assemble_command(&AARCH64_LINUX, Path::new("hi.s"), Path::new("hi.o"));

        assert_eq!(command.get_program(), "as");
        assert_eq!(args(&command), vec!["-o", "hi.o", "hi.s"]);
    }

    #[test]
    fn linker_arguments() {
        let toolchain = Toolchain::for_profile(&X86_64_LINUX);
        let linux = toolchain.link_command(&X86_64_LINUX, Path::new("hi.o"), Path::new("hi"));
        let macos = toolchain.link_command(&X86_64_MACOS, Path::new("hi.o"), Path::new("hi"));

        assert_eq!(linux.get_program(), "ld");
        assert_eq!(args(&linux), vec!["-o", "hi", "hi.o"]);
        assert_eq!(
            args(&macos),
            vec!["-o", "hi", "hi.o", "-e", "_start", "-static"]
        );
    }

    #[test]
    fn intermediates_are_named_after_the_executable() {
        let files = Intermediates::beside(Path::new("out/hello"), &X86_64_LINUX);
        assert_eq!(files.assembly, PathBuf::from("out/hello.asm"));
        assert_eq!(files.object, PathBuf::from("out/hello.o"));

        let files = Intermediates::beside(Path::new("hello.bin"), &AARCH64_LINUX);
        assert_eq!(files.assembly, PathBuf::from("hello.bin.s"));
    }

    #[test]
    fn missing_tool_is_reported() {
        let toolchain = Toolchain {
            assembler: "brainfold-no-such-assembler".to_owned(),
            linker: "ld".to_owned(),
        };
        let dir = std::env::temp_dir().join(format!("brainfold-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let result =
            build_executable("", &X86_64_LINUX, &toolchain, &dir.join("prog"), false);
        match result {
            Err(BuildError::Spawn { tool, .. }) => {
                assert_eq!(tool, "brainfold-no-such-assembler")
            }
            other => panic!("expected a spawn failure, got {:?}", other),
        }

        fs::remove_dir_all(&dir).unwrap();
    }
}
