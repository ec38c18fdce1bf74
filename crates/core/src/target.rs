//! Target profiles: everything the code generator needs to know about an architecture/OS pair.

use std::fmt;
use std::str::FromStr;

use target_lexicon::{Aarch64Architecture, Architecture, OperatingSystem, Triple};

/// Instruction set the emitted assembly is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    AArch64,
}

/// Operating system whose system-call ABI the emitted program uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
}

/// System call numbers for the three primitives a program needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syscalls {
    pub write: u32,
    pub read: u32,
    pub exit: u32,
}

/// A static record of architecture/OS-specific constants.
#[derive(Debug, PartialEq, Eq)]
pub struct TargetProfile {
    pub name: &'static str,
    pub arch: Arch,
    pub os: Os,
    pub syscalls: Syscalls,
    /// Object format name handed to the external assembler.
    pub object_format: &'static str,
}

pub static X86_64_LINUX: TargetProfile = TargetProfile {
    name: "x86_64-linux",
    arch: Arch::X86_64,
    os: Os::Linux,
    syscalls: Syscalls {
        write: 1,
        read: 0,
        exit: 60,
    },
    object_format: "elf64",
};

// BSD-style numbering, in the "Unix" syscall class (0x2000000)
pub static X86_64_MACOS: TargetProfile = TargetProfile {
    name: "x86_64-macos",
    arch: Arch::X86_64,
    os: Os::MacOs,
    syscalls: Syscalls {
        write: 0x2000004,
        read: 0x2000003,
        exit: 0x2000001,
    },
    object_format: "macho64",
};

pub static AARCH64_LINUX: TargetProfile = TargetProfile {
    name: "aarch64-linux",
    arch: Arch::AArch64,
    os: Os::Linux,
    syscalls: Syscalls {
        write: 64,
        read: 63,
        exit: 93,
    },
    object_format: "elf64",
};

/// Every profile there is.
pub static PROFILES: [&TargetProfile; 3] = [&X86_64_LINUX, &X86_64_MACOS, &AARCH64_LINUX];

/// The requested target cannot be compiled for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// Not a target triple we (or target-lexicon) can make sense of.
    Invalid(String),
    /// A well-formed triple without a profile.
    Unsupported(String),
}

impl TargetProfile {
    /// Selects the profile for a target triple.
    pub fn from_triple(triple: &Triple) -> Result<&'static TargetProfile, TargetError> {
        let arch = match triple.architecture {
            Architecture::X86_64 => Arch::X86_64,
            Architecture::Aarch64(Aarch64Architecture::Aarch64) => Arch::AArch64,
            _ => return Err(TargetError::Unsupported(triple.to_string())),
        };
        let os = match triple.operating_system {
            OperatingSystem::Linux => Os::Linux,
            OperatingSystem::Darwin | OperatingSystem::MacOSX { .. } => Os::MacOs,
            _ => return Err(TargetError::Unsupported(triple.to_string())),
        };

        PROFILES
            .iter()
            .copied()
            .find(|profile| profile.arch == arch && profile.os == os)
            .ok_or_else(|| TargetError::Unsupported(triple.to_string()))
    }

    /// Selects a profile by its short name (`x86_64-linux`) or by a full target triple.
    pub fn from_name(name: &str) -> Result<&'static TargetProfile, TargetError> {
        if let Some(profile) = PROFILES.iter().copied().find(|p| p.name == name) {
            return Ok(profile);
        }

        let triple = Triple::from_str(name).map_err(|_| TargetError::Invalid(name.to_owned()))?;
        Self::from_triple(&triple)
    }

    /// The profile for the machine we are running on.
    pub fn host() -> Result<&'static TargetProfile, TargetError> {
        Self::from_triple(&Triple::host())
    }
}

impl fmt::Display for TargetProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl std::error::Error for TargetError {}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TargetError::Invalid(name) => write!(f, "'{}' is not a valid target", name),
            TargetError::Unsupported(name) => write!(
                f,
                "unsupported target '{}' (supported: x86_64-linux, x86_64-macos, aarch64-linux)",
                name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_select_profiles() {
        assert_eq!(TargetProfile::from_name("x86_64-linux"), Ok(&X86_64_LINUX));
        assert_eq!(TargetProfile::from_name("aarch64-linux"), Ok(&AARCH64_LINUX));
    }

    #[test]
    fn triples_select_profiles() {
        assert_eq!(
            TargetProfile::from_name("x86_64-unknown-linux-gnu"),
            Ok(&X86_64_LINUX)
        );
        assert_eq!(
            TargetProfile::from_name("x86_64-apple-darwin"),
            Ok(&X86_64_MACOS)
        );
        assert_eq!(
            TargetProfile::from_name("aarch64-unknown-linux-gnu"),
            Ok(&AARCH64_LINUX)
        );
    }

    #[test]
    fn unsupported_targets_fail_fast() {
        assert!(matches!(
            TargetProfile::from_name("aarch64-apple-darwin"),
            Err(TargetError::Unsupported(_))
        ));
        assert!(matches!(
            TargetProfile::from_name("riscv64gc-unknown-linux-gnu"),
            Err(TargetError::Unsupported(_))
        ));
        assert!(matches!(
            TargetProfile::from_name("x86_64-pc-windows-msvc"),
            Err(TargetError::Unsupported(_))
        ));
    }

    #[test]
    fn nonsense_is_invalid() {
        assert!(matches!(
            TargetProfile::from_name("not a target"),
            Err(TargetError::Invalid(_))
        ));
    }
}
