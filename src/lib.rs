//! The parts of brainfold that live outside the compiler proper.

extern crate brainfold_core;

pub mod toolchain;
