//! Multi-stage pipeline for compiling source programs into textual
//! x86-64 assembly.

pub mod codegen;
pub mod ir;
pub mod issue;
pub mod lexer;
pub mod parser;
pub mod symbols;
