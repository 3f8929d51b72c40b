//! Compiler core for a small C-like language (typed declarations,
//! assignment, `print`, `if`/`else`, `while`, nested blocks,
//! integer/decimal arithmetic), targeting textual x86-64 NASM assembly.
//!
//! The crate exposes the three pipeline entry points consumed by external
//! front ends:
//!
//! - [`scan`] — source text to tokens plus lexical issues,
//! - [`Parser::process`] — source text to an AST, with the instruction
//!   list, diagnostics and scope registry readable on the builder,
//! - [`translate`] — frozen IR to ordered assembly lines.
//!
//! [`compile`] chains the three for callers that only want the emission.
//! The output assembles with NASM and links against a C runtime providing
//! `printf`; this crate performs no assembling or linking itself.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::use_self)]
#![allow(clippy::redundant_else)]
#![allow(clippy::too_many_lines)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod compiler;

pub use compiler::codegen::translate;
pub use compiler::ir::{DeclType, Instruction, OpCode, Operand};
pub use compiler::issue::{Issue, Severity};
pub use compiler::lexer::{scan, Location, OperatorKind, Token, TokenKind};
pub use compiler::parser::{Ast, Parser, Stmt};
pub use compiler::symbols::{ScopeEntry, ScopeRegistry};

/// Compile a source program into assembly lines plus every issue recorded
/// along the way. Best-effort: assembly is produced even for diagnosed
/// programs.
#[must_use]
pub fn compile(source: &str) -> (Vec<String>, Vec<Issue>) {
    let mut parser = Parser::new();
    parser.process(source);

    let asm = translate(&parser.instructions);

    (asm, parser.issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_straight_line_program() {
        let (asm, issues) =
            compile("int a; int b; a = 1; b = 2; int c; c = a + b; print(c); return c;");

        assert!(issues.is_empty());

        // Cells in lexicographic order, after the format constant.
        let a = asm.iter().position(|l| l == "a: dq 0").expect("cell a");
        let b = asm.iter().position(|l| l == "b: dq 0").expect("cell b");
        let c = asm.iter().position(|l| l == "c: dq 0").expect("cell c");
        let fmt = asm
            .iter()
            .position(|l| l.starts_with("fmt_int:"))
            .expect("format constant");

        assert!(fmt < a && a < b && b < c);
        assert!(asm.contains(&"    call printf".to_string()));
        assert_eq!(asm.iter().filter(|l| *l == "    ret").count(), 1);
    }

    #[test]
    fn pipeline_diagnosed_program_still_emits() {
        let (asm, issues) = compile("if (a < b) { print(a); }");

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity() == Severity::Semantic));
        assert!(asm.contains(&"main:".to_string()));
        assert!(asm.contains(&"    je Label1".to_string()));
    }

    #[test]
    fn pipeline_deterministic_across_fresh_instances() {
        let source = "int n = 5; while (n > 0) { print(n); n = n - 1; }";

        assert_eq!(compile(source), compile(source));
    }
}
