//! Intermediate Representation
//!
//! Linear three-address code produced by the syntax/IR builder. The
//! instruction list is append-only while parsing runs, frozen afterwards,
//! and is the code generator's sole input.

use std::fmt;

/// Declarable value types of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclType {
    /// 64-bit signed integer.
    Int,
    /// Double-precision decimal.
    Float,
}

impl fmt::Display for DeclType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclType::Int => write!(f, "int"),
            DeclType::Float => write!(f, "float"),
        }
    }
}

/// An instruction operand.
///
/// The tag is decided once, when the builder constructs the instruction;
/// the code generator dispatches on it and never re-infers an operand's
/// kind from its textual shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer literal.
    Int(i64),
    /// Decimal literal.
    Float(f64),
    /// Source-level variable reference.
    Var(String),
    /// Compiler-generated temporary holding an expression result.
    Temp(String),
    /// Compiler-generated jump target.
    Label(String),
}

impl Operand {
    /// Returns the storage-cell name for variable-like operands, or `None`
    /// for literals and labels.
    #[must_use]
    pub fn cell_name(&self) -> Option<&str> {
        match self {
            Operand::Var(name) | Operand::Temp(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(v) => write!(f, "{v}"),
            Operand::Float(v) => write!(f, "{v}"),
            Operand::Var(name) | Operand::Temp(name) | Operand::Label(name) => {
                write!(f, "{name}")
            }
        }
    }
}

/// Instruction opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Copy `src1` into `dst`.
    Assign,
    /// `dst = src1 + src2`.
    Add,
    /// `dst = src1 - src2`.
    Sub,
    /// `dst = src1 * src2`.
    Mul,
    /// `dst = src1 / src2` (signed quotient).
    Div,
    /// `dst = src1 % src2` (signed remainder).
    Mod,
    /// `dst = (src1 < src2)` as 0/1.
    Less,
    /// `dst = (src1 <= src2)` as 0/1.
    LessEq,
    /// `dst = (src1 > src2)` as 0/1.
    Greater,
    /// `dst = (src1 >= src2)` as 0/1.
    GreaterEq,
    /// `dst = (src1 == src2)` as 0/1.
    Eq,
    /// `dst = (src1 != src2)` as 0/1.
    NotEq,
    /// Associates the label in `src1` with this position.
    Mark,
    /// Unconditional jump to the label in `src1`.
    Jump,
    /// Jump to the label in `src2` when `src1` evaluates to zero.
    JumpIfFalse,
    /// Print the value in `src1`.
    Output,
    /// Load the value in `src1` (or zero) into the result register.
    Return,
}

impl OpCode {
    /// Returns `true` for the binary arithmetic and relational opcodes.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(
            self,
            OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Mod
                | OpCode::Less
                | OpCode::LessEq
                | OpCode::Greater
                | OpCode::GreaterEq
                | OpCode::Eq
                | OpCode::NotEq
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCode::Assign => write!(f, "assign"),
            OpCode::Add => write!(f, "+"),
            OpCode::Sub => write!(f, "-"),
            OpCode::Mul => write!(f, "*"),
            OpCode::Div => write!(f, "/"),
            OpCode::Mod => write!(f, "%"),
            OpCode::Less => write!(f, "<"),
            OpCode::LessEq => write!(f, "<="),
            OpCode::Greater => write!(f, ">"),
            OpCode::GreaterEq => write!(f, ">="),
            OpCode::Eq => write!(f, "=="),
            OpCode::NotEq => write!(f, "!="),
            OpCode::Mark => write!(f, "mark"),
            OpCode::Jump => write!(f, "jump"),
            OpCode::JumpIfFalse => write!(f, "jump_if_false"),
            OpCode::Output => write!(f, "output"),
            OpCode::Return => write!(f, "return"),
        }
    }
}

/// A single three-address instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: OpCode,
    pub src1: Option<Operand>,
    pub src2: Option<Operand>,
    pub dst: Option<Operand>,
}

impl Instruction {
    /// Returns a new instruction.
    #[must_use]
    pub const fn new(
        op: OpCode,
        src1: Option<Operand>,
        src2: Option<Operand>,
        dst: Option<Operand>,
    ) -> Self {
        Self {
            op,
            src1,
            src2,
            dst,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.op.to_string();

        match (&self.src1, &self.src2, &self.dst) {
            (Some(src1), Some(src2), Some(dst)) => {
                write!(f, "{op:<14}{src1}, {src2} -> {dst}")
            }
            (Some(src1), Some(src2), None) => write!(f, "{op:<14}{src1}, {src2}"),
            (Some(src1), None, Some(dst)) => write!(f, "{op:<14}{src1} -> {dst}"),
            (Some(src1), None, None) => write!(f, "{op:<14}{src1}"),
            _ => write!(f, "{op}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_three_address_rendering() {
        let instr = Instruction::new(
            OpCode::Add,
            Some(Operand::Var("a".into())),
            Some(Operand::Int(2)),
            Some(Operand::Temp("temp1".into())),
        );

        assert_eq!(instr.to_string(), "+             a, 2 -> temp1");
    }

    #[test]
    fn opcode_rendering_matches_ir_vocabulary() {
        assert_eq!(OpCode::JumpIfFalse.to_string(), "jump_if_false");
        assert_eq!(OpCode::Mod.to_string(), "%");
    }
}
