//! Code Generation
//!
//! Compiler pass that lowers the frozen IR list into textual x86-64 NASM
//! assembly. The pass is a pure function of the instruction list: it has no
//! access to the syntax tree or the registry, recomputes the referenced
//! cells from scratch on every call, and never fails — structurally
//! defective instructions degrade to comment lines.
//!
//! The emitted program declares one zero-initialized signed 8-byte cell per
//! variable and temporary, a single integer format-string constant, and one
//! `main` entry with a standard prologue/epilogue. It assembles externally
//! (NASM) and links against a C runtime providing `printf`.

use std::collections::BTreeSet;

use crate::compiler::ir::{Instruction, OpCode, Operand};

/// Label of the integer format-string constant.
const FMT_LABEL: &str = "fmt_int";

/// Translates `ir` into ordered assembly lines.
///
/// Exactly one function epilogue is emitted after all instructions are
/// lowered, however many `return` opcodes occur; each `return` loads the
/// result register and execution falls through to the shared epilogue.
#[must_use]
pub fn translate(ir: &[Instruction]) -> Vec<String> {
    let cells = collect_cells(ir);
    let mut out = Vec::new();

    out.push("section .data".into());
    out.push(format!("{FMT_LABEL}: db \"%d\", 10, 0"));
    // One zero-initialized 8-byte cell per variable, lexicographic order
    // for reproducible output.
    for name in &cells {
        out.push(format!("{name}: dq 0"));
    }
    out.push(String::new());

    out.push("section .text".into());
    out.push("extern printf".into());
    out.push("global main".into());
    out.push(String::new());

    out.push("main:".into());
    out.push("    push rbp".into());
    out.push("    mov rbp, rsp".into());
    out.push(String::new());

    for instr in ir {
        lower(instr, &mut out);
    }

    out.push("    mov rsp, rbp".into());
    out.push("    pop rbp".into());
    out.push("    ret".into());
    out.push(String::new());

    out
}

/// First pass: the set of storage cells the program references. Operands
/// tagged as variables or temporaries name cells; labels (the first
/// operand of `mark` and the targets of jumps) never do.
fn collect_cells(ir: &[Instruction]) -> BTreeSet<String> {
    let mut cells = BTreeSet::new();

    for instr in ir {
        if instr.op == OpCode::Mark {
            continue;
        }

        for operand in [&instr.src1, &instr.src2, &instr.dst].into_iter().flatten() {
            if let Some(name) = operand.cell_name() {
                cells.insert(name.to_string());
            }
        }
    }

    cells
}

/// Lowers one instruction, appending its assembly lines.
fn lower(instr: &Instruction, out: &mut Vec<String>) {
    match instr.op {
        OpCode::Assign => {
            let (Some(src), Some(dst)) = (&instr.src1, &instr.dst) else {
                unhandled(instr, out);
                return;
            };

            load_operand(src, "rax", out);
            store_accumulator(dst, out);
            out.push(String::new());
        }
        OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod => {
            let (Some(lhs), Some(rhs), Some(dst)) = (&instr.src1, &instr.src2, &instr.dst)
            else {
                unhandled(instr, out);
                return;
            };

            load_operand(lhs, "rax", out);
            load_operand(rhs, "rbx", out);

            match instr.op {
                OpCode::Add => out.push("    add rax, rbx".into()),
                OpCode::Sub => out.push("    sub rax, rbx".into()),
                OpCode::Mul => out.push("    imul rax, rbx".into()),
                OpCode::Div => {
                    // Sign-extend rax into rdx:rax; quotient lands in rax.
                    out.push("    cqo".into());
                    out.push("    idiv rbx".into());
                }
                _ => {
                    // Remainder lands in rdx.
                    out.push("    cqo".into());
                    out.push("    idiv rbx".into());
                    out.push("    mov rax, rdx".into());
                }
            }

            store_accumulator(dst, out);
            out.push(String::new());
        }
        OpCode::Less
        | OpCode::LessEq
        | OpCode::Greater
        | OpCode::GreaterEq
        | OpCode::Eq
        | OpCode::NotEq => {
            let (Some(lhs), Some(rhs), Some(dst)) = (&instr.src1, &instr.src2, &instr.dst)
            else {
                unhandled(instr, out);
                return;
            };

            load_operand(lhs, "rax", out);
            load_operand(rhs, "rbx", out);
            out.push("    cmp rax, rbx".into());

            let set = match instr.op {
                OpCode::Less => "setl",
                OpCode::LessEq => "setle",
                OpCode::Greater => "setg",
                OpCode::GreaterEq => "setge",
                OpCode::NotEq => "setne",
                _ => "sete",
            };

            out.push(format!("    {set} al"));
            out.push("    movzx rax, al".into());
            store_accumulator(dst, out);
            out.push(String::new());
        }
        OpCode::Mark => {
            let Some(label) = &instr.src1 else {
                unhandled(instr, out);
                return;
            };

            out.push(format!("{label}:"));
            out.push(String::new());
        }
        OpCode::Jump => {
            let Some(label) = &instr.src1 else {
                unhandled(instr, out);
                return;
            };

            out.push(format!("    jmp {label}"));
            out.push(String::new());
        }
        OpCode::JumpIfFalse => {
            let (Some(cond), Some(label)) = (&instr.src1, &instr.src2) else {
                unhandled(instr, out);
                return;
            };

            load_operand(cond, "rax", out);
            out.push("    cmp rax, 0".into());
            out.push(format!("    je {label}"));
            out.push(String::new());
        }
        OpCode::Output => {
            let Some(value) = &instr.src1 else {
                unhandled(instr, out);
                return;
            };

            load_operand(value, "rsi", out);
            out.push(format!("    lea rdi, [rel {FMT_LABEL}]"));
            out.push("    xor rax, rax".into());
            out.push("    call printf".into());
            out.push(String::new());
        }
        OpCode::Return => {
            match &instr.src1 {
                Some(value) => load_operand(value, "rax", out),
                None => out.push("    mov rax, 0".into()),
            }

            out.push("    ; function return".into());
            out.push(String::new());
        }
    }
}

/// Loads `operand` into `reg`. Operands outside the integer model (decimal
/// literals, stray labels) degrade to a diagnostic comment and a zero
/// load.
fn load_operand(operand: &Operand, reg: &str, out: &mut Vec<String>) {
    match operand {
        Operand::Int(v) => out.push(format!("    mov {reg}, {v}")),
        Operand::Var(name) | Operand::Temp(name) => {
            out.push(format!("    mov {reg}, QWORD [rel {name}]"));
        }
        other => {
            out.push(format!("    ; unsupported operand {other}, zeroing"));
            out.push(format!("    mov {reg}, 0"));
        }
    }
}

/// Stores the accumulator into the cell named by `dst`.
fn store_accumulator(dst: &Operand, out: &mut Vec<String>) {
    match dst {
        Operand::Var(name) | Operand::Temp(name) => {
            out.push(format!("    mov QWORD [rel {name}], rax"));
        }
        other => out.push(format!("    ; cannot store to {other}")),
    }
}

/// Passthrough for instructions missing a required operand; translation
/// never fails.
fn unhandled(instr: &Instruction, out: &mut Vec<String>) {
    out.push(format!("    ; unhandled instruction: {instr}"));
    out.push(String::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(value: Operand, dst: &str) -> Instruction {
        Instruction::new(
            OpCode::Assign,
            Some(value),
            None,
            Some(Operand::Var(dst.into())),
        )
    }

    fn binary(op: OpCode, lhs: Operand, rhs: Operand, dst: &str) -> Instruction {
        Instruction::new(op, Some(lhs), Some(rhs), Some(Operand::Temp(dst.into())))
    }

    #[test]
    fn data_cells_lexicographic_after_format_constant() {
        let ir = vec![
            assign(Operand::Int(1), "b"),
            assign(Operand::Int(2), "a"),
            binary(
                OpCode::Add,
                Operand::Var("a".into()),
                Operand::Var("b".into()),
                "temp1",
            ),
        ];

        let asm = translate(&ir);

        assert_eq!(asm[0], "section .data");
        assert_eq!(asm[1], "fmt_int: db \"%d\", 10, 0");
        assert_eq!(asm[2], "a: dq 0");
        assert_eq!(asm[3], "b: dq 0");
        assert_eq!(asm[4], "temp1: dq 0");
    }

    #[test]
    fn labels_never_declared_as_cells() {
        let ir = vec![
            Instruction::new(
                OpCode::JumpIfFalse,
                Some(Operand::Var("cond".into())),
                Some(Operand::Label("Label1".into())),
                None,
            ),
            Instruction::new(
                OpCode::Mark,
                Some(Operand::Label("Label1".into())),
                None,
                None,
            ),
        ];

        let asm = translate(&ir);

        assert!(asm.contains(&"cond: dq 0".to_string()));
        assert!(!asm.contains(&"Label1: dq 0".to_string()));
        assert!(asm.contains(&"Label1:".to_string()));
    }

    #[test]
    fn division_and_remainder_lowering() {
        let div = translate(&[binary(
            OpCode::Div,
            Operand::Var("a".into()),
            Operand::Int(2),
            "temp1",
        )]);
        let div_body: Vec<&str> = div.iter().map(String::as_str).collect();

        assert!(div_body.contains(&"    cqo"));
        assert!(div_body.contains(&"    idiv rbx"));
        assert!(!div_body.contains(&"    mov rax, rdx"));

        let rem = translate(&[binary(
            OpCode::Mod,
            Operand::Var("a".into()),
            Operand::Int(2),
            "temp1",
        )]);

        assert!(rem.contains(&"    mov rax, rdx".to_string()));
    }

    #[test]
    fn relational_lowering_sets_condition_byte() {
        let asm = translate(&[binary(
            OpCode::LessEq,
            Operand::Var("a".into()),
            Operand::Var("b".into()),
            "temp1",
        )]);

        let idx = asm
            .iter()
            .position(|line| line == "    cmp rax, rbx")
            .expect("comparison should be emitted");

        assert_eq!(asm[idx + 1], "    setle al");
        assert_eq!(asm[idx + 2], "    movzx rax, al");
        assert_eq!(asm[idx + 3], "    mov QWORD [rel temp1], rax");
    }

    #[test]
    fn jump_if_false_compares_against_zero() {
        let asm = translate(&[Instruction::new(
            OpCode::JumpIfFalse,
            Some(Operand::Temp("temp1".into())),
            Some(Operand::Label("Label2".into())),
            None,
        )]);

        let idx = asm
            .iter()
            .position(|line| line == "    mov rax, QWORD [rel temp1]")
            .expect("condition load should be emitted");

        assert_eq!(asm[idx + 1], "    cmp rax, 0");
        assert_eq!(asm[idx + 2], "    je Label2");
    }

    #[test]
    fn output_invokes_formatted_print() {
        let asm = translate(&[Instruction::new(
            OpCode::Output,
            Some(Operand::Var("c".into())),
            None,
            None,
        )]);

        let idx = asm
            .iter()
            .position(|line| line == "    mov rsi, QWORD [rel c]")
            .expect("argument load should be emitted");

        assert_eq!(asm[idx + 1], "    lea rdi, [rel fmt_int]");
        assert_eq!(asm[idx + 2], "    xor rax, rax");
        assert_eq!(asm[idx + 3], "    call printf");
    }

    #[test]
    fn single_epilogue_for_multiple_returns() {
        let ir = vec![
            Instruction::new(OpCode::Return, Some(Operand::Int(1)), None, None),
            Instruction::new(OpCode::Return, None, None, None),
        ];

        let asm = translate(&ir);

        assert_eq!(asm.iter().filter(|line| *line == "    ret").count(), 1);
        assert_eq!(
            asm.iter()
                .filter(|line| *line == "    ; function return")
                .count(),
            2
        );
        // A bare return loads zero into the result register.
        assert!(asm.contains(&"    mov rax, 0".to_string()));
    }

    #[test]
    fn decimal_operand_degrades_to_comment() {
        let asm = translate(&[assign(Operand::Float(3.14), "pi")]);

        assert!(asm.contains(&"    ; unsupported operand 3.14, zeroing".to_string()));
        assert!(asm.contains(&"    mov QWORD [rel pi], rax".to_string()));
    }

    #[test]
    fn defective_instruction_degrades_to_comment() {
        let asm = translate(&[Instruction::new(OpCode::Add, None, None, None)]);

        assert!(asm
            .iter()
            .any(|line| line.starts_with("    ; unhandled instruction:")));
    }

    #[test]
    fn empty_ir_still_emits_program_skeleton() {
        let asm = translate(&[]);

        assert!(asm.contains(&"section .data".to_string()));
        assert!(asm.contains(&"main:".to_string()));
        assert_eq!(asm.iter().filter(|line| *line == "    ret").count(), 1);
    }

    #[test]
    fn translation_is_deterministic() {
        let ir = vec![
            assign(Operand::Int(1), "x"),
            binary(
                OpCode::Mul,
                Operand::Var("x".into()),
                Operand::Int(3),
                "temp1",
            ),
        ];

        assert_eq!(translate(&ir), translate(&ir));
    }
}
