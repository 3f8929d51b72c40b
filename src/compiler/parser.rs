//! Syntax Analysis and IR Generation
//!
//! Compiler pass that drives the statement grammar over the token stream
//! with syntax-directed translation: every production reduces to an
//! [`Operand`] while appending three-address instructions to the builder's
//! IR list and checking scope discipline against the registry. Diagnostics
//! never block emission; the parser resynchronizes after an unexpected
//! token and keeps going.

use std::collections::HashSet;
use std::fmt;

use crate::compiler::ir::{DeclType, Instruction, OpCode, Operand};
use crate::compiler::issue::Issue;
use crate::compiler::lexer::{self, OperatorKind, Token, TokenKind};
use crate::compiler::symbols::ScopeRegistry;

type TokenIter = std::iter::Peekable<std::vec::IntoIter<Token>>;

/// Relational operators, the lowest expression precedence tier.
const RELATIONAL_OPS: [(OperatorKind, OpCode); 6] = [
    (OperatorKind::LessThan, OpCode::Less),
    (OperatorKind::LessThanEq, OpCode::LessEq),
    (OperatorKind::GreaterThan, OpCode::Greater),
    (OperatorKind::GreaterThanEq, OpCode::GreaterEq),
    (OperatorKind::Eq, OpCode::Eq),
    (OperatorKind::NotEq, OpCode::NotEq),
];

/// Additive operators.
const ADDITIVE_OPS: [(OperatorKind, OpCode); 2] = [
    (OperatorKind::Plus, OpCode::Add),
    (OperatorKind::Minus, OpCode::Sub),
];

/// Multiplicative operators, binding tighter than the additive tier.
const TERM_OPS: [(OperatorKind, OpCode); 3] = [
    (OperatorKind::Asterisk, OpCode::Mul),
    (OperatorKind::Division, OpCode::Div),
    (OperatorKind::Remainder, OpCode::Mod),
];

/// Abstract syntax tree root.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// Top-level statement sequence.
    Program(Vec<Stmt>),
}

/// Statements of the source language.
///
/// Expression positions hold the [`Operand`] the expression reduced to,
/// since instructions are emitted inline while parsing.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Stmt {
    Decl {
        ty: DeclType,
        name: String,
        init: Option<Operand>,
    },
    /// No-op marker left behind by a rejected redeclaration.
    DeclError { ty: DeclType, name: String },
    Assign { name: String, value: Operand },
    Output(Operand),
    If {
        cond: Operand,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While { cond: Operand, body: Box<Stmt> },
    Block(Vec<Stmt>),
    Return(Option<Operand>),
}

/// Syntax/IR builder.
///
/// One instance holds the state of one compilation: the scope registry,
/// the append-only instruction list, and the ordered diagnostics.
/// [`process`](Parser::process) resets the instruction list, issue list and
/// name counters, but leaves the registry as the caller's responsibility
/// (`registry.clear()` between independent runs), since global
/// declarations persist after a run. Concurrent compilations require
/// separate instances.
#[derive(Debug, Default)]
pub struct Parser {
    /// Scoped symbol registry, left in its final state after `process`.
    pub registry: ScopeRegistry,
    /// Ordered IR instruction list, frozen once `process` returns.
    pub instructions: Vec<Instruction>,
    /// Ordered diagnostics from scanning, parsing and scope checking.
    pub issues: Vec<Issue>,
    tmp_counter: usize,
    lbl_counter: usize,
    // Undefined names already reported, so each is flagged once per run.
    undefined_seen: HashSet<String>,
}

impl Parser {
    /// Returns a builder with a fresh registry and empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all state, including the registry.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.instructions.clear();
        self.issues.clear();
        self.tmp_counter = 0;
        self.lbl_counter = 0;
        self.undefined_seen.clear();
    }

    /// Compiles `source` into the builder's instruction list, returning the
    /// syntax tree.
    ///
    /// Side effects: repopulates [`instructions`](Self::instructions) and
    /// [`issues`](Self::issues) from scratch and extends the registry with
    /// every declaration processed. Lexical issues are carried over from
    /// the scanner, in order, ahead of any parse diagnostics.
    pub fn process(&mut self, source: &str) -> Ast {
        self.instructions.clear();
        self.issues.clear();
        self.tmp_counter = 0;
        self.lbl_counter = 0;
        self.undefined_seen.clear();

        let (tokens, lex_issues) = lexer::scan(source);
        self.issues.extend(lex_issues);

        if tokens.is_empty() {
            self.issues.push(Issue::UnexpectedEof);
            return Ast::Program(Vec::new());
        }

        let mut iter = tokens.into_iter().peekable();
        let mut stmts = Vec::new();

        while iter.peek().is_some() {
            match self.parse_stmt(&mut iter) {
                Ok(stmt) => stmts.push(stmt),
                Err(issue) => {
                    self.issues.push(issue);
                    synchronize(&mut iter);
                }
            }
        }

        Ast::Program(stmts)
    }

    /// Allocates a fresh temporary name (`temp1`, `temp2`, ...).
    fn gen_temp(&mut self) -> String {
        self.tmp_counter += 1;
        format!("temp{}", self.tmp_counter)
    }

    /// Allocates a fresh label name (`Label1`, `Label2`, ...).
    fn gen_label(&mut self) -> String {
        self.lbl_counter += 1;
        format!("Label{}", self.lbl_counter)
    }

    fn emit(
        &mut self,
        op: OpCode,
        src1: Option<Operand>,
        src2: Option<Operand>,
        dst: Option<Operand>,
    ) {
        self.instructions.push(Instruction::new(op, src1, src2, dst));
    }

    /// Records an undefined reference, once per distinct name per run.
    fn report_undefined(&mut self, name: &str) {
        if self.registry.find(name).is_none() && self.undefined_seen.insert(name.to_string()) {
            self.issues.push(Issue::UndefinedVariable {
                name: name.to_string(),
            });
        }
    }

    fn parse_stmt(&mut self, iter: &mut TokenIter) -> Result<Stmt, Issue> {
        let Some(token) = iter.peek() else {
            return Err(Issue::UnexpectedEof);
        };

        match &token.kind {
            TokenKind::Keyword(kw) => match kw.as_str() {
                "int" | "float" => self.parse_declaration(iter),
                "print" => self.parse_print(iter),
                "if" => self.parse_conditional(iter),
                "while" => self.parse_loop(iter),
                "return" => self.parse_return(iter),
                _ => Err(unexpected(iter)),
            },
            TokenKind::Ident(_) => self.parse_assignment(iter),
            TokenKind::BraceOpen => self.parse_block(iter),
            _ => Err(unexpected(iter)),
        }
    }

    /// `("int" | "float") IDENT ("=" expr)? ";"`
    ///
    /// A redeclaration within the current frame is recorded and the
    /// statement becomes a no-op marker: the symbol is not registered and
    /// no `assign` is emitted (instructions already appended while the
    /// initializer expression reduced are kept, as with any recovered
    /// statement).
    fn parse_declaration(&mut self, iter: &mut TokenIter) -> Result<Stmt, Issue> {
        let ty = match iter.next() {
            Some(token) => match &token.kind {
                TokenKind::Keyword(kw) if kw == "float" => DeclType::Float,
                _ => DeclType::Int,
            },
            None => return Err(Issue::UnexpectedEof),
        };

        let name = expect_ident(iter)?;
        let redeclared = self.registry.is_declared_in_current_scope(&name);

        let mut init = None;

        if let Some(token) = iter.peek() {
            if token.kind == TokenKind::Operator(OperatorKind::Assign) {
                let _ = iter.next();
                init = Some(self.parse_expr(iter)?);
            }
        }

        expect(iter, &TokenKind::Semicolon)?;

        if redeclared {
            self.issues.push(Issue::Redeclaration { name: name.clone() });
            return Ok(Stmt::DeclError { ty, name });
        }

        self.registry
            .add(&name, ty, init.clone(), "declaration");

        if let Some(value) = init.clone() {
            self.emit(
                OpCode::Assign,
                Some(value),
                None,
                Some(Operand::Var(name.clone())),
            );
        }

        Ok(Stmt::Decl { ty, name, init })
    }

    /// `IDENT "=" expr ";"` — an undefined target is recorded but the
    /// `assign` is emitted regardless.
    fn parse_assignment(&mut self, iter: &mut TokenIter) -> Result<Stmt, Issue> {
        let name = expect_ident(iter)?;

        expect(iter, &TokenKind::Operator(OperatorKind::Assign))?;
        let value = self.parse_expr(iter)?;
        expect(iter, &TokenKind::Semicolon)?;

        self.report_undefined(&name);
        self.emit(
            OpCode::Assign,
            Some(value.clone()),
            None,
            Some(Operand::Var(name.clone())),
        );

        Ok(Stmt::Assign { name, value })
    }

    /// `"print" "(" expr ")" ";"`
    fn parse_print(&mut self, iter: &mut TokenIter) -> Result<Stmt, Issue> {
        let _ = iter.next();

        expect(iter, &TokenKind::ParenOpen)?;
        let value = self.parse_expr(iter)?;
        expect(iter, &TokenKind::ParenClose)?;
        expect(iter, &TokenKind::Semicolon)?;

        self.emit(OpCode::Output, Some(value.clone()), None, None);

        Ok(Stmt::Output(value))
    }

    /// `"if" "(" expr ")" block ("else" block)?`
    ///
    /// Lowering for the one-branch form:
    ///
    /// ```text
    /// jump_if_false cond, Lfalse
    /// <then-block>
    /// mark Lfalse
    /// ```
    ///
    /// and for the two-branch form:
    ///
    /// ```text
    /// jump_if_false cond, Lfalse
    /// <then-block>
    /// jump Lend
    /// mark Lfalse
    /// <else-block>
    /// mark Lend
    /// ```
    ///
    /// The branches are mutually exclusive; the else-block is reachable
    /// only through `Lfalse`.
    fn parse_conditional(&mut self, iter: &mut TokenIter) -> Result<Stmt, Issue> {
        let _ = iter.next();

        expect(iter, &TokenKind::ParenOpen)?;
        let cond = self.parse_expr(iter)?;
        expect(iter, &TokenKind::ParenClose)?;

        let lbl_false = self.gen_label();
        self.emit(
            OpCode::JumpIfFalse,
            Some(cond.clone()),
            Some(Operand::Label(lbl_false.clone())),
            None,
        );

        let then_branch = Box::new(self.parse_block(iter)?);

        let has_else = matches!(
            iter.peek(),
            Some(token) if matches!(&token.kind, TokenKind::Keyword(kw) if kw == "else")
        );

        if has_else {
            let _ = iter.next();

            let lbl_end = self.gen_label();
            self.emit(
                OpCode::Jump,
                Some(Operand::Label(lbl_end.clone())),
                None,
                None,
            );
            self.emit(OpCode::Mark, Some(Operand::Label(lbl_false)), None, None);

            let else_branch = Box::new(self.parse_block(iter)?);
            self.emit(OpCode::Mark, Some(Operand::Label(lbl_end)), None, None);

            Ok(Stmt::If {
                cond,
                then_branch,
                else_branch: Some(else_branch),
            })
        } else {
            self.emit(OpCode::Mark, Some(Operand::Label(lbl_false)), None, None);

            Ok(Stmt::If {
                cond,
                then_branch,
                else_branch: None,
            })
        }
    }

    /// `"while" "(" expr ")" block`
    ///
    /// Lowering:
    ///
    /// ```text
    /// mark Lstart
    /// <condition>
    /// jump_if_false cond, Lend
    /// <body>
    /// jump Lstart
    /// mark Lend
    /// ```
    ///
    /// The body instructions land between the conditional jump and the
    /// backward jump; the recursive descent into the body guarantees the
    /// ordering.
    fn parse_loop(&mut self, iter: &mut TokenIter) -> Result<Stmt, Issue> {
        let _ = iter.next();

        let lbl_start = self.gen_label();
        let lbl_end = self.gen_label();

        self.emit(
            OpCode::Mark,
            Some(Operand::Label(lbl_start.clone())),
            None,
            None,
        );

        expect(iter, &TokenKind::ParenOpen)?;
        let cond = self.parse_expr(iter)?;
        expect(iter, &TokenKind::ParenClose)?;

        self.emit(
            OpCode::JumpIfFalse,
            Some(cond.clone()),
            Some(Operand::Label(lbl_end.clone())),
            None,
        );

        let body = Box::new(self.parse_block(iter)?);

        self.emit(OpCode::Jump, Some(Operand::Label(lbl_start)), None, None);
        self.emit(OpCode::Mark, Some(Operand::Label(lbl_end)), None, None);

        Ok(Stmt::While { cond, body })
    }

    /// `"{" stmt* "}"` — a scope frame is pushed immediately after `{` is
    /// consumed and popped at `}`, so inner declarations are invisible
    /// outside.
    fn parse_block(&mut self, iter: &mut TokenIter) -> Result<Stmt, Issue> {
        expect(iter, &TokenKind::BraceOpen)?;
        self.registry.push_scope(None);

        let mut stmts = Vec::new();

        loop {
            match iter.peek() {
                None => {
                    if self.issues.last() != Some(&Issue::UnexpectedEof) {
                        self.issues.push(Issue::UnexpectedEof);
                    }
                    break;
                }
                Some(token) if token.kind == TokenKind::BraceClose => {
                    let _ = iter.next();
                    break;
                }
                Some(_) => match self.parse_stmt(iter) {
                    Ok(stmt) => stmts.push(stmt),
                    Err(issue) => {
                        self.issues.push(issue);
                        synchronize(iter);
                    }
                },
            }
        }

        self.registry.pop_scope();

        Ok(Stmt::Block(stmts))
    }

    /// `"return" expr? ";"`
    fn parse_return(&mut self, iter: &mut TokenIter) -> Result<Stmt, Issue> {
        let _ = iter.next();

        let value = match iter.peek() {
            Some(token) if token.kind == TokenKind::Semicolon => None,
            _ => Some(self.parse_expr(iter)?),
        };

        expect(iter, &TokenKind::Semicolon)?;

        self.emit(OpCode::Return, value.clone(), None, None);

        Ok(Stmt::Return(value))
    }

    /// `additive (relop additive)*` — the relational tier binds loosest.
    fn parse_expr(&mut self, iter: &mut TokenIter) -> Result<Operand, Issue> {
        let mut lhs = self.parse_additive(iter)?;

        while let Some(op) = match_operator(iter, &RELATIONAL_OPS) {
            let _ = iter.next();
            let rhs = self.parse_additive(iter)?;
            lhs = self.reduce_binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// `term (("+" | "-") term)*`
    fn parse_additive(&mut self, iter: &mut TokenIter) -> Result<Operand, Issue> {
        let mut lhs = self.parse_term(iter)?;

        while let Some(op) = match_operator(iter, &ADDITIVE_OPS) {
            let _ = iter.next();
            let rhs = self.parse_term(iter)?;
            lhs = self.reduce_binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// `atom (("*" | "/" | "%") atom)*`
    fn parse_term(&mut self, iter: &mut TokenIter) -> Result<Operand, Issue> {
        let mut lhs = self.parse_atom(iter)?;

        while let Some(op) = match_operator(iter, &TERM_OPS) {
            let _ = iter.next();
            let rhs = self.parse_atom(iter)?;
            lhs = self.reduce_binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// `INT | FLOAT | IDENT | "(" expr ")"`
    ///
    /// A non-atom token is reported but left in place, so recovery picks
    /// up from it.
    fn parse_atom(&mut self, iter: &mut TokenIter) -> Result<Operand, Issue> {
        let (kind, line) = match iter.peek() {
            Some(token) => (token.kind.clone(), token.loc.line),
            None => return Err(Issue::UnexpectedEof),
        };

        match kind {
            TokenKind::IntLiteral(v) => {
                let _ = iter.next();
                Ok(Operand::Int(v))
            }
            TokenKind::FloatLiteral(v) => {
                let _ = iter.next();
                Ok(Operand::Float(v))
            }
            TokenKind::Ident(name) => {
                let _ = iter.next();
                self.report_undefined(&name);
                Ok(Operand::Var(name))
            }
            TokenKind::ParenOpen => {
                let _ = iter.next();
                let inner = self.parse_expr(iter)?;
                expect(iter, &TokenKind::ParenClose)?;
                Ok(inner)
            }
            kind => Err(Issue::UnexpectedToken {
                token: format!("{kind:?}"),
                line,
            }),
        }
    }

    /// Reduces one binary operation: a fresh temporary and exactly one
    /// instruction; the temporary is the synthesized value for the
    /// enclosing production.
    fn reduce_binary(&mut self, op: OpCode, lhs: Operand, rhs: Operand) -> Operand {
        let tmp = self.gen_temp();

        self.emit(
            op,
            Some(lhs),
            Some(rhs),
            Some(Operand::Temp(tmp.clone())),
        );

        Operand::Temp(tmp)
    }
}

/// Advance the iterator past the expected token, or report what was found.
/// The offending token is left in place for resynchronization.
fn expect(iter: &mut TokenIter, expected: &TokenKind) -> Result<(), Issue> {
    match iter.peek() {
        Some(token) if token.kind == *expected => {
            let _ = iter.next();
            Ok(())
        }
        Some(token) => Err(Issue::UnexpectedToken {
            token: format!("{:?}", token.kind),
            line: token.loc.line,
        }),
        None => Err(Issue::UnexpectedEof),
    }
}

/// Advance the iterator past an identifier, returning its name.
fn expect_ident(iter: &mut TokenIter) -> Result<String, Issue> {
    match iter.peek() {
        Some(token) => {
            if let TokenKind::Ident(name) = &token.kind {
                let name = name.clone();
                let _ = iter.next();
                Ok(name)
            } else {
                Err(Issue::UnexpectedToken {
                    token: format!("{:?}", token.kind),
                    line: token.loc.line,
                })
            }
        }
        None => Err(Issue::UnexpectedEof),
    }
}

/// Consume the offending token so recovery always makes progress.
fn unexpected(iter: &mut TokenIter) -> Issue {
    iter.next().map_or(Issue::UnexpectedEof, |token| {
        Issue::UnexpectedToken {
            token: format!("{:?}", token.kind),
            line: token.loc.line,
        }
    })
}

/// Panic-mode recovery: skip to just past the next `;`, stopping early at
/// a `}` (left for the enclosing block) or end of input.
fn synchronize(iter: &mut TokenIter) {
    while let Some(token) = iter.peek() {
        match token.kind {
            TokenKind::BraceClose => return,
            TokenKind::Semicolon => {
                let _ = iter.next();
                return;
            }
            _ => {
                let _ = iter.next();
            }
        }
    }
}

/// Returns the opcode for the peeked operator when it is in `table`.
fn match_operator(iter: &mut TokenIter, table: &[(OperatorKind, OpCode)]) -> Option<OpCode> {
    let token = iter.peek()?;

    if let TokenKind::Operator(op) = token.kind {
        table.iter().find(|(kind, _)| *kind == op).map(|&(_, code)| code)
    } else {
        None
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ast::Program(stmts) => {
                writeln!(f, "Program")?;
                for stmt in stmts {
                    fmt_stmt(f, stmt, 1)?;
                }
                Ok(())
            }
        }
    }
}

fn fmt_stmt(f: &mut fmt::Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
    let pad = depth * 4;
    write!(f, "{:pad$}", "")?;

    match stmt {
        Stmt::Decl {
            ty,
            name,
            init: Some(value),
        } => writeln!(f, "decl {ty} '{name}' <- {value}"),
        Stmt::Decl { ty, name, init: None } => writeln!(f, "decl {ty} '{name}'"),
        Stmt::DeclError { ty, name } => writeln!(f, "decl-error {ty} '{name}'"),
        Stmt::Assign { name, value } => writeln!(f, "assign '{name}' <- {value}"),
        Stmt::Output(value) => writeln!(f, "output {value}"),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            writeln!(f, "if {cond}")?;
            fmt_stmt(f, then_branch, depth + 1)?;
            if let Some(else_branch) = else_branch {
                writeln!(f, "{:pad$}else", "")?;
                fmt_stmt(f, else_branch, depth + 1)?;
            }
            Ok(())
        }
        Stmt::While { cond, body } => {
            writeln!(f, "while {cond}")?;
            fmt_stmt(f, body, depth + 1)
        }
        Stmt::Block(stmts) => {
            writeln!(f, "block")?;
            for stmt in stmts {
                fmt_stmt(f, stmt, depth + 1)?;
            }
            Ok(())
        }
        Stmt::Return(Some(value)) => writeln!(f, "return {value}"),
        Stmt::Return(None) => writeln!(f, "return"),
    }
}
