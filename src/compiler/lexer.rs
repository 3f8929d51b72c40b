//! Lexical Analysis
//!
//! Compiler pass that tokenizes a source program, eagerly producing the
//! full token sequence together with every lexical issue encountered. The
//! scanner never aborts: an unrecognized character is recorded and skipped,
//! and scanning resumes with the next one.

use std::fmt;

use crate::compiler::issue::Issue;

/// Reserved words of the language.
///
/// `for` is reserved but has no grammar production; it surfaces downstream
/// as a syntax issue.
pub const KEYWORDS: [&str; 8] = [
    "if", "else", "while", "for", "int", "float", "return", "print",
];

/// Types of operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    /// `+` addition operator.
    Plus,
    /// `-` subtraction operator.
    Minus,
    /// `*` multiplication operator.
    Asterisk,
    /// `/` division operator.
    Division,
    /// `%` remainder operator.
    Remainder,
    /// `=` assignment operator.
    Assign,
    /// `==` equal-to relational operator.
    Eq,
    /// `!=` not-equal relational operator.
    NotEq,
    /// `<` less-than relational operator.
    LessThan,
    /// `<=` less-than-or-equal relational operator.
    LessThanEq,
    /// `>` greater-than relational operator.
    GreaterThan,
    /// `>=` greater-than-or-equal relational operator.
    GreaterThanEq,
}

impl OperatorKind {
    /// Returns the operator's source spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::Plus => "+",
            OperatorKind::Minus => "-",
            OperatorKind::Asterisk => "*",
            OperatorKind::Division => "/",
            OperatorKind::Remainder => "%",
            OperatorKind::Assign => "=",
            OperatorKind::Eq => "==",
            OperatorKind::NotEq => "!=",
            OperatorKind::LessThan => "<",
            OperatorKind::LessThanEq => "<=",
            OperatorKind::GreaterThan => ">",
            OperatorKind::GreaterThanEq => ">=",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op('{}')", self.as_str())
    }
}

/// Types of lexical elements.
#[derive(Clone, PartialEq)]
#[allow(missing_docs)]
pub enum TokenKind {
    Keyword(String),
    Ident(String),
    IntLiteral(i64),
    FloatLiteral(f64),
    Operator(OperatorKind),
    ParenOpen,
    ParenClose,
    BraceOpen,
    BraceClose,
    Semicolon,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(s) => write!(f, "keyword({s:?})"),
            TokenKind::Ident(s) => write!(f, "ident({s:?})"),
            TokenKind::IntLiteral(v) => write!(f, "int(\"{v}\")"),
            TokenKind::FloatLiteral(v) => write!(f, "decimal(\"{v}\")"),
            TokenKind::Operator(op) => fmt::Display::fmt(op, f),
            TokenKind::ParenOpen => write!(f, "'('"),
            TokenKind::ParenClose => write!(f, "')'"),
            TokenKind::BraceOpen => write!(f, "'{{'"),
            TokenKind::BraceClose => write!(f, "'}}'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Comma => write!(f, "','"),
        }
    }
}

impl fmt::Debug for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(s) | TokenKind::Ident(s) => write!(f, "{s}"),
            TokenKind::IntLiteral(v) => write!(f, "{v}"),
            TokenKind::FloatLiteral(v) => write!(f, "{v}"),
            TokenKind::Operator(op) => write!(f, "{}", op.as_str()),
            TokenKind::ParenOpen => write!(f, "("),
            TokenKind::ParenClose => write!(f, ")"),
            TokenKind::BraceOpen => write!(f, "{{"),
            TokenKind::BraceClose => write!(f, "}}"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Comma => write!(f, ","),
        }
    }
}

/// Source location of a processed `Token` (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

/// Minimal lexical element.
#[derive(Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Location,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}\t    {}", self.loc.line, self.loc.col, self.kind)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)
    }
}

/// Scans `source`, returning the eagerly-materialized token sequence and
/// every lexical issue encountered, in discovery order.
///
/// The scanner is total: each input character becomes part of a token, is
/// whitespace or a comment, or is recorded as an issue and skipped. Each
/// call works on fresh cursor state, so the function is re-entrant.
#[must_use]
pub fn scan(source: &str) -> (Vec<Token>, Vec<Issue>) {
    Scanner::new(source).run()
}

/// Cursor state for one scan.
struct Scanner {
    src: Vec<char>,
    cur: usize,
    // Index of the first character of the current line, used to compute
    // 1-based columns.
    bol: usize,
    line: usize,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            src: source.chars().collect(),
            cur: 0,
            bol: 0,
            line: 1,
        }
    }

    fn run(mut self) -> (Vec<Token>, Vec<Issue>) {
        let mut tokens = Vec::new();
        let mut issues = Vec::new();

        while self.has_next() {
            let loc = Location {
                line: self.line,
                col: self.col(),
            };

            match self.first() {
                '\n' => {
                    self.cur += 1;
                    self.bol = self.cur;
                    self.line += 1;
                }
                c if c.is_whitespace() => self.cur += 1,
                '0'..='9' => tokens.push(self.consume_number(loc, &mut issues)),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    tokens.push(self.consume_ident(loc));
                }
                '/' => {
                    if let Some(token) = self.consume_comment_or_divide(loc) {
                        tokens.push(token);
                    }
                }
                '=' => tokens.push(self.consume_operator(
                    loc,
                    OperatorKind::Assign,
                    OperatorKind::Eq,
                )),
                '<' => tokens.push(self.consume_operator(
                    loc,
                    OperatorKind::LessThan,
                    OperatorKind::LessThanEq,
                )),
                '>' => tokens.push(self.consume_operator(
                    loc,
                    OperatorKind::GreaterThan,
                    OperatorKind::GreaterThanEq,
                )),
                '!' => {
                    // `!` only exists as the prefix of `!=`; alone it is not
                    // part of the alphabet.
                    if self.peek(1) == Some('=') {
                        self.cur += 2;
                        tokens.push(Token {
                            kind: TokenKind::Operator(OperatorKind::NotEq),
                            loc,
                        });
                    } else {
                        self.cur += 1;
                        issues.push(Issue::InvalidCharacter {
                            character: '!',
                            line: loc.line,
                            column: loc.col,
                        });
                    }
                }
                '+' => tokens.push(self.consume_single(loc, OperatorKind::Plus)),
                '-' => tokens.push(self.consume_single(loc, OperatorKind::Minus)),
                '*' => tokens.push(self.consume_single(loc, OperatorKind::Asterisk)),
                '%' => tokens.push(self.consume_single(loc, OperatorKind::Remainder)),
                '(' => tokens.push(self.consume_punct(loc, TokenKind::ParenOpen)),
                ')' => tokens.push(self.consume_punct(loc, TokenKind::ParenClose)),
                '{' => tokens.push(self.consume_punct(loc, TokenKind::BraceOpen)),
                '}' => tokens.push(self.consume_punct(loc, TokenKind::BraceClose)),
                ';' => tokens.push(self.consume_punct(loc, TokenKind::Semicolon)),
                ',' => tokens.push(self.consume_punct(loc, TokenKind::Comma)),
                c => {
                    // Record the stray character and skip exactly one.
                    self.cur += 1;
                    issues.push(Issue::InvalidCharacter {
                        character: c,
                        line: loc.line,
                        column: loc.col,
                    });
                }
            }
        }

        (tokens, issues)
    }

    /// Consumes an integer or decimal literal. Decimal literals
    /// (`\d+\.\d+`) take precedence so that `3.14` never splits into the
    /// integer `3` and a stray `.`.
    fn consume_number(&mut self, loc: Location, issues: &mut Vec<Issue>) -> Token {
        let start = self.cur;

        while self.has_next() && self.first().is_ascii_digit() {
            self.cur += 1;
        }

        let is_decimal =
            self.first_is('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit());

        if is_decimal {
            // Consume the '.' and the fractional digits.
            self.cur += 1;
            while self.has_next() && self.first().is_ascii_digit() {
                self.cur += 1;
            }

            let literal: String = self.src[start..self.cur].iter().collect();
            let value = literal.parse::<f64>().unwrap_or_else(|_| {
                issues.push(Issue::InvalidDecimalLiteral {
                    literal: literal.clone(),
                    line: loc.line,
                });
                0.0
            });

            return Token {
                kind: TokenKind::FloatLiteral(value),
                loc,
            };
        }

        let literal: String = self.src[start..self.cur].iter().collect();
        let value = literal.parse::<i64>().unwrap_or_else(|_| {
            issues.push(Issue::InvalidIntegerLiteral {
                literal: literal.clone(),
                line: loc.line,
            });
            0
        });

        Token {
            kind: TokenKind::IntLiteral(value),
            loc,
        }
    }

    /// Consumes an identifier, classifying it against the keyword table.
    fn consume_ident(&mut self, loc: Location) -> Token {
        let start = self.cur;

        while self.has_next() && (self.first().is_ascii_alphanumeric() || self.first() == '_') {
            self.cur += 1;
        }

        let word: String = self.src[start..self.cur].iter().collect();

        let kind = if KEYWORDS.contains(&word.as_str()) {
            TokenKind::Keyword(word)
        } else {
            TokenKind::Ident(word)
        };

        Token { kind, loc }
    }

    /// Consumes a `//` or `/* */` comment silently, or produces a divide
    /// token. Comment recognition takes precedence over the operator; an
    /// unterminated block comment falls back to the operator, leaving the
    /// `*` to be scanned on its own.
    fn consume_comment_or_divide(&mut self, loc: Location) -> Option<Token> {
        match self.peek(1) {
            Some('/') => {
                while self.has_next() && self.first() != '\n' {
                    self.cur += 1;
                }
                None
            }
            Some('*') => {
                if let Some(close) = self.find_comment_close() {
                    // Newlines inside the comment advance the line counter.
                    let mut i = self.cur + 2;
                    while i < close {
                        if self.src[i] == '\n' {
                            self.line += 1;
                            self.bol = i + 1;
                        }
                        i += 1;
                    }
                    self.cur = close + 2;
                    None
                } else {
                    self.cur += 1;
                    Some(Token {
                        kind: TokenKind::Operator(OperatorKind::Division),
                        loc,
                    })
                }
            }
            _ => {
                self.cur += 1;
                Some(Token {
                    kind: TokenKind::Operator(OperatorKind::Division),
                    loc,
                })
            }
        }
    }

    /// Consumes a one- or two-character operator, trying the `=`-suffixed
    /// form first.
    fn consume_operator(&mut self, loc: Location, single: OperatorKind, eq: OperatorKind) -> Token {
        let kind = if self.peek(1) == Some('=') {
            self.cur += 2;
            TokenKind::Operator(eq)
        } else {
            self.cur += 1;
            TokenKind::Operator(single)
        };

        Token { kind, loc }
    }

    fn consume_single(&mut self, loc: Location, op: OperatorKind) -> Token {
        self.cur += 1;
        Token {
            kind: TokenKind::Operator(op),
            loc,
        }
    }

    fn consume_punct(&mut self, loc: Location, kind: TokenKind) -> Token {
        self.cur += 1;
        Token { kind, loc }
    }

    /// Returns the index of the `*` in the next `*/`, if the block comment
    /// starting at the cursor is terminated.
    fn find_comment_close(&self) -> Option<usize> {
        let mut i = self.cur + 2;
        while i + 1 < self.src.len() {
            if self.src[i] == '*' && self.src[i + 1] == '/' {
                return Some(i);
            }
            i += 1;
        }
        None
    }

    /// Returns the current 1-based column: the distance from the previous
    /// newline, or offset + 1 on the first line.
    #[inline]
    const fn col(&self) -> usize {
        self.cur - self.bol + 1
    }

    #[inline]
    fn first(&self) -> char {
        self.src[self.cur]
    }

    #[inline]
    fn first_is(&self, c: char) -> bool {
        self.has_next() && self.first() == c
    }

    #[inline]
    fn peek(&self, n: usize) -> Option<char> {
        self.src.get(self.cur + n).copied()
    }

    #[inline]
    fn has_next(&self) -> bool {
        self.cur < self.src.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_decimal_literal_as_one_token() {
        let (tokens, issues) = scan("3.14");

        assert!(issues.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::FloatLiteral(3.14));
    }

    #[test]
    fn scan_decimal_before_integer() {
        let (tokens, issues) = scan("3.14 42");

        assert!(issues.is_empty());
        assert_eq!(
            tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![TokenKind::FloatLiteral(3.14), TokenKind::IntLiteral(42)]
        );
    }

    #[test]
    fn scan_multi_char_operators_before_prefixes() {
        let (tokens, issues) = scan("a<=b==c>=d");

        assert!(issues.is_empty());
        assert_eq!(
            tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Operator(OperatorKind::LessThanEq),
                TokenKind::Ident("b".into()),
                TokenKind::Operator(OperatorKind::Eq),
                TokenKind::Ident("c".into()),
                TokenKind::Operator(OperatorKind::GreaterThanEq),
                TokenKind::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn scan_keywords_classified_by_table() {
        let (tokens, _) = scan("int while foo print");

        assert_eq!(
            tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![
                TokenKind::Keyword("int".into()),
                TokenKind::Keyword("while".into()),
                TokenKind::Ident("foo".into()),
                TokenKind::Keyword("print".into()),
            ]
        );
    }

    #[test]
    fn scan_line_comment_consumed_silently() {
        let (tokens, issues) = scan("x // trailing / * comment\ny");

        assert!(issues.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].loc.line, 1);
        assert_eq!(tokens[1].loc.line, 2);
    }

    #[test]
    fn scan_block_comment_advances_line_counter() {
        let (tokens, issues) = scan("/* a\nb\nc */ x");

        assert!(issues.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Ident("x".into()));
        assert_eq!(tokens[0].loc.line, 3);
        assert_eq!(tokens[0].loc.col, 6);
    }

    #[test]
    fn scan_unterminated_block_comment_falls_back_to_divide() {
        let (tokens, issues) = scan("1 /* 2");

        assert!(issues.is_empty());
        assert_eq!(
            tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![
                TokenKind::IntLiteral(1),
                TokenKind::Operator(OperatorKind::Division),
                TokenKind::Operator(OperatorKind::Asterisk),
                TokenKind::IntLiteral(2),
            ]
        );
    }

    #[test]
    fn scan_invalid_character_recorded_and_continues() {
        let (tokens, issues) = scan("a @ b");

        assert_eq!(
            issues,
            vec![Issue::InvalidCharacter {
                character: '@',
                line: 1,
                column: 3,
            }]
        );
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn scan_column_counted_from_previous_newline() {
        let (_, issues) = scan("ab\n  @");

        assert_eq!(
            issues,
            vec![Issue::InvalidCharacter {
                character: '@',
                line: 2,
                column: 3,
            }]
        );
    }

    #[test]
    fn scan_bang_without_equal_is_invalid() {
        let (tokens, issues) = scan("a ! b");

        assert_eq!(tokens.len(), 2);
        assert_eq!(
            issues,
            vec![Issue::InvalidCharacter {
                character: '!',
                line: 1,
                column: 3,
            }]
        );
    }

    #[test]
    fn scan_integer_overflow_recorded() {
        let (tokens, issues) = scan("99999999999999999999");

        assert_eq!(tokens[0].kind, TokenKind::IntLiteral(0));
        assert_eq!(
            issues,
            vec![Issue::InvalidIntegerLiteral {
                literal: "99999999999999999999".into(),
                line: 1,
            }]
        );
    }

    #[test]
    fn scan_is_reentrant() {
        let source = "int x;\nx = 1;";
        let (first, _) = scan(source);
        let (second, _) = scan(source);

        assert_eq!(first, second);
        assert_eq!(first[3].loc.line, 2);
    }
}
