//! Custom column expressions.
//!
//! A restricted arithmetic language over named columns:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := '-' factor | number | '[' column ']' | '(' expr ')'
//! ```
//!
//! Expressions are parsed once when a strategy document is loaded and
//! evaluated element-wise against a table. Column names may contain any
//! character except `]`. Identifiers outside brackets are rejected; any
//! operator outside `+ - * /` fails with `InvalidOperator`.

use crate::domain::FeatureTable;
use crate::error::PrepError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            _ => None,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Const(f64),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, PrepError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    /// Column names referenced by the expression, in first-use order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Const(_) => {}
            Expr::Neg(inner) => inner.collect_columns(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
        }
    }

    /// Evaluate element-wise over the table's rows.
    ///
    /// Division follows IEEE semantics: x/0 is ±inf, 0/0 is NaN.
    pub fn evaluate(&self, table: &FeatureTable) -> Result<Vec<f64>, PrepError> {
        match self {
            Expr::Column(name) => Ok(table.require_column(name)?.to_vec()),
            Expr::Const(v) => Ok(vec![*v; table.height()]),
            Expr::Neg(inner) => Ok(inner.evaluate(table)?.into_iter().map(|v| -v).collect()),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.evaluate(table)?;
                let b = rhs.evaluate(table)?;
                Ok(a.into_iter().zip(b).map(|(x, y)| op.apply(x, y)).collect())
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "[{name}]"),
            Expr::Const(v) => write!(f, "{v}"),
            Expr::Neg(inner) => write!(f, "-({inner})"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

// ── Tokenizer ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Column(String),
    Number(f64),
    Op(BinaryOp),
    LParen,
    RParen,
}

fn is_operator_char(c: char) -> bool {
    !(c.is_whitespace() || c.is_alphanumeric() || matches!(c, '[' | ']' | '(' | ')' | '.' | '_'))
}

fn tokenize(source: &str) -> Result<Vec<Token>, PrepError> {
    let invalid = |reason: String| PrepError::InvalidExpression {
        expression: source.to_string(),
        reason,
    };

    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '[' => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(invalid(format!("unterminated column reference at {start}")));
                }
                if name.is_empty() {
                    return Err(invalid(format!("empty column reference at {start}")));
                }
                tokens.push(Token::Column(name));
            }
            ']' => return Err(invalid(format!("unmatched ']' at {start}"))),
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("bad numeric literal '{literal}'")))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                return Err(invalid(format!(
                    "identifier '{ident}' outside brackets; reference columns as [{ident}]"
                )));
            }
            _ => {
                chars.next();
                let mut symbol = String::from(c);
                if let Some(op) = BinaryOp::from_symbol(&symbol) {
                    // `**` and `//` are operators of their own, not two tokens
                    let doubled = matches!(c, '*' | '/') && chars.peek().is_some_and(|&(_, n)| n == c);
                    if !doubled {
                        tokens.push(Token::Op(op));
                        continue;
                    }
                    symbol.push(c);
                } else {
                    while let Some(&(_, c)) = chars.peek() {
                        if is_operator_char(c) && BinaryOp::from_symbol(&c.to_string()).is_none() {
                            symbol.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                return Err(PrepError::InvalidOperator {
                    expression: source.to_string(),
                    operator: symbol,
                });
            }
        }
    }

    Ok(tokens)
}

// ── Parser ──────────────────────────────────────────────────────────

struct Parser<'s, 't> {
    source: &'s str,
    tokens: &'t [Token],
    pos: usize,
}

impl Parser<'_, '_> {
    fn error(&self, reason: &str) -> PrepError {
        PrepError::InvalidExpression {
            expression: self.source.to_string(),
            reason: format!("{reason} (token {})", self.pos),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_op(&self, allowed: [BinaryOp; 2]) -> Option<BinaryOp> {
        match self.peek() {
            Some(Token::Op(op)) if allowed.contains(op) => Some(*op),
            _ => None,
        }
    }

    fn expr(&mut self) -> Result<Expr, PrepError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek_op([BinaryOp::Add, BinaryOp::Sub]) {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, PrepError> {
        let mut lhs = self.factor()?;
        while let Some(op) = self.peek_op([BinaryOp::Mul, BinaryOp::Div]) {
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, PrepError> {
        let token = self.peek().cloned().ok_or_else(|| self.error("unexpected end of expression"))?;
        self.pos += 1;
        match token {
            Token::Op(BinaryOp::Sub) => Ok(Expr::Neg(Box::new(self.factor()?))),
            Token::Number(v) => Ok(Expr::Const(v)),
            Token::Column(name) => Ok(Expr::Column(name)),
            Token::LParen => {
                let inner = self.expr()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(self.error("expected ')'")),
                }
            }
            Token::Op(_) | Token::RParen => {
                self.pos -= 1;
                Err(self.error("expected a column, number or '('"))
            }
        }
    }
}
