//! Infix antecedent expressions: `a & !(b | c)`.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or   := and ('|' and)*
//! and  := not ('&' not)*
//! not  := '!' not | atom
//! atom := name | '(' or ')'
//! name := [A-Za-z0-9_.:]+
//! ```
//!
//! `and`, `or` and `not` are accepted as keyword spellings of the operators.

use crate::id::FactId;
use crate::knowledge::LeftHandSide;

/// Parsed expression over fact names, with byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Name { name: String, offset: usize },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// A syntax error at `offset..offset + len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    pub message: String,
    pub offset: usize,
    pub len: usize,
}

impl Expr {
    /// Resolve fact names to ids. On failure returns the unresolved name and
    /// its offset.
    pub fn resolve<F>(&self, lookup: &F) -> Result<LeftHandSide, (String, usize)>
    where
        F: Fn(&str) -> Option<FactId>,
    {
        Ok(match self {
            Expr::Name { name, offset } => {
                LeftHandSide::Fact(lookup(name).ok_or_else(|| (name.clone(), *offset))?)
            }
            Expr::And(l, r) => LeftHandSide::and(l.resolve(lookup)?, r.resolve(lookup)?),
            Expr::Or(l, r) => LeftHandSide::or(l.resolve(lookup)?, r.resolve(lookup)?),
            Expr::Not(c) => LeftHandSide::negate(c.resolve(lookup)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    And,
    Or,
    Not,
    Open,
    Close,
}

fn tokenize(src: &str) -> Result<Vec<(Token, usize, usize)>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '&' => Token::And,
            '|' => Token::Or,
            '!' => Token::Not,
            '(' => Token::Open,
            ')' => Token::Close,
            c if is_name_char(c) => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !is_name_char(c) {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                let word = &src[start..end];
                let token = match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Name(word.to_string()),
                };
                tokens.push((token, start, end - start));
                continue;
            }
            other => {
                return Err(ExprError {
                    message: format!("unexpected character '{other}'"),
                    offset: start,
                    len: other.len_utf8(),
                });
            }
        };
        chars.next();
        tokens.push((token, start, c.len_utf8()));
    }
    Ok(tokens)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | ':')
}

struct Parser {
    tokens: Vec<(Token, usize, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _, _)| t)
    }

    fn error_here(&self, message: &str) -> ExprError {
        match self.tokens.get(self.pos) {
            Some((_, offset, len)) => ExprError {
                message: message.to_string(),
                offset: *offset,
                len: *len,
            },
            None => ExprError {
                message: message.to_string(),
                offset: self.end,
                len: 0,
            },
        }
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        match self.tokens.get(self.pos).cloned() {
            Some((Token::Name(name), offset, _)) => {
                self.pos += 1;
                Ok(Expr::Name { name, offset })
            }
            Some((Token::Open, _, _)) => {
                self.pos += 1;
                let inner = self.or()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(self.error_here("expected ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            _ => Err(self.error_here("expected a fact name, '!' or '('")),
        }
    }
}

/// Parse an infix antecedent expression.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
        end: src.len(),
    };
    let expr = parser.or()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error_here("unexpected trailing input"));
    }
    Ok(expr)
}
