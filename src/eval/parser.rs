/*!
 * Expression Parser
 * Tokenizer and recursive-descent parser for debugger expressions
 *
 * Grammar, lowest precedence first:
 *   or    := and { "or" and }
 *   and   := not { "and" not }
 *   not   := "not" not | cmp
 *   cmp   := add [ ("=" | "<>" | "<" | "<=" | ">" | ">=") add ]
 *   add   := mul { ("+" | "-" | "^") mul }
 *   mul   := unary { ("*" | "/" | "div" | "mod" | "rem") unary }
 *   unary := "-" unary | "len" unary | apply
 *   apply := primary { "(" or ")" }
 */

use super::value::Value;
use crate::core::errors::{EvalResult, EvaluationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Len,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Mod,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    SeqEnum(Vec<Expr>),
    /// Sequence index, 1-based: `s(i)`
    Apply(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Str(String),
    Ident(String),
    Sym(&'static str),
}

const SYMBOLS: [&str; 16] = [
    "<>", "<=", ">=", "=", "<", ">", "+", "-", "*", "/", "^", "(", ")", "[", "]", ",",
];

fn tokenize(text: &str) -> EvalResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let digits: String = chars[start..i].iter().collect();
            let n = digits
                .parse()
                .map_err(|_| EvaluationError::Parse(format!("number too large: {}", digits)))?;
            tokens.push(Token::Int(n));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '\'') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if c == '"' {
            let start = i + 1;
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(EvaluationError::Parse("unterminated string".to_string()));
            }
            tokens.push(Token::Str(chars[start..i].iter().collect()));
            i += 1;
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let sym = SYMBOLS
                .iter()
                .find(|sym| rest.starts_with(*sym))
                .ok_or_else(|| EvaluationError::Parse(format!("unexpected character '{}'", c)))?;
            tokens.push(Token::Sym(*sym));
            i += sym.chars().count();
        }
    }

    Ok(tokens)
}

/// Parse a complete expression
pub fn parse(text: &str) -> EvalResult<Expr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(EvaluationError::Parse("empty expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(EvaluationError::Parse(format!(
            "unexpected {} after expression",
            describe(token)
        ))),
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(n) => format!("'{}'", n),
        Token::Str(s) => format!("\"{}\"", s),
        Token::Ident(name) => format!("'{}'", name),
        Token::Sym(sym) => format!("'{}'", sym),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_sym(&mut self, sym: &str) -> bool {
        if matches!(self.peek(), Some(Token::Sym(s)) if *s == sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: &str) -> EvalResult<()> {
        if self.eat_sym(sym) {
            Ok(())
        } else {
            let found = self
                .peek()
                .map(describe)
                .unwrap_or_else(|| "end of expression".to_string());
            Err(EvaluationError::Parse(format!("expected '{}', found {}", sym, found)))
        }
    }

    fn or(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.and()?;
        while self.eat_word("or") {
            let rhs = self.and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.not()?;
        while self.eat_word("and") {
            let rhs = self.not()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> EvalResult<Expr> {
        if self.eat_word("not") {
            let operand = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.cmp()
    }

    fn cmp(&mut self) -> EvalResult<Expr> {
        let lhs = self.add()?;
        let op = match self.peek() {
            Some(Token::Sym("=")) => BinaryOp::Eq,
            Some(Token::Sym("<>")) => BinaryOp::Ne,
            Some(Token::Sym("<")) => BinaryOp::Lt,
            Some(Token::Sym("<=")) => BinaryOp::Le,
            Some(Token::Sym(">")) => BinaryOp::Gt,
            Some(Token::Sym(">=")) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.add()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn add(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Sym("+")) => BinaryOp::Add,
                Some(Token::Sym("-")) => BinaryOp::Sub,
                Some(Token::Sym("^")) => BinaryOp::Concat,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn mul(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Sym("*")) => BinaryOp::Mul,
                Some(Token::Sym("/")) => BinaryOp::Div,
                Some(Token::Ident(w)) if w == "div" => BinaryOp::Div,
                Some(Token::Ident(w)) if w == "mod" => BinaryOp::Mod,
                Some(Token::Ident(w)) if w == "rem" => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> EvalResult<Expr> {
        if self.eat_sym("-") {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        if self.eat_word("len") {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Len, Box::new(operand)));
        }
        let mut expr = self.primary()?;
        while self.eat_sym("(") {
            let index = self.or()?;
            self.expect_sym(")")?;
            expr = Expr::Apply(Box::new(expr), Box::new(index));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> EvalResult<Expr> {
        match self.next() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::Int(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Ident(word)) => Ok(match word.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "nil" => Expr::Literal(Value::Nil),
                _ => Expr::Name(word),
            }),
            Some(Token::Sym("(")) => {
                let inner = self.or()?;
                self.expect_sym(")")?;
                Ok(inner)
            }
            Some(Token::Sym("[")) => {
                let mut items = Vec::new();
                if !self.eat_sym("]") {
                    loop {
                        items.push(self.or()?);
                        if self.eat_sym("]") {
                            break;
                        }
                        self.expect_sym(",")?;
                    }
                }
                Ok(Expr::SeqEnum(items))
            }
            Some(token) => Err(EvaluationError::Parse(format!(
                "unexpected {}",
                describe(&token)
            ))),
            None => Err(EvaluationError::Parse("unexpected end of expression".to_string())),
        }
    }
}
