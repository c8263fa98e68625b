//! Syntax tree and recursive-descent parser.
//!
//! Precedence, lowest first: `,` then `^` then `+ -` then `* /` then unary
//! `-` then `**` then postfix calls, subscripts and attributes.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use super::EvalError;
use super::lexer::{Spanned, Token, tokenize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Xor,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "**",
            BinOp::Xor => "^",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    Name(String),
    Tuple(Vec<Expr>),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Subscript {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Attribute {
        target: Box<Expr>,
        name: String,
    },
}

/// Deepest syntax tree the parser builds. Parentheses, calls, subscripts,
/// attributes, unary minus and every binary operator add one level.
pub(crate) const MAX_DEPTH: usize = 100;

/// Parses a complete expression.
pub(crate) fn parse(src: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(src)?;
    let mut parser = AstParser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

struct AstParser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl AstParser {
    #[inline]
    fn peek(&self) -> &Token {
        // `tokenize` always ends with `Token::End`.
        self.tokens
            .get(self.pos)
            .map_or(&Token::End, |spanned| &spanned.token)
    }

    #[inline]
    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(0, |spanned| spanned.position)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> EvalError {
        match self.peek() {
            Token::Unsupported(component) => EvalError::UnsupportedGrammarComponent {
                component: *component,
            },
            Token::End => EvalError::syntax("unexpected end of expression", self.position()),
            token => EvalError::syntax(alloc::format!("unexpected token {token:?}"), self.position()),
        }
    }

    /// Adds one level to the tree being built.
    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::ExpressionTooDeep { max: MAX_DEPTH });
        }
        Ok(())
    }

    /// Runs `f` one level down.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, EvalError>) -> Result<T, EvalError> {
        self.descend()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expect(&mut self, token: &Token) -> Result<(), EvalError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_end(&self) -> Result<(), EvalError> {
        match self.peek() {
            Token::End => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    /// Tokens that may start an operand.
    fn starts_operand(&self) -> bool {
        matches!(
            self.peek(),
            Token::Int(_)
                | Token::Float(_)
                | Token::Str(_)
                | Token::Name(_)
                | Token::Minus
                | Token::Plus
                | Token::LParen
                | Token::LBracket
                | Token::Star
                | Token::StarStar
                | Token::Unsupported(_)
        )
    }

    /// `xor (',' xor)* [',']`
    fn expression(&mut self) -> Result<Expr, EvalError> {
        let first = self.xor()?;
        if self.peek() != &Token::Comma {
            return Ok(first);
        }
        let mut items = alloc::vec![first];
        while self.eat(&Token::Comma) {
            if !self.starts_operand() {
                break;
            }
            items.push(self.xor()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn xor(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut lhs = self.arith()?;
        while self.eat(&Token::Caret) {
            self.descend()?;
            let rhs = self.arith()?;
            lhs = binary(BinOp::Xor, lhs, rhs);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn arith(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Token::Minus => {
                self.pos += 1;
                let operand = self.nested(Self::unary)?;
                Ok(Expr::Neg(Box::new(operand)))
            }
            Token::Plus => Err(EvalError::UnsupportedGrammarComponent {
                component: "unary plus",
            }),
            _ => self.power(),
        }
    }

    /// `postfix ['**' unary]`, so `-2**2` is `-(2**2)` and `2**-1` parses.
    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.postfix()?;
        if self.eat(&Token::StarStar) {
            let exponent = self.nested(Self::unary)?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut expr = self.atom()?;
        loop {
            if matches!(self.peek(), Token::LParen | Token::LBracket | Token::Dot) {
                self.descend()?;
            }
            match self.peek() {
                Token::LParen => {
                    self.pos += 1;
                    let (args, kwargs) = self.arguments()?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                        kwargs,
                    };
                }
                Token::LBracket => {
                    self.pos += 1;
                    let index = self.expression()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Subscript {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Token::Dot => {
                    self.pos += 1;
                    let Token::Name(name) = self.bump() else {
                        return Err(EvalError::syntax("expected an attribute name", self.position()));
                    };
                    expr = Expr::Attribute {
                        target: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        self.depth = depth;
        Ok(expr)
    }

    /// Arguments after `(`, consuming the closing `)`.
    fn arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), EvalError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();

        while !self.eat(&Token::RParen) {
            if matches!(self.peek(), Token::Star | Token::StarStar) {
                return Err(EvalError::UnsupportedGrammarComponent {
                    component: "argument unpacking",
                });
            }
            let keyword = match (self.peek(), self.tokens.get(self.pos + 1)) {
                (Token::Name(name), Some(next)) if next.token == Token::Assign => Some(name.clone()),
                _ => None,
            };
            match keyword {
                Some(name) => {
                    self.pos += 2;
                    if kwargs.iter().any(|(k, _)| *k == name) {
                        return Err(EvalError::syntax(
                            alloc::format!("keyword argument `{name}` repeated"),
                            self.position(),
                        ));
                    }
                    kwargs.push((name, self.xor()?));
                }
                None if !kwargs.is_empty() => {
                    return Err(EvalError::syntax(
                        "positional argument follows keyword argument",
                        self.position(),
                    ));
                }
                None => args.push(self.xor()?),
            }
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RParen)?;
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn atom(&mut self) -> Result<Expr, EvalError> {
        let position = self.position();
        match self.bump() {
            Token::Int(i) => Ok(Expr::Int(i)),
            Token::Float(f) => Ok(Expr::Float(f)),
            Token::Str(mut s) => {
                // Adjacent literals concatenate.
                while let Token::Str(next) = self.peek() {
                    s.push_str(next);
                    self.pos += 1;
                }
                Ok(Expr::Str(s))
            }
            Token::Name(name) => Ok(match name.as_str() {
                "True" => Expr::Bool(true),
                "False" => Expr::Bool(false),
                "None" => Expr::None,
                _ => Expr::Name(name),
            }),
            Token::LParen => {
                if self.eat(&Token::RParen) {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let expr = self.nested(Self::expression)?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => Err(EvalError::UnsupportedGrammarComponent {
                component: "list display",
            }),
            Token::Unsupported(component) => Err(EvalError::UnsupportedGrammarComponent { component }),
            Token::End => Err(EvalError::syntax("unexpected end of expression", position)),
            token => Err(EvalError::syntax(
                alloc::format!("unexpected token {token:?}"),
                position,
            )),
        }
    }
}

#[inline]
fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn power_binds_tighter_than_negation() {
        assert_eq!(
            parse("-2**2").unwrap(),
            Expr::Neg(Box::new(binary(BinOp::Pow, Expr::Int(2), Expr::Int(2))))
        );
        // Right associative.
        assert_eq!(
            parse("2**3**2").unwrap(),
            binary(
                BinOp::Pow,
                Expr::Int(2),
                binary(BinOp::Pow, Expr::Int(3), Expr::Int(2))
            )
        );
    }

    #[test]
    fn xor_is_loosest_operator() {
        assert_eq!(
            parse("1 + 2 ^ 3").unwrap(),
            binary(
                BinOp::Xor,
                binary(BinOp::Add, Expr::Int(1), Expr::Int(2)),
                Expr::Int(3)
            )
        );
    }

    #[test]
    fn tuples() {
        assert_eq!(parse("1,").unwrap(), Expr::Tuple(vec![Expr::Int(1)]));
        assert_eq!(parse("()").unwrap(), Expr::Tuple(Vec::new()));
        assert_eq!(
            parse("(a, 'b')").unwrap(),
            Expr::Tuple(vec![Expr::Name("a".into()), Expr::Str("b".into())])
        );
    }

    #[test]
    fn calls_and_postfix() {
        assert_eq!(
            parse("f(1, k=2)[0].x").unwrap(),
            Expr::Attribute {
                target: Box::new(Expr::Subscript {
                    target: Box::new(Expr::Call {
                        func: Box::new(Expr::Name("f".into())),
                        args: vec![Expr::Int(1)],
                        kwargs: vec![("k".into(), Expr::Int(2))],
                    }),
                    index: Box::new(Expr::Int(0)),
                }),
                name: "x".into(),
            }
        );
        assert!(matches!(parse("f(k=1, 2)"), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn unsupported_grammar() {
        for src in [
            "a < b",
            "a and b",
            "not a",
            "a % b",
            "a // b",
            "~a",
            "+a",
            "[1, 2]",
            "{1: 2}",
            "a[1:2]",
            "f(*a)",
            "a if b else c",
            "lambda: 1",
        ] {
            assert!(
                matches!(parse(src), Err(EvalError::UnsupportedGrammarComponent { .. })),
                "{src}"
            );
        }
    }

    #[test]
    fn nesting_is_bounded() {
        let shallow = alloc::format!("{}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert_eq!(parse(&shallow).unwrap(), Expr::Int(1));

        let parens = alloc::format!("{}1{}", "(".repeat(4999), ")".repeat(4999));
        let negations = alloc::format!("{}1", "-".repeat(5000));
        let powers = alloc::format!("2{}", "**2".repeat(3000));
        let sums = alloc::format!("1{}", "+1".repeat(4000));
        let calls = alloc::format!("f{}", "(0)".repeat(3000));
        let attributes = alloc::format!("a{}", ".b".repeat(4000));
        for src in [parens, negations, powers, sums, calls, attributes] {
            assert!(
                matches!(parse(&src), Err(EvalError::ExpressionTooDeep { max: MAX_DEPTH })),
                "{}",
                &src[..8]
            );
        }

        // Wide but shallow trees are fine.
        let tuple = alloc::format!("({})", "1, ".repeat(1000));
        assert!(matches!(parse(&tuple).unwrap(), Expr::Tuple(items) if items.len() == 1000));
    }
}
