//! Tokenizer for expressions.

use alloc::string::String;
use alloc::vec::Vec;

use super::EvalError;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Assign,
    /// Valid Python that is outside the supported subset.
    Unsupported(&'static str),
    End,
}

#[derive(Clone, Debug)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Spanned>,
}

impl Lexer<'_> {
    #[inline]
    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, token: Token, position: usize) {
        self.tokens.push(Spanned { token, position });
    }

    fn run(&mut self) -> Result<(), EvalError> {
        while let Some(c) = self.peek(0) {
            let start = self.pos;
            match c {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b'0'..=b'9' => self.number()?,
                b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                b'\'' | b'"' => self.string()?,
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.name(),
                _ => {
                    let (token, len) = self.operator(c).ok_or_else(|| {
                        EvalError::syntax(
                            alloc::format!("unexpected character `{}`", self.char_at(start)),
                            start,
                        )
                    })?;
                    self.pos += len;
                    self.push(token, start);
                }
            }
        }
        let end = self.pos;
        self.push(Token::End, end);
        Ok(())
    }

    fn char_at(&self, pos: usize) -> char {
        self.src[pos..].chars().next().unwrap_or(' ')
    }

    fn operator(&self, c: u8) -> Option<(Token, usize)> {
        let next = self.peek(1);
        Some(match (c, next) {
            (b'*', Some(b'*')) => (Token::StarStar, 2),
            (b'*', _) => (Token::Star, 1),
            (b'/', Some(b'/')) => (Token::Unsupported("floor division"), 2),
            (b'/', _) => (Token::Slash, 1),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'^', _) => (Token::Caret, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b'[', _) => (Token::LBracket, 1),
            (b']', _) => (Token::RBracket, 1),
            (b',', _) => (Token::Comma, 1),
            (b'.', _) => (Token::Dot, 1),
            (b'=', Some(b'=')) => (Token::Unsupported("comparison"), 2),
            (b'=', _) => (Token::Assign, 1),
            (b'!', Some(b'=')) => (Token::Unsupported("comparison"), 2),
            (b'<' | b'>', Some(b'<' | b'>')) if next == Some(c) => {
                (Token::Unsupported("bit shift"), 2)
            }
            (b'<' | b'>', Some(b'=')) => (Token::Unsupported("comparison"), 2),
            (b'<' | b'>', _) => (Token::Unsupported("comparison"), 1),
            (b'%', _) => (Token::Unsupported("modulo"), 1),
            (b'&', _) => (Token::Unsupported("bitwise and"), 1),
            (b'|', _) => (Token::Unsupported("bitwise or"), 1),
            (b'~', _) => (Token::Unsupported("bitwise inversion"), 1),
            (b'@', _) => (Token::Unsupported("matrix multiplication"), 1),
            (b'{' | b'}', _) => (Token::Unsupported("dict or set display"), 1),
            (b':', _) => (Token::Unsupported("slice"), 1),
            _ => return None,
        })
    }

    fn name(&mut self) {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.pos += 1;
        }
        let word = &self.src[start..self.pos];
        let token = match word {
            "and" | "or" => Token::Unsupported("boolean operation"),
            "not" => Token::Unsupported("not"),
            "if" | "else" => Token::Unsupported("conditional expression"),
            "lambda" => Token::Unsupported("lambda"),
            "in" | "is" => Token::Unsupported("comparison"),
            "for" | "async" | "await" | "yield" => Token::Unsupported("comprehension"),
            _ => Token::Name(String::from(word)),
        };
        self.push(token, start);
    }

    fn number(&mut self) -> Result<(), EvalError> {
        let start = self.pos;
        let mut is_float = false;
        let digits = |lexer: &mut Self| {
            while lexer
                .peek(0)
                .is_some_and(|c| c.is_ascii_digit() || c == b'_')
            {
                lexer.pos += 1;
            }
        };

        digits(self);
        if self.peek(0) == Some(b'.') {
            is_float = true;
            self.pos += 1;
            digits(self);
        }
        if matches!(self.peek(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek(1), Some(b'+' | b'-')));
            if self.peek(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                digits(self);
            }
        }
        if self
            .peek(0)
            .is_some_and(|c| c.is_ascii_alphabetic() || c == b'_')
        {
            return Err(EvalError::syntax("invalid number literal", start));
        }

        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let token = if is_float {
            Token::Float(
                text.parse()
                    .map_err(|_| EvalError::syntax("invalid float literal", start))?,
            )
        } else {
            if text.len() > 1 && text.starts_with('0') && text.bytes().any(|c| c != b'0') {
                return Err(EvalError::syntax("leading zeros in integer literal", start));
            }
            Token::Int(
                text.parse()
                    .map_err(|_| EvalError::Overflow { op: "literal" })?,
            )
        };
        self.push(token, start);
        Ok(())
    }

    fn string(&mut self) -> Result<(), EvalError> {
        let start = self.pos;
        let quote = self.bytes[start];
        self.pos += 1;
        let mut out = String::new();

        loop {
            let Some(c) = self.peek(0) else {
                return Err(EvalError::syntax("unterminated string literal", start));
            };
            if c == quote {
                self.pos += 1;
                break;
            }
            if c == b'\\' {
                let escaped = self
                    .peek(1)
                    .ok_or_else(|| EvalError::syntax("unterminated string literal", start))?;
                let ch = match escaped {
                    b'n' => '\n',
                    b't' => '\t',
                    b'r' => '\r',
                    b'0' => '\0',
                    b'\\' | b'\'' | b'"' => char::from(escaped),
                    _ => {
                        out.push('\\');
                        self.pos += 1;
                        continue;
                    }
                };
                out.push(ch);
                self.pos += 2;
                continue;
            }
            let ch = self.char_at(self.pos);
            out.push(ch);
            self.pos += ch.len_utf8();
        }

        self.push(Token::Str(out), start);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn tokens(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(
            tokens("1 + 2.5**x"),
            vec![
                Token::Int(1),
                Token::Plus,
                Token::Float(2.5),
                Token::StarStar,
                Token::Name("x".into()),
                Token::End,
            ]
        );
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            tokens(r#"'a\'b' "c\n""#),
            vec![Token::Str("a'b".into()), Token::Str("c\n".into()), Token::End]
        );
        assert!(tokenize("'open").is_err());
    }

    #[test]
    fn unsupported_tokens() {
        assert_eq!(tokens("a // b")[1], Token::Unsupported("floor division"));
        assert_eq!(tokens("a and b")[1], Token::Unsupported("boolean operation"));
        assert_eq!(tokens("a <= b")[1], Token::Unsupported("comparison"));
    }

    #[test]
    fn numbers() {
        assert_eq!(tokens("1_000 .5 1e3"), vec![
            Token::Int(1000),
            Token::Float(0.5),
            Token::Float(1000.0),
            Token::End,
        ]);
        assert!(matches!(
            tokenize("99999999999999999999"),
            Err(EvalError::Overflow { .. })
        ));
    }
}
