//! Reader for the formula subset [`Expr`] renders, used to check that the
//! text written into cells means the same tree.
//!
//! Precedence, loosest first: comparison, `+ -`, `* /`, unary minus. A minus
//! directly before a number literal reads as a negative literal.

use super::{BinaryOp, Expr, Function};

pub(crate) fn parse(text: &str) -> Result<Expr, String> {
    let text = text.strip_prefix('=').unwrap_or(text);
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(c) => Err(format!("unexpected '{c}' at {}", parser.pos)),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(format!("expected '{c}' at {}", self.pos))
        }
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let mut lhs = self.additive()?;
        loop {
            let op = if self.eat('=') {
                BinaryOp::Eq
            } else if self.peek() == Some('<') && self.chars.get(self.pos + 1) == Some(&'>') {
                self.pos += 2;
                BinaryOp::Ne
            } else {
                return Ok(lhs);
            };
            let rhs = self.additive()?;
            lhs = lhs.binary(op, rhs);
        }
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = if self.eat('+') {
                BinaryOp::Add
            } else if self.eat('-') {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.multiplicative()?;
            lhs = lhs.binary(op, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat('*') {
                BinaryOp::Mul
            } else if self.eat('/') {
                BinaryOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = lhs.binary(op, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat('-') {
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Ok(Expr::num(-self.number()?));
            }
            return Ok(self.unary()?.neg());
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.comparison()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('"') => self.text(),
            Some(c) if c.is_ascii_digit() => Ok(Expr::num(self.number()?)),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let ident = self.identifier();
                if self.eat('(') {
                    let func = function(&ident)?;
                    let mut args = Vec::new();
                    if !self.eat(')') {
                        loop {
                            args.push(self.comparison()?);
                            if self.eat(')') {
                                break;
                            }
                            self.expect(',')?;
                        }
                    }
                    Ok(Expr::call(func, args))
                } else {
                    Ok(Expr::name(ident))
                }
            }
            Some(c) => Err(format!("unexpected '{c}' at {}", self.pos)),
            None => Err("unexpected end of formula".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse()
            .map_err(|e| format!("bad number '{literal}': {e}"))
    }

    fn text(&mut self) -> Result<Expr, String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('"') if self.chars.get(self.pos + 1) == Some(&'"') => {
                    out.push('"');
                    self.pos += 2;
                }
                Some('"') => {
                    self.pos += 1;
                    return Ok(Expr::Text(out));
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                None => return Err("unterminated text literal".to_string()),
            }
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

fn function(name: &str) -> Result<Function, String> {
    let func = match name.to_ascii_uppercase().as_str() {
        "IF" => Function::If,
        "OR" => Function::Or,
        "INDEX" => Function::Index,
        "MATCH" => Function::Match,
        "ROUND" => Function::Round,
        "SQRT" => Function::Sqrt,
        "ABS" => Function::Abs,
        other => return Err(format!("unknown function {other}")),
    };
    Ok(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reads_back(expr: &Expr) {
        assert_eq!(&parse(&expr.to_formula()).unwrap(), expr, "{expr}");
    }

    #[test]
    fn rendered_text_reads_back_as_the_same_tree() {
        let (a, b, c) = (Expr::name("a"), Expr::name("b"), Expr::name("c"));

        reads_back(&a.clone().sub(b.clone()).sub(c.clone()));
        reads_back(&a.clone().sub(b.clone().sub(c.clone())));
        reads_back(&a.clone().div(b.clone().mul(c.clone())));
        reads_back(&a.clone().mul(b.clone()).div(c.clone()));
        reads_back(&a.clone().add(b.clone()).neg().mul(c.clone()));
        reads_back(&a.clone().sub(Expr::num(-1.5)));
        reads_back(&a.clone().equals(b.clone().add(c.clone())));
        reads_back(&a.clone().not_equals(Expr::Text("say \"hi\"".into())));
        reads_back(&Expr::if_else(a.equals(Expr::blank()), Expr::blank(), b.abs()));
    }

    #[test]
    fn precedence_decides_the_tree() {
        let expr = parse("=a-b*c").unwrap();
        assert_eq!(expr, Expr::name("a").sub(Expr::name("b").mul(Expr::name("c"))));

        let expr = parse("(a-b)*c").unwrap();
        assert_eq!(expr, Expr::name("a").sub(Expr::name("b")).mul(Expr::name("c")));
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(parse("=IF(a,").is_err());
        assert!(parse("=(a-b").is_err());
        assert!(parse("=NOPE(1)").is_err());
        assert!(parse("=a)").is_err());
    }
}
