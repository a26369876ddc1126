//! Formula expression trees
//!
//! Formulas are built as [`Expr`] trees and rendered to spreadsheet syntax
//! only at the document boundary (`Display`). Keeping them structured lets
//! the planner collect every referenced name for dependency checks and lets
//! [`eval`] interpret them without parsing text.
//!
//! ```text
//! Expr::name("ZLow").equals(Expr::blank())   ->  ZLow=""
//! blank_guarded(&["A", "B"], body)           ->  IF(OR(A="",B=""),"",body)
//! ```

pub mod eval;
#[cfg(test)]
pub(crate) mod parse;

use std::collections::BTreeSet;
use std::fmt;

/// Binary operators, in the subset the calculators need
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Eq | BinaryOp::Ne => 1,
            BinaryOp::Add | BinaryOp::Sub => 2,
            BinaryOp::Mul | BinaryOp::Div => 3,
        }
    }
}

/// Negation binds tighter than any binary operator
const NEG_PRECEDENCE: u8 = 4;

/// Worksheet functions used by the generated formulas
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    If,
    Or,
    Index,
    Match,
    Round,
    Sqrt,
    Abs,
}

impl Function {
    pub fn name(self) -> &'static str {
        match self {
            Function::If => "IF",
            Function::Or => "OR",
            Function::Index => "INDEX",
            Function::Match => "MATCH",
            Function::Round => "ROUND",
            Function::Sqrt => "SQRT",
            Function::Abs => "ABS",
        }
    }
}

/// A formula expression
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    /// Reference to a defined name (single-cell alias or column range)
    Name(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Number(value)
    }

    /// The empty-string literal used for blank results
    pub fn blank() -> Self {
        Expr::Text(String::new())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn call(func: Function, args: Vec<Expr>) -> Self {
        Expr::Call { func, args }
    }

    pub fn neg(self) -> Self {
        Expr::Neg(Box::new(self))
    }

    fn binary(self, op: BinaryOp, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Add, rhs)
    }

    pub fn sub(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Sub, rhs)
    }

    pub fn mul(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Mul, rhs)
    }

    pub fn div(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Div, rhs)
    }

    pub fn equals(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn not_equals(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Ne, rhs)
    }

    pub fn sqrt(self) -> Self {
        Expr::call(Function::Sqrt, vec![self])
    }

    pub fn abs(self) -> Self {
        Expr::call(Function::Abs, vec![self])
    }

    pub fn if_else(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::call(Function::If, vec![cond, then, otherwise])
    }

    /// Every name referenced anywhere in the tree
    pub fn references(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Number(_) | Expr::Text(_) => {}
            Expr::Name(name) => {
                names.insert(name.as_str());
            }
            Expr::Neg(inner) => inner.collect_references(names),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_references(names);
                rhs.collect_references(names);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_references(names);
                }
            }
        }
    }

    /// Formula text as stored in a cell, with the leading `=`
    pub fn to_formula(&self) -> String {
        format!("={self}")
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, parent: u8, right: bool) -> fmt::Result {
        match self {
            Expr::Number(value) => {
                if *value < 0.0 && (parent > 0 || right) {
                    write!(f, "({value})")
                } else {
                    write!(f, "{value}")
                }
            }
            Expr::Text(text) => write!(f, "\"{}\"", text.replace('"', "\"\"")),
            Expr::Name(name) => f.write_str(name),
            Expr::Neg(inner) => {
                f.write_str("-")?;
                inner.write(f, NEG_PRECEDENCE, true)
            }
            Expr::Binary { op, lhs, rhs } => {
                let own = op.precedence();
                let wrap = own < parent || (own == parent && right);
                if wrap {
                    f.write_str("(")?;
                }
                lhs.write(f, own, false)?;
                f.write_str(op.symbol())?;
                rhs.write(f, own, true)?;
                if wrap {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Expr::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    arg.write(f, 0, false)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0, false)
    }
}

/// Wrap `body` so it yields blank while any of `required` is blank
pub fn blank_guarded(required: &[&str], body: Expr) -> Expr {
    let mut checks: Vec<Expr> = required
        .iter()
        .map(|name| Expr::name(*name).equals(Expr::blank()))
        .collect();

    let cond = match checks.len() {
        0 => return body,
        1 => checks.remove(0),
        _ => Expr::call(Function::Or, checks),
    };
    Expr::if_else(cond, Expr::blank(), body)
}

/// Exact-match lookup of the probability for the z-value in `input`
///
/// The input is rounded to the table precision before matching so that
/// typed values such as `1.960000001` still land on a table row.
pub fn probability_lookup(input: &str, z_values: &str, probabilities: &str, precision: u32) -> Expr {
    let rounded = Expr::call(
        Function::Round,
        vec![Expr::name(input), Expr::num(f64::from(precision))],
    );
    let position = Expr::call(
        Function::Match,
        vec![rounded, Expr::name(z_values), Expr::num(0.0)],
    );
    let lookup = Expr::call(Function::Index, vec![Expr::name(probabilities), position]);
    blank_guarded(&[input], lookup)
}

/// Standard error, scaled by √((N−n)/(N−1)) unless `population` is blank
pub fn finite_population_se(base: Expr, population: &str, sample: &str) -> Expr {
    let correction = Expr::name(population)
        .sub(Expr::name(sample))
        .div(Expr::name(population).sub(Expr::num(1.0)))
        .sqrt();
    Expr::if_else(
        Expr::name(population).equals(Expr::blank()),
        base.clone(),
        base.mul(correction),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_lookup() {
        let expr = probability_lookup("ZLow", "ZValues", "Probabilities", 2);
        assert_eq!(
            expr.to_formula(),
            r#"=IF(ZLow="","",INDEX(Probabilities,MATCH(ROUND(ZLow,2),ZValues,0)))"#
        );
    }

    #[test]
    fn guard_with_several_inputs_uses_or() {
        let expr = blank_guarded(&["A", "B"], Expr::name("A").div(Expr::name("B")));
        assert_eq!(expr.to_string(), r#"IF(OR(A="",B=""),"",A/B)"#);
    }

    #[test]
    fn guard_without_inputs_is_identity() {
        let body = Expr::name("A").add(Expr::num(1.0));
        assert_eq!(blank_guarded(&[], body.clone()), body);
    }

    #[test]
    fn parentheses_follow_precedence() {
        let expr = Expr::name("x")
            .sub(Expr::name("mu"))
            .div(Expr::name("se"));
        assert_eq!(expr.to_string(), "(x-mu)/se");

        let expr = Expr::name("a").sub(Expr::name("b").sub(Expr::name("c")));
        assert_eq!(expr.to_string(), "a-(b-c)");

        let expr = Expr::name("a").sub(Expr::name("b")).sub(Expr::name("c"));
        assert_eq!(expr.to_string(), "a-b-c");

        let expr = Expr::name("p").mul(Expr::num(1.0).sub(Expr::name("p")));
        assert_eq!(expr.to_string(), "p*(1-p)");

        let expr = Expr::name("a").add(Expr::name("b")).neg();
        assert_eq!(expr.to_string(), "-(a+b)");
    }

    #[test]
    fn text_literals_are_escaped() {
        assert_eq!(Expr::Text("say \"hi\"".into()).to_string(), r#""say ""hi""""#);
    }

    #[test]
    fn negative_numbers_are_wrapped_inside_operators() {
        let expr = Expr::name("a").sub(Expr::num(-1.0));
        assert_eq!(expr.to_string(), "a-(-1)");
        assert_eq!(Expr::num(-1.5).to_string(), "-1.5");
    }

    #[test]
    fn finite_population_correction_shape() {
        let base = Expr::name("Sigma").div(Expr::name("n").sqrt());
        let expr = finite_population_se(base, "N", "n");
        assert_eq!(
            expr.to_string(),
            r#"IF(N="",Sigma/SQRT(n),Sigma/SQRT(n)*SQRT((N-n)/(N-1)))"#
        );
    }

    #[test]
    fn references_are_collected_once() {
        let expr = probability_lookup("ZLow", "ZValues", "Probabilities", 2);
        let names: Vec<&str> = expr.references().into_iter().collect();
        assert_eq!(names, vec!["Probabilities", "ZLow", "ZValues"]);
    }
}
