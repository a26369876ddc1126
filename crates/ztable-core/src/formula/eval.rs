//! Formula evaluation with spreadsheet semantics
//!
//! A small interpreter for [`Expr`] trees, following the rules a spreadsheet
//! host applies to the generated formulas:
//! - a blank cell equals `""` and counts as `0` in arithmetic
//! - text in arithmetic is `#VALUE!` unless it parses as a number
//! - errors propagate through operators and function arguments
//! - `ROUND` rounds half away from zero, `MATCH(..., 0)` is an exact match
//!
//! Names resolve through a [`NameResolver`], either to a scalar or to a
//! column of values.

use super::{BinaryOp, Expr, Function};
use std::borrow::Cow;
use std::fmt;

/// Spreadsheet error values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellError {
    Value,
    Div0,
    Na,
    Num,
    Name,
    Ref,
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellError::Value => "#VALUE!",
            CellError::Div0 => "#DIV/0!",
            CellError::Na => "#N/A",
            CellError::Num => "#NUM!",
            CellError::Name => "#NAME?",
            CellError::Ref => "#REF!",
        })
    }
}

/// A computed cell value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Blank,
    Number(f64),
    Text(String),
    Bool(bool),
    Error(CellError),
}

impl Value {
    /// Blank cells and empty strings both display as nothing
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Blank => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn to_number(&self) -> Result<f64, CellError> {
        match self {
            Value::Blank => Ok(0.0),
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Text(text) => text.trim().parse().map_err(|_| CellError::Value),
            Value::Error(e) => Err(*e),
        }
    }

    fn to_condition(&self) -> Result<bool, CellError> {
        match self {
            Value::Blank => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::Text(_) => Err(CellError::Value),
            Value::Error(e) => Err(*e),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Blank => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(text) => f.write_str(text),
            Value::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Error(e) => write!(f, "{e}"),
        }
    }
}

/// What a defined name resolves to during evaluation
pub enum Binding<'a> {
    Scalar(Value),
    Column(&'a [Value]),
}

/// Resolves defined names for the evaluator
pub trait NameResolver {
    fn resolve(&self, name: &str) -> Option<Binding<'_>>;
}

/// Evaluate `expr` to a single value
pub fn evaluate(expr: &Expr, names: &dyn NameResolver) -> Value {
    match scalar(expr, names) {
        Ok(value) => value,
        Err(e) => Value::Error(e),
    }
}

fn scalar(expr: &Expr, names: &dyn NameResolver) -> Result<Value, CellError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(text) => Ok(Value::Text(text.clone())),
        Expr::Name(name) => match names.resolve(name) {
            Some(Binding::Scalar(Value::Error(e))) => Err(e),
            Some(Binding::Scalar(value)) => Ok(value),
            // No implicit intersection: a whole column in scalar position
            Some(Binding::Column(_)) => Err(CellError::Value),
            None => Err(CellError::Name),
        },
        Expr::Neg(inner) => Ok(Value::Number(-scalar(inner, names)?.to_number()?)),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = scalar(lhs, names)?;
            let rhs = scalar(rhs, names)?;
            binary(*op, &lhs, &rhs)
        }
        Expr::Call { func, args } => call(*func, args, names),
    }
}

fn column<'a>(expr: &Expr, names: &'a dyn NameResolver) -> Result<Cow<'a, [Value]>, CellError> {
    if let Expr::Name(name) = expr {
        if let Some(Binding::Column(values)) = names.resolve(name) {
            return Ok(Cow::Borrowed(values));
        }
    }
    Ok(Cow::Owned(vec![scalar(expr, names)?]))
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, CellError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(lhs, rhs))),
        BinaryOp::Add => Ok(Value::Number(lhs.to_number()? + rhs.to_number()?)),
        BinaryOp::Sub => Ok(Value::Number(lhs.to_number()? - rhs.to_number()?)),
        BinaryOp::Mul => Ok(Value::Number(lhs.to_number()? * rhs.to_number()?)),
        BinaryOp::Div => {
            let (a, b) = (lhs.to_number()?, rhs.to_number()?);
            if b == 0.0 {
                Err(CellError::Div0)
            } else {
                Ok(Value::Number(a / b))
            }
        }
    }
}

/// Spreadsheet `=` comparison: blank matches both `""` and `0`, text is case-insensitive
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Blank, Value::Blank) => true,
        (Value::Blank, Value::Text(t)) | (Value::Text(t), Value::Blank) => t.is_empty(),
        (Value::Blank, Value::Number(n)) | (Value::Number(n), Value::Blank) => *n == 0.0,
        (Value::Blank, Value::Bool(b)) | (Value::Bool(b), Value::Blank) => !*b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Text(a), Value::Text(b)) => a.to_lowercase() == b.to_lowercase(),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

fn call(func: Function, args: &[Expr], names: &dyn NameResolver) -> Result<Value, CellError> {
    let arg = |i: usize| args.get(i).ok_or(CellError::Value);

    match func {
        Function::If => {
            let cond = scalar(arg(0)?, names)?.to_condition()?;
            match (cond, args.get(1), args.get(2)) {
                (true, Some(then), _) => scalar(then, names),
                (false, _, Some(otherwise)) => scalar(otherwise, names),
                (false, _, None) => Ok(Value::Bool(false)),
                (true, None, _) => Err(CellError::Value),
            }
        }
        Function::Or => {
            let mut seen = false;
            let mut any = false;
            for expr in args {
                match scalar(expr, names)? {
                    Value::Blank => {}
                    Value::Text(_) => return Err(CellError::Value),
                    value => {
                        seen = true;
                        any |= value.to_condition()?;
                    }
                }
            }
            if seen {
                Ok(Value::Bool(any))
            } else {
                Err(CellError::Value)
            }
        }
        Function::Round => {
            let value = scalar(arg(0)?, names)?.to_number()?;
            let digits = scalar(arg(1)?, names)?.to_number()?.trunc() as i32;
            let factor = 10_f64.powi(digits);
            // f64::round is half away from zero, like the spreadsheet ROUND
            Ok(Value::Number((value * factor).round() / factor))
        }
        Function::Sqrt => {
            let value = scalar(arg(0)?, names)?.to_number()?;
            if value < 0.0 {
                Err(CellError::Num)
            } else {
                Ok(Value::Number(value.sqrt()))
            }
        }
        Function::Abs => Ok(Value::Number(scalar(arg(0)?, names)?.to_number()?.abs())),
        Function::Match => {
            let needle = scalar(arg(0)?, names)?;
            let haystack = column(arg(1)?, names)?;
            let match_type = match args.get(2) {
                Some(expr) => scalar(expr, names)?.to_number()?,
                None => 1.0,
            };
            if match_type != 0.0 {
                // Only exact matching is generated
                return Err(CellError::Na);
            }
            haystack
                .iter()
                .position(|candidate| !candidate.is_blank() && values_equal(candidate, &needle))
                .map(|i| Value::Number((i + 1) as f64))
                .ok_or(CellError::Na)
        }
        Function::Index => {
            let values = column(arg(0)?, names)?;
            let row = scalar(arg(1)?, names)?.to_number()?.trunc();
            if row < 1.0 {
                return Err(CellError::Value);
            }
            match values.get(row as usize - 1) {
                Some(Value::Error(e)) => Err(*e),
                Some(value) => Ok(value.clone()),
                None => Err(CellError::Ref),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{blank_guarded, probability_lookup};
    use std::collections::HashMap;

    #[derive(Default)]
    struct Names {
        scalars: HashMap<&'static str, Value>,
        columns: HashMap<&'static str, Vec<Value>>,
    }

    impl NameResolver for Names {
        fn resolve(&self, name: &str) -> Option<Binding<'_>> {
            if let Some(values) = self.columns.get(name) {
                return Some(Binding::Column(values));
            }
            self.scalars.get(name).cloned().map(Binding::Scalar)
        }
    }

    fn table() -> Names {
        let mut names = Names::default();
        names.columns.insert(
            "ZValues",
            vec![Value::Number(-0.01), Value::Number(0.0), Value::Number(0.01)],
        );
        names.columns.insert(
            "Probabilities",
            vec![Value::Number(0.496), Value::Number(0.5), Value::Number(0.504)],
        );
        names
    }

    #[test]
    fn lookup_finds_exact_row() {
        let mut names = table();
        names.scalars.insert("Z", Value::Number(0.01));
        let expr = probability_lookup("Z", "ZValues", "Probabilities", 2);
        assert_eq!(evaluate(&expr, &names), Value::Number(0.504));
    }

    #[test]
    fn lookup_rounds_before_matching() {
        let mut names = table();
        names.scalars.insert("Z", Value::Number(-0.0099999));
        let expr = probability_lookup("Z", "ZValues", "Probabilities", 2);
        assert_eq!(evaluate(&expr, &names), Value::Number(0.496));
    }

    #[test]
    fn lookup_blank_input_is_blank() {
        let mut names = table();
        names.scalars.insert("Z", Value::Blank);
        let expr = probability_lookup("Z", "ZValues", "Probabilities", 2);
        assert!(evaluate(&expr, &names).is_blank());
    }

    #[test]
    fn lookup_outside_table_is_na() {
        let mut names = table();
        names.scalars.insert("Z", Value::Number(5.0));
        let expr = probability_lookup("Z", "ZValues", "Probabilities", 2);
        assert_eq!(evaluate(&expr, &names), Value::Error(CellError::Na));
    }

    #[test]
    fn blank_counts_as_zero_in_arithmetic() {
        let mut names = Names::default();
        names.scalars.insert("A", Value::Blank);
        let expr = Expr::name("A").add(Expr::num(2.0));
        assert_eq!(evaluate(&expr, &names), Value::Number(2.0));
    }

    #[test]
    fn empty_text_in_arithmetic_is_value_error() {
        let mut names = Names::default();
        names.scalars.insert("A", Value::Text(String::new()));
        let expr = Expr::name("A").mul(Expr::num(2.0));
        assert_eq!(evaluate(&expr, &names), Value::Error(CellError::Value));
    }

    #[test]
    fn guard_short_circuits_blank_inputs() {
        let mut names = Names::default();
        names.scalars.insert("A", Value::Number(1.0));
        names.scalars.insert("B", Value::Blank);
        let expr = blank_guarded(&["A", "B"], Expr::name("A").div(Expr::name("B")));
        assert!(evaluate(&expr, &names).is_blank());

        names.scalars.insert("B", Value::Number(4.0));
        assert_eq!(evaluate(&expr, &names), Value::Number(0.25));
    }

    #[test]
    fn division_by_zero() {
        let expr = Expr::num(1.0).div(Expr::num(0.0));
        assert_eq!(evaluate(&expr, &Names::default()), Value::Error(CellError::Div0));
    }

    #[test]
    fn sqrt_of_negative_is_num_error() {
        let expr = Expr::num(-4.0).sqrt();
        assert_eq!(evaluate(&expr, &Names::default()), Value::Error(CellError::Num));
    }

    #[test]
    fn undefined_name_is_name_error() {
        let expr = Expr::name("Missing");
        assert_eq!(evaluate(&expr, &Names::default()), Value::Error(CellError::Name));
    }

    #[test]
    fn round_is_half_away_from_zero() {
        let round = |v: f64| {
            evaluate(
                &Expr::call(Function::Round, vec![Expr::num(v), Expr::num(0.0)]),
                &Names::default(),
            )
        };
        assert_eq!(round(2.5), Value::Number(3.0));
        assert_eq!(round(-2.5), Value::Number(-3.0));
    }

    #[test]
    fn comparisons_follow_spreadsheet_rules() {
        assert!(values_equal(&Value::Blank, &Value::Text(String::new())));
        assert!(values_equal(&Value::Blank, &Value::Number(0.0)));
        assert!(!values_equal(&Value::Number(0.0), &Value::Text(String::new())));
        assert!(values_equal(&Value::Text("Abc".into()), &Value::Text("aBC".into())));
    }
}
