//! Operator semantics and tree evaluation

use std::cmp::Ordering;
use tracing::debug;

use crate::{
    BinaryOperator, BranchKind, EvalError, EvalResult, Expr, Number, Scope, UnaryOperator, Value,
    to_number,
};

/// Evaluate `expr` against `scope`.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> EvalResult<Value> {
    expr.evaluate(scope)
}

impl Expr {
    /// Reduce this node to a value.
    ///
    /// Unbound variables evaluate to `undef`. Operand coercion failures,
    /// division by zero and overflow abort the whole evaluation.
    pub fn evaluate(&self, scope: &Scope<'_>) -> EvalResult<Value> {
        match self {
            Expr::Literal { value } => Ok(value.clone()),
            Expr::Variable { name } => Ok(eval_variable(name, scope)),
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(scope)?;
                eval_unary(*op, &value)
            }
            Expr::Binary { op, left, right } => eval_binary_op(*op, left, right, scope),
            Expr::Branch { kind, children } => eval_branch(*kind, children, scope),
        }
    }
}

fn eval_variable(name: &str, scope: &Scope<'_>) -> Value {
    match scope.get(name) {
        Some(value) => value.clone(),
        None => {
            debug!(variable = %name, scope = scope.id().index(), "Unresolved variable evaluates to undef");
            Value::Undef
        }
    }
}

/// Apply a prefix operator to an already evaluated operand.
pub fn eval_unary(op: UnaryOperator, value: &Value) -> EvalResult<Value> {
    match op {
        UnaryOperator::Minus => {
            let number = to_number(value).ok_or_else(|| EvalError::NotANumber {
                op: "minus".into(),
                value: value.to_string(),
            })?;
            number
                .checked_neg()
                .map(Value::from)
                .ok_or_else(|| EvalError::Overflow {
                    op: "-",
                    left: "0".into(),
                    right: value.to_string(),
                })
        }
        UnaryOperator::Not => Ok(Value::Bool(!value.is_truthy())),
    }
}

fn eval_binary_op(
    op: BinaryOperator,
    left: &Expr,
    right: &Expr,
    scope: &Scope<'_>,
) -> EvalResult<Value> {
    match op {
        BinaryOperator::And => {
            if !left.evaluate(scope)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(right.evaluate(scope)?.is_truthy()))
        }
        BinaryOperator::Or => {
            if left.evaluate(scope)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(right.evaluate(scope)?.is_truthy()))
        }
        _ => {
            let lhs = left.evaluate(scope)?;
            let rhs = right.evaluate(scope)?;
            eval_binary(op, &lhs, &rhs)
        }
    }
}

/// Apply an infix operator to two evaluated operands.
///
/// `and`/`or` are accepted here too but, given values, cannot short-circuit;
/// tree evaluation handles them before reaching this point.
pub fn eval_binary(op: BinaryOperator, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    match op {
        BinaryOperator::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        BinaryOperator::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
        BinaryOperator::Equal => Ok(Value::Bool(values_equal(lhs, rhs))),
        BinaryOperator::NotEqual => Ok(Value::Bool(!values_equal(lhs, rhs))),
        BinaryOperator::Less => Ok(Value::Bool(compare(op, lhs, rhs)? == Ordering::Less)),
        BinaryOperator::LessEqual => Ok(Value::Bool(compare(op, lhs, rhs)? != Ordering::Greater)),
        BinaryOperator::Greater => Ok(Value::Bool(compare(op, lhs, rhs)? == Ordering::Greater)),
        BinaryOperator::GreaterEqual => Ok(Value::Bool(compare(op, lhs, rhs)? != Ordering::Less)),
        BinaryOperator::In => contains(lhs, rhs).map(Value::Bool),
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Times
        | BinaryOperator::Divide
        | BinaryOperator::Modulo
        | BinaryOperator::LeftShift
        | BinaryOperator::RightShift => arithmetic(op, lhs, rhs).map(Value::from),
    }
}

fn operand(op: BinaryOperator, value: &Value) -> EvalResult<Number> {
    to_number(value).ok_or_else(|| EvalError::NotANumber {
        op: format!("'{}'", op.symbol()),
        value: value.to_string(),
    })
}

fn arithmetic(op: BinaryOperator, lhs: &Value, rhs: &Value) -> EvalResult<Number> {
    let a = operand(op, lhs)?;
    let b = operand(op, rhs)?;
    let sym = op.symbol();

    let overflow = || EvalError::Overflow {
        op: sym,
        left: lhs.to_string(),
        right: rhs.to_string(),
    };
    let by_zero = || EvalError::DivisionByZero {
        op: sym,
        left: lhs.to_string(),
        right: rhs.to_string(),
    };

    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => {
            let result = match op {
                BinaryOperator::Plus => x.checked_add(y),
                BinaryOperator::Minus => x.checked_sub(y),
                BinaryOperator::Times => x.checked_mul(y),
                BinaryOperator::Divide if y == 0 => return Err(by_zero()),
                BinaryOperator::Divide => floor_div(x, y),
                BinaryOperator::Modulo if y == 0 => return Err(by_zero()),
                BinaryOperator::Modulo => floor_mod(x, y),
                BinaryOperator::LeftShift => shift_amount(y).and_then(|s| shift_left(x, s)),
                BinaryOperator::RightShift => shift_amount(y).and_then(|s| x.checked_shr(s)),
                _ => {
                    return Err(EvalError::TypeMismatch {
                        op: sym,
                        left: lhs.type_name(),
                        right: rhs.type_name(),
                    });
                }
            };
            result.map(Number::Integer).ok_or_else(overflow)
        }
        (a, b) => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let result = match op {
                BinaryOperator::Plus => x + y,
                BinaryOperator::Minus => x - y,
                BinaryOperator::Times => x * y,
                BinaryOperator::Divide | BinaryOperator::Modulo if y == 0.0 => {
                    return Err(by_zero());
                }
                BinaryOperator::Divide => x / y,
                BinaryOperator::Modulo => {
                    let r = x % y;
                    if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r }
                }
                _ => {
                    return Err(EvalError::TypeMismatch {
                        op: sym,
                        left: lhs.type_name(),
                        right: rhs.type_name(),
                    });
                }
            };
            Ok(Number::Float(result))
        }
    }
}

/// Integer division rounding toward negative infinity
fn floor_div(x: i64, y: i64) -> Option<i64> {
    let q = x.checked_div(y)?;
    if x % y != 0 && ((x < 0) != (y < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Remainder taking the sign of the divisor
fn floor_mod(x: i64, y: i64) -> Option<i64> {
    if y == -1 {
        return Some(0);
    }
    let r = x.checked_rem(y)?;
    if r != 0 && ((r < 0) != (y < 0)) {
        Some(r + y)
    } else {
        Some(r)
    }
}

fn shift_amount(y: i64) -> Option<u32> {
    u32::try_from(y).ok().filter(|s| *s < i64::BITS)
}

/// `x << s`, or `None` when significant bits (or the sign) are shifted out
fn shift_left(x: i64, s: u32) -> Option<i64> {
    let r = x.checked_shl(s)?;
    (r >> s == x).then_some(r)
}

/// Ordering for `< <= > >=`: numbers numerically, strings case-insensitively.
fn compare(op: BinaryOperator, lhs: &Value, rhs: &Value) -> EvalResult<Ordering> {
    let mismatch = || EvalError::TypeMismatch {
        op: op.symbol(),
        left: lhs.type_name(),
        right: rhs.type_name(),
    };

    if let (Some(a), Some(b)) = (to_number(lhs), to_number(rhs)) {
        return match (a, b) {
            (Number::Integer(x), Number::Integer(y)) => Ok(x.cmp(&y)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()).ok_or_else(mismatch),
        };
    }

    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Ok(a.to_lowercase().cmp(&b.to_lowercase())),
        _ => Err(mismatch()),
    }
}

/// Equality across compatible kinds.
///
/// Numeric operands (including numeric strings) compare by value, strings
/// compare case-insensitively and `undef` equals the empty string.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (to_number(lhs), to_number(rhs)) {
        return match (a, b) {
            (Number::Integer(x), Number::Integer(y)) => x == y,
            (a, b) => a.as_f64() == b.as_f64(),
        };
    }

    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
        (Value::Undef, Value::String(s)) | (Value::String(s), Value::Undef) => s.is_empty(),
        _ => lhs == rhs,
    }
}

/// `lhs in rhs`: substring, array membership or hash key.
fn contains(lhs: &Value, rhs: &Value) -> EvalResult<bool> {
    match (lhs, rhs) {
        (Value::String(needle), Value::String(haystack)) => Ok(haystack.contains(needle.as_str())),
        (needle, Value::Array(items)) => Ok(items.iter().any(|item| values_equal(needle, item))),
        (Value::String(key), Value::Hash(map)) => Ok(map.contains_key(key)),
        _ => Err(EvalError::TypeMismatch {
            op: BinaryOperator::In.symbol(),
            left: lhs.type_name(),
            right: rhs.type_name(),
        }),
    }
}

fn eval_branch(kind: BranchKind, children: &[Expr], scope: &Scope<'_>) -> EvalResult<Value> {
    match kind {
        BranchKind::Sequence => {
            let mut last = Value::Undef;
            for child in children {
                last = child.evaluate(scope)?;
            }
            Ok(last)
        }
        BranchKind::List => children
            .iter()
            .map(|child| child.evaluate(scope))
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::Array),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScopeTree;

    fn eval(expr: &Expr) -> EvalResult<Value> {
        let tree = ScopeTree::new();
        expr.evaluate(&tree.scope(tree.root()))
    }

    fn bin(op: BinaryOperator, l: impl Into<Value>, r: impl Into<Value>) -> EvalResult<Value> {
        eval(&Expr::binary(op, Expr::literal(l), Expr::literal(r)))
    }

    #[test]
    fn literal_is_returned_unchanged() {
        assert_eq!(eval(&Expr::literal("x")).unwrap(), Value::from("x"));
    }

    #[test]
    fn minus_negates_and_keeps_kind() {
        assert_eq!(eval(&Expr::minus(Expr::literal(5))).unwrap(), Value::Integer(-5));
        assert_eq!(eval(&Expr::minus(Expr::literal(2.5))).unwrap(), Value::Float(-2.5));
        assert_eq!(eval(&Expr::minus(Expr::literal("12"))).unwrap(), Value::Integer(-12));
        assert_eq!(eval(&Expr::minus(Expr::literal("1.5"))).unwrap(), Value::Float(-1.5));
    }

    #[test]
    fn minus_rejects_non_numbers() {
        let err = eval(&Expr::minus(Expr::literal("abc"))).unwrap_err();
        assert_eq!(
            err,
            EvalError::NotANumber {
                op: "minus".into(),
                value: "abc".into()
            }
        );
        assert!(err.to_string().contains("abc"));

        assert!(eval(&Expr::minus(Expr::literal(true))).is_err());
        assert!(eval(&Expr::minus(Expr::variable("missing"))).is_err());
    }

    #[test]
    fn minus_overflow_is_an_error() {
        let err = eval(&Expr::minus(Expr::literal(i64::MIN))).unwrap_err();
        assert!(matches!(err, EvalError::Overflow { .. }));
    }

    #[test]
    fn not_uses_truthiness() {
        assert_eq!(eval(&Expr::not(Expr::literal(false))).unwrap(), Value::Bool(true));
        assert_eq!(eval(&Expr::not(Expr::variable("nope"))).unwrap(), Value::Bool(true));
        assert_eq!(eval(&Expr::not(Expr::literal(0))).unwrap(), Value::Bool(false));
        assert_eq!(eval(&Expr::not(Expr::literal(""))).unwrap(), Value::Bool(false));
    }

    #[test]
    fn integer_arithmetic() {
        use BinaryOperator::*;
        assert_eq!(bin(Plus, 2, 3).unwrap(), Value::Integer(5));
        assert_eq!(bin(Minus, 2, 3).unwrap(), Value::Integer(-1));
        assert_eq!(bin(Times, 4, 3).unwrap(), Value::Integer(12));
        assert_eq!(bin(Divide, 7, 2).unwrap(), Value::Integer(3));
        assert_eq!(bin(Divide, -7, 2).unwrap(), Value::Integer(-4));
        assert_eq!(bin(Modulo, -7, 3).unwrap(), Value::Integer(2));
        assert_eq!(bin(Modulo, 7, -3).unwrap(), Value::Integer(-2));
        assert_eq!(bin(LeftShift, 1, 4).unwrap(), Value::Integer(16));
        assert_eq!(bin(RightShift, 16, 2).unwrap(), Value::Integer(4));
    }

    #[test]
    fn mixed_arithmetic_is_float() {
        use BinaryOperator::*;
        assert_eq!(bin(Plus, 1, 0.5).unwrap(), Value::Float(1.5));
        assert_eq!(bin(Divide, 7.0, 2).unwrap(), Value::Float(3.5));
        assert_eq!(bin(Plus, "2", "3").unwrap(), Value::Integer(5));
        assert_eq!(bin(Times, "1.5", 2).unwrap(), Value::Float(3.0));
    }

    #[test]
    fn arithmetic_failures() {
        use BinaryOperator::*;
        assert!(matches!(bin(Plus, "abc", 1), Err(EvalError::NotANumber { .. })));
        assert!(matches!(bin(Plus, 1, "abc"), Err(EvalError::NotANumber { .. })));
        assert!(matches!(bin(Divide, 1, 0), Err(EvalError::DivisionByZero { .. })));
        assert!(matches!(bin(Modulo, 1.0, 0), Err(EvalError::DivisionByZero { .. })));
        assert!(matches!(bin(Plus, i64::MAX, 1), Err(EvalError::Overflow { .. })));
        assert!(matches!(bin(LeftShift, 1, 64), Err(EvalError::Overflow { .. })));
        assert!(matches!(bin(LeftShift, 1.5, 1), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn left_shift_overflow() {
        use BinaryOperator::*;
        assert!(matches!(bin(LeftShift, i64::MAX, 1), Err(EvalError::Overflow { .. })));
        assert!(matches!(bin(LeftShift, 3, 62), Err(EvalError::Overflow { .. })));
        assert!(matches!(bin(LeftShift, 1, 63), Err(EvalError::Overflow { .. })));
        assert_eq!(bin(LeftShift, 1, 62).unwrap(), Value::Integer(1 << 62));
        assert_eq!(bin(LeftShift, -1, 63).unwrap(), Value::Integer(i64::MIN));
        assert_eq!(bin(LeftShift, -3, 2).unwrap(), Value::Integer(-12));
    }

    #[test]
    fn modulo_by_minus_one() {
        use BinaryOperator::*;
        assert_eq!(bin(Modulo, i64::MIN, -1).unwrap(), Value::Integer(0));
        assert_eq!(bin(Modulo, 7, -1).unwrap(), Value::Integer(0));
        assert!(matches!(bin(Divide, i64::MIN, -1), Err(EvalError::Overflow { .. })));
    }

    #[test]
    fn comparisons() {
        use BinaryOperator::*;
        assert_eq!(bin(Less, 2, 10).unwrap(), Value::Bool(true));
        assert_eq!(bin(Less, "2", "10").unwrap(), Value::Bool(true));
        assert_eq!(bin(GreaterEqual, 3, 3.0).unwrap(), Value::Bool(true));
        assert_eq!(bin(Greater, "b", "A").unwrap(), Value::Bool(true));
        assert_eq!(bin(LessEqual, "abc", "ABC").unwrap(), Value::Bool(true));
        assert!(matches!(bin(Less, "abc", 1), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(bin(Less, true, false), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn equality() {
        use BinaryOperator::*;
        assert_eq!(bin(Equal, "10", 10).unwrap(), Value::Bool(true));
        assert_eq!(bin(Equal, 1, 1.0).unwrap(), Value::Bool(true));
        assert_eq!(bin(Equal, "Linux", "linux").unwrap(), Value::Bool(true));
        assert_eq!(bin(Equal, true, "true").unwrap(), Value::Bool(false));
        assert_eq!(bin(NotEqual, "a", "b").unwrap(), Value::Bool(true));
        assert_eq!(bin(Equal, Value::Undef, "").unwrap(), Value::Bool(true));
        assert_eq!(bin(Equal, Value::Undef, false).unwrap(), Value::Bool(false));
    }

    #[test]
    fn membership() {
        use BinaryOperator::*;
        let list = Value::from(vec![Value::from("a"), Value::Integer(2)]);
        assert_eq!(bin(In, "ell", "hello").unwrap(), Value::Bool(true));
        assert_eq!(bin(In, "2", list.clone()).unwrap(), Value::Bool(true));
        assert_eq!(bin(In, "z", list).unwrap(), Value::Bool(false));
        assert!(matches!(bin(In, 1, 2), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn logical_operators_short_circuit() {
        // The right side would fail if evaluated.
        let poison = Expr::minus(Expr::literal("abc"));

        let and = Expr::binary(BinaryOperator::And, Expr::literal(false), poison.clone());
        assert_eq!(eval(&and).unwrap(), Value::Bool(false));

        let or = Expr::binary(BinaryOperator::Or, Expr::literal(1), poison.clone());
        assert_eq!(eval(&or).unwrap(), Value::Bool(true));

        let and = Expr::binary(BinaryOperator::And, Expr::literal(true), poison);
        assert!(eval(&and).is_err());
    }

    #[test]
    fn arithmetic_evaluates_both_sides() {
        let e = Expr::binary(
            BinaryOperator::Times,
            Expr::literal(0),
            Expr::minus(Expr::literal("abc")),
        );
        assert!(eval(&e).is_err());
    }

    #[test]
    fn branches() {
        let seq = Expr::sequence(vec![Expr::literal(1), Expr::literal("last")]);
        assert_eq!(eval(&seq).unwrap(), Value::from("last"));
        assert_eq!(eval(&Expr::sequence(vec![])).unwrap(), Value::Undef);

        let list = Expr::list(vec![Expr::literal(1), Expr::minus(Expr::literal(2))]);
        assert_eq!(
            eval(&list).unwrap(),
            Value::from(vec![Value::Integer(1), Value::Integer(-2)])
        );
    }

    #[test]
    fn errors_propagate_out_of_branches() {
        let list = Expr::list(vec![Expr::literal(1), Expr::minus(Expr::literal("x"))]);
        assert!(matches!(eval(&list), Err(EvalError::NotANumber { .. })));
    }
}
