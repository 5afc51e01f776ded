use std::collections::HashMap;

use crate::{
    ast::{BinaryOp, Comprehension, Expr, Literal, UnaryOp},
    functions::Functions,
    value::{equals, Environment, MapKey, Num, Value},
};

/// Errors that can occur while evaluating an expression.
///
/// Evaluation unwinds on the first error; no operator recovers and
/// continues. Short-circuit operators suppress errors on the side they
/// never evaluate.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// Identifier with no binding in the environment
    UndefinedVariable(String),

    /// Field selection on a mapping that lacks the field
    FieldNotFound(String),

    /// Map index with a key that is not present
    KeyNotFound(String),

    /// List or string index outside the valid range
    IndexOutOfBounds(String),

    /// Division by zero
    DivisionByZero,

    /// Modulo by zero
    ModuloByZero,

    /// Integer arithmetic outside the 64-bit range
    Overflow(String),

    /// Operator applied to incompatible types
    TypeMismatch(String),

    /// Function or method received the wrong arity or argument types
    BadArgument(String),

    /// Call to a function the registry does not know
    UnknownFunction(String),

    /// Method call the registry does not know
    UnknownMethod(String),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::UndefinedVariable(name) => write!(f, "Undefined variable: {}", name),
            EvalError::FieldNotFound(field) => write!(f, "Field {} not found", field),
            EvalError::KeyNotFound(key) => write!(f, "Map key not found: {}", key),
            EvalError::IndexOutOfBounds(detail) => write!(f, "Index out of bounds: {}", detail),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
            EvalError::ModuloByZero => write!(f, "Modulo by zero"),
            EvalError::Overflow(op) => write!(f, "Integer overflow in {}", op),
            EvalError::TypeMismatch(msg) => write!(f, "Type error: {}", msg),
            EvalError::BadArgument(msg) => write!(f, "{}", msg),
            EvalError::UnknownFunction(name) => write!(f, "Unknown function: {}", name),
            EvalError::UnknownMethod(name) => write!(f, "Unknown method: {}", name),
        }
    }
}

impl std::error::Error for EvalError {}

/// Tree-walking interpreter for parsed expressions.
///
/// The environment is externally supplied and mutable only for the scoped
/// binding of macro and comprehension iteration variables; prior bindings
/// are restored on both normal completion and error unwinding, so callers
/// observe the environment unchanged.
pub struct Interpreter<'a> {
    env: &'a mut Environment,
    functions: &'a dyn Functions,
}

impl<'a> Interpreter<'a> {
    pub fn new(env: &'a mut Environment, functions: &'a dyn Functions) -> Self {
        Interpreter { env, functions }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::Identifier(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expr::Select {
                operand,
                field,
                test,
            } => self.eval_select(operand.as_deref(), field, *test),
            Expr::Call {
                target,
                function,
                args,
                is_macro,
            } => self.eval_call(target.as_deref(), function, args, *is_macro),
            Expr::List(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::List(items))
            }
            Expr::Map(entries) => {
                let mut map = HashMap::with_capacity(entries.len());
                for entry in entries {
                    let key_value = self.evaluate(&entry.key)?;
                    let key = MapKey::from_value(&key_value).ok_or_else(|| {
                        EvalError::TypeMismatch(format!(
                            "Unsupported map key type: {}",
                            key_value.type_name()
                        ))
                    })?;
                    let value = self.evaluate(&entry.value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Expr::Struct { fields, .. } => {
                let mut map = HashMap::with_capacity(fields.len());
                for field in fields {
                    let value = self.evaluate(&field.value)?;
                    map.insert(MapKey::String(field.field.clone()), value);
                }
                Ok(Value::Map(map))
            }
            Expr::Comprehension(comp) => self.eval_comprehension(comp),
            Expr::Unary { op, operand } => self.eval_unary(*op, operand),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.evaluate(condition)?.is_true() {
                    self.evaluate(then)
                } else {
                    self.evaluate(otherwise)
                }
            }
            Expr::Index { operand, index } => self.eval_index(operand, index),
        }
    }

    fn eval_select(
        &mut self,
        operand: Option<&Expr>,
        field: &str,
        test: bool,
    ) -> Result<Value, EvalError> {
        // With no operand the selection targets the environment itself
        let Some(operand) = operand else {
            if test {
                return Ok(Value::Bool(self.env.contains_key(field)));
            }
            return self
                .env
                .get(field)
                .cloned()
                .ok_or_else(|| EvalError::FieldNotFound(field.to_string()));
        };

        match self.evaluate(operand)? {
            Value::Null => {
                if test {
                    Ok(Value::Bool(false))
                } else {
                    Err(EvalError::TypeMismatch(format!(
                        "Cannot select field {} from null",
                        field
                    )))
                }
            }
            Value::Map(map) => {
                let key = MapKey::String(field.to_string());
                if test {
                    return Ok(Value::Bool(map.contains_key(&key)));
                }
                map.get(&key)
                    .cloned()
                    .ok_or_else(|| EvalError::FieldNotFound(field.to_string()))
            }
            other => Err(EvalError::TypeMismatch(format!(
                "Cannot select field from {}",
                other.type_name()
            ))),
        }
    }

    fn eval_call(
        &mut self,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
        is_macro: bool,
    ) -> Result<Value, EvalError> {
        if is_macro {
            if let Some(target) = target {
                let target = self.evaluate(target)?;

                // Macro arguments are a binding form: the first names the
                // iteration variable, the second stays unevaluated AST
                if args.is_empty() {
                    return Err(EvalError::BadArgument(format!(
                        "Macro {} requires arguments",
                        function
                    )));
                }
                let Expr::Identifier(name) = &args[0] else {
                    return Err(EvalError::BadArgument(format!(
                        "First argument to macro {} must be a variable name",
                        function
                    )));
                };
                if args.len() < 2 {
                    return Err(EvalError::BadArgument(format!(
                        "Macro {} requires an expression argument",
                        function
                    )));
                }

                return self.eval_macro(target, function, name, &args[1]);
            }
        }

        // Regular call: evaluate all arguments eagerly, left to right
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }

        match target {
            Some(target) => {
                let receiver = self.evaluate(target)?;
                self.functions.call_method(receiver, function, values)
            }
            None => self.functions.call_function(function, values),
        }
    }

    fn eval_macro(
        &mut self,
        target: Value,
        function: &str,
        name: &str,
        body: &Expr,
    ) -> Result<Value, EvalError> {
        let Value::List(items) = target else {
            return Err(EvalError::TypeMismatch(format!(
                "Macro {} requires a list target",
                function
            )));
        };

        // Save any prior binding of the iteration variable and restore it
        // whether the loop succeeds or errors
        let saved = self.env.get(name).cloned();

        let result = self.run_macro(&items, function, name, body);

        match saved {
            Some(value) => {
                self.env.insert(name.to_string(), value);
            }
            None => {
                self.env.remove(name);
            }
        }

        result
    }

    fn run_macro(
        &mut self,
        items: &[Value],
        function: &str,
        name: &str,
        body: &Expr,
    ) -> Result<Value, EvalError> {
        match function {
            "map" => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    self.env.insert(name.to_string(), item.clone());
                    results.push(self.evaluate(body)?);
                }
                Ok(Value::List(results))
            }
            "filter" => {
                let mut results = Vec::new();
                for item in items {
                    self.env.insert(name.to_string(), item.clone());
                    if self.evaluate(body)?.is_true() {
                        results.push(item.clone());
                    }
                }
                Ok(Value::List(results))
            }
            "all" => {
                for item in items {
                    self.env.insert(name.to_string(), item.clone());
                    if !self.evaluate(body)?.is_true() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            "exists" => {
                for item in items {
                    self.env.insert(name.to_string(), item.clone());
                    if self.evaluate(body)?.is_true() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            "existsOne" => {
                let mut count = 0;
                for item in items {
                    self.env.insert(name.to_string(), item.clone());
                    if self.evaluate(body)?.is_true() {
                        count += 1;
                        if count > 1 {
                            return Ok(Value::Bool(false));
                        }
                    }
                }
                Ok(Value::Bool(count == 1))
            }
            _ => Err(EvalError::UnknownFunction(function.to_string())),
        }
    }

    fn eval_comprehension(&mut self, comp: &Comprehension) -> Result<Value, EvalError> {
        let range = self.evaluate(&comp.range)?;
        let Value::List(items) = range else {
            return Err(EvalError::TypeMismatch(
                "Comprehension range must be a list".to_string(),
            ));
        };

        let saved_iter = self.env.get(&comp.variable).cloned();
        let saved_accu = self.env.get(&comp.accumulator).cloned();

        let result = self.run_comprehension(&items, comp);

        match saved_iter {
            Some(value) => {
                self.env.insert(comp.variable.clone(), value);
            }
            None => {
                self.env.remove(&comp.variable);
            }
        }
        match saved_accu {
            Some(value) => {
                self.env.insert(comp.accumulator.clone(), value);
            }
            None => {
                self.env.remove(&comp.accumulator);
            }
        }

        result
    }

    fn run_comprehension(
        &mut self,
        items: &[Value],
        comp: &Comprehension,
    ) -> Result<Value, EvalError> {
        let accumulator = self.evaluate(&comp.init)?;
        self.env.insert(comp.accumulator.clone(), accumulator);

        for item in items {
            self.env.insert(comp.variable.clone(), item.clone());

            if !self.evaluate(&comp.condition)?.is_true() {
                continue;
            }

            let accumulator = self.evaluate(&comp.step)?;
            self.env.insert(comp.accumulator.clone(), accumulator);
        }

        self.evaluate(&comp.result)
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, EvalError> {
        let operand = self.evaluate(operand)?;

        match op {
            UnaryOp::Not => match operand {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(EvalError::TypeMismatch(format!(
                    "NOT operator requires boolean operand, got {}",
                    other.type_name()
                ))),
            },
            UnaryOp::Negate => match operand {
                Value::Int(n) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::Overflow("negation".to_string())),
                Value::Double(d) => Ok(Value::Double(-d)),
                other => Err(EvalError::TypeMismatch(format!(
                    "Negation requires numeric operand, got {}",
                    other.type_name()
                ))),
            },
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        // Short-circuit: the unevaluated side can never raise
        if op == BinaryOp::And {
            if !self.evaluate(left)?.is_true() {
                return Ok(Value::Bool(false));
            }
            return Ok(Value::Bool(self.evaluate(right)?.is_true()));
        }
        if op == BinaryOp::Or {
            if self.evaluate(left)?.is_true() {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(self.evaluate(right)?.is_true()));
        }

        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        apply_binary(op, left, right)
    }

    fn eval_index(&mut self, operand: &Expr, index: &Expr) -> Result<Value, EvalError> {
        let operand = self.evaluate(operand)?;
        let index = self.evaluate(index)?;

        match operand {
            Value::Null => Err(EvalError::TypeMismatch(
                "Cannot index null value".to_string(),
            )),
            Value::List(items) => {
                let Value::Int(idx) = index else {
                    return Err(EvalError::TypeMismatch(
                        "List index must be an integer".to_string(),
                    ));
                };
                if idx < 0 || idx as usize >= items.len() {
                    return Err(EvalError::IndexOutOfBounds(format!("list index {}", idx)));
                }
                Ok(items.into_iter().nth(idx as usize).unwrap_or(Value::Null))
            }
            Value::Map(map) => {
                let key = MapKey::from_value(&index)
                    .ok_or_else(|| EvalError::KeyNotFound(index.to_string()))?;
                map.get(&key)
                    .cloned()
                    .ok_or_else(|| EvalError::KeyNotFound(index.to_string()))
            }
            Value::String(s) => {
                let Value::Int(idx) = index else {
                    return Err(EvalError::TypeMismatch(
                        "String index must be an integer".to_string(),
                    ));
                };
                if idx < 0 {
                    return Err(EvalError::IndexOutOfBounds(format!("string index {}", idx)));
                }
                match s.chars().nth(idx as usize) {
                    Some(ch) => Ok(Value::String(ch.to_string())),
                    None => Err(EvalError::IndexOutOfBounds(format!("string index {}", idx))),
                }
            }
            other => Err(EvalError::TypeMismatch(format!(
                "Cannot index type: {}",
                other.type_name()
            ))),
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) | Literal::Uint(n) => Value::Int(*n),
        Literal::Double(d) => Value::Double(*d),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bytes(b) => Value::Bytes(b.clone()),
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => apply_add(left, right),
        BinaryOp::Sub => match (left.as_num(), right.as_num()) {
            (Some(l), Some(r)) => arith(l, r, "subtraction", i64::checked_sub, |a, b| a - b),
            _ => Err(EvalError::TypeMismatch(format!(
                "Cannot subtract {} from {}",
                right.type_name(),
                left.type_name()
            ))),
        },
        BinaryOp::Mul => apply_mul(left, right),
        BinaryOp::Div => match (left.as_num(), right.as_num()) {
            (Some(l), Some(r)) => {
                // Division always widens to double
                let divisor = r.as_f64();
                if divisor == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Double(l.as_f64() / divisor))
            }
            _ => Err(EvalError::TypeMismatch(format!(
                "Cannot divide {} by {}",
                left.type_name(),
                right.type_name()
            ))),
        },
        BinaryOp::Mod => match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => {
                if *r == 0 {
                    return Err(EvalError::ModuloByZero);
                }
                l.checked_rem(*r)
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::Overflow("modulo".to_string()))
            }
            _ => Err(EvalError::TypeMismatch(format!(
                "Modulo requires integer operands, got {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
        BinaryOp::Eq => Ok(Value::Bool(equals(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(&left, &right))),
        BinaryOp::Lt => Ok(Value::Bool(compare(&left, &right)?.is_lt())),
        BinaryOp::Le => Ok(Value::Bool(compare(&left, &right)?.is_le())),
        BinaryOp::Gt => Ok(Value::Bool(compare(&left, &right)?.is_gt())),
        BinaryOp::Ge => Ok(Value::Bool(compare(&left, &right)?.is_ge())),
        BinaryOp::In => apply_in(left, right),
        BinaryOp::And | BinaryOp::Or => {
            unreachable!("logical operators are handled in eval_binary")
        }
    }
}

fn apply_add(left: Value, right: Value) -> Result<Value, EvalError> {
    match (left, right) {
        // String concatenation uses the other operand's string form
        (Value::String(l), right) => Ok(Value::String(format!("{}{}", l, right))),
        (left, Value::String(r)) => Ok(Value::String(format!("{}{}", left, r))),
        (Value::List(mut l), Value::List(r)) => {
            l.extend(r);
            Ok(Value::List(l))
        }
        (left, right) => match (left.as_num(), right.as_num()) {
            (Some(l), Some(r)) => arith(l, r, "addition", i64::checked_add, |a, b| a + b),
            _ => Err(EvalError::TypeMismatch(format!(
                "Invalid operands for addition: {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn apply_mul(left: Value, right: Value) -> Result<Value, EvalError> {
    if let (Some(l), Some(r)) = (left.as_num(), right.as_num()) {
        return arith(l, r, "multiplication", i64::checked_mul, |a, b| a * b);
    }

    match (left, right) {
        (Value::String(s), Value::Int(count)) => {
            let count = repetition_count(count)?;
            Ok(Value::String(s.repeat(count)))
        }
        (Value::List(items), Value::Int(count)) => {
            let count = repetition_count(count)?;
            let mut result = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                result.extend(items.iter().cloned());
            }
            Ok(Value::List(result))
        }
        (left, right) => Err(EvalError::TypeMismatch(format!(
            "Invalid operands for multiplication: {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn repetition_count(count: i64) -> Result<usize, EvalError> {
    usize::try_from(count)
        .map_err(|_| EvalError::BadArgument("Repetition count must be non-negative".to_string()))
}

// Mixed int/double arithmetic promotes both sides to double; pure integer
// arithmetic is checked and errors on overflow.
fn arith(
    left: Num,
    right: Num,
    op: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    double_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (left, right) {
        (Num::Int(l), Num::Int(r)) => int_op(l, r)
            .map(Value::Int)
            .ok_or_else(|| EvalError::Overflow(op.to_string())),
        _ => Ok(Value::Double(double_op(left.as_f64(), right.as_f64()))),
    }
}

fn apply_in(left: Value, right: Value) -> Result<Value, EvalError> {
    match right {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|item| equals(item, &left)))),
        Value::Map(map) => {
            let present = MapKey::from_value(&left).is_some_and(|key| map.contains_key(&key));
            Ok(Value::Bool(present))
        }
        Value::String(s) => match left {
            Value::String(sub) => Ok(Value::Bool(s.contains(&sub))),
            other => Err(EvalError::TypeMismatch(format!(
                "IN on a string requires a string left operand, got {}",
                other.type_name()
            ))),
        },
        other => Err(EvalError::TypeMismatch(format!(
            "IN operator requires list, map, or string on right side, got {}",
            other.type_name()
        ))),
    }
}

// Ordering for relational operators: numbers compare by double value,
// strings by code unit, booleans false < true, lists element-wise with
// length as the tiebreaker. Anything else is an error.
fn compare(left: &Value, right: &Value) -> Result<std::cmp::Ordering, EvalError> {
    if let (Some(l), Some(r)) = (left.as_num(), right.as_num()) {
        return Ok(l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal));
    }

    match (left, right) {
        (Value::String(l), Value::String(r)) => Ok(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Ok(l.cmp(r)),
        (Value::List(l), Value::List(r)) => {
            for (a, b) in l.iter().zip(r.iter()) {
                let ordering = compare(a, b)?;
                if ordering != std::cmp::Ordering::Equal {
                    return Ok(ordering);
                }
            }
            Ok(l.len().cmp(&r.len()))
        }
        _ => Err(EvalError::TypeMismatch(format!(
            "Cannot compare types: {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}
