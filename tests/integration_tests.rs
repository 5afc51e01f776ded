// tests/integration_tests.rs

use std::sync::Arc;
use std::thread;

use cel_lang::{
    compile, eval, from_json, to_json, to_json_pretty, Environment, MapKey, Value,
};

fn env(pairs: Vec<(&str, Value)>) -> Environment {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn object(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(
        pairs
            .into_iter()
            .map(|(k, v)| (MapKey::String(k.to_string()), v))
            .collect(),
    )
}

fn ints(values: Vec<i64>) -> Value {
    Value::List(values.into_iter().map(Value::Int).collect())
}

fn strings(values: Vec<&str>) -> Value {
    Value::List(
        values
            .into_iter()
            .map(|s| Value::String(s.to_string()))
            .collect(),
    )
}

fn user(name: &str, active: bool) -> Value {
    object(vec![
        ("name", Value::String(name.to_string())),
        ("active", Value::Bool(active)),
    ])
}

// ============================================================================
// End-to-End Scenarios
// ============================================================================

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(eval("2 + 3 * 4", &Environment::new()).unwrap(), Value::Int(14));
}

#[test]
fn test_filter_then_map() {
    assert_eq!(
        eval("[1,2,3,4,5].filter(x, x>2).map(x, x*10)", &Environment::new()).unwrap(),
        ints(vec![30, 40, 50])
    );
}

#[test]
fn test_projection_over_structured_data() {
    let vars = env(vec![(
        "users",
        Value::List(vec![user("A", true), user("B", false), user("C", true)]),
    )]);

    assert_eq!(
        eval("users.filter(u, u.active).map(u, u.name)", &vars).unwrap(),
        strings(vec!["A", "C"])
    );
}

#[test]
fn test_role_check_predicate() {
    let vars = env(vec![
        ("user", object(vec![("roles", strings(vec!["admin", "user"]))])),
        ("permissions", strings(vec!["read", "write", "delete"])),
    ]);

    assert_eq!(
        eval(
            "\"admin\" in user.roles && \"delete\" in permissions",
            &vars
        )
        .unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn test_integer_division_widens() {
    assert_eq!(
        eval("15 / 3", &Environment::new()).unwrap(),
        Value::Double(5.0)
    );
}

#[test]
fn test_map_equality() {
    assert_eq!(
        eval("{\"a\":1}=={\"a\":1}", &Environment::new()).unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn test_list_ordering() {
    assert_eq!(
        eval("[1,2]<[1,2,3]", &Environment::new()).unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn test_short_circuit_hides_undefined_variable() {
    assert_eq!(
        eval("false && undefined_var", &Environment::new()).unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn test_octal_escape_decoding() {
    assert_eq!(
        eval("\"\\101\\040\\102\"", &Environment::new()).unwrap(),
        Value::String("A B".into())
    );
}

#[test]
fn test_all_macro_over_evens() {
    assert_eq!(
        eval("[2,4,6].all(x, x%2==0)", &Environment::new()).unwrap(),
        Value::Bool(true)
    );
}

// ============================================================================
// Compile Once, Evaluate Many
// ============================================================================

#[test]
fn test_compile_once_evaluate_many() {
    let program = compile("price * quantity > budget").unwrap();

    let cheap = env(vec![
        ("price", Value::Int(10)),
        ("quantity", Value::Int(2)),
        ("budget", Value::Int(100)),
    ]);
    let expensive = env(vec![
        ("price", Value::Int(10)),
        ("quantity", Value::Int(20)),
        ("budget", Value::Int(100)),
    ]);

    assert_eq!(program.evaluate(&cheap).unwrap(), Value::Bool(false));
    assert_eq!(program.evaluate(&expensive).unwrap(), Value::Bool(true));
    // A third evaluation with the first environment still agrees
    assert_eq!(program.evaluate(&cheap).unwrap(), Value::Bool(false));
}

#[test]
fn test_compiled_macros_with_different_environments() {
    let program = compile("users.filter(u, u.active).map(u, u.name)").unwrap();

    let first = env(vec![(
        "users",
        Value::List(vec![user("A", true), user("B", false)]),
    )]);
    let second = env(vec![(
        "users",
        Value::List(vec![user("X", false), user("Y", true), user("Z", true)]),
    )]);

    assert_eq!(program.evaluate(&first).unwrap(), strings(vec!["A"]));
    assert_eq!(program.evaluate(&second).unwrap(), strings(vec!["Y", "Z"]));
}

#[test]
fn test_caller_environment_is_never_mutated() {
    let program = compile("items.map(item, item * 2)").unwrap();
    let vars = env(vec![
        ("items", ints(vec![1, 2])),
        ("item", Value::String("shadowed".into())),
    ]);
    let before = vars.clone();

    program.evaluate(&vars).unwrap();
    assert_eq!(vars, before);
}

#[test]
fn test_program_is_shareable_across_threads() {
    let program = Arc::new(compile("n * n").unwrap());

    let handles: Vec<_> = (1..=4)
        .map(|n| {
            let program = Arc::clone(&program);
            thread::spawn(move || {
                let vars = env(vec![("n", Value::Int(n))]);
                program.evaluate(&vars).unwrap()
            })
        })
        .collect();

    let mut results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    results.sort_by_key(|v| match v {
        Value::Int(n) => *n,
        _ => 0,
    });
    assert_eq!(results, vec![Value::Int(1), Value::Int(4), Value::Int(9), Value::Int(16)]);
}

// ============================================================================
// Parse Errors Surface Before Evaluation
// ============================================================================

#[test]
fn test_syntax_errors_carry_position() {
    let error = compile("1 +\n* 2").unwrap_err();
    assert_eq!(error.line, 2);
    assert_eq!(error.column, 1);
}

#[test]
fn test_one_shot_eval_reports_parse_errors() {
    let result = eval("(1 + ", &Environment::new());
    match result {
        Err(cel_lang::Error::Parse(e)) => assert!(e.to_string().contains("line 1")),
        other => panic!("expected parse error, got {:?}", other),
    }
}

// ============================================================================
// JSON Output and Input
// ============================================================================

#[test]
fn test_json_output_is_deterministic() {
    let value = object(vec![
        ("b", Value::Int(2)),
        ("a", Value::Int(1)),
        ("c", strings(vec!["x"])),
    ]);
    assert_eq!(to_json(&value), "{\"a\":1,\"b\":2,\"c\":[\"x\"]}");
}

#[test]
fn test_pretty_json_output() {
    let value = object(vec![("a", ints(vec![1, 2]))]);
    assert_eq!(to_json_pretty(&value), "{\n  \"a\": [\n    1,\n    2\n  ]\n}");
}

#[test]
fn test_json_string_escaping() {
    let value = Value::String("line\n\"quoted\"".into());
    assert_eq!(to_json(&value), "\"line\\n\\\"quoted\\\"\"");
}

#[test]
fn test_environment_from_json() {
    let json: serde_json::Value =
        serde_json::from_str("{\"n\": 3, \"xs\": [1, 2.5], \"who\": {\"name\": \"A\"}}").unwrap();
    let Value::Map(map) = from_json(&json) else {
        panic!("expected a map");
    };
    let vars: Environment = map
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    assert_eq!(eval("n + 1", &vars).unwrap(), Value::Int(4));
    assert_eq!(eval("xs[1]", &vars).unwrap(), Value::Double(2.5));
    assert_eq!(
        eval("who.name", &vars).unwrap(),
        Value::String("A".into())
    );
}

#[test]
fn test_evaluation_result_round_trips_through_json() {
    let result = eval("{\"total\": 3 * 7, \"ok\": true}", &Environment::new()).unwrap();
    assert_eq!(to_json(&result), "{\"ok\":true,\"total\":21}");
}
