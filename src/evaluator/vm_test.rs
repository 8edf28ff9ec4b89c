//! Unit tests for the evaluation machine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use crate::api::{Engine, EngineOptions};
use crate::context::{CancelToken, Ctx, MapSelector, Selector, SelectorKey};
use crate::evaluator::EvalError;
use crate::value::Value;
use crate::DynError;

fn engine_no_fold() -> Engine {
    Engine::with_options(EngineOptions {
        constant_folding: false,
        ..EngineOptions::default()
    })
}

/// Selector that records the order variables were asked for.
#[derive(Default)]
struct RecordingSelector {
    values: MapSelector,
    queried: Mutex<Vec<String>>,
}

impl RecordingSelector {
    fn new(values: MapSelector) -> Self {
        Self {
            values,
            queried: Mutex::new(Vec::new()),
        }
    }

    fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

impl Selector for RecordingSelector {
    fn get(&self, key: SelectorKey, name: &str) -> Result<Value, DynError> {
        self.queried.lock().unwrap().push(name.to_owned());
        self.values.get(key, name)
    }
}

/// Operator that counts its invocations and returns a fixed value.
fn counting_op(result: Value) -> (Arc<AtomicUsize>, impl Fn(&Ctx<'_>, &[Value]) -> Result<Value, DynError>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let op = move |_ctx: &Ctx<'_>, _params: &[Value]| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(result.clone())
    };
    (calls, op)
}

// ============================================================================
// Plain evaluation
// ============================================================================

#[test]
fn test_both_sides_of_an_eager_operator_run() {
    let vars = MapSelector::new();
    for engine in [Engine::new(), engine_no_fold()] {
        let expr = engine.compile("(1 + 2) * (3 + 4)").unwrap();
        assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Int(21));
    }
}

#[test]
fn test_selector_result_is_unified() {
    // A wall-clock time behaves as its Unix second, a duration as whole
    // seconds.
    let t = SystemTime::UNIX_EPOCH + Duration::from_secs(3);
    let vars = MapSelector::from_iter([
        ("x", Value::Time(t)),
        ("d", Value::Duration(Duration::from_millis(90_500))),
    ]);
    let engine = Engine::new();

    let expr = engine.compile("x + 2").unwrap();
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Int(5));

    let expr = engine.compile("d + 0").unwrap();
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Int(90));
}

#[test]
fn test_deep_left_chain() {
    // Exercises repeated first/second operator visits and stack reuse.
    let source = "x".to_owned() + &" + 1".repeat(100);
    let vars = MapSelector::from_iter([("x", 0i64)]);
    let expr = engine_no_fold().compile(&source).unwrap();
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Int(100));
}

#[test]
fn test_children_evaluate_left_to_right() {
    let values = MapSelector::from_iter([("a", 6i64), ("b", 2i64), ("c", 9i64), ("d", 3i64)]);
    let recorder = RecordingSelector::new(values);
    let expr = engine_no_fold().compile("a * b + c / d").unwrap();

    assert_eq!(expr.eval(&Ctx::new(&recorder)).unwrap(), Value::Int(15));
    assert_eq!(recorder.queried(), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_determinism() {
    let vars = MapSelector::from_iter([
        ("x", Value::from(3i64)),
        ("y", Value::from(4i64)),
        ("z", Value::from("hello")),
    ]);
    let expr = engine_no_fold()
        .compile(r#"if(x < y and z == "hello", x * y, x - y)"#)
        .unwrap();
    let first = expr.eval(&Ctx::new(&vars)).unwrap();
    let second = expr.eval(&Ctx::new(&vars)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Value::Int(12));
}

// ============================================================================
// Short-circuiting
// ============================================================================

#[test]
fn test_and_short_circuits_on_false() {
    let mut engine = engine_no_fold();
    let (calls, op) = counting_op(Value::Bool(true));
    engine.register_operator_fn("expensive", op);

    let expr = engine.compile("false and expensive()").unwrap();
    let vars = MapSelector::new();
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Bool(false));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_or_short_circuits_across_a_nested_gate() {
    let mut engine = engine_no_fold();
    let (calls, op) = counting_op(Value::Bool(true));
    engine.register_operator_fn("boom", op);

    let expr = engine.compile("true or (false and boom())").unwrap();
    let vars = MapSelector::new();
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Bool(true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_elided_selectors_are_not_queried() {
    let values = MapSelector::from_iter([("a", false), ("b", true), ("c", true)]);
    let recorder = RecordingSelector::new(values);
    let expr = engine_no_fold().compile("a and b and c").unwrap();

    assert_eq!(expr.eval(&Ctx::new(&recorder)).unwrap(), Value::Bool(false));
    assert_eq!(recorder.queried(), vec!["a"]);
}

#[test]
fn test_chained_rewind_resumes_the_right_sibling() {
    // `a` collapses both nested `and`s; evaluation resumes at `d`.
    let values =
        MapSelector::from_iter([("a", false), ("b", true), ("c", true), ("d", true)]);
    let recorder = RecordingSelector::new(values);
    let expr = engine_no_fold().compile("(a and b and c) or d").unwrap();

    assert_eq!(expr.eval(&Ctx::new(&recorder)).unwrap(), Value::Bool(true));
    assert_eq!(recorder.queried(), vec!["a", "d"]);
}

#[test]
fn test_short_circuit_under_an_eager_parent() {
    // The rewound value feeds the enclosing `not` normally.
    let values = MapSelector::from_iter([("a", false), ("b", true)]);
    let recorder = RecordingSelector::new(values);
    let expr = engine_no_fold().compile("not (a and b)").unwrap();

    assert_eq!(expr.eval(&Ctx::new(&recorder)).unwrap(), Value::Bool(true));
    assert_eq!(recorder.queried(), vec!["a"]);
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_cond_picks_exactly_one_branch() {
    let engine = Engine::new();
    let expr = engine.compile(r#"if(x < y, "lt", "ge")"#).unwrap();

    let vars = MapSelector::from_iter([("x", 3i64), ("y", 4i64)]);
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::from("lt"));

    let vars = MapSelector::from_iter([("x", 5i64), ("y", 4i64)]);
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::from("ge"));
}

#[test]
fn test_unchosen_branch_selectors_are_not_queried() {
    let values = MapSelector::from_iter([("x", 3i64), ("y", 4i64), ("a", 1i64), ("b", 2i64)]);
    let recorder = RecordingSelector::new(values);
    let expr = engine_no_fold().compile("if(x < y, a, b)").unwrap();

    assert_eq!(expr.eval(&Ctx::new(&recorder)).unwrap(), Value::Int(1));
    let queried = recorder.queried();
    assert_eq!(queried, vec!["x", "y", "a"]);

    let values = MapSelector::from_iter([("x", 9i64), ("y", 4i64), ("a", 1i64), ("b", 2i64)]);
    let recorder = RecordingSelector::new(values);
    assert_eq!(expr.eval(&Ctx::new(&recorder)).unwrap(), Value::Int(2));
    assert_eq!(recorder.queried(), vec!["x", "y", "b"]);
}

#[test]
fn test_nested_conditionals() {
    let engine = Engine::new();
    let expr = engine
        .compile("if(x < 10, if(x < 5, 1, 2), 3)")
        .unwrap();
    for (x, want) in [(2i64, 1i64), (7, 2), (12, 3)] {
        let vars = MapSelector::from_iter([("x", x)]);
        assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Int(want));
    }
}

#[test]
fn test_cond_result_feeds_an_eager_parent() {
    let engine = Engine::new();
    let expr = engine.compile("1 + if(x, 10, 20)").unwrap();
    let vars = MapSelector::from_iter([("x", true)]);
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Int(11));
    let vars = MapSelector::from_iter([("x", false)]);
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Int(21));
}

#[test]
fn test_cond_predicate_must_be_bool() {
    let engine = Engine::new();
    let expr = engine.compile("if(x, 1, 0)").unwrap();
    let vars = MapSelector::from_iter([("x", "hello")]);
    let err = expr.eval(&Ctx::new(&vars)).unwrap_err();
    assert!(matches!(
        err,
        EvalError::TypeMismatch {
            expected: "bool",
            ..
        }
    ));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_operator_failure_wraps_the_cause() {
    let mut engine = Engine::new();
    engine.register_operator_fn("fetch", |_ctx, _params| -> Result<Value, DynError> {
        Err("db down".into())
    });
    let expr = engine.compile("fetch()").unwrap();
    let vars = MapSelector::new();
    let err = expr.eval(&Ctx::new(&vars)).unwrap_err();

    let EvalError::Operator { operator, source } = &err else {
        panic!("expected an operator failure, got {:?}", err);
    };
    assert_eq!(operator.as_ref(), "fetch");
    assert_eq!(source.to_string(), "db down");
    assert_eq!(err.to_string(), "operator 'fetch' failed: db down");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_selector_failure_wraps_the_cause() {
    let engine = Engine::new();
    let expr = engine.compile("missing + 1").unwrap();
    let vars = MapSelector::new();
    let err = expr.eval(&Ctx::new(&vars)).unwrap_err();

    let EvalError::Selector { name, .. } = &err else {
        panic!("expected a selector failure, got {:?}", err);
    };
    assert_eq!(name.as_ref(), "missing");
}

#[test]
fn test_eval_bool_rejects_non_bool_results() {
    let engine = Engine::new();
    let expr = engine.compile("1 + 1").unwrap();
    let vars = MapSelector::new();
    let err = expr.eval_bool(&Ctx::new(&vars)).unwrap_err();
    assert!(matches!(
        err,
        EvalError::TypeMismatch {
            expected: "bool",
            ..
        }
    ));

    let expr = engine.compile("1 < 2").unwrap();
    assert!(expr.eval_bool(&Ctx::new(&vars)).unwrap());
}

#[test]
fn test_cancelled_token_stops_evaluation() {
    let engine = Engine::new();
    let expr = engine.compile("1 + x").unwrap();
    let vars = MapSelector::from_iter([("x", 1i64)]);

    let token = CancelToken::new();
    token.cancel();
    let ctx = Ctx::with_cancel(&vars, token);
    assert!(matches!(expr.eval(&ctx), Err(EvalError::Cancelled)));
}

// ============================================================================
// Trace mode
// ============================================================================

#[test]
fn test_trace_mode_is_transparent() {
    for source in [
        "(1 + 2) * (3 + 4)",
        "probe() or probe()",
        "probe() and probe()",
        "if(probe(), 1, 2)",
    ] {
        let mut results = Vec::new();
        let mut counts = Vec::new();
        for debug_trace in [false, true] {
            let mut engine = Engine::with_options(EngineOptions {
                constant_folding: false,
                debug_trace,
                ..EngineOptions::default()
            });
            let (calls, op) = counting_op(Value::Bool(true));
            engine.register_operator_fn("probe", op);

            let expr = engine.compile(source).unwrap();
            let vars = MapSelector::new();
            results.push(expr.eval(&Ctx::new(&vars)).unwrap());
            counts.push(calls.load(Ordering::SeqCst));
        }
        assert_eq!(results[0], results[1], "result differs for {:?}", source);
        assert_eq!(counts[0], counts[1], "operator calls differ for {:?}", source);
    }
}

#[test]
fn test_trace_mode_short_circuit() {
    // Exercises the rewind path through shadow nodes, including the
    // "short circuit triggered" marker branch.
    let engine = Engine::with_options(EngineOptions {
        constant_folding: false,
        debug_trace: true,
        ..EngineOptions::default()
    });
    let expr = engine.compile("(a and b) or c").unwrap();
    let vars = MapSelector::from_iter([("a", false), ("b", true), ("c", true)]);
    assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Bool(true));
}
