//! Selector integration: key-based dispatch, unification of context values,
//! failures, cancellation, and concurrent evaluation of one program.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use verdict::{
    CancelToken, Ctx, DynError, Engine, EngineOptions, EvalError, MapSelector, Selector,
    SelectorKey, Value,
};

#[test]
fn key_based_selector_dispatch() {
    // Declare the variables up front and dispatch on the assigned keys,
    // never looking at the names.
    let mut engine = Engine::with_options(EngineOptions {
        allow_undeclared_selectors: false,
        ..EngineOptions::default()
    });
    let age = engine.register_selector("age");
    let country = engine.register_selector("country");
    assert_eq!((age, country), (SelectorKey(0), SelectorKey(1)));

    struct SlotSelector {
        slots: Vec<Value>,
    }
    impl Selector for SlotSelector {
        fn get(&self, key: SelectorKey, _name: &str) -> Result<Value, DynError> {
            self.slots
                .get(key.0 as usize)
                .cloned()
                .ok_or_else(|| format!("no slot for key {}", key.0).into())
        }
    }

    let expr = engine
        .compile(r#"age >= 18 and country == "US""#)
        .unwrap();
    let selector = SlotSelector {
        slots: vec![Value::Int(30), Value::from("US")],
    };
    assert!(expr.eval_bool(&Ctx::new(&selector)).unwrap());
}

#[test]
fn context_times_and_durations_unify() {
    struct ClockSelector {
        now: SystemTime,
    }
    impl Selector for ClockSelector {
        fn get(&self, _key: SelectorKey, name: &str) -> Result<Value, DynError> {
            match name {
                "now" => Ok(Value::Time(self.now)),
                "ttl" => Ok(Value::Duration(Duration::from_secs(90))),
                other => Err(format!("unknown variable '{}'", other).into()),
            }
        }
    }

    let engine = Engine::new();
    let expr = engine.compile("now + ttl").unwrap();
    let selector = ClockSelector {
        now: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000),
    };
    assert_eq!(expr.eval(&Ctx::new(&selector)).unwrap(), Value::Int(1_090));
}

#[test]
fn selector_failure_aborts_evaluation() {
    let engine = Engine::new();
    let expr = engine.compile("a + missing").unwrap();
    let vars = MapSelector::from_iter([("a", 1i64)]);
    let err = expr.eval(&Ctx::new(&vars)).unwrap_err();
    let EvalError::Selector { name, source } = &err else {
        panic!("expected a selector failure, got {:?}", err);
    };
    assert_eq!(name.as_ref(), "missing");
    assert_eq!(source.to_string(), "unknown variable 'missing'");
}

#[test]
fn cancellation_between_nodes() {
    // The selector cancels the token while evaluation is in flight; the
    // machine notices at the next node boundary.
    struct CancellingSelector {
        token: CancelToken,
    }
    impl Selector for CancellingSelector {
        fn get(&self, _key: SelectorKey, _name: &str) -> Result<Value, DynError> {
            self.token.cancel();
            Ok(Value::Int(1))
        }
    }

    let engine = Engine::new();
    let expr = engine.compile("x + (1 + 2 * x)").unwrap();
    let token = CancelToken::new();
    let selector = CancellingSelector {
        token: token.clone(),
    };
    let ctx = Ctx::with_cancel(&selector, token);
    assert!(matches!(expr.eval(&ctx), Err(EvalError::Cancelled)));
}

#[test]
fn deadline_cancellation() {
    let engine = Engine::new();
    let expr = engine.compile("1 + x").unwrap();
    let vars = MapSelector::from_iter([("x", 1i64)]);

    let expired = CancelToken::with_deadline(Duration::from_secs(0));
    let ctx = Ctx::with_cancel(&vars, expired);
    assert!(matches!(expr.eval(&ctx), Err(EvalError::Cancelled)));

    let generous = CancelToken::with_deadline(Duration::from_secs(3600));
    let ctx = Ctx::with_cancel(&vars, generous);
    assert_eq!(expr.eval(&ctx).unwrap(), Value::Int(2));
}

#[test]
fn one_program_many_threads() {
    // A compiled expression is immutable shared data; each evaluation owns
    // its stacks and context.
    let engine = Engine::new();
    let expr = Arc::new(
        engine
            .compile("if(n % 2 == 0, n / 2, 3 * n + 1)")
            .unwrap(),
    );

    let mut handles = Vec::new();
    for n in 0i64..8 {
        let expr = expr.clone();
        handles.push(thread::spawn(move || {
            let vars = MapSelector::from_iter([("n", n)]);
            expr.eval(&Ctx::new(&vars)).unwrap()
        }));
    }
    for (n, handle) in (0i64..).zip(handles) {
        let want = if n % 2 == 0 { n / 2 } else { 3 * n + 1 };
        assert_eq!(handle.join().unwrap(), Value::Int(want));
    }
}

#[test]
fn narrow_integer_contexts_widen_before_evaluation() {
    // Callers hand narrow integers to the map; conversion widens them on
    // insertion, so the machine only ever sees 64-bit values.
    let mut vars = MapSelector::new();
    vars.insert("small", 3i32);
    vars.insert("tiny", 4u8);
    assert_eq!(verdict::eval("small + tiny", &vars).unwrap(), Value::Int(7));
}
