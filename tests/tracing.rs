//! Debug tracing is strictly diagnostic: a trace-compiled program must
//! return the same values, invoke the same operators in the same order, and
//! query the same selectors as its plain twin.

use std::sync::{Arc, Mutex};

use verdict::{
    Ctx, DynError, Engine, EngineOptions, MapSelector, Selector, SelectorKey, Value,
};

#[derive(Default, Clone)]
struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

struct JournalingSelector {
    values: MapSelector,
    journal: Journal,
}

impl Selector for JournalingSelector {
    fn get(&self, key: SelectorKey, name: &str) -> Result<Value, DynError> {
        self.journal.record(format!("get {}", name));
        self.values.get(key, name)
    }
}

fn engine_with_journal(journal: &Journal, debug_trace: bool) -> Engine {
    let mut engine = Engine::with_options(EngineOptions {
        constant_folding: false,
        debug_trace,
        ..EngineOptions::default()
    });
    for (name, result) in [("low", 10i64), ("high", 100i64)] {
        let journal = journal.clone();
        engine.register_operator_fn(name, move |_ctx, _params| {
            journal.record(format!("call {}", name));
            Ok(Value::Int(result))
        });
    }
    let journal = journal.clone();
    engine.register_operator_fn("flag", move |_ctx, params| {
        journal.record("call flag");
        match params {
            [Value::Int(n)] => Ok(Value::Bool(*n > 50)),
            _ => Err("'flag' expects an int".into()),
        }
    });
    engine
}

#[test]
fn trace_mode_preserves_results_and_event_order() {
    let sources = [
        "(1 + 2) * (3 + 4)",
        "low() + high()",
        "flag(low()) or flag(high())",
        "flag(high()) or flag(low())",
        "if(flag(score), high(), low())",
        "score > 40 and flag(score)",
        "(a and b) or flag(score)",
    ];

    for source in sources {
        let mut outcomes = Vec::new();
        for debug_trace in [false, true] {
            let journal = Journal::default();
            let engine = engine_with_journal(&journal, debug_trace);
            let expr = engine.compile(source).unwrap();

            let selector = JournalingSelector {
                values: MapSelector::from_iter([
                    ("score", Value::from(60i64)),
                    ("a", Value::Bool(true)),
                    ("b", Value::Bool(false)),
                ]),
                journal: journal.clone(),
            };
            let result = expr.eval(&Ctx::new(&selector)).unwrap();
            outcomes.push((result, journal.take()));
        }

        assert_eq!(
            outcomes[0], outcomes[1],
            "trace mode changed behavior for {:?}",
            source
        );
    }
}

#[test]
fn trace_tables_are_twice_as_large() {
    let journal = Journal::default();
    let plain = engine_with_journal(&journal, false)
        .compile("low() + high()")
        .unwrap();
    let traced = engine_with_journal(&journal, true)
        .compile("low() + high()")
        .unwrap();
    assert_eq!(traced.node_count(), 2 * plain.node_count());
    assert_eq!(traced.max_stack_size(), plain.max_stack_size());
}
