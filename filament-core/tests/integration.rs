//! End-to-end graph behavior: laziness, eagerness, diamonds, cycles,
//! dynamic reconnection, and the status machine across whole chains.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use filament_core::{ComputeResult, LexicalScope, Signal, SignalError, Status, Value};

/// A plain settable integer input, registered in `scope` under its name.
fn int_input(name: &str, default: i64, scope: &LexicalScope) -> Signal {
    let signal = Signal::input(
        name,
        move |args: &[Value]| match args {
            [] => ComputeResult::Value(Value::Int(default)),
            [v] => ComputeResult::Value(v.clone()),
            _ => ComputeResult::NoUpdate,
        },
        vec![],
        scope,
    )
    .unwrap();
    scope.define(name, Value::Signal(signal.clone()));
    signal
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[test]
fn lazy_chain_recomputes_on_read_only() {
    let scope = LexicalScope::new();
    let s0 = int_input("s0", 10, &scope);

    let c1 = counter();
    let c2 = counter();

    let s1 = Signal::watch(
        "s1",
        {
            let c1 = c1.clone();
            move |args: &[Value]| {
                c1.fetch_add(1, Ordering::SeqCst);
                ComputeResult::Value(Value::Int(args[0].as_int().unwrap() + 1))
            }
        },
        vec!["s0".into()],
        &scope,
    )
    .unwrap();
    scope.define("s1", Value::Signal(s1.clone()));

    let s2 = Signal::watch(
        "s2",
        {
            let c2 = c2.clone();
            move |args: &[Value]| {
                c2.fetch_add(1, Ordering::SeqCst);
                ComputeResult::Value(Value::Int(args[0].as_int().unwrap() + 1))
            }
        },
        vec!["s1".into()],
        &scope,
    )
    .unwrap();

    // Nothing has been read yet, so nothing has computed.
    assert_eq!(c1.load(Ordering::SeqCst), 0);
    assert_eq!(s1.status(), Status::Stale);

    assert_eq!(s2.value().unwrap(), Value::Int(12));
    assert_eq!(c1.load(Ordering::SeqCst), 1);
    assert_eq!(c2.load(Ordering::SeqCst), 1);

    // Reading again hits the cache.
    assert_eq!(s2.value().unwrap(), Value::Int(12));
    assert_eq!(c2.load(Ordering::SeqCst), 1);

    // A set only marks the chain stale.
    s0.set(2i64).unwrap();
    assert_eq!(c1.load(Ordering::SeqCst), 1);
    assert_eq!(s1.status(), Status::Stale);
    assert_eq!(s2.status(), Status::Stale);

    assert_eq!(s2.value().unwrap(), Value::Int(4));
    assert_eq!(s1.value().unwrap(), Value::Int(3));
    assert_eq!(c1.load(Ordering::SeqCst), 2);
    assert_eq!(c2.load(Ordering::SeqCst), 2);
}

#[test]
fn eager_chain_updates_without_reads() {
    let scope = LexicalScope::new();
    let s0 = int_input("s0", 1, &scope);

    let a1 = Signal::act(
        "a1",
        |args: &[Value]| ComputeResult::Value(Value::Int(args[0].as_int().unwrap() * 10)),
        vec!["s0".into()],
        &scope,
    )
    .unwrap();
    scope.define("a1", Value::Signal(a1.clone()));

    let a2 = Signal::act(
        "a2",
        |args: &[Value]| ComputeResult::Value(Value::Int(args[0].as_int().unwrap() + 1)),
        vec!["a1".into()],
        &scope,
    )
    .unwrap();

    // Already computed at construction.
    assert_eq!(a1.update_count(), 1);
    assert_eq!(a2.update_count(), 1);

    s0.set(5i64).unwrap();
    assert_eq!(a1.update_count(), 2);
    assert_eq!(a2.update_count(), 2);
    assert_eq!(a1.value().unwrap(), Value::Int(50));
    assert_eq!(a2.value().unwrap(), Value::Int(51));
    assert_eq!(a1.previous(), Some(Value::Int(10)));
}

#[test]
fn diamond_recomputes_each_node_once() {
    let scope = LexicalScope::new();
    let a = int_input("a", 1, &scope);

    let cd = counter();

    let b = Signal::act(
        "b",
        |args: &[Value]| ComputeResult::Value(Value::Int(args[0].as_int().unwrap() + 10)),
        vec!["a".into()],
        &scope,
    )
    .unwrap();
    scope.define("b", Value::Signal(b.clone()));

    let c = Signal::act(
        "c",
        |args: &[Value]| ComputeResult::Value(Value::Int(args[0].as_int().unwrap() + 100)),
        vec!["a".into()],
        &scope,
    )
    .unwrap();
    scope.define("c", Value::Signal(c.clone()));

    let d = Signal::act(
        "d",
        {
            let cd = cd.clone();
            move |args: &[Value]| {
                cd.fetch_add(1, Ordering::SeqCst);
                let sum = args[0].as_int().unwrap() + args[1].as_int().unwrap();
                ComputeResult::Value(Value::Int(sum))
            }
        },
        vec!["b".into(), "c".into()],
        &scope,
    )
    .unwrap();

    assert_eq!(d.value().unwrap(), Value::Int(112));
    assert_eq!(cd.load(Ordering::SeqCst), 1);

    // One set, one recompute per node, the join seeing both inputs fresh.
    a.set(2i64).unwrap();
    assert_eq!(cd.load(Ordering::SeqCst), 2);
    assert_eq!(b.update_count(), 2);
    assert_eq!(c.update_count(), 2);
    assert_eq!(d.value().unwrap(), Value::Int(114));
}

#[test]
fn source_counts_genuine_updates_only() {
    let scope = LexicalScope::new();
    let counter = Signal::source(
        "counter",
        |args: &[Value]| match args {
            [] => ComputeResult::Value(Value::Int(0)),
            [v] => ComputeResult::Value(v.clone()),
            _ => ComputeResult::NoUpdate,
        },
        vec![],
        &scope,
    )
    .unwrap();

    // The default seeds the value without counting as an update.
    assert_eq!(counter.value().unwrap(), Value::Int(0));
    assert_eq!(counter.update_count(), 0);

    counter.set(5i64).unwrap();
    counter.set(6i64).unwrap();
    assert_eq!(counter.value().unwrap(), Value::Int(6));
    assert_eq!(counter.update_count(), 2);
    assert_eq!(counter.previous(), Some(Value::Int(5)));
}

#[test]
fn unresolved_dependency_repairs_itself_on_read() {
    let scope = LexicalScope::new();

    let w = Signal::watch(
        "w",
        |args: &[Value]| ComputeResult::Value(args[0].clone()),
        vec!["missing".into()],
        &scope,
    )
    .unwrap();

    assert!(!w.is_connected());
    assert_eq!(w.status(), Status::Unconnected);
    assert_eq!(
        w.not_connected_reason().as_deref(),
        Some("signal 'missing' does not exist")
    );
    assert!(matches!(w.value(), Err(SignalError::NotConnected { .. })));

    // Declare the missing signal; the next read reconnects silently.
    int_input("missing", 8, &scope);
    assert_eq!(w.value().unwrap(), Value::Int(8));
    assert!(w.is_connected());
    assert_eq!(w.status(), Status::Ok);
}

#[test]
fn explicit_disconnect_is_sticky() {
    let scope = LexicalScope::new();
    int_input("a", 1, &scope);

    let w = Signal::watch(
        "w",
        |args: &[Value]| ComputeResult::Value(args[0].clone()),
        vec!["a".into()],
        &scope,
    )
    .unwrap();
    assert_eq!(w.value().unwrap(), Value::Int(1));

    w.disconnect();
    assert_eq!(w.status(), Status::Unconnected);
    assert_eq!(
        w.not_connected_reason().as_deref(),
        Some("explicitly disconnected")
    );
    // Reads do not silently repair an explicit disconnect.
    assert!(matches!(w.value(), Err(SignalError::NotConnected { .. })));
    assert!(matches!(w.value(), Err(SignalError::NotConnected { .. })));

    w.connect().unwrap();
    assert_eq!(w.value().unwrap(), Value::Int(1));
}

#[test]
fn disconnect_propagates_through_the_chain() {
    let scope = LexicalScope::new();
    int_input("a", 1, &scope);

    let b = Signal::watch(
        "b",
        |args: &[Value]| ComputeResult::Value(args[0].clone()),
        vec!["a".into()],
        &scope,
    )
    .unwrap();
    scope.define("b", Value::Signal(b.clone()));

    let c = Signal::watch(
        "c",
        |args: &[Value]| ComputeResult::Value(args[0].clone()),
        vec!["b".into()],
        &scope,
    )
    .unwrap();
    assert_eq!(c.value().unwrap(), Value::Int(1));

    b.disconnect();
    assert_eq!(c.status(), Status::Unconnected);
    assert!(matches!(c.value(), Err(SignalError::NotConnected { .. })));

    b.connect().unwrap();
    assert_eq!(c.value().unwrap(), Value::Int(1));
    assert_eq!(c.status(), Status::Ok);
}

#[test]
fn unchanged_results_stop_the_wave() {
    let scope = LexicalScope::new();
    let a = int_input("a", 2, &scope);

    let cb = counter();
    let cc = counter();

    let b = Signal::act(
        "b",
        {
            let cb = cb.clone();
            move |args: &[Value]| {
                cb.fetch_add(1, Ordering::SeqCst);
                ComputeResult::Value(Value::Int(args[0].as_int().unwrap().abs()))
            }
        },
        vec!["a".into()],
        &scope,
    )
    .unwrap();
    scope.define("b", Value::Signal(b.clone()));

    let c = Signal::act(
        "c",
        {
            let cc = cc.clone();
            move |args: &[Value]| {
                cc.fetch_add(1, Ordering::SeqCst);
                ComputeResult::Value(args[0].clone())
            }
        },
        vec!["b".into()],
        &scope,
    )
    .unwrap();

    assert_eq!(c.value().unwrap(), Value::Int(2));
    assert_eq!(cb.load(Ordering::SeqCst), 1);
    assert_eq!(cc.load(Ordering::SeqCst), 1);

    // |−2| == |2|: b recomputes, finds nothing new, and the change dies
    // out before reaching c.
    a.set(-2i64).unwrap();
    assert_eq!(cb.load(Ordering::SeqCst), 2);
    assert_eq!(cc.load(Ordering::SeqCst), 1);
    assert_eq!(b.update_count(), 1);

    // c's cached value is still current, so the pass must not leave it
    // stale, and the next read must not recompute anything.
    assert_eq!(c.status(), Status::Ok);
    assert_eq!(c.value().unwrap(), Value::Int(2));
    assert_eq!(cc.load(Ordering::SeqCst), 1);
}

#[test]
fn circular_inputs_converge() {
    let scope = LexicalScope::new();

    // s2 follows s1 + 5; s1 follows s2 - 5. Each also has its own default
    // and stays settable.
    let s1 = Signal::input(
        "s1",
        |args: &[Value]| match args {
            [] => ComputeResult::Value(Value::Int(15)),
            [v] => ComputeResult::Value(v.clone()),
            [_prev, up] => ComputeResult::Value(Value::Int(up.as_int().unwrap() - 5)),
            _ => ComputeResult::NoUpdate,
        },
        vec!["s2".into()],
        &scope,
    )
    .unwrap();
    scope.define("s1", Value::Signal(s1.clone()));

    let s2 = Signal::input(
        "s2",
        |args: &[Value]| match args {
            [] => ComputeResult::Value(Value::Int(20)),
            [v] => ComputeResult::Value(v.clone()),
            [_prev, up] => ComputeResult::Value(Value::Int(up.as_int().unwrap() + 5)),
            _ => ComputeResult::NoUpdate,
        },
        vec!["s1".into()],
        &scope,
    )
    .unwrap();
    scope.define("s2", Value::Signal(s2.clone()));

    // s1 was declared before s2 existed; close the cycle now.
    s1.connect().unwrap();

    assert_eq!(s1.value().unwrap(), Value::Int(15));
    assert_eq!(s2.value().unwrap(), Value::Int(20));
    assert_eq!(s1.status(), Status::Ok);
    assert_eq!(s2.status(), Status::Ok);

    s1.set(100i64).unwrap();
    assert_eq!(s1.value().unwrap(), Value::Int(100));
    assert_eq!(s2.value().unwrap(), Value::Int(105));

    s2.set(200i64).unwrap();
    assert_eq!(s2.value().unwrap(), Value::Int(200));
    assert_eq!(s1.value().unwrap(), Value::Int(195));
}

#[test]
fn pure_lazy_cycle_reads_fail_cleanly() {
    let scope = LexicalScope::new();

    let bump = |args: &[Value]| match args[0].as_int() {
        Some(n) => ComputeResult::Value(Value::Int(n + 1)),
        None => ComputeResult::NoUpdate,
    };

    let w1 = Signal::watch("w1", bump, vec!["w3".into()], &scope).unwrap();
    scope.define("w1", Value::Signal(w1.clone()));
    let w2 = Signal::watch("w2", bump, vec!["w1".into()], &scope).unwrap();
    scope.define("w2", Value::Signal(w2.clone()));
    let w3 = Signal::watch("w3", bump, vec!["w2".into()], &scope).unwrap();
    scope.define("w3", Value::Signal(w3.clone()));
    assert!(w1.try_connect());

    // No member of the cycle can produce a first value; a read must fail
    // with "not ready" rather than recurse forever.
    let err = w1.value().unwrap_err();
    assert!(err.is_not_ready());
}

#[test]
fn wildcard_dependencies_follow_the_holder() {
    let scope = LexicalScope::new();

    let flex = |default: i64| {
        move |args: &[Value]| match args {
            [] => ComputeResult::Value(Value::Int(default)),
            [v] => ComputeResult::Value(v.clone()),
            _ => ComputeResult::NoUpdate,
        }
    };
    let f1 = Signal::input("f1", flex(1), vec![], &scope).unwrap();
    let f2 = Signal::input("f2", flex(2), vec![], &scope).unwrap();

    let make_items = |flexes: Vec<Signal>| {
        Value::List(
            flexes
                .into_iter()
                .map(|f| Value::object([("flex", Value::Signal(f))]))
                .collect(),
        )
    };

    let items = Signal::input(
        "items",
        {
            let initial = make_items(vec![f1.clone(), f2.clone()]);
            move |args: &[Value]| match args {
                [] => ComputeResult::Value(initial.clone()),
                [v] => ComputeResult::Value(v.clone()),
                _ => ComputeResult::NoUpdate,
            }
        },
        vec![],
        &scope,
    )
    .unwrap();
    scope.define("items", Value::Signal(items.clone()));

    let sum = Signal::watch(
        "sum",
        |args: &[Value]| {
            let total: i64 = args.iter().filter_map(Value::as_int).sum();
            ComputeResult::Value(Value::Int(total))
        },
        vec!["items.*.flex".into()],
        &scope,
    )
    .unwrap();

    assert_eq!(sum.value().unwrap(), Value::Int(3));

    // Changes of an element propagate.
    f1.set(5i64).unwrap();
    assert_eq!(sum.value().unwrap(), Value::Int(7));

    // Replacing the holder's value rewires the dependency set.
    let f3 = Signal::input("f3", flex(10), vec![], &scope).unwrap();
    items.set(make_items(vec![f3.clone()])).unwrap();
    assert_eq!(sum.value().unwrap(), Value::Int(10));

    // The old elements are no longer dependencies.
    f1.set(99i64).unwrap();
    assert_eq!(sum.value().unwrap(), Value::Int(10));
    f3.set(11i64).unwrap();
    assert_eq!(sum.value().unwrap(), Value::Int(11));
}

#[test]
fn hybrid_source_reacts_and_stays_settable() {
    let scope = LexicalScope::new();
    let price = int_input("price", 100, &scope);

    // Doubles the price on every upstream change; no default of its own;
    // still accepts manual overrides.
    let total = Signal::source(
        "total",
        |args: &[Value]| match args {
            [] => ComputeResult::NoUpdate,
            [v] => ComputeResult::Value(v.clone()),
            [_prev, up] => ComputeResult::Value(Value::Int(up.as_int().unwrap() * 2)),
            _ => ComputeResult::NoUpdate,
        },
        vec!["price".into()],
        &scope,
    )
    .unwrap();

    assert_eq!(total.value().unwrap(), Value::Int(200));

    price.set(10i64).unwrap();
    assert_eq!(total.value().unwrap(), Value::Int(20));

    // Manual override holds until the next upstream change.
    total.set(999i64).unwrap();
    assert_eq!(total.value().unwrap(), Value::Int(999));
    price.set(50i64).unwrap();
    assert_eq!(total.value().unwrap(), Value::Int(100));
}

#[test]
fn thermostat_pipeline() {
    use parking_lot::Mutex;

    let scope = LexicalScope::new();
    let celsius = Signal::input(
        "celsius",
        |args: &[Value]| match args {
            [] => ComputeResult::Value(Value::Float(0.0)),
            [v] => match v.as_f64() {
                Some(c) => ComputeResult::Value(Value::Float(c)),
                None => ComputeResult::NoUpdate,
            },
            _ => ComputeResult::NoUpdate,
        },
        vec![],
        &scope,
    )
    .unwrap();
    scope.define("celsius", Value::Signal(celsius.clone()));

    let fahrenheit = Signal::watch(
        "fahrenheit",
        |args: &[Value]| {
            let c = args[0].as_f64().unwrap();
            ComputeResult::Value(Value::Float(c * 9.0 / 5.0 + 32.0))
        },
        vec!["celsius".into()],
        &scope,
    )
    .unwrap();
    scope.define("fahrenheit", Value::Signal(fahrenheit.clone()));

    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let _display = Signal::act(
        "display",
        move |args: &[Value]| {
            sink.lock().push(format!("{}F", args[0]));
            ComputeResult::NoUpdate
        },
        vec!["fahrenheit".into()],
        &scope,
    )
    .unwrap();

    celsius.set(100.0).unwrap();
    assert_eq!(fahrenheit.value().unwrap(), Value::Float(212.0));

    let lines = log.lock().clone();
    assert_eq!(lines, vec!["32F".to_string(), "212F".to_string()]);

    // A set that coerces to the same value stays quiet.
    celsius.set(100.0).unwrap();
    assert_eq!(log.lock().len(), 2);
}
