//! Integration Tests for the Reactive Layer
//!
//! These tests verify that observables, computed values, actions and
//! reactions work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures_util::FutureExt;
use serde_json::json;

use trellis_core::{
    autorun, computed, observable, reaction, run_in_action, transaction, when, when_future,
    Boxed, Config, Depth, Prototype, ReactiveError, Runtime, TrackedValue,
};

/// Run `f` with a fresh runtime installed as current.
fn isolated<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    let runtime = Runtime::new(Config::default());
    let _scope = runtime.enter();
    f(&runtime)
}

/// The box/doubled scenario: the getter runs once per invalidating write.
#[test]
fn computed_over_box() {
    isolated(|_| {
        let count = Boxed::new(1);
        let getter_runs = Rc::new(Cell::new(0));

        let doubled = {
            let count = count.clone();
            let getter_runs = getter_runs.clone();
            computed(move || {
                getter_runs.set(getter_runs.get() + 1);
                count.get() * 2
            })
        };

        assert_eq!(doubled.get(), 2);
        count.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(getter_runs.get(), 2);
    });
}

/// Test that a read after a write observes the write.
#[test]
fn read_after_write() {
    isolated(|_| {
        let name = Boxed::new(String::from("a"));
        name.set("b".into());
        assert_eq!(name.get(), "b");
    });
}

/// Test that two writes in one transaction cause one reaction run.
#[test]
fn transaction_batches_writes() {
    isolated(|_| {
        let first = Boxed::new(0);
        let second = Boxed::new(0);
        let runs = Rc::new(Cell::new(0));

        let _disposer = {
            let (first, second, runs) = (first.clone(), second.clone(), runs.clone());
            autorun(move || {
                first.get();
                second.get();
                runs.set(runs.get() + 1);
            })
        };
        assert_eq!(runs.get(), 1);

        transaction(|| {
            first.set(1);
            second.set(2);
        });
        assert_eq!(runs.get(), 2);
    });
}

/// Test that nested transactions flush once, with the final value.
#[test]
fn nested_transactions_flush_once() {
    isolated(|runtime| {
        let value = Boxed::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let _disposer = {
            let value = value.clone();
            let seen = seen.clone();
            autorun(move || seen.borrow_mut().push(value.get()))
        };

        transaction(|| {
            value.set(1);
            transaction(|| {
                value.set(2);
                value.set(3);
            });
            assert_eq!(runtime.depth(), 1);
            assert_eq!(*seen.borrow(), vec![0]);
        });

        assert_eq!(*seen.borrow(), vec![0, 3]);
    });
}

/// Test that reads inside an action do not subscribe the caller.
#[test]
fn actions_are_untracked() {
    isolated(|_| {
        let tracked = Boxed::new(1);
        let hidden = Boxed::new(1);
        let runs = Rc::new(Cell::new(0));

        let _disposer = {
            let (tracked, hidden, runs) = (tracked.clone(), hidden.clone(), runs.clone());
            autorun(move || {
                tracked.get();
                run_in_action(|| hidden.get());
                runs.set(runs.get() + 1);
            })
        };

        hidden.set(2);
        assert_eq!(runs.get(), 1);
        tracked.set(2);
        assert_eq!(runs.get(), 2);
    });
}

/// Test that an action inside a computed getter stays untracked even when a
/// reaction watches the box it reads.
#[test]
fn action_in_computed_ignores_watched_reads() {
    isolated(|_| {
        let a = Boxed::new(1);
        let b = Boxed::new(10);
        let runs = Rc::new(Cell::new(0));

        let _watcher = {
            let b = b.clone();
            autorun(move || {
                b.get();
            })
        };
        let c = {
            let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
            computed(move || {
                runs.set(runs.get() + 1);
                a.get() + run_in_action(|| b.get())
            })
        };

        assert_eq!(c.get(), 11);
        b.set(20);
        assert!(c.is_valid());
        assert_eq!(c.get(), 11);
        assert_eq!(runs.get(), 1);

        a.set(2);
        assert_eq!(c.get(), 22);
        assert_eq!(runs.get(), 2);
    });
}

/// Test that an autorun stays put when a hidden box it shares with another
/// reaction is written.
#[test]
fn hidden_reads_survive_a_second_watcher() {
    isolated(|_| {
        let tracked = Boxed::new(1);
        let hidden = Boxed::new(1);
        let runs = Rc::new(Cell::new(0));
        let watcher_runs = Rc::new(Cell::new(0));

        let _watcher = {
            let (hidden, watcher_runs) = (hidden.clone(), watcher_runs.clone());
            autorun(move || {
                hidden.get();
                watcher_runs.set(watcher_runs.get() + 1);
            })
        };
        let _disposer = {
            let (tracked, hidden, runs) = (tracked.clone(), hidden.clone(), runs.clone());
            autorun(move || {
                tracked.get();
                run_in_action(|| hidden.get());
                runs.set(runs.get() + 1);
            })
        };

        hidden.set(2);
        assert_eq!(watcher_runs.get(), 2);
        assert_eq!(runs.get(), 1);
        tracked.set(2);
        assert_eq!(runs.get(), 2);
    });
}

/// Test that `when` fires exactly once and then disposes itself.
#[test]
fn when_is_one_shot() {
    isolated(|runtime| {
        let level = Boxed::new(0);
        let fired = Rc::new(Cell::new(0));

        let disposer = {
            let level = level.clone();
            let fired = fired.clone();
            when(move || level.get() > 1, move || fired.set(fired.get() + 1))
        };

        level.set(1);
        assert_eq!(fired.get(), 0);
        level.set(2);
        level.set(3);
        assert_eq!(fired.get(), 1);
        assert!(disposer.is_disposed());
        assert_eq!(runtime.pending_reactions(), 0);
    });
}

/// Test that disposing twice is harmless and stops further runs.
#[test]
fn disposal_is_idempotent() {
    isolated(|runtime| {
        let value = Boxed::new(0);
        let runs = Rc::new(Cell::new(0));

        let disposer = {
            let (value, runs) = (value.clone(), runs.clone());
            reaction(move || value.get(), move |_| runs.set(runs.get() + 1))
        };
        assert_eq!(runs.get(), 1);

        disposer.dispose();
        disposer.dispose();
        value.set(1);

        assert_eq!(runs.get(), 1);
        assert_eq!(runtime.pending_reactions(), 0);
    });
}

/// Test that a reaction sees the latest state of a derived value.
#[test]
fn reaction_over_computed() {
    isolated(|_| {
        let items = Boxed::new(vec![1, 2, 3]);
        let total = {
            let items = items.clone();
            computed(move || items.get().iter().sum::<i32>())
        };
        let totals = Rc::new(RefCell::new(Vec::new()));

        let _disposer = {
            let totals = totals.clone();
            reaction(move || total.get(), move |sum| totals.borrow_mut().push(sum))
        };

        items.update(|items| items.push(4));
        assert_eq!(*totals.borrow(), vec![6, 10]);
    });
}

/// Test that the future-returning `when` resolves with no value.
#[test]
fn when_future_resolves_on_write() {
    isolated(|_| {
        let ready = Boxed::new(false);
        let handle = {
            let ready = ready.clone();
            when_future(move || ready.get())
        };

        assert!(!handle.is_settled());
        ready.set(true);
        assert_eq!(handle.now_or_never(), Some(Ok(())));
    });
}

/// Test that cancelling a pending `when` rejects it.
#[test]
fn when_future_cancellation() {
    isolated(|runtime| {
        let ready = Boxed::new(false);
        let handle = {
            let ready = ready.clone();
            when_future(move || ready.get())
        };

        handle.cancel();
        assert_eq!(runtime.pending_reactions(), 0);
        assert_eq!(handle.now_or_never(), Some(Err(ReactiveError::WhenCancelled)));
    });
}

/// Test awaiting `when` from a single-threaded executor.
#[tokio::test(flavor = "current_thread")]
async fn when_future_can_be_awaited() {
    let runtime = Runtime::new(Config::default());
    let _scope = runtime.enter();

    let ready = Boxed::new(false);
    let handle = {
        let ready = ready.clone();
        when_future(move || ready.get())
    };

    let writer = ready.clone();
    let result = futures_util::future::join(handle, async move { writer.set(true) })
        .await
        .0;
    assert_eq!(result, Ok(()));
}

struct Account {
    owner: String,
}

/// Test per-instance computed properties declared on a prototype.
#[test]
fn prototype_computed_is_per_instance() {
    isolated(|_| {
        let proto = Prototype::<Account>::new("Account");
        let balance = proto.observable_with("balance", Depth::Ref, || 0_i64);
        let getter_runs = Rc::new(Cell::new(0));
        let summary = {
            let balance = balance.clone();
            let getter_runs = getter_runs.clone();
            proto.computed("summary", move |account: &Rc<Account>| {
                getter_runs.set(getter_runs.get() + 1);
                format!("{}: {}", account.owner, balance.get(account).unwrap_or(0))
            })
        };
        let deposit = {
            let balance = balance.clone();
            proto.action("deposit", move |account: &Rc<Account>, amount: i64| {
                let current = balance.get(account).unwrap_or(0);
                balance.set(account, current + amount);
            })
        };

        let alice = Rc::new(Account {
            owner: "alice".into(),
        });
        let bob = Rc::new(Account { owner: "bob".into() });

        assert_eq!(summary.get(&alice), "alice: 0");
        assert_eq!(summary.get(&bob), "bob: 0");
        deposit.call((alice.clone(), 5));
        assert_eq!(summary.get(&alice), "alice: 5");
        assert_eq!(summary.get(&bob), "bob: 0");
        assert_eq!(getter_runs.get(), 3);

        drop(bob);
        assert_eq!(summary.cell_count(), 1);
        assert!(proto.is_computed_prop("summary"));
        assert!(proto.is_action_prop("deposit"));
    });
}

/// Test that each depth mode reads back what was written.
#[test]
fn depth_modes_read_after_write() {
    isolated(|_| {
        struct Doc;
        let proto = Prototype::<Doc>::new("Doc");
        let fields = proto.decorate([
            ("deep", Depth::Deep),
            ("shallow", Depth::Shallow),
            ("by_ref", Depth::Ref),
        ]);
        let doc = Rc::new(Doc);
        let data = json!({ "list": [1, 2] });

        for key in ["deep", "shallow", "by_ref"] {
            fields.set(&doc, key, data.clone());
            let value = fields.get(&doc, key).unwrap();
            assert_eq!(value, data, "{key}");
        }

        let deep = fields.get(&doc, "deep").unwrap();
        let list = deep.as_object().unwrap().get("list").unwrap();
        assert!(list.is_wrapped());

        let shallow = fields.get(&doc, "shallow").unwrap();
        assert!(shallow.is_wrapped());
        assert!(!shallow.as_object().unwrap().get("list").unwrap().is_wrapped());

        assert!(!fields.get(&doc, "by_ref").unwrap().is_wrapped());
    });
}

/// Test that nested deep mutations re-run readers of the nested value.
#[test]
fn deep_mutations_are_observed() {
    isolated(|_| {
        let state = observable::deep(json!({ "todos": [{ "done": false }] }));
        let done = Rc::new(Cell::new(0));

        let _disposer = {
            let state = state.clone();
            let done = done.clone();
            autorun(move || {
                let todos = state.as_object().unwrap().get("todos").unwrap();
                let count = todos
                    .as_array()
                    .unwrap()
                    .values()
                    .iter()
                    .filter(|todo| {
                        todo.as_object()
                            .and_then(|todo| todo.get("done"))
                            .and_then(|done| done.as_bool())
                            .unwrap_or(false)
                    })
                    .count();
                done.set(count);
            })
        };
        assert_eq!(done.get(), 0);

        let todos = state.as_object().unwrap().get("todos").unwrap();
        let first = todos.as_array().unwrap().get(0).unwrap();
        first.as_object().unwrap().set("done", true);
        assert_eq!(done.get(), 1);

        todos.as_array().unwrap().push(json!({ "done": true }));
        assert_eq!(done.get(), 2);
    });
}

/// Test that an action panicking mid-transaction leaves the runtime usable.
#[test]
fn runtime_recovers_after_panic() {
    isolated(|runtime| {
        let value = Boxed::new(0);
        let seen = Rc::new(Cell::new(-1));

        let _disposer = {
            let (value, seen) = (value.clone(), seen.clone());
            autorun(move || seen.set(value.get()))
        };

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            transaction(|| {
                value.set(1);
                panic!("abort");
            })
        }));
        assert!(result.is_err());
        assert_eq!(runtime.depth(), 0);
        assert_eq!(seen.get(), 0, "no flush after a panic");

        value.set(2);
        assert_eq!(seen.get(), 2);
    });
}

/// Test that values from factories compare against plain JSON.
#[test]
fn factory_snapshots() {
    isolated(|_| {
        let map = observable::map(json!([["a", 1], ["b", { "c": 2 }]])).unwrap();
        assert_eq!(map, json!({ "a": 1, "b": { "c": 2 } }));

        let wrapped: TrackedValue = observable::set(json!([1, 2, 2])).unwrap();
        assert_eq!(wrapped.as_set().unwrap().len(), 2);
    });
}
