use kispec::{
    World,
    outcome::{ExampleStatus, FailureKind, FailureOrigin},
    reporter::Recorder,
};
use pretty_assertions::assert_eq;

use crate::support::*;

#[test]
fn before_hooks_run_outer_first_and_after_hooks_inner_first() {
    init_tracing();
    let log = Log::new();
    let mut world = World::new();
    world
        .describe("G1", |g| {
            g.before(log.step("before G1")).after(log.step("after G1"));
            g.describe("G2", |g| {
                g.before(log.step("before G2")).after(log.step("after G2"));
                g.describe("G3", |g| {
                    g.before(log.step("before G3")).after(log.step("after G3"));
                    g.it("E", log.step("body"));
                });
            });
        })
        .unwrap();

    let report = world.run().unwrap();
    assert!(report.summary.is_good());
    assert_eq!(
        log.entries(),
        [
            "before G1",
            "before G2",
            "before G3",
            "body",
            "after G3",
            "after G2",
            "after G1",
        ]
    );
}

#[test]
fn hooks_of_one_group_keep_declaration_order() {
    let log = Log::new();
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.before(log.step("before 1"))
                .before(log.step("before 2"))
                .after(log.step("after 1"))
                .after(log.step("after 2"))
                .it("E", log.step("body"));
        })
        .unwrap();

    world.run().unwrap();
    assert_eq!(
        log.entries(),
        ["before 1", "before 2", "body", "after 1", "after 2"]
    );
}

#[test]
fn around_hooks_wrap_before_and_after_hooks() {
    let log = Log::new();
    let mut world = World::new();
    let global = log.clone();
    world
        .configure(|hooks| {
            hooks.around(move |around| {
                global.push("global around start");
                around.run();
                global.push("global around end");
            });
        })
        .unwrap();
    let group = log.clone();
    world
        .describe("G", |g| {
            g.before(log.step("before")).after(log.step("after"));
            g.around(move |around| {
                group.push("group around start");
                around.run();
                group.push("group around end");
            });
            g.it("E", log.step("body"));
        })
        .unwrap();

    world.run().unwrap();
    assert_eq!(
        log.entries(),
        [
            "global around start",
            "group around start",
            "before",
            "body",
            "after",
            "group around end",
            "global around end",
        ]
    );
}

#[test]
fn around_hook_sees_the_failure_of_the_wrapped_example() {
    let log = Log::new();
    let mut world = World::new();
    let seen = log.clone();
    world
        .describe("G", move |g| {
            g.around(move |around| {
                around.run();
                if let Some(failure) = around.failure() {
                    seen.push(failure.message.clone());
                }
            });
            g.it("E", |_| fail("boom"));
        })
        .unwrap();

    let report = world.run().unwrap();
    assert!(report.record("G E").unwrap().outcome.failed());
    assert_eq!(log.entries(), ["boom"]);
}

#[test]
fn around_hook_that_never_runs_the_example_fails_it() {
    let log = Log::new();
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.around(|_| ());
            g.it("E", log.step("body"));
        })
        .unwrap();

    let report = world.run().unwrap();
    let ExampleStatus::Failed(failure) = report.record("G E").unwrap().status() else {
        panic!("expected a failure");
    };
    assert_eq!(failure.kind, FailureKind::AroundDidNotRun);
    assert_eq!(failure.origin, FailureOrigin::AroundHook);
    assert!(log.entries().is_empty());
}

#[test]
fn failing_before_hook_skips_the_body_but_not_the_after_hooks() {
    let log = Log::new();
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.before(|_| fail("setup broke"));
            g.before(log.step("second before"));
            g.after(log.step("after"));
            g.it("E", log.step("body"));
        })
        .unwrap();

    let report = world.run().unwrap();
    let ExampleStatus::Failed(failure) = report.record("G E").unwrap().status() else {
        panic!("expected a failure");
    };
    assert_eq!(failure.origin, FailureOrigin::BeforeHook);
    assert_eq!(failure.message, "setup broke");
    assert_eq!(log.entries(), ["after"]);
}

#[test]
fn after_hook_failure_is_secondary_to_the_body_failure() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.after(|_| Err::<(), _>("cleanup broke"));
            g.it("E", |_| fail("body broke"));
        })
        .unwrap();

    let report = world.run().unwrap();
    let outcome = &report.record("G E").unwrap().outcome;
    let ExampleStatus::Failed(primary) = &outcome.status else {
        panic!("expected a failure");
    };
    assert_eq!(primary.origin, FailureOrigin::Body);
    assert_eq!(primary.message, "body broke");

    assert_eq!(outcome.secondary_failures.len(), 1);
    let secondary = &outcome.secondary_failures[0];
    assert_eq!(secondary.origin, FailureOrigin::AfterHook);
    assert_eq!(secondary.kind, FailureKind::Error);
    assert_eq!(outcome.failures().count(), 2);
}

#[test]
fn after_hook_failure_fails_a_passing_example() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.after(|_| fail("cleanup broke"));
            g.it("E", |_| ());
        })
        .unwrap();

    let report = world.run().unwrap();
    let ExampleStatus::Failed(failure) = report.record("G E").unwrap().status() else {
        panic!("expected a failure");
    };
    assert_eq!(failure.origin, FailureOrigin::AfterHook);
}

#[test]
fn conditional_hooks_only_apply_to_matching_examples() {
    let log = Log::new();
    let mut world = World::new();
    let db = log.clone();
    world
        .describe("G", move |g| {
            g.before_with("db", move |ctx| db.push(format!("db for {}", ctx.description())));
            g.it("plain", |_| ());
            g.it_with("own tag", kispec::meta! { db }, |_| ());
            g.describe_with("inherited", kispec::meta! { db }, |g| {
                g.it("tag", |_| ());
            });
            g.it_with("disabled", kispec::meta! { db: false }, |_| ());
        })
        .unwrap();

    world.run().unwrap();
    assert_eq!(log.entries(), ["db for own tag", "db for tag"]);
}

#[test]
fn group_hooks_run_once_around_their_examples() {
    let log = Log::new();
    let mut world = World::new();
    let before = log.clone();
    let after = log.clone();
    world
        .describe("G", |g| {
            g.before_all(move |ctx| {
                ctx.state_mut().insert(String::from("connection"));
                before.push("before all");
            });
            g.after_all(move |ctx| {
                after.push(format!("after all, closing {}", ctx.state().get::<String>().unwrap()));
            });
            g.it("first", log.step("first"));
            g.it("second", log.step("second"));
        })
        .unwrap();

    world.run().unwrap();
    assert_eq!(
        log.entries(),
        ["before all", "first", "second", "after all, closing connection"]
    );
}

#[test]
fn examples_see_the_state_of_enclosing_groups() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.before_all(|ctx| {
                ctx.state_mut().insert(String::from("outer"));
                ctx.state_mut().insert(1_u32);
            });
            g.it("reads the group", |ctx| {
                assert_eq!(ctx.group_state::<String>().map(String::as_str), Some("outer"));
                assert_eq!(ctx.group_state::<i64>(), None);
            });
            g.describe("nested", |g| {
                g.before_all(|ctx| ctx.state_mut().insert(2_u32));
                g.it("prefers the inner group", |ctx| {
                    assert_eq!(ctx.group_state::<u32>(), Some(&2));
                    assert_eq!(ctx.group_state::<String>().map(String::as_str), Some("outer"));
                });
            });
        })
        .unwrap();

    let report = world.run().unwrap();
    assert!(report.summary.is_good(), "{:#?}", report.records);
}

#[test]
fn failing_before_all_fails_the_group_without_running_it() {
    let log = Log::new();
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.before_all(|_| fail("no database"));
            g.after_all(log.group_step("after all"));
            g.it("first", log.step("first"));
            g.describe("nested", |g| {
                g.before_all(log.group_step("nested before all"));
                g.it("second", log.step("second"));
            });
        })
        .unwrap();
    world
        .describe("H", |g| {
            g.it("unaffected", log.step("unaffected"));
        })
        .unwrap();

    let report = world.run().unwrap();
    assert_eq!(
        statuses(&report),
        expected(&[
            ("G first", "failed"),
            ("G nested second", "failed"),
            ("H unaffected", "passed"),
        ])
    );
    let ExampleStatus::Failed(failure) = report.record("G nested second").unwrap().status() else {
        panic!("expected a failure");
    };
    assert_eq!(failure.origin, FailureOrigin::BeforeContextHook);
    assert_eq!(log.entries(), ["after all", "unaffected"]);
}

#[test]
fn failing_after_all_is_reported_as_group_failure() {
    let recorder = Recorder::new();
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.after_all(|_| Err::<(), _>("teardown broke"));
            g.it("E", |_| ());
        })
        .unwrap();

    let report = world.run_with(recorder.clone()).unwrap();
    assert_eq!(statuses(&report), expected(&[("G E", "passed")]));
    assert_eq!(report.summary.group_failures, 1);
    assert!(!report.summary.is_good());

    let recorded = recorder.recorded();
    assert_eq!(recorded.group_failures.len(), 1);
    assert_eq!(recorded.group_failures[0].full_description, "G");
    assert_eq!(
        recorded.group_failures[0].failure.origin,
        FailureOrigin::AfterContextHook
    );
}

#[test]
fn suite_hooks_run_once_per_run() {
    let log = Log::new();
    let mut world = World::new();
    let (before, after) = (log.clone(), log.clone());
    world
        .configure(move |hooks| {
            hooks
                .before_suite(move || before.push("before suite"))
                .after_suite(move || after.push("after suite"));
        })
        .unwrap();
    world
        .describe("A", |g| {
            g.it("a", log.step("a"));
        })
        .unwrap()
        .describe("B", |g| {
            g.it("b", log.step("b"));
        })
        .unwrap();

    world.run().unwrap();
    assert_eq!(log.entries(), ["before suite", "a", "b", "after suite"]);
}

#[test]
fn failing_before_suite_fails_every_example() {
    let log = Log::new();
    let mut world = World::new();
    world
        .configure(|hooks| {
            hooks.before_suite(|| fail("no environment"));
        })
        .unwrap();
    world
        .describe("A", |g| {
            g.it("a", log.step("a"));
            g.describe("B", |g| {
                g.it("b", log.step("b"));
            });
        })
        .unwrap();

    let report = world.run().unwrap();
    assert_eq!(
        statuses(&report),
        expected(&[("A a", "failed"), ("A B b", "failed")])
    );
    assert!(log.entries().is_empty());
}

#[test]
fn suite_hooks_declared_in_a_group_are_rejected() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.hook(
                kispec::hook::HookKind::Before,
                kispec::hook::HookScope::Suite,
                kispec::MetaFilter::new(),
                kispec::hook::HookBody::suite(|| ()),
            );
            g.it("E", |_| ());
        })
        .unwrap();

    let err = world.run().unwrap_err();
    assert!(matches!(err, kispec::Error::Declaration(_)), "{err}");
}
