use kispec::{
    Error, RunConfig, World, meta,
    ordering::{RandomOrder, ReverseOrder},
    outcome::{ExampleStatus, FailureKind, FailureOrigin},
    reporter::Recorder,
};
use pretty_assertions::assert_eq;

use crate::support::*;

#[test]
fn fail_fast_stops_after_the_threshold() {
    let log = Log::new();
    let mut world = World::new().with_config(RunConfig::new().with_fail_fast(1));
    world
        .describe("G", |g| {
            g.after_all(log.group_step("after all"));
            g.it("fails", |_| fail("nope"));
            g.it("passes", log.step("second"));
            g.it("passes too", log.step("third"));
        })
        .unwrap();

    let report = world.run().unwrap();
    assert_eq!(
        statuses(&report),
        expected(&[
            ("G fails", "failed"),
            ("G passes", "not run"),
            ("G passes too", "not run"),
        ])
    );
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.not_run, 2);
    assert!(report.summary.aborted_by_fail_fast);
    assert_eq!(log.entries(), ["after all"]);
}

#[test]
fn failing_body_passes_when_pending() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.it_with("broken", meta! { pending: "waiting for a fix" }, |_| fail("still broken"));
            g.it_with("fixed", meta! { pending }, |_| ());
            g.it("declares it inside", |ctx| {
                ctx.pending("not done");
                fail("not done");
            });
        })
        .unwrap();

    let report = world.run().unwrap();
    assert_eq!(
        statuses(&report),
        expected(&[
            ("G broken", "pending"),
            ("G fixed", "failed"),
            ("G declares it inside", "pending"),
        ])
    );

    let ExampleStatus::Pending { reason, failure } = report.record("G broken").unwrap().status() else {
        panic!("expected pending");
    };
    assert_eq!(reason.as_deref(), Some("waiting for a fix"));
    assert_eq!(failure.message, "still broken");

    let ExampleStatus::Failed(failure) = report.record("G fixed").unwrap().status() else {
        panic!("expected a failure");
    };
    assert_eq!(failure.kind, FailureKind::PendingFixed);
    assert!(!report.summary.is_good());
}

#[test]
fn skipped_examples_do_not_run() {
    let log = Log::new();
    let recorder = Recorder::new();
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.before(log.step("before"));
            g.xit("crossed out", log.step("crossed out"));
            g.it_with("tagged", meta! { skip: "flaky" }, log.step("tagged"));
            g.xdescribe("crossed group", |g| {
                g.it("inner", log.step("inner"));
            });
        })
        .unwrap();

    let report = world.run_with(recorder.clone()).unwrap();
    assert_eq!(
        statuses(&report),
        expected(&[
            ("G crossed out", "skipped"),
            ("G tagged", "skipped"),
            ("G crossed group inner", "skipped"),
        ])
    );
    let ExampleStatus::Skipped { reason } = report.record("G tagged").unwrap().status() else {
        panic!("expected a skip");
    };
    assert_eq!(reason.as_deref(), Some("flaky"));
    assert!(log.entries().is_empty());
    assert!(recorder.recorded().started.is_empty());
    assert!(report.summary.is_good());
}

#[test]
fn skipping_from_the_body_still_runs_after_hooks() {
    let log = Log::new();
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.after(log.step("after"));
            g.it("needs network", |ctx| {
                skip(ctx, "offline");
                fail("unreachable");
            });
        })
        .unwrap();

    let report = world.run().unwrap();
    let ExampleStatus::Skipped { reason } = report.record("G needs network").unwrap().status() else {
        panic!("expected a skip");
    };
    assert_eq!(reason.as_deref(), Some("offline"));
    assert_eq!(log.entries(), ["after"]);
}

#[test]
fn returned_errors_fail_the_example() {
    #[derive(Debug)]
    struct Refused;

    let mut world = World::new();
    world
        .describe("G", |g| {
            g.it("connects", |_| Err::<(), _>(Refused));
            g.it("is fine", |_| Ok::<(), Refused>(()));
        })
        .unwrap();

    let report = world.run().unwrap();
    let ExampleStatus::Failed(failure) = report.record("G connects").unwrap().status() else {
        panic!("expected a failure");
    };
    assert_eq!(failure.kind, FailureKind::Error);
    assert_eq!(failure.origin, FailureOrigin::Body);
    assert_eq!(failure.message, "Refused");
    assert!(report.record("G is fine").unwrap().outcome.passed());
}

#[test]
fn panic_location_is_captured() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.it("asserts", |_| assert_eq!(1 + 1, 3));
        })
        .unwrap();

    let report = world.run().unwrap();
    let ExampleStatus::Failed(failure) = report.record("G asserts").unwrap().status() else {
        panic!("expected a failure");
    };
    assert_eq!(failure.kind, FailureKind::Panicked);
    let location = failure.location.as_ref().expect("panic location");
    assert!(location.file.ends_with("execution.rs"), "{location}");
}

#[test]
fn examples_are_isolated_from_each_other() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.it("writes", |ctx| ctx.state_mut().insert(42_u32));
            g.it("reads", |ctx| assert_eq!(ctx.state().get::<u32>(), None));
        })
        .unwrap();

    let report = world.run().unwrap();
    assert!(report.summary.is_good(), "{:#?}", report.records);
}

struct Explosive;

impl Drop for Explosive {
    fn drop(&mut self) {
        panic!("exploded while dropping");
    }
}

#[test]
fn panicking_drop_fails_only_its_example() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.let_("explosive", |_| Explosive);
            g.it("holds it", |ctx| {
                ctx.get::<Explosive>("explosive");
            });
            g.it("stores it", |ctx| ctx.state_mut().insert(Explosive));
            g.it("carries on", |_| ());
        })
        .unwrap();

    let report = world.run().unwrap();
    assert_eq!(
        statuses(&report),
        expected(&[
            ("G holds it", "failed"),
            ("G stores it", "failed"),
            ("G carries on", "passed"),
        ])
    );
    for description in ["G holds it", "G stores it"] {
        let ExampleStatus::Failed(failure) = report.record(description).unwrap().status() else {
            panic!("expected {description} to fail");
        };
        assert_eq!(failure.origin, FailureOrigin::Teardown);
        assert_eq!(failure.message, "exploded while dropping");
    }
}

#[test]
fn quit_request_stops_the_run() {
    let log = Log::new();
    let mut world = World::new();
    let quit = world.quit_handle();
    let stopping = log.clone();
    world
        .describe("G", |g| {
            g.after(log.step("after"));
            g.it("asks to stop", move |_| {
                stopping.push("stopping");
                quit.request_quit();
            });
            g.it("never runs", log.step("never runs"));
        })
        .unwrap();

    let report = world.run().unwrap();
    assert_eq!(
        statuses(&report),
        expected(&[("G asks to stop", "passed"), ("G never runs", "not run")])
    );
    assert_eq!(log.entries(), ["stopping", "after"]);
    assert!(report.summary.interrupted);
    assert!(!report.summary.is_good());

    world.reset();
    assert!(!world.quit_handle().is_quit_requested());
}

fn numbered(config: RunConfig) -> World {
    let mut world = World::new().with_config(config);
    world
        .describe("G", |g| {
            for n in 0..8 {
                g.it(format!("{n}"), |_| ());
            }
            g.describe_with("defined", meta! { order: "defined" }, |g| {
                g.it("a", |_| ()).it("b", |_| ()).it("c", |_| ());
            });
        })
        .unwrap();
    world
}

#[test]
fn random_order_is_reproducible_with_a_seed() {
    let first = descriptions(&numbered(RunConfig::new().with_seed(7)).run().unwrap());
    let second = descriptions(&numbered(RunConfig::new().with_seed(7)).run().unwrap());
    assert_eq!(first, second);

    let defined = descriptions(&numbered(RunConfig::new()).run().unwrap());
    let mut sorted = first.clone();
    sorted.sort();
    let mut expected = defined.clone();
    expected.sort();
    assert_eq!(sorted, expected);

    let report = numbered(RunConfig::new().with_seed(7)).run().unwrap();
    assert_eq!(report.summary.seed, Some(7));
}

#[test]
fn defined_order_metadata_pins_a_group() {
    let mut world = numbered(RunConfig::new());
    let report = world.runner().unwrap().with_ordering(ReverseOrder).run().unwrap();
    let order = descriptions(&report);

    assert_eq!(&order[..3], ["G defined a", "G defined b", "G defined c"]);
    assert_eq!(order[3], "G 7");
    assert_eq!(order.last().map(String::as_str), Some("G 0"));

    let mut world = numbered(RunConfig::new());
    let report = world.runner().unwrap().with_ordering(RandomOrder::new(99)).run().unwrap();
    let pinned: Vec<_> = descriptions(&report)
        .into_iter()
        .filter(|d| d.starts_with("G defined"))
        .collect();
    assert_eq!(pinned, ["G defined a", "G defined b", "G defined c"]);
}

#[test]
fn reporter_sees_every_event_in_order() {
    let recorder = Recorder::new();
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.it("one", |_| ());
            g.xit("two", |_| ());
            g.it("three", |_| fail("three"));
        })
        .unwrap();

    let report = world.run_with(recorder.clone()).unwrap();
    assert!(report.report_errors.is_empty());

    let recorded = recorder.recorded();
    let start = recorded.start.expect("run started");
    assert_eq!((start.total, start.scheduled, start.filtered_out), (3, 3, 0));
    assert_eq!(recorded.started, ["G one", "G three"]);
    let finished: Vec<_> = recorded
        .records
        .iter()
        .map(|record| record.full_description.as_str())
        .collect();
    assert_eq!(finished, ["G one", "G two", "G three"]);

    let summary = recorded.summary.as_ref().expect("run finished");
    assert_eq!(
        (summary.passed, summary.skipped, summary.failed),
        (1, 1, 1)
    );
    assert_eq!(summary, &report.summary);
}

#[test]
fn a_world_runs_once_until_reset() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.it("E", |_| ());
        })
        .unwrap();

    world.run().unwrap();
    assert!(matches!(world.run(), Err(Error::AlreadyRan)));
    assert!(matches!(
        world.describe("H", |_| ()),
        Err(Error::AlreadyFinalized)
    ));

    world.reset();
    world
        .describe("H", |g| {
            g.it("E", |_| ());
        })
        .unwrap();
    let report = world.run().unwrap();
    assert_eq!(descriptions(&report), ["H E"]);
}
