use kispec::{MetaFilter, RunConfig, World, filter::MetadataFilter, meta};
use pretty_assertions::assert_eq;

use crate::support::*;

fn world(config: RunConfig) -> World {
    let mut world = World::new().with_config(config);
    world
        .describe_with("Slow", meta! { slow }, |g| {
            g.it("inherits", |_| ());
            g.it_with("opts out", meta! { slow: false }, |_| ());
        })
        .unwrap()
        .describe("Fast", |g| {
            g.it("runs", |_| ());
            g.it_with("postgres", meta! { db: "postgres" }, |_| ());
            g.it_with("sqlite", meta! { db: "sqlite" }, |_| ());
        })
        .unwrap();
    world
}

#[test]
fn inclusion_matches_inherited_metadata() {
    let mut world = world(RunConfig::new().with_inclusion(MetaFilter::tag("slow")));
    let report = world.run().unwrap();

    assert_eq!(descriptions(&report), ["Slow inherits"]);
    assert_eq!(report.summary.total, 5);
    assert_eq!(report.summary.filtered_out, 4);
}

#[test]
fn exclusion_wins_over_inclusion() {
    let config = RunConfig::new()
        .with_inclusion(MetaFilter::new().with_pattern("db", "^(postgres|sqlite)$"))
        .with_exclusion(MetaFilter::new().with("db", "sqlite"));
    let mut world = world(config);
    let report = world.run().unwrap();

    assert_eq!(descriptions(&report), ["Fast postgres"]);
}

#[test]
fn any_inclusion_filter_schedules_an_example() {
    let config = RunConfig::new()
        .with_inclusion("slow")
        .with_inclusion(MetaFilter::new().with("db", "sqlite"));
    let mut world = world(config);
    let report = world.run().unwrap();

    assert_eq!(descriptions(&report), ["Slow inherits", "Fast sqlite"]);
}

#[test]
fn focused_examples_run_alone() {
    let mut world = World::new();
    world
        .describe("G", |g| {
            g.it("ignored", |_| ());
            g.fit("focused", |_| ());
            g.fdescribe("focused group", |g| {
                g.it("runs too", |_| ());
            });
        })
        .unwrap();

    let report = world.run().unwrap();
    assert_eq!(
        descriptions(&report),
        ["G focused", "G focused group runs too"]
    );
}

#[test]
fn focus_can_be_disabled() {
    let mut world = World::new().with_config(RunConfig::new().without_focus());
    world
        .describe("G", |g| {
            g.it("ignored", |_| ());
            g.fit("focused", |_| ());
        })
        .unwrap();

    let report = world.run().unwrap();
    assert_eq!(report.records.len(), 2);
}

#[test]
fn group_hooks_of_filtered_groups_do_not_run() {
    let log = Log::new();
    let mut world = World::new().with_config(RunConfig::new().with_inclusion("fast"));
    world
        .describe("Slow", |g| {
            g.before_all(log.group_step("slow setup"));
            g.it("crawls", log.step("crawls"));
        })
        .unwrap()
        .describe_with("Fast", meta! { fast }, |g| {
            g.before_all(log.group_step("fast setup"));
            g.it("runs", log.step("runs"));
        })
        .unwrap();

    world.run().unwrap();
    assert_eq!(log.entries(), ["fast setup", "runs"]);
}

#[test]
fn suite_hooks_do_not_run_without_scheduled_examples() {
    let log = Log::new();
    let mut world = World::new().with_config(RunConfig::new().with_inclusion("nothing"));
    let before = log.clone();
    world
        .configure(move |hooks| {
            hooks.before_suite(move || before.push("before suite"));
        })
        .unwrap()
        .describe("G", |g| {
            g.it("E", |_| ());
        })
        .unwrap();

    let report = world.run().unwrap();
    assert!(report.records.is_empty());
    assert!(log.entries().is_empty());
}

#[test]
fn list_flags_filtered_examples() {
    let mut world = world(RunConfig::new().with_exclusion("slow"));
    let listed: Vec<_> = world
        .list()
        .unwrap()
        .into_iter()
        .map(|example| (example.full_description, example.scheduled))
        .collect();

    assert_eq!(
        listed,
        [
            (String::from("Slow inherits"), false),
            (String::from("Slow opts out"), true),
            (String::from("Fast runs"), true),
            (String::from("Fast postgres"), true),
            (String::from("Fast sqlite"), true),
        ]
    );
    assert!(!world.has_run());
}

#[test]
fn runner_accepts_a_custom_filter() {
    let mut world = world(RunConfig::new());
    let report = world
        .runner()
        .unwrap()
        .with_filter(MetadataFilter::new().with_inclusion(MetaFilter::new().with("db", "postgres")))
        .run()
        .unwrap();

    assert_eq!(descriptions(&report), ["Fast postgres"]);
}

#[test]
fn malformed_filter_is_a_declaration_error() {
    let mut world = World::new();
    world
        .shared_context_for(MetaFilter::new().with_pattern("db", "("), |_| ())
        .unwrap()
        .describe("G", |g| {
            g.it("E", |_| ());
        })
        .unwrap();

    assert!(matches!(world.run(), Err(kispec::Error::Declaration(_))));
}
