//! End-to-end pipeline tests against stub gcov/gcovr tools

#![cfg(unix)]

mod fixtures;

use std::fs;

use covlane::config::{RepoConfig, TargetConfig};
use covlane::logging::ConsoleLog;
use covlane::naming::NamingMode;
use covlane::pipeline::{CoveragePipeline, PipelineError};
use covlane::summary::Status;
use covlane::toolchain::Version;

use fixtures::{
    gcov_stub, gcovr_fail_stub, gcovr_ok_stub, gcovr_recording_stub, BuildTree, GcovBehavior,
};

const FLATTENED_VERSION: Version = Version::new(4, 1, 0);
const HASHED_VERSION: Version = Version::new(5, 0, 0);

fn quiet() -> ConsoleLog {
    ConsoleLog::new(false)
}

#[test]
fn test_report_end_to_end() {
    let tree = BuildTree::new();
    let a = tree.add_object("src/a", "foo");
    let b = tree.add_object("src/b", "foo");

    let gcov = tree.write_tool(
        "fake-gcov",
        &gcov_stub(&[
            (
                "src/a/foo.o",
                GcovBehavior::Emit {
                    source_rel: "../src/a/foo.cpp",
                },
            ),
            (
                "src/b/foo.o",
                GcovBehavior::Emit {
                    source_rel: "../src/b/foo.cpp",
                },
            ),
        ]),
    );
    let gcovr = tree.write_tool("fake-gcovr", gcovr_ok_stub());

    let repo = RepoConfig::default();
    let config = tree.pipeline_config(
        &repo,
        "testrunner",
        tree.toolchain(gcov, gcovr, FLATTENED_VERSION),
    );
    let pipeline = CoveragePipeline::new(config);

    let summary = pipeline
        .run("testrunner", &[a, b], &quiet())
        .expect("pipeline succeeds");

    assert_eq!(summary.status, Status::Success);
    assert_eq!(summary.objects_total, 2);
    assert_eq!(summary.objects_failed, 0);
    assert_eq!(summary.listings_produced, 2);
    assert_eq!(summary.listings_excluded, 0);

    // Listings renamed onto distinct collision-free names despite the
    // shared base name
    let listing_a = tree.build_root.join("^#src#a#foo.gcov");
    let listing_b = tree.build_root.join("^#src#b#foo.gcov");
    assert!(listing_a.is_file());
    assert!(listing_b.is_file());

    // Source markers rewritten to absolute paths, body untouched
    let text = fs::read_to_string(&listing_a).unwrap();
    let first = text.lines().next().unwrap();
    assert_eq!(
        first,
        format!(
            "        -:    0:Source:{}",
            tree.project_root.join("src/a/foo.cpp").display()
        )
    );
    assert!(text.contains("covered = 1;"));

    // Report artifacts
    assert!(tree.build_root.join("coverage/index.html").is_file());
    let summary_file = tree.build_root.join("coverage/coverage_summary.json");
    let summary_json = fs::read_to_string(summary_file).unwrap();
    assert!(summary_json.contains("\"status\": \"success\""));
}

#[test]
fn test_exclusion_drops_listing_from_aggregation() {
    let tree = BuildTree::new();
    let a = tree.add_object("src/a", "foo");
    let b = tree.add_object("src/b", "foo");

    let gcov = tree.write_tool(
        "fake-gcov",
        &gcov_stub(&[
            (
                "src/a/foo.o",
                GcovBehavior::Emit {
                    source_rel: "../src/a/foo.cpp",
                },
            ),
            (
                "src/b/foo.o",
                GcovBehavior::Emit {
                    source_rel: "../src/b/foo.cpp",
                },
            ),
        ]),
    );
    let record = tree.build_root.join("gcovr_args.txt");
    let gcovr = tree.write_tool("fake-gcovr", &gcovr_recording_stub(&record));

    let mut repo = RepoConfig::default();
    repo.targets.insert(
        "testrunner".to_string(),
        TargetConfig {
            exclude: vec!["src/b".to_string()],
        },
    );

    let config = tree.pipeline_config(
        &repo,
        "testrunner",
        tree.toolchain(gcov, gcovr, FLATTENED_VERSION),
    );
    let pipeline = CoveragePipeline::new(config);

    let summary = pipeline.run("testrunner", &[a, b], &quiet()).unwrap();

    assert_eq!(summary.listings_produced, 1);
    assert_eq!(summary.listings_excluded, 1);

    // The excluded listing still exists on disk; it is only dropped from
    // the aggregator's input set
    assert!(tree.build_root.join("^#src#b#foo.gcov").is_file());

    // The rule was also forwarded verbatim to the aggregator
    let args = fs::read_to_string(&record).unwrap();
    assert!(args.contains("--exclude=src/b"));
}

#[test]
fn test_per_object_failure_does_not_abort_the_rest() {
    let tree = BuildTree::new();
    let a = tree.add_object("src/a", "foo");
    let b = tree.add_object("src/b", "foo");

    let gcov = tree.write_tool(
        "fake-gcov",
        &gcov_stub(&[
            ("src/a/foo.o", GcovBehavior::Fail { exit_code: 1 }),
            (
                "src/b/foo.o",
                GcovBehavior::Emit {
                    source_rel: "../src/b/foo.cpp",
                },
            ),
        ]),
    );
    let gcovr = tree.write_tool("fake-gcovr", gcovr_ok_stub());

    let repo = RepoConfig::default();
    let config = tree.pipeline_config(
        &repo,
        "testrunner",
        tree.toolchain(gcov, gcovr, FLATTENED_VERSION),
    );
    let pipeline = CoveragePipeline::new(config);

    let summary = pipeline.run("testrunner", &[a, b], &quiet()).unwrap();

    assert_eq!(summary.status, Status::Success);
    assert_eq!(summary.objects_failed, 1);
    assert_eq!(summary.listings_produced, 1);
    assert!(tree.build_root.join("^#src#b#foo.gcov").is_file());
    assert!(!tree.build_root.join("^#src#a#foo.gcov").exists());
}

#[test]
fn test_strict_policy_promotes_extraction_failure() {
    let tree = BuildTree::new();
    let a = tree.add_object("src/a", "foo");

    let gcov = tree.write_tool(
        "fake-gcov",
        &gcov_stub(&[("src/a/foo.o", GcovBehavior::Fail { exit_code: 1 })]),
    );
    let gcovr = tree.write_tool("fake-gcovr", gcovr_ok_stub());

    let repo = RepoConfig {
        strict_extract: true,
        ..RepoConfig::default()
    };
    let config = tree.pipeline_config(
        &repo,
        "testrunner",
        tree.toolchain(gcov, gcovr, FLATTENED_VERSION),
    );
    let pipeline = CoveragePipeline::new(config);

    let err = pipeline.run("testrunner", &[a], &quiet()).unwrap_err();

    assert!(matches!(err, PipelineError::Extract(_)));
    assert_eq!(err.exit_code(), 30);
}

#[test]
fn test_aggregation_failure_is_fatal() {
    let tree = BuildTree::new();
    let a = tree.add_object("src/a", "foo");

    let gcov = tree.write_tool(
        "fake-gcov",
        &gcov_stub(&[(
            "src/a/foo.o",
            GcovBehavior::Emit {
                source_rel: "../src/a/foo.cpp",
            },
        )]),
    );
    let gcovr = tree.write_tool("fake-gcovr", gcovr_fail_stub());

    let repo = RepoConfig::default();
    let config = tree.pipeline_config(
        &repo,
        "testrunner",
        tree.toolchain(gcov, gcovr, FLATTENED_VERSION),
    );
    let pipeline = CoveragePipeline::new(config);

    let err = pipeline.run("testrunner", &[a], &quiet()).unwrap_err();

    assert!(matches!(err, PipelineError::Aggregate(_)));
    assert_eq!(err.exit_code(), 40);

    // No index artifact was silently produced
    assert!(!tree.build_root.join("coverage/index.html").exists());

    // The failure is recorded, not hidden
    let summary_json =
        fs::read_to_string(tree.build_root.join("coverage/coverage_summary.json")).unwrap();
    assert!(summary_json.contains("\"status\": \"failed\""));
}

#[test]
fn test_naming_mode_follows_aggregator_version() {
    let tree = BuildTree::new();
    let a = tree.add_object("src/a", "foo");

    let gcov = tree.write_tool(
        "fake-gcov",
        &gcov_stub(&[(
            "src/a/foo.o",
            GcovBehavior::Emit {
                source_rel: "../src/a/foo.cpp",
            },
        )]),
    );
    let gcovr = tree.write_tool("fake-gcovr", gcovr_ok_stub());

    let repo = RepoConfig::default();
    let config = tree.pipeline_config(
        &repo,
        "testrunner",
        tree.toolchain(gcov.clone(), gcovr.clone(), HASHED_VERSION),
    );
    assert_eq!(config.naming.mode(), NamingMode::Hashed);

    // Hashed mode changes declared detail names only; listings still land
    // on their flattened collision-free names
    let pipeline = CoveragePipeline::new(config);
    let summary = pipeline.run("testrunner", &[a], &quiet()).unwrap();

    assert_eq!(summary.listings_produced, 1);
    assert!(tree.build_root.join("^#src#a#foo.gcov").is_file());
}

#[test]
fn test_run_target_discovers_objects() {
    let tree = BuildTree::new();
    tree.add_object("src/a", "foo");
    tree.add_object("src/b", "foo");

    let gcov = tree.write_tool(
        "fake-gcov",
        &gcov_stub(&[
            (
                "src/a/foo.o",
                GcovBehavior::Emit {
                    source_rel: "../src/a/foo.cpp",
                },
            ),
            (
                "src/b/foo.o",
                GcovBehavior::Emit {
                    source_rel: "../src/b/foo.cpp",
                },
            ),
        ]),
    );
    let gcovr = tree.write_tool("fake-gcovr", gcovr_ok_stub());

    let repo = RepoConfig::default();
    let config = tree.pipeline_config(
        &repo,
        "testrunner",
        tree.toolchain(gcov, gcovr, FLATTENED_VERSION),
    );
    let pipeline = CoveragePipeline::new(config);

    let summary = pipeline.run_target("testrunner", &quiet()).unwrap();

    assert_eq!(summary.objects_total, 2);
    assert_eq!(summary.listings_produced, 2);
}
