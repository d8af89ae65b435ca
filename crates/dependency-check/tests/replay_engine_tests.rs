//! End-to-end tests: build graph -> GraphCollector -> ReplayEngine -> JSON report

use std::path::Path;

use cvegate_core::config::PolicyConfig;
use cvegate_dependency_check::replay::REPORT_FILE_NAME;
use cvegate_dependency_check::{
    AnalysisOrchestrator, BuildGraph, DependencyCheckError, GraphCollector, Phase,
    ProjectContext, ReplayEngineFactory, RunOutcome,
};

const BUILD_GRAPH: &str = r#"{
    "host_version": "7.6",
    "project": {
        "display_name": "demo-app",
        "group": "org.example",
        "name": "demo-app",
        "version": "1.0.0"
    },
    "projects": [
        {
            "path": ":app",
            "groups": [
                {
                    "name": "runtimeClasspath",
                    "hierarchy": ["runtimeClasspath", "runtime", "compile"],
                    "artifacts": [
                        {
                            "file_name": "commons-text-1.9.jar",
                            "path": "/cache/commons-text-1.9.jar",
                            "coordinates": {
                                "group": "org.apache.commons",
                                "name": "commons-text",
                                "version": "1.9"
                            }
                        },
                        {
                            "file_name": "guava-32.0.jar",
                            "path": "/cache/guava-32.0.jar",
                            "coordinates": {
                                "group": "com.google.guava",
                                "name": "guava",
                                "version": "32.0"
                            }
                        }
                    ]
                },
                {
                    "name": "testRuntimeClasspath",
                    "hierarchy": ["testRuntime", "testCompile"],
                    "artifacts": [
                        {
                            "file_name": "junit-4.12.jar",
                            "path": "/cache/junit-4.12.jar",
                            "coordinates": {
                                "group": "junit",
                                "name": "junit",
                                "version": "4.12"
                            }
                        }
                    ]
                },
                {
                    "name": "apiElements",
                    "resolvable": false,
                    "artifacts": [
                        {
                            "file_name": "api.jar",
                            "path": "/cache/api.jar"
                        }
                    ]
                }
            ]
        }
    ]
}"#;

const ADVISORIES: &str = r#"{
    "advisories": {
        "org.apache.commons:commons-text:1.9": [
            { "name": "CVE-2022-42889", "cvss_score": 9.8 }
        ],
        "junit:junit:4.12": [
            { "name": "CVE-2020-15250", "cvss_score": 5.5 }
        ]
    }
}"#;

fn setup(dir: &Path) -> (BuildGraph, ReplayEngineFactory, ProjectContext) {
    let advisories = dir.join("advisories.json");
    std::fs::write(&advisories, ADVISORIES).unwrap();

    let graph = BuildGraph::from_json(BUILD_GRAPH).unwrap();
    let context = ProjectContext::new(graph.project.clone(), dir.join("reports"));
    (graph, ReplayEngineFactory::new(advisories), context)
}

#[test]
fn full_run_writes_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let (graph, factory, context) = setup(dir.path());

    let policy = PolicyConfig::default();
    let collector = GraphCollector::new(graph, &policy.scan);
    let report = AnalysisOrchestrator::builder()
        .policy(policy)
        .context(context)
        .build()
        .unwrap()
        .run(&factory, &collector);

    assert!(matches!(report.outcome, RunOutcome::Completed));
    assert_eq!(report.dependency_count, 2);
    assert_eq!(report.vulnerability_count, 1);
    assert_eq!(
        report.summary.lines,
        vec![
            "commons-text-1.9.jar (org.apache.commons:commons-text:1.9) : CVE-2022-42889"
                .to_owned()
        ]
    );

    let written = std::fs::read_to_string(dir.path().join("reports").join(REPORT_FILE_NAME))
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["project"]["display_name"], "demo-app");
    assert_eq!(json["dependencies"].as_array().unwrap().len(), 2);
    assert_eq!(
        json["dependencies"][0]["vulnerabilities"][0]["name"],
        "CVE-2022-42889"
    );
}

#[test]
fn test_groups_included_when_not_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (graph, factory, context) = setup(dir.path());

    let mut policy = PolicyConfig::default();
    policy.scan.skip_test_groups = false;
    let collector = GraphCollector::new(graph, &policy.scan);
    let report = AnalysisOrchestrator::builder()
        .policy(policy)
        .context(context)
        .build()
        .unwrap()
        .run(&factory, &collector);

    assert_eq!(report.dependency_count, 3);
    assert_eq!(report.vulnerability_count, 2);
}

#[test]
fn cvss_gate_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let (graph, factory, context) = setup(dir.path());

    let mut policy = PolicyConfig::default();
    policy.failure.fail_build_on_cvss = 7.0;
    policy.failure.fail_on_error = false;
    let collector = GraphCollector::new(graph, &policy.scan);
    let result = AnalysisOrchestrator::builder()
        .policy(policy)
        .context(context)
        .build()
        .unwrap()
        .run(&factory, &collector)
        .into_result();

    match result {
        Err(DependencyCheckError::ThresholdViolation { vulnerabilities, .. }) => {
            assert_eq!(vulnerabilities, "CVE-2022-42889");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    // 게이트 실패 전에 리포트는 이미 작성됨
    assert!(dir.path().join("reports").join(REPORT_FILE_NAME).exists());
}

#[test]
fn missing_snapshot_is_engine_init_error() {
    let dir = tempfile::tempdir().unwrap();
    let graph = BuildGraph::from_json(BUILD_GRAPH).unwrap();
    let context = ProjectContext::new(graph.project.clone(), dir.path().join("reports"));
    let factory = ReplayEngineFactory::new(dir.path().join("missing.json"));

    let policy = PolicyConfig::default();
    let collector = GraphCollector::new(graph, &policy.scan);
    let report = AnalysisOrchestrator::builder()
        .policy(policy)
        .context(context)
        .build()
        .unwrap()
        .run(&factory, &collector);

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(DependencyCheckError::EngineInit(_))
    ));
    assert!(!report.ran(Phase::Collect));
}

#[test]
fn unsupported_report_format_is_retained_then_aggregated() {
    let dir = tempfile::tempdir().unwrap();
    let (graph, factory, context) = setup(dir.path());

    let mut policy = PolicyConfig::default();
    policy.report.formats = vec!["HTML".to_owned()];
    let collector = GraphCollector::new(graph, &policy.scan);
    let report = AnalysisOrchestrator::builder()
        .policy(policy)
        .context(context)
        .build()
        .unwrap()
        .run(&factory, &collector);

    match &report.outcome {
        RunOutcome::Aborted(DependencyCheckError::Aggregate(c)) => {
            assert!(c.to_string().contains("HTML"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
