//! Integration tests for the analysis orchestrator
//!
//! Drives full runs against mock collaborators that count lifecycle calls.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cvegate_core::config::PolicyConfig;
use cvegate_core::types::{Dependency, Vulnerability};
use cvegate_dependency_check::{
    AnalysisOrchestrator, Artifact, ArtifactCoordinates, CollectError, CollectStats,
    DependencyCheckError, DependencyCollector, Engine, EngineFactory, EngineInitError,
    ExceptionCollection, Phase, ProjectContext, ProjectIdentity, ReportError, ReportRequest,
    RunOutcome, SettingsStore, enrich,
};
use tracing_subscriber::fmt::MakeWriter;

// --- Mock collaborators ---

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    collected: AtomicUsize,
    analyzed: AtomicUsize,
    reported: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Clone, Default)]
struct Script {
    /// 아티팩트 하나당 생성할 의존성 수
    per_artifact: usize,
    /// 분석 시 모든 의존성에 붙일 취약점
    vulnerabilities: Vec<Vulnerability>,
    analysis_error: Option<ExceptionCollection>,
    report_fails: bool,
}

struct MockEngine {
    script: Script,
    counters: Arc<Counters>,
    deps: Vec<Dependency>,
}

impl Engine for MockEngine {
    fn scan(&mut self, artifact: &Artifact) -> &mut [Dependency] {
        let start = self.deps.len();
        for i in 0..self.script.per_artifact {
            self.deps.push(Dependency::new(
                format!("{}#{i}", artifact.file_name),
                artifact.path.clone(),
            ));
        }
        &mut self.deps[start..]
    }

    fn analyze_dependencies(&mut self) -> Result<(), ExceptionCollection> {
        self.counters.analyzed.fetch_add(1, Ordering::SeqCst);
        for dep in &mut self.deps {
            for vuln in &self.script.vulnerabilities {
                dep.add_vulnerability(vuln.clone());
            }
        }
        match &self.script.analysis_error {
            Some(collection) => Err(collection.clone()),
            None => Ok(()),
        }
    }

    fn write_reports(&self, _request: &ReportRequest<'_>) -> Result<(), ReportError> {
        self.counters.reported.fetch_add(1, Ordering::SeqCst);
        if self.script.report_fails {
            Err(ReportError::Write {
                path: "/readonly/report.json".to_owned(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            })
        } else {
            Ok(())
        }
    }

    fn dependencies(&self) -> &[Dependency] {
        &self.deps
    }

    fn close(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockFactory {
    script: Script,
    fails: bool,
    counters: Arc<Counters>,
}

impl EngineFactory for MockFactory {
    fn create(&self, _settings: &SettingsStore) -> Result<Box<dyn Engine>, EngineInitError> {
        if self.fails {
            return Err(EngineInitError::new("database is locked"));
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockEngine {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            deps: Vec::new(),
        }))
    }
}

struct MockCollector {
    artifacts: Vec<Artifact>,
    error: Option<CollectError>,
    counters: Arc<Counters>,
}

impl DependencyCollector for MockCollector {
    fn scan_dependencies(
        &self,
        _context: &ProjectContext,
        engine: &mut dyn Engine,
    ) -> Result<CollectStats, CollectError> {
        self.counters.collected.fetch_add(1, Ordering::SeqCst);
        for artifact in &self.artifacts {
            let deps = engine.scan(artifact);
            enrich(deps, &artifact.coordinates, "runtimeClasspath");
        }
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(CollectStats {
                artifacts: self.artifacts.len(),
                ..CollectStats::default()
            }),
        }
    }
}

// --- Log capture ---

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// --- Helpers ---

struct Harness {
    counters: Arc<Counters>,
    factory: MockFactory,
    collector: MockCollector,
}

impl Harness {
    fn new(script: Script) -> Self {
        let counters = Arc::new(Counters::default());
        Self {
            factory: MockFactory {
                script,
                fails: false,
                counters: Arc::clone(&counters),
            },
            collector: MockCollector {
                artifacts: vec![artifact("lib.jar")],
                error: None,
                counters: Arc::clone(&counters),
            },
            counters,
        }
    }

    fn run(&self, policy: PolicyConfig) -> cvegate_dependency_check::RunReport {
        AnalysisOrchestrator::builder()
            .policy(policy)
            .context(context())
            .build()
            .unwrap()
            .run(&self.factory, &self.collector)
    }

    fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

fn artifact(file: &str) -> Artifact {
    Artifact {
        file_name: file.to_owned(),
        path: format!("/cache/{file}"),
        coordinates: ArtifactCoordinates::new("org.example", "lib", "1.0"),
        contents: Vec::new(),
    }
}

fn context() -> ProjectContext {
    ProjectContext::new(
        ProjectIdentity {
            display_name: "demo".to_owned(),
            group: "org.example".to_owned(),
            name: "demo".to_owned(),
            version: "1.0".to_owned(),
        },
        "build/reports",
    )
}

fn policy(fail_on_error: bool) -> PolicyConfig {
    let mut policy = PolicyConfig::default();
    policy.failure.fail_on_error = fail_on_error;
    policy
}

fn one_dependency() -> Script {
    Script {
        per_artifact: 1,
        ..Script::default()
    }
}

fn vuln(name: &str, score: f64) -> Vulnerability {
    Vulnerability {
        name: name.to_owned(),
        cvss_score: score,
    }
}

// --- Tests ---

#[test]
fn happy_path_runs_every_phase_once() {
    let harness = Harness::new(Script {
        per_artifact: 1,
        vulnerabilities: vec![vuln("CVE-2024-0001", 5.0)],
        ..Script::default()
    });
    let report = harness.run(policy(true));

    assert!(matches!(report.outcome, RunOutcome::Completed));
    assert_eq!(
        report.phases,
        vec![
            Phase::Init,
            Phase::EngineCreate,
            Phase::Collect,
            Phase::Analyze,
            Phase::Report,
            Phase::Evaluate,
            Phase::Cleanup,
            Phase::Done,
        ]
    );
    assert_eq!(report.dependency_count, 1);
    assert_eq!(report.vulnerability_count, 1);
    assert_eq!(
        report.summary.lines,
        vec!["lib.jar#0 (org.example:lib:1.0) : CVE-2024-0001".to_owned()]
    );
    assert!(report.warnings.is_empty());
    assert_eq!(harness.counters.created.load(Ordering::SeqCst), 1);
    assert_eq!(harness.counters.analyzed.load(Ordering::SeqCst), 1);
    assert_eq!(harness.closed(), 1);
    assert!(!report.run_id.is_empty());
}

#[test]
fn engine_init_failure_without_fail_on_error_completes_with_warning() {
    let mut harness = Harness::new(one_dependency());
    harness.factory.fails = true;

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let report = tracing::subscriber::with_default(subscriber, || harness.run(policy(false)));

    assert!(matches!(report.outcome, RunOutcome::CompletedWithWarnings));
    assert!(report.is_success());
    assert!(!report.ran(Phase::Collect));
    assert!(!report.ran(Phase::Analyze));
    assert!(!report.ran(Phase::Report));
    assert!(!report.ran(Phase::Evaluate));
    assert!(report.ran(Phase::Cleanup));
    assert_eq!(harness.counters.collected.load(Ordering::SeqCst), 0);
    assert!(report.warnings[0].contains("database is locked"));

    let output = logs.contents();
    assert!(output.contains("unable to create the dependency-check engine"));
    assert!(output.contains("database is locked"));
}

#[test]
fn engine_init_failure_with_fail_on_error_aborts() {
    let mut harness = Harness::new(one_dependency());
    harness.factory.fails = true;
    let report = harness.run(policy(true));

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(DependencyCheckError::EngineInit(_))
    ));
    assert_eq!(report.phases.last(), Some(&Phase::Aborted));
    assert!(report.ran(Phase::Cleanup));
    assert!(!report.ran(Phase::Collect));
}

#[test]
fn non_fatal_analysis_error_escalates_at_aggregation_with_fail_on_error() {
    let harness = Harness::new(Script {
        per_artifact: 1,
        analysis_error: Some(ExceptionCollection::from_message("analyzer timed out")),
        ..Script::default()
    });
    let report = harness.run(policy(true));

    assert!(report.ran(Phase::Report));
    assert!(report.ran(Phase::Evaluate));
    assert_eq!(harness.counters.reported.load(Ordering::SeqCst), 1);
    match &report.outcome {
        RunOutcome::Aborted(DependencyCheckError::Aggregate(c)) => {
            assert_eq!(c.messages(), ["analyzer timed out"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(harness.closed(), 1);
}

#[test]
fn non_fatal_analysis_error_completes_without_fail_on_error() {
    let harness = Harness::new(Script {
        per_artifact: 1,
        analysis_error: Some(ExceptionCollection::from_message("analyzer timed out")),
        ..Script::default()
    });
    let report = harness.run(policy(false));

    assert!(matches!(report.outcome, RunOutcome::Completed));
    assert!(report.ran(Phase::Evaluate));
    assert_eq!(report.warnings, vec!["analyzer timed out".to_owned()]);
}

#[test]
fn fatal_analysis_error_aborts_immediately_with_fail_on_error() {
    let mut fatal = ExceptionCollection::new(true);
    fatal.push("data store corrupted");
    let harness = Harness::new(Script {
        per_artifact: 1,
        analysis_error: Some(fatal),
        ..Script::default()
    });
    let report = harness.run(policy(true));

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(DependencyCheckError::Analysis(_))
    ));
    assert!(!report.ran(Phase::Report));
    assert!(!report.ran(Phase::Evaluate));
    assert!(report.ran(Phase::Cleanup));
    assert_eq!(harness.counters.reported.load(Ordering::SeqCst), 0);
    assert_eq!(harness.closed(), 1);
}

#[test]
fn fatal_analysis_error_is_retained_without_fail_on_error() {
    let mut fatal = ExceptionCollection::new(true);
    fatal.push("data store corrupted");
    let harness = Harness::new(Script {
        per_artifact: 1,
        analysis_error: Some(fatal),
        ..Script::default()
    });
    let report = harness.run(policy(false));

    assert!(matches!(report.outcome, RunOutcome::Completed));
    assert!(report.ran(Phase::Report));
    assert!(report.ran(Phase::Evaluate));
}

#[test]
fn report_failure_with_fail_on_error_aborts_after_cleanup() {
    let harness = Harness::new(Script {
        per_artifact: 1,
        analysis_error: Some(ExceptionCollection::from_message("analyzer timed out")),
        report_fails: true,
        ..Script::default()
    });
    let report = harness.run(policy(true));

    match &report.outcome {
        RunOutcome::Aborted(DependencyCheckError::Aggregate(c)) => {
            assert_eq!(c.len(), 2);
            assert_eq!(c.messages()[0], "analyzer timed out");
            assert!(c.messages()[1].contains("/readonly/report.json"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!report.ran(Phase::Evaluate));
    let cleanup = report.phases.iter().position(|p| *p == Phase::Cleanup);
    let aborted = report.phases.iter().position(|p| *p == Phase::Aborted);
    assert!(cleanup < aborted);
    assert_eq!(harness.closed(), 1);
}

#[test]
fn report_failure_without_fail_on_error_still_evaluates() {
    let harness = Harness::new(Script {
        per_artifact: 1,
        vulnerabilities: vec![vuln("CVE-2024-0009", 9.0)],
        report_fails: true,
        ..Script::default()
    });
    let mut p = policy(false);
    p.failure.fail_build_on_cvss = 7.0;
    let report = harness.run(p);

    assert!(report.ran(Phase::Evaluate));
    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(DependencyCheckError::ThresholdViolation { .. })
    ));
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn threshold_violation_aborts_regardless_of_fail_on_error() {
    for fail_on_error in [true, false] {
        let harness = Harness::new(Script {
            per_artifact: 1,
            vulnerabilities: vec![vuln("CVE-LOW", 5.0), vuln("CVE-EQ", 7.0), vuln("CVE-HIGH", 9.0)],
            ..Script::default()
        });
        let mut p = policy(fail_on_error);
        p.failure.fail_build_on_cvss = 7.0;
        let report = harness.run(p);

        match &report.outcome {
            RunOutcome::Aborted(DependencyCheckError::ThresholdViolation {
                vulnerabilities, ..
            }) => assert_eq!(vulnerabilities, "CVE-EQ, CVE-HIGH"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(harness.closed(), 1);
        assert_eq!(report.phases.last(), Some(&Phase::Aborted));
    }
}

#[test]
fn threshold_violation_logs_count_of_replaced_errors() {
    let harness = Harness::new(Script {
        per_artifact: 1,
        vulnerabilities: vec![vuln("CVE-HIGH", 9.0)],
        analysis_error: Some(ExceptionCollection::from_message("analyzer timed out")),
        ..Script::default()
    });
    let mut p = policy(true);
    p.failure.fail_build_on_cvss = 7.0;

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let report = tracing::subscriber::with_default(subscriber, || harness.run(p));

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(DependencyCheckError::ThresholdViolation { .. })
    ));
    assert_eq!(report.warnings, vec!["analyzer timed out".to_owned()]);

    let output = logs.contents();
    assert!(output.contains("dependency check aborted"));
    assert!(output.contains("retained_errors=1"));
}

#[test]
fn finished_run_logs_elapsed_milliseconds() {
    let harness = Harness::new(one_dependency());

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let report = tracing::subscriber::with_default(subscriber, || harness.run(policy(true)));

    assert!(matches!(report.outcome, RunOutcome::Completed));
    let output = logs.contents();
    assert!(output.contains("dependency check finished"));
    assert!(output.contains("elapsed_ms="));
}

#[test]
fn disabled_gate_ignores_critical_findings() {
    let harness = Harness::new(Script {
        per_artifact: 1,
        vulnerabilities: vec![vuln("CVE-CRIT", 10.0)],
        ..Script::default()
    });
    let mut p = policy(true);
    p.failure.fail_build_on_cvss = 10.1;
    let report = harness.run(p);
    assert!(matches!(report.outcome, RunOutcome::Completed));
}

#[test]
fn collector_error_is_folded_into_retained_collection() {
    let mut harness = Harness::new(one_dependency());
    harness.collector.error = Some(CollectError::InvalidArtifacts(vec![":app:compile".to_owned()]));

    let report = harness.run(policy(true));
    assert!(report.ran(Phase::Analyze));
    assert!(report.ran(Phase::Evaluate));
    match &report.outcome {
        RunOutcome::Aborted(DependencyCheckError::Aggregate(c)) => {
            assert!(!c.is_fatal());
            assert!(c.messages()[0].contains(":app:compile"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let report = harness.run(policy(false));
    assert!(matches!(report.outcome, RunOutcome::Completed));
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn ambiguous_artifact_is_collected_without_identifiers() {
    let harness = Harness::new(Script {
        per_artifact: 3,
        vulnerabilities: vec![vuln("CVE-2024-0001", 5.0)],
        ..Script::default()
    });
    let report = harness.run(policy(true));

    assert_eq!(report.dependency_count, 3);
    assert_eq!(report.vulnerability_count, 3);
    assert!(report.summary.lines.iter().all(|l| l.contains("() :")));
}

#[test]
fn config_error_is_raised_before_engine_creation() {
    let mut p = policy(true);
    p.scan.scan_configurations = vec!["a".to_owned()];
    p.scan.skip_configurations = vec!["b".to_owned()];

    let err = AnalysisOrchestrator::builder()
        .policy(p)
        .context(context())
        .build()
        .unwrap_err();

    assert!(matches!(err, DependencyCheckError::Config { ref field, .. } if field == "scan_configurations"));
}

#[test]
fn show_summary_disabled_leaves_no_lines() {
    let harness = Harness::new(Script {
        per_artifact: 1,
        vulnerabilities: vec![vuln("CVE-2024-0001", 5.0)],
        ..Script::default()
    });
    let mut p = policy(true);
    p.failure.show_summary = false;
    let report = harness.run(p);

    assert_eq!(report.vulnerability_count, 1);
    assert!(report.summary.lines.is_empty());
}
