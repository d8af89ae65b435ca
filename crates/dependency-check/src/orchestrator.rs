//! 분석 오케스트레이터 -- 한 번의 의존성 검사 실행을 구동하는 상태 머신
//!
//! # 단계
//!
//! ```text
//! Init --> EngineCreate --> Collect --> Analyze --> Report --> Evaluate --> Cleanup --> Done
//!              |                           |           |           |
//!              +---------------------------+-----------+-----------+--> Cleanup --> Aborted
//! ```
//!
//! # 실패 정책
//!
//! - `fail_on_error`는 엔진 생성, 분석, 리포트 에러의 중단 여부를 결정합니다.
//! - CVSS 게이트는 `fail_on_error`와 무관하게 항상 실행을 중단시킵니다.
//! - 엔진이 생성된 모든 경로에서 정리(Cleanup)는 정확히 한 번, 중단 보고 전에 실행됩니다.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};

use cvegate_core::config::{FailureConfig, PolicyConfig};
use cvegate_core::error::{ConfigError, CvegateError};
use cvegate_core::metrics as m;
use cvegate_core::types::{Dependency, ReportFormat, Severity};

use crate::collector::DependencyCollector;
use crate::engine::{Engine, EngineFactory, ExceptionCollection, ReportRequest};
use crate::error::DependencyCheckError;
use crate::evaluator::{Summary, evaluate_threshold, summarize};
use crate::graph::ProjectContext;
use crate::settings::{SettingsStore, translate};

/// 실행 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    EngineCreate,
    Collect,
    Analyze,
    Report,
    Evaluate,
    Cleanup,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::EngineCreate => "engine_create",
            Self::Collect => "collect",
            Self::Analyze => "analyze",
            Self::Report => "report",
            Self::Evaluate => "evaluate",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        write!(f, "{name}")
    }
}

/// 실행 결과
#[derive(Debug)]
pub enum RunOutcome {
    /// 정상 완료
    Completed,
    /// 비치명적 에러로 일부 단계를 건너뛰고 완료
    CompletedWithWarnings,
    /// 치명적 조건으로 중단
    Aborted(DependencyCheckError),
}

impl RunOutcome {
    /// 메트릭/출력용 레이블
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CompletedWithWarnings => "completed_with_warnings",
            Self::Aborted(_) => "aborted",
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

/// 한 번의 실행 보고서
#[derive(Debug)]
pub struct RunReport {
    /// 실행 ID (로그 상관관계용)
    pub run_id: String,
    pub outcome: RunOutcome,
    /// 실행된 단계 (순서대로)
    pub phases: Vec<Phase>,
    pub dependency_count: usize,
    pub vulnerability_count: usize,
    pub summary: Summary,
    /// 실행을 중단시키지 않은 에러 메시지
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        !self.outcome.is_aborted()
    }

    /// 해당 단계가 실행되었는지 확인합니다.
    pub fn ran(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    /// 중단된 실행을 에러로 변환합니다.
    pub fn into_result(mut self) -> Result<Self, DependencyCheckError> {
        match std::mem::replace(&mut self.outcome, RunOutcome::Completed) {
            RunOutcome::Aborted(err) => Err(err),
            outcome => {
                self.outcome = outcome;
                Ok(self)
            }
        }
    }
}

/// 실행 동안 독점 소유하는 자원
///
/// `run`의 모든 분기는 `cleanup()`을 명시적으로 호출합니다. drop 해제는 이후 추가될
/// 조기 반환 경로가 정리를 건너뛰지 않도록 하는 안전망입니다.
struct RunResources {
    settings: SettingsStore,
    engine: Option<Box<dyn Engine>>,
    released: bool,
}

impl RunResources {
    fn new(settings: SettingsStore) -> Self {
        Self {
            settings,
            engine: None,
            released: false,
        }
    }

    /// 엔진을 닫고 설정 저장소를 해제합니다. 두 번째 호출부터는 아무것도 하지 않습니다.
    fn cleanup(&mut self) -> bool {
        if self.released {
            return false;
        }
        if let Some(mut engine) = self.engine.take() {
            engine.close();
        }
        self.settings.release();
        self.released = true;
        true
    }
}

impl Drop for RunResources {
    fn drop(&mut self) {
        if !self.released {
            warn!("run resources were not cleaned up explicitly, releasing on drop");
            self.cleanup();
        }
    }
}

/// 단계 진행 중 누적되는 상태
#[derive(Default)]
struct RunState {
    phases: Vec<Phase>,
    retained: ExceptionCollection,
    warnings: Vec<String>,
    dependency_count: usize,
    severities: BTreeMap<Severity, usize>,
    summary: Summary,
}

impl RunState {
    fn enter(&mut self, phase: Phase) {
        debug!(phase = %phase, "entering phase");
        self.phases.push(phase);
    }

    fn retain(&mut self, collection: ExceptionCollection) {
        self.warnings
            .extend(collection.messages().iter().cloned());
        self.retained.merge(collection);
    }

    fn record_counts(&mut self, dependencies: &[Dependency]) {
        self.dependency_count = dependencies.len();
        self.severities.clear();
        for vuln in dependencies.iter().flat_map(|d| d.vulnerabilities.iter()) {
            *self.severities.entry(vuln.severity()).or_default() += 1;
        }
    }

    fn vulnerability_count(&self) -> usize {
        self.severities.values().sum()
    }
}

/// 의존성 검사 오케스트레이터
///
/// 한 번 실행하면 소비됩니다. 다시 실행하려면 빌더로 새로 생성합니다.
pub struct AnalysisOrchestrator {
    failure: FailureConfig,
    context: ProjectContext,
    formats: Vec<ReportFormat>,
    settings: SettingsStore,
}

impl fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("failure", &self.failure)
            .field("context", &self.context)
            .field("formats", &self.formats)
            .field("settings", &self.settings.len())
            .finish()
    }
}

impl AnalysisOrchestrator {
    pub fn builder() -> AnalysisOrchestratorBuilder {
        AnalysisOrchestratorBuilder::new()
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// 전체 실행을 구동합니다. 모든 호출은 블로킹입니다.
    pub fn run(
        self,
        factory: &dyn EngineFactory,
        collector: &dyn DependencyCollector,
    ) -> RunReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("dependency_check", run_id = %run_id);
        let _guard = span.enter();
        let started = Instant::now();

        let mut state = RunState::default();
        state.enter(Phase::Init);
        info!(project = %self.context, formats = self.formats.len(), "starting dependency check");

        let Self {
            failure,
            context,
            formats,
            settings,
        } = self;
        let mut resources = RunResources::new(settings);

        state.enter(Phase::EngineCreate);
        let outcome = match factory.create(&resources.settings) {
            Ok(engine) => {
                let engine = resources.engine.insert(engine);
                let driven = drive(
                    engine.as_mut(),
                    collector,
                    &failure,
                    &context,
                    &formats,
                    &mut state,
                );

                state.enter(Phase::Cleanup);
                resources.cleanup();

                match driven {
                    Err(err) => RunOutcome::Aborted(err),
                    Ok(()) if failure.fail_on_error && !state.retained.is_empty() => {
                        let retained = std::mem::take(&mut state.retained);
                        RunOutcome::Aborted(DependencyCheckError::Aggregate(retained))
                    }
                    Ok(()) => RunOutcome::Completed,
                }
            }
            Err(err) => {
                error!(error = %err, "unable to create the dependency-check engine");
                state.enter(Phase::Cleanup);
                resources.cleanup();

                if failure.fail_on_error {
                    RunOutcome::Aborted(DependencyCheckError::EngineInit(err))
                } else {
                    state.warnings.push(err.to_string());
                    RunOutcome::CompletedWithWarnings
                }
            }
        };

        state.enter(if outcome.is_aborted() {
            Phase::Aborted
        } else {
            Phase::Done
        });

        record_metrics(&outcome, &state, started);
        match &outcome {
            // 게이트 위반이 보존된 에러를 대체해도 건수는 남김
            RunOutcome::Aborted(err) => error!(
                error = %err,
                retained_errors = state.retained.len(),
                "dependency check aborted"
            ),
            _ => info!(
                outcome = outcome.as_label(),
                dependencies = state.dependency_count,
                vulnerabilities = state.vulnerability_count(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "dependency check finished"
            ),
        }

        RunReport {
            run_id,
            vulnerability_count: state.vulnerability_count(),
            outcome,
            phases: state.phases,
            dependency_count: state.dependency_count,
            summary: state.summary,
            warnings: state.warnings,
        }
    }
}

/// 엔진이 존재하는 동안의 단계 (Collect부터 Evaluate까지)
///
/// `Err`는 정리 후 즉시 보고해야 하는 치명적 조건입니다.
fn drive(
    engine: &mut dyn Engine,
    collector: &dyn DependencyCollector,
    failure: &FailureConfig,
    context: &ProjectContext,
    formats: &[ReportFormat],
    state: &mut RunState,
) -> Result<(), DependencyCheckError> {
    state.enter(Phase::Collect);
    match collector.scan_dependencies(context, engine) {
        Ok(stats) => debug!(artifacts = stats.artifacts, "collector finished"),
        Err(err) => {
            warn!(error = %err, "dependency collection reported errors");
            state.retain(ExceptionCollection::from_message(err.to_string()));
        }
    }

    state.enter(Phase::Analyze);
    info!("checking for updates and analyzing dependencies for vulnerabilities");
    let analyzed = engine.analyze_dependencies();
    state.record_counts(engine.dependencies());
    if let Err(collection) = analyzed {
        let fatal = collection.is_fatal();
        if failure.fail_on_error && fatal {
            let mut retained = std::mem::take(&mut state.retained);
            retained.merge(collection);
            return Err(DependencyCheckError::Analysis(retained));
        }
        warn!(
            fatal,
            errors = collection.len(),
            "exceptions occurred while analyzing dependencies: {collection}"
        );
        state.retain(collection);
    }

    state.enter(Phase::Report);
    info!(project = %context.identity.display_name, "generating report");
    let request = ReportRequest {
        display_name: &context.identity.display_name,
        group_id: &context.identity.group,
        name: &context.identity.name,
        version: &context.identity.version,
        output_dir: context.output_directory(),
        formats,
    };
    if let Err(err) = engine.write_reports(&request) {
        if failure.fail_on_error {
            let mut retained = std::mem::take(&mut state.retained);
            retained.push(err.to_string());
            return Err(DependencyCheckError::Aggregate(retained));
        }
        warn!(error = %err, "unable to write the dependency-check report");
        state.warnings.push(err.to_string());
    }

    state.enter(Phase::Evaluate);
    state.summary = summarize(engine.dependencies(), failure.show_summary);
    evaluate_threshold(engine.dependencies(), failure.fail_build_on_cvss)
}

fn record_metrics(outcome: &RunOutcome, state: &RunState, started: Instant) {
    metrics::counter!(m::RUNS_TOTAL, m::LABEL_OUTCOME => outcome.as_label()).increment(1);
    metrics::counter!(m::DEPENDENCIES_ANALYZED_TOTAL)
        .increment(u64::try_from(state.dependency_count).unwrap_or(u64::MAX));
    for (severity, count) in &state.severities {
        metrics::counter!(m::VULNERABILITIES_FOUND_TOTAL, m::LABEL_SEVERITY => severity.as_label())
            .increment(u64::try_from(*count).unwrap_or(u64::MAX));
    }
    if matches!(
        outcome,
        RunOutcome::Aborted(DependencyCheckError::ThresholdViolation { .. })
    ) {
        metrics::counter!(m::THRESHOLD_VIOLATIONS_TOTAL).increment(1);
    }
    metrics::histogram!(m::RUN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}

/// [`AnalysisOrchestrator`] 빌더
pub struct AnalysisOrchestratorBuilder {
    policy: PolicyConfig,
    context: Option<ProjectContext>,
}

impl AnalysisOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            policy: PolicyConfig::default(),
            context: None,
        }
    }

    /// 실행 정책을 지정합니다.
    pub fn policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// 프로젝트 컨텍스트를 지정합니다.
    pub fn context(mut self, context: ProjectContext) -> Self {
        self.context = Some(context);
        self
    }

    /// 정책을 검증하고 엔진 설정으로 변환해 오케스트레이터를 생성합니다.
    ///
    /// 정책 에러는 엔진과 상호작용하기 전에 여기서 보고됩니다.
    pub fn build(self) -> Result<AnalysisOrchestrator, DependencyCheckError> {
        let context = self
            .context
            .ok_or_else(|| DependencyCheckError::config("context", "project context is required"))?;

        let settings = translate(&self.policy)?;
        // NaN 임계값은 게이트를 조용히 끄므로 실행 전에 거부
        self.policy.validate().map_err(policy_error)?;
        let formats = self.policy.report_formats();

        Ok(AnalysisOrchestrator {
            failure: self.policy.failure,
            context,
            formats,
            settings,
        })
    }
}

fn policy_error(err: CvegateError) -> DependencyCheckError {
    match err {
        CvegateError::Config(ConfigError::InvalidValue { field, reason }) => {
            DependencyCheckError::Config { field, reason }
        }
        other => DependencyCheckError::config("policy", other.to_string()),
    }
}

impl Default for AnalysisOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
