//! cvegate 의존성 검사 -- 빌드 통합 취약점 게이트의 오케스트레이션 계층
//!
//! 외부 분석 엔진을 구동해 빌드의 의존성을 알려진 취약점과 대조하고,
//! 정책에 따라 빌드를 실패시킬지 결정합니다.
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`DependencyCheckError`)
//! - [`settings`]: Policy to engine settings translation (`translate`, `SettingsStore`)
//! - [`graph`]: Host build graph (`BuildGraph`, `ConfigurationGroup`, `Artifact`, `ProjectContext`)
//! - [`classifier`]: Group scope rules (`is_test_group`, `should_scan`, `ProjectFilter`)
//! - [`host`]: Versioned host capabilities (`HostVersion`, `HostCapabilities`)
//! - [`enrichment`]: Coordinate enrichment (`enrich`)
//! - [`engine`]: Engine boundary (`Engine`, `EngineFactory`, `ExceptionCollection`)
//! - [`collector`]: Build graph traversal (`DependencyCollector`, `GraphCollector`)
//! - [`evaluator`]: Summary and CVSS gate (`summarize`, `evaluate_threshold`)
//! - [`orchestrator`]: Run state machine (`AnalysisOrchestrator`, `RunReport`)
//! - [`replay`]: Snapshot replay engine (`ReplayEngine`, `ReplayEngineFactory`)
//!
//! # Architecture
//!
//! ```text
//! PolicyConfig --> translate --> SettingsStore --> EngineFactory --> Engine
//!                                                                      |
//! BuildGraph --> GraphCollector (should_scan, enrich) --> Engine::scan |
//!                                                                      v
//!                               analyze --> write_reports --> summarize / evaluate_threshold
//!                                                                      |
//!                                                                  RunReport
//! ```

pub mod classifier;
pub mod collector;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod host;
pub mod orchestrator;
pub mod replay;
pub mod settings;

// --- Public API Re-exports ---

// Orchestrator
pub use orchestrator::{
    AnalysisOrchestrator, AnalysisOrchestratorBuilder, Phase, RunOutcome, RunReport,
};

// Error
pub use error::DependencyCheckError;

// Settings
pub use settings::{SettingValue, SettingsStore, translate};

// Build graph
pub use graph::{
    Artifact, ArtifactCoordinates, BuildGraph, ConfigurationGroup, Project, ProjectContext,
    ProjectIdentity,
};

// Classification
pub use classifier::{ProjectFilter, ScanScope, is_test_group, should_scan};

// Host capabilities
pub use host::{HostCapabilities, HostVersion, LegacyHost, ModernHost, resolve_capabilities};

// Engine boundary
pub use engine::{
    Engine, EngineFactory, EngineInitError, ExceptionCollection, ReportError, ReportRequest,
};

// Collection
pub use collector::{CollectError, CollectStats, DependencyCollector, GraphCollector};
pub use enrichment::enrich;

// Evaluation
pub use evaluator::{Summary, evaluate_threshold, summarize};

// Replay engine
pub use replay::{AdvisorySnapshot, ReplayEngine, ReplayEngineFactory};
