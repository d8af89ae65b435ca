//! 의존성 수집 -- 빌드 그래프를 순회하며 아티팩트를 엔진에 등록
//!
//! # 수집 흐름
//!
//! ```text
//! BuildGraph --> ProjectFilter --> HostCapabilities::can_be_resolved --> should_scan
//!                                                                            |
//!                                        analyzed_types 필터 --> Engine::scan --> enrich
//! ```
//!
//! 잘못된 아티팩트는 건너뛰고 수집을 계속합니다. 건너뛴 아티팩트가 하나라도 있으면
//! 수집이 끝난 뒤 [`CollectError`]로 보고합니다.

use tracing::{debug, info, warn};

use cvegate_core::config::ScanConfig;

use crate::classifier::{ProjectFilter, ScanScope, should_scan};
use crate::engine::Engine;
use crate::enrichment::enrich;
use crate::graph::{Artifact, BuildGraph, ProjectContext};
use crate::host::{HostCapabilities, resolve_capabilities_from_str};

/// 수집 단계 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectError {
    /// 등록할 수 없는 아티팩트
    #[error("{} artifact(s) could not be registered: {}", .0.len(), .0.join(", "))]
    InvalidArtifacts(Vec<String>),

    /// 빌드 그래프 자체를 사용할 수 없음
    #[error("build graph unavailable: {0}")]
    Graph(String),
}

/// 수집 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// 방문한 프로젝트 수
    pub projects: usize,
    /// 스캔한 그룹 수
    pub groups_scanned: usize,
    /// 건너뛴 그룹 수 (해석 불가 또는 범위 밖)
    pub groups_skipped: usize,
    /// 엔진에 등록한 아티팩트 수
    pub artifacts: usize,
}

/// 엔진에 의존성을 등록하는 수집기
pub trait DependencyCollector {
    fn scan_dependencies(
        &self,
        context: &ProjectContext,
        engine: &mut dyn Engine,
    ) -> Result<CollectStats, CollectError>;
}

/// 빌드 그래프 기반 수집기
pub struct GraphCollector {
    graph: BuildGraph,
    scope: ScanScope,
    projects: ProjectFilter,
    analyzed_types: Vec<String>,
    capabilities: Box<dyn HostCapabilities>,
}

impl GraphCollector {
    /// 빌드 그래프와 스캔 정책으로 수집기를 생성합니다.
    ///
    /// 호스트 capability는 이 시점에 한 번 결정됩니다.
    pub fn new(graph: BuildGraph, scan: &ScanConfig) -> Self {
        let capabilities = resolve_capabilities_from_str(&graph.host_version);
        Self {
            graph,
            scope: ScanScope::from_config(scan),
            projects: ProjectFilter::from_config(scan),
            analyzed_types: scan.analyzed_types.clone(),
            capabilities,
        }
    }

    /// capability를 직접 지정합니다.
    pub fn with_capabilities(mut self, capabilities: Box<dyn HostCapabilities>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    fn is_analyzed_type(&self, artifact: &Artifact) -> bool {
        self.analyzed_types.is_empty() || artifact.matches_type(&self.analyzed_types)
    }
}

impl DependencyCollector for GraphCollector {
    fn scan_dependencies(
        &self,
        context: &ProjectContext,
        engine: &mut dyn Engine,
    ) -> Result<CollectStats, CollectError> {
        let mut stats = CollectStats::default();
        let mut invalid = Vec::new();

        for project in &self.graph.projects {
            if !self.projects.should_scan_project(&project.path) {
                debug!(project = %project.path, "project out of scope, skipping");
                continue;
            }
            stats.projects += 1;

            for group in &project.groups {
                if !self.capabilities.can_be_resolved(group) || !should_scan(group, &self.scope) {
                    debug!(project = %project.path, group = %group.name, "skipping group");
                    stats.groups_skipped += 1;
                    continue;
                }
                stats.groups_scanned += 1;

                for artifact in &group.artifacts {
                    if artifact.file_name.is_empty() || artifact.path.is_empty() {
                        warn!(
                            project = %project.path,
                            group = %group.name,
                            "artifact without file name or path, skipping"
                        );
                        invalid.push(format!("{}:{}", project.path, group.name));
                        continue;
                    }

                    if !self.is_analyzed_type(artifact) {
                        debug!(file = %artifact.file_name, "artifact type not analyzed, skipping");
                        continue;
                    }

                    let dependencies = engine.scan(artifact);
                    enrich(dependencies, &artifact.coordinates, &group.name);
                    stats.artifacts += 1;
                }
            }
        }

        info!(
            project = %context,
            projects = stats.projects,
            groups = stats.groups_scanned,
            skipped_groups = stats.groups_skipped,
            artifacts = stats.artifacts,
            "dependency collection complete"
        );

        if invalid.is_empty() {
            Ok(stats)
        } else {
            Err(CollectError::InvalidArtifacts(invalid))
        }
    }
}
