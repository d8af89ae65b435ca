//! 스냅샷 재생 엔진 -- 미리 계산된 권고 스냅샷을 재생하는 [`Engine`] 구현
//!
//! 탐지나 점수 산정은 하지 않습니다. 의존성 식별자(`group:name:version`)를
//! 스냅샷의 키와 비교해 해당 취약점을 붙이고, JSON 리포트만 작성합니다.
//!
//! # 스냅샷 형식
//!
//! ```json
//! {
//!   "advisories": {
//!     "org.example:lib:1.0": [ { "name": "CVE-2024-0001", "cvss_score": 9.8 } ]
//!   },
//!   "errors": [],
//!   "fatal": false
//! }
//! ```
//!
//! `errors`가 비어 있지 않으면 분석 단계가 해당 메시지로 실패를 보고합니다.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cvegate_core::types::{Dependency, ReportFormat, Vulnerability};

use crate::engine::{
    Engine, EngineFactory, EngineInitError, ExceptionCollection, ReportError, ReportRequest,
};
use crate::graph::Artifact;
use crate::settings::{SettingsStore, keys};

/// 리포트 파일 이름
pub const REPORT_FILE_NAME: &str = "dependency-check-report.json";

/// 미리 계산된 권고 스냅샷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorySnapshot {
    /// 식별자 값별 취약점 목록
    #[serde(default)]
    pub advisories: BTreeMap<String, Vec<Vulnerability>>,
    /// 분석 단계에서 보고할 에러
    #[serde(default)]
    pub errors: Vec<String>,
    /// `errors`의 치명 여부
    #[serde(default)]
    pub fatal: bool,
}

impl AdvisorySnapshot {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 스냅샷 파일을 읽습니다.
    pub fn load(path: &Path) -> Result<Self, EngineInitError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineInitError::new(format!("unable to read advisory snapshot {}: {e}", path.display()))
        })?;
        Self::from_json(&content).map_err(|e| {
            EngineInitError::new(format!("invalid advisory snapshot {}: {e}", path.display()))
        })
    }

    /// 전체 권고 수
    pub fn advisory_count(&self) -> usize {
        self.advisories.values().map(Vec::len).sum()
    }
}

/// 스냅샷 파일에서 [`ReplayEngine`]을 생성하는 팩토리
#[derive(Debug, Clone)]
pub struct ReplayEngineFactory {
    source: SnapshotSource,
}

#[derive(Debug, Clone)]
enum SnapshotSource {
    File(PathBuf),
    Loaded(AdvisorySnapshot),
}

impl ReplayEngineFactory {
    /// 엔진 생성 시 `path`에서 스냅샷을 읽는 팩토리를 만듭니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: SnapshotSource::File(path.into()),
        }
    }

    /// 이미 읽은 스냅샷으로 팩토리를 만듭니다.
    pub fn with_snapshot(snapshot: AdvisorySnapshot) -> Self {
        Self {
            source: SnapshotSource::Loaded(snapshot),
        }
    }
}

impl EngineFactory for ReplayEngineFactory {
    fn create(&self, settings: &SettingsStore) -> Result<Box<dyn Engine>, EngineInitError> {
        if settings.is_released() {
            return Err(EngineInitError::new("settings store was already released"));
        }
        if settings.get_bool(keys::AUTO_UPDATE) == Some(true) {
            debug!("auto update requested, replaying a fixed snapshot instead");
        }

        let snapshot = match &self.source {
            SnapshotSource::File(path) => AdvisorySnapshot::load(path)?,
            SnapshotSource::Loaded(snapshot) => snapshot.clone(),
        };
        info!(
            advisories = snapshot.advisory_count(),
            settings = settings.len(),
            "replay engine created"
        );
        Ok(Box::new(ReplayEngine::new(snapshot)))
    }
}

/// 스냅샷 재생 엔진
#[derive(Debug)]
pub struct ReplayEngine {
    snapshot: AdvisorySnapshot,
    dependencies: Vec<Dependency>,
    by_path: HashMap<String, Range<usize>>,
    closed: bool,
}

impl ReplayEngine {
    pub fn new(snapshot: AdvisorySnapshot) -> Self {
        Self {
            snapshot,
            dependencies: Vec::new(),
            by_path: HashMap::new(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Serialize)]
struct ReplayReport<'a> {
    project: ReportProject<'a>,
    dependencies: &'a [Dependency],
}

#[derive(Serialize)]
struct ReportProject<'a> {
    display_name: &'a str,
    group: &'a str,
    name: &'a str,
    version: &'a str,
}

impl Engine for ReplayEngine {
    fn scan(&mut self, artifact: &Artifact) -> &mut [Dependency] {
        let range = match self.by_path.get(&artifact.path) {
            Some(range) => range.clone(),
            None => {
                let start = self.dependencies.len();
                if artifact.contents.is_empty() {
                    self.dependencies
                        .push(Dependency::new(&artifact.file_name, &artifact.path));
                } else {
                    for entry in &artifact.contents {
                        self.dependencies.push(Dependency::new(
                            format!("{}: {entry}", artifact.file_name),
                            format!("{}/{entry}", artifact.path),
                        ));
                    }
                }
                let range = start..self.dependencies.len();
                self.by_path.insert(artifact.path.clone(), range.clone());
                range
            }
        };
        &mut self.dependencies[range]
    }

    fn analyze_dependencies(&mut self) -> Result<(), ExceptionCollection> {
        let mut matched = 0usize;
        for dependency in &mut self.dependencies {
            let found: Vec<Vulnerability> = dependency
                .identifiers
                .iter()
                .filter_map(|id| self.snapshot.advisories.get(&id.value))
                .flatten()
                .cloned()
                .collect();
            matched += found.len();
            for vulnerability in found {
                dependency.add_vulnerability(vulnerability);
            }
        }
        debug!(
            dependencies = self.dependencies.len(),
            matched, "replayed advisory snapshot"
        );

        if self.snapshot.errors.is_empty() {
            return Ok(());
        }
        let mut collection = ExceptionCollection::new(self.snapshot.fatal);
        for message in &self.snapshot.errors {
            collection.push(message.clone());
        }
        Err(collection)
    }

    fn write_reports(&self, request: &ReportRequest<'_>) -> Result<(), ReportError> {
        if let Some(unsupported) = request
            .formats
            .iter()
            .find(|f| !matches!(f, ReportFormat::Json | ReportFormat::All))
        {
            return Err(ReportError::UnsupportedFormat(*unsupported));
        }

        let report = ReplayReport {
            project: ReportProject {
                display_name: request.display_name,
                group: request.group_id,
                name: request.name,
                version: request.version,
            },
            dependencies: &self.dependencies,
        };
        let json = serde_json::to_string_pretty(&report)?;

        let path = request.output_dir.join(REPORT_FILE_NAME);
        let write_error = |source| ReportError::Write {
            path: path.display().to_string(),
            source,
        };
        std::fs::create_dir_all(request.output_dir).map_err(write_error)?;
        std::fs::write(&path, json).map_err(write_error)?;

        info!(path = %path.display(), "report written");
        Ok(())
    }

    fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    fn close(&mut self) {
        if !self.closed {
            debug!(dependencies = self.dependencies.len(), "closing replay engine");
        }
        self.by_path.clear();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use cvegate_core::types::{Confidence, Identifier};

    use super::*;
    use crate::graph::ArtifactCoordinates;

    fn snapshot() -> AdvisorySnapshot {
        AdvisorySnapshot::from_json(
            r#"{
                "advisories": {
                    "org.example:lib:1.0": [
                        { "name": "CVE-2024-0001", "cvss_score": 9.8 },
                        { "name": "CVE-2024-0002", "cvss_score": 4.3 }
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    fn artifact(file: &str) -> Artifact {
        Artifact {
            file_name: file.to_owned(),
            path: format!("/cache/{file}"),
            coordinates: ArtifactCoordinates::default(),
            contents: Vec::new(),
        }
    }

    #[test]
    fn scan_is_idempotent_per_path() {
        let mut engine = ReplayEngine::new(AdvisorySnapshot::default());
        assert_eq!(engine.scan(&artifact("a.jar")).len(), 1);
        assert_eq!(engine.scan(&artifact("a.jar")).len(), 1);
        assert_eq!(engine.dependencies().len(), 1);
    }

    #[test]
    fn scan_expands_archive_contents() {
        let mut engine = ReplayEngine::new(AdvisorySnapshot::default());
        let mut bundle = artifact("bundle.zip");
        bundle.contents = vec!["a.js".to_owned(), "b.js".to_owned()];
        let deps = engine.scan(&bundle);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].file_name, "bundle.zip: a.js");
    }

    #[test]
    fn analyze_attaches_matching_advisories() {
        let mut engine = ReplayEngine::new(snapshot());
        engine.scan(&artifact("lib.jar"))[0].add_identifier(Identifier {
            namespace: "maven".to_owned(),
            value: "org.example:lib:1.0".to_owned(),
            confidence: Confidence::Highest,
        });
        engine.scan(&artifact("other.jar"));

        engine.analyze_dependencies().unwrap();
        let deps = engine.dependencies();
        assert_eq!(deps[0].vulnerabilities.len(), 2);
        assert_eq!(deps[0].vulnerabilities[0].name, "CVE-2024-0001");
        assert!(deps[1].vulnerabilities.is_empty());
    }

    #[test]
    fn analyze_reports_snapshot_errors() {
        let mut snap = snapshot();
        snap.errors = vec!["feed unavailable".to_owned()];
        snap.fatal = true;
        let mut engine = ReplayEngine::new(snap);
        let err = engine.analyze_dependencies().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.messages(), ["feed unavailable"]);
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let engine = ReplayEngine::new(AdvisorySnapshot::default());
        let formats = [ReportFormat::Json, ReportFormat::Html];
        let request = ReportRequest {
            display_name: "demo",
            group_id: "",
            name: "demo",
            version: "",
            output_dir: Path::new("/nonexistent"),
            formats: &formats,
        };
        let err = engine.write_reports(&request).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(ReportFormat::Html)));
    }

    #[test]
    fn factory_without_snapshot_file_fails() {
        let factory = ReplayEngineFactory::new("/nonexistent/advisories.json");
        let err = factory.create(&SettingsStore::new()).err().unwrap();
        assert!(err.reason.contains("/nonexistent/advisories.json"));
    }

    #[test]
    fn factory_rejects_released_settings() {
        let mut settings = SettingsStore::new();
        settings.release();
        let factory = ReplayEngineFactory::with_snapshot(AdvisorySnapshot::default());
        assert!(factory.create(&settings).is_err());
    }

    #[test]
    fn close_marks_engine_closed() {
        let mut engine = ReplayEngine::new(AdvisorySnapshot::default());
        engine.close();
        engine.close();
        assert!(engine.is_closed());
    }
}
