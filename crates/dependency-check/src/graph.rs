//! 빌드 그래프 -- 호스트 빌드 시스템이 제공하는 프로젝트/그룹/아티팩트 구조
//!
//! 오케스트레이터는 이 구조를 읽기만 합니다. 아티팩트 해석(resolution)은
//! 호스트가 이미 끝낸 상태로 전달됩니다.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// 호스트 빌드 그래프
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildGraph {
    /// 호스트 빌드 시스템 버전 (예: `"7.6"`)
    pub host_version: String,
    /// 루트 프로젝트 식별 정보
    pub project: ProjectIdentity,
    /// 하위 프로젝트 목록
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl BuildGraph {
    /// JSON 문자열에서 빌드 그래프를 파싱합니다.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 전체 그룹 수를 반환합니다.
    pub fn group_count(&self) -> usize {
        self.projects.iter().map(|p| p.groups.len()).sum()
    }
}

/// 프로젝트 식별 정보 (리포트 메타데이터)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectIdentity {
    pub display_name: String,
    #[serde(default)]
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// 한 번의 실행에 전달되는 명시적 프로젝트 컨텍스트
///
/// 프로젝트 식별 정보와 리포트 출력 디렉토리를 묶습니다.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub identity: ProjectIdentity,
    pub output_directory: PathBuf,
}

impl ProjectContext {
    pub fn new(identity: ProjectIdentity, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            output_directory: output_directory.into(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

impl fmt::Display for ProjectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{}:{})",
            self.identity.display_name,
            self.identity.group,
            self.identity.name,
            self.identity.version,
        )
    }
}

/// 빌드 내 단일 프로젝트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// 프로젝트 경로 (예: `":app"`)
    pub path: String,
    #[serde(default)]
    pub groups: Vec<ConfigurationGroup>,
}

/// 이름과 조상 계층을 가진 의존성 해석 그룹
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationGroup {
    pub name: String,
    /// 모든 조상 그룹 이름 (순서 무관, 누락 없음)
    #[serde(default)]
    pub hierarchy: Vec<String>,
    /// 호스트가 보고한 해석 가능 여부 (호스트 capability를 통해서만 참조)
    #[serde(default = "default_resolvable")]
    pub resolvable: bool,
    /// 해석된 아티팩트 목록
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

fn default_resolvable() -> bool {
    true
}

impl ConfigurationGroup {
    /// 아티팩트 없는 그룹을 생성합니다.
    pub fn new(name: impl Into<String>, hierarchy: Vec<String>) -> Self {
        Self {
            name: name.into(),
            hierarchy,
            resolvable: true,
            artifacts: Vec::new(),
        }
    }
}

/// 해석된 아티팩트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub file_name: String,
    pub path: String,
    #[serde(default)]
    pub coordinates: ArtifactCoordinates,
    /// 아카이브 내부에 포함된 파일 (비어 있으면 단일 컴포넌트)
    #[serde(default)]
    pub contents: Vec<String>,
}

impl Artifact {
    /// 파일 이름이 주어진 확장자 중 하나로 끝나는지 확인합니다.
    pub fn matches_type(&self, analyzed_types: &[String]) -> bool {
        let lower = self.file_name.to_lowercase();
        analyzed_types
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext.to_lowercase())))
    }
}

/// 아티팩트 좌표 (group / name / version)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCoordinates {
    pub group: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
}

impl ArtifactCoordinates {
    pub fn new(group: &str, name: &str, version: &str) -> Self {
        Self {
            group: Some(group.to_owned()),
            name: Some(name.to_owned()),
            version: Some(version.to_owned()),
        }
    }

    /// 세 좌표가 모두 있으면 `group:name:version` 형식을 반환합니다.
    pub fn gav(&self) -> Option<String> {
        match (&self.group, &self.name, &self.version) {
            (Some(g), Some(n), Some(v)) if !g.is_empty() && !n.is_empty() && !v.is_empty() => {
                Some(format!("{g}:{n}:{v}"))
            }
            _ => None,
        }
    }
}
