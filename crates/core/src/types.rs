//! 도메인 타입 -- 의존성, 식별자, 증거, 취약점
//!
//! 분석 엔진과 오케스트레이터가 공유하는 데이터 구조를 정의합니다.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 증거/식별자의 신뢰도
///
/// 순서가 의미를 가지며 `Highest`가 가장 높은 신뢰도입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
    Highest,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Highest => write!(f, "HIGHEST"),
        }
    }
}

/// 컴포넌트 식별에 사용되는 가중치 단서
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// 증거 출처 (예: `"build-graph"`)
    pub source: String,
    /// 증거 필드명
    pub field: String,
    /// 증거 값
    pub value: String,
    /// 신뢰도
    pub confidence: Confidence,
}

/// 정규화된 컴포넌트 좌표
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    /// 네임스페이스 (예: `"maven"`)
    pub namespace: String,
    /// 좌표 값 (예: `"org.example:lib:1.0.0"`)
    pub value: String,
    /// 신뢰도
    pub confidence: Confidence,
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// 알려진 취약점
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 취약점 이름 (예: CVE-2024-1234)
    pub name: String,
    /// CVSS 점수 (0.0 - 10.0)
    pub cvss_score: f64,
}

impl Vulnerability {
    /// CVSS 점수에 대응하는 심각도를 반환합니다.
    pub fn severity(&self) -> Severity {
        Severity::from_cvss(self.cvss_score)
    }
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (cvss {:.1})", self.name, self.cvss_score)
    }
}

/// CVSS v3 정성 등급
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// CVSS 점수를 정성 등급으로 변환합니다.
    ///
    /// 0.0 = None, 0.1-3.9 = Low, 4.0-6.9 = Medium, 7.0-8.9 = High, 9.0-10.0 = Critical
    pub fn from_cvss(score: f64) -> Self {
        if score >= 9.0 {
            Self::Critical
        } else if score >= 7.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Medium
        } else if score > 0.0 {
            Self::Low
        } else {
            Self::None
        }
    }

    /// 메트릭 레이블용 소문자 이름
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 발견된 소프트웨어 컴포넌트
///
/// 엔진이 생성하고, 수집 단계에서 증거/식별자/프로젝트 참조가 추가됩니다.
/// 식별자와 증거는 삽입 순서를 유지하며 중복은 무시합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// 파일 이름
    pub file_name: String,
    /// 파일 경로
    pub file_path: String,
    /// 식별자 목록
    pub identifiers: Vec<Identifier>,
    /// 증거 목록
    pub evidence: Vec<Evidence>,
    /// 취약점 목록
    pub vulnerabilities: Vec<Vulnerability>,
    /// 이 의존성이 발견된 그룹 이름
    pub project_references: BTreeSet<String>,
}

impl Dependency {
    /// 파일 이름과 경로로 빈 의존성을 생성합니다.
    pub fn new(file_name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn add_identifier(&mut self, identifier: Identifier) {
        if !self.identifiers.contains(&identifier) {
            self.identifiers.push(identifier);
        }
    }

    pub fn add_evidence(&mut self, evidence: Evidence) {
        if !self.evidence.contains(&evidence) {
            self.evidence.push(evidence);
        }
    }

    pub fn add_vulnerability(&mut self, vulnerability: Vulnerability) {
        if !self.vulnerabilities.iter().any(|v| v.name == vulnerability.name) {
            self.vulnerabilities.push(vulnerability);
        }
    }

    pub fn add_project_reference(&mut self, reference: impl Into<String>) {
        self.project_references.insert(reference.into());
    }

    /// 취약점이 하나 이상 있는지 반환합니다.
    pub fn is_vulnerable(&self) -> bool {
        !self.vulnerabilities.is_empty()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} identifiers, {} vulnerabilities)",
            self.file_name,
            self.identifiers.len(),
            self.vulnerabilities.len(),
        )
    }
}

/// 리포트 출력 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportFormat {
    Html,
    Xml,
    Csv,
    Json,
    Junit,
    Sarif,
    /// 엔진이 지원하는 모든 형식
    All,
}

impl ReportFormat {
    /// 문자열에서 리포트 형식을 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "html" => Some(Self::Html),
            "xml" => Some(Self::Xml),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "junit" => Some(Self::Junit),
            "sarif" => Some(Self::Sarif),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => write!(f, "HTML"),
            Self::Xml => write!(f, "XML"),
            Self::Csv => write!(f, "CSV"),
            Self::Json => write!(f, "JSON"),
            Self::Junit => write!(f, "JUNIT"),
            Self::Sarif => write!(f, "SARIF"),
            Self::All => write!(f, "ALL"),
        }
    }
}
