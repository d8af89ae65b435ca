//! 분석 엔진 경계 -- 외부 취약점 분석 엔진과의 인터페이스
//!
//! 엔진 자체(업데이트, CVE 매칭, 점수 산정)는 이 크레이트의 범위 밖입니다.
//! 오케스트레이터는 [`EngineFactory`]로 엔진을 만들고 [`Engine`] trait을 통해서만
//! 생명주기를 구동합니다.

use std::fmt;
use std::path::Path;

use cvegate_core::types::{Dependency, ReportFormat};

use crate::graph::Artifact;
use crate::settings::SettingsStore;

/// 실행 도중 수집된 에러 집합
///
/// 즉시 중단하지 않고 부분 실패 상태를 다음 단계로 전달할 때 사용합니다.
/// `fatal`이 설정되면 `fail_on_error` 정책에서 즉시 중단 대상이 됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionCollection {
    messages: Vec<String>,
    fatal: bool,
}

impl ExceptionCollection {
    pub fn new(fatal: bool) -> Self {
        Self {
            messages: Vec::new(),
            fatal,
        }
    }

    /// 단일 비치명적 메시지로 집합을 생성합니다.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
            fatal: false,
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// 다른 집합을 뒤에 병합합니다. 어느 한쪽이라도 치명적이면 결과도 치명적입니다.
    pub fn merge(&mut self, other: ExceptionCollection) {
        self.messages.extend(other.messages);
        self.fatal |= other.fatal;
    }

    pub fn set_fatal(&mut self, fatal: bool) {
        self.fatal = fatal;
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for ExceptionCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.messages.is_empty() {
            return write!(f, "no exceptions");
        }
        write!(f, "{}", self.messages.join("; "))
    }
}

impl std::error::Error for ExceptionCollection {}

/// 엔진 생성 실패 (예: 데이터 저장소 연결 불가)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unable to create the dependency-check engine: {reason}")]
pub struct EngineInitError {
    pub reason: String,
}

impl EngineInitError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// 리포트 작성 실패
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// 엔진이 지원하지 않는 형식
    #[error("report format {0} is not supported by this engine")]
    UnsupportedFormat(ReportFormat),

    /// 리포트 직렬화 실패
    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 리포트 파일 쓰기 실패
    #[error("unable to write report to {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// 리포트 작성 요청
#[derive(Debug, Clone, Copy)]
pub struct ReportRequest<'a> {
    pub display_name: &'a str,
    pub group_id: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub output_dir: &'a Path,
    pub formats: &'a [ReportFormat],
}

/// 외부 분석 엔진
///
/// 한 번의 실행 동안 오케스트레이터가 독점 소유합니다. 모든 호출은 블로킹입니다.
pub trait Engine: Send {
    /// 아티팩트 하나를 엔진에 등록하고, 그로부터 생성된 의존성을 반환합니다.
    ///
    /// 아카이브처럼 내부 컴포넌트가 여럿인 경우 여러 의존성이 반환될 수 있습니다.
    /// 이미 등록된 아티팩트는 기존 의존성을 다시 반환합니다.
    fn scan(&mut self, artifact: &Artifact) -> &mut [Dependency];

    /// 등록된 의존성을 분석합니다.
    fn analyze_dependencies(&mut self) -> Result<(), ExceptionCollection>;

    /// 리포트를 작성합니다.
    fn write_reports(&self, request: &ReportRequest<'_>) -> Result<(), ReportError>;

    /// 현재까지 등록/분석된 의존성
    fn dependencies(&self) -> &[Dependency];

    /// 엔진 자원을 해제합니다.
    fn close(&mut self);
}

/// 설정 저장소로부터 엔진을 생성하는 팩토리
pub trait EngineFactory {
    fn create(&self, settings: &SettingsStore) -> Result<Box<dyn Engine>, EngineInitError>;
}
