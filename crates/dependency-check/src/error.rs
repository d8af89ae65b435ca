//! 의존성 검사 에러 타입
//!
//! [`DependencyCheckError`]는 한 번의 검사 실행을 중단시키는 모든 치명적 조건을 나타냅니다.
//! `From<DependencyCheckError> for CvegateError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **정책 검증**: `Config` (엔진 생성 전, 항상 치명적)
//! - **엔진 생성**: `EngineInit` (`fail_on_error`일 때만 치명적)
//! - **분석**: `Analysis` (치명적 에러 집합 즉시 중단), `Aggregate` (종료 시 집계)
//! - **CVSS 게이트**: `ThresholdViolation` (`fail_on_error`와 무관하게 항상 치명적)

use cvegate_core::error::{ConfigError, CvegateError, EngineError};

use crate::engine::{EngineInitError, ExceptionCollection};

/// 의존성 검사 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum DependencyCheckError {
    /// 유효하지 않은 정책
    #[error("invalid configuration: {field}: {reason}")]
    Config {
        /// 정책 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 분석 엔진 생성 실패
    #[error(transparent)]
    EngineInit(#[from] EngineInitError),

    /// 분석 단계의 치명적 에러로 즉시 중단
    #[error("fatal exception(s) analyzing dependencies: {0}")]
    Analysis(ExceptionCollection),

    /// 실행 종료 시 집계된 에러
    #[error("one or more exceptions occurred during dependency-check analysis: {0}")]
    Aggregate(ExceptionCollection),

    /// CVSS 임계값 이상의 취약점 발견
    #[error(
        "dependency-analyze failed: dependencies with a CVSS score at or above {threshold:.1} were found: {vulnerabilities}"
    )]
    ThresholdViolation {
        /// 설정된 임계값
        threshold: f64,
        /// 쉼표로 연결된 취약점 이름
        vulnerabilities: String,
    },
}

impl DependencyCheckError {
    /// 정책 검증 에러를 생성합니다.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<DependencyCheckError> for CvegateError {
    fn from(err: DependencyCheckError) -> Self {
        match err {
            DependencyCheckError::Config { field, reason } => {
                CvegateError::Config(ConfigError::InvalidValue { field, reason })
            }
            DependencyCheckError::EngineInit(e) => {
                CvegateError::Engine(EngineError::InitFailed(e.to_string()))
            }
            DependencyCheckError::Analysis(c) | DependencyCheckError::Aggregate(c) => {
                CvegateError::Engine(EngineError::Aborted(c.to_string()))
            }
            err @ DependencyCheckError::ThresholdViolation { .. } => {
                CvegateError::Engine(EngineError::ThresholdViolation(err.to_string()))
            }
        }
    }
}
