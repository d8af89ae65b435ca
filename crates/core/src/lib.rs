//! cvegate 공통 기반 크레이트
//!
//! 정책 설정, 에러 타입, 도메인 타입, 메트릭 이름을 제공합니다.
//! 분석 오케스트레이션은 `cvegate-dependency-check` 크레이트가 담당합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, CvegateError, EngineError};

// 설정
pub use config::{FailureConfig, PolicyConfig, ScanConfig};

// 도메인 타입
pub use types::{
    Confidence, Dependency, Evidence, Identifier, ReportFormat, Severity, Vulnerability,
};
