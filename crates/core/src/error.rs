//! 에러 타입 -- 도메인별 에러 정의

/// cvegate 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CvegateError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 분석 엔진 및 실행 정책 에러
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 분석 엔진 및 실행 정책 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 엔진 생성 실패
    #[error("engine init failed: {0}")]
    InitFailed(String),

    /// 분석 단계에서 수집된 에러로 인한 중단
    #[error("analysis aborted: {0}")]
    Aborted(String),

    /// CVSS 임계값 초과
    #[error("cvss threshold violated: {0}")]
    ThresholdViolation(String),
}
