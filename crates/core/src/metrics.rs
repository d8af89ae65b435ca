//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 레코더가 설치되지 않은 경우 `metrics` 매크로는 아무 동작도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `cvegate_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 실행 결과 레이블 키 (completed, completed_with_warnings, aborted)
pub const LABEL_OUTCOME: &str = "outcome";

/// 심각도 레이블 키 (none, low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

// ─── 의존성 검사 메트릭 ─────────────────────────────────────────────

/// 완료된 실행 수 (counter, label: outcome)
pub const RUNS_TOTAL: &str = "cvegate_runs_total";

/// 분석된 의존성 수 (counter)
pub const DEPENDENCIES_ANALYZED_TOTAL: &str = "cvegate_dependencies_analyzed_total";

/// 발견된 취약점 수 (counter, label: severity)
pub const VULNERABILITIES_FOUND_TOTAL: &str = "cvegate_vulnerabilities_found_total";

/// CVSS 게이트 위반 수 (counter)
pub const THRESHOLD_VIOLATIONS_TOTAL: &str = "cvegate_threshold_violations_total";

/// 실행 소요 시간 (histogram, 초)
pub const RUN_DURATION_SECONDS: &str = "cvegate_run_duration_seconds";

/// 실행 소요 시간 히스토그램 버킷 (초)
///
/// 분석은 네트워크/데이터 저장소 I/O를 포함하므로 범위가 넓습니다.
pub const RUN_DURATION_BUCKETS: [f64; 9] = [0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 900.0];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(RUNS_TOTAL, "Dependency check runs by outcome");
    describe_counter!(
        DEPENDENCIES_ANALYZED_TOTAL,
        "Dependencies handed to the analysis engine"
    );
    describe_counter!(
        VULNERABILITIES_FOUND_TOTAL,
        "Vulnerabilities reported by the analysis engine, by severity"
    );
    describe_counter!(
        THRESHOLD_VIOLATIONS_TOTAL,
        "Runs failed by the CVSS severity gate"
    );
    describe_histogram!(RUN_DURATION_SECONDS, "End-to-end run duration in seconds");
}
