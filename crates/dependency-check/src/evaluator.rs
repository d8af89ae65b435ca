//! 결과 평가 -- 취약점 요약과 CVSS 임계값 게이트
//!
//! 텍스트는 모두 순수 함수가 `Vec<String>`으로 만들고 호출 지점에서 한 번만 결합합니다.

use tracing::{error, info};

use cvegate_core::config::MAX_CVSS_SCORE;
use cvegate_core::types::Dependency;

use crate::error::DependencyCheckError;

/// 취약점 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// 전체 취약점 수
    pub total_vulnerabilities: usize,
    /// 취약한 의존성별 요약 줄 (`show_summary`가 꺼져 있으면 비어 있음)
    pub lines: Vec<String>,
}

impl Summary {
    /// 요약 줄을 하나의 블록으로 결합합니다. 줄이 없으면 `None`입니다.
    pub fn block(&self) -> Option<String> {
        if self.lines.is_empty() {
            None
        } else {
            Some(self.lines.join("\n"))
        }
    }
}

/// 취약점 요약을 계산하고, `show_summary`이면 요약 블록을 로그로 남깁니다.
pub fn summarize(dependencies: &[Dependency], show_summary: bool) -> Summary {
    let total_vulnerabilities = dependencies.iter().map(|d| d.vulnerabilities.len()).sum();
    info!(
        vulnerabilities = total_vulnerabilities,
        "found {total_vulnerabilities} vulnerabilities in project"
    );

    let lines = if show_summary {
        summary_lines(dependencies)
    } else {
        Vec::new()
    };

    let summary = Summary {
        total_vulnerabilities,
        lines,
    };
    if let Some(block) = summary.block() {
        info!("one or more dependencies were identified with known vulnerabilities:\n{block}");
    }
    summary
}

/// 취약한 의존성마다 `"<파일> (<식별자>, …) : <취약점>, …"` 형식의 한 줄을 만듭니다.
pub fn summary_lines(dependencies: &[Dependency]) -> Vec<String> {
    dependencies
        .iter()
        .filter(|d| d.is_vulnerable())
        .map(|d| {
            let ids = d
                .identifiers
                .iter()
                .map(|i| i.value.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let vulns = d
                .vulnerabilities
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} ({ids}) : {vulns}", d.file_name)
        })
        .collect()
}

/// 점수가 `threshold` 이상인 취약점 이름을 발견 순서대로 반환합니다.
pub fn vulnerabilities_at_or_above(dependencies: &[Dependency], threshold: f64) -> Vec<String> {
    dependencies
        .iter()
        .flat_map(|d| d.vulnerabilities.iter())
        .filter(|v| v.cvss_score >= threshold)
        .map(|v| v.name.clone())
        .collect()
}

/// CVSS 게이트를 적용합니다.
///
/// `threshold`가 10을 넘으면 게이트가 꺼진 것으로 보고 아무것도 하지 않습니다.
pub fn evaluate_threshold(
    dependencies: &[Dependency],
    threshold: f64,
) -> Result<(), DependencyCheckError> {
    if threshold > MAX_CVSS_SCORE {
        return Ok(());
    }

    let offending = vulnerabilities_at_or_above(dependencies, threshold);
    if offending.is_empty() {
        return Ok(());
    }

    let err = DependencyCheckError::ThresholdViolation {
        threshold,
        vulnerabilities: offending.join(", "),
    };
    error!(threshold, count = offending.len(), "{err}");
    Err(err)
}
