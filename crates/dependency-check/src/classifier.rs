//! 그룹 분류 -- 테스트 그룹 판별 및 스캔 대상 결정
//!
//! 판별 규칙:
//!
//! - 테스트 그룹: 이름이 `test` 또는 `androidTest`로 시작하거나,
//!   조상 계층 전체 중 하나라도 `testCompile` / `androidTestCompile`인 경우
//! - 스캔 대상: 제외 목록에 없고, 테스트 그룹 제외 정책에 걸리지 않으며,
//!   허용 목록이 비어 있거나 허용 목록에 포함된 경우
//!
//! 해석 가능 여부(resolvability)는 여기서 검사하지 않습니다. 호출자가 먼저 걸러냅니다.

use std::collections::BTreeSet;

use cvegate_core::config::ScanConfig;

use crate::graph::ConfigurationGroup;

const TEST_NAME_PREFIXES: [&str; 2] = ["test", "androidTest"];
const TEST_ANCESTORS: [&str; 2] = ["testCompile", "androidTestCompile"];

/// 그룹 스캔 범위 정책
#[derive(Debug, Clone, Default)]
pub struct ScanScope {
    scan_configurations: BTreeSet<String>,
    skip_configurations: BTreeSet<String>,
    skip_test_groups: bool,
}

impl ScanScope {
    pub fn new(
        scan_configurations: impl IntoIterator<Item = String>,
        skip_configurations: impl IntoIterator<Item = String>,
        skip_test_groups: bool,
    ) -> Self {
        Self {
            scan_configurations: scan_configurations.into_iter().collect(),
            skip_configurations: skip_configurations.into_iter().collect(),
            skip_test_groups,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.scan_configurations.iter().cloned(),
            config.skip_configurations.iter().cloned(),
            config.skip_test_groups,
        )
    }
}

/// 그룹이 테스트 그룹인지 판별합니다.
pub fn is_test_group(group: &ConfigurationGroup) -> bool {
    let named_as_test = TEST_NAME_PREFIXES
        .iter()
        .any(|prefix| group.name.starts_with(prefix));

    named_as_test
        || group
            .hierarchy
            .iter()
            .any(|ancestor| TEST_ANCESTORS.contains(&ancestor.as_str()))
}

/// 그룹을 스캔해야 하는지 판별합니다.
pub fn should_scan(group: &ConfigurationGroup, scope: &ScanScope) -> bool {
    let skip = scope.skip_configurations.contains(&group.name)
        || (scope.skip_test_groups && is_test_group(group));

    !skip && (scope.scan_configurations.is_empty() || scope.scan_configurations.contains(&group.name))
}

/// 프로젝트 경로 필터
///
/// 그룹 범위와 같은 허용/제외 규칙을 프로젝트 경로에 적용합니다.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    scan_projects: BTreeSet<String>,
    skip_projects: BTreeSet<String>,
}

impl ProjectFilter {
    pub fn new(
        scan_projects: impl IntoIterator<Item = String>,
        skip_projects: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            scan_projects: scan_projects.into_iter().collect(),
            skip_projects: skip_projects.into_iter().collect(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.scan_projects.iter().cloned(),
            config.skip_projects.iter().cloned(),
        )
    }

    pub fn should_scan_project(&self, path: &str) -> bool {
        !self.skip_projects.contains(path)
            && (self.scan_projects.is_empty() || self.scan_projects.contains(path))
    }
}
