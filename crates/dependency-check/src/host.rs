//! 호스트 capability -- 빌드 시스템 버전별 기능 차이를 한 번에 결정
//!
//! 그룹의 해석 가능 여부(resolvability)는 호스트 `3.3.0`부터 제공됩니다.
//! 그 이전 호스트는 모든 그룹을 해석 가능한 것으로 취급합니다.
//! capability는 실행 시작 시 한 번 결정되고 이후 버전 비교는 하지 않습니다.

use std::fmt;

use tracing::{debug, warn};

use crate::graph::ConfigurationGroup;

/// resolvability를 노출하는 최소 호스트 버전
pub const RESOLVABLE_SINCE: semver::Version = semver::Version::new(3, 3, 0);

/// 호스트 빌드 시스템 버전
///
/// `"7.6"`처럼 패치 버전이 없는 문자열도 허용합니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HostVersion(semver::Version);

impl HostVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    /// 버전 문자열을 파싱합니다. 누락된 minor/patch는 0으로 채웁니다.
    pub fn parse(raw: &str) -> Result<Self, semver::Error> {
        let trimmed = raw.trim();
        let (core, suffix) = match trimmed.find(['-', '+']) {
            Some(idx) => trimmed.split_at(idx),
            None => (trimmed, ""),
        };

        let padded = match core.split('.').count() {
            1 => format!("{core}.0.0{suffix}"),
            2 => format!("{core}.0{suffix}"),
            _ => trimmed.to_owned(),
        };

        semver::Version::parse(&padded).map(Self)
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 버전별 호스트 기능
pub trait HostCapabilities: Send + Sync {
    /// capability 구현 이름 (로그용)
    fn api_name(&self) -> &'static str;

    /// 그룹을 해석할 수 있는지 반환합니다.
    fn can_be_resolved(&self, group: &ConfigurationGroup) -> bool;
}

/// resolvability를 노출하는 호스트
#[derive(Debug, Clone, Copy, Default)]
pub struct ModernHost;

impl HostCapabilities for ModernHost {
    fn api_name(&self) -> &'static str {
        "resolvable-groups"
    }

    fn can_be_resolved(&self, group: &ConfigurationGroup) -> bool {
        group.resolvable
    }
}

/// resolvability를 노출하지 않는 구형 호스트
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyHost;

impl HostCapabilities for LegacyHost {
    fn api_name(&self) -> &'static str {
        "legacy"
    }

    fn can_be_resolved(&self, _group: &ConfigurationGroup) -> bool {
        true
    }
}

/// 호스트 버전에 맞는 capability를 선택합니다.
pub fn resolve_capabilities(version: &HostVersion) -> Box<dyn HostCapabilities> {
    let capabilities: Box<dyn HostCapabilities> = if version.0 >= RESOLVABLE_SINCE {
        Box::new(ModernHost)
    } else {
        Box::new(LegacyHost)
    };

    debug!(
        host_version = %version,
        api = capabilities.api_name(),
        "resolved host capabilities"
    );
    capabilities
}

/// 버전 문자열에서 capability를 선택합니다.
///
/// 파싱할 수 없는 버전은 경고 후 구형 호스트로 취급합니다.
pub fn resolve_capabilities_from_str(raw: &str) -> Box<dyn HostCapabilities> {
    match HostVersion::parse(raw) {
        Ok(version) => resolve_capabilities(&version),
        Err(e) => {
            warn!(
                host_version = raw,
                error = %e,
                "unrecognised host version, assuming legacy host"
            );
            Box::new(LegacyHost)
        }
    }
}
