//! 설정 변환 -- 선언적 정책을 분석 엔진용 타입 설정 저장소로 변환
//!
//! [`translate`]는 정책의 교차 필드 제약을 검증한 뒤 [`SettingsStore`]를 만듭니다.
//! 선택 항목은 정책에 명시된 경우에만 기록되며, 빈 값이나 0 같은 대체값은
//! 절대 기록하지 않습니다. 기록되지 않은 키는 엔진 자체 기본값을 따릅니다.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use cvegate_core::config::PolicyConfig;

use crate::error::DependencyCheckError;

/// 엔진 설정 키
pub mod keys {
    pub const AUTO_UPDATE: &str = "odc.autoupdate";
    pub const SUPPRESSION_FILE: &str = "suppression.file";
    pub const HINTS_FILE: &str = "hints.file";
    pub const CVE_CHECK_VALID_FOR_HOURS: &str = "cve.check.validforhours";

    pub const PROXY_SERVER: &str = "proxy.server";
    pub const PROXY_PORT: &str = "proxy.port";
    pub const PROXY_USERNAME: &str = "proxy.username";
    pub const PROXY_PASSWORD: &str = "proxy.password";
    pub const PROXY_NON_PROXY_HOSTS: &str = "proxy.nonproxyhosts";

    pub const DATA_DIRECTORY: &str = "data.directory";
    pub const DB_DRIVER_NAME: &str = "data.driver_name";
    pub const DB_DRIVER_PATH: &str = "data.driver_path";
    pub const DB_CONNECTION_STRING: &str = "data.connection_string";
    pub const DB_USER: &str = "data.user";
    pub const DB_PASSWORD: &str = "data.password";

    pub const CVE_MODIFIED_12_URL: &str = "cve.url-1.2.modified";
    pub const CVE_BASE_12_URL: &str = "cve.url-1.2.base";
    pub const CVE_MODIFIED_20_URL: &str = "cve.url-2.0.modified";
    pub const CVE_BASE_20_URL: &str = "cve.url-2.0.base";
    pub const DOWNLOADER_QUICK_QUERY_TIMESTAMP: &str = "downloader.quick.query.timestamp";

    pub const ANALYZER_EXPERIMENTAL_ENABLED: &str = "analyzer.experimental.enabled";
    pub const ANALYZER_ARCHIVE_ENABLED: &str = "analyzer.archive.enabled";
    pub const ADDITIONAL_ZIP_EXTENSIONS: &str = "extensions.zip";
    pub const ANALYZER_ASSEMBLY_ENABLED: &str = "analyzer.assembly.enabled";
    pub const ANALYZER_ASSEMBLY_MONO_PATH: &str = "analyzer.assembly.mono.path";
    pub const ANALYZER_COCOAPODS_ENABLED: &str = "analyzer.cocoapods.enabled";
    pub const ANALYZER_SWIFT_PACKAGE_MANAGER_ENABLED: &str =
        "analyzer.swift.package.manager.enabled";
    pub const ANALYZER_BUNDLE_AUDIT_ENABLED: &str = "analyzer.bundle.audit.enabled";
    pub const ANALYZER_BUNDLE_AUDIT_PATH: &str = "analyzer.bundle.audit.path";
    pub const ANALYZER_PYTHON_DISTRIBUTION_ENABLED: &str = "analyzer.python.distribution.enabled";
    pub const ANALYZER_PYTHON_PACKAGE_ENABLED: &str = "analyzer.python.package.enabled";
    pub const ANALYZER_RUBY_GEMSPEC_ENABLED: &str = "analyzer.ruby.gemspec.enabled";
    pub const ANALYZER_OPENSSL_ENABLED: &str = "analyzer.openssl.enabled";
    pub const ANALYZER_CMAKE_ENABLED: &str = "analyzer.cmake.enabled";
    pub const ANALYZER_AUTOCONF_ENABLED: &str = "analyzer.autoconf.enabled";
    pub const ANALYZER_COMPOSER_LOCK_ENABLED: &str = "analyzer.composer.lock.enabled";
    pub const ANALYZER_NODE_PACKAGE_ENABLED: &str = "analyzer.node.package.enabled";
    pub const ANALYZER_NSP_PACKAGE_ENABLED: &str = "analyzer.nsp.package.enabled";
    pub const ANALYZER_NUSPEC_ENABLED: &str = "analyzer.nuspec.enabled";
    pub const ANALYZER_JAR_ENABLED: &str = "analyzer.jar.enabled";
    pub const ANALYZER_CENTRAL_ENABLED: &str = "analyzer.central.enabled";
    pub const ANALYZER_NEXUS_ENABLED: &str = "analyzer.nexus.enabled";
    pub const ANALYZER_NEXUS_URL: &str = "analyzer.nexus.url";
    pub const ANALYZER_NEXUS_USES_PROXY: &str = "analyzer.nexus.proxy";
}

/// 타입이 있는 설정 값
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    String(String),
    StringArray(Vec<String>),
    Int(i64),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => write!(f, "{s}"),
            Self::StringArray(items) => write!(f, "[{}]", items.join(", ")),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

/// 분석 엔진이 소비하는 설정 저장소
///
/// 한 번의 실행 동안 오케스트레이터가 독점 소유하며, 정리 단계에서 해제됩니다.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SettingsStore {
    values: BTreeMap<&'static str, SettingValue>,
    released: bool,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&mut self, key: &'static str, value: bool) {
        self.values.insert(key, SettingValue::Bool(value));
    }

    pub fn set_string(&mut self, key: &'static str, value: impl Into<String>) {
        self.values.insert(key, SettingValue::String(value.into()));
    }

    pub fn set_string_array(&mut self, key: &'static str, value: Vec<String>) {
        self.values.insert(key, SettingValue::StringArray(value));
    }

    pub fn set_int(&mut self, key: &'static str, value: i64) {
        self.values.insert(key, SettingValue::Int(value));
    }

    /// 값이 `Some`일 때만 기록합니다.
    pub fn set_bool_if_some(&mut self, key: &'static str, value: Option<bool>) {
        if let Some(v) = value {
            self.set_bool(key, v);
        }
    }

    /// 값이 `Some`이고 비어 있지 않을 때만 기록합니다.
    pub fn set_string_if_present(&mut self, key: &'static str, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.set_string(key, v);
        }
    }

    /// 목록이 비어 있지 않을 때만 기록합니다.
    pub fn set_string_array_if_present(&mut self, key: &'static str, value: &[String]) {
        if !value.is_empty() {
            self.set_string_array(key, value.to_vec());
        }
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(SettingValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(SettingValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_string_array(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key) {
            Some(SettingValue::StringArray(items)) => Some(items),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(SettingValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 저장된 모든 값을 해제합니다. 여러 번 호출해도 안전합니다.
    pub fn release(&mut self) {
        if !self.released {
            debug!(entries = self.values.len(), "releasing settings store");
        }
        self.values.clear();
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

/// 정책을 엔진 설정 저장소로 변환합니다.
///
/// # Errors
///
/// - `scan_configurations`와 `skip_configurations`가 모두 비어 있지 않은 경우
/// - `cve_valid_for_hours`가 음수인 경우
pub fn translate(policy: &PolicyConfig) -> Result<SettingsStore, DependencyCheckError> {
    if !policy.scan.scan_configurations.is_empty() && !policy.scan.skip_configurations.is_empty() {
        return Err(DependencyCheckError::config(
            "scan_configurations",
            "you can only specify one of skip_configurations or scan_configurations",
        ));
    }

    let engine = &policy.engine;
    if let Some(hours) = engine.cve_valid_for_hours
        && hours < 0
    {
        return Err(DependencyCheckError::config(
            "cve_valid_for_hours",
            format!("invalid setting: cve_valid_for_hours must be a number greater than or equal to 0, got {hours}"),
        ));
    }

    let mut store = SettingsStore::new();

    store.set_bool_if_some(keys::AUTO_UPDATE, engine.auto_update);
    store.set_string_array_if_present(
        keys::SUPPRESSION_FILE,
        &merge_suppression_files(
            &engine.suppression_files,
            engine.suppression_file.as_deref(),
        ),
    );
    store.set_string_if_present(keys::HINTS_FILE, engine.hints_file.as_deref());
    if let Some(hours) = engine.cve_valid_for_hours {
        store.set_int(keys::CVE_CHECK_VALID_FOR_HOURS, hours);
    }

    // 프록시
    let proxy = &engine.proxy;
    store.set_string_if_present(keys::PROXY_SERVER, proxy.server.as_deref());
    if let Some(port) = proxy.port {
        store.set_string(keys::PROXY_PORT, port.to_string());
    }
    store.set_string_if_present(keys::PROXY_USERNAME, proxy.username.as_deref());
    store.set_string_if_present(keys::PROXY_PASSWORD, proxy.password.as_deref());
    store.set_string_array_if_present(keys::PROXY_NON_PROXY_HOSTS, &proxy.non_proxy_hosts);

    // 데이터 저장소
    let data = &engine.data;
    store.set_string_if_present(keys::DATA_DIRECTORY, data.directory.as_deref());
    store.set_string_if_present(keys::DB_DRIVER_NAME, data.driver.as_deref());
    store.set_string_if_present(keys::DB_DRIVER_PATH, data.driver_path.as_deref());
    store.set_string_if_present(
        keys::DB_CONNECTION_STRING,
        data.connection_string.as_deref(),
    );
    store.set_string_if_present(keys::DB_USER, data.username.as_deref());
    store.set_string_if_present(keys::DB_PASSWORD, data.password.as_deref());

    // CVE 피드
    let cve = &engine.cve;
    store.set_string_if_present(keys::CVE_MODIFIED_12_URL, cve.url12_modified.as_deref());
    store.set_string_if_present(keys::CVE_BASE_12_URL, cve.url12_base.as_deref());
    store.set_string_if_present(keys::CVE_MODIFIED_20_URL, cve.url20_modified.as_deref());
    store.set_string_if_present(keys::CVE_BASE_20_URL, cve.url20_base.as_deref());
    store.set_bool_if_some(
        keys::DOWNLOADER_QUICK_QUERY_TIMESTAMP,
        cve.quick_query_timestamp,
    );

    // 분석기
    let analyzers = &policy.analyzers;
    store.set_bool_if_some(
        keys::ANALYZER_EXPERIMENTAL_ENABLED,
        analyzers.experimental_enabled,
    );
    store.set_bool_if_some(keys::ANALYZER_ARCHIVE_ENABLED, analyzers.archive_enabled);
    store.set_string_if_present(
        keys::ADDITIONAL_ZIP_EXTENSIONS,
        analyzers.zip_extensions.as_deref(),
    );
    store.set_bool_if_some(keys::ANALYZER_ASSEMBLY_ENABLED, analyzers.assembly_enabled);
    store.set_string_if_present(
        keys::ANALYZER_ASSEMBLY_MONO_PATH,
        analyzers.path_to_mono.as_deref(),
    );
    store.set_bool_if_some(keys::ANALYZER_COCOAPODS_ENABLED, analyzers.cocoapods_enabled);
    store.set_bool_if_some(
        keys::ANALYZER_SWIFT_PACKAGE_MANAGER_ENABLED,
        analyzers.swift_enabled,
    );
    store.set_bool_if_some(
        keys::ANALYZER_BUNDLE_AUDIT_ENABLED,
        analyzers.bundle_audit_enabled,
    );
    store.set_string_if_present(
        keys::ANALYZER_BUNDLE_AUDIT_PATH,
        analyzers.path_to_bundle_audit.as_deref(),
    );
    store.set_bool_if_some(
        keys::ANALYZER_PYTHON_DISTRIBUTION_ENABLED,
        analyzers.python_distribution_enabled,
    );
    store.set_bool_if_some(
        keys::ANALYZER_PYTHON_PACKAGE_ENABLED,
        analyzers.python_package_enabled,
    );
    store.set_bool_if_some(
        keys::ANALYZER_RUBY_GEMSPEC_ENABLED,
        analyzers.ruby_gemspec_enabled,
    );
    store.set_bool_if_some(keys::ANALYZER_OPENSSL_ENABLED, analyzers.openssl_enabled);
    store.set_bool_if_some(keys::ANALYZER_CMAKE_ENABLED, analyzers.cmake_enabled);
    store.set_bool_if_some(keys::ANALYZER_AUTOCONF_ENABLED, analyzers.autoconf_enabled);
    store.set_bool_if_some(
        keys::ANALYZER_COMPOSER_LOCK_ENABLED,
        analyzers.composer_enabled,
    );
    store.set_bool_if_some(keys::ANALYZER_NODE_PACKAGE_ENABLED, analyzers.node_enabled);
    store.set_bool_if_some(keys::ANALYZER_NSP_PACKAGE_ENABLED, analyzers.nsp_enabled);
    store.set_bool_if_some(keys::ANALYZER_NUSPEC_ENABLED, analyzers.nuspec_enabled);
    store.set_bool_if_some(keys::ANALYZER_JAR_ENABLED, analyzers.jar_enabled);
    store.set_bool_if_some(keys::ANALYZER_CENTRAL_ENABLED, analyzers.central_enabled);
    store.set_bool_if_some(keys::ANALYZER_NEXUS_ENABLED, analyzers.nexus.enabled);
    store.set_string_if_present(keys::ANALYZER_NEXUS_URL, analyzers.nexus.url.as_deref());
    store.set_bool_if_some(keys::ANALYZER_NEXUS_USES_PROXY, analyzers.nexus.uses_proxy);

    debug!(entries = store.len(), "translated policy into engine settings");

    Ok(store)
}

/// 단일 suppression 파일을 목록 끝에 병합합니다.
///
/// 목록의 기존 순서를 유지하며, 단일 값이 없거나 비어 있으면 목록을 그대로 반환합니다.
pub fn merge_suppression_files(files: &[String], single: Option<&str>) -> Vec<String> {
    let mut merged = files.to_vec();
    if let Some(file) = single.filter(|f| !f.is_empty()) {
        merged.push(file.to_owned());
    }
    merged
}
