//! 설정 관리 -- cvegate.toml 파싱 및 런타임 정책
//!
//! [`PolicyConfig`]는 한 번의 의존성 검사 실행에 필요한 모든 정책을 담는
//! 최상위 구조체입니다. 로드 이후에는 변경되지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CVEGATE_ENGINE_PROXY_SERVER=proxy.local` 형식)
//! 3. 설정 파일 (`cvegate.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 명시적 값 규칙
//!
//! 엔진으로 전달되는 선택 항목은 `Option<T>` 또는 빈 컬렉션 기본값을 사용합니다.
//! 값이 없으면 엔진 자체의 기본값이 적용됩니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), cvegate_core::error::CvegateError> {
//! use cvegate_core::config::PolicyConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PolicyConfig::load("cvegate.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PolicyConfig::parse("[failure]\nfail_build_on_cvss = 7.0")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, CvegateError};
use crate::types::ReportFormat;

/// CVSS 점수 상한. 이 값을 초과하는 임계값은 게이트 비활성화를 의미합니다.
pub const MAX_CVSS_SCORE: f64 = 10.0;

/// 기본 분석 대상 아티팩트 확장자
pub const DEFAULT_ANALYZED_TYPES: &[&str] = &[
    "jar", "aar", "js", "war", "ear", "sar", "apk", "nupkg", "exe", "zip", "tar.gz", "egg",
    "tar", "whl",
];

/// cvegate 통합 정책 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스캔 범위 설정
    #[serde(default)]
    pub scan: ScanConfig,
    /// 실패 정책
    #[serde(default)]
    pub failure: FailureConfig,
    /// 리포트 설정
    #[serde(default)]
    pub report: ReportConfig,
    /// 분석 엔진 전달 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 분석기 활성화 플래그
    #[serde(default)]
    pub analyzers: AnalyzersConfig,
}

impl PolicyConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CvegateError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CvegateError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CvegateError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CvegateError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CvegateError> {
        toml::from_str(toml_str).map_err(|e| {
            CvegateError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CVEGATE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CVEGATE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CVEGATE_GENERAL_LOG_FORMAT");

        // Scan
        override_csv(
            &mut self.scan.scan_configurations,
            "CVEGATE_SCAN_CONFIGURATIONS",
        );
        override_csv(
            &mut self.scan.skip_configurations,
            "CVEGATE_SCAN_SKIP_CONFIGURATIONS",
        );
        override_bool(
            &mut self.scan.skip_test_groups,
            "CVEGATE_SCAN_SKIP_TEST_GROUPS",
        );
        override_csv(&mut self.scan.scan_projects, "CVEGATE_SCAN_PROJECTS");
        override_csv(&mut self.scan.skip_projects, "CVEGATE_SCAN_SKIP_PROJECTS");

        // Failure
        override_bool(
            &mut self.failure.fail_on_error,
            "CVEGATE_FAILURE_FAIL_ON_ERROR",
        );
        override_f64(
            &mut self.failure.fail_build_on_cvss,
            "CVEGATE_FAILURE_FAIL_BUILD_ON_CVSS",
        );
        override_bool(
            &mut self.failure.show_summary,
            "CVEGATE_FAILURE_SHOW_SUMMARY",
        );

        // Report
        override_string(
            &mut self.report.output_directory,
            "CVEGATE_REPORT_OUTPUT_DIRECTORY",
        );
        override_csv(&mut self.report.formats, "CVEGATE_REPORT_FORMATS");

        // Engine
        override_opt_bool(&mut self.engine.auto_update, "CVEGATE_ENGINE_AUTO_UPDATE");
        override_opt_i64(
            &mut self.engine.cve_valid_for_hours,
            "CVEGATE_ENGINE_CVE_VALID_FOR_HOURS",
        );
        override_opt_string(&mut self.engine.proxy.server, "CVEGATE_ENGINE_PROXY_SERVER");
        override_opt_u16(&mut self.engine.proxy.port, "CVEGATE_ENGINE_PROXY_PORT");
        override_opt_string(
            &mut self.engine.proxy.username,
            "CVEGATE_ENGINE_PROXY_USERNAME",
        );
        override_opt_string(
            &mut self.engine.proxy.password,
            "CVEGATE_ENGINE_PROXY_PASSWORD",
        );
        override_opt_string(
            &mut self.engine.data.directory,
            "CVEGATE_ENGINE_DATA_DIRECTORY",
        );
        override_opt_string(
            &mut self.engine.data.connection_string,
            "CVEGATE_ENGINE_DATA_CONNECTION_STRING",
        );
        override_opt_string(
            &mut self.engine.data.username,
            "CVEGATE_ENGINE_DATA_USERNAME",
        );
        override_opt_string(
            &mut self.engine.data.password,
            "CVEGATE_ENGINE_DATA_PASSWORD",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CvegateError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !self.scan.scan_configurations.is_empty() && !self.scan.skip_configurations.is_empty()
        {
            return Err(invalid(
                "scan.scan_configurations",
                "scan_configurations and skip_configurations are mutually exclusive".to_owned(),
            ));
        }

        if !self.scan.scan_projects.is_empty() && !self.scan.skip_projects.is_empty() {
            return Err(invalid(
                "scan.scan_projects",
                "scan_projects and skip_projects are mutually exclusive".to_owned(),
            ));
        }

        if let Some(hours) = self.engine.cve_valid_for_hours
            && hours < 0
        {
            return Err(invalid(
                "engine.cve_valid_for_hours",
                format!("must be >= 0, got {hours}"),
            ));
        }

        // NaN은 비교가 항상 false이므로 명시적으로 거부
        if self.failure.fail_build_on_cvss.is_nan() || self.failure.fail_build_on_cvss < 0.0 {
            return Err(invalid(
                "failure.fail_build_on_cvss",
                "must be a number >= 0 (values above 10 disable the gate)".to_owned(),
            ));
        }

        if self.report.output_directory.is_empty() {
            return Err(invalid(
                "report.output_directory",
                "output directory must not be empty".to_owned(),
            ));
        }

        if self.report.formats.is_empty() {
            return Err(invalid(
                "report.formats",
                "at least one report format required".to_owned(),
            ));
        }

        for format in &self.report.formats {
            if ReportFormat::from_str_loose(format).is_none() {
                return Err(invalid(
                    "report.formats",
                    format!(
                        "unknown format '{format}' (expected: HTML, XML, CSV, JSON, JUNIT, SARIF, ALL)"
                    ),
                ));
            }
        }

        Ok(())
    }

    /// 검증된 리포트 형식 목록을 반환합니다. 알 수 없는 형식은 건너뜁니다.
    pub fn report_formats(&self) -> Vec<ReportFormat> {
        self.report
            .formats
            .iter()
            .filter_map(|f| ReportFormat::from_str_loose(f))
            .collect()
    }
}

fn invalid(field: &str, reason: String) -> CvegateError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 스캔 범위 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 스캔할 그룹 허용 목록 (비어 있으면 전체)
    pub scan_configurations: Vec<String>,
    /// 제외할 그룹 목록
    pub skip_configurations: Vec<String>,
    /// 테스트 그룹 제외 여부
    pub skip_test_groups: bool,
    /// 스캔할 프로젝트 경로 허용 목록 (비어 있으면 전체)
    pub scan_projects: Vec<String>,
    /// 제외할 프로젝트 경로 목록
    pub skip_projects: Vec<String>,
    /// 분석 대상 아티팩트 확장자
    pub analyzed_types: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_configurations: Vec::new(),
            skip_configurations: Vec::new(),
            skip_test_groups: true,
            scan_projects: Vec::new(),
            skip_projects: Vec::new(),
            analyzed_types: DEFAULT_ANALYZED_TYPES
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
        }
    }
}

/// 실패 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    /// 도구 에러 시 실행 실패 처리 여부
    pub fail_on_error: bool,
    /// 이 점수 이상의 취약점이 있으면 실패 (10 초과 시 비활성화)
    pub fail_build_on_cvss: f64,
    /// 취약점 요약 출력 여부
    pub show_summary: bool,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            fail_on_error: true,
            fail_build_on_cvss: 11.0,
            show_summary: true,
        }
    }
}

impl FailureConfig {
    /// CVSS 게이트 활성화 여부
    pub fn cvss_gate_enabled(&self) -> bool {
        self.fail_build_on_cvss <= MAX_CVSS_SCORE
    }
}

/// 리포트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 리포트 출력 디렉토리
    pub output_directory: String,
    /// 리포트 형식 목록
    pub formats: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_directory: "build/reports".to_owned(),
            formats: vec!["JSON".to_owned()],
        }
    }
}

/// 분석 엔진 전달 설정
///
/// 모든 항목은 명시된 경우에만 엔진 설정 저장소에 기록됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 취약점 데이터 자동 업데이트
    pub auto_update: Option<bool>,
    /// 단일 suppression 파일
    pub suppression_file: Option<String>,
    /// suppression 파일 목록
    pub suppression_files: Vec<String>,
    /// hints 파일
    pub hints_file: Option<String>,
    /// CVE 데이터 유효 시간 (시간 단위, 0 이상)
    pub cve_valid_for_hours: Option<i64>,
    /// 프록시 설정
    pub proxy: ProxyConfig,
    /// 데이터 저장소 설정
    pub data: DataConfig,
    /// CVE 피드 설정
    pub cve: CveConfig,
}

/// 프록시 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub non_proxy_hosts: Vec<String>,
}

/// 데이터 저장소 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub directory: Option<String>,
    pub driver: Option<String>,
    pub driver_path: Option<String>,
    pub connection_string: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// CVE 피드 설정 (스키마 1.2 / 2.0)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CveConfig {
    pub url12_modified: Option<String>,
    pub url12_base: Option<String>,
    pub url20_modified: Option<String>,
    pub url20_base: Option<String>,
    /// 업데이트 시 빠른 타임스탬프 조회 사용
    pub quick_query_timestamp: Option<bool>,
}

/// 분석기 활성화 플래그 및 보조 경로
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzersConfig {
    pub experimental_enabled: Option<bool>,
    pub archive_enabled: Option<bool>,
    /// archive 분석기가 추가로 처리할 확장자 (쉼표 구분)
    pub zip_extensions: Option<String>,
    pub assembly_enabled: Option<bool>,
    pub path_to_mono: Option<String>,
    pub cocoapods_enabled: Option<bool>,
    pub swift_enabled: Option<bool>,
    pub bundle_audit_enabled: Option<bool>,
    pub path_to_bundle_audit: Option<String>,
    pub python_distribution_enabled: Option<bool>,
    pub python_package_enabled: Option<bool>,
    pub ruby_gemspec_enabled: Option<bool>,
    pub openssl_enabled: Option<bool>,
    pub cmake_enabled: Option<bool>,
    pub autoconf_enabled: Option<bool>,
    pub composer_enabled: Option<bool>,
    pub node_enabled: Option<bool>,
    pub nsp_enabled: Option<bool>,
    pub nuspec_enabled: Option<bool>,
    pub jar_enabled: Option<bool>,
    pub central_enabled: Option<bool>,
    pub nexus: NexusConfig,
}

/// Nexus 분석기 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NexusConfig {
    pub enabled: Option<bool>,
    pub url: Option<String>,
    pub uses_proxy: Option<bool>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = Some(val);
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Some(parsed) = parse_env::<bool>(env_key) {
        *target = parsed;
    }
}

fn override_opt_bool(target: &mut Option<bool>, env_key: &str) {
    if let Some(parsed) = parse_env::<bool>(env_key) {
        *target = Some(parsed);
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Some(parsed) = parse_env::<f64>(env_key) {
        *target = parsed;
    }
}

fn override_opt_i64(target: &mut Option<i64>, env_key: &str) {
    if let Some(parsed) = parse_env::<i64>(env_key) {
        *target = Some(parsed);
    }
}

fn override_opt_u16(target: &mut Option<u16>, env_key: &str) {
    if let Some(parsed) = parse_env::<u16>(env_key) {
        *target = Some(parsed);
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

/// 환경변수를 파싱합니다. 파싱 실패 시 경고 후 `None`을 반환합니다.
fn parse_env<T: std::str::FromStr>(env_key: &str) -> Option<T> {
    let val = std::env::var(env_key).ok()?;
    match val.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(
                env_key,
                value = val.as_str(),
                expected = std::any::type_name::<T>(),
                "failed to parse env var, ignoring"
            );
            None
        }
    }
}
