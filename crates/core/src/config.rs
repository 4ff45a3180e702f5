//! 설정 관리 — converge.toml 파싱 및 런타임 설정
//!
//! [`HarnessConfig`]는 하네스 전체 설정을 담는 최상위 구조체입니다.
//! 한 번 로드한 뒤 참조로 각 구성 요소에 전달하며, 프로세스 전역 상태는 두지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CONVERGE_POLL_INTERVAL_SECS=2` 형식)
//! 3. 설정 파일 (`converge.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), converge_core::error::ConvergeError> {
//! use converge_core::config::HarnessConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = HarnessConfig::load("converge.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HarnessConfig::parse("[poll]\ninterval_secs = 2")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConvergeError};

/// 설정 상한값 상수
const MAX_INTERVAL_SECS: u64 = 3600;
const MAX_TIMEOUT_SECS: u64 = 86_400;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// converge 통합 설정
///
/// `converge.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 클러스터 접속 설정
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// 폴링 주기 및 제한 시간
    #[serde(default)]
    pub poll: PollConfig,
}

impl HarnessConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConvergeError> {
        let mut config = Self::read_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConvergeError> {
        let config = Self::read_file(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일을 읽어 파싱만 합니다. 검증은 호출자가 합니다.
    async fn read_file(path: impl AsRef<Path>) -> Result<Self, ConvergeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConvergeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ConvergeError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ConvergeError> {
        toml::from_str(toml_str).map_err(|e| {
            ConvergeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CONVERGE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CONVERGE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CONVERGE_GENERAL_LOG_FORMAT");

        // Cluster
        override_opt_string(&mut self.cluster.kubeconfig, "CONVERGE_CLUSTER_KUBECONFIG");
        override_opt_string(&mut self.cluster.context, "CONVERGE_CLUSTER_CONTEXT");
        override_opt_string(&mut self.cluster.cluster_id, "CONVERGE_CLUSTER_CLUSTER_ID");

        // Poll
        override_u64(&mut self.poll.interval_secs, "CONVERGE_POLL_INTERVAL_SECS");
        override_u64(&mut self.poll.timeout_secs, "CONVERGE_POLL_TIMEOUT_SECS");
        override_u64(
            &mut self.poll.deletion_timeout_secs,
            "CONVERGE_POLL_DELETION_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.poll.request_timeout_secs,
            "CONVERGE_POLL_REQUEST_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.poll.cluster_api_deployment_timeout_secs,
            "CONVERGE_POLL_CLUSTER_API_DEPLOYMENT_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.poll.kubeconfig_timeout_secs,
            "CONVERGE_POLL_KUBECONFIG_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.poll.nodes_ready_timeout_secs,
            "CONVERGE_POLL_NODES_READY_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.poll.machine_running_timeout_secs,
            "CONVERGE_POLL_MACHINE_RUNNING_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConvergeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.cluster.kubeconfig.as_deref() == Some("") {
            return Err(ConfigError::InvalidValue {
                field: "cluster.kubeconfig".to_owned(),
                reason: "must not be empty when set".to_owned(),
            }
            .into());
        }

        self.poll.validate()
    }
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

/// 클러스터 접속 설정
///
/// 인증 자체는 클라이언트 라이브러리에 맡기고, 어느 kubeconfig/context를
/// 쓸지만 지정합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// kubeconfig 파일 경로 (없으면 클라이언트 기본 탐색 규칙 사용)
    pub kubeconfig: Option<String>,
    /// 사용할 kubeconfig context
    pub context: Option<String>,
    /// 클러스터 ID (로그 필드로만 사용)
    pub cluster_id: Option<String>,
}

/// 폴링 주기 및 제한 시간 설정
///
/// 모든 값은 초 단위입니다. 이름이 붙은 제한 시간들은 하네스가 쓰는
/// 대기 예산 프리셋입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// 틱 간격
    pub interval_secs: u64,
    /// 일반 대기 제한 시간
    pub timeout_secs: u64,
    /// 삭제/축소 대기 제한 시간
    pub deletion_timeout_secs: u64,
    /// 원격 API 요청 한 건의 제한 시간
    pub request_timeout_secs: u64,
    /// Cluster API 배포 대기 제한 시간
    pub cluster_api_deployment_timeout_secs: u64,
    /// kubeconfig 생성 대기 제한 시간
    pub kubeconfig_timeout_secs: u64,
    /// 노드 Ready 대기 제한 시간
    pub nodes_ready_timeout_secs: u64,
    /// 머신 인스턴스 Running 대기 제한 시간
    pub machine_running_timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 60,
            deletion_timeout_secs: 60,
            request_timeout_secs: 30,
            cluster_api_deployment_timeout_secs: 600,
            kubeconfig_timeout_secs: 600,
            nodes_ready_timeout_secs: 300,
            machine_running_timeout_secs: 600,
        }
    }
}

impl PollConfig {
    /// 틱 간격을 반환합니다.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// 원격 API 요청 제한 시간을 반환합니다.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 폴링 설정의 유효성을 검증합니다.
    ///
    /// 모든 제한 시간은 틱 간격 이상이어야 합니다.
    pub fn validate(&self) -> Result<(), ConvergeError> {
        if self.interval_secs == 0 || self.interval_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::InvalidValue {
                field: "poll.interval_secs".to_owned(),
                reason: format!("must be 1-{MAX_INTERVAL_SECS}"),
            }
            .into());
        }

        let timeouts = [
            ("poll.timeout_secs", self.timeout_secs),
            ("poll.deletion_timeout_secs", self.deletion_timeout_secs),
            (
                "poll.cluster_api_deployment_timeout_secs",
                self.cluster_api_deployment_timeout_secs,
            ),
            ("poll.kubeconfig_timeout_secs", self.kubeconfig_timeout_secs),
            ("poll.nodes_ready_timeout_secs", self.nodes_ready_timeout_secs),
            (
                "poll.machine_running_timeout_secs",
                self.machine_running_timeout_secs,
            ),
        ];
        for (field, value) in timeouts {
            if value < self.interval_secs || value > MAX_TIMEOUT_SECS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!(
                        "must be between interval_secs ({}) and {MAX_TIMEOUT_SECS}",
                        self.interval_secs
                    ),
                }
                .into());
            }
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "poll.request_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_REQUEST_TIMEOUT_SECS}"),
            }
            .into());
        }

        Ok(())
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.is_empty() { None } else { Some(val) };
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
