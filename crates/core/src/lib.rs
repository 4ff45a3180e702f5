//! converge 공통 크레이트
//!
//! 원격 클러스터 리소스의 수렴을 관찰하는 하네스가 공유하는 타입,
//! 에러, 설정, 메트릭 이름을 정의합니다.
//!
//! - [`config`]: `converge.toml` 설정 (`HarnessConfig`)
//! - [`error`]: 최상위 에러 (`ConvergeError`)
//! - [`metrics`]: 메트릭 이름 상수
//! - [`types`]: 리소스 참조와 복제본 상태

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ConvergeError, ResourceError, WaitError};

// 설정
pub use config::{ClusterConfig, GeneralConfig, HarnessConfig, PollConfig};

// 도메인 타입
pub use types::{ReplicaField, ReplicaStatus, ResourceRef, WorkloadKind};
