//! 폴러 에러 타입
//!
//! [`PollerError`]는 원격 리소스 API 호출과 수렴 대기에서 발생하는 모든 에러를 표현합니다.
//! `From<PollerError> for ConvergeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use std::time::Duration;

use converge_core::error::{ConfigError, ConvergeError, ResourceError, WaitError};

use crate::classify::ErrorKind;

/// 폴러 도메인 에러
///
/// API 에러 변형의 `Display` 출력은 원격 API가 쓰는 문자열 표식을 그대로 포함하므로,
/// 텍스트만 남은 경우에도 같은 종류로 다시 분류됩니다.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PollerError {
    /// 대상 리소스가 존재하지 않음
    #[error("{resource} not found")]
    NotFound {
        /// 대상 리소스 (`kind/namespace/name` 또는 원본 메시지)
        resource: String,
    },

    /// 대상 리소스가 이미 삭제 진행 중
    #[error("{resource}: object is being deleted")]
    BeingDeleted {
        /// 대상 리소스
        resource: String,
    },

    /// 그 밖의 API 호출 실패
    #[error("api error: {0}")]
    Api(String),

    /// 클러스터 연결 실패
    #[error("connection error: {0}")]
    Connection(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 제한 시간 안에 수렴하지 않음
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    TimedOut {
        /// 수명 주기 작업 이름
        operation: String,
        /// 적용된 제한 시간
        timeout: Duration,
    },

    /// 분류기가 재시도하지 않기로 결정한 에러
    #[error("{operation} failed: {reason}")]
    Fatal {
        /// 수명 주기 작업 이름
        operation: String,
        /// 실패 사유
        reason: String,
    },

    /// 취소 토큰에 의해 중단됨
    #[error("{operation} was cancelled")]
    Cancelled {
        /// 수명 주기 작업 이름
        operation: String,
    },
}

impl PollerError {
    /// 원격 API가 돌려준 에러 메시지를 태그된 에러로 한 번만 변환합니다.
    ///
    /// 클라이언트 경계에서만 호출하며, 호출 지점마다 문자열을 다시 비교하지 않습니다.
    pub fn from_api_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match ErrorKind::from_message(&message) {
            ErrorKind::NotFound => Self::NotFound { resource: message },
            ErrorKind::AlreadyInProgress => Self::BeingDeleted { resource: message },
            ErrorKind::Transient => Self::Api(message),
        }
    }

    /// 에러의 종류를 반환합니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BeingDeleted { .. } => ErrorKind::AlreadyInProgress,
            _ => ErrorKind::Transient,
        }
    }

    /// 대상 리소스가 없다는 에러인지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<PollerError> for ConvergeError {
    fn from(err: PollerError) -> Self {
        match err {
            PollerError::NotFound { resource } => {
                ConvergeError::Resource(ResourceError::NotFound(resource))
            }
            PollerError::BeingDeleted { resource } => {
                ConvergeError::Resource(ResourceError::BeingDeleted(resource))
            }
            PollerError::Api(msg) => ConvergeError::Resource(ResourceError::Api(msg)),
            PollerError::Connection(msg) => {
                ConvergeError::Resource(ResourceError::Connection(msg))
            }
            PollerError::Config { field, reason } => {
                ConvergeError::Config(ConfigError::InvalidValue { field, reason })
            }
            PollerError::TimedOut { operation, timeout } => {
                ConvergeError::Wait(WaitError::TimedOut {
                    operation,
                    timeout_secs: timeout.as_secs(),
                })
            }
            PollerError::Fatal { operation, reason } => {
                ConvergeError::Wait(WaitError::Fatal { operation, reason })
            }
            PollerError::Cancelled { operation } => {
                ConvergeError::Wait(WaitError::Cancelled { operation })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_api_message_not_found() {
        let err = PollerError::from_api_message(
            "deployments.apps \"machine-controller\" not found",
        );
        assert!(matches!(err, PollerError::NotFound { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn from_api_message_being_deleted() {
        let err = PollerError::from_api_message(
            "Operation cannot be fulfilled on machines \"m-1\": object is being deleted",
        );
        assert!(matches!(err, PollerError::BeingDeleted { .. }));
        assert_eq!(err.kind(), ErrorKind::AlreadyInProgress);
    }

    #[test]
    fn from_api_message_other() {
        let err = PollerError::from_api_message("etcdserver: request timed out");
        assert!(matches!(err, PollerError::Api(_)));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn display_text_reclassifies_to_same_kind() {
        let not_found = PollerError::NotFound {
            resource: "deployment/default/web".to_owned(),
        };
        let being_deleted = PollerError::BeingDeleted {
            resource: "deployment/default/web".to_owned(),
        };
        assert_eq!(
            PollerError::from_api_message(not_found.to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PollerError::from_api_message(being_deleted.to_string()).kind(),
            ErrorKind::AlreadyInProgress
        );
    }

    #[test]
    fn timed_out_display() {
        let err = PollerError::TimedOut {
            operation: "wait_until_deleted".to_owned(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "wait_until_deleted timed out after 60s");
    }

    #[test]
    fn converts_to_converge_error_resource() {
        let err: ConvergeError = PollerError::NotFound {
            resource: "x".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            ConvergeError::Resource(ResourceError::NotFound(_))
        ));
    }

    #[test]
    fn converts_to_converge_error_wait() {
        let err: ConvergeError = PollerError::Cancelled {
            operation: "scale_to_zero".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            ConvergeError::Wait(WaitError::Cancelled { .. })
        ));
    }

    #[test]
    fn converts_to_converge_error_config() {
        let err: ConvergeError = PollerError::Config {
            field: "interval".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, ConvergeError::Config(_)));
    }
}
