//! 에러 타입 — 도메인별 에러 정의

/// converge 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ConvergeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 원격 리소스 API 에러
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// 수렴 대기 실패
    #[error("wait error: {0}")]
    Wait(#[from] WaitError),

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

/// 원격 리소스 API 에러
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// 대상 리소스가 존재하지 않음
    #[error("resource not found: {0}")]
    NotFound(String),

    /// 대상 리소스가 이미 삭제 진행 중
    #[error("resource is being deleted: {0}")]
    BeingDeleted(String),

    /// 그 밖의 API 호출 실패
    #[error("api call failed: {0}")]
    Api(String),

    /// 클러스터 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),
}

/// 수렴 대기 실패
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// 제한 시간 안에 수렴하지 않음
    #[error("{operation} timed out after {timeout_secs}s")]
    TimedOut { operation: String, timeout_secs: u64 },

    /// 재시도하지 않는 에러로 중단됨
    #[error("{operation} failed: {reason}")]
    Fatal { operation: String, reason: String },

    /// 취소 토큰에 의해 중단됨
    #[error("{operation} was cancelled")]
    Cancelled { operation: String },
}
