//! 에러 분류 -- 틱 안에서 관찰한 에러가 성공/재시도/중단 중 무엇인지 결정
//!
//! 원격 API는 에러를 두 개의 문자열 표식으로만 구분합니다.
//! [`ErrorKind::from_message`]가 클라이언트 경계에서 이를 한 번 태그로 바꾸고,
//! 이후 [`ErrorClassifier`]가 태그를 보고 [`ErrorClass`]를 정합니다.
//!
//! ```text
//! raw message ──from_message──> ErrorKind ──ErrorClassifier──> ErrorClass
//!                                                                 |
//!                                          lifecycle operation ──> PollOutcome
//! ```

use std::fmt;

use crate::error::PollerError;

/// "리소스 없음" 표식
pub const NOT_FOUND_MARKER: &str = "not found";

/// "삭제 진행 중" 표식
pub const BEING_DELETED_MARKER: &str = "object is being deleted";

/// 클라이언트 경계에서 붙이는 에러 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 대상 리소스가 없음
    NotFound,
    /// 요청한 전이가 이미 진행 중 (예: 삭제 진행 중)
    AlreadyInProgress,
    /// 그 밖의 모든 에러
    Transient,
}

impl ErrorKind {
    /// 원시 에러 메시지를 태그로 변환합니다.
    ///
    /// "삭제 진행 중" 표식을 먼저 확인합니다.
    pub fn from_message(message: &str) -> Self {
        if message.contains(BEING_DELETED_MARKER) {
            Self::AlreadyInProgress
        } else if message.contains(NOT_FOUND_MARKER) {
            Self::NotFound
        } else {
            Self::Transient
        }
    }
}

/// 무해한 종료성 에러의 세부 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Benign {
    /// 리소스가 이미 없음 -- 부재를 기다리는 작업에서는 수렴
    Absent,
    /// 요청한 전이가 이미 진행 중 -- 성공이 아니라 계속 대기
    InProgress,
}

/// 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 목표 상태에 이미 도달했거나 도달하는 중임을 알리는 에러
    BenignTerminal(Benign),
    /// 재시도할 에러
    Transient,
    /// 즉시 중단할 에러
    Fatal,
}

impl ErrorClass {
    /// 메트릭 레이블용 고정 이름을 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BenignTerminal(Benign::Absent) => "absent",
            Self::BenignTerminal(Benign::InProgress) => "in_progress",
            Self::Transient => "transient",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 에러 분류 전략
///
/// 수명 주기 작업은 생성 시점에 분류기를 주입받습니다.
/// `Fn(&PollerError) -> ErrorClass` 클로저도 그대로 분류기로 쓸 수 있습니다.
pub trait ErrorClassifier: Send + Sync {
    /// 에러를 분류합니다.
    fn classify(&self, err: &PollerError) -> ErrorClass;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&PollerError) -> ErrorClass + Send + Sync,
{
    fn classify(&self, err: &PollerError) -> ErrorClass {
        self(err)
    }
}

/// 기본 분류기 -- 어떤 에러도 `Fatal`로 분류하지 않습니다.
///
/// 삭제 대기와 0으로 축소 작업은 이 분류기를 사용하며, 모든 에러를
/// 제한 시간이 끝날 때까지 재시도합니다. 빠른 실패보다 최종 일관성을
/// 기다리는 쪽을 택한 동작이며 테스트로 고정되어 있습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryAllClassifier;

impl ErrorClassifier for RetryAllClassifier {
    fn classify(&self, err: &PollerError) -> ErrorClass {
        match err.kind() {
            ErrorKind::NotFound => ErrorClass::BenignTerminal(Benign::Absent),
            ErrorKind::AlreadyInProgress => ErrorClass::BenignTerminal(Benign::InProgress),
            ErrorKind::Transient => ErrorClass::Transient,
        }
    }
}

/// 엄격한 분류기 -- 재시도해도 나아질 수 없는 에러를 `Fatal`로 분류합니다.
///
/// 설정 에러와 이미 종료된 대기의 에러(`TimedOut`, `Fatal`, `Cancelled`)가 대상입니다.
/// 범용 대기(`wait_until`)의 확장 지점으로 제공합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictClassifier;

impl ErrorClassifier for StrictClassifier {
    fn classify(&self, err: &PollerError) -> ErrorClass {
        match err {
            PollerError::Config { .. }
            | PollerError::TimedOut { .. }
            | PollerError::Fatal { .. }
            | PollerError::Cancelled { .. } => ErrorClass::Fatal,
            _ => RetryAllClassifier.classify(err),
        }
    }
}
