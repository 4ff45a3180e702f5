//! 진행 보고와 에러 단언 전략
//!
//! [`Hooks`]는 하네스 생성 시점에 주입되는 두 개의 전략을 묶습니다.
//! 기본 구현은 tracing으로 기록만 하며, 테스트 러너는 자체 단언으로 바꿔 끼웁니다.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::error::PollerError;

/// 진행 단계 보고 함수
pub type ByHook = Arc<dyn Fn(&str) + Send + Sync>;

/// 예상하지 못한 에러 처리 함수
pub type ErrNotExpectedHook = Arc<dyn Fn(&PollerError) + Send + Sync>;

/// 하네스 전략 묶음
#[derive(Clone)]
pub struct Hooks {
    by: ByHook,
    err_not_expected: ErrNotExpectedHook,
}

impl Hooks {
    /// 진행 보고 전략을 교체합니다.
    pub fn with_by(mut self, by: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.by = Arc::new(by);
        self
    }

    /// 에러 단언 전략을 교체합니다.
    pub fn with_err_not_expected(
        mut self,
        hook: impl Fn(&PollerError) + Send + Sync + 'static,
    ) -> Self {
        self.err_not_expected = Arc::new(hook);
        self
    }

    /// 진행 단계를 보고합니다.
    pub fn by(&self, message: &str) {
        (self.by)(message);
    }

    /// 예상하지 못한 에러를 보고합니다.
    pub fn err_not_expected(&self, err: &PollerError) {
        (self.err_not_expected)(err);
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            by: Arc::new(|message| info!(step = message, "STEP")),
            err_not_expected: Arc::new(|err| error!(error = %err, "unexpected error")),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
