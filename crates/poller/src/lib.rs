//! converge 수렴 폴링 엔진
//!
//! 원격 리소스 상태를 고정 간격으로 조회하면서 일시적 에러와 종료성 에러를
//! 구분하고, 제한 시간 안에 목표 상태에 도달했는지 판정합니다.
//!
//! # 구성 요소
//! - [`poll`]: 틱 루프와 제한 시간 판정 (`Poller`, `PollSpec`, `PollResult`)
//! - [`classify`]: 에러 분류 (`ErrorClassifier`, `RetryAllClassifier`, `StrictClassifier`)
//! - [`lifecycle`]: 0으로 축소, 삭제 대기, 범용 대기
//! - [`harness`]: 리소스 API와 설정을 묶은 진입점 (`Harness`, `HarnessBuilder`)
//! - [`api`], [`kube_api`]: 원격 리소스 API trait과 Kubernetes 구현
//! - [`clock`]: 시계 추상화 (`TokioClock`, `ManualClock`)
//! - [`hooks`]: 진행 보고와 에러 단언 전략
//!
//! # 아키텍처
//! ```text
//! Harness ──> Lifecycle Operation ──> Poller ──tick──> ResourceApi
//!                    |                   |
//!              ErrorClassifier         Clock
//! ```

pub mod api;
pub mod classify;
pub mod clock;
pub mod error;
pub mod harness;
pub mod hooks;
pub mod kube_api;
pub mod lifecycle;
pub mod poll;

pub use api::ResourceApi;
pub use classify::{
    BEING_DELETED_MARKER, Benign, ErrorClass, ErrorClassifier, ErrorKind, NOT_FOUND_MARKER,
    RetryAllClassifier, StrictClassifier,
};
pub use clock::{Clock, ManualClock, TokioClock};
pub use error::PollerError;
pub use harness::{Harness, HarnessBuilder};
pub use hooks::Hooks;
pub use kube_api::KubeResourceApi;
pub use poll::{PollOutcome, PollPreset, PollResult, PollSpec, Poller};
