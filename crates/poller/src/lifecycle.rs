//! 수명 주기 작업 -- 폴러 위에 얹은 목표 조건과 에러 분류 정책
//!
//! 각 작업은 한 틱에서 할 원격 호출, 그 결과를 [`PollOutcome`]으로 바꾸는 규칙,
//! 그리고 사용할 [`ErrorClassifier`]를 정합니다. 타이밍과 종료 판정은
//! 모두 [`Poller::poll`]이 맡습니다.
//!
//! | 작업 | 분류기 | 리소스 없음 | 진행 중 | 그 밖의 에러 |
//! |------|--------|-------------|---------|--------------|
//! | `scale_to_zero` | [`RetryAllClassifier`] | 성공 | 대기 | 대기 |
//! | `wait_until_deleted` | [`RetryAllClassifier`] | 성공 | 대기 | 대기 |
//! | `wait_until_absent` | 호출자 지정 | 성공 | 대기 | 분류기 결정 |
//! | `wait_until` | 호출자 지정 | 분류기 결정 | 대기 | 분류기 결정 |

use std::future::Future;

use tracing::{debug, warn};

use converge_core::metrics as m;
use converge_core::types::{ReplicaField, ResourceRef};

use crate::api::ResourceApi;
use crate::classify::{Benign, ErrorClass, ErrorClassifier, RetryAllClassifier};
use crate::clock::Clock;
use crate::error::PollerError;
use crate::poll::{PollOutcome, PollResult, PollSpec, Poller};

/// 0으로 축소 작업 이름
pub const OP_SCALE_TO_ZERO: &str = "scale_to_zero";
/// 0으로 축소 -- 희망 복제본 수 변경 단계의 작업 이름
pub const OP_SCALE_UPDATE: &str = "scale_to_zero.update";
/// 0으로 축소 -- 상태 관찰 단계의 작업 이름
pub const OP_SCALE_OBSERVE: &str = "scale_to_zero.observe";
/// 삭제 대기 작업 이름
pub const OP_WAIT_DELETED: &str = "wait_until_deleted";
/// 부재 대기 작업 이름
pub const OP_WAIT_ABSENT: &str = "wait_until_absent";

impl<C: Clock> Poller<C> {
    /// 술어가 참이 될 때까지 기다립니다.
    ///
    /// `Ok(true)`는 수렴, `Ok(false)`는 대기입니다. 에러는 `classifier`가
    /// `Fatal`로 분류할 때만 중단하고 나머지는 모두 재시도합니다.
    pub async fn wait_until<K, P, Fut>(
        &self,
        operation: &str,
        spec: &PollSpec,
        classifier: &K,
        predicate: P,
    ) -> PollResult
    where
        K: ErrorClassifier + ?Sized,
        P: Fn() -> Fut,
        Fut: Future<Output = Result<bool, PollerError>>,
    {
        let predicate = &predicate;
        self.poll(operation, spec, move || async move {
            match predicate().await {
                Ok(true) => PollOutcome::Converged,
                Ok(false) => PollOutcome::Pending,
                Err(e) => match absorb(operation, classifier, &e) {
                    ErrorClass::Fatal => PollOutcome::Failed(e.to_string()),
                    _ => PollOutcome::Pending,
                },
            }
        })
        .await
    }

    /// 리소스가 사라질 때까지 읽기만 반복합니다.
    ///
    /// `get`이 "리소스 없음"을 반환하면 수렴합니다.
    pub async fn wait_until_absent<K, G, GFut, T>(
        &self,
        spec: &PollSpec,
        classifier: &K,
        get: G,
    ) -> PollResult
    where
        K: ErrorClassifier + ?Sized,
        G: Fn() -> GFut,
        GFut: Future<Output = Result<T, PollerError>>,
    {
        let get = &get;
        self.poll(OP_WAIT_ABSENT, spec, move || async move {
            match get().await {
                Ok(_) => PollOutcome::Pending,
                Err(e) => toward_absence(absorb(OP_WAIT_ABSENT, classifier, &e), &e),
            }
        })
        .await
    }

    /// 삭제를 요청하고 리소스가 사라질 때까지 기다립니다.
    ///
    /// 매 틱 `delete`를 호출하고, 요청이 받아들여졌을 때만 `get`으로 부재를 확인합니다.
    /// 일반 API 에러로는 `Fatal`이 되지 않으며, "삭제 진행 중"은 제한 시간까지
    /// 계속 재시도합니다.
    pub async fn wait_until_deleted<D, DFut, G, GFut, T>(
        &self,
        spec: &PollSpec,
        delete: D,
        get: G,
    ) -> PollResult
    where
        D: Fn() -> DFut,
        DFut: Future<Output = Result<(), PollerError>>,
        G: Fn() -> GFut,
        GFut: Future<Output = Result<T, PollerError>>,
    {
        let classifier = &RetryAllClassifier;
        let (delete, get) = (&delete, &get);
        self.poll(OP_WAIT_DELETED, spec, move || async move {
            if let Err(e) = delete().await {
                return toward_absence(absorb(OP_WAIT_DELETED, classifier, &e), &e);
            }
            match get().await {
                Ok(_) => PollOutcome::Pending,
                Err(e) => toward_absence(absorb(OP_WAIT_DELETED, classifier, &e), &e),
            }
        })
        .await
    }

    /// 워크로드를 0으로 축소하고 `field`가 0이 될 때까지 기다립니다.
    ///
    /// 두 단계는 각각 `spec`의 제한 시간 전체를 사용하며, 관찰 단계는 변경 단계가
    /// 성공한 뒤에만 시작합니다. 리소스가 없으면 두 단계 모두 즉시 성공합니다.
    pub async fn scale_to_zero<A>(
        &self,
        api: &A,
        target: &ResourceRef,
        field: ReplicaField,
        spec: &PollSpec,
    ) -> PollResult
    where
        A: ResourceApi + ?Sized,
    {
        let classifier = &RetryAllClassifier;

        let updated = self
            .poll(OP_SCALE_UPDATE, spec, move || async move {
                match api.update_replicas(target, 0).await {
                    Ok(()) => PollOutcome::Converged,
                    Err(e) => toward_absence(absorb(OP_SCALE_UPDATE, classifier, &e), &e),
                }
            })
            .await;
        if !updated.is_success() {
            return updated;
        }

        self.poll(OP_SCALE_OBSERVE, spec, move || async move {
            match api.get_status(target).await {
                Ok(status) if status.get(field) == 0 => PollOutcome::Converged,
                Ok(status) => {
                    debug!(
                        resource = %target,
                        %field,
                        observed = status.get(field),
                        "waiting for replicas to drain"
                    );
                    PollOutcome::Pending
                }
                Err(e) => toward_absence(absorb(OP_SCALE_OBSERVE, classifier, &e), &e),
            }
        })
        .await
    }
}

/// 틱 안의 에러를 분류하고 기록합니다.
fn absorb<K: ErrorClassifier + ?Sized>(
    operation: &str,
    classifier: &K,
    err: &PollerError,
) -> ErrorClass {
    let class = classifier.classify(err);
    metrics::counter!(
        m::POLL_ABSORBED_ERRORS_TOTAL,
        m::LABEL_OPERATION => operation.to_owned(),
        m::LABEL_ERROR_CLASS => class.label()
    )
    .increment(1);

    match class {
        ErrorClass::BenignTerminal(_) => debug!(operation, class = %class, error = %err, "benign error"),
        ErrorClass::Transient => warn!(operation, error = %err, "transient error, will retry"),
        ErrorClass::Fatal => warn!(operation, error = %err, "fatal error"),
    }
    class
}

/// 부재가 목표인 작업에서 분류 결과를 틱 결과로 바꿉니다.
fn toward_absence(class: ErrorClass, err: &PollerError) -> PollOutcome {
    match class {
        ErrorClass::BenignTerminal(Benign::Absent) => PollOutcome::Converged,
        ErrorClass::BenignTerminal(Benign::InProgress) | ErrorClass::Transient => {
            PollOutcome::Pending
        }
        ErrorClass::Fatal => PollOutcome::Failed(err.to_string()),
    }
}
