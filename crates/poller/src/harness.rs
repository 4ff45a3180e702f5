//! 하네스 -- 리소스 API, 폴러, 설정, 전략을 묶은 수명 주기 작업 진입점
//!
//! [`Harness`]는 [`HarnessBuilder`]로 생성합니다. 각 작업은 임의의 `operation_id`를
//! 가진 span 안에서 실행되며, 성공이 아닌 결과는 [`PollerError`]로 반환됩니다.
//!
//! # 사용 예시
//! ```ignore
//! use std::sync::Arc;
//! use converge_poller::{HarnessBuilder, KubeResourceApi};
//!
//! let api = KubeResourceApi::connect(&config.cluster, config.poll.request_timeout()).await?;
//! let harness = HarnessBuilder::new()
//!     .config(&config)
//!     .api(Arc::new(api))
//!     .build()?;
//!
//! harness.scale_to_zero(&target, target.kind.default_zero_field()).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use converge_core::config::{HarnessConfig, PollConfig};
use converge_core::error::{ConfigError, ConvergeError};
use converge_core::types::{ReplicaField, ResourceRef};

use crate::api::ResourceApi;
use crate::classify::ErrorClassifier;
use crate::clock::{Clock, TokioClock};
use crate::error::PollerError;
use crate::hooks::Hooks;
use crate::lifecycle::{OP_SCALE_TO_ZERO, OP_WAIT_ABSENT, OP_WAIT_DELETED};
use crate::poll::{PollPreset, Poller};

/// 수명 주기 작업 하네스
pub struct Harness<A: ResourceApi, C: Clock = TokioClock> {
    api: Arc<A>,
    poller: Poller<C>,
    poll: PollConfig,
    hooks: Hooks,
    cluster_id: Option<String>,
}

impl<A: ResourceApi, C: Clock> Harness<A, C> {
    /// 공유 리소스 API
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// 폴러
    pub fn poller(&self) -> &Poller<C> {
        &self.poller
    }

    /// 폴링 설정
    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// 이 하네스의 모든 대기를 중단시키는 취소 토큰
    pub fn cancellation_token(&self) -> &CancellationToken {
        self.poller.cancellation_token()
    }

    /// 진행 단계를 보고합니다.
    pub fn by(&self, message: &str) {
        self.hooks.by(message);
    }

    /// 에러가 있으면 에러 단언 전략에 넘기고 `None`을 반환합니다.
    pub fn expect_ok<T>(&self, result: Result<T, PollerError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.hooks.err_not_expected(&e);
                None
            }
        }
    }

    /// "리소스 없음"을 제외한 에러만 에러 단언 전략에 넘깁니다.
    pub fn ignore_not_found(&self, result: Result<(), PollerError>) {
        if let Err(e) = result {
            if !e.is_not_found() {
                self.hooks.err_not_expected(&e);
            }
        }
    }

    /// 워크로드를 0으로 축소하고 `field`가 0이 될 때까지 기다립니다.
    ///
    /// 두 단계 모두 `poll.deletion_timeout_secs` 예산을 사용합니다.
    pub async fn scale_to_zero(
        &self,
        target: &ResourceRef,
        field: ReplicaField,
    ) -> Result<(), PollerError> {
        let spec = PollPreset::Deletion.spec(&self.poll)?;
        self.by(&format!("scaling {target} down to zero"));
        let result = self
            .poller
            .scale_to_zero(self.api.as_ref(), target, field, &spec)
            .instrument(self.span(OP_SCALE_TO_ZERO, target))
            .await;
        result.into_result(OP_SCALE_TO_ZERO, spec.timeout())
    }

    /// 리소스 삭제를 요청하고 사라질 때까지 기다립니다.
    ///
    /// 이미 없는 리소스에 호출해도 성공합니다.
    pub async fn delete_and_wait(&self, target: &ResourceRef) -> Result<(), PollerError> {
        let spec = PollPreset::Deletion.spec(&self.poll)?;
        self.by(&format!("deleting {target}"));
        let api = self.api.as_ref();
        let result = self
            .poller
            .wait_until_deleted(&spec, || api.delete(target), || api.get_status(target))
            .instrument(self.span(OP_WAIT_DELETED, target))
            .await;
        result.into_result(OP_WAIT_DELETED, spec.timeout())
    }

    /// 리소스가 사라질 때까지 읽기만 반복합니다.
    pub async fn wait_until_absent<K>(
        &self,
        target: &ResourceRef,
        classifier: &K,
    ) -> Result<(), PollerError>
    where
        K: ErrorClassifier + ?Sized,
    {
        let spec = PollPreset::Default.spec(&self.poll)?;
        self.by(&format!("waiting for {target} to disappear"));
        let api = self.api.as_ref();
        let result = self
            .poller
            .wait_until_absent(&spec, classifier, || api.get_status(target))
            .instrument(self.span(OP_WAIT_ABSENT, target))
            .await;
        result.into_result(OP_WAIT_ABSENT, spec.timeout())
    }

    /// 설정된 예산으로 임의의 술어가 참이 될 때까지 기다립니다.
    pub async fn wait_until<K, P, Fut>(
        &self,
        operation: &str,
        preset: PollPreset,
        classifier: &K,
        predicate: P,
    ) -> Result<(), PollerError>
    where
        K: ErrorClassifier + ?Sized,
        P: Fn() -> Fut,
        Fut: Future<Output = Result<bool, PollerError>>,
    {
        let spec = preset.spec(&self.poll)?;
        let span = info_span!(
            "lifecycle",
            operation,
            operation_id = %Uuid::new_v4(),
            cluster_id = self.cluster_id.as_deref().unwrap_or(""),
        );
        let result = self
            .poller
            .wait_until(operation, &spec, classifier, predicate)
            .instrument(span)
            .await;
        result.into_result(operation, spec.timeout())
    }

    fn span(&self, operation: &str, target: &ResourceRef) -> tracing::Span {
        info_span!(
            "lifecycle",
            operation,
            operation_id = %Uuid::new_v4(),
            resource = %target,
            cluster_id = self.cluster_id.as_deref().unwrap_or(""),
        )
    }
}

/// [`Harness`] 빌더
pub struct HarnessBuilder<A: ResourceApi, C: Clock = TokioClock> {
    poll: PollConfig,
    cluster_id: Option<String>,
    api: Option<Arc<A>>,
    clock: C,
    cancel: Option<CancellationToken>,
    hooks: Hooks,
}

impl<A: ResourceApi> HarnessBuilder<A, TokioClock> {
    /// 기본 설정으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            poll: PollConfig::default(),
            cluster_id: None,
            api: None,
            clock: TokioClock,
            cancel: None,
            hooks: Hooks::default(),
        }
    }
}

impl<A: ResourceApi> Default for HarnessBuilder<A, TokioClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ResourceApi, C: Clock> HarnessBuilder<A, C> {
    /// 통합 설정에서 폴링 설정과 클러스터 ID를 가져옵니다.
    pub fn config(mut self, config: &HarnessConfig) -> Self {
        self.poll = config.poll.clone();
        self.cluster_id = config.cluster.cluster_id.clone();
        self
    }

    /// 폴링 설정만 지정합니다.
    pub fn poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// 리소스 API를 설정합니다.
    pub fn api(mut self, api: Arc<A>) -> Self {
        self.api = Some(api);
        self
    }

    /// 외부 취소 토큰을 연결합니다.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 전략 묶음을 설정합니다.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// 시계를 교체합니다.
    pub fn clock<C2: Clock>(self, clock: C2) -> HarnessBuilder<A, C2> {
        HarnessBuilder {
            poll: self.poll,
            cluster_id: self.cluster_id,
            api: self.api,
            clock,
            cancel: self.cancel,
            hooks: self.hooks,
        }
    }

    /// 설정을 검증하고 하네스를 생성합니다.
    pub fn build(self) -> Result<Harness<A, C>, PollerError> {
        self.poll.validate().map_err(|e| match e {
            ConvergeError::Config(ConfigError::InvalidValue { field, reason }) => {
                PollerError::Config { field, reason }
            }
            other => PollerError::Config {
                field: "poll".to_owned(),
                reason: other.to_string(),
            },
        })?;

        let api = self.api.ok_or_else(|| PollerError::Config {
            field: "api".to_owned(),
            reason: "resource api must be provided".to_owned(),
        })?;

        let mut poller = Poller::with_clock(self.clock);
        if let Some(token) = self.cancel {
            poller = poller.with_cancellation(token);
        }

        Ok(Harness {
            api,
            poller,
            poll: self.poll,
            hooks: self.hooks,
            cluster_id: self.cluster_id,
        })
    }
}
