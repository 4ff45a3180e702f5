//! 수렴 폴러 -- 고정 간격 틱 루프와 제한 시간 판정
//!
//! [`Poller::poll`]은 스텝을 즉시 한 번 실행한 뒤, 매 틱 경계
//! `start + n * interval`마다 다시 실행합니다. 스텝이 [`PollOutcome::Converged`]나
//! [`PollOutcome::Failed`]를 돌려주거나 제한 시간이 끝나면 [`PollResult`]를 반환합니다.
//!
//! # 제한 시간 규칙
//! 틱은 경계가 `start + timeout`보다 엄격히 앞설 때만 시작됩니다.
//! 따라서 `timeout == interval`이면 정확히 한 번, `interval=1s, timeout=3s`이면
//! t=0,1,2에서 세 번 실행됩니다. 스텝이 경계를 넘겨 오래 걸리면 지난 경계는
//! 건너뛰고 현재 시각 이후의 첫 경계를 사용합니다.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use converge_core::config::PollConfig;
use converge_core::metrics as m;

use crate::clock::{Clock, TokioClock};
use crate::error::PollerError;

/// 틱 간격과 제한 시간
///
/// 한 번 만들어지면 바뀌지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    interval: Duration,
    timeout: Duration,
}

impl PollSpec {
    /// 새 폴링 사양을 생성합니다.
    ///
    /// `interval`이 0이면 에러를 반환하고, `timeout`이 `interval`보다 작으면
    /// `interval`로 올립니다.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, PollerError> {
        if interval.is_zero() {
            return Err(PollerError::Config {
                field: "interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(Self {
            interval,
            timeout: timeout.max(interval),
        })
    }

    /// 초 단위 값으로 폴링 사양을 생성합니다.
    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Result<Self, PollerError> {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    /// 틱 간격
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 제한 시간
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// 설정에 이름이 붙은 대기 예산
///
/// 모두 `poll.interval_secs`를 틱 간격으로 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPreset {
    /// `poll.timeout_secs`
    Default,
    /// `poll.deletion_timeout_secs`
    Deletion,
    /// `poll.cluster_api_deployment_timeout_secs`
    ClusterApiDeployment,
    /// `poll.kubeconfig_timeout_secs`
    Kubeconfig,
    /// `poll.nodes_ready_timeout_secs`
    NodesReady,
    /// `poll.machine_running_timeout_secs`
    MachineRunning,
}

impl PollPreset {
    /// 프리셋이 가리키는 제한 시간(초)을 반환합니다.
    pub fn timeout_secs(self, config: &PollConfig) -> u64 {
        match self {
            Self::Default => config.timeout_secs,
            Self::Deletion => config.deletion_timeout_secs,
            Self::ClusterApiDeployment => config.cluster_api_deployment_timeout_secs,
            Self::Kubeconfig => config.kubeconfig_timeout_secs,
            Self::NodesReady => config.nodes_ready_timeout_secs,
            Self::MachineRunning => config.machine_running_timeout_secs,
        }
    }

    /// 설정값으로 폴링 사양을 만듭니다.
    pub fn spec(self, config: &PollConfig) -> Result<PollSpec, PollerError> {
        PollSpec::from_secs(config.interval_secs, self.timeout_secs(config))
    }
}

/// 한 틱의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// 목표 상태에 도달함
    Converged,
    /// 아직 도달하지 않음 -- 다음 틱에 재시도
    Pending,
    /// 재시도 없이 중단
    Failed(String),
}

/// 폴링의 최종 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum PollResult {
    /// 제한 시간 안에 수렴함
    Success,
    /// 제한 시간 안에 수렴하지 않음
    TimedOut,
    /// 스텝이 `Failed`를 반환함
    Fatal(String),
    /// 취소 토큰에 의해 중단됨
    Cancelled,
}

impl PollResult {
    /// 성공 여부
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// 메트릭 레이블용 고정 이름을 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::TimedOut => "timed_out",
            Self::Fatal(_) => "fatal",
            Self::Cancelled => "cancelled",
        }
    }

    /// 성공이 아닌 결과를 [`PollerError`]로 바꿔 `?`로 전파할 수 있게 합니다.
    pub fn into_result(self, operation: &str, timeout: Duration) -> Result<(), PollerError> {
        match self {
            Self::Success => Ok(()),
            Self::TimedOut => Err(PollerError::TimedOut {
                operation: operation.to_owned(),
                timeout,
            }),
            Self::Fatal(reason) => Err(PollerError::Fatal {
                operation: operation.to_owned(),
                reason,
            }),
            Self::Cancelled => Err(PollerError::Cancelled {
                operation: operation.to_owned(),
            }),
        }
    }
}

impl fmt::Display for PollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(reason) => write!(f, "fatal: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// 수렴 폴러
///
/// 타이밍 루프를 단독으로 소유하며 호출자와 가변 상태를 공유하지 않습니다.
/// 같은 폴러로 여러 폴링을 동시에 실행해도 서로 영향을 주지 않습니다.
/// 취소 토큰만 공유되며, 토큰을 취소하면 진행 중인 모든 폴링이 `Cancelled`로 끝납니다.
#[derive(Debug, Clone)]
pub struct Poller<C: Clock = TokioClock> {
    clock: C,
    cancel: CancellationToken,
}

impl Poller<TokioClock> {
    /// tokio 타이머를 쓰는 폴러를 생성합니다.
    pub fn new() -> Self {
        Self::with_clock(TokioClock)
    }
}

impl Default for Poller<TokioClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Poller<C> {
    /// 지정한 시계를 쓰는 폴러를 생성합니다.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            cancel: CancellationToken::new(),
        }
    }

    /// 외부 취소 토큰을 연결합니다.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// 이 폴러의 취소 토큰
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 이 폴러의 시계
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// `step`을 수렴, 실패, 제한 시간, 취소 중 하나가 일어날 때까지 반복 실행합니다.
    ///
    /// 틱 안의 에러는 `step`이 흡수해야 하며, 최종 결과만 반환됩니다.
    pub async fn poll<F, Fut>(&self, operation: &str, spec: &PollSpec, mut step: F) -> PollResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PollOutcome>,
    {
        let start = self.clock.now();
        let deadline = start.checked_add(spec.timeout);
        let mut tick: u64 = 0;

        let result = loop {
            if self.cancel.is_cancelled() {
                break PollResult::Cancelled;
            }

            tick += 1;
            metrics::counter!(m::POLL_TICKS_TOTAL, m::LABEL_OPERATION => operation.to_owned())
                .increment(1);

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break PollResult::Cancelled,
                outcome = step() => outcome,
            };

            match outcome {
                PollOutcome::Converged => break PollResult::Success,
                PollOutcome::Failed(reason) => break PollResult::Fatal(reason),
                PollOutcome::Pending => {
                    debug!(operation, tick, "condition not met yet");
                }
            }

            let now = self.clock.now();
            let Some(next) = next_boundary(start, now, spec.interval) else {
                break PollResult::TimedOut;
            };
            if deadline.is_some_and(|deadline| next >= deadline) {
                break PollResult::TimedOut;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break PollResult::Cancelled,
                _ = self.clock.sleep_until(next) => {}
            }
        };

        let elapsed = self.clock.now().saturating_duration_since(start);
        self.record(operation, &result, tick, elapsed);
        result
    }

    fn record(&self, operation: &str, result: &PollResult, ticks: u64, elapsed: Duration) {
        metrics::counter!(
            m::POLL_RESULTS_TOTAL,
            m::LABEL_OPERATION => operation.to_owned(),
            m::LABEL_RESULT => result.label()
        )
        .increment(1);
        metrics::histogram!(
            m::POLL_DURATION_SECONDS,
            m::LABEL_OPERATION => operation.to_owned()
        )
        .record(elapsed.as_secs_f64());

        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match result {
            PollResult::Success => info!(operation, ticks, elapsed_ms, "converged"),
            PollResult::Cancelled => info!(operation, ticks, elapsed_ms, "poll cancelled"),
            PollResult::TimedOut => warn!(operation, ticks, elapsed_ms, "timed out waiting for convergence"),
            PollResult::Fatal(reason) => {
                warn!(operation, ticks, elapsed_ms, reason = reason.as_str(), "poll aborted")
            }
        }
    }
}

/// `now` 이후 첫 틱 경계를 계산합니다. 시각 범위를 넘으면 `None`.
fn next_boundary(start: Instant, now: Instant, interval: Duration) -> Option<Instant> {
    let elapsed = now.saturating_duration_since(start).as_nanos();
    let interval = interval.as_nanos();
    let n = elapsed / interval + 1;
    let offset = u64::try_from(n.checked_mul(interval)?).ok()?;
    start.checked_add(Duration::from_nanos(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::clock::ManualClock;

    fn manual_poller() -> (Arc<ManualClock>, Poller<Arc<ManualClock>>) {
        let clock = Arc::new(ManualClock::new());
        (Arc::clone(&clock), Poller::with_clock(clock))
    }

    #[test]
    fn spec_rejects_zero_interval() {
        let err = PollSpec::new(Duration::ZERO, Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, PollerError::Config { .. }));
    }

    #[test]
    fn spec_raises_timeout_to_interval() {
        let spec = PollSpec::from_secs(5, 1).unwrap();
        assert_eq!(spec.timeout(), Duration::from_secs(5));
        assert_eq!(spec.interval(), Duration::from_secs(5));
    }

    #[test]
    fn presets_follow_config() {
        let config = PollConfig::default();
        assert_eq!(PollPreset::Deletion.timeout_secs(&config), 60);
        assert_eq!(PollPreset::NodesReady.timeout_secs(&config), 300);
        let spec = PollPreset::MachineRunning.spec(&config).unwrap();
        assert_eq!(spec.timeout(), Duration::from_secs(600));
        assert_eq!(spec.interval(), Duration::from_secs(5));
    }

    #[test]
    fn next_boundary_skips_missed_ticks() {
        let start = Instant::now();
        let interval = Duration::from_secs(5);
        assert_eq!(
            next_boundary(start, start, interval),
            Some(start + Duration::from_secs(5))
        );
        // 12초 걸린 스텝 -> 5, 10을 건너뛰고 15
        assert_eq!(
            next_boundary(start, start + Duration::from_secs(12), interval),
            Some(start + Duration::from_secs(15))
        );
        // 정확히 경계 위 -> 다음 경계
        assert_eq!(
            next_boundary(start, start + Duration::from_secs(10), interval),
            Some(start + Duration::from_secs(15))
        );
    }

    #[tokio::test]
    async fn converged_on_first_tick_returns_success() {
        let (clock, poller) = manual_poller();
        let spec = PollSpec::from_secs(5, 60).unwrap();
        let result = poller
            .poll("test", &spec, || async { PollOutcome::Converged })
            .await;
        assert_eq!(result, PollResult::Success);
        assert_eq!(clock.sleep_count(), 0);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn always_pending_runs_exactly_three_ticks() {
        let (clock, poller) = manual_poller();
        let spec = PollSpec::from_secs(1, 3).unwrap();
        let ticks = AtomicU32::new(0);
        let result = poller
            .poll("test", &spec, || {
                ticks.fetch_add(1, Ordering::SeqCst);
                async { PollOutcome::Pending }
            })
            .await;
        assert_eq!(result, PollResult::TimedOut);
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn timeout_below_interval_runs_exactly_one_tick() {
        let (clock, poller) = manual_poller();
        let spec = PollSpec::from_secs(10, 2).unwrap();
        let ticks = AtomicU32::new(0);
        let result = poller
            .poll("test", &spec, || {
                ticks.fetch_add(1, Ordering::SeqCst);
                async { PollOutcome::Pending }
            })
            .await;
        assert_eq!(result, PollResult::TimedOut);
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[tokio::test]
    async fn converges_on_fourth_tick_at_fifteen_seconds() {
        let (clock, poller) = manual_poller();
        let spec = PollSpec::from_secs(5, 60).unwrap();
        let counts = [3, 3, 3, 0];
        let tick = AtomicU32::new(0);
        let result = poller
            .poll("test", &spec, || {
                let i = tick.fetch_add(1, Ordering::SeqCst) as usize;
                let count = counts[i];
                async move {
                    if count == 0 {
                        PollOutcome::Converged
                    } else {
                        PollOutcome::Pending
                    }
                }
            })
            .await;
        assert_eq!(result, PollResult::Success);
        assert_eq!(clock.elapsed(), Duration::from_secs(15));
        assert_eq!(tick.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failed_aborts_without_retry() {
        let (_clock, poller) = manual_poller();
        let spec = PollSpec::from_secs(1, 60).unwrap();
        let ticks = AtomicU32::new(0);
        let result = poller
            .poll("test", &spec, || {
                ticks.fetch_add(1, Ordering::SeqCst);
                async { PollOutcome::Failed("forbidden".to_owned()) }
            })
            .await;
        assert_eq!(result, PollResult::Fatal("forbidden".to_owned()));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_step_skips_missed_boundaries() {
        let (clock, poller) = manual_poller();
        let spec = PollSpec::from_secs(5, 30).unwrap();
        let ticks = AtomicU32::new(0);
        let step_clock = Arc::clone(&clock);
        let result = poller
            .poll("test", &spec, || {
                ticks.fetch_add(1, Ordering::SeqCst);
                // 매 틱 12초가 걸리는 원격 호출
                step_clock.advance(Duration::from_secs(12));
                async { PollOutcome::Pending }
            })
            .await;
        // 틱: t=0(->12), t=15(->27), 다음 경계 30은 제한 시간 이상
        assert_eq!(result, PollResult::TimedOut);
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pre_cancelled_token_runs_no_tick() {
        let (_clock, poller) = manual_poller();
        poller.cancellation_token().cancel();
        let spec = PollSpec::from_secs(1, 10).unwrap();
        let ticks = AtomicU32::new(0);
        let result = poller
            .poll("test", &spec, || {
                ticks.fetch_add(1, Ordering::SeqCst);
                async { PollOutcome::Pending }
            })
            .await;
        assert_eq!(result, PollResult::Cancelled);
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_between_ticks_stops_poll() {
        let (_clock, poller) = manual_poller();
        let spec = PollSpec::from_secs(1, 100).unwrap();
        let token = poller.cancellation_token().clone();
        let ticks = AtomicU32::new(0);
        let result = poller
            .poll("test", &spec, || {
                if ticks.fetch_add(1, Ordering::SeqCst) == 2 {
                    token.cancel();
                }
                async { PollOutcome::Pending }
            })
            .await;
        assert_eq!(result, PollResult::Cancelled);
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_hanging_step() {
        let poller = Poller::new();
        let token = poller.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            token.cancel();
        });
        let spec = PollSpec::from_secs(1, 60).unwrap();
        let result = poller
            .poll("test", &spec, || std::future::pending::<PollOutcome>())
            .await;
        assert_eq!(result, PollResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_times_out_after_deadline() {
        let poller = Poller::new();
        let spec = PollSpec::from_secs(1, 3).unwrap();
        let started = Instant::now();
        let ticks = AtomicU32::new(0);
        let result = poller
            .poll("test", &spec, || {
                ticks.fetch_add(1, Ordering::SeqCst);
                async { PollOutcome::Pending }
            })
            .await;
        assert_eq!(result, PollResult::TimedOut);
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn into_result_maps_variants() {
        let timeout = Duration::from_secs(60);
        assert!(PollResult::Success.into_result("op", timeout).is_ok());
        assert!(matches!(
            PollResult::TimedOut.into_result("op", timeout),
            Err(PollerError::TimedOut { .. })
        ));
        assert!(matches!(
            PollResult::Fatal("x".to_owned()).into_result("op", timeout),
            Err(PollerError::Fatal { .. })
        ));
        assert!(matches!(
            PollResult::Cancelled.into_result("op", timeout),
            Err(PollerError::Cancelled { .. })
        ));
    }

    #[test]
    fn poll_result_serializes_with_tag() {
        let json = serde_json::to_value(PollResult::Fatal("boom".to_owned())).unwrap();
        assert_eq!(json["result"], "fatal");
        assert_eq!(json["reason"], "boom");
        let json = serde_json::to_value(PollResult::TimedOut).unwrap();
        assert_eq!(json["result"], "timed_out");
    }
}
