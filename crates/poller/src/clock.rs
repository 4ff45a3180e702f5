//! 시계 추상화 -- 틱 사이 대기와 경과 시간 측정
//!
//! 운영 코드는 [`TokioClock`]을 쓰고, 틱 수를 정확히 검증하는 테스트는
//! 잠들 때 가상 시간만 앞당기는 [`ManualClock`]을 씁니다.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// 폴러가 사용하는 시계
pub trait Clock: Send + Sync + 'static {
    /// 현재 시각을 반환합니다.
    fn now(&self) -> Instant;

    /// `deadline`까지 대기합니다. 이미 지났다면 즉시 반환합니다.
    fn sleep_until(&self, deadline: Instant) -> impl Future<Output = ()> + Send;
}

/// tokio 타이머 기반 시계
///
/// `#[tokio::test(start_paused = true)]` 환경에서는 tokio의 가상 시간을 따릅니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}

/// 수동 시계 -- 대기 요청 시 실제로 잠들지 않고 가상 시각만 앞당깁니다.
///
/// 시각은 생성 시점 기준 오프셋(나노초)으로 보관하며, 시간은 뒤로 가지 않습니다.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset_nanos: AtomicU64,
    sleeps: AtomicU64,
}

impl ManualClock {
    /// 현재 시각을 기준으로 새 수동 시계를 생성합니다.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_nanos: AtomicU64::new(0),
            sleeps: AtomicU64::new(0),
        }
    }

    /// 생성 이후 흐른 가상 시간을 반환합니다.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }

    /// 가상 시간을 `by`만큼 앞당깁니다.
    ///
    /// 틱 안에서 원격 호출이 오래 걸린 상황을 흉내낼 때 씁니다.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// `sleep_until` 호출 횟수를 반환합니다.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    async fn sleep_until(&self, deadline: Instant) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        let target = deadline.saturating_duration_since(self.base);
        let nanos = u64::try_from(target.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_max(nanos, Ordering::SeqCst);
    }
}

impl<C: Clock> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        self.as_ref().now()
    }

    fn sleep_until(&self, deadline: Instant) -> impl Future<Output = ()> + Send {
        self.as_ref().sleep_until(deadline)
    }
}
