//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `converge_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(converge_core::metrics::POLL_TICKS_TOTAL, "operation" => "scale_to_zero").increment(1);
//! ```

use metrics::{describe_counter, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 수명 주기 작업 레이블 키 (scale_to_zero, wait_until_deleted, ...)
pub const LABEL_OPERATION: &str = "operation";

/// 결과 레이블 키 (success, timed_out, fatal, cancelled)
pub const LABEL_RESULT: &str = "result";

/// 에러 분류 레이블 키 (absent, in_progress, transient, fatal)
pub const LABEL_ERROR_CLASS: &str = "class";

// ─── Poller 메트릭 ─────────────────────────────────────────────────

/// Poller: 실행한 틱 수 (counter, label: operation)
pub const POLL_TICKS_TOTAL: &str = "converge_poll_ticks_total";

/// Poller: 종료된 폴링 수 (counter, label: operation, result)
pub const POLL_RESULTS_TOTAL: &str = "converge_poll_results_total";

/// Poller: 폴링 시작부터 종료까지 걸린 시간 (histogram, 초)
pub const POLL_DURATION_SECONDS: &str = "converge_poll_duration_seconds";

/// Poller: 틱 안에서 흡수된 API 에러 수 (counter, label: operation, class)
pub const POLL_ABSORBED_ERRORS_TOTAL: &str = "converge_poll_absorbed_errors_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 전에 호출해도 안전합니다.
pub fn describe_all() {
    describe_counter!(
        POLL_TICKS_TOTAL,
        "Total number of poll ticks executed across all operations"
    );
    describe_counter!(
        POLL_RESULTS_TOTAL,
        "Total number of finished polls by operation and result"
    );
    describe_histogram!(
        POLL_DURATION_SECONDS,
        "Wall time from first tick to final result in seconds"
    );
    describe_counter!(
        POLL_ABSORBED_ERRORS_TOTAL,
        "Total number of API errors absorbed inside a tick, by classification"
    );
}
