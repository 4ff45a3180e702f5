//! 원격 리소스 API 추상화
//!
//! [`ResourceApi`] trait은 수명 주기 작업이 한 틱 안에서 호출하는
//! 세 가지 원격 호출을 정의합니다. 운영 구현은 [`KubeResourceApi`](crate::kube_api::KubeResourceApi)이며,
//! 테스트에서는 응답을 미리 정해 둔 mock을 사용합니다.

use std::future::Future;

use converge_core::types::{ReplicaStatus, ResourceRef};

use crate::error::PollerError;

/// 원격 리소스 API
///
/// 구현체는 여러 수명 주기 작업이 `Arc`로 공유하므로 `Send + Sync`여야 합니다.
///
/// # Error Handling
///
/// 구현체는 원격 에러를 클라이언트 경계에서 한 번 태그된 [`PollerError`]로 변환합니다.
///
/// - **리소스 없음**: `PollerError::NotFound`
/// - **삭제 진행 중**: `PollerError::BeingDeleted`
/// - **그 밖의 API 에러**: `PollerError::Api` (텍스트만 있으면 [`PollerError::from_api_message`])
/// - **연결 실패/요청 제한 시간 초과**: `PollerError::Connection` 또는 `PollerError::Api`
pub trait ResourceApi: Send + Sync + 'static {
    /// 희망 복제본 수를 `replicas`로 변경합니다.
    fn update_replicas(
        &self,
        target: &ResourceRef,
        replicas: i32,
    ) -> impl Future<Output = Result<(), PollerError>> + Send;

    /// 현재 복제본 상태를 읽습니다.
    fn get_status(
        &self,
        target: &ResourceRef,
    ) -> impl Future<Output = Result<ReplicaStatus, PollerError>> + Send;

    /// 리소스 삭제를 요청합니다.
    fn delete(&self, target: &ResourceRef) -> impl Future<Output = Result<(), PollerError>> + Send;
}

#[cfg(test)]
pub use mock::MockResourceApi;
