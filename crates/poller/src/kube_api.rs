//! Kubernetes 기반 리소스 API
//!
//! [`KubeResourceApi`]는 `kube` 클라이언트로 Deployment와 StatefulSet의
//! 복제본 수 변경, 상태 조회, 삭제를 수행합니다. 모든 요청은 `request_timeout`으로
//! 제한되며, 원격 에러는 여기서 한 번 [`PollerError`]로 변환됩니다.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use converge_core::config::ClusterConfig;
use converge_core::types::{ReplicaStatus, ResourceRef, WorkloadKind};

use crate::api::ResourceApi;
use crate::error::PollerError;

/// kube 클라이언트 기반 [`ResourceApi`] 구현
#[derive(Clone)]
pub struct KubeResourceApi {
    client: Client,
    request_timeout: Duration,
}

impl KubeResourceApi {
    /// 이미 만들어진 클라이언트로 생성합니다.
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    /// 클러스터 설정으로 클라이언트를 만들어 연결합니다.
    ///
    /// `kubeconfig`가 지정되면 그 파일과 `context`를 사용하고, 없으면
    /// 클라이언트 라이브러리의 기본 탐색 규칙(`KUBECONFIG`, in-cluster 등)을 따릅니다.
    ///
    /// # Errors
    ///
    /// kubeconfig를 읽거나 클라이언트를 만들 수 없으면 `PollerError::Connection`을 반환합니다.
    pub async fn connect(
        cluster: &ClusterConfig,
        request_timeout: Duration,
    ) -> Result<Self, PollerError> {
        let client = match &cluster.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    PollerError::Connection(format!("failed to read kubeconfig {path}: {e}"))
                })?;
                let options = KubeConfigOptions {
                    context: cluster.context.clone(),
                    ..Default::default()
                };
                let config = Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| PollerError::Connection(format!("invalid kubeconfig {path}: {e}")))?;
                Client::try_from(config).map_err(|e| PollerError::Connection(e.to_string()))?
            }
            None => Client::try_default()
                .await
                .map_err(|e| PollerError::Connection(e.to_string()))?,
        };

        info!(
            kubeconfig = cluster.kubeconfig.as_deref().unwrap_or("<default>"),
            context = cluster.context.as_deref().unwrap_or("<current>"),
            cluster_id = cluster.cluster_id.as_deref().unwrap_or(""),
            "connected to cluster"
        );

        Ok(Self::new(client, request_timeout))
    }

    fn namespaced<K>(&self, target: &ResourceRef) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &target.namespace)
    }

    /// 요청 하나를 `request_timeout`으로 제한하고 에러를 변환합니다.
    async fn bounded<T, F>(&self, target: &ResourceRef, request: F) -> Result<T, PollerError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(map_kube_error(target, e)),
            Err(_elapsed) => Err(PollerError::Api(format!(
                "{target}: request timed out after {}s",
                self.request_timeout.as_secs()
            ))),
        }
    }

    async fn patch_replicas<K>(&self, target: &ResourceRef, replicas: i32) -> Result<(), PollerError>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        <K as kube::Resource>::DynamicType: Default,
    {
        let api: Api<K> = self.namespaced(target);
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        self.bounded(
            target,
            api.patch(&target.name, &PatchParams::default(), &Patch::Merge(&patch)),
        )
        .await?;
        Ok(())
    }

    async fn delete_resource<K>(&self, target: &ResourceRef) -> Result<(), PollerError>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        <K as kube::Resource>::DynamicType: Default,
    {
        let api: Api<K> = self.namespaced(target);
        self.bounded(target, api.delete(&target.name, &DeleteParams::default()))
            .await?;
        Ok(())
    }
}

impl ResourceApi for KubeResourceApi {
    async fn update_replicas(&self, target: &ResourceRef, replicas: i32) -> Result<(), PollerError> {
        debug!(resource = %target, replicas, "patching replicas");
        match target.kind {
            WorkloadKind::Deployment => self.patch_replicas::<Deployment>(target, replicas).await,
            WorkloadKind::StatefulSet => self.patch_replicas::<StatefulSet>(target, replicas).await,
        }
    }

    async fn get_status(&self, target: &ResourceRef) -> Result<ReplicaStatus, PollerError> {
        match target.kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = self.namespaced(target);
                let deployment = self.bounded(target, api.get(&target.name)).await?;
                Ok(deployment_status(&deployment))
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> = self.namespaced(target);
                let statefulset = self.bounded(target, api.get(&target.name)).await?;
                Ok(statefulset_status(&statefulset))
            }
        }
    }

    async fn delete(&self, target: &ResourceRef) -> Result<(), PollerError> {
        debug!(resource = %target, "deleting resource");
        match target.kind {
            WorkloadKind::Deployment => self.delete_resource::<Deployment>(target).await,
            WorkloadKind::StatefulSet => self.delete_resource::<StatefulSet>(target).await,
        }
    }
}

/// kube 에러를 태그된 에러로 변환합니다.
///
/// 404는 상태 코드로, "삭제 진행 중"은 메시지 표식으로 구분합니다.
fn map_kube_error(target: &ResourceRef, err: kube::Error) -> PollerError {
    match err {
        kube::Error::Api(response) if response.code == 404 => PollerError::NotFound {
            resource: target.to_string(),
        },
        kube::Error::Api(response) => {
            PollerError::from_api_message(format!("{target}: {}", response.message))
        }
        other => PollerError::Connection(other.to_string()),
    }
}

/// Deployment는 currentReplicas가 없으므로 updatedReplicas를 사용합니다.
fn deployment_status(deployment: &Deployment) -> ReplicaStatus {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(0);
    let status = deployment.status.as_ref();
    ReplicaStatus {
        desired,
        replicas: status.and_then(|s| s.replicas).unwrap_or(0),
        available: status.and_then(|s| s.available_replicas).unwrap_or(0),
        current: status.and_then(|s| s.updated_replicas).unwrap_or(0),
        ready: status.and_then(|s| s.ready_replicas).unwrap_or(0),
    }
}

fn statefulset_status(statefulset: &StatefulSet) -> ReplicaStatus {
    let desired = statefulset
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(0);
    let status = statefulset.status.as_ref();
    ReplicaStatus {
        desired,
        replicas: status.map(|s| s.replicas).unwrap_or(0),
        available: status.and_then(|s| s.available_replicas).unwrap_or(0),
        current: status.and_then(|s| s.current_replicas).unwrap_or(0),
        ready: status.and_then(|s| s.ready_replicas).unwrap_or(0),
    }
}
