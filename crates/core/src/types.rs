//! 도메인 타입 — 관찰 대상 리소스와 상태 스냅샷
//!
//! [`ResourceRef`]는 하나의 수명 주기 작업 동안 바뀌지 않는 관찰 대상을,
//! [`ReplicaStatus`]는 한 번의 읽기로 얻은 복제본 상태를 나타냅니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 복제본 수를 가진 워크로드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    /// apps/v1 Deployment
    Deployment,
    /// apps/v1 StatefulSet
    StatefulSet,
}

impl WorkloadKind {
    /// 이 종류에서 "0으로 줄었다"를 판단할 때 기본으로 보는 상태 필드
    pub fn default_zero_field(self) -> ReplicaField {
        match self {
            Self::Deployment => ReplicaField::Available,
            Self::StatefulSet => ReplicaField::Current,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployment => write!(f, "deployment"),
            Self::StatefulSet => write!(f, "statefulset"),
        }
    }
}

impl FromStr for WorkloadKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deployment" | "deploy" => Ok(Self::Deployment),
            "statefulset" | "sts" => Ok(Self::StatefulSet),
            other => Err(ConfigError::InvalidValue {
                field: "kind".to_owned(),
                reason: format!("unknown workload kind '{other}'"),
            }),
        }
    }
}

/// 관찰 대상 원격 리소스 식별자
///
/// `kind/namespace/name` 형식으로 표시됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// 워크로드 종류
    pub kind: WorkloadKind,
    /// 네임스페이스
    pub namespace: String,
    /// 리소스 이름
    pub name: String,
}

impl ResourceRef {
    /// 새 리소스 참조를 생성합니다.
    pub fn new(kind: WorkloadKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `namespace/name` 또는 `name` 형식의 문자열을 파싱합니다.
    ///
    /// 네임스페이스가 생략되면 `default`를 사용합니다.
    pub fn parse(kind: WorkloadKind, target: &str) -> Result<Self, ConfigError> {
        let (namespace, name) = match target.split_once('/') {
            Some((ns, name)) => (ns, name),
            None => ("default", target),
        };
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "target".to_owned(),
                reason: format!("expected 'namespace/name' or 'name', got '{target}'"),
            });
        }
        Ok(Self::new(kind, namespace, name))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// 복제본 상태에서 관찰할 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaField {
    /// status.replicas
    Replicas,
    /// status.availableReplicas
    Available,
    /// status.currentReplicas
    Current,
    /// status.readyReplicas
    Ready,
}

impl fmt::Display for ReplicaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replicas => write!(f, "replicas"),
            Self::Available => write!(f, "available"),
            Self::Current => write!(f, "current"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// 한 번의 읽기로 얻은 복제본 상태
///
/// 원격 API가 값을 보고하지 않은 필드는 0으로 취급합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaStatus {
    /// 희망 복제본 수 (spec.replicas)
    pub desired: i32,
    /// 관찰된 전체 복제본 수
    pub replicas: i32,
    /// 사용 가능한 복제본 수
    pub available: i32,
    /// 현재 리비전의 복제본 수
    pub current: i32,
    /// 준비된 복제본 수
    pub ready: i32,
}

impl ReplicaStatus {
    /// 지정한 필드의 값을 반환합니다.
    pub fn get(&self, field: ReplicaField) -> i32 {
        match field {
            ReplicaField::Replicas => self.replicas,
            ReplicaField::Available => self.available,
            ReplicaField::Current => self.current,
            ReplicaField::Ready => self.ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_ref_display() {
        let r = ResourceRef::new(WorkloadKind::StatefulSet, "kube-system", "etcd");
        assert_eq!(r.to_string(), "statefulset/kube-system/etcd");
    }

    #[test]
    fn resource_ref_parse_with_namespace() {
        let r = ResourceRef::parse(WorkloadKind::Deployment, "openshift-machine-api/machine-controller")
            .unwrap();
        assert_eq!(r.namespace, "openshift-machine-api");
        assert_eq!(r.name, "machine-controller");
    }

    #[test]
    fn resource_ref_parse_defaults_namespace() {
        let r = ResourceRef::parse(WorkloadKind::Deployment, "web").unwrap();
        assert_eq!(r.namespace, "default");
        assert_eq!(r.name, "web");
    }

    #[test]
    fn resource_ref_parse_rejects_malformed() {
        assert!(ResourceRef::parse(WorkloadKind::Deployment, "").is_err());
        assert!(ResourceRef::parse(WorkloadKind::Deployment, "ns/").is_err());
        assert!(ResourceRef::parse(WorkloadKind::Deployment, "/web").is_err());
        assert!(ResourceRef::parse(WorkloadKind::Deployment, "a/b/c").is_err());
    }

    #[test]
    fn workload_kind_from_str_accepts_short_names() {
        assert_eq!("deploy".parse::<WorkloadKind>().unwrap(), WorkloadKind::Deployment);
        assert_eq!("STS".parse::<WorkloadKind>().unwrap(), WorkloadKind::StatefulSet);
        assert!("daemonset".parse::<WorkloadKind>().is_err());
    }

    #[test]
    fn default_zero_field_per_kind() {
        assert_eq!(
            WorkloadKind::Deployment.default_zero_field(),
            ReplicaField::Available
        );
        assert_eq!(
            WorkloadKind::StatefulSet.default_zero_field(),
            ReplicaField::Current
        );
    }

    #[test]
    fn replica_status_field_lookup() {
        let status = ReplicaStatus {
            desired: 0,
            replicas: 3,
            available: 2,
            current: 1,
            ready: 0,
        };
        assert_eq!(status.get(ReplicaField::Replicas), 3);
        assert_eq!(status.get(ReplicaField::Available), 2);
        assert_eq!(status.get(ReplicaField::Current), 1);
        assert_eq!(status.get(ReplicaField::Ready), 0);
    }
}
