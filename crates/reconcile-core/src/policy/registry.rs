//! The object registry: every declared policy object, keyed by
//! `(kind, name)` so duplicate-name detection and typed lookups are both
//! `O(log n)`.

use std::collections::BTreeMap;

use crate::error::{codes, ErrorCategory, ReconcileError};

use super::cluster::Cluster;
use super::contract::Contract;
use super::dependency::Dependency;
use super::rule::Rule;
use super::service::Service;
use super::user::User;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Service,
    Contract,
    Cluster,
    Rule,
    Dependency,
    User,
}

impl ObjectKind {
    fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Service => "service",
            ObjectKind::Contract => "contract",
            ObjectKind::Cluster => "cluster",
            ObjectKind::Rule => "rule",
            ObjectKind::Dependency => "dependency",
            ObjectKind::User => "user",
        }
    }
}

#[derive(Clone, Debug)]
pub enum PolicyObject {
    Service(Service),
    Contract(Contract),
    Cluster(Cluster),
    Rule(Rule),
    Dependency(Dependency),
    User(User),
}

/// The full set of policy objects declared in a single policy generation,
/// indexed by `(kind, name)`.
#[derive(Clone, Debug, Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<(ObjectKind, String), PolicyObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: ObjectKind, name: String, object: PolicyObject) -> Result<(), ReconcileError> {
        let key = (kind, name);
        if self.objects.contains_key(&key) {
            return Err(ReconcileError::new(
                codes::POLICY_DUPLICATE_NAME,
                ErrorCategory::PolicyMalformed,
                format!("duplicate {} named '{}'", kind.as_str(), key.1),
            ));
        }
        self.objects.insert(key, object);
        Ok(())
    }

    pub fn add_service(&mut self, service: Service) -> Result<(), ReconcileError> {
        let name = service.name.clone();
        self.insert(ObjectKind::Service, name, PolicyObject::Service(service))
    }

    pub fn add_contract(&mut self, contract: Contract) -> Result<(), ReconcileError> {
        let name = contract.name.clone();
        self.insert(ObjectKind::Contract, name, PolicyObject::Contract(contract))
    }

    pub fn add_cluster(&mut self, cluster: Cluster) -> Result<(), ReconcileError> {
        let name = cluster.name.clone();
        self.insert(ObjectKind::Cluster, name, PolicyObject::Cluster(cluster))
    }

    pub fn add_rule(&mut self, rule: Rule) -> Result<(), ReconcileError> {
        let name = rule.name.clone();
        self.insert(ObjectKind::Rule, name, PolicyObject::Rule(rule))
    }

    pub fn add_dependency(&mut self, dependency: Dependency) -> Result<(), ReconcileError> {
        let name = dependency.name.clone();
        self.insert(ObjectKind::Dependency, name, PolicyObject::Dependency(dependency))
    }

    pub fn add_user(&mut self, user: User) -> Result<(), ReconcileError> {
        let name = user.id.clone();
        self.insert(ObjectKind::User, name, PolicyObject::User(user))
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        match self.objects.get(&(ObjectKind::Service, name.to_string()))? {
            PolicyObject::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn contract(&self, name: &str) -> Option<&Contract> {
        match self.objects.get(&(ObjectKind::Contract, name.to_string()))? {
            PolicyObject::Contract(c) => Some(c),
            _ => None,
        }
    }

    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        match self.objects.get(&(ObjectKind::Cluster, name.to_string()))? {
            PolicyObject::Cluster(c) => Some(c),
            _ => None,
        }
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        match self.objects.get(&(ObjectKind::User, id.to_string()))? {
            PolicyObject::User(u) => Some(u),
            _ => None,
        }
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.objects.values().filter_map(|o| match o {
            PolicyObject::Dependency(d) => Some(d),
            _ => None,
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.objects.values().filter_map(|o| match o {
            PolicyObject::Rule(r) => Some(r),
            _ => None,
        })
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.objects.values().filter_map(|o| match o {
            PolicyObject::Cluster(c) => Some(c),
            _ => None,
        })
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.objects.values().filter_map(|o| match o {
            PolicyObject::Service(s) => Some(s),
            _ => None,
        })
    }

    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.objects.values().filter_map(|o| match o {
            PolicyObject::Contract(c) => Some(c),
            _ => None,
        })
    }
}
