//! The declarative policy object model: services, contracts, clusters,
//! rules, dependencies, and the users they're declared on behalf of.

pub mod cluster;
pub mod contract;
pub mod dependency;
pub mod registry;
pub mod rule;
pub mod service;
pub mod user;

pub use cluster::Cluster;
pub use contract::{Context, Contract};
pub use dependency::Dependency;
pub use registry::{ObjectKind, ObjectRegistry, PolicyObject};
pub use rule::{GlobalRules, Rule, RuleAction};
pub use service::{ComponentCode, Service, ServiceComponent};
pub use user::User;

use crate::error::{codes, ErrorCategory, ReconcileError};

/// A single policy generation: the full object registry plus global rules
/// evaluated during resolution, validated as a unit before it can be
/// handed to the resolver.
#[derive(Clone, Debug, Default)]
pub struct Policy {
    pub objects: ObjectRegistry,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks every cross-object reference resolves and every service's
    /// component graph is acyclic. Called once before a [`Resolver`](crate::resolve::resolver::Resolver)
    /// run; a malformed policy aborts the entire run.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        for service in self.objects.services() {
            service.components_in_order()?;
            for component in &service.components {
                if let ComponentCode::Contract { name } = &component.code {
                    if self.objects.contract(name).is_none() {
                        return Err(dangling(format!(
                            "service '{}' component '{}' references unknown contract '{}'",
                            service.name, component.name, name
                        )));
                    }
                }
            }
        }

        for contract in self.objects.contracts() {
            for context in &contract.contexts {
                if self.objects.service(&context.service).is_none() {
                    return Err(dangling(format!(
                        "contract '{}' context '{}' references unknown service '{}'",
                        contract.name, context.name, context.service
                    )));
                }
                if self.objects.cluster(&context.cluster).is_none() {
                    return Err(dangling(format!(
                        "contract '{}' context '{}' references unknown cluster '{}'",
                        contract.name, context.name, context.cluster
                    )));
                }
            }
        }

        for dependency in self.objects.dependencies() {
            if self.objects.user(&dependency.user_id).is_none() {
                return Err(dangling(format!(
                    "dependency '{}' references unknown user '{}'",
                    dependency.name, dependency.user_id
                )));
            }
            if self.objects.contract(&dependency.contract).is_none() {
                return Err(dangling(format!(
                    "dependency '{}' references unknown contract '{}'",
                    dependency.name, dependency.contract
                )));
            }
        }

        Ok(())
    }
}

fn dangling(message: String) -> ReconcileError {
    ReconcileError::new(codes::POLICY_DANGLING_REFERENCE, ErrorCategory::PolicyMalformed, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_contract_reference_is_rejected() {
        let mut policy = Policy::new();
        policy
            .objects
            .add_dependency(Dependency::new("dep1", "alice", "ghost-contract"))
            .unwrap();
        policy.objects.add_user(User::new("alice", "Alice")).unwrap();

        let err = policy.validate().unwrap_err();
        assert_eq!(err.code(), codes::POLICY_DANGLING_REFERENCE);
    }

    #[test]
    fn well_formed_policy_validates() {
        let mut policy = Policy::new();
        policy.objects.add_user(User::new("alice", "Alice")).unwrap();
        policy
            .objects
            .add_service(Service::new("web", "team-a"))
            .unwrap();
        policy
            .objects
            .add_cluster(Cluster::new("cluster-a", "kubernetes"))
            .unwrap();
        let mut contract = Contract::new("web-contract");
        contract.contexts.push(Context::new("default", "web", "cluster-a"));
        policy.objects.add_contract(contract).unwrap();
        policy
            .objects
            .add_dependency(Dependency::new("dep1", "alice", "web-contract"))
            .unwrap();

        policy.validate().unwrap();
    }
}
