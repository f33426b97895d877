//! Global rules: cross-cutting filters evaluated against a dependency's
//! user/cluster/working labels while resolving, independent of any single
//! contract or context.
//!
//! Rule actions are a closed enum rather than a stringly-typed payload, so
//! every action kind is checked at compile time and the applier's caller
//! can match exhaustively.

use crate::error::{codes, ErrorCategory, ReconcileError};
use crate::expression::{Criteria, ExpressionCache};
use crate::labels::LabelSet;

/// What a matching [`Rule`] does to the dependency being resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuleAction {
    /// Rejects the dependency outright; resolution of this dependency stops
    /// and an [`ErrorCategory::ResolveRejected`] error is recorded.
    Reject { reason: String },
    /// Excludes a single named component from processing for this
    /// dependency, as if its service did not declare it.
    ExcludeComponent { component: String },
    /// Sets a label on the dependency's working label set, visible to
    /// every rule and component evaluated after this one.
    SetLabel { name: String, value: String },
    /// Forbids the dependency outright, same short-circuit as `Reject`
    /// but without a caller-supplied reason string.
    ForbidDependency,
    /// Marks the resolved instance as ineligible for ingress; checked
    /// separately via [`GlobalRules::allows_ingress`].
    BlockIngress,
}

/// A named filter + action pair, matched against the three label
/// namespaces visible during resolution: the user, the target cluster, and
/// the dependency's current working labels.
#[derive(Clone, Debug, Default)]
pub struct Rule {
    pub name: String,
    pub user_criteria: Criteria,
    pub cluster_criteria: Criteria,
    pub label_criteria: Criteria,
    pub actions: Vec<RuleAction>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn matches(
        &self,
        user_labels: &LabelSet,
        cluster_labels: &LabelSet,
        labels: &LabelSet,
        cache: &mut ExpressionCache,
    ) -> Result<bool, ReconcileError> {
        Ok(self.user_criteria.allows(user_labels, Some(cache))?
            && self.cluster_criteria.allows(cluster_labels, Some(cache))?
            && self.label_criteria.allows(labels, Some(cache))?)
    }
}

/// Evaluates every rule in declaration order against the given label
/// namespaces, applying the actions of each rule that matches. The first
/// [`RuleAction::Reject`] encountered stops evaluation and is returned as
/// an error; otherwise the set of excluded component names accumulates
/// across every matching rule.
pub fn evaluate_rules<'a>(
    rules: impl IntoIterator<Item = &'a Rule>,
    user_labels: &LabelSet,
    cluster_labels: &LabelSet,
    labels: &mut LabelSet,
    cache: &mut ExpressionCache,
) -> Result<Vec<String>, ReconcileError> {
    let mut excluded = Vec::new();
    for rule in rules {
        if !rule.matches(user_labels, cluster_labels, labels, cache)? {
            continue;
        }
        for action in &rule.actions {
            match action {
                RuleAction::Reject { reason } => {
                    return Err(ReconcileError::new(
                        codes::RESOLVE_DEPENDENCY_FORBIDDEN,
                        ErrorCategory::ResolveRejected,
                        format!("rejected by rule '{}': {reason}", rule.name),
                    ));
                }
                RuleAction::ForbidDependency => {
                    return Err(ReconcileError::new(
                        codes::RESOLVE_DEPENDENCY_FORBIDDEN,
                        ErrorCategory::ResolveRejected,
                        format!("forbidden by rule '{}'", rule.name),
                    ));
                }
                RuleAction::ExcludeComponent { component } => {
                    excluded.push(component.clone());
                }
                RuleAction::SetLabel { name, value } => {
                    labels.set(name, value);
                }
                RuleAction::BlockIngress => {
                    // Surfaced separately through `GlobalRules::allows_ingress`;
                    // it doesn't affect label resolution or exclusion.
                }
            }
        }
    }
    Ok(excluded)
}

/// Cross-cutting gate checked once per resolved instance, independent of
/// label mutation and component exclusion: is this instance reachable from
/// outside the cluster at all.
pub struct GlobalRules;

impl GlobalRules {
    pub fn allows_ingress<'a>(
        rules: impl IntoIterator<Item = &'a Rule>,
        user_labels: &LabelSet,
        cluster_labels: &LabelSet,
        labels: &LabelSet,
        cache: &mut ExpressionCache,
    ) -> Result<bool, ReconcileError> {
        for rule in rules {
            if rule.matches(user_labels, cluster_labels, labels, cache)?
                && rule.actions.iter().any(|action| matches!(action, RuleAction::BlockIngress))
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
