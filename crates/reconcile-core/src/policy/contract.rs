//! Contracts and contexts: the indirection layer between a dependency's
//! request for "an X" and the concrete service that provides it, selected
//! by matching the dependency's working labels against each context's
//! criteria in declaration order.

use crate::error::{codes, ErrorCategory, ReconcileError};
use crate::expression::{Criteria, Expression, ExpressionCache};
use crate::labels::{LabelOperations, LabelSet};

/// One branch of a [`Contract`]: if `criteria` allows the dependency's
/// working labels, this context's `service` is instantiated and its
/// `allocation` expressions contribute to the allocation-key suffix of the
/// resulting [`ComponentInstanceKey`](crate::resolve::key::ComponentInstanceKey).
#[derive(Clone, Debug)]
pub struct Context {
    pub name: String,
    pub criteria: Criteria,
    pub service: String,
    /// The cluster this context's components are deployed onto.
    pub cluster: String,
    pub allocation: Vec<Expression>,
    pub change_labels: LabelOperations,
}

impl Context {
    pub fn new(name: impl Into<String>, service: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            criteria: Criteria::default(),
            service: service.into(),
            cluster: cluster.into(),
            allocation: Vec::new(),
            change_labels: LabelOperations::default(),
        }
    }

    /// Renders this context's allocation expressions into the ordered
    /// key-path segments that make up the allocation suffix.
    pub fn allocation_keys(
        &self,
        labels: &LabelSet,
        _cache: &mut ExpressionCache,
    ) -> Result<Vec<String>, ReconcileError> {
        self.allocation
            .iter()
            .map(|expr| expr.evaluate_string(labels))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                ReconcileError::new(
                    codes::EXPRESSION_EVAL_FAILED,
                    ErrorCategory::ExpressionError,
                    format!("context '{}' allocation key failed: {e}", self.name),
                )
            })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Contract {
    pub name: String,
    pub contexts: Vec<Context>,
}

impl Contract {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contexts: Vec::new(),
        }
    }

    /// Finds the first context (in declaration order) whose criteria match
    /// the given labels. Returns `None` if no context matched — the caller
    /// reports [`codes::RESOLVE_NO_CONTEXT_MATCHED`].
    pub fn matching_context(
        &self,
        labels: &LabelSet,
        cache: &mut ExpressionCache,
    ) -> Result<Option<&Context>, ReconcileError> {
        for context in &self.contexts {
            if context.criteria.allows(labels, Some(cache))? {
                return Ok(Some(context));
            }
        }
        Ok(None)
    }
}
