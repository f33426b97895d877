//! Crate-wide error type.
//!
//! `ReconcileError` carries a stable `<domain>.<reason>` code, a structured
//! [`ErrorCategory`] driving how the caller is expected to react, a
//! human-readable message, and an optional boxed cause. Callers branch on
//! `category()`, never on the message text.

use std::fmt;

/// Stable error codes, grouped by the subsystem that raises them.
pub mod codes {
    pub const POLICY_DUPLICATE_NAME: &str = "policy.duplicate_name";
    pub const POLICY_DANGLING_REFERENCE: &str = "policy.dangling_reference";
    pub const POLICY_COMPONENT_CYCLE: &str = "policy.component_cycle";
    pub const POLICY_MISSING_COMPONENT: &str = "policy.missing_component";
    pub const POLICY_UNKNOWN_KIND: &str = "policy.unknown_kind";

    pub const RESOLVE_USER_NOT_FOUND: &str = "resolve.user_not_found";
    pub const RESOLVE_NO_CONTEXT_MATCHED: &str = "resolve.no_context_matched";
    pub const RESOLVE_DEPENDENCY_FORBIDDEN: &str = "resolve.dependency_forbidden";
    pub const RESOLVE_INGRESS_BLOCKED: &str = "resolve.ingress_blocked";

    pub const EXPRESSION_EVAL_FAILED: &str = "expression.eval_failed";

    pub const APPLY_ACTION_FAILED: &str = "apply.action_failed";
    pub const APPLY_ACTION_PANICKED: &str = "apply.action_panicked";

    pub const PLUGIN_NOT_FOUND: &str = "plugin.not_found";
}

/// How a [`ReconcileError`] should steer the caller's control flow:
/// policy-malformed errors abort resolution before it starts,
/// resolve-rejected/expression-error reject a single dependency,
/// apply-action-failed/plugin-not-found reject a single action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    PolicyMalformed,
    ResolveRejected,
    ExpressionError,
    ApplyActionFailed,
    PluginNotFound,
}

/// The crate-wide error type.
#[derive(Debug)]
pub struct ReconcileError {
    code: &'static str,
    category: ErrorCategory,
    message: String,
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ReconcileError {
    pub fn new(
        code: &'static str,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            category,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
