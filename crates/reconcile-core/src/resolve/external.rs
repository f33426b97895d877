//! [`ExternalData`]: the resolver's read-only window into systems outside
//! the policy itself — currently per-user secrets referenced from
//! component parameter templates.

/// A source of data the resolver may need while rendering a dependency but
/// which is never promoted to a label and never appears in a
/// [`ComponentInstanceKey`](crate::resolve::key::ComponentInstanceKey),
/// because sensitive values must never land in a log or a diff message.
pub trait ExternalData: Send + Sync {
    /// Looks up a named secret scoped to a user. Absence is not an error —
    /// a template referencing a missing secret fails at render time with
    /// the same "unset label" error as any other missing substitution.
    fn secret(&self, user_id: &str, key: &str) -> Option<String>;
}

/// An [`ExternalData`] source with nothing in it, for policies that don't
/// reference secrets.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExternalData;

impl ExternalData for NoExternalData {
    fn secret(&self, _user_id: &str, _key: &str) -> Option<String> {
        None
    }
}
