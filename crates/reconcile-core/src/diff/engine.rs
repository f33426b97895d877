//! The diff engine: produces a deterministic, ordered list of
//! [`DiffAction`]s that would take `prev`'s actual state to `next`'s
//! desired state.

use crate::diff::action::DiffAction;
use crate::resolve::PolicyResolution;

/// Compares two resolutions and returns the actions needed to reconcile
/// `prev` toward `next`.
///
/// Ordering: every action touching an instance present in
/// `next` is emitted while walking `next.component_processing_order`, so
/// creates and updates happen in dependency order. Deletions, which by
/// definition only reference instances absent from `next`, are then
/// emitted while walking `prev.component_processing_order` — instances are
/// torn down in the same order they were originally brought up, which
/// tends to delete leaves before the roots that depended on them the
/// least. [`DiffAction::ClustersPostProcess`] always comes last.
///
/// Normalization: a single component key yields at most one `Update`
/// action — a component's own parameter change and a cascaded update from
/// one of its components can both target the same key, and only the first
/// is kept — though a key may additionally yield `Attach`/`Detach` actions
/// alongside its `Update` when the same diff pass both changes an
/// instance's rendered output and changes which dependencies reference it.
#[tracing::instrument(name = "diff", skip_all)]
pub fn diff(prev: &PolicyResolution, next: &PolicyResolution) -> Vec<DiffAction> {
    let mut actions = Vec::new();

    for key in &next.component_processing_order {
        let next_instance = match next.instance(key) {
            Some(instance) => instance,
            None => continue,
        };

        match prev.instance(key) {
            None => actions.push(DiffAction::Create(key.clone())),
            Some(prev_instance) => {
                for dependency_name in next_instance
                    .dependency_names
                    .difference(&prev_instance.dependency_names)
                {
                    actions.push(DiffAction::Attach {
                        key: key.clone(),
                        dependency_name: dependency_name.clone(),
                    });
                }
                for dependency_name in prev_instance
                    .dependency_names
                    .difference(&next_instance.dependency_names)
                {
                    actions.push(DiffAction::Detach {
                        key: key.clone(),
                        dependency_name: dependency_name.clone(),
                    });
                }
                if prev_instance.params != next_instance.params || prev_instance.labels != next_instance.labels {
                    actions.push(DiffAction::Update(key.clone()));
                }
                // A component's rendered params feed into its parent
                // service's own output (e.g. endpoint wiring), so a param
                // change cascades into an Update on the parent-service key
                // too, even when the parent's own fields are unchanged.
                if prev_instance.params != next_instance.params {
                    let parent_key = key.parent_service_key();
                    if parent_key != *key {
                        actions.push(DiffAction::Update(parent_key));
                    }
                }
            }
        }
    }

    for key in &prev.component_processing_order {
        if next.instance(key).is_none() {
            actions.push(DiffAction::Delete(key.clone()));
        }
    }

    actions.push(DiffAction::ClustersPostProcess);
    normalize_updates(actions)
}

/// Collapses repeated `Update` actions for the same key down to the first
/// occurrence, preserving the order everything else was emitted in.
fn normalize_updates(actions: Vec<DiffAction>) -> Vec<DiffAction> {
    let mut seen = std::collections::HashSet::new();
    actions
        .into_iter()
        .filter(|action| match action {
            DiffAction::Update(key) => seen.insert(key.clone()),
            _ => true,
        })
        .collect()
}
