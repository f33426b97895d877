//! Services and service components, including the deterministic topological
//! ordering used to decide component processing order.

use std::cell::OnceCell;
use std::collections::HashMap;

use crate::error::{codes, ErrorCategory, ReconcileError};
use crate::labels::{LabelOperations, LabelSet};
use crate::template::ParameterTree;

/// What a component actually does once instantiated.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ComponentCode {
    /// Delegates to another contract, creating a dependency edge that the
    /// resolver expands recursively.
    Contract { name: String },
    /// A deployable unit handled by a registered
    /// [`CodePlugin`](crate::apply::plugin::CodePlugin) keyed by `code_type`.
    Code {
        code_type: String,
        params: ParameterTree,
    },
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ServiceComponent {
    pub name: String,
    pub code: ComponentCode,
    /// Names of sibling components within the same service that must be
    /// processed before this one.
    pub dependencies: Vec<String>,
    pub change_labels: LabelOperations,
}

impl ServiceComponent {
    pub fn new(name: impl Into<String>, code: ComponentCode) -> Self {
        Self {
            name: name.into(),
            code,
            dependencies: Vec::new(),
            change_labels: LabelOperations::default(),
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Service {
    pub name: String,
    pub owner: String,
    pub labels: LabelSet,
    pub components: Vec<ServiceComponent>,
    /// Applied once to the working label set before any component is
    /// visited, ahead of every per-component `change_labels`.
    pub change_labels: LabelOperations,
    #[serde(skip)]
    sorted_order: OnceCell<Vec<usize>>,
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.owner == other.owner
            && self.labels == other.labels
            && self.components.iter().map(|c| &c.name).eq(other.components.iter().map(|c| &c.name))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl Service {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            labels: LabelSet::new(),
            components: Vec::new(),
            change_labels: LabelOperations::default(),
            sorted_order: OnceCell::new(),
        }
    }

    pub fn component(&self, name: &str) -> Option<&ServiceComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Components in dependency order: every component appears after all
    /// of its `dependencies`. Memoized after the first call since a
    /// [`Service`] is immutable once registered with a policy.
    pub fn components_sorted(&self) -> Result<&[usize], ReconcileError> {
        if let Some(order) = self.sorted_order.get() {
            return Ok(order);
        }
        let order = topological_sort(self)?;
        Ok(self.sorted_order.get_or_init(|| order))
    }

    pub fn components_in_order(&self) -> Result<Vec<&ServiceComponent>, ReconcileError> {
        Ok(self
            .components_sorted()?
            .iter()
            .map(|&idx| &self.components[idx])
            .collect())
    }
}

fn topological_sort(service: &Service) -> Result<Vec<usize>, ReconcileError> {
    let index_by_name: HashMap<&str, usize> = service
        .components
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    let mut color = vec![Color::White; service.components.len()];
    let mut order = Vec::with_capacity(service.components.len());

    for start in 0..service.components.len() {
        if color[start] == Color::White {
            visit(service, start, &index_by_name, &mut color, &mut order)?;
        }
    }

    Ok(order)
}

fn visit(
    service: &Service,
    node: usize,
    index_by_name: &HashMap<&str, usize>,
    color: &mut [Color],
    order: &mut Vec<usize>,
) -> Result<(), ReconcileError> {
    color[node] = Color::Gray;
    for dep_name in &service.components[node].dependencies {
        let Some(&dep_idx) = index_by_name.get(dep_name.as_str()) else {
            return Err(ReconcileError::new(
                codes::POLICY_MISSING_COMPONENT,
                ErrorCategory::PolicyMalformed,
                format!(
                    "service '{}' component '{}' depends on unknown component '{}'",
                    service.name, service.components[node].name, dep_name
                ),
            ));
        };
        match color[dep_idx] {
            Color::White => visit(service, dep_idx, index_by_name, color, order)?,
            Color::Gray => {
                return Err(ReconcileError::new(
                    codes::POLICY_COMPONENT_CYCLE,
                    ErrorCategory::PolicyMalformed,
                    format!(
                        "service '{}' has a component dependency cycle involving '{}'",
                        service.name, service.components[dep_idx].name
                    ),
                ))
            }
            Color::Black => {}
        }
    }
    color[node] = Color::Black;
    order.push(node);
    Ok(())
}
