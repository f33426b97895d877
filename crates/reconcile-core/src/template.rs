//! Component parameter trees and their label-substitution rendering.
//!
//! A component declares its deployment parameters as a [`ParameterTree`] —
//! a small JSON-shaped value where string leaves may contain `${label}`
//! placeholders. Rendering substitutes every placeholder with the matching
//! entry from a [`LabelSet`].

use std::collections::BTreeMap;

use crate::error::{codes, ErrorCategory, ReconcileError};
use crate::labels::LabelSet;

/// A recursive, tagged-variant parameter value, rendered from declared
/// component parameters against the working label set at resolve time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParameterTree {
    String(String),
    Bool(bool),
    Number(f64),
    List(Vec<ParameterTree>),
    Map(BTreeMap<String, ParameterTree>),
    Null,
}

impl ParameterTree {
    /// Walks the tree depth-first, replacing every `${label}` occurrence in
    /// string leaves with the corresponding label's value. A placeholder
    /// referencing a label absent from `labels` is a hard error: partially
    /// rendered parameters are never handed to a plugin.
    pub fn render(&self, labels: &LabelSet) -> Result<ParameterTree, ReconcileError> {
        match self {
            ParameterTree::String(s) => Ok(ParameterTree::String(substitute(s, labels)?)),
            ParameterTree::Bool(_) | ParameterTree::Number(_) | ParameterTree::Null => {
                Ok(self.clone())
            }
            ParameterTree::List(items) => {
                let rendered = items
                    .iter()
                    .map(|item| item.render(labels))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ParameterTree::List(rendered))
            }
            ParameterTree::Map(entries) => {
                let mut rendered = BTreeMap::new();
                for (key, value) in entries {
                    rendered.insert(key.clone(), value.render(labels)?);
                }
                Ok(ParameterTree::Map(rendered))
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterTree::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Scans `template` for `${...}` placeholders and substitutes each with the
/// matching label's value, left to right, non-overlapping.
fn substitute(template: &str, labels: &LabelSet) -> Result<String, ReconcileError> {
    let mut output = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            let Some(close) = template[i + 2..].find('}') else {
                return Err(ReconcileError::new(
                    codes::EXPRESSION_EVAL_FAILED,
                    ErrorCategory::ExpressionError,
                    format!("unterminated placeholder in template '{template}'"),
                ));
            };
            let key = &template[i + 2..i + 2 + close];
            let value = labels.get(key).ok_or_else(|| {
                ReconcileError::new(
                    codes::EXPRESSION_EVAL_FAILED,
                    ErrorCategory::ExpressionError,
                    format!("template '{template}' references unset label '{key}'"),
                )
            })?;
            output.push_str(value);
            i += 2 + close + 1;
        } else {
            output.push(bytes[i] as char);
            i += 1;
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        let mut l = LabelSet::new();
        for (k, v) in pairs {
            l.set(*k, *v);
        }
        l
    }

    #[test]
    fn renders_nested_placeholders() {
        let tree = ParameterTree::Map(BTreeMap::from([
            (
                "image".to_string(),
                ParameterTree::String("registry/${service}:${version}".to_string()),
            ),
            (
                "replicas".to_string(),
                ParameterTree::List(vec![ParameterTree::String("${region}".to_string())]),
            ),
        ]));
        let l = labels(&[("service", "checkout"), ("version", "1.4.0"), ("region", "us-east")]);
        let rendered = tree.render(&l).unwrap();
        let ParameterTree::Map(map) = rendered else {
            panic!("expected map");
        };
        assert_eq!(
            map["image"].as_str(),
            Some("registry/checkout:1.4.0")
        );
    }

    #[test]
    fn missing_label_is_an_error() {
        let tree = ParameterTree::String("${missing}".to_string());
        assert!(tree.render(&LabelSet::new()).is_err());
    }

    #[test]
    fn non_string_leaves_pass_through() {
        let tree = ParameterTree::Bool(true);
        assert_eq!(tree.render(&LabelSet::new()).unwrap(), ParameterTree::Bool(true));
    }
}
