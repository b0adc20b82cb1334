//! Label selector rendering
//!
//! Workload objects carry their pod selector either as a plain label map
//! (replication controllers, deployment configs) or as a `LabelSelector`
//! (apps/v1 and batch/v1 kinds). Both are rendered into the string syntax
//! accepted by the `labelSelector` list parameter.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use thiserror::Error;

/// A selector requirement that has no string form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported label selector operator \"{operator}\" for key \"{key}\"")]
pub struct SelectorError {
    pub key: String,
    pub operator: String,
}

/// Render a label map as `key=value,...` in key order
pub fn from_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a `LabelSelector`, including its match expressions.
///
/// Fails on an operator it cannot express rather than dropping the
/// requirement, which would widen the selection.
pub fn from_label_selector(selector: &LabelSelector) -> Result<String, SelectorError> {
    let mut terms = Vec::new();

    if let Some(labels) = &selector.match_labels {
        if !labels.is_empty() {
            terms.push(from_labels(labels));
        }
    }

    for req in selector.match_expressions.iter().flatten() {
        let values = req.values.clone().unwrap_or_default().join(",");
        let term = match req.operator.as_str() {
            "In" => format!("{} in ({})", req.key, values),
            "NotIn" => format!("{} notin ({})", req.key, values),
            "Exists" => req.key.clone(),
            "DoesNotExist" => format!("!{}", req.key),
            other => {
                return Err(SelectorError {
                    key: req.key.clone(),
                    operator: other.to_string(),
                })
            }
        };
        terms.push(term);
    }

    Ok(terms.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_labels_are_sorted() {
        let map = labels(&[("tier", "web"), ("app", "shop")]);
        assert_eq!(from_labels(&map), "app=shop,tier=web");
    }

    #[test]
    fn test_match_expressions() {
        let selector = LabelSelector {
            match_labels: Some(labels(&[("app", "shop")])),
            match_expressions: Some(vec![
                LabelSelectorRequirement {
                    key: "env".into(),
                    operator: "In".into(),
                    values: Some(vec!["prod".into(), "stage".into()]),
                },
                LabelSelectorRequirement {
                    key: "canary".into(),
                    operator: "DoesNotExist".into(),
                    values: None,
                },
                LabelSelectorRequirement {
                    key: "track".into(),
                    operator: "Exists".into(),
                    values: None,
                },
                LabelSelectorRequirement {
                    key: "zone".into(),
                    operator: "NotIn".into(),
                    values: Some(vec!["b".into()]),
                },
            ]),
        };

        assert_eq!(
            from_label_selector(&selector).unwrap(),
            "app=shop,env in (prod,stage),!canary,track,zone notin (b)"
        );
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let selector = LabelSelector {
            match_labels: Some(labels(&[("app", "shop")])),
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "env".into(),
                operator: "Gt".into(),
                values: Some(vec!["1".into()]),
            }]),
        };

        let err = from_label_selector(&selector).unwrap_err();
        assert_eq!(err.key, "env");
        assert_eq!(err.operator, "Gt");
    }

    #[test]
    fn test_empty_selector() {
        assert_eq!(from_label_selector(&LabelSelector::default()).unwrap(), "");
    }
}
