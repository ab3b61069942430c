//! Decision tree classifier stored as JSON
//!
//! ```json
//! {"type": "split", "feature": 2, "threshold": 2.45,
//!  "left":  {"type": "leaf", "label": "setosa"},
//!  "right": {"type": "leaf", "label": "versicolor"}}
//! ```
//!
//! `feature` indexes the canonical measurement order. Vectors with
//! `x[feature] <= threshold` go left.

use serde::{Deserialize, Serialize};

use super::Classifier;
use crate::{IrisError, Measurements, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        label: String,
    },
}

/// Label-only classifier; has no probability output
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    /// Wrap a tree after checking every split is usable
    pub fn new(root: TreeNode) -> Result<Self> {
        let mut stack = vec![&root];
        while let Some(node) = stack.pop() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= Measurements::DIM {
                        return Err(IrisError::InvalidModel(format!(
                            "split on feature {}, only {} exist",
                            feature,
                            Measurements::DIM
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(IrisError::InvalidModel(format!(
                            "non-finite threshold on feature {}",
                            feature
                        )));
                    }
                    stack.push(left.as_ref());
                    stack.push(right.as_ref());
                }
                TreeNode::Leaf { .. } => {}
            }
        }
        Ok(DecisionTree { root })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| IrisError::ModelLoad {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

impl Classifier for DecisionTree {
    fn predict(&self, x: &Measurements) -> Result<String> {
        let values = x.to_array();
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if values[*feature] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
                TreeNode::Leaf { label } => return Ok(label.clone()),
            }
        }
    }

    fn classes(&self) -> Vec<String> {
        let mut labels = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node {
                TreeNode::Split { left, right, .. } => {
                    stack.push(right.as_ref());
                    stack.push(left.as_ref());
                }
                TreeNode::Leaf { label } => {
                    if !labels.contains(label) {
                        labels.push(label.clone());
                    }
                }
            }
        }
        labels
    }

    fn kind(&self) -> &'static str {
        "decision_tree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The classic two-split iris tree on petal length and petal width
    const IRIS_TREE: &str = r#"{
        "type": "split", "feature": 2, "threshold": 2.45,
        "left": {"type": "leaf", "label": "setosa"},
        "right": {
            "type": "split", "feature": 3, "threshold": 1.75,
            "left": {"type": "leaf", "label": "versicolor"},
            "right": {"type": "leaf", "label": "virginica"}
        }
    }"#;

    fn m(values: [f64; 4]) -> Measurements {
        Measurements::checked(values).unwrap()
    }

    #[test]
    fn test_iris_tree_predictions() {
        let tree = DecisionTree::from_json(IRIS_TREE).unwrap();

        assert_eq!(tree.predict(&m([5.1, 3.5, 1.4, 0.2])).unwrap(), "setosa");
        assert_eq!(tree.predict(&m([5.9, 3.0, 4.2, 1.5])).unwrap(), "versicolor");
        assert_eq!(tree.predict(&m([6.3, 3.3, 6.0, 2.5])).unwrap(), "virginica");
    }

    #[test]
    fn test_threshold_goes_left() {
        let tree = DecisionTree::from_json(IRIS_TREE).unwrap();
        assert_eq!(tree.predict(&m([5.0, 3.0, 2.45, 1.0])).unwrap(), "setosa");
    }

    #[test]
    fn test_classes_in_tree_order() {
        let tree = DecisionTree::from_json(IRIS_TREE).unwrap();
        assert_eq!(tree.classes(), vec!["setosa", "versicolor", "virginica"]);
    }

    #[test]
    fn test_rejects_bad_feature() {
        let json = r#"{"type": "split", "feature": 4, "threshold": 1.0,
            "left": {"type": "leaf", "label": "a"},
            "right": {"type": "leaf", "label": "b"}}"#;
        assert!(matches!(
            DecisionTree::from_json(json),
            Err(IrisError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            DecisionTree::from_json(r#"{"type": "branch"}"#),
            Err(IrisError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, IRIS_TREE).unwrap();

        let tree = DecisionTree::load(path.to_str().unwrap()).unwrap();
        assert_eq!(tree.kind(), "decision_tree");
        assert_eq!(tree, DecisionTree::from_json(IRIS_TREE).unwrap());
    }
}
