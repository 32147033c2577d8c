//! Flat binary regression tree shared by both boosters.

use cadena_traits::{CadenaError, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A node in a [`RegressionTree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Terminal node holding an already shrunk output value.
    Leaf {
        /// Contribution added to the ensemble prediction.
        value: f64,
    },
    /// Internal node; rows with `x[feature] <= threshold` go left.
    Split {
        /// Feature column index.
        feature: usize,
        /// Split threshold.
        threshold: f64,
        /// Index of the left child in the node vector.
        left: usize,
        /// Index of the right child in the node vector.
        right: usize,
    },
}

/// A regression tree stored as a node vector, root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// A tree holding a single leaf.
    #[must_use]
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    /// All nodes, root first.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path.
    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Checks the node layout of a loaded tree.
    ///
    /// The tree must be non-empty, split features must be below
    /// `n_features`, and every child index must point forward into the node
    /// vector, which rules out cycles.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(CadenaError::InvalidData("tree has no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            let Node::Split {
                feature,
                threshold,
                left,
                right,
            } = *node
            else {
                continue;
            };
            if feature >= n_features {
                return Err(CadenaError::InvalidData(format!(
                    "node {idx} splits on feature {feature} but the model has {n_features} features"
                )));
            }
            if threshold.is_nan() {
                return Err(CadenaError::InvalidData(format!(
                    "node {idx} has a NaN threshold"
                )));
            }
            for child in [left, right] {
                if child <= idx || child >= self.nodes.len() {
                    return Err(CadenaError::InvalidData(format!(
                        "node {idx} points to child {child} outside {}..{}",
                        idx + 1,
                        self.nodes.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Replaces leaf `idx` with a split and appends two leaf children.
    ///
    /// Returns the indices of the new left and right children.
    pub(crate) fn split_leaf(
        &mut self,
        idx: usize,
        feature: usize,
        threshold: f64,
        left_value: f64,
        right_value: f64,
    ) -> (usize, usize) {
        let left = self.nodes.len();
        let right = left + 1;
        self.nodes.push(Node::Leaf { value: left_value });
        self.nodes.push(Node::Leaf { value: right_value });
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        (left, right)
    }

    /// Sets the value of leaf `idx`; ignored for split nodes.
    pub(crate) fn set_leaf_value(&mut self, idx: usize, new_value: f64) {
        if let Node::Leaf { value } = &mut self.nodes[idx] {
            *value = new_value;
        }
    }

    /// Output for one feature row.
    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}
