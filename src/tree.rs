//! Hierarchical checkbox trees.
//!
//! Trees are built from typed nodes (or from a flat parent-linked list) and
//! validated once: values are unique within a tree and parent links form a
//! forest. `indeterminate` is derived state, recomputed by the cascade
//! propagator and never read back as a source of truth.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{DependencyError, DependencyResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CascadeMode {
    #[default]
    Cascade,
    Independent,
}

impl CascadeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeMode::Cascade => "cascade",
            CascadeMode::Independent => "independent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    Unchecked,
    Indeterminate,
    Checked,
}

impl TriState {
    /// Value of the `aria-checked` attribute for this state.
    pub fn aria(&self) -> &'static str {
        match self {
            TriState::Unchecked => "false",
            TriState::Indeterminate => "mixed",
            TriState::Checked => "true",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing)]
    pub indeterminate: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            checked: false,
            indeterminate: false,
            disabled: false,
            children: Vec::new(),
        }
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn state(&self) -> TriState {
        if self.indeterminate {
            TriState::Indeterminate
        } else if self.checked {
            TriState::Checked
        } else {
            TriState::Unchecked
        }
    }

    /// Depth-first pre-order walk over this node and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TreeNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Resolve an index path into a forest.
pub fn node_at<'a>(nodes: &'a [TreeNode], path: &[usize]) -> Option<&'a TreeNode> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get(*first)?;
    for &i in rest {
        node = node.children.get(i)?;
    }
    Some(node)
}

pub fn node_at_mut<'a>(nodes: &'a mut [TreeNode], path: &[usize]) -> Option<&'a mut TreeNode> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get_mut(*first)?;
    for &i in rest {
        node = node.children.get_mut(i)?;
    }
    Some(node)
}

/// Index path of the node carrying `value`.
pub fn path_of(nodes: &[TreeNode], value: &str) -> Option<Vec<usize>> {
    fn search(nodes: &[TreeNode], value: &str, path: &mut Vec<usize>) -> bool {
        for (i, node) in nodes.iter().enumerate() {
            path.push(i);
            if node.value == value || search(&node.children, value, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    let mut path = Vec::new();
    if search(nodes, value, &mut path) {
        Some(path)
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE
// ═══════════════════════════════════════════════════════════════════════════════

/// Flat, parent-linked description of a tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTreeItem {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxTree {
    id: String,
    mode: CascadeMode,
    pub nodes: Vec<TreeNode>,
}

impl CheckboxTree {
    pub fn new(
        id: impl Into<String>,
        mode: CascadeMode,
        nodes: Vec<TreeNode>,
    ) -> DependencyResult<Self> {
        let id = id.into();
        let mut seen = HashSet::new();
        let mut duplicate = None;
        for root in &nodes {
            root.walk(&mut |node| {
                if !seen.insert(node.value.clone()) && duplicate.is_none() {
                    duplicate = Some(node.value.clone());
                }
            });
        }
        if let Some(value) = duplicate {
            return Err(DependencyError::DuplicateTreeValue { tree: id, value });
        }
        Ok(Self { id, mode, nodes })
    }

    /// Build from a flat list; children keep the order in which they appear.
    pub fn from_flat(
        id: impl Into<String>,
        mode: CascadeMode,
        items: Vec<FlatTreeItem>,
    ) -> DependencyResult<Self> {
        let id = id.into();
        let mut by_value: HashMap<&str, &FlatTreeItem> = HashMap::new();
        for item in &items {
            if by_value.insert(item.value.as_str(), item).is_some() {
                return Err(DependencyError::DuplicateTreeValue {
                    tree: id,
                    value: item.value.clone(),
                });
            }
        }

        for item in &items {
            let mut seen = HashSet::new();
            let mut current = item;
            while let Some(parent) = &current.parent {
                if !seen.insert(current.value.as_str()) {
                    return Err(DependencyError::TreeCycle {
                        tree: id,
                        value: item.value.clone(),
                    });
                }
                current = match by_value.get(parent.as_str()) {
                    Some(p) => *p,
                    None => {
                        return Err(DependencyError::UnknownTreeParent {
                            tree: id,
                            value: current.value.clone(),
                            parent: parent.clone(),
                        })
                    }
                };
            }
        }

        fn assemble(parent: Option<&str>, items: &[FlatTreeItem]) -> Vec<TreeNode> {
            items
                .iter()
                .filter(|item| item.parent.as_deref() == parent)
                .map(|item| TreeNode {
                    value: item.value.clone(),
                    label: item.label.clone(),
                    checked: item.checked,
                    indeterminate: false,
                    disabled: item.disabled,
                    children: assemble(Some(&item.value), items),
                })
                .collect()
        }

        let nodes = assemble(None, &items);
        Ok(Self { id, mode, nodes })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> CascadeMode {
        self.mode
    }

    pub fn node(&self, path: &[usize]) -> Option<&TreeNode> {
        node_at(&self.nodes, path)
    }

    pub fn find(&self, value: &str) -> Option<&TreeNode> {
        path_of(&self.nodes, value).and_then(|p| node_at(&self.nodes, &p))
    }

    pub fn path_of(&self, value: &str) -> Option<Vec<usize>> {
        path_of(&self.nodes, value)
    }

    /// Values of every checked node, in pre-order.
    pub fn checked_values(&self) -> Vec<String> {
        let mut values = Vec::new();
        for root in &self.nodes {
            root.walk(&mut |node| {
                if node.checked {
                    values.push(node.value.clone());
                }
            });
        }
        values
    }
}
