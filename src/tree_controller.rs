//! Binds a rendered `[data-checkbox-tree]` container to a [`CheckboxTree`].
//!
//! The model is read back from markup (`li[data-tree-node]` items holding an
//! `input[data-tree-checkbox]`, nested under `ul`), driven through the
//! cascade propagator, and written back as `checked`, the `indeterminate`
//! property and `aria-checked`.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::cascade::CascadePropagator;
use crate::dom::{Document, NodeId};
use crate::error::{DependencyError, DependencyResult};
use crate::markup::{ATTR_TREE, ATTR_TREE_CHECKBOX, ATTR_TREE_NODE};
use crate::tree::{CascadeMode, CheckboxTree, TreeNode};

#[derive(Debug, Clone)]
pub struct TreeBinding {
    tree: CheckboxTree,
    container: NodeId,
    inputs: BTreeMap<String, NodeId>,
}

impl TreeBinding {
    /// Read the tree rendered for `tree_id`. A missing container is logged and yields `None`.
    pub fn bind(
        document: &mut Document,
        tree_id: &str,
        mode: CascadeMode,
    ) -> DependencyResult<Option<Self>> {
        let Some(container) = document.find_by_attr(ATTR_TREE, tree_id) else {
            warn!(tree = tree_id, "checkbox tree container not found");
            return Ok(None);
        };

        let mut inputs = BTreeMap::new();
        let nodes = match document
            .descendants(container)
            .into_iter()
            .find(|id| document.tag(*id) == Some("ul"))
        {
            Some(list) => read_items(document, list, &mut inputs),
            None => Vec::new(),
        };

        let tree = CheckboxTree::new(tree_id, mode, nodes)?;
        let mut binding = Self {
            tree,
            container,
            inputs,
        };
        CascadePropagator::for_tree(&binding.tree).normalize(&mut binding.tree.nodes);
        binding.write_back(document);
        debug!(tree = tree_id, nodes = binding.inputs.len(), "checkbox tree bound");
        Ok(Some(binding))
    }

    pub fn tree_id(&self) -> &str {
        self.tree.id()
    }

    pub fn tree(&self) -> &CheckboxTree {
        &self.tree
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn owns(&self, input: NodeId) -> bool {
        self.inputs.values().any(|id| *id == input)
    }

    pub fn input_for(&self, value: &str) -> Option<NodeId> {
        self.inputs.get(value).copied()
    }

    /// Apply a toggle coming from the checkbox `input`, whose new state is `checked`.
    ///
    /// Disabled nodes are rejected here and their checkbox is restored.
    pub fn toggle_input(
        &mut self,
        document: &mut Document,
        input: NodeId,
        checked: bool,
    ) -> DependencyResult<Vec<String>> {
        let Some(value) = self
            .inputs
            .iter()
            .find(|(_, id)| **id == input)
            .map(|(v, _)| v.clone())
        else {
            warn!(tree = self.tree_id(), input, "checkbox is not part of this tree");
            return Ok(self.checked_values());
        };
        self.toggle(document, &value, checked)
    }

    pub fn toggle(
        &mut self,
        document: &mut Document,
        value: &str,
        checked: bool,
    ) -> DependencyResult<Vec<String>> {
        let Some(path) = self.tree.path_of(value) else {
            warn!(tree = self.tree_id(), value, "unknown tree value");
            return Ok(self.checked_values());
        };
        if self.tree.node(&path).is_some_and(|n| n.disabled) {
            self.write_back(document);
            return Err(DependencyError::DisabledTreeNode {
                tree: self.tree_id().to_string(),
                value: value.to_string(),
            });
        }
        CascadePropagator::for_tree(&self.tree).toggle(&mut self.tree, &path, checked)?;
        self.write_back(document);
        Ok(self.checked_values())
    }

    pub fn checked_values(&self) -> Vec<String> {
        self.tree.checked_values()
    }

    pub fn set_checked_values(&mut self, document: &mut Document, values: &[String]) -> Vec<String> {
        CascadePropagator::for_tree(&self.tree).set_checked_values(&mut self.tree.nodes, values);
        self.write_back(document);
        self.checked_values()
    }

    fn write_back(&self, document: &mut Document) {
        for root in &self.tree.nodes {
            root.walk(&mut |node| {
                if let Some(&input) = self.inputs.get(&node.value) {
                    document.set_checked(input, node.checked);
                    document.set_indeterminate(input, node.indeterminate);
                    document.set_attr(input, "aria-checked", node.state().aria());
                }
            });
        }
    }
}

fn read_items(
    document: &Document,
    list: NodeId,
    inputs: &mut BTreeMap<String, NodeId>,
) -> Vec<TreeNode> {
    let mut nodes = Vec::new();
    for item in document.child_elements(list) {
        let Some(value) = document.attr(item, ATTR_TREE_NODE).map(str::to_string) else {
            continue;
        };

        // Direct content of this item only; nested lists belong to the children.
        let own: Vec<NodeId> = document
            .descendants(item)
            .into_iter()
            .filter(|id| {
                document
                    .ancestors(*id)
                    .into_iter()
                    .find(|a| document.has_attr(*a, ATTR_TREE_NODE))
                    == Some(item)
            })
            .collect();

        let input = own
            .iter()
            .copied()
            .find(|id| document.has_attr(*id, ATTR_TREE_CHECKBOX));
        let label = own
            .iter()
            .copied()
            .find(|id| document.tag(*id) == Some("label"))
            .map(|l| document.text_content(l).trim().to_string())
            .unwrap_or_else(|| value.clone());

        let mut node = TreeNode::new(value.clone(), label);
        if let Some(input) = input {
            node.checked = document.checked(input);
            // Authored state only; the controller may have disabled the input
            // because its wrapper is hidden.
            node.disabled = document.has_attr(input, "disabled");
            inputs.insert(value, input);
        }
        if let Some(sublist) = document
            .child_elements(item)
            .into_iter()
            .find(|c| document.tag(*c) == Some("ul"))
        {
            node.children = read_items(document, sublist, inputs);
        }
        nodes.push(node);
    }
    nodes
}
