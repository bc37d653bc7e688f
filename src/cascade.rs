//! Tri-state propagation for checkbox trees.
//!
//! ## Cascade Rules
//!
//! 1. Toggling a node sets every enabled descendant to the same state. A
//!    disabled node freezes its whole subtree.
//! 2. Every ancestor of the toggled node, nearest first, is recomputed from its
//!    direct enabled children: none checked → unchecked, all checked →
//!    checked, otherwise indeterminate.
//! 3. Independent mode touches only the toggled node.
//!
//! Disabled nodes are never mutated here; rejecting user toggles of a
//! disabled node is the input layer's job.

use std::collections::HashSet;

use crate::error::{DependencyError, DependencyResult};
use crate::tree::{node_at_mut, CascadeMode, CheckboxTree, TreeNode};

#[derive(Debug, Clone, Copy)]
pub struct CascadePropagator {
    mode: CascadeMode,
}

impl CascadePropagator {
    pub fn new(mode: CascadeMode) -> Self {
        Self { mode }
    }

    pub fn for_tree(tree: &CheckboxTree) -> Self {
        Self::new(tree.mode())
    }

    pub fn mode(&self) -> CascadeMode {
        self.mode
    }

    pub fn on_toggle(
        &self,
        nodes: &mut [TreeNode],
        path: &[usize],
        checked: bool,
    ) -> DependencyResult<()> {
        let node = node_at_mut(nodes, path).ok_or_else(|| DependencyError::InvalidTreePath {
            path: path.to_vec(),
        })?;
        node.checked = checked;
        node.indeterminate = false;

        if self.mode == CascadeMode::Independent {
            return Ok(());
        }

        cascade_down(node, checked);

        for depth in (1..path.len()).rev() {
            if let Some(ancestor) = node_at_mut(nodes, &path[..depth]) {
                recompute_tri_state(ancestor);
            }
        }
        Ok(())
    }

    pub fn toggle(&self, tree: &mut CheckboxTree, path: &[usize], checked: bool) -> DependencyResult<()> {
        self.on_toggle(&mut tree.nodes, path, checked)
    }

    /// Recompute every parent bottom-up; used after loading checked flags from data.
    pub fn normalize(&self, nodes: &mut [TreeNode]) {
        if self.mode == CascadeMode::Independent {
            return;
        }
        for node in nodes.iter_mut() {
            normalize_node(node);
        }
    }

    /// Check exactly the listed values (disabled nodes keep their state).
    pub fn set_checked_values(&self, nodes: &mut [TreeNode], values: &[String]) {
        let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
        for node in nodes.iter_mut() {
            assign(node, &wanted);
        }
        if self.mode == CascadeMode::Cascade {
            for node in nodes.iter_mut() {
                cascade_checked_parents(node);
            }
            self.normalize(nodes);
        }
    }
}

/// Apply rule 2 to a single node with children; leaves are left untouched.
pub fn recompute_tri_state(node: &mut TreeNode) {
    if node.children.is_empty() || node.disabled {
        return;
    }
    let enabled: Vec<&TreeNode> = node.children.iter().filter(|c| !c.disabled).collect();
    if enabled.is_empty() {
        return;
    }
    let checked_count = enabled.iter().filter(|c| c.checked).count();
    if checked_count == 0 {
        node.checked = false;
        node.indeterminate = false;
    } else if checked_count == enabled.len() {
        node.checked = true;
        node.indeterminate = false;
    } else {
        node.checked = false;
        node.indeterminate = true;
    }
}

/// Free-function form of [`CascadePropagator::on_toggle`].
pub fn on_toggle(
    nodes: &mut [TreeNode],
    path: &[usize],
    checked: bool,
    mode: CascadeMode,
) -> DependencyResult<()> {
    CascadePropagator::new(mode).on_toggle(nodes, path, checked)
}

fn cascade_down(node: &mut TreeNode, checked: bool) {
    for child in node.children.iter_mut() {
        if child.disabled {
            continue;
        }
        child.checked = checked;
        child.indeterminate = false;
        cascade_down(child, checked);
    }
}

fn normalize_node(node: &mut TreeNode) {
    if node.disabled {
        return;
    }
    for child in node.children.iter_mut() {
        normalize_node(child);
    }
    recompute_tri_state(node);
}

fn assign(node: &mut TreeNode, wanted: &HashSet<&str>) {
    if !node.disabled {
        node.checked = wanted.contains(node.value.as_str());
        node.indeterminate = false;
    }
    for child in node.children.iter_mut() {
        assign(child, wanted);
    }
}

fn cascade_checked_parents(node: &mut TreeNode) {
    if node.disabled {
        return;
    }
    if node.checked && node.has_children() {
        cascade_down(node, true);
        return;
    }
    for child in node.children.iter_mut() {
        cascade_checked_parents(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TriState;

    fn family() -> Vec<TreeNode> {
        vec![TreeNode::new("parent", "Parent")
            .child(TreeNode::new("child1", "Child 1"))
            .child(TreeNode::new("child2", "Child 2"))]
    }

    #[test]
    fn test_parent_becomes_indeterminate_then_checked() {
        let mut nodes = family();
        let propagator = CascadePropagator::new(CascadeMode::Cascade);

        propagator.on_toggle(&mut nodes, &[0, 0], true).unwrap();
        assert!(nodes[0].indeterminate);
        assert!(!nodes[0].checked);

        propagator.on_toggle(&mut nodes, &[0, 1], true).unwrap();
        assert!(nodes[0].checked);
        assert!(!nodes[0].indeterminate);
    }

    #[test]
    fn test_root_toggle_reaches_every_descendant() {
        let mut nodes = vec![TreeNode::new("root", "Root")
            .child(TreeNode::new("a", "A").child(TreeNode::new("a1", "A1")))
            .child(TreeNode::new("b", "B"))];
        on_toggle(&mut nodes, &[0], true, CascadeMode::Cascade).unwrap();
        let mut all = Vec::new();
        nodes[0].walk(&mut |n| all.push(n.checked));
        assert!(all.iter().all(|c| *c));

        on_toggle(&mut nodes, &[0], false, CascadeMode::Cascade).unwrap();
        let mut any = false;
        nodes[0].walk(&mut |n| any |= n.checked || n.indeterminate);
        assert!(!any);
    }

    #[test]
    fn test_disabled_child_is_exempt() {
        let mut nodes = vec![TreeNode::new("parent", "Parent")
            .child(TreeNode::new("locked", "Locked").disabled(true))
            .child(TreeNode::new("open", "Open"))];
        on_toggle(&mut nodes, &[0], true, CascadeMode::Cascade).unwrap();
        assert!(!nodes[0].children[0].checked);
        assert!(nodes[0].children[1].checked);

        // Only the enabled child counts towards the parent.
        on_toggle(&mut nodes, &[0, 1], false, CascadeMode::Cascade).unwrap();
        assert_eq!(nodes[0].state(), TriState::Unchecked);
        on_toggle(&mut nodes, &[0, 1], true, CascadeMode::Cascade).unwrap();
        assert_eq!(nodes[0].state(), TriState::Checked);
    }

    #[test]
    fn test_independent_mode_isolation() {
        let mut nodes = family();
        on_toggle(&mut nodes, &[0], true, CascadeMode::Independent).unwrap();
        assert!(nodes[0].checked);
        assert!(!nodes[0].children[0].checked && !nodes[0].children[1].checked);

        on_toggle(&mut nodes, &[0, 0], false, CascadeMode::Independent).unwrap();
        assert!(nodes[0].checked);
        assert!(!nodes[0].indeterminate);
    }

    #[test]
    fn test_only_direct_children_count() {
        // grandchild checked -> child indeterminate, root counts child as unchecked
        let mut nodes = vec![TreeNode::new("root", "Root").child(
            TreeNode::new("child", "Child")
                .child(TreeNode::new("g1", "G1"))
                .child(TreeNode::new("g2", "G2")),
        )];
        on_toggle(&mut nodes, &[0, 0, 0], true, CascadeMode::Cascade).unwrap();
        assert_eq!(nodes[0].children[0].state(), TriState::Indeterminate);
        assert_eq!(nodes[0].state(), TriState::Unchecked);
    }

    #[test]
    fn test_invalid_path() {
        let mut nodes = family();
        let err = on_toggle(&mut nodes, &[0, 7], true, CascadeMode::Cascade).unwrap_err();
        assert_eq!(err, DependencyError::InvalidTreePath { path: vec![0, 7] });
    }

    #[test]
    fn test_set_checked_values_cascades_parents() {
        let mut nodes = vec![
            TreeNode::new("users", "Users")
                .child(TreeNode::new("users.read", "Read"))
                .child(TreeNode::new("users.write", "Write")),
            TreeNode::new("billing", "Billing")
                .child(TreeNode::new("billing.read", "Read"))
                .child(TreeNode::new("billing.write", "Write")),
        ];
        let propagator = CascadePropagator::new(CascadeMode::Cascade);
        propagator.set_checked_values(
            &mut nodes,
            &["users".to_string(), "billing.read".to_string()],
        );
        assert_eq!(nodes[0].state(), TriState::Checked);
        assert!(nodes[0].children.iter().all(|c| c.checked));
        assert_eq!(nodes[1].state(), TriState::Indeterminate);
    }

    #[test]
    fn test_normalize_from_loaded_data() {
        let mut nodes = vec![TreeNode::new("p", "P")
            .checked(true)
            .child(TreeNode::new("c1", "C1").checked(true))
            .child(TreeNode::new("c2", "C2"))];
        CascadePropagator::new(CascadeMode::Cascade).normalize(&mut nodes);
        assert_eq!(nodes[0].state(), TriState::Indeterminate);
    }
}
