//! Dependency declarations and the validated dependency graph.
//!
//! ## Key Invariants
//!
//! 1. **Immutable edges**: declarations are assembled by the form builder and
//!    never change afterwards.
//! 2. **One group per dependent**: a dependent field is batched with exactly one
//!    group; several declarations inside that group are OR-combined.
//! 3. **DAG**: group `G` precedes group `H` when a dependent of `G` contains (or
//!    is) a controller of `H`. Cycles are rejected when the graph is built, so
//!    evaluation can never loop.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use crate::error::{DependencyError, DependencyResult};
use crate::field::{identifier, FieldId, FieldLayout, TRIGGER_ALL};

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDeclaration {
    pub dependent_field: FieldId,
    pub controller_field: FieldId,
    /// Raw controller values that reveal the dependent (`"all"` matches any).
    pub trigger_values: BTreeSet<String>,
    /// Scoping group, defaults to the controller field.
    #[serde(default)]
    pub group: Option<String>,
}

impl DependencyDeclaration {
    pub fn new<I, S>(dependent: impl Into<String>, controller: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dependent_field: dependent.into(),
            controller_field: controller.into(),
            trigger_values: values.into_iter().map(Into::into).collect(),
            group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.controller_field)
    }

    /// Wire identifiers (`controller-value`) this declaration accepts.
    pub fn trigger_identifiers(&self) -> BTreeSet<String> {
        self.trigger_values
            .iter()
            .map(|v| {
                if v == TRIGGER_ALL {
                    TRIGGER_ALL.to_string()
                } else {
                    identifier(&self.controller_field, v)
                }
            })
            .collect()
    }
}

/// Trigger-match rule shared by the server evaluator and the reactive controller.
pub fn triggers_match(triggers: &BTreeSet<String>, active: &[String]) -> bool {
    if active.is_empty() {
        return false;
    }
    triggers.contains(TRIGGER_ALL) || active.iter().any(|id| triggers.contains(id))
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentNode {
    pub field: FieldId,
    pub identifiers: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub name: String,
    pub controllers: Vec<FieldId>,
    pub dependents: Vec<DependentNode>,
}

/// Validated, topologically ordered view over a declaration set.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    declarations: Vec<DependencyDeclaration>,
    layout: FieldLayout,
    /// Groups in evaluation order.
    groups: Vec<GroupNode>,
    group_index: HashMap<String, usize>,
    dependent_group: HashMap<FieldId, String>,
}

impl DependencyGraph {
    pub fn build(
        declarations: Vec<DependencyDeclaration>,
        layout: FieldLayout,
    ) -> DependencyResult<Self> {
        let mut groups: Vec<GroupNode> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut dependent_group: HashMap<FieldId, String> = HashMap::new();

        for decl in &declarations {
            if decl.dependent_field == decl.controller_field {
                return Err(DependencyError::SelfDependency {
                    field: decl.dependent_field.clone(),
                });
            }
            if decl.trigger_values.is_empty() {
                warn!(
                    dependent = %decl.dependent_field,
                    controller = %decl.controller_field,
                    "declaration has no trigger values; dependent stays hidden"
                );
            }

            let group = decl.group().to_string();
            match dependent_group.get(&decl.dependent_field) {
                Some(existing) if *existing != group => {
                    return Err(DependencyError::GroupConflict {
                        field: decl.dependent_field.clone(),
                        first: existing.clone(),
                        second: group,
                    });
                }
                _ => {
                    dependent_group.insert(decl.dependent_field.clone(), group.clone());
                }
            }

            let slot = *index.entry(group.clone()).or_insert_with(|| {
                groups.push(GroupNode {
                    name: group.clone(),
                    controllers: Vec::new(),
                    dependents: Vec::new(),
                });
                groups.len() - 1
            });
            let node = &mut groups[slot];
            if !node.controllers.contains(&decl.controller_field) {
                node.controllers.push(decl.controller_field.clone());
            }
            let triggers = decl.trigger_identifiers();
            match node
                .dependents
                .iter_mut()
                .find(|d| d.field == decl.dependent_field)
            {
                Some(existing) => existing.identifiers.extend(triggers),
                None => node.dependents.push(DependentNode {
                    field: decl.dependent_field.clone(),
                    identifiers: triggers,
                }),
            }
        }

        // Edges: group of a containing dependent -> group of the contained controller.
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
        for (target, group) in groups.iter().enumerate() {
            for controller in &group.controllers {
                for container in layout.ancestors_or_self(controller) {
                    if let Some(source_group) = dependent_group.get(&container) {
                        let source = index[source_group];
                        if !edges[source].contains(&target) {
                            edges[source].push(target);
                        }
                    }
                }
            }
        }

        let names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        let order = topological_order(&names, &edges)?;
        let mut ordered = Vec::with_capacity(groups.len());
        let mut slots: Vec<Option<GroupNode>> = groups.into_iter().map(Some).collect();
        for i in order {
            if let Some(group) = slots[i].take() {
                ordered.push(group);
            }
        }
        let group_index = ordered
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.clone(), i))
            .collect();

        Ok(Self {
            declarations,
            layout,
            groups: ordered,
            group_index,
            dependent_group,
        })
    }

    /// Graph over declarations alone, without containment information.
    pub fn from_declarations(declarations: Vec<DependencyDeclaration>) -> DependencyResult<Self> {
        Self::build(declarations, FieldLayout::new())
    }

    pub fn declarations(&self) -> &[DependencyDeclaration] {
        &self.declarations
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Groups in evaluation (topological) order.
    pub fn groups(&self) -> &[GroupNode] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&GroupNode> {
        self.group_index.get(name).map(|&i| &self.groups[i])
    }

    pub fn group_of(&self, dependent: &str) -> Option<&str> {
        self.dependent_group.get(dependent).map(String::as_str)
    }

    pub fn is_dependent(&self, field: &str) -> bool {
        self.dependent_group.contains_key(field)
    }

    pub fn is_controller(&self, field: &str) -> bool {
        self.groups
            .iter()
            .any(|g| g.controllers.iter().any(|c| c == field))
    }

    /// Groups driven by the given controller, in evaluation order.
    pub fn controller_groups(&self, field: &str) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|g| g.controllers.iter().any(|c| c == field))
            .map(|g| g.name.as_str())
            .collect()
    }

    /// Accepted identifiers for a dependent (the `data-dependend` list).
    pub fn dependent_identifiers(&self, field: &str) -> Option<&BTreeSet<String>> {
        let group = self.group(self.group_of(field)?)?;
        group
            .dependents
            .iter()
            .find(|d| d.field == field)
            .map(|d| &d.identifiers)
    }
}

/// Reverse post-order over `edges`; a back edge is reported as a named cycle.
pub(crate) fn topological_order(
    names: &[String],
    edges: &[Vec<usize>],
) -> DependencyResult<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        White,
        Gray,
        Black,
    }

    fn visit(
        node: usize,
        names: &[String],
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        post: &mut Vec<usize>,
    ) -> DependencyResult<()> {
        marks[node] = Mark::Gray;
        stack.push(node);
        for &next in &edges[node] {
            match marks[next] {
                Mark::Gray => {
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|&n| names[n].clone()).collect();
                    path.push(names[next].clone());
                    return Err(DependencyError::Cycle { path });
                }
                Mark::White => visit(next, names, edges, marks, stack, post)?,
                Mark::Black => {}
            }
        }
        stack.pop();
        marks[node] = Mark::Black;
        post.push(node);
        Ok(())
    }

    let mut marks = vec![Mark::White; names.len()];
    let mut post = Vec::with_capacity(names.len());
    let mut stack = Vec::new();
    for node in 0..names.len() {
        if marks[node] == Mark::White {
            visit(node, names, edges, &mut marks, &mut stack, &mut post)?;
        }
    }
    post.reverse();
    Ok(post)
}
