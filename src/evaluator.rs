//! Server-side visibility evaluation.
//!
//! Evaluates a validated [`DependencyGraph`] against one snapshot of field
//! values. Groups are visited in topological order, so by the time a
//! controller is read, every dependent that contains it has already been
//! decided: a controller inside a hidden dependent is inactive, which hides
//! its own dependents in the same pass (hidden always wins over a stale
//! trigger match).

use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::declaration::{triggers_match, DependencyDeclaration, DependencyGraph};
use crate::error::DependencyResult;
use crate::events::{EventDispatcher, FieldEvent, FieldEventKind};
use crate::field::{active_identifiers, FieldId, FieldKind, FieldValues};

// ═══════════════════════════════════════════════════════════════════════════════
// RESULT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityMap {
    /// Effective visibility of dependents and of every field they contain.
    visible: BTreeMap<FieldId, bool>,
    /// Whether each dependent's own trigger condition matched.
    met: BTreeMap<FieldId, bool>,
    events: Vec<FieldEvent>,
}

impl VisibilityMap {
    /// Fields the dependency graph does not govern are always visible.
    pub fn is_visible(&self, field: &str) -> bool {
        self.visible.get(field).copied().unwrap_or(true)
    }

    pub fn get(&self, field: &str) -> Option<bool> {
        self.visible.get(field).copied()
    }

    pub fn dependency_met(&self, field: &str) -> Option<bool> {
        self.met.get(field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.visible.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn hidden_fields(&self) -> Vec<&str> {
        self.visible
            .iter()
            .filter(|(_, v)| !**v)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Lifecycle signals in evaluation order.
    pub fn events(&self) -> &[FieldEvent] {
        &self.events
    }

    pub fn into_map(self) -> BTreeMap<FieldId, bool> {
        self.visible
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATOR
// ═══════════════════════════════════════════════════════════════════════════════

pub struct VisibilityEvaluator<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> VisibilityEvaluator<'g> {
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    pub fn evaluate(&self, values: &FieldValues) -> VisibilityMap {
        let layout = self.graph.layout();
        let mut met: BTreeMap<FieldId, bool> = BTreeMap::new();

        for group in self.graph.groups() {
            let mut active: Vec<String> = Vec::new();
            let mut reset = false;

            for controller in &group.controllers {
                if !self.reachable(controller, &met) {
                    debug!(%controller, group = %group.name, "controller inside hidden dependent");
                    continue;
                }
                let Some(value) = values.get(controller) else {
                    warn!(
                        %controller,
                        group = %group.name,
                        "controller missing from value snapshot; treated as inactive"
                    );
                    continue;
                };
                let kind = layout
                    .kind_of(controller)
                    .unwrap_or_else(|| FieldKind::infer(value));
                if kind.is_select() && value.is_empty() {
                    reset = true;
                }
                active.extend(active_identifiers(controller, kind, value));
            }

            for dependent in &group.dependents {
                let matched = !reset && triggers_match(&dependent.identifiers, &active);
                met.insert(dependent.field.clone(), matched);
            }
        }

        let mut result = VisibilityMap {
            met,
            ..VisibilityMap::default()
        };
        let mut emitted: HashSet<FieldId> = HashSet::new();

        for group in self.graph.groups() {
            for dependent in &group.dependents {
                let matched = result.met[&dependent.field];
                result.events.push(FieldEvent::new(
                    dependent.field.clone(),
                    if matched {
                        FieldEventKind::DependencyMet
                    } else {
                        FieldEventKind::DependencyNotMet
                    },
                ));

                let mut governed = vec![dependent.field.clone()];
                governed.extend(
                    layout
                        .iter()
                        .filter(|f| {
                            f.id != dependent.field
                                && layout
                                    .ancestors_or_self(&f.id)
                                    .iter()
                                    .any(|a| *a == dependent.field)
                        })
                        .map(|f| f.id.clone()),
                );

                for field in governed {
                    if !emitted.insert(field.clone()) {
                        continue;
                    }
                    let visible = self.reachable(&field, &result.met);
                    result.visible.insert(field.clone(), visible);
                    result.events.push(FieldEvent::new(
                        field,
                        if visible {
                            FieldEventKind::Shown
                        } else {
                            FieldEventKind::Hidden
                        },
                    ));
                }
            }
        }

        result
    }

    /// Evaluate and report every lifecycle signal through `dispatcher`.
    pub fn evaluate_with<C>(
        &self,
        values: &FieldValues,
        dispatcher: &mut EventDispatcher<FieldEvent, C>,
        context: &mut C,
    ) -> VisibilityMap {
        let result = self.evaluate(values);
        for event in result.events() {
            dispatcher.dispatch(event, context);
        }
        result
    }

    /// Evaluate several independent snapshots in parallel.
    pub fn evaluate_batch(&self, snapshots: &[FieldValues]) -> Vec<VisibilityMap> {
        snapshots.par_iter().map(|values| self.evaluate(values)).collect()
    }

    /// A field is reachable when no dependent among itself and its ancestors is hidden.
    fn reachable(&self, field: &str, met: &BTreeMap<FieldId, bool>) -> bool {
        self.graph
            .layout()
            .ancestors_or_self(field)
            .iter()
            .all(|a| met.get(a).copied().unwrap_or(true))
    }
}

/// One-shot evaluation without a field layout; controller kinds are inferred
/// from their values.
pub fn evaluate(
    declarations: &[DependencyDeclaration],
    values: &FieldValues,
) -> DependencyResult<VisibilityMap> {
    let graph = DependencyGraph::from_declarations(declarations.to_vec())?;
    Ok(VisibilityEvaluator::new(&graph).evaluate(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, FieldLayout, FieldValue};

    fn values(pairs: &[(&str, FieldValue)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn account_declarations() -> Vec<DependencyDeclaration> {
        vec![DependencyDeclaration::new(
            "company_size",
            "account_type",
            ["business", "enterprise"],
        )]
    }

    #[test]
    fn test_account_type_scenario() {
        let decls = account_declarations();
        let personal = values(&[("account_type", FieldValue::text("personal"))]);
        let result = evaluate(&decls, &personal).unwrap();
        assert_eq!(result.get("company_size"), Some(false));

        let business = values(&[("account_type", FieldValue::text("business"))]);
        let result = evaluate(&decls, &business).unwrap();
        assert_eq!(result.get("company_size"), Some(true));
    }

    fn chain_graph() -> DependencyGraph {
        let layout = FieldLayout::from_fields(vec![
            Field::new("account_type", FieldKind::Select),
            Field::new("company_size", FieldKind::Select),
            Field::new("procurement_contact", FieldKind::Text),
        ])
        .unwrap();
        DependencyGraph::build(
            vec![
                DependencyDeclaration::new(
                    "company_size",
                    "account_type",
                    ["business", "enterprise"],
                ),
                DependencyDeclaration::new("procurement_contact", "company_size", ["large"]),
            ],
            layout,
        )
        .unwrap()
    }

    #[test]
    fn test_chain_converges_in_one_pass() {
        let graph = chain_graph();
        let evaluator = VisibilityEvaluator::new(&graph);
        let result = evaluator.evaluate(&values(&[
            ("account_type", FieldValue::text("enterprise")),
            ("company_size", FieldValue::text("large")),
        ]));
        assert!(result.is_visible("company_size"));
        assert!(result.is_visible("procurement_contact"));
    }

    #[test]
    fn test_chain_hidden_wins_over_stale_match() {
        let graph = chain_graph();
        let evaluator = VisibilityEvaluator::new(&graph);
        let result = evaluator.evaluate(&values(&[
            ("account_type", FieldValue::text("personal")),
            ("company_size", FieldValue::text("large")),
        ]));
        assert!(!result.is_visible("company_size"));
        assert!(!result.is_visible("procurement_contact"));
        assert_eq!(result.dependency_met("procurement_contact"), Some(false));
    }

    #[test]
    fn test_empty_select_resets_whole_group() {
        let decls = vec![
            DependencyDeclaration::new("vat_id", "country", ["de", "at"]),
            DependencyDeclaration::new("state", "country", ["us"]),
            DependencyDeclaration::new("anything", "country", ["all"]),
        ];
        let result = evaluate(&decls, &values(&[("country", FieldValue::text(""))])).unwrap();
        assert_eq!(result.hidden_fields().len(), 3);

        let result = evaluate(&decls, &values(&[("country", FieldValue::text("us"))])).unwrap();
        assert!(result.is_visible("state"));
        assert!(result.is_visible("anything"));
        assert!(!result.is_visible("vat_id"));
    }

    #[test]
    fn test_missing_controller_is_inactive() {
        let result = evaluate(&account_declarations(), &FieldValues::new()).unwrap();
        assert_eq!(result.get("company_size"), Some(false));
    }

    #[test]
    fn test_nested_fields_follow_container() {
        let layout = FieldLayout::from_fields(vec![
            Field::new("has_company", FieldKind::Checkbox),
            Field::new("company", FieldKind::Group),
            Field::new("company_name", FieldKind::Text).with_parent("company"),
            Field::new("company_type", FieldKind::Select).with_parent("company"),
            Field::new("registry_no", FieldKind::Text),
        ])
        .unwrap();
        let graph = DependencyGraph::build(
            vec![
                DependencyDeclaration::new("company", "has_company", [""]),
                DependencyDeclaration::new("registry_no", "company_type", ["gmbh"]),
            ],
            layout,
        )
        .unwrap();
        let evaluator = VisibilityEvaluator::new(&graph);

        let checked = evaluator.evaluate(&values(&[
            ("has_company", FieldValue::Bool(true)),
            ("company_type", FieldValue::text("gmbh")),
        ]));
        assert!(checked.is_visible("company_name"));
        assert!(checked.is_visible("registry_no"));

        let unchecked = evaluator.evaluate(&values(&[
            ("has_company", FieldValue::Bool(false)),
            ("company_type", FieldValue::text("gmbh")),
        ]));
        assert!(!unchecked.is_visible("company_name"));
        assert!(!unchecked.is_visible("registry_no"));
    }

    #[test]
    fn test_events_report_transitions() {
        let result = evaluate(
            &account_declarations(),
            &values(&[("account_type", FieldValue::text("business"))]),
        )
        .unwrap();
        assert_eq!(
            result.events(),
            &[
                FieldEvent::new("company_size", FieldEventKind::DependencyMet),
                FieldEvent::new("company_size", FieldEventKind::Shown),
            ]
        );
    }

    #[test]
    fn test_batch_matches_sequential() {
        let graph = chain_graph();
        let evaluator = VisibilityEvaluator::new(&graph);
        let snapshots = vec![
            values(&[("account_type", FieldValue::text("business"))]),
            values(&[("account_type", FieldValue::text("personal"))]),
        ];
        let batch = evaluator.evaluate_batch(&snapshots);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], evaluator.evaluate(&snapshots[0]));
        assert!(batch[0].is_visible("company_size"));
        assert!(!batch[1].is_visible("company_size"));
    }
}
