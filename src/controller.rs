//! Client-side reactive controller.
//!
//! Owns a parsed [`Document`] and re-runs the visibility rule whenever a
//! controller input changes. Work for one change runs depth-first to
//! completion before `handle_change` returns:
//!
//! ## Key Invariants
//!
//! 1. **Group evaluation**: the group's active identifiers are the union over
//!    its reachable controllers; an empty reachable select resets the group.
//! 2. **Chain cascade**: a wrapper that changes visibility re-evaluates every
//!    group whose controllers or dependents it contains, so a show picks up
//!    nested controllers that already hold a value and a hide is transitive.
//! 3. **Side-effect order**: show enables inputs before the transition; hide
//!    disables and clears only in the finalize step.
//! 4. **Cancellation**: each wrapper has at most one pending finalize; a new
//!    transition for the same wrapper replaces it.
//! 5. **Fail-safe**: missing elements are logged and ignored.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, error, warn};

use crate::animation::{
    AnimationConfig, AnimationPolicy, AnimationStep, Direction, FinalizeStep, StyleMutation,
    Timeline,
};
use crate::declaration::{topological_order, triggers_match};
use crate::dom::{Document, NodeId};
use crate::error::{DependencyError, DependencyResult};
use crate::events::{EventDispatcher, FieldEvent, FieldEventKind, Listener, ListenerId};
use crate::field::{active_identifiers, FieldKind, FieldValue};
use crate::markup::{
    ATTR_CONTROLLER, ATTR_CONTROLLER_FIELD, ATTR_CONTROLLER_GROUP, ATTR_DEPENDENT,
    ATTR_DEPENDENT_FIELD, ATTR_DEPENDENT_GROUP, ATTR_REPEATER, ATTR_REPEATER_PROTOTYPE,
    ATTR_REPEATER_ROW, ATTR_TREE_CHECKBOX, INDEX_PLACEHOLDER,
};
use crate::tree::CascadeMode;
use crate::tree_controller::TreeBinding;

/// Guard against cycles that slipped past the attach-time check.
pub const MAX_CASCADE_DEPTH: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeConfig {
    pub tree_id: String,
    #[serde(default)]
    pub mode: CascadeMode,
}

/// Per-form controller configuration, embedded verbatim in the generated script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    pub form_id: String,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub trees: Vec<TreeConfig>,
}

impl ControllerConfig {
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            animation: AnimationConfig::default(),
            trees: Vec::new(),
        }
    }

    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_tree(mut self, tree_id: impl Into<String>, mode: CascadeMode) -> Self {
        self.trees.push(TreeConfig {
            tree_id: tree_id.into(),
            mode,
        });
        self
    }

    pub fn from_json(json: &str) -> DependencyResult<Self> {
        serde_json::from_str(json).map_err(|e| DependencyError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROLLER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Evaluating,
}

/// Custom DOM event raised by the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomEvent {
    pub target: NodeId,
    pub name: String,
    pub detail: serde_json::Value,
}

pub struct ReactiveController {
    document: Document,
    config: ControllerConfig,
    form: NodeId,
    policy: AnimationPolicy,
    timeline: Timeline<NodeId>,
    state: ControllerState,
    /// Current target visibility of each dependent wrapper.
    visible: HashMap<NodeId, bool>,
    dispatcher: EventDispatcher<FieldEvent, Document>,
    trees: Vec<TreeBinding>,
    events: Vec<DomEvent>,
    immediate: bool,
}

impl ReactiveController {
    /// Bind to the form `config.form_id` and derive its initial state.
    pub fn attach(document: Document, config: ControllerConfig) -> DependencyResult<Self> {
        let form = document
            .find_by_attr("id", &config.form_id)
            .ok_or_else(|| DependencyError::FormNotFound {
                form_id: config.form_id.clone(),
            })?;
        let mut controller = Self {
            policy: AnimationPolicy::new(config.animation.clone()),
            document,
            config,
            form,
            timeline: Timeline::new(),
            state: ControllerState::Idle,
            visible: HashMap::new(),
            dispatcher: EventDispatcher::new(),
            trees: Vec::new(),
            events: Vec::new(),
            immediate: false,
        };
        controller.check_group_cycles()?;
        controller.initialize()?;
        Ok(controller)
    }

    /// Derive state from the values already present in the markup.
    ///
    /// Runs without transitions. Calling it again leaves the state unchanged.
    pub fn initialize(&mut self) -> DependencyResult<()> {
        self.register_wrappers(self.form);

        self.trees.clear();
        for tree in self.config.trees.clone() {
            if let Some(binding) = TreeBinding::bind(&mut self.document, &tree.tree_id, tree.mode)? {
                self.trees.push(binding);
            }
        }

        self.immediate = true;
        self.evaluate_scope(self.form);
        self.immediate = false;
        Ok(())
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DomEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn subscribe(
        &mut self,
        priority: i32,
        listener: Box<dyn Listener<FieldEvent, Document>>,
    ) -> ListenerId {
        self.dispatcher.register(priority, listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.dispatcher.unregister(id)
    }

    pub fn has_pending_transitions(&self) -> bool {
        self.timeline.has_pending()
    }

    /// First control of the form bound to `field` (by dependency field or name).
    pub fn control(&self, field: &str) -> Option<NodeId> {
        self.document.form_controls(self.form).into_iter().find(|id| {
            self.document.attr(*id, ATTR_CONTROLLER_FIELD) == Some(field)
                || self.document.attr(*id, "name") == Some(field)
        })
    }

    pub fn wrapper(&self, field: &str) -> Option<NodeId> {
        self.document
            .with_attr(self.form, ATTR_DEPENDENT_FIELD)
            .into_iter()
            .find(|id| self.document.attr(*id, ATTR_DEPENDENT_FIELD) == Some(field))
    }

    /// Target visibility of a dependent field; `None` if it has no wrapper.
    pub fn is_visible(&self, field: &str) -> Option<bool> {
        self.wrapper(field)
            .map(|w| self.visible.get(&w).copied().unwrap_or(true))
    }

    pub fn visibility(&self) -> BTreeMap<String, bool> {
        self.wrappers_in(self.form)
            .into_iter()
            .filter_map(|w| {
                let field = self.document.attr(w, ATTR_DEPENDENT_FIELD)?;
                Some((field.to_string(), self.visible.get(&w).copied().unwrap_or(true)))
            })
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INPUT
    // ═══════════════════════════════════════════════════════════════════════════

    /// React to a `change`/`input` event on `target`.
    pub fn handle_change(&mut self, target: NodeId) -> DependencyResult<()> {
        if self.document.element(target).is_none() || !self.document.is_attached(target) {
            warn!(target, "change target not found in document");
            return Ok(());
        }
        self.state = ControllerState::Evaluating;
        let result = self.dispatch_change(target);
        self.state = ControllerState::Idle;
        result
    }

    pub fn set_value(&mut self, target: NodeId, value: &str) -> DependencyResult<()> {
        self.document.set_value(target, value);
        self.handle_change(target)
    }

    pub fn set_checked(&mut self, target: NodeId, checked: bool) -> DependencyResult<()> {
        self.document.set_checked(target, checked);
        self.handle_change(target)
    }

    pub fn select(&mut self, target: NodeId, values: &[&str]) -> DependencyResult<()> {
        self.document
            .set_selected(target, values.iter().map(|v| v.to_string()).collect());
        self.handle_change(target)
    }

    fn dispatch_change(&mut self, target: NodeId) -> DependencyResult<()> {
        if self.document.has_attr(target, ATTR_TREE_CHECKBOX) {
            if let Some(i) = self.trees.iter().position(|t| t.owns(target)) {
                let checked = self.document.checked(target);
                let values = self.trees[i].toggle_input(&mut self.document, target, checked)?;
                self.emit_tree_change(i, values);
            }
        }

        if self.document.attr(target, ATTR_CONTROLLER) == Some("true") {
            for group in self.groups_of(target) {
                self.evaluate_group(&group, 0);
            }
        } else {
            debug!(target, "changed element is not a dependency controller");
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TREES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn tree(&self, tree_id: &str) -> Option<&TreeBinding> {
        self.trees.iter().find(|t| t.tree_id() == tree_id)
    }

    pub fn tree_checked_values(&self, tree_id: &str) -> Option<Vec<String>> {
        self.tree(tree_id).map(TreeBinding::checked_values)
    }

    pub fn set_tree_checked_values(&mut self, tree_id: &str, values: &[String]) -> bool {
        let Some(i) = self.trees.iter().position(|t| t.tree_id() == tree_id) else {
            warn!(tree = tree_id, "unknown checkbox tree");
            return false;
        };
        let values = self.trees[i].set_checked_values(&mut self.document, values);
        self.emit_tree_change(i, values);
        true
    }

    fn emit_tree_change(&mut self, index: usize, values: Vec<String>) {
        let binding = &self.trees[index];
        self.events.push(DomEvent {
            target: binding.container(),
            name: "checkbox-tree:change".to_string(),
            detail: json!({ "treeId": binding.tree_id(), "values": values }),
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REPEATERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Insert a row rendered from the repeater's prototype and initialize it.
    pub fn add_repeater_row(&mut self, name: &str) -> DependencyResult<Option<NodeId>> {
        let Some(container) = self.find_in_form(ATTR_REPEATER, name) else {
            warn!(repeater = name, "repeater container not found");
            return Ok(None);
        };
        let Some(prototype) = self.document.find_by_attr(ATTR_REPEATER_PROTOTYPE, name) else {
            warn!(repeater = name, "repeater prototype not found");
            return Ok(None);
        };

        let index = self.next_row_index(container);
        let html = self
            .document
            .text_content(prototype)
            .replace("<\\/", "</")
            .replace(INDEX_PLACEHOLDER, &index.to_string());
        let Some(row) = self.document.append_html(container, &html).first().copied() else {
            warn!(repeater = name, "repeater prototype produced no element");
            return Ok(None);
        };

        self.check_group_cycles()?;
        self.register_wrappers(row);
        self.immediate = true;
        self.evaluate_scope(row);
        self.immediate = false;

        self.events.push(DomEvent {
            target: container,
            name: "repeater:add".to_string(),
            detail: json!({ "name": name, "index": index }),
        });
        Ok(Some(row))
    }

    pub fn remove_repeater_row(&mut self, name: &str, index: usize) -> bool {
        let Some(container) = self.find_in_form(ATTR_REPEATER, name) else {
            warn!(repeater = name, "repeater container not found");
            return false;
        };
        let wanted = index.to_string();
        let Some(row) = self
            .document
            .child_elements(container)
            .into_iter()
            .find(|r| self.document.attr(*r, ATTR_REPEATER_ROW) == Some(wanted.as_str()))
        else {
            warn!(repeater = name, index, "repeater row not found");
            return false;
        };

        let groups = self.groups_within(row, false);
        for wrapper in self.wrappers_in(row) {
            self.timeline.cancel(&wrapper);
            self.visible.remove(&wrapper);
        }
        self.document.detach(row);
        for group in groups {
            self.evaluate_group(&group, 0);
        }

        self.events.push(DomEvent {
            target: container,
            name: "repeater:remove".to_string(),
            detail: json!({ "name": name, "index": index }),
        });
        true
    }

    fn next_row_index(&self, container: NodeId) -> usize {
        self.document
            .child_elements(container)
            .into_iter()
            .filter_map(|r| self.document.attr(r, ATTR_REPEATER_ROW)?.parse::<usize>().ok())
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TIMERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Advance the transition clock, running every finalize that comes due.
    pub fn tick(&mut self, ms: u32) {
        for (wrapper, scheduled) in self.timeline.advance(ms) {
            if self.document.is_attached(wrapper) {
                self.finalize(wrapper, &scheduled.step);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVALUATION
    // ═══════════════════════════════════════════════════════════════════════════

    fn evaluate_scope(&mut self, scope: NodeId) {
        for group in self.groups_within(scope, true) {
            self.evaluate_group(&group, 0);
        }
    }

    fn evaluate_group(&mut self, group: &str, depth: usize) {
        if depth > MAX_CASCADE_DEPTH {
            error!(group, depth, "dependency cascade too deep; markup contains a cycle");
            return;
        }

        let mut active: Vec<String> = Vec::new();
        let mut reset = false;
        for el in self.controllers_in_group(group) {
            if !self.reachable(el) {
                continue;
            }
            let (kind, value) = self.field_state(el);
            if kind.is_select() && value.is_empty() {
                reset = true;
            }
            active.extend(active_identifiers(&self.field_name(el), kind, &value));
        }

        let wrappers = self.wrappers_in_group(group);
        if wrappers.is_empty() {
            warn!(group, "no dependent wrappers found for group");
        }
        for wrapper in wrappers {
            let triggers: BTreeSet<String> = self
                .document
                .attr(wrapper, ATTR_DEPENDENT)
                .unwrap_or("")
                .split_whitespace()
                .filter(|t| *t != "true")
                .map(str::to_string)
                .collect();
            let field = self.dependent_field(wrapper);
            if triggers.is_empty() {
                warn!(%field, group, "dependent has no trigger identifiers; stays hidden");
            }

            let met = !reset && triggers_match(&triggers, &active);
            self.report(
                wrapper,
                &field,
                if met {
                    FieldEventKind::DependencyMet
                } else {
                    FieldEventKind::DependencyNotMet
                },
            );
            let target = met && self.reachable(wrapper);
            self.apply_visibility(wrapper, &field, target, depth);
        }
    }

    fn apply_visibility(&mut self, wrapper: NodeId, field: &str, visible: bool, depth: usize) {
        let current = self.visible.get(&wrapper).copied().unwrap_or(true);
        if current == visible {
            return;
        }
        self.visible.insert(wrapper, visible);
        let direction = if visible {
            Direction::Show
        } else {
            Direction::Hide
        };
        self.run_plan(wrapper, direction);
        self.report(
            wrapper,
            field,
            if visible {
                FieldEventKind::Shown
            } else {
                FieldEventKind::Hidden
            },
        );

        for group in self.groups_within(wrapper, false) {
            self.evaluate_group(&group, depth + 1);
        }
    }

    fn run_plan(&mut self, wrapper: NodeId, direction: Direction) {
        self.timeline.cancel(&wrapper);
        let plan = if self.immediate {
            AnimationPolicy::new(AnimationConfig::none()).plan(direction, None)
        } else {
            self.policy.plan(direction, None)
        };

        let mut delay = 0;
        for step in plan.steps {
            match step {
                AnimationStep::EnableInputs => self.enable_inputs(wrapper),
                AnimationStep::Mutate(styles) => self.apply_styles(wrapper, &styles),
                AnimationStep::Wait(ms) => delay += ms,
                AnimationStep::Finalize(step) if delay == 0 => self.finalize(wrapper, &step),
                AnimationStep::Finalize(step) => {
                    self.timeline.schedule(wrapper, delay, direction, step);
                }
            }
        }
    }

    fn finalize(&mut self, wrapper: NodeId, step: &FinalizeStep) {
        self.apply_styles(wrapper, &step.styles);
        if !step.disable_and_clear {
            return;
        }
        for control in self.document.form_controls(wrapper) {
            self.document.set_disabled(control, true);
            self.document.clear_control(control);
        }
        for i in 0..self.trees.len() {
            if self.document.contains(wrapper, self.trees[i].container()) {
                self.trees[i].set_checked_values(&mut self.document, &[]);
            }
        }
    }

    fn apply_styles(&mut self, wrapper: NodeId, styles: &[StyleMutation]) {
        for style in styles {
            match &style.value {
                Some(v) => self.document.set_style(wrapper, &style.property, v),
                None => self.document.remove_style(wrapper, &style.property),
            }
        }
    }

    /// Enable controls of `wrapper`, skipping nested hidden wrappers and
    /// controls disabled in markup.
    fn enable_inputs(&mut self, wrapper: NodeId) {
        for control in self.document.form_controls(wrapper) {
            if self.document.has_attr(control, "disabled") {
                continue;
            }
            let nested_hidden = self
                .document
                .ancestors(control)
                .into_iter()
                .take_while(|a| *a != wrapper)
                .any(|a| self.visible.get(&a) == Some(&false));
            if !nested_hidden {
                self.document.set_disabled(control, false);
            }
        }
    }

    fn report(&mut self, wrapper: NodeId, field: &str, kind: FieldEventKind) {
        self.events.push(DomEvent {
            target: wrapper,
            name: kind.dom_event_name().to_string(),
            detail: json!({ "field": field }),
        });
        self.dispatcher
            .dispatch(&FieldEvent::new(field, kind), &mut self.document);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MARKUP LOOKUPS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record the rendered state of wrappers under `scope`; inputs of hidden
    /// wrappers are disabled so they do not submit.
    fn register_wrappers(&mut self, scope: NodeId) {
        for wrapper in self.wrappers_in(scope) {
            if self.visible.contains_key(&wrapper) {
                continue;
            }
            let hidden = self.document.is_hidden(wrapper);
            self.visible.insert(wrapper, !hidden);
            if hidden {
                for control in self.document.form_controls(wrapper) {
                    self.document.set_disabled(control, true);
                }
            }
        }
    }

    fn find_in_form(&self, attr: &str, value: &str) -> Option<NodeId> {
        self.document
            .with_attr(self.form, attr)
            .into_iter()
            .find(|id| self.document.attr(*id, attr) == Some(value))
    }

    fn wrappers_in(&self, scope: NodeId) -> Vec<NodeId> {
        self.document.with_attr(scope, ATTR_DEPENDENT_GROUP)
    }

    fn wrappers_in_group(&self, group: &str) -> Vec<NodeId> {
        self.wrappers_in(self.form)
            .into_iter()
            .filter(|w| self.document.attr(*w, ATTR_DEPENDENT_GROUP) == Some(group))
            .collect()
    }

    fn controllers_in(&self, scope: NodeId) -> Vec<NodeId> {
        self.document
            .with_attr(scope, ATTR_CONTROLLER)
            .into_iter()
            .filter(|id| self.document.attr(*id, ATTR_CONTROLLER) == Some("true"))
            .collect()
    }

    fn controllers_in_group(&self, group: &str) -> Vec<NodeId> {
        self.controllers_in(self.form)
            .into_iter()
            .filter(|c| self.groups_of(*c).iter().any(|g| g == group))
            .collect()
    }

    fn groups_of(&self, controller: NodeId) -> Vec<String> {
        self.document
            .attr(controller, ATTR_CONTROLLER_GROUP)
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Groups touched by `scope`: those of its controllers and of its nested
    /// dependents (and of `scope` itself when `inclusive`), in document order.
    fn groups_within(&self, scope: NodeId, inclusive: bool) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        let mut push = |g: String| {
            if !groups.contains(&g) {
                groups.push(g);
            }
        };
        for id in self.document.descendants(scope) {
            if self.document.attr(id, ATTR_CONTROLLER) == Some("true") {
                for g in self.groups_of(id) {
                    push(g);
                }
            }
            if let Some(g) = self.document.attr(id, ATTR_DEPENDENT_GROUP) {
                push(g.to_string());
            }
        }
        if inclusive {
            if let Some(g) = self.document.attr(scope, ATTR_DEPENDENT_GROUP) {
                push(g.to_string());
            }
        }
        groups
    }

    /// Not inside a wrapper that is currently hidden.
    fn reachable(&self, node: NodeId) -> bool {
        self.document
            .ancestors(node)
            .into_iter()
            .all(|a| self.visible.get(&a) != Some(&false))
    }

    fn field_name(&self, controller: NodeId) -> String {
        self.document
            .attr(controller, ATTR_CONTROLLER_FIELD)
            .or_else(|| self.document.attr(controller, "name"))
            .unwrap_or_default()
            .to_string()
    }

    fn dependent_field(&self, wrapper: NodeId) -> String {
        self.document
            .attr(wrapper, ATTR_DEPENDENT_FIELD)
            .unwrap_or_default()
            .to_string()
    }

    /// Kind and value of a controller as the shared identifier rule sees it.
    fn field_state(&self, el: NodeId) -> (FieldKind, FieldValue) {
        let doc = &self.document;
        match doc.control_type(el).as_deref() {
            Some("select") => {
                let selected: Vec<String> = doc
                    .selected(el)
                    .iter()
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .collect();
                let kind = if doc.has_attr(el, "multiple") {
                    FieldKind::MultiSelect
                } else {
                    FieldKind::Select
                };
                (kind, FieldValue::List(selected))
            }
            Some(t @ ("checkbox" | "radio")) => {
                let kind = if t == "radio" {
                    FieldKind::Radio
                } else {
                    FieldKind::Checkbox
                };
                let value = match (doc.checked(el), doc.value(el)) {
                    (false, _) => FieldValue::Bool(false),
                    (true, "") => FieldValue::Bool(true),
                    (true, v) => FieldValue::text(v),
                };
                (kind, value)
            }
            Some("hidden") => (FieldKind::Hidden, FieldValue::text(doc.value(el))),
            _ => (FieldKind::Text, FieldValue::text(doc.value(el))),
        }
    }

    /// Group `G` precedes `H` when a wrapper of `G` contains a controller of `H`.
    fn check_group_cycles(&self) -> DependencyResult<()> {
        let mut names: Vec<String> = Vec::new();
        let mut edges: Vec<Vec<usize>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut intern = |name: &str, names: &mut Vec<String>, edges: &mut Vec<Vec<usize>>| {
            *index.entry(name.to_string()).or_insert_with(|| {
                names.push(name.to_string());
                edges.push(Vec::new());
                names.len() - 1
            })
        };

        for wrapper in self.wrappers_in(self.form) {
            let Some(group) = self.document.attr(wrapper, ATTR_DEPENDENT_GROUP) else {
                continue;
            };
            let source = intern(group, &mut names, &mut edges);
            for controller in self.controllers_in(wrapper) {
                for target_group in self.groups_of(controller) {
                    let target = intern(&target_group, &mut names, &mut edges);
                    if !edges[source].contains(&target) {
                        edges[source].push(target);
                    }
                }
            }
        }

        topological_order(&names, &edges).map(|_| ())
    }
}
