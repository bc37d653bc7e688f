//! Form assembly and server-side rendering.
//!
//! `FormBuilder` collects fields (through the type pipeline), dependency
//! declarations, checkbox trees and repeaters, then freezes them into a
//! `Form`. A `Form` evaluates visibility for a value snapshot and renders
//! markup whose wrappers are already shown or hidden the way the client
//! controller would leave them.
//!
//! ## Key Invariants
//!
//! 1. **Frozen after build**: declarations, layout and trees never change once
//!    `build` returned.
//! 2. **Server/client agreement**: a wrapper is rendered hidden exactly when
//!    the evaluator reports its field as not visible.
//! 3. **Typed prototypes**: repeater rows come from a `RowPrototype`
//!    implementation driving a `FieldGroupBuilder`; the same prototype
//!    renders the `__index__` template.

use std::collections::BTreeMap;
use tracing::debug;

use crate::animation::AnimationConfig;
use crate::cascade::CascadePropagator;
use crate::controller::{ControllerConfig, TreeConfig};
use crate::declaration::{DependencyDeclaration, DependencyGraph};
use crate::error::DependencyResult;
use crate::evaluator::{VisibilityEvaluator, VisibilityMap};
use crate::events::{EventDispatcher, FieldEvent, RequiredToggler};
use crate::field::{
    Field, FieldConfig, FieldId, FieldKind, FieldLayout, FieldValue, FieldValues,
};
use crate::guard::RenderContext;
use crate::markup::{
    controller_attrs, dependent_wrapper, escape_html, indexed_name, render_attrs,
    render_control, render_tree, repeater_container, repeater_prototype, repeater_row,
    INDEX_PLACEHOLDER,
};
use crate::pipeline::{DependencyBinding, DependentView, FieldOptions, FieldTypeRegistry};
use crate::tree::CheckboxTree;

// ═══════════════════════════════════════════════════════════════════════════════
// ROW PROTOTYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Factory for the fields of one repeater row.
///
/// Called once per initial row and once more for the `__index__` template.
/// Names passed to the builder are local to the row.
pub trait RowPrototype {
    fn build_row(&self, row: &mut FieldGroupBuilder<'_>) -> DependencyResult<()>;
}

/// Adds fields under one parent, translating row-local names into full ids.
pub struct FieldGroupBuilder<'a> {
    form: &'a mut FormBuilder,
    repeater: String,
    index: String,
    parent: FieldId,
}

impl<'a> FieldGroupBuilder<'a> {
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Full id of a row-local field name: `repeater[index][name]`.
    pub fn field_id(&self, name: &str) -> FieldId {
        indexed_name(&self.repeater, &self.index, name)
    }

    pub fn add(
        &mut self,
        name: &str,
        type_name: &str,
        options: FieldOptions,
    ) -> DependencyResult<&mut Self> {
        let id = self.field_id(name);
        let parent = self.parent.clone();
        self.form.add_field(&id, type_name, Some(&parent), options)?;
        Ok(self)
    }

    /// Row-local dependency; both fields live in this row.
    pub fn depends_on<I, S>(&mut self, dependent: &str, controller: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let decl = DependencyDeclaration::new(
            self.field_id(dependent),
            self.field_id(controller),
            values,
        );
        self.form.declarations.push(decl);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Entry {
    type_name: String,
    options: FieldOptions,
}

pub struct FormBuilder {
    id: String,
    registry: FieldTypeRegistry,
    layout: FieldLayout,
    entries: BTreeMap<FieldId, Entry>,
    declarations: Vec<DependencyDeclaration>,
    trees: BTreeMap<FieldId, CheckboxTree>,
    repeaters: BTreeMap<FieldId, Form>,
    row_index: BTreeMap<FieldId, String>,
    animation: AnimationConfig,
}

impl FormBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_registry(id, FieldTypeRegistry::with_builtin_types())
    }

    pub fn with_registry(id: impl Into<String>, registry: FieldTypeRegistry) -> Self {
        Self {
            id: id.into(),
            registry,
            layout: FieldLayout::new(),
            entries: BTreeMap::new(),
            declarations: Vec::new(),
            trees: BTreeMap::new(),
            repeaters: BTreeMap::new(),
            row_index: BTreeMap::new(),
            animation: AnimationConfig::default(),
        }
    }

    pub fn animation(mut self, config: AnimationConfig) -> Self {
        self.animation = config;
        self
    }

    pub fn add(
        &mut self,
        id: &str,
        type_name: &str,
        options: FieldOptions,
    ) -> DependencyResult<&mut Self> {
        self.add_field(id, type_name, None, options)?;
        Ok(self)
    }

    /// Add a field nested in a `group` field.
    pub fn add_to(
        &mut self,
        parent: &str,
        id: &str,
        type_name: &str,
        options: FieldOptions,
    ) -> DependencyResult<&mut Self> {
        self.add_field(id, type_name, Some(parent), options)?;
        Ok(self)
    }

    fn add_field(
        &mut self,
        id: &str,
        type_name: &str,
        parent: Option<&str>,
        options: FieldOptions,
    ) -> DependencyResult<()> {
        let (field, options) = self.registry.build(type_name, id, parent, options)?;
        self.layout.add(field)?;
        self.entries.insert(
            id.to_string(),
            Entry {
                type_name: type_name.to_string(),
                options,
            },
        );
        Ok(())
    }

    pub fn depends_on<I, S>(&mut self, dependent: &str, controller: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declarations
            .push(DependencyDeclaration::new(dependent, controller, values));
        self
    }

    pub fn depends_on_in_group<I, S>(
        &mut self,
        dependent: &str,
        controller: &str,
        values: I,
        group: &str,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declarations
            .push(DependencyDeclaration::new(dependent, controller, values).in_group(group));
        self
    }

    /// Add a checkbox tree as a field named after the tree id.
    pub fn tree(
        &mut self,
        tree: CheckboxTree,
        parent: Option<&str>,
        options: FieldOptions,
    ) -> DependencyResult<&mut Self> {
        let id = tree.id().to_string();
        self.add_field(&id, "tree", parent, options)?;
        self.trees.insert(id, tree);
        Ok(self)
    }

    /// Add a repeater with `rows` initial rows built by `prototype`.
    pub fn repeater(
        &mut self,
        name: &str,
        prototype: &dyn RowPrototype,
        rows: usize,
        options: FieldOptions,
    ) -> DependencyResult<&mut Self> {
        self.add_field(name, "repeater", None, options)?;
        for i in 0..rows {
            self.add_row(name, &i.to_string(), prototype)?;
        }

        let mut template = FormBuilder::with_registry(self.id.clone(), self.registry.clone());
        template.add_field(name, "repeater", None, FieldOptions::new())?;
        template.add_row(name, INDEX_PLACEHOLDER, prototype)?;
        let template = template.build()?;
        self.repeaters.insert(name.to_string(), template);
        Ok(self)
    }

    fn add_row(
        &mut self,
        repeater: &str,
        index: &str,
        prototype: &dyn RowPrototype,
    ) -> DependencyResult<()> {
        let row_id = format!("{}[{}]", repeater, index);
        self.add_field(&row_id, "group", Some(repeater), FieldOptions::new())?;
        self.row_index.insert(row_id.clone(), index.to_string());
        let mut row = FieldGroupBuilder {
            form: self,
            repeater: repeater.to_string(),
            index: index.to_string(),
            parent: row_id,
        };
        prototype.build_row(&mut row)
    }

    pub fn build(self) -> DependencyResult<Form> {
        let graph = DependencyGraph::build(self.declarations, self.layout)?;
        let mut trees = self.trees;
        for tree in trees.values_mut() {
            CascadePropagator::for_tree(tree).normalize(&mut tree.nodes);
        }
        debug!(
            form = %self.id,
            fields = graph.layout().len(),
            groups = graph.groups().len(),
            "form built"
        );
        Ok(Form {
            id: self.id,
            registry: self.registry,
            graph,
            entries: self.entries,
            trees,
            repeaters: self.repeaters,
            row_index: self.row_index,
            animation: self.animation,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FORM
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Form {
    id: String,
    registry: FieldTypeRegistry,
    graph: DependencyGraph,
    entries: BTreeMap<FieldId, Entry>,
    trees: BTreeMap<FieldId, CheckboxTree>,
    repeaters: BTreeMap<FieldId, Form>,
    row_index: BTreeMap<FieldId, String>,
    animation: AnimationConfig,
}

impl Form {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn tree(&self, id: &str) -> Option<&CheckboxTree> {
        self.trees.get(id)
    }

    /// Defaults overlaid with `values`, with every single select resolved to
    /// the option a browser would show as selected.
    pub fn values_with_defaults(&self, values: &FieldValues) -> FieldValues {
        let mut merged = self.graph.layout().default_values();
        merged.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        for field in self.graph.layout().iter().filter(|f| f.kind == FieldKind::Select) {
            let Some(entry) = self.entries.get(&field.id) else {
                continue;
            };
            let current = merged.get(&field.id);
            if let Some(value) = effective_select_value(&entry.options.choices, current) {
                merged.insert(field.id.clone(), value);
            }
        }
        merged
    }

    pub fn evaluate(&self, values: &FieldValues) -> VisibilityMap {
        VisibilityEvaluator::new(&self.graph).evaluate(&self.values_with_defaults(values))
    }

    /// Field configuration after visibility: hidden fields are not required.
    pub fn field_configs(&self, values: &FieldValues) -> BTreeMap<FieldId, FieldConfig> {
        let mut configs = self.graph.layout().configs();
        let mut dispatcher: EventDispatcher<FieldEvent, BTreeMap<FieldId, FieldConfig>> =
            EventDispatcher::new();
        dispatcher.register(0, Box::new(RequiredToggler::new()));
        VisibilityEvaluator::new(&self.graph).evaluate_with(
            &self.values_with_defaults(values),
            &mut dispatcher,
            &mut configs,
        );
        configs
    }

    /// Values the browser would submit: hidden fields are disabled and dropped.
    pub fn submitted_values(&self, values: &FieldValues) -> FieldValues {
        let visibility = self.evaluate(values);
        values
            .iter()
            .filter(|(id, _)| visibility.is_visible(id))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            form_id: self.id.clone(),
            animation: self.animation.clone(),
            trees: self.tree_configs(),
        }
    }

    fn tree_configs(&self) -> Vec<TreeConfig> {
        self.trees
            .values()
            .map(|t| TreeConfig {
                tree_id: t.id().to_string(),
                mode: t.mode(),
            })
            .collect()
    }

    /// Render the form followed by its controller script and one controller
    /// per checkbox tree. Scripts `ctx` already emitted in this pass are skipped.
    pub fn render(&self, values: &FieldValues, ctx: &mut RenderContext) -> DependencyResult<String> {
        let values = self.values_with_defaults(values);
        let visibility = VisibilityEvaluator::new(&self.graph).evaluate(&values);

        let mut out = format!("<form id=\"{}\">", escape_html(&self.id));
        out.push_str(&self.render_children(None, &visibility, &values)?);
        out.push_str("</form>");

        ctx.set_animation(&self.id, self.animation.clone());
        if let Some(script) = ctx.form_script(&self.id, &self.tree_configs()) {
            out.push_str(&script);
        }
        for tree in self.trees.values() {
            if let Some(script) = ctx.tree_script(tree.id(), tree.mode()) {
                out.push_str(&script);
            }
        }
        Ok(out)
    }

    fn render_children(
        &self,
        parent: Option<&str>,
        visibility: &VisibilityMap,
        values: &FieldValues,
    ) -> DependencyResult<String> {
        let mut out = String::new();
        for field in self
            .graph
            .layout()
            .iter()
            .filter(|f| f.parent.as_deref() == parent)
        {
            out.push_str(&self.render_field(field, visibility, values)?);
        }
        Ok(out)
    }

    fn render_field(
        &self,
        field: &Field,
        visibility: &VisibilityMap,
        values: &FieldValues,
    ) -> DependencyResult<String> {
        let Some(entry) = self.entries.get(&field.id) else {
            return Ok(String::new());
        };
        let mut field = field.clone();
        if let Some(value) = values.get(&field.id) {
            field.value = value.clone();
        }
        let mut options = entry.options.clone();
        options.dependency = Some(self.binding(&field.id, visibility));
        let view = self.registry.view(&entry.type_name, &field, &options)?;

        let mut attrs = String::new();
        if !view.controller_groups.is_empty() {
            let groups: Vec<&str> = view.controller_groups.iter().map(String::as_str).collect();
            attrs.push_str(&controller_attrs(&field.id, &groups));
        }
        attrs.push_str(&render_attrs(&view.attrs));
        let label = escape_html(&view.label);

        let inner = match view.kind {
            FieldKind::Group if self.repeaters.contains_key(&field.id) => {
                self.render_repeater(&field.id, visibility, values)?
            }
            FieldKind::Group => format!(
                "<fieldset data-field=\"{}\"><legend>{}</legend>{}</fieldset>",
                escape_html(&field.id),
                label,
                self.render_children(Some(&field.id), visibility, values)?
            ),
            FieldKind::Tree => match self.trees.get(&field.id) {
                Some(tree) => format!(
                    "<fieldset><legend>{}</legend>{}</fieldset>",
                    label,
                    render_tree(tree, &format!("{}[]", field.id))
                ),
                None => String::new(),
            },
            FieldKind::Hidden => {
                render_control(&field.id, view.kind, &view.value, &view.choices, &attrs)
            }
            FieldKind::Checkbox | FieldKind::Radio if view.choices.is_empty() => format!(
                "<label>{} {}</label>",
                render_control(&field.id, view.kind, &view.value, &view.choices, &attrs),
                label
            ),
            _ => format!(
                "<label>{}</label>{}",
                label,
                render_control(&field.id, view.kind, &view.value, &view.choices, &attrs)
            ),
        };

        Ok(match &view.dependent {
            Some(dep) => dependent_wrapper(&field.id, &dep.group, &dep.identifiers, dep.visible, &inner),
            None => inner,
        })
    }

    fn render_repeater(
        &self,
        name: &str,
        visibility: &VisibilityMap,
        values: &FieldValues,
    ) -> DependencyResult<String> {
        let mut rows = String::new();
        for row in self
            .graph
            .layout()
            .iter()
            .filter(|f| f.parent.as_deref() == Some(name))
        {
            let index = self.row_index.get(&row.id).map(String::as_str).unwrap_or("");
            let inner = self.render_children(Some(&row.id), visibility, values)?;
            rows.push_str(&repeater_row(index, &inner));
        }

        let prototype = match self.repeaters.get(name) {
            Some(template) => {
                let row_id = format!("{}[{}]", name, INDEX_PLACEHOLDER);
                let template_values = template.values_with_defaults(&FieldValues::new());
                let template_visibility =
                    VisibilityEvaluator::new(&template.graph).evaluate(&template_values);
                let inner =
                    template.render_children(Some(&row_id), &template_visibility, &template_values)?;
                repeater_prototype(name, &repeater_row(INDEX_PLACEHOLDER, &inner))
            }
            None => String::new(),
        };
        Ok(repeater_container(name, &rows, &prototype))
    }

    fn binding(&self, field: &str, visibility: &VisibilityMap) -> DependencyBinding {
        DependencyBinding {
            controller_groups: self
                .graph
                .controller_groups(field)
                .into_iter()
                .map(str::to_string)
                .collect(),
            dependent: self.graph.group_of(field).map(|group| DependentView {
                group: group.to_string(),
                identifiers: self
                    .graph
                    .dependent_identifiers(field)
                    .cloned()
                    .unwrap_or_default(),
                visible: visibility.is_visible(field),
            }),
        }
    }
}

/// A single select with no matching option falls back to its first option.
fn effective_select_value(
    choices: &[(String, String)],
    current: Option<&FieldValue>,
) -> Option<FieldValue> {
    let matches = |v: &str| choices.iter().any(|(choice, _)| choice == v);
    match current {
        Some(FieldValue::Text(v)) if matches(v) => None,
        _ => choices.first().map(|(first, _)| FieldValue::text(first.clone())),
    }
}
