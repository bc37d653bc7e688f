//! Field-type pipeline.
//!
//! A field type is a chain of stages (`field` → `choice` → …) followed by the
//! registered extensions. Chains are resolved when a type is registered, then
//! every field of that type runs the same fixed sequence:
//!
//! 1. `configure_options` over the whole chain,
//! 2. `build_field` over the whole chain,
//! 3. `finish_view` over the whole chain (at render time).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::error::{DependencyError, DependencyResult};
use crate::events::REQUIRED_SUSPENDED_ATTR;
use crate::field::{Field, FieldId, FieldKind, FieldValue};

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS & VIEW
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldOptions {
    pub label: Option<String>,
    pub required: bool,
    pub default: FieldValue,
    /// `(value, label)` pairs for choice, checkbox and radio types.
    pub choices: Vec<(String, String)>,
    pub multiple: bool,
    pub attrs: BTreeMap<String, String>,
    /// Filled by the form right before `finish_view`.
    #[serde(skip)]
    pub dependency: Option<DependencyBinding>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: FieldValue) -> Self {
        self.default = value;
        self
    }

    pub fn choice(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.choices.push((value.into(), label.into()));
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentView {
    pub group: String,
    pub identifiers: BTreeSet<String>,
    pub visible: bool,
}

/// Dependency role of one field in the current render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyBinding {
    pub controller_groups: Vec<String>,
    pub dependent: Option<DependentView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub id: FieldId,
    pub kind: FieldKind,
    pub label: String,
    pub value: FieldValue,
    pub choices: Vec<(String, String)>,
    pub attrs: BTreeMap<String, String>,
    pub controller_groups: Vec<String>,
    pub dependent: Option<DependentView>,
}

impl FieldView {
    pub fn new(field: &Field) -> Self {
        Self {
            id: field.id.clone(),
            kind: field.kind,
            label: field.id.clone(),
            value: field.value.clone(),
            choices: Vec::new(),
            attrs: BTreeMap::new(),
            controller_groups: Vec::new(),
            dependent: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STAGES
// ═══════════════════════════════════════════════════════════════════════════════

pub trait FieldTypeStage: Send + Sync {
    fn name(&self) -> &str;

    fn configure_options(&self, _options: &mut FieldOptions) {}

    fn build_field(&self, _field: &mut Field, _options: &FieldOptions) {}

    fn finish_view(&self, _view: &mut FieldView, _field: &Field, _options: &FieldOptions) {}
}

/// Root of every chain: value, required flag, label and extra attributes.
pub struct BaseType;

impl FieldTypeStage for BaseType {
    fn name(&self) -> &str {
        "field"
    }

    fn build_field(&self, field: &mut Field, options: &FieldOptions) {
        field.required = options.required;
        field.value = options.default.clone();
    }

    fn finish_view(&self, view: &mut FieldView, field: &Field, options: &FieldOptions) {
        if let Some(label) = &options.label {
            view.label = label.clone();
        }
        if field.required {
            view.attrs.insert("required".into(), "required".into());
        }
        view.attrs
            .extend(options.attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Fixes the field kind.
pub struct KindType {
    name: &'static str,
    kind: FieldKind,
}

impl KindType {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

impl FieldTypeStage for KindType {
    fn name(&self) -> &str {
        self.name
    }

    fn build_field(&self, field: &mut Field, _options: &FieldOptions) {
        field.kind = self.kind;
    }
}

/// Select; `multiple` turns it into a multi-select.
pub struct ChoiceType;

impl FieldTypeStage for ChoiceType {
    fn name(&self) -> &str {
        "choice"
    }

    fn configure_options(&self, options: &mut FieldOptions) {
        let has_empty = options.choices.iter().any(|(v, _)| v.is_empty());
        if !options.multiple && !options.required && !has_empty {
            options.choices.insert(0, (String::new(), String::new()));
        }
    }

    fn build_field(&self, field: &mut Field, options: &FieldOptions) {
        field.kind = if options.multiple {
            FieldKind::MultiSelect
        } else {
            FieldKind::Select
        };
    }

    fn finish_view(&self, view: &mut FieldView, _field: &Field, options: &FieldOptions) {
        view.choices = options.choices.clone();
    }
}

/// Checkbox or radio, optionally expanded over `choices`.
pub struct CheckableType {
    name: &'static str,
    kind: FieldKind,
}

impl CheckableType {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

impl FieldTypeStage for CheckableType {
    fn name(&self) -> &str {
        self.name
    }

    fn build_field(&self, field: &mut Field, _options: &FieldOptions) {
        field.kind = self.kind;
    }

    fn finish_view(&self, view: &mut FieldView, _field: &Field, options: &FieldOptions) {
        view.choices = options.choices.clone();
    }
}

/// Extension copying the field's dependency role into its view.
pub struct DependencyExtension;

impl FieldTypeStage for DependencyExtension {
    fn name(&self) -> &str {
        "dependency"
    }

    fn finish_view(&self, view: &mut FieldView, _field: &Field, options: &FieldOptions) {
        if let Some(binding) = &options.dependency {
            view.controller_groups = binding.controller_groups.clone();
            view.dependent = binding.dependent.clone();
            let hidden = binding.dependent.as_ref().is_some_and(|d| !d.visible);
            if hidden && view.attrs.remove("required").is_some() {
                view.attrs
                    .insert(REQUIRED_SUSPENDED_ATTR.into(), "true".into());
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

type Stage = Arc<dyn FieldTypeStage>;

#[derive(Clone, Default)]
pub struct FieldTypeRegistry {
    /// Type stages only, root first.
    chains: HashMap<String, Vec<Stage>>,
    extensions: Vec<Stage>,
    /// Type chain followed by extensions.
    resolved: HashMap<String, Vec<Stage>>,
}

impl FieldTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        let registered = registry.register_builtin_types();
        debug_assert!(registered.is_ok(), "built-in field types: {:?}", registered);
        registry
    }

    /// Register `field` and its built-in descendants plus the dependency
    /// extension. Parents must exist before their children.
    pub fn register_builtin_types(&mut self) -> DependencyResult<()> {
        self.register("field", None, Arc::new(BaseType))?;
        self.register(
            "text",
            Some("field"),
            Arc::new(KindType::new("text", FieldKind::Text)),
        )?;
        self.register(
            "hidden",
            Some("field"),
            Arc::new(KindType::new("hidden", FieldKind::Hidden)),
        )?;
        self.register("choice", Some("field"), Arc::new(ChoiceType))?;
        self.register(
            "checkbox",
            Some("field"),
            Arc::new(CheckableType::new("checkbox", FieldKind::Checkbox)),
        )?;
        self.register(
            "radio",
            Some("field"),
            Arc::new(CheckableType::new("radio", FieldKind::Radio)),
        )?;
        self.register(
            "group",
            Some("field"),
            Arc::new(KindType::new("group", FieldKind::Group)),
        )?;
        self.register(
            "repeater",
            Some("group"),
            Arc::new(KindType::new("repeater", FieldKind::Group)),
        )?;
        self.register(
            "tree",
            Some("field"),
            Arc::new(KindType::new("tree", FieldKind::Tree)),
        )?;
        self.register_extension(Arc::new(DependencyExtension));
        Ok(())
    }

    pub fn register(&mut self, name: &str, parent: Option<&str>, stage: Stage) -> DependencyResult<()> {
        let mut chain = match parent {
            Some(p) => self
                .chains
                .get(p)
                .cloned()
                .ok_or_else(|| DependencyError::UnknownFieldType { name: p.to_string() })?,
            None => Vec::new(),
        };
        chain.push(stage);
        debug!(
            field_type = name,
            chain = ?chain.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
            "field type registered"
        );
        let resolved = self.resolve(&chain);
        self.resolved.insert(name.to_string(), resolved);
        self.chains.insert(name.to_string(), chain);
        Ok(())
    }

    pub fn register_extension(&mut self, stage: Stage) {
        self.extensions.push(stage);
        self.resolved = self
            .chains
            .iter()
            .map(|(name, chain)| (name.clone(), self.resolve(chain)))
            .collect();
    }

    fn resolve(&self, chain: &[Stage]) -> Vec<Stage> {
        chain.iter().chain(self.extensions.iter()).cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolved.contains_key(name)
    }

    /// Stage names of a type, in execution order.
    pub fn chain_names(&self, name: &str) -> DependencyResult<Vec<String>> {
        Ok(self
            .chain(name)?
            .iter()
            .map(|s| s.name().to_string())
            .collect())
    }

    fn chain(&self, name: &str) -> DependencyResult<&[Stage]> {
        self.resolved
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| DependencyError::UnknownFieldType {
                name: name.to_string(),
            })
    }

    /// Run `configure_options` then `build_field` for a new field.
    pub fn build(
        &self,
        type_name: &str,
        id: &str,
        parent: Option<&str>,
        mut options: FieldOptions,
    ) -> DependencyResult<(Field, FieldOptions)> {
        let chain = self.chain(type_name)?;
        for stage in chain {
            stage.configure_options(&mut options);
        }
        let mut field = Field::new(id, FieldKind::Text);
        field.parent = parent.map(str::to_string);
        for stage in chain {
            stage.build_field(&mut field, &options);
        }
        Ok((field, options))
    }

    pub fn view(
        &self,
        type_name: &str,
        field: &Field,
        options: &FieldOptions,
    ) -> DependencyResult<FieldView> {
        let mut view = FieldView::new(field);
        for stage in self.chain(type_name)? {
            stage.finish_view(&mut view, field, options);
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Uppercase;

    impl FieldTypeStage for Uppercase {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn finish_view(&self, view: &mut FieldView, _field: &Field, _options: &FieldOptions) {
            view.label = view.label.to_uppercase();
        }
    }

    #[test]
    fn test_chain_resolved_in_declared_order() {
        let registry = FieldTypeRegistry::with_builtin_types();
        assert_eq!(
            registry.chain_names("repeater").unwrap(),
            vec!["field", "group", "repeater", "dependency"]
        );
    }

    #[test]
    fn test_builtin_types_register_cleanly() {
        let mut registry = FieldTypeRegistry::new();
        registry.register_builtin_types().unwrap();
        for name in [
            "field", "text", "hidden", "choice", "checkbox", "radio", "group", "repeater", "tree",
        ] {
            assert!(registry.contains(name), "missing built-in type {}", name);
        }
        assert_eq!(
            registry.chain_names("choice").unwrap(),
            vec!["field", "choice", "dependency"]
        );
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut registry = FieldTypeRegistry::new();
        let err = registry
            .register("child", Some("missing"), Arc::new(Uppercase))
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_UNKNOWN_TYPE);
        assert!(registry.build("child", "x", None, FieldOptions::new()).is_err());
    }

    #[test]
    fn test_choice_builds_select() {
        let registry = FieldTypeRegistry::with_builtin_types();
        let (field, options) = registry
            .build(
                "choice",
                "account_type",
                None,
                FieldOptions::new().choice("personal", "Personal"),
            )
            .unwrap();
        assert_eq!(field.kind, FieldKind::Select);
        assert_eq!(options.choices[0].0, "");

        let (multi, _) = registry
            .build("choice", "tags", None, FieldOptions::new().multiple())
            .unwrap();
        assert_eq!(multi.kind, FieldKind::MultiSelect);
    }

    #[test]
    fn test_stages_run_after_parents() {
        let mut registry = FieldTypeRegistry::with_builtin_types();
        registry
            .register("shout", Some("text"), Arc::new(Uppercase))
            .unwrap();
        let (field, options) = registry
            .build("shout", "name", None, FieldOptions::new().label("Name"))
            .unwrap();
        let view = registry.view("shout", &field, &options).unwrap();
        assert_eq!(view.label, "NAME");
        assert_eq!(field.kind, FieldKind::Text);
    }

    #[test]
    fn test_hidden_dependent_drops_required() {
        let registry = FieldTypeRegistry::with_builtin_types();
        let (field, mut options) = registry
            .build("text", "vat_id", None, FieldOptions::new().required())
            .unwrap();
        options.dependency = Some(DependencyBinding {
            controller_groups: Vec::new(),
            dependent: Some(DependentView {
                group: "country".into(),
                identifiers: BTreeSet::new(),
                visible: false,
            }),
        });
        let view = registry.view("text", &field, &options).unwrap();
        assert!(!view.attrs.contains_key("required"));
        assert_eq!(
            view.attrs.get(REQUIRED_SUSPENDED_ATTR).map(String::as_str),
            Some("true")
        );
        assert!(view.dependent.is_some());
    }
}
