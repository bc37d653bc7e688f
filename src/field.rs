//! Field model: values, kinds, containment layout and active identifiers.
//!
//! ## Active Identifier Rules
//!
//! 1. **Select / text**: a non-empty value `v` yields `field-v`. Multi-valued
//!    selects yield one identifier per non-empty entry.
//! 2. **Checkbox / radio**: only when checked; `field-v` if the option carries a
//!    value, the bare `field` otherwise.
//! 3. **Hidden**: always active; `field-v` if a value is present, else `field`.
//! 4. **Missing**: a controller absent from the snapshot is inactive.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{DependencyError, DependencyResult};

pub type FieldId = String;

/// Sentinel trigger value matching any active identifier.
pub const TRIGGER_ALL: &str = "all";

// ═══════════════════════════════════════════════════════════════════════════════
// VALUES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }

    /// True for null, `false`, the empty string and lists without a non-empty entry.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Bool(b) => !b,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.is_empty()),
        }
    }
}

/// Current values of a form, keyed by field identifier.
pub type FieldValues = HashMap<FieldId, FieldValue>;

// ═══════════════════════════════════════════════════════════════════════════════
// KINDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Select,
    MultiSelect,
    Checkbox,
    Radio,
    Hidden,
    /// Container without a value of its own (fieldset, repeater, repeater row).
    Group,
    Tree,
}

impl FieldKind {
    /// Best guess for controllers that were never registered in a layout.
    pub fn infer(value: &FieldValue) -> Self {
        match value {
            FieldValue::Bool(_) => FieldKind::Checkbox,
            FieldValue::List(_) => FieldKind::MultiSelect,
            FieldValue::Text(_) | FieldValue::Null => FieldKind::Select,
        }
    }

    /// Select-type controllers reset their whole group when emptied.
    pub fn is_select(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::MultiSelect)
    }

    pub fn is_checkable(&self) -> bool {
        matches!(self, FieldKind::Checkbox | FieldKind::Radio)
    }
}

/// Build the wire identifier for a controller/value pair.
pub fn identifier(controller: &str, value: &str) -> String {
    if value.is_empty() {
        controller.to_string()
    } else {
        format!("{}-{}", controller, value)
    }
}

/// Active identifiers for a controller of the given kind holding `value`.
pub fn active_identifiers(controller: &str, kind: FieldKind, value: &FieldValue) -> Vec<String> {
    let non_empty = |items: &[String]| -> Vec<String> {
        items
            .iter()
            .filter(|v| !v.is_empty())
            .map(|v| identifier(controller, v))
            .collect()
    };

    match kind {
        FieldKind::Hidden => match value {
            FieldValue::Text(v) => vec![identifier(controller, v)],
            FieldValue::List(items) if items.iter().any(|v| !v.is_empty()) => non_empty(items),
            _ => vec![controller.to_string()],
        },
        FieldKind::Checkbox | FieldKind::Radio => match value {
            FieldValue::Bool(true) => vec![controller.to_string()],
            FieldValue::Text(v) if !v.is_empty() => vec![identifier(controller, v)],
            FieldValue::List(items) => non_empty(items),
            _ => Vec::new(),
        },
        FieldKind::Group => Vec::new(),
        FieldKind::Text | FieldKind::Select | FieldKind::MultiSelect | FieldKind::Tree => {
            match value {
                FieldValue::Text(v) if !v.is_empty() => vec![identifier(controller, v)],
                FieldValue::List(items) => non_empty(items),
                FieldValue::Bool(true) => vec![controller.to_string()],
                _ => Vec::new(),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIELDS & LAYOUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    pub kind: FieldKind,
    #[serde(default)]
    pub value: FieldValue,
    /// Containing field (fieldset, repeater row), if any.
    #[serde(default)]
    pub parent: Option<FieldId>,
    #[serde(default)]
    pub required: bool,
}

impl Field {
    pub fn new(id: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            kind,
            value: FieldValue::Null,
            parent: None,
            required: false,
        }
    }

    pub fn with_value(mut self, value: FieldValue) -> Self {
        self.value = value;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Ordered set of fields with their containment links.
///
/// Parents must be added before their children, so the parent relation can
/// never contain a cycle.
#[derive(Debug, Clone, Default)]
pub struct FieldLayout {
    fields: Vec<Field>,
    index: HashMap<FieldId, usize>,
}

impl FieldLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Vec<Field>) -> DependencyResult<Self> {
        let mut layout = Self::new();
        for field in fields {
            layout.add(field)?;
        }
        Ok(layout)
    }

    pub fn add(&mut self, field: Field) -> DependencyResult<()> {
        if self.index.contains_key(&field.id) {
            return Err(DependencyError::DuplicateField { field: field.id });
        }
        if let Some(parent) = &field.parent {
            if !self.index.contains_key(parent) {
                return Err(DependencyError::UnknownParent {
                    field: field.id.clone(),
                    parent: parent.clone(),
                });
            }
        }
        self.index.insert(field.id.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Field> {
        self.index.get(id).map(|&i| &self.fields[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Field> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.fields[i]),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn kind_of(&self, id: &str) -> Option<FieldKind> {
        self.get(id).map(|f| f.kind)
    }

    /// The field itself followed by its ancestors, innermost first.
    pub fn ancestors_or_self(&self, id: &str) -> Vec<FieldId> {
        let mut chain = vec![id.to_string()];
        let mut current = self.get(id).and_then(|f| f.parent.clone());
        while let Some(parent) = current {
            current = self.get(&parent).and_then(|f| f.parent.clone());
            chain.push(parent);
        }
        chain
    }

    /// Default values of every field, as assembled by the builder.
    pub fn default_values(&self) -> FieldValues {
        self.fields
            .iter()
            .filter(|f| f.kind != FieldKind::Group)
            .map(|f| (f.id.clone(), f.value.clone()))
            .collect()
    }

    /// Builder-time configuration snapshot (`required` flags).
    pub fn configs(&self) -> BTreeMap<FieldId, FieldConfig> {
        self.fields
            .iter()
            .map(|f| {
                (
                    f.id.clone(),
                    FieldConfig {
                        required: f.required,
                    },
                )
            })
            .collect()
    }
}

/// Mutable per-field configuration that visibility listeners may adjust.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_identifiers() {
        let value = FieldValue::text("business");
        assert_eq!(
            active_identifiers("account_type", FieldKind::Select, &value),
            vec!["account_type-business".to_string()]
        );
        assert!(active_identifiers("account_type", FieldKind::Select, &FieldValue::text(""))
            .is_empty());
    }

    #[test]
    fn test_checkbox_identifiers() {
        assert_eq!(
            active_identifiers("newsletter", FieldKind::Checkbox, &FieldValue::Bool(true)),
            vec!["newsletter".to_string()]
        );
        assert_eq!(
            active_identifiers("topics", FieldKind::Checkbox, &FieldValue::list(["a", "", "b"])),
            vec!["topics-a".to_string(), "topics-b".to_string()]
        );
        assert!(
            active_identifiers("newsletter", FieldKind::Checkbox, &FieldValue::Bool(false))
                .is_empty()
        );
    }

    #[test]
    fn test_hidden_always_active() {
        assert_eq!(
            active_identifiers("mode", FieldKind::Hidden, &FieldValue::Null),
            vec!["mode".to_string()]
        );
        assert_eq!(
            active_identifiers("mode", FieldKind::Hidden, &FieldValue::text("edit")),
            vec!["mode-edit".to_string()]
        );
    }

    #[test]
    fn test_layout_rejects_unknown_parent() {
        let mut layout = FieldLayout::new();
        let err = layout
            .add(Field::new("street", FieldKind::Text).with_parent("address"))
            .unwrap_err();
        assert_eq!(
            err,
            DependencyError::UnknownParent {
                field: "street".into(),
                parent: "address".into()
            }
        );
    }

    #[test]
    fn test_ancestors_or_self() {
        let layout = FieldLayout::from_fields(vec![
            Field::new("billing", FieldKind::Group),
            Field::new("address", FieldKind::Group).with_parent("billing"),
            Field::new("street", FieldKind::Text).with_parent("address"),
        ])
        .unwrap();
        assert_eq!(
            layout.ancestors_or_self("street"),
            vec!["street", "address", "billing"]
        );
    }

    #[test]
    fn test_value_deserializes_untagged() {
        let values: FieldValues =
            serde_json::from_str(r#"{"a": "x", "b": true, "c": ["1", "2"], "d": null}"#).unwrap();
        assert_eq!(values["a"], FieldValue::text("x"));
        assert_eq!(values["b"], FieldValue::Bool(true));
        assert_eq!(values["c"], FieldValue::list(["1", "2"]));
        assert_eq!(values["d"], FieldValue::Null);
    }
}
