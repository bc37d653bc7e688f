//! Error types for the dependency engine.
//!
//! Every error carries a stable diagnostic code and the guarantee that the
//! violated check protects. Misconfiguration that the end user could hit at
//! runtime (missing elements, unknown controllers) is never an error: it is
//! logged and degrades to "field stays hidden".

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_CYCLE: &str = "DEP-ERR-CYCLE";
pub const ERR_SELF_DEPENDENCY: &str = "DEP-ERR-SELF";
pub const ERR_GROUP_CONFLICT: &str = "DEP-ERR-GROUP-CONFLICT";
pub const ERR_UNKNOWN_PARENT: &str = "DEP-ERR-UNKNOWN-PARENT";
pub const ERR_DUPLICATE_FIELD: &str = "DEP-ERR-DUPLICATE-FIELD";
pub const ERR_TREE_DUPLICATE: &str = "TREE-ERR-DUPLICATE-VALUE";
pub const ERR_TREE_CYCLE: &str = "TREE-ERR-CYCLE";
pub const ERR_TREE_UNKNOWN_PARENT: &str = "TREE-ERR-UNKNOWN-PARENT";
pub const ERR_TREE_PATH: &str = "TREE-ERR-PATH";
pub const ERR_TREE_DISABLED: &str = "TREE-ERR-DISABLED";
pub const ERR_FORM_MISSING: &str = "DOM-ERR-FORM-MISSING";
pub const ERR_CONFIG: &str = "CFG-ERR-INVALID";
pub const ERR_SCRIPT_SYNTAX: &str = "SCRIPT-ERR-SYNTAX";
pub const ERR_UNKNOWN_TYPE: &str = "TYPE-ERR-UNKNOWN";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_CYCLE => "Dependency declarations form a DAG from controller to dependents.",
        ERR_SELF_DEPENDENCY => "A field never controls its own visibility.",
        ERR_GROUP_CONFLICT => "Every dependent belongs to exactly one group.",
        ERR_UNKNOWN_PARENT => "Field containment only references fields declared earlier.",
        ERR_DUPLICATE_FIELD => "Field identifiers are unique within a form.",
        ERR_TREE_DUPLICATE => "Checkbox tree values are unique within a tree.",
        ERR_TREE_CYCLE => "Checkbox tree parent links form a forest.",
        ERR_TREE_UNKNOWN_PARENT => "Checkbox tree parent links reference existing nodes.",
        ERR_TREE_PATH => "Toggle paths address an existing tree node.",
        ERR_TREE_DISABLED => "Disabled tree nodes are never toggled by user input.",
        ERR_FORM_MISSING => "A controller is only attached to a form present in the document.",
        ERR_CONFIG => "Controller configuration is valid JSON of the documented shape.",
        ERR_SCRIPT_SYNTAX => "Generated controller scripts are syntactically valid JavaScript.",
        ERR_UNKNOWN_TYPE => "Field types are registered before use.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPENDENCY ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DependencyError {
    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("field '{field}' cannot depend on itself")]
    SelfDependency { field: String },

    #[error("dependent '{field}' is declared in groups '{first}' and '{second}'")]
    GroupConflict {
        field: String,
        first: String,
        second: String,
    },

    #[error("field '{field}' references unknown parent '{parent}'")]
    UnknownParent { field: String, parent: String },

    #[error("field '{field}' is declared twice")]
    DuplicateField { field: String },

    #[error("tree '{tree}' contains value '{value}' more than once")]
    DuplicateTreeValue { tree: String, value: String },

    #[error("tree '{tree}' parent links contain a cycle through '{value}'")]
    TreeCycle { tree: String, value: String },

    #[error("tree '{tree}' node '{value}' references unknown parent '{parent}'")]
    UnknownTreeParent {
        tree: String,
        value: String,
        parent: String,
    },

    #[error("path {path:?} does not address a node")]
    InvalidTreePath { path: Vec<usize> },

    #[error("tree '{tree}' node '{value}' is disabled")]
    DisabledTreeNode { tree: String, value: String },

    #[error("form '{form_id}' not found in document")]
    FormNotFound { form_id: String },

    #[error("invalid controller configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("generated script for '{namespace}' does not parse: {}", .errors.join("; "))]
    ScriptSyntax {
        namespace: String,
        errors: Vec<String>,
    },

    #[error("unknown field type '{name}'")]
    UnknownFieldType { name: String },
}

impl DependencyError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cycle { .. } => ERR_CYCLE,
            Self::SelfDependency { .. } => ERR_SELF_DEPENDENCY,
            Self::GroupConflict { .. } => ERR_GROUP_CONFLICT,
            Self::UnknownParent { .. } => ERR_UNKNOWN_PARENT,
            Self::DuplicateField { .. } => ERR_DUPLICATE_FIELD,
            Self::DuplicateTreeValue { .. } => ERR_TREE_DUPLICATE,
            Self::TreeCycle { .. } => ERR_TREE_CYCLE,
            Self::UnknownTreeParent { .. } => ERR_TREE_UNKNOWN_PARENT,
            Self::InvalidTreePath { .. } => ERR_TREE_PATH,
            Self::DisabledTreeNode { .. } => ERR_TREE_DISABLED,
            Self::FormNotFound { .. } => ERR_FORM_MISSING,
            Self::InvalidConfig { .. } => ERR_CONFIG,
            Self::ScriptSyntax { .. } => ERR_SCRIPT_SYNTAX,
            Self::UnknownFieldType { .. } => ERR_UNKNOWN_TYPE,
        }
    }

    /// The invariant this error protects, for developer-facing diagnostics.
    pub fn guarantee(&self) -> &'static str {
        get_guarantee(self.code())
    }
}

pub type DependencyResult<T> = Result<T, DependencyError>;
