//! # Form Cascade
//!
//! Conditional field visibility, checkbox-tree cascades and the reactive
//! controller keeping both in sync with a live document.
//!
//! ## Visibility Invariants
//!
//! 1. **One Rule, Two Sides**: server evaluation (`VisibilityEvaluator`) and
//!    the client controller (`ReactiveController`, and the generated script)
//!    compute active identifiers with the same rule (`field::active_identifiers`).
//!    A dependent rendered hidden on the server stays hidden on attach.
//!
//! 2. **Fail-Safe Hidden**: an unknown controller, an empty trigger set or a
//!    select reset to its empty value hides the dependents of that group.
//!
//! 3. **Transitive Hide**: a field inside a hidden dependent is hidden, and a
//!    controller inside a hidden dependent contributes no identifiers.
//!
//! 4. **Acyclic Groups**: dependency groups form a DAG. Cycles are rejected
//!    when the graph is built (`DEP-ERR-CYCLE`) and when a controller attaches
//!    to markup that contains one.
//!
//! ## Tree Invariants
//!
//! 1. **Cascade Down**: checking a parent checks every enabled descendant.
//! 2. **Tri-State Up**: a parent is checked, unchecked or indeterminate from
//!    its direct enabled children only.
//! 3. **Frozen Disabled**: disabled nodes are never changed by a cascade and
//!    cannot be toggled.
//!
//! ## Emission
//!
//! Controller scripts are emitted at most once per form or tree per render
//! pass (`RenderContext`); generated bodies are cached across passes.

pub mod animation;
pub mod cache;
pub mod cascade;
pub mod controller;
pub mod declaration;
pub mod dom;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod field;
pub mod form;
pub mod guard;
pub mod markup;
pub mod pipeline;
pub mod script;
pub mod tree;
pub mod tree_controller;

#[cfg(feature = "napi")]
mod native;

#[cfg(test)]
mod controller_tests;
#[cfg(test)]
mod scenario_tests;

#[cfg(feature = "napi")]
pub use native::{evaluate_visibility_native, render_form_script_native, render_tree_script_native};

pub use animation::{AnimationConfig, AnimationKind, AnimationPolicy, Direction, Timeline};
pub use cascade::{recompute_tri_state, CascadePropagator};
pub use controller::{ControllerConfig, DomEvent, ReactiveController, TreeConfig};
pub use declaration::{DependencyDeclaration, DependencyGraph};
pub use dom::{Document, NodeId};
pub use error::{DependencyError, DependencyResult};
pub use evaluator::{evaluate, VisibilityEvaluator, VisibilityMap};
pub use events::{EventDispatcher, FieldEvent, FieldEventKind, Listener, Propagation, RequiredToggler};
pub use field::{Field, FieldKind, FieldLayout, FieldValue, FieldValues};
pub use form::{FieldGroupBuilder, Form, FormBuilder, RowPrototype};
pub use guard::{RenderContext, RenderGuard};
pub use pipeline::{FieldOptions, FieldTypeRegistry, FieldTypeStage, FieldView};
pub use tree::{CascadeMode, CheckboxTree, TreeNode, TriState};
pub use tree_controller::TreeBinding;
