//! Per-pass emission guard and render context.
//!
//! ## Key Invariants
//!
//! 1. **Once per key**: the first `once_for` call for a key returns the
//!    generated artifact, every later call returns `None` until `reset`.
//! 2. **Explicit scope**: state lives in a `RenderContext` owned by the caller;
//!    there is no process-wide registry.
//! 3. **Cache outlives passes**: `reset` clears the guard and per-form
//!    animation options but keeps the script cache.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::animation::AnimationConfig;
use crate::cache::ScriptCache;
use crate::controller::{ControllerConfig, TreeConfig};
use crate::script::{form_script_body, namespace, tree_script_body, wrap_script};
use crate::tree::CascadeMode;

#[derive(Debug, Default, Clone)]
pub struct RenderGuard {
    consumed: HashSet<String>,
}

impl RenderGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn once_for<F>(&mut self, key: &str, generator: F) -> Option<String>
    where
        F: FnOnce() -> String,
    {
        if !self.consumed.insert(key.to_string()) {
            debug!(key, "script already emitted in this pass");
            return None;
        }
        Some(generator())
    }

    pub fn is_consumed(&self, key: &str) -> bool {
        self.consumed.contains(key)
    }

    pub fn reset(&mut self) {
        self.consumed.clear();
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RenderContext {
    guard: RenderGuard,
    animations: HashMap<String, AnimationConfig>,
    cache: ScriptCache,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self) -> &RenderGuard {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut RenderGuard {
        &mut self.guard
    }

    pub fn cache(&self) -> &ScriptCache {
        &self.cache
    }

    pub fn set_animation(&mut self, form_id: &str, config: AnimationConfig) {
        self.animations.insert(form_id.to_string(), config);
    }

    pub fn animation(&self, form_id: &str) -> AnimationConfig {
        self.animations.get(form_id).cloned().unwrap_or_default()
    }

    /// Start a new render pass.
    pub fn reset(&mut self) {
        self.guard.reset();
        self.animations.clear();
    }

    /// Inline controller block for a form, or `None` if already emitted this pass.
    pub fn form_script(&mut self, form_id: &str, trees: &[TreeConfig]) -> Option<String> {
        let config = ControllerConfig {
            form_id: form_id.to_string(),
            animation: self.animation(form_id),
            trees: trees.to_vec(),
        };
        let ns = namespace(form_id);
        let cache = &mut self.cache;
        self.guard.once_for(&format!("form:{}", form_id), || {
            let json = config.to_json();
            let body = cache.get_or_insert_with(&["form", ns.as_str(), json.as_str()], || form_script_body(&config));
            wrap_script(&ns, &body)
        })
    }

    pub fn tree_script(&mut self, tree_id: &str, mode: CascadeMode) -> Option<String> {
        let ns = namespace(tree_id);
        let cache = &mut self.cache;
        self.guard.once_for(&format!("tree:{}", tree_id), || {
            let body = cache.get_or_insert_with(&["tree", ns.as_str(), tree_id, mode.as_str()], || {
                tree_script_body(tree_id, mode)
            });
            wrap_script(&ns, &body)
        })
    }
}
