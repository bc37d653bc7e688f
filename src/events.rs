//! Ordered observer list for visibility lifecycle signals.
//!
//! Listeners are kept sorted by priority (highest first, ties in registration
//! order) and may stop propagation. The evaluator and the reactive controller
//! only report transitions through this list; policies such as toggling
//! `required` live in listeners.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::dom::Document;
use crate::field::{FieldConfig, FieldId};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldEventKind {
    Shown,
    Hidden,
    DependencyMet,
    DependencyNotMet,
}

impl FieldEventKind {
    /// Name of the custom DOM event dispatched by the generated script.
    pub fn dom_event_name(&self) -> &'static str {
        match self {
            FieldEventKind::Shown => "dependency:shown",
            FieldEventKind::Hidden => "dependency:hidden",
            FieldEventKind::DependencyMet => "dependency:met",
            FieldEventKind::DependencyNotMet => "dependency:not-met",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEvent {
    pub field: FieldId,
    pub kind: FieldEventKind,
}

impl FieldEvent {
    pub fn new(field: impl Into<String>, kind: FieldEventKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCHER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Observer of events `E` that may mutate a shared context `C`.
pub trait Listener<E, C> {
    fn handle(&mut self, event: &E, context: &mut C) -> Propagation;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registered<E, C> {
    id: ListenerId,
    priority: i32,
    listener: Box<dyn Listener<E, C>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub stopped: bool,
}

pub struct EventDispatcher<E, C> {
    listeners: Vec<Registered<E, C>>,
    next_id: u64,
}

impl<E, C> Default for EventDispatcher<E, C> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E, C> EventDispatcher<E, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, priority: i32, listener: Box<dyn Listener<E, C>>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        // Insert after every listener with priority >= ours to keep ties stable.
        let at = self
            .listeners
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(
            at,
            Registered {
                id,
                priority,
                listener,
            },
        );
        id
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|r| r.id != id);
        self.listeners.len() != before
    }

    pub fn dispatch(&mut self, event: &E, context: &mut C) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for registered in self.listeners.iter_mut() {
            outcome.delivered += 1;
            if registered.listener.handle(event, context) == Propagation::Stop {
                outcome.stopped = true;
                break;
            }
        }
        outcome
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUIRED TOGGLER
// ═══════════════════════════════════════════════════════════════════════════════

pub const REQUIRED_SUSPENDED_ATTR: &str = "data-required-suspended";

/// Clears `required` on hidden fields and restores it once they are shown again.
#[derive(Debug, Default)]
pub struct RequiredToggler {
    suspended: HashSet<FieldId>,
}

impl RequiredToggler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Listener<FieldEvent, BTreeMap<FieldId, FieldConfig>> for RequiredToggler {
    fn handle(
        &mut self,
        event: &FieldEvent,
        configs: &mut BTreeMap<FieldId, FieldConfig>,
    ) -> Propagation {
        let Some(config) = configs.get_mut(&event.field) else {
            return Propagation::Continue;
        };
        match event.kind {
            FieldEventKind::Hidden if config.required => {
                config.required = false;
                self.suspended.insert(event.field.clone());
            }
            FieldEventKind::Shown if self.suspended.remove(&event.field) => {
                config.required = true;
            }
            _ => {}
        }
        Propagation::Continue
    }
}

impl Listener<FieldEvent, Document> for RequiredToggler {
    fn handle(&mut self, event: &FieldEvent, document: &mut Document) -> Propagation {
        let Some(wrapper) = document.find_by_attr(crate::markup::ATTR_DEPENDENT_FIELD, &event.field) else {
            return Propagation::Continue;
        };
        for input in document.form_controls(wrapper) {
            match event.kind {
                FieldEventKind::Hidden if document.has_attr(input, "required") => {
                    document.remove_attr(input, "required");
                    document.set_attr(input, REQUIRED_SUSPENDED_ATTR, "true");
                    self.suspended.insert(event.field.clone());
                }
                FieldEventKind::Shown if document.has_attr(input, REQUIRED_SUSPENDED_ATTR) => {
                    document.remove_attr(input, REQUIRED_SUSPENDED_ATTR);
                    document.set_attr(input, "required", "required");
                    self.suspended.remove(&event.field);
                }
                _ => {}
            }
        }
        Propagation::Continue
    }
}
