//! Transition sequencing for show/hide.
//!
//! The policy never decides visibility. It turns a show or hide request into
//! an ordered list of steps that the controller executes:
//!
//! ## Key Invariants
//!
//! 1. A show plan enables inputs before its first style mutation.
//! 2. A hide plan disables and clears inputs only in its finalize step.
//! 3. A show finalize never disables or clears.
//! 4. A pending finalize is keyed by element; scheduling a new one for the
//!    same element replaces it, so a re-show cancels an in-flight hide.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    None,
    #[default]
    Fade,
    Slide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationConfig {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: AnimationKind,
    pub duration_ms: u32,
    pub easing: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: AnimationKind::Fade,
            duration_ms: 300,
            easing: "ease-in-out".to_string(),
        }
    }
}

impl AnimationConfig {
    pub fn none() -> Self {
        Self {
            kind: AnimationKind::None,
            ..Self::default()
        }
    }

    /// `enabled = false` and a zero duration both collapse to `none`.
    pub fn effective_kind(&self) -> AnimationKind {
        if !self.enabled || self.duration_ms == 0 {
            AnimationKind::None
        } else {
            self.kind
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLAN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Show,
    Hide,
}

/// Set (`Some`) or remove (`None`) one inline style property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleMutation {
    pub property: String,
    pub value: Option<String>,
}

impl StyleMutation {
    pub fn set(property: &str, value: impl Into<String>) -> Self {
        Self {
            property: property.to_string(),
            value: Some(value.into()),
        }
    }

    pub fn remove(property: &str) -> Self {
        Self {
            property: property.to_string(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeStep {
    pub styles: Vec<StyleMutation>,
    /// Disable the element's inputs and clear their values.
    pub disable_and_clear: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationStep {
    EnableInputs,
    Mutate(Vec<StyleMutation>),
    Wait(u32),
    Finalize(FinalizeStep),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationPlan {
    pub direction: Direction,
    pub steps: Vec<AnimationStep>,
}

impl AnimationPlan {
    /// Total wait before the finalize step runs.
    pub fn duration_ms(&self) -> u32 {
        self.steps
            .iter()
            .map(|s| match s {
                AnimationStep::Wait(ms) => *ms,
                _ => 0,
            })
            .sum()
    }

    pub fn finalize(&self) -> Option<&FinalizeStep> {
        self.steps.iter().find_map(|s| match s {
            AnimationStep::Finalize(f) => Some(f),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationPolicy {
    config: AnimationConfig,
}

impl AnimationPolicy {
    pub fn new(config: AnimationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// `natural_height` is the element's content height in pixels, used by `slide`.
    pub fn plan(&self, direction: Direction, natural_height: Option<u32>) -> AnimationPlan {
        let duration = self.config.duration_ms;
        let height = natural_height
            .map(|h| format!("{}px", h))
            .unwrap_or_else(|| "auto".to_string());

        let steps = match (self.config.effective_kind(), direction) {
            (AnimationKind::None, Direction::Show) => vec![
                AnimationStep::EnableInputs,
                AnimationStep::Mutate(vec![StyleMutation::remove("display")]),
                AnimationStep::Finalize(FinalizeStep {
                    styles: Vec::new(),
                    disable_and_clear: false,
                }),
            ],
            (AnimationKind::None, Direction::Hide) => vec![
                AnimationStep::Mutate(vec![StyleMutation::set("display", "none")]),
                AnimationStep::Finalize(FinalizeStep {
                    styles: Vec::new(),
                    disable_and_clear: true,
                }),
            ],
            (AnimationKind::Fade, Direction::Show) => vec![
                AnimationStep::EnableInputs,
                AnimationStep::Mutate(vec![
                    StyleMutation::remove("display"),
                    StyleMutation::set("opacity", "0"),
                    StyleMutation::set("transition", self.transition(&["opacity"])),
                ]),
                AnimationStep::Mutate(vec![StyleMutation::set("opacity", "1")]),
                AnimationStep::Wait(duration),
                AnimationStep::Finalize(FinalizeStep {
                    styles: vec![
                        StyleMutation::remove("transition"),
                        StyleMutation::remove("opacity"),
                    ],
                    disable_and_clear: false,
                }),
            ],
            (AnimationKind::Fade, Direction::Hide) => vec![
                AnimationStep::Mutate(vec![
                    StyleMutation::set("transition", self.transition(&["opacity"])),
                    StyleMutation::set("opacity", "0"),
                ]),
                AnimationStep::Wait(duration),
                AnimationStep::Finalize(FinalizeStep {
                    styles: vec![
                        StyleMutation::set("display", "none"),
                        StyleMutation::remove("transition"),
                        StyleMutation::remove("opacity"),
                    ],
                    disable_and_clear: true,
                }),
            ],
            (AnimationKind::Slide, Direction::Show) => vec![
                AnimationStep::EnableInputs,
                AnimationStep::Mutate(vec![
                    StyleMutation::remove("display"),
                    StyleMutation::set("overflow", "hidden"),
                    StyleMutation::set("height", "0px"),
                    StyleMutation::set("opacity", "0"),
                    StyleMutation::set("transition", self.transition(&["height", "opacity"])),
                ]),
                AnimationStep::Mutate(vec![
                    StyleMutation::set("height", height),
                    StyleMutation::set("opacity", "1"),
                ]),
                AnimationStep::Wait(duration),
                AnimationStep::Finalize(FinalizeStep {
                    styles: slide_cleanup(),
                    disable_and_clear: false,
                }),
            ],
            (AnimationKind::Slide, Direction::Hide) => vec![
                AnimationStep::Mutate(vec![
                    StyleMutation::set("overflow", "hidden"),
                    StyleMutation::set("height", height),
                    StyleMutation::set("transition", self.transition(&["height", "opacity"])),
                ]),
                AnimationStep::Mutate(vec![
                    StyleMutation::set("height", "0px"),
                    StyleMutation::set("opacity", "0"),
                ]),
                AnimationStep::Wait(duration),
                AnimationStep::Finalize(FinalizeStep {
                    styles: {
                        let mut styles = vec![StyleMutation::set("display", "none")];
                        styles.extend(slide_cleanup());
                        styles
                    },
                    disable_and_clear: true,
                }),
            ],
        };

        AnimationPlan { direction, steps }
    }

    fn transition(&self, properties: &[&str]) -> String {
        properties
            .iter()
            .map(|p| format!("{} {}ms {}", p, self.config.duration_ms, self.config.easing))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn slide_cleanup() -> Vec<StyleMutation> {
    vec![
        StyleMutation::remove("height"),
        StyleMutation::remove("overflow"),
        StyleMutation::remove("opacity"),
        StyleMutation::remove("transition"),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// TIMELINE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledFinalize {
    pub due: u64,
    pub direction: Direction,
    pub step: FinalizeStep,
    seq: u64,
}

/// Virtual clock holding at most one pending finalize per element.
#[derive(Debug, Clone)]
pub struct Timeline<K: Ord + Clone> {
    now: u64,
    next_seq: u64,
    pending: BTreeMap<K, ScheduledFinalize>,
}

impl<K: Ord + Clone> Default for Timeline<K> {
    fn default() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> Timeline<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedule `step` after `delay_ms`, returning the finalize it replaced.
    pub fn schedule(
        &mut self,
        key: K,
        delay_ms: u32,
        direction: Direction,
        step: FinalizeStep,
    ) -> Option<ScheduledFinalize> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            key,
            ScheduledFinalize {
                due: self.now + u64::from(delay_ms),
                direction,
                step,
                seq,
            },
        )
    }

    pub fn cancel(&mut self, key: &K) -> Option<ScheduledFinalize> {
        self.pending.remove(key)
    }

    pub fn pending(&self, key: &K) -> Option<&ScheduledFinalize> {
        self.pending.get(key)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Move the clock forward and return the finalizes that came due, in due order.
    pub fn advance(&mut self, ms: u32) -> Vec<(K, ScheduledFinalize)> {
        self.now += u64::from(ms);
        let now = self.now;
        let due_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut fired: Vec<(K, ScheduledFinalize)> = due_keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p)))
            .collect();
        fired.sort_by_key(|(_, p)| (p.due, p.seq));
        fired
    }
}
