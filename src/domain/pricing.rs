//! Condition catalog and the pricing engine.
//!
//! An event carries an ordered list of [`Condition`]s, each offering priced
//! [`ConditionOption`]s. A participant's [`Selections`] are priced by
//! [`compute_total`], the single place where condition pricing is decided.
//!
//! # Policy
//!
//! Pricing is additive: the total starts from the event's base amount and
//! every matched option adds its (signed) `price_modifier`. A single-select
//! condition contributes the option matching its selected value; a
//! multi-select condition contributes every matched value. Selections that
//! name unknown conditions or options are ignored, since the catalog may have
//! changed after the participant opened the form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How many options of a condition a participant may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ConditionKind {
    /// Exactly one option (rendered as radio buttons).
    #[serde(rename = "radio", alias = "single")]
    Single,
    /// Any number of options (rendered as checkboxes).
    #[serde(rename = "checkbox", alias = "multi")]
    Multi,
}

/// One priced choice of a [`Condition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConditionOption {
    /// Value submitted by the participant when choosing this option.
    #[serde(alias = "id")]
    pub value: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Signed amount added to the total when this option is chosen.
    #[serde(default, alias = "priceModifier")]
    pub price_modifier: i64,
}

/// A named choice dimension on an event, e.g. "meal type".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Condition {
    /// Condition identifier, the key in [`Selections`].
    pub id: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Single- or multi-select.
    #[serde(rename = "type", alias = "kind")]
    pub kind: ConditionKind,
    /// Ordered options.
    #[serde(default)]
    pub options: Vec<ConditionOption>,
}

impl Condition {
    /// Returns the option whose value equals `value`, if any.
    #[must_use]
    pub fn option(&self, value: &str) -> Option<&ConditionOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

/// The participant's choice for one condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Selection {
    /// A single selected value.
    One(String),
    /// Several selected values.
    Many(Vec<String>),
}

impl Selection {
    /// Iterates over the selected values regardless of shape.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(vs) => vs,
        };
        slice.iter().map(String::as_str)
    }
}

/// Participant selections keyed by condition id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Selections(BTreeMap<String, Selection>);

impl Selections {
    /// Creates an empty selection map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selection for a condition, replacing any previous choice.
    #[must_use]
    pub fn with(mut self, condition_id: impl Into<String>, selection: Selection) -> Self {
        self.0.insert(condition_id.into(), selection);
        self
    }

    /// Returns the selection for a condition.
    #[must_use]
    pub fn get(&self, condition_id: &str) -> Option<&Selection> {
        self.0.get(condition_id)
    }

    /// Returns `true` if nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Computes the amount due for the given selections.
///
/// Pure and deterministic. With an empty condition list the result is
/// exactly `base_amount`. The result is not clamped; callers decide how to
/// treat zero or negative totals.
#[must_use]
pub fn compute_total(base_amount: i64, conditions: &[Condition], selections: &Selections) -> i64 {
    conditions.iter().fold(base_amount, |total, condition| {
        let Some(selection) = selections.get(&condition.id) else {
            return total;
        };
        let modifiers: i64 = match condition.kind {
            ConditionKind::Single => selection
                .values()
                .next()
                .and_then(|v| condition.option(v))
                .map_or(0, |o| o.price_modifier),
            ConditionKind::Multi => selection
                .values()
                .filter_map(|v| condition.option(v))
                .map(|o| o.price_modifier)
                .sum(),
        };
        total.saturating_add(modifiers)
    })
}
