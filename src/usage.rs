//! Token usage snapshots and cost accounting.
//!
//! Two kinds of [`UsageSnapshot`] flow through a stream:
//!
//! - **Incremental** snapshots — best-effort estimates emitted alongside
//!   each content delta, with `incremental: true`.
//! - One **authoritative** snapshot at completion, sourced from the
//!   provider's final accounting and diffed against everything already
//!   reported, with `incremental: false`.
//!
//! The diffing guarantees the *token-delta invariant*: the sum of all
//! snapshots for a completed stream equals the provider's authoritative
//! totals — no double counting, no under-counting.
//!
//! [`Cost`] tracks monetary cost in **microdollars** (1 USD = 1,000,000
//! microdollars). Integer arithmetic avoids floating-point rounding
//! issues when aggregating costs across many requests. Use
//! [`total_usd`](Cost::total_usd) for display purposes.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Token counts attributed to one slice of a stream (or a whole response).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Tokens consumed by the prompt (messages + system + tool defs).
    pub input_tokens: u64,
    /// Tokens produced by the model's response.
    pub output_tokens: u64,
    /// Tokens used for chain-of-thought reasoning.
    pub reasoning_tokens: u64,
    /// Monetary cost of this slice, when pricing is known.
    pub cost: Option<Cost>,
    /// `true` for best-effort mid-stream estimates, `false` for the
    /// authoritative completion snapshot.
    pub incremental: bool,
}

impl UsageSnapshot {
    /// Creates an incremental (estimated) snapshot.
    pub fn incremental(input_tokens: u64, output_tokens: u64, reasoning_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            reasoning_tokens,
            cost: None,
            incremental: true,
        }
    }

    /// Creates an authoritative snapshot (completion accounting).
    pub fn authoritative(input_tokens: u64, output_tokens: u64, reasoning_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            reasoning_tokens,
            cost: None,
            incremental: false,
        }
    }

    /// Attaches a cost computed from the given pricing table.
    #[must_use]
    pub fn with_pricing(mut self, pricing: &ModelPricing) -> Self {
        self.cost = pricing.compute_cost(self.input_tokens, self.output_tokens);
        self
    }
}

impl AddAssign<&UsageSnapshot> for UsageSnapshot {
    /// Adds another snapshot's token counts in-place.
    ///
    /// Costs are summed with saturation; the `incremental` flag of the
    /// accumulator is left untouched.
    fn add_assign(&mut self, rhs: &Self) {
        self.input_tokens = self.input_tokens.saturating_add(rhs.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(rhs.output_tokens);
        self.reasoning_tokens = self.reasoning_tokens.saturating_add(rhs.reasoning_tokens);
        self.cost = match (self.cost.take(), rhs.cost.clone()) {
            (Some(a), Some(b)) => Some(a + b),
            (Some(c), None) | (None, Some(c)) => Some(c),
            (None, None) => None,
        };
    }
}

/// Callback invoked with cumulative usage at batch boundaries and at
/// stream completion.
///
/// See [`UsageTrackingProcessor`](crate::stream::UsageTrackingProcessor)
/// for the batching contract.
pub type UsageCallback = Arc<dyn Fn(&UsageSnapshot) + Send + Sync>;

/// Monetary cost in microdollars (1 USD = 1,000,000 microdollars).
///
/// Uses integer arithmetic to avoid floating-point accumulation errors.
/// The invariant `total == input + output` is enforced by the
/// constructor and maintained through deserialization.
///
/// # Examples
///
/// ```rust
/// use llm_conduit::Cost;
///
/// let cost = Cost::new(300_000, 150_000).expect("no overflow");
/// assert_eq!(cost.total_microdollars(), 450_000);
/// assert!((cost.total_usd() - 0.45).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cost {
    input: u64,
    output: u64,
    total: u64,
}

impl Default for Cost {
    /// Returns a zero cost.
    fn default() -> Self {
        Self {
            input: 0,
            output: 0,
            total: 0,
        }
    }
}

/// Intermediate type for safe deserialization — recomputes total.
#[derive(Deserialize)]
struct CostRaw {
    input: u64,
    output: u64,
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = CostRaw::deserialize(deserializer)?;
        let total = raw
            .input
            .checked_add(raw.output)
            .ok_or_else(|| serde::de::Error::custom("cost overflow: input + output exceeds u64"))?;
        Ok(Self {
            input: raw.input,
            output: raw.output,
            total,
        })
    }
}

impl Cost {
    /// Creates a new `Cost`, returning `None` if `input + output`
    /// would overflow `u64`.
    pub fn new(input: u64, output: u64) -> Option<Self> {
        let total = input.checked_add(output)?;
        Some(Self {
            input,
            output,
            total,
        })
    }

    /// Cost of the input (prompt) in microdollars.
    pub fn input_microdollars(&self) -> u64 {
        self.input
    }

    /// Cost of the output (completion) in microdollars.
    pub fn output_microdollars(&self) -> u64 {
        self.output
    }

    /// Total cost (`input + output`) in microdollars.
    pub fn total_microdollars(&self) -> u64 {
        self.total
    }

    /// Total cost in US dollars, for display purposes.
    ///
    /// Uses floating-point division — prefer
    /// [`total_microdollars`](Self::total_microdollars) for arithmetic.
    #[allow(clippy::cast_precision_loss)] // microdollar u64 fits f64 mantissa in practice
    pub fn total_usd(&self) -> f64 {
        self.total as f64 / 1_000_000.0
    }
}

impl fmt::Display for Cost {
    /// Formats the cost as a USD string, e.g. `$1.50`.
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.total as f64 / 1_000_000.0)
    }
}

impl Add for Cost {
    type Output = Self;

    /// Adds two costs using saturating arithmetic.
    fn add(self, rhs: Self) -> Self {
        let input = self.input.saturating_add(rhs.input);
        let output = self.output.saturating_add(rhs.output);
        Self {
            input,
            output,
            total: input.saturating_add(output),
        }
    }
}

/// Pricing information for a specific model.
///
/// All prices are in **microdollars per million tokens**. For example,
/// a price of $3.00 per million input tokens would be `3_000_000`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per million input tokens, in microdollars.
    pub input_per_million: u64,
    /// Price per million output tokens, in microdollars.
    pub output_per_million: u64,
}

impl ModelPricing {
    /// Computes the cost of the given token counts, or `None` on overflow.
    pub fn compute_cost(&self, input_tokens: u64, output_tokens: u64) -> Option<Cost> {
        let input = input_tokens
            .checked_mul(self.input_per_million)?
            .checked_div(1_000_000)?;
        let output = output_tokens
            .checked_mul(self.output_per_million)?
            .checked_div(1_000_000)?;
        Cost::new(input, output)
    }
}

/// Estimates the token count of a text fragment.
///
/// Rough heuristic: ~4 chars per token for English. Used for the
/// incremental output-token estimates attached to content deltas; the
/// authoritative completion accounting corrects any drift.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    (text.len() as u64).div_ceil(4).max(1)
}
