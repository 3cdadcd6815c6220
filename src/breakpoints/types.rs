/*!
 * Breakpoint Types
 * Stop breakpoints, tracepoints and hit conditions
 */

use crate::context::{ContextArena, ContextId};
use crate::core::errors::BreakpointConditionError;
use crate::core::types::{Location, VirtualTime};
use crate::eval::{ExpressionEvaluator, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const NEVER_HIT: u64 = u64::MAX;

/// Gate on the hit counter, tested after the counter is incremented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "n", rename_all = "snake_case")]
pub enum HitCondition {
    /// `= n`: only the n-th hit
    Eq(u64),
    /// `> n`
    Gt(u64),
    /// `>= n`
    Ge(u64),
    /// `% n`: every n-th hit
    Mod(u64),
}

impl HitCondition {
    #[inline]
    pub fn matches(self, hits: u64) -> bool {
        match self {
            HitCondition::Eq(n) => hits == n,
            HitCondition::Gt(n) => hits > n,
            HitCondition::Ge(n) => hits >= n,
            HitCondition::Mod(n) => n != 0 && hits % n == 0,
        }
    }
}

impl fmt::Display for HitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitCondition::Eq(n) => write!(f, "= {}", n),
            HitCondition::Gt(n) => write!(f, "> {}", n),
            HitCondition::Ge(n) => write!(f, ">= {}", n),
            HitCondition::Mod(n) => write!(f, "% {}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakpointKind {
    /// Suspends the thread when the hit and boolean conditions both hold
    Stop {
        #[serde(skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hit: Option<HitCondition>,
    },
    /// Emits a line of text and never suspends
    Trace {
        #[serde(skip_serializing_if = "Option::is_none")]
        display: Option<String>,
    },
}

/// A user breakpoint. Hit bookkeeping is atomic so any thread reaching
/// the location can count without the table lock.
#[derive(Debug)]
pub struct Breakpoint {
    number: u32,
    location: Location,
    kind: BreakpointKind,
    hits: AtomicU64,
    last_hit: AtomicU64,
}

impl Breakpoint {
    pub(crate) fn new(number: u32, location: Location, kind: BreakpointKind) -> Self {
        Self {
            number,
            location,
            kind,
            hits: AtomicU64::new(0),
            last_hit: AtomicU64::new(NEVER_HIT),
        }
    }

    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn kind(&self) -> &BreakpointKind {
        &self.kind
    }

    #[inline]
    pub fn is_trace(&self) -> bool {
        matches!(self.kind, BreakpointKind::Trace { .. })
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Virtual time of the most recent hit
    pub fn last_hit(&self) -> Option<VirtualTime> {
        match self.last_hit.load(Ordering::Relaxed) {
            NEVER_HIT => None,
            at => Some(at),
        }
    }

    /// Count a hit at `now`; returns the new hit count
    pub fn record_hit(&self, now: VirtualTime) -> u64 {
        self.last_hit.store(now, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn clear_hits(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.last_hit.store(NEVER_HIT, Ordering::Relaxed);
    }

    /// Decide whether a thread that just hit this breakpoint suspends.
    /// Tracepoints never do.
    pub fn should_suspend(
        &self,
        evaluator: &dyn ExpressionEvaluator,
        contexts: &ContextArena,
        ctx: ContextId,
    ) -> Result<bool, BreakpointConditionError> {
        let BreakpointKind::Stop { condition, hit } = &self.kind else {
            return Ok(false);
        };
        if let Some(hit) = hit {
            if !hit.matches(self.hits()) {
                return Ok(false);
            }
        }
        let Some(condition) = condition else {
            return Ok(true);
        };

        match evaluator.evaluate(condition, contexts, ctx) {
            Ok(Value::Bool(b)) => Ok(b),
            Ok(other) => Err(BreakpointConditionError::NotBoolean {
                number: self.number,
                condition: condition.clone(),
                value: other.to_string(),
            }),
            Err(e) => Err(BreakpointConditionError::Evaluation {
                number: self.number,
                condition: condition.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Text emitted by a tracepoint
    pub fn render_trace(
        &self,
        evaluator: &dyn ExpressionEvaluator,
        contexts: &ContextArena,
        ctx: ContextId,
    ) -> String {
        match &self.kind {
            BreakpointKind::Trace { display: Some(expr) } => {
                match evaluator.evaluate(expr, contexts, ctx) {
                    Ok(value) => format!("Tracepoint [{}]: {} = {}", self.number, expr, value),
                    Err(e) => format!("Tracepoint [{}]: {} failed: {}", self.number, expr, e),
                }
            }
            _ => format!("Tracepoint [{}]: {}", self.number, self.location),
        }
    }

    pub fn info(&self) -> BreakpointInfo {
        BreakpointInfo {
            number: self.number,
            location: self.location.clone(),
            kind: self.kind.clone(),
            hits: self.hits(),
            last_hit: self.last_hit(),
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BreakpointKind::Stop { condition, hit } => {
                write!(f, "[{}] break at {}", self.number, self.location)?;
                if let Some(hit) = hit {
                    write!(f, " {}", hit)?;
                }
                if let Some(condition) = condition {
                    write!(f, " when {}", condition)?;
                }
            }
            BreakpointKind::Trace { display } => {
                write!(f, "[{}] trace at {}", self.number, self.location)?;
                if let Some(display) = display {
                    write!(f, " show {}", display)?;
                }
            }
        }
        write!(f, " (hits {})", self.hits())
    }
}

/// Serializable view of a breakpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointInfo {
    pub number: u32,
    pub location: Location,
    #[serde(flatten)]
    pub kind: BreakpointKind,
    pub hits: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_hit: Option<VirtualTime>,
}
