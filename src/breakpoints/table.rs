/*!
 * Breakpoint Table
 * Numbered breakpoints indexed by source line
 */

use super::types::{Breakpoint, BreakpointKind, HitCondition};
use crate::core::errors::BreakpointError;
use crate::core::limits::FIRST_BREAKPOINT_NUMBER;
use crate::core::types::{LineKey, Location};
use crate::eval::ExpressionEvaluator;
use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
struct Inner {
    by_number: BTreeMap<u32, Arc<Breakpoint>>,
    by_line: HashMap<LineKey, Vec<u32>, RandomState>,
    next: u32,
}

/// Shared breakpoint table. Reads happen on every statement boundary of
/// every thread; writes only from the debugger console.
#[derive(Debug)]
pub struct BreakpointTable {
    inner: Arc<RwLock<Inner>>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                by_number: BTreeMap::new(),
                by_line: HashMap::with_hasher(RandomState::new()),
                next: FIRST_BREAKPOINT_NUMBER,
            })),
        }
    }

    /// Add a stop breakpoint. The condition is syntax-checked now so a
    /// typo is reported here rather than at every hit.
    pub fn add_breakpoint(
        &self,
        location: Location,
        condition: Option<String>,
        hit: Option<HitCondition>,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Result<Arc<Breakpoint>, BreakpointError> {
        if let Some(condition) = &condition {
            evaluator
                .check_syntax(condition)
                .map_err(|e| BreakpointError::Syntax(format!("condition '{}': {}", condition, e)))?;
        }
        if let Some(HitCondition::Mod(0)) = hit {
            return Err(BreakpointError::Syntax("'% 0' would never stop".to_string()));
        }
        Ok(self.insert(location, BreakpointKind::Stop { condition, hit }))
    }

    /// Add a tracepoint, optionally displaying an expression
    pub fn add_tracepoint(
        &self,
        location: Location,
        display: Option<String>,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Result<Arc<Breakpoint>, BreakpointError> {
        if let Some(display) = &display {
            evaluator
                .check_syntax(display)
                .map_err(|e| BreakpointError::Syntax(format!("expression '{}': {}", display, e)))?;
        }
        Ok(self.insert(location, BreakpointKind::Trace { display }))
    }

    fn insert(&self, location: Location, kind: BreakpointKind) -> Arc<Breakpoint> {
        let mut inner = self.inner.write();
        let number = inner.next;
        inner.next += 1;

        let key = location.line_key();
        let breakpoint = Arc::new(Breakpoint::new(number, location, kind));
        inner.by_number.insert(number, Arc::clone(&breakpoint));
        inner.by_line.entry(key).or_default().push(number);

        info!(breakpoint = %breakpoint, "Breakpoint set");
        breakpoint
    }

    pub fn remove(&self, number: u32) -> Result<Arc<Breakpoint>, BreakpointError> {
        let mut inner = self.inner.write();
        let breakpoint = inner
            .by_number
            .remove(&number)
            .ok_or(BreakpointError::NotFound(number))?;

        let key = breakpoint.location().line_key();
        if let Some(numbers) = inner.by_line.get_mut(&key) {
            numbers.retain(|n| *n != number);
            if numbers.is_empty() {
                inner.by_line.remove(&key);
            }
        }
        info!(number, "Breakpoint removed");
        Ok(breakpoint)
    }

    /// Breakpoints on the line of `location`, in number order
    pub fn at(&self, location: &Location) -> Vec<Arc<Breakpoint>> {
        let inner = self.inner.read();
        let Some(numbers) = inner.by_line.get(&location.line_key()) else {
            return Vec::new();
        };
        numbers
            .iter()
            .filter_map(|n| inner.by_number.get(n).cloned())
            .collect()
    }

    pub fn get(&self, number: u32) -> Option<Arc<Breakpoint>> {
        self.inner.read().by_number.get(&number).cloned()
    }

    /// All breakpoints, in number order
    pub fn list(&self) -> Vec<Arc<Breakpoint>> {
        self.inner.read().by_number.values().cloned().collect()
    }

    pub fn clear_hits(&self) {
        for breakpoint in self.inner.read().by_number.values() {
            breakpoint.clear_hits();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BreakpointTable {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::SimpleEvaluator;

    fn loc(line: u32) -> Location {
        Location::line("t.spec", line)
    }

    #[test]
    fn test_numbers_start_at_one_and_grow() {
        let table = BreakpointTable::new();
        let eval = SimpleEvaluator::new();
        let a = table.add_breakpoint(loc(3), None, None, &eval).unwrap();
        let b = table.add_tracepoint(loc(3), None, &eval).unwrap();
        assert_eq!(a.number(), 1);
        assert_eq!(b.number(), 2);

        table.remove(1).unwrap();
        let c = table.add_breakpoint(loc(4), None, None, &eval).unwrap();
        assert_eq!(c.number(), 3);
    }

    #[test]
    fn test_lookup_by_line_ignores_column() {
        let table = BreakpointTable::new();
        let eval = SimpleEvaluator::new();
        table.add_breakpoint(loc(3), None, None, &eval).unwrap();
        table.add_tracepoint(loc(3), Some("x".into()), &eval).unwrap();

        let found: Vec<u32> = table
            .at(&Location::new("t.spec", 3, 14))
            .iter()
            .map(|b| b.number())
            .collect();
        assert_eq!(found, vec![1, 2]);
        assert!(table.at(&loc(4)).is_empty());
        assert!(table.at(&Location::line("u.spec", 3)).is_empty());
    }

    #[test]
    fn test_bad_condition_rejected_at_creation() {
        let table = BreakpointTable::new();
        let eval = SimpleEvaluator::new();
        assert!(matches!(
            table.add_breakpoint(loc(1), Some("x >".into()), None, &eval),
            Err(BreakpointError::Syntax(_))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_unknown() {
        let table = BreakpointTable::new();
        assert_eq!(table.remove(5).unwrap_err(), BreakpointError::NotFound(5));
    }

    #[test]
    fn test_remove_cleans_line_index() {
        let table = BreakpointTable::new();
        let eval = SimpleEvaluator::new();
        table.add_breakpoint(loc(8), None, None, &eval).unwrap();
        table.remove(1).unwrap();
        assert!(table.at(&loc(8)).is_empty());
        assert_eq!(table.len(), 0);
    }
}
