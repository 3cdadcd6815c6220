/*!
 * Context Arena
 * Per-thread storage for the execution context chain
 *
 * Frames live in generational slots and link to their outer frame by
 * index, so ancestry checks are id comparisons and a stale id held by a
 * StepState can never alias a newer frame that reused the slot.
 */

use crate::core::errors::{EvalResult, EvaluationError};
use crate::core::types::Location;
use crate::eval::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a frame in a [`ContextArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// A call frame; `outer` is the caller's context at the call site
    Root,
    /// A nested scope inside the same call
    Block,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub title: String,
    /// For a root frame, the call site; for a block, where it was opened
    pub location: Location,
    pub kind: FrameKind,
    pub outer: Option<ContextId>,
    bindings: Vec<(String, Value)>,
}

impl Frame {
    pub fn bindings(&self) -> &[(String, Value)] {
        &self.bindings
    }

    pub fn is_root(&self) -> bool {
        self.kind == FrameKind::Root
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    frame: Option<Frame>,
}

/// Arena of execution frames owned by exactly one logical thread
#[derive(Debug, Default)]
pub struct ContextArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ContextArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a call frame whose outer link is the caller's context
    pub fn push_root(
        &mut self,
        title: impl Into<String>,
        location: Location,
        outer: Option<ContextId>,
    ) -> ContextId {
        self.insert(Frame {
            title: title.into(),
            location,
            kind: FrameKind::Root,
            outer,
            bindings: Vec::new(),
        })
    }

    /// Open a nested scope inside `outer`
    pub fn push_block(
        &mut self,
        title: impl Into<String>,
        location: Location,
        outer: ContextId,
    ) -> ContextId {
        self.insert(Frame {
            title: title.into(),
            location,
            kind: FrameKind::Block,
            outer: Some(outer),
            bindings: Vec::new(),
        })
    }

    fn insert(&mut self, frame: Frame) -> ContextId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.frame = Some(frame);
            return ContextId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            frame: Some(frame),
        });
        ContextId {
            index,
            generation: 0,
        }
    }

    /// Close a frame. Its id, and any copy of it, stops resolving.
    pub fn pop(&mut self, id: ContextId) -> Option<Frame> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let frame = slot.frame.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(frame)
    }

    pub fn get(&self, id: ContextId) -> Option<&Frame> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.frame.as_ref())
    }

    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut Frame> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.frame.as_mut())
    }

    #[inline]
    pub fn contains(&self, id: ContextId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live frames
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn outer(&self, id: ContextId) -> Option<ContextId> {
        self.get(id).and_then(|frame| frame.outer)
    }

    /// Walk the outer-chain starting at `id` (inclusive)
    pub fn chain(&self, id: ContextId) -> Chain<'_> {
        Chain {
            arena: self,
            next: Some(id),
        }
    }

    /// Nearest call frame at or above `id`
    pub fn root_of(&self, id: ContextId) -> Option<ContextId> {
        self.chain(id)
            .find(|(_, frame)| frame.is_root())
            .map(|(id, _)| id)
    }

    /// Number of call frames on the chain
    pub fn depth(&self, id: ContextId) -> usize {
        self.chain(id).filter(|(_, frame)| frame.is_root()).count()
    }

    /// True when `ancestor` is on the outer-chain of `of`, excluding `of` itself
    pub fn is_strict_ancestor(&self, ancestor: ContextId, of: ContextId) -> bool {
        self.chain(of).skip(1).any(|(id, _)| id == ancestor)
    }

    /// One evaluation point per call level, innermost first: the context
    /// itself, then the call-site context of each enclosing call frame.
    pub fn call_levels(&self, id: ContextId) -> Vec<ContextId> {
        let mut levels = Vec::new();
        let mut current = Some(id);
        while let Some(ctx) = current {
            if !self.contains(ctx) {
                break;
            }
            levels.push(ctx);
            current = self.root_of(ctx).and_then(|root| self.outer(root));
        }
        levels
    }

    /// Resolve a name along the outer-chain
    pub fn lookup(&self, id: ContextId, name: &str) -> Option<&Value> {
        self.chain(id).find_map(|(_, frame)| {
            frame
                .bindings
                .iter()
                .rev()
                .find(|(bound, _)| bound == name)
                .map(|(_, value)| value)
        })
    }

    /// Introduce (or shadow) a name in the given frame
    pub fn bind(&mut self, id: ContextId, name: impl Into<String>, value: Value) -> EvalResult<()> {
        let frame = self.get_mut(id).ok_or(EvaluationError::StaleContext)?;
        let name = name.into();
        match frame.bindings.iter_mut().find(|(bound, _)| *bound == name) {
            Some((_, slot)) => *slot = value,
            None => frame.bindings.push((name, value)),
        }
        Ok(())
    }

    /// Update the nearest existing binding of `name`
    pub fn assign(&mut self, id: ContextId, name: &str, value: Value) -> EvalResult<()> {
        let owner = self
            .chain(id)
            .find(|(_, frame)| frame.bindings.iter().any(|(bound, _)| bound == name))
            .map(|(owner, _)| owner)
            .ok_or_else(|| EvaluationError::UnknownName(name.to_string()))?;
        self.bind(owner, name, value)
    }
}

/// Iterator over `(id, frame)` from inner to outer
pub struct Chain<'a> {
    arena: &'a ContextArena,
    next: Option<ContextId>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = (ContextId, &'a Frame);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        let frame = self.arena.get(id)?;
        self.next = frame.outer;
        Some((id, frame))
    }
}
