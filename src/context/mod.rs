/*!
 * Context Module
 * The execution context chain a logical thread evaluates in
 */

mod arena;

pub use arena::{Chain, ContextArena, ContextId, Frame, FrameKind};
