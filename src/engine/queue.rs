//! engine::queue
//!
//! Draining logic for the "C5 Operation Queue". The queue itself
//! (`RepoState::pending_operations`, a `VecDeque<PendingOperation>`) lives
//! in `core::model` since it is persisted state; this module is the part
//! that knows how to dispatch a popped unit back through the Engine.

use crate::core::model::PendingOperation;
use crate::engine::{Engine, EngineError};

impl Engine {
    /// Pop and dispatch pending operations one at a time until the queue is
    /// empty or a step raises a merge conflict, in which case the
    /// remaining queue is left intact and this returns normally (the
    /// conflict itself is recorded in `merge_conflict_state`).
    pub(crate) fn drain_queue(&mut self) -> Result<(), EngineError> {
        while let Some(op) = self.state.pending_operations.pop_front() {
            match op {
                PendingOperation::Evolve { base_id, target_id } => {
                    self.run_evolve_step(&base_id, &target_id)?;
                    if self.state.merge_conflict_state.is_some() {
                        // Conflict recorded; remaining queue entries stay
                        // put until rebase_continue resumes from here.
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn enqueue(&mut self, op: PendingOperation) {
        self.state.pending_operations.push_back(op);
    }
}
