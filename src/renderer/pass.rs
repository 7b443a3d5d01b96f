//! The renderer's pass state machine.
//!
//! One frame runs `Idle → Geometry → Idle → Light → Idle → Overlay → Idle`,
//! one full scene-graph traversal per pass. Passes never nest or
//! interleave; an illegal transition is a fatal error, not a recoverable
//! condition.

use crate::error::RenderError;
use crate::graph::PassKind;
use crate::renderable::RenderQueue;

/// The queue a pass draws from.
pub(crate) fn queue_for(kind: PassKind) -> RenderQueue {
    match kind {
        PassKind::Geometry => RenderQueue::Opaque,
        PassKind::Light => RenderQueue::Lighting,
        PassKind::Overlay => RenderQueue::Overlay,
    }
}

/// Tracks which pass, if any, is currently active.
#[derive(Debug, Default)]
pub(crate) struct PassState {
    active: Option<PassKind>,
}

impl PassState {
    /// Enters `kind`. Fails if any pass is already active.
    pub fn begin(&mut self, kind: PassKind) -> Result<(), RenderError> {
        if let Some(active) = self.active {
            return Err(RenderError::PassOrdering(format!(
                "cannot begin {:?} pass while {:?} pass is active",
                kind, active
            )));
        }
        self.active = Some(kind);
        Ok(())
    }

    /// Leaves `kind`. Fails if `kind` is not the active pass.
    pub fn end(&mut self, kind: PassKind) -> Result<(), RenderError> {
        if self.active != Some(kind) {
            return Err(RenderError::PassOrdering(format!(
                "cannot end {:?} pass; active pass is {:?}",
                kind, self.active
            )));
        }
        self.active = None;
        Ok(())
    }

    /// The active pass, if any.
    pub fn active(&self) -> Option<PassKind> {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_frame_sequence_is_legal() {
        let mut state = PassState::default();
        for kind in [PassKind::Geometry, PassKind::Light, PassKind::Overlay] {
            state.begin(kind).unwrap();
            assert_eq!(state.active(), Some(kind));
            state.end(kind).unwrap();
            assert_eq!(state.active(), None);
        }
    }

    #[test]
    fn nested_pass_is_fatal() {
        let mut state = PassState::default();
        state.begin(PassKind::Geometry).unwrap();

        let err = state.begin(PassKind::Light).unwrap_err();
        assert!(matches!(err, RenderError::PassOrdering(_)));

        // Same-kind nesting is just as illegal.
        let err = state.begin(PassKind::Geometry).unwrap_err();
        assert!(matches!(err, RenderError::PassOrdering(_)));
    }

    #[test]
    fn ending_an_inactive_pass_is_fatal() {
        let mut state = PassState::default();
        assert!(state.end(PassKind::Overlay).is_err());

        state.begin(PassKind::Light).unwrap();
        assert!(state.end(PassKind::Overlay).is_err());
    }

    #[test]
    fn pass_queues_partition_renderables() {
        assert_eq!(queue_for(PassKind::Geometry), RenderQueue::Opaque);
        assert_eq!(queue_for(PassKind::Light), RenderQueue::Lighting);
        assert_eq!(queue_for(PassKind::Overlay), RenderQueue::Overlay);
    }
}
