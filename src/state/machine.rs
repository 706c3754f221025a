use super::error::{StateError, StateResult};
use super::{GestureEvent, GestureState, GestureTransition};
use crate::editor::hit_test::Handle;
use crate::editor::layer::LayerId;
use crate::geometry::{DocPoint, LayerFrame};

const TRANSITION_LOG_LIMIT: usize = 64;

/// Reference data captured when a gesture starts. Every live frame is derived from it,
/// so intermediate pointer positions never accumulate error.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureCapture {
    Drag {
        start: DocPoint,
        origins: Vec<(LayerId, f64, f64)>,
    },
    Resize {
        layer: LayerId,
        handle: Handle,
        start: DocPoint,
        reference: LayerFrame,
    },
    Rotate {
        layer: LayerId,
        start: DocPoint,
        reference: LayerFrame,
    },
}

impl GestureCapture {
    const fn begin_event(&self) -> GestureEvent {
        match self {
            Self::Drag { .. } => GestureEvent::BeginDrag,
            Self::Resize { .. } => GestureEvent::BeginResize,
            Self::Rotate { .. } => GestureEvent::BeginRotate,
        }
    }
}

#[derive(Debug, Default)]
pub struct GestureMachine {
    state: GestureState,
    capture: Option<GestureCapture>,
    transition_log: Vec<GestureTransition>,
}

impl GestureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn capture(&self) -> Option<&GestureCapture> {
        self.capture.as_ref()
    }

    pub fn can_transition(&self, event: GestureEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: GestureEvent) -> Option<GestureState> {
        use GestureEvent::*;
        match (self.state, event) {
            (GestureState::Idle, BeginDrag) => Some(GestureState::Dragging),
            (GestureState::Idle, BeginResize) => Some(GestureState::Resizing),
            (GestureState::Idle, BeginRotate) => Some(GestureState::Rotating),
            (
                GestureState::Dragging | GestureState::Resizing | GestureState::Rotating,
                Release | Cancel,
            ) => Some(GestureState::Idle),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: GestureEvent) -> StateResult<GestureState> {
        tracing::debug!(from = ?self.state, event = ?event, "request gesture transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid gesture transition requested");
            StateError::InvalidGestureTransition { from, event }
        })?;

        if self.transition_log.len() == TRANSITION_LOG_LIMIT {
            self.transition_log.remove(0);
        }
        self.transition_log
            .push(GestureTransition::new(self.state, event, next));
        self.state = next;
        Ok(self.state)
    }

    /// Enters the gesture phase matching `capture` and keeps it as the reference frame.
    pub fn begin(&mut self, capture: GestureCapture) -> StateResult<GestureState> {
        let state = self.transition(capture.begin_event())?;
        self.capture = Some(capture);
        Ok(state)
    }

    /// Ends the active gesture normally, handing back its capture.
    pub fn release(&mut self) -> StateResult<Option<GestureCapture>> {
        self.transition(GestureEvent::Release)?;
        Ok(self.capture.take())
    }

    /// Abandons the active gesture, handing back its capture so the caller can revert.
    pub fn cancel(&mut self) -> StateResult<Option<GestureCapture>> {
        self.transition(GestureEvent::Cancel)?;
        Ok(self.capture.take())
    }

    pub fn transitions(&self) -> &[GestureTransition] {
        &self.transition_log
    }
}

impl std::fmt::Display for GestureMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GestureState::{:?}", self.state)
    }
}
