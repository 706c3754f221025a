use super::model::GestureState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    BeginDrag,
    BeginResize,
    BeginRotate,
    Release,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTransition {
    pub from: GestureState,
    pub event: GestureEvent,
    pub to: GestureState,
}

impl GestureTransition {
    pub const fn new(from: GestureState, event: GestureEvent, to: GestureState) -> Self {
        Self { from, event, to }
    }
}
