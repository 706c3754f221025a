/// Pointer gesture phase of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging,
    Resizing,
    Rotating,
}

impl GestureState {
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}
