pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{StateError, StateResult};
pub use event::{GestureEvent, GestureTransition};
pub use machine::{GestureCapture, GestureMachine};
pub use model::GestureState;
