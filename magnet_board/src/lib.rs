//! # magnet_board
//!
//! The movable sprites ("magnets") laid over the camera feed, and the pinch
//! gestures that move them.
//!
//! ## Lifecycle of one magnet
//!
//! | From | Condition | To | Effect |
//! |---|---|---|---|
//! | Idle | pinching, near, nobody holds a magnet | Selected | shrink to grab size, snap to the pinch midpoint, take the holder token |
//! | Selected | still pinching | Selected | ease toward the midpoint unless another magnet is in the way |
//! | Selected | fingers apart or hand lost | Idle | restore `base × size_multiplier`, give the token back |
//!
//! The holder token lives in [`MagnetBoard`] and is only written by its
//! transition step, so at most one magnet is ever selected.

pub mod board;
pub mod gesture;
pub mod magnet;

pub use board::{BoardEvent, BoardTuning, MagnetBoard};
pub use gesture::{GestureInterpreter, HandPose, PinchReading};
pub use magnet::{default_specs, Anchor, Magnet, MagnetId, MagnetSpec, BASE_FIT};
