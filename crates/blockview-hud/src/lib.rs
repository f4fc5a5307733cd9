//! Heads-up display for the block viewer.
//!
//! The HUD is rasterized on the CPU into an RGBA bitmap by a background
//! [`HudWorker`] and composited over the frame by the renderer. It holds the
//! crosshair, heading and pitch scales, position readout, and a pause menu
//! built from a small retained control tree.

pub mod controls;
pub mod error;
pub mod font;
pub mod overlay;
pub mod pause;
pub mod raster;
pub mod worker;

pub use controls::{Control, ControlId, ControlKind, ControlTree, Pointer, PointerOutcome, Rect};
pub use error::HudError;
pub use overlay::{HudState, draw_hud};
pub use pause::{PauseAction, PauseScreen};
pub use raster::Canvas;
pub use worker::{DEFAULT_IDLE_SLEEP, HudWorker};
