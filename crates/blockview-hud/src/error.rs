use crate::controls::ControlId;

/// Errors raised by the HUD.
#[derive(Debug, thiserror::Error)]
pub enum HudError {
    #[error("control {0:?} does not exist")]
    UnknownControl(ControlId),

    #[error("cannot attach {child:?} under {parent:?}: it is an ancestor")]
    Cycle { child: ControlId, parent: ControlId },

    #[error("failed to start HUD worker: {0}")]
    Spawn(#[from] std::io::Error),
}
