//! Prelude for the `bevy_say_dialog` crate.
pub use super::{SayDialogPlugin, SayDialogSet};
pub use super::{
    character::*,
    context::*,
    dialog::{commands::*, fade::*, say::SayCoordinator, *},
    errors::*,
    events::{notifications::*, requests::*},
    settings::*,
    stage::{PortraitTween, Stage, StagePortrait, DIMMED_PORTRAIT_COLOR},
    substitution::*,
    writer::*,
};
