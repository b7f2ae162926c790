//! Events to drive say dialogs and the notifications they send back.
use bevy::prelude::*;

use self::{notifications::*, requests::*};

pub mod notifications;
pub mod requests;

/// All the built-in events for `bevy_say_dialog`.
pub(crate) struct SayDialogEventsPlugin;

impl Plugin for SayDialogEventsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SayRequest>()
            .add_event::<ContinueRequest>()
            .add_event::<StopSayRequest>()
            .add_event::<ClearSayRequest>()
            .add_event::<SayCompleted>()
            .add_event::<AudioCue>()
            .add_event::<PortraitDimmed>();
    }
}
