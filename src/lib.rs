#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![forbid(unsafe_code)]
#![warn(clippy::doc_markdown)]
// Often exceeded by queries
#![allow(clippy::type_complexity)]
// Unhelpful for systems
#![allow(clippy::too_many_arguments)]

//! [`bevy_say_dialog`] is a Bevy plugin that shows character dialogue in a say dialog:
//! a box with the speaker name, a portrait and story text revealed by a typewriter,
//! fading in while a line is written and out once it is done.

use bevy::prelude::*;
use bevy_trait_query::RegisterExt;

use dialog::{
    fade::{apply_dialog_alpha, update_fade},
    say::{
        drive_writers, handle_clear_requests, handle_continue_requests, handle_say_requests,
        handle_stop_requests,
    },
};
use events::SayDialogEventsPlugin;
use prelude::{
    DialogContext, SayDialogError, SayDialogSettings, SayDialogSettingsLoader,
    SubstituteVariables, Variables,
};
use settings::apply_loaded_settings;
use stage::tick_portrait_tweens;

pub mod character;
pub mod context;
pub mod dialog;
pub mod errors;
pub mod events;
pub mod prelude;
pub mod settings;
pub mod stage;
pub mod substitution;
pub mod writer;

/// The plugin that runs say dialogs.
pub struct SayDialogPlugin;

/// The systems of the plugin, in the order they run.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SayDialogSet;

impl Plugin for SayDialogPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DialogContext>()
            .init_resource::<SayDialogSettings>()
            .init_asset::<SayDialogSettings>()
            .init_asset_loader::<SayDialogSettingsLoader>()
            .register_component_as::<dyn SubstituteVariables, Variables>()
            .add_plugins(SayDialogEventsPlugin)
            .add_systems(
                Update,
                (
                    handle_say_requests.pipe(error_handler),
                    handle_continue_requests.pipe(error_handler),
                    handle_stop_requests.pipe(error_handler),
                    handle_clear_requests.pipe(error_handler),
                    drive_writers.pipe(error_handler),
                    update_fade,
                    apply_dialog_alpha,
                    tick_portrait_tweens,
                )
                    .chain()
                    .in_set(SayDialogSet),
            )
            .add_systems(PreUpdate, apply_loaded_settings);
        info!("SayDialogPlugin registered");
    }
}

/// Logs the errors of the request systems.
fn error_handler(In(result): In<Result<(), SayDialogError>>) {
    if let Err(err) = result {
        error!("Say dialog error: {}", err);
    }
}
