//! Errors that can happen when using `bevy_say_dialog`.

use bevy::prelude::Entity;
use thiserror::Error;

/// Errors when handling dialog requests and commands.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SayDialogError {
    /// A request did not name a dialog, there is no active one
    /// and no entity with a `SayDialog` exists.
    #[error("no say dialog is available")]
    NoDialog,
    /// The requested entity does not carry the say dialog components.
    #[error("entity {0:?} is not a say dialog")]
    NotADialog(Entity),
    /// The entity passed as a speaking character has no `Character` component.
    #[error("entity {0:?} is not a character")]
    NotACharacter(Entity),
    /// The entity passed as a stage has no `Stage` component.
    #[error("entity {0:?} is not a stage")]
    NotAStage(Entity),
    /// `Writer::write` was called while another write was still in progress.
    #[error("the writer is still busy with another line")]
    WriterBusy,
}

/// Errors when reading [`SayDialogSettings`](crate::settings::SayDialogSettings).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An [IO Error](std::io::Error)
    #[error("Could not read the file: {0}")]
    Io(#[from] std::io::Error),
    /// A [RON Error](serde_ron::error::SpannedError)
    #[error("Could not parse RON: {0}")]
    RonError(#[from] serde_ron::error::SpannedError),
}
