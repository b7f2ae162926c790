//! The shared dialog state: which dialog is active and who is speaking.

use bevy::prelude::*;

use crate::errors::SayDialogError;

/// Resource tracking the active say dialog and the last character that spoke.
///
/// Requests that do not name a dialog are routed to [`DialogContext::active_dialog`].
/// The speaking character drives portrait dimming on stages.
#[derive(Resource, Debug, Default)]
pub struct DialogContext {
    /// The dialog used by requests that do not name one.
    pub(crate) active_dialog: Option<Entity>,
    /// The character set by the last `set_character` call, if any.
    pub(crate) speaking_character: Option<Entity>,
}

impl DialogContext {
    /// The dialog used when a request does not name one.
    pub fn active_dialog(&self) -> Option<Entity> {
        self.active_dialog
    }

    /// The character that is currently speaking.
    pub fn speaking_character(&self) -> Option<Entity> {
        self.speaking_character
    }

    /// Picks the dialog a request should go to.
    ///
    /// An explicit entity must satisfy `is_dialog`. Without one, the active dialog is used if it
    /// still exists, else the first of `candidates`, which then becomes the active dialog.
    pub(crate) fn resolve(
        &mut self,
        requested: Option<Entity>,
        is_dialog: impl Fn(Entity) -> bool,
        candidates: impl IntoIterator<Item = Entity>,
    ) -> Result<Entity, SayDialogError> {
        if let Some(e) = requested {
            return if is_dialog(e) {
                Ok(e)
            } else {
                Err(SayDialogError::NotADialog(e))
            };
        }

        if let Some(active) = self.active_dialog.filter(|e| is_dialog(*e)) {
            return Ok(active);
        }

        let first = candidates
            .into_iter()
            .next()
            .ok_or(SayDialogError::NoDialog)?;
        debug!("No active say dialog, falling back to {:?}", first);
        self.active_dialog = Some(first);
        Ok(first)
    }
}
