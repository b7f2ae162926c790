//! Events the plugin emits.

use bevy::{audio::AudioSource, prelude::*};

use crate::prelude::{SayId, WriteOutcome};

/// Sent once per [`SayRequest`](super::requests::SayRequest), when its line is done or cancelled.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct SayCompleted {
    /// The dialog the line was meant for.
    pub dialog: Entity,
    /// The id of the request.
    pub id: SayId,
    /// Whether the line finished or was cancelled.
    pub outcome: WriteOutcome,
}

/// Audio the host should play. The plugin never plays sounds by itself.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub enum AudioCue {
    /// Play a voice-over once.
    Voiceover {
        /// The dialog speaking.
        dialog: Entity,
        /// The clip to play.
        clip: Handle<AudioSource>,
    },
    /// Play a short typing sound, sent on ticks where characters were revealed.
    TypingSound {
        /// The dialog writing.
        dialog: Entity,
        /// The speaker's sound effect.
        clip: Handle<AudioSource>,
    },
    /// Stop the voice-over of a dialog.
    StopVoiceover {
        /// The dialog whose voice-over ends.
        dialog: Entity,
    },
}

/// Sent when a character on a stage is dimmed or brought back.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortraitDimmed {
    /// The stage the character is on.
    pub stage: Entity,
    /// The character.
    pub character: Entity,
    /// The new dim state.
    pub dimmed: bool,
}
