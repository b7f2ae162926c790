//! Events the plugin can receive.

use std::sync::atomic::{AtomicU64, Ordering};

use bevy::{audio::AudioSource, prelude::*};

/// Identifies a say request, so its [`SayCompleted`](super::notifications::SayCompleted) can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SayId(u64);

impl SayId {
    /// Hands out a fresh id.
    pub fn next() -> Self {
        /// The counter behind [`SayId::next`].
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Event to make a say dialog write a line of story text.
///
/// If the dialog is still writing a previous line, that line is cancelled first and this
/// one starts once the writer is idle. A [`SayCompleted`](super::notifications::SayCompleted)
/// with the same [`SayId`] is sent exactly once, when the line is done or cancelled.
///
/// ```
/// use bevy_say_dialog::prelude::*;
///
/// let request = SayRequest::new("Hello").keep_visible().no_wait();
/// assert!(request.clear_previous);
/// assert!(!request.fade_when_done);
/// assert!(!request.wait_for_input);
/// ```
#[derive(Event, Debug, Clone)]
pub struct SayRequest {
    /// The id reported back on completion.
    pub id: SayId,
    /// The dialog to write into. `None` targets the active dialog.
    pub dialog: Option<Entity>,
    /// The line to write.
    pub text: String,
    /// Whether the text already shown is cleared first.
    pub clear_previous: bool,
    /// Whether the line waits for a [`ContinueRequest`] once revealed.
    pub wait_for_input: bool,
    /// Whether the dialog fades out once the line is done.
    pub fade_when_done: bool,
    /// Whether the voice-over is stopped when the line ends.
    pub stop_voiceover: bool,
    /// A voice-over played once for this line. It replaces the speaker's typing sound.
    pub voiceover: Option<Handle<AudioSource>>,
    /// An entity whose variables are substituted in the text.
    pub variables: Option<Entity>,
}

impl SayRequest {
    /// Creates a request for the active dialog with the usual defaults:
    /// clear the previous text, wait for input and fade when done.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: SayId::next(),
            dialog: None,
            text: text.into(),
            clear_previous: true,
            wait_for_input: true,
            fade_when_done: true,
            stop_voiceover: false,
            voiceover: None,
            variables: None,
        }
    }

    /// Targets a specific dialog.
    pub fn on(mut self, dialog: Entity) -> Self {
        self.dialog = Some(dialog);
        self
    }

    /// Appends to the text already shown instead of clearing it.
    pub fn append(mut self) -> Self {
        self.clear_previous = false;
        self
    }

    /// Ends the line as soon as it is revealed.
    pub fn no_wait(mut self) -> Self {
        self.wait_for_input = false;
        self
    }

    /// Keeps the dialog visible once the line is done.
    pub fn keep_visible(mut self) -> Self {
        self.fade_when_done = false;
        self
    }

    /// Stops the voice-over when the line ends.
    pub fn stop_voiceover(mut self) -> Self {
        self.stop_voiceover = true;
        self
    }

    /// Plays `clip` once for this line.
    pub fn with_voiceover(mut self, clip: Handle<AudioSource>) -> Self {
        self.voiceover = Some(clip);
        self
    }

    /// Substitutes the variables found on `entity` in the text.
    pub fn with_variables(mut self, entity: Entity) -> Self {
        self.variables = Some(entity);
        self
    }
}

/// Event sent by the player to move on: it ends an input wait, or completes the line
/// being revealed when the writer allows it.
///
/// This event is typically wired to an input from the player, e.g. a mouse click.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ContinueRequest {
    /// The dialog to continue. `None` targets the active dialog.
    pub dialog: Option<Entity>,
}

impl ContinueRequest {
    /// Creates a new `ContinueRequest`.
    pub fn new(dialog: Option<Entity>) -> Self {
        Self { dialog }
    }
}

/// Event to stop the line being written, without waiting for it.
/// The dialog will fade out once the writer is done.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct StopSayRequest {
    /// The dialog to stop. `None` targets the active dialog.
    pub dialog: Option<Entity>,
}

impl StopSayRequest {
    /// Creates a new `StopSayRequest`.
    pub fn new(dialog: Option<Entity>) -> Self {
        Self { dialog }
    }
}

/// Event to clear the story text right away, cancelling the current and queued lines.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ClearSayRequest {
    /// The dialog to clear. `None` targets the active dialog.
    pub dialog: Option<Entity>,
}

impl ClearSayRequest {
    /// Creates a new `ClearSayRequest`.
    pub fn new(dialog: Option<Entity>) -> Self {
        Self { dialog }
    }
}
