//! The typewriter that reveals a dialog line character by character.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use bevy::{audio::AudioSource, prelude::*};

use crate::{errors::SayDialogError, prelude::SayId};

/// Characters followed by [`Writer::punctuation_pause`].
const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// A shared flag used to ask a write to stop.
///
/// Cancelling only raises the flag; the [`Writer`] notices it on its next tick
/// and ends the write with [`WriteOutcome::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The whole line was revealed and the input wait, if any, was satisfied.
    Finished,
    /// The write was stopped, cleared or superseded before finishing.
    Cancelled,
}

/// The writer's progress on its current line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Nothing to do.
    #[default]
    Idle,
    /// Characters are still being revealed.
    Revealing,
    /// The line is fully shown and the writer waits for a continue request.
    WaitingForInput,
}

/// A line handed to the [`Writer`].
#[derive(Debug, Clone)]
pub struct WriteJob {
    /// The say request this line belongs to.
    pub id: SayId,
    /// The text to reveal.
    pub text: String,
    /// Whether the text already shown is cleared first.
    pub clear_previous: bool,
    /// Whether the writer waits for a continue request once the line is revealed.
    pub wait_for_input: bool,
    /// Whether the voice-over is stopped when the write ends.
    pub stop_voiceover: bool,
    /// Clip to tick while characters are revealed.
    pub sound_effect: Option<Handle<AudioSource>>,
}

/// A write in progress.
#[derive(Debug)]
struct ActiveWrite {
    /// The job being written.
    job: WriteJob,
    /// Characters not revealed yet.
    remaining: VecDeque<char>,
    /// Time accumulated toward the next character.
    timer: f32,
    /// A continue request arrived and was not consumed yet.
    input: bool,
    /// Raised to stop the write on the next tick.
    token: CancellationToken,
}

/// A write that ended during a [`Writer::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEnd {
    /// The say request the write belonged to.
    pub id: SayId,
    /// How it ended.
    pub outcome: WriteOutcome,
    /// Whether the voice-over should be stopped now.
    pub stop_voiceover: bool,
}

/// What happened during one [`Writer::tick`].
#[derive(Debug, Default)]
pub struct WriterTick {
    /// Number of non-whitespace characters revealed.
    pub revealed: usize,
    /// The typing sound of the current line, if any character was revealed.
    pub sound_effect: Option<Handle<AudioSource>>,
    /// Set when the current write ended.
    pub ended: Option<WriteEnd>,
}

/// Reveals text incrementally into a dialog's story text.
///
/// A write goes `Idle -> Revealing -> (WaitingForInput ->) Idle`. While not idle
/// the writer counts as writing, which keeps the dialog opaque.
#[derive(Component, Debug)]
pub struct Writer {
    /// Current progress.
    state: WriterState,
    /// The write in progress, if any.
    active: Option<ActiveWrite>,
    /// The text currently displayed.
    text: String,
    /// Set when `text` changed since the last [`Writer::take_text_change`].
    text_changed: bool,
    /// Characters revealed per second. Zero or less reveals the line at once.
    pub chars_per_second: f32,
    /// Extra delay in seconds after punctuation.
    pub punctuation_pause: f32,
    /// Whether a continue request while revealing shows the rest of the line at once.
    pub instant_complete: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Self {
            state: WriterState::Idle,
            active: None,
            text: String::new(),
            text_changed: false,
            chars_per_second: 40.0,
            punctuation_pause: 0.0,
            instant_complete: true,
        }
    }
}

impl Writer {
    /// Creates an idle writer with the given timings.
    pub fn new(chars_per_second: f32, punctuation_pause: f32, instant_complete: bool) -> Self {
        Self {
            chars_per_second,
            punctuation_pause,
            instant_complete,
            ..default()
        }
    }

    /// Whether a line is being revealed or waits for input.
    pub fn is_writing(&self) -> bool {
        self.state != WriterState::Idle
    }

    /// Whether the writer waits for a continue request.
    pub fn is_waiting_for_input(&self) -> bool {
        self.state == WriterState::WaitingForInput
    }

    /// The current state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// The text displayed so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The say request being written, if any.
    pub fn current(&self) -> Option<SayId> {
        self.active.as_ref().map(|a| a.job.id)
    }

    /// Starts writing `job`. Fails if a write is still in progress.
    ///
    /// Returns the token that cancels this write.
    pub fn write(&mut self, job: WriteJob) -> Result<CancellationToken, SayDialogError> {
        if self.is_writing() {
            return Err(SayDialogError::WriterBusy);
        }
        if job.clear_previous {
            self.set_text(String::new());
        }
        let token = CancellationToken::default();
        self.active = Some(ActiveWrite {
            remaining: job.text.chars().collect(),
            job,
            timer: 0.0,
            input: false,
            token: token.clone(),
        });
        self.state = WriterState::Revealing;
        Ok(token)
    }

    /// Asks the current write to stop. It ends on the next tick.
    pub fn stop(&mut self) {
        if let Some(active) = &self.active {
            active.token.cancel();
        }
    }

    /// Ends the current write right away.
    pub fn abort(&mut self) -> Option<WriteEnd> {
        self.end(WriteOutcome::Cancelled)
    }

    /// Registers a continue request from the player.
    pub fn continue_input(&mut self) {
        if let Some(active) = &mut self.active {
            active.input = true;
        }
    }

    /// Removes the displayed text.
    pub fn clear_text(&mut self) {
        self.set_text(String::new());
    }

    /// Returns the displayed text if it changed since the last call.
    pub(crate) fn take_text_change(&mut self) -> Option<&str> {
        if self.text_changed {
            self.text_changed = false;
            Some(&self.text)
        } else {
            None
        }
    }

    /// Advances the current write by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> WriterTick {
        let mut report = WriterTick::default();
        let Some(active) = &mut self.active else {
            return report;
        };

        if active.token.is_cancelled() {
            report.ended = self.end(WriteOutcome::Cancelled);
            return report;
        }

        if self.state == WriterState::Revealing {
            let reveal_all =
                self.chars_per_second <= 0.0 || (active.input && self.instant_complete);
            active.input = false;

            let mut revealed = String::new();
            if reveal_all {
                revealed.extend(active.remaining.drain(..));
            } else {
                active.timer += dt;
                let interval = 1.0 / self.chars_per_second;
                while active.timer >= interval {
                    let Some(c) = active.remaining.pop_front() else {
                        break;
                    };
                    active.timer -= interval;
                    revealed.push(c);
                    if PUNCTUATION.contains(&c) {
                        active.timer -= self.punctuation_pause;
                    }
                }
            }

            report.revealed = revealed.chars().filter(|c| !c.is_whitespace()).count();
            if report.revealed > 0 {
                report.sound_effect = active.job.sound_effect.clone();
            }

            let done = active.remaining.is_empty();
            let wait = active.job.wait_for_input;
            if !revealed.is_empty() {
                self.text.push_str(&revealed);
                self.text_changed = true;
            }

            if done {
                if wait {
                    self.state = WriterState::WaitingForInput;
                } else {
                    report.ended = self.end(WriteOutcome::Finished);
                }
            }
        } else if self.state == WriterState::WaitingForInput && active.input {
            report.ended = self.end(WriteOutcome::Finished);
        }

        report
    }

    /// Drops the current write and goes back to idle.
    fn end(&mut self, outcome: WriteOutcome) -> Option<WriteEnd> {
        self.state = WriterState::Idle;
        self.active.take().map(|active| WriteEnd {
            id: active.job.id,
            outcome,
            stop_voiceover: active.job.stop_voiceover,
        })
    }

    /// Replaces the displayed text.
    fn set_text(&mut self, text: String) {
        self.text = text;
        self.text_changed = true;
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn writer() -> Writer {
        Writer::new(10.0, 0.0, true)
    }

    fn job(text: &str) -> WriteJob {
        WriteJob {
            id: SayId::next(),
            text: text.to_string(),
            clear_previous: true,
            wait_for_input: false,
            stop_voiceover: false,
            sound_effect: None,
        }
    }

    #[rstest]
    fn reveals_at_speed(mut writer: Writer) {
        let j = job("Hello");
        let id = j.id;
        writer.write(j).unwrap();
        assert!(writer.is_writing());

        let tick = writer.tick(0.25);
        assert_eq!(tick.revealed, 2);
        assert_eq!(writer.text(), "He");
        assert!(tick.ended.is_none());

        let tick = writer.tick(0.3);
        assert_eq!(writer.text(), "Hello");
        assert_eq!(
            tick.ended,
            Some(WriteEnd {
                id,
                outcome: WriteOutcome::Finished,
                stop_voiceover: false
            })
        );
        assert!(!writer.is_writing());
    }

    #[rstest]
    fn busy_writer_rejects_new_write(mut writer: Writer) {
        writer.write(job("one")).unwrap();
        assert_eq!(
            writer.write(job("two")).err(),
            Some(SayDialogError::WriterBusy)
        );
    }

    #[rstest]
    fn waits_for_input(mut writer: Writer) {
        writer.write(WriteJob {
            wait_for_input: true,
            ..job("Hi")
        })
        .unwrap();
        writer.tick(1.0);
        assert!(writer.is_waiting_for_input());
        assert!(writer.is_writing());

        assert!(writer.tick(1.0).ended.is_none());

        writer.continue_input();
        let ended = writer.tick(0.0).ended.unwrap();
        assert_eq!(ended.outcome, WriteOutcome::Finished);
        assert!(!writer.is_waiting_for_input());
        assert!(!writer.is_writing());
    }

    #[rstest]
    fn continue_while_revealing_completes_instantly(mut writer: Writer) {
        writer.write(WriteJob {
            wait_for_input: true,
            ..job("A long line")
        })
        .unwrap();
        writer.continue_input();
        writer.tick(0.0);
        assert_eq!(writer.text(), "A long line");
        // the same request does not also satisfy the input wait
        assert!(writer.is_waiting_for_input());
    }

    #[rstest]
    fn continue_is_ignored_without_instant_complete(mut writer: Writer) {
        writer.instant_complete = false;
        writer.write(job("abc")).unwrap();
        writer.continue_input();
        writer.tick(0.0);
        assert_eq!(writer.text(), "");
    }

    #[rstest]
    fn stop_is_observed_on_next_tick(mut writer: Writer) {
        writer.write(job("Hello")).unwrap();
        writer.tick(0.1);
        writer.stop();
        assert!(writer.is_writing());

        let ended = writer.tick(0.1).ended.unwrap();
        assert_eq!(ended.outcome, WriteOutcome::Cancelled);
        assert!(!writer.is_writing());
        assert_eq!(writer.text(), "H");
    }

    #[rstest]
    fn token_cancels_from_outside(mut writer: Writer) {
        let token = writer.write(job("Hello")).unwrap();
        token.cancel();
        assert_eq!(
            writer.tick(0.0).ended.map(|e| e.outcome),
            Some(WriteOutcome::Cancelled)
        );
    }

    #[rstest]
    fn appends_when_not_clearing(mut writer: Writer) {
        writer.chars_per_second = 0.0;
        writer.write(job("Hello")).unwrap();
        writer.tick(0.0);
        writer
            .write(WriteJob {
                clear_previous: false,
                ..job(" there")
            })
            .unwrap();
        let tick = writer.tick(0.0);
        assert_eq!(writer.text(), "Hello there");
        assert_eq!(tick.revealed, 5);
    }

    #[rstest]
    fn punctuation_pauses(mut writer: Writer) {
        writer.punctuation_pause = 0.5;
        writer.write(job("a.b")).unwrap();
        writer.tick(0.2);
        assert_eq!(writer.text(), "a.");
        writer.tick(0.3);
        assert_eq!(writer.text(), "a.");
        writer.tick(0.4);
        assert_eq!(writer.text(), "a.b");
    }

    #[rstest]
    fn sound_effect_only_on_visible_characters(mut writer: Writer) {
        let clip = Handle::<AudioSource>::weak_from_u128(7);
        writer
            .write(WriteJob {
                sound_effect: Some(clip.clone()),
                ..job(" x")
            })
            .unwrap();
        let tick = writer.tick(0.1);
        assert_eq!(tick.revealed, 0);
        assert!(tick.sound_effect.is_none());

        let tick = writer.tick(0.1);
        assert_eq!(tick.revealed, 1);
        assert_eq!(tick.sound_effect, Some(clip));
    }

    #[rstest]
    fn abort_ends_immediately(mut writer: Writer) {
        assert!(writer.abort().is_none());
        writer.write(job("Hello")).unwrap();
        assert_eq!(
            writer.abort().map(|e| e.outcome),
            Some(WriteOutcome::Cancelled)
        );
        assert_eq!(writer.state(), WriterState::Idle);
    }
}
