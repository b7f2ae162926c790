//! Handling of say requests: routing them to a dialog and driving its writer.

use bevy::{ecs::system::SystemParam, prelude::*};

use crate::prelude::{
    AudioCue, Character, ClearSayRequest, ContinueRequest, DialogContext, DialogFade, SayCompleted,
    SayDialog, SayDialogError, SayRequest, StopSayRequest, SubstituteVariables, WriteEnd,
    WriteJob, WriteOutcome, Writer,
};

use super::set_text_value;

/// Holds the say request that arrived while the writer was busy.
///
/// Only the latest one is kept: a newer request cancels the queued one.
#[derive(Component, Debug, Default)]
pub struct SayCoordinator {
    /// The request to start once the writer is idle.
    pending: Option<SayRequest>,
}

impl SayCoordinator {
    /// The request waiting for the writer, if any.
    pub fn pending(&self) -> Option<&SayRequest> {
        self.pending.as_ref()
    }
}

/// The say dialogs with everything a request touches.
type DialogQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static mut SayDialog,
        &'static mut DialogFade,
        &'static mut Writer,
        &'static mut SayCoordinator,
        &'static mut Visibility,
    ),
>;

/// What starting and finishing a line needs besides the dialog itself.
#[derive(SystemParam)]
pub(crate) struct SayServices<'w, 's> {
    /// Characters, for their typing sound.
    characters: Query<'w, 's, &'static Character>,
    /// Variable providers.
    substitutions: Query<'w, 's, &'static dyn SubstituteVariables>,
    /// Outgoing audio cues.
    audio: EventWriter<'w, AudioCue>,
    /// Outgoing completions.
    completed: EventWriter<'w, SayCompleted>,
}

impl<'w, 's> SayServices<'w, 's> {
    /// Shows `dialog` and hands `request` to its writer.
    fn start(
        &mut self,
        speaker: Option<Entity>,
        dialog: Entity,
        request: SayRequest,
        say_dialog: &mut SayDialog,
        fade: &mut DialogFade,
        writer: &mut Writer,
        visibility: &mut Visibility,
    ) -> Result<(), SayDialogError> {
        say_dialog.active = true;
        *visibility = Visibility::Inherited;
        fade.fade_when_done = request.fade_when_done;
        fade.show();

        let sound_effect = match request.voiceover {
            Some(clip) => {
                self.audio.send(AudioCue::Voiceover { dialog, clip });
                None
            }
            None => speaker
                .and_then(|c| self.characters.get(c).ok())
                .and_then(|c| c.sound_effect.clone()),
        };

        let mut text = request.text;
        if let Some(vars) = request.variables {
            if let Ok(substitutions) = self.substitutions.get(vars) {
                for s in &substitutions {
                    text = s.substitute_variables(&text);
                }
            }
        }

        info!("Say dialog {:?} writes \"{}\"", dialog, text);
        writer.write(WriteJob {
            id: request.id,
            text,
            clear_previous: request.clear_previous,
            wait_for_input: request.wait_for_input,
            stop_voiceover: request.stop_voiceover,
            sound_effect,
        })?;
        Ok(())
    }

    /// Reports the end of a write.
    fn finish(&mut self, dialog: Entity, end: WriteEnd) {
        if end.stop_voiceover {
            self.audio.send(AudioCue::StopVoiceover { dialog });
        }
        debug!("Say {:?} on {:?} ended: {:?}", end.id, dialog, end.outcome);
        self.completed.send(SayCompleted {
            dialog,
            id: end.id,
            outcome: end.outcome,
        });
    }

    /// Reports a queued request that never got to start.
    fn cancel_pending(&mut self, dialog: Entity, request: SayRequest) {
        debug!("Say {:?} on {:?} dropped before starting", request.id, dialog);
        self.completed.send(SayCompleted {
            dialog,
            id: request.id,
            outcome: WriteOutcome::Cancelled,
        });
    }
}

/// Picks the dialog a request goes to.
fn resolve(
    ctx: &mut DialogContext,
    requested: Option<Entity>,
    dialogs: &DialogQuery,
) -> Result<Entity, SayDialogError> {
    let candidates: Vec<Entity> = dialogs.iter().map(|item| item.0).collect();
    ctx.resolve(requested, |e| dialogs.contains(e), candidates)
}

/// Starts say requests, or queues them behind the line being written.
pub(crate) fn handle_say_requests(
    mut requests: EventReader<SayRequest>,
    mut ctx: ResMut<DialogContext>,
    mut dialogs: DialogQuery,
    mut services: SayServices,
) -> Result<(), SayDialogError> {
    for request in requests.read() {
        let dialog = resolve(&mut ctx, request.dialog, &dialogs)?;
        let (_, mut say_dialog, mut fade, mut writer, mut coordinator, mut visibility) = dialogs
            .get_mut(dialog)
            .map_err(|_| SayDialogError::NotADialog(dialog))?;

        let request = SayRequest {
            dialog: Some(dialog),
            ..request.clone()
        };

        if writer.is_writing() || coordinator.pending.is_some() {
            debug!("Say dialog {:?} busy, queueing {:?}", dialog, request.id);
            writer.stop();
            if let Some(replaced) = coordinator.pending.replace(request) {
                services.cancel_pending(dialog, replaced);
            }
        } else {
            services.start(
                ctx.speaking_character,
                dialog,
                request,
                &mut say_dialog,
                &mut fade,
                &mut writer,
                &mut visibility,
            )?;
        }
    }
    Ok(())
}

/// Forwards continue requests to the writers.
pub(crate) fn handle_continue_requests(
    mut requests: EventReader<ContinueRequest>,
    mut ctx: ResMut<DialogContext>,
    mut dialogs: DialogQuery,
) -> Result<(), SayDialogError> {
    for request in requests.read() {
        let dialog = resolve(&mut ctx, request.dialog, &dialogs)?;
        if let Ok((_, _, _, mut writer, _, _)) = dialogs.get_mut(dialog) {
            writer.continue_input();
        }
    }
    Ok(())
}

/// Stops the current line. The dialog fades out once the writer is idle.
pub(crate) fn handle_stop_requests(
    mut requests: EventReader<StopSayRequest>,
    mut ctx: ResMut<DialogContext>,
    mut dialogs: DialogQuery,
) -> Result<(), SayDialogError> {
    for request in requests.read() {
        let dialog = resolve(&mut ctx, request.dialog, &dialogs)?;
        if let Ok((_, _, mut fade, mut writer, _, _)) = dialogs.get_mut(dialog) {
            fade.fade_when_done = true;
            writer.stop();
        }
    }
    Ok(())
}

/// Clears the story text and cancels the current and queued lines.
pub(crate) fn handle_clear_requests(
    mut requests: EventReader<ClearSayRequest>,
    mut ctx: ResMut<DialogContext>,
    mut dialogs: DialogQuery,
    mut services: SayServices,
) -> Result<(), SayDialogError> {
    for request in requests.read() {
        let dialog = resolve(&mut ctx, request.dialog, &dialogs)?;
        let Ok((_, _, mut fade, mut writer, mut coordinator, _)) = dialogs.get_mut(dialog) else {
            continue;
        };
        if let Some(end) = writer.abort() {
            services.finish(dialog, end);
        }
        if let Some(pending) = coordinator.pending.take() {
            services.cancel_pending(dialog, pending);
        }
        writer.clear_text();
        fade.reset_cooldown();
    }
    Ok(())
}

/// Advances every writer and mirrors its progress onto the dialog UI.
pub(crate) fn drive_writers(
    time: Res<Time>,
    ctx: Res<DialogContext>,
    mut dialogs: DialogQuery,
    mut services: SayServices,
    mut texts: Query<&mut Text>,
    mut indicators: Query<&mut Visibility, Without<SayDialog>>,
) -> Result<(), SayDialogError> {
    let dt = time.delta_seconds();
    for (dialog, mut say_dialog, mut fade, mut writer, mut coordinator, mut visibility) in
        &mut dialogs
    {
        let tick = writer.tick(dt);
        if let Some(clip) = tick.sound_effect {
            services.audio.send(AudioCue::TypingSound { dialog, clip });
        }
        if let Some(end) = tick.ended {
            services.finish(dialog, end);
        }

        if !writer.is_writing() {
            if let Some(next) = coordinator.pending.take() {
                services.start(
                    ctx.speaking_character,
                    dialog,
                    next,
                    &mut say_dialog,
                    &mut fade,
                    &mut writer,
                    &mut visibility,
                )?;
            }
        }

        if let Some(indicator) = say_dialog.parts.continue_indicator {
            if let Ok(mut indicator) = indicators.get_mut(indicator) {
                *indicator = if writer.is_waiting_for_input() {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                };
            }
        }

        if let Some(story) = say_dialog.parts.story_text {
            if let Some(value) = writer.take_text_change() {
                if let Ok(mut text) = texts.get_mut(story) {
                    set_text_value(&mut text, value, None);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bevy::{audio::AudioSource, ecs::system::CommandQueue, prelude::*};
    use rstest::{fixture, rstest};

    use crate::{
        prelude::*,
        tests::{audio_cues, completions, say_minimal_app, story_text_value},
    };

    /// An app with one dialog spawned from the default settings.
    struct DialogSetup {
        /// The app.
        app: App,
        /// The dialog root.
        dialog: Entity,
    }

    impl DialogSetup {
        /// Sends `event` and runs one frame.
        fn send<E: Event>(&mut self, event: E) {
            self.app.world.send_event(event);
            self.app.update();
        }

        /// The writer of the dialog.
        fn writer(&self) -> &Writer {
            self.app.world.get::<Writer>(self.dialog).unwrap()
        }

        /// The fade of the dialog.
        fn fade(&self) -> &DialogFade {
            self.app.world.get::<DialogFade>(self.dialog).unwrap()
        }

        /// The visibility of the continue indicator.
        fn indicator(&self) -> Visibility {
            let parts = self.app.world.get::<SayDialog>(self.dialog).unwrap().parts;
            *self
                .app
                .world
                .get::<Visibility>(parts.continue_indicator.unwrap())
                .unwrap()
        }

        /// Whether the dialog is active.
        fn active(&self) -> bool {
            self.app.world.get::<SayDialog>(self.dialog).unwrap().is_active()
        }
    }

    #[fixture]
    fn setup() -> DialogSetup {
        let mut app = say_minimal_app();
        let mut queue = CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &app.world);
        let dialog = commands.spawn_say_dialog(&SayDialogSettings::default()).id();
        queue.apply(&mut app.world);
        app.update();
        DialogSetup { app, dialog }
    }

    #[rstest]
    fn say_waits_then_fades_out(mut setup: DialogSetup) {
        let request = SayRequest::new("Hello");
        let id = request.id;
        setup.send(request);
        assert!(setup.active());
        assert!(setup.writer().is_writing());

        for _ in 0..10 {
            setup.app.update();
        }
        assert!(setup.writer().is_waiting_for_input());
        assert_eq!(setup.fade().alpha(), 1.0);
        assert_eq!(story_text_value(&setup.app, setup.dialog), "Hello");
        assert!(completions(&setup.app).is_empty());
        assert_eq!(setup.indicator(), Visibility::Inherited);

        setup.send(ContinueRequest::default());
        assert_eq!(setup.indicator(), Visibility::Hidden);
        assert_eq!(
            completions(&setup.app),
            vec![SayCompleted {
                dialog: setup.dialog,
                id,
                outcome: WriteOutcome::Finished
            }]
        );

        for _ in 0..20 {
            setup.app.update();
        }
        assert_eq!(setup.fade().alpha(), 0.0);
        assert!(!setup.active());
        assert_eq!(
            setup.app.world.get::<Visibility>(setup.dialog),
            Some(&Visibility::Hidden)
        );
    }

    #[rstest]
    fn interrupting_say_cancels_the_running_line(mut setup: DialogSetup) {
        let first = SayRequest::new("A rather long first line of text");
        let first_id = first.id;
        setup.send(first);

        let second = SayRequest::new("Second").no_wait().keep_visible();
        let second_id = second.id;
        setup.send(second);

        let ends = completions(&setup.app);
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].id, first_id);
        assert_eq!(ends[0].outcome, WriteOutcome::Cancelled);
        assert_eq!(setup.writer().current(), Some(second_id));

        for _ in 0..10 {
            setup.app.update();
        }
        assert!(!setup.writer().is_writing());
        assert_eq!(story_text_value(&setup.app, setup.dialog), "Second");
        assert!(setup.active());
    }

    #[rstest]
    fn line_finished_in_one_frame_still_shows(mut setup: DialogSetup) {
        let request = SayRequest::new("Hi").no_wait();
        let id = request.id;
        setup.send(request);
        assert_eq!(completions(&setup.app)[0].id, id);
        assert_eq!(story_text_value(&setup.app, setup.dialog), "Hi");

        let mut max_alpha = setup.fade().alpha();
        for _ in 0..20 {
            setup.app.update();
            max_alpha = max_alpha.max(setup.fade().alpha());
        }
        assert!(max_alpha > 0.0);
        assert!(!setup.active());
    }

    #[rstest]
    fn interrupting_an_input_wait_cancels_it_first(mut setup: DialogSetup) {
        let first = SayRequest::new("Hi");
        let first_id = first.id;
        setup.send(first);
        for _ in 0..5 {
            setup.app.update();
        }
        assert!(setup.writer().is_waiting_for_input());
        assert_eq!(setup.indicator(), Visibility::Inherited);

        let second = SayRequest::new("Next line");
        let second_id = second.id;
        setup.send(second);

        assert_eq!(
            completions(&setup.app),
            vec![SayCompleted {
                dialog: setup.dialog,
                id: first_id,
                outcome: WriteOutcome::Cancelled
            }]
        );
        assert_eq!(setup.writer().current(), Some(second_id));
        assert_eq!(setup.writer().state(), WriterState::Revealing);
        assert_eq!(setup.indicator(), Visibility::Hidden);
    }

    #[rstest]
    fn newer_pending_request_replaces_older(mut setup: DialogSetup) {
        let first = SayRequest::new("First line");
        let second = SayRequest::new("Second line");
        let third = SayRequest::new("Third line");
        let (first_id, second_id, third_id) = (first.id, second.id, third.id);
        setup.app.world.send_event(first);
        setup.app.update();
        setup.app.world.send_event(second);
        setup.app.world.send_event(third);
        setup.app.update();

        let ends = completions(&setup.app);
        let cancelled: Vec<_> = ends.iter().map(|c| c.id).collect();
        assert!(cancelled.contains(&first_id));
        assert!(cancelled.contains(&second_id));
        assert!(ends.iter().all(|c| c.outcome == WriteOutcome::Cancelled));
        assert_eq!(setup.writer().current(), Some(third_id));
    }

    #[rstest]
    fn stop_forces_fade_out(mut setup: DialogSetup) {
        setup.send(SayRequest::new("Never mind").keep_visible());
        setup.send(StopSayRequest::default());

        let ends = completions(&setup.app);
        assert!(ends
            .iter()
            .any(|c| c.outcome == WriteOutcome::Cancelled));
        assert!(setup.fade().fade_when_done);
        for _ in 0..20 {
            setup.app.update();
        }
        assert!(!setup.active());
    }

    #[rstest]
    fn clear_empties_the_story_text(mut setup: DialogSetup) {
        setup.send(SayRequest::new("Some words").keep_visible());
        for _ in 0..10 {
            setup.app.update();
        }
        assert_eq!(story_text_value(&setup.app, setup.dialog), "Some words");

        setup.send(ClearSayRequest::default());
        assert_eq!(story_text_value(&setup.app, setup.dialog), "");
        assert!(!setup.writer().is_writing());
        assert_eq!(completions(&setup.app).len(), 1);
    }

    #[rstest]
    fn voiceover_replaces_typing_sound(mut setup: DialogSetup) {
        let clip = Handle::<AudioSource>::weak_from_u128(7);
        let typing = Handle::<AudioSource>::weak_from_u128(8);
        let speaker = setup
            .app
            .world
            .spawn(Character::new("Ada").with_sound_effect(typing))
            .id();
        setup.app.world.resource_mut::<DialogContext>().speaking_character = Some(speaker);

        setup.send(SayRequest::new("Hi there").with_voiceover(clip.clone()));

        let dialog = setup.dialog;
        let cues = audio_cues(&setup.app);
        assert!(cues.contains(&AudioCue::Voiceover { dialog, clip }));
        assert!(!cues
            .iter()
            .any(|c| matches!(c, AudioCue::TypingSound { .. })));
    }

    #[rstest]
    fn speaker_typing_sound_is_cued(mut setup: DialogSetup) {
        let typing = Handle::<AudioSource>::weak_from_u128(9);
        let speaker = setup
            .app
            .world
            .spawn(Character::new("Ada").with_sound_effect(typing.clone()))
            .id();
        setup.app.world.resource_mut::<DialogContext>().speaking_character = Some(speaker);

        setup.send(SayRequest::new("Hello"));

        let dialog = setup.dialog;
        assert!(audio_cues(&setup.app).contains(&AudioCue::TypingSound {
            dialog,
            clip: typing
        }));
    }

    #[rstest]
    fn say_substitutes_variables(mut setup: DialogSetup) {
        let vars = setup
            .app
            .world
            .spawn(Variables::default().with("hero", "Ada"))
            .id();
        setup.send(
            SayRequest::new("Welcome, {$hero}.")
                .with_variables(vars)
                .no_wait(),
        );
        for _ in 0..10 {
            setup.app.update();
        }
        assert_eq!(story_text_value(&setup.app, setup.dialog), "Welcome, Ada.");
    }

    #[test]
    fn say_without_dialog_is_logged_not_fatal() {
        let mut app = say_minimal_app();
        app.world.send_event(SayRequest::new("Nobody listens"));
        app.update();
        assert!(completions(&app).is_empty());
    }
}
