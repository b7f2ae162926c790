//! Fade in/out of the dialog box.

use bevy::prelude::*;

use crate::prelude::{SayDialog, Writer};

/// The visibility of a dialog as seen by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Fully transparent and deactivated.
    Hidden,
    /// Alpha is rising toward 1.
    FadingIn,
    /// Alpha sits at its target and the dialog is shown.
    Visible,
    /// Alpha is falling toward 0.
    FadingOut,
}

/// The fade state of a say dialog.
///
/// The dialog is opaque while its writer is busy. Once the writer is done and
/// `fade_when_done` is set, it waits `cooldown_duration` seconds and fades out.
#[derive(Component, Debug, Clone)]
pub struct DialogFade {
    /// Current opacity, always in `[0, 1]`.
    pub(crate) alpha: f32,
    /// The opacity `alpha` is moving toward.
    pub(crate) target_alpha: f32,
    /// Seconds left before the dialog is allowed to fade out.
    pub(crate) cooldown: f32,
    /// Value the cooldown is re-armed to every tick the writer is busy.
    pub cooldown_duration: f32,
    /// Seconds to fade between fully transparent and fully opaque. Zero or less snaps.
    pub fade_duration: f32,
    /// Whether the dialog fades out once the writer is done.
    pub fade_when_done: bool,
}

impl Default for DialogFade {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            target_alpha: 0.0,
            cooldown: 0.0,
            cooldown_duration: 0.1,
            fade_duration: 0.25,
            fade_when_done: true,
        }
    }
}

impl DialogFade {
    /// Creates a transparent fade with the given timings.
    pub fn new(fade_duration: f32, cooldown_duration: f32) -> Self {
        Self {
            fade_duration,
            cooldown_duration,
            ..default()
        }
    }

    /// The current opacity.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// The opacity the dialog is heading to.
    pub fn target_alpha(&self) -> f32 {
        self.target_alpha
    }

    /// Classifies the fade for a dialog that is `active` or not.
    pub fn state(&self, active: bool) -> FadeState {
        if !active {
            FadeState::Hidden
        } else if self.alpha < self.target_alpha {
            FadeState::FadingIn
        } else if self.alpha > self.target_alpha {
            FadeState::FadingOut
        } else {
            FadeState::Visible
        }
    }

    /// Heads for full opacity and re-arms the cooldown, as a busy writer does.
    ///
    /// Called when a line starts, so a line written within a single frame still shows.
    pub(crate) fn show(&mut self) {
        self.target_alpha = 1.0;
        self.cooldown = self.cooldown_duration;
    }

    /// Drops any pending cooldown so the next idle tick may start fading out.
    pub(crate) fn reset_cooldown(&mut self) {
        self.cooldown = 0.0;
    }

    /// Advances the fade by `dt` seconds.
    ///
    /// Returns `true` when the dialog is fully transparent and meant to stay so,
    /// i.e. it should be deactivated.
    pub fn tick(&mut self, dt: f32, writing: bool) -> bool {
        if writing {
            self.target_alpha = 1.0;
            self.cooldown = self.cooldown_duration;
        } else if self.fade_when_done && self.cooldown <= 0.0 {
            self.target_alpha = 0.0;
        } else {
            self.cooldown = (self.cooldown - dt).max(0.0);
        }

        if self.fade_duration <= 0.0 {
            self.alpha = self.target_alpha;
        } else {
            let step = dt.max(0.0) / self.fade_duration;
            self.alpha = move_towards(self.alpha, self.target_alpha, step);
        }
        self.alpha = self.alpha.clamp(0.0, 1.0);

        self.alpha <= 0.0 && self.target_alpha <= 0.0
    }
}

/// Moves `current` toward `target` by at most `max_delta`, never past it.
fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Drives the fade of every active dialog and deactivates those that faded out.
pub(crate) fn update_fade(
    time: Res<Time>,
    mut dialogs: Query<(&mut SayDialog, &mut DialogFade, &Writer, &mut Visibility)>,
) {
    let dt = time.delta_seconds();
    for (mut dialog, mut fade, writer, mut visibility) in &mut dialogs {
        if !dialog.active {
            continue;
        }
        if fade.tick(dt, writer.is_writing()) {
            debug!("Say dialog faded out, deactivating");
            dialog.active = false;
            *visibility = Visibility::Hidden;
        }
    }
}

/// Copies the fade alpha onto the dialog background and its text and portrait parts.
pub(crate) fn apply_dialog_alpha(
    dialogs: Query<(Entity, &SayDialog, &DialogFade)>,
    mut backgrounds: Query<&mut BackgroundColor>,
    mut texts: Query<&mut Text>,
) {
    for (entity, dialog, fade) in &dialogs {
        let alpha = fade.alpha;
        for e in [Some(entity), dialog.parts.portrait].into_iter().flatten() {
            if let Ok(mut bg) = backgrounds.get_mut(e) {
                bg.0.set_a(alpha);
            }
        }
        for e in [dialog.parts.name_text, dialog.parts.story_text]
            .into_iter()
            .flatten()
        {
            if let Ok(mut text) = texts.get_mut(e) {
                for section in text.sections.iter_mut() {
                    section.style.color.set_a(alpha);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn fade() -> DialogFade {
        DialogFade::new(0.5, 0.1)
    }

    #[rstest]
    fn writing_fades_in_without_overshoot(mut fade: DialogFade) {
        let mut last = fade.alpha();
        for _ in 0..20 {
            assert!(!fade.tick(0.07, true));
            assert!(fade.alpha() >= last);
            assert!(fade.alpha() <= 1.0);
            last = fade.alpha();
        }
        assert_eq!(fade.alpha(), 1.0);
        assert_eq!(fade.state(true), FadeState::Visible);
    }

    #[rstest]
    fn cooldown_delays_fade_out(mut fade: DialogFade) {
        fade.alpha = 1.0;
        fade.tick(0.05, true);
        assert_eq!(fade.cooldown, 0.1);

        // still cooling down, the target holds
        fade.tick(0.05, false);
        assert_eq!(fade.target_alpha(), 1.0);
        fade.tick(0.05, false);
        assert_eq!(fade.target_alpha(), 1.0);

        // cooldown expired
        fade.tick(0.05, false);
        assert_eq!(fade.target_alpha(), 0.0);
        assert_eq!(fade.state(true), FadeState::FadingOut);
    }

    #[rstest]
    fn fades_out_and_asks_for_deactivation(mut fade: DialogFade) {
        fade.alpha = 1.0;
        let mut ticks = 0;
        while !fade.tick(0.1, false) {
            ticks += 1;
            assert!(ticks < 100, "never reached zero");
        }
        assert_eq!(fade.alpha(), 0.0);
    }

    #[rstest]
    fn keeps_visible_when_not_fading_when_done(mut fade: DialogFade) {
        fade.fade_when_done = false;
        for _ in 0..10 {
            fade.tick(0.1, true);
        }
        for _ in 0..50 {
            assert!(!fade.tick(0.1, false));
        }
        assert_eq!(fade.alpha(), 1.0);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    fn zero_duration_snaps(#[case] duration: f32) {
        let mut fade = DialogFade::new(duration, 0.1);
        assert!(!fade.tick(0.01, true));
        assert_eq!(fade.alpha(), 1.0);

        fade.cooldown = 0.0;
        assert!(fade.tick(0.01, false));
        assert_eq!(fade.alpha(), 0.0);
    }

    #[test]
    fn zero_delta_while_writing_does_not_deactivate() {
        let mut fade = DialogFade::default();
        assert!(!fade.tick(0.0, true));
        assert_eq!(fade.alpha(), 0.0);
        assert_eq!(fade.state(true), FadeState::FadingIn);
    }

    #[rstest]
    fn show_outlasts_a_line_that_is_already_done(mut fade: DialogFade) {
        fade.show();
        assert!(!fade.tick(0.05, false));
        assert!(fade.alpha() > 0.0);
        assert_eq!(fade.target_alpha(), 1.0);
    }

    #[test]
    fn inactive_is_hidden() {
        assert_eq!(DialogFade::default().state(false), FadeState::Hidden);
    }

    #[rstest]
    #[case(0.0, 1.0, 0.3, 0.3)]
    #[case(0.9, 1.0, 0.3, 1.0)]
    #[case(0.5, 0.0, 0.2, 0.3)]
    #[case(0.1, 0.0, 0.2, 0.0)]
    fn move_towards_clamps_at_target(
        #[case] current: f32,
        #[case] target: f32,
        #[case] delta: f32,
        #[case] expected: f32,
    ) {
        assert!((move_towards(current, target, delta) - expected).abs() < f32::EPSILON);
    }
}
