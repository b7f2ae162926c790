//! Stages: groups of on-screen character portraits, dimmed while others speak.

use bevy::prelude::*;
use indexmap::IndexSet;

use crate::{errors::SayDialogError, events::notifications::PortraitDimmed};

/// Default tint of dimmed portraits, also used for portraits on no stage.
pub const DIMMED_PORTRAIT_COLOR: Color = Color::rgba(0.5, 0.5, 0.5, 1.0);

/// A group of character portraits shown together.
///
/// With `dim_portraits` on, every character on the stage but the speaker is dimmed
/// when the speaking character changes.
#[derive(Component, Debug, Clone)]
pub struct Stage {
    /// Inactive stages are left alone by dimming.
    pub active: bool,
    /// Whether non-speaking characters are dimmed.
    pub dim_portraits: bool,
    /// The tint of a dimmed portrait.
    pub dim_color: Color,
    /// Seconds a portrait takes to change tint. Zero or less snaps.
    pub fade_duration: f32,
    /// The characters currently on this stage, in arrival order.
    characters_on_stage: IndexSet<Entity>,
}

impl Default for Stage {
    fn default() -> Self {
        Self {
            active: true,
            dim_portraits: false,
            dim_color: DIMMED_PORTRAIT_COLOR,
            fade_duration: 0.5,
            characters_on_stage: IndexSet::new(),
        }
    }
}

impl Stage {
    /// Creates an active stage that dims non-speakers or not.
    pub fn new(dim_portraits: bool) -> Self {
        Self {
            dim_portraits,
            ..default()
        }
    }

    /// Puts a character on stage. Returns `false` if it already was.
    pub fn add_character(&mut self, character: Entity) -> bool {
        self.characters_on_stage.insert(character)
    }

    /// Takes a character off stage. Returns `false` if it was not there.
    pub fn remove_character(&mut self, character: Entity) -> bool {
        self.characters_on_stage.shift_remove(&character)
    }

    /// Whether `character` is on this stage.
    pub fn is_on_stage(&self, character: Entity) -> bool {
        self.characters_on_stage.contains(&character)
    }

    /// The characters on this stage.
    pub fn characters_on_stage(&self) -> impl Iterator<Item = Entity> + '_ {
        self.characters_on_stage.iter().copied()
    }
}

/// The portrait of a character shown on a stage.
#[derive(Component, Debug, Clone)]
pub struct StagePortrait {
    /// The UI entity showing the portrait.
    pub portrait: Entity,
    /// Where the portrait sits when no movement is playing.
    pub resting_position: Vec2,
    /// Whether the portrait is currently dimmed.
    dimmed: bool,
}

impl StagePortrait {
    /// Creates an undimmed portrait resting at `resting_position`.
    pub fn new(portrait: Entity, resting_position: Vec2) -> Self {
        Self {
            portrait,
            resting_position,
            dimmed: false,
        }
    }

    /// Whether the portrait is dimmed.
    pub fn dimmed(&self) -> bool {
        self.dimmed
    }
}

/// One animated property of a [`PortraitTween`].
#[derive(Debug, Clone, Copy)]
struct Track<T> {
    /// Value at the start.
    from: T,
    /// Value at the end.
    to: T,
    /// Seconds played so far.
    elapsed: f32,
    /// Total seconds.
    duration: f32,
}

impl<T> Track<T> {
    /// Creates a track from `from` to `to` lasting `duration` seconds.
    fn new(from: T, to: T, duration: f32) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration,
        }
    }

    /// Advances by `dt` and returns the progress in `[0, 1]`.
    fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt;
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }
}

/// A linear animation of a portrait's position and/or tint.
///
/// Played on entities with a [`Transform`] and/or a [`BackgroundColor`];
/// removed once every track is done.
#[derive(Component, Debug, Clone, Default)]
pub struct PortraitTween {
    /// Movement of the portrait.
    position: Option<Track<Vec2>>,
    /// Change of tint.
    tint: Option<Track<Color>>,
}

impl PortraitTween {
    /// A movement from `from` to `to`.
    pub fn movement(from: Vec2, to: Vec2, duration: f32) -> Self {
        Self {
            position: Some(Track::new(from, to, duration)),
            tint: None,
        }
    }

    /// A tint change from `from` to `to`.
    pub fn tint(from: Color, to: Color, duration: f32) -> Self {
        Self {
            position: None,
            tint: Some(Track::new(from, to, duration)),
        }
    }

    /// Replaces the tint track, keeping any movement.
    fn retint(&mut self, from: Color, to: Color, duration: f32) {
        self.tint = Some(Track::new(from, to, duration));
    }

    /// Plays `dt` seconds onto the given parts. Returns `true` once every track is done.
    fn play(
        &mut self,
        dt: f32,
        transform: Option<&mut Transform>,
        color: Option<&mut BackgroundColor>,
    ) -> bool {
        let mut done = true;
        if let Some(track) = &mut self.position {
            let t = track.advance(dt);
            if let Some(transform) = transform {
                let p = track.from.lerp(track.to, t);
                transform.translation.x = p.x;
                transform.translation.y = p.y;
            }
            done &= t >= 1.0;
        }
        if let Some(track) = &mut self.tint {
            let t = track.advance(dt);
            if let Some(color) = color {
                color.0 = lerp_color(track.from, track.to, t);
            }
            done &= t >= 1.0;
        }
        done
    }
}

/// Linear interpolation between two colors, channel by channel.
fn lerp_color(from: Color, to: Color, t: f32) -> Color {
    let [fr, fg, fb, fa] = from.as_rgba_f32();
    let [tr, tg, tb, ta] = to.as_rgba_f32();
    Color::rgba(
        fr + (tr - fr) * t,
        fg + (tg - fg) * t,
        fb + (tb - fb) * t,
        fa + (ta - fa) * t,
    )
}

/// Plays every portrait tween and removes the finished ones.
pub(crate) fn tick_portrait_tweens(
    time: Res<Time>,
    mut cmd: Commands,
    mut tweens: Query<(
        Entity,
        &mut PortraitTween,
        Option<&mut Transform>,
        Option<&mut BackgroundColor>,
    )>,
) {
    let dt = time.delta_seconds();
    for (e, mut tween, mut transform, mut color) in &mut tweens {
        if tween.play(dt, transform.as_deref_mut(), color.as_deref_mut()) {
            cmd.entity(e).remove::<PortraitTween>();
        }
    }
}

/// Dims or brings back `character` on `stage`.
///
/// Nothing happens if the character already is in that state, or has no [`StagePortrait`].
/// Returns whether the state changed.
pub(crate) fn set_dimmed(
    world: &mut World,
    stage: Entity,
    character: Entity,
    dimmed: bool,
) -> Result<bool, SayDialogError> {
    let (dim_color, duration) = world
        .get::<Stage>(stage)
        .map(|s| (s.dim_color, s.fade_duration))
        .ok_or(SayDialogError::NotAStage(stage))?;

    let portrait = {
        let Some(mut state) = world.get_mut::<StagePortrait>(character) else {
            return Ok(false);
        };
        if state.dimmed == dimmed {
            return Ok(false);
        }
        state.dimmed = dimmed;
        state.portrait
    };

    let target = if dimmed { dim_color } else { Color::WHITE };
    if let Some(mut portrait) = world.get_entity_mut(portrait) {
        if duration <= 0.0 {
            if let Some(mut color) = portrait.get_mut::<BackgroundColor>() {
                color.0 = target;
            }
        } else {
            let from = portrait
                .get::<BackgroundColor>()
                .map(|c| c.0)
                .unwrap_or(Color::WHITE);
            if portrait.contains::<PortraitTween>() {
                if let Some(mut tween) = portrait.get_mut::<PortraitTween>() {
                    tween.retint(from, target, duration);
                }
            } else {
                portrait.insert(PortraitTween::tint(from, target, duration));
            }
        }
    }

    debug!("Character {:?} dimmed: {}", character, dimmed);
    world.send_event(PortraitDimmed {
        stage,
        character,
        dimmed,
    });
    Ok(true)
}

/// Dims every character of every active, dimming stage except `speaker`, which is brought back.
pub(crate) fn dim_non_speakers(world: &mut World, speaker: Entity) {
    let changes: Vec<(Entity, Entity)> = world
        .query::<(Entity, &Stage)>()
        .iter(world)
        .filter(|(_, stage)| stage.active && stage.dim_portraits)
        .flat_map(|(e, stage)| stage.characters_on_stage().map(move |c| (e, c)))
        .collect();

    for (stage, character) in changes {
        if let Err(err) = set_dimmed(world, stage, character, character != speaker) {
            error!("Could not update portrait dimming: {}", err);
        }
    }
}

/// Interrupts every portrait tween and snaps portraits to rest.
///
/// Each portrait goes back to its resting position, white if not dimmed. Dimmed portraits
/// take the `dim_color` of their stage, or [`DIMMED_PORTRAIT_COLOR`] when on no stage.
pub(crate) fn stop_portrait_tweens(world: &mut World) {
    let stages: Vec<(Color, Vec<Entity>)> = world
        .query::<&Stage>()
        .iter(world)
        .map(|s| (s.dim_color, s.characters_on_stage().collect()))
        .collect();
    let dim_color_of = |character: Entity| {
        stages
            .iter()
            .find(|(_, characters)| characters.contains(&character))
            .map_or(DIMMED_PORTRAIT_COLOR, |(color, _)| *color)
    };

    let portraits: Vec<(Entity, Vec2, Color)> = world
        .query::<(Entity, &StagePortrait)>()
        .iter(world)
        .map(|(character, p)| {
            let tint = if p.dimmed {
                dim_color_of(character)
            } else {
                Color::WHITE
            };
            (p.portrait, p.resting_position, tint)
        })
        .collect();

    for (portrait, rest, tint) in portraits {
        let Some(mut portrait) = world.get_entity_mut(portrait) else {
            continue;
        };
        portrait.remove::<PortraitTween>();
        if let Some(mut transform) = portrait.get_mut::<Transform>() {
            transform.translation.x = rest.x;
            transform.translation.y = rest.y;
        }
        if let Some(mut color) = portrait.get_mut::<BackgroundColor>() {
            color.0 = tint;
        }
    }
}
