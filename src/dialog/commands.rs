//! Commands to configure say dialogs, characters and stages.

use bevy::{
    ecs::system::{Command, EntityCommands},
    prelude::*,
};

use crate::{
    prelude::{
        Character, ClearSayRequest, ContinueRequest, DialogContext, SayDialog, SayDialogBundle,
        SayDialogError, SayDialogSettings, SayId, SayRequest, StopSayRequest, SubstituteVariables,
    },
    stage,
};

use super::{fit_story_text, px_or, set_text_value, DialogParts, TextBoxLayout};

/// Picks the dialog a command applies to, like the request systems do.
fn resolve_dialog(world: &mut World, requested: Option<Entity>) -> Result<Entity, SayDialogError> {
    let candidates: Vec<Entity> = world
        .query_filtered::<Entity, With<SayDialog>>()
        .iter(world)
        .collect();
    world
        .get_resource_or_insert_with(DialogContext::default)
        .resolve(requested, |e| candidates.contains(&e), candidates.clone())
}

/// Runs the variable providers on `variables` over `text`.
fn substitute(world: &mut World, variables: Option<Entity>, text: String) -> String {
    let Some(variables) = variables else {
        return text;
    };
    let mut query = world.query::<&dyn SubstituteVariables>();
    let mut text = text;
    if let Ok(substitutions) = query.get(world, variables) {
        for s in &substitutions {
            text = s.substitute_variables(&text);
        }
    }
    text
}

/// Writes the speaker name of `dialog`.
fn write_name(world: &mut World, dialog: Entity, name: &str, color: Color) {
    let Some(name_text) = world.get::<SayDialog>(dialog).and_then(|d| d.parts.name_text) else {
        return;
    };
    if let Some(mut text) = world.get_mut::<Text>(name_text) {
        set_text_value(&mut text, name, Some(color));
    }
}

/// Sets the visibility of `entity`, if it still exists.
fn set_visibility(world: &mut World, entity: Entity, visibility: Visibility) {
    if let Some(mut e) = world.get_entity_mut(entity) {
        e.insert(visibility);
    }
}

/// The command that makes a character the speaker of a dialog.
///
/// It shows the character's name, dims the other characters on stage when the speaker
/// changed, and remembers the speaker for typing sounds. Without a character, the name
/// is cleared and the portrait hidden.
pub struct SetCharacterCommand {
    /// The dialog. `None` targets the active dialog.
    pub(crate) dialog: Option<Entity>,
    /// The new speaker.
    pub(crate) character: Option<Entity>,
    /// An entity whose variables are substituted in the name.
    pub(crate) variables: Option<Entity>,
}

impl SetCharacterCommand {
    /// Applies the command, failing on unknown dialogs and characters.
    fn try_apply(self, world: &mut World) -> Result<(), SayDialogError> {
        let dialog = resolve_dialog(world, self.dialog)?;

        let Some(character) = self.character else {
            world.resource_mut::<DialogContext>().speaking_character = None;
            write_name(world, dialog, "", Color::WHITE);
            if let Some(portrait) = world.get::<SayDialog>(dialog).and_then(|d| d.parts.portrait)
            {
                set_visibility(world, portrait, Visibility::Hidden);
            }
            return Ok(());
        };

        let (name, color) = {
            let c = world
                .get::<Character>(character)
                .ok_or(SayDialogError::NotACharacter(character))?;
            (c.display_name(world.get::<Name>(character)), c.name_color)
        };

        let previous = world
            .resource_mut::<DialogContext>()
            .speaking_character
            .replace(character);
        if previous != Some(character) {
            stage::dim_non_speakers(world, character);
        }

        let name = substitute(world, self.variables, name);
        info!("Say dialog {:?} speaker: {}", dialog, name);
        write_name(world, dialog, &name, color);
        Ok(())
    }
}

impl Command for SetCharacterCommand {
    fn apply(self, world: &mut World) {
        if let Err(err) = self.try_apply(world) {
            error!("Could not set character: {}", err);
        }
    }
}

/// The command that shows or hides the portrait of a dialog.
///
/// When the dialog fits its text with the image, the story text shrinks by the
/// portrait width while it is shown, and gets its original layout back once it is hidden.
pub struct SetCharacterImageCommand {
    /// The dialog. `None` targets the active dialog.
    pub(crate) dialog: Option<Entity>,
    /// The image to show, `None` to hide the portrait.
    pub(crate) image: Option<Handle<Image>>,
}

impl SetCharacterImageCommand {
    /// Applies the command, failing on unknown dialogs.
    fn try_apply(self, world: &mut World) -> Result<(), SayDialogError> {
        let dialog = resolve_dialog(world, self.dialog)?;
        let (parts, fit, original) = world
            .get::<SayDialog>(dialog)
            .map(|d| (d.parts, d.fit_text_with_image, d.original_story_layout))
            .ok_or(SayDialogError::NotADialog(dialog))?;
        let Some(portrait) = parts.portrait else {
            return Ok(());
        };

        match self.image {
            Some(image) => {
                if let Some(mut e) = world.get_entity_mut(portrait) {
                    if e.contains::<UiImage>() {
                        if let Some(mut ui_image) = e.get_mut::<UiImage>() {
                            ui_image.texture = image;
                        }
                    } else {
                        e.insert(UiImage::new(image));
                    }
                    e.insert(Visibility::Inherited);
                }
                if fit {
                    if let Some(story) = parts.story_text {
                        fit_to_portrait(world, dialog, portrait, story, original);
                    }
                }
            }
            None => {
                set_visibility(world, portrait, Visibility::Hidden);
                if let (Some(original), Some(story)) = (original, parts.story_text) {
                    if let Some(mut style) = world.get_mut::<Style>(story) {
                        original.restore(&mut style);
                    }
                }
            }
        }
        Ok(())
    }
}

/// The computed width of `entity`'s UI node, zero before the first layout.
fn measured_width(world: &World, entity: Entity) -> f32 {
    world.get::<Node>(entity).map(|n| n.size().x).unwrap_or(0.0)
}

/// Shrinks the story text next to the portrait, capturing its layout the first time.
fn fit_to_portrait(
    world: &mut World,
    dialog: Entity,
    portrait: Entity,
    story: Entity,
    original: Option<TextBoxLayout>,
) {
    let portrait_measured = measured_width(world, portrait);
    let Some((portrait_left, portrait_width)) = world
        .get::<Style>(portrait)
        .map(|s| (px_or(s.left, 0.0), px_or(s.width, portrait_measured)))
    else {
        return;
    };
    let story_width = measured_width(world, story);
    let original = {
        let Some(mut story_style) = world.get_mut::<Style>(story) else {
            return;
        };
        let original =
            original.unwrap_or_else(|| TextBoxLayout::capture(&story_style, story_width));
        fit_story_text(original, portrait_left, portrait_width, &mut story_style);
        original
    };
    if let Some(mut say_dialog) = world.get_mut::<SayDialog>(dialog) {
        say_dialog.original_story_layout.get_or_insert(original);
    }
}

impl Command for SetCharacterImageCommand {
    fn apply(self, world: &mut World) {
        if let Err(err) = self.try_apply(world) {
            error!("Could not set character image: {}", err);
        }
    }
}

/// The command that writes a speaker name directly, without a [`Character`].
pub struct SetCharacterNameCommand {
    /// The dialog. `None` targets the active dialog.
    pub(crate) dialog: Option<Entity>,
    /// The name to show.
    pub(crate) name: String,
    /// Its color.
    pub(crate) color: Color,
}

impl Command for SetCharacterNameCommand {
    fn apply(self, world: &mut World) {
        match resolve_dialog(world, self.dialog) {
            Ok(dialog) => write_name(world, dialog, &self.name, self.color),
            Err(err) => error!("Could not set character name: {}", err),
        }
    }
}

/// The command that shows or hides a dialog. A shown dialog becomes the active one.
pub struct SetDialogActiveCommand {
    /// The dialog.
    pub(crate) dialog: Entity,
    /// Whether it is shown.
    pub(crate) active: bool,
}

impl SetDialogActiveCommand {
    /// Applies the command, failing if the entity is no dialog.
    fn try_apply(self, world: &mut World) -> Result<(), SayDialogError> {
        let mut say_dialog = world
            .get_mut::<SayDialog>(self.dialog)
            .ok_or(SayDialogError::NotADialog(self.dialog))?;
        say_dialog.active = self.active;
        let visibility = if self.active {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        set_visibility(world, self.dialog, visibility);
        if self.active {
            world
                .get_resource_or_insert_with(DialogContext::default)
                .active_dialog = Some(self.dialog);
        }
        Ok(())
    }
}

impl Command for SetDialogActiveCommand {
    fn apply(self, world: &mut World) {
        if let Err(err) = self.try_apply(world) {
            error!("Could not change dialog activation: {}", err);
        }
    }
}

/// The command that dims or brings back a character on a stage.
pub struct SetDimmedCommand {
    /// The stage.
    pub(crate) stage: Entity,
    /// The character.
    pub(crate) character: Entity,
    /// Whether it is dimmed.
    pub(crate) dimmed: bool,
}

impl Command for SetDimmedCommand {
    fn apply(self, world: &mut World) {
        if let Err(err) = stage::set_dimmed(world, self.stage, self.character, self.dimmed) {
            error!("Could not dim character: {}", err);
        }
    }
}

/// The command that snaps every portrait to rest, interrupting its tweens.
pub struct StopPortraitTweensCommand;

impl Command for StopPortraitTweensCommand {
    fn apply(self, world: &mut World) {
        stage::stop_portrait_tweens(world);
    }
}

/// Extension trait for [`Commands`] to drive say dialogs.
pub trait DialogCommandsExt<'w, 's> {
    /// Spawns a hidden say dialog with a name, story text, portrait and continue indicator,
    /// laid out from `settings`. The first dialog spawned becomes the active one.
    fn spawn_say_dialog(&mut self, settings: &SayDialogSettings) -> EntityCommands<'w, 's, '_>;

    /// Sends `request` and returns its id, to match the [`SayCompleted`](crate::prelude::SayCompleted).
    fn say(&mut self, request: SayRequest) -> SayId;

    /// Sends a [`ContinueRequest`].
    fn continue_say(&mut self, dialog: Option<Entity>);

    /// Sends a [`StopSayRequest`].
    fn stop_say(&mut self, dialog: Option<Entity>);

    /// Sends a [`ClearSayRequest`].
    fn clear_say(&mut self, dialog: Option<Entity>);

    /// Makes `character` the speaker of `dialog`. See [`SetCharacterCommand`].
    fn set_character(
        &mut self,
        dialog: Option<Entity>,
        character: Option<Entity>,
        variables: Option<Entity>,
    );

    /// Shows `image` as portrait of `dialog`, or hides it. See [`SetCharacterImageCommand`].
    fn set_character_image(&mut self, dialog: Option<Entity>, image: Option<Handle<Image>>);

    /// Writes a speaker name on `dialog`.
    fn set_character_name(&mut self, dialog: Option<Entity>, name: impl Into<String>, color: Color);

    /// Shows or hides `dialog`.
    fn set_dialog_active(&mut self, dialog: Entity, active: bool);

    /// Dims or brings back `character` on `stage`.
    fn set_dimmed(&mut self, stage: Entity, character: Entity, dimmed: bool);

    /// Snaps every portrait to rest.
    fn stop_portrait_tweens(&mut self);
}

impl<'w, 's> DialogCommandsExt<'w, 's> for Commands<'w, 's> {
    fn spawn_say_dialog(&mut self, settings: &SayDialogSettings) -> EntityCommands<'w, 's, '_> {
        let inset = settings.story_text_inset;
        let name_text = self
            .spawn(
                TextBundle::from_section(
                    "",
                    TextStyle {
                        font_size: settings.name_font_size,
                        color: Color::WHITE,
                        ..default()
                    },
                )
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    left: Val::Px(inset),
                    top: Val::Px(8.0),
                    ..default()
                }),
            )
            .id();
        let story_text = self
            .spawn(
                TextBundle::from_section(
                    "",
                    TextStyle {
                        font_size: settings.story_font_size,
                        color: Color::WHITE,
                        ..default()
                    },
                )
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    left: Val::Px(inset),
                    top: Val::Px(settings.name_font_size + 16.0),
                    width: Val::Px(settings.story_text_width),
                    ..default()
                }),
            )
            .id();
        let portrait = self
            .spawn(ImageBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    left: Val::Px(inset + settings.story_text_width - settings.portrait_width),
                    bottom: Val::Px(0.0),
                    width: Val::Px(settings.portrait_width),
                    ..default()
                },
                visibility: Visibility::Hidden,
                ..default()
            })
            .id();
        let continue_indicator = self
            .spawn(TextBundle {
                visibility: Visibility::Hidden,
                ..TextBundle::from_section(
                    "v",
                    TextStyle {
                        font_size: settings.story_font_size,
                        color: Color::WHITE,
                        ..default()
                    },
                )
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    right: Val::Px(inset),
                    bottom: Val::Px(8.0),
                    ..default()
                })
            })
            .id();

        let parts = DialogParts {
            name_text: Some(name_text),
            story_text: Some(story_text),
            portrait: Some(portrait),
            continue_indicator: Some(continue_indicator),
        };
        let dialog = self
            .spawn(SayDialogBundle::new(settings, parts))
            .push_children(&[portrait, name_text, story_text, continue_indicator])
            .id();
        self.add(move |world: &mut World| {
            let mut ctx = world.get_resource_or_insert_with(DialogContext::default);
            if ctx.active_dialog.is_none() {
                ctx.active_dialog = Some(dialog);
            }
        });
        self.entity(dialog)
    }

    fn say(&mut self, request: SayRequest) -> SayId {
        let id = request.id;
        self.add(move |world: &mut World| {
            world.send_event(request);
        });
        id
    }

    fn continue_say(&mut self, dialog: Option<Entity>) {
        self.add(move |world: &mut World| {
            world.send_event(ContinueRequest::new(dialog));
        });
    }

    fn stop_say(&mut self, dialog: Option<Entity>) {
        self.add(move |world: &mut World| {
            world.send_event(StopSayRequest::new(dialog));
        });
    }

    fn clear_say(&mut self, dialog: Option<Entity>) {
        self.add(move |world: &mut World| {
            world.send_event(ClearSayRequest::new(dialog));
        });
    }

    fn set_character(
        &mut self,
        dialog: Option<Entity>,
        character: Option<Entity>,
        variables: Option<Entity>,
    ) {
        self.add(SetCharacterCommand {
            dialog,
            character,
            variables,
        });
    }

    fn set_character_image(&mut self, dialog: Option<Entity>, image: Option<Handle<Image>>) {
        self.add(SetCharacterImageCommand { dialog, image });
    }

    fn set_character_name(&mut self, dialog: Option<Entity>, name: impl Into<String>, color: Color) {
        self.add(SetCharacterNameCommand {
            dialog,
            name: name.into(),
            color,
        });
    }

    fn set_dialog_active(&mut self, dialog: Entity, active: bool) {
        self.add(SetDialogActiveCommand { dialog, active });
    }

    fn set_dimmed(&mut self, stage: Entity, character: Entity, dimmed: bool) {
        self.add(SetDimmedCommand {
            stage,
            character,
            dimmed,
        });
    }

    fn stop_portrait_tweens(&mut self) {
        self.add(StopPortraitTweensCommand);
    }
}
