//! The say dialog: the on-screen box showing the speaker and the story text.

use bevy::prelude::*;

use crate::prelude::{DialogFade, SayCoordinator, SayDialogSettings, Writer};

pub mod commands;
pub mod fade;
pub mod say;

/// The UI entities making up a say dialog. Every part is optional;
/// operations touching a missing part do nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DialogParts {
    /// Entity with a [`Text`] showing the speaker name.
    pub name_text: Option<Entity>,
    /// Entity with a [`Text`] and a [`Style`] showing the story text.
    pub story_text: Option<Entity>,
    /// Entity with a [`UiImage`] and a [`Style`] showing the speaker portrait.
    pub portrait: Option<Entity>,
    /// Entity shown while the dialog waits for a continue request.
    pub continue_indicator: Option<Entity>,
}

/// The story text placement as authored, before any portrait fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBoxLayout {
    /// Left offset of the box.
    pub left: Val,
    /// Right offset of the box.
    pub right: Val,
    /// Width of the box.
    pub width: Val,
    /// Left inset in pixels, zero unless `left` is in pixels.
    inset_px: f32,
    /// Width in pixels: `width` if in pixels, else the computed node width.
    width_px: f32,
}

impl TextBoxLayout {
    /// Captures the layout of `style`, measuring non-pixel widths with `measured_width`.
    fn capture(style: &Style, measured_width: f32) -> Self {
        Self {
            left: style.left,
            right: style.right,
            width: style.width,
            inset_px: px_or(style.left, 0.0),
            width_px: px_or(style.width, measured_width),
        }
    }

    /// Puts the captured values back onto `style`.
    fn restore(self, style: &mut Style) {
        style.left = self.left;
        style.right = self.right;
        style.width = self.width;
    }
}

/// The pixel value of `val`, or `fallback`.
fn px_or(val: Val, fallback: f32) -> f32 {
    match val {
        Val::Px(p) => p,
        _ => fallback,
    }
}

/// Shrinks the story text so it does not overlap a portrait at `portrait_left`, in pixels.
///
/// The text keeps its original inset and loses the portrait's width. It stays
/// on the left when the portrait sits right of the original text box center,
/// and moves to the right edge otherwise.
fn fit_story_text(
    original: TextBoxLayout,
    portrait_left: f32,
    portrait_width: f32,
    story: &mut Style,
) {
    let portrait_center = portrait_left + portrait_width / 2.0;
    let text_center = original.inset_px + original.width_px / 2.0;
    story.width = Val::Px((original.width_px - portrait_width).max(0.0));
    if text_center < portrait_center {
        story.left = Val::Px(original.inset_px);
        story.right = Val::Auto;
    } else {
        story.right = Val::Px(original.inset_px);
        story.left = Val::Auto;
    }
}

/// A say dialog. Pair it with [`DialogFade`], [`Writer`] and [`SayCoordinator`],
/// e.g. through [`SayDialogBundle`].
#[derive(Component, Debug, Default, Clone)]
pub struct SayDialog {
    /// Inactive dialogs are hidden and do not fade.
    pub(crate) active: bool,
    /// The UI parts of the dialog.
    pub parts: DialogParts,
    /// Whether the story text shrinks to make room for the portrait.
    pub fit_text_with_image: bool,
    /// The story text layout before any portrait was shown, captured on first use.
    pub(crate) original_story_layout: Option<TextBoxLayout>,
}

impl SayDialog {
    /// Creates an inactive dialog over the given parts.
    pub fn new(parts: DialogParts) -> Self {
        Self {
            parts,
            fit_text_with_image: true,
            ..default()
        }
    }

    /// Whether the dialog is shown and updated.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Everything a say dialog root entity needs.
#[derive(Bundle, Default)]
pub struct SayDialogBundle {
    /// The UI node of the dialog box.
    pub node: NodeBundle,
    /// The dialog itself.
    pub dialog: SayDialog,
    /// Its fade.
    pub fade: DialogFade,
    /// The typewriter writing its story text.
    pub writer: Writer,
    /// The say request waiting for the writer.
    pub coordinator: SayCoordinator,
}

impl SayDialogBundle {
    /// Creates a hidden dialog box configured from `settings`.
    pub fn new(settings: &SayDialogSettings, parts: DialogParts) -> Self {
        Self {
            node: NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(20.0),
                    left: Val::Px(20.0),
                    width: Val::Px(settings.story_text_width + 2.0 * settings.story_text_inset),
                    min_height: Val::Px(160.0),
                    ..default()
                },
                background_color: BackgroundColor(Color::rgba(0.05, 0.05, 0.1, 0.0)),
                visibility: Visibility::Hidden,
                ..default()
            },
            dialog: SayDialog {
                fit_text_with_image: settings.fit_text_with_image,
                ..SayDialog::new(parts)
            },
            fade: DialogFade::new(settings.fade_duration, settings.fade_cooldown),
            writer: Writer::new(
                settings.chars_per_second,
                settings.punctuation_pause,
                settings.instant_complete,
            ),
            coordinator: SayCoordinator::default(),
        }
    }
}

/// Replaces the content of `text` with a single section holding `value`.
pub(crate) fn set_text_value(text: &mut Text, value: &str, color: Option<Color>) {
    if text.sections.is_empty() {
        text.sections.push(TextSection::default());
    }
    text.sections.truncate(1);
    let section = &mut text.sections[0];
    section.value = value.to_string();
    if let Some(color) = color {
        section.style.color = color;
    }
}
