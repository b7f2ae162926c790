//! Configuration for say dialogs, loadable from "saydialog.ron" files.

use bevy::{
    asset::{io::Reader, AssetLoader, AsyncReadExt, LoadContext},
    prelude::*,
    reflect::TypePath,
    utils::BoxedFuture,
};
use serde::Deserialize;
use serde_ron::de::from_bytes;

use crate::errors::SettingsError;

/// Tunables shared by every say dialog spawned from the template.
///
/// Missing fields in a RON file fall back to [`SayDialogSettings::default`].
///
/// ```
/// use bevy_say_dialog::prelude::SayDialogSettings;
///
/// let settings = SayDialogSettings::from_ron("(fade_duration: 0.5)").unwrap();
/// assert_eq!(settings.fade_duration, 0.5);
/// assert_eq!(settings.chars_per_second, 40.0);
/// ```
#[derive(Resource, Asset, TypePath, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SayDialogSettings {
    /// Seconds it takes the dialog to fade fully in or out. Zero or less snaps.
    pub fade_duration: f32,
    /// Grace period after a line ends before fading out, to avoid flicker between lines.
    pub fade_cooldown: f32,
    /// Typewriter speed. Zero or less reveals the whole line at once.
    pub chars_per_second: f32,
    /// Extra delay in seconds after punctuation.
    pub punctuation_pause: f32,
    /// Whether a continue request while revealing completes the line instantly.
    pub instant_complete: bool,
    /// Whether the story text shrinks to make room for the portrait.
    pub fit_text_with_image: bool,
    /// Font size of the speaker name.
    pub name_font_size: f32,
    /// Font size of the story text.
    pub story_font_size: f32,
    /// Left inset of the story text inside the dialog box, in pixels.
    pub story_text_inset: f32,
    /// Width of the story text box, in pixels.
    pub story_text_width: f32,
    /// Width of the portrait image, in pixels.
    pub portrait_width: f32,
}

impl Default for SayDialogSettings {
    fn default() -> Self {
        Self {
            fade_duration: 0.25,
            fade_cooldown: 0.1,
            chars_per_second: 40.0,
            punctuation_pause: 0.0,
            instant_complete: true,
            fit_text_with_image: true,
            name_font_size: 24.0,
            story_font_size: 20.0,
            story_text_inset: 16.0,
            story_text_width: 760.0,
            portrait_width: 160.0,
        }
    }
}

impl SayDialogSettings {
    /// Parses settings from RON text.
    pub fn from_ron(text: &str) -> Result<Self, SettingsError> {
        Ok(from_bytes(text.as_bytes())?)
    }
}

/// Load [`SayDialogSettings`] from ron assets.
#[derive(Default)]
pub struct SayDialogSettingsLoader;

impl AssetLoader for SayDialogSettingsLoader {
    type Asset = SayDialogSettings;
    type Settings = ();
    type Error = SettingsError;

    fn load<'a>(
        &'a self,
        reader: &'a mut Reader,
        _settings: &'a Self::Settings,
        _load_context: &'a mut LoadContext,
    ) -> BoxedFuture<'a, Result<Self::Asset, Self::Error>> {
        Box::pin(async move {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).await?;
            let settings = from_bytes::<SayDialogSettings>(&bytes)?;
            Ok(settings)
        })
    }

    fn extensions(&self) -> &[&str] {
        &["saydialog.ron"]
    }
}

/// Copies loaded or changed [`SayDialogSettings`] assets into the resource, so that
/// dialogs spawned afterwards use them. The last asset to change wins.
pub(crate) fn apply_loaded_settings(
    mut events: EventReader<AssetEvent<SayDialogSettings>>,
    assets: Res<Assets<SayDialogSettings>>,
    mut settings: ResMut<SayDialogSettings>,
) {
    for event in events.read() {
        if let AssetEvent::Added { id } | AssetEvent::Modified { id } = event {
            if let Some(loaded) = assets.get(*id) {
                debug!("Say dialog settings updated from asset {:?}", id);
                *settings = loaded.clone();
            }
        }
    }
}
