//! Characters that speak through say dialogs.

use bevy::{audio::AudioSource, prelude::*};

/// A character that can speak in a say dialog.
///
/// The entity's [`Name`] is used as display name when `name_text` is empty.
#[derive(Component, Debug, Clone)]
pub struct Character {
    /// The name shown in the dialog.
    pub name_text: String,
    /// The color of the name.
    pub name_color: Color,
    /// The typing sound used while this character speaks.
    pub sound_effect: Option<Handle<AudioSource>>,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            name_text: String::new(),
            name_color: Color::WHITE,
            sound_effect: None,
        }
    }
}

impl Character {
    /// Creates a character with the given display name.
    pub fn new(name_text: impl Into<String>) -> Self {
        Self {
            name_text: name_text.into(),
            ..default()
        }
    }

    /// Sets the name color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.name_color = color;
        self
    }

    /// Sets the typing sound.
    pub fn with_sound_effect(mut self, clip: Handle<AudioSource>) -> Self {
        self.sound_effect = Some(clip);
        self
    }

    /// The name to show: `name_text`, or the object name if that is empty.
    pub fn display_name(&self, object_name: Option<&Name>) -> String {
        if self.name_text.is_empty() {
            object_name.map(|n| n.as_str().to_string()).unwrap_or_default()
        } else {
            self.name_text.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_name_text() {
        let name = Name::new("sherlock_obj");
        assert_eq!(
            Character::new("Sherlock").display_name(Some(&name)),
            "Sherlock"
        );
    }

    #[test]
    fn display_name_falls_back_to_object_name() {
        let name = Name::new("watson_obj");
        assert_eq!(Character::default().display_name(Some(&name)), "watson_obj");
        assert_eq!(Character::default().display_name(None), "");
    }
}
