//! Variable substitution in names and story text.

use bevy::{prelude::*, utils::HashMap};

/// Trait to implement on components that can replace variables in a piece of text.
///
/// Register implementors with
/// [`RegisterExt::register_component_as`](bevy_trait_query::RegisterExt::register_component_as),
/// then point a [`SayRequest`](crate::prelude::SayRequest) or a `set_character` call at the entity.
#[bevy_trait_query::queryable]
pub trait SubstituteVariables {
    /// Returns `text` with the known variables replaced.
    fn substitute_variables(&self, text: &str) -> String;
}

/// A simple variable store. Replaces `{$key}` with the value stored under `key`.
/// Unknown keys are left untouched.
///
/// ```
/// use bevy_say_dialog::prelude::*;
///
/// let vars = Variables::default().with("hero", "Ada");
/// assert_eq!(vars.substitute_variables("Hi {$hero}, {$who}?"), "Hi Ada, {$who}?");
/// ```
#[derive(Component, Debug, Default, Clone)]
pub struct Variables(pub HashMap<String, String>);

impl Variables {
    /// Stores `value` under `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl SubstituteVariables for Variables {
    fn substitute_variables(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("{$") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match self.0.get(key) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&rest[start..start + 2 + end + 1]),
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("plain text", "plain text")]
    #[case("{$name}", "Ada")]
    #[case("I am {$name}!", "I am Ada!")]
    #[case("{$name} and {$name}", "Ada and Ada")]
    #[case("{$missing}", "{$missing}")]
    #[case("broken {$name", "broken {$name")]
    #[case("{name}", "{name}")]
    fn substitutes(#[case] input: &str, #[case] expected: &str) {
        let vars = Variables::default().with("name", "Ada");
        assert_eq!(vars.substitute_variables(input), expected);
    }
}
