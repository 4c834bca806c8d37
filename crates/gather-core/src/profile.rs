//! Profile update input and its validation rules.

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct ProfileUpdate {
    /// Display name.
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub name: String,

    /// Short biography.
    #[validate(length(max = 500, message = "Bio must not be longer than 500 characters."))]
    #[serde(default)]
    pub bio: Option<String>,

    /// Personal website. An empty string clears it.
    #[validate(url(message = "Please enter a valid URL."))]
    #[serde(default)]
    pub website: Option<String>,
}

impl ProfileUpdate {
    /// Trim the input, turn empty optional fields into `None`, and validate.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationErrors`] for every rule the input breaks.
    pub fn validated(self) -> Result<Self, ValidationErrors> {
        let normalized = Self {
            name: self.name.trim().to_owned(),
            bio: blank_to_none(self.bio),
            website: blank_to_none(self.website),
        };
        normalized.validate()?;
        Ok(normalized)
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
