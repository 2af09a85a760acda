use serde::{Deserialize, Serialize};

/// A resolved user identity
///
/// Produced once at connect time and owned by the connection for its whole
/// lifetime. Serializes to the `{ id, name, email, image_url }` shape used in
/// presence events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user identifier
    pub id: String,
    /// Name shown to other room members
    #[serde(rename = "name")]
    pub display_name: String,
    pub email: String,
    /// Avatar reference (usually an image URL); empty when unknown
    #[serde(rename = "image_url", default)]
    pub avatar_ref: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: String::new(),
            avatar_ref: String::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_avatar(mut self, avatar_ref: impl Into<String>) -> Self {
        self.avatar_ref = avatar_ref.into();
        self
    }
}
