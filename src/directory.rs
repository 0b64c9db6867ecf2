use crate::api::models::User;
use crate::phone::Identity;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Registered users keyed by normalized phone number.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    entries: HashMap<Identity, Profile>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users without a usable phone number are left out; the last document for a number wins.
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let mut dir = Self::new();
        for user in users {
            let Some(phone) = user.phone.as_deref() else { continue };
            let Some(id) = Identity::parse(phone) else { continue };
            let name = user
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| phone.to_string());
            dir.insert(id, Profile { name, avatar_url: user.profile_pic.clone() });
        }
        dir
    }

    pub fn insert(&mut self, id: Identity, profile: Profile) {
        self.entries.insert(id, profile);
    }

    pub fn get(&self, id: &Identity) -> Option<&Profile> {
        self.entries.get(id)
    }

    /// Directory name for `id`, falling back to the number itself.
    pub fn display_name(&self, id: &Identity) -> String {
        self.get(id).map(|p| p.name.clone()).unwrap_or_else(|| id.to_string())
    }

    pub fn avatar_url(&self, id: &Identity) -> Option<String> {
        self.get(id).and_then(|p| p.avatar_url.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &Profile)> {
        self.entries.iter()
    }
}
