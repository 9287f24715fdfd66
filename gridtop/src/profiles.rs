//! Saved appliance connections, one JSON file under the user config dir.
//! `$XDG_CONFIG_HOME/gridtop/profiles.json`, or the platform config dir
//! when XDG is unset.

use std::{collections::BTreeMap, fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

impl ProfilesFile {
    /// Missing, unreadable, or corrupt file all read as an empty set.
    pub fn load() -> Self {
        fs::read_to_string(profiles_path())
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> io::Result<()> {
        let path = profiles_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        fs::write(path, data)
    }
}

pub fn config_dir() -> PathBuf {
    match std::env::var_os("XDG_CONFIG_HOME") {
        Some(xdg) => PathBuf::from(xdg).join("gridtop"),
        None => dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridtop"),
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

/// What the CLI gave us; `resolve` turns it into a connection or a prompt.
pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
}

pub enum ResolveProfile {
    /// Connect with the given url/token as-is; the caller decides whether
    /// to persist them under the profile name.
    Direct(String, Option<String>),
    /// A saved entry matched the requested name.
    Loaded(String, Option<String>),
    /// Nothing was given but saved profiles exist; offer a pick list.
    PromptSelect(Vec<String>),
    /// A name was given that has no saved entry yet.
    PromptCreate(String),
    /// Nothing given and nothing saved.
    None,
}

impl ProfileRequest {
    pub fn resolve(self, saved: &ProfilesFile) -> ResolveProfile {
        match (self.url, self.profile_name) {
            (Some(url), _) => ResolveProfile::Direct(url, self.token),
            (None, Some(name)) => match saved.profiles.get(&name) {
                Some(e) => ResolveProfile::Loaded(e.url.clone(), e.token.clone()),
                None => ResolveProfile::PromptCreate(name),
            },
            (None, None) if saved.profiles.is_empty() => ResolveProfile::None,
            (None, None) => {
                ResolveProfile::PromptSelect(saved.profiles.keys().cloned().collect())
            }
        }
    }
}
