use crate::storage::{Storage, keys};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The theme actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// The user's stored preference. `Auto` follows the OS color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    Auto,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::Auto => "auto",
        }
    }

    /// The effective theme given the OS preference.
    pub fn resolve(self, system_prefers_dark: bool) -> Theme {
        match self {
            ThemePreference::Light => Theme::Light,
            ThemePreference::Dark => Theme::Dark,
            ThemePreference::Auto => Theme::system(system_prefers_dark),
        }
    }
}

impl Theme {
    fn system(prefers_dark: bool) -> Theme {
        if prefers_dark { Theme::Dark } else { Theme::Light }
    }
}

impl From<Theme> for ThemePreference {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Light => ThemePreference::Light,
            Theme::Dark => ThemePreference::Dark,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown theme token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme {0:?}")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemePreference {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            "auto" => Ok(ThemePreference::Auto),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// The persisted theme preference.
///
/// Stored as a bare token (`light`, `dark` or `auto`) under
/// [`keys::THEME`], independently of the record snapshot.
///
/// # Examples
///
/// ```
/// use paddock::Storage;
/// use paddock::theme::{Theme, ThemePreference, ThemeSettings};
///
/// let storage = Storage::in_memory();
/// let mut settings = ThemeSettings::load(storage.clone(), true);
/// assert_eq!(settings.preference(), ThemePreference::Dark);
///
/// settings.set(ThemePreference::Auto);
/// assert_eq!(settings.effective(false), Theme::Light);
///
/// let reloaded = ThemeSettings::load(storage, false);
/// assert_eq!(reloaded.preference(), ThemePreference::Auto);
/// ```
#[derive(Debug, Clone)]
pub struct ThemeSettings {
    storage: Storage,
    preference: ThemePreference,
}

impl ThemeSettings {
    /// Load the stored preference. When nothing valid is stored, the OS
    /// preference is used (and not written back).
    pub fn load(storage: Storage, system_prefers_dark: bool) -> Self {
        let stored = storage.load_raw(keys::THEME);
        let preference = match stored.as_deref().map(str::parse::<ThemePreference>) {
            Some(Ok(preference)) => preference,
            Some(Err(e)) => {
                warn!("paddock: ignoring stored theme: {e}");
                Theme::system(system_prefers_dark).into()
            }
            None => Theme::system(system_prefers_dark).into(),
        };
        ThemeSettings {
            storage,
            preference,
        }
    }

    pub fn preference(&self) -> ThemePreference {
        self.preference
    }

    pub fn effective(&self, system_prefers_dark: bool) -> Theme {
        self.preference.resolve(system_prefers_dark)
    }

    /// Store a new preference. Returns whether it was persisted; the
    /// in-memory preference changes either way.
    pub fn set(&mut self, preference: ThemePreference) -> bool {
        self.preference = preference;
        self.storage.save_raw(keys::THEME, preference.as_str())
    }

    /// Switch to the opposite of the currently effective theme, replacing
    /// `Auto` with an explicit choice.
    pub fn toggle(&mut self, system_prefers_dark: bool) -> Theme {
        let next = self.effective(system_prefers_dark).toggled();
        self.set(next.into());
        next
    }

    /// Forget the stored preference and switch to `Light`.
    pub fn reset(&mut self) -> bool {
        self.preference = ThemePreference::Light;
        self.storage.remove(keys::THEME)
    }
}
