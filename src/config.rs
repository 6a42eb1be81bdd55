use crate::filter::UnreadPolicy;
use crate::i18n::Language;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub inbox: InboxConfig,
    pub gallery: GalleryConfig,
    pub access: AccessConfig,
    pub language: Language,
    pub keybindings: Keybindings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Public anon key sent as `apikey` with every request.
    pub anon_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    pub unread_policy: UnreadPolicy,
    pub notice_secs: u64,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            unread_policy: UnreadPolicy::Strict,
            notice_secs: 4,
        }
    }
}

impl InboxConfig {
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub cache_ttl_secs: u64,
    pub categories: Vec<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            categories: ["railings", "balconies", "fences", "gates", "grilles"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl GalleryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Users allowed to delete any gallery image.
    pub admin_user_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Keybindings {
    pub next_tab: Vec<String>,
    pub prev_tab: Vec<String>,
    pub move_up: Vec<String>,
    pub move_down: Vec<String>,
    pub toggle_expand: Vec<String>,
    pub collapse: Vec<String>,
    pub archive: Vec<String>,
    pub restore: Vec<String>,
    pub delete: Vec<String>,
    pub delete_archived: Vec<String>,
    pub refresh: Vec<String>,
    pub search: Vec<String>,
    pub switch_view: Vec<String>,
    pub open_image: Vec<String>,
    pub upload: Vec<String>,
    pub language: Vec<String>,
    pub quit: Vec<String>,
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            next_tab: vec!["Tab".to_string(), "l".to_string(), "Right".to_string()],
            prev_tab: vec!["BackTab".to_string(), "h".to_string(), "Left".to_string()],
            move_up: vec!["k".to_string(), "Up".to_string()],
            move_down: vec!["j".to_string(), "Down".to_string()],
            toggle_expand: vec!["Enter".to_string(), " ".to_string()],
            collapse: vec!["Esc".to_string()],
            archive: vec!["a".to_string()],
            restore: vec!["r".to_string()],
            delete: vec!["d".to_string(), "Delete".to_string()],
            delete_archived: vec!["D".to_string()],
            refresh: vec!["R".to_string()],
            search: vec!["/".to_string()],
            switch_view: vec!["g".to_string()],
            open_image: vec!["o".to_string()],
            upload: vec!["u".to_string()],
            language: vec!["L".to_string()],
            quit: vec!["q".to_string()],
        }
    }
}

pub fn parse_key_string(key_str: &str) -> (KeyCode, KeyModifiers) {
    // "-" on its own is a key, not a separator.
    if key_str == "-" {
        return (KeyCode::Char('-'), KeyModifiers::empty());
    }
    let mut parts: Vec<&str> = key_str.split('-').collect();
    let mut modifiers = KeyModifiers::empty();

    let base_key_str = parts.pop().unwrap_or("");

    for part in parts {
        match part.to_lowercase().as_str() {
            "ctrl" => modifiers.insert(KeyModifiers::CONTROL),
            "alt" => modifiers.insert(KeyModifiers::ALT),
            "shift" => modifiers.insert(KeyModifiers::SHIFT),
            "cmd" | "command" | "super" => modifiers.insert(KeyModifiers::SUPER),
            "meta" => modifiers.insert(KeyModifiers::META),
            _ => {}
        }
    }

    let mut chars = base_key_str.chars();
    let code = match base_key_str {
        "Backspace" => KeyCode::Backspace,
        "Delete" => KeyCode::Delete,
        "Enter" => KeyCode::Enter,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Tab" => KeyCode::Tab,
        "BackTab" => KeyCode::BackTab,
        "Esc" => KeyCode::Esc,
        _ => match (chars.next(), chars.next()) {
            (Some(c), None) => KeyCode::Char(c),
            _ => KeyCode::Null,
        },
    };

    (code, modifiers)
}

pub fn matches_key(event: KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|b| {
        let (code, modifiers) = parse_key_string(b);
        event.code == code && event.modifiers.contains(modifiers)
    })
}

impl Config {
    pub fn load() -> Self {
        use std::fs;
        let mut config = match fs::read_to_string(SETTINGS_FILE) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", SETTINGS_FILE, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("STEELWORKS_URL") {
            self.backend.url = url;
        }
        if let Some(key) = var("STEELWORKS_ANON_KEY") {
            self.backend.anon_key = key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_modified_keys() {
        assert_eq!(parse_key_string("a"), (KeyCode::Char('a'), KeyModifiers::empty()));
        assert_eq!(parse_key_string("ctrl-r"), (KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert_eq!(parse_key_string("BackTab"), (KeyCode::BackTab, KeyModifiers::empty()));
        assert_eq!(parse_key_string("-"), (KeyCode::Char('-'), KeyModifiers::empty()));
        assert_eq!(parse_key_string("Nonsense"), (KeyCode::Null, KeyModifiers::empty()));
    }

    #[test]
    fn test_matches_key_with_shift_letter() {
        let event = KeyEvent::new(KeyCode::Char('D'), KeyModifiers::SHIFT);
        let keys = Keybindings::default();
        assert!(matches_key(event, &keys.delete_archived));
        assert!(!matches_key(event, &keys.delete));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            language = "de"

            [backend]
            url = "https://example.supabase.co"

            [inbox]
            unread_policy = "not_read"

            [keybindings]
            quit = ["ctrl-q"]
            "#,
        )
        .unwrap();
        assert_eq!(config.language, Language::De);
        assert_eq!(config.inbox.unread_policy, UnreadPolicy::NotRead);
        assert_eq!(config.inbox.notice_secs, 4);
        assert_eq!(config.gallery.cache_ttl_secs, 300);
        assert_eq!(config.keybindings.quit, vec!["ctrl-q".to_string()]);
        assert_eq!(config.keybindings.archive, vec!["a".to_string()]);
        assert!(config.backend.anon_key.is_empty());
    }

    #[test]
    fn test_env_overrides_backend() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "STEELWORKS_ANON_KEY" => Some("anon".to_string()),
            _ => None,
        });
        assert_eq!(config.backend.anon_key, "anon");
        assert!(config.backend.url.is_empty());
    }
}
