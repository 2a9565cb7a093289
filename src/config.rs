use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;
use url::Url;

use crate::guard::{DEFAULT_CONFIRM_MESSAGE, DEFAULT_UNSAVED_MESSAGE};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "whisper-admin";
const DEFAULT_BASE_URL: &str = "http://localhost:5000/admin/";
const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub posts_dir: PathBuf,
    pub base_url: Url,
    pub page_size: usize,
    pub log_dir: Option<PathBuf>,
    pub messages: Messages,
    pub ui: UiConfig,
    /// Keys present in the file but not understood; reported once logging is up.
    pub unknown_keys: Vec<String>,
}

/// Texts of the blocking dialogs shown by the post editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub unsaved: String,
    pub confirm_delete: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            unsaved: DEFAULT_UNSAVED_MESSAGE.to_string(),
            confirm_delete: DEFAULT_CONFIRM_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub dirty: RgbColor,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            border: RgbColor::new(110, 110, 110),
            selection_bg: RgbColor::new(60, 60, 60),
            selection_fg: RgbColor::new(255, 255, 255),
            separator: RgbColor::new(180, 180, 180),
            status_fg: RgbColor::new(0, 0, 0),
            status_bg: RgbColor::new(200, 200, 200),
            dirty: RgbColor::new(220, 120, 40),
        }
    }
}

// =============================================================================
// File representation
// =============================================================================

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    posts_dir: Option<PathBuf>,
    base_url: Option<String>,
    page_size: Option<usize>,
    log_dir: Option<PathBuf>,
    #[serde(default)]
    messages: MessagesFile,
    #[serde(default)]
    ui: UiFile,
}

#[derive(Debug, Deserialize, Default)]
struct MessagesFile {
    unsaved: Option<String>,
    confirm_delete: Option<String>,
}

impl From<MessagesFile> for Messages {
    fn from(file: MessagesFile) -> Self {
        let defaults = Messages::default();
        Self {
            unsaved: file.unsaved.unwrap_or(defaults.unsaved),
            confirm_delete: file.confirm_delete.unwrap_or(defaults.confirm_delete),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct UiFile {
    #[serde(default)]
    colors: UiColorsFile,
}

#[derive(Debug, Deserialize, Default)]
struct UiColorsFile {
    border: Option<RgbColor>,
    selection_bg: Option<RgbColor>,
    selection_fg: Option<RgbColor>,
    separator: Option<RgbColor>,
    status_fg: Option<RgbColor>,
    status_bg: Option<RgbColor>,
    dirty: Option<RgbColor>,
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let defaults = UiColors::default();
        let colors = file.colors;
        Self {
            colors: UiColors {
                border: colors.border.unwrap_or(defaults.border),
                selection_bg: colors.selection_bg.unwrap_or(defaults.selection_bg),
                selection_fg: colors.selection_fg.unwrap_or(defaults.selection_fg),
                separator: colors.separator.unwrap_or(defaults.separator),
                status_fg: colors.status_fg.unwrap_or(defaults.status_fg),
                status_bg: colors.status_bg.unwrap_or(defaults.status_bg),
                dirty: colors.dirty.unwrap_or(defaults.dirty),
            },
        }
    }
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Default location of the log file directory.
pub fn default_log_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.data_local_dir().join(APP_NAME))
}

/// Load from `path`, or from the per-user config dir when none is given.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };
    if !path.exists() {
        bail!(
            "configuration file not found at {}. Create it with at least `posts_dir = \"...\"`.",
            path.display()
        );
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    parse(&raw, path)
}

fn parse(raw: &str, path: PathBuf) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

    let unknown_keys = unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", path.display()))?;

    let posts_dir = cfg_file
        .posts_dir
        .map(|dir| expand_tilde(&dir))
        .ok_or_else(|| anyhow!("`posts_dir` must be specified in configuration"))?;

    let base_url = cfg_file.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    let base_url =
        Url::parse(base_url).with_context(|| format!("invalid base_url {:?}", base_url))?;

    let page_size = cfg_file.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        bail!("page_size must be greater than zero");
    }

    Ok(Config {
        config_path: path,
        posts_dir,
        base_url,
        page_size,
        log_dir: cfg_file.log_dir.map(|dir| expand_tilde(&dir)),
        messages: cfg_file.messages.into(),
        ui: cfg_file.ui.into(),
        unknown_keys,
    })
}

// =============================================================================
// Unknown keys
// =============================================================================

fn unknown_keys(value: &toml::Value) -> Vec<String> {
    let mut unknown = Vec::new();
    let Some(table) = value.as_table() else {
        return unknown;
    };
    const KNOWN: &[&str] = &[
        "posts_dir",
        "base_url",
        "page_size",
        "log_dir",
        "messages",
        "ui",
    ];
    unknown_in_context(value, "", KNOWN, &mut unknown);
    if let Some(messages) = table.get("messages") {
        unknown_in_context(messages, "messages.", &["unsaved", "confirm_delete"], &mut unknown);
    }
    if let Some(ui) = table.get("ui") {
        unknown_in_context(ui, "ui.", &["colors"], &mut unknown);
        if let Some(colors) = ui.get("colors") {
            unknown_in_context(
                colors,
                "ui.colors.",
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "separator",
                    "status_fg",
                    "status_bg",
                    "dirty",
                ],
                &mut unknown,
            );
        }
    }
    unknown
}

fn unknown_in_context(value: &toml::Value, context: &str, known: &[&str], out: &mut Vec<String>) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            out.push(format!("{}{}", context, key));
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(raw: &str) -> Result<Config> {
        parse(raw, PathBuf::from("test.toml"))
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_str("posts_dir = \"/srv/posts\"").unwrap();
        assert_eq!(config.posts_dir, PathBuf::from("/srv/posts"));
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.messages, Messages::default());
    }

    #[test]
    fn test_posts_dir_required() {
        assert!(parse_str("page_size = 5").is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(parse_str("posts_dir = \"/p\"\npage_size = 0").is_err());
    }

    #[test]
    fn test_messages_and_colors() {
        let raw = r#"
posts_dir = "/p"
base_url = "https://blog.example/admin/"

[messages]
unsaved = "Save first"

[ui.colors]
border = [1, 2, 3]
dirty = { r = 4, g = 5, b = 6 }
"#;
        let config = parse_str(raw).unwrap();
        assert_eq!(config.messages.unsaved, "Save first");
        assert_eq!(config.messages.confirm_delete, DEFAULT_CONFIRM_MESSAGE);
        assert_eq!(config.ui.colors.border, RgbColor::new(1, 2, 3));
        assert_eq!(config.ui.colors.dirty, RgbColor::new(4, 5, 6));
        assert_eq!(config.base_url.host_str(), Some("blog.example"));
    }

    #[test]
    fn test_unknown_keys_collected() {
        let raw = "posts_dir = \"/p\"\npage = 3\n[ui]\ntheme = \"dark\"\n[ui.colors]\nborder = [0, 0, 0]\nglow = [1, 1, 1]\n";
        let config = parse_str(raw).unwrap();
        assert_eq!(config.unknown_keys, vec!["page", "ui.theme", "ui.colors.glow"]);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(parse_str("posts_dir = \"/p\"\nbase_url = \"not a url\"").is_err());
    }
}
