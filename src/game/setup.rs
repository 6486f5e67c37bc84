//! Match setup: player names and image assets

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use super::rules::{Player, WIN_THRESHOLD};

/// Longest accepted player name, in characters
pub const MAX_NAME_CHARS: usize = 32;

/// Built-in asset used when a slot has no selection
pub const DEFAULT_P1_ICON: &str = "assets/hand-left.png";
pub const DEFAULT_P2_ICON: &str = "assets/hand-right.png";
pub const DEFAULT_P1_CARD: &str = "assets/card-sun.png";
pub const DEFAULT_P2_CARD: &str = "assets/card-moon.png";
pub const DEFAULT_CARD_BACK: &str = "assets/card-back.png";

/// Image slot a presentation layer can customise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    P1Icon,
    P2Icon,
    P1Card,
    P2Card,
    CardBack,
}

impl ImageSlot {
    pub fn default_asset(self) -> &'static str {
        match self {
            ImageSlot::P1Icon => DEFAULT_P1_ICON,
            ImageSlot::P2Icon => DEFAULT_P2_ICON,
            ImageSlot::P1Card => DEFAULT_P1_CARD,
            ImageSlot::P2Card => DEFAULT_P2_CARD,
            ImageSlot::CardBack => DEFAULT_CARD_BACK,
        }
    }
}

/// Opaque image reference handed through to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolves the image bound to a slot at match start
pub trait ImageResolver {
    fn resolve(&self, slot: ImageSlot, fallback: &str) -> ImageRef;
}

/// User-supplied images, keyed by slot. Uploaded data URLs win over the fallback.
#[derive(Debug, Clone, Default)]
pub struct UploadedImages {
    images: HashMap<ImageSlot, String>,
}

impl UploadedImages {
    /// Keep only values that are image data URLs; the rest are reported back
    pub fn from_uploads(uploads: HashMap<ImageSlot, String>) -> (Self, Vec<SetupWarning>) {
        let mut images = HashMap::new();
        let mut warnings = Vec::new();
        for (slot, value) in uploads {
            if is_image_data_url(&value) {
                images.insert(slot, value);
            } else {
                warnings.push(SetupWarning::InvalidImage(slot));
            }
        }
        (Self { images }, warnings)
    }

    pub fn get(&self, slot: ImageSlot) -> Option<&str> {
        self.images.get(&slot).map(String::as_str)
    }
}

impl ImageResolver for UploadedImages {
    fn resolve(&self, slot: ImageSlot, fallback: &str) -> ImageRef {
        if let Some(uploaded) = self.get(slot) {
            return ImageRef(uploaded.to_string());
        }
        if fallback.starts_with("data:") {
            ImageRef(fallback.to_string())
        } else {
            ImageRef(format!("./{}", fallback))
        }
    }
}

fn is_image_data_url(value: &str) -> bool {
    value.starts_with("data:image/")
}

/// Non-fatal problems found while building a match config
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupWarning {
    #[error("{0} name is empty, using the default name")]
    EmptyName(Player),

    #[error("{0} name is too long and was shortened")]
    NameTooLong(Player),

    #[error("uploaded image for {0:?} is not an image data URL, using the selected asset")]
    InvalidImage(ImageSlot),
}

/// Raw setup input from the presentation layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchSetup {
    pub p1_name: Option<String>,
    pub p2_name: Option<String>,
    /// Selected built-in asset per slot
    pub selections: HashMap<ImageSlot, String>,
    /// Uploaded data URLs per slot
    pub uploads: HashMap<ImageSlot, String>,
}

/// Resolved image per slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAssets {
    pub p1_icon: ImageRef,
    pub p2_icon: ImageRef,
    pub p1_card: ImageRef,
    pub p2_card: ImageRef,
    pub card_back: ImageRef,
}

impl MatchAssets {
    pub fn resolve(selections: &HashMap<ImageSlot, String>, resolver: &dyn ImageResolver) -> Self {
        let image = |slot: ImageSlot| {
            let fallback = selections
                .get(&slot)
                .map(String::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| slot.default_asset());
            resolver.resolve(slot, fallback)
        };

        Self {
            p1_icon: image(ImageSlot::P1Icon),
            p2_icon: image(ImageSlot::P2Icon),
            p1_card: image(ImageSlot::P1Card),
            p2_card: image(ImageSlot::P2Card),
            card_back: image(ImageSlot::CardBack),
        }
    }
}

impl Default for MatchAssets {
    fn default() -> Self {
        Self::resolve(&HashMap::new(), &UploadedImages::default())
    }
}

/// Immutable per-match configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub p1_name: String,
    pub p2_name: String,
    pub win_threshold: u32,
    pub assets: MatchAssets,
}

impl MatchConfig {
    /// Build a config from setup input, substituting defaults for anything unusable
    pub fn from_setup(setup: MatchSetup) -> (Self, Vec<SetupWarning>) {
        let mut warnings = Vec::new();

        let p1_name = normalize_name(setup.p1_name.as_deref(), Player::P1, &mut warnings);
        let p2_name = normalize_name(setup.p2_name.as_deref(), Player::P2, &mut warnings);

        let (uploads, image_warnings) = UploadedImages::from_uploads(setup.uploads);
        warnings.extend(image_warnings);
        let assets = MatchAssets::resolve(&setup.selections, &uploads);

        for warning in &warnings {
            warn!(warning = %warning, "Match setup adjusted");
        }

        let config = Self {
            p1_name,
            p2_name,
            win_threshold: WIN_THRESHOLD,
            assets,
        };
        (config, warnings)
    }

    pub fn with_names(p1_name: &str, p2_name: &str) -> Self {
        Self::from_setup(MatchSetup {
            p1_name: Some(p1_name.to_string()),
            p2_name: Some(p2_name.to_string()),
            ..Default::default()
        })
        .0
    }

    pub fn name(&self, player: Player) -> &str {
        match player {
            Player::P1 => &self.p1_name,
            Player::P2 => &self.p2_name,
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::from_setup(MatchSetup::default()).0
    }
}

pub fn default_name(player: Player) -> &'static str {
    match player {
        Player::P1 => "Player 1",
        Player::P2 => "Player 2",
    }
}

fn normalize_name(raw: Option<&str>, player: Player, warnings: &mut Vec<SetupWarning>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        if raw.is_some() {
            warnings.push(SetupWarning::EmptyName(player));
        }
        return default_name(player).to_string();
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        warnings.push(SetupWarning::NameTooLong(player));
        return trimmed.chars().take(MAX_NAME_CHARS).collect::<String>().trim_end().to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_names_use_defaults_silently() {
        let (config, warnings) = MatchConfig::from_setup(MatchSetup::default());
        assert_eq!(config.p1_name, "Player 1");
        assert_eq!(config.p2_name, "Player 2");
        assert_eq!(config.win_threshold, 5);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_blank_name_substituted_with_warning() {
        let (config, warnings) = MatchConfig::from_setup(MatchSetup {
            p1_name: Some("  Alice ".to_string()),
            p2_name: Some("   ".to_string()),
            ..Default::default()
        });
        assert_eq!(config.p1_name, "Alice");
        assert_eq!(config.p2_name, "Player 2");
        assert_eq!(warnings, vec![SetupWarning::EmptyName(Player::P2)]);
    }

    #[test]
    fn test_long_name_truncated() {
        let long = "x".repeat(40);
        let (config, warnings) = MatchConfig::from_setup(MatchSetup {
            p1_name: Some(long),
            ..Default::default()
        });
        assert_eq!(config.p1_name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(warnings, vec![SetupWarning::NameTooLong(Player::P1)]);
    }

    #[test]
    fn test_selected_assets_are_relative_paths() {
        let mut selections = HashMap::new();
        selections.insert(ImageSlot::P1Card, "cards/star.png".to_string());
        let assets = MatchAssets::resolve(&selections, &UploadedImages::default());

        assert_eq!(assets.p1_card.as_str(), "./cards/star.png");
        assert_eq!(assets.p2_card.as_str(), format!("./{}", DEFAULT_P2_CARD));
    }

    #[test]
    fn test_uploaded_image_wins_over_selection() {
        let upload = "data:image/png;base64,iVBORw0KGgo=".to_string();
        let mut uploads = HashMap::new();
        uploads.insert(ImageSlot::CardBack, upload.clone());
        let mut selections = HashMap::new();
        selections.insert(ImageSlot::CardBack, "backs/blue.png".to_string());

        let (config, warnings) = MatchConfig::from_setup(MatchSetup {
            selections,
            uploads,
            ..Default::default()
        });
        assert!(warnings.is_empty());
        assert_eq!(config.assets.card_back.as_str(), upload);
    }

    #[test]
    fn test_invalid_upload_falls_back() {
        let mut uploads = HashMap::new();
        uploads.insert(ImageSlot::P2Icon, "https://example.com/hand.png".to_string());

        let (config, warnings) = MatchConfig::from_setup(MatchSetup {
            uploads,
            ..Default::default()
        });
        assert_eq!(warnings, vec![SetupWarning::InvalidImage(ImageSlot::P2Icon)]);
        assert_eq!(config.assets.p2_icon.as_str(), format!("./{}", DEFAULT_P2_ICON));
    }

    #[test]
    fn test_data_url_selection_kept_verbatim() {
        let resolver = UploadedImages::default();
        let data = "data:image/svg+xml;utf8,<svg/>";
        assert_eq!(resolver.resolve(ImageSlot::P1Icon, data).as_str(), data);
    }
}
