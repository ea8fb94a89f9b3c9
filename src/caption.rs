//! Display captions: user overrides first, then a title derived from the stem.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scan::ImageAsset;

/// Caption used when nothing readable can be derived from a file name.
pub const PLACEHOLDER_CAPTION: &str = "Image";

/// User-edited captions keyed by asset stem.
///
/// Serialized as a flat JSON object, which is also the side-file format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionOverrides(BTreeMap<String, String>);

impl CaptionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blank override for `stem`, trimmed.
    #[must_use]
    pub fn get(&self, stem: &str) -> Option<&str> {
        self.0
            .get(stem)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    /// Add or overwrite the caption for `stem`. In-memory only.
    pub fn edit(&mut self, stem: impl Into<String>, caption: impl Into<String>) {
        self.0.insert(stem.into(), caption.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for CaptionOverrides {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Caption to display for `asset`.
#[must_use]
pub fn caption_for(asset: &ImageAsset, overrides: &CaptionOverrides) -> String {
    match overrides.get(&asset.stem) {
        Some(caption) => caption.to_string(),
        None => derive_caption(&asset.stem),
    }
}

/// `"empresa_site--two"` -> `"Empresa Site Two"`.
#[must_use]
pub fn derive_caption(stem: &str) -> String {
    let spaced: String = stem
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let words: Vec<String> = spaced.split_whitespace().map(title_case).collect();
    if words.is_empty() {
        PLACEHOLDER_CAPTION.to_string()
    } else {
        words.join(" ")
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
