//! Catalog entry model.
//!
//! Field names serialize in camelCase to match the persisted JSON layout
//! (`keySignature`, `yearComposed`, `uploadDate`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enumerations
// =============================================================================

/// Catalog category. The label is both the display text and the stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Drumline,
    #[serde(rename = "Full Band")]
    FullBand,
    #[serde(rename = "Media/Gaming")]
    MediaGaming,
    #[serde(rename = "Media/Film")]
    MediaFilm,
    Warmups,
    Beats,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Drumline,
        Category::FullBand,
        Category::MediaGaming,
        Category::MediaFilm,
        Category::Warmups,
        Category::Beats,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Drumline => "Drumline",
            Category::FullBand => "Full Band",
            Category::MediaGaming => "Media/Gaming",
            Category::MediaFilm => "Media/Film",
            Category::Warmups => "Warmups",
            Category::Beats => "Beats",
        }
    }
}

/// Difficulty level. Declaration order is the sort order used by queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
    #[serde(rename = "All Levels")]
    AllLevels,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
        Difficulty::Professional,
        Difficulty::AllLevels,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
            Difficulty::Professional => "Professional",
            Difficulty::AllLevels => "All Levels",
        }
    }

    /// Position in the fixed difficulty ordering.
    pub fn rank(&self) -> usize {
        *self as usize
    }
}

/// Returned when a string is not one of the enumeration labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown label '{}'", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

// Labels must match exactly: a near miss is rejected, never coerced.
impl FromStr for Category {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl FromStr for Difficulty {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.label() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Core Entity
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub standard: u32,
    pub exclusive: u32,
}

/// An uploaded file attached to an entry.
///
/// `url` is a handle that is only valid for the session that created it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAsset {
    pub name: String,
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFiles {
    #[serde(default)]
    pub audio: Option<FileAsset>,
    #[serde(default)]
    pub sheet_music: Option<FileAsset>,
    #[serde(default)]
    pub image: Option<FileAsset>,
}

impl EntryFiles {
    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.sheet_music.is_none() && self.image.is_none()
    }

    /// Slot-wise merge: assets present in `newer` win, empty slots keep ours.
    pub fn overlaid_with(&self, newer: &EntryFiles) -> EntryFiles {
        EntryFiles {
            audio: newer.audio.clone().or_else(|| self.audio.clone()),
            sheet_music: newer.sheet_music.clone().or_else(|| self.sheet_music.clone()),
            image: newer.image.clone().or_else(|| self.image.clone()),
        }
    }
}

/// One sellable arrangement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub composer: String,
    pub category: Category,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub duration: String,
    pub description: String,
    #[serde(default)]
    pub instrumentation: Vec<String>,
    #[serde(default)]
    pub tempo: Option<String>,
    #[serde(default)]
    pub key_signature: Option<String>,
    pub year_composed: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<EntryFiles>,
    pub upload_date: DateTime<Utc>,
}
