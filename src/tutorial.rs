use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single published entry in the catalog.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    /// The ID assigned by the store.
    pub id: Uuid,

    /// The display title. Never empty.
    pub title: String,

    /// The URL of the video, playlist or article.
    pub url: String,

    /// The thumbnail URL, if one was provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// How the content should be previewed.
    #[serde(rename = "type")]
    pub kind: TutorialType,

    pub summary: String,

    /// Tags in display order.
    pub tags: Vec<String>,

    pub difficulty: Difficulty,

    /// The programming language. Free text; filter options are derived
    /// from the values actually present.
    pub language: String,

    /// The topic, e.g. “Frontend” or “Mobile”.
    pub category: String,

    /// A display-only duration label such as “1-2 hours”.
    pub estimated_time: String,
}

impl Tutorial {
    pub fn from_new(id: Uuid, new: NewTutorial) -> Self {
        let NewTutorial {
            title,
            url,
            image_url,
            kind,
            summary,
            tags,
            difficulty,
            language,
            category,
            estimated_time,
            status: _,
        } = new;

        Tutorial {
            id,
            title,
            url,
            image_url,
            kind,
            summary,
            tags,
            difficulty,
            language,
            category,
            estimated_time,
        }
    }
}

/// A catalog record before the store has assigned it an ID.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTutorial {
    pub title: String,
    pub url: String,
    pub image_url: Option<String>,
    pub kind: TutorialType,
    pub summary: String,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub language: String,
    pub category: String,
    pub estimated_time: String,
    pub status: PublicationStatus,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorialType {
    Video,
    Playlist,
    Article,
}

impl TutorialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TutorialType::Video => "video",
            TutorialType::Playlist => "playlist",
            TutorialType::Article => "article",
        }
    }
}

impl FromStr for TutorialType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(TutorialType::Video),
            "playlist" => Ok(TutorialType::Playlist),
            "article" => Ok(TutorialType::Article),
            _ => Err(UnknownLabel(s.to_owned())),
        }
    }
}

/// Whether a catalog record is visible. Only published records are ever
/// returned by catalog reads.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PublicationStatus {
    Published,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Published => "Published",
        }
    }
}

/// The difficulty of a tutorial. Known levels are ordered by `rank`;
/// anything else is carried through as `Other` and has no rank.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Other(String),
}

impl Difficulty {
    pub const KNOWN: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    /// Beginner = 1 < Intermediate = 2 < Advanced = 3.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Difficulty::Beginner => Some(1),
            Difficulty::Intermediate => Some(2),
            Difficulty::Advanced => Some(3),
            Difficulty::Other(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.rank().is_some()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
            Difficulty::Other(label) => label,
        }
    }
}

impl From<String> for Difficulty {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Beginner" => Difficulty::Beginner,
            "Intermediate" => Difficulty::Intermediate,
            "Advanced" => Difficulty::Advanced,
            _ => Difficulty::Other(label),
        }
    }
}

impl From<&str> for Difficulty {
    fn from(label: &str) -> Self {
        Difficulty::from(label.to_owned())
    }
}

impl From<Difficulty> for String {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Other(label) => label,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label that does not belong to a closed set.
#[derive(Debug, thiserror::Error)]
#[error("unknown label {0:?}")]
pub struct UnknownLabel(pub String);
