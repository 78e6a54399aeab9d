use serde::{Deserialize, Serialize};

use crate::model::ids::{CardId, LessonId};

/// Classification of how essential a lesson is for a given user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Core,
    Targeted,
    Optional,
}

impl Tier {
    /// Parses the storage representation. Unknown values yield `None` so the
    /// roadmap assembler can decide how to report them.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "core" => Some(Self::Core),
            "targeted" => Some(Self::Targeted),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Targeted => "targeted",
            Self::Optional => "optional",
        }
    }
}

/// The two kinds of lesson cards. Text cards are the unit of lesson
/// navigation (a "sublesson"); key-concept cards accompany them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Text,
    KeyConcept,
}

impl CardType {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "key_concept" => Some(Self::KeyConcept),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::KeyConcept => "key_concept",
        }
    }
}

/// Lesson metadata as shown on a lesson page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub description: String,
    pub lesson_order: u32,
}

/// A source citation attached to a lesson card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: i64,
    pub card_id: CardId,
    pub citation_text: String,
    pub source_name: String,
    pub source_url: String,
}

/// One card in a lesson's ordered content sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonCard {
    pub id: CardId,
    pub lesson_id: LessonId,
    pub card_order: u32,
    pub card_type: CardType,
    pub title: String,
    pub content: String,
    pub citations: Vec<Citation>,
}

/// A lesson together with its ordered cards, as served to the lesson view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonContent {
    pub lesson: Lesson,
    pub cards: Vec<LessonCard>,
}
