//! Documents kept by the storage backends and the patch types that mutate them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::auth::user::Level;
use crate::constants::MAX_SCORE;
use crate::error::NihongoError;

/// Lesson subject area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonCategory {
    Hiragana,
    Katakana,
    Kanji,
    Grammar,
    Vocabulary,
    Conversation,
}

impl LessonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonCategory::Hiragana => "hiragana",
            LessonCategory::Katakana => "katakana",
            LessonCategory::Kanji => "kanji",
            LessonCategory::Grammar => "grammar",
            LessonCategory::Vocabulary => "vocabulary",
            LessonCategory::Conversation => "conversation",
        }
    }
}

impl fmt::Display for LessonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonCategory {
    type Err = NihongoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hiragana" => Ok(LessonCategory::Hiragana),
            "katakana" => Ok(LessonCategory::Katakana),
            "kanji" => Ok(LessonCategory::Kanji),
            "grammar" => Ok(LessonCategory::Grammar),
            "vocabulary" => Ok(LessonCategory::Vocabulary),
            "conversation" => Ok(LessonCategory::Conversation),
            _ => Err(NihongoError::invalid("Categoria inválida")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub category: LessonCategory,
    pub order: u32,
    pub content: Vec<serde_json::Value>,
    pub exercises: Vec<serde_json::Value>,
    /// Estimated minutes
    pub duration: u32,
    pub prerequisites: Vec<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub fn matches_term(&self, term_lower: &str) -> bool {
        self.title.to_lowercase().contains(term_lower)
            || self.description.to_lowercase().contains(term_lower)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(term_lower))
    }
}

fn default_duration() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level: Level,
    pub category: LessonCategory,
    pub order: u32,
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
    #[serde(default)]
    pub exercises: Vec<serde_json::Value>,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub level: Option<Level>,
    pub category: Option<LessonCategory>,
    pub order: Option<u32>,
    pub content: Option<Vec<serde_json::Value>>,
    pub exercises: Option<Vec<serde_json::Value>>,
    pub duration: Option<u32>,
    pub prerequisites: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl LessonPatch {
    pub fn apply(self, lesson: &mut Lesson, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            lesson.title = title;
        }
        if let Some(description) = self.description {
            lesson.description = description;
        }
        if let Some(level) = self.level {
            lesson.level = level;
        }
        if let Some(category) = self.category {
            lesson.category = category;
        }
        if let Some(order) = self.order {
            lesson.order = order;
        }
        if let Some(content) = self.content {
            lesson.content = content;
        }
        if let Some(exercises) = self.exercises {
            lesson.exercises = exercises;
        }
        if let Some(duration) = self.duration {
            lesson.duration = duration;
        }
        if let Some(prerequisites) = self.prerequisites {
            lesson.prerequisites = prerequisites;
        }
        if let Some(tags) = self.tags {
            lesson.tags = tags;
        }
        if let Some(is_active) = self.is_active {
            lesson.is_active = is_active;
        }
        lesson.updated_at = now;
    }
}

/// Lesson catalogue overview
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStats {
    pub total: usize,
    pub by_level: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_status: StatusCounts,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: String,
    pub japanese: String,
    pub romaji: String,
    pub portuguese: String,
    pub english: Option<String>,
    pub lesson_id: String,
    pub category: String,
    pub level: Level,
    pub audio_url: Option<String>,
    pub example_sentence: Option<String>,
    pub example_translation: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl VocabularyEntry {
    /// Case-insensitive match on any of the written forms
    pub fn matches_term(&self, term_lower: &str) -> bool {
        self.japanese.to_lowercase().contains(term_lower)
            || self.romaji.to_lowercase().contains(term_lower)
            || self.portuguese.to_lowercase().contains(term_lower)
            || self
                .english
                .as_ref()
                .is_some_and(|english| english.to_lowercase().contains(term_lower))
    }

    pub fn has_tag_like(&self, tag_lower: &str) -> bool {
        self.tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(tag_lower))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVocabulary {
    pub japanese: String,
    pub romaji: String,
    pub portuguese: String,
    #[serde(default)]
    pub english: Option<String>,
    pub lesson_id: String,
    pub category: String,
    pub level: Level,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub example_sentence: Option<String>,
    #[serde(default)]
    pub example_translation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Filter used by the random sampler
#[derive(Debug, Clone, Default)]
pub struct VocabularyFilter {
    pub level: Option<Level>,
    pub category: Option<String>,
}

impl VocabularyFilter {
    pub fn matches(&self, entry: &VocabularyEntry) -> bool {
        self.level.map_or(true, |level| entry.level == level)
            && self
                .category
                .as_ref()
                .map_or(true, |category| &entry.category == category)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyStats {
    pub total: usize,
    pub by_level: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }
}

/// Clamp an incoming score into the stored range
pub fn clamp_score(score: i64) -> u32 {
    score.clamp(0, MAX_SCORE as i64) as u32
}

/// Per-user, per-lesson study record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub id: String,
    pub user_id: String,
    pub lesson_id: String,
    pub status: ProgressStatus,
    pub score: u32,
    pub attempts: u32,
    /// Seconds
    pub time_spent: u64,
    pub notes: Option<String>,
    pub favorite: bool,
    pub started_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewProgress {
    pub user_id: String,
    pub lesson_id: String,
    pub status: ProgressStatus,
    pub score: i64,
    pub time_spent: u64,
    pub notes: Option<String>,
}

impl NewProgress {
    pub fn started(user_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            lesson_id: lesson_id.into(),
            status: ProgressStatus::InProgress,
            score: 0,
            time_spent: 0,
            notes: None,
        }
    }
}

/// Mutable part of a progress record. Owner and lesson are not patchable.
#[derive(Debug, Clone, Default)]
pub struct ProgressPatch {
    pub status: Option<ProgressStatus>,
    pub score: Option<i64>,
    pub time_spent: Option<u64>,
    pub notes: Option<String>,
    pub favorite: Option<bool>,
}

impl ProgressPatch {
    pub fn completed(score: i64) -> Self {
        Self {
            status: Some(ProgressStatus::Completed),
            score: Some(score),
            ..Self::default()
        }
    }

    pub fn score(score: i64) -> Self {
        Self {
            score: Some(score),
            ..Self::default()
        }
    }

    pub fn favorite(favorite: bool) -> Self {
        Self {
            favorite: Some(favorite),
            ..Self::default()
        }
    }

    pub fn apply(self, progress: &mut Progress, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            if status == ProgressStatus::Completed && progress.status != ProgressStatus::Completed {
                progress.attempts += 1;
            }
            progress.status = status;
        }
        if let Some(score) = self.score {
            progress.score = clamp_score(score);
        }
        if let Some(time_spent) = self.time_spent {
            progress.time_spent = time_spent;
        }
        if let Some(notes) = self.notes {
            progress.notes = Some(notes);
        }
        if let Some(favorite) = self.favorite {
            progress.favorite = favorite;
        }
        if progress.status == ProgressStatus::Completed && progress.completed_at.is_none() {
            progress.completed_at = Some(now);
        }
        progress.last_accessed = now;
    }
}

/// Optional narrowing of a user's progress listing
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressQuery {
    pub status: Option<ProgressStatus>,
    pub favorite_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub in_progress_lessons: usize,
    pub average_score: f64,
    pub total_time_spent: u64,
    pub favorite_lessons: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub total_score: u64,
    pub completed_lessons: usize,
    pub average_score: f64,
}

/// Summary of one document collection
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentPage {
    pub documents: Vec<serde_json::Value>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: usize,
    pub total_lessons: usize,
    pub total_vocabulary: usize,
    pub total_progress: usize,
    pub users_by_level: BTreeMap<String, usize>,
    pub lessons_by_category: BTreeMap<String, usize>,
    pub progress_by_status: BTreeMap<String, usize>,
}
