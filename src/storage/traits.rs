//! Abstract storage interfaces for pluggable backends
//!
//! One trait per entity. Handlers only ever see these traits, so a backend
//! can be swapped without touching the request pipeline.

use async_trait::async_trait;

use super::models::*;
use crate::auth::user::{Level, NewUser, User, UserPatch};
use crate::error::Result;

/// User account storage interface
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Create a new user; fails with a conflict when the email or username is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Get user by ID
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by username
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Apply a partial update, returning the updated user if it exists
    async fn update_user(&self, user_id: &str, patch: UserPatch) -> Result<Option<User>>;

    /// Stamp the last login time
    async fn record_login(&self, user_id: &str) -> Result<()>;

    async fn count_users(&self) -> Result<usize>;

    async fn count_users_by_level(&self, level: Level) -> Result<usize>;
}

/// Lesson catalogue storage interface
#[async_trait]
pub trait LessonStorage: Send + Sync {
    /// Create a lesson; (level, category, order) must be unique
    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson>;

    /// Get lesson by ID, active or not
    async fn get_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>>;

    /// Active lessons sorted by level, category, order
    async fn list_active_lessons(&self) -> Result<Vec<Lesson>>;

    /// Active lessons of a level sorted by category, order
    async fn lessons_by_level(&self, level: Level) -> Result<Vec<Lesson>>;

    /// Active lessons of a level and category sorted by order
    async fn lessons_by_level_and_category(
        &self,
        level: Level,
        category: LessonCategory,
    ) -> Result<Vec<Lesson>>;

    async fn update_lesson(&self, lesson_id: &str, patch: LessonPatch) -> Result<Option<Lesson>>;

    /// Soft delete; returns false when the lesson does not exist
    async fn deactivate_lesson(&self, lesson_id: &str) -> Result<bool>;

    /// Next active lesson within the same level and category
    async fn next_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>>;

    /// Previous active lesson within the same level and category
    async fn previous_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>>;

    /// Case-insensitive search on title, description and tags
    async fn search_lessons(&self, term: &str) -> Result<Vec<Lesson>>;

    async fn lesson_stats(&self) -> Result<LessonStats>;
}

/// Vocabulary storage interface
#[async_trait]
pub trait VocabularyStorage: Send + Sync {
    /// Create an entry; (japanese, lesson_id) must be unique
    async fn create_vocabulary(&self, entry: NewVocabulary) -> Result<VocabularyEntry>;

    async fn get_vocabulary(&self, vocabulary_id: &str) -> Result<Option<VocabularyEntry>>;

    /// Active entries of a lesson sorted by term
    async fn vocabulary_by_lesson(&self, lesson_id: &str) -> Result<Vec<VocabularyEntry>>;

    async fn vocabulary_by_category(&self, category: &str) -> Result<Vec<VocabularyEntry>>;

    async fn vocabulary_by_level(&self, level: Level) -> Result<Vec<VocabularyEntry>>;

    /// Case-insensitive search on every written form
    async fn search_vocabulary(&self, term: &str) -> Result<Vec<VocabularyEntry>>;

    /// Uniform random sample of at most `limit` active entries
    async fn random_vocabulary(
        &self,
        limit: usize,
        filter: VocabularyFilter,
    ) -> Result<Vec<VocabularyEntry>>;

    async fn vocabulary_stats(&self) -> Result<VocabularyStats>;

    /// Soft delete; returns false when the entry does not exist
    async fn deactivate_vocabulary(&self, vocabulary_id: &str) -> Result<bool>;
}

/// Progress storage interface
#[async_trait]
pub trait ProgressStorage: Send + Sync {
    /// Create the record for (user, lesson). Exactly one creation per pair
    /// succeeds; any other fails with a conflict.
    async fn create_progress(&self, progress: NewProgress) -> Result<Progress>;

    async fn get_progress(&self, user_id: &str, lesson_id: &str) -> Result<Option<Progress>>;

    /// A user's records, most recently accessed first
    async fn progress_by_user(&self, user_id: &str, query: ProgressQuery) -> Result<Vec<Progress>>;

    /// Apply a patch to an existing record; `None` when the record is absent
    async fn update_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
        patch: ProgressPatch,
    ) -> Result<Option<Progress>>;

    async fn user_progress_stats(&self, user_id: &str) -> Result<ProgressStats>;

    /// Users ranked by total score over completed lessons
    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;
}

/// Raw document access for the administration panel
#[async_trait]
pub trait AdminStorage: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Page through a collection; `None` when the collection does not exist
    async fn list_documents(
        &self,
        collection: &str,
        search: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<Option<DocumentPage>>;

    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<serde_json::Value>>;

    async fn admin_stats(&self) -> Result<AdminStats>;
}

/// Combined storage provider interface
#[async_trait]
pub trait StorageProvider: Send + Sync {
    fn user_storage(&self) -> &dyn UserStorage;

    fn lesson_storage(&self) -> &dyn LessonStorage;

    fn vocabulary_storage(&self) -> &dyn VocabularyStorage;

    fn progress_storage(&self) -> &dyn ProgressStorage;

    fn admin_storage(&self) -> &dyn AdminStorage;

    /// Health check for the storage backend
    async fn health_check(&self) -> Result<bool>;
}
