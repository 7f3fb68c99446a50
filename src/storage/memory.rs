//! In-memory storage implementation for development and testing
//!
//! Every collection sits behind its own `RwLock`. Uniqueness checks and the
//! insert that follows them happen under a single write guard, which gives the
//! same guarantee a unique index gives a document store.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::*;
use super::traits::*;
use crate::auth::user::{Level, NewUser, Preferences, User, UserPatch};
use crate::core::clock::{Clock, SystemClock};
use crate::error::{NihongoError, Result};

pub const USERS_COLLECTION: &str = "users";
pub const LESSONS_COLLECTION: &str = "lessons";
pub const VOCABULARY_COLLECTION: &str = "vocabulary";
pub const PROGRESS_COLLECTION: &str = "user_progress";

/// Fields looked at by the admin document search
const SEARCHABLE_FIELDS: [&str; 5] = ["username", "email", "title", "japanese", "portuguese"];

#[derive(Default)]
struct UserTable {
    by_id: HashMap<String, User>,
    email_index: HashMap<String, String>,    // lowercased email -> user_id
    username_index: HashMap<String, String>, // lowercased username -> user_id
}

/// Progress records keyed by (user_id, lesson_id)
type ProgressTable = HashMap<(String, String), Progress>;

pub struct MemoryStorageProvider {
    users: Arc<RwLock<UserTable>>,
    lessons: Arc<RwLock<HashMap<String, Lesson>>>,
    vocabulary: Arc<RwLock<HashMap<String, VocabularyEntry>>>,
    progress: Arc<RwLock<ProgressTable>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStorageProvider {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: Arc::new(RwLock::new(UserTable::default())),
            lessons: Arc::new(RwLock::new(HashMap::new())),
            vocabulary: Arc::new(RwLock::new(HashMap::new())),
            progress: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }
}

impl Default for MemoryStorageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn user_storage(&self) -> &dyn UserStorage {
        self
    }

    fn lesson_storage(&self) -> &dyn LessonStorage {
        self
    }

    fn vocabulary_storage(&self) -> &dyn VocabularyStorage {
        self
    }

    fn progress_storage(&self) -> &dyn ProgressStorage {
        self
    }

    fn admin_storage(&self) -> &dyn AdminStorage {
        self
    }

    async fn health_check(&self) -> Result<bool> {
        // Memory storage is always healthy
        Ok(true)
    }
}

#[async_trait]
impl UserStorage for MemoryStorageProvider {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        let email_key = new_user.email.to_lowercase();
        let username_key = new_user.username.to_lowercase();
        if users.email_index.contains_key(&email_key)
            || users.username_index.contains_key(&username_key)
        {
            return Err(NihongoError::ConflictError(
                "Usuário já existe com este email ou nome de usuário".to_string(),
            ));
        }

        let user = User {
            id: Self::generate_id(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            level: Level::Beginner,
            role: new_user.role,
            is_active: true,
            preferences: Preferences::default(),
            created_at: self.clock.now(),
            last_login: None,
        };

        users.email_index.insert(email_key, user.id.clone());
        users.username_index.insert(username_key, user.id.clone());
        users.by_id.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.by_id.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .email_index
            .get(&email.to_lowercase())
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .username_index
            .get(&username.to_lowercase())
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn update_user(&self, user_id: &str, patch: UserPatch) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.by_id.get_mut(user_id).map(|user| {
            patch.apply(user);
            user.clone()
        }))
    }

    async fn record_login(&self, user_id: &str) -> Result<()> {
        let mut users = self.users.write().await;
        match users.by_id.get_mut(user_id) {
            Some(user) => {
                user.last_login = Some(self.clock.now());
                Ok(())
            }
            None => Err(NihongoError::NotFound("Usuário não encontrado".to_string())),
        }
    }

    async fn count_users(&self) -> Result<usize> {
        Ok(self.users.read().await.by_id.len())
    }

    async fn count_users_by_level(&self, level: Level) -> Result<usize> {
        let users = self.users.read().await;
        Ok(users.by_id.values().filter(|u| u.level == level).count())
    }
}

fn lesson_order(a: &Lesson, b: &Lesson) -> Ordering {
    a.level
        .cmp(&b.level)
        .then(a.category.cmp(&b.category))
        .then(a.order.cmp(&b.order))
}

fn has_lesson_slot(
    lessons: &HashMap<String, Lesson>,
    level: Level,
    category: LessonCategory,
    order: u32,
    except_id: Option<&str>,
) -> bool {
    lessons.values().any(|lesson| {
        Some(lesson.id.as_str()) != except_id
            && lesson.level == level
            && lesson.category == category
            && lesson.order == order
    })
}

const LESSON_SLOT_TAKEN: &str = "Já existe uma lição com esta ordem neste nível e categoria";

impl MemoryStorageProvider {
    async fn active_lessons_where<F>(&self, predicate: F) -> Vec<Lesson>
    where
        F: Fn(&Lesson) -> bool + Send,
    {
        let lessons = self.lessons.read().await;
        let mut result: Vec<Lesson> = lessons
            .values()
            .filter(|lesson| lesson.is_active && predicate(lesson))
            .cloned()
            .collect();
        result.sort_by(lesson_order);
        result
    }

    /// Closest active sibling of a lesson in the given direction
    async fn sibling_lesson(&self, lesson_id: &str, forward: bool) -> Result<Option<Lesson>> {
        let lessons = self.lessons.read().await;
        let current = lessons
            .get(lesson_id)
            .ok_or_else(|| NihongoError::NotFound("Lição não encontrada".to_string()))?;

        let siblings = lessons.values().filter(|lesson| {
            lesson.is_active
                && lesson.level == current.level
                && lesson.category == current.category
                && if forward {
                    lesson.order > current.order
                } else {
                    lesson.order < current.order
                }
        });

        let sibling = if forward {
            siblings.min_by_key(|lesson| lesson.order)
        } else {
            siblings.max_by_key(|lesson| lesson.order)
        };

        Ok(sibling.cloned())
    }
}

#[async_trait]
impl LessonStorage for MemoryStorageProvider {
    async fn create_lesson(&self, new_lesson: NewLesson) -> Result<Lesson> {
        let mut lessons = self.lessons.write().await;

        if has_lesson_slot(
            &lessons,
            new_lesson.level,
            new_lesson.category,
            new_lesson.order,
            None,
        ) {
            return Err(NihongoError::ConflictError(LESSON_SLOT_TAKEN.to_string()));
        }

        let now = self.clock.now();
        let lesson = Lesson {
            id: Self::generate_id(),
            title: new_lesson.title,
            description: new_lesson.description,
            level: new_lesson.level,
            category: new_lesson.category,
            order: new_lesson.order,
            content: new_lesson.content,
            exercises: new_lesson.exercises,
            duration: new_lesson.duration,
            prerequisites: new_lesson.prerequisites,
            tags: new_lesson.tags,
            is_active: new_lesson.is_active,
            created_at: now,
            updated_at: now,
        };

        lessons.insert(lesson.id.clone(), lesson.clone());
        Ok(lesson)
    }

    async fn get_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>> {
        Ok(self.lessons.read().await.get(lesson_id).cloned())
    }

    async fn list_active_lessons(&self) -> Result<Vec<Lesson>> {
        Ok(self.active_lessons_where(|_| true).await)
    }

    async fn lessons_by_level(&self, level: Level) -> Result<Vec<Lesson>> {
        Ok(self.active_lessons_where(|lesson| lesson.level == level).await)
    }

    async fn lessons_by_level_and_category(
        &self,
        level: Level,
        category: LessonCategory,
    ) -> Result<Vec<Lesson>> {
        Ok(self
            .active_lessons_where(|lesson| lesson.level == level && lesson.category == category)
            .await)
    }

    async fn update_lesson(&self, lesson_id: &str, patch: LessonPatch) -> Result<Option<Lesson>> {
        let mut lessons = self.lessons.write().await;

        let Some(current) = lessons.get(lesson_id) else {
            return Ok(None);
        };

        let level = patch.level.unwrap_or(current.level);
        let category = patch.category.unwrap_or(current.category);
        let order = patch.order.unwrap_or(current.order);
        if has_lesson_slot(&lessons, level, category, order, Some(lesson_id)) {
            return Err(NihongoError::ConflictError(LESSON_SLOT_TAKEN.to_string()));
        }

        let now = self.clock.now();
        Ok(lessons.get_mut(lesson_id).map(|lesson| {
            patch.apply(lesson, now);
            lesson.clone()
        }))
    }

    async fn deactivate_lesson(&self, lesson_id: &str) -> Result<bool> {
        let mut lessons = self.lessons.write().await;
        let now = self.clock.now();
        Ok(match lessons.get_mut(lesson_id) {
            Some(lesson) => {
                lesson.is_active = false;
                lesson.updated_at = now;
                true
            }
            None => false,
        })
    }

    async fn next_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>> {
        self.sibling_lesson(lesson_id, true).await
    }

    async fn previous_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>> {
        self.sibling_lesson(lesson_id, false).await
    }

    async fn search_lessons(&self, term: &str) -> Result<Vec<Lesson>> {
        let term_lower = term.to_lowercase();
        Ok(self
            .active_lessons_where(|lesson| lesson.matches_term(&term_lower))
            .await)
    }

    async fn lesson_stats(&self) -> Result<LessonStats> {
        let lessons = self.lessons.read().await;
        let mut stats = LessonStats::default();

        for lesson in lessons.values() {
            if !lesson.is_active {
                stats.by_status.inactive += 1;
                continue;
            }
            stats.total += 1;
            stats.by_status.active += 1;
            *stats
                .by_level
                .entry(lesson.level.to_string())
                .or_default() += 1;
            *stats
                .by_category
                .entry(lesson.category.to_string())
                .or_default() += 1;
        }

        Ok(stats)
    }
}

impl MemoryStorageProvider {
    async fn active_vocabulary_where<F>(&self, predicate: F) -> Vec<VocabularyEntry>
    where
        F: Fn(&VocabularyEntry) -> bool + Send,
    {
        let vocabulary = self.vocabulary.read().await;
        let mut result: Vec<VocabularyEntry> = vocabulary
            .values()
            .filter(|entry| entry.is_active && predicate(entry))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.japanese.cmp(&b.japanese));
        result
    }
}

#[async_trait]
impl VocabularyStorage for MemoryStorageProvider {
    async fn create_vocabulary(&self, new_entry: NewVocabulary) -> Result<VocabularyEntry> {
        let mut vocabulary = self.vocabulary.write().await;

        let exists = vocabulary.values().any(|entry| {
            entry.japanese == new_entry.japanese && entry.lesson_id == new_entry.lesson_id
        });
        if exists {
            return Err(NihongoError::ConflictError(
                "Este vocabulário já existe nesta lição".to_string(),
            ));
        }

        let now = self.clock.now();
        let entry = VocabularyEntry {
            id: Self::generate_id(),
            japanese: new_entry.japanese,
            romaji: new_entry.romaji,
            portuguese: new_entry.portuguese,
            english: new_entry.english,
            lesson_id: new_entry.lesson_id,
            category: new_entry.category,
            level: new_entry.level,
            audio_url: new_entry.audio_url,
            example_sentence: new_entry.example_sentence,
            example_translation: new_entry.example_translation,
            notes: new_entry.notes,
            tags: new_entry.tags,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        vocabulary.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn get_vocabulary(&self, vocabulary_id: &str) -> Result<Option<VocabularyEntry>> {
        Ok(self.vocabulary.read().await.get(vocabulary_id).cloned())
    }

    async fn vocabulary_by_lesson(&self, lesson_id: &str) -> Result<Vec<VocabularyEntry>> {
        Ok(self
            .active_vocabulary_where(|entry| entry.lesson_id == lesson_id)
            .await)
    }

    async fn vocabulary_by_category(&self, category: &str) -> Result<Vec<VocabularyEntry>> {
        Ok(self
            .active_vocabulary_where(|entry| entry.category == category)
            .await)
    }

    async fn vocabulary_by_level(&self, level: Level) -> Result<Vec<VocabularyEntry>> {
        Ok(self.active_vocabulary_where(|entry| entry.level == level).await)
    }

    async fn search_vocabulary(&self, term: &str) -> Result<Vec<VocabularyEntry>> {
        let term_lower = term.to_lowercase();
        Ok(self
            .active_vocabulary_where(|entry| entry.matches_term(&term_lower))
            .await)
    }

    async fn random_vocabulary(
        &self,
        limit: usize,
        filter: VocabularyFilter,
    ) -> Result<Vec<VocabularyEntry>> {
        let vocabulary = self.vocabulary.read().await;
        let candidates: Vec<&VocabularyEntry> = vocabulary
            .values()
            .filter(|entry| entry.is_active && filter.matches(entry))
            .collect();

        let sample: Vec<VocabularyEntry> = {
            let mut rng = rand::thread_rng();
            candidates
                .choose_multiple(&mut rng, limit)
                .map(|entry| (*entry).clone())
                .collect()
        };

        Ok(sample)
    }

    async fn vocabulary_stats(&self) -> Result<VocabularyStats> {
        let vocabulary = self.vocabulary.read().await;
        let mut stats = VocabularyStats::default();

        for entry in vocabulary.values().filter(|entry| entry.is_active) {
            stats.total += 1;
            *stats.by_level.entry(entry.level.to_string()).or_default() += 1;
            *stats.by_category.entry(entry.category.clone()).or_default() += 1;
        }

        Ok(stats)
    }

    async fn deactivate_vocabulary(&self, vocabulary_id: &str) -> Result<bool> {
        let mut vocabulary = self.vocabulary.write().await;
        let now = self.clock.now();
        Ok(match vocabulary.get_mut(vocabulary_id) {
            Some(entry) => {
                entry.is_active = false;
                entry.updated_at = now;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl ProgressStorage for MemoryStorageProvider {
    async fn create_progress(&self, new_progress: NewProgress) -> Result<Progress> {
        let mut progress = self.progress.write().await;

        let key = (new_progress.user_id.clone(), new_progress.lesson_id.clone());
        if progress.contains_key(&key) {
            return Err(NihongoError::ConflictError(
                "Progresso já existe para este usuário e lição".to_string(),
            ));
        }

        let now = self.clock.now();
        let record = Progress {
            id: Self::generate_id(),
            user_id: new_progress.user_id,
            lesson_id: new_progress.lesson_id,
            status: new_progress.status,
            score: clamp_score(new_progress.score),
            attempts: 0,
            time_spent: new_progress.time_spent,
            notes: new_progress.notes,
            favorite: false,
            started_at: now,
            last_accessed: now,
            completed_at: (new_progress.status == ProgressStatus::Completed).then_some(now),
        };

        progress.insert(key, record.clone());
        Ok(record)
    }

    async fn get_progress(&self, user_id: &str, lesson_id: &str) -> Result<Option<Progress>> {
        let progress = self.progress.read().await;
        Ok(progress
            .get(&(user_id.to_string(), lesson_id.to_string()))
            .cloned())
    }

    async fn progress_by_user(&self, user_id: &str, query: ProgressQuery) -> Result<Vec<Progress>> {
        let progress = self.progress.read().await;
        let mut records: Vec<Progress> = progress
            .values()
            .filter(|record| record.user_id == user_id)
            .filter(|record| query.status.map_or(true, |status| record.status == status))
            .filter(|record| !query.favorite_only || record.favorite)
            .cloned()
            .collect();

        if query.status == Some(ProgressStatus::Completed) {
            records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        } else {
            records.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        }

        Ok(records)
    }

    async fn update_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
        patch: ProgressPatch,
    ) -> Result<Option<Progress>> {
        let mut progress = self.progress.write().await;
        let now = self.clock.now();
        Ok(progress
            .get_mut(&(user_id.to_string(), lesson_id.to_string()))
            .map(|record| {
                patch.apply(record, now);
                record.clone()
            }))
    }

    async fn user_progress_stats(&self, user_id: &str) -> Result<ProgressStats> {
        let progress = self.progress.read().await;
        let mut stats = ProgressStats::default();
        let mut score_sum: u64 = 0;

        for record in progress.values().filter(|record| record.user_id == user_id) {
            stats.total_lessons += 1;
            match record.status {
                ProgressStatus::Completed => stats.completed_lessons += 1,
                ProgressStatus::InProgress => stats.in_progress_lessons += 1,
                ProgressStatus::NotStarted => {}
            }
            if record.favorite {
                stats.favorite_lessons += 1;
            }
            stats.total_time_spent += record.time_spent;
            score_sum += u64::from(record.score);
        }

        if stats.total_lessons > 0 {
            stats.average_score = score_sum as f64 / stats.total_lessons as f64;
        }

        Ok(stats)
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let progress = self.progress.read().await;
        let mut totals: HashMap<&str, (u64, usize)> = HashMap::new();

        for record in progress
            .values()
            .filter(|record| record.status == ProgressStatus::Completed)
        {
            let entry = totals.entry(record.user_id.as_str()).or_default();
            entry.0 += u64::from(record.score);
            entry.1 += 1;
        }

        let mut board: Vec<LeaderboardEntry> = totals
            .into_iter()
            .map(|(user_id, (total_score, completed_lessons))| LeaderboardEntry {
                user_id: user_id.to_string(),
                total_score,
                completed_lessons,
                average_score: total_score as f64 / completed_lessons as f64,
            })
            .collect();

        board.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        board.truncate(limit);

        Ok(board)
    }
}

fn to_documents<T: Serialize>(items: Vec<T>) -> Result<Vec<serde_json::Value>> {
    items
        .into_iter()
        .map(|item| serde_json::to_value(item).map_err(NihongoError::from))
        .collect()
}

fn document_matches(document: &serde_json::Value, search_lower: &str) -> bool {
    SEARCHABLE_FIELDS.iter().any(|field| {
        document
            .get(field)
            .and_then(|value| value.as_str())
            .is_some_and(|value| value.to_lowercase().contains(search_lower))
    })
}

impl MemoryStorageProvider {
    /// Every document of a collection, newest first; users lose their password hash
    async fn collection_documents(&self, collection: &str) -> Result<Option<Vec<serde_json::Value>>> {
        let documents = match collection {
            USERS_COLLECTION => {
                let users = self.users.read().await;
                let mut items: Vec<&User> = users.by_id.values().collect();
                items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                to_documents(items)?
            }
            LESSONS_COLLECTION => {
                let lessons = self.lessons.read().await;
                let mut items: Vec<&Lesson> = lessons.values().collect();
                items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                to_documents(items)?
            }
            VOCABULARY_COLLECTION => {
                let vocabulary = self.vocabulary.read().await;
                let mut items: Vec<&VocabularyEntry> = vocabulary.values().collect();
                items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                to_documents(items)?
            }
            PROGRESS_COLLECTION => {
                let progress = self.progress.read().await;
                let mut items: Vec<&Progress> = progress.values().collect();
                items.sort_by(|a, b| b.started_at.cmp(&a.started_at));
                to_documents(items)?
            }
            _ => return Ok(None),
        };

        Ok(Some(documents))
    }
}

#[async_trait]
impl AdminStorage for MemoryStorageProvider {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let counts = [
            (USERS_COLLECTION, self.users.read().await.by_id.len()),
            (LESSONS_COLLECTION, self.lessons.read().await.len()),
            (VOCABULARY_COLLECTION, self.vocabulary.read().await.len()),
            (PROGRESS_COLLECTION, self.progress.read().await.len()),
        ];

        Ok(counts
            .into_iter()
            .map(|(name, count)| CollectionInfo {
                name: name.to_string(),
                count,
                kind: "collection".to_string(),
            })
            .collect())
    }

    async fn list_documents(
        &self,
        collection: &str,
        search: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<Option<DocumentPage>> {
        let Some(mut documents) = self.collection_documents(collection).await? else {
            return Ok(None);
        };

        if let Some(search) = search.filter(|s| !s.is_empty()) {
            let search_lower = search.to_lowercase();
            documents.retain(|document| document_matches(document, &search_lower));
        }

        let total = documents.len();
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let documents = documents.into_iter().skip(skip).take(limit).collect();

        Ok(Some(DocumentPage { documents, total }))
    }

    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<serde_json::Value>> {
        let Some(documents) = self.collection_documents(collection).await? else {
            return Ok(None);
        };

        Ok(documents
            .into_iter()
            .find(|document| document.get("id").and_then(|id| id.as_str()) == Some(document_id)))
    }

    async fn admin_stats(&self) -> Result<AdminStats> {
        let mut stats = AdminStats::default();

        {
            let users = self.users.read().await;
            stats.total_users = users.by_id.len();
            for user in users.by_id.values() {
                *stats
                    .users_by_level
                    .entry(user.level.to_string())
                    .or_default() += 1;
            }
        }

        {
            let lessons = self.lessons.read().await;
            stats.total_lessons = lessons.len();
            for lesson in lessons.values() {
                *stats
                    .lessons_by_category
                    .entry(lesson.category.to_string())
                    .or_default() += 1;
            }
        }

        stats.total_vocabulary = self.vocabulary.read().await.len();

        {
            let progress = self.progress.read().await;
            stats.total_progress = progress.len();
            for record in progress.values() {
                *stats
                    .progress_by_status
                    .entry(record.status.as_str().to_string())
                    .or_default() += 1;
            }
        }

        Ok(stats)
    }
}
