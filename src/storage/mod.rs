//! Document storage: entity traits and the in-memory backend

pub mod memory;
pub mod models;
pub mod traits;

pub use memory::MemoryStorageProvider;
pub use traits::{
    AdminStorage, LessonStorage, ProgressStorage, StorageProvider, UserStorage, VocabularyStorage,
};
