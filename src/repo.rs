use async_trait::async_trait;

use crate::graph::{ChapterGraph, ComicGraph};
use crate::models::*;
use crate::validation::{FieldError, ValidationErrors};
use crate::views::PostView;

#[cfg(feature = "inmem-store")]
pub mod inmem;
#[cfg(feature = "postgres-store")]
pub mod pg;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(FieldError),
    #[error("invalid: {0}")]
    Validation(ValidationErrors),
    /// Delete refused because dependent rows still point at the record.
    #[error("protected: {0}")]
    Protected(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for RepoError {
    fn from(e: ValidationErrors) -> Self {
        RepoError::Validation(e)
    }
}

impl From<FieldError> for RepoError {
    fn from(e: FieldError) -> Self {
        RepoError::Validation(e.into())
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait LanguageRepo: Send + Sync {
    async fn list_languages(&self) -> RepoResult<Vec<Language>>;
    async fn get_language(&self, code: &str) -> RepoResult<Option<Language>>;
    async fn upsert_language(&self, language: Language) -> RepoResult<Language>;
}

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    /// Explicit post-registration step; one profile per auth subject.
    async fn register_profile(&self, user_id: &str, new: NewProfile) -> RepoResult<UserProfile>;
    async fn get_profile(&self, id: Id) -> RepoResult<UserProfile>;
    async fn find_profile_by_user(&self, user_id: &str) -> RepoResult<UserProfile>;
}

#[async_trait]
pub trait AuthorRepo: Send + Sync {
    async fn create_author(&self, new: NewAuthor) -> RepoResult<Author>;
    async fn get_author(&self, id: Id) -> RepoResult<Author>;
    async fn create_author_translation(&self, new: NewAuthorTranslation) -> RepoResult<AuthorTranslation>;
    async fn delete_author(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait ComicRepo: Send + Sync {
    async fn create_comic(&self, publisher_id: Id, new: NewComic) -> RepoResult<Comic>;
    async fn get_comic(&self, id: Id) -> RepoResult<Comic>;
    async fn create_comic_translation(&self, new: NewComicTranslation) -> RepoResult<ComicTranslation>;
    async fn find_comic_translation(&self, comic_id: Id, language: &str) -> RepoResult<ComicTranslation>;
    /// Comic with authors, chapters and translations read as one snapshot.
    async fn load_comic_graph(&self, id: Id) -> RepoResult<ComicGraph>;
    async fn delete_comic(&self, id: Id) -> RepoResult<()>;
    async fn delete_comic_translation(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait ChapterRepo: Send + Sync {
    async fn create_chapter(&self, new: NewChapter) -> RepoResult<Chapter>;
    async fn get_chapter(&self, id: Id) -> RepoResult<Chapter>;
    async fn create_chapter_translation(&self, new: NewChapterTranslation) -> RepoResult<ChapterTranslation>;
    async fn load_chapter_graph(&self, id: Id) -> RepoResult<ChapterGraph>;
    /// Newest presentable chapters across all comics.
    async fn recent_chapters(&self, limit: usize) -> RepoResult<Vec<(Comic, Chapter)>>;
    async fn delete_chapter(&self, id: Id) -> RepoResult<()>;
    async fn delete_chapter_translation(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait PageRepo: Send + Sync {
    async fn create_page(&self, new: NewPage) -> RepoResult<Page>;
    async fn update_page_number(&self, id: Id, number: i32) -> RepoResult<Page>;
    async fn delete_page(&self, id: Id) -> RepoResult<()>;
    async fn create_page_translation(&self, new: NewPageTranslation) -> RepoResult<PageTranslation>;
    async fn update_page_translation_number(&self, id: Id, number: i32) -> RepoResult<PageTranslation>;
    async fn delete_page_translation(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, new: NewPost) -> RepoResult<PostView>;
    async fn get_post(&self, id: Id) -> RepoResult<PostView>;
    /// Direct replies, newest first.
    async fn list_replies(&self, post_id: Id) -> RepoResult<Vec<PostView>>;
    async fn recent_posts(&self, limit: usize) -> RepoResult<Vec<PostView>>;
    async fn list_profile_posts(&self, profile_id: Id, limit: usize) -> RepoResult<Vec<PostView>>;
    async fn like_post(&self, post_id: Id, profile_id: Id) -> RepoResult<Post>;
    async fn unlike_post(&self, post_id: Id, profile_id: Id) -> RepoResult<Post>;
    /// Removes the post with its replies, media and likes.
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
}

pub trait Repo: LanguageRepo + ProfileRepo + AuthorRepo + ComicRepo + ChapterRepo + PageRepo + PostRepo {}

impl<T> Repo for T where T: LanguageRepo + ProfileRepo + AuthorRepo + ComicRepo + ChapterRepo + PageRepo + PostRepo {}
