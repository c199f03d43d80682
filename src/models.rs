use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "genre", rename_all = "kebab-case")]
pub enum Genre {
    Adventure,
    #[serde(rename = "sci-fi")]
    #[sqlx(rename = "sci-fi")]
    SciFi,
    Mystery,
    Fantasy,
    Action,
    Romance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "serialized_status", rename_all = "lowercase")]
pub enum SerializedStatus {
    #[default]
    Ongoing,
    Complete,
    Hiatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "serialized_schedule", rename_all = "lowercase")]
pub enum Schedule {
    #[default]
    Weekly,
    Monthly,
    Indefinite,
}

/// CSS `writing-mode` a text block is laid out with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "writing_mode", rename_all = "kebab-case")]
pub enum WritingMode {
    #[default]
    HorizontalTb,
    VerticalRl,
    VerticalLr,
}

impl WritingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingMode::HorizontalTb => "horizontal-tb",
            WritingMode::VerticalRl => "vertical-rl",
            WritingMode::VerticalLr => "vertical-lr",
        }
    }
}

impl std::str::FromStr for WritingMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal-tb" => Ok(WritingMode::HorizontalTb),
            "vertical-rl" => Ok(WritingMode::VerticalRl),
            "vertical-lr" => Ok(WritingMode::VerticalLr),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Language {
    pub code: String,
    pub writing_mode: WritingMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Id,
    #[serde(skip_serializing, default)]
    pub user_id: String, // auth subject, never exposed
    pub name: String,
    pub email_confirmed: bool,
    pub avatar_hash: Option<String>,
    pub bio: Option<String>,
    pub bio_writing_mode: Option<WritingMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewProfile {
    pub name: String,
    pub bio: Option<String>,
    pub bio_writing_mode: Option<WritingMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Author {
    pub id: Id,
    pub pen_name: String,
    pub default_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAuthor {
    pub pen_name: String,
    pub default_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AuthorTranslation {
    pub id: Id,
    pub author_id: Id,
    pub language: String,
    pub pen_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAuthorTranslation {
    pub author_id: Id,
    pub language: String,
    pub pen_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comic {
    pub id: Id,
    pub title: String,
    pub summary: Option<String>,
    pub default_language: String,
    pub status: SerializedStatus,
    pub schedule: Schedule,
    pub publisher_id: Id,
    pub author_ids: Vec<Id>,
    pub genres: Vec<Genre>,
    pub vertical_cover_hash: Option<String>,
    pub published_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Write payload for a comic; the publisher is taken from the caller's profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComic {
    pub title: String,
    pub summary: Option<String>,
    pub default_language: String,
    #[serde(default)]
    pub status: SerializedStatus,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub author_ids: Vec<Id>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub vertical_cover_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ComicTranslation {
    pub id: Id,
    pub comic_id: Id,
    pub language: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComicTranslation {
    pub comic_id: Id,
    pub language: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Chapter {
    pub id: Id,
    pub comic_id: Id,
    pub title: String,
    pub number: Option<i32>,
    pub counter: i32,
    pub extra: bool,
    pub cover_hash: Option<String>,
    pub published_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewChapter {
    pub comic_id: Id,
    pub title: String,
    pub number: Option<i32>,
    pub counter: i32,
    #[serde(default)]
    pub extra: bool,
    pub cover_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ChapterTranslation {
    pub id: Id,
    pub chapter_id: Id,
    pub comic_translation_id: Id,
    pub title: String,
    pub published_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewChapterTranslation {
    pub chapter_id: Id,
    pub comic_translation_id: Id,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Page {
    pub id: Id,
    pub chapter_id: Id,
    pub number: i32,
    pub image_hash: String,
    pub mime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPage {
    pub chapter_id: Id,
    pub number: i32,
    pub image_hash: String,
    pub mime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PageTranslation {
    pub id: Id,
    pub chapter_translation_id: Id,
    pub number: i32,
    pub image_hash: String,
    pub mime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPageTranslation {
    pub chapter_translation_id: Id,
    pub number: i32,
    pub image_hash: String,
    pub mime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePageNumber {
    pub number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub profile_id: Id,
    pub text_content: String,
    pub writing_mode: WritingMode,
    pub like_count: i64,
    pub reply_to: Option<Id>,
    pub about_comic: Option<Id>,
    pub about_chapter: Option<Id>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PostMedia {
    pub id: Id,
    pub post_id: Id,
    pub hash: String,
    pub mime: String,
    pub alt_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPostMedia {
    pub hash: String,
    pub mime: String,
    pub alt_text: String,
}

/// A post together with its attachments; written in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPost {
    pub profile_id: Id,
    pub text_content: String,
    #[serde(default)]
    pub writing_mode: WritingMode,
    pub reply_to: Option<Id>,
    pub about_comic: Option<Id>,
    pub about_chapter: Option<Id>,
    #[serde(default)]
    pub media: Vec<NewPostMedia>,
}
