//! View models handed to the presentation layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::graph::*;
use crate::models::*;
use crate::validity::Validity;

pub fn media_url(hash: &str) -> String {
    format!("/media/{hash}")
}

/// Pen names as shown in `language`: the author's translation when one
/// exists (lowest id first), otherwise the original pen name.
pub fn display_authors(authors: &[AuthorNode], language: &str) -> Vec<String> {
    let mut authors: Vec<&AuthorNode> = authors.iter().collect();
    authors.sort_by_key(|a| a.author.id);
    authors
        .into_iter()
        .map(|a| {
            a.translations
                .iter()
                .filter(|t| t.language == language)
                .min_by_key(|t| t.id)
                .map(|t| t.pen_name.clone())
                .unwrap_or_else(|| a.author.pen_name.clone())
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChapterSummary {
    pub chapter_id: Id,
    pub title: String,
    pub number: Option<i32>,
    pub counter: i32,
    pub extra: bool,
    pub published_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComicView {
    pub comic_id: Id,
    pub translation_id: Option<Id>,
    pub title: String,
    pub summary: Option<String>,
    pub language: String,
    pub writing_mode: WritingMode,
    pub status: SerializedStatus,
    pub schedule: Schedule,
    pub genres: Vec<Genre>,
    pub authors: Vec<String>,
    pub cover_url: Option<String>,
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnavailableView {
    pub id: Id,
    pub title: String,
    pub default_language: String,
    pub requested_language: String,
    /// Languages this content can be read in right now.
    pub available_languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComicDetail {
    Default(ComicView),
    Translation(ComicView),
    NotAvailable(UnavailableView),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PageView {
    pub number: i32,
    pub url: String,
    pub mime: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChapterView {
    pub chapter_id: Id,
    pub chapter_translation_id: Option<Id>,
    pub comic_id: Id,
    pub comic_title: String,
    pub title: String,
    pub number: Option<i32>,
    pub counter: i32,
    pub extra: bool,
    pub language: String,
    pub writing_mode: WritingMode,
    pub pages: Vec<PageView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChapterDetail {
    Default(ChapterView),
    Translation(ChapterView),
    NotAvailable(UnavailableView),
}

fn summary_of(chapter: &Chapter, title: &str, published_date: NaiveDate) -> ChapterSummary {
    ChapterSummary {
        chapter_id: chapter.id,
        title: title.to_string(),
        number: chapter.number,
        counter: chapter.counter,
        extra: chapter.extra,
        published_date,
    }
}

pub fn default_comic_view(graph: &ComicGraph, writing_mode: WritingMode) -> ComicView {
    let mut chapters: Vec<&ChapterNode> = graph.chapters.iter().filter(|c| c.is_valid()).collect();
    chapters.sort_by_key(|c| c.chapter.counter);
    let comic = &graph.comic;
    ComicView {
        comic_id: comic.id,
        translation_id: None,
        title: comic.title.clone(),
        summary: comic.summary.clone(),
        language: comic.default_language.clone(),
        writing_mode,
        status: comic.status,
        schedule: comic.schedule,
        genres: comic.genres.clone(),
        authors: display_authors(&graph.authors, &comic.default_language),
        cover_url: comic.vertical_cover_hash.as_deref().map(media_url),
        chapters: chapters
            .into_iter()
            .map(|c| summary_of(&c.chapter, &c.chapter.title, c.chapter.published_date))
            .collect(),
    }
}

pub fn translated_comic_view(graph: &ComicGraph, node: &ComicTranslationNode, writing_mode: WritingMode) -> ComicView {
    let mut chapters: Vec<&ChapterTranslationNode> = node.chapters.iter().filter(|c| c.is_valid()).collect();
    chapters.sort_by_key(|c| c.chapter.counter);
    let comic = &graph.comic;
    ComicView {
        comic_id: comic.id,
        translation_id: Some(node.translation.id),
        title: node.translation.title.clone(),
        summary: Some(node.translation.summary.clone()),
        language: node.translation.language.clone(),
        writing_mode,
        status: comic.status,
        schedule: comic.schedule,
        genres: comic.genres.clone(),
        authors: display_authors(&graph.authors, &node.translation.language),
        cover_url: comic.vertical_cover_hash.as_deref().map(media_url),
        chapters: chapters
            .into_iter()
            .map(|c| summary_of(&c.chapter, &c.chapter_translation.title, c.chapter_translation.published_date))
            .collect(),
    }
}

pub fn comic_unavailable_view(graph: &ComicGraph, requested: &str) -> UnavailableView {
    let mut available: Vec<String> = graph
        .translations
        .iter()
        .filter(|t| t.is_valid())
        .map(|t| t.translation.language.clone())
        .collect();
    available.push(graph.comic.default_language.clone());
    available.sort();
    available.dedup();
    UnavailableView {
        id: graph.comic.id,
        title: graph.comic.title.clone(),
        default_language: graph.comic.default_language.clone(),
        requested_language: requested.to_string(),
        available_languages: available,
    }
}

pub fn default_chapter_view(graph: &ChapterGraph, writing_mode: WritingMode) -> ChapterView {
    let mut pages: Vec<&Page> = graph.pages.iter().collect();
    pages.sort_by_key(|p| p.number);
    ChapterView {
        chapter_id: graph.chapter.id,
        chapter_translation_id: None,
        comic_id: graph.comic.id,
        comic_title: graph.comic.title.clone(),
        title: graph.chapter.title.clone(),
        number: graph.chapter.number,
        counter: graph.chapter.counter,
        extra: graph.chapter.extra,
        language: graph.comic.default_language.clone(),
        writing_mode,
        pages: pages
            .into_iter()
            .map(|p| PageView { number: p.number, url: media_url(&p.image_hash), mime: p.mime.clone() })
            .collect(),
    }
}

pub fn translated_chapter_view(graph: &ChapterGraph, localized: &LocalizedChapter, writing_mode: WritingMode) -> ChapterView {
    let mut pages: Vec<&PageTranslation> = localized.pages.iter().collect();
    pages.sort_by_key(|p| p.number);
    ChapterView {
        chapter_id: graph.chapter.id,
        chapter_translation_id: Some(localized.chapter_translation.id),
        comic_id: graph.comic.id,
        comic_title: localized.comic_translation.title.clone(),
        title: localized.chapter_translation.title.clone(),
        number: graph.chapter.number,
        counter: graph.chapter.counter,
        extra: graph.chapter.extra,
        language: localized.comic_translation.language.clone(),
        writing_mode,
        pages: pages
            .into_iter()
            .map(|p| PageView { number: p.number, url: media_url(&p.image_hash), mime: p.mime.clone() })
            .collect(),
    }
}

pub fn chapter_unavailable_view(graph: &ChapterGraph, requested: &str) -> UnavailableView {
    let mut available: Vec<String> = graph
        .translations
        .iter()
        .filter(|t| t.is_valid())
        .map(|t| t.comic_translation.language.clone())
        .collect();
    available.push(graph.comic.default_language.clone());
    available.sort();
    available.dedup();
    UnavailableView {
        id: graph.chapter.id,
        title: graph.chapter.title.clone(),
        default_language: graph.comic.default_language.clone(),
        requested_language: requested.to_string(),
        available_languages: available,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecentChapter {
    pub comic_id: Id,
    pub comic_title: String,
    pub chapter: ChapterSummary,
}

impl RecentChapter {
    pub fn new(comic: &Comic, chapter: &Chapter) -> Self {
        Self {
            comic_id: comic.id,
            comic_title: comic.title.clone(),
            chapter: summary_of(chapter, &chapter.title, chapter.published_date),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostView {
    pub post: Post,
    pub media: Vec<PostMedia>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostDetailView {
    pub post: PostView,
    /// Direct replies, newest first.
    pub replies: Vec<PostView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileView {
    pub profile: UserProfile,
    /// Newest first.
    pub posts: Vec<PostView>,
}
