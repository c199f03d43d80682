//! Read snapshots of the content tree.
//!
//! A repository assembles a graph in a single read so that validity and
//! language resolution for one request see one consistent state. Children
//! arrive in no particular order; consumers sort or pick explicitly.

use crate::models::*;

#[derive(Debug, Clone)]
pub struct ChapterNode {
    pub chapter: Chapter,
    pub page_count: usize,
}

#[derive(Debug, Clone)]
pub struct ChapterTranslationNode {
    pub chapter_translation: ChapterTranslation,
    /// Source chapter, carried for number/counter display.
    pub chapter: Chapter,
    pub page_count: usize,
}

#[derive(Debug, Clone)]
pub struct ComicTranslationNode {
    pub translation: ComicTranslation,
    pub chapters: Vec<ChapterTranslationNode>,
}

#[derive(Debug, Clone)]
pub struct AuthorNode {
    pub author: Author,
    pub translations: Vec<AuthorTranslation>,
}

#[derive(Debug, Clone)]
pub struct ComicGraph {
    pub comic: Comic,
    pub authors: Vec<AuthorNode>,
    pub chapters: Vec<ChapterNode>,
    pub translations: Vec<ComicTranslationNode>,
}

/// One chapter translation with everything needed to render it.
#[derive(Debug, Clone)]
pub struct LocalizedChapter {
    pub chapter_translation: ChapterTranslation,
    pub comic_translation: ComicTranslation,
    pub pages: Vec<PageTranslation>,
}

#[derive(Debug, Clone)]
pub struct ChapterGraph {
    pub comic: Comic,
    pub chapter: Chapter,
    pub pages: Vec<Page>,
    pub translations: Vec<LocalizedChapter>,
}
