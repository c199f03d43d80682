//! Presentability of content nodes.
//!
//! A node is shown to readers only when it transitively reaches at least one
//! page. Nothing here is cached: every call looks at the snapshot it is given.

use crate::graph::*;

pub trait Validity {
    fn is_valid(&self) -> bool;
}

impl Validity for ChapterNode {
    fn is_valid(&self) -> bool {
        self.page_count > 0
    }
}

impl Validity for ChapterTranslationNode {
    fn is_valid(&self) -> bool {
        self.page_count > 0
    }
}

impl Validity for ComicTranslationNode {
    fn is_valid(&self) -> bool {
        self.chapters.iter().any(Validity::is_valid)
    }
}

impl Validity for ComicGraph {
    fn is_valid(&self) -> bool {
        self.chapters.iter().any(Validity::is_valid)
    }
}

impl Validity for LocalizedChapter {
    fn is_valid(&self) -> bool {
        !self.pages.is_empty()
    }
}

impl Validity for ChapterGraph {
    fn is_valid(&self) -> bool {
        !self.pages.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn comic_valid_iff_some_chapter_has_a_page() {
        assert!(!comic_graph(&[]).is_valid());
        assert!(!comic_graph(&[0]).is_valid());
        assert!(!comic_graph(&[0, 0, 0]).is_valid());
        assert!(comic_graph(&[0, 1]).is_valid());
        assert!(comic_graph(&[3]).is_valid());
    }

    #[test]
    fn comic_translation_valid_iff_some_chapter_translation_has_a_page() {
        let ch = chapter(10, 1, 1);
        let mut node = ComicTranslationNode { translation: comic_translation(5, 1, "fr"), chapters: vec![] };
        assert!(!node.is_valid());
        node.chapters.push(chapter_translation_node(20, &ch, 5, 0));
        assert!(!node.is_valid());
        node.chapters.push(chapter_translation_node(21, &ch, 5, 2));
        assert!(node.is_valid());
    }

    #[test]
    fn translated_comic_validity_is_independent_of_default_content() {
        // default chapters empty, translation populated: the comic itself is still hidden
        let mut g = comic_graph(&[0]);
        let ch = g.chapters[0].chapter.clone();
        g.translations.push(ComicTranslationNode {
            translation: comic_translation(5, 1, "fr"),
            chapters: vec![chapter_translation_node(20, &ch, 5, 4)],
        });
        assert!(!g.is_valid());
        assert!(g.translations[0].is_valid());
    }
}
