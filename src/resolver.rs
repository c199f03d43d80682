//! Picks which language variant of a comic or chapter a request is served.

use tracing::debug;

use crate::graph::*;
use crate::models::Id;
use crate::validity::Validity;

#[derive(Debug)]
pub enum ComicResolution<'a> {
    NotFound,
    Default(&'a ComicGraph),
    Translated { graph: &'a ComicGraph, translation: &'a ComicTranslationNode },
    /// The comic exists but has nothing presentable in the requested language.
    NotAvailable(&'a ComicGraph),
}

#[derive(Debug)]
pub enum ChapterResolution<'a> {
    NotFound,
    Default(&'a ChapterGraph),
    Translated { graph: &'a ChapterGraph, localized: &'a LocalizedChapter },
    NotAvailable(&'a ChapterGraph),
    /// Canonical endpoint asked for a non-default language.
    RedirectToTranslation { chapter_id: Id, language: String },
    /// Translation endpoint asked for the default language.
    RedirectToCanonical { chapter_id: Id },
}

/// Lowest-id valid comic translation in `language`.
pub fn find_comic_translation<'a>(graph: &'a ComicGraph, language: &str) -> Option<&'a ComicTranslationNode> {
    graph
        .translations
        .iter()
        .filter(|t| t.translation.language == language && t.is_valid())
        .min_by_key(|t| t.translation.id)
}

/// Lowest-id valid chapter translation whose comic translation is in `language`.
pub fn find_chapter_translation<'a>(graph: &'a ChapterGraph, language: &str) -> Option<&'a LocalizedChapter> {
    graph
        .translations
        .iter()
        .filter(|t| t.comic_translation.language == language && t.is_valid())
        .min_by_key(|t| t.chapter_translation.id)
}

pub fn resolve_comic<'a>(graph: Option<&'a ComicGraph>, language: &str) -> ComicResolution<'a> {
    let Some(graph) = graph else { return ComicResolution::NotFound };
    if !graph.is_valid() {
        debug!(comic_id = graph.comic.id, "comic has no presentable chapter");
        return ComicResolution::NotFound;
    }
    if graph.comic.default_language == language {
        return ComicResolution::Default(graph);
    }
    match find_comic_translation(graph, language) {
        Some(translation) => ComicResolution::Translated { graph, translation },
        None => {
            debug!(comic_id = graph.comic.id, language, "comic not available in language");
            ComicResolution::NotAvailable(graph)
        }
    }
}

/// Canonical chapter endpoint: serves the default language, sends every other
/// language to the translation endpoint.
pub fn resolve_chapter<'a>(graph: Option<&'a ChapterGraph>, language: &str) -> ChapterResolution<'a> {
    let Some(graph) = graph else { return ChapterResolution::NotFound };
    if !graph.is_valid() {
        return ChapterResolution::NotFound;
    }
    if graph.comic.default_language == language {
        ChapterResolution::Default(graph)
    } else {
        ChapterResolution::RedirectToTranslation { chapter_id: graph.chapter.id, language: language.to_string() }
    }
}

/// Translation endpoint for `(chapter, language)`.
pub fn resolve_chapter_translation<'a>(graph: Option<&'a ChapterGraph>, language: &str) -> ChapterResolution<'a> {
    let Some(graph) = graph else { return ChapterResolution::NotFound };
    if !graph.is_valid() {
        return ChapterResolution::NotFound;
    }
    if graph.comic.default_language == language {
        return ChapterResolution::RedirectToCanonical { chapter_id: graph.chapter.id };
    }
    match find_chapter_translation(graph, language) {
        Some(localized) => ChapterResolution::Translated { graph, localized },
        None => {
            debug!(chapter_id = graph.chapter.id, language, "chapter not available in language");
            ChapterResolution::NotAvailable(graph)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use crate::validity::fixtures::*;

    fn page(id: Id, chapter_id: Id, number: i32) -> Page {
        Page { id, chapter_id, number, image_hash: format!("h{id}"), mime: "image/png".into() }
    }

    fn page_translation(id: Id, chapter_translation_id: Id, number: i32) -> PageTranslation {
        PageTranslation { id, chapter_translation_id, number, image_hash: format!("t{id}"), mime: "image/png".into() }
    }

    fn localized(ct_id: Id, chapter: &Chapter, comic_translation: ComicTranslation, pages: usize) -> LocalizedChapter {
        LocalizedChapter {
            chapter_translation: ChapterTranslation {
                id: ct_id,
                chapter_id: chapter.id,
                comic_translation_id: comic_translation.id,
                title: "t".into(),
                published_date: date(),
            },
            comic_translation,
            pages: (0..pages).map(|i| page_translation(ct_id * 100 + i as Id, ct_id, i as i32 + 1)).collect(),
        }
    }

    fn chapter_graph(pages: usize) -> ChapterGraph {
        let ch = chapter(10, 1, 1);
        ChapterGraph {
            comic: comic(1, "en"),
            pages: (0..pages).map(|i| page(i as Id + 1, ch.id, i as i32 + 1)).collect(),
            chapter: ch,
            translations: vec![],
        }
    }

    fn with_translation(mut g: ComicGraph, id: Id, language: &str, pages: usize) -> ComicGraph {
        let ch = g.chapters[0].chapter.clone();
        g.translations.push(ComicTranslationNode {
            translation: comic_translation(id, g.comic.id, language),
            chapters: vec![chapter_translation_node(id * 10, &ch, id, pages)],
        });
        g
    }

    #[test]
    fn missing_comic_is_not_found() {
        assert!(matches!(resolve_comic(None, "en"), ComicResolution::NotFound));
    }

    #[test]
    fn comic_without_pages_is_not_found() {
        let g = comic_graph(&[0]);
        assert!(matches!(resolve_comic(Some(&g), "en"), ComicResolution::NotFound));
    }

    #[test]
    fn default_language_serves_default_comic() {
        let g = comic_graph(&[1]);
        assert!(matches!(resolve_comic(Some(&g), "en"), ComicResolution::Default(_)));
    }

    #[test]
    fn missing_language_is_not_available_rather_than_not_found() {
        let g = comic_graph(&[1]);
        assert!(matches!(resolve_comic(Some(&g), "fr"), ComicResolution::NotAvailable(_)));
    }

    #[test]
    fn translation_without_pages_is_not_available() {
        let g = with_translation(comic_graph(&[1]), 5, "fr", 0);
        assert!(matches!(resolve_comic(Some(&g), "fr"), ComicResolution::NotAvailable(_)));
    }

    #[test]
    fn valid_translation_is_served() {
        let g = with_translation(comic_graph(&[1]), 5, "fr", 2);
        match resolve_comic(Some(&g), "fr") {
            ComicResolution::Translated { translation, .. } => assert_eq!(translation.translation.id, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tie_break_picks_lowest_id_regardless_of_order() {
        let g = with_translation(comic_graph(&[1]), 9, "fr", 1);
        let g = with_translation(g, 4, "fr", 1);
        let g = with_translation(g, 7, "fr", 1);
        assert_eq!(find_comic_translation(&g, "fr").unwrap().translation.id, 4);
    }

    #[test]
    fn tie_break_skips_invalid_candidates() {
        let g = with_translation(comic_graph(&[1]), 2, "fr", 0);
        let g = with_translation(g, 3, "fr", 1);
        assert_eq!(find_comic_translation(&g, "fr").unwrap().translation.id, 3);
    }

    #[test]
    fn chapter_canonical_endpoint() {
        assert!(matches!(resolve_chapter(None, "en"), ChapterResolution::NotFound));
        let empty = chapter_graph(0);
        assert!(matches!(resolve_chapter(Some(&empty), "en"), ChapterResolution::NotFound));
        let g = chapter_graph(2);
        assert!(matches!(resolve_chapter(Some(&g), "en"), ChapterResolution::Default(_)));
        match resolve_chapter(Some(&g), "vi") {
            ChapterResolution::RedirectToTranslation { chapter_id, language } => {
                assert_eq!(chapter_id, 10);
                assert_eq!(language, "vi");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn chapter_translation_endpoint_canonicalizes_default_language() {
        let g = chapter_graph(1);
        assert!(matches!(
            resolve_chapter_translation(Some(&g), "en"),
            ChapterResolution::RedirectToCanonical { chapter_id: 10 }
        ));
    }

    #[test]
    fn chapter_translation_endpoint_picks_valid_lowest_id() {
        let mut g = chapter_graph(1);
        let ch = g.chapter.clone();
        g.translations.push(localized(8, &ch, comic_translation(3, 1, "vi"), 1));
        g.translations.push(localized(6, &ch, comic_translation(2, 1, "vi"), 0));
        g.translations.push(localized(7, &ch, comic_translation(4, 1, "vi"), 2));
        match resolve_chapter_translation(Some(&g), "vi") {
            ChapterResolution::Translated { localized, .. } => assert_eq!(localized.chapter_translation.id, 7),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(resolve_chapter_translation(Some(&g), "ja"), ChapterResolution::NotAvailable(_)));
    }
}
