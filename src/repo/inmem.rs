//! Single-process store. All tables sit behind one `RwLock`; every write
//! validates and mutates while holding the write guard, so a rejected write
//! leaves no trace and concurrent writers are serialized.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::*;
use crate::graph::*;
use crate::validation::{self, duplicate, Validate};

#[derive(Default, Serialize, Deserialize)]
struct State {
    languages: BTreeMap<String, Language>,
    profiles: BTreeMap<Id, UserProfile>,
    authors: BTreeMap<Id, Author>,
    author_translations: BTreeMap<Id, AuthorTranslation>,
    comics: BTreeMap<Id, Comic>,
    comic_translations: BTreeMap<Id, ComicTranslation>,
    chapters: BTreeMap<Id, Chapter>,
    chapter_translations: BTreeMap<Id, ChapterTranslation>,
    pages: BTreeMap<Id, Page>,
    page_translations: BTreeMap<Id, PageTranslation>,
    posts: BTreeMap<Id, Post>,
    post_media: BTreeMap<Id, PostMedia>,
    likes: BTreeSet<(Id, Id)>, // (post, profile)
    next_id: Id,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn page_count(&self, chapter_id: Id) -> usize {
        self.pages.values().filter(|p| p.chapter_id == chapter_id).count()
    }

    fn page_translation_count(&self, chapter_translation_id: Id) -> usize {
        self.page_translations.values().filter(|p| p.chapter_translation_id == chapter_translation_id).count()
    }

    fn post_view(&self, post: &Post) -> PostView {
        PostView {
            post: post.clone(),
            media: self.post_media.values().filter(|m| m.post_id == post.id).cloned().collect(),
        }
    }

    /// Posts newest first.
    fn post_views<'a>(&self, posts: impl Iterator<Item = &'a Post>, limit: usize) -> Vec<PostView> {
        let mut v: Vec<&Post> = posts.collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        v.into_iter().take(limit).map(|p| self.post_view(p)).collect()
    }

    /// Post ids reachable from `roots` through replies, roots included.
    fn post_subtree(&self, roots: Vec<Id>) -> BTreeSet<Id> {
        let mut seen: BTreeSet<Id> = BTreeSet::new();
        let mut stack = roots;
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            stack.extend(self.posts.values().filter(|p| p.reply_to == Some(id)).map(|p| p.id));
        }
        seen
    }

    fn remove_posts(&mut self, ids: &BTreeSet<Id>) {
        self.posts.retain(|id, _| !ids.contains(id));
        self.post_media.retain(|_, m| !ids.contains(&m.post_id));
        self.likes.retain(|(post, _)| !ids.contains(post));
    }

    fn refresh_like_count(&mut self, post_id: Id) -> RepoResult<Post> {
        let count = self.likes.iter().filter(|(p, _)| *p == post_id).count() as i64;
        let post = self.posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
        post.like_count = count;
        Ok(post.clone())
    }
}

#[derive(Clone)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl InMemRepo {
    /// Volatile store, nothing touches disk.
    pub fn new() -> Self {
        Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
    }

    /// Store backed by a JSON snapshot that is rewritten after every write.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = Self::load_state_from(&path);
        Self { state: Arc::new(RwLock::new(state)), snapshot_path: Some(Arc::new(path)) }
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    info!("loaded snapshot '{}'", path.display());
                    s
                }
                Err(e) => {
                    warn!("failed to parse snapshot '{}': {e}; starting empty", path.display());
                    State::default()
                }
            },
            Err(e) => {
                info!("no snapshot at '{}': {e}; starting empty", path.display());
                State::default()
            }
        }
    }

    fn persist(&self) {
        let Some(path) = self.snapshot_path.as_ref() else { return };
        let bytes = match self.state.read() {
            Ok(s) => serde_json::to_vec_pretty(&*s),
            Err(_) => return,
        };
        match bytes {
            Ok(bytes) => {
                if let Some(dir) = path.parent() {
                    if let Err(e) = std::fs::create_dir_all(dir) {
                        warn!("failed to create snapshot dir '{}': {e}", dir.display());
                        return;
                    }
                }
                if let Err(e) = std::fs::write(path.as_path(), bytes) {
                    warn!("failed to write snapshot '{}': {e}", path.display());
                }
            }
            Err(e) => warn!("failed to serialize snapshot: {e}"),
        }
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
    }

    /// Runs `f` under the write lock and persists only when it succeeds.
    fn mutate<T>(&self, f: impl FnOnce(&mut State) -> RepoResult<T>) -> RepoResult<T> {
        let out = {
            let mut s = self.write()?;
            f(&mut *s)?
        };
        self.persist();
        Ok(out)
    }
}

impl Default for InMemRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageRepo for InMemRepo {
    async fn list_languages(&self) -> RepoResult<Vec<Language>> {
        Ok(self.read()?.languages.values().cloned().collect())
    }

    async fn get_language(&self, code: &str) -> RepoResult<Option<Language>> {
        Ok(self.read()?.languages.get(code).cloned())
    }

    async fn upsert_language(&self, language: Language) -> RepoResult<Language> {
        language.validate()?;
        self.mutate(|s| {
            s.languages.insert(language.code.clone(), language.clone());
            Ok(language)
        })
    }
}

#[async_trait]
impl ProfileRepo for InMemRepo {
    async fn register_profile(&self, user_id: &str, new: NewProfile) -> RepoResult<UserProfile> {
        new.validate()?;
        self.mutate(|s| {
            if s.profiles.values().any(|p| p.user_id == user_id) {
                return Err(RepoError::Conflict(duplicate("user_id")));
            }
            let id = s.next_id();
            let profile = UserProfile {
                id,
                user_id: user_id.to_string(),
                name: new.name,
                email_confirmed: false,
                avatar_hash: None,
                bio: new.bio,
                bio_writing_mode: new.bio_writing_mode,
            };
            s.profiles.insert(id, profile.clone());
            Ok(profile)
        })
    }

    async fn get_profile(&self, id: Id) -> RepoResult<UserProfile> {
        self.read()?.profiles.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn find_profile_by_user(&self, user_id: &str) -> RepoResult<UserProfile> {
        self.read()?
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl AuthorRepo for InMemRepo {
    async fn create_author(&self, new: NewAuthor) -> RepoResult<Author> {
        new.validate()?;
        self.mutate(|s| {
            let id = s.next_id();
            let author = Author { id, pen_name: new.pen_name, default_language: new.default_language };
            s.authors.insert(id, author.clone());
            Ok(author)
        })
    }

    async fn get_author(&self, id: Id) -> RepoResult<Author> {
        self.read()?.authors.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_author_translation(&self, new: NewAuthorTranslation) -> RepoResult<AuthorTranslation> {
        new.validate()?;
        self.mutate(|s| {
            let author = s.authors.get(&new.author_id).ok_or(RepoError::NotFound)?;
            validation::check_translation_language(&new.language, &author.default_language)?;
            if s
                .author_translations
                .values()
                .any(|t| t.author_id == new.author_id && t.language == new.language)
            {
                return Err(RepoError::Conflict(duplicate("language")));
            }
            let id = s.next_id();
            let t = AuthorTranslation { id, author_id: new.author_id, language: new.language, pen_name: new.pen_name };
            s.author_translations.insert(id, t.clone());
            Ok(t)
        })
    }

    async fn delete_author(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.authors.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            if s.comics.values().any(|c| c.author_ids.contains(&id)) {
                return Err(RepoError::Protected("author is credited on a comic".into()));
            }
            if s.author_translations.values().any(|t| t.author_id == id) {
                return Err(RepoError::Protected("author has translations".into()));
            }
            s.authors.remove(&id);
            Ok(())
        })
    }
}

#[async_trait]
impl ComicRepo for InMemRepo {
    async fn create_comic(&self, publisher_id: Id, new: NewComic) -> RepoResult<Comic> {
        new.validate()?;
        self.mutate(|s| {
            if !s.profiles.contains_key(&publisher_id) {
                return Err(RepoError::NotFound);
            }
            let mut author_ids = new.author_ids;
            author_ids.sort_unstable();
            author_ids.dedup();
            if author_ids.iter().any(|a| !s.authors.contains_key(a)) {
                return Err(RepoError::NotFound);
            }
            let mut genres = new.genres;
            genres.sort_by_key(|g| *g as u8);
            genres.dedup();
            let now = Utc::now();
            let id = s.next_id();
            let comic = Comic {
                id,
                title: new.title,
                summary: new.summary,
                default_language: new.default_language,
                status: new.status,
                schedule: new.schedule,
                publisher_id,
                author_ids,
                genres,
                vertical_cover_hash: new.vertical_cover_hash,
                published_date: now.date_naive(),
                created_at: now,
            };
            s.comics.insert(id, comic.clone());
            Ok(comic)
        })
    }

    async fn get_comic(&self, id: Id) -> RepoResult<Comic> {
        self.read()?.comics.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_comic_translation(&self, new: NewComicTranslation) -> RepoResult<ComicTranslation> {
        new.validate()?;
        self.mutate(|s| {
            let comic = s.comics.get(&new.comic_id).ok_or(RepoError::NotFound)?;
            validation::check_translation_language(&new.language, &comic.default_language)?;
            if s
                .comic_translations
                .values()
                .any(|t| t.comic_id == new.comic_id && t.language == new.language)
            {
                return Err(RepoError::Conflict(duplicate("language")));
            }
            let id = s.next_id();
            let t = ComicTranslation {
                id,
                comic_id: new.comic_id,
                language: new.language,
                title: new.title,
                summary: new.summary,
            };
            s.comic_translations.insert(id, t.clone());
            Ok(t)
        })
    }

    async fn find_comic_translation(&self, comic_id: Id, language: &str) -> RepoResult<ComicTranslation> {
        self.read()?
            .comic_translations
            .values()
            .filter(|t| t.comic_id == comic_id && t.language == language)
            .min_by_key(|t| t.id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn load_comic_graph(&self, id: Id) -> RepoResult<ComicGraph> {
        let s = self.read()?;
        let comic = s.comics.get(&id).cloned().ok_or(RepoError::NotFound)?;
        let authors = comic
            .author_ids
            .iter()
            .filter_map(|a| s.authors.get(a))
            .map(|author| AuthorNode {
                author: author.clone(),
                translations: s.author_translations.values().filter(|t| t.author_id == author.id).cloned().collect(),
            })
            .collect();
        let chapters = s
            .chapters
            .values()
            .filter(|c| c.comic_id == id)
            .map(|c| ChapterNode { chapter: c.clone(), page_count: s.page_count(c.id) })
            .collect();
        let translations = s
            .comic_translations
            .values()
            .filter(|t| t.comic_id == id)
            .map(|t| ComicTranslationNode {
                translation: t.clone(),
                chapters: s
                    .chapter_translations
                    .values()
                    .filter(|ct| ct.comic_translation_id == t.id)
                    .filter_map(|ct| {
                        s.chapters.get(&ct.chapter_id).map(|chapter| ChapterTranslationNode {
                            chapter_translation: ct.clone(),
                            chapter: chapter.clone(),
                            page_count: s.page_translation_count(ct.id),
                        })
                    })
                    .collect(),
            })
            .collect();
        Ok(ComicGraph { comic, authors, chapters, translations })
    }

    async fn delete_comic(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.comics.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            if s.chapters.values().any(|c| c.comic_id == id) {
                return Err(RepoError::Protected("comic has chapters".into()));
            }
            if s.comic_translations.values().any(|t| t.comic_id == id) {
                return Err(RepoError::Protected("comic has translations".into()));
            }
            let roots = s.posts.values().filter(|p| p.about_comic == Some(id)).map(|p| p.id).collect();
            let doomed = s.post_subtree(roots);
            s.remove_posts(&doomed);
            s.comics.remove(&id);
            Ok(())
        })
    }

    async fn delete_comic_translation(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.comic_translations.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            if s.chapter_translations.values().any(|ct| ct.comic_translation_id == id) {
                return Err(RepoError::Protected("comic translation has chapter translations".into()));
            }
            s.comic_translations.remove(&id);
            Ok(())
        })
    }
}

#[async_trait]
impl ChapterRepo for InMemRepo {
    async fn create_chapter(&self, new: NewChapter) -> RepoResult<Chapter> {
        new.validate()?;
        self.mutate(|s| {
            if !s.comics.contains_key(&new.comic_id) {
                return Err(RepoError::NotFound);
            }
            // storage-level check constraint
            validation::check_chapter_numbering(new.number, new.extra)?;
            let siblings: Vec<&Chapter> = s.chapters.values().filter(|c| c.comic_id == new.comic_id).collect();
            if new.number.is_some() && siblings.iter().any(|c| c.number == new.number) {
                return Err(RepoError::Conflict(duplicate("number")));
            }
            if siblings.iter().any(|c| c.counter == new.counter) {
                return Err(RepoError::Conflict(duplicate("counter")));
            }
            let id = s.next_id();
            let chapter = Chapter {
                id,
                comic_id: new.comic_id,
                title: new.title,
                number: new.number,
                counter: new.counter,
                extra: new.extra,
                cover_hash: new.cover_hash,
                published_date: Utc::now().date_naive(),
            };
            s.chapters.insert(id, chapter.clone());
            Ok(chapter)
        })
    }

    async fn get_chapter(&self, id: Id) -> RepoResult<Chapter> {
        self.read()?.chapters.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_chapter_translation(&self, new: NewChapterTranslation) -> RepoResult<ChapterTranslation> {
        new.validate()?;
        self.mutate(|s| {
            let chapter = s.chapters.get(&new.chapter_id).ok_or(RepoError::NotFound)?;
            let comic_translation = s.comic_translations.get(&new.comic_translation_id).ok_or(RepoError::NotFound)?;
            validation::check_chapter_translation_comic(chapter.comic_id, comic_translation.comic_id)?;
            if s
                .chapter_translations
                .values()
                .any(|ct| ct.chapter_id == new.chapter_id && ct.comic_translation_id == new.comic_translation_id)
            {
                return Err(RepoError::Conflict(duplicate("chapter_id")));
            }
            let id = s.next_id();
            let ct = ChapterTranslation {
                id,
                chapter_id: new.chapter_id,
                comic_translation_id: new.comic_translation_id,
                title: new.title,
                published_date: Utc::now().date_naive(),
            };
            s.chapter_translations.insert(id, ct.clone());
            Ok(ct)
        })
    }

    async fn load_chapter_graph(&self, id: Id) -> RepoResult<ChapterGraph> {
        let s = self.read()?;
        let chapter = s.chapters.get(&id).cloned().ok_or(RepoError::NotFound)?;
        let comic = s.comics.get(&chapter.comic_id).cloned().ok_or(RepoError::NotFound)?;
        let pages = s.pages.values().filter(|p| p.chapter_id == id).cloned().collect();
        let translations = s
            .chapter_translations
            .values()
            .filter(|ct| ct.chapter_id == id)
            .filter_map(|ct| {
                s.comic_translations.get(&ct.comic_translation_id).map(|t| LocalizedChapter {
                    chapter_translation: ct.clone(),
                    comic_translation: t.clone(),
                    pages: s
                        .page_translations
                        .values()
                        .filter(|p| p.chapter_translation_id == ct.id)
                        .cloned()
                        .collect(),
                })
            })
            .collect();
        Ok(ChapterGraph { comic, chapter, pages, translations })
    }

    async fn recent_chapters(&self, limit: usize) -> RepoResult<Vec<(Comic, Chapter)>> {
        let s = self.read()?;
        let mut chapters: Vec<&Chapter> = s.chapters.values().filter(|c| s.page_count(c.id) > 0).collect();
        chapters.sort_by(|a, b| b.published_date.cmp(&a.published_date).then(b.id.cmp(&a.id)));
        Ok(chapters
            .into_iter()
            .filter_map(|c| s.comics.get(&c.comic_id).map(|comic| (comic.clone(), c.clone())))
            .take(limit)
            .collect())
    }

    async fn delete_chapter(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.chapters.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            if s.pages.values().any(|p| p.chapter_id == id) {
                return Err(RepoError::Protected("chapter has pages".into()));
            }
            if s.chapter_translations.values().any(|ct| ct.chapter_id == id) {
                return Err(RepoError::Protected("chapter has translations".into()));
            }
            let roots = s.posts.values().filter(|p| p.about_chapter == Some(id)).map(|p| p.id).collect();
            let doomed = s.post_subtree(roots);
            s.remove_posts(&doomed);
            s.chapters.remove(&id);
            Ok(())
        })
    }

    async fn delete_chapter_translation(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.chapter_translations.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            if s.page_translations.values().any(|p| p.chapter_translation_id == id) {
                return Err(RepoError::Protected("chapter translation has pages".into()));
            }
            s.chapter_translations.remove(&id);
            Ok(())
        })
    }
}

#[async_trait]
impl PageRepo for InMemRepo {
    async fn create_page(&self, new: NewPage) -> RepoResult<Page> {
        new.validate()?;
        self.mutate(|s| {
            if !s.chapters.contains_key(&new.chapter_id) {
                return Err(RepoError::NotFound);
            }
            validation::check_page_number(new.number, s.page_count(new.chapter_id))?;
            if s.pages.values().any(|p| p.chapter_id == new.chapter_id && p.number == new.number) {
                return Err(RepoError::Conflict(duplicate("number")));
            }
            let id = s.next_id();
            let page = Page { id, chapter_id: new.chapter_id, number: new.number, image_hash: new.image_hash, mime: new.mime };
            s.pages.insert(id, page.clone());
            Ok(page)
        })
    }

    async fn update_page_number(&self, id: Id, number: i32) -> RepoResult<Page> {
        self.mutate(|s| {
            let chapter_id = s.pages.get(&id).ok_or(RepoError::NotFound)?.chapter_id;
            let others: Vec<&Page> = s.pages.values().filter(|p| p.chapter_id == chapter_id && p.id != id).collect();
            validation::check_page_number(number, others.len())?;
            if others.iter().any(|p| p.number == number) {
                return Err(RepoError::Conflict(duplicate("number")));
            }
            let page = s.pages.get_mut(&id).ok_or(RepoError::NotFound)?;
            page.number = number;
            Ok(page.clone())
        })
    }

    async fn delete_page(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| s.pages.remove(&id).map(|_| ()).ok_or(RepoError::NotFound))
    }

    async fn create_page_translation(&self, new: NewPageTranslation) -> RepoResult<PageTranslation> {
        new.validate()?;
        self.mutate(|s| {
            if !s.chapter_translations.contains_key(&new.chapter_translation_id) {
                return Err(RepoError::NotFound);
            }
            validation::check_page_number(new.number, s.page_translation_count(new.chapter_translation_id))?;
            if s
                .page_translations
                .values()
                .any(|p| p.chapter_translation_id == new.chapter_translation_id && p.number == new.number)
            {
                return Err(RepoError::Conflict(duplicate("number")));
            }
            let id = s.next_id();
            let page = PageTranslation {
                id,
                chapter_translation_id: new.chapter_translation_id,
                number: new.number,
                image_hash: new.image_hash,
                mime: new.mime,
            };
            s.page_translations.insert(id, page.clone());
            Ok(page)
        })
    }

    async fn update_page_translation_number(&self, id: Id, number: i32) -> RepoResult<PageTranslation> {
        self.mutate(|s| {
            let parent = s.page_translations.get(&id).ok_or(RepoError::NotFound)?.chapter_translation_id;
            let others: Vec<&PageTranslation> =
                s.page_translations.values().filter(|p| p.chapter_translation_id == parent && p.id != id).collect();
            validation::check_page_number(number, others.len())?;
            if others.iter().any(|p| p.number == number) {
                return Err(RepoError::Conflict(duplicate("number")));
            }
            let page = s.page_translations.get_mut(&id).ok_or(RepoError::NotFound)?;
            page.number = number;
            Ok(page.clone())
        })
    }

    async fn delete_page_translation(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| s.page_translations.remove(&id).map(|_| ()).ok_or(RepoError::NotFound))
    }
}

#[async_trait]
impl PostRepo for InMemRepo {
    async fn create_post(&self, new: NewPost) -> RepoResult<PostView> {
        new.validate()?;
        self.mutate(|s| {
            if !s.profiles.contains_key(&new.profile_id) {
                return Err(RepoError::NotFound);
            }
            let missing = new.reply_to.is_some_and(|id| !s.posts.contains_key(&id))
                || new.about_comic.is_some_and(|id| !s.comics.contains_key(&id))
                || new.about_chapter.is_some_and(|id| !s.chapters.contains_key(&id));
            if missing {
                return Err(RepoError::NotFound);
            }
            let now = Utc::now();
            let id = s.next_id();
            let post = Post {
                id,
                profile_id: new.profile_id,
                text_content: new.text_content,
                writing_mode: new.writing_mode,
                like_count: 0,
                reply_to: new.reply_to,
                about_comic: new.about_comic,
                about_chapter: new.about_chapter,
                created_at: now,
                last_modified: now,
            };
            s.posts.insert(id, post.clone());
            let mut media = Vec::with_capacity(new.media.len());
            for m in new.media {
                let media_id = s.next_id();
                let row = PostMedia { id: media_id, post_id: id, hash: m.hash, mime: m.mime, alt_text: m.alt_text };
                s.post_media.insert(media_id, row.clone());
                media.push(row);
            }
            Ok(PostView { post, media })
        })
    }

    async fn get_post(&self, id: Id) -> RepoResult<PostView> {
        let s = self.read()?;
        let post = s.posts.get(&id).ok_or(RepoError::NotFound)?;
        Ok(s.post_view(post))
    }

    async fn list_replies(&self, post_id: Id) -> RepoResult<Vec<PostView>> {
        let s = self.read()?;
        if !s.posts.contains_key(&post_id) {
            return Err(RepoError::NotFound);
        }
        Ok(s.post_views(s.posts.values().filter(|p| p.reply_to == Some(post_id)), usize::MAX))
    }

    async fn recent_posts(&self, limit: usize) -> RepoResult<Vec<PostView>> {
        let s = self.read()?;
        Ok(s.post_views(s.posts.values(), limit))
    }

    async fn list_profile_posts(&self, profile_id: Id, limit: usize) -> RepoResult<Vec<PostView>> {
        let s = self.read()?;
        if !s.profiles.contains_key(&profile_id) {
            return Err(RepoError::NotFound);
        }
        Ok(s.post_views(s.posts.values().filter(|p| p.profile_id == profile_id), limit))
    }

    async fn like_post(&self, post_id: Id, profile_id: Id) -> RepoResult<Post> {
        self.mutate(|s| {
            if !s.posts.contains_key(&post_id) || !s.profiles.contains_key(&profile_id) {
                return Err(RepoError::NotFound);
            }
            s.likes.insert((post_id, profile_id));
            s.refresh_like_count(post_id)
        })
    }

    async fn unlike_post(&self, post_id: Id, profile_id: Id) -> RepoResult<Post> {
        self.mutate(|s| {
            if !s.posts.contains_key(&post_id) {
                return Err(RepoError::NotFound);
            }
            s.likes.remove(&(post_id, profile_id));
            s.refresh_like_count(post_id)
        })
    }

    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.posts.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            let doomed = s.post_subtree(vec![id]);
            s.remove_posts(&doomed);
            Ok(())
        })
    }
}
