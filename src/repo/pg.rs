//! Postgres store. Uniqueness, chapter numbering and delete protection are
//! enforced by the schema in `migrations/`; the cross-row guards run inside
//! a transaction that locks the parent row first.

use std::collections::HashMap;

use sqlx::{PgConnection, Pool, Postgres, Transaction};

use super::*;
use crate::graph::*;
use crate::validation::{self, duplicate, Validate, Violation};

const COMIC_COLUMNS: &str = r#"
    c.id, c.title, c.summary, c.default_language, c.status, c.schedule, c.publisher_id,
    ARRAY(SELECT ca.author_id FROM comic_authors ca WHERE ca.comic_id = c.id ORDER BY ca.author_id) AS author_ids,
    c.genres, c.vertical_cover_hash, c.published_date, c.created_at
"#;

const CHAPTER_COLUMNS: &str = "ch.id, ch.comic_id, ch.title, ch.number, ch.counter, ch.extra, ch.cover_hash, ch.published_date";

const POST_COLUMNS: &str = r#"
    p.id, p.profile_id, p.text_content, p.writing_mode,
    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
    p.reply_to, p.about_comic, p.about_chapter, p.created_at, p.last_modified
"#;

#[derive(sqlx::FromRow)]
struct CountedChapter {
    #[sqlx(flatten)]
    chapter: Chapter,
    page_count: i64,
}

#[derive(sqlx::FromRow)]
struct CountedChapterTranslation {
    #[sqlx(flatten)]
    chapter_translation: ChapterTranslation,
    page_count: i64,
}

/// Schema constraint name to the payload field it guards.
fn constraint_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("unique_comic_translation_language") | Some("unique_author_language") => "language",
        Some("unique_chapter_counter") => "counter",
        Some("unique_chapter_per_comic_translation") => "chapter_id",
        Some("unique_profile_user") => "user_id",
        Some("unique_chapter_number") | Some("unique_page_number") | Some("unique_page_translation_number") => "number",
        _ => validation::NON_FIELD,
    }
}

fn sqlstate(e: &sqlx::Error) -> Option<(String, Option<String>)> {
    match e {
        sqlx::Error::Database(db) => {
            let constraint = db.constraint().map(str::to_string);
            db.code().map(|c| (c.into_owned(), constraint))
        }
        _ => None,
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return RepoError::NotFound;
        }
        match sqlstate(&e) {
            Some((code, constraint)) if code == "23505" => {
                RepoError::Conflict(duplicate(constraint_field(constraint.as_deref())))
            }
            Some((code, constraint)) if code == "23514" => {
                let (field, violation) = match constraint.as_deref() {
                    Some("chapter_numbering") => ("number", Violation::ChapterNumbering),
                    Some(c) if c.contains("counter") => ("counter", Violation::CounterTooSmall),
                    Some(c) if c.contains("number") => ("number", Violation::PageNumberTooSmall),
                    _ => (validation::NON_FIELD, Violation::Blank),
                };
                RepoError::Validation(validation::FieldError::new(field, violation).into())
            }
            // a referenced row is missing on insert
            Some((code, _)) if code == "23503" => RepoError::NotFound,
            _ => {
                log::error!("database error: {e}");
                RepoError::Internal(e.to_string())
            }
        }
    }
}

/// On delete a foreign-key violation means children still exist.
fn delete_err(e: sqlx::Error) -> RepoError {
    match sqlstate(&e) {
        Some((code, constraint)) if code == "23503" => {
            RepoError::Protected(format!("referenced by {}", constraint.unwrap_or_else(|| "another row".into())))
        }
        _ => e.into(),
    }
}

#[derive(Clone)]
pub struct PgRepo {
    pool: Pool<Postgres>,
}

impl PgRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn snapshot(&self) -> RepoResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY").execute(&mut *tx).await?;
        Ok(tx)
    }

    async fn delete_by_id(&self, table: &str, id: Id) -> RepoResult<()> {
        let res = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(delete_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn fetch_comic(conn: &mut PgConnection, id: Id) -> RepoResult<Comic> {
        Ok(sqlx::query_as::<_, Comic>(&format!("SELECT {COMIC_COLUMNS} FROM comics c WHERE c.id = $1"))
            .bind(id)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn with_media(&self, posts: Vec<Post>) -> RepoResult<Vec<PostView>> {
        let ids: Vec<Id> = posts.iter().map(|p| p.id).collect();
        let media = sqlx::query_as::<_, PostMedia>(
            "SELECT id, post_id, hash, mime, alt_text FROM post_media WHERE post_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut by_post: HashMap<Id, Vec<PostMedia>> = HashMap::new();
        for m in media {
            by_post.entry(m.post_id).or_default().push(m);
        }
        Ok(posts
            .into_iter()
            .map(|post| PostView { media: by_post.remove(&post.id).unwrap_or_default(), post })
            .collect())
    }

    async fn fetch_post(&self, id: Id) -> RepoResult<Post> {
        Ok(sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Parent row locked for the rest of the transaction, so sibling counts
    /// stay stable until commit.
    async fn lock_row(tx: &mut Transaction<'_, Postgres>, table: &str, id: Id) -> RepoResult<()> {
        sqlx::query(&format!("SELECT id FROM {table} WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(())
    }

    async fn count_where(
        tx: &mut Transaction<'_, Postgres>,
        table: &str,
        parent_column: &str,
        parent: Id,
        exclude: Option<Id>,
    ) -> RepoResult<usize> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM {table} WHERE {parent_column} = $1 AND ($2::BIGINT IS NULL OR id <> $2)"
        ))
        .bind(parent)
        .bind(exclude)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count as usize)
    }
}

#[async_trait]
impl LanguageRepo for PgRepo {
    async fn list_languages(&self) -> RepoResult<Vec<Language>> {
        Ok(sqlx::query_as::<_, Language>("SELECT code, writing_mode FROM languages ORDER BY code")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_language(&self, code: &str) -> RepoResult<Option<Language>> {
        Ok(sqlx::query_as::<_, Language>("SELECT code, writing_mode FROM languages WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_language(&self, language: Language) -> RepoResult<Language> {
        language.validate()?;
        Ok(sqlx::query_as::<_, Language>(
            "INSERT INTO languages (code, writing_mode) VALUES ($1, $2)
             ON CONFLICT (code) DO UPDATE SET writing_mode = EXCLUDED.writing_mode
             RETURNING code, writing_mode",
        )
        .bind(&language.code)
        .bind(language.writing_mode)
        .fetch_one(&self.pool)
        .await?)
    }
}

const PROFILE_COLUMNS: &str = "id, user_id, name, email_confirmed, avatar_hash, bio, bio_writing_mode";

#[async_trait]
impl ProfileRepo for PgRepo {
    async fn register_profile(&self, user_id: &str, new: NewProfile) -> RepoResult<UserProfile> {
        new.validate()?;
        Ok(sqlx::query_as::<_, UserProfile>(&format!(
            "INSERT INTO profiles (user_id, name, bio, bio_writing_mode) VALUES ($1, $2, $3, $4) RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&new.name)
        .bind(&new.bio)
        .bind(new.bio_writing_mode)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_profile(&self, id: Id) -> RepoResult<UserProfile> {
        Ok(sqlx::query_as::<_, UserProfile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_profile_by_user(&self, user_id: &str) -> RepoResult<UserProfile> {
        Ok(sqlx::query_as::<_, UserProfile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"))
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl AuthorRepo for PgRepo {
    async fn create_author(&self, new: NewAuthor) -> RepoResult<Author> {
        new.validate()?;
        Ok(sqlx::query_as::<_, Author>(
            "INSERT INTO authors (pen_name, default_language) VALUES ($1, $2) RETURNING id, pen_name, default_language",
        )
        .bind(&new.pen_name)
        .bind(&new.default_language)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_author(&self, id: Id) -> RepoResult<Author> {
        Ok(sqlx::query_as::<_, Author>("SELECT id, pen_name, default_language FROM authors WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_author_translation(&self, new: NewAuthorTranslation) -> RepoResult<AuthorTranslation> {
        new.validate()?;
        let mut tx = self.pool.begin().await?;
        let (default_language,): (String,) = sqlx::query_as("SELECT default_language FROM authors WHERE id = $1 FOR SHARE")
            .bind(new.author_id)
            .fetch_one(&mut *tx)
            .await?;
        validation::check_translation_language(&new.language, &default_language)?;
        let rec = sqlx::query_as::<_, AuthorTranslation>(
            "INSERT INTO author_translations (author_id, language, pen_name) VALUES ($1, $2, $3)
             RETURNING id, author_id, language, pen_name",
        )
        .bind(new.author_id)
        .bind(&new.language)
        .bind(&new.pen_name)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rec)
    }

    async fn delete_author(&self, id: Id) -> RepoResult<()> {
        self.delete_by_id("authors", id).await
    }
}

#[async_trait]
impl ComicRepo for PgRepo {
    async fn create_comic(&self, publisher_id: Id, new: NewComic) -> RepoResult<Comic> {
        new.validate()?;
        let mut author_ids = new.author_ids;
        author_ids.sort_unstable();
        author_ids.dedup();
        let mut genres = new.genres;
        genres.sort_by_key(|g| *g as u8);
        genres.dedup();

        let mut tx = self.pool.begin().await?;
        let (id,): (Id,) = sqlx::query_as(
            "INSERT INTO comics (title, summary, default_language, status, schedule, publisher_id, genres, vertical_cover_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(&new.title)
        .bind(&new.summary)
        .bind(&new.default_language)
        .bind(new.status)
        .bind(new.schedule)
        .bind(publisher_id)
        .bind(&genres)
        .bind(&new.vertical_cover_hash)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("INSERT INTO comic_authors (comic_id, author_id) SELECT $1, UNNEST($2::BIGINT[])")
            .bind(id)
            .bind(&author_ids)
            .execute(&mut *tx)
            .await?;
        let comic = Self::fetch_comic(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(comic)
    }

    async fn get_comic(&self, id: Id) -> RepoResult<Comic> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_comic(&mut conn, id).await
    }

    async fn create_comic_translation(&self, new: NewComicTranslation) -> RepoResult<ComicTranslation> {
        new.validate()?;
        let mut tx = self.pool.begin().await?;
        let (default_language,): (String,) = sqlx::query_as("SELECT default_language FROM comics WHERE id = $1 FOR SHARE")
            .bind(new.comic_id)
            .fetch_one(&mut *tx)
            .await?;
        validation::check_translation_language(&new.language, &default_language)?;
        let rec = sqlx::query_as::<_, ComicTranslation>(
            "INSERT INTO comic_translations (comic_id, language, title, summary) VALUES ($1, $2, $3, $4)
             RETURNING id, comic_id, language, title, summary",
        )
        .bind(new.comic_id)
        .bind(&new.language)
        .bind(&new.title)
        .bind(&new.summary)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rec)
    }

    async fn find_comic_translation(&self, comic_id: Id, language: &str) -> RepoResult<ComicTranslation> {
        Ok(sqlx::query_as::<_, ComicTranslation>(
            "SELECT id, comic_id, language, title, summary FROM comic_translations
             WHERE comic_id = $1 AND language = $2 ORDER BY id LIMIT 1",
        )
        .bind(comic_id)
        .bind(language)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn load_comic_graph(&self, id: Id) -> RepoResult<ComicGraph> {
        let mut tx = self.snapshot().await?;
        let comic = Self::fetch_comic(&mut *tx, id).await?;

        let authors = sqlx::query_as::<_, Author>(
            "SELECT a.id, a.pen_name, a.default_language FROM authors a
             JOIN comic_authors ca ON ca.author_id = a.id WHERE ca.comic_id = $1 ORDER BY a.id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let author_ids: Vec<Id> = authors.iter().map(|a| a.id).collect();
        let author_translations = sqlx::query_as::<_, AuthorTranslation>(
            "SELECT id, author_id, language, pen_name FROM author_translations WHERE author_id = ANY($1) ORDER BY id",
        )
        .bind(&author_ids)
        .fetch_all(&mut *tx)
        .await?;

        let chapters = sqlx::query_as::<_, CountedChapter>(&format!(
            "SELECT {CHAPTER_COLUMNS}, (SELECT COUNT(*) FROM pages pg WHERE pg.chapter_id = ch.id) AS page_count
             FROM chapters ch WHERE ch.comic_id = $1 ORDER BY ch.id"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let translations = sqlx::query_as::<_, ComicTranslation>(
            "SELECT id, comic_id, language, title, summary FROM comic_translations WHERE comic_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let chapter_translations = sqlx::query_as::<_, CountedChapterTranslation>(
            "SELECT ct.id, ct.chapter_id, ct.comic_translation_id, ct.title, ct.published_date,
                    (SELECT COUNT(*) FROM page_translations pt WHERE pt.chapter_translation_id = ct.id) AS page_count
             FROM chapter_translations ct WHERE ct.comic_id = $1 ORDER BY ct.id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let by_id: HashMap<Id, &Chapter> = chapters.iter().map(|c| (c.chapter.id, &c.chapter)).collect();
        let translations = translations
            .into_iter()
            .map(|translation| ComicTranslationNode {
                chapters: chapter_translations
                    .iter()
                    .filter(|ct| ct.chapter_translation.comic_translation_id == translation.id)
                    .filter_map(|ct| {
                        by_id.get(&ct.chapter_translation.chapter_id).map(|chapter| ChapterTranslationNode {
                            chapter_translation: ct.chapter_translation.clone(),
                            chapter: (*chapter).clone(),
                            page_count: ct.page_count as usize,
                        })
                    })
                    .collect(),
                translation,
            })
            .collect();
        let authors = authors
            .into_iter()
            .map(|author| AuthorNode {
                translations: author_translations.iter().filter(|t| t.author_id == author.id).cloned().collect(),
                author,
            })
            .collect();
        let chapters = chapters
            .into_iter()
            .map(|c| ChapterNode { chapter: c.chapter, page_count: c.page_count as usize })
            .collect();
        Ok(ComicGraph { comic, authors, chapters, translations })
    }

    async fn delete_comic(&self, id: Id) -> RepoResult<()> {
        self.delete_by_id("comics", id).await
    }

    async fn delete_comic_translation(&self, id: Id) -> RepoResult<()> {
        self.delete_by_id("comic_translations", id).await
    }
}

#[async_trait]
impl ChapterRepo for PgRepo {
    async fn create_chapter(&self, new: NewChapter) -> RepoResult<Chapter> {
        new.validate()?;
        Ok(sqlx::query_as::<_, Chapter>(&format!(
            "INSERT INTO chapters AS ch (comic_id, title, number, counter, extra, cover_hash)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CHAPTER_COLUMNS}"
        ))
        .bind(new.comic_id)
        .bind(&new.title)
        .bind(new.number)
        .bind(new.counter)
        .bind(new.extra)
        .bind(&new.cover_hash)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_chapter(&self, id: Id) -> RepoResult<Chapter> {
        Ok(sqlx::query_as::<_, Chapter>(&format!("SELECT {CHAPTER_COLUMNS} FROM chapters ch WHERE ch.id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_chapter_translation(&self, new: NewChapterTranslation) -> RepoResult<ChapterTranslation> {
        new.validate()?;
        let mut tx = self.pool.begin().await?;
        let (chapter_comic,): (Id,) = sqlx::query_as("SELECT comic_id FROM chapters WHERE id = $1 FOR SHARE")
            .bind(new.chapter_id)
            .fetch_one(&mut *tx)
            .await?;
        let (translation_comic,): (Id,) = sqlx::query_as("SELECT comic_id FROM comic_translations WHERE id = $1 FOR SHARE")
            .bind(new.comic_translation_id)
            .fetch_one(&mut *tx)
            .await?;
        validation::check_chapter_translation_comic(chapter_comic, translation_comic)?;
        let rec = sqlx::query_as::<_, ChapterTranslation>(
            "INSERT INTO chapter_translations (chapter_id, comic_translation_id, comic_id, title) VALUES ($1, $2, $3, $4)
             RETURNING id, chapter_id, comic_translation_id, title, published_date",
        )
        .bind(new.chapter_id)
        .bind(new.comic_translation_id)
        .bind(chapter_comic)
        .bind(&new.title)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rec)
    }

    async fn load_chapter_graph(&self, id: Id) -> RepoResult<ChapterGraph> {
        let mut tx = self.snapshot().await?;
        let chapter = sqlx::query_as::<_, Chapter>(&format!("SELECT {CHAPTER_COLUMNS} FROM chapters ch WHERE ch.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let comic = Self::fetch_comic(&mut *tx, chapter.comic_id).await?;
        let pages = sqlx::query_as::<_, Page>(
            "SELECT id, chapter_id, number, image_hash, mime FROM pages WHERE chapter_id = $1 ORDER BY number",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let chapter_translations = sqlx::query_as::<_, ChapterTranslation>(
            "SELECT id, chapter_id, comic_translation_id, title, published_date FROM chapter_translations
             WHERE chapter_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let ct_ids: Vec<Id> = chapter_translations.iter().map(|ct| ct.id).collect();
        let comic_translations = sqlx::query_as::<_, ComicTranslation>(
            "SELECT t.id, t.comic_id, t.language, t.title, t.summary FROM comic_translations t
             JOIN chapter_translations ct ON ct.comic_translation_id = t.id WHERE ct.id = ANY($1)",
        )
        .bind(&ct_ids)
        .fetch_all(&mut *tx)
        .await?;
        let page_translations = sqlx::query_as::<_, PageTranslation>(
            "SELECT id, chapter_translation_id, number, image_hash, mime FROM page_translations
             WHERE chapter_translation_id = ANY($1) ORDER BY number",
        )
        .bind(&ct_ids)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let comic_translations: HashMap<Id, ComicTranslation> =
            comic_translations.into_iter().map(|t| (t.id, t)).collect();
        let translations = chapter_translations
            .into_iter()
            .filter_map(|ct| {
                let comic_translation = comic_translations.get(&ct.comic_translation_id)?.clone();
                let pages = page_translations.iter().filter(|p| p.chapter_translation_id == ct.id).cloned().collect();
                Some(LocalizedChapter { chapter_translation: ct, comic_translation, pages })
            })
            .collect();
        Ok(ChapterGraph { comic, chapter, pages, translations })
    }

    async fn recent_chapters(&self, limit: usize) -> RepoResult<Vec<(Comic, Chapter)>> {
        let chapters = sqlx::query_as::<_, Chapter>(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters ch
             WHERE EXISTS (SELECT 1 FROM pages pg WHERE pg.chapter_id = ch.id)
             ORDER BY ch.published_date DESC, ch.id DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        let comic_ids: Vec<Id> = chapters.iter().map(|c| c.comic_id).collect();
        let comics: HashMap<Id, Comic> =
            sqlx::query_as::<_, Comic>(&format!("SELECT {COMIC_COLUMNS} FROM comics c WHERE c.id = ANY($1)"))
                .bind(&comic_ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();
        Ok(chapters
            .into_iter()
            .filter_map(|ch| comics.get(&ch.comic_id).map(|c| (c.clone(), ch)))
            .collect())
    }

    async fn delete_chapter(&self, id: Id) -> RepoResult<()> {
        self.delete_by_id("chapters", id).await
    }

    async fn delete_chapter_translation(&self, id: Id) -> RepoResult<()> {
        self.delete_by_id("chapter_translations", id).await
    }
}

#[async_trait]
impl PageRepo for PgRepo {
    async fn create_page(&self, new: NewPage) -> RepoResult<Page> {
        new.validate()?;
        let mut tx = self.pool.begin().await?;
        Self::lock_row(&mut tx, "chapters", new.chapter_id).await?;
        let siblings = Self::count_where(&mut tx, "pages", "chapter_id", new.chapter_id, None).await?;
        validation::check_page_number(new.number, siblings)?;
        let rec = sqlx::query_as::<_, Page>(
            "INSERT INTO pages (chapter_id, number, image_hash, mime) VALUES ($1, $2, $3, $4)
             RETURNING id, chapter_id, number, image_hash, mime",
        )
        .bind(new.chapter_id)
        .bind(new.number)
        .bind(&new.image_hash)
        .bind(&new.mime)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rec)
    }

    async fn update_page_number(&self, id: Id, number: i32) -> RepoResult<Page> {
        let mut tx = self.pool.begin().await?;
        let (chapter_id,): (Id,) = sqlx::query_as("SELECT chapter_id FROM pages WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        Self::lock_row(&mut tx, "chapters", chapter_id).await?;
        let others = Self::count_where(&mut tx, "pages", "chapter_id", chapter_id, Some(id)).await?;
        validation::check_page_number(number, others)?;
        let rec = sqlx::query_as::<_, Page>(
            "UPDATE pages SET number = $2 WHERE id = $1 RETURNING id, chapter_id, number, image_hash, mime",
        )
        .bind(id)
        .bind(number)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rec)
    }

    async fn delete_page(&self, id: Id) -> RepoResult<()> {
        self.delete_by_id("pages", id).await
    }

    async fn create_page_translation(&self, new: NewPageTranslation) -> RepoResult<PageTranslation> {
        new.validate()?;
        let mut tx = self.pool.begin().await?;
        Self::lock_row(&mut tx, "chapter_translations", new.chapter_translation_id).await?;
        let siblings =
            Self::count_where(&mut tx, "page_translations", "chapter_translation_id", new.chapter_translation_id, None)
                .await?;
        validation::check_page_number(new.number, siblings)?;
        let rec = sqlx::query_as::<_, PageTranslation>(
            "INSERT INTO page_translations (chapter_translation_id, number, image_hash, mime) VALUES ($1, $2, $3, $4)
             RETURNING id, chapter_translation_id, number, image_hash, mime",
        )
        .bind(new.chapter_translation_id)
        .bind(new.number)
        .bind(&new.image_hash)
        .bind(&new.mime)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rec)
    }

    async fn update_page_translation_number(&self, id: Id, number: i32) -> RepoResult<PageTranslation> {
        let mut tx = self.pool.begin().await?;
        let (parent,): (Id,) = sqlx::query_as("SELECT chapter_translation_id FROM page_translations WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        Self::lock_row(&mut tx, "chapter_translations", parent).await?;
        let others = Self::count_where(&mut tx, "page_translations", "chapter_translation_id", parent, Some(id)).await?;
        validation::check_page_number(number, others)?;
        let rec = sqlx::query_as::<_, PageTranslation>(
            "UPDATE page_translations SET number = $2 WHERE id = $1
             RETURNING id, chapter_translation_id, number, image_hash, mime",
        )
        .bind(id)
        .bind(number)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rec)
    }

    async fn delete_page_translation(&self, id: Id) -> RepoResult<()> {
        self.delete_by_id("page_translations", id).await
    }
}

#[async_trait]
impl PostRepo for PgRepo {
    async fn create_post(&self, new: NewPost) -> RepoResult<PostView> {
        new.validate()?;
        let mut tx = self.pool.begin().await?;
        let (id,): (Id,) = sqlx::query_as(
            "INSERT INTO posts (profile_id, text_content, writing_mode, reply_to, about_comic, about_chapter)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(new.profile_id)
        .bind(&new.text_content)
        .bind(new.writing_mode)
        .bind(new.reply_to)
        .bind(new.about_comic)
        .bind(new.about_chapter)
        .fetch_one(&mut *tx)
        .await?;
        for m in &new.media {
            sqlx::query("INSERT INTO post_media (post_id, hash, mime, alt_text) VALUES ($1, $2, $3, $4)")
                .bind(id)
                .bind(&m.hash)
                .bind(&m.mime)
                .bind(&m.alt_text)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.get_post(id).await
    }

    async fn get_post(&self, id: Id) -> RepoResult<PostView> {
        let post = self.fetch_post(id).await?;
        let mut views = self.with_media(vec![post]).await?;
        views.pop().ok_or(RepoError::NotFound)
    }

    async fn list_replies(&self, post_id: Id) -> RepoResult<Vec<PostView>> {
        self.fetch_post(post_id).await?;
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.reply_to = $1 ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        self.with_media(posts).await
    }

    async fn recent_posts(&self, limit: usize) -> RepoResult<Vec<PostView>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        self.with_media(posts).await
    }

    async fn list_profile_posts(&self, profile_id: Id, limit: usize) -> RepoResult<Vec<PostView>> {
        self.get_profile(profile_id).await?;
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.profile_id = $1 ORDER BY p.created_at DESC, p.id DESC LIMIT $2"
        ))
        .bind(profile_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        self.with_media(posts).await
    }

    async fn like_post(&self, post_id: Id, profile_id: Id) -> RepoResult<Post> {
        sqlx::query("INSERT INTO post_likes (post_id, profile_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(post_id)
            .bind(profile_id)
            .execute(&self.pool)
            .await?;
        self.fetch_post(post_id).await
    }

    async fn unlike_post(&self, post_id: Id, profile_id: Id) -> RepoResult<Post> {
        sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND profile_id = $2")
            .bind(post_id)
            .bind(profile_id)
            .execute(&self.pool)
            .await?;
        self.fetch_post(post_id).await
    }

    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        self.delete_by_id("posts", id).await
    }
}
