use std::sync::Arc;

use actix_multipart::{Field, Multipart};
use actix_web::{http::header, web, HttpResponse};
use futures_util::TryStreamExt as _;
use serde::{Deserialize, Serialize};

use crate::auth::{Auth, Role};
use crate::config::{Settings, DEFAULT_MEDIA_SIZE_LIMIT};
use crate::error::ApiError;
use crate::graph::{ChapterGraph, ComicGraph};
use crate::locale::{LocaleConfig, RequestLanguage};
use crate::models::*;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::{Repo, RepoError, RepoResult};
use crate::require_role;
use crate::resolver::{self, ChapterResolution, ComicResolution};
use crate::storage::{self, MediaStore, MediaStoreError};
use crate::validation::{FieldError, ValidationErrors, Violation};
use crate::views::{self, *};

const TEXT_FIELD_LIMIT: usize = 16 * 1024;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/languages").route(web::get().to(list_languages)))
            .service(web::resource("/languages/{code}").route(web::put().to(put_language)))
            .service(web::resource("/profiles").route(web::post().to(register_profile)))
            .service(web::resource("/profiles/{id}").route(web::get().to(get_profile)))
            .service(web::resource("/authors").route(web::post().to(create_author)))
            .service(web::resource("/authors/{id}").route(web::delete().to(delete_author)))
            .service(web::resource("/authors/{id}/translations").route(web::post().to(create_author_translation)))
            .service(web::resource("/comics").route(web::post().to(create_comic)))
            .service(
                web::resource("/comics/{id}")
                    .route(web::get().to(get_comic))
                    .route(web::delete().to(delete_comic)),
            )
            .service(web::resource("/comics/{id}/translations").route(web::post().to(create_comic_translation)))
            .service(web::resource("/comic-translations/{id}").route(web::delete().to(delete_comic_translation)))
            .service(web::resource("/chapters").route(web::post().to(create_chapter)))
            // must precede /chapters/{id}
            .service(web::resource("/chapters/recent").route(web::get().to(recent_chapters)))
            .service(
                web::resource("/chapters/{id}")
                    .route(web::get().to(get_chapter))
                    .route(web::delete().to(delete_chapter)),
            )
            .service(web::resource("/chapters/{id}/{lang}").route(web::get().to(get_chapter_translation)))
            .service(web::resource("/chapter-translations").route(web::post().to(create_chapter_translation)))
            .service(web::resource("/chapter-translations/{id}").route(web::delete().to(delete_chapter_translation)))
            .service(web::resource("/pages").route(web::post().to(create_page)))
            .service(
                web::resource("/pages/{id}")
                    .route(web::patch().to(update_page))
                    .route(web::delete().to(delete_page)),
            )
            .service(web::resource("/page-translations").route(web::post().to(create_page_translation)))
            .service(
                web::resource("/page-translations/{id}")
                    .route(web::patch().to(update_page_translation))
                    .route(web::delete().to(delete_page_translation)),
            )
            .service(web::resource("/feed").route(web::get().to(feed)))
            .service(web::resource("/posts").route(web::post().to(create_post)))
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(get_post))
                    .route(web::delete().to(delete_post)),
            )
            .service(
                web::resource("/posts/{id}/like")
                    .route(web::post().to(like_post))
                    .route(web::delete().to(unlike_post)),
            )
            .service(web::resource("/media").route(web::post().to(upload_media))),
    );
    // outside the API prefix so `<img src="/media/{hash}">` works
    cfg.route("/media/{hash}", web::get().to(get_media));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub media_store: Arc<dyn MediaStore>,
    pub rate_limiter: Option<RateLimiterFacade>,
    pub locale: LocaleConfig,
    pub feed_limit: usize,
    pub recent_chapters_limit: usize,
    pub media_size_limit: usize,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, media_store: Arc<dyn MediaStore>) -> Self {
        Self {
            repo,
            media_store,
            rate_limiter: None,
            locale: LocaleConfig::default(),
            feed_limit: 20,
            recent_chapters_limit: 20,
            media_size_limit: DEFAULT_MEDIA_SIZE_LIMIT,
        }
    }

    pub fn from_settings(repo: Arc<dyn Repo>, media_store: Arc<dyn MediaStore>, settings: &Settings) -> Self {
        Self {
            locale: settings.locale.clone(),
            feed_limit: settings.feed_limit,
            recent_chapters_limit: settings.recent_chapters_limit,
            media_size_limit: settings.media_size_limit,
            ..Self::new(repo, media_store)
        }
    }

    pub fn with_rate_limiter(mut self, rl: RateLimiterFacade) -> Self {
        self.rate_limiter = Some(rl);
        self
    }

    fn check_rate(&self, allow: impl Fn(&RateLimiterFacade) -> bool) -> Result<(), ApiError> {
        match &self.rate_limiter {
            Some(rl) if !allow(rl) => Err(ApiError::TooManyRequests),
            _ => Ok(()),
        }
    }

    async fn writing_mode(&self, language: &str) -> Result<WritingMode, ApiError> {
        Ok(self.repo.get_language(language).await?.map(|l| l.writing_mode).unwrap_or_default())
    }

    /// Language codes written to content must be servable, otherwise no
    /// request could ever resolve to them.
    fn supported_language(&self, field: &str, code: &str) -> Result<String, ApiError> {
        match self.locale.canonical(code.trim()) {
            Some(c) => Ok(c.to_string()),
            None => Err(ValidationErrors::from(FieldError::new(field, Violation::InvalidLanguage)).into()),
        }
    }

    /// Profile of the authenticated caller; posting requires one.
    async fn caller_profile(&self, auth: &Auth) -> Result<UserProfile, ApiError> {
        match self.repo.find_profile_by_user(&auth.0.sub).await {
            Ok(p) => Ok(p),
            Err(RepoError::NotFound) => Err(ApiError::Forbidden),
            Err(e) => Err(e.into()),
        }
    }
}

/// Missing rows become `None` so the resolver decides what a 404 is.
fn found<T>(r: RepoResult<T>) -> Result<Option<T>, ApiError> {
    match r {
        Ok(v) => Ok(Some(v)),
        Err(RepoError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found().insert_header((header::LOCATION, location)).finish()
}

// ---------------- read side ----------------

#[utoipa::path(
    get,
    path = "/api/v1/comics/{id}",
    params(
        ("id" = i64, Path, description = "Comic id"),
        ("lang" = Option<String>, Query, description = "Requested language; falls back to Accept-Language")
    ),
    responses(
        (status = 200, description = "Comic in the requested language, or a not-available placeholder", body = ComicView),
        (status = 404, description = "Comic missing or has no presentable chapter")
    )
)]
pub async fn get_comic(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    lang: RequestLanguage,
) -> Result<HttpResponse, ApiError> {
    let graph: Option<ComicGraph> = found(data.repo.load_comic_graph(path.into_inner()).await)?;
    let detail = match resolver::resolve_comic(graph.as_ref(), &lang.0) {
        ComicResolution::NotFound => return Err(ApiError::NotFound),
        ComicResolution::Default(g) => {
            let wm = data.writing_mode(&g.comic.default_language).await?;
            ComicDetail::Default(views::default_comic_view(g, wm))
        }
        ComicResolution::Translated { graph, translation } => {
            let wm = data.writing_mode(&translation.translation.language).await?;
            ComicDetail::Translation(views::translated_comic_view(graph, translation, wm))
        }
        ComicResolution::NotAvailable(g) => ComicDetail::NotAvailable(views::comic_unavailable_view(g, &lang.0)),
    };
    Ok(HttpResponse::Ok().json(detail))
}

async fn render_chapter(
    data: &AppState,
    resolution: ChapterResolution<'_>,
    requested: &str,
) -> Result<HttpResponse, ApiError> {
    let detail = match resolution {
        ChapterResolution::NotFound => return Err(ApiError::NotFound),
        ChapterResolution::RedirectToTranslation { chapter_id, language } => {
            return Ok(redirect(format!("/api/v1/chapters/{chapter_id}/{language}")))
        }
        ChapterResolution::RedirectToCanonical { chapter_id } => {
            return Ok(redirect(format!("/api/v1/chapters/{chapter_id}")))
        }
        ChapterResolution::Default(g) => {
            let wm = data.writing_mode(&g.comic.default_language).await?;
            ChapterDetail::Default(views::default_chapter_view(g, wm))
        }
        ChapterResolution::Translated { graph, localized } => {
            let wm = data.writing_mode(&localized.comic_translation.language).await?;
            ChapterDetail::Translation(views::translated_chapter_view(graph, localized, wm))
        }
        ChapterResolution::NotAvailable(g) => ChapterDetail::NotAvailable(views::chapter_unavailable_view(g, requested)),
    };
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    get,
    path = "/api/v1/chapters/{id}",
    params(
        ("id" = i64, Path, description = "Chapter id"),
        ("lang" = Option<String>, Query, description = "Requested language; falls back to Accept-Language")
    ),
    responses(
        (status = 200, description = "Chapter in the comic's default language", body = ChapterView),
        (status = 302, description = "Requested language differs from the default; see the translation endpoint"),
        (status = 404, description = "Chapter missing or has no pages")
    )
)]
pub async fn get_chapter(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    lang: RequestLanguage,
) -> Result<HttpResponse, ApiError> {
    let graph: Option<ChapterGraph> = found(data.repo.load_chapter_graph(path.into_inner()).await)?;
    render_chapter(&data, resolver::resolve_chapter(graph.as_ref(), &lang.0), &lang.0).await
}

#[utoipa::path(
    get,
    path = "/api/v1/chapters/{id}/{lang}",
    params(("id" = i64, Path, description = "Chapter id"), ("lang" = String, Path, description = "Language code")),
    responses(
        (status = 200, description = "Translated chapter, or a not-available placeholder", body = ChapterView),
        (status = 302, description = "Language is the comic default; see the canonical endpoint"),
        (status = 404, description = "Chapter missing or has no pages")
    )
)]
pub async fn get_chapter_translation(
    data: web::Data<AppState>,
    path: web::Path<(Id, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, lang) = path.into_inner();
    let lang = data.locale.canonical(&lang).map(str::to_string).unwrap_or(lang);
    let graph: Option<ChapterGraph> = found(data.repo.load_chapter_graph(id).await)?;
    render_chapter(&data, resolver::resolve_chapter_translation(graph.as_ref(), &lang), &lang).await
}

#[utoipa::path(
    get,
    path = "/api/v1/chapters/recent",
    responses((status = 200, description = "Most recently published chapters", body = [RecentChapter]))
)]
pub async fn recent_chapters(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let rows = data.repo.recent_chapters(data.recent_chapters_limit).await?;
    let out: Vec<RecentChapter> = rows.iter().map(|(comic, chapter)| RecentChapter::new(comic, chapter)).collect();
    Ok(HttpResponse::Ok().json(out))
}

#[utoipa::path(
    get,
    path = "/api/v1/feed",
    responses((status = 200, description = "Most recent posts, newest first", body = [PostView]))
)]
pub async fn feed(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let posts = data.repo.recent_posts(data.feed_limit).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with its media and direct replies", body = PostDetailView),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let post = data.repo.get_post(id).await?;
    let replies = data.repo.list_replies(id).await?;
    Ok(HttpResponse::Ok().json(PostDetailView { post, replies }))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    params(("id" = i64, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile with recent posts", body = ProfileView),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn get_profile(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let profile = data.repo.get_profile(id).await?;
    let posts = data.repo.list_profile_posts(id, data.feed_limit).await?;
    Ok(HttpResponse::Ok().json(ProfileView { profile, posts }))
}

#[utoipa::path(
    get,
    path = "/api/v1/languages",
    responses((status = 200, description = "Registered languages", body = [Language]))
)]
pub async fn list_languages(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.list_languages().await?))
}

pub async fn get_media(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let hash = path.into_inner();
    match data.media_store.load(&hash).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, mime))
            .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
            .body(bytes)),
        Err(MediaStoreError::NotFound) => Err(ApiError::NotFound),
        Err(e) => {
            log::error!("media_store load error: {e}");
            Err(ApiError::Internal)
        }
    }
}

// ---------------- profiles & posts ----------------

#[utoipa::path(
    post,
    path = "/api/v1/profiles",
    request_body = NewProfile,
    responses(
        (status = 201, description = "Profile created", body = UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Caller already has a profile")
    )
)]
pub async fn register_profile(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewProfile>,
) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.register_profile(&auth.0.sub, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(profile))
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(|e| {
        log::error!("multipart read error: {e}");
        ApiError::BadRequest("malformed multipart body".into())
    })? {
        if bytes.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_text(field: &mut Field) -> Result<String, ApiError> {
    let bytes = read_field(field, TEXT_FIELD_LIMIT).await?;
    String::from_utf8(bytes).map_err(|_| ApiError::BadRequest("text field is not UTF-8".into()))
}

fn parse_ref(name: &str, value: &str) -> Result<Option<Id>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| ApiError::BadRequest(format!("{name} must be an integer id")))
}

/// Hash, sniff and persist an uploaded blob. Re-uploading identical bytes is
/// not an error.
async fn store_media(data: &AppState, bytes: &[u8]) -> Result<(String, String, bool), ApiError> {
    let hash = storage::hash_bytes(bytes);
    let mime = storage::sniff_mime(bytes);
    if !storage::ALLOWED_MIME.contains(&mime.as_str()) {
        return Err(ApiError::UnsupportedMediaType);
    }
    let duplicate = match data.media_store.save(&hash, &mime, bytes).await {
        Ok(()) => false,
        Err(MediaStoreError::Duplicate) => true,
        Err(e) => {
            log::error!("media_store save error: {e}");
            return Err(ApiError::Internal);
        }
    };
    Ok((hash, mime, duplicate))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    responses(
        (status = 201, description = "Post created", body = PostView),
        (status = 403, description = "Caller has no profile"),
        (status = 413, description = "Attachment too large"),
        (status = 415, description = "Unsupported attachment type"),
        (status = 422, description = "Validation failed"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn create_post(auth: Auth, data: web::Data<AppState>, mut payload: Multipart) -> Result<HttpResponse, ApiError> {
    let profile = data.caller_profile(&auth).await?;
    data.check_rate(|rl| rl.allow_post(&auth.0.sub))?;

    let mut new = NewPost {
        profile_id: profile.id,
        text_content: String::new(),
        writing_mode: WritingMode::default(),
        reply_to: None,
        about_comic: None,
        about_chapter: None,
        media: Vec::new(),
    };
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::BadRequest("malformed multipart body".into())
    })? {
        let name = field.content_disposition().get_name().unwrap_or_default().to_string();
        match name.as_str() {
            "text_content" => new.text_content = read_text(&mut field).await?,
            "writing_mode" => {
                let value = read_text(&mut field).await?;
                new.writing_mode = value
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::BadRequest(format!("unknown writing_mode '{value}'")))?;
            }
            "reply_to" => new.reply_to = parse_ref("reply_to", &read_text(&mut field).await?)?,
            "about_comic" => new.about_comic = parse_ref("about_comic", &read_text(&mut field).await?)?,
            "about_chapter" => new.about_chapter = parse_ref("about_chapter", &read_text(&mut field).await?)?,
            "media" => {
                let bytes = read_field(&mut field, data.media_size_limit).await?;
                let (hash, mime, _) = store_media(&data, &bytes).await?;
                new.media.push(NewPostMedia { hash, mime, alt_text: String::new() });
            }
            // describes the attachment sent just before it
            "alt_text" => {
                let alt = read_text(&mut field).await?;
                match new.media.last_mut() {
                    Some(m) => m.alt_text = alt,
                    None => return Err(ApiError::BadRequest("alt_text must follow a media field".into())),
                }
            }
            _ => {
                read_field(&mut field, data.media_size_limit).await?;
            }
        }
    }
    let post = data.repo.create_post(new).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post and its replies deleted"),
        (status = 403, description = "Only the author or an admin may delete"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let post = data.repo.get_post(id).await?;
    if !auth.is_admin() {
        let profile = data.caller_profile(&auth).await?;
        if profile.id != post.post.profile_id {
            return Err(ApiError::Forbidden);
        }
    }
    data.repo.delete_post(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/like",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with updated like count", body = Post),
        (status = 404, description = "Post not found"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn like_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let profile = data.caller_profile(&auth).await?;
    data.check_rate(|rl| rl.allow_like(&auth.0.sub))?;
    let post = data.repo.like_post(path.into_inner(), profile.id).await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn unlike_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let profile = data.caller_profile(&auth).await?;
    data.check_rate(|rl| rl.allow_like(&auth.0.sub))?;
    let post = data.repo.unlike_post(path.into_inner(), profile.id).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MediaUploadResponse {
    pub hash: String,
    pub mime: String,
    pub size: usize,
    pub url: String,
    pub duplicate: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/media",
    responses(
        (status = 201, description = "Media stored (new)", body = MediaUploadResponse),
        (status = 200, description = "Media already existed", body = MediaUploadResponse),
        (status = 413, description = "Payload too large"),
        (status = 415, description = "Unsupported media type")
    )
)]
pub async fn upload_media(auth: Auth, data: web::Data<AppState>, mut payload: Multipart) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    data.check_rate(|rl| rl.allow_media(&auth.0.sub))?;
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::BadRequest("malformed multipart body".into())
    })? {
        if field.content_disposition().get_name() != Some("file") {
            continue;
        }
        let bytes = read_field(&mut field, data.media_size_limit).await?;
        let (hash, mime, duplicate) = store_media(&data, &bytes).await?;
        let resp = MediaUploadResponse { url: media_url(&hash), hash, mime, size: bytes.len(), duplicate };
        return Ok(if duplicate { HttpResponse::Ok().json(resp) } else { HttpResponse::Created().json(resp) });
    }
    Err(ApiError::BadRequest("missing 'file' field".into()))
}

// ---------------- authoring ----------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LanguageBody {
    #[serde(default)]
    pub writing_mode: WritingMode,
}

#[utoipa::path(
    put,
    path = "/api/v1/languages/{code}",
    request_body = LanguageBody,
    params(("code" = String, Path, description = "Language code")),
    responses((status = 200, description = "Language registered", body = Language), (status = 403, description = "Admins only"))
)]
pub async fn put_language(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<LanguageBody>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let code = data.supported_language("code", &path.into_inner())?;
    let language = Language { code, writing_mode: payload.writing_mode };
    Ok(HttpResponse::Ok().json(data.repo.upsert_language(language).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/authors",
    request_body = NewAuthor,
    responses((status = 201, description = "Author created", body = Author), (status = 422, description = "Validation failed"))
)]
pub async fn create_author(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewAuthor>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    let mut new = payload.into_inner();
    new.default_language = data.supported_language("default_language", &new.default_language)?;
    Ok(HttpResponse::Created().json(data.repo.create_author(new).await?))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AuthorTranslationBody {
    pub language: String,
    pub pen_name: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/authors/{id}/translations",
    request_body = AuthorTranslationBody,
    params(("id" = i64, Path, description = "Author id")),
    responses(
        (status = 201, description = "Translation created", body = AuthorTranslation),
        (status = 409, description = "Language already translated"),
        (status = 422, description = "Language equals the author's default")
    )
)]
pub async fn create_author_translation(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<AuthorTranslationBody>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    let body = payload.into_inner();
    let language = data.supported_language("language", &body.language)?;
    let new = NewAuthorTranslation { author_id: path.into_inner(), language, pen_name: body.pen_name };
    Ok(HttpResponse::Created().json(data.repo.create_author_translation(new).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/comics",
    request_body = NewComic,
    responses(
        (status = 201, description = "Comic created; the caller's profile is the publisher", body = Comic),
        (status = 403, description = "Publishers only"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_comic(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewComic>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    let publisher = data.caller_profile(&auth).await?;
    let mut new = payload.into_inner();
    new.default_language = data.supported_language("default_language", &new.default_language)?;
    Ok(HttpResponse::Created().json(data.repo.create_comic(publisher.id, new).await?))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ComicTranslationBody {
    pub language: String,
    pub title: String,
    pub summary: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/comics/{id}/translations",
    request_body = ComicTranslationBody,
    params(("id" = i64, Path, description = "Comic id")),
    responses(
        (status = 201, description = "Translation created", body = ComicTranslation),
        (status = 409, description = "Language already translated"),
        (status = 422, description = "Language equals the comic's default")
    )
)]
pub async fn create_comic_translation(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ComicTranslationBody>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    let body = payload.into_inner();
    let new = NewComicTranslation {
        comic_id: path.into_inner(),
        language: data.supported_language("language", &body.language)?,
        title: body.title,
        summary: body.summary,
    };
    Ok(HttpResponse::Created().json(data.repo.create_comic_translation(new).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/chapters",
    request_body = NewChapter,
    responses(
        (status = 201, description = "Chapter created", body = Chapter),
        (status = 409, description = "Number or counter already used in this comic"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_chapter(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewChapter>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    Ok(HttpResponse::Created().json(data.repo.create_chapter(payload.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/chapter-translations",
    request_body = NewChapterTranslation,
    responses(
        (status = 201, description = "Chapter translation created", body = ChapterTranslation),
        (status = 422, description = "Chapter and comic translation belong to different comics")
    )
)]
pub async fn create_chapter_translation(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewChapterTranslation>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    Ok(HttpResponse::Created().json(data.repo.create_chapter_translation(payload.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/pages",
    request_body = NewPage,
    responses(
        (status = 201, description = "Page created", body = Page),
        (status = 409, description = "Number already used"),
        (status = 422, description = "Number out of range")
    )
)]
pub async fn create_page(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewPage>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    Ok(HttpResponse::Created().json(data.repo.create_page(payload.into_inner()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/pages/{id}",
    request_body = UpdatePageNumber,
    params(("id" = i64, Path, description = "Page id")),
    responses((status = 200, description = "Page renumbered", body = Page), (status = 422, description = "Number out of range"))
)]
pub async fn update_page(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdatePageNumber>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    Ok(HttpResponse::Ok().json(data.repo.update_page_number(path.into_inner(), payload.number).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/page-translations",
    request_body = NewPageTranslation,
    responses(
        (status = 201, description = "Translated page created", body = PageTranslation),
        (status = 422, description = "Number out of range")
    )
)]
pub async fn create_page_translation(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewPageTranslation>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    Ok(HttpResponse::Created().json(data.repo.create_page_translation(payload.into_inner()).await?))
}

pub async fn update_page_translation(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdatePageNumber>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Publisher | Role::Admin);
    Ok(HttpResponse::Ok().json(data.repo.update_page_translation_number(path.into_inner(), payload.number).await?))
}

// ---------------- admin deletes ----------------
macro_rules! admin_delete {
    ($name:ident, $method:ident) => {
        pub async fn $name(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
            require_role!(auth, Role::Admin);
            data.repo.$method(path.into_inner()).await?;
            Ok(HttpResponse::NoContent().finish())
        }
    };
}

admin_delete!(delete_author, delete_author);
admin_delete!(delete_comic, delete_comic);
admin_delete!(delete_comic_translation, delete_comic_translation);
admin_delete!(delete_chapter, delete_chapter);
admin_delete!(delete_chapter_translation, delete_chapter_translation);
admin_delete!(delete_page, delete_page);
admin_delete!(delete_page_translation, delete_page_translation);
