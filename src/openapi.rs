use crate::models::{
    Author, AuthorTranslation, Chapter, ChapterTranslation, Comic, ComicTranslation, Genre, Language, NewAuthor,
    NewChapter, NewChapterTranslation, NewComic, NewPage, NewPageTranslation, NewProfile, Page, PageTranslation, Post,
    PostMedia, Schedule, SerializedStatus, UpdatePageNumber, UserProfile, WritingMode,
};
use crate::views::{
    ChapterSummary, ChapterView, ComicView, PageView, PostDetailView, PostView, ProfileView, RecentChapter,
    UnavailableView,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::get_comic,
        crate::routes::get_chapter,
        crate::routes::get_chapter_translation,
        crate::routes::recent_chapters,
        crate::routes::feed,
        crate::routes::get_post,
        crate::routes::get_profile,
        crate::routes::list_languages,
        crate::routes::register_profile,
        crate::routes::create_post,
        crate::routes::delete_post,
        crate::routes::like_post,
        crate::routes::upload_media,
        crate::routes::put_language,
        crate::routes::create_author,
        crate::routes::create_author_translation,
        crate::routes::create_comic,
        crate::routes::create_comic_translation,
        crate::routes::create_chapter,
        crate::routes::create_chapter_translation,
        crate::routes::create_page,
        crate::routes::update_page,
        crate::routes::create_page_translation,
    ),
    components(schemas(
        Genre, SerializedStatus, Schedule, WritingMode, Language, UserProfile, NewProfile,
        Author, NewAuthor, AuthorTranslation, Comic, NewComic, ComicTranslation,
        Chapter, NewChapter, ChapterTranslation, NewChapterTranslation,
        Page, NewPage, PageTranslation, NewPageTranslation, UpdatePageNumber, Post, PostMedia,
        ComicView, ChapterView, ChapterSummary, PageView, UnavailableView, RecentChapter,
        PostView, PostDetailView, ProfileView,
        crate::error::ApiErrorBody,
        crate::routes::MediaUploadResponse, crate::routes::LanguageBody,
        crate::routes::AuthorTranslationBody, crate::routes::ComicTranslationBody
    )),
    tags(
        (name = "comics", description = "Comic, chapter and page reading"),
        (name = "posts", description = "Social posts and likes"),
        (name = "authoring", description = "Publisher content management"),
    )
)]
pub struct ApiDoc;
