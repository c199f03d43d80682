#![cfg(feature = "postgres-store")]

use comic_reader::models::*;
use comic_reader::repo::pg::PgRepo;
use comic_reader::repo::{ChapterRepo, ComicRepo, PageRepo, PostRepo, ProfileRepo, RepoError};
use serial_test::serial;

async fn pg_repo() -> Option<PgRepo> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .ok()?;
    let repo = PgRepo::new(pool);
    repo.migrate().await.ok()?;
    Some(repo)
}

// Subjects must not collide across runs against the same database.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn comic(repo: &PgRepo) -> Comic {
    let profile = repo
        .register_profile(&unique("pub"), NewProfile { name: "Publisher".into(), bio: None, bio_writing_mode: None })
        .await
        .unwrap();
    repo.create_comic(
        profile.id,
        NewComic {
            title: "Moonlit".into(),
            summary: None,
            default_language: "en".into(),
            status: SerializedStatus::Ongoing,
            schedule: Schedule::Weekly,
            author_ids: vec![],
            genres: vec![Genre::Fantasy, Genre::Fantasy],
            vertical_cover_hash: None,
        },
    )
    .await
    .unwrap()
}

fn chapter(comic_id: Id, counter: i32) -> NewChapter {
    NewChapter { comic_id, title: format!("ch{counter}"), number: Some(counter), counter, extra: false, cover_hash: None }
}

#[tokio::test]
#[serial]
async fn pg_translation_guards_and_conflicts() {
    let Some(repo) = pg_repo().await else { eprintln!("skip: no DATABASE_URL"); return; };
    let c = comic(&repo).await;
    assert_eq!(c.genres, vec![Genre::Fantasy]);

    let new = |lang: &str| NewComicTranslation { comic_id: c.id, language: lang.into(), title: "t".into(), summary: "s".into() };
    assert!(matches!(repo.create_comic_translation(new("en")).await, Err(RepoError::Validation(_))));

    let (a, b) = tokio::join!(repo.create_comic_translation(new("vi")), repo.create_comic_translation(new("vi")));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert!(matches!(a.err().or(b.err()), Some(RepoError::Conflict(_))));
}

#[tokio::test]
#[serial]
async fn pg_pages_follow_append_bound_and_deletes_are_protected() {
    let Some(repo) = pg_repo().await else { eprintln!("skip: no DATABASE_URL"); return; };
    let c = comic(&repo).await;

    let mut both = chapter(c.id, 1);
    both.extra = true;
    assert!(matches!(repo.create_chapter(both).await, Err(RepoError::Validation(_))));

    let ch = repo.create_chapter(chapter(c.id, 1)).await.unwrap();
    assert!(matches!(repo.create_chapter(chapter(c.id, 1)).await, Err(RepoError::Conflict(_))));

    let page = |number: i32| NewPage { chapter_id: ch.id, number, image_hash: "a".repeat(64), mime: "image/png".into() };
    let p1 = repo.create_page(page(1)).await.unwrap();
    assert!(matches!(repo.create_page(page(3)).await, Err(RepoError::Validation(_))));
    repo.create_page(page(2)).await.unwrap();
    assert!(matches!(repo.update_page_number(p1.id, 2).await, Err(RepoError::Conflict(_))));

    let graph = repo.load_comic_graph(c.id).await.unwrap();
    assert_eq!(graph.chapters.len(), 1);
    assert_eq!(graph.chapters[0].page_count, 2);

    assert!(matches!(repo.delete_chapter(ch.id).await, Err(RepoError::Protected(_))));
    assert!(matches!(repo.delete_comic(c.id).await, Err(RepoError::Protected(_))));
}

#[tokio::test]
#[serial]
async fn pg_post_delete_cascades_to_replies() {
    let Some(repo) = pg_repo().await else { eprintln!("skip: no DATABASE_URL"); return; };
    let profile = repo
        .register_profile(&unique("fan"), NewProfile { name: "Fan".into(), bio: None, bio_writing_mode: None })
        .await
        .unwrap();
    let post = |reply_to: Option<Id>| NewPost {
        profile_id: profile.id,
        text_content: "hello".into(),
        writing_mode: WritingMode::HorizontalTb,
        reply_to,
        about_comic: None,
        about_chapter: None,
        media: vec![NewPostMedia { hash: "b".repeat(64), mime: "image/png".into(), alt_text: String::new() }],
    };
    let root = repo.create_post(post(None)).await.unwrap();
    let reply = repo.create_post(post(Some(root.post.id))).await.unwrap();
    assert_eq!(repo.like_post(root.post.id, profile.id).await.unwrap().like_count, 1);
    assert_eq!(repo.like_post(root.post.id, profile.id).await.unwrap().like_count, 1);

    repo.delete_post(root.post.id).await.unwrap();
    assert!(matches!(repo.get_post(reply.post.id).await, Err(RepoError::NotFound)));
}
