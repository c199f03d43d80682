//! Write-time guards.
//!
//! Field-local checks live in [`Validate`] impls on the write payloads and
//! run before a store is touched. Checks that need sibling or parent rows
//! (default language, comic cross-reference, page append bound, chapter
//! numbering) are plain functions the stores call inside their write
//! critical section, so a failed check never leaves a partial write behind.

use std::collections::BTreeMap;
use std::fmt;

use crate::models::*;

pub const NON_FIELD: &str = "non_field_errors";

pub const MAX_TITLE: usize = 200;
pub const MAX_SUMMARY: usize = 1000;
pub const MAX_POST_TEXT: usize = 1000;
pub const MAX_ALT_TEXT: usize = 1000;
pub const MAX_BIO: usize = 500;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("translation language can not be the same as the default language")]
    SameAsDefaultLanguage,
    #[error("chapter's comic must be the same as comic translation's comic")]
    ComicMismatch,
    #[error("page number {number} is too large; the next page number is at most {max}")]
    PageNumberTooLarge { number: i32, max: i64 },
    #[error("page number must be at least 1")]
    PageNumberTooSmall,
    #[error("chapter number must be empty for extra chapters and set for regular chapters")]
    ChapterNumbering,
    #[error("chapter counter must be at least 1")]
    CounterTooSmall,
    #[error("this field may not be blank")]
    Blank,
    #[error("ensure this field has at most {0} characters")]
    TooLong(usize),
    #[error("not a valid language code")]
    InvalidLanguage,
    #[error("already exists")]
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub violation: Violation,
}

impl FieldError {
    pub fn new(field: impl Into<String>, violation: Violation) -> Self {
        Self { field: field.into(), violation }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.violation)
    }
}

/// Every violation found for one write attempt.
#[derive(thiserror::Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", self.summary())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, violation: Violation) {
        self.0.push(FieldError::new(field, violation));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, violation: &Violation) -> bool {
        self.0.iter().any(|e| &e.violation == violation)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Messages grouped per field, in field order.
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for e in &self.0 {
            map.entry(e.field.clone()).or_default().push(e.violation.to_string());
        }
        map
    }

    fn summary(&self) -> String {
        self.0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(e: FieldError) -> Self {
        ValidationErrors(vec![e])
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

// ---------------- field helpers ----------------

fn text(errs: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errs.push(field, Violation::Blank);
    } else if value.chars().count() > max {
        errs.push(field, Violation::TooLong(max));
    }
}

fn optional_text(errs: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        if v.chars().count() > max {
            errs.push(field, Violation::TooLong(max));
        }
    }
}

/// Language codes look like `en`, `vi` or `zh-hans`.
pub fn is_language_code(code: &str) -> bool {
    (2..=10).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !code.starts_with('-')
        && !code.ends_with('-')
}

fn language(errs: &mut ValidationErrors, field: &str, code: &str) {
    if !is_language_code(code) {
        errs.push(field, Violation::InvalidLanguage);
    }
}

// ---------------- cross-row guards ----------------

pub fn check_translation_language(language: &str, default_language: &str) -> Result<(), FieldError> {
    if language == default_language {
        return Err(FieldError::new("language", Violation::SameAsDefaultLanguage));
    }
    Ok(())
}

pub fn check_chapter_translation_comic(chapter_comic: Id, translation_comic: Id) -> Result<(), FieldError> {
    if chapter_comic != translation_comic {
        return Err(FieldError::new(NON_FIELD, Violation::ComicMismatch));
    }
    Ok(())
}

/// `number` set XOR `extra`.
pub fn check_chapter_numbering(number: Option<i32>, extra: bool) -> Result<(), FieldError> {
    match (number, extra) {
        (Some(_), false) | (None, true) => Ok(()),
        _ => Err(FieldError::new("number", Violation::ChapterNumbering)),
    }
}

/// Append bound: a page may take any number up to one past its siblings.
/// `siblings` counts the other pages of the same parent, excluding the page
/// being saved.
pub fn check_page_number(number: i32, siblings: usize) -> Result<(), FieldError> {
    if number < 1 {
        return Err(FieldError::new("number", Violation::PageNumberTooSmall));
    }
    let max = siblings as i64 + 1;
    if i64::from(number) > max {
        return Err(FieldError::new("number", Violation::PageNumberTooLarge { number, max }));
    }
    Ok(())
}

pub fn duplicate(field: &str) -> FieldError {
    FieldError::new(field, Violation::Duplicate)
}

// ---------------- payload validation ----------------

impl Validate for NewProfile {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "name", &self.name, MAX_TITLE);
        optional_text(&mut errs, "bio", self.bio.as_deref(), MAX_BIO);
        errs.into_result()
    }
}

impl Validate for NewAuthor {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "pen_name", &self.pen_name, MAX_TITLE);
        language(&mut errs, "default_language", &self.default_language);
        errs.into_result()
    }
}

impl Validate for NewAuthorTranslation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "pen_name", &self.pen_name, MAX_TITLE);
        language(&mut errs, "language", &self.language);
        errs.into_result()
    }
}

impl Validate for NewComic {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "title", &self.title, MAX_TITLE);
        optional_text(&mut errs, "summary", self.summary.as_deref(), MAX_SUMMARY);
        language(&mut errs, "default_language", &self.default_language);
        errs.into_result()
    }
}

impl Validate for NewComicTranslation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "title", &self.title, MAX_TITLE);
        text(&mut errs, "summary", &self.summary, MAX_SUMMARY);
        language(&mut errs, "language", &self.language);
        errs.into_result()
    }
}

impl Validate for NewChapter {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "title", &self.title, MAX_TITLE);
        if self.counter < 1 {
            errs.push("counter", Violation::CounterTooSmall);
        }
        if let Err(e) = check_chapter_numbering(self.number, self.extra) {
            errs.0.push(e);
        }
        errs.into_result()
    }
}

impl Validate for NewChapterTranslation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "title", &self.title, MAX_TITLE);
        errs.into_result()
    }
}

impl Validate for NewPage {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "image_hash", &self.image_hash, MAX_TITLE);
        text(&mut errs, "mime", &self.mime, MAX_TITLE);
        errs.into_result()
    }
}

impl Validate for NewPageTranslation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "image_hash", &self.image_hash, MAX_TITLE);
        text(&mut errs, "mime", &self.mime, MAX_TITLE);
        errs.into_result()
    }
}

impl Validate for Language {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        language(&mut errs, "code", &self.code);
        errs.into_result()
    }
}

impl Validate for NewPost {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        text(&mut errs, "text_content", &self.text_content, MAX_POST_TEXT);
        for (i, m) in self.media.iter().enumerate() {
            optional_text(&mut errs, &format!("media[{i}].alt_text"), Some(&m.alt_text), MAX_ALT_TEXT);
        }
        errs.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_language_must_differ_from_default() {
        let err = check_translation_language("en", "en").unwrap_err();
        assert_eq!(err.field, "language");
        assert_eq!(err.violation, Violation::SameAsDefaultLanguage);
        assert!(check_translation_language("fr", "en").is_ok());
    }

    #[test]
    fn chapter_numbering_is_exclusive() {
        assert!(check_chapter_numbering(Some(1), false).is_ok());
        assert!(check_chapter_numbering(None, true).is_ok());
        assert!(check_chapter_numbering(Some(1), true).is_err());
        assert!(check_chapter_numbering(None, false).is_err());
    }

    #[test]
    fn page_number_append_bound() {
        // three existing pages: 4 appends, 5 would leave a gap
        assert!(check_page_number(4, 3).is_ok());
        let err = check_page_number(5, 3).unwrap_err();
        assert_eq!(err.violation, Violation::PageNumberTooLarge { number: 5, max: 4 });
        assert!(check_page_number(1, 0).is_ok());
        assert_eq!(check_page_number(0, 0).unwrap_err().violation, Violation::PageNumberTooSmall);
    }

    #[test]
    fn comic_cross_reference() {
        assert!(check_chapter_translation_comic(1, 1).is_ok());
        assert_eq!(check_chapter_translation_comic(1, 2).unwrap_err().field, NON_FIELD);
    }

    #[test]
    fn language_codes() {
        for ok in ["en", "vi", "zh-hans", "pt-br"] {
            assert!(is_language_code(ok), "{ok}");
        }
        for bad in ["", "e", "en_US", "-en", "averyverylongcode", "en/"] {
            assert!(!is_language_code(bad), "{bad}");
        }
    }

    #[test]
    fn new_chapter_collects_every_violation() {
        let c = NewChapter { comic_id: 1, title: " ".into(), number: Some(2), counter: 0, extra: true, cover_hash: None };
        let errs = c.validate().unwrap_err();
        let fields = errs.by_field();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("counter"));
        assert!(fields.contains_key("number"));
    }

    #[test]
    fn post_text_limits() {
        let mut p = NewPost {
            profile_id: 1,
            text_content: "x".repeat(MAX_POST_TEXT + 1),
            writing_mode: WritingMode::default(),
            reply_to: None,
            about_comic: None,
            about_chapter: None,
            media: vec![],
        };
        assert!(p.validate().unwrap_err().has(&Violation::TooLong(MAX_POST_TEXT)));
        p.text_content = "hello".into();
        assert!(p.validate().is_ok());
    }
}
