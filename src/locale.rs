use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, Error, FromRequest, HttpRequest};
use serde::Deserialize;

use crate::routes::AppState;

#[derive(Debug, Clone)]
pub struct LocaleConfig {
    pub default_language: String,
    pub supported: Vec<String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default_language: "en".into(),
            supported: vec!["en".into(), "vi".into(), "ja".into(), "fr".into()],
        }
    }
}

impl LocaleConfig {
    /// Configured spelling of `code`, matched case-insensitively.
    pub fn canonical(&self, code: &str) -> Option<&str> {
        self.supported.iter().find(|s| s.eq_ignore_ascii_case(code)).map(String::as_str)
    }

    /// Best supported language from an `Accept-Language` value. Tags are
    /// tried by descending quality; a region tag falls back to its primary
    /// subtag (`fr-CH` → `fr`).
    pub fn negotiate(&self, accept_language: &str) -> Option<String> {
        let mut tags: Vec<(f32, usize, &str)> = accept_language
            .split(',')
            .enumerate()
            .filter_map(|(pos, part)| {
                let mut it = part.trim().split(';');
                let tag = it.next()?.trim();
                if tag.is_empty() || tag == "*" {
                    return None;
                }
                let q = it
                    .filter_map(|p| p.trim().strip_prefix("q="))
                    .find_map(|v| v.parse::<f32>().ok())
                    .unwrap_or(1.0);
                (q > 0.0).then_some((q, pos, tag))
            })
            .collect();
        tags.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        tags.into_iter().find_map(|(_, _, tag)| {
            self.canonical(tag)
                .or_else(|| tag.split('-').next().and_then(|primary| self.canonical(primary)))
                .map(str::to_string)
        })
    }

    pub fn pick(&self, query_lang: Option<&str>, accept_language: Option<&str>) -> String {
        query_lang
            .and_then(|l| self.canonical(l))
            .map(str::to_string)
            .or_else(|| accept_language.and_then(|h| self.negotiate(h)))
            .unwrap_or_else(|| self.default_language.clone())
    }
}

#[derive(Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// Language the caller wants content in: `?lang=`, then `Accept-Language`,
/// then the site default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLanguage(pub String);

impl FromRequest for RequestLanguage {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
        let fallback = LocaleConfig::default();
        let cfg = req
            .app_data::<web::Data<AppState>>()
            .map(|s| &s.locale)
            .unwrap_or(&fallback);
        let query = web::Query::<LangQuery>::from_query(req.query_string()).ok();
        let query_lang = query.as_ref().and_then(|q| q.lang.as_deref());
        let accept = req
            .headers()
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        ready(Ok(RequestLanguage(cfg.pick(query_lang, accept))))
    }
}
