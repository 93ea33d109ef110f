//! Technology fingerprinting.
//!
//! [`Fingerprinter`] is the seam for plugging in a detection engine. The
//! bundled [`PageFingerprinter`] looks at the page that was already fetched:
//! response headers, the `<meta name="generator">` tag, and the file names of
//! well-known script libraries.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::fetch::Page;
use crate::model::Technologies;

/// Detects the technology stack of a fetched page.
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    /// Returns the human-readable name of this fingerprinter.
    fn name(&self) -> &'static str;

    /// Returns detected technologies grouped by category.
    ///
    /// # Errors
    ///
    /// Implementations may fail (for instance when they call out to a remote
    /// service); callers treat failures as "nothing detected".
    async fn fingerprint(&self, page: &Page) -> Result<Technologies>;
}

/// Header marker -> (category, technology).
const HEADER_MARKERS: &[(&str, &str, &str)] = &[
    ("cf-ray", "cdn", "Cloudflare"),
    ("x-amz-cf-id", "cdn", "Amazon CloudFront"),
    ("x-fastly-request-id", "cdn", "Fastly"),
    ("x-akamai-transformed", "cdn", "Akamai"),
    ("x-vercel-id", "paas", "Vercel"),
    ("x-drupal-cache", "cms", "Drupal"),
    ("x-shopify-stage", "ecommerce", "Shopify"),
];

/// Lowercase library name that starts a script file name -> display name.
///
/// A marker only counts when the file name continues with `.`, `-` or `_`,
/// so `ember` matches `ember.min.js` but not `member.js`.
const SCRIPT_LIBRARIES: &[(&str, &str)] = &[
    ("jquery", "jQuery"),
    ("react", "React"),
    ("angular", "AngularJS"),
    ("vue", "Vue.js"),
    ("bootstrap", "Bootstrap"),
    ("lodash", "Lodash"),
    ("moment", "Moment.js"),
    ("backbone", "Backbone.js"),
    ("ember", "Ember.js"),
];

/// Lowercase URL fragment of a hosted tag -> name.
const SCRIPT_URLS: &[(&str, &str)] = &[
    ("googletagmanager.com/gtag/js", "Google Analytics"),
    ("google-analytics.com/", "Google Analytics"),
    ("googletagmanager.com/gtm.js", "Google Tag Manager"),
];

static GENERATOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="generator"]"#)
        .expect("static generator selector should always parse")
});

static SCRIPT_SRC: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[src]").expect("static selector 'script[src]' should always parse")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct PageFingerprinter;

impl PageFingerprinter {
    fn from_headers(headers: &HeaderMap, found: &mut Technologies) {
        if let Some(server) = header_value(headers, "server") {
            push_unique(found, "web-servers", product_name(server));
        }
        if let Some(powered_by) = header_value(headers, "x-powered-by") {
            for product in powered_by.split(',') {
                push_unique(found, "web-frameworks", product_name(product.trim()));
            }
        }
        for (header, category, name) in HEADER_MARKERS {
            if headers.contains_key(*header) {
                push_unique(found, category, (*name).to_string());
            }
        }
    }

    fn from_body(body: &str, found: &mut Technologies) {
        let document = Html::parse_document(body);

        for meta in document.select(&GENERATOR) {
            if let Some(content) = meta.value().attr("content").map(str::trim) {
                if !content.is_empty() {
                    push_unique(found, "cms", content.to_string());
                }
            }
        }

        for script in document.select(&SCRIPT_SRC) {
            let Some(src) = script.value().attr("src") else {
                continue;
            };
            let src = src.to_ascii_lowercase();
            let name = file_name(&src);
            for (marker, library) in SCRIPT_LIBRARIES {
                if starts_library_name(name, marker) {
                    push_unique(found, "javascript-frameworks", (*library).to_string());
                }
            }
            for (marker, tag) in SCRIPT_URLS {
                if src.contains(marker) {
                    push_unique(found, "analytics", (*tag).to_string());
                }
            }
        }
    }
}

#[async_trait]
impl Fingerprinter for PageFingerprinter {
    fn name(&self) -> &'static str {
        "page"
    }

    async fn fingerprint(&self, page: &Page) -> Result<Technologies> {
        let mut found = Technologies::new();
        Self::from_headers(&page.headers, &mut found);
        Self::from_body(&page.body, &mut found);
        Ok(found)
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Last path segment of a script URL, without query or fragment.
fn file_name(src: &str) -> &str {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.rsplit('/').next().unwrap_or(path)
}

fn starts_library_name(file_name: &str, library: &str) -> bool {
    file_name
        .strip_prefix(library)
        .is_some_and(|rest| rest.starts_with(['.', '-', '_']))
}

/// `nginx/1.25.3 (Ubuntu)` -> `nginx`; `PHP/8.2.1` -> `PHP`.
fn product_name(value: &str) -> String {
    value
        .split(['/', ' '])
        .next()
        .unwrap_or(value)
        .to_string()
}

fn push_unique(found: &mut Technologies, category: &str, name: String) {
    if name.is_empty() {
        return;
    }
    let names = found.entry(category.to_string()).or_default();
    if !names.contains(&name) {
        names.push(name);
    }
}
