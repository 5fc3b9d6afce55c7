//! HTML link rewriter ("statication")
//!
//! This module streams an HTML document through `lol_html` and, in one pass:
//! - Rewrites same-origin absolute references to root-relative form
//! - Collects same-origin, non-asset anchor targets to crawl next
//! - Neutralizes same-origin form actions
//! - Scrubs the origin host from comments and known inline script paths
//!
//! Everything the rules do not touch is emitted byte-for-byte.

use crate::config::HeadLinkMode;
use crate::url::{looks_dynamic, root_relative, LocalHosts};
use lol_html::errors::RewritingError;
use lol_html::html_content::{ContentType, Element};
use lol_html::{doc_comments, element, text, HtmlRewriter, Settings};
use std::cell::RefCell;
use std::collections::BTreeMap;
use url::Url;

/// Static asset paths bundled by the CMS and referenced from inline scripts
/// with JSON-escaped absolute URLs
pub const SCRIPT_ASSET_PATHS: &[&str] = &[
    r"\/wp-includes\/js\/wp-emoji-release.min.js",
    r"\/wp-content\/plugins\/jetpack\/_inc\/build\/carousel\/swiper-bundle.min.js",
];

/// Image attributes holding single URLs besides `src`
const IMAGE_DATA_ATTRS: &[&str] = &[
    "data-large-file",
    "data-medium-file",
    "data-orig-file",
    "data-permalink",
];

/// URLs found while rewriting a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    /// Same-origin pages to crawl, absolute, in document order
    pub pages: Vec<Url>,

    /// Same-origin resources to capture raw without crawling
    pub captures: Vec<Url>,
}

impl Discovered {
    fn extend(&mut self, other: Discovered) {
        self.pages.extend(other.pages);
        self.captures.extend(other.captures);
    }
}

/// A rewritten document
#[derive(Debug, Clone)]
pub struct Staticated {
    pub content: Vec<u8>,
    pub discovered: Discovered,
}

/// Read/write access to an element's attributes
///
/// Implemented for `lol_html` elements and for plain maps, so each rule can be
/// exercised without a parser.
pub trait Attributes {
    fn attr(&self, name: &str) -> Option<String>;
    fn set_attr(&mut self, name: &str, value: &str);
}

impl Attributes for Element<'_, '_> {
    fn attr(&self, name: &str) -> Option<String> {
        self.get_attribute(name)
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        if let Err(e) = self.set_attribute(name, value) {
            tracing::debug!("Could not set attribute {}: {}", name, e);
        }
    }
}

impl Attributes for BTreeMap<String, String> {
    fn attr(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        self.insert(name.to_string(), value.to_string());
    }
}

/// Elements the rewriter has rules for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Anchor,
    Image,
    Link,
    Meta,
    Script,
    Form,
}

impl ElementKind {
    pub const ALL: [ElementKind; 6] = [
        Self::Anchor,
        Self::Image,
        Self::Link,
        Self::Meta,
        Self::Script,
        Self::Form,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "a" => Some(Self::Anchor),
            "img" => Some(Self::Image),
            "link" => Some(Self::Link),
            "meta" => Some(Self::Meta),
            "script" => Some(Self::Script),
            "form" => Some(Self::Form),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Anchor => "a",
            Self::Image => "img",
            Self::Link => "link",
            Self::Meta => "meta",
            Self::Script => "script",
            Self::Form => "form",
        }
    }

    /// Applies this kind's rule to an element on `page`
    pub fn rewrite(
        &self,
        el: &mut impl Attributes,
        page: &Url,
        rewriter: &LinkRewriter,
    ) -> Discovered {
        let rule = Rule { page, rewriter };
        match self {
            Self::Anchor => rule.anchor(el),
            Self::Image => rule.image(el),
            Self::Link => rule.link(el),
            Self::Meta => rule.meta(el),
            Self::Script => rule.script(el),
            Self::Form => rule.form(el),
        }
    }
}

/// Rewrites documents of one site
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    hosts: LocalHosts,
    head_links: HeadLinkMode,
}

impl LinkRewriter {
    pub fn new(hosts: LocalHosts, head_links: HeadLinkMode) -> Self {
        Self { hosts, head_links }
    }

    pub fn hosts(&self) -> &LocalHosts {
        &self.hosts
    }

    /// Rewrites an HTML document fetched from `page`
    ///
    /// # Arguments
    ///
    /// * `html` - The raw document bytes
    /// * `page` - The URL the document was fetched from, used to resolve
    ///   relative references
    ///
    /// # Returns
    ///
    /// * `Ok(Staticated)` - The rewritten document and the URLs it references
    /// * `Err(RewritingError)` - The streaming rewriter gave up on the input
    pub fn staticate(&self, html: &[u8], page: &Url) -> Result<Staticated, RewritingError> {
        let discovered = RefCell::new(Discovered::default());
        let script_text = RefCell::new(String::new());
        let prefixes = self.origin_prefixes(page);
        let mut content = Vec::with_capacity(html.len());

        let mut element_handlers = Vec::with_capacity(ElementKind::ALL.len() + 1);
        for kind in ElementKind::ALL {
            let discovered = &discovered;
            element_handlers.push(element!(kind.tag(), move |el| {
                let found = kind.rewrite(el, page, self);
                discovered.borrow_mut().extend(found);
                Ok(())
            }));
        }

        element_handlers.push(text!("script", |chunk| {
            let mut buffered = script_text.borrow_mut();
            buffered.push_str(chunk.as_str());

            if chunk.last_in_text_node() {
                let scrubbed = scrub_script(&buffered, &prefixes);
                chunk.replace(&scrubbed, ContentType::Html);
                buffered.clear();
            } else {
                chunk.remove();
            }
            Ok(())
        }));

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: element_handlers,
                document_content_handlers: vec![doc_comments!(|comment| {
                    let text = comment.text();
                    let scrubbed = scrub_comment(&text, &prefixes);
                    if scrubbed != text {
                        comment.set_text(&scrubbed)?;
                    }
                    Ok(())
                })],
                ..Settings::default()
            },
            |chunk: &[u8]| content.extend_from_slice(chunk),
        );

        rewriter.write(html)?;
        rewriter.end()?;

        Ok(Staticated {
            content,
            discovered: discovered.into_inner(),
        })
    }

    /// Host spellings that may prefix same-origin URLs in raw text, with the
    /// page's port where it has one
    fn origin_prefixes(&self, page: &Url) -> Vec<String> {
        let mut prefixes = Vec::new();
        for host in self.hosts.spellings() {
            if let Some(port) = page.port() {
                prefixes.push(format!("{}:{}", host, port));
            }
            prefixes.push(host);
        }
        prefixes
    }

    /// Returns the root-relative replacement for an attribute value, if the
    /// value is an absolute (or protocol-relative) same-origin URL
    ///
    /// Values that are already relative are never rewritten, which keeps
    /// rewriting idempotent.
    fn relativize(&self, value: &str, page: &Url) -> Option<String> {
        let value = value.trim();
        if !has_authority(value) {
            return None;
        }

        let url = page.join(value).ok()?;
        if !self.hosts.is_local(&url) {
            return None;
        }

        let relative = root_relative(&url);
        (relative != value).then(|| relative.to_string())
    }

    fn relativize_attr(&self, el: &mut impl Attributes, name: &str, page: &Url) {
        if let Some(relative) = el.attr(name).and_then(|v| self.relativize(&v, page)) {
            el.set_attr(name, &relative);
        }
    }
}

/// One rule application: the page being rewritten plus the site settings
struct Rule<'a> {
    page: &'a Url,
    rewriter: &'a LinkRewriter,
}

impl Rule<'_> {
    fn anchor(&self, el: &mut impl Attributes) -> Discovered {
        let mut found = Discovered::default();
        let Some(href) = el.attr("href") else {
            return found;
        };

        let trimmed = href.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            tracing::debug!("Skipping fragment-only link {:?}", href);
            return found;
        }

        let url = match self.page.join(trimmed) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping unparseable link {:?}: {}", href, e);
                return found;
            }
        };

        if !self.rewriter.hosts.is_local(&url) {
            tracing::debug!("Skipping non-local link {}", url);
            return found;
        }

        if looks_dynamic(&url) {
            found.pages.push(url);
        } else {
            tracing::debug!("Skipping link that looks like a static asset {}", url);
        }

        self.rewriter.relativize_attr(el, "href", self.page);
        found
    }

    fn image(&self, el: &mut impl Attributes) -> Discovered {
        self.rewriter.relativize_attr(el, "src", self.page);

        if let Some(srcset) = el.attr("srcset") {
            if let Some(rewritten) = self.srcset(&srcset) {
                el.set_attr("srcset", &rewritten);
            }
        }

        for name in IMAGE_DATA_ATTRS {
            self.rewriter.relativize_attr(el, name, self.page);
        }

        Discovered::default()
    }

    /// Relativizes the same-origin candidates of a `srcset` value, keeping
    /// descriptors, ordering and spacing
    fn srcset(&self, srcset: &str) -> Option<String> {
        let mut changed = false;
        let candidates: Vec<String> = srcset
            .split(',')
            .map(|candidate| {
                let Some(src) = candidate.split_whitespace().next() else {
                    return candidate.to_string();
                };
                match self.rewriter.relativize(src, self.page) {
                    Some(relative) => {
                        changed = true;
                        candidate.replacen(src, &relative, 1)
                    }
                    None => candidate.to_string(),
                }
            })
            .collect();

        changed.then(|| candidates.join(","))
    }

    fn link(&self, el: &mut impl Attributes) -> Discovered {
        let mut found = Discovered::default();
        let mode = self.rewriter.head_links;
        if mode == HeadLinkMode::Skip {
            return found;
        }

        if mode == HeadLinkMode::Capture && is_alternate(el.attr("rel").as_deref()) {
            let target = el
                .attr("href")
                .and_then(|href| self.page.join(href.trim()).ok())
                .filter(|url| self.rewriter.hosts.is_local(url) && looks_dynamic(url));
            if let Some(url) = target {
                found.captures.push(url);
            }
        }

        self.rewriter.relativize_attr(el, "href", self.page);
        found
    }

    fn meta(&self, el: &mut impl Attributes) -> Discovered {
        if self.rewriter.head_links != HeadLinkMode::Skip {
            self.rewriter.relativize_attr(el, "content", self.page);
        }
        Discovered::default()
    }

    fn script(&self, el: &mut impl Attributes) -> Discovered {
        self.rewriter.relativize_attr(el, "src", self.page);
        Discovered::default()
    }

    fn form(&self, el: &mut impl Attributes) -> Discovered {
        let Some(action) = el.attr("action") else {
            return Discovered::default();
        };

        let local = self
            .page
            .join(action.trim())
            .map_or(false, |url| self.rewriter.hosts.is_local(&url));
        if local && action != "#" {
            el.set_attr("action", "#");
        }

        Discovered::default()
    }
}

/// True for absolute URLs with a host and for protocol-relative URLs
fn has_authority(value: &str) -> bool {
    if value.starts_with("//") {
        return true;
    }

    match value.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn is_alternate(rel: Option<&str>) -> bool {
    rel.map_or(false, |rel| {
        rel.split_whitespace()
            .any(|token| token.eq_ignore_ascii_case("alternate"))
    })
}

/// Replaces `http(s)://<host>/` with `/` for every local host spelling
fn scrub_comment(text: &str, prefixes: &[String]) -> String {
    let mut text = text.to_string();
    for host in prefixes {
        text = text.replace(&format!("https://{}/", host), "/");
        text = text.replace(&format!("http://{}/", host), "/");
    }
    text
}

/// Strips the JSON-escaped origin prefix from known asset paths
fn scrub_script(script: &str, prefixes: &[String]) -> String {
    let mut script = script.to_string();
    for host in prefixes {
        for path in SCRIPT_ASSET_PATHS {
            script = script.replace(&format!(r"https:\/\/{}{}", host, path), path);
            script = script.replace(&format!(r"http:\/\/{}{}", host, path), path);
        }
    }
    script
}
