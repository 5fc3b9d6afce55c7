//! The persisted unit of an archive
//!
//! A resource is either a page (bytes plus the content type they were served
//! with) or a redirect record pointing at another URL. Modelling it as an enum
//! keeps the two shapes from ever being mixed in one record.

/// Content type stored for every rewritten HTML page
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A single archived resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Page bytes, HTML after rewriting or opaque bytes otherwise
    Page {
        content: Vec<u8>,
        /// Content type as served by the origin, or empty
        content_type: String,
    },

    /// Redirect record; `target` is root-relative for local targets
    Redirect { target: String },
}

impl Resource {
    /// Creates a page resource
    pub fn page(content: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self::Page {
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates a rewritten HTML page resource
    pub fn html(content: impl Into<Vec<u8>>) -> Self {
        Self::page(content, HTML_CONTENT_TYPE)
    }

    /// Creates a redirect record
    pub fn redirect(target: impl Into<String>) -> Self {
        Self::Redirect {
            target: target.into(),
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// Returns the redirect target, if this is a redirect record
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Redirect { target } => Some(target),
            Self::Page { .. } => None,
        }
    }

    /// Returns the page bytes, if this is a page
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Self::Page { content, .. } => Some(content),
            Self::Redirect { .. } => None,
        }
    }

    /// Returns the page content type, if this is a page
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Page { content_type, .. } => Some(content_type),
            Self::Redirect { .. } => None,
        }
    }
}
