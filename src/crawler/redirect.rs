//! Redirect resolver and raw capture
//!
//! Some same-origin resources (feeds, oEmbed endpoints) are worth archiving
//! without being crawled as pages. They are reached by following their
//! redirect chain hop by hop, recording every hop in the store, and keeping
//! the final body exactly as served.

use crate::crawler::fetcher::{
    content_type_of, is_html_content_type, is_redirect_status, redirect_location,
    redirect_record,
};
use crate::resource::Resource;
use crate::storage::Store;
use crate::url::{normalize, storage_key, LocalHosts};
use crate::StaticatorError;
use reqwest::{Client, Response};
use url::Url;

/// Maximum number of redirect hops recorded for one chain
pub const MAX_REDIRECTS: usize = 10;

/// Where a redirect chain ended
#[derive(Debug)]
pub enum Resolution {
    /// A non-redirect response; the caller owns the body
    Landed { url: Url, response: Response },

    /// The chain left the site; the target was not fetched
    OffSite(Url),
}

/// Follows redirect chains, persisting every hop
pub struct RedirectResolver<'a> {
    client: &'a Client,
    hosts: &'a LocalHosts,
    store: &'a dyn Store,
}

impl<'a> RedirectResolver<'a> {
    pub fn new(client: &'a Client, hosts: &'a LocalHosts, store: &'a dyn Store) -> Self {
        Self {
            client,
            hosts,
            store,
        }
    }

    /// Follows the redirect chain starting at `start`
    ///
    /// Every hop is normalized and offered to `admit`, the crawl's atomic
    /// check-and-reserve; a hop it refuses ends the chain.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Resolution))` - The chain landed or left the site
    /// * `Ok(None)` - The chain was abandoned: already seen, too long, or a
    ///   `Location` that does not parse
    /// * `Err(StaticatorError)` - Network failure for one hop (per-URL), or a
    ///   store failure (fatal)
    pub async fn resolve<F>(
        &self,
        start: &Url,
        mut admit: F,
    ) -> Result<Option<Resolution>, StaticatorError>
    where
        F: FnMut(&Url) -> bool,
    {
        let mut next = start.clone();
        let mut hops = 0;

        loop {
            let url = normalize(&next)?;
            if !admit(&url) {
                tracing::debug!(url = %url, "Redirect chain reached a seen or over-limit URL");
                return Ok(None);
            }

            tracing::info!(url = %url, "Fetching for capture");
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|source| StaticatorError::Http {
                    url: url.to_string(),
                    source,
                })?;

            if !is_redirect_status(response.status()) {
                return Ok(Some(Resolution::Landed { url, response }));
            }

            if hops >= MAX_REDIRECTS {
                tracing::warn!(url = %start, "Giving up after {} redirects", MAX_REDIRECTS);
                return Ok(None);
            }

            let target = match redirect_location(&url, &response) {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!("{}", e);
                    return Ok(None);
                }
            };

            self.store
                .write(&storage_key(&url)?, &redirect_record(&target, self.hosts))?;
            hops += 1;

            if !self.hosts.is_local(&target) {
                tracing::debug!(url = %url, target = %target, "Redirect chain left the site");
                return Ok(Some(Resolution::OffSite(target)));
            }

            next = target;
        }
    }

    /// Captures a non-HTML resource raw, without crawling it
    ///
    /// HTML landings are left to the page crawl, and off-site targets are
    /// never fetched.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The final body was stored
    /// * `Ok(false)` - Nothing beyond redirect hops was stored
    /// * `Err(StaticatorError)` - See [`RedirectResolver::resolve`]
    pub async fn save_raw<F>(&self, start: &Url, admit: F) -> Result<bool, StaticatorError>
    where
        F: FnMut(&Url) -> bool,
    {
        let (url, response) = match self.resolve(start, admit).await? {
            Some(Resolution::Landed { url, response }) => (url, response),
            Some(Resolution::OffSite(_)) | None => return Ok(false),
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Not capturing error response");
            return Ok(false);
        }

        let content_type = content_type_of(&response);
        if is_html_content_type(&content_type) {
            tracing::debug!(url = %url, "Capture target is HTML, leaving it to the crawl");
            return Ok(false);
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| StaticatorError::Http {
                url: url.to_string(),
                source,
            })?;

        self.store.write(
            &storage_key(&url)?,
            &Resource::page(body.to_vec(), content_type),
        )?;
        tracing::info!(url = %url, "Captured");
        Ok(true)
    }
}
