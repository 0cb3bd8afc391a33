//! HTTP-only page source.
//!
//! Serves the markup exactly as the server sent it. There is no live
//! surface, so the page reports no disclosure widgets; content hidden
//! behind `<details>` is still present in the markup and gets extracted.

use api2md_core::Error;
use url::Url;

use super::{DisclosureSurface, LivePage, PageSource, RenderError, RenderOptions, Widget};
use crate::fetch::{FetchClient, FetchConfig};

/// Page source backed by [`FetchClient`].
pub struct StaticSource {
    client: FetchClient,
}

impl StaticSource {
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        Ok(Self { client: FetchClient::new(config)? })
    }
}

#[async_trait::async_trait]
impl PageSource for StaticSource {
    async fn open(&self, url: &Url, _opts: &RenderOptions) -> Result<Box<dyn LivePage>, Error> {
        let response = self.client.fetch(url).await?;

        if !response.is_html() {
            return Err(Error::UnsupportedContent(format!(
                "{} is {}",
                url,
                response.content_type.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(Box::new(StaticPage::new(response.text(), response.final_url)))
    }
}

/// A fetched document with no interactive surface.
#[derive(Debug, Clone)]
pub struct StaticPage {
    html: String,
    final_url: Url,
}

impl StaticPage {
    pub fn new(html: String, final_url: Url) -> Self {
        Self { html, final_url }
    }
}

#[async_trait::async_trait]
impl DisclosureSurface for StaticPage {
    async fn widgets(&self) -> Result<Vec<Widget>, RenderError> {
        Ok(Vec::new())
    }

    async fn is_expanded(&self, _widget: &Widget) -> Result<bool, RenderError> {
        Ok(true)
    }

    async fn expand(&self, _widget: &Widget) -> Result<bool, RenderError> {
        Ok(false)
    }
}

#[async_trait::async_trait]
impl LivePage for StaticPage {
    fn final_url(&self) -> &Url {
        &self.final_url
    }

    async fn html(&self) -> Result<String, RenderError> {
        Ok(self.html.clone())
    }

    async fn close(self: Box<Self>) {}
}
