//! Configuration-driven adapter for sites that can be scraped with CSS
//! selectors.

use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::Client;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::{CatalogItem, ContentKind};
use crate::config::{SelectorConfig, SourceConfig};

use super::{Details, Episode, SiteAdapter, SourceError, StreamLink};

/// Where a value is read from inside an element.
///
/// The text or an attribute of the first descendant matching `selector`,
/// or of the element itself when there is no selector.
#[derive(Debug, Clone)]
struct Field {
    selector: Option<Selector>,
    attr: Option<String>,
}

impl Field {
    /// Parse `"css"`, `"css@attr"`, `"@attr"` or `""`.
    fn parse(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();
        let (css, attr) = match spec.rsplit_once('@') {
            Some((css, attr)) if is_attr_name(attr) => (css.trim(), Some(attr.to_string())),
            _ => (spec, None),
        };
        let selector = if css.is_empty() {
            None
        } else {
            Some(Selector::parse(css).map_err(|e| format!("invalid selector `{}`: {}", css, e))?)
        };
        Ok(Self { selector, attr })
    }

    fn parse_opt(spec: &Option<String>) -> Result<Option<Self>, String> {
        spec.as_deref().map(Self::parse).transpose()
    }

    /// The first non-blank value among the matches under `scope`.
    fn extract(&self, scope: ElementRef<'_>) -> Option<String> {
        match &self.selector {
            Some(selector) => scope.select(selector).find_map(|el| self.value_of(el)),
            None => self.value_of(scope),
        }
    }

    /// Values for every match under `scope`, in document order.
    fn extract_all(&self, scope: ElementRef<'_>) -> Vec<String> {
        match &self.selector {
            Some(selector) => scope.select(selector).filter_map(|el| self.value_of(el)).collect(),
            None => self.value_of(scope).into_iter().collect(),
        }
    }

    fn value_of(&self, element: ElementRef<'_>) -> Option<String> {
        let value = match &self.attr {
            Some(attr) => element.value().attr(attr)?.trim().to_string(),
            None => collapse_whitespace(&element.text().collect::<String>()),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Compiled `SelectorConfig`.
#[derive(Debug, Clone)]
pub(crate) struct SelectorSet {
    item: Selector,
    item_url: Field,
    item_title: Field,
    item_poster: Option<Field>,
    title: Field,
    poster: Option<Field>,
    plot: Option<Field>,
    episode: Option<Selector>,
    episode_url: Field,
    episode_season: Option<Field>,
    episode_number: Option<Field>,
    episode_name: Field,
    embed: Option<Field>,
}

impl SelectorSet {
    /// Compile every selector; the error names the offending field.
    pub(crate) fn compile(config: &SelectorConfig) -> Result<Self, String> {
        let field = |name: &str, spec: &str| Field::parse(spec).map_err(|e| format!("{}: {}", name, e));
        let field_opt =
            |name: &str, spec: &Option<String>| Field::parse_opt(spec).map_err(|e| format!("{}: {}", name, e));
        let element = |name: &str, css: &str| {
            Selector::parse(css).map_err(|e| format!("{}: invalid selector `{}`: {}", name, css, e))
        };

        Ok(Self {
            item: element("item", &config.item)?,
            item_url: field("item_url", &config.item_url)?,
            item_title: field("item_title", config.item_title.as_deref().unwrap_or(""))?,
            item_poster: field_opt("item_poster", &config.item_poster)?,
            title: field("title", &config.title)?,
            poster: field_opt("poster", &config.poster)?,
            plot: field_opt("plot", &config.plot)?,
            episode: config
                .episode
                .as_deref()
                .map(|css| element("episode", css))
                .transpose()?,
            episode_url: field("episode_url", &config.episode_url)?,
            episode_season: field_opt("episode_season", &config.episode_season)?,
            episode_number: field_opt("episode_number", &config.episode_number)?,
            episode_name: field("episode_name", config.episode_name.as_deref().unwrap_or(""))?,
            embed: field_opt("embed", &config.embed)?,
        })
    }
}

/// A `SiteAdapter` whose scraping rules come entirely from `SourceConfig`.
///
/// Each adapter owns its HTTP client and therefore its cookie store, so a
/// challenge cookie picked up by one source is never sent to another.
/// Relative links are resolved against the page they appear on.
pub struct HtmlSiteAdapter {
    id: String,
    name: String,
    base_url: Url,
    search_path: Option<String>,
    default_kind: ContentKind,
    max_embeds: usize,
    client: Client,
    selectors: SelectorSet,
    stream: Regex,
}

impl std::fmt::Debug for HtmlSiteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlSiteAdapter")
            .field("id", &self.id)
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HtmlSiteAdapter {
    /// Build an adapter, compiling its selectors and HTTP client.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true);
        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let client = builder
            .build()
            .map_err(|e| SourceError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            SourceError::Internal(format!("{}: invalid base_url: {}", config.id, e))
        })?;
        // Relative locators resolve below the configured path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let selectors = SelectorSet::compile(&config.selectors)
            .map_err(|e| SourceError::Internal(format!("{}: {}", config.id, e)))?;
        let stream = Regex::new(&config.stream_pattern).map_err(|e| {
            SourceError::Internal(format!("{}: invalid stream pattern: {}", config.id, e))
        })?;

        Ok(Self {
            id: config.id.clone(),
            name: config.display_name().to_string(),
            base_url,
            search_path: config.search_path.clone(),
            default_kind: config.default_kind,
            max_embeds: config.max_embeds,
            client,
            selectors,
            stream,
        })
    }

    /// Resolve a locator or stored URL against the site root.
    fn site_url(&self, url: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(url.trim())
            .map_err(|e| SourceError::Internal(format!("Invalid URL {}: {}", url, e)))
    }

    /// Fetch a page body.
    async fn get_page(&self, url: &Url) -> Result<String, SourceError> {
        debug!(source = %self.id, url = %url, "Fetching page");

        let response = self.client.get(url.as_str()).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response.text().await?)
    }

    fn parse_items(&self, page: &Url, html: &str) -> Vec<CatalogItem> {
        let document = Html::parse_document(html);
        let s = &self.selectors;
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for element in document.select(&s.item) {
            let Some(url) = s.item_url.extract(element).and_then(|href| join(page, &href)) else {
                continue;
            };
            let Some(title) = s.item_title.extract(element) else {
                continue;
            };
            if !seen.insert(url.clone()) {
                continue;
            }

            let mut item = CatalogItem::new(title, self.id.clone(), url, self.default_kind);
            if let Some(poster) = s
                .item_poster
                .as_ref()
                .and_then(|f| f.extract(element))
                .and_then(|src| join(page, &src))
            {
                item = item.with_poster(poster);
            }
            items.push(item);
        }

        items
    }

    fn parse_details(&self, page: &Url, html: &str) -> Details {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let s = &self.selectors;

        let episodes = match &s.episode {
            Some(selector) => document
                .select(selector)
                .filter_map(|el| {
                    let url = s.episode_url.extract(el).and_then(|href| join(page, &href))?;
                    Some(Episode {
                        season: number_in(&s.episode_season, el),
                        episode: number_in(&s.episode_number, el),
                        name: s.episode_name.extract(el),
                        url,
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        Details {
            title: s.title.extract(root).unwrap_or_default(),
            poster_url: s
                .poster
                .as_ref()
                .and_then(|f| f.extract(root))
                .and_then(|src| join(page, &src)),
            plot: s.plot.as_ref().and_then(|f| f.extract(root)),
            episodes,
        }
    }

    /// Stream URLs in `html` plus the embed pages it points at.
    fn scan_page(&self, page: &Url, html: &str) -> (Vec<String>, Vec<Url>) {
        let document = Html::parse_document(html);

        let mut seen = HashSet::new();
        let embeds = match &self.selectors.embed {
            Some(field) => field
                .extract_all(document.root_element())
                .iter()
                .filter_map(|src| page.join(src).ok())
                .filter(|url| seen.insert(url.clone()))
                .take(self.max_embeds)
                .collect(),
            None => Vec::new(),
        };

        (self.stream_urls(&document), embeds)
    }

    /// Match the stream pattern against every text node and attribute
    /// value, so entity-encoded URLs come out decoded.
    fn stream_urls(&self, document: &Html) -> Vec<String> {
        let mut urls = Vec::new();
        for node in document.tree.values() {
            match node {
                Node::Text(text) => self.match_streams(text, &mut urls),
                Node::Element(element) => {
                    for (_, value) in element.attrs() {
                        self.match_streams(value, &mut urls);
                    }
                }
                _ => {}
            }
        }
        urls
    }

    fn match_streams(&self, text: &str, out: &mut Vec<String>) {
        // Players often embed URLs in JSON with escaped slashes.
        let text = text.replace("\\/", "/");
        out.extend(self.stream.find_iter(&text).map(|m| m.as_str().to_string()));
    }

    /// Append the links in `urls` that are not yet in `seen`.
    fn push_links(
        &self,
        urls: Vec<String>,
        referer: &Url,
        seen: &mut HashSet<String>,
        out: &mut Vec<StreamLink>,
    ) {
        for url in urls {
            if seen.insert(url.clone()) {
                out.push(
                    StreamLink::new(self.name.clone(), self.name.clone(), url)
                        .with_referer(referer.as_str()),
                );
            }
        }
    }
}

#[async_trait]
impl SiteAdapter for HtmlSiteAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_catalog(&self, locator: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let url = self.site_url(locator)?;
        let html = self.get_page(&url).await?;
        let items = self.parse_items(&url, &html);
        debug!(source = %self.id, results = items.len(), "Catalog page parsed");
        Ok(items)
    }

    async fn fetch_details(&self, url: &str) -> Result<Details, SourceError> {
        let page = self.site_url(url)?;
        let html = self.get_page(&page).await?;
        let details = self.parse_details(&page, &html);
        if details.title.is_empty() {
            return Err(SourceError::Parse(format!("No title found at {}", page)));
        }
        Ok(details)
    }

    async fn resolve_streams(&self, url: &str) -> Result<Vec<StreamLink>, SourceError> {
        let page = self.site_url(url)?;
        let html = self.get_page(&page).await?;
        let (found, embeds) = self.scan_page(&page, &html);

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        self.push_links(found, &page, &mut seen, &mut links);

        let pages = futures::future::join_all(embeds.iter().map(|embed| self.get_page(embed))).await;
        for (embed, result) in embeds.iter().zip(pages) {
            match result {
                Ok(embed_html) => {
                    let (found, _) = self.scan_page(embed, &embed_html);
                    self.push_links(found, embed, &mut seen, &mut links);
                }
                Err(e) => warn!(source = %self.id, embed = %embed, error = %e, "Embed fetch failed"),
            }
        }

        debug!(source = %self.id, links = links.len(), "Streams extracted");
        Ok(links)
    }

    fn supports_search(&self) -> bool {
        self.search_path.is_some()
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let Some(path) = &self.search_path else {
            return Err(SourceError::Unsupported(format!("{} has no search", self.id)));
        };
        let url = self.site_url(&path.replace("{query}", &urlencoding::encode(query)))?;
        let html = self.get_page(&url).await?;
        Ok(self.parse_items(&url, &html))
    }
}

fn join(page: &Url, href: &str) -> Option<String> {
    page.join(href).ok().map(|url| url.to_string())
}

fn number_in(field: &Option<Field>, scope: ElementRef<'_>) -> Option<u32> {
    let value = field.as_ref()?.extract(scope)?;
    value
        .split(|c: char| !c.is_ascii_digit())
        .find(|digits| !digits.is_empty())?
        .parse()
        .ok()
}

fn is_attr_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
