//! Events and blog posts from WordPress.
//!
//! Content comes from a WPGraphQL endpoint when `WORDPRESS_API_URL` is set,
//! cached for 5 minutes with `moka`. Without an endpoint, or whenever a fetch
//! fails, a fixed mock dataset is served instead so pages never break because
//! the CMS is down.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use graphql_client::{GraphQLQuery, QueryBody, Response};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Posts returned when the caller does not ask for a count.
pub const DEFAULT_POST_LIMIT: usize = 10;

/// Most posts one request may ask for.
pub const MAX_POST_LIMIT: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors talking to WordPress. Never surfaced to clients.
#[derive(Debug, Error)]
pub enum ContentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WordPress answered with a non-success status.
    #[error("WPGraphQL returned HTTP {0}")]
    Status(u16),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {0}")]
    GraphQL(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response had neither data nor errors.
    #[error("No data in response")]
    NoData,
}

// =============================================================================
// Public types
// =============================================================================

/// Where an event falls relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Today,
    Past,
}

impl EventStatus {
    /// Classify an ISO 8601 date or datetime against `today`.
    ///
    /// Returns `None` for an empty or unreadable date, which is how recurring
    /// events without a single date are listed.
    #[must_use]
    pub fn for_date(date: &str, today: NaiveDate) -> Option<Self> {
        let day = NaiveDate::parse_from_str(date.get(..10)?, "%Y-%m-%d").ok()?;
        Some(match day.cmp(&today) {
            std::cmp::Ordering::Less => Self::Past,
            std::cmp::Ordering::Equal => Self::Today,
            std::cmp::Ordering::Greater => Self::Upcoming,
        })
    }
}

/// A market day or community event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    /// ISO 8601 date; empty for recurring events
    pub date: String,
    pub location_name: String,
    pub location_address: String,
    pub description: String,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

/// A blog post summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub date: String,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image_url: Option<String>,
}

// =============================================================================
// Queries
// =============================================================================

struct GetEvents;

impl GraphQLQuery for GetEvents {
    type Variables = ();
    type ResponseData = EventsData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: r"
                query GetEvents {
                  events(first: 20, where: { orderby: { field: DATE, order: ASC } }) {
                    nodes {
                      id
                      title
                      date
                      locationName
                      locationAddress
                      description
                      isRecurring
                      recurringDay
                      recurringTime
                      externalLink
                    }
                  }
                }",
            operation_name: "GetEvents",
        }
    }
}

struct GetPosts;

#[derive(Debug, Serialize)]
struct GetPostsVariables {
    first: usize,
}

impl GraphQLQuery for GetPosts {
    type Variables = GetPostsVariables;
    type ResponseData = PostsData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: r"
                query GetPosts($first: Int!) {
                  posts(first: $first, where: { orderby: { field: DATE, order: DESC } }) {
                    nodes {
                      id
                      slug
                      title
                      excerpt
                      date
                      categories { nodes { name } }
                      featuredImage { node { sourceUrl } }
                    }
                  }
                }",
            operation_name: "GetPosts",
        }
    }
}

struct GetPost;

#[derive(Debug, Serialize)]
struct GetPostVariables {
    slug: String,
}

impl GraphQLQuery for GetPost {
    type Variables = GetPostVariables;
    type ResponseData = PostData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: r"
                query GetPost($slug: ID!) {
                  post(id: $slug, idType: SLUG) {
                    id
                    slug
                    title
                    excerpt
                    date
                    categories { nodes { name } }
                    featuredImage { node { sourceUrl } }
                  }
                }",
            operation_name: "GetPost",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct EventsData {
    events: Nodes<EventNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventNode {
    id: String,
    title: String,
    date: Option<String>,
    location_name: Option<String>,
    location_address: Option<String>,
    description: Option<String>,
    is_recurring: Option<bool>,
    recurring_day: Option<String>,
    recurring_time: Option<String>,
    external_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: Nodes<PostNode>,
}

#[derive(Debug, Deserialize)]
struct PostData {
    post: Option<PostNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostNode {
    id: String,
    slug: String,
    title: String,
    excerpt: Option<String>,
    date: String,
    categories: Option<Nodes<CategoryNode>>,
    featured_image: Option<FeaturedImage>,
}

#[derive(Debug, Deserialize)]
struct CategoryNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FeaturedImage {
    node: Option<ImageNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageNode {
    source_url: Option<String>,
}

impl From<EventNode> for Event {
    fn from(node: EventNode) -> Self {
        Self {
            id: node.id,
            title: node.title,
            date: node.date.unwrap_or_default(),
            location_name: node.location_name.unwrap_or_default(),
            location_address: node.location_address.unwrap_or_default(),
            description: node.description.unwrap_or_default(),
            is_recurring: node.is_recurring.unwrap_or(false),
            recurring_day: node.recurring_day,
            recurring_time: node.recurring_time,
            external_link: node.external_link,
            status: None,
        }
    }
}

impl From<PostNode> for Post {
    fn from(node: PostNode) -> Self {
        Self {
            id: node.id,
            slug: node.slug,
            title: node.title,
            excerpt: node.excerpt.unwrap_or_default(),
            date: node.date,
            categories: node
                .categories
                .map(|c| c.nodes.into_iter().map(|n| n.name).collect())
                .unwrap_or_default(),
            featured_image_url: node
                .featured_image
                .and_then(|f| f.node)
                .and_then(|n| n.source_url),
        }
    }
}

// =============================================================================
// Gateway
// =============================================================================

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Events,
    Posts { limit: usize },
    Post(String),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Events(Vec<Event>),
    Posts(Vec<Post>),
    Post(Option<Box<Post>>),
}

/// Fetches events and posts, falling back to mock data.
#[derive(Clone)]
pub struct ContentGateway {
    inner: Arc<ContentGatewayInner>,
}

struct ContentGatewayInner {
    client: reqwest::Client,
    endpoint: Option<Url>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ContentGateway {
    /// Create a gateway. `endpoint: None` always serves mock content.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(endpoint: Option<Url>) -> Result<Self, ContentError> {
        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ContentGatewayInner {
                client,
                endpoint,
                cache,
            }),
        })
    }

    /// Whether a WordPress endpoint is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.endpoint.is_some()
    }

    /// Upcoming and recurring events, each stamped with its status for today.
    #[instrument(skip(self))]
    pub async fn events(&self) -> Vec<Event> {
        let events = match self.fetch_events().await {
            Some(events) => events,
            None => mock_events(),
        };
        let today = Local::now().date_naive();
        events
            .into_iter()
            .map(|mut event| {
                event.status = EventStatus::for_date(&event.date, today);
                event
            })
            .collect()
    }

    /// The newest `limit` posts. `limit` is clamped to `1..=50`.
    #[instrument(skip(self))]
    pub async fn posts(&self, limit: usize) -> Vec<Post> {
        let limit = limit.clamp(1, MAX_POST_LIMIT);
        match self.fetch_posts(limit).await {
            Some(posts) => posts,
            None => mock_posts().into_iter().take(limit).collect(),
        }
    }

    /// A single post by slug.
    #[instrument(skip(self))]
    pub async fn post_by_slug(&self, slug: &str) -> Option<Post> {
        let Some(endpoint) = &self.inner.endpoint else {
            return mock_posts().into_iter().find(|p| p.slug == slug);
        };

        let key = CacheKey::Post(slug.to_string());
        if let Some(CacheValue::Post(post)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for post");
            return post.map(|p| *p);
        }

        let variables = GetPostVariables {
            slug: slug.to_string(),
        };
        match self.execute::<GetPost>(endpoint, variables).await {
            Ok(data) => {
                let post = data.post.map(Post::from);
                self.inner
                    .cache
                    .insert(key, CacheValue::Post(post.clone().map(Box::new)))
                    .await;
                post
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch post from WordPress");
                None
            }
        }
    }

    async fn fetch_events(&self) -> Option<Vec<Event>> {
        let endpoint = self.inner.endpoint.as_ref()?;

        if let Some(CacheValue::Events(events)) = self.inner.cache.get(&CacheKey::Events).await {
            debug!("Cache hit for events");
            return Some(events);
        }

        match self.execute::<GetEvents>(endpoint, ()).await {
            Ok(data) => {
                let events: Vec<Event> = data.events.nodes.into_iter().map(Event::from).collect();
                self.inner
                    .cache
                    .insert(CacheKey::Events, CacheValue::Events(events.clone()))
                    .await;
                Some(events)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch events, using mock data");
                None
            }
        }
    }

    async fn fetch_posts(&self, limit: usize) -> Option<Vec<Post>> {
        let endpoint = self.inner.endpoint.as_ref()?;

        let key = CacheKey::Posts { limit };
        if let Some(CacheValue::Posts(posts)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for posts");
            return Some(posts);
        }

        match self
            .execute::<GetPosts>(endpoint, GetPostsVariables { first: limit })
            .await
        {
            Ok(data) => {
                let posts: Vec<Post> = data.posts.nodes.into_iter().map(Post::from).collect();
                self.inner
                    .cache
                    .insert(key, CacheValue::Posts(posts.clone()))
                    .await;
                Some(posts)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch posts, using mock data");
                None
            }
        }
    }

    /// Execute a GraphQL query.
    async fn execute<Q: GraphQLQuery>(
        &self,
        endpoint: &Url,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ContentError> {
        let request_body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(endpoint.clone())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "WPGraphQL returned non-success status"
            );
            return Err(ContentError::Status(status.as_u16()));
        }

        let response: Response<Q::ResponseData> = serde_json::from_str(&response_text)?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(ContentError::GraphQL(messages.join(", ")));
        }

        response.data.ok_or(ContentError::NoData)
    }
}

// =============================================================================
// Mock data
// =============================================================================

/// Events served when WordPress is not available.
#[must_use]
pub fn mock_events() -> Vec<Event> {
    vec![
        Event {
            id: "holt-farmers-market".to_string(),
            title: "Holt Farmer's Market".to_string(),
            date: String::new(),
            location_name: "Holt Farmer's Market".to_string(),
            location_address: "Holt, Michigan".to_string(),
            description: "Our permanent home! Come visit us every Saturday for fresh roasted \
                          nuts and hot chocolate. Rain or shine."
                .to_string(),
            is_recurring: true,
            recurring_day: Some("Saturday".to_string()),
            recurring_time: Some("9am-2pm".to_string()),
            external_link: None,
            status: None,
        },
        Event {
            id: "community-events".to_string(),
            title: "Community Events".to_string(),
            date: String::new(),
            location_name: "Various locations around Mid-Michigan".to_string(),
            location_address: "Mid-Michigan".to_string(),
            description: "We love participating in festivals, fairs, and community events. \
                          Follow us on Facebook and Instagram for the latest schedule."
                .to_string(),
            is_recurring: false,
            recurring_day: None,
            recurring_time: None,
            external_link: None,
            status: None,
        },
    ]
}

/// Posts served when WordPress is not available, newest first.
#[must_use]
pub fn mock_posts() -> Vec<Post> {
    let post = |id: &str, slug: &str, title: &str, excerpt: &str, date: &str, category: &str| Post {
        id: id.to_string(),
        slug: slug.to_string(),
        title: title.to_string(),
        excerpt: excerpt.to_string(),
        date: date.to_string(),
        categories: vec![category.to_string()],
        featured_image_url: None,
    };

    vec![
        post(
            "post-1",
            "five-ways-to-use-cinnamon-roasted-nuts",
            "5 Ways to Use Cinnamon Roasted Nuts (Beyond Snacking)",
            "From salad toppers to ice cream finishers, our cinnamon roasted nuts elevate \
             everything they touch. Here are our five favorite uses.",
            "2026-02-01",
            "Recipes",
        ),
        post(
            "post-2",
            "the-perfect-holiday-gift",
            "The Perfect Holiday Gift for People Who Have Everything",
            "Still searching for that unique, handcrafted gift? Our cinnamon roasted nut gift \
             baskets ship nationwide and arrive fresh.",
            "2026-01-15",
            "Gift Guides",
        ),
        post(
            "post-3",
            "how-we-got-started",
            "How We Got Started: The Nut Barn Story",
            "It started with a husband who never said no in 26 years of marriage, and a little \
             nut stand that sparked a community.",
            "2026-01-01",
            "Behind the Scenes",
        ),
    ]
}
