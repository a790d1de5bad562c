use chrono::NaiveDate;
use isahc::error::Error as IsahcError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::{ContentId, ContentItem};

const API_ROOT: &str = "https://api.themoviedb.org/3";

/// Query-string credentials for the catalog provider, with a rotating
/// cursor. The cursor only moves on a rate-limit response and wraps back
/// to the first key after the last. Advancing is a relaxed atomic bump;
/// concurrent catalog calls racing on it pick whichever key the cursor
/// points at when they read it, which is harmless.
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// `keys` must be non-empty; the pool never changes size after this.
    pub fn new(keys: Vec<String>) -> CredentialPool {
        debug_assert!(!keys.is_empty());
        CredentialPool {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    fn current(&self) -> &str {
        &self.keys[self.cursor.load(Ordering::Relaxed) % self.keys.len()]
    }

    fn advance(&self) {
        self.cursor.fetch_add(1, Ordering::Relaxed);
    }
}

/// The endpoint shapes the home page is built from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CatalogRequest {
    TrendingToday,
    PopularMovies,
    TopRatedMovies,
    PopularSeries,
    MovieGenre(i64),
}

impl CatalogRequest {
    fn path(&self) -> String {
        use CatalogRequest::*;
        match self {
            TrendingToday => "/trending/all/day".to_string(),
            PopularMovies => "/movie/popular".to_string(),
            TopRatedMovies => "/movie/top_rated".to_string(),
            PopularSeries => "/tv/popular".to_string(),
            MovieGenre(id) => format!("/discover/movie?with_genres={id}"),
        }
    }
}

fn catalog_url(base: &str, path: &str, api_key: &str) -> String {
    // Discovery paths already carry a query string.
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{base}{path}{sep}api_key={api_key}&language=en-US")
}

#[derive(Serialize, Deserialize, Debug)]
struct ApiContentItem {
    id: ContentId,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    release_date: Option<String>,
    first_air_date: Option<String>,
}

impl From<ApiContentItem> for ContentItem {
    fn from(value: ApiContentItem) -> Self {
        let is_series = value.first_air_date.is_some();
        let date = value.release_date.or(value.first_air_date);
        let display_date = date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());

        ContentItem {
            id: value.id,
            display_name: value.title.or(value.name).unwrap_or_default(),
            overview: value.overview.unwrap_or_default(),
            poster_path: value.poster_path,
            backdrop_path: value.backdrop_path,
            vote_average: value.vote_average.unwrap_or(0.0),
            display_date,
            is_series,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct ApiResultsPage {
    #[serde(default)]
    results: Vec<ApiContentItem>,
}

#[derive(Serialize, Deserialize, Debug)]
struct ApiVideo {
    key: String,
    site: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct ApiVideoPage {
    #[serde(default)]
    results: Vec<ApiVideo>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to execute get")]
    Get(#[source] IsahcError),
    #[error("failed to read response body")]
    Read(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum TmdbApiError {
    #[error("transport failure")]
    Transport(#[from] TransportError),
    #[error("rate limited after credential rotation")]
    RateLimited,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("failed to parse response")]
    Parse(#[from] serde_json::Error),
}

pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub(crate) trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

struct IsahcTransport;

impl Transport for IsahcTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        use TransportError::*;

        let mut response = isahc::get(url).map_err(Get)?;
        let status = response.status().as_u16();

        let mut body = String::new();
        response.body_mut().read_to_string(&mut body).map_err(Read)?;

        debug!("Returned content {}", body);
        Ok(HttpResponse { status, body })
    }
}

/// Whether a page came from the live provider or the embedded fallback.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CatalogSource {
    Live,
    Fallback,
}

pub struct CatalogPage {
    pub items: Vec<ContentItem>,
    pub source: CatalogSource,
}

pub struct TmdbClient {
    base_url: String,
    credentials: CredentialPool,
    transport: Box<dyn Transport>,
}

impl TmdbClient {
    pub fn new(api_keys: Vec<String>) -> TmdbClient {
        TmdbClient {
            base_url: API_ROOT.to_string(),
            credentials: CredentialPool::new(api_keys),
            transport: Box::new(IsahcTransport),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_transport(
        api_keys: Vec<String>,
        transport: Box<dyn Transport>,
    ) -> TmdbClient {
        TmdbClient {
            base_url: API_ROOT.to_string(),
            credentials: CredentialPool::new(api_keys),
            transport,
        }
    }

    /// Resolves a catalog request to a page of normalized items. Never
    /// fails from the caller's point of view: any unrecoverable provider
    /// failure degrades to the embedded fallback dataset. Results are
    /// returned unsliced; row sizing is the caller's job.
    pub fn fetch_catalog(&self, request: &CatalogRequest) -> CatalogPage {
        match self.try_fetch_catalog(request) {
            Ok(items) => CatalogPage {
                items,
                source: CatalogSource::Live,
            },
            Err(e) => {
                warn!("Catalog request {} failed, serving fallback: {e}", request.path());
                CatalogPage {
                    items: fallback_items(),
                    source: CatalogSource::Fallback,
                }
            }
        }
    }

    fn try_fetch_catalog(&self, request: &CatalogRequest) -> Result<Vec<ContentItem>, TmdbApiError> {
        let body = self.request(&request.path())?;
        let page: ApiResultsPage = serde_json::from_str(&body)?;
        Ok(page.results.into_iter().map(Into::into).collect())
    }

    /// Looks up the first YouTube trailer for a piece of content. All
    /// failures collapse to None, which the UI renders as "trailer not
    /// available".
    pub fn fetch_trailer_key(&self, id: &ContentId, is_series: bool) -> Option<String> {
        let namespace = if is_series { "tv" } else { "movie" };
        let path = format!("/{namespace}/{}/videos", id.0);

        let body = match self.request(&path) {
            Ok(body) => body,
            Err(e) => {
                warn!("Video lookup for {} failed: {e}", id.0);
                return None;
            }
        };

        let page: ApiVideoPage = match serde_json::from_str(&body) {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to parse video list for {}: {e}", id.0);
                return None;
            }
        };

        page.results
            .into_iter()
            .find(|v| v.kind == "Trailer" && v.site == "YouTube")
            .map(|v| v.key)
    }

    /// One attempt, plus exactly one retry if the first attempt was rate
    /// limited. Rotation happens only on 429; other failures are returned
    /// as-is without touching the cursor.
    fn request(&self, path: &str) -> Result<String, TmdbApiError> {
        let mut rotated = false;
        loop {
            let url = catalog_url(&self.base_url, path, self.credentials.current());
            debug!("Sending request to {url}");

            let response = self.transport.get(&url)?;

            if response.status == 429 {
                if rotated {
                    return Err(TmdbApiError::RateLimited);
                }
                self.credentials.advance();
                rotated = true;
                continue;
            }

            if !(200..300).contains(&response.status) {
                return Err(TmdbApiError::Status(response.status));
            }

            return Ok(response.body);
        }
    }
}

/// Fixed dataset served when the live catalog cannot be reached. The same
/// five titles come back for every failed request, in the same order.
pub fn fallback_items() -> Vec<ContentItem> {
    let entry = |id: i64,
                 name: &str,
                 overview: &str,
                 poster: &str,
                 backdrop: &str,
                 vote: f64,
                 (y, m, d): (i32, u32, u32)| ContentItem {
        id: ContentId(id),
        display_name: name.to_string(),
        overview: overview.to_string(),
        poster_path: Some(poster.to_string()),
        backdrop_path: Some(backdrop.to_string()),
        vote_average: vote,
        display_date: NaiveDate::from_ymd_opt(y, m, d),
        is_series: false,
    };

    vec![
        entry(
            1,
            "The Dark Knight",
            "When the menace known as The Joker emerges from his mysterious past, \
             he wreaks havoc and chaos on the people of Gotham. Batman must accept \
             one of the greatest psychological and physical tests of his ability to \
             fight injustice.",
            "/qJ2tW6WMUDux911r6m7haRef0WH.jpg",
            "/1hRoyzDtpgMU7Dz4JF22RANzQO7.jpg",
            9.0,
            (2008, 7, 18),
        ),
        entry(
            2,
            "Inception",
            "Dom Cobb is a skilled thief, the absolute best in the dangerous art of \
             extraction, stealing valuable secrets from deep within the subconscious \
             during the dream state.",
            "/9gk7adHYeDvHkCSEqAvQNLV5Uge.jpg",
            "/8IB2e4r4oVhHnANbnm7O3Tj6tF8.jpg",
            8.8,
            (2010, 7, 16),
        ),
        entry(
            3,
            "Interstellar",
            "The adventures of a group of explorers who make use of a newly \
             discovered wormhole to surpass the limitations on human space travel \
             and conquer the vast distances involved in an interstellar voyage.",
            "/gEU2QniE6E77NI6lCU6MxlNBvIx.jpg",
            "/xJHokMbljvjADYdit5fK5VQsXEG.jpg",
            8.6,
            (2014, 11, 5),
        ),
        entry(
            4,
            "The Matrix",
            "Set in the 22nd century, The Matrix tells the story of a computer \
             hacker who joins a group of underground insurgents fighting the vast \
             and powerful computers who now rule the earth.",
            "/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg",
            "/fNG7i7RqMErkcqhohV2a6cV1Ehy.jpg",
            8.7,
            (1999, 3, 30),
        ),
        entry(
            5,
            "Pulp Fiction",
            "A burger-loving hit man, his philosophical partner, a drug-addled \
             gangster's moll and a washed-up boxer converge in this sprawling, \
             comedic crime caper.",
            "/d5iIlFn5s0ImszYzBPb8JPIfbXD.jpg",
            "/suaEOtk1N1sgg2MTM7oZd2cfVp3.jpg",
            8.9,
            (1994, 9, 10),
        ),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of responses and records every URL hit.
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        pub urls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> ScriptedTransport {
            ScriptedTransport {
                responses: Mutex::new(responses.into()),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.urls.lock().expect("Poisoned lock").len()
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.urls
                .lock()
                .expect("Poisoned lock")
                .push(url.to_string());
            self.responses
                .lock()
                .expect("Poisoned lock")
                .pop_front()
                .expect("Transport script exhausted")
        }
    }

    impl Transport for std::sync::Arc<ScriptedTransport> {
        fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.as_ref().get(url)
        }
    }

    pub(crate) fn ok(body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    pub(crate) fn status(status: u16) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status,
            body: String::new(),
        })
    }

    pub(crate) fn results_body(n: usize) -> String {
        let items: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"id":{},"title":"Movie {}","overview":"o","vote_average":7.5,"release_date":"2020-01-0{}"}}"#,
                    i + 100,
                    i,
                    (i % 9) + 1,
                )
            })
            .collect();
        format!(r#"{{"results":[{}]}}"#, items.join(","))
    }
}
