use serde::Serialize;
use tracing::info;

use std::sync::{Arc, Mutex};

use crate::{
    tmdb::{CatalogRequest, TmdbClient},
    types::{ContentId, ContentItem, Watchlist},
};

const ACTION_GENRE: i64 = 28;
const COMEDY_GENRE: i64 = 35;
const ROW_SIZE: usize = 10;

/// Everything the browser client needs to render the home page. Rows built
/// from fallback data look exactly like live rows.
#[derive(Serialize)]
pub struct HomePage {
    pub featured: Option<ContentItem>,
    pub trending: Vec<ContentItem>,
    pub popular_movies: Vec<ContentItem>,
    pub top_rated_movies: Vec<ContentItem>,
    pub popular_series: Vec<ContentItem>,
    pub action_movies: Vec<ContentItem>,
    pub comedy_movies: Vec<ContentItem>,
    pub my_list: Vec<ContentItem>,
}

#[derive(Serialize)]
pub struct TrailerLookup {
    pub key: Option<String>,
}

struct Inner {
    watchlist: Watchlist,
}

type SharedInner = Arc<Mutex<Inner>>;

/// Composition layer between the catalog client and the HTTP surface. The
/// client is shared directly; only the watchlist sits behind a lock.
#[derive(Clone)]
pub struct App {
    client: Arc<TmdbClient>,
    inner: SharedInner,
}

impl App {
    pub fn new(client: TmdbClient) -> App {
        App {
            client: Arc::new(client),
            inner: Arc::new(Mutex::new(Inner {
                watchlist: Watchlist::new(),
            })),
        }
    }

    /// Issues the six catalog requests backing the home page and slices
    /// each result down to one row. The first trending item becomes the
    /// hero banner; the rest of the feed fills the trending row.
    pub fn home(&self) -> HomePage {
        let trending = self.client.fetch_catalog(&CatalogRequest::TrendingToday).items;
        let featured = trending.first().cloned();
        let trending_row = trending.iter().skip(1).take(ROW_SIZE).cloned().collect();

        HomePage {
            featured,
            trending: trending_row,
            popular_movies: self.row(&CatalogRequest::PopularMovies),
            top_rated_movies: self.row(&CatalogRequest::TopRatedMovies),
            popular_series: self.row(&CatalogRequest::PopularSeries),
            action_movies: self.row(&CatalogRequest::MovieGenre(ACTION_GENRE)),
            comedy_movies: self.row(&CatalogRequest::MovieGenre(COMEDY_GENRE)),
            my_list: self.watchlist(),
        }
    }

    fn row(&self, request: &CatalogRequest) -> Vec<ContentItem> {
        self.client
            .fetch_catalog(request)
            .items
            .into_iter()
            .take(ROW_SIZE)
            .collect()
    }

    pub fn toggle_watchlist(&self, item: ContentItem) -> Vec<ContentItem> {
        let mut inner = self.inner.lock().expect("Poisoned lock");
        inner.watchlist.toggle(item);
        inner.watchlist.items().to_vec()
    }

    pub fn watchlist(&self) -> Vec<ContentItem> {
        let inner = self.inner.lock().expect("Poisoned lock");
        inner.watchlist.items().to_vec()
    }

    pub fn trailer(&self, id: &ContentId, is_series: bool) -> TrailerLookup {
        TrailerLookup {
            key: self.client.fetch_trailer_key(id, is_series),
        }
    }

    /// Search is a stub; there is no search backend.
    pub fn search(&self, query: &str) -> Vec<ContentItem> {
        info!("Search not implemented, ignoring query: {query}");
        Vec::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::tmdb::testing::{ok, results_body, status, ScriptedTransport};
    use crate::tmdb::{HttpResponse, TransportError};

    fn app_with_script(
        responses: Vec<Result<HttpResponse, TransportError>>,
    ) -> (App, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        let client =
            TmdbClient::with_transport(vec!["k0".to_string()], Box::new(Arc::clone(&transport)));
        (App::new(client), transport)
    }

    fn item(id: i64) -> ContentItem {
        ContentItem {
            id: ContentId(id),
            display_name: format!("Item {id}"),
            overview: String::new(),
            poster_path: None,
            backdrop_path: None,
            vote_average: 6.0,
            display_date: None,
            is_series: false,
        }
    }

    #[test]
    fn test_home_slices_rows_and_picks_featured() {
        let (app, transport) = app_with_script(vec![
            ok(&results_body(12)), // trending
            ok(&results_body(20)), // popular movies
            ok(&results_body(20)), // top rated
            ok(&results_body(20)), // popular series
            ok(&results_body(20)), // action
            ok(&results_body(3)),  // comedy
        ]);

        let page = app.home();
        assert_eq!(transport.call_count(), 6);

        let featured = page.featured.expect("no featured item");
        assert_eq!(featured.id, ContentId(100));
        assert_eq!(page.trending.len(), 10);
        assert_eq!(page.trending[0].id, ContentId(101));
        assert_eq!(page.popular_movies.len(), 10);
        assert_eq!(page.comedy_movies.len(), 3);
        assert!(page.my_list.is_empty());
    }

    #[test]
    fn test_home_composes_fallback_rows_like_live_ones() {
        let (app, _) = app_with_script(vec![
            status(500),
            status(500),
            status(500),
            status(500),
            status(500),
            status(500),
        ]);

        let page = app.home();
        // Fallback has 5 items; featured takes the first, the row the rest.
        assert!(page.featured.is_some());
        assert_eq!(page.trending.len(), 4);
        assert_eq!(page.popular_movies.len(), 5);
    }

    #[test]
    fn test_toggle_watchlist_shows_up_on_home() {
        let (app, _) = app_with_script(vec![
            ok(&results_body(0)),
            ok(&results_body(0)),
            ok(&results_body(0)),
            ok(&results_body(0)),
            ok(&results_body(0)),
            ok(&results_body(0)),
        ]);

        let list = app.toggle_watchlist(item(7));
        assert_eq!(list.len(), 1);

        let page = app.home();
        assert_eq!(page.my_list.len(), 1);
        assert_eq!(page.my_list[0].id, ContentId(7));

        let list = app.toggle_watchlist(item(7));
        assert!(list.is_empty());
    }

    #[test]
    fn test_trailer_wraps_client_lookup() {
        let body = r#"{"results":[{"key":"abc123","site":"YouTube","type":"Trailer"}]}"#;
        let (app, _) = app_with_script(vec![ok(body)]);
        let lookup = app.trailer(&ContentId(42), false);
        assert_eq!(lookup.key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_search_is_a_stub() {
        let (app, transport) = app_with_script(vec![]);
        assert!(app.search("the matrix").is_empty());
        assert_eq!(transport.call_count(), 0);
    }
}
