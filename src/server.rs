use serde::Deserialize;
use tempfile::TempDir;
use thiserror::Error;
use tracing::info;

use std::{fs::File, path::Path};

use crate::{
    app::App,
    types::{ContentId, ContentItem},
};

#[derive(Error, Debug)]
pub enum ClientExtractionError {
    #[error("failed to create temp dir")]
    CreateDir(#[source] std::io::Error),
    #[error("failed to open tarball")]
    Open(#[source] std::io::Error),
    #[error("failed to unpack tarball")]
    Unpack(#[source] std::io::Error),
}

fn extract_client() -> Result<TempDir, ClientExtractionError> {
    use ClientExtractionError::*;
    let d = TempDir::new().map_err(CreateDir)?;
    let tarball_path = Path::new(env!("OUT_DIR")).join("client.tar");
    let tarball_reader = File::open(tarball_path).map_err(Open)?;
    let mut tarball = tar::Archive::new(tarball_reader);
    tarball.unpack(&d).map_err(Unpack)?;
    Ok(d)
}

async fn handle_home(req: tide::Request<App>) -> tide::Result<serde_json::Value> {
    let app = req.state();
    Ok(serde_json::to_value(app.home())?)
}

#[derive(Deserialize)]
struct SearchQueryParams {
    query: String,
}

async fn handle_search(req: tide::Request<App>) -> tide::Result<serde_json::Value> {
    let app = req.state();
    let query: SearchQueryParams = req.query()?;
    Ok(serde_json::to_value(app.search(&query.query))?)
}

async fn handle_watchlist(req: tide::Request<App>) -> tide::Result<serde_json::Value> {
    let app = req.state();
    Ok(serde_json::to_value(app.watchlist())?)
}

async fn handle_watchlist_toggle(mut req: tide::Request<App>) -> tide::Result<serde_json::Value> {
    let item: ContentItem = req.body_json().await?;
    let app = req.state();
    Ok(serde_json::to_value(app.toggle_watchlist(item))?)
}

#[derive(Debug, Deserialize)]
struct TrailerQueryParams {
    id: i64,
    #[serde(default)]
    series: bool,
}

async fn handle_trailer(req: tide::Request<App>) -> tide::Result<serde_json::Value> {
    let app = req.state();
    let query: TrailerQueryParams = req.query()?;
    let lookup = app.trailer(&ContentId(query.id), query.series);
    Ok(serde_json::to_value(lookup)?)
}

#[derive(Error, Debug)]
pub enum ServerCreationError {
    #[error("failed to extract client")]
    ExtractClient(#[from] ClientExtractionError),
    #[error("failed to serve directory")]
    ServeDir(#[source] std::io::Error),
}

pub struct Server {
    app: tide::Server<App>,
    _embedded_html_dir: TempDir,
}

impl Server {
    pub fn new(data_path: Option<&Path>, app: App) -> Result<Server, ServerCreationError> {
        let mut app = tide::with_state(app);
        let embedded_html_dir = extract_client()?;

        app.at("/").get(tide::Redirect::new("/index.html"));
        if let Some(data_path) = data_path {
            info!("Overriding embedded html with {}", data_path.display());
            app.at("/")
                .serve_dir(data_path)
                .map_err(ServerCreationError::ServeDir)?;
        } else {
            app.at("/")
                .serve_dir(&embedded_html_dir)
                .map_err(ServerCreationError::ServeDir)?;
        }

        app.at("/home").get(handle_home);
        app.at("/search").get(handle_search);
        app.at("/watchlist").get(handle_watchlist);
        app.at("/watchlist").put(handle_watchlist_toggle);
        app.at("/trailer").get(handle_trailer);

        Ok(Server {
            app,
            _embedded_html_dir: embedded_html_dir,
        })
    }

    pub async fn serve(self, port: i16) -> std::io::Result<()> {
        self.app.listen(format!("127.0.0.1:{port}")).await
    }
}
