use server::Server;
use thiserror::Error;

use std::path::PathBuf;

use app::App;
use tmdb::TmdbClient;

mod app;
mod server;
mod tmdb;
mod types;

// Keys shipped with the browser client; override with --api-key.
const DEFAULT_API_KEYS: &[&str] = &[
    "c8dea14dc917687ac631a52620e4f7ad",
    "3cb41ecea3bf606c56552db3d17adefd",
];

#[derive(Error, Debug)]
enum ArgParseError {
    #[error("Unknown arg {0}")]
    UnknownArg(String),
    #[error("No port argument provided")]
    NoPort,
    #[error("Invalid port")]
    InvalidPort(#[source] std::num::ParseIntError),
    #[error("--api-key requires a value")]
    NoApiKeyValue,
}

struct Args {
    html_path: Option<PathBuf>,
    port: i16,
    api_keys: Vec<String>,
}

impl Args {
    fn parse() -> Result<Args, ArgParseError> {
        let mut args = std::env::args();
        let _process_name = args.next();

        let mut html_path = None;
        let mut port = None;
        let mut api_keys = Vec::new();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" => {
                    println!("{}", Self::help());
                    std::process::exit(1);
                }
                "--html-path" => {
                    html_path = args.next().map(Into::into);
                }
                "--port" => {
                    port = args.next().map(|s| s.parse());
                }
                "--api-key" => {
                    api_keys.push(args.next().ok_or(ArgParseError::NoApiKeyValue)?);
                }
                _ => {
                    return Err(ArgParseError::UnknownArg(arg));
                }
            }
        }

        let port = port
            .ok_or(ArgParseError::NoPort)?
            .map_err(ArgParseError::InvalidPort)?;

        if api_keys.is_empty() {
            api_keys = DEFAULT_API_KEYS.iter().map(|k| k.to_string()).collect();
        }

        let ret = Args {
            html_path,
            port,
            api_keys,
        };

        Ok(ret)
    }

    fn help() -> String {
        let process_name = std::env::args()
            .next()
            .unwrap_or_else(|| "movie-browser".to_string());

        format!(
            "Browse movies and series from your couch\n\
                \n\
                Usage: {process_name} [ARGS]\n\
                \n\
                Args:\n\
                --help: Show this help\n\
                --html-path: Optional path to filesystem to serve html files from. Useful for \
                debugging\n\
                --api-key: Catalog API key, may be passed multiple times to build a rotation \
                pool. Falls back to the built-in keys\n\
                --port: Port to serve UI on\n\
                "
        )
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = match Args::parse() {
        Ok(v) => v,
        Err(e) => {
            println!("{}", e);
            println!();
            println!("{}", Args::help());
            return;
        }
    };

    let client = TmdbClient::new(args.api_keys);
    let app = App::new(client);
    let server = Server::new(args.html_path.as_deref(), app).unwrap();
    futures::executor::block_on(server.serve(args.port)).unwrap();
}
