use std::{path::PathBuf, sync::Arc};

use axum::http::{Response, StatusCode};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use catalog::SetCatalog;
use config::DraftConfig;
use draft::{observer::TracingObserver, server::DraftServer};
use error::{Error, ErrorKind};

mod cards;
mod catalog;
mod config;
mod draft;
mod error;

pub use error::{err, Res};

#[derive(serde::Serialize)]
struct Resp {
    message: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl Resp {
    fn axum<S: ToString>(
        message: S,
        status: StatusCode,
        data: Option<serde_json::Value>,
    ) -> Response<String> {
        match serde_json::ser::to_string(&Self {
            message: message.to_string(),
            success: status == StatusCode::OK,
            data,
        }) {
            Ok(body) => {
                let mut resp = Response::new(body);
                *resp.status_mut() = status;
                resp
            }
            Err(e) => {
                let mut resp = Response::new(format!("Failed to JSON encode response: {e}"));
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                resp
            }
        }
    }

    fn ok<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::OK, None)
    }

    fn data<T: serde::Serialize>(data: &T) -> Response<String> {
        match serde_json::to_value(data) {
            Ok(value) => Self::axum("ok", StatusCode::OK, Some(value)),
            Err(e) => Self::e500(format!("Failed to JSON encode response: {e}")),
        }
    }

    fn error(e: &Error) -> Response<String> {
        match e.kind() {
            ErrorKind::NotFound => Self::e404(e),
            ErrorKind::Validation => Self::e422(e),
            ErrorKind::Protocol => Self::e409(e),
            ErrorKind::Configuration => Self::e500(e),
        }
    }

    fn e404<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::NOT_FOUND, None)
    }

    fn e409<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::CONFLICT, None)
    }

    fn e422<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::UNPROCESSABLE_ENTITY, None)
    }

    fn e500<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::INTERNAL_SERVER_ERROR, None)
    }
}

/// Booster draft server.
#[derive(Parser)]
struct Args {
    /// Directory holding MTGJSON set files. Missing sets are downloaded here.
    data: PathBuf,

    port: u16,

    /// TOML file overriding the default draft configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("boosterdraft=debug,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => match DraftConfig::load(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to load configuration: {e}");
                return;
            }
        },
        None => DraftConfig::default(),
    };

    let catalog = match SetCatalog::load(&args.data, &config.sets).await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Failed to load card data: {e}");
            return;
        }
    };
    tracing::debug!("Loaded {} sets.", catalog.size());

    let server = DraftServer::new(Arc::new(catalog), config, Arc::new(TracingObserver));
    let app = draft::handlers::routes(server).layer(TraceLayer::new_for_http());

    let listener = match TcpListener::bind(format!("0.0.0.0:{}", args.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to open port {}: {e}", args.port);
            return;
        }
    };

    tracing::info!("Listening on port {}.", args.port);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Closed due to error: {e}");
    }
}
