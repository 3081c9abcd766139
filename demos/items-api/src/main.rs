//! Items API Example
//!
//! An in-memory inventory served from proxy events, one JSON event per line on
//! stdin and one JSON response per line on stdout.
//!
//! # Routes
//!
//! ```text
//! GET    /items         list, optional ?limit=
//! POST   /items         create from the body, query values override fields
//! GET    /items/{id}    fetch one
//! DELETE /items/{id}    remove one
//! ```
//!
//! Writes require an `X-Api-Key` header equal to the `apiKey` stage variable
//! when that variable is set.
//!
//! # Usage
//!
//! ```bash
//! echo '{"httpMethod":"GET","resource":"/items"}' | cargo run --package items-api
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use clap::Parser;
use gantry::prelude::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "items-api", about = "Serve an inventory API from proxy events on stdin")]
struct Cli {
    /// Configuration file (defaults to ./gantry.toml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long)]
    profile: Option<String>,
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Item {
    id: u64,
    name: String,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct NewItem {
    name: String,
    #[serde(default)]
    quantity: u32,
}

#[derive(Default)]
struct Store {
    items: Mutex<BTreeMap<u64, Item>>,
    next_id: AtomicU64,
}

impl Store {
    fn insert(&self, new: NewItem) -> Item {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let item = Item {
            id,
            name: new.name,
            quantity: new.quantity,
        };
        self.items.lock().insert(id, item.clone());
        item
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn require_api_key(ctx: &mut Context) -> HandlerResult {
    let expected = ctx.stage_var("apiKey");
    if !expected.is_empty() && ctx.header("X-Api-Key") != expected {
        return Err(HttpError::unauthorized("").into());
    }
    ctx.continue_chain()
}

fn item_id(ctx: &Context) -> Result<u64, HandlerError> {
    ctx.path_param("id")
        .parse()
        .map_err(|_| HttpError::bad_request("item id must be a number").into())
}

fn routes(store: Arc<Store>) -> Router {
    let mut router = Router::new();

    let list = Arc::clone(&store);
    let create = Arc::clone(&store);
    let fetch = Arc::clone(&store);
    let remove = store;

    router
        .get(
            "/items",
            chain![move |ctx: &mut Context| -> HandlerResult {
                let limit = match ctx.query_param("limit") {
                    "" => usize::MAX,
                    raw => raw
                        .parse()
                        .map_err(|_| HttpError::bad_request("limit must be a number"))?,
                };
                let items: Vec<Item> = list.items.lock().values().take(limit).cloned().collect();
                ctx.json(200, &items)
            }],
        )
        .post(
            "/items",
            chain![
                require_api_key,
                move |ctx: &mut Context| -> HandlerResult {
                    let new: NewItem = ctx.bind().map_err(|e| HttpError::bad_request(e.to_string()))?;
                    if new.name.trim().is_empty() {
                        return Err(HttpError::new(422, "name must not be empty").into());
                    }
                    let item = create.insert(new);
                    debug!(id = item.id, "Item created");
                    ctx.json(201, &item)
                }
            ],
        )
        .get(
            "/items/{id}",
            chain![move |ctx: &mut Context| -> HandlerResult {
                let id = item_id(ctx)?;
                let item = fetch.items.lock().get(&id).cloned();
                match item {
                    Some(item) => ctx.json(200, &item),
                    None => Err(HttpError::not_found("").into()),
                }
            }],
        )
        .delete(
            "/items/{id}",
            chain![
                require_api_key,
                move |ctx: &mut Context| -> HandlerResult {
                    let id = item_id(ctx)?;
                    match remove.items.lock().remove(&id) {
                        Some(_) => ctx.no_content(204),
                        None => Err(HttpError::not_found("").into()),
                    }
                }
            ],
        );

    router
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = Runtime::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    let router = routes(Arc::new(Store::default()));
    info!(routes = router.route_count(), "Items API ready");

    let stats = runtime.serve(router).await?;
    info!(
        events = stats.events,
        client_errors = stats.client_errors,
        server_errors = stats.server_errors,
        "Items API stopped"
    );

    Ok(())
}
