// src/server/mod.rs
use crate::api::*;
use crate::config::Config;
use crate::discovery::DiscoveryEngine;
use crate::history::HistoryStore;
use rocket::{routes, Build, Rocket};
use std::sync::Arc;

pub mod routes;

pub struct ServerState {
    pub config: Config,
    pub engine: Arc<DiscoveryEngine>,
    pub history: Arc<HistoryStore>,
}

pub fn build_rocket(state: ServerState) -> Rocket<Build> {
    rocket::build().manage(state).mount(
        "/api",
        routes![
            routes::health::health_check,
            routes::health::index,
            run_search,
            list_history,
            get_history_entry,
        ],
    )
}
