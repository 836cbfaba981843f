// src/state.rs

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{ResultService, SessionService},
    store::Stores,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionService,
    pub results: ResultService,
}

impl AppState {
    pub fn new(config: Config, stores: Stores) -> Self {
        let results = ResultService::new(stores.clone());
        let sessions = SessionService::new(stores, results.clone());
        Self {
            config,
            sessions,
            results,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionService {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for ResultService {
    fn from_ref(state: &AppState) -> Self {
        state.results.clone()
    }
}
