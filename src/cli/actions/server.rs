use crate::{
    admission::{BucketStore, RatePolicies},
    api::{self, AppState},
    auth::{SessionService, TokenConfig},
    cli::actions::Action,
    events::TracingEventSink,
    store::memory::{MemoryAccountStore, MemoryStatusQueue, MemoryTaskStore},
    tasks::TaskService,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server {
        port,
        access_secret,
        refresh_secret,
        access_ttl_minutes,
        refresh_ttl_days,
    } = action;

    let accounts = Arc::new(MemoryAccountStore::new());
    let task_store = Arc::new(MemoryTaskStore::new());
    let queue = Arc::new(MemoryStatusQueue::new());
    let events = Arc::new(TracingEventSink);

    let config = TokenConfig::new(access_secret, refresh_secret)
        .with_access_ttl_minutes(access_ttl_minutes)
        .with_refresh_ttl_days(refresh_ttl_days);

    let sessions = Arc::new(SessionService::new(
        accounts.clone(),
        config,
        events.clone(),
    ));
    let tasks = Arc::new(TaskService::new(
        task_store,
        accounts.clone(),
        queue,
        events,
    ));

    let state = AppState {
        sessions,
        accounts,
        tasks,
        buckets: Arc::new(BucketStore::new()),
        policies: RatePolicies::default(),
    };

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    api::serve(port, state).await
}
