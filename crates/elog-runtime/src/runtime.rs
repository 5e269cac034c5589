use elog_discovery::TypeCatalogBuilder;
use elog_store::{EventStore, MongoEventStore};
use elog_types::{
    AggregateType, EntityUsage, EventFired, EventHistoryEntry, EventType, EventUsageReport,
    TypeCatalog,
};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::Profile;
use crate::pipeline;
use crate::{Error, Result};

/// Runs the discovery and query pipeline for one profile.
///
/// Every operation discovers a fresh catalog, opens one store connection, and closes it again
/// on every exit path.
pub struct Runtime {
    profile: Profile,
    cancel: CancelToken,
}

impl Runtime {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Scan the binaries folder. `aggregate` names the aggregate to select.
    pub async fn discover(&self, aggregate: Option<&str>) -> Result<TypeCatalog> {
        let builder = TypeCatalogBuilder::new(self.profile.discovery_options())
            .with_cancel_flag(self.cancel.flag());
        let aggregate = aggregate.map(str::to_string);

        let catalog =
            tokio::task::spawn_blocking(move || builder.build(aggregate.as_deref())).await??;
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(catalog)
    }

    /// Every aggregate discovered in the binaries
    pub async fn aggregates(&self) -> Result<Vec<AggregateType>> {
        Ok(self.discover(None).await?.aggregates)
    }

    /// Every event and projection type discovered in the binaries
    pub async fn event_types(&self) -> Result<Vec<EventType>> {
        Ok(self.discover(None).await?.events)
    }

    pub async fn entities(&self, aggregate: &str) -> Result<Vec<EntityUsage>> {
        let catalog = self.discover(Some(aggregate)).await?;
        let selected = pipeline::selected_aggregate(&catalog, aggregate)?;

        let store = self.connect().await?;
        let result = self
            .cancel
            .run(pipeline::entity_usage(&store, selected))
            .await;
        store.close().await;
        result
    }

    pub async fn history(&self, aggregate: &str, entity: &str) -> Result<Vec<EventHistoryEntry>> {
        let catalog = self.discover(Some(aggregate)).await?;
        let selected = pipeline::selected_aggregate(&catalog, aggregate)?;

        let store = self.connect().await?;
        let result = self
            .cancel
            .run(pipeline::entity_history(
                &store,
                &catalog,
                selected,
                entity,
                self.profile.id_matching,
            ))
            .await;
        store.close().await;
        result
    }

    /// One entry of an entity's history, numbered from 0
    pub async fn history_entry(
        &self,
        aggregate: &str,
        entity: &str,
        index: usize,
    ) -> Result<EventHistoryEntry> {
        let history = self.history(aggregate, entity).await?;
        pipeline::history_entry(history, index)
    }

    /// Usage of one event type. `None` when it was never applied.
    pub async fn event_usage(&self, name: &str) -> Result<Option<EventUsageReport>> {
        let catalog = self.discover(None).await?;
        if catalog.find_event(name).is_none() {
            return Err(Error::EventTypeNotFound(name.to_string()));
        }

        let store = self.connect().await?;
        let result = self
            .cancel
            .run(pipeline::event_usage(&store, &catalog, name))
            .await;
        store.close().await;
        result
    }

    /// Follow inserts into the event log and report events of `aggregate` as they happen.
    ///
    /// Returns the number of events reported once the token is cancelled or the change stream
    /// ends.
    pub async fn watch<F>(&self, aggregate: &str, on_fired: F) -> Result<u64>
    where
        F: FnMut(EventFired),
    {
        let catalog = self.discover(Some(aggregate)).await?;
        let selected = pipeline::selected_aggregate(&catalog, aggregate)?;

        let store = self.connect().await?;
        let result = match self.cancel.run(async { Ok(store.watch_records().await?) }).await {
            Ok(records) => {
                info!(aggregate = %selected.name, store = store.name(), "Watching event log");
                pipeline::watch_fired_events(
                    &self.cancel,
                    records,
                    &catalog,
                    selected,
                    store.name(),
                    on_fired,
                )
                .await
            }
            Err(err) => Err(err),
        };
        store.close().await;

        match result {
            Err(Error::Cancelled) => {
                debug!("Watch cancelled before the change stream opened");
                Ok(0)
            }
            other => other,
        }
    }

    async fn connect(&self) -> Result<MongoEventStore> {
        let settings = self.profile.store_settings();
        self.cancel
            .run(async { Ok(MongoEventStore::connect(settings).await?) })
            .await
    }
}
