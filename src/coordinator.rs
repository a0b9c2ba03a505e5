use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::{sync::watch, time};

use crate::{
    ducoapi::{DeviceApi, ACTION_NODES_PATH, CONFIG_NODES_PATH},
    snapshot::Snapshot,
    Error, Result,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Published state: the last good snapshot and whether the latest poll succeeded.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    pub snapshot: Option<Arc<Snapshot>>,
    pub last_update_success: bool,
}

/// Polls the board and publishes a complete [`Snapshot`] per successful tick.
pub struct DucoboxCoordinator<A: DeviceApi> {
    api: Arc<A>,
    action_nodes: Value,
    state: watch::Sender<CoordinatorState>,
}

impl<A: DeviceApi> DucoboxCoordinator<A> {
    pub fn new(api: Arc<A>) -> DucoboxCoordinator<A> {
        let (state, _) = watch::channel(CoordinatorState::default());
        DucoboxCoordinator {
            api,
            action_nodes: Value::Null,
            state,
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Fetches the node actions, they do not change while the board is running.
    pub async fn setup(&mut self) -> Result<()> {
        self.action_nodes = self.api.raw_get(ACTION_NODES_PATH).await?;
        log::debug!("Data received from {} = {}", ACTION_NODES_PATH, self.action_nodes);
        Ok(())
    }

    /// Performs one poll. On failure the previously published snapshot is kept.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        match self.fetch_data().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.state.send_replace(CoordinatorState {
                    snapshot: Some(snapshot.clone()),
                    last_update_success: true,
                });
                Ok(snapshot)
            }
            Err(err) => {
                log::error!("Failed to fetch data from Ducobox API: {err}");
                self.state.send_modify(|state| state.last_update_success = false);
                Err(Error::UpdateFailed(Box::new(err)))
            }
        }
    }

    async fn fetch_data(&self) -> Result<Snapshot> {
        let info = self.api.get_info().await?;
        log::debug!("Data received from /info: {info}");

        let nodes = self.api.get_nodes().await?;
        log::debug!("Data received from /info/nodes: {} nodes", nodes.len());

        let config_nodes = self.api.raw_get(CONFIG_NODES_PATH).await?;
        log::debug!("Data received from {} = {}", CONFIG_NODES_PATH, config_nodes);

        Ok(Snapshot::new(info, nodes, config_nodes, self.action_nodes.clone()))
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.state.borrow().last_update_success
    }

    pub fn state(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// Polls forever at a fixed interval, a failed poll is retried on the next tick.
    pub async fn run(&self, poll_interval: Duration) {
        let mut interval = time::interval(poll_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            log::debug!("Update ducobox values");
            if self.refresh().await.is_ok() {
                log::debug!("Ducobox values updated");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ducoapi::{INFO_NODES_PATH, INFO_PATH},
        testutil::MockApi,
    };
    use serde_json::json;

    async fn coordinator() -> DucoboxCoordinator<MockApi> {
        let mut coordinator = DucoboxCoordinator::new(Arc::new(MockApi::new()));
        coordinator.setup().await.unwrap();
        coordinator
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot() {
        let coordinator = coordinator().await;
        assert!(coordinator.snapshot().is_none());
        assert!(!coordinator.last_update_success());

        let snapshot = coordinator.refresh().await.unwrap();
        assert!(coordinator.last_update_success());
        assert_eq!(snapshot.nodes.len(), 5);
        assert_eq!(snapshot.mappings.name(1), Some("1:BOX"));
        assert_eq!(snapshot.action_nodes().count(), 2);
        assert!(Arc::ptr_eq(&snapshot, &coordinator.snapshot().unwrap()));
    }

    #[tokio::test]
    async fn test_static_data_fetched_once() {
        let coordinator = coordinator().await;
        coordinator.refresh().await.unwrap();
        coordinator.refresh().await.unwrap();

        let requests = coordinator.api().requests.lock().unwrap().clone();
        assert_eq!(requests.iter().filter(|path| *path == ACTION_NODES_PATH).count(), 1);
        assert_eq!(requests.iter().filter(|path| *path == INFO_PATH).count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let coordinator = coordinator().await;
        let published = coordinator.refresh().await.unwrap();
        let before = (*published).clone();

        // the node list changes but the second request fails
        *coordinator.api().nodes.lock().unwrap() = json!({"Nodes": []});
        coordinator.api().fail_on(INFO_NODES_PATH);

        let result = coordinator.refresh().await;
        assert!(matches!(result, Err(Error::UpdateFailed(_))));
        assert!(!coordinator.last_update_success());

        let current = coordinator.snapshot().unwrap();
        assert!(Arc::ptr_eq(&published, &current));
        assert_eq!(*current, before);

        coordinator.api().recover();
        let snapshot = coordinator.refresh().await.unwrap();
        assert!(coordinator.last_update_success());
        assert!(snapshot.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_failed_last_request_discards_partial_data() {
        let coordinator = coordinator().await;
        coordinator.api().fail_on(CONFIG_NODES_PATH);

        assert!(coordinator.refresh().await.is_err());
        assert!(coordinator.snapshot().is_none());
        assert!(!coordinator.last_update_success());
    }

    #[tokio::test]
    async fn test_invalid_node_does_not_fail_tick() {
        let coordinator = coordinator().await;
        *coordinator.api().nodes.lock().unwrap() = json!({"Nodes": [
            {"General": {}},
            {"Node": 2, "General": {"Type": {"Val": "UCCO2"}}}
        ]});

        let snapshot = coordinator.refresh().await.unwrap();
        assert!(coordinator.last_update_success());
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.mappings.name(2), Some("2:UCCO2"));
    }

    #[tokio::test]
    async fn test_setup_failure() {
        let api = Arc::new(MockApi::new());
        api.fail_on(ACTION_NODES_PATH);

        let mut coordinator = DucoboxCoordinator::new(api);
        assert!(coordinator.setup().await.is_err());
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let coordinator = coordinator().await;
        let mut receiver = coordinator.subscribe();

        coordinator.refresh().await.unwrap();
        assert!(receiver.has_changed().unwrap());
        let state = receiver.borrow_and_update().clone();
        assert!(state.last_update_success);
        assert!(state.snapshot.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_polling_after_failure() {
        let coordinator = coordinator().await;
        coordinator.api().fail_on(INFO_PATH);

        let _ = time::timeout(Duration::from_secs(95), coordinator.run(DEFAULT_POLL_INTERVAL)).await;

        // ticks at 0, 30, 60 and 90 seconds
        assert_eq!(coordinator.api().request_count(), 1 + 4);
        assert!(!coordinator.last_update_success());
    }
}
