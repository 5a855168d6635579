use tokio::sync::{broadcast, watch};

/// Transition of the online flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEdge {
    Reconnected,
    Disconnected,
}

/// Single online/offline flag fed by the host environment.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    edges: broadcast::Sender<ConnectivityEdge>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        let (edges, _) = broadcast::channel(16);
        Self { state, edges }
    }

    /// Records a connectivity signal. Repeated signals with the same value
    /// produce no edge.
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEdge> {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if !changed {
            return None;
        }

        let edge = if online {
            ConnectivityEdge::Reconnected
        } else {
            ConnectivityEdge::Disconnected
        };
        tracing::info!(target: "offline::connectivity", online, "connectivity changed");
        let _ = self.edges.send(edge);
        Some(edge)
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    pub fn subscribe_edges(&self) -> broadcast::Receiver<ConnectivityEdge> {
        self.edges.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
