use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

/// Parameters of a subscribed query. A write notifies every key it could
/// have changed the results of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKey {
    AllTasks { owner: i64 },
    TaskById { id: i64 },
    OwnerPage { owner: i64 },
    Search { owner: i64 },
}

/// A committed mutation: which row, whose.
#[derive(Debug, Clone, Copy)]
pub struct WriteEvent {
    pub owner: i64,
    pub task_id: i64,
}

impl QueryKey {
    fn affected_by(self, event: WriteEvent) -> bool {
        match self {
            Self::AllTasks { owner } | Self::OwnerPage { owner } | Self::Search { owner } => {
                owner == event.owner
            }
            Self::TaskById { id } => id == event.task_id,
        }
    }
}

/// Registry of live query subscriptions. The store publishes after every
/// committed write; dropped receivers are pruned as they are discovered.
#[derive(Default)]
pub struct Subscriptions {
    inner: Mutex<Vec<(QueryKey, Sender<()>)>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in a query. The receiver gets a unit ping for
    /// every write that may have changed the query's results; dropping it
    /// unsubscribes.
    pub fn subscribe(&self, key: QueryKey) -> Receiver<()> {
        let (tx, rx) = mpsc::channel();
        self.inner.lock().unwrap().push((key, tx));
        rx
    }

    pub fn publish(&self, event: WriteEvent) {
        log::debug!("publishing write on task {} (owner {})", event.task_id, event.owner);
        self.inner
            .lock()
            .unwrap()
            .retain(|(key, tx)| !key.affected_by(event) || tx.send(()).is_ok());
    }

    /// Pings every subscription. Used for external changes where the
    /// affected rows are unknown.
    pub fn publish_all(&self) {
        self.inner
            .lock()
            .unwrap()
            .retain(|(_, tx)| tx.send(()).is_ok());
    }

    pub fn active(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

/// True if at least one ping is waiting; consumes it.
pub fn changed(rx: &Receiver<()>) -> bool {
    rx.try_recv().is_ok()
}

/// Consumes any queued pings so a refresh is not repeated per ping.
pub fn drain(rx: &Receiver<()>) {
    while rx.try_recv().is_ok() {}
}
