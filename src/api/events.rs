use crate::api::DocumentStore;
use crate::api::models::Message;
use crate::error::QueryError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const MESSAGES: &str = "messages";

/// Latest state of the message subscription. Only the most recent value is kept.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Pending,
    Snapshot(Arc<[Message]>),
    Failed(String),
}

/// Read every message document, skipping ones that cannot be decoded.
pub async fn fetch_messages(store: &dyn DocumentStore, token: Option<&str>) -> Result<Vec<Message>, QueryError> {
    let docs = store.list(MESSAGES, token).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| match doc.decode::<Message>("id") {
            Ok(msg) => Some(msg),
            Err(e) => {
                log::debug!("skipping message {}: {e}", doc.id);
                None
            }
        })
        .collect())
}

/// Running subscription; dropping it stops the poller.
pub struct FeedHandle {
    rx: watch::Receiver<FeedEvent>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Wait for the next published state. `None` once the poller has stopped.
    pub async fn changed(&mut self) -> Option<FeedEvent> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn latest(&self) -> FeedEvent {
        self.rx.borrow().clone()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Change detection between successive reads of the collection.
#[derive(Debug, Default)]
pub struct Poller {
    last: Option<Vec<Message>>,
}

impl Poller {
    /// The event to publish for a read, or `None` when nothing changed.
    ///
    /// A failure forgets the last set, so the next successful read is published even if it
    /// matches what was seen before the failure.
    pub fn observe(&mut self, read: Result<Vec<Message>, QueryError>) -> Option<FeedEvent> {
        match read {
            Ok(messages) if self.last.as_ref() == Some(&messages) => None,
            Ok(messages) => {
                log::debug!("message feed changed: {} records", messages.len());
                let snapshot: Arc<[Message]> = messages.clone().into();
                self.last = Some(messages);
                Some(FeedEvent::Snapshot(snapshot))
            }
            Err(e) => {
                log::warn!("message feed read failed: {e}");
                self.last = None;
                Some(FeedEvent::Failed(e.to_string()))
            }
        }
    }
}

/// Poll the message collection and publish the full set whenever it changes.
pub fn subscribe(store: Arc<dyn DocumentStore>, token: Option<String>, interval: Duration) -> FeedHandle {
    let (tx, rx) = watch::channel(FeedEvent::Pending);
    let task = crate::utils::spawn_async(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poller = Poller::default();
        loop {
            ticker.tick().await;
            let read = fetch_messages(store.as_ref(), token.as_deref()).await;
            if let Some(event) = poller.observe(read) {
                if tx.send(event).is_err() {
                    break;
                }
            }
        }
    });
    FeedHandle { rx, task }
}
