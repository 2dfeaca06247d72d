use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus capacity must be positive")]
    ZeroCapacity,
    #[error("topic `{topic}` already exists with a message type other than `{requested}`")]
    TypeMismatch {
        topic: String,
        requested: &'static str,
    },
}

/// Broadcast topic with bounded capacity.
/// `T` must be `Send + Sync` because we hop across threads.
#[derive(Debug)]
pub struct Topic<T> {
    name: Arc<str>,
    tx: broadcast::Sender<Arc<T>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Topic<T> {
    /// `capacity` must be non-zero; [`Bus`] checks this before creating topics.
    fn new(name: &str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { name: name.into(), tx }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fire-and-forget. Returns how many subscribers will see the message.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Named topics shared by every producer and consumer in the process.
///
/// Asking twice for the same name hands back the same channel, provided the
/// message type matches.
#[derive(Clone)]
pub struct Bus {
    capacity: usize,
    topics: Arc<Mutex<HashMap<String, Box<dyn Any + Send + Sync>>>>,
}

impl Bus {
    pub fn new(capacity: usize) -> Result<Self, BusError> {
        if capacity == 0 {
            return Err(BusError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            topics: Arc::default(),
        })
    }

    pub fn topic<T: Send + Sync + 'static>(&self, name: &str) -> Result<Topic<T>, BusError> {
        let mut topics = self.topics.lock();
        if let Some(existing) = topics.get(name) {
            return existing
                .downcast_ref::<Topic<T>>()
                .cloned()
                .ok_or_else(|| BusError::TypeMismatch {
                    topic: name.to_owned(),
                    requested: type_name::<T>(),
                });
        }
        let topic = Topic::new(name, self.capacity);
        topics.insert(name.to_owned(), Box::new(topic.clone()));
        Ok(topic)
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Next message from `rx`, skipping over any backlog we fell behind on.
/// `None` once every publisher is gone.
pub async fn next_message<T: Clone>(
    rx: &mut broadcast::Receiver<T>,
    topic: &str,
) -> Option<T> {
    loop {
        match rx.recv().await {
            Ok(msg) => return Some(msg),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(topic, skipped, "Subscriber lagged; dropping oldest messages.");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(Bus::new(0), Err(BusError::ZeroCapacity)));
    }

    #[test]
    fn same_name_shares_a_channel() {
        let bus = Bus::new(4).unwrap();
        let a: Topic<u32> = bus.topic("counts").unwrap();
        let b: Topic<u32> = bus.topic("counts").unwrap();
        let mut rx = a.subscribe();

        assert_eq!(b.publish(7), 1);
        assert_eq!(*rx.try_recv().unwrap(), 7);
        assert_eq!(a.name(), "counts");
        assert_eq!(bus.topic_names(), vec!["counts".to_string()]);
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let bus = Bus::new(4).unwrap();
        let _: Topic<u32> = bus.topic("odom").unwrap();
        let err = bus.topic::<String>("odom").unwrap_err();
        assert!(matches!(err, BusError::TypeMismatch { ref topic, .. } if topic == "odom"));
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = Bus::new(2).unwrap();
        let topic: Topic<&'static str> = bus.topic("tf").unwrap();
        assert_eq!(topic.subscriber_count(), 0);
        assert_eq!(topic.publish("dropped"), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_keeps_newest_messages() {
        let bus = Bus::new(2).unwrap();
        let topic: Topic<u32> = bus.topic("fast").unwrap();
        let mut rx = topic.subscribe();
        for i in 0..5 {
            topic.publish(i);
        }
        assert_eq!(next_message(&mut rx, "fast").await.map(|m| *m), Some(3));
        assert_eq!(next_message(&mut rx, "fast").await.map(|m| *m), Some(4));

        drop(topic);
        drop(bus);
        assert!(next_message(&mut rx, "fast").await.is_none());
    }
}
