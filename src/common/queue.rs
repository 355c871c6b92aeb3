//! Broadcast queue for one-to-many message distribution.

use std::sync::Arc;

use tokio::sync::broadcast;

/// Broadcast queue where every subscriber receives every message.
///
/// Backed by tokio's broadcast channel. Sending never blocks and never fails
/// the sender: a message published without subscribers is dropped.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: Arc<broadcast::Sender<T>>,
}

impl<T: Clone> BroadcastQueue<T> {
    /// create a new broadcast queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap);

        Arc::new(Self {
            sender: Arc::new(tx),
        })
    }

    /// send a message to the queue, returning the number of subscribers reached
    pub fn send(
        &self,
        msg: T,
    ) -> usize {
        self.sender.send(msg).unwrap_or(0)
    }

    /// subscribe to the queue
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let queue = BroadcastQueue::new(8);
        assert_eq!(queue.send(0), 0);

        let mut a = queue.subscribe();
        let mut b = queue.subscribe();
        assert_eq!(queue.send(7), 2);
        assert_eq!(a.recv().await.unwrap(), 7);
        assert_eq!(b.recv().await.unwrap(), 7);
    }
}
