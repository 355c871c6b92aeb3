use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};

use tokio::{
    runtime::Handle,
    sync::broadcast::{self, error::RecvError},
};
use tracing::warn;

use crate::{
    ShareLock,
    common::BroadcastQueue,
    events::{Event, Message, TransformEvent},
    graph::NodeRef,
    runtime::PassId,
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = match $handles.read() {
            Ok(handlers) => handlers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

const EVENT_QUEUE_SIZE: usize = 2048;

pub type EventHandle = Arc<dyn Fn(&Event<Message>) + Send + Sync>;

/// Fire-and-forget event channel.
///
/// Emitting only enqueues the message. Registered handlers are run by a
/// listener that drains the queue, either on a tokio runtime or on a
/// dedicated thread. The listener stops once the channel is dropped.
#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<Event<Message>>>,
    events: ShareLock<Vec<EventHandle>>,
    listening: Arc<AtomicBool>,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel {
    /// Channel whose handlers run on a dedicated thread.
    pub fn new() -> Self {
        let channel = Self::idle();
        channel.listen(None);
        channel
    }

    /// Channel whose handlers run as a task on `runtime`.
    pub fn with_runtime(runtime: &Handle) -> Self {
        let channel = Self::idle();
        channel.listen(Some(runtime));
        channel
    }

    fn idle() -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn emit(
        &self,
        pass_id: &str,
        event: TransformEvent,
    ) {
        self.event_queue.send(Event::new(&Message::new(pass_id, event)));
    }

    /// Receiver of every message emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event<Message>> {
        self.event_queue.subscribe()
    }

    pub fn on_event(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        self.push(Arc::new(f));
    }

    /// Operator notifications, e.g. why a pass aborted.
    pub fn on_notify(
        &self,
        f: impl Fn(&PassId, &str) + Send + Sync + 'static,
    ) {
        self.push(Arc::new(move |e: &Event<Message>| {
            if let TransformEvent::Notify(message) = &e.event {
                f(&e.pass_id, message);
            }
        }));
    }

    /// Relayout requests, raised once per successful pass.
    pub fn on_relayout(
        &self,
        f: impl Fn(&PassId, &NodeRef) + Send + Sync + 'static,
    ) {
        self.push(Arc::new(move |e: &Event<Message>| {
            if let TransformEvent::Relayout {
                root,
            } = &e.event
            {
                f(&e.pass_id, root);
            }
        }));
    }

    fn push(
        &self,
        handle: EventHandle,
    ) {
        match self.events.write() {
            Ok(mut events) => events.push(handle),
            Err(poisoned) => poisoned.into_inner().push(handle),
        }
    }

    fn listen(
        &self,
        runtime: Option<&Handle>,
    ) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut event_queue = self.event_queue.subscribe();
        let events = self.events.clone();

        match runtime {
            Some(runtime) => {
                runtime.spawn(async move {
                    loop {
                        match event_queue.recv().await {
                            Ok(e) => {
                                dispatch_event!(events, &e);
                            }
                            Err(RecvError::Lagged(skipped)) => warn!(skipped, "channel listener lagged"),
                            Err(RecvError::Closed) => break,
                        }
                    }
                });
            }
            None => {
                let spawned = std::thread::Builder::new().name("actform-channel".to_string()).spawn(move || {
                    loop {
                        match event_queue.blocking_recv() {
                            Ok(e) => {
                                dispatch_event!(events, &e);
                            }
                            Err(RecvError::Lagged(skipped)) => warn!(skipped, "channel listener lagged"),
                            Err(RecvError::Closed) => break,
                        }
                    }
                });
                if let Err(e) = spawned {
                    self.listening.store(false, Ordering::SeqCst);
                    warn!(error = %e, "unable to start channel listener");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Mutex,
        time::{Duration, Instant},
    };

    use super::*;

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn test_handlers_receive_matching_events() {
        let channel = Channel::new();
        let notes = Arc::new(Mutex::new(Vec::new()));
        let layouts = Arc::new(Mutex::new(Vec::new()));
        let all = Arc::new(Mutex::new(0));

        let n = notes.clone();
        channel.on_notify(move |pass, message| n.lock().unwrap().push(format!("{pass}:{message}")));
        let l = layouts.clone();
        channel.on_relayout(move |_, root| l.lock().unwrap().push(root.clone()));
        let a = all.clone();
        channel.on_event(move |_| *a.lock().unwrap() += 1);

        channel.emit("p1", TransformEvent::Started);
        channel.emit("p1", TransformEvent::Notify("done".to_string()));
        channel.emit(
            "p1",
            TransformEvent::Relayout {
                root: "Process_1".to_string(),
            },
        );

        assert!(wait_until(|| *all.lock().unwrap() == 3));
        assert_eq!(*notes.lock().unwrap(), vec!["p1:done"]);
        assert_eq!(*layouts.lock().unwrap(), vec!["Process_1"]);
    }

    #[test]
    fn test_emit_does_not_wait_for_handlers() {
        let channel = Channel::new();
        let finished = Arc::new(AtomicBool::new(false));
        let f = finished.clone();
        channel.on_relayout(move |_, _| {
            std::thread::sleep(Duration::from_millis(300));
            f.store(true, Ordering::SeqCst);
        });

        let start = Instant::now();
        channel.emit(
            "p1",
            TransformEvent::Relayout {
                root: "Process_1".to_string(),
            },
        );
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(!finished.load(Ordering::SeqCst));

        assert!(wait_until(|| finished.load(Ordering::SeqCst)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runtime_listener_dispatches() {
        let channel = Channel::with_runtime(&Handle::current());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        channel.on_notify(move |_, message| {
            let _ = tx.send(message.to_string());
        });

        channel.emit("p1", TransformEvent::Notify("hello".to_string()));

        let message = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(message.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_subscribers_receive_broadcast() {
        let channel = Channel::new();
        channel.emit("p0", TransformEvent::Started);

        let mut rx = channel.subscribe();
        channel.emit("p1", TransformEvent::Done);

        let e = rx.recv().await.unwrap();
        assert_eq!(e.pass_id, "p1");
        assert_eq!(e.event, TransformEvent::Done);
    }
}
