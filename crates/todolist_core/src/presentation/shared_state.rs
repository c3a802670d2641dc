//! Replay-latest state shared by any number of observers.
//!
//! # Responsibility
//! - Run one upstream subscription per state, no matter how many observers.
//! - Hand every new observer the latest value immediately.
//! - Tear the upstream down only after it has had zero observers for the
//!   whole grace period.
//!
//! # Invariants
//! - The upstream is started lazily by the first observer.
//! - A re-attach during the grace period cancels the pending teardown and
//!   keeps the running upstream.
//! - The last published value survives teardown and is replayed on restart
//!   until the new upstream emits.
//! - An upstream that ends on its own closes the state for good: observers
//!   are told through `changed`/`wait_for` returning `None`, and no later
//!   observer restarts it.

use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

type UpstreamFactory<T> = Box<dyn Fn() -> BoxStream<'static, T> + Send + Sync>;

/// Shared, lazily started state stream.
pub struct SharedState<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for SharedState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Shared<T> {
    tx: watch::Sender<Slot<T>>,
    factory: UpstreamFactory<T>,
    lifecycle: Arc<Lifecycle>,
}

/// Published value plus the terminal closed mark.
#[derive(Clone)]
struct Slot<T> {
    value: T,
    closed: bool,
}

struct Lifecycle {
    name: &'static str,
    grace: Duration,
    runtime: Handle,
    control: Mutex<Control>,
}

#[derive(Default)]
struct Control {
    observers: usize,
    upstream: Option<JoinHandle<()>>,
    pending_stop: Option<JoinHandle<()>>,
}

impl<T> SharedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// `factory` is called each time the upstream (re)starts.
    pub fn new<F>(
        name: &'static str,
        initial: T,
        grace: Duration,
        runtime: Handle,
        factory: F,
    ) -> Self
    where
        F: Fn() -> BoxStream<'static, T> + Send + Sync + 'static,
    {
        let (tx, _) = watch::channel(Slot {
            value: initial,
            closed: false,
        });
        Self {
            inner: Arc::new(Shared {
                tx,
                factory: Box::new(factory),
                lifecycle: Arc::new(Lifecycle {
                    name,
                    grace,
                    runtime,
                    control: Mutex::new(Control::default()),
                }),
            }),
        }
    }

    /// Attaches a new observer, starting the upstream if needed.
    pub fn subscribe(&self) -> StateObserver<T> {
        let rx = self.inner.tx.subscribe();
        self.inner.lifecycle.attach(
            || self.is_closed(),
            || start_upstream(&self.inner),
        );
        StateObserver {
            rx,
            _shared: Arc::clone(&self.inner),
            _guard: ObserverGuard {
                lifecycle: Arc::clone(&self.inner.lifecycle),
            },
        }
    }

    /// Latest published value without attaching an observer.
    pub fn value(&self) -> T {
        self.inner.tx.borrow().value.clone()
    }

    /// Whether the upstream ended; the value is then frozen.
    pub fn is_closed(&self) -> bool {
        self.inner.tx.borrow().closed
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lifecycle.control.lock().observers
    }

    /// Whether an upstream subscription is currently running.
    pub fn is_active(&self) -> bool {
        self.inner
            .lifecycle
            .control
            .lock()
            .upstream
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

fn start_upstream<T>(shared: &Arc<Shared<T>>) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    let mut upstream = (shared.factory)();
    let weak: Weak<Shared<T>> = Arc::downgrade(shared);
    let name = shared.lifecycle.name;

    shared.lifecycle.runtime.spawn(async move {
        debug!("event=state_upstream module=presentation status=start state={name}");
        while let Some(value) = upstream.next().await {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            shared.tx.send_replace(Slot {
                value,
                closed: false,
            });
        }
        if let Some(shared) = weak.upgrade() {
            // Under the control lock so a concurrent attach sees either a
            // running upstream or a closed state.
            let _control = shared.lifecycle.control.lock();
            shared.tx.send_modify(|slot| slot.closed = true);
        }
        warn!("event=state_upstream module=presentation status=closed state={name}");
    })
}

impl Lifecycle {
    fn attach(&self, is_closed: impl FnOnce() -> bool, start: impl FnOnce() -> JoinHandle<()>) {
        let mut control = self.control.lock();
        control.observers += 1;
        if let Some(stop) = control.pending_stop.take() {
            stop.abort();
        }

        let running = control
            .upstream
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        if !running && !is_closed() {
            control.upstream = Some(start());
        }
    }

    fn detach(self: &Arc<Self>) {
        let mut control = self.control.lock();
        control.observers = control.observers.saturating_sub(1);
        if control.observers > 0 {
            return;
        }

        let weak = Arc::downgrade(self);
        let grace = self.grace;
        control.pending_stop = Some(self.runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(lifecycle) = weak.upgrade() {
                lifecycle.stop_if_unobserved();
            }
        }));
    }

    fn stop_if_unobserved(&self) {
        let mut control = self.control.lock();
        if control.observers > 0 {
            return;
        }
        control.pending_stop = None;
        if let Some(upstream) = control.upstream.take() {
            upstream.abort();
            debug!(
                "event=state_upstream module=presentation status=stopped state={}",
                self.name
            );
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        let control = self.control.get_mut();
        if let Some(upstream) = control.upstream.take() {
            upstream.abort();
        }
    }
}

struct ObserverGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.lifecycle.detach();
    }
}

/// Handle held by one observer of a [`SharedState`].
///
/// Dropping it detaches the observer.
pub struct StateObserver<T> {
    rx: watch::Receiver<Slot<T>>,
    _shared: Arc<Shared<T>>,
    _guard: ObserverGuard,
}

impl<T: Clone> StateObserver<T> {
    /// Latest value; marks it as seen. Still readable after close.
    pub fn current(&mut self) -> T {
        self.rx.borrow_and_update().value.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.rx.borrow().closed
    }

    /// Waits for the next published value.
    ///
    /// Returns `None` once the state is closed or its holder is gone.
    pub async fn changed(&mut self) -> Option<T> {
        if self.is_closed() {
            return None;
        }
        self.rx.changed().await.ok()?;
        let slot = self.rx.borrow_and_update();
        if slot.closed {
            return None;
        }
        Some(slot.value.clone())
    }

    /// Waits until the latest value satisfies `predicate`, including the
    /// value already published. `None` if the state closes first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let slot = self
            .rx
            .wait_for(|slot| slot.closed || predicate(&slot.value))
            .await
            .ok()?;
        if slot.closed {
            return None;
        }
        Some(slot.value.clone())
    }
}
