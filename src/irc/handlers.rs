//! Message handlers and the registry the client loop dispatches from.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::irc::client::Client;
use crate::irc::message::Message;

type AcceptFn = dyn Fn(&Message) -> bool + Send + Sync;
type ActFn = dyn Fn(Arc<Client>, Arc<Message>) -> BoxFuture<'static, ()> + Send + Sync;

/// A predicate plus the action to run when it matches.
///
/// `accept` runs inline on the client loop and must not block. `act` runs
/// in its own spawned task, so it may await I/O (for example
/// [`Client::send`]) or add and remove handlers.
///
/// Handlers are identified by `Arc` pointer, not by value.
pub struct Handler {
    accept: Box<AcceptFn>,
    act: Box<ActFn>,
}

impl Handler {
    pub fn new<A, F, Fut>(accept: A, act: F) -> Arc<Self>
    where
        A: Fn(&Message) -> bool + Send + Sync + 'static,
        F: Fn(Arc<Client>, Arc<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Arc::new(Self {
            accept: Box::new(accept),
            act: Box::new(move |client, msg| Box::pin(act(client, msg))),
        })
    }

    /// Handler for a single command, matched case-insensitively.
    pub fn on_command<F, Fut>(command: impl Into<String>, act: F) -> Arc<Self>
    where
        F: Fn(Arc<Client>, Arc<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let command = command.into();
        Self::new(move |msg: &Message| msg.is_command(&command), act)
    }

    pub fn accepts(&self, msg: &Message) -> bool {
        (self.accept)(msg)
    }

    pub fn act(&self, client: Arc<Client>, msg: Arc<Message>) -> BoxFuture<'static, ()> {
        (self.act)(client, msg)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", self)
    }
}

/// Shared, ordered set of handlers.
///
/// Clones share the same set. The lock is only held to push, filter or
/// clone the vector, never while a handler runs, so handlers may mutate the
/// registry from inside their own action.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<Mutex<Vec<Arc<Handler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. Adding the same handler twice registers it twice.
    pub fn add(&self, handler: Arc<Handler>) -> &Self {
        self.handlers.lock().push(handler);
        self
    }

    /// Remove every registration of `handler`. Unknown handlers are ignored.
    pub fn remove(&self, handler: &Arc<Handler>) {
        self.handlers.lock().retain(|h| !Arc::ptr_eq(h, handler));
    }

    pub fn contains(&self, handler: &Arc<Handler>) -> bool {
        self.handlers.lock().iter().any(|h| Arc::ptr_eq(h, handler))
    }

    /// Point-in-time copy of the registered handlers, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Handler>> {
        self.handlers.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(accept: bool) -> Arc<Handler> {
        Handler::new(move |_: &Message| accept, |_, _| async {})
    }

    fn same(a: &[Arc<Handler>], b: &[Arc<Handler>]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
    }

    #[test]
    fn test_add_remove_snapshot() {
        let registry = HandlerRegistry::new();
        let (h1, h2, h3) = (noop(true), noop(true), noop(false));
        registry.add(h1.clone()).add(h2.clone());

        let before = registry.snapshot();
        registry.add(h3.clone());
        let after = registry.snapshot();
        assert!(same(&after[..2], &before));
        assert!(Arc::ptr_eq(&after[2], &h3));

        registry.remove(&h2);
        let removed = registry.snapshot();
        assert!(same(&removed, &[h1.clone(), h3.clone()]));
        assert!(!registry.contains(&h2));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = HandlerRegistry::new();
        let h = noop(true);
        registry.add(h.clone());
        registry.remove(&noop(true));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_no_dedup_and_remove_drops_all_copies() {
        let registry = HandlerRegistry::new();
        let h = noop(true);
        registry.add(h.clone()).add(h.clone());
        assert_eq!(registry.len(), 2);
        registry.remove(&h);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_independent_of_later_changes() {
        let registry = HandlerRegistry::new();
        let h = noop(true);
        registry.add(h.clone());
        let snap = registry.snapshot();
        registry.remove(&h);
        assert_eq!(snap.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clones_share_the_set() {
        let registry = HandlerRegistry::new();
        let other = registry.clone();
        other.add(noop(true));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_on_command_matches_case_insensitively() {
        let h = Handler::on_command("ping", |_, _| async {});
        assert!(h.accepts(&Message::new("PING")));
        assert!(!h.accepts(&Message::new("PONG")));
    }

    #[test]
    fn test_concurrent_add_and_snapshot_lose_nothing() {
        let registry = HandlerRegistry::new();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let mine: Vec<_> = (0..50).map(|_| noop(true)).collect();
                    for h in &mine {
                        registry.add(h.clone());
                        let snap = registry.snapshot();
                        assert!(snap.iter().any(|s| Arc::ptr_eq(s, h)));
                    }
                    mine
                })
            })
            .collect();

        let added: Vec<Arc<Handler>> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        assert_eq!(registry.len(), 400);
        assert!(added.iter().all(|h| registry.contains(h)));
    }
}
