//! Select-and-compare listeners over a state value.
//!
//! A listener pairs a selector with a callback. After every state change the
//! selector runs on the new state and the callback fires only when the selected
//! value differs from the last one seen.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};


type Listener<S> = Box<dyn FnMut(&S) + Send>;

pub struct Listeners<S> {
    next_id: u64,
    entries: Vec<(u64, Listener<S>)>,
}

impl<S> Default for Listeners<S> {
    fn default() -> Self {
        Self { next_id: 0, entries: Vec::new() }
    }
}

impl<S> Listeners<S> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, listener: Listener<S>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    /// Runs every listener against the state. Listeners must not subscribe or
    /// unsubscribe from inside their callback.
    pub fn notify(&mut self, state: &S) {
        for (_, listener) in self.entries.iter_mut() {
            listener(state);
        }
    }
}

pub(crate) fn lock_listeners<S>(listeners: &Mutex<Listeners<S>>) -> MutexGuard<'_, Listeners<S>> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registers `callback` to run whenever `selector(state)` changes. `initial` is
/// the state the first comparison is made against.
pub fn subscribe<S, V>(
    listeners: &Arc<Mutex<Listeners<S>>>,
    initial: &S,
    selector: impl Fn(&S) -> V + Send + 'static,
    mut callback: impl FnMut(&V) + Send + 'static,
) -> Subscription
where
    S: 'static,
    V: PartialEq + Send + 'static,
{
    let mut last = selector(initial);
    let listener: Listener<S> = Box::new(move |state: &S| {
        let value = selector(state);
        if value != last {
            callback(&value);
            last = value;
        }
    });
    let id = lock_listeners(listeners).insert(listener);
    let weak: Weak<Mutex<Listeners<S>>> = Arc::downgrade(listeners);
    Subscription {
        cancel: Some(Box::new(move || {
            if let Some(listeners) = weak.upgrade() {
                lock_listeners(&listeners).remove(id);
            }
        })),
    }
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}
