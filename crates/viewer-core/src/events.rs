//! Observation channels published by the page view.
//!
//! Each concern gets its own channel, so a host subscribes only to the ones
//! it reflects.

use crate::ViewError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Box<dyn FnMut(&T)>;

pub struct Channel<T> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self { next_id: 0, subscribers: Vec::new() }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").field("subscribers", &self.subscribers.len()).finish()
    }
}

impl<T> Channel<T> {
    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&T) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &T) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChanged {
    pub page: u32,
    pub page_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Started,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Started,
    Finished,
}

#[derive(Debug, Default)]
pub struct ViewEvents {
    pub page_changed: Channel<PageChanged>,
    pub load_state: Channel<LoadState>,
    pub render_state: Channel<RenderState>,
    pub error: Channel<ViewError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emits_to_every_subscriber_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut channel = Channel::default();

        let first = Rc::clone(&seen);
        channel.subscribe(move |event: &u32| first.borrow_mut().push(("a", *event)));
        let second = Rc::clone(&seen);
        channel.subscribe(move |event: &u32| second.borrow_mut().push(("b", *event)));

        channel.emit(&7);

        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let count = Rc::new(RefCell::new(0));
        let mut channel = Channel::default();

        let counter = Rc::clone(&count);
        let id = channel.subscribe(move |_: &LoadState| *counter.borrow_mut() += 1);

        channel.emit(&LoadState::Started);
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        channel.emit(&LoadState::Finished);

        assert_eq!(*count.borrow(), 1);
        assert!(channel.is_empty());
    }
}
