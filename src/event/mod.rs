//! Double-buffered event channels
//!
//! Events raised during a tick land in the "next" buffer of their channel.
//! At the tick boundary "next" becomes "current", which is what readers see
//! for exactly one tick.

pub mod pulse;

use std::any::Any;
use std::collections::HashMap;

use crate::tag::TypeTag;

pub use pulse::PulseQueue;

/// Type-erased control surface of one event channel
trait EventBuffer: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn swap(&mut self);
    fn clear(&mut self);
}

struct Channel<T> {
    current: Vec<T>,
    next: Vec<T>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            next: Vec::new(),
        }
    }
}

impl<T: 'static> EventBuffer for Channel<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn swap(&mut self) {
        // the old current buffer keeps its allocation for the next tick
        std::mem::swap(&mut self.current, &mut self.next);
        self.next.clear();
    }

    fn clear(&mut self) {
        self.current.clear();
        self.next.clear();
    }
}

/// All event channels of a world, one per event type.
#[derive(Default)]
pub struct Events {
    channels: HashMap<TypeTag, Box<dyn EventBuffer>>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `event`; it becomes visible after the next buffer swap.
    pub fn raise<T: 'static>(&mut self, event: T) {
        self.channel_mut::<T>().next.push(event);
    }

    /// Build the event from `args` and queue it.
    pub fn raise_from<T: 'static, A: Into<T>>(&mut self, args: A) {
        self.raise::<T>(args.into());
    }

    /// Whether events of this type were raised since the last swap
    pub fn has_pending<T: 'static>(&self) -> bool {
        self.channel::<T>().is_some_and(|channel| !channel.next.is_empty())
    }

    /// Whether events of this type are readable this tick
    pub fn has_visible<T: 'static>(&self) -> bool {
        !self.visible::<T>().is_empty()
    }

    /// Events raised during the previous tick
    pub fn visible<T: 'static>(&self) -> &[T] {
        self.channel::<T>()
            .map(|channel| channel.current.as_slice())
            .unwrap_or(&[])
    }

    pub fn swap_buffers(&mut self) {
        for channel in self.channels.values_mut() {
            channel.swap();
        }
    }

    /// Drop every queued and visible event, keeping the channels.
    pub fn clear(&mut self) {
        for channel in self.channels.values_mut() {
            channel.clear();
        }
    }

    fn channel<T: 'static>(&self) -> Option<&Channel<T>> {
        self.channels
            .get(&TypeTag::of::<T>())?
            .as_any()
            .downcast_ref::<Channel<T>>()
    }

    fn channel_mut<T: 'static>(&mut self) -> &mut Channel<T> {
        self.channels
            .entry(TypeTag::of::<T>())
            .or_insert_with(|| Box::new(Channel::<T>::default()))
            .as_any_mut()
            .downcast_mut::<Channel<T>>()
            .expect("Internal event error. Channel registered under a foreign event type.")
    }
}
