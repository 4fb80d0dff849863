//! Typed simulation events with bounded per-kind queues.
//!
//! [`Simulation`](crate::simulation::Simulation) turns tick reports into
//! events and queues them here. Listeners see them in batch when
//! [`EventBus::deliver`] is called, never in the middle of a tick.
//!
//! Each kind has its own queue bound. A crowded vessel can cross hundreds of
//! rule thresholds in one warped tick, while vessel lifecycle events come one
//! at a time, so the defaults in [`EventKind::default_capacity`] differ per
//! kind. When a queue is full the oldest event is dropped and counted.
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which drops the
//! kind's queue and makes emitting it a no-op.

use std::collections::VecDeque;

use crate::id::{ResourceId, RuleId, SubjectId, SupplyId, VesselId};
use crate::rule::Severity;
use crate::supply::SupplyAlert;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the vessel tick count at which they
/// occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Vessels --
    VesselAdded {
        vessel: VesselId,
    },
    VesselRemoved {
        vessel: VesselId,
        tick: u64,
    },

    // -- Crew --
    RuleCrossed {
        vessel: VesselId,
        subject: SubjectId,
        rule: RuleId,
        severity: Severity,
        message: Option<String>,
        tick: u64,
    },
    SubjectRemoved {
        vessel: VesselId,
        subject: SubjectId,
        name: String,
        tick: u64,
    },

    // -- Supplies --
    SupplyAlert {
        vessel: VesselId,
        supply: SupplyId,
        resource: ResourceId,
        alert: SupplyAlert,
        message: Option<String>,
        tick: u64,
    },

    // -- Executor --
    ExecutionCapped {
        vessel: VesselId,
        passes: u64,
        tick: u64,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    VesselAdded,
    VesselRemoved,
    RuleCrossed,
    SubjectRemoved,
    SupplyAlert,
    ExecutionCapped,
}

const EVENT_KIND_COUNT: usize = 6;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::VesselAdded { .. } => EventKind::VesselAdded,
            Event::VesselRemoved { .. } => EventKind::VesselRemoved,
            Event::RuleCrossed { .. } => EventKind::RuleCrossed,
            Event::SubjectRemoved { .. } => EventKind::SubjectRemoved,
            Event::SupplyAlert { .. } => EventKind::SupplyAlert,
            Event::ExecutionCapped { .. } => EventKind::ExecutionCapped,
        }
    }

    /// The vessel the event concerns.
    pub fn vessel(&self) -> VesselId {
        match *self {
            Event::VesselAdded { vessel }
            | Event::VesselRemoved { vessel, .. }
            | Event::RuleCrossed { vessel, .. }
            | Event::SubjectRemoved { vessel, .. }
            | Event::SupplyAlert { vessel, .. }
            | Event::ExecutionCapped { vessel, .. } => vessel,
        }
    }
}

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::VesselAdded,
        EventKind::VesselRemoved,
        EventKind::RuleCrossed,
        EventKind::SubjectRemoved,
        EventKind::SupplyAlert,
        EventKind::ExecutionCapped,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Queue bound used until [`EventBus::set_capacity`] says otherwise.
    pub fn default_capacity(self) -> usize {
        match self {
            // Every crew member can cross a threshold on every rule per tick.
            EventKind::RuleCrossed => 1024,
            EventKind::SupplyAlert | EventKind::SubjectRemoved => 256,
            EventKind::VesselAdded | EventKind::VesselRemoved => 64,
            EventKind::ExecutionCapped => 16,
        }
    }
}

// ---------------------------------------------------------------------------
// Event queue
// ---------------------------------------------------------------------------

/// Pending events of one kind, oldest first, holding at most `capacity`.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<Event>,
    capacity: usize,
    emitted: u64,
    dropped: u64,
}

impl EventQueue {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            emitted: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.emitted += 1;
        self.events.push_back(event);
        self.trim();
    }

    /// Change the bound. Shrinking drops the oldest pending events.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.trim();
    }

    fn trim(&mut self) {
        while self.events.len() > self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events ever pushed, dropped ones included.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Events lost to the bound.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.events.iter()
    }

    /// Remove and return every pending event, oldest first.
    pub fn take(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A read-only event listener.
pub type Listener = Box<dyn FnMut(&Event)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Listener priority. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct ListenerEntry {
    listener: Listener,
    priority: ListenerPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One bounded queue per event kind, listener lists, and suppression flags.
pub struct EventBus {
    queues: [Option<EventQueue>; EVENT_KIND_COUNT],
    capacities: [usize; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queues", &self.queues)
            .field("capacities", &self.capacities)
            .field("suppressed", &self.suppressed)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// A bus using each kind's [`EventKind::default_capacity`].
    pub fn new() -> Self {
        Self {
            queues: Default::default(),
            capacities: EventKind::ALL.map(EventKind::default_capacity),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            next_insertion_order: 0,
        }
    }

    /// Bound the pending events of one kind. Applies to events already
    /// queued, dropping the oldest if there are too many.
    pub fn set_capacity(&mut self, kind: EventKind, capacity: usize) {
        let capacity = capacity.max(1);
        self.capacities[kind.index()] = capacity;
        if let Some(queue) = self.queues[kind.index()].as_mut() {
            queue.set_capacity(capacity);
        }
    }

    pub fn capacity(&self, kind: EventKind) -> usize {
        self.capacities[kind.index()]
    }

    /// Stop recording a kind and drop anything already queued for it.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.queues[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Queue an event. No-op for suppressed kinds.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.capacities[idx];
        let queue = self.queues[idx].get_or_insert_with(|| EventQueue::new(capacity));
        let dropped = queue.dropped();
        queue.push(event);
        if queue.dropped() > dropped && queue.dropped().is_power_of_two() {
            log::warn!(
                "{:?} queue full at {capacity}, {} events dropped so far",
                EventKind::ALL[idx],
                queue.dropped()
            );
        }
    }

    /// Listen to a kind with normal priority and no filter.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.on_filtered(kind, ListenerPriority::Normal, None, listener);
    }

    pub fn on_filtered(
        &mut self,
        kind: EventKind,
        priority: ListenerPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        let listeners = &mut self.listeners[kind.index()];
        listeners.push(ListenerEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
        listeners.sort_by_key(|entry| (entry.priority, entry.insertion_order));
    }

    /// Hand every queued event to its listeners and empty the queues.
    ///
    /// Listeners of a kind run in `(priority, registration)` order; each
    /// sees the kind's events oldest first.
    pub fn deliver(&mut self) {
        for kind in EventKind::ALL {
            let idx = kind.index();
            let events = match self.queues[idx].as_mut() {
                Some(queue) if !queue.is_empty() => queue.take(),
                _ => continue,
            };
            for entry in self.listeners[idx].iter_mut() {
                for event in &events {
                    if entry.filter.as_ref().is_some_and(|f| !f(event)) {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }
        }
    }

    pub fn queue(&self, kind: EventKind) -> Option<&EventQueue> {
        self.queues[kind.index()].as_ref()
    }

    pub fn pending_count(&self, kind: EventKind) -> usize {
        self.queue(kind).map_or(0, EventQueue::len)
    }

    /// Events ever emitted for a kind, dropped ones included.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.queue(kind).map_or(0, EventQueue::emitted)
    }

    /// Events of a kind lost because its queue was full.
    pub fn dropped_count(&self, kind: EventKind) -> u64 {
        self.queue(kind).map_or(0, EventQueue::dropped)
    }

    /// Empty every queue. Listeners, capacities and suppression stay.
    pub fn clear_all(&mut self) {
        for queue in self.queues.iter_mut().flatten() {
            queue.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
