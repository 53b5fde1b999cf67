//! Event domain: contexts, events, owner merge rules, wire shape and id generation.

mod context;
mod types;

pub mod id;

pub use context::{Context, ContextKind, Contexts, WireContext};
pub use id::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use types::now_millis;

use serde::{Deserialize, Serialize};

/// Attributes supplied by application code when tracking an event.
///
/// Ids and timestamps are assigned by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireAttributes", into = "WireAttributes")]
pub struct EventAttributes {
    pub event_type: String,
    pub location_stack: Vec<Context>,
    pub global_contexts: Vec<Context>,
}

impl EventAttributes {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            location_stack: Vec::new(),
            global_contexts: Vec::new(),
        }
    }

    /// Push a location context; `context` is converted to the location kind.
    pub fn with_location(mut self, context: Context) -> Self {
        self.location_stack.push(context.into_kind(ContextKind::Location));
        self
    }

    /// Push a global context; `context` is converted to the global kind.
    pub fn with_global(mut self, context: Context) -> Self {
        self.global_contexts.push(context.into_kind(ContextKind::Global));
        self
    }

    fn into_contexts(self) -> (String, Contexts) {
        (
            self.event_type,
            Contexts {
                location_stack: self.location_stack,
                global_contexts: self.global_contexts,
            },
        )
    }
}

/// An immutable tracked event.
///
/// Deriving a new event from an existing one ([`Event::derive`], `Clone`, or
/// deserialising the wire form) keeps its id and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireEvent", into = "WireEvent")]
pub struct Event {
    event_type: String,
    id: String,
    time: u64,
    location_stack: Vec<Context>,
    global_contexts: Vec<Context>,
}

impl Event {
    /// Build an event from attributes with an explicit identity.
    pub fn new(attributes: EventAttributes, id: impl Into<String>, time: u64) -> Self {
        let (event_type, contexts) = attributes.into_contexts();
        Self::from_parts(event_type, id.into(), time, contexts)
    }

    /// Stamp a fresh id and time on `attributes` and merge the owner's contexts.
    ///
    /// Location contexts become `[owner..., event...]`, global contexts become
    /// `[event..., owner...]`.
    pub fn track(attributes: EventAttributes, owner: &Contexts, ids: &dyn IdGenerator) -> Self {
        let (event_type, contexts) = attributes.into_contexts();
        let merged = Contexts::merge_owner(owner, contexts);
        Self::from_parts(event_type, ids.generate(), now_millis(), merged)
    }

    /// A copy of this event carrying `contexts`, with the same id and time.
    pub fn derive(&self, contexts: Contexts) -> Self {
        Self::from_parts(self.event_type.clone(), self.id.clone(), self.time, contexts)
    }

    fn from_parts(event_type: String, id: String, time: u64, contexts: Contexts) -> Self {
        let Contexts {
            location_stack,
            global_contexts,
        } = contexts;
        Self {
            event_type,
            id,
            time,
            location_stack: location_stack
                .into_iter()
                .map(|c| c.into_kind(ContextKind::Location))
                .collect(),
            global_contexts: global_contexts
                .into_iter()
                .map(|c| c.into_kind(ContextKind::Global))
                .collect(),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn location_stack(&self) -> &[Context] {
        &self.location_stack
    }

    pub fn global_contexts(&self) -> &[Context] {
        &self.global_contexts
    }

    /// Owned copy of the event's contexts, for enrichment.
    pub fn contexts(&self) -> Contexts {
        Contexts {
            location_stack: self.location_stack.clone(),
            global_contexts: self.global_contexts.clone(),
        }
    }

    /// The shape a transport serialises. Kinds and instance tokens are stripped.
    pub fn to_wire(&self) -> WireEvent {
        WireEvent::from(self.clone())
    }
}

/// Serialised form of an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub id: String,
    pub time: u64,
    #[serde(default)]
    pub location_stack: Vec<WireContext>,
    #[serde(default)]
    pub global_contexts: Vec<WireContext>,
}

impl From<Event> for WireEvent {
    fn from(event: Event) -> Self {
        Self {
            event_type: event.event_type,
            id: event.id,
            time: event.time,
            location_stack: event.location_stack.into_iter().map(WireContext::from).collect(),
            global_contexts: event
                .global_contexts
                .into_iter()
                .map(WireContext::from)
                .collect(),
        }
    }
}

impl From<WireEvent> for Event {
    fn from(wire: WireEvent) -> Self {
        Self {
            event_type: wire.event_type,
            id: wire.id,
            time: wire.time,
            location_stack: wire
                .location_stack
                .into_iter()
                .map(|c| c.into_context(ContextKind::Location))
                .collect(),
            global_contexts: wire
                .global_contexts
                .into_iter()
                .map(|c| c.into_context(ContextKind::Global))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireAttributes {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    location_stack: Vec<WireContext>,
    #[serde(default)]
    global_contexts: Vec<WireContext>,
}

impl From<WireAttributes> for EventAttributes {
    fn from(wire: WireAttributes) -> Self {
        Self {
            event_type: wire.event_type,
            location_stack: wire
                .location_stack
                .into_iter()
                .map(|c| c.into_context(ContextKind::Location))
                .collect(),
            global_contexts: wire
                .global_contexts
                .into_iter()
                .map(|c| c.into_context(ContextKind::Global))
                .collect(),
        }
    }
}

impl From<EventAttributes> for WireAttributes {
    fn from(attributes: EventAttributes) -> Self {
        Self {
            event_type: attributes.event_type,
            location_stack: attributes
                .location_stack
                .into_iter()
                .map(WireContext::from)
                .collect(),
            global_contexts: attributes
                .global_contexts
                .into_iter()
                .map(WireContext::from)
                .collect(),
        }
    }
}
