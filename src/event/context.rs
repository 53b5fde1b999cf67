//! Location and global contexts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a context describes where an event happened or what/who it concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Location,
    Global,
}

/// An immutable, typed and identified descriptor attached to an event.
///
/// Every instance carries a private uniqueness token. Equality ignores it:
/// two contexts are equal when kind, type and id match.
#[derive(Debug, Clone, Serialize)]
#[serde(into = "WireContext")]
pub struct Context {
    kind: ContextKind,
    context_type: String,
    id: String,
    instance_id: Uuid,
}

impl Context {
    pub fn new(kind: ContextKind, context_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            context_type: context_type.into(),
            id: id.into(),
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn location(context_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(ContextKind::Location, context_type, id)
    }

    pub fn global(context_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(ContextKind::Global, context_type, id)
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn context_type(&self) -> &str {
        &self.context_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// `true` when both contexts share type and id, regardless of kind.
    pub fn same_identity(&self, other: &Context) -> bool {
        self.context_type == other.context_type && self.id == other.id
    }

    pub(crate) fn into_kind(mut self, kind: ContextKind) -> Self {
        self.kind = kind;
        self
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.same_identity(other)
    }
}

impl Eq for Context {}

/// Serialised form of a [`Context`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireContext {
    #[serde(rename = "_type")]
    pub context_type: String,
    pub id: String,
}

impl WireContext {
    pub fn into_context(self, kind: ContextKind) -> Context {
        Context::new(kind, self.context_type, self.id)
    }
}

impl From<Context> for WireContext {
    fn from(context: Context) -> Self {
        Self {
            context_type: context.context_type,
            id: context.id,
        }
    }
}

/// The mutable context lists plugins enrich in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contexts {
    pub location_stack: Vec<Context>,
    pub global_contexts: Vec<Context>,
}

impl Contexts {
    pub fn new(location_stack: Vec<Context>, global_contexts: Vec<Context>) -> Self {
        Self {
            location_stack,
            global_contexts,
        }
    }

    /// Merge owner contexts into an event's contexts.
    ///
    /// The order is asymmetric: location `[owner..., event...]`, global `[event..., owner...]`.
    pub fn merge_owner(owner: &Contexts, event: Contexts) -> Contexts {
        let mut location_stack = owner.location_stack.clone();
        location_stack.extend(event.location_stack);

        let mut global_contexts = event.global_contexts;
        global_contexts.extend(owner.global_contexts.iter().cloned());

        Contexts {
            location_stack,
            global_contexts,
        }
    }

    pub fn has_global(&self, context_type: &str) -> bool {
        self.global_contexts
            .iter()
            .any(|c| c.context_type() == context_type)
    }
}
