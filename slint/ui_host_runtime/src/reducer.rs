//! Folds one packet's commands into the schema.
//!
//! The schema is an append-only document: additions land at the end in wire
//! order, and a clear drops elements before any addition from the same packet
//! is appended, wherever the clear sits in the list.

use crate::protocol::UiCommand;
use std::collections::HashSet;
use tracing::debug;

/// What a `CLEAR_CONTAINER` removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClearScope {
    /// Any clear empties the whole schema.
    #[default]
    Global,
    /// A clear removes only elements tagged with the cleared container id.
    Container,
}

/// Ordered list of displayable elements. Never holds a clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    elements: Vec<UiCommand>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[UiCommand] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UiCommand> {
        self.elements.iter()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a UiCommand;
    type IntoIter = std::slice::Iter<'a, UiCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

pub fn reduce(schema: Schema, commands: Vec<UiCommand>, scope: ClearScope) -> Schema {
    if commands.is_empty() {
        return schema;
    }

    let (clears, additions): (Vec<UiCommand>, Vec<UiCommand>) =
        commands.into_iter().partition(UiCommand::is_clear);

    let mut elements = schema.elements;

    if !clears.is_empty() {
        match scope {
            ClearScope::Global => {
                debug!(dropped = elements.len(), "clearing entire schema");
                elements.clear();
            }
            ClearScope::Container
                if clears.iter().any(|clear| clear.container_id().is_none()) =>
            {
                debug!(dropped = elements.len(), "untargeted clear; clearing entire schema");
                elements.clear();
            }
            ClearScope::Container => {
                let cleared: HashSet<&str> =
                    clears.iter().filter_map(UiCommand::container_id).collect();
                let before = elements.len();
                elements.retain(|element| {
                    element
                        .container_id()
                        .is_none_or(|container_id| !cleared.contains(container_id))
                });
                debug!(
                    containers = ?cleared,
                    dropped = before - elements.len(),
                    "clearing containers"
                );
            }
        }
    }

    elements.extend(additions);
    Schema { elements }
}
