//! Resolved schema nodes, stored in an arena and addressed by [`SchemaId`].
//!
//! Every schema position in the document gets exactly one node. A `$ref`
//! shares the id of its target, which is what makes identity comparisons
//! and cyclic graphs work without reference counting cycles.

use indexmap::IndexMap;
use serde_json::Value;

use crate::pointer::Location;

/// Stable handle to a schema node.
///
/// Handed out as soon as a node's slot is reserved, so a handle may be
/// observed before its node is finished. It is only dereferenced through
/// a completed [`SchemaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) usize);

impl SchemaId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// JSON Schema primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl SchemaType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }
}

/// The `additionalProperties` keyword as declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdditionalProperties {
    /// Not declared. Treated as `false` by the compiler.
    #[default]
    Unset,
    Allowed(bool),
    Schema(SchemaId),
}

/// A resolved schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    /// Canonical position of the definition.
    pub location: Option<Location>,
    /// Type name: the component key, or the last structural segment.
    pub name: String,
    pub schema_type: Option<SchemaType>,
    pub nullable: bool,
    pub format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub properties: IndexMap<String, SchemaId>,
    pub required: Vec<String>,
    pub items: Option<SchemaId>,
    pub additional_properties: AdditionalProperties,
    pub enum_values: Option<Vec<Value>>,
    pub one_of: Vec<SchemaId>,
    pub any_of: Vec<SchemaId>,
    pub all_of: Vec<SchemaId>,
    pub default: Option<Value>,
    pub read_only: bool,
    pub write_only: bool,
}

/// Completed, immutable set of schema nodes.
#[derive(Debug, Clone, Default)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
}

impl SchemaArena {
    pub(crate) fn from_nodes(nodes: Vec<SchemaNode>) -> Self {
        Self { nodes }
    }

    /// Dereference a handle.
    ///
    /// Every id is produced by the resolver that built this arena, so the
    /// lookup cannot miss for ids from the same `ApiSpec`.
    pub fn get(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn try_get(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &SchemaNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (SchemaId(i), node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_type_round_trips_names() {
        for name in ["string", "integer", "number", "boolean", "array", "object", "null"] {
            assert_eq!(SchemaType::parse(name).map(|t| t.as_str()), Some(name));
        }
        assert_eq!(SchemaType::parse("file"), None);
    }

    #[test]
    fn arena_iterates_in_id_order() {
        let arena = SchemaArena::from_nodes(vec![
            SchemaNode {
                name: "A".into(),
                ..Default::default()
            },
            SchemaNode {
                name: "B".into(),
                ..Default::default()
            },
        ]);
        let names: Vec<_> = arena.iter().map(|(id, n)| (id.index(), n.name.as_str())).collect();
        assert_eq!(names, vec![(0, "A"), (1, "B")]);
        assert!(arena.try_get(SchemaId(2)).is_none());
    }
}
