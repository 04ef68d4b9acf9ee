//! Compiled model type descriptors.

use indexmap::IndexMap;
use serde_json::Value;

use apidrive_spec::{SchemaId, SchemaType};

/// The JSON shape a model type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Unconstrained: any JSON value.
    Any,
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Any => "any",
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

impl From<SchemaType> for Kind {
    fn from(ty: SchemaType) -> Self {
        match ty {
            SchemaType::Null => Kind::Null,
            SchemaType::Boolean => Kind::Boolean,
            SchemaType::Integer => Kind::Integer,
            SchemaType::Number => Kind::Number,
            SchemaType::String => Kind::String,
            SchemaType::Array => Kind::Array,
            SchemaType::Object => Kind::Object,
        }
    }
}

/// What an object does with keys outside its field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalPolicy {
    /// Unexpected keys are an error. The default.
    Forbid,
    Allow,
    /// Extra values must validate against this schema.
    Schema(SchemaId),
}

/// One entry of an object's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub schema: SchemaId,
    pub required: bool,
}

/// A compiled, strictly-validating type.
///
/// Child types are referenced by [`SchemaId`] and looked up through the
/// [`ModelRegistry`](crate::ModelRegistry) when a value is validated, so
/// recursive schemas compile without building infinite structures.
#[derive(Debug)]
pub struct ModelType {
    pub(crate) id: Option<SchemaId>,
    pub(crate) name: String,
    pub(crate) kind: Kind,
    pub(crate) nullable: bool,
    pub(crate) format: Option<String>,
    pub(crate) fields: IndexMap<String, Field>,
    pub(crate) additional: AdditionalPolicy,
    pub(crate) items: Option<SchemaId>,
    pub(crate) enum_values: Option<Vec<Value>>,
    pub(crate) one_of: Vec<SchemaId>,
    pub(crate) any_of: Vec<SchemaId>,
    pub(crate) all_of: Vec<SchemaId>,
}

impl ModelType {
    /// The unconstrained type used for free-form values.
    pub(crate) fn any() -> Self {
        Self {
            id: None,
            name: "any".to_string(),
            kind: Kind::Any,
            nullable: true,
            format: None,
            fields: IndexMap::new(),
            additional: AdditionalPolicy::Allow,
            items: None,
            enum_values: None,
            one_of: Vec::new(),
            any_of: Vec::new(),
            all_of: Vec::new(),
        }
    }

    /// The schema this type was compiled from. `None` for the free-form type.
    pub fn schema_id(&self) -> Option<SchemaId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Object fields in declaration order, `allOf` members included.
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Names of the required fields, in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, f)| f.required)
            .map(|(name, _)| name.as_str())
    }

    pub fn additional_properties(&self) -> AdditionalPolicy {
        self.additional
    }

    pub fn items(&self) -> Option<SchemaId> {
        self.items
    }

    pub fn enum_values(&self) -> Option<&[Value]> {
        self.enum_values.as_deref()
    }

    pub fn one_of(&self) -> &[SchemaId] {
        &self.one_of
    }

    pub fn any_of(&self) -> &[SchemaId] {
        &self.any_of
    }

    pub fn all_of(&self) -> &[SchemaId] {
        &self.all_of
    }

    /// True for a pure `oneOf`/`anyOf` wrapper with no shape of its own.
    pub(crate) fn is_union(&self) -> bool {
        self.kind == Kind::Any
            && self.fields.is_empty()
            && (!self.one_of.is_empty() || !self.any_of.is_empty())
    }
}
