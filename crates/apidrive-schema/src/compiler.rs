//! Schema → [`ModelType`] compilation.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use apidrive_spec::{AdditionalProperties, SchemaArena, SchemaId, SchemaNode};

use crate::error::ModelError;
use crate::instance::Instance;
use crate::model_type::{AdditionalPolicy, Field, Kind, ModelType};
use crate::validate::Validator;

/// Compiles arena nodes into model types, one per [`SchemaId`].
pub struct SchemaCompiler<'a> {
    arena: &'a SchemaArena,
    compiled: Vec<Option<Arc<ModelType>>>,
    in_progress: HashSet<SchemaId>,
}

impl<'a> SchemaCompiler<'a> {
    pub fn new(arena: &'a SchemaArena) -> Self {
        Self {
            arena,
            compiled: vec![None; arena.len()],
            in_progress: HashSet::new(),
        }
    }

    /// Compile one schema. Repeated calls return the same `Arc`.
    pub fn compile(&mut self, id: SchemaId) -> Arc<ModelType> {
        if let Some(Some(model)) = self.compiled.get(id.index()) {
            return Arc::clone(model);
        }
        let model = Arc::new(self.build(id));
        if let Some(slot) = self.compiled.get_mut(id.index()) {
            *slot = Some(Arc::clone(&model));
        }
        model
    }

    /// Compile every remaining schema and freeze the result.
    pub fn finish(mut self) -> ModelRegistry {
        let arena = self.arena;
        let models = arena.iter().map(|(id, _)| self.compile(id)).collect();
        ModelRegistry {
            models,
            any: Arc::new(ModelType::any()),
        }
    }

    fn build(&mut self, id: SchemaId) -> ModelType {
        let arena = self.arena;
        let Some(node) = arena.try_get(id) else {
            return ModelType::any();
        };

        self.in_progress.insert(id);
        let mut fields = own_fields(node);
        let mut inherited_policy = None;
        let mut inherited_kind = None;
        for member in &node.all_of {
            if self.in_progress.contains(member) {
                tracing::warn!(schema = %node.name, "allOf member refers back to its own schema, skipping");
                continue;
            }
            let member = self.compile(*member);
            for (name, field) in &member.fields {
                match fields.get_mut(name) {
                    Some(existing) => existing.required |= field.required,
                    None => {
                        fields.insert(name.clone(), *field);
                    }
                }
            }
            if member.additional != AdditionalPolicy::Forbid {
                inherited_policy.get_or_insert(member.additional);
            }
            if member.kind != Kind::Any {
                inherited_kind.get_or_insert(member.kind);
            }
        }
        self.in_progress.remove(&id);

        let additional = match node.additional_properties {
            AdditionalProperties::Unset => inherited_policy.unwrap_or(AdditionalPolicy::Forbid),
            AdditionalProperties::Allowed(true) => AdditionalPolicy::Allow,
            AdditionalProperties::Allowed(false) => AdditionalPolicy::Forbid,
            AdditionalProperties::Schema(schema) => AdditionalPolicy::Schema(schema),
        };

        let kind = match node.schema_type {
            Some(ty) => Kind::from(ty),
            None if !node.properties.is_empty()
                || node.additional_properties != AdditionalProperties::Unset =>
            {
                Kind::Object
            }
            None if node.items.is_some() => Kind::Array,
            None => inherited_kind.unwrap_or(Kind::Any),
        };

        ModelType {
            id: Some(id),
            name: node.name.clone(),
            kind,
            nullable: node.nullable,
            format: node.format.clone(),
            fields,
            additional,
            items: node.items,
            enum_values: node.enum_values.clone(),
            one_of: node.one_of.clone(),
            any_of: node.any_of.clone(),
            all_of: node.all_of.clone(),
        }
    }
}

fn own_fields(node: &SchemaNode) -> IndexMap<String, Field> {
    node.properties
        .iter()
        .map(|(name, schema)| {
            let field = Field {
                schema: *schema,
                required: node.required.iter().any(|r| r == name),
            };
            (name.clone(), field)
        })
        .collect()
}

/// Every compiled model type of a document. Immutable and shareable.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<Arc<ModelType>>,
    any: Arc<ModelType>,
}

impl ModelRegistry {
    /// Compile every schema of `arena`.
    pub fn build(arena: &SchemaArena) -> Self {
        SchemaCompiler::new(arena).finish()
    }

    /// The compiled type for `id`. Same `Arc` on every call.
    pub fn model(&self, id: SchemaId) -> Option<&Arc<ModelType>> {
        self.models.get(id.index())
    }

    /// Owned handle to the compiled type for `id`.
    pub fn compile(&self, id: SchemaId) -> Option<Arc<ModelType>> {
        self.model(id).cloned()
    }

    /// The unconstrained type used for free-form values.
    pub fn any(&self) -> &Arc<ModelType> {
        &self.any
    }

    /// Like [`model`](Self::model), falling back to the free-form type.
    pub(crate) fn resolve(&self, id: SchemaId) -> &Arc<ModelType> {
        self.models.get(id.index()).unwrap_or(&self.any)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Validate `value` against `model`.
    pub fn validate(&self, model: &Arc<ModelType>, value: &Value) -> Result<Instance, ModelError> {
        Validator::new(self).validate(model, value)
    }

    /// Validate `value` against the schema `id`.
    pub fn validate_schema(&self, id: SchemaId, value: &Value) -> Result<Instance, ModelError> {
        let model = Arc::clone(self.resolve(id));
        self.validate(&model, value)
    }
}
