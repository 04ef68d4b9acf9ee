//! Strict validation of JSON values against compiled model types.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::compiler::ModelRegistry;
use crate::error::ModelError;
use crate::instance::{Data, Instance};
use crate::model_type::{AdditionalPolicy, Kind, ModelType};

/// Walks a value alongside its model type, building the validated instance.
pub(crate) struct Validator<'r> {
    registry: &'r ModelRegistry,
}

impl<'r> Validator<'r> {
    pub(crate) fn new(registry: &'r ModelRegistry) -> Self {
        Self { registry }
    }

    pub(crate) fn validate(
        &self,
        model: &Arc<ModelType>,
        value: &Value,
    ) -> Result<Instance, ModelError> {
        self.check(model, value, "", true)
    }

    /// `strict == false` skips the unexpected-key check; used for `allOf`
    /// members, whose keys are checked against the merged field table.
    fn check(
        &self,
        model: &Arc<ModelType>,
        value: &Value,
        path: &str,
        strict: bool,
    ) -> Result<Instance, ModelError> {
        if value.is_null() && (model.nullable || model.kind == Kind::Null) {
            return Ok(Instance::new(Arc::clone(model), Data::Null));
        }

        if let Some(allowed) = &model.enum_values {
            if !allowed.contains(value) {
                return Err(ModelError::NotInEnum {
                    type_name: model.name.clone(),
                    value: value.to_string(),
                    allowed: allowed.iter().map(Value::to_string).collect(),
                    path: path.to_string(),
                });
            }
        }

        for member in &model.all_of {
            self.check(self.registry.resolve(*member), value, path, false)?;
        }

        let alternatives = if model.one_of.is_empty() {
            &model.any_of
        } else {
            &model.one_of
        };
        let mut matched = None;
        if !alternatives.is_empty() {
            let instance = self.first_match(model, alternatives, value, path)?;
            if model.is_union() {
                return Ok(instance);
            }
            matched = Some(instance);
        }

        match model.kind {
            Kind::Any => Ok(self.free_form(model, value)),
            Kind::Null => Err(mismatch(model, "null", value, path)),
            Kind::Boolean => value
                .as_bool()
                .map(|b| Instance::new(Arc::clone(model), Data::Boolean(b)))
                .ok_or_else(|| mismatch(model, "boolean", value, path)),
            Kind::String => value
                .as_str()
                .map(|s| Instance::new(Arc::clone(model), Data::String(s.to_string())))
                .ok_or_else(|| mismatch(model, "string", value, path)),
            Kind::Integer => self.integer(model, value, path),
            Kind::Number => value
                .as_f64()
                .map(|n| Instance::new(Arc::clone(model), Data::Number(n)))
                .ok_or_else(|| mismatch(model, "number", value, path)),
            Kind::Array => self.array(model, value, path),
            Kind::Object => self.object(model, value, path, strict, matched.as_ref()),
        }
    }

    fn first_match(
        &self,
        model: &Arc<ModelType>,
        alternatives: &[apidrive_spec::SchemaId],
        value: &Value,
        path: &str,
    ) -> Result<Instance, ModelError> {
        let mut failures = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            match self.check(self.registry.resolve(*alternative), value, path, true) {
                Ok(instance) => return Ok(instance),
                Err(e) => failures.push(e),
            }
        }
        Err(ModelError::NoMatchingAlternative {
            type_name: model.name.clone(),
            failures,
            path: path.to_string(),
        })
    }

    fn integer(
        &self,
        model: &Arc<ModelType>,
        value: &Value,
        path: &str,
    ) -> Result<Instance, ModelError> {
        let n = match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i
                } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
                    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
                        let sized = model
                            .format
                            .as_deref()
                            .filter(|format| matches!(*format, "int32" | "int64"));
                        if let Some(format) = sized {
                            return Err(ModelError::TypeMismatch {
                                type_name: model.name.clone(),
                                expected: format.to_string(),
                                actual: n.to_string(),
                                path: path.to_string(),
                            });
                        }
                        return Ok(Instance::new(Arc::clone(model), Data::Number(f)));
                    }
                    f as i64
                } else {
                    return Err(mismatch(model, "integer", value, path));
                }
            }
            _ => return Err(mismatch(model, "integer", value, path)),
        };
        if model.format.as_deref() == Some("int32") && i32::try_from(n).is_err() {
            return Err(ModelError::TypeMismatch {
                type_name: model.name.clone(),
                expected: "int32".to_string(),
                actual: n.to_string(),
                path: path.to_string(),
            });
        }
        Ok(Instance::new(Arc::clone(model), Data::Integer(n)))
    }

    fn array(
        &self,
        model: &Arc<ModelType>,
        value: &Value,
        path: &str,
    ) -> Result<Instance, ModelError> {
        let items = value
            .as_array()
            .ok_or_else(|| mismatch(model, "array", value, path))?;
        let item_model = match model.items {
            Some(id) => self.registry.resolve(id),
            None => self.registry.any(),
        };
        let elements = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.check(item_model, item, &format!("{}[{}]", path, i), true))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Instance::new(Arc::clone(model), Data::Array(elements)))
    }

    /// `matched` is the instance built by a `oneOf`/`anyOf` alternative; keys
    /// it accepted are taken from it rather than rejected as unexpected.
    fn object(
        &self,
        model: &Arc<ModelType>,
        value: &Value,
        path: &str,
        strict: bool,
        matched: Option<&Instance>,
    ) -> Result<Instance, ModelError> {
        let map = value
            .as_object()
            .ok_or_else(|| mismatch(model, "object", value, path))?;
        let accepted = matched.and_then(Instance::as_object);

        if strict && model.additional == AdditionalPolicy::Forbid {
            let mut unexpected: Vec<String> = map
                .keys()
                .filter(|k| !model.fields.contains_key(k.as_str()))
                .filter(|k| !accepted.is_some_and(|a| a.contains_key(k.as_str())))
                .cloned()
                .collect();
            if !unexpected.is_empty() {
                unexpected.sort();
                return Err(ModelError::UnexpectedKeys {
                    type_name: model.name.clone(),
                    keys: unexpected,
                    path: path.to_string(),
                });
            }
        }

        let mut missing: Vec<String> = model
            .required_fields()
            .filter(|name| !map.contains_key(*name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(ModelError::MissingKeys {
                type_name: model.name.clone(),
                keys: missing,
                path: path.to_string(),
            });
        }

        let mut fields = IndexMap::with_capacity(map.len());
        for (name, field) in &model.fields {
            if let Some(field_value) = map.get(name) {
                let field_model = self.registry.resolve(field.schema);
                let instance = self.check(field_model, field_value, &join(path, name), true)?;
                fields.insert(name.clone(), instance);
            }
        }
        for (name, extra) in map {
            if model.fields.contains_key(name.as_str()) {
                continue;
            }
            if let Some(instance) = accepted.and_then(|a| a.get(name.as_str())) {
                fields.insert(name.clone(), instance.clone());
                continue;
            }
            let instance = match model.additional {
                AdditionalPolicy::Schema(id) => {
                    self.check(self.registry.resolve(id), extra, &join(path, name), true)?
                }
                _ => self.free_form(self.registry.any(), extra),
            };
            fields.insert(name.clone(), instance);
        }

        Ok(Instance::new(Arc::clone(model), Data::Object(fields)))
    }

    /// Wrap any value without constraints; children get the free-form type.
    fn free_form(&self, model: &Arc<ModelType>, value: &Value) -> Instance {
        let any = self.registry.any();
        let data = match value {
            Value::Null => Data::Null,
            Value::Bool(b) => Data::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Data::Integer(i),
                None => Data::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Data::String(s.clone()),
            Value::Array(items) => {
                Data::Array(items.iter().map(|v| self.free_form(any, v)).collect())
            }
            Value::Object(map) => Data::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.free_form(any, v)))
                    .collect(),
            ),
        };
        Instance::new(Arc::clone(model), data)
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(model: &ModelType, expected: &str, value: &Value, path: &str) -> ModelError {
    ModelError::TypeMismatch {
        type_name: model.name.clone(),
        expected: expected.to_string(),
        actual: json_type(value).to_string(),
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidrive_spec::{load, ApiSpec, Document};
    use serde_json::json;

    const DOC: &str = r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths: {}
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id: {type: integer, format: int64}
        name: {type: string}
        tag: {type: string, nullable: true}
        tags:
          type: array
          items: {type: string}
        owner:
          $ref: '#/components/schemas/Owner'
    Owner:
      type: object
      properties:
        age: {type: integer, format: int32}
    NewPet:
      type: object
      required: [name]
      properties:
        name: {type: string}
    Tagged:
      allOf:
        - $ref: '#/components/schemas/NewPet'
        - properties:
            tag: {type: string}
    Status:
      type: string
      enum: [available, sold]
    IdOrName:
      oneOf:
        - {type: integer}
        - {type: string}
    Labels:
      type: object
      additionalProperties:
        type: string
    Wrapper:
      type: object
      properties:
        no_properties:
          type: object
          properties: {}
    Ratio: {type: number}
    Anything: {}
    Counter:
      type: integer
    Cat:
      type: object
      properties:
        meow: {type: boolean}
    Dog:
      type: object
      required: [bark]
      properties:
        bark: {type: boolean}
    Animal:
      type: object
      oneOf:
        - $ref: '#/components/schemas/Cat'
        - $ref: '#/components/schemas/Dog'
    Color:
      type: string
      nullable: true
      enum: [red, green]
"#;

    fn setup() -> (ApiSpec, ModelRegistry) {
        let spec = load(&Document::from_yaml_str(DOC).unwrap()).unwrap();
        let registry = ModelRegistry::build(&spec.schemas);
        (spec, registry)
    }

    fn check(name: &str, value: Value) -> Result<Instance, ModelError> {
        let (spec, registry) = setup();
        registry.validate_schema(spec.schema(name).unwrap(), &value)
    }

    #[test]
    fn unexpected_key_is_rejected_with_its_name() {
        let err = check("Pet", json!({"id": 1, "name": "rex", "foo": 1})).unwrap_err();
        assert_eq!(err.to_string(), "Schema Pet got unexpected attribute keys {foo}");
    }

    #[test]
    fn unexpected_keys_are_sorted() {
        let err = check("Pet", json!({"id": 1, "name": "rex", "zz": 1, "aa": 2})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema Pet got unexpected attribute keys {aa, zz}"
        );
    }

    #[test]
    fn missing_required_keys() {
        let err = check("Pet", json!({"tag": "dog"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema Pet missing required attribute keys {id, name}"
        );
    }

    #[test]
    fn type_mismatch_names_expected_and_actual() {
        let err = check("Pet", json!({"id": "one", "name": "rex"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema id expected integer but got string (at id)"
        );
    }

    #[test]
    fn nested_errors_report_location() {
        let err = check("Pet", json!({"id": 1, "name": "rex", "tags": ["a", "b", 3]})).unwrap_err();
        assert_eq!(err.path(), "tags[2]");

        let err = check("Pet", json!({"id": 1, "name": "rex", "owner": {"age": 1, "x": 0}}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema Owner got unexpected attribute keys {x} (at owner)"
        );
    }

    #[test]
    fn valid_instance_exposes_fields() {
        let pet = check(
            "Pet",
            json!({"id": 7, "name": "rex", "tag": null, "tags": ["a"], "owner": {"age": 3}}),
        )
        .unwrap();
        assert_eq!(pet.model().name(), "Pet");
        assert_eq!(pet.get("id").and_then(Instance::as_i64), Some(7));
        assert_eq!(pet.get("name").and_then(Instance::as_str), Some("rex"));
        assert!(pet.get("tag").unwrap().is_null());
        assert_eq!(pet.get("tags").map(Instance::len), Some(1));
        assert_eq!(pet.get("owner").unwrap().model().name(), "Owner");
    }

    #[test]
    fn null_requires_nullable() {
        let err = check("Pet", json!({"id": 1, "name": null})).unwrap_err();
        assert!(err.to_string().contains("expected string but got null"));
    }

    #[test]
    fn integer_accepts_whole_floats_and_checks_int32() {
        let pet = check("Pet", json!({"id": 2.0, "name": "rex"})).unwrap();
        assert_eq!(pet.get("id").and_then(Instance::as_i64), Some(2));

        let err = check("Pet", json!({"id": 2.5, "name": "rex"})).unwrap_err();
        assert!(err.to_string().contains("expected integer but got number"));

        let err = check("Owner", json!({"age": 3_000_000_000i64})).unwrap_err();
        assert!(err.to_string().contains("expected int32 but got 3000000000"));
    }

    #[test]
    fn number_accepts_integers() {
        let ratio = check("Ratio", json!(3)).unwrap();
        assert_eq!(ratio.as_f64(), Some(3.0));
    }

    #[test]
    fn enum_membership() {
        assert!(check("Status", json!("sold")).is_ok());
        let err = check("Status", json!("lost")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema Status value \"lost\" is not one of {\"available\", \"sold\"}"
        );
    }

    #[test]
    fn one_of_takes_first_match() {
        let (spec, registry) = setup();
        let id_or_name = spec.schema("IdOrName").unwrap();
        let instance = registry.validate_schema(id_or_name, &json!(5)).unwrap();
        assert_eq!(instance.model().name(), "oneOf_0");

        let err = registry.validate_schema(id_or_name, &json!(true)).unwrap_err();
        match err {
            ModelError::NoMatchingAlternative { failures, .. } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn all_of_checks_keys_against_merged_table() {
        assert!(check("Tagged", json!({"name": "rex", "tag": "dog"})).is_ok());
        let err = check("Tagged", json!({"tag": "dog"})).unwrap_err();
        assert!(matches!(err, ModelError::MissingKeys { .. }));
        let err = check("Tagged", json!({"name": "rex", "other": 1})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema Tagged got unexpected attribute keys {other}"
        );
    }

    #[test]
    fn additional_properties_schema_validates_extras() {
        assert!(check("Labels", json!({"a": "x", "b": "y"})).is_ok());
        let err = check("Labels", json!({"a": 1})).unwrap_err();
        assert_eq!(err.path(), "a");
    }

    #[test]
    fn schema_without_properties_accepts_only_empty_objects() {
        let wrapper = check("Wrapper", json!({"no_properties": {}})).unwrap();
        let inner = wrapper.get("no_properties").unwrap();
        assert_eq!(inner.model().name(), "no_properties");
        assert!(inner.model().fields().is_empty());
        assert_eq!(inner.len(), 0);

        let err = check("Wrapper", json!({"no_properties": {"a": 1}})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema no_properties got unexpected attribute keys {a} (at no_properties)"
        );
    }

    #[test]
    fn free_form_schema_accepts_anything() {
        let value = json!({"nested": [1, "two", null]});
        let instance = check("Anything", value.clone()).unwrap();
        assert_eq!(instance.to_value(), value);
    }

    #[test]
    fn object_with_one_of_keeps_keys_of_the_matched_alternative() {
        let cat = check("Animal", json!({"meow": true})).unwrap();
        assert_eq!(cat.model().name(), "Animal");
        assert_eq!(cat.get("meow").and_then(Instance::as_bool), Some(true));
        assert_eq!(cat.get("meow").unwrap().model().name(), "meow");

        let dog = check("Animal", json!({"bark": false})).unwrap();
        assert_eq!(dog.get("bark").and_then(Instance::as_bool), Some(false));

        // Cat is first and rejects `bark`; Dog rejects `meow`.
        let err = check("Animal", json!({"meow": true, "bark": true})).unwrap_err();
        assert!(matches!(err, ModelError::NoMatchingAlternative { .. }));
    }

    #[test]
    fn nullable_enum_accepts_null() {
        assert!(check("Color", json!(null)).unwrap().is_null());
        assert!(check("Color", json!("red")).is_ok());
        assert!(check("Color", json!("blue")).is_err());
    }

    #[test]
    fn integers_beyond_i64_fail_sized_formats() {
        let err = check("Pet", json!({"id": u64::MAX, "name": "rex"})).unwrap_err();
        assert_eq!(err.path(), "id");
        assert!(err.to_string().contains("expected int64 but got 18446744073709551615"));

        let counter = check("Counter", json!(u64::MAX)).unwrap();
        assert_eq!(counter.as_f64(), Some(u64::MAX as f64));
    }
}
