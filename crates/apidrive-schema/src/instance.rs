//! Validated instances: values tagged with the model type that accepted them.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::model_type::ModelType;

/// The payload of an [`Instance`].
#[derive(Debug, Clone)]
pub enum Data {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Array(Vec<Instance>),
    /// Declared fields first, in declaration order, then extra keys.
    Object(IndexMap<String, Instance>),
}

/// A value that passed validation, carrying its model type.
#[derive(Debug, Clone)]
pub struct Instance {
    model: Arc<ModelType>,
    data: Data,
}

impl Instance {
    pub(crate) fn new(model: Arc<ModelType>, data: Data) -> Self {
        Self { model, data }
    }

    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    /// Whether this value was validated by exactly `model`.
    pub fn is_instance_of(&self, model: &Arc<ModelType>) -> bool {
        Arc::ptr_eq(&self.model, model)
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn into_data(self) -> Data {
        self.data
    }

    /// Object field by name.
    pub fn get(&self, key: &str) -> Option<&Instance> {
        match &self.data {
            Data::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Array element by position.
    pub fn index(&self, index: usize) -> Option<&Instance> {
        match &self.data {
            Data::Array(items) => items.get(index),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, Data::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            Data::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.data {
            Data::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.data {
            Data::Integer(i) => Some(i as f64),
            Data::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            Data::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Instance]> {
        match &self.data {
            Data::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Instance>> {
        match &self.data {
            Data::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Number of elements or fields; zero for scalars.
    pub fn len(&self) -> usize {
        match &self.data {
            Data::Array(items) => items.len(),
            Data::Object(fields) => fields.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert back to a plain JSON value.
    pub fn to_value(&self) -> Value {
        match &self.data {
            Data::Null => Value::Null,
            Data::Boolean(b) => Value::Bool(*b),
            Data::Integer(i) => Value::from(*i),
            Data::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Data::String(s) => Value::String(s.clone()),
            Data::Array(items) => Value::Array(items.iter().map(Instance::to_value).collect()),
            Data::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq<Value> for Instance {
    fn eq(&self, other: &Value) -> bool {
        self.to_value() == *other
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.data {
            Data::Null => serializer.serialize_unit(),
            Data::Boolean(b) => serializer.serialize_bool(*b),
            Data::Integer(i) => serializer.serialize_i64(*i),
            Data::Number(n) => serializer.serialize_f64(*n),
            Data::String(s) => serializer.serialize_str(s),
            Data::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Data::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
