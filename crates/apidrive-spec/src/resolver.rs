//! `$ref` resolution over a possibly cyclic document graph.
//!
//! Schemas are resolved depth-first into an arena. A node's slot and its
//! memo entry are reserved before its children are visited, so a reference
//! back into a node under construction gets the reserved [`SchemaId`] and
//! recursion stops there. Non-schema components (parameters, responses,
//! request bodies, security schemes, path items) are resolved by following
//! their `$ref` chain to the first concrete object.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::document::{Document, DocumentLoader};
use crate::error::SpecError;
use crate::pointer::{lookup, reference_of, Location};
use crate::schema::{AdditionalProperties, SchemaArena, SchemaId, SchemaNode, SchemaType};

/// Resolves references against one root document and any external
/// documents it names.
pub struct Resolver<'a> {
    document: &'a Document,
    loader: Option<Arc<dyn DocumentLoader>>,
    external: HashMap<String, Arc<Value>>,
    slots: Vec<Option<SchemaNode>>,
    memo: HashMap<String, SchemaId>,
    aliasing: HashSet<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            loader: None,
            external: HashMap::new(),
            slots: Vec::new(),
            memo: HashMap::new(),
            aliasing: HashSet::new(),
        }
    }

    /// Enable external `$ref`s, fetched through `loader`.
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Resolve the schema at `location`, returning its stable handle.
    pub fn schema(&mut self, location: &Location) -> Result<SchemaId, SpecError> {
        let key = location.key();
        if let Some(id) = self.memo.get(&key) {
            return Ok(*id);
        }

        let value = self.value_at(location)?.ok_or_else(|| {
            SpecError::invalid(format!("no schema at {}", location))
        })?;

        if let Some(reference) = reference_of(&value) {
            // The reference and its target share one id.
            if !self.aliasing.insert(key.clone()) {
                return Err(SpecError::invalid(format!(
                    "circular $ref chain through {}",
                    location
                )));
            }
            let result = self
                .reference_target(location, reference)
                .and_then(|target| self.schema(&target));
            self.aliasing.remove(&key);
            let id = result?;
            self.memo.insert(key, id);
            return Ok(id);
        }

        let id = SchemaId(self.slots.len());
        self.slots.push(None);
        self.memo.insert(key, id);

        let node = self.build_schema(location, &value)?;
        self.slots[id.0] = Some(node);
        Ok(id)
    }

    /// Follow a `$ref` chain from `location` to a concrete object.
    ///
    /// Returns the canonical location of the object (used as its identity)
    /// together with its value.
    pub fn object(&mut self, location: &Location) -> Result<(Location, Value), SpecError> {
        let mut current = location.clone();
        let mut seen = HashSet::new();
        loop {
            let value = self
                .value_at(&current)?
                .ok_or_else(|| SpecError::invalid(format!("nothing at {}", current)))?;
            match reference_of(&value) {
                Some(reference) => {
                    if !seen.insert(current.key()) {
                        return Err(SpecError::invalid(format!(
                            "circular $ref chain through {}",
                            current
                        )));
                    }
                    current = self.reference_target(&current, reference)?;
                }
                None => return Ok((current, value)),
            }
        }
    }

    /// Check that every `$ref` anywhere in the root document resolves,
    /// including ones in components nothing else uses.
    pub fn verify_references(&mut self) -> Result<(), SpecError> {
        let mut pending = Vec::new();
        collect_references(self.document.root(), &Location::root(""), &mut pending);
        for (location, reference) in pending {
            self.reference_target(&location, &reference)?;
        }
        Ok(())
    }

    /// Close the pass and hand out the completed arena.
    pub fn finish(self) -> Result<SchemaArena, SpecError> {
        let mut nodes = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(node) => nodes.push(node),
                None => {
                    return Err(SpecError::invalid(format!(
                        "schema #{} was never completed",
                        index
                    )))
                }
            }
        }
        Ok(SchemaArena::from_nodes(nodes))
    }

    fn reference_target(
        &mut self,
        from: &Location,
        reference: &str,
    ) -> Result<Location, SpecError> {
        let target = from.join(reference, self.document.base_uri())?;
        match self.value_at(&target) {
            Ok(Some(_)) => Ok(target),
            Ok(None) => Err(SpecError::ReferenceResolution {
                pointer: reference.to_string(),
                referrer: from.to_string(),
            }),
            Err(SpecError::Loader { uri, source }) => {
                tracing::debug!(uri = %uri, error = %source, "external document unavailable");
                Err(SpecError::ReferenceResolution {
                    pointer: reference.to_string(),
                    referrer: from.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn value_at(&mut self, location: &Location) -> Result<Option<Value>, SpecError> {
        let Some(uri) = location.document() else {
            return Ok(lookup(self.document.root(), location.pointer()).cloned());
        };

        let tree = match self.external.get(uri) {
            Some(tree) => Arc::clone(tree),
            None => {
                let loader = self.loader.as_ref().ok_or_else(|| SpecError::Loader {
                    uri: uri.to_string(),
                    source: crate::document::LoaderError::Unsupported(
                        "no document loader configured".into(),
                    ),
                })?;
                let tree = Arc::new(loader.load(uri).map_err(|source| SpecError::Loader {
                    uri: uri.to_string(),
                    source,
                })?);
                self.external.insert(uri.to_string(), Arc::clone(&tree));
                tree
            }
        };
        Ok(lookup(&tree, location.pointer()).cloned())
    }

    fn build_schema(&mut self, location: &Location, value: &Value) -> Result<SchemaNode, SpecError> {
        let mut node = SchemaNode {
            location: Some(location.clone()),
            name: schema_name(location),
            ..Default::default()
        };

        let obj = match value {
            Value::Object(obj) => obj,
            Value::Bool(true) => return Ok(node),
            Value::Bool(false) => {
                node.enum_values = Some(Vec::new());
                return Ok(node);
            }
            _ => {
                return Err(SpecError::invalid(format!(
                    "schema at {} must be an object",
                    location
                )))
            }
        };

        let (schema_type, null_in_type) = parse_type(obj, location)?;
        node.schema_type = schema_type;
        node.nullable = null_in_type || bool_field(obj, "nullable");
        node.format = string_field(obj, "format");
        node.title = string_field(obj, "title");
        node.description = string_field(obj, "description");
        node.default = obj.get("default").cloned();
        node.read_only = bool_field(obj, "readOnly");
        node.write_only = bool_field(obj, "writeOnly");

        if let Some(props) = obj.get("properties") {
            let props = props.as_object().ok_or_else(|| {
                SpecError::invalid(format!("'properties' at {} must be an object", location))
            })?;
            let base = location.child("properties");
            let mut properties = IndexMap::with_capacity(props.len());
            for name in props.keys() {
                let id = self.schema(&base.child(name))?;
                properties.insert(name.clone(), id);
            }
            node.properties = properties;
        }

        if let Some(required) = obj.get("required") {
            node.required = required
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .ok_or_else(|| {
                    SpecError::invalid(format!("'required' at {} must be an array", location))
                })?;
        }

        if let Some(items) = obj.get("items") {
            if items.is_array() {
                return Err(SpecError::invalid(format!(
                    "tuple 'items' at {} is not supported",
                    location
                )));
            }
            node.items = Some(self.schema(&location.child("items"))?);
        }

        node.additional_properties = match obj.get("additionalProperties") {
            None => AdditionalProperties::Unset,
            Some(Value::Bool(allowed)) => AdditionalProperties::Allowed(*allowed),
            Some(Value::Object(_)) => {
                AdditionalProperties::Schema(self.schema(&location.child("additionalProperties"))?)
            }
            Some(_) => {
                return Err(SpecError::invalid(format!(
                    "'additionalProperties' at {} must be a boolean or a schema",
                    location
                )))
            }
        };

        if let Some(values) = obj.get("enum") {
            node.enum_values = Some(
                values
                    .as_array()
                    .ok_or_else(|| {
                        SpecError::invalid(format!("'enum' at {} must be an array", location))
                    })?
                    .clone(),
            );
        }

        node.one_of = self.composition(obj, location, "oneOf")?;
        node.any_of = self.composition(obj, location, "anyOf")?;
        node.all_of = self.composition(obj, location, "allOf")?;

        Ok(node)
    }

    fn composition(
        &mut self,
        obj: &Map<String, Value>,
        location: &Location,
        keyword: &str,
    ) -> Result<Vec<SchemaId>, SpecError> {
        let Some(members) = obj.get(keyword) else {
            return Ok(Vec::new());
        };
        let members = members.as_array().ok_or_else(|| {
            SpecError::invalid(format!("'{}' at {} must be an array", keyword, location))
        })?;
        let base = location.child(keyword);
        (0..members.len())
            .map(|i| self.schema(&base.index(i)))
            .collect()
    }
}

/// Derive a type name from a schema's position.
fn schema_name(location: &Location) -> String {
    let segments = location.segments();
    if let [.., components, schemas, name] = segments.as_slice() {
        if components == "components" && schemas == "schemas" {
            return name.clone();
        }
    }
    match segments.as_slice() {
        [] => location
            .document()
            .and_then(|doc| doc.rsplit('/').next())
            .map(|file| file.split('.').next().unwrap_or(file).to_string())
            .unwrap_or_else(|| "schema".to_string()),
        [.., parent, last] if last.parse::<usize>().is_ok() => format!("{}_{}", parent, last),
        [.., last] => last.clone(),
    }
}

fn parse_type(
    obj: &Map<String, Value>,
    location: &Location,
) -> Result<(Option<SchemaType>, bool), SpecError> {
    let unknown = |name: &str| {
        SpecError::invalid(format!("unknown schema type '{}' at {}", name, location))
    };
    match obj.get("type") {
        None => Ok((None, false)),
        Some(Value::String(name)) => {
            let ty = SchemaType::parse(name).ok_or_else(|| unknown(name))?;
            Ok((Some(ty), ty == SchemaType::Null))
        }
        Some(Value::Array(names)) => {
            let mut primary = None;
            let mut nullable = false;
            for name in names {
                let name = name.as_str().ok_or_else(|| unknown("<non-string>"))?;
                match SchemaType::parse(name).ok_or_else(|| unknown(name))? {
                    SchemaType::Null => nullable = true,
                    ty if primary.is_none() => primary = Some(ty),
                    _ => {
                        return Err(SpecError::invalid(format!(
                            "multiple non-null types at {} are not supported",
                            location
                        )))
                    }
                }
            }
            Ok((primary.or(nullable.then_some(SchemaType::Null)), nullable))
        }
        Some(_) => Err(unknown("<non-string>")),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn collect_references(value: &Value, location: &Location, out: &mut Vec<(Location, String)>) {
    match value {
        Value::Object(obj) => {
            if let Some(reference) = obj.get("$ref").and_then(|v| v.as_str()) {
                out.push((location.clone(), reference.to_string()));
                return;
            }
            for (key, child) in obj {
                collect_references(child, &location.child(key), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_references(child, &location.index(i), out);
            }
        }
        _ => {}
    }
}
