//! Builds the [`ApiSpec`] registry from a [`Document`].

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::document::{Document, DocumentLoader};
use crate::error::SpecError;
use crate::model::{
    ApiSpec, Components, Info, MediaType, Method, Operation, Parameter, ParameterLocation,
    ParameterStyle, PathItem, RequestBody, Response, Responses, Server,
};
use crate::pointer::Location;
use crate::resolver::Resolver;
use crate::security::{parse_requirements, SecurityRequirement, SecurityScheme};

/// Load a self-contained document. External `$ref`s fail to resolve.
pub fn load(document: &Document) -> Result<ApiSpec, SpecError> {
    load_with(document, None)
}

/// Load a document, fetching external `$ref`s through `loader`.
pub fn load_with(
    document: &Document,
    loader: Option<Arc<dyn DocumentLoader>>,
) -> Result<ApiSpec, SpecError> {
    let root = document
        .root()
        .as_object()
        .ok_or(SpecError::UnknownFormat)?;

    let version = detect_version(root)?;
    let info = parse_info(root)?;

    let mut resolver = Resolver::new(document);
    if let Some(loader) = loader {
        resolver = resolver.with_loader(loader);
    }
    resolver.verify_references()?;

    let mut builder = RegistryBuilder {
        resolver,
        parameters: HashMap::new(),
        request_bodies: HashMap::new(),
        responses: HashMap::new(),
        operation_ids: HashMap::new(),
        document_servers: Vec::new(),
    };

    let components = builder.components(root)?;
    let security = parse_requirements(root.get("security"), "the document")?;
    if let Some(requirements) = &security {
        check_scheme_names(requirements, &components, "the document")?;
    }

    builder.document_servers = parse_servers(root.get("servers"), "the document")?;

    let mut paths = IndexMap::new();
    if let Some(declared) = root.get("paths") {
        let declared = declared
            .as_object()
            .ok_or_else(|| SpecError::invalid("'paths' must be an object"))?;
        for template in declared.keys() {
            if !template.starts_with('/') {
                return Err(SpecError::invalid(format!(
                    "path '{}' must start with '/'",
                    template
                )));
            }
            let item = builder.path_item(template, &components)?;
            paths.insert(template.clone(), item);
        }
    }

    let RegistryBuilder {
        resolver,
        operation_ids,
        document_servers,
        ..
    } = builder;

    let spec = ApiSpec {
        version,
        info,
        servers: document_servers,
        paths,
        components,
        security,
        schemas: resolver.finish()?,
        operations_by_id: operation_ids,
    };

    tracing::debug!(
        title = %spec.info.title,
        paths = spec.paths.len(),
        operations = spec.operations_by_id.len(),
        schemas = spec.schemas.len(),
        "document registry built"
    );
    Ok(spec)
}

fn detect_version(root: &Map<String, Value>) -> Result<String, SpecError> {
    let version = match root.get("openapi") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(SpecError::invalid("'openapi' must be a version string")),
        None if root.contains_key("swagger") => {
            return Err(SpecError::invalid(
                "Swagger 2.0 documents are not supported (only OpenAPI 3.x)",
            ))
        }
        None => return Err(SpecError::UnknownFormat),
    };
    if !version.starts_with("3.") {
        return Err(SpecError::invalid(format!(
            "unsupported OpenAPI version: {} (only 3.x supported)",
            version
        )));
    }
    Ok(version)
}

fn parse_info(root: &Map<String, Value>) -> Result<Info, SpecError> {
    let info = root
        .get("info")
        .and_then(|v| v.as_object())
        .ok_or_else(|| SpecError::invalid("missing 'info' object"))?;
    let title = info
        .get("title")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SpecError::invalid("missing 'info.title'"))?
        .to_string();
    let version = match info.get("version") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "0.0.0".to_string(),
    };
    Ok(Info {
        title,
        version,
        description: str_field(info, "description"),
    })
}

fn parse_servers(value: Option<&Value>, context: &str) -> Result<Vec<Server>, SpecError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| SpecError::invalid(format!("'servers' of {} must be an array", context)))?;
    items
        .iter()
        .map(|item| {
            let obj = item.as_object().ok_or_else(|| {
                SpecError::invalid(format!("server entry of {} must be an object", context))
            })?;
            let template = obj.get("url").and_then(|v| v.as_str()).ok_or_else(|| {
                SpecError::invalid(format!("server entry of {} is missing 'url'", context))
            })?;
            Ok(Server {
                url: substitute_variables(template, obj.get("variables")),
                description: str_field(obj, "description"),
            })
        })
        .collect()
}

/// Replace `{name}` placeholders with each variable's `default`.
fn substitute_variables(template: &str, variables: Option<&Value>) -> String {
    let Some(variables) = variables.and_then(|v| v.as_object()) else {
        return template.to_string();
    };
    variables.iter().fold(template.to_string(), |url, (name, var)| {
        match var.get("default").and_then(|d| d.as_str()) {
            Some(default) => url.replace(&format!("{{{}}}", name), default),
            None => url,
        }
    })
}

fn check_scheme_names(
    requirements: &[SecurityRequirement],
    components: &Components,
    context: &str,
) -> Result<(), SpecError> {
    for requirement in requirements {
        for name in requirement.scheme_names() {
            if !components.security_schemes.contains_key(name) {
                return Err(SpecError::invalid(format!(
                    "security requirement of {} names undeclared scheme '{}'",
                    context, name
                )));
            }
        }
    }
    Ok(())
}

/// Extract `{name}` placeholders from a path template.
fn template_variables(template: &str) -> Vec<&str> {
    template
        .split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
        .collect()
}

/// `<method>_<path>` in snake case, e.g. `get_pets_id`.
fn synthesize_operation_id(method: Method, path: &str) -> String {
    let mut id = String::from(method.as_str());
    let mut pending_separator = true;
    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator {
                id.push('_');
                pending_separator = false;
            }
            id.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    id
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(|v| v.as_bool())
}

fn as_object<'v>(value: &'v Value, what: &Location) -> Result<&'v Map<String, Value>, SpecError> {
    value
        .as_object()
        .ok_or_else(|| SpecError::invalid(format!("{} must be an object", what)))
}

struct RegistryBuilder<'a> {
    resolver: Resolver<'a>,
    // Components reached through several `$ref`s share one record, keyed by
    // the canonical location of their definition.
    parameters: HashMap<String, Arc<Parameter>>,
    request_bodies: HashMap<String, Arc<RequestBody>>,
    responses: HashMap<String, Arc<Response>>,
    operation_ids: HashMap<String, Arc<Operation>>,
    document_servers: Vec<Server>,
}

impl RegistryBuilder<'_> {
    fn components(&mut self, root: &Map<String, Value>) -> Result<Components, SpecError> {
        let mut components = Components::default();
        let Some(declared) = root.get("components") else {
            return Ok(components);
        };
        let base = Location::root("/components");
        let declared = as_object(declared, &base)?;

        if let Some(schemas) = declared.get("schemas") {
            let loc = base.child("schemas");
            for name in as_object(schemas, &loc)?.keys() {
                let id = self.resolver.schema(&loc.child(name))?;
                components.schemas.insert(name.clone(), id);
            }
        }

        if let Some(schemes) = declared.get("securitySchemes") {
            let loc = base.child("securitySchemes");
            for name in as_object(schemes, &loc)?.keys() {
                let (_, value) = self.resolver.object(&loc.child(name))?;
                let scheme = SecurityScheme::from_value(name, &value)?;
                components.security_schemes.insert(name.clone(), scheme);
            }
        }

        Ok(components)
    }

    fn path_item(&mut self, template: &str, components: &Components) -> Result<PathItem, SpecError> {
        let (loc, value) = self
            .resolver
            .object(&Location::root("/paths").child(template))?;
        let obj = as_object(&value, &loc)?;

        let mut item = PathItem {
            summary: str_field(obj, "summary"),
            description: str_field(obj, "description"),
            servers: parse_servers(obj.get("servers"), &format!("path '{}'", template))?,
            parameters: self.parameters(&loc.child("parameters"), obj.get("parameters"))?,
            ..Default::default()
        };

        for method in Method::ALL {
            let Some(op_value) = obj.get(method.as_str()) else {
                continue;
            };
            let op_loc = loc.child(method.as_str());
            let operation =
                self.operation(template, method, &op_loc, op_value, &item, components)?;
            let operation = Arc::new(operation);

            if let Some(existing) = self
                .operation_ids
                .insert(operation.operation_id.clone(), Arc::clone(&operation))
            {
                return Err(SpecError::invalid(format!(
                    "duplicate operationId '{}' ({} {} and {} {})",
                    operation.operation_id,
                    existing.method,
                    existing.path,
                    operation.method,
                    operation.path
                )));
            }
            item.set_operation(method, operation);
        }

        Ok(item)
    }

    fn operation(
        &mut self,
        template: &str,
        method: Method,
        loc: &Location,
        value: &Value,
        item: &PathItem,
        components: &Components,
    ) -> Result<Operation, SpecError> {
        let context = format!("operation {} {}", method, template);
        let obj = value
            .as_object()
            .ok_or_else(|| SpecError::invalid(format!("{} must be an object", context)))?;

        let mut parameters = item.parameters.clone();
        for param in self.parameters(&loc.child("parameters"), obj.get("parameters"))? {
            match parameters
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(slot) => *slot = param,
                None => parameters.push(param),
            }
        }

        for variable in template_variables(template) {
            let declared = parameters
                .iter()
                .any(|p| p.location == ParameterLocation::Path && p.name == variable);
            if !declared {
                return Err(SpecError::invalid(format!(
                    "{} has no path parameter for '{{{}}}'",
                    context, variable
                )));
            }
        }

        let request_body = match obj.get("requestBody") {
            Some(_) => Some(self.request_body(&loc.child("requestBody"))?),
            None => None,
        };

        let responses = match obj.get("responses") {
            Some(_) => self.responses(&loc.child("responses"), &context)?,
            None => Responses::default(),
        };

        let security = parse_requirements(obj.get("security"), &context)?;
        if let Some(requirements) = &security {
            check_scheme_names(requirements, components, &context)?;
        }

        let own_servers = parse_servers(obj.get("servers"), &context)?;
        let servers = if !own_servers.is_empty() {
            own_servers
        } else if !item.servers.is_empty() {
            item.servers.clone()
        } else {
            self.document_servers.clone()
        };

        let operation_id = str_field(obj, "operationId")
            .unwrap_or_else(|| synthesize_operation_id(method, template));

        Ok(Operation {
            operation_id,
            method,
            path: template.to_string(),
            summary: str_field(obj, "summary"),
            description: str_field(obj, "description"),
            tags: obj
                .get("tags")
                .and_then(|v| v.as_array())
                .map(|tags| {
                    tags.iter()
                        .filter_map(|t| t.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            deprecated: bool_field(obj, "deprecated").unwrap_or(false),
            parameters,
            request_body,
            responses,
            servers,
            security,
        })
    }

    fn parameters(
        &mut self,
        base: &Location,
        value: Option<&Value>,
    ) -> Result<Vec<Arc<Parameter>>, SpecError> {
        let Some(value) = value else {
            return Ok(Vec::new());
        };
        let count = value
            .as_array()
            .ok_or_else(|| SpecError::invalid(format!("{} must be an array", base)))?
            .len();
        (0..count).map(|i| self.parameter(&base.index(i))).collect()
    }

    fn parameter(&mut self, loc: &Location) -> Result<Arc<Parameter>, SpecError> {
        let (loc, value) = self.resolver.object(loc)?;
        if let Some(existing) = self.parameters.get(&loc.key()) {
            return Ok(Arc::clone(existing));
        }
        let obj = as_object(&value, &loc)?;

        let name = str_field(obj, "name")
            .ok_or_else(|| SpecError::invalid(format!("parameter at {} has no 'name'", loc)))?;
        let location_name = str_field(obj, "in")
            .ok_or_else(|| SpecError::invalid(format!("parameter '{}' has no 'in'", name)))?;
        let location = ParameterLocation::parse(&location_name).ok_or_else(|| {
            SpecError::invalid(format!(
                "parameter '{}' has invalid location '{}'",
                name, location_name
            ))
        })?;

        let style = match str_field(obj, "style") {
            Some(style_name) => ParameterStyle::parse(&style_name).ok_or_else(|| {
                SpecError::invalid(format!(
                    "parameter '{}' has unknown style '{}'",
                    name, style_name
                ))
            })?,
            None => location.default_style(),
        };
        if !location.allows(style) {
            return Err(SpecError::invalid(format!(
                "parameter '{}' cannot use style {:?} in {}",
                name,
                style,
                location.as_str()
            )));
        }

        let mut required = bool_field(obj, "required").unwrap_or(false);
        if location == ParameterLocation::Path && !required {
            if obj.contains_key("required") {
                tracing::warn!(
                    parameter = %name,
                    "path parameter declared as optional, treating it as required"
                );
            }
            required = true;
        }

        let schema = if obj.contains_key("schema") {
            Some(self.resolver.schema(&loc.child("schema"))?)
        } else if let Some(content) = obj.get("content").and_then(|c| c.as_object()) {
            match content.iter().next() {
                Some((media_type, mt)) if mt.get("schema").is_some() => Some(
                    self.resolver
                        .schema(&loc.child("content").child(media_type).child("schema"))?,
                ),
                _ => None,
            }
        } else {
            None
        };

        let parameter = Arc::new(Parameter {
            name,
            location,
            description: str_field(obj, "description"),
            required,
            deprecated: bool_field(obj, "deprecated").unwrap_or(false),
            style,
            explode: bool_field(obj, "explode").unwrap_or(style == ParameterStyle::Form),
            allow_reserved: bool_field(obj, "allowReserved").unwrap_or(false),
            schema,
        });
        self.parameters.insert(loc.key(), Arc::clone(&parameter));
        Ok(parameter)
    }

    fn request_body(&mut self, loc: &Location) -> Result<Arc<RequestBody>, SpecError> {
        let (loc, value) = self.resolver.object(loc)?;
        if let Some(existing) = self.request_bodies.get(&loc.key()) {
            return Ok(Arc::clone(existing));
        }
        let obj = as_object(&value, &loc)?;
        let body = Arc::new(RequestBody {
            description: str_field(obj, "description"),
            required: bool_field(obj, "required").unwrap_or(false),
            content: self.content(&loc, obj)?,
        });
        self.request_bodies.insert(loc.key(), Arc::clone(&body));
        Ok(body)
    }

    fn responses(&mut self, loc: &Location, context: &str) -> Result<Responses, SpecError> {
        let (loc, value) = self.resolver.object(loc)?;
        let keys: Vec<String> = as_object(&value, &loc)?.keys().cloned().collect();

        let mut responses = Responses::default();
        for key in keys {
            let normalized = normalize_status_key(&key).ok_or_else(|| {
                SpecError::invalid(format!("{} has invalid response key '{}'", context, key))
            })?;
            let response = self.response(&loc.child(&key))?;
            responses.insert(normalized, response);
        }
        Ok(responses)
    }

    fn response(&mut self, loc: &Location) -> Result<Arc<Response>, SpecError> {
        let (loc, value) = self.resolver.object(loc)?;
        if let Some(existing) = self.responses.get(&loc.key()) {
            return Ok(Arc::clone(existing));
        }
        let obj = as_object(&value, &loc)?;
        let response = Arc::new(Response {
            description: str_field(obj, "description"),
            content: self.content(&loc, obj)?,
            headers: obj
                .get("headers")
                .and_then(|h| h.as_object())
                .map(|h| h.keys().cloned().collect())
                .unwrap_or_default(),
        });
        self.responses.insert(loc.key(), Arc::clone(&response));
        Ok(response)
    }

    fn content(
        &mut self,
        loc: &Location,
        obj: &Map<String, Value>,
    ) -> Result<IndexMap<String, MediaType>, SpecError> {
        let mut content = IndexMap::new();
        let Some(declared) = obj.get("content") else {
            return Ok(content);
        };
        let content_loc = loc.child("content");
        for (media_type, entry) in as_object(declared, &content_loc)? {
            let entry_loc = content_loc.child(media_type);
            let schema = match entry.get("schema") {
                Some(_) => Some(self.resolver.schema(&entry_loc.child("schema"))?),
                None => None,
            };
            content.insert(
                media_type.to_ascii_lowercase(),
                MediaType {
                    schema,
                    example: entry.get("example").cloned(),
                },
            );
        }
        Ok(content)
    }
}

/// Accept `default`, three-digit codes and ranges (`2XX`, `2xx`).
fn normalize_status_key(key: &str) -> Option<String> {
    if key == "default" {
        return Some(key.to_string());
    }
    let bytes = key.as_bytes();
    if bytes.len() != 3 || !(b'1'..=b'5').contains(&bytes[0]) {
        return None;
    }
    let rest = &key[1..];
    if rest.bytes().all(|b| b.is_ascii_digit()) {
        Some(key.to_string())
    } else if rest.eq_ignore_ascii_case("xx") {
        Some(key.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_yaml(yaml: &str) -> Result<ApiSpec, SpecError> {
        load(&Document::from_yaml_str(yaml)?)
    }

    const PETSTORE: &str = r#"
openapi: 3.0.0
info:
  title: Swagger Petstore
  version: 1.0.0
servers:
  - url: http://{host}/api
    variables:
      host:
        default: petstore.swagger.io
paths:
  /pets:
    get:
      operationId: findPets
      parameters:
        - name: tags
          in: query
          style: form
          required: false
          schema:
            type: array
            items:
              type: string
        - $ref: '#/components/parameters/Limit'
      responses:
        '200':
          description: pet response
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
        default:
          $ref: '#/components/responses/Error'
    post:
      operationId: addPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/NewPet'
      responses:
        '200':
          description: pet response
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
        default:
          $ref: '#/components/responses/Error'
  /pets/{id}:
    parameters:
      - name: id
        in: path
        required: true
        schema:
          type: integer
          format: int64
    get:
      operationId: find pet by id
      responses:
        '200':
          description: pet response
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
        4xx:
          $ref: '#/components/responses/Error'
    delete:
      parameters:
        - name: id
          in: path
          description: ID of pet to delete
          required: true
          schema:
            type: integer
      responses:
        '204':
          description: pet deleted
components:
  parameters:
    Limit:
      name: limit
      in: query
      schema:
        type: integer
        format: int32
  responses:
    Error:
      description: unexpected error
      content:
        application/json:
          schema:
            $ref: '#/components/schemas/Error'
  schemas:
    Pet:
      allOf:
        - $ref: '#/components/schemas/NewPet'
        - type: object
          required: [id]
          properties:
            id:
              type: integer
              format: int64
    NewPet:
      type: object
      required: [name]
      properties:
        name:
          type: string
        tag:
          type: string
    Error:
      type: object
      required: [code, message]
      properties:
        code:
          type: integer
          format: int32
        message:
          type: string
"#;

    #[test]
    fn load_petstore_expanded() {
        let spec = load_yaml(PETSTORE).unwrap();
        assert_eq!(spec.info.title, "Swagger Petstore");
        assert_eq!(spec.servers[0].url, "http://petstore.swagger.io/api");
        assert_eq!(spec.paths.len(), 2);

        let pets = &spec.paths["/pets"];
        assert!(pets.get.is_some());
        assert!(pets.post.is_some());
        assert!(pets.put.is_none());
        assert!(pets.delete.is_none());

        let find = spec.operation("findPets").unwrap();
        assert_eq!(find.method, Method::Get);
        assert_eq!(find.parameters().len(), 2);
        assert_eq!(find.parameters()[1].name, "limit");
        assert!(find.parameter("tags").unwrap().explode);
        assert_eq!(find.servers[0].url, "http://petstore.swagger.io/api");

        let add = spec.operation("addPet").unwrap();
        let body = add.request_body.as_ref().unwrap();
        assert!(body.required);
        let (media_type, entry) = body.preferred_media_type().unwrap();
        assert_eq!(media_type, "application/json");
        assert_eq!(entry.schema, spec.schema("NewPet"));
    }

    #[test]
    fn shared_components_keep_identity() {
        let spec = load_yaml(PETSTORE).unwrap();
        let find = spec.operation("findPets").unwrap();
        let add = spec.operation("addPet").unwrap();
        let a = find.responses.get("default").unwrap();
        let b = add.responses.get("default").unwrap();
        assert!(Arc::ptr_eq(a, b));

        let pet = spec.schema("Pet").unwrap();
        let (_, ok) = add.responses.lookup(200).unwrap();
        assert_eq!(ok.content["application/json"].schema, Some(pet));
    }

    #[test]
    fn path_item_parameters_are_inherited_and_overridden() {
        let spec = load_yaml(PETSTORE).unwrap();
        let item = &spec.paths["/pets/{id}"];
        let get = item.get.as_ref().unwrap();
        assert!(Arc::ptr_eq(&get.parameters[0], &item.parameters[0]));

        let delete = item.delete.as_ref().unwrap();
        assert_eq!(delete.parameters.len(), 1);
        assert_eq!(
            delete.parameters[0].description.as_deref(),
            Some("ID of pet to delete")
        );
    }

    #[test]
    fn missing_operation_id_is_synthesized() {
        let spec = load_yaml(PETSTORE).unwrap();
        let delete = spec.operation("delete_pets_id").unwrap();
        assert_eq!(delete.path, "/pets/{id}");
        assert!(spec.operation("find pet by id").is_some());
    }

    #[test]
    fn range_response_keys_are_upper_cased() {
        let spec = load_yaml(PETSTORE).unwrap();
        let get = spec.operation("find pet by id").unwrap();
        assert_eq!(get.responses.codes(), vec!["200", "4XX"]);
        assert_eq!(get.responses.lookup(404).map(|(k, _)| k), Some("4XX"));
    }

    #[test]
    fn path_parameter_is_forced_required() {
        let spec = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /items/{id}:
    get:
      operationId: getItem
      parameters:
        - name: id
          in: path
          required: false
          schema: {type: string}
      responses:
        '200': {description: ok}
"#,
        )
        .unwrap();
        assert!(spec.operation("getItem").unwrap().parameters[0].required);
    }

    #[test]
    fn reject_undeclared_path_variable() {
        let err = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /items/{id}:
    get:
      responses:
        '200': {description: ok}
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no path parameter for '{id}'"));
    }

    #[test]
    fn reject_duplicate_operation_ids() {
        let err = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /a:
    get:
      operationId: same
      responses: {}
  /b:
    get:
      operationId: same
      responses: {}
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate operationId 'same'"));
    }

    #[test]
    fn reject_invalid_parameter_location_and_style() {
        let bad_in = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /a:
    get:
      parameters:
        - {name: x, in: body, schema: {type: string}}
      responses: {}
"#,
        );
        assert!(matches!(bad_in, Err(SpecError::Validation(_))));

        let bad_style = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /a:
    get:
      parameters:
        - {name: x, in: header, style: form, schema: {type: string}}
      responses: {}
"#,
        );
        assert!(matches!(bad_style, Err(SpecError::Validation(_))));
    }

    #[test]
    fn reject_undeclared_security_scheme() {
        let err = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
security:
  - nope: []
paths: {}
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("undeclared scheme 'nope'"));
    }

    #[test]
    fn operation_security_overrides_global() {
        let spec = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
security:
  - basicAuth: []
components:
  securitySchemes:
    basicAuth: {type: http, scheme: basic}
paths:
  /open:
    get:
      operationId: open
      security: []
      responses: {}
  /closed:
    get:
      operationId: closed
      responses: {}
"#,
        )
        .unwrap();
        assert_eq!(spec.security.as_ref().map(Vec::len), Some(1));
        assert_eq!(spec.operation("open").unwrap().security, Some(Vec::new()));
        assert_eq!(spec.operation("closed").unwrap().security, None);
    }

    #[test]
    fn reject_non_openapi_documents() {
        assert!(matches!(
            load_yaml("swagger: '2.0'\ninfo: {title: T}\n"),
            Err(SpecError::Validation(_))
        ));
        assert!(matches!(
            load_yaml("info: {title: T}\n"),
            Err(SpecError::UnknownFormat)
        ));
        assert!(matches!(
            load_yaml("openapi: 2.0.0\ninfo: {title: T}\n"),
            Err(SpecError::Validation(_))
        ));
        assert!(matches!(
            load_yaml("openapi: 3.0.0\ninfo: {version: '1'}\n"),
            Err(SpecError::Validation(_))
        ));
    }

    #[test]
    fn numeric_openapi_version_is_accepted() {
        let spec = load_yaml("openapi: 3.1\ninfo: {title: T}\n").unwrap();
        assert_eq!(spec.version, "3.1");
    }

    #[test]
    fn dangling_reference_fails_load() {
        let err = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /a:
    get:
      responses:
        '200':
          $ref: '#/components/responses/Nope'
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SpecError::ReferenceResolution { ref pointer, .. } if pointer == "#/components/responses/Nope"
        ));
    }

    #[test]
    fn schema_without_properties_is_registered() {
        let spec = load_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths: {}
components:
  schemas:
    Wrapper:
      type: object
      properties:
        no_properties:
          type: object
          properties: {}
"#,
        )
        .unwrap();
        let wrapper = spec.schemas.get(spec.schema("Wrapper").unwrap());
        let inner = spec.schemas.get(wrapper.properties["no_properties"]);
        assert_eq!(inner.name, "no_properties");
        assert!(inner.properties.is_empty());
    }

    #[test]
    fn operation_id_synthesis() {
        assert_eq!(
            synthesize_operation_id(Method::Get, "/pets/{pet-id}/photos"),
            "get_pets_pet_id_photos"
        );
        assert_eq!(synthesize_operation_id(Method::Post, "/"), "post");
    }

    #[test]
    fn status_key_normalization() {
        assert_eq!(normalize_status_key("200").as_deref(), Some("200"));
        assert_eq!(normalize_status_key("5xx").as_deref(), Some("5XX"));
        assert_eq!(normalize_status_key("default").as_deref(), Some("default"));
        assert_eq!(normalize_status_key("600"), None);
        assert_eq!(normalize_status_key("ok"), None);
    }
}
