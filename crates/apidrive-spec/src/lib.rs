//! OpenAPI 3.x document model.
//!
//! Decodes YAML/JSON documents, resolves every `$ref` (local and external,
//! cycles included) into a schema arena, and builds the path/operation
//! registry with its parameters, responses and security requirements.

pub mod document;
pub mod error;
pub mod model;
pub mod pointer;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod security;

pub use document::{Document, DocumentLoader, FsLoader, LoaderError};
pub use error::SpecError;
pub use model::{
    ApiSpec, Components, Info, MediaType, Method, Operation, Parameter, ParameterLocation,
    ParameterStyle, PathItem, RequestBody, Response, Responses, Server,
};
pub use pointer::Location;
pub use registry::{load, load_with};
pub use schema::{AdditionalProperties, SchemaArena, SchemaId, SchemaNode, SchemaType};
pub use security::{ApiKeyLocation, HttpAuthScheme, SecurityRequirement, SecurityScheme};
