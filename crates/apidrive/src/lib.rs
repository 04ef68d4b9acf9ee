//! OpenAPI 3.x runtime client.
//!
//! Load a document, then call its operations by `operationId`:
//! parameters are serialized by location and style, request and response
//! bodies are validated strictly against their schemas, and credentials
//! are injected for the operation's security requirements.
//!
//! ```ignore
//! use apidrive::{CallArgs, OpenApi};
//!
//! let api = OpenApi::from_path(Path::new("petstore.yaml"))?;
//! let created = api.call("addPet", CallArgs::new().data(json!({"name": "rex"})))?;
//! let pet = api
//!     .call_async("find pet by id", CallArgs::new().parameter("id", 1))
//!     .await?;
//! ```

pub mod api;
pub mod auth;
pub mod config;
mod digest;
pub mod error;
pub mod http_client;
pub mod invoker;
pub mod security;
mod serialize;
pub mod transport;

pub use api::{OpenApi, OpenApiBuilder};
pub use auth::{AuthContext, Credentials};
pub use config::ClientConfig;
pub use error::{Error, SecurityError, UnexpectedResponseError};
pub use http_client::{ReqwestTransport, TransportConfig};
pub use invoker::{ApiResponse, CallArgs, Invoker, ResponseBody};
pub use security::SecurityHandler;
pub use transport::{
    AsyncTransport, DigestCredentials, HttpRequest, HttpResponse, RecordingTransport, Transport,
    TransportError,
};

pub use apidrive_schema::{Data, Instance, ModelError, ModelRegistry, ModelType};
pub use apidrive_spec::{ApiSpec, Document, DocumentLoader, FsLoader, SpecError};
