//! The client façade.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use apidrive_schema::ModelRegistry;
use apidrive_spec::{load_with, ApiSpec, Document, DocumentLoader, FsLoader, Operation};
use apidrive_telemetry::{log_document_loaded, log_operation_dispatched, log_transport_error};

use crate::auth::{AuthContext, Credentials};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::http_client::ReqwestTransport;
use crate::invoker::{ApiResponse, CallArgs, Invoker};
use crate::security::check_credentials;
use crate::transport::{AsyncTransport, HttpRequest, Transport};

/// A loaded OpenAPI document bound to a transport and credentials.
///
/// ```ignore
/// let api = OpenApi::from_path(Path::new("petstore.yaml"))?;
/// api.authenticate("bearerAuth", "token")?;
/// let pets = api.call("listPets", CallArgs::new().parameter("limit", 10))?;
/// ```
pub struct OpenApi {
    invoker: Invoker,
    auth: RwLock<AuthContext>,
    transport: Arc<dyn Transport>,
    async_transport: Arc<dyn AsyncTransport>,
}

impl OpenApi {
    /// Load `document` with the default reqwest transport.
    pub fn new(document: &Document) -> Result<Self, Error> {
        Self::builder().build(document)
    }

    /// Load a document from disk; external references resolve relative to it.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let document = Document::from_path(path)?;
        Self::builder()
            .with_loader(Arc::new(FsLoader))
            .build(&document)
    }

    pub fn builder() -> OpenApiBuilder {
        OpenApiBuilder::default()
    }

    pub fn spec(&self) -> &Arc<ApiSpec> {
        self.invoker.spec()
    }

    pub fn models(&self) -> &Arc<ModelRegistry> {
        self.invoker.models()
    }

    pub fn operation(&self, operation_id: &str) -> Result<&Arc<Operation>, Error> {
        self.invoker.operation(operation_id)
    }

    /// Store credentials for a declared security scheme.
    pub fn authenticate(
        &self,
        scheme: &str,
        credentials: impl Into<Credentials>,
    ) -> Result<(), Error> {
        let credentials = credentials.into();
        check_credentials(scheme, &self.spec().components.security_schemes, &credentials)?;
        self.auth.write().set(scheme, credentials);
        Ok(())
    }

    pub fn remove_authentication(&self, scheme: &str) {
        self.auth.write().remove(scheme);
    }

    pub fn clear_authentication(&self) {
        self.auth.write().clear();
    }

    /// Call an operation and wait for the response.
    pub fn call(&self, operation_id: &str, args: CallArgs) -> Result<ApiResponse, Error> {
        let (op, request) = self.dispatch(operation_id, &args)?;
        let response = self.transport.send(&request).map_err(|e| {
            log_transport_error!(operation_id = %op.operation_id, error = %e);
            e
        })?;
        self.invoker.finish(&op, response)
    }

    /// Call an operation without blocking the executor.
    pub async fn call_async(
        &self,
        operation_id: &str,
        args: CallArgs,
    ) -> Result<ApiResponse, Error> {
        let (op, request) = self.dispatch(operation_id, &args)?;
        let response = self.async_transport.send(&request).await.map_err(|e| {
            log_transport_error!(operation_id = %op.operation_id, error = %e);
            e
        })?;
        self.invoker.finish(&op, response)
    }

    fn dispatch(
        &self,
        operation_id: &str,
        args: &CallArgs,
    ) -> Result<(Arc<Operation>, HttpRequest), Error> {
        let op = self.invoker.operation(operation_id)?.clone();
        let request = {
            let auth = self.auth.read();
            self.invoker.prepare(&op, args, &auth)?
        };
        log_operation_dispatched!(
            operation_id = %op.operation_id,
            method = %request.method,
            url = %request.url
        );
        Ok((op, request))
    }
}

/// Builder for [`OpenApi`].
#[derive(Default)]
pub struct OpenApiBuilder {
    config: ClientConfig,
    loader: Option<Arc<dyn DocumentLoader>>,
    transport: Option<Arc<dyn Transport>>,
    async_transport: Option<Arc<dyn AsyncTransport>>,
}

impl OpenApiBuilder {
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Loader for external `$ref` targets.
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Use one transport for both blocking and async calls.
    pub fn with_transport<T>(mut self, transport: Arc<T>) -> Self
    where
        T: Transport + AsyncTransport + 'static,
    {
        let blocking: Arc<dyn Transport> = transport.clone();
        let non_blocking: Arc<dyn AsyncTransport> = transport;
        self.transport = Some(blocking);
        self.async_transport = Some(non_blocking);
        self
    }

    pub fn with_blocking_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_async_transport(mut self, transport: Arc<dyn AsyncTransport>) -> Self {
        self.async_transport = Some(transport);
        self
    }

    /// Load and compile `document`.
    pub fn build(self, document: &Document) -> Result<OpenApi, Error> {
        let spec = load_with(document, self.loader)?;
        let models = ModelRegistry::build(&spec.schemas);
        log_document_loaded!(
            title = %spec.info.title,
            version = %spec.version,
            operations = spec.operations().count(),
            schemas = models.len()
        );

        let (transport, async_transport) = match (self.transport, self.async_transport) {
            (Some(t), Some(a)) => (t, a),
            (t, a) => {
                let default = Arc::new(ReqwestTransport::new(self.config.transport.clone())?);
                let blocking: Arc<dyn Transport> = match t {
                    Some(t) => t,
                    None => default.clone(),
                };
                let non_blocking: Arc<dyn AsyncTransport> = match a {
                    Some(a) => a,
                    None => default,
                };
                (blocking, non_blocking)
            }
        };

        Ok(OpenApi {
            invoker: Invoker::new(Arc::new(spec), Arc::new(models), self.config),
            auth: RwLock::new(AuthContext::new()),
            transport,
            async_transport,
        })
    }
}
