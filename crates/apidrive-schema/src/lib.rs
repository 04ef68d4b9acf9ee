//! Schema compilation and strict validation.
//!
//! Every resolved schema compiles to one [`ModelType`]: an ordered field
//! table plus validation rules. Values that pass validation come back as
//! [`Instance`]s tagged with the type that accepted them.
//!
//! Objects are strict by default: a key outside the field table is an
//! error unless the schema sets `additionalProperties`.

pub mod compiler;
pub mod error;
pub mod instance;
pub mod model_type;
mod validate;

pub use compiler::{ModelRegistry, SchemaCompiler};
pub use error::ModelError;
pub use instance::{Data, Instance};
pub use model_type::{AdditionalPolicy, Field, Kind, ModelType};
