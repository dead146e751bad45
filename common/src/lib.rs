pub mod environment;
pub mod schema;
pub mod template;

pub use environment::Environment;
pub use schema::{JsonSchema, SchemaType, Violation};
