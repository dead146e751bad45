pub mod api;
pub mod app;
pub mod domains;
pub mod error;
pub mod grant;
pub mod handler;
pub mod service;
pub mod settings;
pub mod stack;
pub mod storage;
pub mod table;
pub mod template;

pub use api::{Method, RestApi, Route};
pub use app::App;
pub use error::DeclarationError;
pub use handler::Handler;
pub use service::{Invocation, Operation, ServiceDescriptor, ServiceStack};
pub use settings::{Code, Settings};
pub use storage::Storage;
pub use table::{Domain, Table};
pub use template::{CfnResource, Template};
