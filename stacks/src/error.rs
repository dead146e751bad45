use thiserror::Error;

/// Conflicts detected while declaring resources, before anything is sent to CloudFormation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("Resource `{logical_id}` is declared twice in stack `{stack}`")]
    DuplicateResource { stack: String, logical_id: String },

    #[error("Output `{name}` is declared twice in stack `{stack}`")]
    DuplicateOutput { stack: String, name: String },

    #[error("Path `{path}` is declared twice in API `{api}`")]
    DuplicatePath { api: String, path: String },

    #[error("Route {method} `{path}` is declared twice in API `{api}`")]
    DuplicateRoute {
        api: String,
        method: String,
        path: String,
    },

    #[error("Path `{path}` is not declared in API `{api}`")]
    UnknownPath { api: String, path: String },

    #[error("{kind} `{name}` is declared twice in API `{api}`")]
    DuplicateName {
        api: String,
        kind: &'static str,
        name: String,
    },

    #[error("{kind} `{name}` is not declared in API `{api}`")]
    UnknownName {
        api: String,
        kind: &'static str,
        name: String,
    },
}
