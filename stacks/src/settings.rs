use serde::{Deserialize, Serialize};

/// Location of the handlers' code bundle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub bucket: String,
    pub key: String,
}

impl Default for Code {
    fn default() -> Self {
        Code {
            bucket: "storefront-handlers".into(),
            key: "lambda.zip".into(),
        }
    }
}

/// Deployment-wide parameters shared by every stack definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prepended to stack, table and function names, allows several deployments per account
    pub prefix: Option<String>,

    pub code: Code,

    /// Lambda runtime identifier
    pub runtime: String,

    /// Memory in MB
    pub memory_size: u32,

    /// Timeout in seconds
    pub timeout: u32,

    /// API Gateway stage the APIs are deployed to
    pub stage: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            prefix: None,
            code: Code::default(),
            runtime: "nodejs20.x".into(),
            memory_size: 128,
            timeout: 3,
            stage: "prod".into(),
        }
    }
}
