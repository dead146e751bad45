use crate::grant::Grant;
use crate::settings::{Code, Settings};
use crate::stack::prefixed;
use crate::template::CfnResource;
use serde_json::{json, Value};
use storefront_common::environment::Environment;
use storefront_common::template::sanitize::logical_id;

/// A serverless request handler
///
/// Only declared and wired here, the code itself lives in the bundle referenced by `code`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handler {
    /// Identifier within the stack, e.g. `GetProductItemFunction`
    pub id: String,

    /// Physical Lambda function name
    pub function_name: String,

    pub runtime: String,
    pub code: Code,

    /// `<file>.<export>` within the bundle
    pub entry_point: String,

    pub environment: Environment,
    pub memory_size: u32,
    pub timeout: u32,
}

impl Handler {
    pub fn new(id: &str, entry_point: &str, settings: &Settings) -> Self {
        Handler {
            id: id.to_string(),
            function_name: prefixed(settings, id),
            runtime: settings.runtime.clone(),
            code: settings.code.clone(),
            entry_point: entry_point.to_string(),
            environment: Environment::new(),
            memory_size: settings.memory_size,
            timeout: settings.timeout,
        }
    }

    /// Add environment variables, overwriting the ones already bound
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment.extend(environment);
        self
    }

    pub fn logical_id(&self) -> String {
        logical_id(&[&self.id])
    }

    pub fn role_logical_id(&self) -> String {
        logical_id(&[&self.id, "service", "role"])
    }

    /// `Fn::Sub` reference to the function's ARN
    pub(crate) fn arn_sub(&self) -> String {
        format!("${{{}.Arn}}", self.logical_id())
    }

    fn policies<'a>(grants: impl Iterator<Item = &'a Grant>) -> Vec<Value> {
        let mut policies = grants.map(Grant::policy).collect::<Vec<_>>();

        policies.push(json!({
            "PolicyName": "AppendToLogsPolicy",
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": [
                        "logs:CreateLogGroup",
                        "logs:CreateLogStream",
                        "logs:PutLogEvents"
                    ],
                    "Resource": "*"
                }]
            }
        }));

        policies
    }

    /// CFN template for the function and its execution role
    ///
    /// The role carries an inline policy per grant the handler holds.
    pub(crate) fn resources<'a>(&self, grants: impl Iterator<Item = &'a Grant>) -> Vec<CfnResource> {
        let id = self.logical_id();
        let role_id = self.role_logical_id();

        vec![
            CfnResource {
                logical_id: id,
                resource: json!({
                    "Type": "AWS::Lambda::Function",
                    "Properties": {
                        "FunctionName": self.function_name,
                        "Handler": self.entry_point,
                        "Runtime": self.runtime,
                        "Environment": {"Variables": self.environment},
                        "Role": {"Fn::GetAtt": [role_id, "Arn"]},
                        "MemorySize": self.memory_size,
                        "Timeout": self.timeout,
                        "Code": {
                            "S3Bucket": self.code.bucket,
                            "S3Key": self.code.key
                        }
                    },
                    "DependsOn": [role_id]
                }),
            },
            CfnResource {
                logical_id: role_id,
                resource: json!({
                    "Type": "AWS::IAM::Role",
                    "Properties": {
                        "AssumeRolePolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Effect": "Allow",
                                "Principal": {
                                    "Service": ["lambda.amazonaws.com"]
                                },
                                "Action": ["sts:AssumeRole"]
                            }]
                        },
                        "Path": "/",
                        "Policies": Self::policies(grants)
                    }
                }),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Grants;
    use crate::table::{Domain, Table};

    #[test]
    fn function_wires_role_code_and_environment() {
        let settings = Settings {
            prefix: Some("dev".into()),
            ..Default::default()
        };

        let table = Table::new(Domain::Review, &settings);
        let handler = Handler::new("CreateReviewItemFunction", "createItem.handler", &settings)
            .with_environment(table.environment());

        let mut grants = Grants::default();
        grants.grant_read_write(&handler, &table);

        let resources = handler.resources(grants.iter());
        let function = &resources[0].resource;
        let role = &resources[1].resource;

        assert_eq!(resources[0].logical_id, "CreateReviewItemFunction");
        assert_eq!(resources[1].logical_id, "CreateReviewItemFunctionServiceRole");
        assert_eq!(function["Properties"]["FunctionName"], "dev-CreateReviewItemFunction");
        assert_eq!(function["Properties"]["Handler"], "createItem.handler");
        assert_eq!(function["Properties"]["Runtime"], "nodejs20.x");
        assert_eq!(
            function["Properties"]["Environment"]["Variables"],
            json!({"TABLE_NAME": "dev-reviews", "PRIMARY_KEY": "id"})
        );
        assert_eq!(
            function["Properties"]["Role"],
            json!({"Fn::GetAtt": ["CreateReviewItemFunctionServiceRole", "Arn"]})
        );

        let policies = role["Properties"]["Policies"].as_array().unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0]["PolicyName"], "ReviewsTableAccess");
        assert_eq!(policies[1]["PolicyName"], "AppendToLogsPolicy");
    }

    #[test]
    fn handler_without_grants_only_writes_logs() {
        let handler = Handler::new("PingFunction", "ping.handler", &Settings::default());
        let grants = Grants::default();
        let resources = handler.resources(grants.iter());

        let policies = resources[1].resource["Properties"]["Policies"].as_array().unwrap();
        assert_eq!(policies.len(), 1);
    }
}
