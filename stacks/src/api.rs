mod dispatch;
mod method;

pub use dispatch::{Dispatch, Rejection};
pub use method::Method;

use crate::error::DeclarationError;
use crate::handler::Handler;
use crate::template::CfnResource;
use serde_json::{json, Map, Value};
use storefront_common::schema::JsonSchema;
use storefront_common::template::sanitize::logical_id;

/// Path of the API's root resource
pub const ROOT: &str = "/";

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// JSON schema of request bodies, attached to methods
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub name: String,
    pub content_type: String,
    pub schema: JsonSchema,
}

impl Model {
    pub fn json(name: &str, schema: JsonSchema) -> Self {
        Model {
            name: name.to_string(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            schema,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestValidator {
    pub name: String,
    pub validate_body: bool,
    pub validate_parameters: bool,
}

impl RequestValidator {
    /// Validator checking request bodies against the method's model, parameters are not checked
    pub fn body(name: &str) -> Self {
        RequestValidator {
            name: name.to_string(),
            validate_body: true,
            validate_parameters: false,
        }
    }
}

/// Optional request checks of a method, by validator and model name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MethodOptions {
    pub validator: Option<String>,
    pub model: Option<String>,
}

impl MethodOptions {
    pub fn validated(validator: &str, model: &str) -> Self {
        MethodOptions {
            validator: Some(validator.to_string()),
            model: Some(model.to_string()),
        }
    }
}

/// Binding of (verb, path) to a handler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub method: Method,

    /// Id of the target handler
    pub handler: String,

    pub validator: Option<String>,
    pub model: Option<String>,
}

impl Route {
    pub fn is_validated(&self) -> bool {
        self.validator.is_some()
    }
}

/// A REST API with its resources, routes and request checks
#[derive(Clone, Debug)]
pub struct RestApi {
    pub id: String,
    pub name: String,
    pub stage: String,
    paths: Vec<String>,
    routes: Vec<Route>,
    models: Vec<Model>,
    validators: Vec<RequestValidator>,
}

impl RestApi {
    pub fn new(id: &str, name: &str, stage: &str) -> Self {
        RestApi {
            id: id.to_string(),
            name: name.to_string(),
            stage: stage.to_string(),
            paths: vec![ROOT.to_string()],
            routes: vec![],
            models: vec![],
            validators: vec![],
        }
    }

    /// Declare a child resource and return its full path
    pub fn add_resource(&mut self, parent: &str, path_part: &str) -> Result<String, DeclarationError> {
        if !self.paths.iter().any(|p| p == parent) {
            return Err(DeclarationError::UnknownPath {
                api: self.name.clone(),
                path: parent.to_string(),
            });
        }

        let path = if parent == ROOT {
            format!("/{path_part}")
        } else {
            format!("{parent}/{path_part}")
        };

        if self.paths.contains(&path) {
            return Err(DeclarationError::DuplicatePath {
                api: self.name.clone(),
                path,
            });
        }

        self.paths.push(path.clone());
        Ok(path)
    }

    pub fn add_model(&mut self, model: Model) -> Result<(), DeclarationError> {
        if self.model(&model.name).is_some() {
            return Err(self.duplicate("Model", &model.name));
        }

        self.models.push(model);
        Ok(())
    }

    pub fn add_validator(&mut self, validator: RequestValidator) -> Result<(), DeclarationError> {
        if self.validator(&validator.name).is_some() {
            return Err(self.duplicate("Request validator", &validator.name));
        }

        self.validators.push(validator);
        Ok(())
    }

    /// Bind a handler to (verb, path)
    ///
    /// Only one handler per (verb, path) is allowed; the path, validator and model must be
    /// declared beforehand.
    pub fn add_method(
        &mut self,
        path: &str,
        method: Method,
        handler: &Handler,
        options: MethodOptions,
    ) -> Result<(), DeclarationError> {
        if !self.paths.iter().any(|p| p == path) {
            return Err(DeclarationError::UnknownPath {
                api: self.name.clone(),
                path: path.to_string(),
            });
        }

        if self.route(path, method).is_some() {
            return Err(DeclarationError::DuplicateRoute {
                api: self.name.clone(),
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        if let Some(name) = &options.validator {
            if self.validator(name).is_none() {
                return Err(self.unknown("Request validator", name));
            }
        }

        if let Some(name) = &options.model {
            if self.model(name).is_none() {
                return Err(self.unknown("Model", name));
            }
        }

        self.routes.push(Route {
            path: path.to_string(),
            method,
            handler: handler.id.clone(),
            validator: options.validator,
            model: options.model,
        });

        Ok(())
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, path: &str, method: Method) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.path == path && r.method == method)
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn validator(&self, name: &str) -> Option<&RequestValidator> {
        self.validators.iter().find(|v| v.name == name)
    }

    pub fn logical_id(&self) -> String {
        logical_id(&[&self.id])
    }

    /// Invoke URL of the deployed stage
    pub fn url(&self) -> Value {
        json!({
            "Fn::Sub": format!(
                "https://${{{}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}/{}/",
                self.logical_id(),
                self.stage
            )
        })
    }

    fn duplicate(&self, kind: &'static str, name: &str) -> DeclarationError {
        DeclarationError::DuplicateName {
            api: self.name.clone(),
            kind,
            name: name.to_string(),
        }
    }

    fn unknown(&self, kind: &'static str, name: &str) -> DeclarationError {
        DeclarationError::UnknownName {
            api: self.name.clone(),
            kind,
            name: name.to_string(),
        }
    }

    fn path_logical_id(&self, path: &str) -> String {
        if path == ROOT {
            logical_id(&[&self.id, "root"])
        } else {
            logical_id(&[&self.id, path])
        }
    }

    fn resource_id(&self, path: &str) -> Value {
        if path == ROOT {
            json!({ "Fn::GetAtt": [self.logical_id(), "RootResourceId"] })
        } else {
            json!({ "Ref": format!("{}Resource", self.path_logical_id(path)) })
        }
    }

    /// Path as it appears in an execute-api ARN, path parameters become wildcards
    fn arn_path(path: &str) -> String {
        path.split('/')
            .map(|s| if s.starts_with('{') { "*" } else { s })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// CFN template for the API: resources, models, validators, methods with their
    /// invoke permissions, and a deployment of the stage
    pub(crate) fn resources(&self, handlers: &[Handler]) -> Result<Vec<CfnResource>, DeclarationError> {
        let api_id = self.logical_id();
        let mut resources = vec![CfnResource {
            logical_id: api_id.clone(),
            resource: json!({
                "Type": "AWS::ApiGateway::RestApi",
                "Properties": {"Name": self.name}
            }),
        }];

        for path in self.paths.iter().filter(|p| *p != ROOT) {
            let (parent, path_part) = path.rsplit_once('/').unwrap_or((ROOT, path.as_str()));
            let parent = if parent.is_empty() { ROOT } else { parent };

            resources.push(CfnResource {
                logical_id: format!("{}Resource", self.path_logical_id(path)),
                resource: json!({
                    "Type": "AWS::ApiGateway::Resource",
                    "Properties": {
                        "RestApiId": {"Ref": api_id},
                        "ParentId": self.resource_id(parent),
                        "PathPart": path_part
                    }
                }),
            });
        }

        for model in self.models.iter() {
            resources.push(CfnResource {
                logical_id: logical_id(&[&model.name]),
                resource: json!({
                    "Type": "AWS::ApiGateway::Model",
                    "Properties": {
                        "RestApiId": {"Ref": api_id},
                        "Name": logical_id(&[&model.name]),
                        "ContentType": model.content_type,
                        "Schema": model.schema
                    }
                }),
            });
        }

        for validator in self.validators.iter() {
            resources.push(CfnResource {
                logical_id: logical_id(&[&validator.name]),
                resource: json!({
                    "Type": "AWS::ApiGateway::RequestValidator",
                    "Properties": {
                        "RestApiId": {"Ref": api_id},
                        "Name": validator.name,
                        "ValidateRequestBody": validator.validate_body,
                        "ValidateRequestParameters": validator.validate_parameters
                    }
                }),
            });
        }

        let mut method_ids = vec![];

        for route in self.routes.iter() {
            let handler = handlers
                .iter()
                .find(|h| h.id == route.handler)
                .ok_or_else(|| self.unknown("Handler", &route.handler))?;

            let method_id = format!("{}{}", self.path_logical_id(&route.path), route.method);

            let mut properties = json!({
                "RestApiId": {"Ref": api_id},
                "ResourceId": self.resource_id(&route.path),
                "HttpMethod": route.method.as_str(),
                "AuthorizationType": "NONE",
                "Integration": {
                    "Type": "AWS_PROXY",
                    "IntegrationHttpMethod": "POST",
                    "Uri": {
                        "Fn::Sub": format!(
                            "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/{}/invocations",
                            handler.arn_sub()
                        )
                    }
                }
            });

            if let Some(validator) = &route.validator {
                properties["RequestValidatorId"] = json!({ "Ref": logical_id(&[validator]) });
            }

            if let Some(model) = route.model.as_ref().and_then(|name| self.model(name)) {
                let mut models = Map::new();
                models.insert(
                    model.content_type.clone(),
                    json!({ "Ref": logical_id(&[&model.name]) }),
                );
                properties["RequestModels"] = Value::Object(models);
            }

            resources.push(CfnResource {
                logical_id: method_id.clone(),
                resource: json!({
                    "Type": "AWS::ApiGateway::Method",
                    "Properties": properties
                }),
            });

            // API Gateway has no permission to call the function unless allowed explicitly
            resources.push(CfnResource {
                logical_id: format!("{method_id}Permission"),
                resource: json!({
                    "Type": "AWS::Lambda::Permission",
                    "Properties": {
                        "Action": "lambda:InvokeFunction",
                        "FunctionName": {"Fn::GetAtt": [handler.logical_id(), "Arn"]},
                        "Principal": "apigateway.amazonaws.com",
                        "SourceArn": {
                            "Fn::Sub": format!(
                                "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{api_id}}}/{}/{}{}",
                                self.stage,
                                route.method,
                                Self::arn_path(&route.path)
                            )
                        }
                    }
                }),
            });

            method_ids.push(method_id);
        }

        // A deployment is immutable, so a new logical id is needed whenever the routes change
        let fingerprint = sha256::digest(
            serde_json::to_string(
                &resources
                    .iter()
                    .map(|r| (&r.logical_id, &r.resource))
                    .collect::<Vec<_>>(),
            )
            .unwrap_or_default(),
        );

        resources.push(CfnResource {
            logical_id: format!("{api_id}Deployment{}", &fingerprint[..8]),
            resource: json!({
                "Type": "AWS::ApiGateway::Deployment",
                "Properties": {
                    "RestApiId": {"Ref": api_id},
                    "StageName": self.stage,
                    "Description": format!("Automatically created by {}", self.name)
                },
                "DependsOn": method_ids
            }),
        });

        Ok(resources)
    }
}
