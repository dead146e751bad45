use super::{Method, RestApi, Route};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use storefront_common::schema::Violation;
use thiserror::Error;

/// A request refused by the API before any handler is invoked
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    /// API Gateway answers unknown routes this way, even for public APIs
    #[error("Missing Authentication Token")]
    NoRoute { method: Method, path: String },

    #[error("Invalid request body")]
    InvalidBody { violations: Vec<Violation> },
}

impl Rejection {
    pub fn status_code(&self) -> u16 {
        match self {
            Rejection::NoRoute { .. } => 403,
            Rejection::InvalidBody { .. } => 400,
        }
    }

    /// Response payload returned to the client
    pub fn body(&self) -> Value {
        json!({ "message": self.to_string() })
    }
}

/// A request accepted by the API, to be passed to the route's handler
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch<'a> {
    pub route: &'a Route,
    pub path_parameters: BTreeMap<String, String>,

    /// Parsed body, present when the body was validated against a model
    pub body: Option<Value>,
}

impl RestApi {
    /// Match a concrete request path against the declared resource paths
    ///
    /// Literal segments win over path parameters, e.g. `/search` is preferred over `/{id}`.
    fn match_path(&self, path: &str) -> Option<(&str, BTreeMap<String, String>)> {
        let segments = split(path);

        self.paths()
            .iter()
            .filter_map(|template| {
                let template_segments = split(template);

                if template_segments.len() != segments.len() {
                    return None;
                }

                let mut parameters = BTreeMap::new();
                let mut literals = 0;

                for (expected, actual) in template_segments.iter().zip(segments.iter()) {
                    match expected
                        .strip_prefix('{')
                        .and_then(|s| s.strip_suffix('}'))
                    {
                        Some(name) => {
                            parameters.insert(name.to_string(), actual.to_string());
                        }
                        None if expected == actual => literals += 1,
                        None => return None,
                    }
                }

                Some((literals, template.as_str(), parameters))
            })
            .max_by_key(|(literals, ..)| *literals)
            .map(|(_, template, parameters)| (template, parameters))
    }

    /// Run a request through the API's routing and request validation
    ///
    /// Mirrors what API Gateway does before invoking a handler: unknown routes are refused,
    /// and so are bodies that do not conform to the route's model when a body validator is
    /// attached to it.
    pub fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<Dispatch<'_>, Rejection> {
        let no_route = || Rejection::NoRoute {
            method,
            path: path.to_string(),
        };

        let (template, path_parameters) = self.match_path(path).ok_or_else(no_route)?;
        let route = self.route(template, method).ok_or_else(no_route)?;

        let validates_body = route
            .validator
            .as_ref()
            .and_then(|name| self.validator(name))
            .is_some_and(|v| v.validate_body);

        let model = route.model.as_ref().and_then(|name| self.model(name));

        let body = match (validates_body, model) {
            (true, Some(model)) => {
                let value = parse(body)?;

                model
                    .schema
                    .validate(&value)
                    .map_err(|violations| Rejection::InvalidBody { violations })?;

                Some(value)
            }
            _ => None,
        };

        log::debug!("Dispatching {method} {path} to {}", route.handler);

        Ok(Dispatch {
            route,
            path_parameters,
            body,
        })
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('?')
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse(body: Option<&str>) -> Result<Value, Rejection> {
    let invalid = |message: String| Rejection::InvalidBody {
        violations: vec![Violation {
            path: "$".into(),
            message,
        }],
    };

    let body = body
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| invalid("request body is missing".into()))?;

    serde_json::from_str(body).map_err(|e| invalid(format!("request body is not valid JSON: {e}")))
}
