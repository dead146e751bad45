use crate::error::Error;
use crate::runner::{Runnable, Runner};
use crate::writer::Writer;
use serde_json::{json, Value};
use storefront_stacks::api::Rejection;
use storefront_stacks::{Domain, Method, ServiceStack};

#[derive(clap::Args, Clone)]
pub(crate) struct ValidateCommand {
    /// Service to send the request to, e.g. `review`
    #[arg()]
    domain: Domain,

    /// HTTP method, e.g. POST
    #[arg()]
    method: Method,

    /// Request path relative to the stage, e.g. `/` or `/r1`
    #[arg()]
    path: String,

    /// JSON request body
    #[arg()]
    body: Option<String>,
}

impl Runnable for ValidateCommand {
    fn runner(&self, writer: &Writer) -> impl Runner {
        ValidateRunner {
            command: self.clone(),
            writer,
        }
    }
}

struct ValidateRunner<'a> {
    command: ValidateCommand,
    writer: &'a Writer,
}

impl Runner for ValidateRunner<'_> {
    /// Run the request through the API's routing and validation, without calling the handler
    async fn run(&mut self) -> Result<(), Error> {
        let config = self.config()?;
        let app = self.app(&config)?;

        let service = app.service(self.command.domain).ok_or_else(|| {
            self.error(
                Some("Service not found"),
                Some(&format!("No service is declared for {}", self.command.domain)),
                None,
            )
        })?;

        let outcome = outcome(
            service,
            self.command.method,
            &self.command.path,
            self.command.body.as_deref(),
        );

        self.writer.json(outcome.clone())?;
        self.writer.text(&describe(&outcome))
    }
}

/// What API Gateway would do with the request
fn outcome(service: &ServiceStack, method: Method, path: &str, body: Option<&str>) -> Value {
    match service.dispatch(method, path, body) {
        Ok(invocation) => json!({
            "accepted": true,
            "handler": invocation.handler.id,
            "function": invocation.handler.function_name,
            "entryPoint": invocation.handler.entry_point,
            "pathParameters": invocation.path_parameters,
            "environment": invocation.handler.environment,
            "body": invocation.body,
        }),

        Err(rejection) => {
            let violations: Vec<String> = match &rejection {
                Rejection::InvalidBody { violations } => {
                    violations.iter().map(|v| v.to_string()).collect()
                }
                Rejection::NoRoute { .. } => vec![],
            };

            json!({
                "accepted": false,
                "statusCode": rejection.status_code(),
                "response": rejection.body(),
                "violations": violations,
            })
        }
    }
}

fn describe(outcome: &Value) -> String {
    if outcome["accepted"] == true {
        let environment = outcome["environment"]
            .as_object()
            .map(|env| {
                env.iter()
                    .map(|(k, v)| format!("  {} {}", console::style(k).dim(), v.as_str().unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        return format!(
            "{} {} {}\n{}\n",
            console::style("Accepted").green().bold(),
            console::style("by").dim(),
            outcome["handler"].as_str().unwrap_or_default(),
            environment,
        );
    }

    let mut text = format!(
        "{} {} {}\n",
        console::style("Rejected").red().bold(),
        outcome["statusCode"],
        outcome["response"]["message"].as_str().unwrap_or_default(),
    );

    for violation in outcome["violations"].as_array().into_iter().flatten() {
        text.push_str(&format!(
            "  {}\n",
            console::style(violation.as_str().unwrap_or_default()).dim()
        ));
    }

    text
}
