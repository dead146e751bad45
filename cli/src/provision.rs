use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::error::SdkError;
use aws_sdk_cloudformation::types::Capability;
use eyre::{ContextCompat, WrapErr};
use serde::Serialize;
use std::time::Duration;
use storefront_stacks::Template;

/// Result of submitting a template
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Outcome {
    Created,
    Updated,
    Unchanged,
    Deleted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            Outcome::Created => "Created",
            Outcome::Updated => "Updated",
            Outcome::Unchanged => "Unchanged",
            Outcome::Deleted => "Deleted",
        };

        write!(f, "{str}")
    }
}

/// What provisioning a template does to a stack in the given status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Create,
    Update,

    /// A stack whose first creation failed can't be updated, only deleted
    Recreate,
}

impl Action {
    pub(crate) fn for_status(status: Option<&str>) -> Self {
        match status {
            None | Some("DELETE_COMPLETE") => Action::Create,
            Some("ROLLBACK_COMPLETE") => Action::Recreate,
            Some(_) => Action::Update,
        }
    }
}

/// Shared AWS SDK config, in the configured region or the one the SDK resolves
pub(crate) async fn sdk_config(region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }

    loader.load().await
}

/// Applies declared stacks to the cloud
///
/// Every call returns once the stack has settled.
#[async_trait]
pub(crate) trait Provisioner: Send + Sync {
    /// Create the stack or update it if it exists
    async fn provision(&self, template: &Template) -> eyre::Result<Outcome>;

    async fn destroy(&self, stack_name: &str) -> eyre::Result<Outcome>;

    /// Current status, `None` for stacks that don't exist
    async fn status(&self, stack_name: &str) -> eyre::Result<Option<String>>;
}

/// Provisioner backed by AWS CloudFormation
pub(crate) struct CloudFormation {
    client: aws_sdk_cloudformation::Client,
    poll_interval: Duration,
}

impl CloudFormation {
    pub(crate) async fn new(region: Option<&str>) -> Self {
        CloudFormation {
            client: aws_sdk_cloudformation::Client::new(&sdk_config(region).await),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Stack status and its reason, `None` when the stack does not exist
    async fn describe(&self, name: &str) -> eyre::Result<Option<(String, Option<String>)>> {
        let result = self.client.describe_stacks().stack_name(name).send().await;

        let output = match result {
            Ok(output) => output,

            // CloudFormation has no dedicated error for a missing stack
            Err(SdkError::ServiceError(err))
                if err.err().meta().code() == Some("ValidationError") =>
            {
                return Ok(None);
            }

            Err(e) => return Err(e).wrap_err(format!("Failed to describe stack {name}")),
        };

        let stack = output.stacks().first().wrap_err("Empty stack description")?;

        Ok(stack.stack_status().map(|status| {
            (
                status.as_str().to_string(),
                stack.stack_status_reason().map(String::from),
            )
        }))
    }

    /// Poll the stack until no operation is in progress
    async fn wait(&self, name: &str) -> eyre::Result<Option<String>> {
        loop {
            match self.describe(name).await? {
                Some((status, reason)) if status.ends_with("_IN_PROGRESS") => {
                    log::debug!("{name}: {status} {}", reason.unwrap_or_default());
                    tokio::time::sleep(self.poll_interval).await;
                }

                Some((status, reason))
                    if status.ends_with("_FAILED") || status.contains("ROLLBACK") =>
                {
                    eyre::bail!(
                        "Stack {name} ended in {status}: {}",
                        reason.unwrap_or("no reason given".into())
                    );
                }

                settled => return Ok(settled.map(|(status, _)| status)),
            }
        }
    }

    /// Delete the stack and poll until it is gone
    ///
    /// Unlike `wait` it tolerates rolled back stacks, which is what usually gets deleted.
    async fn delete(&self, name: &str) -> eyre::Result<()> {
        self.client
            .delete_stack()
            .stack_name(name)
            .send()
            .await
            .wrap_err(format!("Failed to delete stack {name}"))?;

        loop {
            match self.describe(name).await? {
                None => return Ok(()),
                Some((status, _)) if status == "DELETE_COMPLETE" => return Ok(()),

                Some((status, reason)) if status == "DELETE_FAILED" => {
                    eyre::bail!(
                        "Stack {name} ended in {status}: {}",
                        reason.unwrap_or("no reason given".into())
                    );
                }

                Some((status, _)) => {
                    log::debug!("{name}: {status}");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn create(&self, name: &str, body: String) -> eyre::Result<()> {
        self.client
            .create_stack()
            .capabilities(Capability::CapabilityIam)
            .stack_name(name)
            .template_body(body)
            .send()
            .await
            .wrap_err(format!("Failed to create stack {name}"))?;

        Ok(())
    }

    /// Returns `false` when the stack already matches the template
    async fn update(&self, name: &str, body: String) -> eyre::Result<bool> {
        let result = self
            .client
            .update_stack()
            .capabilities(Capability::CapabilityIam)
            .stack_name(name)
            .template_body(body)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),

            Err(SdkError::ServiceError(err))
                if err
                    .err()
                    .meta()
                    .message()
                    .is_some_and(|m| m.contains("No updates are to be performed")) =>
            {
                Ok(false)
            }

            Err(e) => Err(e).wrap_err(format!("Failed to update stack {name}")),
        }
    }
}

#[async_trait]
impl Provisioner for CloudFormation {
    async fn provision(&self, template: &Template) -> eyre::Result<Outcome> {
        let name = template.stack_name();
        let body = template
            .body()
            .wrap_err(format!("Failed to serialize template of {name}"))?;

        let status = self.describe(name).await?.map(|(status, _)| status);

        let outcome = match Action::for_status(status.as_deref()) {
            Action::Create => {
                self.create(name, body).await?;
                Outcome::Created
            }

            Action::Update => {
                if !self.update(name, body).await? {
                    return Ok(Outcome::Unchanged);
                }

                Outcome::Updated
            }

            Action::Recreate => {
                log::info!("{name} failed to create earlier, deleting it first");
                self.delete(name).await?;
                self.create(name, body).await?;
                Outcome::Created
            }
        };

        self.wait(name).await?;
        Ok(outcome)
    }

    async fn destroy(&self, stack_name: &str) -> eyre::Result<Outcome> {
        if self.describe(stack_name).await?.is_none() {
            return Ok(Outcome::Unchanged);
        }

        self.delete(stack_name).await?;
        Ok(Outcome::Deleted)
    }

    async fn status(&self, stack_name: &str) -> eyre::Result<Option<String>> {
        Ok(self
            .describe(stack_name)
            .await?
            .map(|(status, _)| status)
            .filter(|status| status != "DELETE_COMPLETE"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bundle::{Bundle, Uploader};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records calls instead of touching the cloud
    #[derive(Default)]
    pub(crate) struct RecordingProvisioner {
        pub(crate) calls: Mutex<Vec<String>>,

        /// Stack which fails to provision or destroy
        pub(crate) failing: Option<String>,

        /// Current status per stack, stacks not listed don't exist
        pub(crate) statuses: HashMap<String, String>,
    }

    impl RecordingProvisioner {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provisioner for RecordingProvisioner {
        async fn provision(&self, template: &Template) -> eyre::Result<Outcome> {
            let name = template.stack_name();
            let action = Action::for_status(self.statuses.get(name).map(String::as_str));

            if action == Action::Recreate {
                self.record(format!("destroy {name}"));
            }

            self.record(format!("provision {name}"));

            if self.failing.as_deref() == Some(name) {
                eyre::bail!("Stack {name} ended in CREATE_FAILED");
            }

            Ok(match action {
                Action::Update => Outcome::Updated,
                _ => Outcome::Created,
            })
        }

        async fn destroy(&self, stack_name: &str) -> eyre::Result<Outcome> {
            self.record(format!("destroy {stack_name}"));

            if self.failing.as_deref() == Some(stack_name) {
                eyre::bail!("Stack {stack_name} ended in DELETE_FAILED");
            }

            Ok(Outcome::Deleted)
        }

        async fn status(&self, stack_name: &str) -> eyre::Result<Option<String>> {
            self.record(format!("status {stack_name}"));
            Ok(Some("CREATE_COMPLETE".into()))
        }
    }

    #[async_trait]
    impl Uploader for RecordingProvisioner {
        async fn upload(&self, bucket: &str, bundle: &Bundle) -> eyre::Result<bool> {
            self.record(format!("upload {bucket}/{}", bundle.key));

            if self.failing.as_deref() == Some(bundle.key.as_str()) {
                eyre::bail!("Access denied to {bucket}");
            }

            Ok(true)
        }
    }

    #[test]
    fn rolled_back_creation_is_recreated() {
        assert_eq!(Action::for_status(Some("ROLLBACK_COMPLETE")), Action::Recreate);
    }

    #[test]
    fn existing_stacks_are_updated() {
        for status in ["CREATE_COMPLETE", "UPDATE_COMPLETE", "UPDATE_ROLLBACK_COMPLETE"] {
            assert_eq!(Action::for_status(Some(status)), Action::Update, "{status}");
        }
    }

    #[test]
    fn missing_or_deleted_stacks_are_created() {
        assert_eq!(Action::for_status(None), Action::Create);
        assert_eq!(Action::for_status(Some("DELETE_COMPLETE")), Action::Create);
    }
}
