use crate::error::Error;
use crate::progress::{Progress, ProgressStatus};
use crate::provision::{Outcome, Provisioner};
use crate::runner::{select, Runnable, Runner};
use crate::writer::Writer;
use futures::future::try_join_all;
use serde_json::json;

#[derive(clap::Args, Clone)]
pub(crate) struct DestroyCommand {
    /// Stacks to delete (name, domain, or `storage`), all by default
    #[arg(value_delimiter = ',')]
    stacks: Vec<String>,
}

impl Runnable for DestroyCommand {
    fn runner(&self, writer: &Writer) -> impl Runner {
        DestroyRunner {
            command: self.clone(),
            writer,
        }
    }
}

struct DestroyRunner<'a> {
    command: DestroyCommand,
    writer: &'a Writer,
}

impl Runner for DestroyRunner<'_> {
    /// Delete the services, then the storage stack with the tables
    async fn run(&mut self) -> Result<(), Error> {
        let config = self.config()?;
        let app = self.app(&config)?;

        let names = select(&app, &self.command.stacks)?
            .iter()
            .map(|t| t.stack_name().to_string())
            .collect::<Vec<_>>();

        let provisioner = self.provisioner(&config).await;

        self.writer.text(&format!(
            "{}...\n",
            console::style("Destroying").red().bold()
        ))?;

        let outcomes = destroy(
            &provisioner,
            &names,
            app.storage().stack_name(),
            self.writer.is_structured(),
        )
        .await
        .map_err(|e| {
            self.error(
                Some("Failed to destroy stacks"),
                Some(&format!("{e}. Run `storefront status` to check the stacks.")),
                Some(e.into()),
            )
        })?;

        self.writer.json(json!(outcomes
            .iter()
            .map(|(name, outcome)| json!({"stack": name, "outcome": outcome}))
            .collect::<Vec<_>>()))
    }
}

async fn delete(
    provisioner: &dyn Provisioner,
    name: &str,
    is_hidden: bool,
) -> eyre::Result<(String, Outcome)> {
    let progress = Progress::new(name, is_hidden);
    progress.log_stage("Deleting");

    let outcome = provisioner
        .destroy(name)
        .await
        .inspect_err(|_| progress.error("Deleting"))?;

    let status = match outcome {
        Outcome::Deleted => ProgressStatus::Success,
        _ => ProgressStatus::Warn,
    };

    let message = (outcome == Outcome::Unchanged).then_some("does not exist");
    progress.finish(&outcome.to_string(), status, message);
    Ok((name.to_string(), outcome))
}

/// Delete stacks in reverse deployment order
///
/// The storage stack goes last, as it can't be deleted while services import its exports.
pub(crate) async fn destroy(
    provisioner: &dyn Provisioner,
    names: &[String],
    storage_stack: &str,
    is_hidden: bool,
) -> eyre::Result<Vec<(String, Outcome)>> {
    let (storage, services): (Vec<_>, Vec<_>) =
        names.iter().partition(|name| *name == storage_stack);

    let mut outcomes = try_join_all(
        services
            .into_iter()
            .map(|name| delete(provisioner, name, is_hidden)),
    )
    .await?;

    for name in storage {
        outcomes.push(delete(provisioner, name, is_hidden).await?);
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::tests::RecordingProvisioner;
    use storefront_stacks::{App, Settings};

    #[tokio::test]
    async fn storage_is_deleted_last() {
        let app = App::new(Settings::default()).unwrap();
        let provisioner = RecordingProvisioner::default();

        destroy(&provisioner, &app.stack_names(), "DatabaseStack", true)
            .await
            .unwrap();

        let calls = provisioner.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls.last().unwrap(), "destroy DatabaseStack");
    }

    #[tokio::test]
    async fn storage_is_kept_when_a_service_fails() {
        let app = App::new(Settings::default()).unwrap();
        let provisioner = RecordingProvisioner {
            failing: Some("OrderStack".into()),
            ..Default::default()
        };

        assert!(
            destroy(&provisioner, &app.stack_names(), "DatabaseStack", true)
                .await
                .is_err()
        );
        assert!(!provisioner
            .calls()
            .contains(&"destroy DatabaseStack".to_string()));
    }
}
