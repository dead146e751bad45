use crate::bundle::{Bundle, Uploader};
use crate::error::Error;
use crate::progress::{Progress, ProgressStatus};
use crate::provision::{Outcome, Provisioner};
use crate::runner::{select, Runnable, Runner};
use crate::writer::Writer;
use futures::future::try_join_all;
use serde_json::json;
use storefront_stacks::Template;

#[derive(clap::Args, Clone)]
pub(crate) struct DeployCommand {
    /// Stacks to deploy (name, domain, or `storage`), all by default
    #[arg(value_delimiter = ',')]
    stacks: Vec<String>,
}

impl Runnable for DeployCommand {
    fn runner(&self, writer: &Writer) -> impl Runner {
        DeployRunner {
            command: self.clone(),
            writer,
        }
    }
}

struct DeployRunner<'a> {
    command: DeployCommand,
    writer: &'a Writer,
}

impl Runner for DeployRunner<'_> {
    /// Provision the storage stack, then the services on top of it
    async fn run(&mut self) -> Result<(), Error> {
        let mut config = self.config()?;
        let bundle = self.bundle(&mut config).await?;
        let app = self.app(&config)?;
        let templates = select(&app, &self.command.stacks)?;
        let provisioner = self.provisioner(&config).await;
        let uploader = self.uploader(&config).await;

        let release = bundle.as_ref().map(|bundle| Release {
            uploader: &uploader,
            bundle,
            bucket: &config.settings.code.bucket,
        });

        self.writer.text(&format!(
            "{}...\n",
            console::style("Deploying").green().bold()
        ))?;

        let outcomes = deploy(
            &provisioner,
            &templates,
            app.storage().stack_name(),
            release,
            self.writer.is_structured(),
        )
        .await
        .map_err(|e| {
            self.error(
                Some("Deployment failed"),
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

/// Provision one stack, reporting to its own progress line
async fn provision(
    provisioner: &dyn Provisioner,
    template: &Template,
    is_hidden: bool,
) -> eyre::Result<(String, Outcome)> {
    let progress = Progress::new(template.stack_name(), is_hidden);
    progress.log_stage("Provisioning");

    let outcome = provisioner
        .provision(template)
        .await
        .inspect_err(|_| progress.error("Provisioning"))?;

    let status = match outcome {
        Outcome::Unchanged => ProgressStatus::Warn,
        _ => ProgressStatus::Success,
    };

    progress.finish(&outcome.to_string(), status, None);
    Ok((template.stack_name().to_string(), outcome))
}

/// Handlers' code to publish before the services referring to it
pub(crate) struct Release<'a> {
    pub(crate) uploader: &'a dyn Uploader,
    pub(crate) bundle: &'a Bundle,
    pub(crate) bucket: &'a str,
}

impl Release<'_> {
    async fn publish(&self, is_hidden: bool) -> eyre::Result<()> {
        let progress = Progress::new(&self.bundle.key, is_hidden);
        progress.log_stage("Uploading");

        let is_uploaded = self
            .uploader
            .upload(self.bucket, self.bundle)
            .await
            .inspect_err(|_| progress.error("Uploading"))?;

        if is_uploaded {
            progress.finish("Uploaded", ProgressStatus::Success, None);
        } else {
            progress.finish("Unchanged", ProgressStatus::Warn, None);
        }

        Ok(())
    }
}

/// Deploy templates, the storage stack first as services import its exports
///
/// The handlers' code, if any, is published right before the services.
/// Services don't depend on each other and are provisioned concurrently.
pub(crate) async fn deploy(
    provisioner: &dyn Provisioner,
    templates: &[Template],
    storage_stack: &str,
    release: Option<Release<'_>>,
    is_hidden: bool,
) -> eyre::Result<Vec<(String, Outcome)>> {
    let (storage, services): (Vec<_>, Vec<_>) = templates
        .iter()
        .partition(|t| t.stack_name() == storage_stack);

    let mut outcomes = vec![];

    for template in storage {
        outcomes.push(provision(provisioner, template, is_hidden).await?);
    }

    if let Some(release) = release.filter(|_| !services.is_empty()) {
        release.publish(is_hidden).await?;
    }

    outcomes.extend(
        try_join_all(
            services
                .into_iter()
                .map(|template| provision(provisioner, template, is_hidden)),
        )
        .await?,
    );

    Ok(outcomes)
}
