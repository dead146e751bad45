use crate::error::Error;
use crate::provision::Provisioner;
use crate::runner::{Runnable, Runner};
use crate::writer::Writer;
use futures::future::try_join_all;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled, Clone, Debug, PartialEq)]
struct StackRow {
    #[tabled(rename = "Stack")]
    stack: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(clap::Args, Clone)]
pub(crate) struct StatusCommand {}

impl Runnable for StatusCommand {
    fn runner(&self, writer: &Writer) -> impl Runner {
        StatusRunner { writer }
    }
}

struct StatusRunner<'a> {
    writer: &'a Writer,
}

impl Runner for StatusRunner<'_> {
    /// Prints out the CloudFormation status of every stack
    async fn run(&mut self) -> Result<(), Error> {
        let config = self.config()?;
        let app = self.app(&config)?;
        let provisioner = self.provisioner(&config).await;

        let rows = statuses(&provisioner, &app.stack_names())
            .await
            .map_err(|e| {
                self.error(
                    Some("Failed to fetch stack statuses"),
                    Some("Check your AWS credentials and region."),
                    Some(e.into()),
                )
            })?;

        self.writer.json(json!(rows
            .iter()
            .map(|r| json!({"stack": r.stack, "status": r.status}))
            .collect::<Vec<_>>()))?;

        let mut table = Table::new(rows);
        table.with(Style::modern());
        self.writer.text(&format!("{table}\n"))
    }
}

async fn statuses(provisioner: &dyn Provisioner, names: &[String]) -> eyre::Result<Vec<StackRow>> {
    try_join_all(names.iter().map(|name| async move {
        let status = provisioner.status(name).await?;

        Ok::<_, eyre::Report>(StackRow {
            stack: name.clone(),
            status: status.unwrap_or_else(|| "NOT_DEPLOYED".into()),
        })
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::tests::RecordingProvisioner;

    #[tokio::test]
    async fn one_row_per_stack_in_order() {
        let provisioner = RecordingProvisioner::default();
        let names = ["DatabaseStack", "ProductStack"].map(String::from);

        let rows = statuses(&provisioner, &names).await.unwrap();

        assert_eq!(
            rows,
            vec![
                StackRow {
                    stack: "DatabaseStack".into(),
                    status: "CREATE_COMPLETE".into()
                },
                StackRow {
                    stack: "ProductStack".into(),
                    status: "CREATE_COMPLETE".into()
                },
            ]
        );
    }
}
