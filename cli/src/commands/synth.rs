use crate::error::Error;
use crate::runner::{select, Runnable, Runner};
use crate::writer::Writer;
use eyre::WrapErr;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use storefront_stacks::Template;

#[derive(clap::Args, Clone)]
pub(crate) struct SynthCommand {
    /// Directory to write `<stack>.template.json` files into, instead of printing
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Stacks to synthesize (name, domain, or `storage`), all by default
    #[arg(value_delimiter = ',')]
    stacks: Vec<String>,
}

impl Runnable for SynthCommand {
    fn runner(&self, writer: &Writer) -> impl Runner {
        SynthRunner {
            command: self.clone(),
            writer,
        }
    }
}

struct SynthRunner<'a> {
    command: SynthCommand,
    writer: &'a Writer,
}

impl Runner for SynthRunner<'_> {
    async fn run(&mut self) -> Result<(), Error> {
        let mut config = self.config()?;

        // Templates refer to the same bundle `deploy` would upload
        self.bundle(&mut config).await?;

        let app = self.app(&config)?;
        let templates = select(&app, &self.command.stacks)?;

        let Some(dir) = &self.command.out else {
            return self.print(&templates);
        };

        let paths = write(dir, &templates)?;

        for path in paths.iter() {
            self.writer.text(&format!(
                "{} {}\n",
                console::style("Wrote").green().bold(),
                path.display()
            ))?;
        }

        self.writer.json(serde_json::json!(paths))
    }
}

impl SynthRunner<'_> {
    fn print(&self, templates: &[Template]) -> Result<(), Error> {
        let mut all = Map::new();

        for template in templates {
            self.writer.text(&format!(
                "{}\n{}\n\n",
                console::style(template.stack_name()).bold(),
                template.body().wrap_err("Failed to serialize the template")?
            ))?;

            all.insert(template.stack_name().to_string(), template.to_value());
        }

        self.writer.json(Value::Object(all))
    }
}

/// Write every template into its own file, returns the paths written
fn write(dir: &Path, templates: &[Template]) -> eyre::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).wrap_err(Error::new(
        &format!("Failed to create {dir:?}"),
        Some("Check the directory permissions."),
    ))?;

    templates
        .iter()
        .map(|template| {
            let path = dir.join(format!("{}.template.json", template.stack_name()));
            std::fs::write(&path, template.body()?)
                .wrap_err(format!("Failed to write {path:?}"))?;
            log::debug!("Wrote {path:?}");
            Ok(path)
        })
        .collect()
}
