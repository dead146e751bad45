use crate::error::Error;
use crate::runner::{Runnable, Runner};
use crate::writer::Writer;
use serde_json::json;
use storefront_stacks::{App, Domain};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled, Clone, Debug, PartialEq)]
struct RouteRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Handler")]
    handler: String,
    #[tabled(rename = "Body model")]
    model: String,
}

#[derive(clap::Args, Clone)]
pub(crate) struct RoutesCommand {
    /// Only list routes of this domain, e.g. `review`
    #[arg()]
    domain: Option<Domain>,
}

impl Runnable for RoutesCommand {
    fn runner(&self, writer: &Writer) -> impl Runner {
        RoutesRunner {
            command: self.clone(),
            writer,
        }
    }
}

struct RoutesRunner<'a> {
    command: RoutesCommand,
    writer: &'a Writer,
}

impl Runner for RoutesRunner<'_> {
    async fn run(&mut self) -> Result<(), Error> {
        let config = self.config()?;
        let app = self.app(&config)?;
        let rows = rows(&app, self.command.domain);

        self.writer.json(json!(rows
            .iter()
            .map(|r| json!({
                "service": r.service,
                "method": r.method,
                "path": r.path,
                "handler": r.handler,
                "model": (!r.model.is_empty()).then_some(&r.model),
            }))
            .collect::<Vec<_>>()))?;

        let mut table = Table::new(rows);
        table.with(Style::modern());
        self.writer.text(&format!("{table}\n"))
    }
}

fn rows(app: &App, domain: Option<Domain>) -> Vec<RouteRow> {
    app.services()
        .iter()
        .filter(|s| domain.is_none_or(|d| d == s.domain))
        .flat_map(|service| {
            service.api().routes().iter().map(|route| RouteRow {
                service: service.api().name.clone(),
                method: route.method.to_string(),
                path: route.path.clone(),
                handler: route.handler.clone(),
                model: route.model.clone().unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_stacks::Settings;

    #[test]
    fn inventory_routes() {
        let app = App::new(Settings::default()).unwrap();
        let rows = rows(&app, Some(Domain::Inventory));

        assert_eq!(
            rows.iter()
                .map(|r| (r.method.as_str(), r.path.as_str(), r.model.as_str()))
                .collect::<Vec<_>>(),
            vec![
                ("GET", "/{id}", ""),
                ("PUT", "/{id}", "InventoryUpdateModel"),
            ]
        );
    }

    #[test]
    fn all_routes_without_filter() {
        let app = App::new(Settings::default()).unwrap();
        assert_eq!(rows(&app, None).len(), 17);
    }
}
