use crate::bundle::{Bundle, S3};
use crate::config::Config;
use crate::error::Error;
use crate::provision::CloudFormation;
use crate::writer::Writer;
use std::error::Error as StdError;
use storefront_stacks::{App, Domain, Template};

pub(crate) trait Runner {
    /// Configuration of the project in the current directory
    fn config(&self) -> Result<Config, Error> {
        Config::from_current_dir().map_err(|e| {
            self.error(
                Some("Invalid configuration"),
                Some(&format!("{e}. Check storefront.toml in the current directory.")),
                Some(e.into()),
            )
        })
    }

    /// All stacks declared with the current configuration
    fn app(&self, config: &Config) -> Result<App, Error> {
        Ok(App::new(config.settings.clone())?)
    }

    /// Zip the handlers' code, and point the handlers at the bundle's key
    ///
    /// Does nothing when there is no code directory, the configured key is used as is.
    async fn bundle(&self, config: &mut Config) -> Result<Option<Bundle>, Error> {
        let Some(dir) = &config.code_dir else {
            return Ok(None);
        };

        let bundle = Bundle::build(dir).await.map_err(|e| {
            self.error(
                Some("Failed to bundle the handlers"),
                Some(&format!("{e}. Check the [code] path in storefront.toml.")),
                Some(e.into()),
            )
        })?;

        config.settings.code.key = bundle.key.clone();
        Ok(Some(bundle))
    }

    /// CloudFormation client in the configured region
    async fn provisioner(&self, config: &Config) -> CloudFormation {
        CloudFormation::new(config.region.as_deref()).await
    }

    /// S3 client in the configured region
    async fn uploader(&self, config: &Config) -> S3 {
        S3::new(config.region.as_deref()).await
    }

    /// Run the command
    ///
    /// Returns an error shown to the user in case of failure
    async fn run(&mut self) -> Result<(), Error>;

    /// Construct an error shown to the user
    fn error(
        &self,
        title: Option<&str>,
        description: Option<&str>,
        origin: Option<Box<dyn StdError>>,
    ) -> Error {
        if let Some(origin) = origin {
            log::error!("{origin:?}");
        }

        if let Some(title) = title {
            Error::new(title, description)
        } else {
            Error::new(
                "Failed to run the command",
                Some("Run with -vv for details."),
            )
        }
    }
}

/// Return a runner for a command
pub(crate) trait Runnable {
    fn runner(&self, writer: &Writer) -> impl Runner;
}

/// Templates of the requested stacks in deployment order, all of them when nothing is requested
///
/// A stack is requested by its name, by its domain (e.g. `review`), or as `storage`.
pub(crate) fn select(app: &App, requested: &[String]) -> Result<Vec<Template>, Error> {
    let templates = app.templates()?;

    if requested.is_empty() {
        return Ok(templates);
    }

    let mut names = vec![];

    for request in requested {
        let name = if ["storage", "database"].contains(&request.to_lowercase().as_str()) {
            app.storage().stack_name().to_string()
        } else if let Some(service) = request
            .parse::<Domain>()
            .ok()
            .and_then(|domain| app.service(domain))
        {
            service.stack_name().to_string()
        } else if let Some(name) = app
            .stack_names()
            .into_iter()
            .find(|n| n.eq_ignore_ascii_case(request))
        {
            name
        } else {
            return Err(Error::new(
                &format!("Unknown stack `{request}`"),
                Some(&format!(
                    "Available stacks: {}",
                    app.stack_names().join(", ")
                )),
            ));
        };

        names.push(name);
    }

    Ok(templates
        .into_iter()
        .filter(|t| names.iter().any(|n| n == t.stack_name()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_stacks::Settings;

    fn names(templates: &[Template]) -> Vec<&str> {
        templates.iter().map(|t| t.stack_name()).collect()
    }

    #[test]
    fn nothing_requested_selects_everything() {
        let app = App::new(Settings::default()).unwrap();
        assert_eq!(select(&app, &[]).unwrap().len(), 5);
    }

    #[test]
    fn selection_keeps_deployment_order() {
        let app = App::new(Settings::default()).unwrap();
        let requested = ["inventory", "storage", "OrderStack"].map(String::from);

        assert_eq!(
            names(&select(&app, &requested).unwrap()),
            vec!["DatabaseStack", "OrderStack", "InventoryStack"]
        );
    }

    #[test]
    fn unknown_stack_is_an_error() {
        let app = App::new(Settings::default()).unwrap();
        assert!(select(&app, &["payments".to_string()]).is_err());
    }
}
