use crate::domains;
use crate::error::DeclarationError;
use crate::service::ServiceStack;
use crate::settings::Settings;
use crate::storage::Storage;
use crate::table::Domain;
use crate::template::Template;

/// All stacks of the storefront
///
/// The storage stack is declared first and its table handles are handed to every service,
/// which is also the order stacks must be deployed in.
#[derive(Clone, Debug)]
pub struct App {
    pub settings: Settings,
    storage: Storage,
    services: Vec<ServiceStack>,
}

impl App {
    pub fn new(settings: Settings) -> Result<Self, DeclarationError> {
        let storage = Storage::new(&settings);

        let services = domains::all()
            .iter()
            .map(|descriptor| {
                ServiceStack::build(descriptor, storage.table(descriptor.domain), &settings)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(App {
            settings,
            storage,
            services,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn services(&self) -> &[ServiceStack] {
        &self.services
    }

    pub fn service(&self, domain: Domain) -> Option<&ServiceStack> {
        self.services.iter().find(|s| s.domain == domain)
    }

    /// Names of all stacks, storage first
    pub fn stack_names(&self) -> Vec<String> {
        std::iter::once(self.storage.stack_name())
            .chain(self.services.iter().map(|s| s.stack_name()))
            .map(String::from)
            .collect()
    }

    /// Templates of all stacks in deployment order
    pub fn templates(&self) -> Result<Vec<Template>, DeclarationError> {
        let mut templates = vec![self.storage.template()?];

        for service in self.services.iter() {
            templates.push(service.template()?);
        }

        Ok(templates)
    }
}
