use crate::api::{Method, MethodOptions, Model, Rejection, RequestValidator, RestApi, ROOT};
use crate::error::DeclarationError;
use crate::grant::Grants;
use crate::handler::Handler;
use crate::settings::Settings;
use crate::stack::prefixed;
use crate::table::{Domain, Table};
use crate::template::Template;
use serde_json::Value;
use std::collections::BTreeMap;
use storefront_common::schema::JsonSchema;
use storefront_common::template::sanitize::export_name;

/// Path of a single item within a service's API
pub const ITEM: &str = "/{id}";

/// CRUD operations a table-backed service can expose, one handler each
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    GetOne,
    GetMany,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::GetOne,
        Operation::GetMany,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    /// Handler id within the service stack, e.g. `GetProductItemsFunction`
    pub fn handler_id(&self, domain: Domain) -> String {
        match self {
            Operation::GetOne => format!("Get{domain}ItemFunction"),
            Operation::GetMany => format!("Get{domain}ItemsFunction"),
            Operation::Create => format!("Create{domain}ItemFunction"),
            Operation::Update => format!("Update{domain}ItemFunction"),
            Operation::Delete => format!("Delete{domain}ItemFunction"),
        }
    }

    /// Entry point of the handler within the code bundle
    pub fn entry_point(&self) -> &'static str {
        match self {
            Operation::GetOne => "getItem.handler",
            Operation::GetMany => "getItems.handler",
            Operation::Create => "createItem.handler",
            Operation::Update => "updateItem.handler",
            Operation::Delete => "deleteItem.handler",
        }
    }

    /// Collection operations are bound to the API root, the rest to the item resource
    pub fn path(&self) -> &'static str {
        match self {
            Operation::GetMany | Operation::Create => ROOT,
            _ => ITEM,
        }
    }

    pub fn method(&self, update_method: Method) -> Method {
        match self {
            Operation::GetOne | Operation::GetMany => Method::Get,
            Operation::Create => Method::Post,
            Operation::Update => update_method,
            Operation::Delete => Method::Delete,
        }
    }
}

/// Everything that differs between table-backed CRUD services
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceDescriptor {
    pub domain: Domain,

    /// Stack name before prefixing, e.g. `ProductStack`
    pub stack_id: String,

    /// Identifier of the REST API within the stack
    pub api_id: String,

    /// Display name of the REST API
    pub api_name: String,

    pub operations: Vec<Operation>,

    /// Verb the update operation is bound to
    pub update_method: Method,

    /// Request body schema of the create route, the route is not validated when absent
    pub create_model: Option<JsonSchema>,

    /// Request body schema of the update route, the route is not validated when absent
    pub update_model: Option<JsonSchema>,
}

impl ServiceDescriptor {
    pub fn create_model_name(&self) -> String {
        format!("{}CreateModel", self.domain)
    }

    pub fn update_model_name(&self) -> String {
        format!("{}UpdateModel", self.domain)
    }

    pub fn validator_name(&self) -> String {
        format!("{}BodyValidator", self.domain.to_string().to_lowercase())
    }
}

/// A request accepted by a service's API, with the handler that will process it
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation<'a> {
    pub handler: &'a Handler,
    pub path_parameters: BTreeMap<String, String>,
    pub body: Option<Value>,
}

/// A table-backed CRUD service: handlers, their grants on the table, and the REST API in front
#[derive(Clone, Debug)]
pub struct ServiceStack {
    pub domain: Domain,
    stack_name: String,
    table: Table,
    handlers: Vec<Handler>,
    grants: Grants,
    api: RestApi,
}

impl ServiceStack {
    /// Declare the service for the table it is backed by
    ///
    /// Every handler gets the table's environment and read/write access to it. Create and
    /// update routes validate request bodies when the descriptor has a model for them.
    pub fn build(
        descriptor: &ServiceDescriptor,
        table: &Table,
        settings: &Settings,
    ) -> Result<Self, DeclarationError> {
        let stack_name = prefixed(settings, &descriptor.stack_id);
        log::debug!("Building {stack_name} on table {}", table.name);

        let handlers = descriptor
            .operations
            .iter()
            .map(|operation| {
                Handler::new(
                    &operation.handler_id(descriptor.domain),
                    operation.entry_point(),
                    settings,
                )
                .with_environment(table.environment())
            })
            .collect::<Vec<_>>();

        let mut grants = Grants::default();

        for handler in handlers.iter() {
            grants.grant_read_write(handler, table);
        }

        let mut api = RestApi::new(&descriptor.api_id, &descriptor.api_name, &settings.stage);

        if descriptor.operations.iter().any(|o| o.path() == ITEM) {
            api.add_resource(ROOT, "{id}")?;
        }

        if descriptor.create_model.is_some() || descriptor.update_model.is_some() {
            api.add_validator(RequestValidator::body(&descriptor.validator_name()))?;
        }

        let mut options = BTreeMap::new();

        for (operation, name, schema) in [
            (
                Operation::Create,
                descriptor.create_model_name(),
                &descriptor.create_model,
            ),
            (
                Operation::Update,
                descriptor.update_model_name(),
                &descriptor.update_model,
            ),
        ] {
            if let Some(schema) = schema {
                api.add_model(Model::json(&name, schema.clone().draft7()))?;
                options.insert(
                    operation,
                    MethodOptions::validated(&descriptor.validator_name(), &name),
                );
            }
        }

        for (operation, handler) in descriptor.operations.iter().zip(handlers.iter()) {
            api.add_method(
                operation.path(),
                operation.method(descriptor.update_method),
                handler,
                options.remove(operation).unwrap_or_default(),
            )?;
        }

        Ok(ServiceStack {
            domain: descriptor.domain,
            stack_name,
            table: table.clone(),
            handlers,
            grants,
            api,
        })
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// The storage stack whose exports this stack imports
    pub fn depends_on(&self) -> &str {
        &self.table.stack_name
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn handler(&self, operation: Operation) -> Option<&Handler> {
        let id = operation.handler_id(self.domain);
        self.handlers.iter().find(|h| h.id == id)
    }

    pub fn grants(&self) -> &Grants {
        &self.grants
    }

    pub fn api(&self) -> &RestApi {
        &self.api
    }

    /// Route a request through the service's API to the handler that would process it
    pub fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<Invocation<'_>, Rejection> {
        let dispatch = self.api.dispatch(method, path, body)?;

        // Routes are only ever bound to the stack's own handlers
        let handler = self
            .handlers
            .iter()
            .find(|h| h.id == dispatch.route.handler)
            .ok_or_else(|| Rejection::NoRoute {
                method,
                path: path.to_string(),
            })?;

        Ok(Invocation {
            handler,
            path_parameters: dispatch.path_parameters,
            body: dispatch.body,
        })
    }

    /// CFN template of the service, importing the table from the storage stack
    pub fn template(&self) -> Result<Template, DeclarationError> {
        let mut template = Template::new(
            &self.stack_name,
            &format!("{} service backed by the {} table", self.domain, self.table.name),
        );

        for handler in self.handlers.iter() {
            template.add_resources(handler.resources(self.grants.for_handler(&handler.id)))?;
        }

        template.add_resources(self.api.resources(&self.handlers)?)?;

        template.add_output(
            "ApiUrl",
            self.api.url(),
            Some(&export_name(&self.stack_name, &[&self.api.id, "url"])),
        )?;

        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor {
            domain: Domain::Product,
            stack_id: "ProductStack".into(),
            api_id: "productApi".into(),
            api_name: "Product Service".into(),
            operations: Operation::ALL.to_vec(),
            update_method: Method::Patch,
            create_model: Some(
                JsonSchema::object()
                    .property("name", JsonSchema::string())
                    .required(&["name"]),
            ),
            update_model: None,
        }
    }

    fn table() -> Table {
        Table::new(Domain::Product, &Settings::default())
    }

    #[test]
    fn one_handler_per_operation_with_table_environment() {
        let service = ServiceStack::build(&descriptor(), &table(), &Settings::default()).unwrap();

        assert_eq!(service.handlers().len(), 5);

        for handler in service.handlers() {
            assert_eq!(handler.environment, table().environment());
        }

        let handler = service.handler(Operation::GetMany).unwrap();
        assert_eq!(handler.id, "GetProductItemsFunction");
        assert_eq!(handler.entry_point, "getItems.handler");
    }

    #[test]
    fn every_handler_gets_read_write_on_its_table() {
        let service = ServiceStack::build(&descriptor(), &table(), &Settings::default()).unwrap();

        assert_eq!(service.grants().len(), service.handlers().len());

        for handler in service.handlers() {
            let grants = service.grants().for_handler(&handler.id).collect::<Vec<_>>();
            assert_eq!(grants.len(), 1);
            assert_eq!(grants[0].table.name, "products");
        }
    }

    #[test]
    fn only_models_present_are_validated() {
        let service = ServiceStack::build(&descriptor(), &table(), &Settings::default()).unwrap();
        let api = service.api();

        assert!(api.route(ROOT, Method::Post).unwrap().is_validated());
        assert!(!api.route(ITEM, Method::Patch).unwrap().is_validated());
        assert!(api.model("ProductCreateModel").is_some());
        assert!(api.model("ProductUpdateModel").is_none());
        assert!(api.validator("productBodyValidator").is_some());
    }

    #[test]
    fn no_item_resource_without_item_operations() {
        let descriptor = ServiceDescriptor {
            operations: vec![Operation::GetMany],
            create_model: None,
            ..descriptor()
        };

        let service = ServiceStack::build(&descriptor, &table(), &Settings::default()).unwrap();
        assert_eq!(service.api().paths(), &[ROOT.to_string()]);
        assert!(service.api().validator("productBodyValidator").is_none());
    }

    #[test]
    fn repeated_operation_is_a_duplicate_route() {
        let descriptor = ServiceDescriptor {
            operations: vec![Operation::GetOne, Operation::GetOne],
            ..descriptor()
        };

        assert!(matches!(
            ServiceStack::build(&descriptor, &table(), &Settings::default()),
            Err(DeclarationError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn dispatch_resolves_handler() {
        let service = ServiceStack::build(&descriptor(), &table(), &Settings::default()).unwrap();

        let invocation = service.dispatch(Method::Delete, "/p1", None).unwrap();
        assert_eq!(invocation.handler.id, "DeleteProductItemFunction");
        assert_eq!(invocation.path_parameters["id"], "p1");

        let invocation = service
            .dispatch(Method::Post, "/", Some(r#"{"name": "Shoe"}"#))
            .unwrap();
        assert_eq!(invocation.handler.id, "CreateProductItemFunction");
        assert_eq!(invocation.body, Some(json!({"name": "Shoe"})));
    }

    #[test]
    fn template_wires_functions_roles_and_api() {
        let settings = Settings {
            prefix: Some("dev".into()),
            ..Default::default()
        };

        let table = Table::new(Domain::Product, &settings);
        let service = ServiceStack::build(&descriptor(), &table, &settings).unwrap();
        let template = service.template().unwrap();

        assert_eq!(template.stack_name(), "dev-ProductStack");
        assert_eq!(service.depends_on(), "dev-DatabaseStack");
        assert_eq!(template.resources_of_type("AWS::Lambda::Function").count(), 5);
        assert_eq!(template.resources_of_type("AWS::IAM::Role").count(), 5);
        assert_eq!(template.resources_of_type("AWS::ApiGateway::Method").count(), 5);
        assert_eq!(template.resources_of_type("AWS::Lambda::Permission").count(), 5);
        assert_eq!(template.resources_of_type("AWS::ApiGateway::Model").count(), 1);

        let role = template
            .resource("CreateProductItemFunctionServiceRole")
            .unwrap();
        assert_eq!(
            role["Properties"]["Policies"][0]["PolicyDocument"]["Statement"][0]["Resource"],
            json!([{"Fn::ImportValue": "dev-DatabaseStack:ProductsTableArn"}])
        );

        let output = template.output("ApiUrl").unwrap();
        assert_eq!(output["Export"]["Name"], "dev-ProductStack:ProductApiUrl");
    }
}
