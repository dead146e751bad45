use crate::error::DeclarationError;
use crate::settings::Settings;
use crate::stack::prefixed;
use crate::table::{Domain, Table};
use crate::template::Template;
use serde_json::json;
use storefront_common::environment::Environment;

/// The storage definition, one table per domain
///
/// Must be provisioned before any service stack, as those import the tables' attributes.
#[derive(Clone, Debug)]
pub struct Storage {
    stack_name: String,

    /// Indexed by `Domain as usize`
    tables: [Table; 4],
}

impl Storage {
    pub const STACK_ID: &'static str = "DatabaseStack";

    pub fn new(settings: &Settings) -> Self {
        let stack_name = prefixed(settings, Self::STACK_ID);

        Storage {
            tables: Domain::ALL.map(|domain| Table::new(domain, settings)),
            stack_name,
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn table(&self, domain: Domain) -> &Table {
        &self.tables[domain as usize]
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// `{TABLE_NAME, PRIMARY_KEY}` for handlers working with the domain's table
    pub fn environment_for(&self, domain: Domain) -> Environment {
        self.table(domain).environment()
    }

    /// CFN template with all tables, exporting their ARNs and names
    pub fn template(&self) -> Result<Template, DeclarationError> {
        let mut template = Template::new(&self.stack_name, "Key-value tables of the storefront");

        for table in self.tables.iter() {
            let id = table.logical_id();
            template.add_resource(table.resource())?;

            template.add_output(
                &format!("{id}Arn"),
                json!({ "Fn::GetAtt": [id, "Arn"] }),
                Some(&table.arn_export()),
            )?;

            template.add_output(
                &format!("{id}Name"),
                json!({ "Ref": id }),
                Some(&table.name_export()),
            )?;
        }

        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_exactly_four_tables() {
        let storage = Storage::new(&Settings::default());
        let template = storage.template().unwrap();

        let mut tables = template
            .resources_of_type("AWS::DynamoDB::Table")
            .map(|(_, t)| t["Properties"]["TableName"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();

        tables.sort();

        assert_eq!(tables, vec!["inventory", "orders", "products", "reviews"]);
    }

    #[test]
    fn tables_are_destroyed_on_teardown() {
        let storage = Storage::new(&Settings::default());
        let template = storage.template().unwrap();

        for (_, resource) in template.resources_of_type("AWS::DynamoDB::Table") {
            assert_eq!(resource["DeletionPolicy"], "Delete");
            assert_eq!(resource["UpdateReplacePolicy"], "Delete");
            assert_eq!(resource["Properties"]["BillingMode"], "PAY_PER_REQUEST");
        }
    }

    #[test]
    fn environment_for_each_domain() {
        let storage = Storage::new(&Settings::default());

        for (domain, name, key) in [
            (Domain::Product, "products", "id"),
            (Domain::Order, "orders", "id"),
            (Domain::Review, "reviews", "id"),
            (Domain::Inventory, "inventory", "productId"),
        ] {
            let environment = storage.environment_for(domain);
            assert_eq!(environment["TABLE_NAME"], name);
            assert_eq!(environment["PRIMARY_KEY"], key);
            assert_eq!(storage.table(domain).domain, domain);
        }
    }

    #[test]
    fn table_attributes_are_exported() {
        let settings = Settings {
            prefix: Some("shop".into()),
            ..Default::default()
        };

        let storage = Storage::new(&settings);
        let template = storage.template().unwrap();

        assert_eq!(storage.stack_name(), "shop-DatabaseStack");
        assert_eq!(storage.table(Domain::Review).name, "shop-reviews");
        assert_eq!(
            template.output("ReviewsTableArn").unwrap()["Export"]["Name"],
            "shop-DatabaseStack:ReviewsTableArn"
        );
        assert_eq!(
            template.output("ReviewsTableName").unwrap()["Value"],
            json!({"Ref": "ReviewsTable"})
        );
        assert_eq!(
            template.resource("ReviewsTable").unwrap()["Properties"]["TableName"],
            "shop-reviews"
        );
    }
}
