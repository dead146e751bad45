use crate::settings::Settings;
use crate::stack::prefixed;
use crate::storage::Storage;
use crate::template::CfnResource;
use serde_json::{json, Value};
use std::fmt::Display;
use std::str::FromStr;
use storefront_common::environment::{table_environment, Environment};
use storefront_common::template::sanitize::{export_name, logical_id};

/// Business entities, each backed by its own table
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    Product,
    Order,
    Review,
    Inventory,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Product,
        Domain::Order,
        Domain::Review,
        Domain::Inventory,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Domain::Product => "products",
            Domain::Order => "orders",
            Domain::Review => "reviews",
            Domain::Inventory => "inventory",
        }
    }

    /// The partition key attribute
    ///
    /// Inventory items reference a product, so they are keyed by the product id.
    pub fn primary_key(&self) -> &'static str {
        match self {
            Domain::Inventory => "productId",
            _ => "id",
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            Domain::Product => "Product",
            Domain::Order => "Order",
            Domain::Review => "Review",
            Domain::Inventory => "Inventory",
        };

        write!(f, "{}", str)
    }
}

impl FromStr for Domain {
    type Err = String;

    /// Accepts both the entity and the table name, case insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowercase = s.to_lowercase();

        Domain::ALL
            .into_iter()
            .find(|d| d.to_string().to_lowercase() == lowercase || d.table_name() == lowercase)
            .ok_or_else(|| format!("Unknown domain `{s}`, expected one of: product, order, review, inventory"))
    }
}

/// A key-value table, the handle service stacks receive from the storage stack
///
/// Billed on demand, and dropped together with its items when the stack is torn down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub domain: Domain,

    /// Physical name, namespaced by the deployment prefix like the stacks
    pub name: String,

    /// String attribute the items are keyed by
    pub partition_key: String,

    /// Stack the table is declared in, used to import its attributes elsewhere
    pub(crate) stack_name: String,
}

impl Table {
    pub fn new(domain: Domain, settings: &Settings) -> Self {
        Table {
            domain,
            name: prefixed(settings, domain.table_name()),
            partition_key: domain.primary_key().to_string(),
            stack_name: prefixed(settings, Storage::STACK_ID),
        }
    }

    /// Environment bindings for any handler accessing the table
    pub fn environment(&self) -> Environment {
        table_environment(&self.name, &self.partition_key)
    }

    /// Same in every deployment, the prefix only goes into physical names
    pub fn logical_id(&self) -> String {
        logical_id(&[self.domain.table_name(), "table"])
    }

    pub fn arn_export(&self) -> String {
        export_name(&self.stack_name, &[self.domain.table_name(), "table", "arn"])
    }

    pub fn name_export(&self) -> String {
        export_name(&self.stack_name, &[self.domain.table_name(), "table", "name"])
    }

    /// Reference to the table's ARN usable from another stack
    pub fn arn_import(&self) -> Value {
        json!({ "Fn::ImportValue": self.arn_export() })
    }

    /// CFN template for the table itself
    pub(crate) fn resource(&self) -> CfnResource {
        CfnResource {
            logical_id: self.logical_id(),
            resource: json!({
                "Type": "AWS::DynamoDB::Table",
                "Properties": {
                    "TableName": self.name,
                    "AttributeDefinitions": [{
                        "AttributeName": self.partition_key,
                        "AttributeType": "S"
                    }],
                    "KeySchema": [{
                        "AttributeName": self.partition_key,
                        "KeyType": "HASH"
                    }],
                    "BillingMode": "PAY_PER_REQUEST"
                },
                "DeletionPolicy": "Delete",
                "UpdateReplacePolicy": "Delete"
            }),
        }
    }
}
