use crate::handler::Handler;
use crate::table::Table;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    pub const READ_WRITE: [Permission; 2] = [Permission::Read, Permission::Write];

    /// DynamoDB actions the permission expands to
    fn actions(&self) -> &'static [&'static str] {
        match self {
            Permission::Read => &[
                "dynamodb:BatchGetItem",
                "dynamodb:ConditionCheckItem",
                "dynamodb:DescribeTable",
                "dynamodb:GetItem",
                "dynamodb:GetRecords",
                "dynamodb:GetShardIterator",
                "dynamodb:Query",
                "dynamodb:Scan",
            ],
            Permission::Write => &[
                "dynamodb:BatchWriteItem",
                "dynamodb:DeleteItem",
                "dynamodb:DescribeTable",
                "dynamodb:PutItem",
                "dynamodb:UpdateItem",
            ],
        }
    }
}

/// Access of a handler's execution role to a table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub handler: String,
    pub table: Table,
    pub permissions: BTreeSet<Permission>,
}

impl Grant {
    /// Sorted, deduplicated list of actions allowed by the grant
    pub fn actions(&self) -> Vec<&'static str> {
        self.permissions
            .iter()
            .flat_map(|p| p.actions().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Inline policy attached to the handler's role
    pub(crate) fn policy(&self) -> Value {
        json!({
            "PolicyName": format!("{}Access", self.table.logical_id()),
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": self.actions(),
                    "Resource": [self.table.arn_import()]
                }]
            }
        })
    }
}

/// All grants of a stack
///
/// Keyed by (handler, table): granting again only adds permissions, so every pair
/// is represented by exactly one grant.
#[derive(Clone, Debug, Default)]
pub struct Grants {
    grants: BTreeMap<(String, String), Grant>,
}

impl Grants {
    pub fn grant(&mut self, handler: &Handler, table: &Table, permissions: &[Permission]) {
        let grant = self
            .grants
            .entry((handler.id.clone(), table.name.clone()))
            .or_insert_with(|| Grant {
                handler: handler.id.clone(),
                table: table.clone(),
                permissions: BTreeSet::new(),
            });

        grant.permissions.extend(permissions.iter().copied());
    }

    pub fn grant_read_write(&mut self, handler: &Handler, table: &Table) {
        self.grant(handler, table, &Permission::READ_WRITE)
    }

    pub fn for_handler<'a>(&'a self, handler: &'a str) -> impl Iterator<Item = &'a Grant> + 'a {
        self.grants.values().filter(move |g| g.handler == handler)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Grant> {
        self.grants.values()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::table::Domain;

    #[test]
    fn repeated_grants_merge() {
        let handler = Handler::new("GetProductItemFunction", "getItem.handler", &Settings::default());
        let table = Table::new(Domain::Product, &Settings::default());
        let mut grants = Grants::default();

        grants.grant(&handler, &table, &[Permission::Read]);
        grants.grant(&handler, &table, &[Permission::Write]);
        grants.grant_read_write(&handler, &table);

        assert_eq!(grants.len(), 1);

        let grant = grants.for_handler("GetProductItemFunction").next().unwrap();
        assert_eq!(grant.permissions, BTreeSet::from(Permission::READ_WRITE));
    }

    #[test]
    fn read_only_grant_has_no_write_actions() {
        let handler = Handler::new("GetOrderItemFunction", "getItem.handler", &Settings::default());
        let table = Table::new(Domain::Order, &Settings::default());
        let mut grants = Grants::default();
        grants.grant(&handler, &table, &[Permission::Read]);

        let actions = grants.iter().next().unwrap().actions();
        assert!(actions.contains(&"dynamodb:GetItem"));
        assert!(!actions.contains(&"dynamodb:PutItem"));
    }

    #[test]
    fn read_write_actions_are_deduplicated() {
        let handler = Handler::new("UpdateOrderItemFunction", "updateItem.handler", &Settings::default());
        let table = Table::new(Domain::Order, &Settings::default());
        let mut grants = Grants::default();
        grants.grant_read_write(&handler, &table);

        let grant = grants.iter().next().unwrap();
        let describe = grant
            .actions()
            .into_iter()
            .filter(|a| *a == "dynamodb:DescribeTable")
            .count();

        assert_eq!(describe, 1);
        assert_eq!(
            grant.policy()["PolicyDocument"]["Statement"][0]["Resource"][0],
            json!({"Fn::ImportValue": "DatabaseStack:OrdersTableArn"})
        );
    }
}
