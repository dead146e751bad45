use std::collections::BTreeMap;

/// Environment variables of a handler, ordered so that synthesized templates are stable
pub type Environment = BTreeMap<String, String>;

/// Name of the table a handler reads and writes
pub const TABLE_NAME: &str = "TABLE_NAME";

/// Name of the table's partition key attribute
pub const PRIMARY_KEY: &str = "PRIMARY_KEY";

/// Bindings a handler needs to address a key-value table
pub fn table_environment(table_name: &str, primary_key: &str) -> Environment {
    Environment::from([
        (TABLE_NAME.to_string(), table_name.to_string()),
        (PRIMARY_KEY.to_string(), primary_key.to_string()),
    ])
}
