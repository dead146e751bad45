use crate::settings::Settings;
use storefront_common::template::sanitize::stack_name_part;

/// Namespace a stack or physical resource name by the deployment prefix
///
/// Used for names which must be unique per account and region: stacks, tables and Lambda functions.
pub fn prefixed(settings: &Settings, name: &str) -> String {
    match settings
        .prefix
        .as_deref()
        .map(stack_name_part)
        .filter(|p| !p.is_empty())
    {
        Some(prefix) => format!("{prefix}-{name}"),
        None => name.to_string(),
    }
}
