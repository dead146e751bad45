use regex::Regex;
use std::sync::OnceLock;

fn separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("static regex"))
}

/// Turn a list of name parts into a CloudFormation logical id
///
/// Logical ids only allow ASCII alphanumerics, so every other character is dropped
/// and the letter following it is uppercased, e.g. `["{id}", "get-item"]` becomes `IdGetItem`.
pub fn logical_id(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| separators().split(part))
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();

            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Name of a cross-stack export, unique within an account and region
pub fn export_name(stack_name: &str, parts: &[&str]) -> String {
    format!("{stack_name}:{}", logical_id(parts))
}

/// Make a string usable as (a part of) a CloudFormation stack name
///
/// Stack names allow alphanumerics and hyphens only.
pub fn stack_name_part(name: &str) -> String {
    separators()
        .split(name)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
