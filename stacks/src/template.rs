use crate::error::DeclarationError;
use serde_json::{json, Map, Value};

/// A single entry of the template's `Resources` section
#[derive(Clone, Debug, PartialEq)]
pub struct CfnResource {
    pub logical_id: String,
    pub resource: Value,
}

/// CFN template of a single stack
#[derive(Clone, Debug)]
pub struct Template {
    stack_name: String,
    description: String,
    resources: Map<String, Value>,
    outputs: Map<String, Value>,
}

impl Template {
    pub fn new(stack_name: &str, description: &str) -> Self {
        Template {
            stack_name: stack_name.to_string(),
            description: description.to_string(),
            resources: Map::new(),
            outputs: Map::new(),
        }
    }

    /// Add a resource to the CFN template
    ///
    /// Logical ids are unique within a stack, so declaring one twice is an error
    /// rather than a silent overwrite.
    pub fn add_resource(
        &mut self,
        CfnResource {
            logical_id,
            resource,
        }: CfnResource,
    ) -> Result<(), DeclarationError> {
        if self.resources.contains_key(&logical_id) {
            return Err(DeclarationError::DuplicateResource {
                stack: self.stack_name.clone(),
                logical_id,
            });
        }

        log::debug!("Declared {logical_id} in {}", self.stack_name);
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    pub fn add_resources(
        &mut self,
        resources: impl IntoIterator<Item = CfnResource>,
    ) -> Result<(), DeclarationError> {
        for resource in resources {
            self.add_resource(resource)?;
        }

        Ok(())
    }

    /// Add a stack output, exported for other stacks when `export` is set
    pub fn add_output(
        &mut self,
        name: &str,
        value: Value,
        export: Option<&str>,
    ) -> Result<(), DeclarationError> {
        if self.outputs.contains_key(name) {
            return Err(DeclarationError::DuplicateOutput {
                stack: self.stack_name.clone(),
                name: name.to_string(),
            });
        }

        let mut output = json!({ "Value": value });

        if let Some(export) = export {
            output["Export"] = json!({ "Name": export });
        }

        self.outputs.insert(name.to_string(), output);
        Ok(())
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// All resources of a CFN type, e.g. `AWS::Lambda::Function`
    pub fn resources_of_type<'a>(
        &'a self,
        kind: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, resource)| resource["Type"] == kind)
    }

    pub fn to_value(&self) -> Value {
        let mut template = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": self.description,
            "Resources": self.resources,
        });

        if !self.outputs.is_empty() {
            template["Outputs"] = Value::Object(self.outputs.clone());
        }

        template
    }

    /// Template body as submitted to CloudFormation
    pub fn body(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_value())
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(name: &str) -> CfnResource {
        CfnResource {
            logical_id: name.into(),
            resource: json!({"Type": "AWS::SQS::Queue"}),
        }
    }

    #[test]
    fn rejects_duplicate_logical_id() {
        let mut template = Template::new("Stack", "Test");
        template.add_resource(queue("Queue")).unwrap();

        assert_eq!(
            template.add_resource(queue("Queue")),
            Err(DeclarationError::DuplicateResource {
                stack: "Stack".into(),
                logical_id: "Queue".into()
            })
        );
    }

    #[test]
    fn outputs_are_exported_on_demand() {
        let mut template = Template::new("Stack", "Test");
        template.add_resource(queue("Queue")).unwrap();
        template
            .add_output("QueueArn", json!({"Fn::GetAtt": ["Queue", "Arn"]}), Some("Stack:QueueArn"))
            .unwrap();
        template.add_output("QueueName", json!("name"), None).unwrap();

        let value = template.to_value();
        assert_eq!(value["Outputs"]["QueueArn"]["Export"]["Name"], "Stack:QueueArn");
        assert!(value["Outputs"]["QueueName"].get("Export").is_none());
        assert_eq!(value["Resources"]["Queue"]["Type"], "AWS::SQS::Queue");
    }

    #[test]
    fn no_outputs_section_when_empty() {
        let template = Template::new("Stack", "Test");
        assert!(template.to_value().get("Outputs").is_none());
    }
}
