//! Service descriptors of the storefront's domains

use crate::api::Method;
use crate::service::{Operation, ServiceDescriptor};
use crate::table::Domain;
use storefront_common::schema::JsonSchema;

fn crud(domain: Domain, api_id: &str) -> ServiceDescriptor {
    ServiceDescriptor {
        domain,
        stack_id: format!("{domain}Stack"),
        api_id: api_id.to_string(),
        api_name: format!("{domain} Service"),
        operations: Operation::ALL.to_vec(),
        update_method: Method::Patch,
        create_model: None,
        update_model: None,
    }
}

/// Partial update: no field is required, but the body can't be empty
fn update_model(create_model: &JsonSchema) -> JsonSchema {
    JsonSchema {
        required: vec![],
        ..create_model.clone()
    }
    .min_properties(1)
}

pub fn product() -> ServiceDescriptor {
    let model = JsonSchema::object()
        .description("A product of the catalogue")
        .property("name", JsonSchema::string())
        .property("description", JsonSchema::string())
        .required(&["name", "description"]);

    ServiceDescriptor {
        update_model: Some(update_model(&model)),
        create_model: Some(model),
        ..crud(Domain::Product, "productApi")
    }
}

pub fn order() -> ServiceDescriptor {
    let model = JsonSchema::object()
        .description("An order of one or more products")
        .property("userId", JsonSchema::string())
        .property("productIds", JsonSchema::array(JsonSchema::string()))
        .property("price", JsonSchema::number())
        .required(&["userId", "productIds", "price"]);

    ServiceDescriptor {
        update_model: Some(update_model(&model)),
        create_model: Some(model),
        ..crud(Domain::Order, "orderApi")
    }
}

pub fn review() -> ServiceDescriptor {
    let model = JsonSchema::object()
        .description("A user's review of a product")
        .property("userId", JsonSchema::string())
        .property("productId", JsonSchema::string())
        .property("rating", JsonSchema::integer().maximum(10))
        .property("review", JsonSchema::string())
        .required(&["userId", "productId", "rating"]);

    ServiceDescriptor {
        update_model: Some(update_model(&model)),
        create_model: Some(model),
        ..crud(Domain::Review, "reviewApi")
    }
}

/// Stock of a product, only read and adjusted
///
/// The adjustment's amount is carried by the `description` field.
pub fn inventory() -> ServiceDescriptor {
    ServiceDescriptor {
        operations: vec![Operation::GetOne, Operation::Update],
        update_method: Method::Put,
        update_model: Some(
            JsonSchema::object()
                .description("Adjustment of a product's stock")
                .property(
                    "action",
                    JsonSchema::string().enumeration(&["add", "remove"]),
                )
                .property("description", JsonSchema::integer())
                .required(&["action", "description"]),
        ),
        ..crud(Domain::Inventory, "inventoryApi")
    }
}

/// Descriptors of all domains, ordered like [Domain::ALL]
pub fn all() -> Vec<ServiceDescriptor> {
    vec![product(), order(), review(), inventory()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptors_follow_domain_order() {
        let domains = all().into_iter().map(|d| d.domain).collect::<Vec<_>>();
        assert_eq!(domains, Domain::ALL.to_vec());
    }

    #[test]
    fn update_models_require_nothing_but_a_field() {
        let model = review().update_model.unwrap();

        assert!(model.required.is_empty());
        assert!(model.validate(&json!({"rating": 3})).is_ok());
        assert!(model.validate(&json!({})).is_err());
        assert!(model.validate(&json!({"rating": 11})).is_err());
    }

    #[test]
    fn order_lists_product_ids() {
        let model = order().create_model.unwrap();

        assert!(model
            .validate(&json!({"userId": "u1", "productIds": ["p1", "p2"], "price": 9.5}))
            .is_ok());
        assert!(model
            .validate(&json!({"userId": "u1", "productIds": ["p1", 2], "price": 9.5}))
            .is_err());
    }

    #[test]
    fn inventory_adjustments_are_add_or_remove() {
        let model = inventory().update_model.unwrap();

        assert!(model
            .validate(&json!({"action": "add", "description": 5}))
            .is_ok());
        assert!(model
            .validate(&json!({"action": "restock", "description": 5}))
            .is_err());
        assert!(model.validate(&json!({"action": "remove"})).is_err());
    }
}
