//! Assemblies following the aggregate/event/projection conventions.

use crate::assembly::{AssemblyBuilder, AttributeUsage, TypeDefinition};

pub const ROOT_BINARY: &str = "Dolittle.SDK.Aggregates.dll";
pub const AGGREGATE_ROOT: &str = "Dolittle.SDK.Aggregates.AggregateRoot";
pub const AGGREGATE_ROOT_ATTRIBUTE: &str = "Dolittle.SDK.Aggregates.AggregateRootAttribute";
pub const EVENT_TYPE_ATTRIBUTE: &str = "Dolittle.SDK.Events.EventTypeAttribute";
pub const PROJECTION_ATTRIBUTE: &str = "Dolittle.SDK.Projections.ProjectionAttribute";

pub const PRODUCT_ID: &str = "9c5b4e1a-7d2f-4c3b-8a6e-1f0d2c3b4a59";
pub const PRODUCT_CREATED_ID: &str = "e6d1f0a2-3b4c-4d5e-9f60-718293a4b5c6";
pub const PRODUCT_RENAMED_ID: &str = "1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d";
pub const PRODUCT_VIEW_ID: &str = "7f6e5d4c-3b2a-4190-8f7e-6d5c4b3a2910";

/// The SDK binary: the aggregate root base type plus the three marker types
pub fn root_assembly() -> AssemblyBuilder {
    AssemblyBuilder::new("Dolittle.SDK.Aggregates")
        .with_type(TypeDefinition::class("Dolittle.SDK.Aggregates", "AggregateRoot"))
        .with_type(
            TypeDefinition::class("Dolittle.SDK.Aggregates", "AggregateRootAttribute")
                .extends("System.Attribute"),
        )
}

/// Class deriving from the aggregate root, marked with `id`
pub fn aggregate(namespace: &str, name: &str, id: &str) -> TypeDefinition {
    TypeDefinition::class(namespace, name)
        .extends(AGGREGATE_ROOT)
        .marked(AttributeUsage::new(AGGREGATE_ROOT_ATTRIBUTE).string(id).null_string())
}

/// Event marker with the SDK's (id, generation, alias) constructor
pub fn event(namespace: &str, name: &str, id: &str) -> TypeDefinition {
    TypeDefinition::class(namespace, name)
        .marked(AttributeUsage::new(EVENT_TYPE_ATTRIBUTE).string(id).u32(0).null_string())
}

pub fn projection(namespace: &str, name: &str, id: &str) -> TypeDefinition {
    TypeDefinition::class(namespace, name)
        .marked(AttributeUsage::new(PROJECTION_ATTRIBUTE).string(id).null_string())
}

/// `Product` aggregate with `ProductCreated` and `ProductRenamed` events and a `ProductView`
/// projection
pub fn product_assembly() -> AssemblyBuilder {
    AssemblyBuilder::new("Acme.Domain")
        .reference("Dolittle.SDK.Aggregates")
        .with_type(aggregate("Acme.Domain.Products", "Product", PRODUCT_ID))
        .with_type(event("Acme.Domain.Products", "ProductCreated", PRODUCT_CREATED_ID))
        .with_type(event("Acme.Domain.Products", "ProductRenamed", PRODUCT_RENAMED_ID))
        .with_type(projection("Acme.Read.Products", "ProductView", PRODUCT_VIEW_ID))
        .with_type(TypeDefinition::class("Acme.Domain.Products", "ProductPolicy"))
}
