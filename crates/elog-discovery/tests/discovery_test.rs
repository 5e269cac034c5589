//! Folder-level discovery over synthetic assemblies.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use elog_discovery::{DiscoveryOptions, Error, TypeCatalogBuilder};
use elog_testing::fixtures::{self, AGGREGATE_ROOT, PRODUCT_CREATED_ID, PRODUCT_ID};
use elog_testing::{AssemblyBuilder, AttributeUsage, BinariesFolder, CtorParam, TypeDefinition};
use elog_types::{EventKind, EventType};
use uuid::Uuid;

fn builder(folder: &BinariesFolder) -> TypeCatalogBuilder {
    TypeCatalogBuilder::new(DiscoveryOptions::new(folder.path()))
}

fn event_names(events: &[EventType]) -> Vec<&str> {
    events.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn discovers_product_aggregate_and_its_events() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly("Acme.Domain.dll", fixtures::product_assembly());

    let catalog = builder(&folder).build(Some("product")).unwrap();

    let selected = catalog.selected_aggregate.clone().unwrap();
    assert_eq!(selected.name, "Product");
    assert_eq!(selected.id, Uuid::parse_str(PRODUCT_ID).unwrap());
    assert_eq!(catalog.aggregates, vec![selected]);
    assert_eq!(
        event_names(&catalog.events),
        vec!["ProductCreated", "ProductRenamed", "ProductView"]
    );
    assert_eq!(catalog.events[0].id, PRODUCT_CREATED_ID);
    assert_eq!(catalog.events[0].kind, EventKind::Event);
    assert_eq!(catalog.events[2].kind, EventKind::Projection);
}

#[test]
fn unmatched_aggregate_name_leaves_selection_empty() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly("Acme.Domain.dll", fixtures::product_assembly());

    let catalog = builder(&folder).build(Some("Invoice")).unwrap();

    assert!(catalog.selected_aggregate.is_none());
    assert_eq!(catalog.aggregates.len(), 1);
    assert_eq!(catalog.events.len(), 3);
}

#[test]
fn missing_root_binary_is_fatal() {
    let folder = BinariesFolder::new().with_assembly("Acme.Domain.dll", fixtures::product_assembly());

    let err = builder(&folder).build(None).unwrap_err();

    match err {
        Error::RootTypeNotFound { binary, type_name } => {
            assert!(binary.ends_with(fixtures::ROOT_BINARY));
            assert_eq!(type_name, "AggregateRoot");
        }
        other => panic!("expected RootTypeNotFound, got {:?}", other),
    }
}

#[test]
fn root_binary_without_root_type_is_fatal() {
    let folder = BinariesFolder::new()
        .with_assembly(
            fixtures::ROOT_BINARY,
            AssemblyBuilder::new("Dolittle.SDK.Aggregates")
                .with_type(TypeDefinition::class("Dolittle.SDK.Aggregates", "Something")),
        )
        .with_assembly("Acme.Domain.dll", fixtures::product_assembly());

    let err = builder(&folder).build(None).unwrap_err();

    assert!(matches!(err, Error::RootTypeNotFound { .. }));
}

#[test]
fn corrupt_root_binary_is_reported_as_missing_root_type() {
    let folder = BinariesFolder::new().with_raw_file(fixtures::ROOT_BINARY, b"MZ not really");

    let err = builder(&folder).build(None).unwrap_err();

    insta::assert_snapshot!(
        err.to_string().replace(&folder.path().display().to_string(), "<bin>"),
        @"Root type 'AggregateRoot' not found in <bin>/Dolittle.SDK.Aggregates.dll"
    );
}

#[test]
fn broken_binaries_are_skipped() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_raw_file("Acme.Broken.dll", b"\x00\x01garbage")
        .with_raw_file("Acme.Native.dll", b"MZ\x00\x00")
        .with_assembly("Acme.Domain.dll", fixtures::product_assembly());

    let catalog = builder(&folder).build(None).unwrap();

    assert_eq!(catalog.aggregates.len(), 1);
    assert_eq!(catalog.events.len(), 3);
}

#[test]
fn binary_with_runaway_marker_signature_is_skipped() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly(
            "Acme.Deep.dll",
            AssemblyBuilder::new("Acme.Deep").with_type(
                fixtures::event("Acme.Deep", "Tagged", "d-1").marked(
                    AttributeUsage::new("Acme.Markers.TagsAttribute").null_string_array(200),
                ),
            ),
        )
        .with_assembly("Acme.Domain.dll", fixtures::product_assembly());

    let catalog = builder(&folder).build(None).unwrap();

    assert_eq!(catalog.aggregates.len(), 1);
    assert!(!event_names(&catalog.events).contains(&"Tagged"));
}

#[test]
fn blocklisted_binaries_never_contribute_types() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly(
            "system.Acme.Events.dll",
            AssemblyBuilder::new("System.Acme.Events")
                .with_type(fixtures::event("Acme", "Hidden", "11111111-2222-4333-8444-555555555555")),
        )
        .with_assembly("Acme.Domain.dll", fixtures::product_assembly());

    let catalog = builder(&folder).build(None).unwrap();

    assert!(!event_names(&catalog.events).contains(&"Hidden"));
    assert_eq!(catalog.events.len(), 3);
}

#[test]
fn empty_blocklist_scans_everything() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly(
            "System.Acme.Events.dll",
            AssemblyBuilder::new("System.Acme.Events")
                .with_type(fixtures::event("Acme", "Visible", "11111111-2222-4333-8444-555555555555")),
        );

    let mut options = DiscoveryOptions::new(folder.path());
    options.skip_prefixes.clear();
    let catalog = TypeCatalogBuilder::new(options).build(None).unwrap();

    assert_eq!(event_names(&catalog.events), vec!["Visible"]);
}

#[test]
fn other_extensions_are_ignored() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly("Acme.Domain.exe", fixtures::product_assembly());

    let catalog = builder(&folder).build(None).unwrap();

    assert!(catalog.aggregates.is_empty());
    assert!(catalog.events.is_empty());
}

#[test]
fn discovery_is_repeatable() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly("Acme.Domain.dll", fixtures::product_assembly())
        .with_assembly(
            "Acme.Billing.dll",
            AssemblyBuilder::new("Acme.Billing")
                .with_type(fixtures::aggregate("Acme.Billing", "Invoice", "3f2504e0-4f89-41d3-9a0c-0305e82c3301"))
                .with_type(fixtures::event("Acme.Billing", "InvoiceIssued", "d2b9c1a0-0000-4000-8000-000000000001")),
        );
    let builder = builder(&folder);

    let first = builder.build(Some("Invoice")).unwrap();
    let second = builder.build(Some("Invoice")).unwrap();

    assert_eq!(first, second);
    // Files are visited in name order
    assert_eq!(
        first.aggregates.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
        vec!["Invoice", "Product"]
    );
}

#[test]
fn ancestry_crosses_binaries() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly(
            "Acme.Orders.dll",
            AssemblyBuilder::new("Acme.Orders").with_type(
                TypeDefinition::class("Acme.Orders", "Order")
                    .extends("Acme.Shared.TrackedRoot")
                    .marked(
                        AttributeUsage::new(fixtures::AGGREGATE_ROOT_ATTRIBUTE)
                            .string("0f8fad5b-d9cb-469f-a165-70867728950e"),
                    ),
            ),
        )
        .with_assembly(
            "Acme.Shared.dll",
            AssemblyBuilder::new("Acme.Shared")
                .with_type(TypeDefinition::class("Acme.Shared", "TrackedRoot").extends(AGGREGATE_ROOT)),
        );

    let catalog = builder(&folder).build(Some("order")).unwrap();

    assert_eq!(catalog.selected_aggregate.map(|a| a.name), Some("Order".to_string()));
}

#[test]
fn generic_base_counts_as_root_ancestry() {
    let folder = BinariesFolder::new().with_root_binary().with_assembly(
        "Acme.Generic.dll",
        AssemblyBuilder::new("Acme.Generic").with_type(
            TypeDefinition::class("Acme.Generic", "Basket")
                .extends_generic(AGGREGATE_ROOT)
                .marked(
                    AttributeUsage::new(fixtures::AGGREGATE_ROOT_ATTRIBUTE)
                        .string("5f3c1b2a-9d8e-4f7a-b6c5-d4e3f2a1b0c9"),
                ),
        ),
    );

    let catalog = builder(&folder).build(None).unwrap();

    assert_eq!(catalog.aggregates.len(), 1);
    assert_eq!(catalog.aggregates[0].name, "Basket");
}

#[test]
fn locally_defined_marker_is_recognised() {
    let folder = BinariesFolder::new().with_root_binary().with_assembly(
        "Acme.Local.dll",
        AssemblyBuilder::new("Acme.Local")
            .with_type(
                TypeDefinition::class("Acme.Local", "EventTypeAttribute")
                    .extends("System.Attribute")
                    .with_constructor(vec![CtorParam::String]),
            )
            .with_type(
                TypeDefinition::class("Acme.Local", "Shipped")
                    .marked(AttributeUsage::new("Acme.Local.EventTypeAttribute").string("ship-1")),
            ),
    );

    let catalog = builder(&folder).build(None).unwrap();

    assert_eq!(catalog.events, vec![EventType::event("ship-1", "Shipped")]);
}

#[test]
fn nested_event_types_are_found() {
    let folder = BinariesFolder::new().with_root_binary().with_assembly(
        "Acme.Nested.dll",
        AssemblyBuilder::new("Acme.Nested")
            .with_type(TypeDefinition::class("Acme.Nested", "Events"))
            .with_type(
                fixtures::event("", "Created", "c0ffee00-0000-4000-8000-000000000000")
                    .nested_in("Acme.Nested.Events"),
            ),
    );

    let catalog = builder(&folder).build(None).unwrap();

    assert_eq!(event_names(&catalog.events), vec!["Created"]);
}

#[test]
fn non_classes_and_bad_markers_are_dropped() {
    let folder = BinariesFolder::new().with_root_binary().with_assembly(
        "Acme.Mixed.dll",
        AssemblyBuilder::new("Acme.Mixed")
            .with_type(
                TypeDefinition::interface("Acme.Mixed", "IHappened")
                    .marked(AttributeUsage::new(fixtures::EVENT_TYPE_ATTRIBUTE).string("i-1")),
            )
            .with_type(
                TypeDefinition::value_type("Acme.Mixed", "Tick")
                    .marked(AttributeUsage::new(fixtures::EVENT_TYPE_ATTRIBUTE).string("v-1")),
            )
            .with_type(
                TypeDefinition::class("Acme.Mixed", "Blank")
                    .marked(AttributeUsage::new(fixtures::EVENT_TYPE_ATTRIBUTE).string("  ")),
            )
            .with_type(
                TypeDefinition::class("Acme.Mixed", "Numbered")
                    .marked(AttributeUsage::new(fixtures::EVENT_TYPE_ATTRIBUTE).i32(7)),
            )
            .with_type(
                TypeDefinition::class("Acme.Mixed", "Garbled").marked_raw(
                    AttributeUsage::new(fixtures::EVENT_TYPE_ATTRIBUTE)
                        .string("g-1")
                        .raw_value(&[0x02, 0x00, 0x03]),
                ),
            )
            .with_type(fixtures::event("Acme.Mixed", "Good", "g-2")),
    );

    let catalog = builder(&folder).build(None).unwrap();

    assert_eq!(catalog.events, vec![EventType::event("g-2", "Good")]);
}

#[test]
fn cancelled_discovery_returns_no_catalog() {
    let folder = BinariesFolder::new()
        .with_root_binary()
        .with_assembly("Acme.Domain.dll", fixtures::product_assembly());
    let flag = Arc::new(AtomicBool::new(true));

    let err = builder(&folder).with_cancel_flag(flag).build(None).unwrap_err();

    assert!(matches!(err, Error::Cancelled));
}
