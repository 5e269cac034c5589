use std::collections::HashMap;

use elog_types::{AggregateType, EventType};
use tracing::debug;

use crate::error::MarkerError;
use crate::loader::{Marker, TypeDescriptor};

const MAX_ANCESTRY_DEPTH: usize = 64;

/// Simple names of the three structural markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerNames {
    pub aggregate_root: String,
    pub event: String,
    pub projection: String,
}

impl Default for MarkerNames {
    fn default() -> Self {
        Self {
            aggregate_root: "AggregateRootAttribute".to_string(),
            event: "EventTypeAttribute".to_string(),
            projection: "ProjectionAttribute".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Aggregate(AggregateType),
    Event(EventType),
}

/// Qualified type name to direct base name, across every binary in one discovery pass
#[derive(Debug, Default)]
pub struct Ancestry {
    bases: HashMap<String, Option<String>>,
}

impl Ancestry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a type. The first definition of a name wins.
    pub fn insert(&mut self, ty: &TypeDescriptor) {
        self.bases
            .entry(ty.full_name.clone())
            .or_insert_with(|| ty.base.clone());
    }

    /// Whether walking the base chain from `ty` reaches `root`.
    ///
    /// The type itself does not count. Unknown bases and cycles end the walk.
    pub fn derives_from(&self, ty: &TypeDescriptor, root: &str) -> bool {
        let mut current = ty.base.as_deref();
        for _ in 0..MAX_ANCESTRY_DEPTH {
            match current {
                Some(name) if name == root => return true,
                Some(name) => current = self.bases.get(name).and_then(|b| b.as_deref()),
                None => return false,
            }
        }
        false
    }
}

/// Decides which category, if any, a type belongs to
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    root_type: String,
    markers: MarkerNames,
}

impl TypeClassifier {
    /// `root_type` is the qualified name of the aggregate root base type
    pub fn new(root_type: impl Into<String>, markers: MarkerNames) -> Self {
        Self {
            root_type: root_type.into(),
            markers,
        }
    }

    /// Classify one type. A class that reaches the root type is only tested as an aggregate.
    pub fn classify(&self, ty: &TypeDescriptor, ancestry: &Ancestry) -> Option<Classification> {
        if !ty.is_class {
            return None;
        }

        if ancestry.derives_from(ty, &self.root_type) {
            let marker = ty.marker(&self.markers.aggregate_root)?;
            return match marker.leading_uuid() {
                Ok(id) => Some(Classification::Aggregate(AggregateType::new(id, &ty.name))),
                Err(err) => {
                    reject(ty, marker, &err);
                    None
                }
            };
        }

        if let Some(marker) = ty.marker(&self.markers.event) {
            match marker.leading_identifier() {
                Ok(id) => return Some(Classification::Event(EventType::event(id, &ty.name))),
                Err(err) => reject(ty, marker, &err),
            }
        }

        if let Some(marker) = ty.marker(&self.markers.projection) {
            match marker.leading_identifier() {
                Ok(id) => {
                    return Some(Classification::Event(EventType::projection(id, &ty.name)));
                }
                Err(err) => reject(ty, marker, &err),
            }
        }

        None
    }
}

fn reject(ty: &TypeDescriptor, marker: &Marker, err: &MarkerError) {
    debug!(
        type_name = %ty.full_name,
        marker = %marker.type_name,
        "Marker not usable: {}",
        err
    );
}
