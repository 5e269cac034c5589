use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use elog_types::TypeCatalog;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::classifier::{Ancestry, Classification, MarkerNames, TypeClassifier};
use crate::error::{Error, Result};
use crate::filter::BinaryFilter;
use crate::loader::{TypeDescriptor, load_binary};

pub const DEFAULT_EXTENSION: &str = "dll";
pub const DEFAULT_ROOT_BINARY: &str = "Dolittle.SDK.Aggregates.dll";
pub const DEFAULT_ROOT_TYPE: &str = "AggregateRoot";

/// File name prefixes of framework and third-party binaries that never hold domain types
pub const DEFAULT_SKIP_PREFIXES: &[&str] = &[
    "Microsoft.",
    "DnsClient.",
    "Serilog.",
    "Newtonsoft.",
    "SwashBuckle.",
    "System.",
    "HotChocolate.",
    "GraphQL.",
    "Grpc.",
    "Dolittle.",
    "Google.",
    "AutoFac.",
    "MongoDB.",
    "Polly.",
    "AutofacSerilogIntegration.",
    "SharpCompress.",
    "libwkhtmltox.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub binaries_path: PathBuf,
    /// Extension of candidate binaries, without the dot
    pub extension: String,
    /// File name of the binary defining the aggregate root base type
    pub root_binary: String,
    /// Simple name of the aggregate root base type
    pub root_type: String,
    pub markers: MarkerNames,
    pub skip_prefixes: Vec<String>,
}

impl DiscoveryOptions {
    pub fn new(binaries_path: impl Into<PathBuf>) -> Self {
        Self {
            binaries_path: binaries_path.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            root_binary: DEFAULT_ROOT_BINARY.to_string(),
            root_type: DEFAULT_ROOT_TYPE.to_string(),
            markers: MarkerNames::default(),
            skip_prefixes: DEFAULT_SKIP_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Scans one binaries folder and builds a fresh [`TypeCatalog`]
pub struct TypeCatalogBuilder {
    options: DiscoveryOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl TypeCatalogBuilder {
    pub fn new(options: DiscoveryOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Stop between binaries once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Candidate binaries in file-name order, blocklist applied
    pub fn candidate_binaries(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.options.binaries_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            let matches_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.options.extension));
            if entry.file_type().is_file() && matches_extension {
                paths.push(path.to_path_buf());
            }
        }
        Ok(BinaryFilter::new(&self.options.skip_prefixes).apply(paths))
    }

    /// Run discovery. `aggregate` names the aggregate to select, compared ignoring case.
    pub fn build(&self, aggregate: Option<&str>) -> Result<TypeCatalog> {
        let (root_name, root_types) = self.find_root_type()?;
        let classifier = TypeClassifier::new(root_name, self.options.markers.clone());

        let mut ancestry = Ancestry::new();
        for ty in &root_types {
            ancestry.insert(ty);
        }

        let mut loaded: Vec<(PathBuf, Vec<TypeDescriptor>)> = Vec::new();
        for path in self.candidate_binaries()? {
            self.check_cancelled()?;
            match load_types(&path) {
                Ok(types) => {
                    debug!(binary = %path.display(), types = types.len(), "Loaded binary");
                    for ty in &types {
                        ancestry.insert(ty);
                    }
                    loaded.push((path, types));
                }
                Err(err) => warn!(binary = %path.display(), "Skipping binary: {}", err),
            }
        }

        let mut catalog = TypeCatalog::new();
        for (_, types) in &loaded {
            self.check_cancelled()?;
            for ty in types {
                match classifier.classify(ty, &ancestry) {
                    Some(Classification::Aggregate(found)) => catalog.aggregates.push(found),
                    Some(Classification::Event(found)) => catalog.events.push(found),
                    None => {}
                }
            }
        }

        if let Some(name) = aggregate {
            catalog.select_aggregate(name);
        }

        info!(
            binaries = loaded.len(),
            aggregates = catalog.aggregates.len(),
            events = catalog.events.len(),
            selected = catalog.selected_aggregate.as_ref().map(|a| a.name.as_str()),
            "Type discovery finished"
        );
        Ok(catalog)
    }

    /// Load the root binary and return the qualified root type name with every type it defines
    fn find_root_type(&self) -> Result<(String, Vec<TypeDescriptor>)> {
        let binary = self.options.binaries_path.join(&self.options.root_binary);
        let not_found = || Error::RootTypeNotFound {
            binary: binary.clone(),
            type_name: self.options.root_type.clone(),
        };

        let types = load_types(&binary).map_err(|err| {
            warn!(binary = %binary.display(), "Unable to load root binary: {}", err);
            not_found()
        })?;
        let root = types
            .iter()
            .find(|t| t.name == self.options.root_type)
            .map(|t| t.full_name.clone())
            .ok_or_else(not_found)?;
        debug!(root = %root, "Found aggregate root type");
        Ok((root, types))
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Load every type of one binary. Any failure discards the whole binary.
fn load_types(path: &Path) -> std::result::Result<Vec<TypeDescriptor>, crate::error::LoadError> {
    let binary = load_binary(path)?;
    binary.types().collect()
}
