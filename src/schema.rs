//! Schema model and the ordered source merge.
//!
//! A schema is folded left-to-right from an ordered list of sources. Ordering
//! is part of the contract: the same ordered input always produces the same
//! schema, so callers that parallelize scanning must still collect results and
//! fold them in their fixed positions.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How much property detail a class scan contributes. The variants are ordered
/// by fidelity: a later source never replaces data from an earlier source of
/// equal or higher fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyPolicy {
    /// Type identity only, no properties.
    Excluded,
    /// Property names kept, types erased to `java.lang.Object`. Used for
    /// dependency classes so references from project types still resolve
    /// without leaking a dependency's internal representation.
    NamesOnlyObjectTyped,
    /// Every eligible field becomes a typed property with its annotation
    /// metadata preserved.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyOrigin {
    /// Derived from scanning compiled classes.
    Scanned,
    /// Explicitly declared by an XML override; never replaced by scan data.
    Declared,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub type_name: String,
    pub since: i64,
    pub origin: PropertyOrigin,
}

/// One discovered type. Immutable once produced by a scan; the merge builds
/// refined copies rather than mutating sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub type_id: i64,
    pub version: i64,
    /// Origin of `type_id`: declared metadata pins it against later scans.
    /// Tracked separately from `version` so an override that declares only
    /// one of the two leaves the other refinable.
    pub id_origin: PropertyOrigin,
    /// Origin of `version`; see `id_origin`.
    pub version_origin: PropertyOrigin,
    pub fidelity: PropertyPolicy,
    pub properties: BTreeMap<String, Property>,
}

/// A property set declared by an XML descriptor for one type. Fields left out
/// of the descriptor keep their scanned values.
#[derive(Debug, Clone)]
pub struct TypeOverride {
    pub name: String,
    pub type_id: Option<i64>,
    pub version: Option<i64>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone)]
pub struct ClassScanSource {
    pub root: PathBuf,
    pub policy: PropertyPolicy,
    pub types: Vec<TypeDescriptor>,
}

#[derive(Debug, Clone)]
pub struct XmlOverrideSource {
    pub path: PathBuf,
    pub types: Vec<TypeOverride>,
}

/// A contributor of type definitions to the merged schema. Closed set: class
/// scans and declarative XML overrides are the only two kinds.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    ClassScan(ClassScanSource),
    XmlOverride(XmlOverrideSource),
}

/// The merge result: type identity to resolved descriptor. `BTreeMap` keeps
/// iteration (and serialization) order independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub types: BTreeMap<String, TypeDescriptor>,
}

impl Schema {
    pub fn merge(sources: &[SchemaSource]) -> Schema {
        let mut schema = Schema::default();
        for source in sources {
            match source {
                SchemaSource::ClassScan(scan) => schema.apply_scan(scan),
                SchemaSource::XmlOverride(xml) => schema.apply_override(xml),
            }
        }
        schema
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn apply_scan(&mut self, scan: &ClassScanSource) {
        for incoming in &scan.types {
            match self.types.get_mut(&incoming.name) {
                None => {
                    self.types.insert(incoming.name.clone(), incoming.clone());
                }
                Some(existing) => {
                    // First full definition wins: only a strictly higher
                    // fidelity source refines an existing descriptor.
                    if incoming.fidelity <= existing.fidelity {
                        continue;
                    }

                    existing.fidelity = incoming.fidelity;
                    // Each attribute refines independently: a declared id must
                    // not pin a scanned version, and vice versa.
                    if existing.id_origin == PropertyOrigin::Scanned {
                        existing.type_id = incoming.type_id;
                    }
                    if existing.version_origin == PropertyOrigin::Scanned {
                        existing.version = incoming.version;
                    }

                    let declared: Vec<Property> = existing
                        .properties
                        .values()
                        .filter(|p| p.origin == PropertyOrigin::Declared)
                        .cloned()
                        .collect();
                    existing.properties = incoming.properties.clone();
                    for property in declared {
                        existing.properties.insert(property.name.clone(), property);
                    }
                }
            }
        }
    }

    fn apply_override(&mut self, xml: &XmlOverrideSource) {
        for incoming in &xml.types {
            let descriptor = self
                .types
                .entry(incoming.name.clone())
                .or_insert_with(|| TypeDescriptor {
                    name: incoming.name.clone(),
                    type_id: 0,
                    version: 0,
                    id_origin: PropertyOrigin::Scanned,
                    version_origin: PropertyOrigin::Scanned,
                    // Lowest fidelity so a class scan folded later still
                    // contributes the properties the descriptor leaves out.
                    fidelity: PropertyPolicy::Excluded,
                    properties: BTreeMap::new(),
                });

            if let Some(type_id) = incoming.type_id {
                descriptor.type_id = type_id;
                descriptor.id_origin = PropertyOrigin::Declared;
            }
            if let Some(version) = incoming.version {
                descriptor.version = version;
                descriptor.version_origin = PropertyOrigin::Declared;
            }
            for property in &incoming.properties {
                let mut property = property.clone();
                property.origin = PropertyOrigin::Declared;
                descriptor.properties.insert(property.name.clone(), property);
            }
        }
    }
}
