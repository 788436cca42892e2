//! Class source scanning: turns a directory or jar of compiled classes into a
//! schema source, keeping only types that carry the marker annotation.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::classfile::{self, TypeInfo};
use crate::error::PipelineError;
use crate::schema::{ClassScanSource, Property, PropertyOrigin, PropertyPolicy, TypeDescriptor};

pub const DEFAULT_MARKER_ANNOTATION: &str = "com.tangosol.io.pof.schema.annotation.PortableType";

/// Selects the types a scan is allowed to see: only classes carrying the
/// marker annotation contribute to the schema.
#[derive(Debug, Clone)]
pub struct TypeFilter {
    marker_annotation: String,
}

impl TypeFilter {
    pub fn has_annotation(marker_annotation: impl Into<String>) -> Self {
        Self {
            marker_annotation: marker_annotation.into(),
        }
    }

    pub fn matches<'a>(&self, info: &'a TypeInfo) -> Option<&'a classfile::AnnotationInfo> {
        info.annotation(&self.marker_annotation)
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        Self::has_annotation(DEFAULT_MARKER_ANNOTATION)
    }
}

/// The two kinds of scan root. Closed set: every classpath entry is either a
/// class directory or a jar archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRoot {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl ScanRoot {
    /// Classifies an existing path. Anything that is neither a directory nor
    /// a jar/zip file is an invalid root.
    pub fn classify(path: &Path) -> Result<ScanRoot, PipelineError> {
        if path.is_dir() {
            return Ok(ScanRoot::Directory(path.to_path_buf()));
        }
        if path.is_file() {
            let is_archive = path
                .extension()
                .is_some_and(|ext| ext == "jar" || ext == "zip");
            if is_archive {
                return Ok(ScanRoot::Archive(path.to_path_buf()));
            }
            return Err(PipelineError::invalid_root(
                path,
                "file is not a jar or zip archive",
            ));
        }
        Err(PipelineError::invalid_root(
            path,
            "not an existing directory or readable archive",
        ))
    }

    pub fn path(&self) -> &Path {
        match self {
            ScanRoot::Directory(p) | ScanRoot::Archive(p) => p,
        }
    }
}

/// Scans one root and produces its schema source. The property policy is
/// fixed at construction of the result and never changes afterwards.
pub fn scan(root: &ScanRoot, filter: &TypeFilter, policy: PropertyPolicy) -> Result<ClassScanSource> {
    let types = match root {
        ScanRoot::Directory(dir) => scan_directory(dir, filter, policy)?,
        ScanRoot::Archive(jar) => scan_archive(jar, filter, policy)?,
    };

    Ok(ClassScanSource {
        root: root.path().to_path_buf(),
        policy,
        types,
    })
}

fn scan_directory(dir: &Path, filter: &TypeFilter, policy: PropertyPolicy) -> Result<Vec<TypeDescriptor>> {
    if !dir.is_dir() {
        return Err(PipelineError::invalid_root(dir, "directory does not exist").into());
    }

    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build();

    let mut class_files = Vec::new();
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if !path.extension().is_some_and(|e| e == "class") {
            continue;
        }
        // Inner and generated classes don't carry their own schema identity.
        if path
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().contains('$'))
        {
            continue;
        }
        class_files.push(path.to_path_buf());
    }
    // Walk order is filesystem-dependent; sort so the scan result is stable.
    class_files.sort();

    let mut types = Vec::new();
    for path in class_files {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read class file: {}", path.display()))?;
        let info = classfile::parse_class(&bytes)
            .with_context(|| format!("failed to parse class file: {}", path.display()))?;
        if let Some(descriptor) = describe(&info, filter, policy) {
            types.push(descriptor);
        }
    }
    Ok(types)
}

fn scan_archive(jar: &Path, filter: &TypeFilter, policy: PropertyPolicy) -> Result<Vec<TypeDescriptor>> {
    let file = File::open(jar)
        .map_err(|e| PipelineError::invalid_root(jar, format!("failed to open archive: {e}")))?;
    // SAFETY: The file is opened read-only and remains valid for the lifetime
    // of the mmap. The mmap is dropped before the file.
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| PipelineError::invalid_root(jar, format!("failed to mmap archive: {e}")))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .map_err(|e| PipelineError::invalid_root(jar, format!("failed to read zip structure: {e}")))?;

    let mut types = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !name.ends_with(".class") || name.contains('$') {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {} from {}", name, jar.display()))?;
        let info = classfile::parse_class(&bytes)
            .with_context(|| format!("failed to parse {} in {}", name, jar.display()))?;
        if let Some(descriptor) = describe(&info, filter, policy) {
            types.push(descriptor);
        }
    }
    // Zip entry order is a packaging artifact; sort for a stable scan result.
    types.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(types)
}

/// Applies the filter and property policy to one parsed class. Returns `None`
/// for types without the marker annotation.
fn describe(info: &TypeInfo, filter: &TypeFilter, policy: PropertyPolicy) -> Option<TypeDescriptor> {
    let marker = filter.matches(info)?;
    let type_id = marker.int_value("id").unwrap_or(0);
    let version = marker.int_value("version").unwrap_or(0);

    let mut properties = BTreeMap::new();
    if policy != PropertyPolicy::Excluded {
        for field in info.fields.iter().filter(|f| f.is_property_candidate()) {
            let property = match policy {
                PropertyPolicy::Full => Property {
                    name: field.name.clone(),
                    type_name: field.type_name.clone(),
                    since: field.since_version(),
                    origin: PropertyOrigin::Scanned,
                },
                PropertyPolicy::NamesOnlyObjectTyped => Property {
                    name: field.name.clone(),
                    type_name: "java.lang.Object".to_string(),
                    since: 0,
                    origin: PropertyOrigin::Scanned,
                },
                PropertyPolicy::Excluded => unreachable!(),
            };
            properties.insert(property.name.clone(), property);
        }
    }

    Some(TypeDescriptor {
        name: info.binary_name.clone(),
        type_id,
        version,
        id_origin: PropertyOrigin::Scanned,
        version_origin: PropertyOrigin::Scanned,
        fidelity: policy,
        properties,
    })
}
