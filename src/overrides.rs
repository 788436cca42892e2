//! Declarative XML schema overrides.
//!
//! A resources root may carry a descriptor at `META-INF/schema.xml` whose
//! declarations take precedence over anything derived from annotations:
//!
//! ```xml
//! <schema>
//!   <type name="petstore.Pet" id="1000" version="2">
//!     <property name="name" type="java.lang.String" since="1"/>
//!   </type>
//! </schema>
//! ```

use anyhow::Result;
use std::path::Path;

use crate::diag::DiagnosticSink;
use crate::error::PipelineError;
use crate::schema::{Property, PropertyOrigin, TypeOverride, XmlOverrideSource};

pub const SCHEMA_DESCRIPTOR_PATH: &str = "META-INF/schema.xml";

/// Looks for a descriptor under a configured resources root. Absence of the
/// root or of the descriptor is not an error; a descriptor that exists but
/// cannot be parsed is fatal.
pub fn discover(
    resources_dir: Option<&Path>,
    sink: &dyn DiagnosticSink,
) -> Result<Option<XmlOverrideSource>> {
    let Some(dir) = resources_dir else {
        sink.info("The resources directory property is not present.");
        return Ok(None);
    };

    if !dir.is_dir() {
        sink.info(&format!(
            "The specified resources directory '{}' does not exist.",
            dir.display()
        ));
        return Ok(None);
    }

    let descriptor = dir.join(SCHEMA_DESCRIPTOR_PATH);
    if !descriptor.is_file() {
        sink.info(&format!(
            "No schema.xml file found at {}",
            descriptor.display()
        ));
        return Ok(None);
    }

    sink.info(&format!(
        "Adding XML schema source '{}'.",
        descriptor.display()
    ));
    load_descriptor(&descriptor).map(Some)
}

pub fn load_descriptor(path: &Path) -> Result<XmlOverrideSource> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::schema_parse(path, format!("failed to read file: {e}")))?;
    let document = roxmltree::Document::parse(&text)
        .map_err(|e| PipelineError::schema_parse(path, e.to_string()))?;

    let root = document.root_element();
    if root.tag_name().name() != "schema" {
        return Err(PipelineError::schema_parse(
            path,
            format!("expected root element <schema>, found <{}>", root.tag_name().name()),
        )
        .into());
    }

    let mut types = Vec::new();
    for node in root.children().filter(|n| n.is_element()) {
        if node.tag_name().name() != "type" {
            return Err(PipelineError::schema_parse(
                path,
                format!("unexpected element <{}> under <schema>", node.tag_name().name()),
            )
            .into());
        }

        let name = node
            .attribute("name")
            .ok_or_else(|| PipelineError::schema_parse(path, "<type> element missing 'name' attribute"))?
            .to_string();
        let type_id = parse_numeric_attribute(path, &node, "id")?;
        let version = parse_numeric_attribute(path, &node, "version")?;

        let mut properties = Vec::new();
        for child in node.children().filter(|n| n.is_element()) {
            if child.tag_name().name() != "property" {
                return Err(PipelineError::schema_parse(
                    path,
                    format!("unexpected element <{}> under <type>", child.tag_name().name()),
                )
                .into());
            }

            let property_name = child
                .attribute("name")
                .ok_or_else(|| {
                    PipelineError::schema_parse(path, "<property> element missing 'name' attribute")
                })?
                .to_string();
            let type_name = child.attribute("type").unwrap_or("java.lang.Object").to_string();
            let since = parse_numeric_attribute(path, &child, "since")?.unwrap_or(0);

            properties.push(Property {
                name: property_name,
                type_name,
                since,
                origin: PropertyOrigin::Declared,
            });
        }

        types.push(TypeOverride {
            name,
            type_id,
            version,
            properties,
        });
    }

    Ok(XmlOverrideSource {
        path: path.to_path_buf(),
        types,
    })
}

fn parse_numeric_attribute(
    path: &Path,
    node: &roxmltree::Node,
    attribute: &str,
) -> Result<Option<i64>> {
    match node.attribute(attribute) {
        None => Ok(None),
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
            PipelineError::schema_parse(
                path,
                format!(
                    "attribute '{attribute}' on <{}> is not a number: '{raw}'",
                    node.tag_name().name()
                ),
            )
            .into()
        }),
    }
}
