//! JSON Schema generation for reporting and catalog collaborators.
//!
//! # Generated Schemas
//!
//! - `test-result.schema.json` - verdict of one test on one device
//! - `catalog-entry.schema.json` - one catalog entry
//! - `error-codes.json` - machine-readable error code catalog

use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::CatalogEntry;
use crate::errors::catalog::{ErrorCategory, ErrorCode};
use crate::result::TestResult;

/// Version of the exported schema set.
pub const SCHEMA_VERSION: &str = "1.0";

#[must_use]
pub fn generate_test_result_schema() -> RootSchema {
    schema_for!(TestResult)
}

#[must_use]
pub fn generate_catalog_entry_schema() -> RootSchema {
    schema_for!(CatalogEntry)
}

/// Machine-readable error code entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCodeEntry {
    /// Error code in NV-Exxx format.
    pub code: String,
    pub number: u16,
    pub category: ErrorCategory,
    pub message: String,
    pub remediation: Vec<String>,
}

/// Machine-readable error category entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCategoryEntry {
    pub id: ErrorCategory,
    pub name: String,
    pub description: String,
    /// Code range (e.g., "001-099").
    pub code_range: String,
}

/// Complete error catalog for machine consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCatalog {
    pub schema_version: String,
    pub categories: Vec<ErrorCategoryEntry>,
    pub errors: Vec<ErrorCodeEntry>,
}

#[must_use]
pub fn generate_error_catalog() -> ErrorCatalog {
    let categories = ErrorCategory::all()
        .iter()
        .map(|category| ErrorCategoryEntry {
            id: *category,
            name: category.name().to_string(),
            description: category.description().to_string(),
            code_range: category.code_range().to_string(),
        })
        .collect();

    let errors = ErrorCode::all()
        .iter()
        .map(|code| ErrorCodeEntry {
            code: code.code_string(),
            number: code.code_number(),
            category: code.category(),
            message: code.message().to_string(),
            remediation: code
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        })
        .collect();

    ErrorCatalog {
        schema_version: SCHEMA_VERSION.to_string(),
        categories,
        errors,
    }
}

/// Summary of an [`export_schemas`] run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaExportResult {
    pub files_generated: usize,
    pub files: Vec<String>,
    pub output_dir: String,
}

/// Write every schema into `output_dir`, creating it if needed.
pub fn export_schemas(output_dir: &Path) -> std::io::Result<SchemaExportResult> {
    std::fs::create_dir_all(output_dir)?;

    let documents = [
        (
            "test-result.schema.json",
            serde_json::to_string_pretty(&generate_test_result_schema())?,
        ),
        (
            "catalog-entry.schema.json",
            serde_json::to_string_pretty(&generate_catalog_entry_schema())?,
        ),
        (
            "error-codes.json",
            serde_json::to_string_pretty(&generate_error_catalog())?,
        ),
    ];

    let mut files = Vec::with_capacity(documents.len());
    for (name, contents) in documents {
        let path = output_dir.join(name);
        std::fs::write(&path, contents)?;
        files.push(path.display().to_string());
    }

    Ok(SchemaExportResult {
        files_generated: files.len(),
        files,
        output_dir: output_dir.display().to_string(),
    })
}
