//! Machine-readable descriptions of netvet data for external tooling.

pub mod schema;

pub use schema::{
    ErrorCatalog, SchemaExportResult, export_schemas, generate_catalog_entry_schema,
    generate_error_catalog, generate_test_result_schema,
};
