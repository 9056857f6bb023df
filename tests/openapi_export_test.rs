// Exports the schema catalogue to test_output/openapi.json so the HTTP layer
// and clients can pick up the current entity shapes.
use std::fs;
use utoipa::OpenApi;

use aquavida::openapi::ApiDoc;

#[test]
fn test_export_openapi() {
    let openapi = ApiDoc::openapi();

    let json = serde_json::to_string_pretty(&openapi).expect("Failed to serialize OpenAPI specification");
    let schemas = openapi.components.as_ref().map(|c| c.schemas.len()).unwrap_or(0);
    assert!(schemas > 100, "expected the full entity catalogue, got {} schemas", schemas);

    let output_path = "test_output/openapi.json";
    fs::create_dir_all("test_output").expect("Failed to create test_output directory");
    fs::write(output_path, json).expect("Failed to write OpenAPI specification to file");

    assert!(fs::metadata(output_path).is_ok(), "OpenAPI specification file was not created");
}
