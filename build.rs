use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src/api.rs");
    println!("cargo:rerun-if-changed=src/services/import_report.rs");
    println!("cargo:rerun-if-changed=migrations");

    // The real document is written by `cargo run --bin generate-openapi`
    let openapi_path = Path::new("openapi.json");

    if !openapi_path.exists() {
        let placeholder = r#"{
  "note": "Run 'cargo run --bin generate-openapi' to generate the OpenAPI spec"
}"#;
        if let Err(e) = fs::write(openapi_path, placeholder) {
            println!("cargo:warning=could not create openapi.json placeholder: {e}");
        }
    }
}
