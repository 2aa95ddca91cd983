//! CLI integration tests for openapi-resolver binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("openapi-resolver"))
}

// Helper to create a temp document file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const PETS: &str = r##"openapi: 3.0.0
info:
  title: Pets
  version: '1.0'
paths:
  /pets:
    get:
      responses:
        '200':
          $ref: '#/components/responses/PetList'
components:
  responses:
    PetList:
      description: A list of pets
      content:
        application/json:
          schema:
            $ref: 'defs.yaml#/Pet'
"##;

const DEFS: &str = "Pet:\n  type: object\n  properties:\n    name:\n      type: string\n";

fn pets(dir: &TempDir) -> std::path::PathBuf {
    write_temp_file(dir, "defs.yaml", DEFS);
    write_temp_file(dir, "pets.yaml", PETS)
}

mod resolve_command {
    use super::*;

    #[test]
    fn resolves_to_json() {
        let dir = TempDir::new().unwrap();
        let api = pets(&dir);

        let output = cmd()
            .args(["resolve", api.to_str().unwrap()])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let data: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let response = &data["paths"]["/pets"]["get"]["responses"]["200"];
        assert_eq!(response["description"], "A list of pets");
        assert_eq!(
            response["content"]["application/json"]["schema"]["properties"]["name"]["type"],
            "string"
        );
    }

    #[test]
    fn resolves_to_yaml() {
        let dir = TempDir::new().unwrap();
        let api = pets(&dir);

        cmd()
            .args(["resolve", api.to_str().unwrap(), "--format", "yaml"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("openapi: 3.0.0"))
            .stdout(predicate::str::contains("description: A list of pets"))
            .stdout(predicate::str::contains("$ref").not());
    }

    #[test]
    fn inline_mode_keeps_local_references() {
        let dir = TempDir::new().unwrap();
        let api = pets(&dir);

        cmd()
            .args(["resolve", api.to_str().unwrap(), "--mode", "inline"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r##""$ref": "#/components/responses/PetList""##))
            .stdout(predicate::str::contains("defs.yaml").not());
    }

    #[test]
    fn writes_output_file() {
        let dir = TempDir::new().unwrap();
        let api = pets(&dir);
        let out = dir.path().join("resolved.json");

        cmd()
            .args(["resolve", api.to_str().unwrap(), "-o", out.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written = fs::read_to_string(&out).unwrap();
        assert!(written.contains(r#""description": "A list of pets""#));
    }

    #[test]
    fn dangling_reference_fails() {
        let dir = TempDir::new().unwrap();
        let api = write_temp_file(&dir, "pets.yaml", PETS);

        cmd()
            .args(["resolve", api.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains(
                "Failed to resolve Reference 'defs.yaml#/Pet' to Schema Object",
            ));
    }

    #[test]
    fn lenient_keeps_dangling_reference() {
        let dir = TempDir::new().unwrap();
        let api = write_temp_file(&dir, "pets.yaml", PETS);

        cmd()
            .args(["resolve", api.to_str().unwrap(), "--lenient"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""$ref": "defs.yaml#/Pet""#))
            .stderr(predicate::str::contains("Warning: [/components/responses/PetList/content/application~1json/schema]"));
    }

    #[test]
    fn cyclic_reference_fails() {
        let dir = TempDir::new().unwrap();
        let api = write_temp_file(
            &dir,
            "api.yaml",
            "openapi: 3.0.0\ninfo:\n  title: T\n  version: '1'\npaths: {}\ncomponents:\n  schemas:\n    A:\n      $ref: '#/components/schemas/B'\n    B:\n      $ref: '#/components/schemas/A'\n",
        );

        cmd()
            .args(["resolve", api.to_str().unwrap(), "--lenient"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Cyclic reference detected"));
    }

    #[test]
    fn missing_file() {
        cmd()
            .args(["resolve", "/nonexistent/pets.yaml"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Failed to read file"));
    }
}

mod validate_command {
    use super::*;

    const INVALID: &str = "openapi: 3.0.0\ninfo:\n  title: T\npaths:\n  /pets:\n    get: {}\n";

    #[test]
    fn valid_document() {
        let dir = TempDir::new().unwrap();
        let api = pets(&dir);

        cmd()
            .args(["validate", api.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn invalid_document() {
        let dir = TempDir::new().unwrap();
        let api = write_temp_file(&dir, "api.yaml", INVALID);

        cmd()
            .args(["validate", api.to_str().unwrap()])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed:"))
            .stderr(predicate::str::contains("[/info] Info is missing required property: version"))
            .stderr(predicate::str::contains(
                "[/paths/~1pets/get] Operation is missing required property: responses",
            ));
    }

    #[test]
    fn json_output() {
        let dir = TempDir::new().unwrap();
        let api = write_temp_file(&dir, "api.yaml", INVALID);

        let output = cmd()
            .args(["validate", api.to_str().unwrap(), "--json"])
            .assert()
            .code(1)
            .get_output()
            .stdout
            .clone();

        let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(result["valid"], false);
        assert_eq!(result["errors"].as_array().unwrap().len(), 2);

        let dir = TempDir::new().unwrap();
        let api = pets(&dir);
        cmd()
            .args(["validate", api.to_str().unwrap(), "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"valid":true}"#));
    }

    #[test]
    fn no_resolve_skips_missing_documents() {
        let dir = TempDir::new().unwrap();
        let api = write_temp_file(&dir, "pets.yaml", PETS);

        cmd()
            .args(["validate", api.to_str().unwrap(), "--no-resolve"])
            .assert()
            .success();
    }

    #[test]
    fn lenient_reports_unresolved_references() {
        let dir = TempDir::new().unwrap();
        let api = write_temp_file(&dir, "pets.yaml", PETS);

        cmd()
            .args(["validate", api.to_str().unwrap(), "--lenient", "--json"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Failed to resolve Reference 'defs.yaml#/Pet'"));
    }

    #[test]
    fn read_error_as_json() {
        cmd()
            .args(["validate", "/nonexistent/pets.yaml", "--json"])
            .assert()
            .code(3)
            .stdout(predicate::str::contains(r#""valid":false"#));
    }
}

mod general {
    use super::*;

    #[test]
    fn help() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("resolve"))
            .stdout(predicate::str::contains("validate"));
    }

    #[test]
    fn version() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("openapi-resolver"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        cmd()
            .args(["resolve", "api.yaml", "--mode", "some"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}
