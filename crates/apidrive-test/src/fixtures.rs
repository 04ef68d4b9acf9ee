//! OpenAPI documents under `fixtures/`.

use std::path::PathBuf;

use apidrive::{ClientConfig, Error, OpenApi};

pub const PETSTORE_EXPANDED: &str = "petstore-expanded.yaml";
pub const WITH_SECURITY_PARAMETERS: &str = "with-securityparameters.yaml";
pub const SCHEMA_WITHOUT_PROPERTIES: &str = "schema-without-properties.yaml";
pub const FASTAPI_PETSTORE: &str = "fastapi-petstore.json";

/// Absolute path of a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

/// Load a fixture with the given base URL and the default transport.
pub fn load_fixture(name: &str, base_url: &str) -> Result<OpenApi, Error> {
    let document = apidrive::Document::from_path(&fixture_path(name))?;
    OpenApi::builder()
        .with_config(ClientConfig::new().with_base_url(base_url))
        .with_loader(std::sync::Arc::new(apidrive::FsLoader))
        .build(&document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fixture_loads() {
        for name in [
            PETSTORE_EXPANDED,
            WITH_SECURITY_PARAMETERS,
            SCHEMA_WITHOUT_PROPERTIES,
            FASTAPI_PETSTORE,
        ] {
            let api = OpenApi::from_path(&fixture_path(name));
            assert!(api.is_ok(), "{} failed to load: {:?}", name, api.err());
        }
    }

    #[test]
    fn petstore_expanded_operations() {
        let api = OpenApi::from_path(&fixture_path(PETSTORE_EXPANDED)).unwrap();
        let spec = api.spec();
        assert_eq!(spec.info.title, "Swagger Petstore");

        let mut ids: Vec<_> = spec.operations().map(|op| op.operation_id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["addPet", "deletePet", "find pet by id", "findPets"]);

        let find = api.operation("find_pet_by_id").unwrap();
        assert_eq!(find.path, "/pets/{id}");
        assert!(find.parameter("id").unwrap().required);
    }

    #[test]
    fn schema_without_properties() {
        let api = OpenApi::from_path(&fixture_path(SCHEMA_WITHOUT_PROPERTIES)).unwrap();
        let id = api.spec().schema("no_properties").unwrap();
        let model = api.models().compile(id).unwrap();
        assert!(model.fields().is_empty());

        assert!(api.models().validate(&model, &serde_json::json!({})).is_ok());
        let err = api
            .models()
            .validate(&model, &serde_json::json!({"a": 1}))
            .unwrap_err();
        assert!(err.to_string().contains("{a}"));
    }

    #[test]
    fn fastapi_response_codes() {
        let api = OpenApi::from_path(&fixture_path(FASTAPI_PETSTORE)).unwrap();
        let get_pet = api.operation("getPet").unwrap();
        assert_eq!(get_pet.responses.codes(), vec!["200", "404", "422"]);
        assert!(!get_pet.responses.has_default());
    }
}
