//! A stateful petstore behind wiremock, shaped like `fastapi-petstore.json`.
//!
//! Routes:
//! - `POST /pets`: 201 with the created pet, 409 if the name is taken.
//! - `GET /pets`: 200 with every pet, in creation order.
//! - `GET /pets/{id}`: 200, or 404 for unknown ids. Id `-2` answers 204,
//!   which the document does not declare.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::fixtures::{load_fixture, FASTAPI_PETSTORE};

/// Id that makes `GET /pets/{id}` answer with an undeclared 204.
pub const UNDECLARED_STATUS_ID: i64 = -2;

#[derive(Debug, Default)]
struct State {
    pets: Vec<Value>,
    next_id: i64,
}

/// Petstore request handler. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct PetStore {
    state: Arc<Mutex<State>>,
}

impl PetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pets.
    pub fn len(&self) -> usize {
        self.state.lock().pets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn create(&self, body: &[u8]) -> ResponseTemplate {
        let Ok(input) = serde_json::from_slice::<Value>(body) else {
            return error(422, "body is not valid JSON");
        };
        let Some(name) = input.get("name").and_then(Value::as_str) else {
            return error(422, "field 'name' is required");
        };

        let mut state = self.state.lock();
        if state.pets.iter().any(|p| p["name"] == name) {
            return error(409, &format!("Pet {} already exists", name));
        }
        state.next_id += 1;
        let pet = json!({
            "id": state.next_id,
            "name": name,
            "tag": input.get("tag").cloned().unwrap_or(Value::Null),
        });
        state.pets.push(pet.clone());
        ResponseTemplate::new(201).set_body_json(pet)
    }

    fn list(&self) -> ResponseTemplate {
        let pets = self.state.lock().pets.clone();
        ResponseTemplate::new(200).set_body_json(Value::Array(pets))
    }

    fn get(&self, id: &str) -> ResponseTemplate {
        let Ok(id) = id.parse::<i64>() else {
            return error(422, "pet_id must be an integer");
        };
        if id == UNDECLARED_STATUS_ID {
            return ResponseTemplate::new(204);
        }
        let state = self.state.lock();
        match state.pets.iter().find(|p| p["id"] == id) {
            Some(pet) => ResponseTemplate::new(200).set_body_json(pet.clone()),
            None => error(404, "Pet not found"),
        }
    }
}

impl Respond for PetStore {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let segments: Vec<&str> = request
            .url
            .path()
            .trim_matches('/')
            .split('/')
            .collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("POST", ["pets"]) => self.create(&request.body),
            ("GET", ["pets"]) => self.list(),
            ("GET", ["pets", id]) => self.get(id),
            _ => ResponseTemplate::new(405),
        }
    }
}

fn error(status: u16, detail: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "detail": detail }))
}

/// A running petstore mock server.
pub struct PetStoreServer {
    server: MockServer,
    store: PetStore,
}

impl PetStoreServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let store = PetStore::new();
        Mock::given(path_regex(r"^/pets(/[^/]+)?$"))
            .respond_with(store.clone())
            .mount(&server)
            .await;
        Self { server, store }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn store(&self) -> &PetStore {
        &self.store
    }

    /// The petstore document bound to this server.
    pub fn client(&self) -> Result<apidrive::OpenApi, apidrive::Error> {
        load_fixture(FASTAPI_PETSTORE, &self.uri())
    }
}
