#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use gqlfuzz::config::RunConfig;
use gqlfuzz::errors::FuzzError;
use gqlfuzz::schema::{CompiledSchema, SchemaSources};
use gqlfuzz::transport::{Transport, TransportResponse};

pub const URL: &str = "http://localhost:4000/graphql";

type Responder = dyn Fn(&str, usize) -> Value + Send + Sync;

/// Answers from a closure and remembers every payload it was sent.
pub struct MockTransport {
    sent: Mutex<Vec<String>>,
    responder: Box<Responder>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new(responder: impl Fn(&str, usize) -> Value + Send + Sync + 'static) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_request(&self, _url: &str, payload: &str) -> Result<TransportResponse, FuzzError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let index = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(payload.to_string());
            sent.len() - 1
        };
        Ok(TransportResponse::new(200, (self.responder)(payload, index)))
    }

    fn headers(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn proxy(&self) -> Option<String> {
        None
    }
}

/// Replies like a tiny user service: every create returns the same user.
pub fn user_service(payload: &str, _index: usize) -> Value {
    let user = json!({"id": "u-42", "name": "Ann", "email": "ann@example.com"});
    if payload.contains("createUser") {
        json!({"data": {"createUser": user}})
    } else if payload.contains("getUser") {
        json!({"data": {"getUser": user}})
    } else if payload.contains("updateUser") {
        json!({"data": {"updateUser": user}})
    } else if payload.contains("deleteUser") {
        json!({"data": {"deleteUser": true}})
    } else if payload.contains("searchUsers") {
        json!({"data": {"searchUsers": [user]}})
    } else {
        json!({"errors": [{"message": "unexpected request"}]})
    }
}

pub fn quiet_config() -> RunConfig {
    RunConfig {
        seed: Some(42),
        skip_maximal_payloads: true,
        skip_dos_attacks: true,
        skip_injection_attacks: true,
        skip_misc_attacks: true,
        time_between_requests: Duration::ZERO,
        ..Default::default()
    }
}

pub fn user_schema() -> CompiledSchema {
    SchemaSources {
        queries: r#"
getUser:
  inputs:
    id: {name: id, kind: NON_NULL, type: null, ofType: {kind: SCALAR, name: ID, type: ID}}
  output: {kind: OBJECT, name: User, type: User}
  hardDependsOn: {id: User}
  softDependsOn: {}
searchUsers:
  inputs:
    search: {name: search, kind: NON_NULL, type: null, ofType: {kind: SCALAR, name: String, type: String}}
  output: {kind: LIST, name: null, type: null, ofType: {kind: OBJECT, name: User, type: User}}
  hardDependsOn: {}
  softDependsOn: {}
"#
        .into(),
        mutations: r#"
createUser:
  inputs:
    name: {name: name, kind: NON_NULL, type: null, ofType: {kind: SCALAR, name: String, type: String}}
  output: {kind: OBJECT, name: User, type: User}
  hardDependsOn: {}
  softDependsOn: {}
  mutationType: CREATE
updateUser:
  inputs:
    id: {name: id, kind: NON_NULL, type: null, ofType: {kind: SCALAR, name: ID, type: ID}}
    name: {name: name, kind: SCALAR, type: String}
  output: {kind: OBJECT, name: User, type: User}
  hardDependsOn: {id: User}
  softDependsOn: {}
  mutationType: UPDATE
deleteUser:
  inputs:
    id: {name: id, kind: NON_NULL, type: null, ofType: {kind: SCALAR, name: ID, type: ID}}
  output: {kind: SCALAR, name: Boolean, type: Boolean}
  hardDependsOn: {id: User}
  softDependsOn: {}
  mutationType: DELETE
resetEverything:
  inputs: {}
  output: {kind: SCALAR, name: Boolean, type: Boolean}
  hardDependsOn: {}
  softDependsOn: {}
  mutationType: UNKNOWN
"#
        .into(),
        objects: r#"
User:
  fields:
    - {name: id, kind: SCALAR, type: ID, inputs: {}}
    - {name: name, kind: SCALAR, type: String, inputs: {}}
    - {name: email, kind: SCALAR, type: String, inputs: {}}
  associatedQueries: [getUser]
  associatedMutations: [createUser]
"#
        .into(),
        ..Default::default()
    }
    .parse()
    .unwrap()
}
