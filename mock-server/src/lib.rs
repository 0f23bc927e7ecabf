//! In-memory emulation of the vault REST API.
//!
//! Answers with the same envelope the real server uses: a `CALLINFO` block
//! on every reply, plus `ERRORS`/`ERRORCODES` on failures. Authenticated
//! routes read the session token from the `X-Http-Token` header.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_VERSION: &str = "1.0";

const TOKEN_HEADER: &str = "x-http-token";

/// The one account the mock server accepts.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub passphrase: String,
    pub apikey: String,
    pub otp: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "JohnDoe".to_string(),
            passphrase: "p4ssw0rd".to_string(),
            apikey: "A1B2C3D4".to_string(),
            otp: "978675".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Vault {
    id: u64,
    groupname: String,
    policy: String,
    description: String,
}

#[derive(Debug, Clone)]
struct Object {
    id: u64,
    groupid: u64,
    parentid: u64,
    templateid: String,
    objectname: String,
    public: Map<String, Value>,
    crypted: Map<String, Value>,
}

#[derive(Debug, Clone)]
struct User {
    id: u64,
    username: String,
    fullname: String,
    email: String,
}

#[derive(Debug)]
pub struct MockState {
    credentials: Credentials,
    tokens: HashSet<String>,
    vaults: BTreeMap<u64, Vault>,
    objects: BTreeMap<u64, Object>,
    users: BTreeMap<u64, User>,
    next_id: u64,
}

impl MockState {
    fn new(credentials: Credentials) -> Self {
        let mut users = BTreeMap::new();
        users.insert(
            1,
            User {
                id: 1,
                username: credentials.username.clone(),
                fullname: "John Doe".to_string(),
                email: "john.doe@example.com".to_string(),
            },
        );
        Self {
            credentials,
            tokens: HashSet::new(),
            vaults: BTreeMap::new(),
            objects: BTreeMap::new(),
            users,
            next_id: 100,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub type Db = Arc<RwLock<MockState>>;

type Reply = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with(Credentials::default())
}

pub fn app_with(credentials: Credentials) -> Router {
    let db: Db = Arc::new(RwLock::new(MockState::new(credentials)));
    let api = Router::new()
        .route("/auth", post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/check", post(check))
        .route("/vault", get(list_vaults).post(create_vault))
        .route(
            "/vault/{id}",
            get(vault_objects).put(edit_vault).delete(delete_vault),
        )
        .route("/vault/{id}/members", get(vault_members))
        .route("/object", post(create_object))
        .route(
            "/object/{id}",
            get(get_object).put(edit_object).delete(delete_object),
        )
        .route("/find", get(find))
        .route("/template", get(list_templates))
        .route("/template/{id}", get(get_template))
        .route("/user", get(list_users).post(create_user))
        .route("/user/{id}", get(get_user).delete(delete_user))
        .route("/utils/statusvalues", get(status_values))
        .route("/utils/policies", get(policies))
        .route("/utils/version", get(version))
        .route("/utils/pwgen", get(pwgen))
        .with_state(db);
    Router::new().nest(&format!("/api/{API_VERSION}"), api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

fn call_info(handler: &str, status: &str, errors: usize, extra: Value) -> Value {
    let mut info = json!({
        "status": status,
        "errors": errors,
        "errorcodes": 0,
        "general": [],
        "handler": handler,
    });
    if let (Some(info), Value::Object(extra)) = (info.as_object_mut(), extra) {
        info.extend(extra);
    }
    info
}

fn success(handler: &str, info: Value, top: Value) -> Reply {
    let mut envelope = json!({ "CALLINFO": call_info(handler, "SUCCESS", 0, info) });
    if let (Some(envelope), Value::Object(top)) = (envelope.as_object_mut(), top) {
        envelope.extend(top);
    }
    (StatusCode::OK, Json(envelope))
}

fn failure(status: StatusCode, handler: &str, message: &str) -> Reply {
    (
        status,
        Json(json!({
            "ERRORS": [message],
            "ERRORCODES": {},
            "CALLINFO": call_info(handler, "FAIL", 1, json!({})),
        })),
    )
}

fn authorize(state: &MockState, headers: &HeaderMap, handler: &str) -> Result<String, Reply> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, handler, "Missing token"))?;
    if state.tokens.contains(token) {
        Ok(token.to_string())
    } else {
        Err(failure(StatusCode::FORBIDDEN, handler, "Invalid token"))
    }
}

fn parse_id(raw: &str, handler: &str) -> Result<u64, Reply> {
    raw.parse()
        .map_err(|_| failure(StatusCode::BAD_REQUEST, handler, "Invalid id"))
}

fn field(body: &Value, key: &str) -> String {
    match body.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn vault_json(vault: &Vault) -> Value {
    json!({
        "id": vault.id.to_string(),
        "groupname": vault.groupname,
        "policy": vault.policy,
        "description": vault.description,
        "status": "4",
        "statustext": "Admin",
    })
}

fn object_json(object: &Object, children: usize, decrypt: bool) -> Value {
    let mut value = json!({
        "id": object.id.to_string(),
        "parentid": object.parentid.to_string(),
        "templateid": object.templateid,
        "groupid": object.groupid.to_string(),
        "status": "128",
        "objectname": object.objectname,
        "filename": "",
        "children": children.to_string(),
        "tags": "",
        "public": object.public,
    });
    if decrypt {
        value["crypted"] = Value::Object(object.crypted.clone());
    }
    value
}

fn user_json(user: &User) -> Value {
    json!({
        "id": user.id.to_string(),
        "username": user.username,
        "fullname": user.fullname,
        "email": user.email,
        "fingerprint": "",
        "otpprefix": "",
        "status": "1",
    })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn login(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    const HANDLER: &str = "AuthHandler";
    let mut state = db.write().await;
    let creds = &state.credentials;

    let username_ok = field(&body, "username") == creds.username;
    let accepted = username_ok
        && if body.get("keys").is_some() {
            field(&body, "keys") == format!("{}{}{}", creds.passphrase, creds.apikey, creds.otp)
        } else {
            let common =
                field(&body, "passphrase") == creds.passphrase && field(&body, "apikey") == creds.apikey;
            match field(&body, "logintype").as_str() {
                "totp" => common && field(&body, "otp") == creds.otp,
                "smartcard" => common,
                _ => false,
            }
        };
    if !accepted {
        return failure(StatusCode::UNAUTHORIZED, HANDLER, "Authentication failed");
    }

    let username = creds.username.clone();
    let token = Uuid::new_v4().simple().to_string();
    state.tokens.insert(token.clone());
    success(
        HANDLER,
        json!({
            "token": token,
            "username": username,
            "userid": "1",
            "fullname": "John Doe",
            "timeout": 900,
            "filesupport": 1,
            "version": "2.1.0",
        }),
        json!({}),
    )
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Reply {
    const HANDLER: &str = "AuthHandler";
    let mut state = db.write().await;
    let token = match authorize(&state, &headers, HANDLER) {
        Ok(token) => token,
        Err(reply) => return reply,
    };
    state.tokens.remove(&token);
    success(HANDLER, json!({ "logout": "true", "token": token }), json!({}))
}

async fn check(State(db): State<Db>, headers: HeaderMap) -> Reply {
    const HANDLER: &str = "AuthHandler";
    let state = db.read().await;
    match authorize(&state, &headers, HANDLER) {
        Ok(token) => success(HANDLER, json!({ "token": token }), json!({})),
        Err(reply) => reply,
    }
}

// ---------------------------------------------------------------------------
// Vaults
// ---------------------------------------------------------------------------

async fn list_vaults(State(db): State<Db>, headers: HeaderMap) -> Reply {
    const HANDLER: &str = "VaultHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let vaults: Vec<Value> = state.vaults.values().map(vault_json).collect();
    success(HANDLER, json!({}), json!({ "VAULTS": vaults }))
}

async fn create_vault(State(db): State<Db>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    const HANDLER: &str = "VaultHandler";
    let mut state = db.write().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let groupname = field(&body, "groupname");
    if groupname.is_empty() {
        return failure(StatusCode::BAD_REQUEST, HANDLER, "Vault name is required");
    }
    let id = state.allocate_id();
    let vault = Vault {
        id,
        groupname,
        policy: field(&body, "policy"),
        description: field(&body, "description"),
    };
    let reply = success(HANDLER, json!({}), json!({ "VAULT": [vault_json(&vault)] }));
    state.vaults.insert(id, vault);
    reply
}

async fn vault_objects(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    const HANDLER: &str = "VaultHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let Some(vault) = state.vaults.get(&id) else {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Vault not found");
    };
    let objects: Vec<Value> = state
        .objects
        .values()
        .filter(|o| o.groupid == id)
        .map(|o| object_json(o, 0, false))
        .collect();
    success(
        HANDLER,
        json!({}),
        json!({ "VAULT": [vault_json(vault)], "OBJECTS": objects, "TEMPLATES": [] }),
    )
}

async fn edit_vault(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    const HANDLER: &str = "VaultHandler";
    let mut state = db.write().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let Some(vault) = state.vaults.get_mut(&id) else {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Vault not found");
    };
    if body.get("groupname").is_some() {
        vault.groupname = field(&body, "groupname");
    }
    if body.get("policy").is_some() {
        vault.policy = field(&body, "policy");
    }
    if body.get("description").is_some() {
        vault.description = field(&body, "description");
    }
    success(HANDLER, json!({}), json!({ "VAULT": [vault_json(vault)] }))
}

async fn delete_vault(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    const HANDLER: &str = "VaultHandler";
    let mut state = db.write().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    if state.vaults.remove(&id).is_none() {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Vault not found");
    }
    state.objects.retain(|_, o| o.groupid != id);
    success(HANDLER, json!({ "message": "Vault deleted" }), json!({}))
}

async fn vault_members(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    const HANDLER: &str = "VaultHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    if !state.vaults.contains_key(&id) {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Vault not found");
    }
    let members: Vec<Value> = state
        .users
        .values()
        .map(|u| {
            let mut member = user_json(u);
            member["groupstatus"] = json!("4");
            member
        })
        .collect();
    success(HANDLER, json!({ "vaultmembers": members }), json!({}))
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ObjectQuery {
    children: Option<String>,
    decrypt: Option<String>,
    filedata: Option<String>,
}

fn is_true(flag: &Option<String>) -> bool {
    flag.as_deref() == Some("true")
}

async fn create_object(State(db): State<Db>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    const HANDLER: &str = "ObjectHandler";
    let mut state = db.write().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let groupid = match parse_id(&field(&body, "groupid"), HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    if !state.vaults.contains_key(&groupid) {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Vault not found");
    }
    let parentid = field(&body, "parentid").parse().unwrap_or(0);
    let objectname = field(&body, "objectname");

    // Every field except the structural ones is secret unless prefixed
    // with `public_`.
    let mut public = Map::new();
    let mut crypted = Map::new();
    if let Some(fields) = body.as_object() {
        for (key, value) in fields {
            match key.as_str() {
                "groupid" | "parentid" | "templateid" | "objectname" => {}
                k if k.starts_with("public_") => {
                    public.insert(k.trim_start_matches("public_").to_string(), value.clone());
                }
                k => {
                    crypted.insert(k.to_string(), value.clone());
                }
            }
        }
    }
    let id = state.allocate_id();
    state.objects.insert(
        id,
        Object {
            id,
            groupid,
            parentid,
            templateid: field(&body, "templateid"),
            objectname,
            public,
            crypted,
        },
    );
    success(
        HANDLER,
        json!({ "objectid": id.to_string(), "message": "Object created" }),
        json!({}),
    )
}

async fn get_object(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<ObjectQuery>,
) -> Reply {
    const HANDLER: &str = "ObjectHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let Some(object) = state.objects.get(&id) else {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Object not found");
    };
    let kids: Vec<&Object> = state.objects.values().filter(|o| o.parentid == id).collect();
    let decrypt = is_true(&query.decrypt);

    let mut objects = vec![object_json(object, kids.len(), decrypt)];
    if is_true(&query.children) {
        objects.extend(kids.iter().map(|o| object_json(o, 0, decrypt)));
    }
    if is_true(&query.filedata) {
        objects[0]["fileinfo"] = json!({
            "objectid": object.id.to_string(),
            "name": object.objectname,
            "size": "0",
            "type": "application/octet-stream",
        });
    }
    success(HANDLER, json!({}), json!({ "OBJECT": objects, "TEMPLATES": [] }))
}

async fn edit_object(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    const HANDLER: &str = "ObjectHandler";
    let mut state = db.write().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let Some(object) = state.objects.get_mut(&id) else {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Object not found");
    };
    if body.get("objectname").is_some() {
        object.objectname = field(&body, "objectname");
    }
    success(
        HANDLER,
        json!({ "objectid": id.to_string(), "message": "Object updated" }),
        json!({}),
    )
}

async fn delete_object(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    const HANDLER: &str = "ObjectHandler";
    let mut state = db.write().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    if state.objects.remove(&id).is_none() {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Object not found");
    }
    success(HANDLER, json!({ "message": "Object deleted" }), json!({}))
}

async fn find(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    const HANDLER: &str = "FindHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let needle = query.get("needle").map(String::as_str).unwrap_or_default();
    let hits: Vec<Value> = state
        .objects
        .values()
        .filter(|o| !needle.is_empty() && o.objectname.contains(needle))
        .map(|o| object_json(o, 0, false))
        .collect();
    success(HANDLER, json!({}), json!({ "OBJECT": hits, "TEMPLATES": [] }))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn login_template() -> Value {
    json!({
        "INFO": {"id": "20", "name": "Login", "ico": "login", "active": true, "wb": true},
        "STRUCTURE": {
            "host": {"translation": "Host", "type": "text-input", "encrypted": false,
                     "show": true, "policy": false, "alarm": false, "opt": false, "fieldname": "host"},
            "username": {"translation": "Username", "type": "text-input", "encrypted": false,
                         "show": true, "policy": false, "alarm": false, "opt": false, "fieldname": "username"},
            "password": {"translation": "Password", "type": "text-passwdgen", "encrypted": true,
                         "show": false, "policy": true, "alarm": true, "opt": false, "fieldname": "password"}
        }
    })
}

async fn list_templates(State(db): State<Db>, headers: HeaderMap) -> Reply {
    const HANDLER: &str = "TemplateHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    success(HANDLER, json!({}), json!({ "TEMPLATE": [login_template()] }))
}

async fn get_template(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    const HANDLER: &str = "TemplateHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    if id != "20" {
        return failure(StatusCode::NOT_FOUND, HANDLER, "Template not found");
    }
    success(HANDLER, json!({}), json!({ "TEMPLATE": [login_template()] }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn list_users(State(db): State<Db>, headers: HeaderMap) -> Reply {
    const HANDLER: &str = "UserHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let users: Vec<Value> = state.users.values().map(user_json).collect();
    success(HANDLER, json!({ "users": users }), json!({}))
}

async fn get_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    const HANDLER: &str = "UserHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    match state.users.get(&id) {
        Some(user) => success(HANDLER, json!({ "users": [user_json(user)] }), json!({})),
        None => failure(StatusCode::NOT_FOUND, HANDLER, "User not found"),
    }
}

async fn create_user(State(db): State<Db>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    const HANDLER: &str = "UserHandler";
    let mut state = db.write().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let username = field(&body, "username");
    if username.is_empty() {
        return failure(StatusCode::BAD_REQUEST, HANDLER, "Username is required");
    }
    let id = state.allocate_id();
    let user = User {
        id,
        username,
        fullname: field(&body, "fullname"),
        email: field(&body, "email"),
    };
    let reply = success(HANDLER, json!({ "users": [user_json(&user)] }), json!({}));
    state.users.insert(id, user);
    reply
}

async fn delete_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    const HANDLER: &str = "UserHandler";
    let mut state = db.write().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let id = match parse_id(&id, HANDLER) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    match state.users.remove(&id) {
        Some(user) => success(HANDLER, json!({ "users": [user_json(&user)] }), json!({})),
        None => failure(StatusCode::NOT_FOUND, HANDLER, "User not found"),
    }
}

// ---------------------------------------------------------------------------
// Utils
// ---------------------------------------------------------------------------

async fn status_values(State(db): State<Db>, headers: HeaderMap) -> Reply {
    const HANDLER: &str = "UtilsHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    success(
        HANDLER,
        json!({ "statusbits": {
            "userbits": {"active": 1, "admin": 2},
            "vaultbits": {"read": 1, "write": 2, "admin": 4}
        }}),
        json!({}),
    )
}

async fn policies(State(db): State<Db>, headers: HeaderMap) -> Reply {
    const HANDLER: &str = "UtilsHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    success(
        HANDLER,
        json!({ "policies": [
            {"id": 7, "name": "Default", "rules": {"min_length": 8, "max_length": 64}}
        ]}),
        json!({}),
    )
}

async fn version(State(db): State<Db>, headers: HeaderMap) -> Reply {
    const HANDLER: &str = "UtilsHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    success(HANDLER, json!({ "version": "2.1.0" }), json!({}))
}

async fn pwgen(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    const HANDLER: &str = "UtilsHandler";
    let state = db.read().await;
    if let Err(reply) = authorize(&state, &headers, HANDLER) {
        return reply;
    }
    let kind = query.get("type").cloned().unwrap_or_else(|| "secure".to_string());
    let length: usize = query
        .get("length")
        .and_then(|l| l.parse().ok())
        .unwrap_or(20);
    let passphrase: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .cycle()
        .take(length)
        .collect();
    success(
        HANDLER,
        json!({ "passphrase": passphrase, "length": length, "type": kind }),
        json!({}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_merges_call_info_and_top_level() {
        let (status, Json(body)) = success("VaultHandler", json!({"token": "t"}), json!({"VAULTS": []}));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["CALLINFO"]["status"], "SUCCESS");
        assert_eq!(body["CALLINFO"]["errors"], 0);
        assert_eq!(body["CALLINFO"]["handler"], "VaultHandler");
        assert_eq!(body["CALLINFO"]["token"], "t");
        assert_eq!(body["VAULTS"], json!([]));
    }

    #[test]
    fn failure_envelope_carries_errors() {
        let (status, Json(body)) = failure(StatusCode::FORBIDDEN, "AuthHandler", "Invalid token");
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["CALLINFO"]["status"], "FAIL");
        assert_eq!(body["CALLINFO"]["errors"], 1);
        assert_eq!(body["ERRORS"], json!(["Invalid token"]));
    }

    #[test]
    fn authorize_distinguishes_missing_and_unknown_tokens() {
        let mut state = MockState::new(Credentials::default());
        state.tokens.insert("good".to_string());

        let mut headers = HeaderMap::new();
        let (status, _) = authorize(&state, &headers, "H").unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        headers.insert(TOKEN_HEADER, "bad".parse().unwrap());
        let (status, _) = authorize(&state, &headers, "H").unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);

        headers.insert(TOKEN_HEADER, "good".parse().unwrap());
        assert_eq!(authorize(&state, &headers, "H").unwrap(), "good");
    }

    #[test]
    fn field_stringifies_non_strings() {
        let body = json!({"a": "x", "b": 5, "c": null});
        assert_eq!(field(&body, "a"), "x");
        assert_eq!(field(&body, "b"), "5");
        assert_eq!(field(&body, "c"), "");
        assert_eq!(field(&body, "missing"), "");
    }

    #[test]
    fn object_json_hides_secrets_unless_decrypting() {
        let mut crypted = Map::new();
        crypted.insert("password".to_string(), json!("hunter2"));
        let object = Object {
            id: 5,
            groupid: 1,
            parentid: 0,
            templateid: "20".to_string(),
            objectname: "db".to_string(),
            public: Map::new(),
            crypted,
        };
        assert!(object_json(&object, 0, false).get("crypted").is_none());
        assert_eq!(object_json(&object, 0, true)["crypted"]["password"], "hunter2");
    }
}
