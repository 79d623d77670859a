//! FFI layer for mobile and web shells.
//!
//! This module provides C-compatible functions over the pure engine. Every
//! function is stateless: inputs and outputs cross the boundary as JSON
//! strings, and the caller owns persistence and networking.
//!
//! # Memory Management
//!
//! - Strings returned by `tote_*` functions are allocated by Rust
//! - Caller must free them with `tote_string_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{
    merge_local_wins, ApplyResult, CollectionKind, Entity, EntityList, Mutation, ReconcileInput,
    Totals,
};
use serde::{de::DeserializeOwned, Serialize};
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(Serialize)]
#[serde(untagged)]
enum FfiResult<T: Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: Serialize> FfiResult<T> {
    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

impl<T: Serialize> From<Result<T, String>> for FfiResult<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(ok) => FfiResult::Ok { ok },
            Err(error) => FfiResult::Err { error },
        }
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `tote_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => CString::from(c"{\"error\":\"string contained null bytes\"}").into_raw(),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

unsafe fn parse_kind(ptr: *const c_char) -> Result<CollectionKind, String> {
    let raw = from_c_string(ptr).ok_or("invalid kind string")?;
    raw.parse().map_err(|e: crate::Error| e.to_string())
}

unsafe fn parse_json<T: DeserializeOwned>(ptr: *const c_char, what: &str) -> Result<T, String> {
    let raw = from_c_string(ptr).ok_or_else(|| format!("invalid {what} JSON"))?;
    serde_json::from_str(&raw).map_err(|e| format!("parse error in {what}: {e}"))
}

fn respond<T: Serialize>(result: Result<T, String>) -> *mut c_char {
    to_c_string(FfiResult::from(result).to_json())
}

/// Output of `tote_apply_mutation`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MutationResponse {
    entities: EntityList,
    result: ApplyResult,
    totals: Totals,
}

// ============================================================================
// Collection Operations
// ============================================================================

/// Apply a mutation to an entity list.
///
/// # Arguments
/// - `kind`: `"cart"` or `"liked"`
/// - `entities_json`: JSON array of entities, unique by product id
/// - `mutation_json`: JSON of a Mutation
///
/// # Returns
/// JSON string: `{"ok": {"entities": [...], "result": ApplyResult, "totals": Totals}}`
/// or `{"error": "message"}`
///
/// # Safety
/// - All pointers must be valid null-terminated C strings or null
/// - Caller must free the returned string with `tote_string_free`
#[no_mangle]
pub unsafe extern "C" fn tote_apply_mutation(
    kind: *const c_char,
    entities_json: *const c_char,
    mutation_json: *const c_char,
) -> *mut c_char {
    let response = (|| -> Result<_, String> {
        let kind = parse_kind(kind)?;
        let entities: Vec<Entity> = parse_json(entities_json, "entities")?;
        let mutation: Mutation = parse_json(mutation_json, "mutation")?;

        let mut entities =
            EntityList::try_from_entities(kind, entities).map_err(|e| e.to_string())?;
        let result = entities.apply(kind, &mutation).map_err(|e| e.to_string())?;
        let totals = entities.totals(kind);
        Ok(MutationResponse {
            entities,
            result,
            totals,
        })
    })();
    respond(response)
}

/// Compute count and price totals of an entity list.
///
/// # Returns
/// JSON string: `{"ok": {"count": n, "price": p}}` or `{"error": "message"}`
///
/// # Safety
/// - All pointers must be valid null-terminated C strings or null
/// - Caller must free the returned string with `tote_string_free`
#[no_mangle]
pub unsafe extern "C" fn tote_totals(
    kind: *const c_char,
    entities_json: *const c_char,
) -> *mut c_char {
    let response = (|| -> Result<_, String> {
        let kind = parse_kind(kind)?;
        let entities: EntityList = parse_json(entities_json, "entities")?;
        Ok(entities.totals(kind))
    })();
    respond(response)
}

/// Merge a local and a remote entity list, local entities winning.
///
/// # Returns
/// JSON string: `{"ok": MergeOutcome}` or `{"error": "message"}`
///
/// # Safety
/// - All pointers must be valid null-terminated C strings or null
/// - Caller must free the returned string with `tote_string_free`
#[no_mangle]
pub unsafe extern "C" fn tote_merge(
    kind: *const c_char,
    local_json: *const c_char,
    remote_json: *const c_char,
) -> *mut c_char {
    let response = (|| -> Result<_, String> {
        let kind = parse_kind(kind)?;
        let local: EntityList = parse_json(local_json, "local entities")?;
        let remote: EntityList = parse_json(remote_json, "remote entities")?;
        let local = EntityList::from_entities(kind, local.into_vec());
        let remote = EntityList::from_entities(kind, remote.into_vec());
        Ok(merge_local_wins(&local, &remote))
    })();
    respond(response)
}

/// Plan reconciliation of a local snapshot against a remote collection.
///
/// # Arguments
/// - `kind`: `"cart"` or `"liked"`
/// - `input_json`: JSON of ReconcileInput
///   (`{"authenticated": bool, "local": {...}, "remote": {...} | null}`)
///
/// # Returns
/// JSON string: `{"ok": ReconcilePlan}` or `{"error": "message"}`
///
/// # Safety
/// - All pointers must be valid null-terminated C strings or null
/// - Caller must free the returned string with `tote_string_free`
#[no_mangle]
pub unsafe extern "C" fn tote_plan_reconcile(
    kind: *const c_char,
    input_json: *const c_char,
) -> *mut c_char {
    let response = (|| -> Result<_, String> {
        let kind = parse_kind(kind)?;
        let input: ReconcileInput = parse_json(input_json, "reconcile input")?;
        Ok(input.plan(kind))
    })();
    respond(response)
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `tote_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn tote_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn tote_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
