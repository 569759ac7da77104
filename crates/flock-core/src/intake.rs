//! Mapping of Cognito form webhook payloads onto intake requests.
//!
//! Form payloads drift: fields are renamed between form revisions, wrapped in
//! `entry`/`data`/`fields`/`entries` envelopes, or exported under generic ids
//! such as `x3`. Every mapper here reads a list of candidate keys and takes the
//! first one that carries a non-empty value.
//!
//! Nothing in this module touches storage; it only decides what a payload
//! asks for and whether it is complete enough to act on.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{ministry::dedup_names, person::digits_only};

// ─── Payload access ──────────────────────────────────────────────────────────

/// The record inside a webhook body: `entry`, `data`, `fields`, the first of
/// `entries`, or the body itself.
pub fn unwrap_payload(body: &Value) -> &Value {
  for key in ["entry", "data", "fields"] {
    if let Some(inner) = body.get(key).filter(|v| v.is_object()) {
      return inner;
    }
  }
  if let Some(first) = body
    .get("entries")
    .and_then(Value::as_array)
    .and_then(|a| a.first())
  {
    return first;
  }
  body
}

fn lookup<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
  if let Some(v) = record.get(key) {
    return Some(v);
  }
  if !key.contains('.') {
    return None;
  }
  key.split('.').try_fold(record, |node, part| node.get(part))
}

fn scalar(v: &Value) -> Option<String> {
  match v {
    Value::String(s) => {
      let s = s.trim();
      (!s.is_empty()).then(|| s.to_owned())
    }
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// First candidate key with a present, non-empty scalar value.
pub fn pick(record: &Value, keys: &[&str]) -> Option<String> {
  keys.iter().find_map(|k| lookup(record, k).and_then(scalar))
}

/// First candidate key holding a list, given either as an array or as a
/// string separated by commas, semicolons or newlines.
pub fn pick_list(record: &Value, keys: &[&str]) -> Vec<String> {
  for key in keys {
    let Some(value) = lookup(record, key) else { continue };
    let items: Vec<String> = match value {
      Value::Array(items) => items.iter().filter_map(scalar).collect(),
      other => scalar(other)
        .map(|s| s.split([',', ';', '\n']).map(str::to_owned).collect())
        .unwrap_or_default(),
    };
    let items = dedup_names(items);
    if !items.is_empty() {
      return items;
    }
  }
  Vec::new()
}

/// `yes`/`y`/`true`/`1` and `no`/`n`/`false`/`0`; anything else is unknown.
pub fn parse_yes_no(s: Option<&str>) -> Option<bool> {
  match s?.trim().to_lowercase().as_str() {
    "yes" | "y" | "true" | "1" => Some(true),
    "no" | "n" | "false" | "0" => Some(false),
    _ => None,
  }
}

/// Show the first and last two characters of a secret.
pub fn mask_secret(s: &str) -> String {
  let chars: Vec<char> = s.chars().collect();
  match chars.len() {
    0 => String::new(),
    n if n <= 4 => "*".repeat(n),
    n => format!(
      "{}***{}",
      chars[..2].iter().collect::<String>(),
      chars[n - 2..].iter().collect::<String>()
    ),
  }
}

/// Top-level keys of an object, for logging payload shape.
pub fn top_keys(v: &Value) -> Vec<String> {
  v.as_object().map(|o| o.keys().cloned().collect()).unwrap_or_default()
}

// ─── Rejections ──────────────────────────────────────────────────────────────

/// Reasons an intake request cannot be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
  #[error("Missing identifier (email or phone)")]
  MissingIdentifier,

  #[error("Missing ministry")]
  MissingMinistry,

  #[error("User not found; first_name and last_name are required to create a new user.")]
  MissingNames,

  #[error("User not found (and creation disabled for this request).")]
  UnknownPerson,
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub email:      Option<String>,
  pub phone:      Option<String>,
}

impl Identity {
  pub fn has_identifier(&self) -> bool {
    self.email.is_some() || self.phone.as_deref().is_some_and(|p| !digits_only(p).is_empty())
  }

  /// Lower-cased email used for lookup and creation.
  pub fn email_key(&self) -> Option<String> {
    self.email.as_deref().and_then(crate::person::normalize_email)
  }

  pub fn phone_key(&self) -> Option<String> {
    self.phone.as_deref().map(digits_only).filter(|d| !d.is_empty())
  }

  /// Both names, when creation is attempted.
  pub fn names(&self) -> Result<(&str, &str), IntakeError> {
    match (self.first_name.as_deref(), self.last_name.as_deref()) {
      (Some(f), Some(l)) => Ok((f, l)),
      _ => Err(IntakeError::MissingNames),
    }
  }

  fn helps(e: &Value) -> Self {
    let name = e.get("Name").filter(|v| v.is_object());
    let first_name = pick(e, &["first_name"])
      .or_else(|| pick(e, &["FirstName"]))
      .or_else(|| pick(e, &["Name.First", "NameFirst"]))
      .or_else(|| name.and_then(|n| pick(n, &["First"])));
    let last_name = pick(e, &["last_name"])
      .or_else(|| pick(e, &["LastName"]))
      .or_else(|| pick(e, &["Name.Last", "NameLast"]))
      .or_else(|| name.and_then(|n| pick(n, &["Last"])));
    Self {
      first_name,
      last_name,
      email: pick(e, &["email", "Email"]),
      phone: pick(e, &["phone", "Phone"]),
    }
  }
}

// ─── Attach requests ─────────────────────────────────────────────────────────

/// Attach a person (found, or created when allowed) to a ministry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachRequest {
  pub identity:     Identity,
  pub ministry:     Option<String>,
  pub allow_create: bool,
}

impl AttachRequest {
  /// Storage-free validation. Returns the ministry name to attach.
  pub fn validate(&self) -> Result<&str, IntakeError> {
    if !self.identity.has_identifier() {
      return Err(IntakeError::MissingIdentifier);
    }
    self.ministry.as_deref().ok_or(IntakeError::MissingMinistry)
  }
}

/// Legacy volunteer-ministry addition form. Always allowed to create.
pub fn volunteer_addition(body: &Value) -> AttachRequest {
  let e = unwrap_payload(body);
  AttachRequest {
    identity:     Identity {
      first_name: pick(e, &["first_name", "Firstname", "FirstName", "x3"]),
      last_name:  pick(e, &["last_name", "LastName", "Lastname", "x5"]),
      email:      pick(e, &["email", "Email", "x6"]),
      phone:      pick(e, &["phone", "Phone", "x9"]),
    },
    ministry:     pick(e, &["ministry", "ApprovedMinistry", "Ministry", "x8"]),
    allow_create: true,
  }
}

/// The helps-member form (submit and update hooks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpsMember {
  pub request:       AttachRequest,
  pub is_new:        Option<bool>,
  pub raw_is_new:    Option<String>,
  pub form_id:       Option<String>,
  pub form_internal: Option<String>,
}

/// Creation is allowed only when the form explicitly says the person is new.
pub fn helps_member(body: &Value) -> HelpsMember {
  let e = unwrap_payload(body);
  let raw_is_new = pick(e, &["is_individual_new_to_helps_ministry"]).or_else(|| {
    pick(e, &["IsIndividualNewToHelpsMinistry", "Is Individual New To Helps Ministry"])
  });
  let is_new = parse_yes_no(raw_is_new.as_deref());
  let ministry = pick(e, &["ministry", "ministry_approved_for"])
    .or_else(|| pick(e, &["MinistryApprovedFor", "Ministry Approved For"]));
  let (form_id, form_internal) = form_meta(e, body);

  HelpsMember {
    request: AttachRequest {
      identity: Identity::helps(e),
      ministry,
      allow_create: is_new == Some(true),
    },
    is_new,
    raw_is_new,
    form_id,
    form_internal,
  }
}

fn form_meta(record: &Value, body: &Value) -> (Option<String>, Option<String>) {
  let form = record
    .get("Form")
    .or_else(|| body.get("Form"))
    .filter(|v| v.is_object());
  match form {
    Some(f) => (pick(f, &["Id"]), pick(f, &["InternalName"])),
    None => (None, None),
  }
}

// ─── Detach requests ─────────────────────────────────────────────────────────

/// Legacy volunteer-ministry removal form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolunteerRemoval {
  pub identity: Identity,
  pub ministry: Option<String>,
}

impl VolunteerRemoval {
  pub fn validate(&self) -> Result<&str, IntakeError> {
    if !self.identity.has_identifier() {
      return Err(IntakeError::MissingIdentifier);
    }
    self.ministry.as_deref().ok_or(IntakeError::MissingMinistry)
  }
}

pub fn volunteer_removal(body: &Value) -> VolunteerRemoval {
  let e = unwrap_payload(body);
  VolunteerRemoval {
    identity: Identity {
      first_name: None,
      last_name:  None,
      email:      pick(e, &["email", "Email", "Email Address", "E-mail"]),
      phone:      pick(e, &["phone", "Phone", "Phone Number", "Mobile", "Cell"]),
    },
    ministry: pick(e, &[
      "ministry",
      "ministry_name",
      "RemovedMinistry",
      "Removed Ministry",
      "MinistryRemoved",
      "Ministry Removed",
      "MinistryToRemove",
      "Ministry to Remove",
    ]),
  }
}

/// The helps-member change request form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRequest {
  pub identity:          Identity,
  pub change_types:      Vec<String>,
  pub membership_action: Option<String>,
  pub ministries:        Vec<String>,
  pub form_id:           Option<String>,
}

impl ChangeRequest {
  /// A removal needs a change tag mentioning membership and an action
  /// mentioning removal. Anything else is left alone.
  pub fn is_removal(&self) -> bool {
    let tagged = self
      .change_types
      .iter()
      .any(|t| t.to_lowercase().contains("membership"));
    let removing = self
      .membership_action
      .as_deref()
      .is_some_and(|a| a.to_lowercase().contains("remove"));
    tagged && removing
  }

  pub fn validate(&self) -> Result<&[String], IntakeError> {
    if !self.identity.has_identifier() {
      return Err(IntakeError::MissingIdentifier);
    }
    if self.ministries.is_empty() {
      return Err(IntakeError::MissingMinistry);
    }
    Ok(&self.ministries)
  }
}

pub fn change_request(body: &Value) -> ChangeRequest {
  let e = unwrap_payload(body);
  ChangeRequest {
    identity:          Identity::helps(e),
    change_types:      pick_list(e, &[
      "change_types",
      "ChangeType",
      "ChangeTypes",
      "TypeOfChange",
      "Type of Change",
    ]),
    membership_action: pick(e, &[
      "membership_action",
      "MembershipAction",
      "Membership Action",
      "MembershipChange",
    ]),
    ministries:        pick_list(e, &[
      "ministries",
      "ministries_to_remove",
      "MinistriesToRemove",
      "MinistryToRemove",
      "Ministry to Remove",
      "ministry",
    ]),
    form_id:           form_meta(e, body).0,
  }
}

// ─── Entry id ────────────────────────────────────────────────────────────────

const ENTRY_ID_KEYS: &[&str] =
  &["Entry.Number", "Entry.Id", "EntryId", "entry_id", "Id", "id", "Number"];

/// Identifier of the form entry, prefixed with the form id when known.
/// `None` when the payload carries no entry id; such payloads are never
/// deduplicated.
pub fn entry_id(body: &Value) -> Option<String> {
  let record = unwrap_payload(body);
  let entry = pick(record, ENTRY_ID_KEYS).or_else(|| pick(body, ENTRY_ID_KEYS))?;
  match form_meta(record, body).0 {
    Some(form) => Some(format!("{form}:{entry}")),
    None => Some(entry),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn unwraps_envelopes() {
    let inner = json!({ "email": "a@b.c" });
    assert_eq!(unwrap_payload(&json!({ "entry": inner.clone() })), &inner);
    assert_eq!(unwrap_payload(&json!({ "data": inner.clone() })), &inner);
    assert_eq!(unwrap_payload(&json!({ "fields": inner.clone() })), &inner);
    assert_eq!(unwrap_payload(&json!({ "entries": [inner.clone()] })), &inner);
    assert_eq!(unwrap_payload(&inner), &inner);
  }

  #[test]
  fn pick_skips_blank_and_renders_numbers() {
    let record = json!({ "Email": "  ", "email": " x@y.z ", "x9": 5551234 });
    assert_eq!(pick(&record, &["Email", "email"]).as_deref(), Some("x@y.z"));
    assert_eq!(pick(&record, &["phone", "x9"]).as_deref(), Some("5551234"));
    assert_eq!(pick(&record, &["missing"]), None);
  }

  #[test]
  fn pick_descends_dotted_keys() {
    let record = json!({ "Name": { "First": "Ruth", "Last": "Moab" } });
    assert_eq!(pick(&record, &["Name.First"]).as_deref(), Some("Ruth"));
  }

  #[test]
  fn legacy_addition_reads_generic_ids() {
    let req = volunteer_addition(&json!({
      "entry": { "x3": "Ann", "x5": "Lee", "x6": "ann@example.com", "x8": "Choir" }
    }));
    assert_eq!(req.identity.first_name.as_deref(), Some("Ann"));
    assert_eq!(req.identity.last_name.as_deref(), Some("Lee"));
    assert_eq!(req.ministry.as_deref(), Some("Choir"));
    assert!(req.allow_create);
    assert_eq!(req.validate(), Ok("Choir"));
  }

  #[test]
  fn missing_identifier_wins_over_missing_ministry() {
    let req = volunteer_addition(&json!({ "first_name": "A", "last_name": "B" }));
    assert_eq!(req.validate(), Err(IntakeError::MissingIdentifier));
    let req = volunteer_addition(&json!({ "email": "a@b.c" }));
    assert_eq!(req.validate(), Err(IntakeError::MissingMinistry));
  }

  #[test]
  fn helps_member_uses_name_object_and_new_flag() {
    let form = helps_member(&json!({
      "Form": { "Id": "202", "InternalName": "HelpsMember" },
      "Name": { "First": "Joy", "Last": "Park" },
      "Phone": "(555) 010-2000",
      "MinistryApprovedFor": "Ushers",
      "IsIndividualNewToHelpsMinistry": "Yes",
    }));
    assert_eq!(form.request.identity.first_name.as_deref(), Some("Joy"));
    assert_eq!(form.request.identity.last_name.as_deref(), Some("Park"));
    assert_eq!(form.request.ministry.as_deref(), Some("Ushers"));
    assert_eq!(form.is_new, Some(true));
    assert!(form.request.allow_create);
    assert_eq!(form.form_id.as_deref(), Some("202"));
    assert_eq!(form.request.identity.phone_key().as_deref(), Some("5550102000"));
  }

  #[test]
  fn unknown_new_flag_disallows_creation() {
    let form = helps_member(&json!({ "email": "a@b.c", "ministry": "Choir", "is_individual_new_to_helps_ministry": "maybe" }));
    assert_eq!(form.is_new, None);
    assert!(!form.request.allow_create);
  }

  #[test]
  fn removal_needs_membership_tag_and_remove_action() {
    let body = json!({
      "email": "a@b.c",
      "ChangeTypes": "Contact info; Membership",
      "MembershipAction": "Remove from ministry",
      "MinistriesToRemove": ["Choir", "Ushers", "choir"],
    });
    let change = change_request(&body);
    assert!(change.is_removal());
    assert_eq!(change.ministries, vec!["Choir".to_owned(), "Ushers".to_owned()]);

    let not_tagged = change_request(&json!({
      "email": "a@b.c",
      "ChangeTypes": ["Contact info"],
      "MembershipAction": "Remove",
    }));
    assert!(!not_tagged.is_removal());

    let not_removing = change_request(&json!({
      "email": "a@b.c",
      "change_types": ["membership"],
      "membership_action": "Add",
    }));
    assert!(!not_removing.is_removal());
  }

  #[test]
  fn entry_id_is_prefixed_with_form() {
    let body = json!({ "Form": { "Id": "202" }, "Entry": { "Number": 17 } });
    assert_eq!(entry_id(&body).as_deref(), Some("202:17"));
    assert_eq!(entry_id(&json!({ "entry_id": "abc" })).as_deref(), Some("abc"));
    assert_eq!(entry_id(&json!({ "email": "a@b.c" })), None);
  }

  #[test]
  fn masks_secrets() {
    assert_eq!(mask_secret(""), "");
    assert_eq!(mask_secret("abc"), "***");
    assert_eq!(mask_secret("abcdefgh"), "ab***gh");
  }

  #[test]
  fn yes_no_parsing() {
    assert_eq!(parse_yes_no(Some(" Y ")), Some(true));
    assert_eq!(parse_yes_no(Some("0")), Some(false));
    assert_eq!(parse_yes_no(Some("")), None);
    assert_eq!(parse_yes_no(None), None);
  }
}
