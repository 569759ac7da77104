//! The `RosterStore` trait.
//!
//! Storage backends (e.g. `flock-store-sqlite`) implement it; the HTTP layer
//! depends only on this abstraction. Timestamps are always supplied by the
//! caller as local wall-clock values so that behaviour is deterministic under
//! test.

use std::future::Future;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
  account::{Admin, AdminCredentials, Kiosk, NewAdmin},
  checkin::{BulkOutcome, CheckIn, CheckInDetail, CheckInListing, KioskMatch, KioskQuery},
  event::{Event, NewEvent},
  family::{Family, FamilyMember, FamilySearch},
  import::ImportRecord,
  ministry::{DetachReport, Ministry},
  person::{
    MasterlistEntry, NewPerson, Person, PersonDetails, PersonRef, PersonSummary, PersonUpdate,
    UserMinistryRow,
  },
  report::{
    AbsentMember, Attendee, Dashboard, ElderAbsentRow, ElderReportRow, InactiveMember,
    MemberStatus, MinistryAttendance, RosterRow,
  },
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Broad category of a storage failure, used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  /// Unique or foreign-key constraint, or a duplicate check-in.
  Conflict,
  /// The request referenced something that does not exist.
  Invalid,
  Internal,
}

pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> ErrorKind;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Flock roster backend.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait RosterStore: Send + Sync {
  type Error: StoreError;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Case-insensitive username lookup, with the stored password hash.
  fn find_admin_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<AdminCredentials>, Self::Error>> + Send + '_;

  fn get_admin(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Admin>, Self::Error>> + Send + '_;

  /// Fails with a conflict when the username is taken.
  fn create_admin(
    &self,
    input: NewAdmin,
  ) -> impl Future<Output = Result<Admin, Self::Error>> + Send + '_;

  fn count_admins(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn create_kiosk(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Kiosk, Self::Error>> + Send + '_;

  fn find_active_kiosk(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<Kiosk>, Self::Error>> + Send + '_;

  // ── People ────────────────────────────────────────────────────────────

  fn get_person(
    &self,
    person: PersonRef,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  fn person_details(
    &self,
    person: PersonRef,
  ) -> impl Future<Output = Result<Option<PersonDetails>, Self::Error>> + Send + '_;

  /// Members and elders together. `search` matches first or last name
  /// case-insensitively, or phone digits.
  fn list_people(
    &self,
    search: Option<String>,
  ) -> impl Future<Output = Result<Vec<PersonSummary>, Self::Error>> + Send + '_;

  fn users_with_ministries(
    &self,
  ) -> impl Future<Output = Result<Vec<UserMinistryRow>, Self::Error>> + Send + '_;

  fn list_elders(&self) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Members whose phone or alternate phone digits contain `digits`.
  fn lookup_users_by_phone(
    &self,
    digits: String,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  fn masterlist(
    &self,
  ) -> impl Future<Output = Result<Vec<MasterlistEntry>, Self::Error>> + Send + '_;

  /// Insert into `users` or `elders` depending on the role. A duplicate
  /// email is a conflict.
  fn create_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Apply an update. When the role crosses the member/elder boundary the
  /// row, its ministry links and its check-ins move to the other table in
  /// one transaction and the person gets a new id.
  fn update_person(
    &self,
    person: PersonRef,
    update: PersonUpdate,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Returns `false` when the person does not exist.
  fn set_active(
    &self,
    person: PersonRef,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn delete_person(
    &self,
    person: PersonRef,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Resolve a member by lower-cased email, then by phone digits.
  fn find_user(
    &self,
    email: Option<String>,
    phone_digits: Option<String>,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Upsert an imported row by email (insert when it has none), creating its
  /// family by name if needed.
  fn import_person(
    &self,
    record: ImportRecord,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  // ── Families ──────────────────────────────────────────────────────────

  fn list_families(&self) -> impl Future<Output = Result<Vec<Family>, Self::Error>> + Send + '_;

  fn create_family(
    &self,
    family_name: String,
  ) -> impl Future<Output = Result<Family, Self::Error>> + Send + '_;

  /// Members (users table only) of a family.
  fn family_members(
    &self,
    family_id: i64,
  ) -> impl Future<Output = Result<Vec<FamilyMember>, Self::Error>> + Send + '_;

  fn search_families(
    &self,
    search: FamilySearch,
  ) -> impl Future<Output = Result<Vec<FamilyMember>, Self::Error>> + Send + '_;

  // ── Ministries ────────────────────────────────────────────────────────

  fn list_ministries(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Ministry>, Self::Error>> + Send + '_;

  /// A duplicate name (case-insensitive) is a conflict.
  fn create_ministry(
    &self,
    name: String,
    active: bool,
  ) -> impl Future<Output = Result<Ministry, Self::Error>> + Send + '_;

  fn update_ministry(
    &self,
    id: i64,
    name: String,
    active: bool,
  ) -> impl Future<Output = Result<Option<Ministry>, Self::Error>> + Send + '_;

  /// A ministry still linked to people is a conflict.
  fn delete_ministry(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn find_ministry(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Ministry>, Self::Error>> + Send + '_;

  /// Find by case-insensitive name or create it active.
  fn ensure_ministry(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Ministry, Self::Error>> + Send + '_;

  /// Idempotent; returns whether a new link was written.
  fn attach_ministry(
    &self,
    person: PersonRef,
    ministry_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns whether a link was removed.
  fn detach_ministry(
    &self,
    person: PersonRef,
    ministry_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Resolve all names in one query and delete every matching link of the
  /// member in one statement. Unknown names are reported, never created.
  fn detach_ministries(
    &self,
    user_id: i64,
    names: Vec<String>,
  ) -> impl Future<Output = Result<DetachReport, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  /// Newest first.
  fn list_events(&self) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Events starting at or after `cutoff`, soonest first.
  fn events_since(
    &self,
    cutoff: NaiveDateTime,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  fn get_event(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  fn create_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn update_event(
    &self,
    id: i64,
    input: NewEvent,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  fn delete_event(&self, id: i64) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Check-ins ─────────────────────────────────────────────────────────

  /// Strict check-in: unknown person or event is invalid, a second check-in
  /// for the same (person, event) is a conflict.
  fn check_in(
    &self,
    person: PersonRef,
    event_id: i64,
    at: NaiveDateTime,
  ) -> impl Future<Output = Result<CheckIn, Self::Error>> + Send + '_;

  /// Insert unless already present; `None` when nothing was written.
  fn check_in_if_absent(
    &self,
    person: PersonRef,
    event_id: i64,
    at: NaiveDateTime,
  ) -> impl Future<Output = Result<Option<CheckIn>, Self::Error>> + Send + '_;

  /// Transactional insert-if-absent for many people.
  fn bulk_check_in(
    &self,
    event_id: i64,
    people: Vec<PersonRef>,
    at: NaiveDateTime,
  ) -> impl Future<Output = Result<BulkOutcome, Self::Error>> + Send + '_;

  /// Remove the latest check-in of each person for the event, in one
  /// transaction. Returns the number of rows removed.
  fn bulk_check_out(
    &self,
    event_id: i64,
    people: Vec<PersonRef>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn delete_checkin(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn delete_checkins(
    &self,
    ids: Vec<i64>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_checkins(
    &self,
  ) -> impl Future<Output = Result<Vec<CheckInListing>, Self::Error>> + Send + '_;

  fn event_checkins(
    &self,
    event_id: i64,
  ) -> impl Future<Output = Result<Vec<CheckInDetail>, Self::Error>> + Send + '_;

  fn kiosk_search(
    &self,
    query: KioskQuery,
  ) -> impl Future<Output = Result<Vec<KioskMatch>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  fn dashboard(
    &self,
    today: NaiveDate,
    upcoming_cutoff: NaiveDateTime,
  ) -> impl Future<Output = Result<Dashboard, Self::Error>> + Send + '_;

  fn attendees(&self) -> impl Future<Output = Result<Vec<Attendee>, Self::Error>> + Send + '_;

  fn ministry_attendance(
    &self,
    ministry_id: i64,
    event_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<MinistryAttendance>, Self::Error>> + Send + '_;

  /// Members of a ministry (or of any ministry) not checked in to the event,
  /// or never checked in at all when no event is given.
  fn ministry_absent(
    &self,
    ministry_id: Option<i64>,
    event_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<AbsentMember>, Self::Error>> + Send + '_;

  fn elder_report(
    &self,
    elder_id: i64,
    event_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<ElderReportRow>, Self::Error>> + Send + '_;

  fn elder_absent(
    &self,
    elder_id: i64,
    event_id: i64,
  ) -> impl Future<Output = Result<Vec<ElderAbsentRow>, Self::Error>> + Send + '_;

  fn roster(
    &self,
    ministry_id: i64,
  ) -> impl Future<Output = Result<Vec<RosterRow>, Self::Error>> + Send + '_;

  /// Members with no link to an active ministry.
  fn members_without_active_ministry(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<MemberStatus>, Self::Error>> + Send + '_;

  fn inactive_members(
    &self,
  ) -> impl Future<Output = Result<Vec<InactiveMember>, Self::Error>> + Send + '_;
}
