//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use flock_core::{
  account::NewAdmin,
  checkin::{KioskQuery, KioskSearchMode},
  event::NewEvent,
  family::FamilySearch,
  import::ImportRow,
  person::{NewPerson, PersonKind, PersonRef, PersonUpdate, Role},
  store::{ErrorKind, RosterStore, StoreError},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(date: &str, time: &str) -> NaiveDateTime {
  NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
}

fn event(title: &str, date: &str, time: Option<&str>) -> NewEvent {
  NewEvent {
    title:       title.into(),
    event_date:  NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
    event_time:  time.map(|t| NaiveTime::parse_from_str(t, "%H:%M").unwrap()),
    location:    Some("Main Hall".into()),
    description: None,
  }
}

async fn member(s: &SqliteStore, first: &str, last: &str) -> PersonRef {
  s.create_person(NewPerson::new(first, last, Role::Member))
    .await
    .unwrap()
    .person_ref()
}

async fn elder(s: &SqliteStore, first: &str, last: &str) -> PersonRef {
  s.create_person(NewPerson::new(first, last, Role::Elder))
    .await
    .unwrap()
    .person_ref()
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_lookup_is_case_insensitive() {
  let s = store().await;
  assert_eq!(s.count_admins().await.unwrap(), 0);

  let admin = s
    .create_admin(NewAdmin {
      first_name:    "Grace".into(),
      last_name:     "Hopper".into(),
      email:         None,
      phone:         None,
      username:      "grace".into(),
      password_hash: "$argon2id$stub".into(),
      role:          "super_admin".into(),
    })
    .await
    .unwrap();

  let found = s.find_admin_by_username("GRACE".into()).await.unwrap().unwrap();
  assert_eq!(found.admin.id, admin.id);
  assert_eq!(found.password_hash, "$argon2id$stub");
  assert_eq!(s.count_admins().await.unwrap(), 1);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
  let s = store().await;
  let admin = NewAdmin {
    first_name:    "A".into(),
    last_name:     "B".into(),
    email:         None,
    phone:         None,
    username:      "desk".into(),
    password_hash: "h".into(),
    role:          "staff".into(),
  };
  s.create_admin(admin.clone()).await.unwrap();
  let err = s.create_admin(admin).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn inactive_kiosks_are_not_found() {
  let s = store().await;
  let kiosk = s.create_kiosk("LOBBY".into()).await.unwrap();
  assert!(kiosk.is_active);
  assert!(s.find_active_kiosk("LOBBY".into()).await.unwrap().is_some());
  assert!(s.find_active_kiosk("NOPE".into()).await.unwrap().is_none());
}

// ─── People ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn elders_and_members_live_in_separate_tables() {
  let s = store().await;
  let m = member(&s, "Ruth", "Moab").await;
  let e = elder(&s, "Boaz", "Bethlehem").await;
  assert_eq!(m.kind, PersonKind::User);
  assert_eq!(e.kind, PersonKind::Elder);

  let people = s.list_people(None).await.unwrap();
  assert_eq!(people.len(), 2);
  let elders = s.list_elders().await.unwrap();
  assert_eq!(elders.len(), 1);
  assert_eq!(elders[0].first_name, "Boaz");
}

#[tokio::test]
async fn list_people_matches_names_and_phone_digits() {
  let s = store().await;
  let mut input = NewPerson::new("Lydia", "Thyatira", Role::Member);
  input.phone = Some("(555) 010-2020".into());
  s.create_person(input).await.unwrap();
  member(&s, "Silas", "Berea").await;

  assert_eq!(s.list_people(Some("lyd".into())).await.unwrap().len(), 1);
  assert_eq!(s.list_people(Some("0102020".into())).await.unwrap().len(), 1);
  assert_eq!(s.list_people(Some("  ".into())).await.unwrap().len(), 2);

  let by_phone = s.lookup_users_by_phone("5550102020".into()).await.unwrap();
  assert_eq!(by_phone.len(), 1);
  assert_eq!(by_phone[0].first_name, "Lydia");
}

#[tokio::test]
async fn update_keeps_absent_fields() {
  let s = store().await;
  let mut input = NewPerson::new("Anna", "Asher", Role::Member);
  input.email = Some("anna@example.org".into());
  input.phone = Some("555".into());
  let p = s.create_person(input).await.unwrap().person_ref();

  let updated = s
    .update_person(p, PersonUpdate { last_name: Some("Phanuel".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(updated.first_name, "Anna");
  assert_eq!(updated.last_name, "Phanuel");
  assert_eq!(updated.email.as_deref(), Some("anna@example.org"));
  assert_eq!(updated.phone.as_deref(), Some("555"));
  assert!(updated.active);
}

#[tokio::test]
async fn update_missing_person_is_not_found() {
  let s = store().await;
  let err = s
    .update_person(PersonRef::user(99), PersonUpdate::default())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn role_change_moves_person_with_links_and_checkins() {
  let s = store().await;
  let p = member(&s, "Timothy", "Lystra").await;
  let choir = s.create_ministry("Choir".into(), true).await.unwrap();
  s.attach_ministry(p, choir.id).await.unwrap();
  let ev = s.create_event(event("Service", "2025-03-09", Some("10:00"))).await.unwrap();
  s.check_in(p, ev.id, at("2025-03-09", "09:55:00")).await.unwrap();

  let moved = s
    .update_person(p, PersonUpdate { role: Some("Elder".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(moved.kind, PersonKind::Elder);
  assert_eq!(moved.role.as_deref(), Some("elder"));
  assert!(s.get_person(p).await.unwrap().is_none());

  let details = s.person_details(moved.person_ref()).await.unwrap().unwrap();
  assert_eq!(details.ministries, vec!["Choir".to_owned()]);

  let checkins = s.event_checkins(ev.id).await.unwrap();
  assert_eq!(checkins.len(), 1);
  assert_eq!(checkins[0].elder_id, Some(moved.id));
  assert_eq!(checkins[0].user_id, None);
}

#[tokio::test]
async fn failed_role_change_leaves_original_row() {
  let s = store().await;
  let mut existing = NewPerson::new("Silas", "Philippi", Role::Elder);
  existing.email = Some("shared@example.com".into());
  s.create_person(existing).await.unwrap();

  let mut input = NewPerson::new("Titus", "Crete", Role::Member);
  input.email = Some("shared@example.com".into());
  let p = s.create_person(input).await.unwrap().person_ref();
  let choir = s.create_ministry("Choir".into(), true).await.unwrap();
  s.attach_ministry(p, choir.id).await.unwrap();
  let ev = s.create_event(event("Service", "2025-03-09", Some("10:00"))).await.unwrap();
  s.check_in(p, ev.id, at("2025-03-09", "09:55:00")).await.unwrap();

  let err = s
    .update_person(p, PersonUpdate { role: Some("elder".into()), ..Default::default() })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  let kept = s.get_person(p).await.unwrap().expect("member row survives");
  assert_eq!(kept.kind, PersonKind::User);
  let details = s.person_details(p).await.unwrap().unwrap();
  assert_eq!(details.ministries, vec!["Choir".to_owned()]);

  let checkins = s.event_checkins(ev.id).await.unwrap();
  assert_eq!(checkins.len(), 1);
  assert_eq!(checkins[0].user_id, Some(p.id));
  assert_eq!(checkins[0].elder_id, None);

  assert_eq!(s.list_elders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn ministry_ids_replace_links() {
  let s = store().await;
  let p = member(&s, "Priscilla", "Corinth").await;
  let a = s.create_ministry("Hospitality".into(), true).await.unwrap();
  let b = s.create_ministry("Teaching".into(), true).await.unwrap();
  s.attach_ministry(p, a.id).await.unwrap();

  s.update_person(p, PersonUpdate { ministry_ids: Some(vec![b.id, 999]), ..Default::default() })
    .await
    .unwrap();

  let details = s.person_details(p).await.unwrap().unwrap();
  assert_eq!(details.ministries, vec!["Teaching".to_owned()]);
}

#[tokio::test]
async fn details_list_overseeing_elders() {
  let s = store().await;
  let p = member(&s, "Mark", "John").await;
  let e = elder(&s, "Barnabas", "Cyprus").await;
  let m = s.create_ministry("Missions".into(), true).await.unwrap();
  s.attach_ministry(p, m.id).await.unwrap();
  s.attach_ministry(e, m.id).await.unwrap();

  let details = s.person_details(p).await.unwrap().unwrap();
  assert_eq!(details.elders, vec!["Barnabas Cyprus".to_owned()]);
  let elder_details = s.person_details(e).await.unwrap().unwrap();
  assert!(elder_details.elders.is_empty());
}

#[tokio::test]
async fn masterlist_collects_ministries() {
  let s = store().await;
  let p = member(&s, "Aquila", "Pontus").await;
  let e = elder(&s, "Apollos", "Alexandria").await;
  let m = s.create_ministry("Tents".into(), true).await.unwrap();
  s.attach_ministry(p, m.id).await.unwrap();

  let list = s.masterlist().await.unwrap();
  assert_eq!(list.len(), 2);
  let aquila = list.iter().find(|x| x.id == p).unwrap();
  assert_eq!(aquila.ministries, vec!["Tents".to_owned()]);
  assert_eq!(aquila.ministry_ids, vec![m.id]);
  assert_eq!(aquila.role.as_deref(), Some("member"));
  let apollos = list.iter().find(|x| x.id == e).unwrap();
  assert!(apollos.ministries.is_empty());
}

#[tokio::test]
async fn deleting_person_cascades() {
  let s = store().await;
  let p = member(&s, "Demas", "Thessalonica").await;
  let ev = s.create_event(event("Service", "2025-03-09", None)).await.unwrap();
  s.check_in(p, ev.id, at("2025-03-09", "09:00:00")).await.unwrap();

  assert!(s.delete_person(p).await.unwrap());
  assert!(!s.delete_person(p).await.unwrap());
  assert!(s.event_checkins(ev.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn find_user_by_email_then_phone() {
  let s = store().await;
  let mut input = NewPerson::new("Phoebe", "Cenchreae", Role::Member);
  input.email = Some("phoebe@example.org".into());
  input.phone = Some("555-777-1234".into());
  let p = s.create_person(input).await.unwrap();

  let by_email = s.find_user(Some("PHOEBE@example.org".into()), None).await.unwrap();
  assert_eq!(by_email.map(|u| u.id), Some(p.id));
  let by_phone = s.find_user(None, Some("5557771234".into())).await.unwrap();
  assert_eq!(by_phone.map(|u| u.id), Some(p.id));
  assert!(s.find_user(Some("x@y.z".into()), None).await.unwrap().is_none());
}

#[tokio::test]
async fn import_upserts_by_email_and_reuses_family() {
  let s = store().await;
  let row = |first: &str, status: &str| ImportRow {
    first_name: Some(first.into()),
    last_name: Some("Zebedee".into()),
    email: Some("James@Example.org".into()),
    family_name: Some("Zebedee".into()),
    status: Some(status.into()),
    ..Default::default()
  };

  let first = s.import_person(row("James", "").normalize().unwrap()).await.unwrap();
  let second = s.import_person(row("Jim", "inactive").normalize().unwrap()).await.unwrap();
  assert_eq!(first.id, second.id);
  assert_eq!(second.first_name, "Jim");
  assert!(!second.active);
  assert_eq!(first.family_id, second.family_id);
  assert_eq!(s.list_families().await.unwrap().len(), 1);
}

// ─── Families ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn family_search_by_id_and_name() {
  let s = store().await;
  let family = s.create_family("Bethany".into()).await.unwrap();
  let mut martha = NewPerson::new("Martha", "Bethany", Role::Member);
  martha.family_id = Some(family.id);
  s.create_person(martha).await.unwrap();
  let mut lazarus = NewPerson::new("Lazarus", "Bethany", Role::Elder);
  lazarus.family_id = Some(family.id);
  s.create_person(lazarus).await.unwrap();
  member(&s, "Mary", "Magdala").await;

  let by_id = s.search_families(FamilySearch::ById(family.id)).await.unwrap();
  assert_eq!(by_id.len(), 2);
  assert!(by_id.iter().all(|m| m.family_name.as_deref() == Some("Bethany")));

  let by_name = s.search_families(FamilySearch::ByName("MARTHA beth".into())).await.unwrap();
  assert_eq!(by_name.len(), 1);

  let members = s.family_members(family.id).await.unwrap();
  assert_eq!(members.len(), 1);
  assert_eq!(members[0].first_name, "Martha");
}

// ─── Ministries ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_ministry_is_case_insensitive() {
  let s = store().await;
  let created = s.ensure_ministry("Worship Team".into()).await.unwrap();
  let again = s.ensure_ministry(" worship team ".into()).await.unwrap();
  assert_eq!(created.id, again.id);
  assert_eq!(again.name, "Worship Team");
  assert_eq!(s.list_ministries(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_ensure_ministry_agrees_on_one_row() {
  let s = store().await;
  let (a, b) = tokio::join!(
    s.ensure_ministry("Parking".into()),
    s.ensure_ministry("parking".into())
  );
  let (a, b) = (a.unwrap(), b.unwrap());
  assert_eq!(a.id, b.id);
  assert_eq!(s.list_ministries(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_ministry_name_conflicts() {
  let s = store().await;
  s.create_ministry("Youth".into(), true).await.unwrap();
  let err = s.create_ministry("YOUTH".into(), true).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn deleting_referenced_ministry_conflicts() {
  let s = store().await;
  let p = member(&s, "Tabitha", "Joppa").await;
  let m = s.create_ministry("Sewing".into(), true).await.unwrap();
  s.attach_ministry(p, m.id).await.unwrap();

  let err = s.delete_ministry(m.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  s.detach_ministry(p, m.id).await.unwrap();
  assert!(s.delete_ministry(m.id).await.unwrap());
}

#[tokio::test]
async fn active_only_listing() {
  let s = store().await;
  s.create_ministry("Current".into(), true).await.unwrap();
  let old = s.create_ministry("Retired".into(), true).await.unwrap();
  s.update_ministry(old.id, "Retired".into(), false).await.unwrap();

  assert_eq!(s.list_ministries(true).await.unwrap().len(), 1);
  assert_eq!(s.list_ministries(false).await.unwrap().len(), 2);
  assert!(s.update_ministry(404, "x".into(), true).await.unwrap().is_none());
}

#[tokio::test]
async fn attach_is_idempotent() {
  let s = store().await;
  let p = member(&s, "Luke", "Antioch").await;
  let m = s.create_ministry("Medical".into(), true).await.unwrap();
  assert!(s.attach_ministry(p, m.id).await.unwrap());
  assert!(!s.attach_ministry(p, m.id).await.unwrap());
}

#[tokio::test]
async fn detach_reports_missing_without_creating() {
  let s = store().await;
  let p = member(&s, "Onesimus", "Colossae").await;
  let m = s.create_ministry("Ushers".into(), true).await.unwrap();
  s.attach_ministry(p, m.id).await.unwrap();

  let report = s
    .detach_ministries(p.id, vec!["ushers".into(), "Ghost Ministry".into(), "USHERS".into()])
    .await
    .unwrap();
  assert_eq!(report.found, vec!["Ushers".to_owned()]);
  assert_eq!(report.not_found, vec!["Ghost Ministry".to_owned()]);
  assert_eq!(report.removed, 1);
  assert!(s.find_ministry("Ghost Ministry".into()).await.unwrap().is_none());

  let again = s.detach_ministries(p.id, vec!["Ushers".into()]).await.unwrap();
  assert_eq!(again.removed, 0);
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn events_since_orders_ascending_and_limits() {
  let s = store().await;
  s.create_event(event("Past", "2025-01-01", Some("09:00"))).await.unwrap();
  s.create_event(event("Later", "2025-02-10", None)).await.unwrap();
  s.create_event(event("Soon", "2025-02-01", Some("18:30"))).await.unwrap();

  let since = s.events_since(at("2025-01-15", "00:00:00"), None).await.unwrap();
  let titles: Vec<_> = since.iter().map(|e| e.title.as_str()).collect();
  assert_eq!(titles, vec!["Soon", "Later"]);

  let limited = s.events_since(at("2024-12-31", "00:00:00"), Some(1)).await.unwrap();
  assert_eq!(limited.len(), 1);
  assert_eq!(limited[0].title, "Past");

  let all = s.list_events().await.unwrap();
  assert_eq!(all[0].title, "Later");
}

#[tokio::test]
async fn update_and_delete_event() {
  let s = store().await;
  let ev = s.create_event(event("Draft", "2025-05-05", None)).await.unwrap();
  let updated = s
    .update_event(ev.id, event("Final", "2025-05-06", Some("07:15")))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.title, "Final");
  let fetched = s.get_event(ev.id).await.unwrap().unwrap();
  assert_eq!(fetched.event_time, NaiveTime::from_hms_opt(7, 15, 0));

  assert!(s.delete_event(ev.id).await.unwrap());
  assert!(s.get_event(ev.id).await.unwrap().is_none());
  assert!(s.update_event(ev.id, event("x", "2025-01-01", None)).await.unwrap().is_none());
}

// ─── Check-ins ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_checkin_conflicts() {
  let s = store().await;
  let p = member(&s, "Stephen", "Jerusalem").await;
  let ev = s.create_event(event("Service", "2025-03-09", None)).await.unwrap();

  let first = s.check_in(p, ev.id, at("2025-03-09", "10:00:00")).await.unwrap();
  assert_eq!(first.user_id, Some(p.id));
  assert!(!first.is_elder);

  let err = s.check_in(p, ev.id, at("2025-03-09", "10:01:00")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert_eq!(err.to_string(), "Already checked in for this event.");
}

#[tokio::test]
async fn checkin_rejects_unknown_references() {
  let s = store().await;
  let p = member(&s, "Philip", "Samaria").await;
  let ev = s.create_event(event("Service", "2025-03-09", None)).await.unwrap();

  let err = s.check_in(PersonRef::user(404), ev.id, at("2025-03-09", "10:00:00")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Invalid);
  let err = s.check_in(p, 404, at("2025-03-09", "10:00:00")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[tokio::test]
async fn same_id_in_both_tables_checks_in_separately() {
  let s = store().await;
  let m = member(&s, "Andrew", "Bethsaida").await;
  let e = elder(&s, "Peter", "Bethsaida").await;
  assert_eq!(m.id, e.id);
  let ev = s.create_event(event("Service", "2025-03-09", None)).await.unwrap();

  s.check_in(m, ev.id, at("2025-03-09", "10:00:00")).await.unwrap();
  let elder_checkin = s.check_in(e, ev.id, at("2025-03-09", "10:00:00")).await.unwrap();
  assert!(elder_checkin.is_elder);
  assert_eq!(s.event_checkins(ev.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn check_in_if_absent_skips_duplicates() {
  let s = store().await;
  let p = member(&s, "Titus", "Crete").await;
  let ev = s.create_event(event("Service", "2025-03-09", None)).await.unwrap();

  assert!(s.check_in_if_absent(p, ev.id, at("2025-03-09", "10:00:00")).await.unwrap().is_some());
  assert!(s.check_in_if_absent(p, ev.id, at("2025-03-09", "10:05:00")).await.unwrap().is_none());
  assert!(
    s.check_in_if_absent(PersonRef::elder(7), ev.id, at("2025-03-09", "10:05:00"))
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn bulk_check_in_and_out_counts() {
  let s = store().await;
  let a = member(&s, "Eunice", "Lystra").await;
  let b = member(&s, "Lois", "Lystra").await;
  let ev = s.create_event(event("Service", "2025-03-09", None)).await.unwrap();
  s.check_in(a, ev.id, at("2025-03-09", "09:00:00")).await.unwrap();

  let outcome = s
    .bulk_check_in(ev.id, vec![a, b, PersonRef::user(404)], at("2025-03-09", "09:30:00"))
    .await
    .unwrap();
  assert_eq!(outcome.inserted, 1);
  assert_eq!(outcome.skipped, 2);

  let removed = s.bulk_check_out(ev.id, vec![a, b, PersonRef::user(404)]).await.unwrap();
  assert_eq!(removed, 2);
  assert!(s.event_checkins(ev.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_checkins_by_id() {
  let s = store().await;
  let a = member(&s, "Jason", "Thessalonica").await;
  let b = member(&s, "Gaius", "Derbe").await;
  let ev = s.create_event(event("Service", "2025-03-09", None)).await.unwrap();
  let c1 = s.check_in(a, ev.id, at("2025-03-09", "09:00:00")).await.unwrap();
  let c2 = s.check_in(b, ev.id, at("2025-03-09", "09:01:00")).await.unwrap();

  assert!(s.delete_checkin(c1.id).await.unwrap());
  assert!(!s.delete_checkin(c1.id).await.unwrap());
  assert_eq!(s.delete_checkins(vec![c1.id, c2.id, 999]).await.unwrap(), 1);
  assert_eq!(s.delete_checkins(vec![]).await.unwrap(), 0);
  assert!(s.list_checkins().await.unwrap().is_empty());
}

#[tokio::test]
async fn kiosk_search_reports_last_checkin() {
  let s = store().await;
  let family = s.create_family("Cornelius".into()).await.unwrap();
  let mut input = NewPerson::new("Cornelius", "Caesarea", Role::Member);
  input.phone = Some("555-123-9999".into());
  input.family_id = Some(family.id);
  let p = s.create_person(input).await.unwrap().person_ref();
  let ev1 = s.create_event(event("First", "2025-03-02", None)).await.unwrap();
  let ev2 = s.create_event(event("Second", "2025-03-09", None)).await.unwrap();
  s.check_in(p, ev1.id, at("2025-03-02", "10:00:00")).await.unwrap();
  s.check_in(p, ev2.id, at("2025-03-09", "10:00:00")).await.unwrap();

  let by_name = s
    .kiosk_search(KioskQuery {
      text:     "corn".into(),
      mode:     KioskSearchMode::Name,
      event_id: None,
      limit:    KioskQuery::DEFAULT_LIMIT,
    })
    .await
    .unwrap();
  assert_eq!(by_name.len(), 1);
  assert_eq!(by_name[0].family_name.as_deref(), Some("Cornelius"));
  let last = by_name[0].last_checkin.as_ref().unwrap();
  assert_eq!(last.event_id, ev2.id);
  assert_eq!(last.event_title.as_deref(), Some("Second"));

  let scoped = s
    .kiosk_search(KioskQuery {
      text:     "1239999".into(),
      mode:     KioskSearchMode::Phone,
      event_id: Some(ev1.id),
      limit:    10,
    })
    .await
    .unwrap();
  assert_eq!(scoped.len(), 1);
  assert_eq!(scoped[0].last_checkin.as_ref().unwrap().event_id, ev1.id);
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_counts() {
  let s = store().await;
  let p = member(&s, "Zacchaeus", "Jericho").await;
  elder(&s, "Nicodemus", "Jerusalem").await;
  let m = s.create_ministry("Finance".into(), true).await.unwrap();
  s.create_ministry("Dormant".into(), false).await.unwrap();
  s.attach_ministry(p, m.id).await.unwrap();
  let ev = s.create_event(event("Today", "2025-03-09", Some("10:00"))).await.unwrap();
  s.create_event(event("Old", "2025-01-01", None)).await.unwrap();
  s.check_in(p, ev.id, at("2025-03-09", "09:50:00")).await.unwrap();

  let today = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
  let dashboard = s.dashboard(today, at("2025-03-09", "00:00:00")).await.unwrap();
  assert_eq!(dashboard.stats.check_ins_today, 1);
  assert_eq!(dashboard.stats.total_users, 1);
  assert_eq!(dashboard.stats.total_elders, 1);
  assert_eq!(dashboard.stats.active_ministries, 1);
  assert_eq!(dashboard.stats.upcoming_events, 1);
  assert_eq!(dashboard.upcoming_events.len(), 1);
  assert_eq!(dashboard.all_checkins.len(), 1);
  assert_eq!(dashboard.all_checkins[0].ministry.as_deref(), Some("Finance"));
  assert_eq!(dashboard.all_checkins[0].kind, "User");
}

#[tokio::test]
async fn ministry_attendance_and_absence() {
  let s = store().await;
  let here = member(&s, "Present", "Person").await;
  let away = member(&s, "Absent", "Person").await;
  let m = s.create_ministry("Greeters".into(), true).await.unwrap();
  s.attach_ministry(here, m.id).await.unwrap();
  s.attach_ministry(away, m.id).await.unwrap();
  let ev = s.create_event(event("Service", "2025-03-09", None)).await.unwrap();
  s.check_in(here, ev.id, at("2025-03-09", "10:00:00")).await.unwrap();

  let attended = s.ministry_attendance(m.id, Some(ev.id)).await.unwrap();
  assert_eq!(attended.len(), 1);
  assert_eq!(attended[0].user_id, here.id);

  let absent = s.ministry_absent(Some(m.id), Some(ev.id)).await.unwrap();
  assert_eq!(absent.len(), 1);
  assert_eq!(absent[0].user_id, away.id);

  let never = s.ministry_absent(None, None).await.unwrap();
  assert_eq!(never.len(), 1);

  let roster = s.roster(m.id).await.unwrap();
  assert_eq!(roster.len(), 2);
  assert!(roster.iter().all(|r| r.ministry == "Greeters"));

  let attendees = s.attendees().await.unwrap();
  assert_eq!(attendees.len(), 1);
  assert_eq!(attendees[0].kind, PersonKind::User);
}

#[tokio::test]
async fn elder_reports_follow_shared_ministries() {
  let s = store().await;
  let e = elder(&s, "James", "Jerusalem").await;
  let here = member(&s, "Jude", "Galilee").await;
  let away = member(&s, "Matthias", "Judea").await;
  let m = s.create_ministry("Council".into(), true).await.unwrap();
  for p in [e, here, away] {
    s.attach_ministry(p, m.id).await.unwrap();
  }
  let ev = s.create_event(event("Meeting", "2025-04-01", None)).await.unwrap();
  s.check_in(here, ev.id, at("2025-04-01", "19:00:00")).await.unwrap();

  let report = s.elder_report(e.id, None).await.unwrap();
  assert_eq!(report.len(), 1);
  assert_eq!(report[0].first_name, "Jude");
  assert_eq!(report[0].ministry_name, "Council");

  let absent = s.elder_absent(e.id, ev.id).await.unwrap();
  assert_eq!(absent.len(), 1);
  assert_eq!(absent[0].first_name, "Matthias");
}

#[tokio::test]
async fn members_without_active_ministry_and_inactive_members() {
  let s = store().await;
  let busy = member(&s, "Busy", "Bee").await;
  let idle = member(&s, "Idle", "Hands").await;
  let gone = member(&s, "Gone", "Away").await;
  let active = s.create_ministry("Active One".into(), true).await.unwrap();
  let dormant = s.create_ministry("Dormant".into(), false).await.unwrap();
  s.attach_ministry(busy, active.id).await.unwrap();
  s.attach_ministry(idle, dormant.id).await.unwrap();
  s.attach_ministry(gone, active.id).await.unwrap();
  s.set_active(gone, false).await.unwrap();

  let without = s.members_without_active_ministry(false).await.unwrap();
  assert_eq!(without.len(), 1);
  assert_eq!(without[0].id, idle.id);

  let inactive = s.inactive_members().await.unwrap();
  assert_eq!(inactive.len(), 1);
  assert_eq!(inactive[0].id, gone.id);
  assert_eq!(inactive[0].ministries, "Active One");
}
