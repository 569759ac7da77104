//! [`SqliteStore`], the SQLite implementation of [`RosterStore`].

use std::{collections::HashMap, path::Path};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension as _, ToSql, params, params_from_iter};

use flock_core::{
  account::{Admin, AdminCredentials, Kiosk, NewAdmin},
  checkin::{
    BulkOutcome, CheckIn, CheckInDetail, CheckInListing, KioskMatch, KioskQuery, KioskSearchMode,
    LastCheckIn,
  },
  event::{Event, NewEvent},
  family::{Family, FamilyMember, FamilySearch},
  import::ImportRecord,
  ministry::{DetachReport, Ministry, dedup_names},
  person::{
    MasterlistEntry, NewPerson, Person, PersonDetails, PersonKind, PersonRef, PersonSummary,
    PersonUpdate, UserMinistryRow, display_role,
  },
  report::{
    AbsentMember, Attendee, Dashboard, DashboardCheckIn, DashboardStats, ElderAbsentRow,
    ElderReportRow, InactiveMember, MemberStatus, MinistryAttendance, RosterRow,
  },
  store::RosterStore,
};

use crate::{
  Error, Result,
  encode::{
    ADMIN_COLUMNS, EVENT_COLUMNS, PERSON_COLUMNS, Tables, date_at, datetime_at, decode_admin,
    decode_event, decode_family_member, decode_kind, decode_person, encode_date, encode_datetime,
    encode_event_cutoff, encode_time, opt_datetime_at, placeholders, register_functions, time_at,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Flock roster store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Shared queries ──────────────────────────────────────────────────────────
//
// Plain functions over a borrowed connection so they can run inside a
// transaction as well as on their own.

fn fetch_person(conn: &Connection, person: PersonRef) -> rusqlite::Result<Option<Person>> {
  let t = Tables::of(person.kind);
  conn
    .query_row(
      &format!("SELECT {PERSON_COLUMNS} FROM {} WHERE id = ?1", t.people),
      params![person.id],
      |row| decode_person(row, person.kind),
    )
    .optional()
}

fn row_exists(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params![id], |_| Ok(())).optional()?.is_some())
}

fn person_exists(conn: &Connection, person: PersonRef) -> rusqlite::Result<bool> {
  let t = Tables::of(person.kind);
  row_exists(conn, &format!("SELECT 1 FROM {} WHERE id = ?1", t.people), person.id)
}

fn insert_person(conn: &Connection, input: &NewPerson) -> rusqlite::Result<PersonRef> {
  let kind = input.kind();
  let t = Tables::of(kind);
  let email = input
    .email
    .as_deref()
    .map(str::trim)
    .filter(|e| !e.is_empty());
  conn.execute(
    &format!(
      "INSERT INTO {} (first_name, last_name, email, phone, alt_phone, role, gender, avatar, family_id, active)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      t.people
    ),
    params![
      input.first_name,
      input.last_name,
      email,
      input.phone,
      input.alt_phone,
      input.role,
      input.gender,
      input.avatar,
      input.family_id,
      input.active,
    ],
  )?;
  Ok(PersonRef { kind, id: conn.last_insert_rowid() })
}

fn query_events_since(
  conn: &Connection,
  cutoff: &str,
  limit: i64,
) -> rusqlite::Result<Vec<Event>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {EVENT_COLUMNS} FROM events
     WHERE event_date || ' ' || COALESCE(event_time, '00:00') >= ?1
     ORDER BY event_date ASC, event_time ASC
     LIMIT ?2"
  ))?;
  stmt
    .query_map(params![cutoff, limit], decode_event)?
    .collect()
}

/// Insert a check-in unless the person already has one for the event, or
/// either side does not exist. Returns the new row id.
fn insert_checkin_if_absent(
  conn: &Connection,
  person: PersonRef,
  event_id: i64,
  at: &str,
) -> rusqlite::Result<Option<i64>> {
  let t = Tables::of(person.kind);
  let inserted = conn.execute(
    &format!(
      "INSERT INTO check_ins (event_id, {col}, checkin_time)
       SELECT ?1, ?2, ?3
       WHERE EXISTS (SELECT 1 FROM events WHERE id = ?1)
         AND EXISTS (SELECT 1 FROM {people} WHERE id = ?2)
         AND NOT EXISTS (SELECT 1 FROM check_ins WHERE event_id = ?1 AND {col} = ?2)",
      col = t.column,
      people = t.people,
    ),
    params![event_id, person.id, at],
  )?;
  Ok((inserted > 0).then(|| conn.last_insert_rowid()))
}

fn checkin_row(id: i64, person: PersonRef, event_id: i64, at: NaiveDateTime) -> CheckIn {
  CheckIn {
    id,
    event_id,
    user_id: (!person.is_elder()).then_some(person.id),
    elder_id: person.is_elder().then_some(person.id),
    checkin_time: at,
    is_elder: person.is_elder(),
  }
}

fn blank_to_none(v: Option<String>) -> Option<String> {
  v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Outcome of a strict check-in attempt, decided inside the connection
/// thread.
enum StrictCheckIn {
  Inserted(i64),
  UnknownPerson,
  UnknownEvent,
  Duplicate,
}

// ─── RosterStore impl ────────────────────────────────────────────────────────

impl RosterStore for SqliteStore {
  type Error = Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn find_admin_by_username(&self, username: String) -> Result<Option<AdminCredentials>> {
    let username = username.trim().to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {ADMIN_COLUMNS}, password_hash FROM admins WHERE username = ?1"),
                params![username],
                |row| {
                  Ok(AdminCredentials {
                    admin:         decode_admin(row)?,
                    password_hash: row.get(7)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn get_admin(&self, id: i64) -> Result<Option<Admin>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = ?1"),
                params![id],
                decode_admin,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_admin(&self, input: NewAdmin) -> Result<Admin> {
    let username = input.username.trim().to_owned();
    let taken = self.find_admin_by_username(username.clone()).await?;
    if taken.is_some() {
      return Err(Error::Conflict("Username already exists".into()));
    }

    let admin = input.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO admins (first_name, last_name, email, phone, username, password_hash, role)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![
            admin.first_name,
            admin.last_name,
            admin.email,
            admin.phone,
            username,
            admin.password_hash,
            admin.role,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Admin {
      id,
      first_name: input.first_name,
      last_name: input.last_name,
      email: input.email,
      phone: input.phone,
      username: input.username.trim().to_owned(),
      role: input.role,
    })
  }

  async fn count_admins(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM admins", [], |r| r.get(0))?))
      .await?;
    Ok(n as u64)
  }

  async fn create_kiosk(&self, code: String) -> Result<Kiosk> {
    let code_in = code.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute("INSERT INTO kiosks (code, is_active) VALUES (?1, 1)", params![code_in])?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(Kiosk { id, code, is_active: true })
  }

  async fn find_active_kiosk(&self, code: String) -> Result<Option<Kiosk>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, code, is_active FROM kiosks WHERE code = ?1 AND is_active = 1",
                params![code],
                |row| Ok(Kiosk { id: row.get(0)?, code: row.get(1)?, is_active: row.get(2)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  // ── People ────────────────────────────────────────────────────────────────

  async fn get_person(&self, person: PersonRef) -> Result<Option<Person>> {
    Ok(self.conn.call(move |conn| Ok(fetch_person(conn, person)?)).await?)
  }

  async fn person_details(&self, person: PersonRef) -> Result<Option<PersonDetails>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let Some(user) = fetch_person(conn, person)? else {
            return Ok(None);
          };
          let t = Tables::of(person.kind);

          let mut stmt = conn.prepare(&format!(
            "SELECT m.name FROM ministries m
             JOIN {links} l ON l.ministry_id = m.id
             WHERE l.{col} = ?1
             ORDER BY m.name",
            links = t.links,
            col = t.column,
          ))?;
          let ministries = stmt
            .query_map(params![person.id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

          let elders = if person.is_elder() {
            Vec::new()
          } else {
            let mut stmt = conn.prepare(
              "SELECT DISTINCT e.first_name || ' ' || e.last_name
               FROM elders e
               JOIN elder_ministries em ON em.elder_id = e.id
               JOIN user_ministries um ON um.ministry_id = em.ministry_id
               WHERE um.user_id = ?1
               ORDER BY e.last_name, e.first_name",
            )?;
            stmt
              .query_map(params![person.id], |r| r.get(0))?
              .collect::<rusqlite::Result<Vec<String>>>()?
          };

          Ok(Some(PersonDetails { user, ministries, elders }))
        })
        .await?,
    )
  }

  async fn list_people(&self, search: Option<String>) -> Result<Vec<PersonSummary>> {
    let search = blank_to_none(search);
    let name_like = search.as_ref().map(|s| format!("%{}%", s.to_lowercase()));
    let digits = search
      .as_deref()
      .map(flock_core::person::digits_only)
      .unwrap_or_default();

    Ok(
      self
        .conn
        .call(move |conn| {
          let select = |kind: &str, table: &str| {
            format!(
              "SELECT '{kind}' AS kind, p.id AS id, p.first_name AS first_name,
                      p.last_name AS last_name, p.phone AS phone, p.alt_phone AS alt_phone,
                      p.role AS role, p.avatar AS avatar, p.family_id AS family_id,
                      f.family_name AS family_name
               FROM {table} p
               LEFT JOIN families f ON f.id = p.family_id
               WHERE ?1 IS NULL
                  OR LOWER(p.first_name) LIKE ?1
                  OR LOWER(p.last_name) LIKE ?1
                  OR (?2 <> '' AND (digits(p.phone) LIKE '%' || ?2 || '%'
                                 OR digits(p.alt_phone) LIKE '%' || ?2 || '%'))"
            )
          };
          let sql = format!(
            "{} UNION ALL {} ORDER BY last_name, first_name",
            select("user", "users"),
            select("elder", "elders"),
          );
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(params![name_like, digits], |row| {
              Ok(PersonSummary {
                id:          PersonRef { kind: decode_kind(row, 0)?, id: row.get(1)? },
                first_name:  row.get(2)?,
                last_name:   row.get(3)?,
                phone:       row.get(4)?,
                alt_phone:   row.get(5)?,
                role:        row.get(6)?,
                avatar:      row.get(7)?,
                family_id:   row.get(8)?,
                family_name: row.get(9)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn users_with_ministries(&self) -> Result<Vec<UserMinistryRow>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT u.id, u.first_name, u.last_name, m.name
             FROM users u
             LEFT JOIN user_ministries um ON um.user_id = u.id
             LEFT JOIN ministries m ON m.id = um.ministry_id
             ORDER BY u.last_name, u.first_name",
          )?;
          let rows = stmt
            .query_map([], |row| {
              Ok(UserMinistryRow {
                id:         row.get(0)?,
                first_name: row.get(1)?,
                last_name:  row.get(2)?,
                ministry:   row.get(3)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn list_elders(&self) -> Result<Vec<Person>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM elders ORDER BY first_name, last_name"
          ))?;
          let rows = stmt
            .query_map([], |row| decode_person(row, PersonKind::Elder))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn lookup_users_by_phone(&self, digits: String) -> Result<Vec<Person>> {
    if digits.is_empty() {
      return Ok(Vec::new());
    }
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM users
             WHERE digits(COALESCE(phone, '')) LIKE '%' || ?1 || '%'
                OR digits(COALESCE(alt_phone, '')) LIKE '%' || ?1 || '%'
             ORDER BY last_name, first_name
             LIMIT 25"
          ))?;
          let rows = stmt
            .query_map(params![digits], |row| decode_person(row, PersonKind::User))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn masterlist(&self) -> Result<Vec<MasterlistEntry>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut links: HashMap<PersonRef, Vec<(i64, String)>> = HashMap::new();
          let mut stmt = conn.prepare(
            "SELECT 'user', um.user_id, m.id, m.name
             FROM user_ministries um JOIN ministries m ON m.id = um.ministry_id
             UNION ALL
             SELECT 'elder', em.elder_id, m.id, m.name
             FROM elder_ministries em JOIN ministries m ON m.id = em.ministry_id
             ORDER BY 4",
          )?;
          let rows = stmt.query_map([], |row| {
            Ok((
              PersonRef { kind: decode_kind(row, 0)?, id: row.get(1)? },
              row.get::<_, i64>(2)?,
              row.get::<_, String>(3)?,
            ))
          })?;
          for row in rows {
            let (person, id, name) = row?;
            links.entry(person).or_default().push((id, name));
          }

          let mut people = Vec::new();
          for kind in [PersonKind::User, PersonKind::Elder] {
            let t = Tables::of(kind);
            let mut stmt = conn.prepare(&format!("SELECT {PERSON_COLUMNS} FROM {}", t.people))?;
            let rows = stmt
              .query_map([], |row| decode_person(row, kind))?
              .collect::<rusqlite::Result<Vec<_>>>()?;
            people.extend(rows);
          }
          people.sort_by(|a, b| {
            (a.first_name.as_str(), a.last_name.as_str())
              .cmp(&(b.first_name.as_str(), b.last_name.as_str()))
          });

          let entries = people
            .into_iter()
            .map(|p| {
              let person = p.person_ref();
              let (ministry_ids, ministries): (Vec<i64>, Vec<String>) =
                links.remove(&person).unwrap_or_default().into_iter().unzip();
              MasterlistEntry {
                id: person,
                first_name: p.first_name,
                last_name: p.last_name,
                email: p.email,
                phone: p.phone,
                alt_phone: p.alt_phone,
                role: p.role.as_deref().map(|r| display_role(r).to_owned()),
                avatar: p.avatar,
                active: p.active,
                gender: p.gender,
                ministries,
                ministry_ids,
              }
            })
            .collect();
          Ok(entries)
        })
        .await?,
    )
  }

  async fn create_person(&self, input: NewPerson) -> Result<Person> {
    let person = self
      .conn
      .call(move |conn| {
        let person = insert_person(conn, &input)?;
        Ok(fetch_person(conn, person)?)
      })
      .await?;
    person.ok_or_else(|| Error::NotFound("Person vanished after insert".into()))
  }

  async fn update_person(&self, person: PersonRef, update: PersonUpdate) -> Result<Person> {
    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(current) = fetch_person(&tx, person)? else {
          return Ok(None);
        };

        let target = update.target_kind(current.kind);
        let keep = |new: &Option<String>, old: Option<String>| match new {
          Some(v) if v.trim().is_empty() => None,
          Some(v) => Some(v.trim().to_owned()),
          None => old,
        };
        let merged = NewPerson {
          first_name: blank_to_none(update.first_name.clone()).unwrap_or(current.first_name),
          last_name:  blank_to_none(update.last_name.clone()).unwrap_or(current.last_name),
          email:      keep(&update.email, current.email),
          phone:      keep(&update.phone, current.phone),
          alt_phone:  keep(&update.alt_phone, current.alt_phone),
          role:       update.stored_role().or(current.role).or_else(|| {
            Some(if target == PersonKind::Elder { "elder" } else { "user" }.to_owned())
          }),
          gender:     keep(&update.gender, current.gender),
          avatar:     keep(&update.avatar, current.avatar),
          family_id:  update.family_id.or(current.family_id),
          active:     update.active.unwrap_or(current.active),
        };
        let new_ref = PersonRef { kind: target, id: current.id };

        let new_ref = if target == current.kind {
          let t = Tables::of(target);
          tx.execute(
            &format!(
              "UPDATE {} SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                 alt_phone = ?5, role = ?6, gender = ?7, avatar = ?8, family_id = ?9, active = ?10
               WHERE id = ?11",
              t.people
            ),
            params![
              merged.first_name,
              merged.last_name,
              merged.email,
              merged.phone,
              merged.alt_phone,
              merged.role,
              merged.gender,
              merged.avatar,
              merged.family_id,
              merged.active,
              current.id,
            ],
          )?;
          new_ref
        } else {
          let old = Tables::of(current.kind);
          let new = Tables::of(target);
          let mut row = merged;
          // The role tag decides the destination table.
          if row.kind() != target {
            row.role = Some(target.prefix().to_owned());
          }
          let moved = insert_person(&tx, &row)?;

          if update.ministry_ids.is_none() {
            tx.execute(
              &format!(
                "INSERT OR IGNORE INTO {new_links} ({new_col}, ministry_id)
                 SELECT ?1, ministry_id FROM {old_links} WHERE {old_col} = ?2",
                new_links = new.links,
                new_col = new.column,
                old_links = old.links,
                old_col = old.column,
              ),
              params![moved.id, current.id],
            )?;
          }
          tx.execute(
            &format!(
              "UPDATE check_ins SET {new_col} = ?1, {old_col} = NULL WHERE {old_col} = ?2",
              new_col = new.column,
              old_col = old.column,
            ),
            params![moved.id, current.id],
          )?;
          tx.execute(&format!("DELETE FROM {} WHERE id = ?1", old.people), params![current.id])?;
          moved
        };

        if let Some(ids) = &update.ministry_ids {
          let t = Tables::of(new_ref.kind);
          tx.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", t.links, t.column),
            params![new_ref.id],
          )?;
          let mut stmt = tx.prepare(&format!(
            "INSERT OR IGNORE INTO {} ({}, ministry_id)
             SELECT ?1, id FROM ministries WHERE id = ?2",
            t.links, t.column
          ))?;
          for ministry_id in ids {
            stmt.execute(params![new_ref.id, ministry_id])?;
          }
        }

        let result = fetch_person(&tx, new_ref)?;
        tx.commit()?;
        Ok(result)
      })
      .await?;

    updated.ok_or_else(|| Error::NotFound("User not found".into()))
  }

  async fn set_active(&self, person: PersonRef, active: bool) -> Result<bool> {
    let t = Tables::of(person.kind);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("UPDATE {} SET active = ?1 WHERE id = ?2", t.people),
          params![active, person.id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn delete_person(&self, person: PersonRef) -> Result<bool> {
    let t = Tables::of(person.kind);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(&format!("DELETE FROM {} WHERE id = ?1", t.people), params![person.id])?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn find_user(
    &self,
    email: Option<String>,
    phone_digits: Option<String>,
  ) -> Result<Option<Person>> {
    let email = email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
    let phone_digits = phone_digits.filter(|d| !d.is_empty());

    Ok(
      self
        .conn
        .call(move |conn| {
          if let Some(email) = email {
            let found = conn
              .query_row(
                &format!("SELECT {PERSON_COLUMNS} FROM users WHERE email = ?1 LIMIT 1"),
                params![email],
                |row| decode_person(row, PersonKind::User),
              )
              .optional()?;
            if found.is_some() {
              return Ok(found);
            }
          }
          if let Some(digits) = phone_digits {
            let found = conn
              .query_row(
                &format!(
                  "SELECT {PERSON_COLUMNS} FROM users
                   WHERE digits(COALESCE(phone, '')) = ?1
                   ORDER BY id LIMIT 1"
                ),
                params![digits],
                |row| decode_person(row, PersonKind::User),
              )
              .optional()?;
            return Ok(found);
          }
          Ok(None)
        })
        .await?,
    )
  }

  async fn import_person(&self, record: ImportRecord) -> Result<Person> {
    let person = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut input = record.person;

        if let Some(name) = &record.family_name {
          let existing: Option<i64> = tx
            .query_row(
              "SELECT id FROM families WHERE family_name = ?1 ORDER BY id LIMIT 1",
              params![name],
              |r| r.get(0),
            )
            .optional()?;
          input.family_id = Some(match existing {
            Some(id) => id,
            None => {
              tx.execute("INSERT INTO families (family_name) VALUES (?1)", params![name])?;
              tx.last_insert_rowid()
            }
          });
        }

        let kind = input.kind();
        let t = Tables::of(kind);
        let person = match &input.email {
          Some(email) => {
            // Elders keep their role tag on re-import.
            let role_update = if kind == PersonKind::User { ", role = excluded.role" } else { "" };
            tx.execute(
              &format!(
                "INSERT INTO {table} (first_name, last_name, email, phone, role, family_id, gender, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (email) DO UPDATE SET
                   first_name = excluded.first_name, last_name = excluded.last_name,
                   phone = excluded.phone, family_id = excluded.family_id,
                   gender = excluded.gender, active = excluded.active{role_update}",
                table = t.people,
              ),
              params![
                input.first_name,
                input.last_name,
                email,
                input.phone,
                input.role,
                input.family_id,
                input.gender,
                input.active,
              ],
            )?;
            let id: i64 = tx.query_row(
              &format!("SELECT id FROM {} WHERE email = ?1", t.people),
              params![email],
              |r| r.get(0),
            )?;
            PersonRef { kind, id }
          }
          None => insert_person(&tx, &input)?,
        };

        let result = fetch_person(&tx, person)?;
        tx.commit()?;
        Ok(result)
      })
      .await?;
    person.ok_or_else(|| Error::NotFound("Person vanished after import".into()))
  }

  // ── Families ──────────────────────────────────────────────────────────────

  async fn list_families(&self) -> Result<Vec<Family>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt =
            conn.prepare("SELECT id, family_name FROM families ORDER BY family_name")?;
          let rows = stmt
            .query_map([], |row| Ok(Family { id: row.get(0)?, family_name: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn create_family(&self, family_name: String) -> Result<Family> {
    let name = family_name.trim().to_owned();
    let name_in = name.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute("INSERT INTO families (family_name) VALUES (?1)", params![name_in])?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(Family { id, family_name: name })
  }

  async fn family_members(&self, family_id: i64) -> Result<Vec<FamilyMember>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT 'user', u.id, u.first_name, u.last_name, u.phone, u.role, u.avatar,
                    u.family_id, f.family_name
             FROM users u
             LEFT JOIN families f ON f.id = u.family_id
             WHERE u.family_id = ?1
             ORDER BY u.last_name, u.first_name",
          )?;
          let rows = stmt
            .query_map(params![family_id], decode_family_member)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn search_families(&self, search: FamilySearch) -> Result<Vec<FamilyMember>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let select = |kind: &str, table: &str, role: &str, filter: &str| {
            format!(
              "SELECT '{kind}' AS kind, p.id AS id, p.first_name AS first_name,
                      p.last_name AS last_name, p.phone AS phone, {role} AS role,
                      p.avatar AS avatar, p.family_id AS family_id,
                      f.family_name AS family_name
               FROM {table} p
               LEFT JOIN families f ON f.id = p.family_id
               WHERE {filter}"
            )
          };
          let (filter, param): (&str, rusqlite::types::Value) = match search {
            FamilySearch::ById(id) => ("p.family_id = ?1", id.into()),
            FamilySearch::ByName(name) => (
              "LOWER(TRIM(p.first_name)) || ' ' || LOWER(TRIM(p.last_name)) LIKE ?1",
              format!("%{}%", name.trim().to_lowercase()).into(),
            ),
          };
          let sql = format!(
            "{} UNION ALL {} ORDER BY last_name, first_name",
            select("user", "users", "p.role", filter),
            select("elder", "elders", "'elder'", filter),
          );
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(params![param], decode_family_member)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Ministries ────────────────────────────────────────────────────────────

  async fn list_ministries(&self, active_only: bool) -> Result<Vec<Ministry>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT id, name, is_active FROM ministries
             WHERE ?1 = 0 OR is_active = 1
             ORDER BY name",
          )?;
          let rows = stmt
            .query_map(params![active_only], |row| {
              Ok(Ministry { id: row.get(0)?, name: row.get(1)?, active: row.get(2)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn create_ministry(&self, name: String, active: bool) -> Result<Ministry> {
    let name = name.trim().to_owned();
    let name_in = name.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ministries (name, is_active) VALUES (?1, ?2)",
          params![name_in, active],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(Ministry { id, name, active })
  }

  async fn update_ministry(&self, id: i64, name: String, active: bool) -> Result<Option<Ministry>> {
    let name = name.trim().to_owned();
    let name_in = name.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE ministries SET name = ?1, is_active = ?2 WHERE id = ?3",
          params![name_in, active, id],
        )?)
      })
      .await?;
    Ok((changed > 0).then_some(Ministry { id, name, active }))
  }

  async fn delete_ministry(&self, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM ministries WHERE id = ?1", params![id])?))
      .await?;
    Ok(changed > 0)
  }

  async fn find_ministry(&self, name: String) -> Result<Option<Ministry>> {
    let name = name.trim().to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name, is_active FROM ministries WHERE name = ?1",
                params![name],
                |row| Ok(Ministry { id: row.get(0)?, name: row.get(1)?, active: row.get(2)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn ensure_ministry(&self, name: String) -> Result<Ministry> {
    let name = name.trim().to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          // Insert and lookup in one call: concurrent intakes of a new name
          // must resolve to the same row.
          conn.execute(
            "INSERT OR IGNORE INTO ministries (name, is_active) VALUES (?1, 1)",
            params![name],
          )?;
          Ok(conn.query_row(
            "SELECT id, name, is_active FROM ministries WHERE name = ?1",
            params![name],
            |row| Ok(Ministry { id: row.get(0)?, name: row.get(1)?, active: row.get(2)? }),
          )?)
        })
        .await?,
    )
  }

  async fn attach_ministry(&self, person: PersonRef, ministry_id: i64) -> Result<bool> {
    let t = Tables::of(person.kind);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("INSERT OR IGNORE INTO {} ({}, ministry_id) VALUES (?1, ?2)", t.links, t.column),
          params![person.id, ministry_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn detach_ministry(&self, person: PersonRef, ministry_id: i64) -> Result<bool> {
    let t = Tables::of(person.kind);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("DELETE FROM {} WHERE {} = ?1 AND ministry_id = ?2", t.links, t.column),
          params![person.id, ministry_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn detach_ministries(&self, user_id: i64, names: Vec<String>) -> Result<DetachReport> {
    let names = dedup_names(names);
    if names.is_empty() {
      return Ok(DetachReport::default());
    }

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT id, name FROM ministries WHERE name IN ({})",
            placeholders(names.len())
          ))?;
          let matched = stmt
            .query_map(params_from_iter(names.iter()), |row| {
              Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

          let known: Vec<String> = matched.iter().map(|(_, n)| n.to_lowercase()).collect();
          let not_found = names
            .iter()
            .filter(|n| !known.contains(&n.to_lowercase()))
            .cloned()
            .collect();
          let found = matched.iter().map(|(_, n)| n.clone()).collect();

          let removed = if matched.is_empty() {
            0
          } else {
            conn.execute(
              &format!(
                "DELETE FROM user_ministries WHERE user_id = ? AND ministry_id IN ({})",
                placeholders(matched.len())
              ),
              params_from_iter(std::iter::once(user_id).chain(matched.iter().map(|(id, _)| *id))),
            )?
          };

          Ok(DetachReport { found, not_found, removed })
        })
        .await?,
    )
  }

  // ── Events ────────────────────────────────────────────────────────────────

  async fn list_events(&self) -> Result<Vec<Event>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             ORDER BY event_date DESC, event_time IS NULL, event_time DESC"
          ))?;
          let rows = stmt
            .query_map([], decode_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn events_since(&self, cutoff: NaiveDateTime, limit: Option<usize>) -> Result<Vec<Event>> {
    let cutoff = encode_event_cutoff(cutoff);
    let limit = limit.map_or(-1, |l| l as i64);
    Ok(
      self
        .conn
        .call(move |conn| Ok(query_events_since(conn, &cutoff, limit)?))
        .await?,
    )
  }

  async fn get_event(&self, id: i64) -> Result<Option<Event>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                decode_event,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_event(&self, input: NewEvent) -> Result<Event> {
    let date = encode_date(input.event_date);
    let time = input.event_time.map(encode_time);
    let (title, location, description) =
      (input.title.clone(), input.location.clone(), input.description.clone());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (title, event_date, event_time, location, description)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![title, date, time, location, description],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(Event {
      id,
      title: input.title,
      event_date: input.event_date,
      event_time: input.event_time,
      location: input.location,
      description: input.description,
    })
  }

  async fn update_event(&self, id: i64, input: NewEvent) -> Result<Option<Event>> {
    let date = encode_date(input.event_date);
    let time = input.event_time.map(encode_time);
    let (title, location, description) =
      (input.title.clone(), input.location.clone(), input.description.clone());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE events
           SET title = ?1, event_date = ?2, event_time = ?3, location = ?4, description = ?5
           WHERE id = ?6",
          params![title, date, time, location, description, id],
        )?)
      })
      .await?;
    Ok((changed > 0).then(|| Event {
      id,
      title: input.title,
      event_date: input.event_date,
      event_time: input.event_time,
      location: input.location,
      description: input.description,
    }))
  }

  async fn delete_event(&self, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM events WHERE id = ?1", params![id])?))
      .await?;
    Ok(changed > 0)
  }

  // ── Check-ins ─────────────────────────────────────────────────────────────

  async fn check_in(&self, person: PersonRef, event_id: i64, at: NaiveDateTime) -> Result<CheckIn> {
    let at_str = encode_datetime(at);
    let outcome = self
      .conn
      .call(move |conn| {
        let t = Tables::of(person.kind);
        if !person_exists(conn, person)? {
          return Ok(StrictCheckIn::UnknownPerson);
        }
        if !row_exists(conn, "SELECT 1 FROM events WHERE id = ?1", event_id)? {
          return Ok(StrictCheckIn::UnknownEvent);
        }
        let duplicate = conn
          .query_row(
            &format!("SELECT 1 FROM check_ins WHERE {} = ?1 AND event_id = ?2", t.column),
            params![person.id, event_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if duplicate {
          return Ok(StrictCheckIn::Duplicate);
        }
        conn.execute(
          &format!("INSERT INTO check_ins (event_id, {}, checkin_time) VALUES (?1, ?2, ?3)", t.column),
          params![event_id, person.id, at_str],
        )?;
        Ok(StrictCheckIn::Inserted(conn.last_insert_rowid()))
      })
      .await?;

    match outcome {
      StrictCheckIn::Inserted(id) => Ok(checkin_row(id, person, event_id, at)),
      StrictCheckIn::UnknownPerson => Err(Error::Invalid("Invalid user or elder ID.".into())),
      StrictCheckIn::UnknownEvent => Err(Error::Invalid("Invalid event ID.".into())),
      StrictCheckIn::Duplicate => Err(Error::Conflict("Already checked in for this event.".into())),
    }
  }

  async fn check_in_if_absent(
    &self,
    person: PersonRef,
    event_id: i64,
    at: NaiveDateTime,
  ) -> Result<Option<CheckIn>> {
    let at_str = encode_datetime(at);
    let id = self
      .conn
      .call(move |conn| Ok(insert_checkin_if_absent(conn, person, event_id, &at_str)?))
      .await?;
    Ok(id.map(|id| checkin_row(id, person, event_id, at)))
  }

  async fn bulk_check_in(
    &self,
    event_id: i64,
    people: Vec<PersonRef>,
    at: NaiveDateTime,
  ) -> Result<BulkOutcome> {
    let at_str = encode_datetime(at);
    let total = people.len();
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for person in people {
          if insert_checkin_if_absent(&tx, person, event_id, &at_str)?.is_some() {
            inserted += 1;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    Ok(BulkOutcome { inserted, skipped: total - inserted })
  }

  async fn bulk_check_out(&self, event_id: i64, people: Vec<PersonRef>) -> Result<usize> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let mut affected = 0;
          for person in people {
            let col = Tables::of(person.kind).column;
            affected += tx.execute(
              &format!(
                "DELETE FROM check_ins WHERE id IN (
                   SELECT id FROM check_ins
                   WHERE event_id = ?1 AND {col} = ?2
                   ORDER BY checkin_time DESC, id DESC
                   LIMIT 1
                 )"
              ),
              params![event_id, person.id],
            )?;
          }
          tx.commit()?;
          Ok(affected)
        })
        .await?,
    )
  }

  async fn delete_checkin(&self, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM check_ins WHERE id = ?1", params![id])?))
      .await?;
    Ok(changed > 0)
  }

  async fn delete_checkins(&self, ids: Vec<i64>) -> Result<usize> {
    if ids.is_empty() {
      return Ok(0);
    }
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.execute(
            &format!("DELETE FROM check_ins WHERE id IN ({})", placeholders(ids.len())),
            params_from_iter(ids.iter()),
          )?)
        })
        .await?,
    )
  }

  async fn list_checkins(&self) -> Result<Vec<CheckInListing>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT c.id, c.checkin_time,
                    COALESCE(u.first_name, e.first_name), COALESCE(u.last_name, e.last_name),
                    COALESCE(u.avatar, e.avatar), COALESCE(u.role, e.role),
                    ev.title, c.user_id, c.elder_id, c.event_id
             FROM check_ins c
             LEFT JOIN users u ON u.id = c.user_id
             LEFT JOIN elders e ON e.id = c.elder_id
             LEFT JOIN events ev ON ev.id = c.event_id
             ORDER BY c.checkin_time DESC, c.id DESC",
          )?;
          let rows = stmt
            .query_map([], |row| {
              Ok(CheckInListing {
                id:           row.get(0)?,
                checkin_time: datetime_at(row, 1)?,
                first_name:   row.get(2)?,
                last_name:    row.get(3)?,
                avatar:       row.get(4)?,
                role:         row.get(5)?,
                event_title:  row.get(6)?,
                user_id:      row.get(7)?,
                elder_id:     row.get(8)?,
                event_id:     row.get(9)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn event_checkins(&self, event_id: i64) -> Result<Vec<CheckInDetail>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT c.id, c.checkin_time, c.user_id, c.elder_id,
                    COALESCE(u.first_name, e.first_name), COALESCE(u.last_name, e.last_name),
                    COALESCE(u.avatar, e.avatar), COALESCE(u.role, e.role),
                    ev.title, ev.location, ev.event_time
             FROM check_ins c
             LEFT JOIN users u ON u.id = c.user_id
             LEFT JOIN elders e ON e.id = c.elder_id
             LEFT JOIN events ev ON ev.id = c.event_id
             WHERE c.event_id = ?1
             ORDER BY c.checkin_time, c.id",
          )?;
          let rows = stmt
            .query_map(params![event_id], |row| {
              Ok(CheckInDetail {
                checkin_id:     row.get(0)?,
                checkin_time:   datetime_at(row, 1)?,
                user_id:        row.get(2)?,
                elder_id:       row.get(3)?,
                first_name:     row.get(4)?,
                last_name:      row.get(5)?,
                avatar:         row.get(6)?,
                role:           row.get(7)?,
                event_title:    row.get(8)?,
                event_location: row.get(9)?,
                event_time:     time_at(row, 10)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn kiosk_search(&self, query: KioskQuery) -> Result<Vec<KioskMatch>> {
    let text = query.text.trim().to_owned();
    if text.is_empty() {
      return Ok(Vec::new());
    }
    let mode = match query.mode {
      KioskSearchMode::Name => "name",
      KioskSearchMode::Phone => "phone",
    };
    let phone_like = format!("%{}%", flock_core::person::digits_only(&text));
    let name_like = format!("%{text}%");
    let limit = query.limit as i64;
    let event_id = query.event_id;

    Ok(
      self
        .conn
        .call(move |conn| {
          let select = |kind: &str, table: &str, col: &str| {
            format!(
              "SELECT '{kind}' AS kind, p.id AS id, p.first_name AS first_name,
                      p.last_name AS last_name, p.phone AS phone, p.family_id AS family_id,
                      f.family_name AS family_name, lc.checkin_time AS last_time,
                      lc.event_id AS last_event_id, ev.title AS last_event,
                      ev.location AS last_location
               FROM {table} p
               LEFT JOIN families f ON f.id = p.family_id
               LEFT JOIN check_ins lc ON lc.id = (
                 SELECT c.id FROM check_ins c
                 WHERE c.{col} = p.id AND (?3 IS NULL OR c.event_id = ?3)
                 ORDER BY c.checkin_time DESC, c.id DESC
                 LIMIT 1
               )
               LEFT JOIN events ev ON ev.id = lc.event_id
               WHERE CASE
                 WHEN ?2 = 'phone' THEN digits(COALESCE(p.phone, '')) LIKE ?1
                 ELSE (p.first_name || ' ' || p.last_name) LIKE ?4
                   OR p.first_name LIKE ?4
                   OR p.last_name LIKE ?4
               END"
            )
          };
          let sql = format!(
            "{} UNION ALL {} ORDER BY last_name, first_name LIMIT ?5",
            select("user", "users", "user_id"),
            select("elder", "elders", "elder_id"),
          );
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(params![phone_like, mode, event_id, name_like, limit], |row| {
              let last_checkin = match opt_datetime_at(row, 7)? {
                Some(time) => Some(LastCheckIn {
                  time,
                  event_id: row.get(8)?,
                  event_title: row.get(9)?,
                  event_location: row.get(10)?,
                }),
                None => None,
              };
              Ok(KioskMatch {
                person: PersonRef { kind: decode_kind(row, 0)?, id: row.get(1)? },
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                phone: row.get(4)?,
                family_id: row.get(5)?,
                family_name: row.get(6)?,
                last_checkin,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn dashboard(&self, today: NaiveDate, upcoming_cutoff: NaiveDateTime) -> Result<Dashboard> {
    let today = encode_date(today);
    let cutoff = encode_event_cutoff(upcoming_cutoff);

    Ok(
      self
        .conn
        .call(move |conn| {
          let count = |sql: &str, p: &[&dyn ToSql]| -> rusqlite::Result<u64> {
            conn.query_row(sql, p, |r| r.get::<_, i64>(0)).map(|n| n as u64)
          };
          let stats = DashboardStats {
            check_ins_today:   count(
              "SELECT COUNT(*) FROM check_ins WHERE substr(checkin_time, 1, 10) = ?1",
              params![today],
            )?,
            total_users:       count("SELECT COUNT(*) FROM users", params![])?,
            total_elders:      count("SELECT COUNT(*) FROM elders", params![])?,
            active_ministries: count("SELECT COUNT(*) FROM ministries WHERE is_active = 1", params![])?,
            upcoming_events:   count("SELECT COUNT(*) FROM events WHERE event_date >= ?1", params![today])?,
          };

          let upcoming_events = query_events_since(conn, &cutoff, 7)?;

          let mut stmt = conn.prepare(
            "SELECT c.id, c.checkin_time,
                    COALESCE(u.first_name, e.first_name), COALESCE(u.last_name, e.last_name),
                    CASE WHEN c.user_id IS NOT NULL THEN (
                      SELECT MIN(m.name) FROM user_ministries um
                      JOIN ministries m ON m.id = um.ministry_id
                      WHERE um.user_id = c.user_id
                    ) ELSE (
                      SELECT MIN(m.name) FROM elder_ministries em
                      JOIN ministries m ON m.id = em.ministry_id
                      WHERE em.elder_id = c.elder_id
                    ) END,
                    c.user_id IS NOT NULL, c.event_id, ev.title
             FROM check_ins c
             LEFT JOIN users u ON u.id = c.user_id
             LEFT JOIN elders e ON e.id = c.elder_id
             LEFT JOIN events ev ON ev.id = c.event_id
             ORDER BY c.checkin_time DESC, c.id DESC",
          )?;
          let all_checkins = stmt
            .query_map([], |row| {
              Ok(DashboardCheckIn {
                id:           row.get(0)?,
                checkin_time: datetime_at(row, 1)?,
                first_name:   row.get(2)?,
                last_name:    row.get(3)?,
                ministry:     row.get(4)?,
                kind:         if row.get::<_, bool>(5)? { "User" } else { "Elder" },
                event_id:     row.get(6)?,
                event_title:  row.get(7)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

          Ok(Dashboard { stats, upcoming_events, all_checkins })
        })
        .await?,
    )
  }

  async fn attendees(&self) -> Result<Vec<Attendee>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT 'user' AS kind, u.id AS id, u.first_name AS first_name,
                    u.last_name AS last_name, u.email AS email, u.phone AS phone,
                    ev.title AS event_title, ev.event_date AS event_date
             FROM check_ins ci
             JOIN users u ON u.id = ci.user_id
             JOIN events ev ON ev.id = ci.event_id
             UNION ALL
             SELECT 'elder', e.id, e.first_name, e.last_name, e.email, e.phone,
                    ev.title, ev.event_date
             FROM check_ins ci
             JOIN elders e ON e.id = ci.elder_id
             JOIN events ev ON ev.id = ci.event_id
             ORDER BY event_date DESC, last_name",
          )?;
          let rows = stmt
            .query_map([], |row| {
              Ok(Attendee {
                kind:        decode_kind(row, 0)?,
                id:          row.get(1)?,
                first_name:  row.get(2)?,
                last_name:   row.get(3)?,
                email:       row.get(4)?,
                phone:       row.get(5)?,
                event_title: row.get(6)?,
                event_date:  date_at(row, 7)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn ministry_attendance(
    &self,
    ministry_id: i64,
    event_id: Option<i64>,
  ) -> Result<Vec<MinistryAttendance>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT ci.id, u.id, u.first_name, u.last_name, u.email, u.phone, u.role,
                    ev.title, ev.event_date, ci.checkin_time
             FROM check_ins ci
             JOIN users u ON u.id = ci.user_id
             JOIN user_ministries um ON um.user_id = u.id
             JOIN events ev ON ev.id = ci.event_id
             WHERE um.ministry_id = ?1
               AND (?2 IS NULL OR ci.event_id = ?2)
             ORDER BY ev.event_date DESC, u.last_name, u.first_name",
          )?;
          let rows = stmt
            .query_map(params![ministry_id, event_id], |row| {
              Ok(MinistryAttendance {
                checkin_id:   row.get(0)?,
                user_id:      row.get(1)?,
                first_name:   row.get(2)?,
                last_name:    row.get(3)?,
                email:        row.get(4)?,
                phone:        row.get(5)?,
                role:         row.get(6)?,
                event_title:  row.get(7)?,
                event_date:   date_at(row, 8)?,
                checkin_time: datetime_at(row, 9)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn ministry_absent(
    &self,
    ministry_id: Option<i64>,
    event_id: Option<i64>,
  ) -> Result<Vec<AbsentMember>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT u.id, u.first_name, u.last_name, u.email, u.phone
             FROM ministries m
             JOIN user_ministries um ON um.ministry_id = m.id
             JOIN users u ON u.id = um.user_id
             WHERE (?1 IS NULL OR m.id = ?1)
               AND NOT EXISTS (
                 SELECT 1 FROM check_ins c
                 WHERE c.user_id = u.id AND (?2 IS NULL OR c.event_id = ?2)
               )
             ORDER BY m.name, u.last_name, u.first_name",
          )?;
          let rows = stmt
            .query_map(params![ministry_id, event_id], |row| {
              Ok(AbsentMember {
                user_id:    row.get(0)?,
                first_name: row.get(1)?,
                last_name:  row.get(2)?,
                email:      row.get(3)?,
                phone:      row.get(4)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn elder_report(&self, elder_id: i64, event_id: Option<i64>) -> Result<Vec<ElderReportRow>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT u.first_name, u.last_name, u.email, ev.title, ev.event_date, m.name
             FROM check_ins ci
             JOIN users u ON u.id = ci.user_id
             JOIN user_ministries um ON um.user_id = u.id
             JOIN ministries m ON m.id = um.ministry_id
             JOIN elder_ministries em ON em.ministry_id = m.id
             JOIN events ev ON ev.id = ci.event_id
             WHERE em.elder_id = ?1
               AND (?2 IS NULL OR ci.event_id = ?2)
             ORDER BY ev.event_date DESC, u.last_name",
          )?;
          let rows = stmt
            .query_map(params![elder_id, event_id], |row| {
              Ok(ElderReportRow {
                first_name:    row.get(0)?,
                last_name:     row.get(1)?,
                email:         row.get(2)?,
                event_title:   row.get(3)?,
                event_date:    date_at(row, 4)?,
                ministry_name: row.get(5)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn elder_absent(&self, elder_id: i64, event_id: i64) -> Result<Vec<ElderAbsentRow>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT u.first_name, u.last_name, u.email, m.name
             FROM users u
             JOIN user_ministries um ON um.user_id = u.id
             JOIN ministries m ON m.id = um.ministry_id
             JOIN elder_ministries em ON em.ministry_id = m.id
             WHERE em.elder_id = ?1
               AND NOT EXISTS (
                 SELECT 1 FROM check_ins c WHERE c.user_id = u.id AND c.event_id = ?2
               )
             ORDER BY m.name, u.last_name",
          )?;
          let rows = stmt
            .query_map(params![elder_id, event_id], |row| {
              Ok(ElderAbsentRow {
                first_name:    row.get(0)?,
                last_name:     row.get(1)?,
                email:         row.get(2)?,
                ministry_name: row.get(3)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn roster(&self, ministry_id: i64) -> Result<Vec<RosterRow>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT u.id, u.first_name, u.last_name, u.email, u.phone, m.name
             FROM users u
             JOIN user_ministries um ON um.user_id = u.id
             JOIN ministries m ON m.id = um.ministry_id
             WHERE m.id = ?1
             ORDER BY u.last_name ASC",
          )?;
          let rows = stmt
            .query_map(params![ministry_id], |row| {
              Ok(RosterRow {
                id:         row.get(0)?,
                first_name: row.get(1)?,
                last_name:  row.get(2)?,
                email:      row.get(3)?,
                phone:      row.get(4)?,
                ministry:   row.get(5)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn members_without_active_ministry(&self, active_only: bool) -> Result<Vec<MemberStatus>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT u.id, u.first_name, u.last_name, u.email, u.phone, u.active
             FROM users u
             WHERE NOT EXISTS (
               SELECT 1 FROM user_ministries um
               JOIN ministries m ON m.id = um.ministry_id AND m.is_active = 1
               WHERE um.user_id = u.id
             )
               AND (?1 = 0 OR u.active = 1)
             ORDER BY LOWER(u.last_name), LOWER(u.first_name)",
          )?;
          let rows = stmt
            .query_map(params![active_only], |row| {
              Ok(MemberStatus {
                id:         row.get(0)?,
                first_name: row.get(1)?,
                last_name:  row.get(2)?,
                email:      row.get(3)?,
                phone:      row.get(4)?,
                active:     row.get(5)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn inactive_members(&self) -> Result<Vec<InactiveMember>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut names: HashMap<i64, Vec<String>> = HashMap::new();
          let mut stmt = conn.prepare(
            "SELECT DISTINCT um.user_id, m.name
             FROM user_ministries um
             JOIN ministries m ON m.id = um.ministry_id AND m.is_active = 1
             JOIN users u ON u.id = um.user_id AND u.active = 0
             ORDER BY m.name",
          )?;
          let links = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
          for link in links {
            let (user_id, name) = link?;
            names.entry(user_id).or_default().push(name);
          }

          let mut stmt = conn.prepare(
            "SELECT id, first_name, last_name, email, phone, active
             FROM users
             WHERE active = 0
             ORDER BY last_name, first_name",
          )?;
          let rows = stmt
            .query_map([], |row| {
              let id: i64 = row.get(0)?;
              Ok(InactiveMember {
                id,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                phone: row.get(4)?,
                active: row.get(5)?,
                ministries: names.get(&id).map(|n| n.join(", ")).unwrap_or_default(),
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }
}
