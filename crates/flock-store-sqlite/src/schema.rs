//! SQL schema for the Flock SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS admins (
    id            INTEGER PRIMARY KEY,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    email         TEXT,
    phone         TEXT,
    username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,           -- argon2 PHC string
    role          TEXT NOT NULL DEFAULT 'admin'
);

CREATE TABLE IF NOT EXISTS kiosks (
    id        INTEGER PRIMARY KEY,
    code      TEXT NOT NULL UNIQUE,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS families (
    id          INTEGER PRIMARY KEY,
    family_name TEXT NOT NULL
);

-- users and elders are parallel tables; a person lives in exactly one.
CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name  TEXT NOT NULL,
    email      TEXT UNIQUE COLLATE NOCASE,
    phone      TEXT,
    alt_phone  TEXT,
    role       TEXT,                        -- 'user' | 'volunteer' | 'staff' | ...
    gender     TEXT,
    avatar     TEXT,
    family_id  INTEGER REFERENCES families(id) ON DELETE SET NULL,
    active     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS elders (
    id         INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name  TEXT NOT NULL,
    email      TEXT UNIQUE COLLATE NOCASE,
    phone      TEXT,
    alt_phone  TEXT,
    role       TEXT DEFAULT 'elder',
    gender     TEXT,
    avatar     TEXT,
    family_id  INTEGER REFERENCES families(id) ON DELETE SET NULL,
    active     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS ministries (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    is_active INTEGER NOT NULL DEFAULT 1
);

-- Deleting a ministry that still has links fails; deleting a person drops
-- their links.
CREATE TABLE IF NOT EXISTS user_ministries (
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    ministry_id INTEGER NOT NULL REFERENCES ministries(id),
    PRIMARY KEY (user_id, ministry_id)
);

CREATE TABLE IF NOT EXISTS elder_ministries (
    elder_id    INTEGER NOT NULL REFERENCES elders(id) ON DELETE CASCADE,
    ministry_id INTEGER NOT NULL REFERENCES ministries(id),
    PRIMARY KEY (elder_id, ministry_id)
);

CREATE TABLE IF NOT EXISTS events (
    id          INTEGER PRIMARY KEY,
    title       TEXT NOT NULL,
    event_date  TEXT NOT NULL,             -- YYYY-MM-DD, wall clock
    event_time  TEXT,                      -- HH:MM, wall clock
    location    TEXT,
    description TEXT
);

CREATE TABLE IF NOT EXISTS check_ins (
    id           INTEGER PRIMARY KEY,
    event_id     INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    user_id      INTEGER REFERENCES users(id) ON DELETE CASCADE,
    elder_id     INTEGER REFERENCES elders(id) ON DELETE CASCADE,
    checkin_time TEXT NOT NULL,            -- YYYY-MM-DD HH:MM:SS, wall clock
    CHECK ((user_id IS NULL) <> (elder_id IS NULL))
);

CREATE INDEX IF NOT EXISTS users_family_idx      ON users(family_id);
CREATE INDEX IF NOT EXISTS elders_family_idx     ON elders(family_id);
CREATE INDEX IF NOT EXISTS user_min_ministry_idx ON user_ministries(ministry_id);
CREATE INDEX IF NOT EXISTS elder_min_ministry_idx ON elder_ministries(ministry_id);
CREATE INDEX IF NOT EXISTS events_date_idx       ON events(event_date, event_time);
CREATE INDEX IF NOT EXISTS check_ins_event_idx   ON check_ins(event_id);
CREATE INDEX IF NOT EXISTS check_ins_user_idx    ON check_ins(user_id, event_id);
CREATE INDEX IF NOT EXISTS check_ins_elder_idx   ON check_ins(elder_id, event_id);

PRAGMA user_version = 1;
";
