//! Schema bootstrap.
//!
//! Tables are created with `IF NOT EXISTS`, so bootstrapping an existing
//! database is a no-op. Non-negativity and uniqueness are also enforced by
//! constraints, independent of the guarded updates in the store.

/// Table definitions
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id            BIGINT PRIMARY KEY CHECK (id > 0),
    display_name  TEXT   NOT NULL,
    balance       BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0)
);

CREATE TABLE IF NOT EXISTS tournaments (
    id           BIGINT    PRIMARY KEY CHECK (id > 0),
    deposit      BIGINT    NOT NULL CHECK (deposit >= 0),
    prize_pool   BIGINT    NOT NULL DEFAULT 0 CHECK (prize_pool >= 0),
    status       TEXT      NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'finished')),
    winner_id    BIGINT    REFERENCES players (id),
    prize_paid   BIGINT    CHECK (prize_paid >= 0),
    created_at   TIMESTAMP NOT NULL DEFAULT NOW(),
    finished_at  TIMESTAMP
);

CREATE INDEX IF NOT EXISTS tournaments_status_idx ON tournaments (status);

CREATE TABLE IF NOT EXISTS enrollments (
    player_id      BIGINT NOT NULL REFERENCES players (id) ON UPDATE CASCADE,
    tournament_id  BIGINT NOT NULL REFERENCES tournaments (id) ON UPDATE CASCADE,
    CONSTRAINT enrollments_pkey PRIMARY KEY (player_id, tournament_id)
);

CREATE INDEX IF NOT EXISTS enrollments_tournament_idx ON enrollments (tournament_id);
"#;

/// Demo players inserted when seeding is enabled
pub const DEMO_PLAYERS: &[(i64, &str)] = &[(1, "testuser"), (2, "testuser2")];

/// Seed statement for one demo player
pub const SEED_PLAYER: &str = "INSERT INTO players (id, display_name, balance)
     VALUES ($1, $2, 0)
     ON CONFLICT (id) DO NOTHING";
