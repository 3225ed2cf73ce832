use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // Axis ranges are latitude ±180 and longitude ±90, matching the validators.
        conn.execute_batch(
            r#"
            CREATE TABLE Moments (
                ID          INTEGER PRIMARY KEY AUTOINCREMENT,
                UserID      TEXT NOT NULL CHECK (length(UserID) BETWEEN 6 AND 64),
                Latitude    REAL NOT NULL CHECK (Latitude BETWEEN -180 AND 180),
                Longitude   REAL NOT NULL CHECK (Longitude BETWEEN -90 AND 90),
                Public      INTEGER NOT NULL CHECK (Public IN (0, 1)),
                Hidden      INTEGER NOT NULL CHECK (Hidden IN (0, 1)),
                CreateDate  TEXT NOT NULL,
                CHECK (Public = 1 OR Hidden = 0)
            );

            CREATE INDEX idx_moments_position ON Moments(Latitude, Longitude);
            CREATE INDEX idx_moments_user ON Moments(UserID);

            CREATE TABLE Media (
                MomentID    INTEGER NOT NULL REFERENCES Moments(ID) ON DELETE CASCADE,
                Message     TEXT NOT NULL DEFAULT '' CHECK (length(Message) <= 256),
                Type        INTEGER NOT NULL CHECK (Type BETWEEN 0 AND 3),
                Dir         TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (MomentID, Type),
                CHECK ((Type = 0) = (Dir = ''))
            );

            CREATE TABLE Finds (
                MomentID    INTEGER NOT NULL REFERENCES Moments(ID) ON DELETE CASCADE,
                UserID      TEXT NOT NULL CHECK (length(UserID) BETWEEN 6 AND 64),
                Found       INTEGER NOT NULL DEFAULT 0 CHECK (Found IN (0, 1)),
                FindDate    TEXT,
                PRIMARY KEY (MomentID, UserID),
                CHECK ((Found = 1) = (FindDate IS NOT NULL))
            );

            CREATE INDEX idx_finds_user ON Finds(UserID, Found);

            CREATE TABLE Shares (
                MomentID    INTEGER NOT NULL REFERENCES Moments(ID) ON DELETE CASCADE,
                UserID      TEXT NOT NULL CHECK (length(UserID) BETWEEN 6 AND 64),
                "All"       INTEGER NOT NULL CHECK ("All" IN (0, 1)),
                RecipientID TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (MomentID, UserID, RecipientID),
                CHECK (("All" = 1) = (RecipientID = ''))
            );

            CREATE INDEX idx_shares_recipient ON Shares(RecipientID);

            INSERT INTO schema_version (version) VALUES (1);
            "#,
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
