//! Database row types. These map directly to SQLite rows.
//! Converting a row into a domain entity re-runs the constructors, so a row
//! that slipped past the schema checks surfaces as `DbError::Corrupt`.
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;

use moments_types::models::{Find, Location, Media, Moment, MomentId, MomentPin};

use crate::{DbError, Result};

/// Textual timestamp form used by every date column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map(|ndt| ndt.and_utc())
        .map_err(|e| DbError::Corrupt(format!("timestamp '{}': {}", text, e)))
}

/// Columns read by [`MomentRow::read`], aliased on `m`.
pub const MOMENT_COLUMNS: &str =
    "m.ID, m.UserID, m.Latitude, m.Longitude, m.Public, m.Hidden, m.CreateDate";

pub struct MomentRow {
    pub id: MomentId,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub public: bool,
    pub hidden: bool,
    pub create_date: String,
}

impl MomentRow {
    pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            public: row.get(4)?,
            hidden: row.get(5)?,
            create_date: row.get(6)?,
        })
    }

    pub fn into_moment(self) -> Result<Moment> {
        let id = self.id;
        let location = Location::new(self.latitude, self.longitude).map_err(|e| corrupt("moment", id, e))?;
        let created = parse_timestamp(&self.create_date)?;
        Moment::new(self.user_id, location, self.public, self.hidden, created)
            .and_then(|m| m.with_id(id))
            .map_err(|e| corrupt("moment", id, e))
    }
}

pub struct PinRow {
    pub id: MomentId,
    pub latitude: f64,
    pub longitude: f64,
}

impl PinRow {
    pub fn into_pin(self) -> Result<MomentPin> {
        let location = Location::new(self.latitude, self.longitude).map_err(|e| corrupt("moment", self.id, e))?;
        Ok(MomentPin { id: self.id, location })
    }
}

pub struct MediaRow {
    pub moment_id: MomentId,
    pub message: String,
    pub kind: i64,
    pub dir: String,
}

impl MediaRow {
    pub fn into_media(self) -> Result<Media> {
        let id = self.moment_id;
        Media::new(id, self.message, self.kind, self.dir).map_err(|e| corrupt("media", id, e))
    }
}

/// Find columns as they come out of a `LEFT JOIN Finds f`; all `None` when
/// the moment has no matching find.
pub struct FindRow {
    pub moment_id: MomentId,
    pub user_id: Option<String>,
    pub found: Option<bool>,
    pub find_date: Option<String>,
}

impl FindRow {
    /// Reads `f.UserID, f.Found, f.FindDate` starting at `offset`.
    pub fn read(row: &Row<'_>, moment_id: MomentId, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            moment_id,
            user_id: row.get(offset)?,
            found: row.get(offset + 1)?,
            find_date: row.get(offset + 2)?,
        })
    }

    pub fn into_find(self) -> Result<Option<Find>> {
        let Some(user_id) = self.user_id else {
            return Ok(None);
        };
        let date = self.find_date.as_deref().map(parse_timestamp).transpose()?;
        let id = self.moment_id;
        Find::new(id, user_id, self.found.unwrap_or(false), date)
            .map(Some)
            .map_err(|e| corrupt("find", id, e))
    }
}

fn corrupt(table: &str, id: MomentId, e: impl std::fmt::Display) -> DbError {
    DbError::Corrupt(format!("{} for moment {}: {}", table, id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_text_form() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(&at), "2024-01-01 00:00:00");
        assert_eq!(parse_timestamp("2024-01-01 00:00:00").unwrap(), at);
        assert!(matches!(parse_timestamp("yesterday"), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn test_missing_join_yields_no_find() {
        let row = FindRow {
            moment_id: 1,
            user_id: None,
            found: None,
            find_date: None,
        };
        assert!(row.into_find().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_media_row() {
        let row = MediaRow {
            moment_id: 1,
            message: String::new(),
            kind: 0,
            dir: "x".into(),
        };
        assert!(matches!(row.into_media(), Err(DbError::Corrupt(_))));
    }
}
