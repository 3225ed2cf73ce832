//! Writes. Set inserts go out as one multi-row statement; set deletes run one
//! statement per row inside a single transaction. Each set operation has a
//! `*_in_tx` form for callers that already hold a transaction.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter};
use tracing::debug;

use moments_types::models::{Find, Media, MediaContent, Moment, MomentId, Share};
use moments_types::{ValidationError, validate};

use crate::models::format_timestamp;
use crate::{Database, DbError, Result, exec};

impl Database {
    // -- Moments --

    pub fn insert_moment(&self, moment: &Moment) -> Result<MomentId> {
        self.with_conn(|conn| insert_moment(conn, moment))
    }

    /// Insert a moment with its media and one unfound Find per recipient,
    /// all in one transaction. Returns the assigned id.
    pub fn leave_moment(
        &self,
        moment: &Moment,
        media: Vec<MediaContent>,
        recipients: &[String],
    ) -> Result<MomentId> {
        if !recipients.is_empty() && !moment.is_targeted() {
            return Err(ValidationError::RecipientsOnOpenMoment.into());
        }
        for recipient in recipients {
            validate::user_id(recipient)?;
        }

        self.with_tx(|tx| {
            let id = insert_moment(tx, moment)?;

            if !media.is_empty() {
                let rows = media
                    .into_iter()
                    .map(|content| content.attach(id))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                insert_media_in_tx(tx, &rows)?;
            }

            if !recipients.is_empty() {
                let finds = recipients
                    .iter()
                    .map(|user| Find::pending(id, user.as_str()))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                insert_finds_in_tx(tx, &finds)?;
            }

            Ok(id)
        })
    }

    /// Dependent Media, Finds and Shares go with it through the cascade.
    pub fn delete_moment(&self, id: MomentId) -> Result<()> {
        validate::moment_id(id)?;
        self.with_tx(|tx| delete_moment_in_tx(tx, id))
    }

    // -- Media --

    pub fn insert_media(&self, set: &[Media]) -> Result<usize> {
        self.with_conn(|conn| insert_media(conn, set))
    }

    pub fn delete_media(&self, set: &[Media]) -> Result<usize> {
        self.with_tx(|tx| delete_media_in_tx(tx, set))
    }

    // -- Finds --

    pub fn insert_finds(&self, set: &[Find]) -> Result<usize> {
        self.with_conn(|conn| insert_finds(conn, set))
    }

    pub fn delete_finds(&self, set: &[Find]) -> Result<usize> {
        self.with_tx(|tx| delete_finds_in_tx(tx, set))
    }

    /// Flip the user's Find on the moment from unfound to found, stamped with
    /// the current UTC second. Returns the stored find date.
    pub fn mark_found(&self, moment_id: MomentId, user_id: &str) -> Result<DateTime<Utc>> {
        validate::moment_id(moment_id)?;
        validate::user_id(user_id)?;
        self.with_conn(|conn| mark_found(conn, moment_id, user_id, Utc::now()))
    }

    // -- Shares --

    pub fn insert_shares(&self, set: &[Share]) -> Result<usize> {
        self.with_tx(|tx| insert_shares_in_tx(tx, set))
    }

    pub fn delete_shares(&self, set: &[Share]) -> Result<usize> {
        self.with_tx(|tx| delete_shares_in_tx(tx, set))
    }
}

// -- Moments --

pub fn insert_moment(conn: &Connection, moment: &Moment) -> Result<MomentId> {
    let location = moment.location();
    exec(
        conn,
        "INSERT INTO Moments (UserID, Latitude, Longitude, Public, Hidden, CreateDate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            moment.user_id(),
            location.latitude(),
            location.longitude(),
            moment.is_public(),
            moment.is_hidden(),
            format_timestamp(&moment.create_date()),
        ],
        1,
    )?;
    let id = conn.last_insert_rowid();
    debug!(moment_id = id, user_id = moment.user_id(), "Inserted moment");
    Ok(id)
}

pub fn delete_moment_in_tx(tx: &Transaction<'_>, id: MomentId) -> Result<()> {
    exec(tx, "DELETE FROM Moments WHERE ID = ?1", [id], 1)
        .map_err(|e| not_found_on_zero(e, || format!("moment {}", id)))?;
    debug!(moment_id = id, "Deleted moment");
    Ok(())
}

// -- Media --

/// Every row in `set` must hang off the same moment.
pub fn insert_media(conn: &Connection, set: &[Media]) -> Result<usize> {
    if let Some(first) = set.first().map(Media::moment_id) {
        if let Some(other) = set.iter().map(Media::moment_id).find(|id| *id != first) {
            return Err(DbError::MixedParents { first, other });
        }
    }

    let rows = set
        .iter()
        .map(|m| {
            [
                Value::from(m.moment_id()),
                Value::from(m.message().to_string()),
                Value::from(i64::from(u8::from(m.kind()))),
                Value::from(m.dir().to_string()),
            ]
        })
        .collect();
    insert_batch(conn, "Media (MomentID, Message, Type, Dir)", rows)
}

pub fn insert_media_in_tx(tx: &Transaction<'_>, set: &[Media]) -> Result<usize> {
    insert_media(tx, set)
}

pub fn delete_media_in_tx(tx: &Transaction<'_>, set: &[Media]) -> Result<usize> {
    delete_each(set, |m| {
        exec(
            tx,
            "DELETE FROM Media WHERE MomentID = ?1 AND Type = ?2",
            params![m.moment_id(), u8::from(m.kind())],
            1,
        )
    })
}

// -- Finds --

pub fn insert_finds(conn: &Connection, set: &[Find]) -> Result<usize> {
    let rows = set
        .iter()
        .map(|f| {
            [
                Value::from(f.moment_id()),
                Value::from(f.user_id().to_string()),
                Value::from(f.is_found()),
                Value::from(f.find_date().as_ref().map(format_timestamp)),
            ]
        })
        .collect();
    insert_batch(conn, "Finds (MomentID, UserID, Found, FindDate)", rows)
}

pub fn insert_finds_in_tx(tx: &Transaction<'_>, set: &[Find]) -> Result<usize> {
    insert_finds(tx, set)
}

pub fn delete_finds_in_tx(tx: &Transaction<'_>, set: &[Find]) -> Result<usize> {
    delete_each(set, |f| {
        exec(
            tx,
            "DELETE FROM Finds WHERE MomentID = ?1 AND UserID = ?2",
            params![f.moment_id(), f.user_id()],
            1,
        )
    })
}

pub fn mark_found(
    conn: &Connection,
    moment_id: MomentId,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    // Build the transition through the entity so the stored pair is valid.
    let mut find = Find::pending(moment_id, user_id)?;
    find.mark_found(at)?;
    let date = find.find_date().ok_or(ValidationError::FoundMissingDate)?;

    exec(
        conn,
        "UPDATE Finds SET Found = 1, FindDate = ?1
         WHERE MomentID = ?2 AND UserID = ?3 AND Found = 0",
        params![format_timestamp(&date), moment_id, user_id],
        1,
    )
    .map_err(|e| not_found_on_zero(e, || format!("unfound find for {} on moment {}", user_id, moment_id)))?;

    debug!(moment_id, user_id, "Marked find as found");
    Ok(date)
}

// -- Shares --

/// Every sharer must already hold a found Find on the moment.
pub fn insert_shares_in_tx(tx: &Transaction<'_>, set: &[Share]) -> Result<usize> {
    for share in set {
        let found: Option<bool> = tx
            .query_row(
                "SELECT Found FROM Finds WHERE MomentID = ?1 AND UserID = ?2",
                params![share.moment_id(), share.user_id()],
                |row| row.get(0),
            )
            .optional()?;
        if found != Some(true) {
            return Err(DbError::NotFound(format!(
                "found find for {} on moment {}",
                share.user_id(),
                share.moment_id()
            )));
        }
    }

    let rows = set
        .iter()
        .map(|s| {
            [
                Value::from(s.moment_id()),
                Value::from(s.user_id().to_string()),
                Value::from(s.is_all()),
                Value::from(s.recipient_id().to_string()),
            ]
        })
        .collect();
    insert_batch(tx, r#"Shares (MomentID, UserID, "All", RecipientID)"#, rows)
}

pub fn delete_shares_in_tx(tx: &Transaction<'_>, set: &[Share]) -> Result<usize> {
    delete_each(set, |s| {
        exec(
            tx,
            "DELETE FROM Shares WHERE MomentID = ?1 AND UserID = ?2 AND RecipientID = ?3",
            params![s.moment_id(), s.user_id(), s.recipient_id()],
            1,
        )
    })
}

// -- Batch helpers --

/// One `INSERT` carrying a `(?, ?, ..)` group per row, with the arguments
/// flattened in row-major order. The statement must affect every row.
fn insert_batch<const N: usize>(conn: &Connection, table: &str, rows: Vec<[Value; N]>) -> Result<usize> {
    if rows.is_empty() {
        return Err(DbError::EmptyBatch);
    }

    let group = format!("({})", vec!["?"; N].join(", "));
    let groups = vec![group.as_str(); rows.len()].join(", ");
    let sql = format!("INSERT INTO {} VALUES {}", table, groups);

    let count = exec(conn, &sql, params_from_iter(rows.iter().flatten()), rows.len())?;
    debug!(table, rows = count, "Batch insert");
    Ok(count)
}

/// Runs `delete` for each row in input order and sums the affected counts.
/// The caller's transaction discards everything on the first failure.
fn delete_each<T, F>(set: &[T], mut delete: F) -> Result<usize>
where
    F: FnMut(&T) -> Result<usize>,
{
    let mut total = 0;
    for row in set {
        total += delete(row)?;
    }
    debug!(rows = total, "Set delete");
    Ok(total)
}

fn not_found_on_zero(e: DbError, what: impl FnOnce() -> String) -> DbError {
    match e {
        DbError::RowCount { actual: 0, .. } => DbError::NotFound(what()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use moments_types::models::Location;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn moment(public: bool, hidden: bool) -> Moment {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Moment::new("James1", Location::new(43.0, -87.9).unwrap(), public, hidden, at).unwrap()
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn test_insert_moment_assigns_id() {
        let db = db();
        let first = db.insert_moment(&moment(true, false)).unwrap();
        let second = db.insert_moment(&moment(true, true)).unwrap();
        assert!(first >= 1);
        assert!(second > first);
    }

    #[test]
    fn test_media_batch_insert_and_set_delete() {
        let db = db();
        let id = db.insert_moment(&moment(true, false)).unwrap();
        let set = vec![
            Media::new(id, "hello", 0, "").unwrap(),
            Media::new(id, "look", 1, "media/a.png").unwrap(),
            Media::new(id, "watch", 2, "media/b.mp4").unwrap(),
        ];

        assert_eq!(db.insert_media(&set).unwrap(), 3);
        assert_eq!(count(&db, "Media"), 3);

        assert_eq!(db.delete_media(&set[..2]).unwrap(), 2);
        assert_eq!(count(&db, "Media"), 1);
    }

    #[test]
    fn test_media_unique_per_type() {
        let db = db();
        let id = db.insert_moment(&moment(true, false)).unwrap();
        let set = vec![
            Media::new(id, "one", 1, "media/a.png").unwrap(),
            Media::new(id, "two", 1, "media/b.png").unwrap(),
        ];

        let err = db.insert_media(&set).unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Conflict);
        // the whole statement is discarded
        assert_eq!(count(&db, "Media"), 0);
    }

    #[test]
    fn test_media_set_must_share_one_moment() {
        let db = db();
        let a = db.insert_moment(&moment(true, false)).unwrap();
        let b = db.insert_moment(&moment(true, false)).unwrap();
        let set = vec![
            Media::new(a, "here", 1, "media/a.png").unwrap(),
            Media::new(b, "there", 2, "media/b.mp4").unwrap(),
        ];

        let err = db.insert_media(&set).unwrap_err();
        assert!(matches!(err, DbError::MixedParents { first, other } if first == a && other == b));
        assert_eq!(err.category(), crate::ErrorCategory::Misuse);
        assert_eq!(count(&db, "Media"), 0);
    }

    #[test]
    fn test_empty_batch_is_misuse() {
        let db = db();
        let err = db.insert_finds(&[]).unwrap_err();
        assert!(matches!(err, DbError::EmptyBatch));
        assert_eq!(err.category(), crate::ErrorCategory::Misuse);
    }

    #[test]
    fn test_set_delete_rolls_back_on_missing_row() {
        let db = db();
        let id = db.insert_moment(&moment(false, false)).unwrap();
        let finds = vec![Find::pending(id, "Sadie1").unwrap(), Find::pending(id, "Frank1").unwrap()];
        db.insert_finds(&finds).unwrap();

        let doomed = vec![finds[0].clone(), Find::pending(id, "Nobody1").unwrap()];
        let err = db.delete_finds(&doomed).unwrap_err();
        assert!(matches!(err, DbError::RowCount { expected: 1, actual: 0 }));
        assert_eq!(count(&db, "Finds"), 2);
    }

    #[test]
    fn test_mark_found_exactly_once() {
        let db = db();
        let id = db.insert_moment(&moment(false, false)).unwrap();
        db.insert_finds(&[Find::pending(id, "Sadie1").unwrap()]).unwrap();

        let before = Utc::now();
        let date = db.mark_found(id, "Sadie1").unwrap();
        assert!((date - before).num_seconds().abs() <= 5);

        let again = db.mark_found(id, "Sadie1").unwrap_err();
        assert!(matches!(again, DbError::NotFound(_)));
        let stranger = db.mark_found(id, "Other1").unwrap_err();
        assert_eq!(stranger.category(), crate::ErrorCategory::NotFound);
    }

    #[test]
    fn test_leave_moment_writes_dependents_together() {
        let db = db();
        let media = vec![MediaContent::new("for you", 1, "media/a.png").unwrap()];
        let recipients = vec!["Sadie1".to_string(), "Frank1".to_string()];

        let id = db.leave_moment(&moment(false, false), media, &recipients).unwrap();
        assert!(id >= 1);
        assert_eq!(count(&db, "Media"), 1);
        assert_eq!(count(&db, "Finds"), 2);
    }

    #[test]
    fn test_leave_moment_rolls_back_on_duplicate_recipient() {
        let db = db();
        let recipients = vec!["Sadie1".to_string(), "Sadie1".to_string()];

        assert!(db.leave_moment(&moment(false, false), vec![], &recipients).is_err());
        assert_eq!(count(&db, "Moments"), 0);
    }

    #[test]
    fn test_leave_moment_rejects_recipients_on_open_moment() {
        let db = db();
        let err = db
            .leave_moment(&moment(true, false), vec![], &["Sadie1".to_string()])
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::RecipientsOnOpenMoment)));
        assert_eq!(count(&db, "Moments"), 0);
    }

    #[test]
    fn test_share_requires_found_find() {
        let db = db();
        let id = db.insert_moment(&moment(false, false)).unwrap();
        db.insert_finds(&[Find::pending(id, "Sadie1").unwrap()]).unwrap();
        let share = Share::new(id, "Sadie1", false, "Frank1").unwrap();

        let err = db.insert_shares(std::slice::from_ref(&share)).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));

        db.mark_found(id, "Sadie1").unwrap();
        assert_eq!(db.insert_shares(std::slice::from_ref(&share)).unwrap(), 1);
        assert_eq!(db.delete_shares(&[share]).unwrap(), 1);
        assert_eq!(count(&db, "Shares"), 0);
    }

    #[test]
    fn test_delete_moment_cascades() {
        let db = db();
        let media = vec![MediaContent::new("hi", 1, "media/a.png").unwrap()];
        let id = db
            .leave_moment(&moment(false, false), media, &["Sadie1".to_string()])
            .unwrap();
        db.mark_found(id, "Sadie1").unwrap();
        db.insert_shares(&[Share::with_everyone(id, "Sadie1").unwrap()]).unwrap();

        db.delete_moment(id).unwrap();
        for table in ["Moments", "Media", "Finds", "Shares"] {
            assert_eq!(count(&db, table), 0, "{} not emptied", table);
        }

        assert!(matches!(db.delete_moment(id), Err(DbError::NotFound(_))));
    }
}
