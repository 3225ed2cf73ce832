use std::collections::HashMap;

use rusqlite::{Connection, Params, params};

use moments_types::models::{Location, MomentAggregate, MomentId, MomentPin};
use moments_types::validate;

use crate::models::{FindRow, MOMENT_COLUMNS, MediaRow, MomentRow, PinRow};
use crate::{Database, DbError, Result};

/// Half-width of the proximity box, in both axes.
pub const BALLOON_RADIUS: f64 = 3.0;

/// Square around a query point. The only proximity filter: no wrap-around at
/// the axis limits and no distance ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balloon {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Balloon {
    pub fn around(center: Location) -> Self {
        Self {
            min_lat: center.latitude() - BALLOON_RADIUS,
            max_lat: center.latitude() + BALLOON_RADIUS,
            min_lon: center.longitude() - BALLOON_RADIUS,
            max_lon: center.longitude() + BALLOON_RADIUS,
        }
    }
}

const ORDER: &str = "ORDER BY m.CreateDate DESC, m.ID DESC";

/// Ids bound per media fetch, well under SQLite's 32766 variable limit.
const MEDIA_CHUNK: usize = 10_000;

impl Database {
    /// Public, unhidden moments in the balloon, with their media.
    pub fn search_public(&self, loc: Location) -> Result<Vec<MomentAggregate>> {
        self.with_conn(|conn| search_near(conn, loc, false))
    }

    /// Public-and-hidden moments in the balloon, with their media.
    pub fn search_hidden(&self, loc: Location) -> Result<Vec<MomentAggregate>> {
        self.with_conn(|conn| search_near(conn, loc, true))
    }

    /// Positions of moments in the balloon the user could still find: ones
    /// with an unfound Find for them, and hidden ones they have no Find for.
    /// A hidden moment the user already found is not returned, even though a
    /// plain `Found = 0 OR Hidden = 1` filter would keep it.
    pub fn search_lost(&self, user_id: &str, loc: Location) -> Result<Vec<MomentPin>> {
        validate::user_id(user_id)?;
        let b = Balloon::around(loc);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.ID, m.Latitude, m.Longitude
                 FROM Moments m
                 LEFT JOIN Finds f ON f.MomentID = m.ID AND f.UserID = ?1
                 WHERE m.Latitude BETWEEN ?2 AND ?3
                   AND m.Longitude BETWEEN ?4 AND ?5
                   AND (f.Found = 0 OR (m.Hidden = 1 AND f.UserID IS NULL))
                 ORDER BY m.ID",
            )?;

            let rows = stmt
                .query_map(params![user_id, b.min_lat, b.max_lat, b.min_lon, b.max_lon], |row| {
                    Ok(PinRow {
                        id: row.get(0)?,
                        latitude: row.get(1)?,
                        longitude: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(PinRow::into_pin).collect()
        })
    }

    /// Moments the user has found, with media and the user's own Find.
    pub fn search_found(&self, user_id: &str) -> Result<Vec<MomentAggregate>> {
        validate::user_id(user_id)?;
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MOMENT_COLUMNS}, f.UserID, f.Found, f.FindDate
                 FROM Moments m
                 JOIN Finds f ON f.MomentID = m.ID
                 WHERE f.UserID = ?1 AND f.Found = 1
                 ORDER BY f.FindDate DESC, m.ID DESC"
            );
            let mut moments = query_aggregates(conn, &sql, [user_id], true)?;
            attach_media(conn, &mut moments)?;
            Ok(moments)
        })
    }

    /// Moments the user left, with media and every recipient's Find.
    pub fn search_left(&self, user_id: &str) -> Result<Vec<MomentAggregate>> {
        validate::user_id(user_id)?;
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MOMENT_COLUMNS}, f.UserID, f.Found, f.FindDate
                 FROM Moments m
                 LEFT JOIN Finds f ON f.MomentID = m.ID
                 WHERE m.UserID = ?1
                 {ORDER}, f.UserID"
            );
            let mut moments = query_aggregates(conn, &sql, [user_id], true)?;
            attach_media(conn, &mut moments)?;
            Ok(moments)
        })
    }

    /// Moments `finder` found and shared either with everyone or with
    /// `viewer`. Carries media and the finder's Find.
    pub fn search_shared(&self, finder: &str, viewer: &str) -> Result<Vec<MomentAggregate>> {
        validate::user_id(finder)?;
        validate::user_id(viewer)?;
        self.with_conn(|conn| {
            let sql = format!(
                r#"SELECT DISTINCT {MOMENT_COLUMNS}, f.UserID, f.Found, f.FindDate
                   FROM Moments m
                   JOIN Finds f ON f.MomentID = m.ID AND f.UserID = ?1 AND f.Found = 1
                   JOIN Shares s ON s.MomentID = m.ID AND s.UserID = f.UserID
                   WHERE s."All" = 1 OR s.RecipientID = ?2
                   {ORDER}"#
            );
            let mut moments = query_aggregates(conn, &sql, [finder, viewer], true)?;
            attach_media(conn, &mut moments)?;
            Ok(moments)
        })
    }

    /// A single moment with its media and finds.
    pub fn get_moment(&self, id: MomentId) -> Result<MomentAggregate> {
        validate::moment_id(id)?;
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MOMENT_COLUMNS}, f.UserID, f.Found, f.FindDate
                 FROM Moments m
                 LEFT JOIN Finds f ON f.MomentID = m.ID
                 WHERE m.ID = ?1
                 ORDER BY f.UserID"
            );
            let mut moments = query_aggregates(conn, &sql, [id], true)?;
            attach_media(conn, &mut moments)?;
            moments
                .pop()
                .ok_or_else(|| DbError::NotFound(format!("moment {}", id)))
        })
    }
}

fn search_near(conn: &Connection, loc: Location, hidden: bool) -> Result<Vec<MomentAggregate>> {
    let b = Balloon::around(loc);
    let sql = format!(
        "SELECT {MOMENT_COLUMNS}
         FROM Moments m
         WHERE m.Public = 1 AND m.Hidden = ?1
           AND m.Latitude BETWEEN ?2 AND ?3
           AND m.Longitude BETWEEN ?4 AND ?5
         {ORDER}"
    );
    let mut moments = query_aggregates(
        conn,
        &sql,
        params![hidden, b.min_lat, b.max_lat, b.min_lon, b.max_lon],
        false,
    )?;
    attach_media(conn, &mut moments)?;
    Ok(moments)
}

/// Runs a moment query and folds the rows into aggregates, de-duplicating by
/// moment id while keeping first-seen order. With `with_finds` the query must
/// also select `f.UserID, f.Found, f.FindDate` after the moment columns.
fn query_aggregates<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    with_finds: bool,
) -> Result<Vec<MomentAggregate>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map(params, |row| {
            let moment = MomentRow::read(row)?;
            let find = if with_finds {
                Some(FindRow::read(row, moment.id, 7)?)
            } else {
                None
            };
            Ok((moment, find))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut index: HashMap<MomentId, usize> = HashMap::new();
    let mut moments: Vec<MomentAggregate> = Vec::new();

    for (moment, find) in rows {
        let slot = match index.get(&moment.id) {
            Some(&slot) => slot,
            None => {
                index.insert(moment.id, moments.len());
                moments.push(MomentAggregate::new(moment.into_moment()?));
                moments.len() - 1
            }
        };

        if let Some(find) = find.map(FindRow::into_find).transpose()?.flatten() {
            moments[slot].finds.push(find);
        }
    }

    Ok(moments)
}

/// Batch-fetch media for the given moments and hang each row under its parent.
fn attach_media(conn: &Connection, moments: &mut [MomentAggregate]) -> Result<()> {
    let ids: Vec<MomentId> = moments.iter().filter_map(|a| a.moment.id()).collect();
    let slots: HashMap<MomentId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    for chunk in ids.chunks(MEDIA_CHUNK) {
        let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT MomentID, Message, Type, Dir FROM Media WHERE MomentID IN ({}) ORDER BY MomentID, Type",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                Ok(MediaRow {
                    moment_id: row.get(0)?,
                    message: row.get(1)?,
                    kind: row.get(2)?,
                    dir: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for row in rows {
            let media = row.into_media()?;
            if let Some(&slot) = slots.get(&media.moment_id()) {
                moments[slot].media.push(media);
            }
        }
    }

    Ok(())
}
