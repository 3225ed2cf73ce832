//! Field predicates run by the entity constructors.
//!
//! Axis ranges follow the stored data: latitude spans [-180, 180] and
//! longitude spans [-90, 90]. This is the reverse of geographic convention and
//! is kept as-is so existing rows stay valid.

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::models::{Location, MediaType};

pub const USER_ID_MIN: usize = 6;
pub const USER_ID_MAX: usize = 64;
pub const MESSAGE_MAX: usize = 256;
pub const LATITUDE_LIMIT: f64 = 180.0;
pub const LONGITUDE_LIMIT: f64 = 90.0;

pub fn user_id(id: &str) -> Result<(), ValidationError> {
    let len = id.chars().count();
    if len == 0 {
        return Err(ValidationError::UserIdEmpty);
    }
    if len < USER_ID_MIN {
        return Err(ValidationError::UserIdTooShort { min: USER_ID_MIN, len });
    }
    if len > USER_ID_MAX {
        return Err(ValidationError::UserIdTooLong { max: USER_ID_MAX, len });
    }
    Ok(())
}

pub fn moment_id(id: i64) -> Result<(), ValidationError> {
    if id < 1 {
        return Err(ValidationError::InvalidMomentId(id));
    }
    Ok(())
}

pub fn media_type(raw: i64) -> Result<MediaType, ValidationError> {
    match raw {
        0 => Ok(MediaType::None),
        1 => Ok(MediaType::Image),
        2 => Ok(MediaType::Video),
        3 => Ok(MediaType::Other),
        _ => Err(ValidationError::InvalidMediaType(raw)),
    }
}

pub fn message(text: &str) -> Result<(), ValidationError> {
    let len = text.chars().count();
    if len > MESSAGE_MAX {
        return Err(ValidationError::MessageTooLong { max: MESSAGE_MAX, len });
    }
    Ok(())
}

pub fn media_dir(kind: MediaType, dir: &str) -> Result<(), ValidationError> {
    match (kind, dir.is_empty()) {
        (MediaType::None, false) => Err(ValidationError::NoMediaTypeHasDir),
        (MediaType::None, true) => Ok(()),
        (other, true) => Err(ValidationError::MediaTypeMissingDir(other as u8)),
        (_, false) => Ok(()),
    }
}

pub fn find_date(found: bool, date: Option<&DateTime<Utc>>) -> Result<(), ValidationError> {
    match (found, date) {
        (false, Some(_)) => Err(ValidationError::NotFoundHasDate),
        (true, None) => Err(ValidationError::FoundMissingDate),
        _ => Ok(()),
    }
}

pub fn share_all(all: bool, recipient_id: &str) -> Result<(), ValidationError> {
    match (all, recipient_id.is_empty()) {
        (true, false) => Err(ValidationError::ShareAllHasRecipient),
        (false, true) => Err(ValidationError::ShareMissingRecipient),
        _ => Ok(()),
    }
}

pub fn latitude(value: f64) -> Result<(), ValidationError> {
    // NaN fails the range check too
    if !(-LATITUDE_LIMIT..=LATITUDE_LIMIT).contains(&value) {
        return Err(ValidationError::LatitudeOutOfRange(value));
    }
    Ok(())
}

pub fn longitude(value: f64) -> Result<(), ValidationError> {
    if !(-LONGITUDE_LIMIT..=LONGITUDE_LIMIT).contains(&value) {
        return Err(ValidationError::LongitudeOutOfRange(value));
    }
    Ok(())
}

pub fn public_hidden(public: bool, hidden: bool) -> Result<(), ValidationError> {
    if !public && hidden {
        return Err(ValidationError::PublicHiddenCombination);
    }
    Ok(())
}

pub fn location(loc: Option<&Location>) -> Result<&Location, ValidationError> {
    loc.ok_or(ValidationError::MissingLocation)
}
