//! Domain entities. Every constructor runs the validators from
//! [`crate::validate`] and fails on the first rejection, so a value of these
//! types always satisfies its invariants.
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

use crate::error::ValidationError;
use crate::validate;

pub type MomentId = i64;

// -- Location --

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        validate::latitude(latitude)?;
        validate::longitude(longitude)?;
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

// -- Moments --

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Moment {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<MomentId>,
    user_id: String,
    location: Location,
    public: bool,
    hidden: bool,
    create_date: DateTime<Utc>,
}

impl Moment {
    /// A moment that has not been persisted yet. The id is assigned on insert.
    pub fn new(
        user_id: impl Into<String>,
        location: Location,
        public: bool,
        hidden: bool,
        create_date: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let user_id = user_id.into();
        validate::user_id(&user_id)?;
        validate::public_hidden(public, hidden)?;
        Ok(Self {
            id: None,
            user_id,
            location,
            public,
            hidden,
            create_date: create_date.trunc_subsecs(0),
        })
    }

    pub fn with_id(mut self, id: MomentId) -> Result<Self, ValidationError> {
        validate::moment_id(id)?;
        self.id = Some(id);
        Ok(self)
    }

    pub fn id(&self) -> Option<MomentId> {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Private and hidden moments are the ones addressed through Finds.
    pub fn is_targeted(&self) -> bool {
        !self.public || self.hidden
    }

    pub fn create_date(&self) -> DateTime<Utc> {
        self.create_date
    }
}

// -- Media --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum MediaType {
    None = 0,
    Image = 1,
    Video = 2,
    Other = 3,
}

impl From<MediaType> for u8 {
    fn from(kind: MediaType) -> Self {
        kind as u8
    }
}

impl TryFrom<i64> for MediaType {
    type Error = ValidationError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        validate::media_type(raw)
    }
}

/// Validated media fields before they are attached to a moment id. Used when
/// the parent moment is inserted in the same transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaContent {
    message: String,
    kind: MediaType,
    dir: String,
}

impl MediaContent {
    pub fn new(
        message: impl Into<String>,
        kind: i64,
        dir: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let message = message.into();
        let dir = dir.into();
        let kind = validate::media_type(kind)?;
        validate::message(&message)?;
        validate::media_dir(kind, &dir)?;
        Ok(Self { message, kind, dir })
    }

    pub fn attach(self, moment_id: MomentId) -> Result<Media, ValidationError> {
        validate::moment_id(moment_id)?;
        Ok(Media {
            moment_id,
            message: self.message,
            kind: self.kind,
            dir: self.dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    moment_id: MomentId,
    message: String,
    #[serde(rename = "type")]
    kind: MediaType,
    dir: String,
}

impl Media {
    pub fn new(
        moment_id: MomentId,
        message: impl Into<String>,
        kind: i64,
        dir: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        MediaContent::new(message, kind, dir)?.attach(moment_id)
    }

    pub fn moment_id(&self) -> MomentId {
        self.moment_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> MediaType {
        self.kind
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }
}

// -- Finds --

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Find {
    moment_id: MomentId,
    user_id: String,
    found: bool,
    find_date: Option<DateTime<Utc>>,
}

impl Find {
    pub fn new(
        moment_id: MomentId,
        user_id: impl Into<String>,
        found: bool,
        find_date: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        let user_id = user_id.into();
        validate::moment_id(moment_id)?;
        validate::user_id(&user_id)?;
        validate::find_date(found, find_date.as_ref())?;
        Ok(Self {
            moment_id,
            user_id,
            found,
            find_date: find_date.map(|d| d.trunc_subsecs(0)),
        })
    }

    /// A recipient's row as created alongside a private or hidden moment.
    pub fn pending(moment_id: MomentId, user_id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(moment_id, user_id, false, None)
    }

    /// The only permitted mutation: `(false, None)` to `(true, at)`.
    pub fn mark_found(&mut self, at: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.found {
            return Err(ValidationError::AlreadyFound);
        }
        self.found = true;
        self.find_date = Some(at.trunc_subsecs(0));
        Ok(())
    }

    pub fn moment_id(&self) -> MomentId {
        self.moment_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    pub fn find_date(&self) -> Option<DateTime<Utc>> {
        self.find_date
    }
}

// -- Shares --

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    moment_id: MomentId,
    /// The finder forwarding the moment.
    user_id: String,
    all: bool,
    recipient_id: String,
}

impl Share {
    pub fn new(
        moment_id: MomentId,
        user_id: impl Into<String>,
        all: bool,
        recipient_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let user_id = user_id.into();
        let recipient_id = recipient_id.into();
        validate::moment_id(moment_id)?;
        validate::user_id(&user_id)?;
        validate::share_all(all, &recipient_id)?;
        if !all {
            validate::user_id(&recipient_id)?;
        }
        Ok(Self {
            moment_id,
            user_id,
            all,
            recipient_id,
        })
    }

    pub fn with_everyone(moment_id: MomentId, user_id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(moment_id, user_id, true, "")
    }

    pub fn moment_id(&self) -> MomentId {
        self.moment_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }
}

// -- Query results --

/// A moment with the dependents a discovery query loaded for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentAggregate {
    #[serde(flatten)]
    pub moment: Moment,
    pub media: Vec<Media>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub finds: Vec<Find>,
}

impl MomentAggregate {
    pub fn new(moment: Moment) -> Self {
        Self {
            moment,
            media: Vec::new(),
            finds: Vec::new(),
        }
    }
}

/// Position-only view returned for moments a user has yet to find.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MomentPin {
    pub id: MomentId,
    #[serde(flatten)]
    pub location: Location,
}
