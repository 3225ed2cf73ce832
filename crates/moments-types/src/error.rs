use thiserror::Error;

/// Rejections raised while constructing entities. Nothing that fails here
/// ever reaches the database.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("user id must not be empty")]
    UserIdEmpty,

    #[error("user id must be at least {min} characters, got {len}")]
    UserIdTooShort { min: usize, len: usize },

    #[error("user id must be at most {max} characters, got {len}")]
    UserIdTooLong { max: usize, len: usize },

    #[error("moment id must be positive, got {0}")]
    InvalidMomentId(i64),

    #[error("unknown media type {0}")]
    InvalidMediaType(i64),

    #[error("message must be at most {max} characters, got {len}")]
    MessageTooLong { max: usize, len: usize },

    #[error("media without a type must not carry a directory")]
    NoMediaTypeHasDir,

    #[error("media of type {0} requires a directory")]
    MediaTypeMissingDir(u8),

    #[error("an unfound find must not carry a find date")]
    NotFoundHasDate,

    #[error("a found find requires a find date")]
    FoundMissingDate,

    #[error("find was already marked found")]
    AlreadyFound,

    #[error("a share with everyone must not name a recipient")]
    ShareAllHasRecipient,

    #[error("a targeted share requires a recipient")]
    ShareMissingRecipient,

    #[error("latitude {0} outside [-180, 180]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-90, 90]")]
    LongitudeOutOfRange(f64),

    #[error("a private moment cannot be hidden")]
    PublicHiddenCombination,

    #[error("location is required")]
    MissingLocation,

    #[error("recipients are only allowed on private or hidden moments")]
    RecipientsOnOpenMoment,
}
