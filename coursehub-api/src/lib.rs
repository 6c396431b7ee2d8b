use chrono::Utc;

mod auth;
pub use auth::{AuthToken, Claims};

mod comment;
pub use comment::{CommentId, CommentRecord, CommentUpdate, NewComment, PostId};

mod error;
pub use error::{Error, FieldErrors};

mod id;
pub use id::RawId;

mod review;
pub use review::{CourseId, NewReview, Review, ReviewId, MAX_RATING};

mod time;
pub use time::Timestamp;

mod user;
pub use user::{
    AvatarUploaded, PasswordChange, ProfileForm, ProfileUpdate, UserId, UserProfile, DEFAULT_ROLE,
    MIN_PASSWORD_LEN,
};

pub type Time = chrono::DateTime<Utc>;

pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(s.to_string())),
        false => Ok(()),
    }
}

/// Content of a comment or review: must hold something besides whitespace
pub fn validate_content(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.trim().is_empty() {
        return Err(Error::EmptyContent);
    }
    Ok(())
}
