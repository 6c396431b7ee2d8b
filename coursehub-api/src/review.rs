use crate::{id::id_type, Error, Timestamp, UserId};

pub const MAX_RATING: u8 = 5;

id_type!(CourseId);
id_type!(ReviewId);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,

    #[serde(default)]
    pub course_id: Option<CourseId>,

    #[serde(default)]
    pub user_id: Option<UserId>,

    #[serde(default)]
    pub user_full_name: Option<String>,

    #[serde(default)]
    pub user_profile_image: Option<String>,

    /// Number of stars, 1 to 5
    #[serde(default)]
    pub rating: u8,

    #[serde(default)]
    pub comment: String,

    #[serde(default)]
    pub created_at: Timestamp,
}

/// Body of both review creation and review update
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub course_id: CourseId,
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), Error> {
        if self.rating == 0 || self.rating > MAX_RATING {
            return Err(Error::InvalidRating(self.rating));
        }
        crate::validate_content(&self.comment)
    }
}
