use crate::{
    api::{
        AuthToken, AvatarUploaded, CommentId, CommentRecord, CommentUpdate, CourseId, NewComment,
        NewReview, PasswordChange, PostId, ProfileUpdate, Review, ReviewId, UserId, UserProfile,
    },
    Error,
};

/// Image picked by the user for their profile
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// The remote service, as seen by the controllers
///
/// Listing calls work anonymously but send the credential when there is
/// one. Every other call requires it. A listing whose answer is not a list
/// fails with `api::Error::NotAList`.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn list_comments(
        &self,
        token: Option<&AuthToken>,
        post: &PostId,
    ) -> Result<Vec<CommentRecord>, Error>;

    async fn create_comment(
        &self,
        token: &AuthToken,
        comment: &NewComment,
    ) -> Result<CommentRecord, Error>;

    async fn update_comment(
        &self,
        token: &AuthToken,
        id: &CommentId,
        update: &CommentUpdate,
    ) -> Result<CommentRecord, Error>;

    async fn delete_comment(&self, token: &AuthToken, id: &CommentId) -> Result<(), Error>;

    async fn list_reviews(
        &self,
        token: Option<&AuthToken>,
        course: &CourseId,
    ) -> Result<Vec<Review>, Error>;

    async fn create_review(&self, token: &AuthToken, review: &NewReview) -> Result<Review, Error>;

    async fn update_review(
        &self,
        token: &AuthToken,
        id: &ReviewId,
        review: &NewReview,
    ) -> Result<Review, Error>;

    async fn fetch_user(&self, token: &AuthToken, id: &UserId) -> Result<UserProfile, Error>;

    async fn update_user(
        &self,
        token: &AuthToken,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, Error>;

    async fn change_password(
        &self,
        token: &AuthToken,
        id: &UserId,
        change: &PasswordChange,
    ) -> Result<(), Error>;

    async fn upload_avatar(
        &self,
        token: &AuthToken,
        id: &UserId,
        image: ImageUpload,
    ) -> Result<AvatarUploaded, Error>;
}
