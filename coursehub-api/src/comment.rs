use crate::{id::id_type, RawId, Timestamp, UserId};

id_type!(CommentId);
id_type!(
    /// Post (lesson page) a discussion thread hangs off
    PostId
);

/// Comment as returned by the backend, flat: threading is only expressed
/// through `parent_comment_id`
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: CommentId,

    #[serde(default)]
    pub parent_comment_id: Option<CommentId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub created_at: Timestamp,

    #[serde(default)]
    pub user_id: Option<UserId>,

    #[serde(default)]
    pub user_full_name: Option<String>,

    #[serde(default)]
    pub user_profile_image: Option<String>,
}

impl CommentRecord {
    /// The comment this one answers
    ///
    /// A blank or zero parent id means no parent at all, the same as a
    /// missing or null one.
    pub fn parent(&self) -> Option<&CommentId> {
        self.parent_comment_id
            .as_ref()
            .filter(|p| !p.0.is_blank() && p.0 != RawId::Int(0))
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    pub fn author_name(&self) -> &str {
        self.user_full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Anonymous")
    }

    /// Takes the editable fields from the server's answer to an edit, keeping
    /// identity and threading untouched
    pub fn apply_edit(&mut self, updated: CommentRecord) {
        self.content = updated.content;
        self.created_at = updated.created_at;
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: PostId,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<CommentId>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), crate::Error> {
        crate::validate_content(&self.content)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentUpdate {
    pub content: String,
}

impl CommentUpdate {
    pub fn validate(&self) -> Result<(), crate::Error> {
        crate::validate_content(&self.content)
    }
}
