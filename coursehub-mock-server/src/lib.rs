use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    sync::Arc,
};

use chrono::{Duration, TimeZone, Utc};
use coursehub_client::{
    api::{
        self, AuthToken, AvatarUploaded, CommentId, CommentRecord, CommentUpdate, CourseId,
        NewComment, NewReview, PasswordChange, PostId, ProfileUpdate, Review, ReviewId, Time,
        Timestamp, UserId, UserProfile,
    },
    Backend, Error, ImageUpload,
};
use parking_lot::Mutex;
use tokio::sync::oneshot;

#[cfg(test)]
mod controllers;

/// In-memory stand-in for the course platform's REST backend
///
/// Clones share the same state, so a test can keep a handle to inspect what
/// the controllers did.
#[derive(Clone, Default)]
pub struct MockServer(Arc<Mutex<State>>);

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, MockUser>,
    tokens: HashMap<String, UserId>,
    comments: Vec<CommentRecord>,
    reviews: Vec<Review>,
    last_id: i64,
    failures: VecDeque<api::Error>,
    garbage_lists: bool,
    gate: Option<oneshot::Receiver<()>>,
    calls: usize,
}

struct MockUser {
    profile: UserProfile,
    password: String,
}

fn unauthorized() -> api::Error {
    api::Error::Remote {
        status: 401,
        message: Some(String::from("Invalid or expired token")),
    }
}

fn not_found(what: &str) -> api::Error {
    api::Error::Remote {
        status: 404,
        message: Some(format!("{what} not found")),
    }
}

fn bad_request(e: api::Error) -> api::Error {
    api::Error::Remote {
        status: 400,
        message: Some(e.to_string()),
    }
}

/// Token shaped like the ones the real backend hands out; the signature is
/// not a real one
pub fn make_token(id: &UserId, exp: Option<Time>) -> String {
    let payload = match exp {
        Some(exp) => format!(r#"{{"id":{},"exp":{}}}"#, json_id(id), exp.timestamp()),
        None => format!(r#"{{"id":{}}}"#, json_id(id)),
    };
    format!(
        "{}.{}.bW9jay1zaWduYXR1cmU",
        base64::encode_config(r#"{"alg":"HS256","typ":"JWT"}"#, base64::URL_SAFE_NO_PAD),
        base64::encode_config(payload, base64::URL_SAFE_NO_PAD),
    )
}

fn json_id(id: &UserId) -> String {
    match &id.0 {
        api::RawId::Int(i) => i.to_string(),
        api::RawId::Text(s) => format!("{s:?}"),
    }
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Keeps generated ids clear of a seeded one
    fn skip_id(&mut self, id: &api::RawId) {
        if let api::RawId::Int(i) = id {
            self.last_id = self.last_id.max(*i);
        }
    }

    /// Server clock: one second further at each write, so that ordering in
    /// tests does not depend on the wall clock
    fn tick(&mut self) -> Timestamp {
        // 2024-06-01T08:00:00Z
        let secs = 1_717_228_800 + self.next_id();
        Timestamp::from_time(Utc.timestamp_opt(secs, 0).unwrap())
    }

    /// Counts the call and pops an injected failure, if any
    fn enter(&mut self) -> Result<(), api::Error> {
        self.calls += 1;
        match self.failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn resolve(&self, token: &AuthToken) -> Result<UserId, api::Error> {
        self.tokens
            .get(token.as_str())
            .cloned()
            .ok_or_else(unauthorized)
    }

    fn user_mut(&mut self, id: &UserId) -> Result<&mut MockUser, api::Error> {
        self.users.get_mut(id).ok_or_else(|| not_found("User"))
    }

    fn only_self(&self, token: &AuthToken, id: &UserId) -> Result<(), api::Error> {
        match self.resolve(token)? == *id {
            true => Ok(()),
            false => Err(api::Error::PermissionDenied),
        }
    }

    fn owned_comment(
        &mut self,
        token: &AuthToken,
        id: &CommentId,
    ) -> Result<&mut CommentRecord, api::Error> {
        let me = self.resolve(token)?;
        let c = self
            .comments
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| not_found("Comment"))?;
        match c.user_id.as_ref() == Some(&me) {
            true => Ok(c),
            false => Err(api::Error::PermissionDenied),
        }
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    /// Registers a student, returning their id and a token valid for an hour
    pub fn add_user(&self, full_name: &str, email: &str) -> (UserId, String) {
        let mut st = self.0.lock();
        let id = UserId::from(st.next_id());
        st.users.insert(
            id.clone(),
            MockUser {
                profile: UserProfile {
                    id: id.clone(),
                    full_name: full_name.to_string(),
                    email: email.to_string(),
                    phone: None,
                    birth_date: None,
                    profile_image: None,
                    role: String::from(api::DEFAULT_ROLE),
                    created_at: Some(Timestamp(String::from("15-03-2024 09:30:00"))),
                },
                password: String::from("initial"),
            },
        );
        drop(st);
        let token = self.token_for(&id, Some(Utc::now() + Duration::hours(1)));
        (id, token)
    }

    /// Issues another token for `id`, which may be already expired
    pub fn token_for(&self, id: &UserId, exp: Option<Time>) -> String {
        let token = make_token(id, exp);
        self.0.lock().tokens.insert(token.clone(), id.clone());
        token
    }

    pub fn set_role(&self, id: &UserId, role: &str) {
        if let Some(u) = self.0.lock().users.get_mut(id) {
            u.profile.role = role.to_string();
        }
    }

    pub fn seed_comments(&self, comments: impl IntoIterator<Item = CommentRecord>) {
        let mut st = self.0.lock();
        for c in comments {
            st.skip_id(&c.id.0);
            st.comments.push(c);
        }
    }

    pub fn seed_reviews(&self, reviews: impl IntoIterator<Item = Review>) {
        let mut st = self.0.lock();
        for r in reviews {
            st.skip_id(&r.id.0);
            st.reviews.push(r);
        }
    }

    /// Makes the next call fail with `e`, before it does anything
    pub fn fail_next(&self, e: api::Error) {
        self.0.lock().failures.push_back(e);
    }

    /// Makes listings answer with a JSON object instead of an array
    pub fn answer_lists_with_garbage(&self, garbage: bool) {
        self.0.lock().garbage_lists = garbage;
    }

    /// Blocks the next call until the returned sender fires (or is dropped)
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (send, recv) = oneshot::channel();
        self.0.lock().gate = Some(recv);
        send
    }

    /// Number of calls received so far, failed ones included
    pub fn calls(&self) -> usize {
        self.0.lock().calls
    }

    pub fn comments(&self) -> Vec<CommentRecord> {
        self.0.lock().comments.clone()
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.0.lock().reviews.clone()
    }

    pub fn user(&self, id: &UserId) -> Option<UserProfile> {
        self.0.lock().users.get(id).map(|u| u.profile.clone())
    }

    pub fn password(&self, id: &UserId) -> Option<String> {
        self.0.lock().users.get(id).map(|u| u.password.clone())
    }

    async fn wait_gate(&self) {
        let gate = self.0.lock().gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }
}

#[async_trait::async_trait]
impl Backend for MockServer {
    async fn list_comments(
        &self,
        _token: Option<&AuthToken>,
        post: &PostId,
    ) -> Result<Vec<CommentRecord>, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        if st.garbage_lists {
            return Err(api::Error::NotAList.into());
        }
        Ok(st
            .comments
            .iter()
            .filter(|c| c.post_id.as_ref() == Some(post))
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        token: &AuthToken,
        comment: &NewComment,
    ) -> Result<CommentRecord, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        let me = st.resolve(token)?;
        comment.validate().map_err(bad_request)?;
        if let Some(parent) = &comment.parent_comment_id {
            let exists = st
                .comments
                .iter()
                .any(|c| c.id == *parent && c.post_id.as_ref() == Some(&comment.post_id));
            if !exists {
                return Err(not_found("Parent comment").into());
            }
        }
        let author = st.users.get(&me).map(|u| u.profile.clone());
        let id = CommentId::from(st.next_id());
        let created_at = st.tick();
        let record = CommentRecord {
            id,
            parent_comment_id: comment.parent_comment_id.clone(),
            post_id: Some(comment.post_id.clone()),
            content: comment.content.clone(),
            created_at,
            user_id: Some(me),
            user_full_name: author.as_ref().map(|a| a.full_name.clone()),
            user_profile_image: author.and_then(|a| a.profile_image),
        };
        st.comments.push(record.clone());
        Ok(record)
    }

    async fn update_comment(
        &self,
        token: &AuthToken,
        id: &CommentId,
        update: &CommentUpdate,
    ) -> Result<CommentRecord, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        update.validate().map_err(bad_request)?;
        let created_at = st.tick();
        let c = st.owned_comment(token, id)?;
        c.content = update.content.clone();
        c.created_at = created_at;
        Ok(c.clone())
    }

    async fn delete_comment(&self, token: &AuthToken, id: &CommentId) -> Result<(), Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        st.owned_comment(token, id)?;
        let mut doomed = HashSet::from([id.clone()]);
        let mut grew = true;
        while grew {
            grew = false;
            for c in &st.comments {
                if let Some(p) = &c.parent_comment_id {
                    if doomed.contains(p) && doomed.insert(c.id.clone()) {
                        grew = true;
                    }
                }
            }
        }
        st.comments.retain(|c| !doomed.contains(&c.id));
        Ok(())
    }

    async fn list_reviews(
        &self,
        _token: Option<&AuthToken>,
        course: &CourseId,
    ) -> Result<Vec<Review>, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        if st.garbage_lists {
            return Err(api::Error::NotAList.into());
        }
        Ok(st
            .reviews
            .iter()
            .filter(|r| r.course_id.as_ref() == Some(course))
            .cloned()
            .collect())
    }

    async fn create_review(&self, token: &AuthToken, review: &NewReview) -> Result<Review, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        let me = st.resolve(token)?;
        review.validate().map_err(bad_request)?;
        let already = st.reviews.iter().any(|r| {
            r.user_id.as_ref() == Some(&me) && r.course_id.as_ref() == Some(&review.course_id)
        });
        if already {
            return Err(api::Error::Remote {
                status: 400,
                message: Some(String::from("You already reviewed this course")),
            }
            .into());
        }
        let author = st.users.get(&me).map(|u| u.profile.clone());
        let created = Review {
            id: ReviewId::from(st.next_id()),
            course_id: Some(review.course_id.clone()),
            user_id: Some(me),
            user_full_name: author.as_ref().map(|a| a.full_name.clone()),
            user_profile_image: author.and_then(|a| a.profile_image),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: st.tick(),
        };
        st.reviews.push(created.clone());
        Ok(created)
    }

    async fn update_review(
        &self,
        token: &AuthToken,
        id: &ReviewId,
        review: &NewReview,
    ) -> Result<Review, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        let me = st.resolve(token)?;
        review.validate().map_err(bad_request)?;
        let r = st
            .reviews
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or_else(|| not_found("Review"))?;
        if r.user_id.as_ref() != Some(&me) {
            return Err(api::Error::PermissionDenied.into());
        }
        r.rating = review.rating;
        r.comment = review.comment.clone();
        Ok(r.clone())
    }

    async fn fetch_user(&self, token: &AuthToken, id: &UserId) -> Result<UserProfile, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        st.resolve(token)?;
        Ok(st.user_mut(id)?.profile.clone())
    }

    async fn update_user(
        &self,
        token: &AuthToken,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        st.only_self(token, id)?;
        let user = st.user_mut(id)?;
        user.profile.full_name = update.full_name.clone();
        user.profile.email = update.email.clone();
        user.profile.phone = update.phone.clone();
        user.profile.birth_date = update.birth_date.clone();
        user.profile.role = update.role.clone();
        Ok(user.profile.clone())
    }

    async fn change_password(
        &self,
        token: &AuthToken,
        id: &UserId,
        change: &PasswordChange,
    ) -> Result<(), Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        st.only_self(token, id)?;
        change.validate().map_err(bad_request)?;
        st.user_mut(id)?.password = change.password.clone();
        Ok(())
    }

    async fn upload_avatar(
        &self,
        token: &AuthToken,
        id: &UserId,
        image: ImageUpload,
    ) -> Result<AvatarUploaded, Error> {
        self.wait_gate().await;
        let mut st = self.0.lock();
        st.enter()?;
        st.only_self(token, id)?;
        if !image.mime.starts_with("image/") || image.bytes.is_empty() {
            return Err(api::Error::Remote {
                status: 400,
                message: Some(String::from("Only images are accepted")),
            }
            .into());
        }
        let path = format!("/uploads/avatars/{id}-{}", image.file_name);
        st.user_mut(id)?.profile.profile_image = Some(path.clone());
        Ok(AvatarUploaded {
            profile_image: path,
        })
    }
}
