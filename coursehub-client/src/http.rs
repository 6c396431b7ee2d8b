use anyhow::Context;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    api::{
        self, AuthToken, AvatarUploaded, CommentId, CommentRecord, CommentUpdate, CourseId,
        NewComment, NewReview, PasswordChange, PostId, ProfileUpdate, Review, ReviewId, UserId,
        UserProfile,
    },
    Backend, Error, ImageUpload,
};

/// Where the backend lives and how hard to try reaching it
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientConfig {
    pub host: String,

    /// Path under which all endpoints are mounted, `/api` by default
    pub api_prefix: String,

    /// Retries for transient failures (connection errors, 5xx, 429)
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            host: String::from("http://localhost:8080"),
            api_prefix: String::from("/api"),
            max_retries: 3,
        }
    }
}

impl ClientConfig {
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        match self.api_prefix.trim_matches('/') {
            "" => host.to_string(),
            prefix => format!("{host}/{prefix}"),
        }
    }
}

pub struct HttpBackend {
    base: String,
    client: ClientWithMiddleware,

    // multipart bodies are streamed, so they cannot be replayed by the retry
    // middleware
    uploads: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> HttpBackend {
        let plain = reqwest::Client::new();
        let policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(plain.clone())
            .with(RetryTransientMiddleware::new_with_policy(policy))
            .build();
        HttpBackend {
            base: config.base_url(),
            client,
            uploads: plain,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, Error> {
        let mut url = reqwest::Url::parse(&self.base)
            .with_context(|| format!("invalid base url {:?}", self.base))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("base url {:?} cannot hold a path", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn with_json<T: Serialize + ?Sized>(req: RequestBuilder, body: &T) -> Result<RequestBuilder, Error> {
    let body = serde_json::to_vec(body).context("serializing request body")?;
    Ok(req
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body))
}

async fn send(
    req: RequestBuilder,
    token: Option<&AuthToken>,
    what: &str,
) -> Result<reqwest::Response, Error> {
    let req = match token {
        Some(token) => req.bearer_auth(token.as_str()),
        None => req,
    };
    let resp = req
        .send()
        .await
        .with_context(|| format!("sending {what} request"))?;
    check(resp, what).await
}

async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .bytes()
        .await
        .with_context(|| format!("reading {what} error body"))?;
    let err = api::Error::parse(status.as_u16(), &body);
    tracing::debug!(%status, error = %err, "{what} request failed");
    Err(err.into())
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T, Error> {
    Ok(resp
        .json()
        .await
        .with_context(|| format!("decoding {what} response"))?)
}

/// Decodes a listing, refusing anything that is not a JSON array
///
/// Entries that do not decode are dropped, so one malformed record does not
/// hide the others.
pub(crate) fn list_from_value<T: DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<Vec<T>, Error> {
    let serde_json::Value::Array(items) = value else {
        tracing::warn!("{what} listing is not an array");
        return Err(api::Error::NotAList.into());
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(index = i, error = %e, "dropping malformed {what}");
                None
            }
        })
        .collect())
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn list_comments(
        &self,
        token: Option<&AuthToken>,
        post: &PostId,
    ) -> Result<Vec<CommentRecord>, Error> {
        let url = self.url(&["comment", "post", &post.to_string()])?;
        let resp = send(self.client.get(url), token, "comment list").await?;
        list_from_value(decode(resp, "comment list").await?, "comment")
    }

    async fn create_comment(
        &self,
        token: &AuthToken,
        comment: &NewComment,
    ) -> Result<CommentRecord, Error> {
        let req = with_json(self.client.post(self.url(&["comment"])?), comment)?;
        let resp = send(req, Some(token), "comment creation").await?;
        decode(resp, "comment creation").await
    }

    async fn update_comment(
        &self,
        token: &AuthToken,
        id: &CommentId,
        update: &CommentUpdate,
    ) -> Result<CommentRecord, Error> {
        let url = self.url(&["comment", &id.to_string()])?;
        let req = with_json(self.client.put(url), update)?;
        let resp = send(req, Some(token), "comment update").await?;
        decode(resp, "comment update").await
    }

    async fn delete_comment(&self, token: &AuthToken, id: &CommentId) -> Result<(), Error> {
        let url = self.url(&["comment", &id.to_string()])?;
        send(self.client.delete(url), Some(token), "comment deletion").await?;
        Ok(())
    }

    async fn list_reviews(
        &self,
        token: Option<&AuthToken>,
        course: &CourseId,
    ) -> Result<Vec<Review>, Error> {
        let url = self.url(&["review", "course", &course.to_string()])?;
        let resp = send(self.client.get(url), token, "review list").await?;
        list_from_value(decode(resp, "review list").await?, "review")
    }

    async fn create_review(&self, token: &AuthToken, review: &NewReview) -> Result<Review, Error> {
        let req = with_json(self.client.post(self.url(&["review"])?), review)?;
        let resp = send(req, Some(token), "review creation").await?;
        decode(resp, "review creation").await
    }

    async fn update_review(
        &self,
        token: &AuthToken,
        id: &ReviewId,
        review: &NewReview,
    ) -> Result<Review, Error> {
        let url = self.url(&["review", &id.to_string()])?;
        let req = with_json(self.client.put(url), review)?;
        let resp = send(req, Some(token), "review update").await?;
        decode(resp, "review update").await
    }

    async fn fetch_user(&self, token: &AuthToken, id: &UserId) -> Result<UserProfile, Error> {
        let url = self.url(&["user", &id.to_string()])?;
        let resp = send(self.client.get(url), Some(token), "profile").await?;
        decode(resp, "profile").await
    }

    async fn update_user(
        &self,
        token: &AuthToken,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, Error> {
        let url = self.url(&["user", &id.to_string()])?;
        let req = with_json(self.client.put(url), update)?;
        let resp = send(req, Some(token), "profile update").await?;
        decode(resp, "profile update").await
    }

    async fn change_password(
        &self,
        token: &AuthToken,
        id: &UserId,
        change: &PasswordChange,
    ) -> Result<(), Error> {
        let url = self.url(&["user", &id.to_string(), "password"])?;
        let req = with_json(self.client.put(url), change)?;
        send(req, Some(token), "password change").await?;
        Ok(())
    }

    async fn upload_avatar(
        &self,
        token: &AuthToken,
        id: &UserId,
        image: ImageUpload,
    ) -> Result<AvatarUploaded, Error> {
        let url = self.url(&["user", &id.to_string(), "upload-profile-image"])?;
        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.mime)
            .with_context(|| format!("invalid image type {:?}", image.mime))?;
        let resp = self
            .uploads
            .post(url)
            .bearer_auth(token.as_str())
            .multipart(reqwest::multipart::Form::new().part("file", part))
            .send()
            .await
            .context("sending profile image")?;
        let resp = check(resp, "profile image upload").await?;
        decode(resp, "profile image upload").await
    }
}
