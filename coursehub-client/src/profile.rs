use std::cell::RefCell;

use chrono::Utc;

use crate::{
    api::{self, PasswordChange, ProfileForm, UserProfile},
    report, Backend, Error, ImageUpload, Notice, Notifier, Session, Submitting,
};

pub const NO_CREATION_DATE: &str = "No creation date";

/// Account page of the logged-in user
pub struct ProfileEditor<B, N> {
    backend: B,
    notifier: N,
    session: Option<Session>,
    profile: RefCell<Option<UserProfile>>,
    submitting: Submitting,
}

impl<B: Backend, N: Notifier> ProfileEditor<B, N> {
    pub fn new(backend: B, notifier: N, session: Option<Session>) -> Self {
        ProfileEditor {
            backend,
            notifier,
            session,
            profile: RefCell::new(None),
            submitting: Submitting::default(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.borrow().clone()
    }

    /// The edit form, filled with what is currently known
    pub fn form(&self) -> ProfileForm {
        self.profile
            .borrow()
            .as_ref()
            .map(UserProfile::to_form)
            .unwrap_or_default()
    }

    pub fn has_unsaved_changes(&self, form: &ProfileForm) -> bool {
        *form != self.form()
    }

    pub fn format_created_at(&self) -> String {
        match self.profile.borrow().as_ref().and_then(|p| p.created_at.as_ref()) {
            Some(t) => t.display_date_or(NO_CREATION_DATE),
            None => String::from(NO_CREATION_DATE),
        }
    }

    fn session(&self) -> Result<&Session, api::Error> {
        self.session.as_ref().ok_or(api::Error::MissingToken)
    }

    pub async fn load(&self) -> Result<UserProfile, Error> {
        let res = self.try_load().await;
        if let Err(e) = &res {
            tracing::error!(error = ?e, "failed to load profile");
            let fallback = "Could not load your profile, please try again later";
            self.notifier.notify(Notice::error(e.user_message(fallback)));
        }
        res
    }

    async fn try_load(&self) -> Result<UserProfile, Error> {
        let session = self.session()?;
        let id = session.require_user()?;
        let profile = self.backend.fetch_user(session.token(), id).await?;
        *self.profile.borrow_mut() = Some(profile.clone());
        Ok(profile)
    }

    /// Saves the contact info, then uploads `avatar` if one was picked
    ///
    /// The role is carried over from the loaded profile. If the upload fails
    /// after the info was saved, the saved info is kept.
    pub async fn update_info(
        &self,
        form: &ProfileForm,
        avatar: Option<ImageUpload>,
    ) -> Result<UserProfile, Error> {
        let res = self.try_update_info(form, avatar).await;
        report(
            &self.notifier,
            res,
            "Profile updated",
            "Could not update your profile, please try again later",
        )
    }

    async fn try_update_info(
        &self,
        form: &ProfileForm,
        avatar: Option<ImageUpload>,
    ) -> Result<UserProfile, Error> {
        let _guard = self.submitting.start()?;
        form.validate()?;
        let session = self.session()?;
        session.ensure_fresh(Utc::now())?;
        let (token, id) = (session.token(), session.require_user()?);

        let role = self.profile.borrow().as_ref().map(|p| p.role.clone());
        let update = form.to_update(role.as_deref());
        let mut updated = self.backend.update_user(token, id, &update).await?;
        *self.profile.borrow_mut() = Some(updated.clone());
        tracing::info!(%id, "profile updated");

        if let Some(image) = avatar {
            let uploaded = self.backend.upload_avatar(token, id, image).await?;
            updated.profile_image = Some(uploaded.profile_image);
            *self.profile.borrow_mut() = Some(updated.clone());
            tracing::info!(%id, "profile image uploaded");
        }
        Ok(updated)
    }

    pub async fn change_password(&self, password: &str, confirm: &str) -> Result<(), Error> {
        let res = self.try_change_password(password, confirm).await;
        report(
            &self.notifier,
            res,
            "Password changed",
            "Could not change your password, please try again later",
        )
    }

    async fn try_change_password(&self, password: &str, confirm: &str) -> Result<(), Error> {
        let _guard = self.submitting.start()?;
        let change = PasswordChange {
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        };
        change.validate()?;
        let session = self.session()?;
        session.ensure_fresh(Utc::now())?;
        let (token, id) = (session.token(), session.require_user()?);

        self.backend.change_password(token, id, &change).await?;
        tracing::info!(%id, "password changed");
        Ok(())
    }
}
