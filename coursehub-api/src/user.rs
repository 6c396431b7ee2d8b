use crate::{id::id_type, time::date_to_iso, Error, FieldErrors, Timestamp};

id_type!(UserId);

pub const DEFAULT_ROLE: &str = "Student";
pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static::lazy_static! {
    static ref EMAIL: regex::Regex = regex::Regex::new(r"\S+@\S+\.\S+").expect("email regex");
    static ref PHONE: regex::Regex = regex::Regex::new(r"^\+?\d{9,12}$").expect("phone regex");
}

fn default_role() -> String {
    String::from(DEFAULT_ROLE)
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,

    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub birth_date: Option<String>,

    #[serde(default)]
    pub profile_image: Option<String>,

    #[serde(default = "default_role")]
    pub role: String,

    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl UserProfile {
    /// Profile as it would pre-fill the edit form
    pub fn to_form(&self) -> ProfileForm {
        ProfileForm {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone().unwrap_or_default(),
            birth_date: self
                .birth_date
                .as_ref()
                .and_then(|d| Timestamp(d.clone()).parse())
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Contact info as typed by the user; empty strings mean "not set"
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,

    /// `YYYY-MM-DD`
    pub birth_date: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = FieldErrors::new();
        if self.full_name.trim().is_empty() {
            errors.insert("fullName".into(), "Full name must not be empty".into());
        }
        if self.email.trim().is_empty() || !EMAIL.is_match(&self.email) {
            errors.insert("email".into(), "Invalid email".into());
        }
        if !self.phone.is_empty() && !PHONE.is_match(&self.phone) {
            errors.insert("phone".into(), "Invalid phone number".into());
        }
        if !self.birth_date.trim().is_empty() && date_to_iso(&self.birth_date).is_none() {
            errors.insert("birthDate".into(), "Invalid birth date".into());
        }
        match errors.is_empty() {
            true => Ok(()),
            false => Err(Error::InvalidForm(errors)),
        }
    }

    pub fn to_update(&self, role: Option<&str>) -> ProfileUpdate {
        ProfileUpdate {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone: Some(self.phone.clone()).filter(|p| !p.is_empty()),
            birth_date: date_to_iso(&self.birth_date),
            role: role.map(String::from).unwrap_or_else(default_role),
        }
    }
}

/// Body of a profile update; absent values go out as explicit nulls
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub role: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = FieldErrors::new();
        if self.password.is_empty() {
            errors.insert("password".into(), "Password must not be empty".into());
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert(
                "password".into(),
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        if self.password != self.confirm_password {
            errors.insert("confirmPassword".into(), "Passwords do not match".into());
        }
        match errors.is_empty() {
            true => Ok(()),
            false => Err(Error::InvalidForm(errors)),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUploaded {
    pub profile_image: String,
}
