use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Contact details supplied with a reservation request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuestContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl GuestContact {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), email: None, phone: None }
    }

    /// Returns the email/phone pair to persist when the stored values differ
    /// from the supplied ones, or `None` when nothing changed.
    pub fn contact_update(&self, existing: &User) -> Option<(Option<String>, Option<String>)> {
        let email_changed = matches!(&self.email, Some(email) if existing.email.as_ref() != Some(email));
        let phone_changed = matches!(&self.phone, Some(phone) if existing.phone.as_ref() != Some(phone));

        if !email_changed && !phone_changed {
            return None;
        }

        Some((
            self.email.clone().or_else(|| existing.email.clone()),
            self.phone.clone().or_else(|| existing.phone.clone()),
        ))
    }
}

/// The guest fields embedded in booking and appointment responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSummary {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&User> for GuestSummary {
    fn from(user: &User) -> Self {
        Self { name: user.name.clone(), email: user.email.clone(), phone: user.phone.clone() }
    }
}
