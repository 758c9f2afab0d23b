use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    InProgress,
    Resolved,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::InProgress => "in_progress",
            ContactStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(ContactStatus::New),
            "in_progress" => Some(ContactStatus::InProgress),
            "resolved" => Some(ContactStatus::Resolved),
            _ => None,
        }
    }
}

/// Message sent through the storefront contact form, triaged by admins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ContactInput {
    pub fn into_message(self) -> CoreResult<ContactMessage> {
        let required = [("name", &self.name), ("email", &self.email), ("message", &self.message)];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationError(format!("{} is required", field)));
            }
        }
        if !self.email.contains('@') {
            return Err(CoreError::ValidationError("email is not a valid e-mail".into()));
        }

        let now = Utc::now();
        Ok(ContactMessage {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            subject: self
                .subject
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Contato pelo site".to_string()),
            message: self.message.trim().to_string(),
            status: ContactStatus::New,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_name_email_and_message() {
        let input = ContactInput {
            name: "Lúcia".into(),
            email: "lucia@example.com".into(),
            phone: Some("  ".into()),
            subject: None,
            message: "".into(),
        };
        assert!(matches!(input.clone().into_message(), Err(CoreError::ValidationError(m)) if m == "message is required"));

        let message = ContactInput { message: "Tem vaga para setembro?".into(), ..input }
            .into_message()
            .unwrap();
        assert_eq!(message.status, ContactStatus::New);
        assert_eq!(message.phone, None);
        assert_eq!(message.subject, "Contato pelo site");
    }
}
