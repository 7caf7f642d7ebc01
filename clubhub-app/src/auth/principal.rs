//! Session principal

use crate::directory::User;

/// The identity a request acts as: a freshly resolved user row or
/// anonymous. Immutable for the duration of a request.
#[derive(Debug, Clone)]
pub enum Principal {
    Anonymous,
    User(User),
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    pub fn is_admin(&self) -> bool {
        self.user().map_or(false, |u| u.is_admin)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Short description for logging
    pub fn summary(&self) -> String {
        match self {
            Self::User(user) => format!("{}({})", user.name, user.id),
            Self::Anonymous => "anonymous".to_string(),
        }
    }
}
