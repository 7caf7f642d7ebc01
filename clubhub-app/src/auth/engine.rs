//! Authorization engine
//!
//! A single pure function decides every guarded operation. Callers resolve
//! the targets first: a missing target is a not-found outcome and never
//! reaches the engine, so a denial always refers to a record that exists.

use std::fmt;

use crate::auth::principal::Principal;
use crate::directory::{Member, User};
use crate::{AppError, AppResult};

/// Why an operation was denied. The display text is the user-facing
/// message returned by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    AdminRequired,
    SelfProtected,
    NotGroupMember,
    NotSameGroup,
    NotProfileOwner,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Unauthenticated => "Authentication required",
            Self::AdminRequired => "Administrator privileges are required",
            Self::SelfProtected => "You cannot perform this action on your own account",
            Self::NotGroupMember => "You are not a member of this group",
            Self::NotSameGroup => "You can only view members of your own group",
            Self::NotProfileOwner => "You can only access your own profile",
        };
        f.write_str(message)
    }
}

/// A guarded operation with its pre-resolved targets
#[derive(Debug)]
pub enum Action<'a> {
    /// Global admin views: dashboard, user list, exports
    ViewAdminData,
    ManageUsers,
    ToggleAdmin {
        target: &'a User,
    },
    DeleteUser {
        target: &'a User,
    },
    ManageGroups,
    ViewGroupDetail {
        members: &'a [Member],
    },
    ViewMemberDetail {
        target: &'a Member,
        own_member: Option<&'a Member>,
    },
    ViewProfile {
        target: &'a User,
    },
    EditProfile {
        target: &'a User,
    },
}

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Convert into the application error taxonomy
    pub fn into_result(self) -> AppResult<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(DenyReason::Unauthenticated) => Err(AppError::Unauthenticated),
            Self::Deny(reason) => Err(AppError::Denied(reason)),
        }
    }
}

/// Decide whether the principal may perform the action. Pure: reads its
/// arguments and nothing else, mutates nothing.
pub fn decide(principal: &Principal, action: &Action<'_>) -> Decision {
    let user = match principal.user() {
        Some(user) => user,
        None => return Decision::Deny(DenyReason::Unauthenticated),
    };

    match action {
        Action::ViewAdminData | Action::ManageUsers | Action::ManageGroups => admin_only(user),

        Action::ToggleAdmin { target } | Action::DeleteUser { target } => {
            // Self-protection comes before the admin rule: even an admin
            // may not toggle or delete their own account.
            if target.id == user.id {
                return Decision::Deny(DenyReason::SelfProtected);
            }
            admin_only(user)
        }

        Action::ViewGroupDetail { members } => {
            if user.is_admin {
                return Decision::Allow;
            }
            if members.iter().any(|m| m.is_linked_to(user.id)) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotGroupMember)
            }
        }

        Action::ViewMemberDetail { target, own_member } => {
            if user.is_admin {
                return Decision::Allow;
            }
            match own_member {
                Some(own) if own.group_id == target.group_id => Decision::Allow,
                _ => Decision::Deny(DenyReason::NotSameGroup),
            }
        }

        Action::ViewProfile { target } | Action::EditProfile { target } => {
            if user.is_admin || user.id == target.id {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotProfileOwner)
            }
        }
    }
}

fn admin_only(user: &User) -> Decision {
    if user.is_admin {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::AdminRequired)
    }
}
