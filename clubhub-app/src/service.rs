//! Guarded club operations
//!
//! Every operation follows the same shape: resolve the targets, apply the
//! not-found policy, ask the engine for a decision, and only then read or
//! mutate. Handlers call nothing else.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::auth::{credential, decide, Action, Principal};
use crate::directory::{
    Category, CategoryGroupCount, Directory, DirectoryStats, Group, GroupSummary, Member, NewUser,
    User,
};
use crate::{AppError, AppResult};

const PAGE_SIZE: i64 = 20;

const BIRTHDATE_FORMAT: &str = "%Y-%m-%d";

/// Registration form contents, unvalidated
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub birthdate: String,
}

/// Profile update contents, unvalidated
#[derive(Debug)]
pub struct ProfileChanges {
    pub name: String,
    pub email: String,
    pub birthdate: String,
}

/// Member dashboard payload: the groups the principal may open plus the
/// category list
#[derive(Debug)]
pub struct DashboardData {
    pub groups: Vec<Group>,
    pub categories: Vec<Category>,
}

/// A category and the groups it owns
#[derive(Debug)]
pub struct CategoryGroups {
    pub category: Category,
    pub groups: Vec<Group>,
}

/// Group page payload
#[derive(Debug)]
pub struct GroupDetail {
    pub group: Group,
    pub members: Vec<Member>,
}

/// Member page payload
#[derive(Debug)]
pub struct MemberDetail {
    pub member: Member,
    pub group: Group,
}

/// Admin dashboard payload
#[derive(Debug)]
pub struct AdminDashboard {
    pub stats: DirectoryStats,
    pub category_group_counts: Vec<CategoryGroupCount>,
    pub recent_users: Vec<User>,
}

/// One page of the admin user list
#[derive(Debug)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Result of an admin-flag toggle. `current` is the committed state read
/// back from the same transaction, so the caller's "changed from X to Y"
/// message always agrees with the database.
#[derive(Debug)]
pub struct ToggleAdminOutcome {
    pub user: User,
    pub previous: bool,
    pub current: bool,
}

/// A member row with its linked account, if any
#[derive(Debug)]
pub struct MemberWithUser {
    pub member: Member,
    pub user: Option<User>,
}

/// Admin group page payload
#[derive(Debug)]
pub struct GroupAdminDetail {
    pub group: Group,
    pub category: Category,
    pub members: Vec<MemberWithUser>,
}

/// One group in the full nested export
#[derive(Debug)]
pub struct GroupExport {
    pub group: Group,
    pub category_name: String,
    pub member_count: i64,
    pub members: Vec<MemberWithUser>,
}

/// The guarded operations of the club. Cheap to clone, shares the
/// underlying pool.
#[derive(Debug, Clone)]
pub struct ClubService {
    directory: Directory,
}

impl ClubService {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }

    /// Direct access to the directory, for startup and tests
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    // ----- auth lifecycle -----

    /// Create a new account. Each rejected input gets its own reason.
    pub async fn register(&self, registration: Registration) -> AppResult<User> {
        let name = registration.name.trim();
        let email = registration.email.trim();

        if name.is_empty()
            || email.is_empty()
            || registration.password.is_empty()
            || registration.confirm_password.is_empty()
            || registration.birthdate.trim().is_empty()
        {
            return Err(AppError::validation("All fields are required"));
        }
        if registration.password != registration.confirm_password {
            return Err(AppError::validation("Passwords do not match"));
        }
        let birthdate = parse_birthdate(&registration.birthdate)?;
        if self.directory.name_exists(name).await? {
            return Err(AppError::validation("This name is already taken"));
        }
        if self.directory.email_exists(email).await? {
            return Err(AppError::validation("This email is already registered"));
        }

        let password_hash = credential::hash_password(&registration.password)?;
        let user = self
            .directory
            .insert_user(&NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                is_admin: false,
                birthdate,
            })
            .await?;

        info!(user_id = user.id, name = %user.name, "Registered new account");
        Ok(user)
    }

    /// Verify credentials. The failure is deliberately generic so a caller
    /// cannot probe which names exist.
    pub async fn login(&self, name: &str, password: &str) -> AppResult<User> {
        debug!(name, "Login attempt");

        let user = match self.directory.user_by_name(name).await? {
            Some(user) => user,
            None => {
                warn!(name, "Login failed: unknown name");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !credential::verify_password(password, &user.password_hash) {
            warn!(name, "Login failed: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = user.id, name = %user.name, "Login succeeded");
        Ok(user)
    }

    /// Turn a token subject into a request principal. A stale id (user row
    /// deleted since the token was issued) resolves to anonymous.
    pub async fn resolve_principal(&self, user_id: Option<i64>) -> AppResult<Principal> {
        let Some(user_id) = user_id else {
            return Ok(Principal::Anonymous);
        };
        match self.directory.user_by_id(user_id).await? {
            Some(user) => Ok(Principal::User(user)),
            None => Ok(Principal::Anonymous),
        }
    }

    // ----- member-scoped operations -----

    /// The groups the principal may open plus the category list. Admins see
    /// every group; a linked member sees their own group; an unlinked user
    /// sees none.
    pub async fn dashboard(&self, principal: &Principal) -> AppResult<DashboardData> {
        let user = principal.user().ok_or(AppError::Unauthenticated)?;

        let groups = if user.is_admin {
            self.directory.list_groups().await?
        } else {
            match self.directory.member_for_user(user.id).await? {
                Some(member) => match self.directory.group_by_id(member.group_id).await? {
                    Some(group) => vec![group],
                    None => Vec::new(),
                },
                None => Vec::new(),
            }
        };

        let categories = self.directory.categories().await?;
        Ok(DashboardData { groups, categories })
    }

    pub async fn list_categories(&self, principal: &Principal) -> AppResult<Vec<Category>> {
        if principal.is_anonymous() {
            return Err(AppError::Unauthenticated);
        }
        self.directory.categories().await
    }

    pub async fn category_groups(
        &self,
        principal: &Principal,
        category_id: i64,
    ) -> AppResult<CategoryGroups> {
        if principal.is_anonymous() {
            return Err(AppError::Unauthenticated);
        }
        let category = self
            .directory
            .category_by_id(category_id)
            .await?
            .ok_or_else(|| AppError::not_found("Category"))?;
        let groups = self.directory.groups_in_category(category_id).await?;
        Ok(CategoryGroups { category, groups })
    }

    pub async fn view_group_detail(
        &self,
        principal: &Principal,
        group_id: i64,
    ) -> AppResult<GroupDetail> {
        let group = self
            .directory
            .group_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group"))?;
        let members = self.directory.members_of_group(group_id).await?;

        decide(principal, &Action::ViewGroupDetail { members: &members }).into_result()?;
        Ok(GroupDetail { group, members })
    }

    pub async fn view_member_detail(
        &self,
        principal: &Principal,
        member_id: i64,
    ) -> AppResult<MemberDetail> {
        let member = self
            .directory
            .member_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::not_found("Member"))?;

        let own_member = match principal.id() {
            Some(user_id) => self.directory.member_for_user(user_id).await?,
            None => None,
        };

        decide(
            principal,
            &Action::ViewMemberDetail {
                target: &member,
                own_member: own_member.as_ref(),
            },
        )
        .into_result()?;

        let group = self
            .directory
            .group_by_id(member.group_id)
            .await?
            .ok_or_else(|| {
                AppError::internal(format!("member {} references a missing group", member.id))
            })?;

        Ok(MemberDetail { member, group })
    }

    pub async fn view_profile(&self, principal: &Principal, user_id: i64) -> AppResult<User> {
        let target = self
            .directory
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        decide(principal, &Action::ViewProfile { target: &target }).into_result()?;
        Ok(target)
    }

    /// Update a profile. Re-validates name and email uniqueness against
    /// every other account inside the guarded path.
    pub async fn update_profile(
        &self,
        principal: &Principal,
        user_id: i64,
        changes: ProfileChanges,
    ) -> AppResult<User> {
        let target = self
            .directory
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        decide(principal, &Action::EditProfile { target: &target }).into_result()?;

        let name = changes.name.trim();
        let email = changes.email.trim();
        if name.is_empty() || email.is_empty() || changes.birthdate.trim().is_empty() {
            return Err(AppError::validation("All fields are required"));
        }
        let birthdate = parse_birthdate(&changes.birthdate)?;
        if self.directory.name_taken_by_other(name, user_id).await? {
            return Err(AppError::validation("This name is already taken"));
        }
        if self.directory.email_taken_by_other(email, user_id).await? {
            return Err(AppError::validation("This email is already registered"));
        }

        let updated = self
            .directory
            .update_user_profile(user_id, name, email, birthdate)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        info!(user_id, "Profile updated");
        Ok(updated)
    }

    // ----- admin operations -----

    pub async fn admin_dashboard(&self, principal: &Principal) -> AppResult<AdminDashboard> {
        decide(principal, &Action::ViewAdminData).into_result()?;

        let stats = self.directory.stats().await?;
        let category_group_counts = self.directory.category_group_counts().await?;
        let recent_users = self.directory.recent_users(5).await?;

        Ok(AdminDashboard {
            stats,
            category_group_counts,
            recent_users,
        })
    }

    pub async fn list_users(&self, principal: &Principal, page: i64) -> AppResult<UserPage> {
        decide(principal, &Action::ManageUsers).into_result()?;

        let page = page.max(1);
        let offset = (page - 1) * PAGE_SIZE;
        let total = self.directory.count_users().await?;
        let users = self.directory.list_users(PAGE_SIZE, offset).await?;

        Ok(UserPage {
            users,
            total,
            page,
            per_page: PAGE_SIZE,
        })
    }

    /// Flip a user's admin flag. The outcome carries the committed state so
    /// two racing toggles each report what their own transaction wrote.
    pub async fn toggle_user_admin(
        &self,
        principal: &Principal,
        user_id: i64,
    ) -> AppResult<ToggleAdminOutcome> {
        let target = self
            .directory
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        decide(principal, &Action::ToggleAdmin { target: &target }).into_result()?;

        let user = self
            .directory
            .toggle_admin(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        // The toggle flips atomically, so the pre-image is the negation of
        // the committed row.
        let current = user.is_admin;
        let previous = !current;
        info!(
            user_id,
            previous,
            current,
            by = %principal.summary(),
            "Admin flag toggled"
        );
        Ok(ToggleAdminOutcome {
            user,
            previous,
            current,
        })
    }

    pub async fn delete_user(&self, principal: &Principal, user_id: i64) -> AppResult<()> {
        let target = self
            .directory
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        decide(principal, &Action::DeleteUser { target: &target }).into_result()?;

        if !self.directory.delete_user(user_id).await? {
            return Err(AppError::not_found("User"));
        }
        info!(user_id, by = %principal.summary(), "User deleted");
        Ok(())
    }

    pub async fn list_groups_admin(&self, principal: &Principal) -> AppResult<Vec<GroupSummary>> {
        decide(principal, &Action::ManageGroups).into_result()?;
        self.directory.groups_with_counts().await
    }

    pub async fn group_admin_detail(
        &self,
        principal: &Principal,
        group_id: i64,
    ) -> AppResult<GroupAdminDetail> {
        let group = self
            .directory
            .group_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group"))?;

        decide(principal, &Action::ManageGroups).into_result()?;

        let category = self
            .directory
            .category_by_id(group.category_id)
            .await?
            .ok_or_else(|| {
                AppError::internal(format!("group {} references a missing category", group.id))
            })?;
        let members = self.with_linked_users(group_id).await?;

        Ok(GroupAdminDetail {
            group,
            category,
            members,
        })
    }

    pub async fn create_group(
        &self,
        principal: &Principal,
        name: Option<String>,
        category_id: Option<i64>,
    ) -> AppResult<Group> {
        decide(principal, &Action::ManageGroups).into_result()?;

        let name = name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            return Err(AppError::validation("Group name is required"));
        }
        let category_id = category_id.ok_or_else(|| AppError::validation("Category is required"))?;
        if self.directory.category_by_id(category_id).await?.is_none() {
            return Err(AppError::validation("Unknown category"));
        }
        if self.directory.group_name_exists(&name).await? {
            return Err(AppError::validation("A group with this name already exists"));
        }

        let group = self.directory.insert_group(&name, category_id).await?;
        info!(group_id = group.id, name = %group.name, "Group created");
        Ok(group)
    }

    pub async fn delete_group(&self, principal: &Principal, group_id: i64) -> AppResult<()> {
        if self.directory.group_by_id(group_id).await?.is_none() {
            return Err(AppError::not_found("Group"));
        }

        decide(principal, &Action::ManageGroups).into_result()?;

        if !self.directory.delete_group(group_id).await? {
            return Err(AppError::not_found("Group"));
        }
        info!(group_id, by = %principal.summary(), "Group deleted");
        Ok(())
    }

    /// Full nested export: every group with its members and their linked
    /// accounts.
    pub async fn all_groups_data(&self, principal: &Principal) -> AppResult<Vec<GroupExport>> {
        decide(principal, &Action::ViewAdminData).into_result()?;

        let summaries = self.directory.groups_with_counts().await?;
        let mut exports = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let members = self.with_linked_users(summary.group.id).await?;
            exports.push(GroupExport {
                group: summary.group,
                category_name: summary.category_name,
                member_count: summary.member_count,
                members,
            });
        }
        Ok(exports)
    }

    async fn with_linked_users(&self, group_id: i64) -> AppResult<Vec<MemberWithUser>> {
        let members = self.directory.members_of_group(group_id).await?;
        let mut rows = Vec::with_capacity(members.len());
        for member in members {
            let user = match member.user_id {
                Some(user_id) => self.directory.user_by_id(user_id).await?,
                None => None,
            };
            rows.push(MemberWithUser { member, user });
        }
        Ok(rows)
    }
}

fn parse_birthdate(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), BIRTHDATE_FORMAT)
        .map_err(|_| AppError::validation("Birthdate must be a valid YYYY-MM-DD date"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DenyReason;
    use crate::directory::NewMember;

    async fn service() -> ClubService {
        let directory = Directory::in_memory().await.unwrap();
        let service = ClubService::new(directory);
        service.directory().create_tables().await.unwrap();
        service.directory().seed_defaults().await.unwrap();
        service
    }

    fn registration(name: &str) -> Registration {
        Registration {
            name: name.to_string(),
            email: format!("{name}@club.com"),
            password: "pass1234".to_string(),
            confirm_password: "pass1234".to_string(),
            birthdate: "1995-06-15".to_string(),
        }
    }

    async fn admin_principal(service: &ClubService) -> Principal {
        let admin = service
            .directory()
            .user_by_name("admin")
            .await
            .unwrap()
            .unwrap();
        Principal::User(admin)
    }

    async fn register_principal(service: &ClubService, name: &str) -> Principal {
        let user = service.register(registration(name)).await.unwrap();
        Principal::User(user)
    }

    async fn make_group(service: &ClubService, name: &str) -> Group {
        let categories = service.directory().categories().await.unwrap();
        service
            .directory()
            .insert_group(name, categories[0].id)
            .await
            .unwrap()
    }

    async fn make_member(
        service: &ClubService,
        name: &str,
        group_id: i64,
        user_id: Option<i64>,
    ) -> Member {
        service
            .directory()
            .insert_member(&NewMember {
                name: name.to_string(),
                department: None,
                blog_url: None,
                group_id,
                user_id,
            })
            .await
            .unwrap()
    }

    fn validation_message(result: AppResult<User>) -> String {
        match result {
            Err(AppError::Validation { message }) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_creates_exactly_one_account() {
        let service = service().await;
        let before = service.directory().count_users().await.unwrap();

        let user = service.register(registration("alice")).await.unwrap();

        let after = service.directory().count_users().await.unwrap();
        assert_eq!(after, before + 1);
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "pass1234");
    }

    #[tokio::test]
    async fn register_rejects_each_bad_input_with_its_own_reason() {
        let service = service().await;

        let mut blank = registration("blank");
        blank.email = String::new();
        assert_eq!(
            validation_message(service.register(blank).await),
            "All fields are required"
        );

        let mut mismatch = registration("mismatch");
        mismatch.confirm_password = "different".to_string();
        assert_eq!(
            validation_message(service.register(mismatch).await),
            "Passwords do not match"
        );

        let mut bad_date = registration("baddate");
        bad_date.birthdate = "15/06/1995".to_string();
        assert_eq!(
            validation_message(service.register(bad_date).await),
            "Birthdate must be a valid YYYY-MM-DD date"
        );

        service.register(registration("taken")).await.unwrap();
        assert_eq!(
            validation_message(service.register(registration("taken")).await),
            "This name is already taken"
        );

        let mut dup_email = registration("other");
        dup_email.email = "taken@club.com".to_string();
        assert_eq!(
            validation_message(service.register(dup_email).await),
            "This email is already registered"
        );
    }

    #[tokio::test]
    async fn rejected_registration_inserts_nothing() {
        let service = service().await;
        service.register(registration("taken")).await.unwrap();
        let before = service.directory().count_users().await.unwrap();

        let result = service.register(registration("taken")).await;
        assert!(result.is_err());
        assert_eq!(service.directory().count_users().await.unwrap(), before);
    }

    #[tokio::test]
    async fn login_failure_is_the_same_for_unknown_name_and_bad_password() {
        let service = service().await;
        service.register(registration("alice")).await.unwrap();

        let unknown = service.login("nobody", "pass1234").await.unwrap_err();
        let mismatch = service.login("alice", "wrong").await.unwrap_err();

        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(mismatch, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), mismatch.to_string());
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_credentials() {
        let service = service().await;
        service.register(registration("alice")).await.unwrap();

        let user = service.login("alice", "pass1234").await.unwrap();
        assert_eq!(user.name, "alice");
    }

    #[tokio::test]
    async fn stale_token_subject_resolves_to_anonymous() {
        let service = service().await;
        assert!(service
            .resolve_principal(None)
            .await
            .unwrap()
            .is_anonymous());
        assert!(service
            .resolve_principal(Some(9999))
            .await
            .unwrap()
            .is_anonymous());

        let user = service.register(registration("alice")).await.unwrap();
        let principal = service.resolve_principal(Some(user.id)).await.unwrap();
        assert_eq!(principal.id(), Some(user.id));
    }

    #[tokio::test]
    async fn missing_target_reads_as_not_found_even_for_non_admins() {
        let service = service().await;
        let outsider = register_principal(&service, "outsider").await;

        assert!(matches!(
            service.toggle_user_admin(&outsider, 9999).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            service.view_group_detail(&outsider, 9999).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            service.view_member_detail(&outsider, 9999).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            service.view_profile(&outsider, 9999).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            service.delete_group(&outsider, 9999).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn admin_cannot_toggle_or_delete_their_own_account() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let admin_id = admin.id().unwrap();

        assert!(matches!(
            service.toggle_user_admin(&admin, admin_id).await,
            Err(AppError::Denied(DenyReason::SelfProtected))
        ));
        assert!(matches!(
            service.delete_user(&admin, admin_id).await,
            Err(AppError::Denied(DenyReason::SelfProtected))
        ));
        assert!(service
            .directory()
            .user_by_id(admin_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn non_admin_is_denied_the_admin_surface() {
        let service = service().await;
        let outsider = register_principal(&service, "outsider").await;
        let alice = service.register(registration("alice")).await.unwrap();

        assert!(matches!(
            service.admin_dashboard(&outsider).await,
            Err(AppError::Denied(DenyReason::AdminRequired))
        ));
        assert!(matches!(
            service.list_users(&outsider, 1).await,
            Err(AppError::Denied(DenyReason::AdminRequired))
        ));
        assert!(matches!(
            service.toggle_user_admin(&outsider, alice.id).await,
            Err(AppError::Denied(DenyReason::AdminRequired))
        ));
        assert!(matches!(
            service.list_groups_admin(&outsider).await,
            Err(AppError::Denied(DenyReason::AdminRequired))
        ));
        assert!(matches!(
            service.all_groups_data(&outsider).await,
            Err(AppError::Denied(DenyReason::AdminRequired))
        ));
    }

    #[tokio::test]
    async fn toggle_reports_the_committed_state() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let alice = service.register(registration("alice")).await.unwrap();

        let outcome = service.toggle_user_admin(&admin, alice.id).await.unwrap();
        assert!(!outcome.previous);
        assert!(outcome.current);
        assert_eq!(outcome.user.is_admin, outcome.current);

        let stored = service
            .directory()
            .user_by_id(alice.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_admin);
    }

    #[tokio::test]
    async fn concurrent_toggles_each_report_their_own_committed_state() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let alice = service.register(registration("alice")).await.unwrap();

        let (first, second) = tokio::join!(
            service.toggle_user_admin(&admin, alice.id),
            service.toggle_user_admin(&admin, alice.id),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        // One transaction flips false -> true, the other true -> false.
        assert_ne!(first.current, second.current);
        assert_eq!(first.previous, !first.current);
        assert_eq!(second.previous, !second.current);

        let stored = service
            .directory()
            .user_by_id(alice.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_admin);
    }

    #[tokio::test]
    async fn delete_user_removes_the_account() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let alice = service.register(registration("alice")).await.unwrap();

        service.delete_user(&admin, alice.id).await.unwrap();
        assert!(service
            .directory()
            .user_by_id(alice.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn group_detail_is_scoped_to_linked_members() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let group = make_group(&service, "Alpha").await;

        let insider = register_principal(&service, "insider").await;
        let outsider = register_principal(&service, "outsider").await;
        make_member(&service, "Insider", group.id, insider.id()).await;

        let detail = service.view_group_detail(&insider, group.id).await.unwrap();
        assert_eq!(detail.group.id, group.id);
        assert_eq!(detail.members.len(), 1);

        assert!(matches!(
            service.view_group_detail(&outsider, group.id).await,
            Err(AppError::Denied(DenyReason::NotGroupMember))
        ));
        assert!(service.view_group_detail(&admin, group.id).await.is_ok());
    }

    #[tokio::test]
    async fn member_detail_requires_a_shared_group() {
        let service = service().await;
        let alpha = make_group(&service, "Alpha").await;
        let beta = make_group(&service, "Beta").await;

        let insider = register_principal(&service, "insider").await;
        make_member(&service, "Insider", alpha.id, insider.id()).await;
        let peer = make_member(&service, "Peer", alpha.id, None).await;
        let stranger = make_member(&service, "Stranger", beta.id, None).await;

        let detail = service.view_member_detail(&insider, peer.id).await.unwrap();
        assert_eq!(detail.member.id, peer.id);
        assert_eq!(detail.group.id, alpha.id);

        assert!(matches!(
            service.view_member_detail(&insider, stranger.id).await,
            Err(AppError::Denied(DenyReason::NotSameGroup))
        ));
    }

    #[tokio::test]
    async fn profile_access_is_owner_or_admin() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let alice = register_principal(&service, "alice").await;
        let bob = register_principal(&service, "bob").await;
        let bob_id = bob.id().unwrap();

        assert!(service.view_profile(&bob, bob_id).await.is_ok());
        assert!(service.view_profile(&admin, bob_id).await.is_ok());
        assert!(matches!(
            service.view_profile(&alice, bob_id).await,
            Err(AppError::Denied(DenyReason::NotProfileOwner))
        ));
    }

    #[tokio::test]
    async fn profile_update_revalidates_uniqueness() {
        let service = service().await;
        let alice = register_principal(&service, "alice").await;
        let bob = register_principal(&service, "bob").await;
        let bob_id = bob.id().unwrap();

        let result = service
            .update_profile(
                &bob,
                bob_id,
                ProfileChanges {
                    name: "bob".to_string(),
                    email: "alice@club.com".to_string(),
                    birthdate: "1995-06-15".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));

        let updated = service
            .update_profile(
                &bob,
                bob_id,
                ProfileChanges {
                    name: "bobby".to_string(),
                    email: "bobby@club.com".to_string(),
                    birthdate: "1994-02-28".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "bobby");
        assert_eq!(updated.email, "bobby@club.com");

        assert!(matches!(
            service
                .update_profile(
                    &alice,
                    bob_id,
                    ProfileChanges {
                        name: "hijack".to_string(),
                        email: "hijack@club.com".to_string(),
                        birthdate: "1990-01-01".to_string(),
                    },
                )
                .await,
            Err(AppError::Denied(DenyReason::NotProfileOwner))
        ));
    }

    #[tokio::test]
    async fn dashboard_scopes_groups_to_the_principal() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let alpha = make_group(&service, "Alpha").await;
        make_group(&service, "Beta").await;

        let linked = register_principal(&service, "linked").await;
        make_member(&service, "Linked", alpha.id, linked.id()).await;
        let unlinked = register_principal(&service, "unlinked").await;

        let admin_view = service.dashboard(&admin).await.unwrap();
        assert_eq!(admin_view.groups.len(), 2);
        assert_eq!(admin_view.categories.len(), 2);

        let linked_view = service.dashboard(&linked).await.unwrap();
        assert_eq!(linked_view.groups.len(), 1);
        assert_eq!(linked_view.groups[0].id, alpha.id);

        let unlinked_view = service.dashboard(&unlinked).await.unwrap();
        assert!(unlinked_view.groups.is_empty());

        assert!(matches!(
            service.dashboard(&Principal::Anonymous).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn category_listing_requires_authentication() {
        let service = service().await;
        let alice = register_principal(&service, "alice").await;

        assert!(matches!(
            service.list_categories(&Principal::Anonymous).await,
            Err(AppError::Unauthenticated)
        ));

        let categories = service.list_categories(&alice).await.unwrap();
        assert_eq!(categories.len(), 2);

        let listing = service
            .category_groups(&alice, categories[0].id)
            .await
            .unwrap();
        assert_eq!(listing.category.id, categories[0].id);

        assert!(matches!(
            service.category_groups(&alice, 9999).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn create_group_rejects_each_bad_input_with_its_own_reason() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let categories = service.directory().categories().await.unwrap();

        let message = |result: AppResult<Group>| match result {
            Err(AppError::Validation { message }) => message,
            other => panic!("expected validation error, got {other:?}"),
        };

        assert_eq!(
            message(service.create_group(&admin, None, Some(categories[0].id)).await),
            "Group name is required"
        );
        assert_eq!(
            message(
                service
                    .create_group(&admin, Some("Alpha".to_string()), None)
                    .await
            ),
            "Category is required"
        );
        assert_eq!(
            message(
                service
                    .create_group(&admin, Some("Alpha".to_string()), Some(9999))
                    .await
            ),
            "Unknown category"
        );

        service
            .create_group(&admin, Some("Alpha".to_string()), Some(categories[0].id))
            .await
            .unwrap();
        assert_eq!(
            message(
                service
                    .create_group(&admin, Some("Alpha".to_string()), Some(categories[0].id))
                    .await
            ),
            "A group with this name already exists"
        );
    }

    #[tokio::test]
    async fn admin_group_views_carry_members_and_linked_accounts() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let group = make_group(&service, "Alpha").await;
        let linked = register_principal(&service, "linked").await;
        make_member(&service, "Linked", group.id, linked.id()).await;
        make_member(&service, "Loose", group.id, None).await;

        let detail = service.group_admin_detail(&admin, group.id).await.unwrap();
        assert_eq!(detail.members.len(), 2);
        assert!(detail.members.iter().any(|m| m.user.is_some()));
        assert!(detail.members.iter().any(|m| m.user.is_none()));

        let exports = service.all_groups_data(&admin).await.unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].member_count, 2);
        assert_eq!(exports[0].members.len(), 2);

        let summaries = service.list_groups_admin(&admin).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].member_count, 2);
    }

    #[tokio::test]
    async fn delete_group_takes_its_members_with_it() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        let group = make_group(&service, "Alpha").await;
        let member = make_member(&service, "Solo", group.id, None).await;

        service.delete_group(&admin, group.id).await.unwrap();
        assert!(service
            .directory()
            .group_by_id(group.id)
            .await
            .unwrap()
            .is_none());
        assert!(service
            .directory()
            .member_by_id(member.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn user_list_pages_by_twenty() {
        let service = service().await;
        let admin = admin_principal(&service).await;
        for i in 0..25 {
            service.register(registration(&format!("user{i}"))).await.unwrap();
        }

        let first = service.list_users(&admin, 1).await.unwrap();
        assert_eq!(first.users.len(), 20);
        assert_eq!(first.total, 26);
        assert_eq!(first.per_page, 20);

        let second = service.list_users(&admin, 2).await.unwrap();
        assert_eq!(second.users.len(), 6);

        // A zero or negative page clamps to the first page.
        let clamped = service.list_users(&admin, 0).await.unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.users.len(), 20);
    }
}
