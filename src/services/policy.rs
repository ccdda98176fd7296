//! Pure permission decisions.
//!
//! Every mutating handler builds an [`Action`] describing what the
//! requester is about to do and asks [`authorize`] before touching the
//! stores. The decision depends only on the requester's claims and the
//! action, so the whole rule set is unit-testable without a database.

use crate::errors::ApiError;
use crate::types::internal::{Claims, Role};

/// The resource kinds the policy treats uniformly under rules 7 and 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Connection,
    Query,
    Chart,
    Report,
    Contact,
    Publication,
}

impl ResourceKind {
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Connection => "connections",
            ResourceKind::Query => "queries",
            ResourceKind::Chart => "charts",
            ResourceKind::Report => "reports",
            ResourceKind::Contact => "contacts",
            ResourceKind::Publication => "publications",
        }
    }
}

/// What the requester is attempting.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateUser,
    EditUser { target_id: i32, changes_role: bool },
    DeleteUser { target_id: i32, target_role: Role },
    ViewAllUsers,
    ViewUsergroupsOf { target_id: i32 },
    CreateUsergroup,
    EditUsergroup { personal: bool },
    DeleteUsergroup { personal: bool },
    ViewAllUsergroups,
    CreateResource(ResourceKind),
    EditResource(ResourceKind),
    DeleteResource(ResourceKind),
    ViewAllResources(ResourceKind),
}

impl Action {
    /// Read-only actions stay permitted for deactivated requesters whose
    /// token has not yet expired; everything else is blocked outright.
    fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Action::ViewAllUsers
                | Action::ViewUsergroupsOf { .. }
                | Action::ViewAllUsergroups
                | Action::ViewAllResources(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    fn deny(reason: impl Into<String>) -> Decision {
        Decision::Deny(reason.into())
    }
}

/// Decide whether `claims` may perform `action`. Rules are evaluated in
/// precedence order; the first matching rule wins.
pub fn decide(claims: &Claims, action: &Action) -> Decision {
    // Rule 1: inactive requesters cannot mutate anything.
    if !claims.is_active && action.is_mutating() {
        return Decision::deny("Account is inactive.");
    }

    match action {
        // Rule 2: self-service on non-role fields; own role change is
        // admin-gated. Editing anyone else is admin-gated (rule 3).
        Action::EditUser {
            target_id,
            changes_role,
        } => {
            if *target_id == claims.user_id {
                if *changes_role && !claims.role.is_admin() {
                    Decision::deny("User must have admin privileges to change roles.")
                } else {
                    Decision::Allow
                }
            } else if claims.role.is_admin() {
                Decision::Allow
            } else {
                Decision::deny("User must have admin privileges to edit other users.")
            }
        }

        // Rule 3: creating users is admin work.
        Action::CreateUser => {
            if claims.role.is_admin() {
                Decision::Allow
            } else {
                Decision::deny("User must have admin privileges to create new users.")
            }
        }

        // Rules 3-5: deletion is admin work, superusers are only
        // deletable by superusers, and nobody deletes themselves.
        Action::DeleteUser {
            target_id,
            target_role,
        } => {
            if !claims.role.is_admin() {
                Decision::deny("User must have admin privileges to delete a user.")
            } else if *target_role == Role::Superuser && claims.role != Role::Superuser {
                Decision::deny("User must have superuser privileges to delete a superuser.")
            } else if *target_id == claims.user_id {
                Decision::deny("Users cannot delete their own account.")
            } else {
                Decision::Allow
            }
        }

        Action::ViewAllUsers => {
            if claims.role.is_admin() {
                Decision::Allow
            } else {
                Decision::deny("User must have admin privileges to view other users.")
            }
        }

        Action::ViewUsergroupsOf { target_id } => {
            if *target_id == claims.user_id || claims.role.is_admin() {
                Decision::Allow
            } else {
                Decision::deny("User must have admin privileges to view other users' usergroups.")
            }
        }

        Action::CreateUsergroup => {
            if claims.role.is_admin() {
                Decision::Allow
            } else {
                Decision::deny("User must have admin privileges to create usergroups.")
            }
        }

        // Rule 3 then rule 6: shared groups are admin-editable, personal
        // groups are editable by nobody.
        Action::EditUsergroup { personal } => {
            if !claims.role.is_admin() {
                Decision::deny("User must have admin privileges to edit usergroups.")
            } else if *personal {
                Decision::deny("Personal usergroups cannot be edited.")
            } else {
                Decision::Allow
            }
        }

        Action::DeleteUsergroup { personal } => {
            if !claims.role.is_admin() {
                Decision::deny("User must have admin privileges to delete usergroups.")
            } else if *personal {
                Decision::deny("Personal usergroups cannot be deleted.")
            } else {
                Decision::Allow
            }
        }

        Action::ViewAllUsergroups => {
            if claims.role.is_admin() {
                Decision::Allow
            } else {
                Decision::deny("User must have admin privileges to view all usergroups.")
            }
        }

        // Rule 7: resource CRUD needs writer.
        Action::CreateResource(kind) | Action::EditResource(kind) => {
            if claims.role.can_write() {
                Decision::Allow
            } else {
                Decision::deny(format!(
                    "Current user does not have permission to edit or create {}.",
                    kind.plural()
                ))
            }
        }

        Action::DeleteResource(kind) => {
            if claims.role.can_write() {
                Decision::Allow
            } else {
                Decision::deny(format!(
                    "Current user does not have permission to delete {}.",
                    kind.plural()
                ))
            }
        }

        // Rule 8: unscoped listings bypass the usergroup filter.
        Action::ViewAllResources(kind) => {
            if claims.role.is_admin() {
                Decision::Allow
            } else {
                Decision::deny(format!("Must be admin to view all {}.", kind.plural()))
            }
        }
    }
}

/// [`decide`], surfaced as the API error type.
pub fn authorize(claims: &Claims, action: &Action) -> Result<(), ApiError> {
    match decide(claims, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(ApiError::authorization(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: i32, role: Role) -> Claims {
        Claims {
            sub: "sam".to_string(),
            jti: "jti".to_string(),
            iat: 0,
            exp: 0,
            user_id,
            username: "sam".to_string(),
            email: "sam@example.com".to_string(),
            role,
            is_active: true,
            usergroups: vec![],
        }
    }

    fn inactive(user_id: i32, role: Role) -> Claims {
        Claims {
            is_active: false,
            ..claims(user_id, role)
        }
    }

    fn allowed(c: &Claims, a: Action) -> bool {
        decide(c, &a) == Decision::Allow
    }

    #[test]
    fn test_inactive_requester_cannot_mutate() {
        let c = inactive(1, Role::Superuser);
        assert!(!allowed(&c, Action::CreateUser));
        assert!(!allowed(&c, Action::CreateResource(ResourceKind::Chart)));
        assert!(!allowed(
            &c,
            Action::EditUser {
                target_id: 1,
                changes_role: false
            }
        ));
        match decide(&c, &Action::CreateUser) {
            Decision::Deny(reason) => assert_eq!(reason, "Account is inactive."),
            Decision::Allow => panic!("expected deny"),
        }
    }

    #[test]
    fn test_inactive_requester_can_still_read() {
        let c = inactive(1, Role::Admin);
        assert!(allowed(&c, Action::ViewAllUsers));
        assert!(allowed(&c, Action::ViewAllResources(ResourceKind::Report)));
    }

    #[test]
    fn test_self_edit_without_role_change_is_allowed_for_everyone() {
        for role in [Role::Viewer, Role::Writer, Role::Admin, Role::Superuser] {
            let c = claims(7, role);
            assert!(allowed(
                &c,
                Action::EditUser {
                    target_id: 7,
                    changes_role: false
                }
            ));
        }
    }

    #[test]
    fn test_own_role_change_requires_admin() {
        let writer = claims(7, Role::Writer);
        assert!(!allowed(
            &writer,
            Action::EditUser {
                target_id: 7,
                changes_role: true
            }
        ));

        let admin = claims(7, Role::Admin);
        assert!(allowed(
            &admin,
            Action::EditUser {
                target_id: 7,
                changes_role: true
            }
        ));
    }

    #[test]
    fn test_editing_other_users_requires_admin() {
        let writer = claims(7, Role::Writer);
        assert!(!allowed(
            &writer,
            Action::EditUser {
                target_id: 8,
                changes_role: false
            }
        ));

        let admin = claims(7, Role::Admin);
        assert!(allowed(
            &admin,
            Action::EditUser {
                target_id: 8,
                changes_role: true
            }
        ));
    }

    #[test]
    fn test_user_create_delete_requires_admin() {
        assert!(!allowed(&claims(1, Role::Writer), Action::CreateUser));
        assert!(allowed(&claims(1, Role::Admin), Action::CreateUser));
        assert!(!allowed(
            &claims(1, Role::Writer),
            Action::DeleteUser {
                target_id: 2,
                target_role: Role::Viewer
            }
        ));
        assert!(allowed(
            &claims(1, Role::Admin),
            Action::DeleteUser {
                target_id: 2,
                target_role: Role::Viewer
            }
        ));
    }

    #[test]
    fn test_deleting_superuser_requires_superuser() {
        let admin = claims(1, Role::Admin);
        assert!(!allowed(
            &admin,
            Action::DeleteUser {
                target_id: 2,
                target_role: Role::Superuser
            }
        ));

        let root = claims(1, Role::Superuser);
        assert!(allowed(
            &root,
            Action::DeleteUser {
                target_id: 2,
                target_role: Role::Superuser
            }
        ));
    }

    #[test]
    fn test_self_deletion_always_denied() {
        let root = claims(1, Role::Superuser);
        match decide(
            &root,
            &Action::DeleteUser {
                target_id: 1,
                target_role: Role::Superuser,
            },
        ) {
            Decision::Deny(reason) => {
                assert_eq!(reason, "Users cannot delete their own account.")
            }
            Decision::Allow => panic!("expected deny"),
        }
    }

    #[test]
    fn test_shared_usergroup_mutation_requires_admin() {
        for action in [
            Action::CreateUsergroup,
            Action::EditUsergroup { personal: false },
            Action::DeleteUsergroup { personal: false },
        ] {
            assert!(!allowed(&claims(1, Role::Writer), action.clone()));
            assert!(allowed(&claims(1, Role::Admin), action));
        }
    }

    #[test]
    fn test_personal_usergroups_untouchable_even_for_superuser() {
        let root = claims(1, Role::Superuser);
        assert!(!allowed(&root, Action::EditUsergroup { personal: true }));
        assert!(!allowed(&root, Action::DeleteUsergroup { personal: true }));
        match decide(&root, &Action::DeleteUsergroup { personal: true }) {
            Decision::Deny(reason) => {
                assert_eq!(reason, "Personal usergroups cannot be deleted.")
            }
            Decision::Allow => panic!("expected deny"),
        }
    }

    #[test]
    fn test_resource_crud_requires_writer() {
        let viewer = claims(1, Role::Viewer);
        let writer = claims(1, Role::Writer);
        for kind in [
            ResourceKind::Connection,
            ResourceKind::Query,
            ResourceKind::Chart,
            ResourceKind::Report,
            ResourceKind::Contact,
            ResourceKind::Publication,
        ] {
            assert!(!allowed(&viewer, Action::CreateResource(kind)));
            assert!(!allowed(&viewer, Action::EditResource(kind)));
            assert!(!allowed(&viewer, Action::DeleteResource(kind)));
            assert!(allowed(&writer, Action::CreateResource(kind)));
            assert!(allowed(&writer, Action::EditResource(kind)));
            assert!(allowed(&writer, Action::DeleteResource(kind)));
        }
    }

    #[test]
    fn test_view_all_requires_admin() {
        let writer = claims(1, Role::Writer);
        assert!(!allowed(
            &writer,
            Action::ViewAllResources(ResourceKind::Connection)
        ));
        assert!(!allowed(&writer, Action::ViewAllUsers));
        assert!(!allowed(&writer, Action::ViewAllUsergroups));

        let admin = claims(1, Role::Admin);
        assert!(allowed(
            &admin,
            Action::ViewAllResources(ResourceKind::Connection)
        ));
        assert!(allowed(&admin, Action::ViewAllUsers));
        assert!(allowed(&admin, Action::ViewAllUsergroups));
    }

    #[test]
    fn test_viewing_own_usergroups_is_open_others_admin_gated() {
        let writer = claims(7, Role::Writer);
        assert!(allowed(&writer, Action::ViewUsergroupsOf { target_id: 7 }));
        assert!(!allowed(&writer, Action::ViewUsergroupsOf { target_id: 8 }));

        let admin = claims(1, Role::Admin);
        assert!(allowed(&admin, Action::ViewUsergroupsOf { target_id: 8 }));
    }

    #[test]
    fn test_deny_surfaces_as_authorization_error() {
        let viewer = claims(1, Role::Viewer);
        let err = authorize(&viewer, &Action::CreateResource(ResourceKind::Connection))
            .expect_err("viewer must be denied");
        assert_eq!(
            err.message(),
            "Current user does not have permission to edit or create connections."
        );
    }
}
