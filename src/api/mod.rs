// API layer - HTTP endpoints
pub mod charts;
pub mod connections;
pub mod contacts;
pub mod health;
pub mod publications;
pub mod queries;
pub mod reports;
pub mod session;
pub mod users;
pub mod usergroups;

pub use charts::ChartApi;
pub use connections::ConnectionApi;
pub use contacts::ContactApi;
pub use health::HealthApi;
pub use publications::PublicationApi;
pub use queries::QueryApi;
pub use reports::ReportApi;
pub use session::SessionApi;
pub use users::UserApi;
pub use usergroups::UsergroupApi;

use poem_openapi::{auth::Bearer, SecurityScheme};

use crate::errors::ApiError;
use crate::stores::{UsergroupStore, UserStore};
use crate::types::db::{user, usergroup};
use crate::types::dto::common::{UserSummary, UsergroupSummary};
use crate::types::dto::usergroup::UsergroupDict;

/// JWT Bearer token authentication
#[derive(SecurityScheme)]
#[oai(
    ty = "bearer",
    key_name = "Authorization",
    key_in = "header",
    bearer_format = "JWT"
)]
pub struct BearerAuth(pub Bearer);

pub(crate) fn user_summary(user: &user::Model) -> UserSummary {
    UserSummary {
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
    }
}

pub(crate) fn usergroup_summaries(usergroups: &[usergroup::Model]) -> Vec<UsergroupSummary> {
    usergroups
        .iter()
        .map(|ug| UsergroupSummary {
            usergroup_id: ug.id,
            label: ug.label.clone(),
        })
        .collect()
}

/// Creator summary for a resource projection. A dangling creator id is
/// a data-integrity failure, not a client error.
pub(crate) async fn creator_summary(
    users: &UserStore,
    creator_id: i32,
) -> Result<UserSummary, ApiError> {
    let creator = users
        .find_by_id(creator_id)
        .await?
        .ok_or_else(|| ApiError::internal(format!("creator user {} is missing", creator_id)))?;
    Ok(user_summary(&creator))
}

/// Resolve the usergroup ids for a resource create: a supplied
/// non-empty list is validated and used as-is; otherwise the creator's
/// personal group is attached so the resource is never orphaned from
/// its creator's visibility.
pub(crate) async fn resolve_usergroup_ids(
    usergroups: &UsergroupStore,
    creator_id: i32,
    provided: Option<&Vec<i32>>,
) -> Result<Vec<i32>, ApiError> {
    match provided {
        Some(ids) if !ids.is_empty() => {
            usergroups.ensure_exist(ids).await?;
            Ok(ids.clone())
        }
        _ => {
            let personal = usergroups
                .personal_group_of(creator_id)
                .await?
                .ok_or_else(|| {
                    ApiError::internal(format!("personal usergroup missing for user {}", creator_id))
                })?;
            Ok(vec![personal.id])
        }
    }
}

/// Usergroup projection with member summaries.
pub(crate) async fn usergroup_dict(
    usergroups: &UsergroupStore,
    group: &usergroup::Model,
) -> Result<UsergroupDict, ApiError> {
    let members = usergroups.members_of(group.id).await?;
    Ok(UsergroupDict {
        usergroup_id: group.id,
        label: group.label.clone(),
        personal_group: group.personal_group,
        members: members.iter().map(user_summary).collect(),
    })
}
