mod common;

use chartwell_backend::api::{BearerAuth, ConnectionApi};
use chartwell_backend::errors::ApiError;
use chartwell_backend::stores::connection_store::ConnectionData;
use chartwell_backend::types::dto::connection::EditConnectionRequest;
use chartwell_backend::types::internal::Role;
use common::{create_user, login, setup_app};
use poem_openapi::auth::Bearer;
use poem_openapi::payload::Json;

fn bearer(token: &str) -> BearerAuth {
    BearerAuth(Bearer {
        token: token.to_string(),
    })
}

fn connection_body(label: &str) -> Json<EditConnectionRequest> {
    Json(EditConnectionRequest {
        connection_id: None,
        label: Some(label.to_string()),
        db_type: Some("postgresql".to_string()),
        host: Some("db.example.com".to_string()),
        port: Some(5432),
        username: Some("conn_user".to_string()),
        password: Some("secret".to_string()),
        database_name: Some("warehouse".to_string()),
        usergroup_ids: None,
    })
}

// A writer's connection created with no usergroup_ids lands in their
// personal group: visible to them, invisible to another writer, and
// present in an admin's unscoped listing.
#[tokio::test]
async fn connection_visibility_follows_usergroup_membership() {
    let app = setup_app().await;
    create_user(&app, "alicewriter", Role::Writer).await;
    create_user(&app, "bobwriter", Role::Writer).await;
    create_user(&app, "adminuser", Role::Admin).await;

    let alice_token = login(&app, "alicewriter").await;
    let bob_token = login(&app, "bobwriter").await;
    let admin_token = login(&app, "adminuser").await;

    let api = ConnectionApi::new(
        app.connections.clone(),
        app.usergroups.clone(),
        app.users.clone(),
        app.auth.clone(),
    );

    api.create_connection(bearer(&alice_token), connection_body("warehouse"))
        .await
        .expect("alice should be able to create a connection");

    let alice_view = api.get_user_connections(bearer(&alice_token)).await.unwrap();
    assert_eq!(alice_view.connections.len(), 1);

    let bob_view = api.get_user_connections(bearer(&bob_token)).await.unwrap();
    assert!(bob_view.connections.is_empty());

    let admin_view = api.get_all_connections(bearer(&admin_token)).await.unwrap();
    assert_eq!(admin_view.connections.len(), 1);
}

// Deleting a user removes their personal usergroup, and with it any
// visibility that flowed only through that group; resources shared via
// other groups stay visible to their members.
#[tokio::test]
async fn deleting_user_removes_personal_group_but_not_shared_visibility() {
    let app = setup_app().await;
    let alice = create_user(&app, "alicewriter", Role::Writer).await;
    let bob = create_user(&app, "bobwriter", Role::Writer).await;

    let alice_personal = app
        .usergroups
        .personal_group_of(alice.id)
        .await
        .unwrap()
        .expect("alice must have a personal group");

    let shared = app.usergroups.create("analysts").await.unwrap();
    app.usergroups
        .add_members(shared.id, &[alice.id, bob.id])
        .await
        .unwrap();

    // One connection on the shared group, one only on alice's personal
    // group.
    let shared_conn = app
        .connections
        .create(
            ConnectionData {
                label: "shared_warehouse".to_string(),
                db_type: "postgresql".to_string(),
                host: "db.example.com".to_string(),
                port: 5432,
                username: "conn_user".to_string(),
                password: "secret".to_string(),
                database_name: "dev".to_string(),
            },
            alice.id,
            &[shared.id, alice_personal.id],
        )
        .await
        .unwrap();
    app.connections
        .create(
            ConnectionData {
                label: "private_warehouse".to_string(),
                db_type: "postgresql".to_string(),
                host: "db.example.com".to_string(),
                port: 5432,
                username: "conn_user".to_string(),
                password: "secret".to_string(),
                database_name: "dev".to_string(),
            },
            alice.id,
            &[alice_personal.id],
        )
        .await
        .unwrap();

    app.users.delete_user(alice.id).await.unwrap();

    // Personal group is gone; the shared group and bob's access to the
    // shared connection survive.
    assert!(app
        .usergroups
        .find_by_id(alice_personal.id)
        .await
        .unwrap()
        .is_none());
    assert!(app.usergroups.find_by_id(shared.id).await.unwrap().is_some());

    let bob_groups = app.usergroups.usergroup_ids_of(bob.id).await.unwrap();
    let visible = app.connections.authorized_ids(&bob_groups).await.unwrap();
    assert_eq!(visible, vec![shared_conn.id]);

    // The private connection no longer has any groups granting access.
    let orphaned = app
        .connections
        .usergroups_of(
            app.connections
                .get_all()
                .await
                .unwrap()
                .iter()
                .find(|c| c.label == "private_warehouse")
                .unwrap()
                .id,
        )
        .await
        .unwrap();
    assert!(orphaned.is_empty());
}

// Token lifecycle: logout revokes the exact token; later requests with
// it fail while other sessions continue.
#[tokio::test]
async fn revoked_token_is_rejected_everywhere() {
    let app = setup_app().await;
    create_user(&app, "alicewriter", Role::Writer).await;

    let token = login(&app, "alicewriter").await;
    let claims = app.auth.authenticate(&token).await.unwrap();
    assert_eq!(claims.username, "alicewriter");

    app.auth.logout(&token).await.unwrap();

    let err = app.auth.authenticate(&token).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidToken(_)));

    let api = ConnectionApi::new(
        app.connections.clone(),
        app.usergroups.clone(),
        app.users.clone(),
        app.auth.clone(),
    );
    let result = api.get_user_connections(bearer(&token)).await;
    assert!(matches!(result, Err(ApiError::InvalidToken(_))));
}

// Every user carries exactly one personal usergroup whose sole member
// is that user, from creation to deletion.
#[tokio::test]
async fn personal_usergroup_invariant_holds() {
    let app = setup_app().await;
    let alice = create_user(&app, "alicewriter", Role::Writer).await;

    let groups = app.usergroups.usergroups_of(alice.id).await.unwrap();
    let personal: Vec<_> = groups.iter().filter(|g| g.personal_group).collect();
    assert_eq!(personal.len(), 1);
    assert_eq!(personal[0].label, "personal_alicewriter");

    let members = app.usergroups.members_of(personal[0].id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, alice.id);

    // Joining a shared group does not disturb the invariant.
    let shared = app.usergroups.create("analysts").await.unwrap();
    app.usergroups.add_members(shared.id, &[alice.id]).await.unwrap();
    let groups = app.usergroups.usergroups_of(alice.id).await.unwrap();
    assert_eq!(groups.iter().filter(|g| g.personal_group).count(), 1);
    assert_eq!(groups.len(), 2);
}

// Claims are a snapshot: a role change takes effect at next login, not
// on in-flight tokens.
#[tokio::test]
async fn claims_snapshot_refreshes_on_next_login() {
    use chartwell_backend::stores::user_store::UserChanges;

    let app = setup_app().await;
    let alice = create_user(&app, "alicewriter", Role::Writer).await;

    let old_token = login(&app, "alicewriter").await;
    assert_eq!(
        app.auth.authenticate(&old_token).await.unwrap().role,
        Role::Writer
    );

    app.users
        .update_user(
            alice.id,
            UserChanges {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The old token still carries the old role.
    assert_eq!(
        app.auth.authenticate(&old_token).await.unwrap().role,
        Role::Writer
    );

    // A fresh login picks up the new role.
    let new_token = login(&app, "alicewriter").await;
    assert_eq!(
        app.auth.authenticate(&new_token).await.unwrap().role,
        Role::Admin
    );
}
