use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use identity_server::auth::session_store::SessionRecord;
use identity_server::auth::{
    AuthError, CredentialStore, PgCredentialStore, PgSessionStore, SessionStore,
};
use identity_server::models::NewUserRecord;
use identity_server::test_support::TestDatabase;

const TIMEOUT: StdDuration = StdDuration::from_secs(5);

macro_rules! test_database {
    ($label:literal) => {
        match TestDatabase::new_from_env().await {
            Ok(db) => db,
            Err(err) if err.is_unavailable() => {
                eprintln!("skipping {}: {}", $label, err);
                return;
            }
            Err(err) => panic!("failed to provision test database: {err:?}"),
        }
    };
}

fn record(email: &str) -> NewUserRecord {
    NewUserRecord {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=1,p=1$c2FsdA$aGFzaA".to_string(),
        name: "Ann".to_string(),
    }
}

#[tokio::test]
async fn credential_store_round_trips_and_enforces_unique_email() {
    let test_db = test_database!("credential store test");
    let store = PgCredentialStore::new(test_db.pool_clone(), TIMEOUT);

    let created = store.create_user(record("a@b.com")).await.expect("insert");
    assert_eq!(created.email, "a@b.com");

    let by_email = store
        .find_user_by_email("a@b.com")
        .await
        .expect("lookup")
        .expect("user exists");
    assert_eq!(by_email.id, created.id);

    let by_id = store
        .find_user_by_id(created.id)
        .await
        .expect("lookup")
        .expect("user exists");
    assert_eq!(by_id.email, "a@b.com");

    // Emails match exactly, including case.
    assert!(
        store
            .find_user_by_email("A@b.com")
            .await
            .expect("lookup")
            .is_none()
    );

    let duplicate = store.create_user(record("a@b.com")).await;
    assert!(matches!(duplicate, Err(AuthError::Conflict)));

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn session_store_hides_expired_records_and_prunes_them() {
    let test_db = test_database!("session store test");
    let pool = test_db.pool_clone();
    let credentials = PgCredentialStore::new(pool.clone(), TIMEOUT);
    let sessions = PgSessionStore::new(pool, TIMEOUT);

    let user = credentials.create_user(record("s@b.com")).await.expect("insert");

    let mut live = SessionRecord::new(Utc::now(), Duration::hours(1));
    live.user_id = Some(user.id);
    sessions.save(&live).await.expect("save live");

    let mut stale = SessionRecord::new(Utc::now() - Duration::hours(2), Duration::hours(1));
    stale.user_id = Some(user.id);
    sessions.save(&stale).await.expect("save stale");

    let loaded = sessions.load(&live.id).await.expect("load").expect("live");
    assert_eq!(loaded.user_id, Some(user.id));
    assert!(sessions.load(&stale.id).await.expect("load").is_none());

    // Saving again overwrites in place.
    live.user_id = None;
    sessions.save(&live).await.expect("upsert");
    let reloaded = sessions.load(&live.id).await.expect("load").expect("live");
    assert_eq!(reloaded.user_id, None);

    let removed = sessions.prune_expired(Utc::now()).await.expect("prune");
    assert_eq!(removed, 1);

    sessions.destroy(&live.id).await.expect("destroy");
    sessions.destroy(&live.id).await.expect("destroy is idempotent");
    assert!(sessions.load(&live.id).await.expect("load").is_none());

    test_db.close().await.expect("failed to drop test database");
}
