//! Repository tests against a real PostgreSQL instance.
//!
//! Requires `DATABASE_URL` pointing at a PostgreSQL server.

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use wardrobe_core::notification::{NotificationType, SkipReason};
use wardrobe_db::models::trigger::TriggerCompletion;
use wardrobe_db::repositories::{
    CreateTrigger, PushEndpointRepo, TriggerRepo, UserSettingsRepo,
};

fn trigger_for(user: &str) -> CreateTrigger {
    CreateTrigger {
        recipient_user_id: Some(user.to_string()),
        notification_type: Some("cloth_like".to_string()),
        title: Some("New like".to_string()),
        body: Some("Someone liked your jacket".to_string()),
        data: Some(json!({ "clothId": "c-1" })),
        created_at: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn complete_is_write_once(pool: PgPool) {
    let trigger = TriggerRepo::create(&pool, &trigger_for("u-1")).await.unwrap();
    assert!(!trigger.sent);
    assert_eq!(trigger.kind(), NotificationType::ClothLike);

    let first = TriggerRepo::complete(
        &pool,
        trigger.id,
        &TriggerCompletion::Skipped(SkipReason::QuietHours),
    )
    .await
    .unwrap();
    assert!(first);

    let second = TriggerRepo::complete(
        &pool,
        trigger.id,
        &TriggerCompletion::Sent {
            sent_at: Utc::now(),
            tokens_count: 3,
        },
    )
    .await
    .unwrap();
    assert!(!second, "terminal state must not be overwritten");

    let stored = TriggerRepo::find_by_id(&pool, trigger.id).await.unwrap().unwrap();
    assert!(stored.sent);
    assert_eq!(stored.skipped, Some(true));
    assert_eq!(stored.skip_reason.as_deref(), Some("quiet_hours"));
    assert_eq!(stored.tokens_count, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_created_before_respects_cutoff_and_limit(pool: PgPool) {
    let old = Utc::now() - Duration::days(10);
    for _ in 0..3 {
        TriggerRepo::create(
            &pool,
            &CreateTrigger {
                created_at: Some(old),
                ..trigger_for("u-1")
            },
        )
        .await
        .unwrap();
    }
    let fresh = TriggerRepo::create(&pool, &trigger_for("u-1")).await.unwrap();

    let cutoff = Utc::now() - Duration::days(7);
    let deleted = TriggerRepo::delete_created_before(&pool, cutoff, 2).await.unwrap();
    assert_eq!(deleted, Some(2));

    let deleted = TriggerRepo::delete_created_before(&pool, cutoff, 2).await.unwrap();
    assert_eq!(deleted, Some(1));

    assert!(TriggerRepo::find_by_id(&pool, fresh.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivate_token_updates_every_matching_row(pool: PgPool) {
    PushEndpointRepo::create(&pool, "u-1", "tok-a").await.unwrap();
    PushEndpointRepo::create(&pool, "u-2", "tok-a").await.unwrap();
    PushEndpointRepo::create(&pool, "u-1", "tok-b").await.unwrap();

    let updated = PushEndpointRepo::deactivate_token(&pool, "tok-a").await.unwrap();
    assert_eq!(updated, 2);

    let active = PushEndpointRepo::list_active_for_user(&pool, "u-1").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].fcm_token.as_deref(), Some("tok-b"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn notification_settings_roundtrip(pool: PgPool) {
    assert!(UserSettingsRepo::get_notification_settings(&pool, "ghost")
        .await
        .unwrap()
        .is_none());

    UserSettingsRepo::upsert_notification_settings(
        &pool,
        "u-1",
        &json!({ "dmMessages": false, "quietHoursStart": "22:00", "quietHoursEnd": "08:00" }),
    )
    .await
    .unwrap();

    let settings = UserSettingsRepo::get_notification_settings(&pool, "u-1")
        .await
        .unwrap()
        .unwrap();
    assert!(!settings.is_enabled(&NotificationType::DmMessage));
    assert_eq!(settings.quiet_window(), Some(("22:00", "08:00")));
}
