mod common;

use chrono::{Duration, Utc};
use common::{PASSWORD, TestContext, registration};
use customers_service::{
    error::AppError,
    models::{
        currency::Currency,
        customer::CustomerProfile,
        notification::Notification,
        role::Role,
    },
    repositories::{Page, memory::WriteKind},
};
use rstest::rstest;
use uuid::Uuid;

#[tokio::test]
async fn test_register_creates_customer_with_rub_account() {
    let ctx = TestContext::new();

    let id = ctx.customers().register(registration("a@b.com")).await.unwrap();

    let customer = ctx.customer(id).await.unwrap();
    assert_eq!(customer.role, Role::Regular);
    assert!(!customer.is_deactivated);
    assert_ne!(customer.password_hash, PASSWORD);

    let accounts = ctx.accounts_of(id).await;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].currency, Currency::Rub);
    assert!(!accounts[0].is_deactivated);

    let published = ctx.notifier.published();
    assert_eq!(published.len(), 1);
    assert!(matches!(published[0], Notification::CustomerRegistered { .. }));
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let ctx = TestContext::new();
    ctx.customers().register(registration("a@b.com")).await.unwrap();

    let err = ctx
        .customers()
        .register(registration("a@b.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::EntityConflict(_)));
    assert_eq!(err.to_string(), "Customer with email a@b.com already exists.");
}

#[tokio::test]
async fn test_register_leaves_nothing_when_account_write_fails() {
    let ctx = TestContext::new();
    ctx.store.fail_on(WriteKind::CreateAccount);

    let err = ctx
        .customers()
        .register(registration("atomic@b.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionFailed));
    assert_eq!(err.to_string(), "Transaction failed.");
    assert!(ctx.customer_by_email("atomic@b.com").await.is_none());
    assert!(ctx.notifier.published().is_empty());
}

#[tokio::test]
async fn test_register_fails_cleanly_when_commit_fails() {
    let ctx = TestContext::new();
    ctx.store.fail_on(WriteKind::Commit);

    let err = ctx
        .customers()
        .register(registration("commit@b.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionFailed));
    assert!(ctx.customer_by_email("commit@b.com").await.is_none());
}

#[tokio::test]
async fn test_authenticate() {
    let ctx = TestContext::new();
    let id = ctx.customers().register(registration("login@b.com")).await.unwrap();

    let customer = ctx
        .customers()
        .authenticate("login@b.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(customer.id, id);

    let wrong_password = ctx
        .customers()
        .authenticate("login@b.com", "wrongpass1")
        .await
        .unwrap_err();
    assert!(matches!(wrong_password, AppError::WrongCredentials));
    assert_eq!(wrong_password.to_string(), "The credentials are not correct.");

    let unknown = ctx
        .customers()
        .authenticate("nobody@b.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(unknown, AppError::WrongCredentials));

    ctx.deactivate_customer(id).await;
    let deactivated = ctx
        .customers()
        .authenticate("login@b.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(deactivated, AppError::EntityConflict(_)));
}

#[tokio::test]
async fn test_update_profile() {
    let ctx = TestContext::new();
    let customer = ctx.seed_customer(Role::Regular).await;
    let profile = CustomerProfile {
        first_name: "Olga".to_string(),
        last_name: "Sidorova".to_string(),
        phone: "79991112233".to_string(),
        address: "Arbat street 10".to_string(),
    };

    let updated = ctx
        .customers()
        .update_profile(customer.id, profile.clone())
        .await
        .unwrap();
    assert_eq!(updated.first_name, "Olga");

    let stored = ctx.customer(customer.id).await.unwrap();
    assert_eq!(stored.last_name, "Sidorova");
    assert_eq!(stored.address, "Arbat street 10");
    assert!(matches!(
        ctx.notifier.published().last(),
        Some(Notification::CustomerChanged { .. })
    ));

    ctx.deactivate_customer(customer.id).await;
    let err = ctx
        .customers()
        .update_profile(customer.id, profile)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Customer with id {} is deactivated.", customer.id)
    );
}

#[tokio::test]
async fn test_update_profile_of_missing_customer() {
    let ctx = TestContext::new();
    let id = Uuid::new_v4();
    let profile = CustomerProfile {
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        phone: "79991112233".to_string(),
        address: "Arbat street 10".to_string(),
    };

    let err = ctx.customers().update_profile(id, profile).await.unwrap_err();
    assert!(matches!(err, AppError::EntityNotFound(_)));
    assert_eq!(err.to_string(), format!("Customer with id {id} was not found."));
}

#[tokio::test]
async fn test_update_password() {
    let ctx = TestContext::new();
    let id = ctx.customers().register(registration("pw@b.com")).await.unwrap();

    let err = ctx
        .customers()
        .update_password(id, "wrongpass1", "newpass123")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::WrongCredentials));

    ctx.customers()
        .update_password(id, PASSWORD, "newpass123")
        .await
        .unwrap();

    assert!(ctx.customers().authenticate("pw@b.com", "newpass123").await.is_ok());
    assert!(ctx.customers().authenticate("pw@b.com", PASSWORD).await.is_err());
}

#[tokio::test]
async fn test_update_password_of_deactivated_customer() {
    let ctx = TestContext::new();
    let customer = ctx.seed_customer(Role::Regular).await;
    ctx.deactivate_customer(customer.id).await;

    let err = ctx
        .customers()
        .update_password(customer.id, PASSWORD, "newpass123")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EntityConflict(_)));
}

#[tokio::test]
async fn test_set_manual_vip_activates_vip_accounts() {
    let ctx = TestContext::new();
    let customer = ctx.seed_customer(Role::Regular).await;
    let rub = ctx.seed_account(customer.id, Currency::Rub, false).await;
    let jpy = ctx.seed_account(customer.id, Currency::Jpy, true).await;
    let eur = ctx.seed_account(customer.id, Currency::Eur, true).await;
    let due = Utc::now() + Duration::days(30);

    ctx.customers().set_manual_vip(customer.id, due).await.unwrap();

    let stored = ctx.customer(customer.id).await.unwrap();
    assert_eq!(stored.role, Role::Vip);
    assert_eq!(stored.custom_vip_due_date, Some(due));
    assert!(!ctx.account(jpy.id).await.unwrap().is_deactivated);
    // Regular-tier accounts are left alone.
    assert!(ctx.account(eur.id).await.unwrap().is_deactivated);
    assert!(!ctx.account(rub.id).await.unwrap().is_deactivated);
}

#[tokio::test]
async fn test_set_manual_vip_rolls_back_on_failure() {
    let ctx = TestContext::new();
    let customer = ctx.seed_customer(Role::Regular).await;
    let jpy = ctx.seed_account(customer.id, Currency::Jpy, true).await;
    ctx.store.fail_on(WriteKind::UpdateAccounts);

    let err = ctx
        .customers()
        .set_manual_vip(customer.id, Utc::now() + Duration::days(1))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionFailed));
    let stored = ctx.customer(customer.id).await.unwrap();
    assert_eq!(stored.role, Role::Regular);
    assert!(stored.custom_vip_due_date.is_none());
    assert!(ctx.account(jpy.id).await.unwrap().is_deactivated);
}

#[tokio::test]
async fn test_set_manual_vip_rejects_deactivated_customer() {
    let ctx = TestContext::new();
    let customer = ctx.seed_customer(Role::Regular).await;
    ctx.deactivate_customer(customer.id).await;

    let err = ctx
        .customers()
        .set_manual_vip(customer.id, Utc::now() + Duration::days(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EntityConflict(_)));
}

#[rstest]
#[case::admin(Role::Admin)]
#[case::unknown(Role::Unknown)]
#[tokio::test]
async fn test_set_manual_vip_rejects_admin_and_unknown(#[case] role: Role) {
    let ctx = TestContext::new();
    let customer = ctx.seed_customer(role).await;

    let err = ctx
        .customers()
        .set_manual_vip(customer.id, Utc::now() + Duration::days(30))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::EntityConflict(_)));
    assert_eq!(
        err.to_string(),
        format!("Role of customer with id {} is not correct.", customer.id)
    );
    let stored = ctx.customer(customer.id).await.unwrap();
    assert_eq!(stored.role, role);
    assert!(stored.custom_vip_due_date.is_none());
    assert!(ctx
        .accounts()
        .create_account(customer.id, Currency::Jpy)
        .await
        .is_err());
}

#[tokio::test]
async fn test_batch_keeps_live_manual_grant() {
    let ctx = TestContext::new();
    let protected = ctx.seed_vip(Some(Utc::now() + Duration::days(10))).await;
    let jpy = ctx.seed_account(protected.id, Currency::Jpy, false).await;

    let outcome = ctx.customers().batch_recompute_vip_roles(&[]).await.unwrap();

    assert!(outcome.demoted.is_empty());
    assert_eq!(ctx.customer(protected.id).await.unwrap().role, Role::Vip);
    assert!(!ctx.account(jpy.id).await.unwrap().is_deactivated);
}

#[tokio::test]
async fn test_batch_demotes_expired_and_unprotected_vips() {
    let ctx = TestContext::new();
    let expired = ctx.seed_vip(Some(Utc::now() - Duration::days(1))).await;
    let unprotected = ctx.seed_vip(None).await;
    let expired_cny = ctx.seed_account(expired.id, Currency::Cny, false).await;
    let expired_rub = ctx.seed_account(expired.id, Currency::Rub, false).await;
    let unprotected_ars = ctx.seed_account(unprotected.id, Currency::Ars, false).await;
    let unprotected_usd = ctx.seed_account(unprotected.id, Currency::Usd, false).await;

    let outcome = ctx.customers().batch_recompute_vip_roles(&[]).await.unwrap();

    assert_eq!(outcome.demoted.len(), 2);
    assert!(outcome.promoted.is_empty());
    assert_eq!(ctx.customer(expired.id).await.unwrap().role, Role::Regular);
    assert_eq!(ctx.customer(unprotected.id).await.unwrap().role, Role::Regular);
    assert!(ctx.account(expired_cny.id).await.unwrap().is_deactivated);
    assert!(ctx.account(unprotected_ars.id).await.unwrap().is_deactivated);
    assert!(!ctx.account(expired_rub.id).await.unwrap().is_deactivated);
    assert!(!ctx.account(unprotected_usd.id).await.unwrap().is_deactivated);

    match ctx.notifier.published().last() {
        Some(Notification::RolesChanged { customer_ids }) => {
            assert_eq!(customer_ids.len(), 2);
            assert!(customer_ids.contains(&expired.id));
            assert!(customer_ids.contains(&unprotected.id));
        }
        other => panic!("unexpected notification: {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_promotes_eligible_regulars_only() {
    let ctx = TestContext::new();
    let regular = ctx.seed_customer(Role::Regular).await;
    let admin = ctx.seed_customer(Role::Admin).await;
    let already_vip = ctx.seed_vip(None).await;
    let bgn = ctx.seed_account(regular.id, Currency::Bgn, true).await;

    let outcome = ctx
        .customers()
        .batch_recompute_vip_roles(&[regular.id, admin.id, already_vip.id])
        .await
        .unwrap();

    assert_eq!(outcome.promoted, vec![regular.id]);
    assert!(outcome.demoted.is_empty());
    assert_eq!(ctx.customer(regular.id).await.unwrap().role, Role::Vip);
    assert_eq!(ctx.customer(admin.id).await.unwrap().role, Role::Admin);
    assert_eq!(ctx.customer(already_vip.id).await.unwrap().role, Role::Vip);
    assert!(!ctx.account(bgn.id).await.unwrap().is_deactivated);
}

#[tokio::test]
async fn test_batch_without_changes_publishes_nothing() {
    let ctx = TestContext::new();
    ctx.seed_customer(Role::Regular).await;

    let outcome = ctx.customers().batch_recompute_vip_roles(&[]).await.unwrap();

    assert!(outcome.is_empty());
    assert!(ctx.notifier.published().is_empty());
}

#[tokio::test]
async fn test_batch_is_all_or_nothing() {
    let ctx = TestContext::new();
    let promoted = ctx.seed_customer(Role::Regular).await;
    let demoted = ctx.seed_vip(None).await;
    let demoted_jpy = ctx.seed_account(demoted.id, Currency::Jpy, false).await;
    ctx.store.fail_on(WriteKind::UpdateAccounts);

    let err = ctx
        .customers()
        .batch_recompute_vip_roles(&[promoted.id])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionFailed));
    assert_eq!(ctx.customer(promoted.id).await.unwrap().role, Role::Regular);
    assert_eq!(ctx.customer(demoted.id).await.unwrap().role, Role::Vip);
    assert!(!ctx.account(demoted_jpy.id).await.unwrap().is_deactivated);
    assert!(ctx.notifier.published().is_empty());
}

#[tokio::test]
async fn test_activate_and_deactivate_customer() {
    let ctx = TestContext::new();
    let customer = ctx.seed_customer(Role::Regular).await;

    ctx.customers().deactivate(customer.id).await.unwrap();
    assert!(ctx.customer(customer.id).await.unwrap().is_deactivated);

    ctx.customers().activate(customer.id).await.unwrap();
    assert!(!ctx.customer(customer.id).await.unwrap().is_deactivated);
    assert_eq!(ctx.notifier.published().len(), 2);
}

#[tokio::test]
async fn test_delete_customer_removes_all_accounts() {
    let ctx = TestContext::new();
    let id = ctx.customers().register(registration("bye@b.com")).await.unwrap();
    ctx.seed_account(id, Currency::Eur, false).await;

    ctx.customers().delete_customer(id).await.unwrap();

    assert!(ctx.customer(id).await.is_none());
    assert!(ctx.accounts_of(id).await.is_empty());

    let err = ctx.customers().delete_customer(id).await.unwrap_err();
    assert!(matches!(err, AppError::EntityNotFound(_)));
}

#[tokio::test]
async fn test_get_all_pages() {
    let ctx = TestContext::new();
    for i in 0..3 {
        ctx.customers()
            .register(registration(&format!("page{i}@b.com")))
            .await
            .unwrap();
    }

    let first = ctx.customers().get_all(Page::new(Some(1), Some(2))).await.unwrap();
    let second = ctx.customers().get_all(Page::new(Some(2), Some(2))).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
}
