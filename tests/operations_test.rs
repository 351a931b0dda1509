mod common;

use std::sync::Arc;
use std::time::Duration;

use anticipo::application::AppError;
use anticipo::domain::{FeeRate, OperationStatus};
use anyhow::Result;
use rust_decimal::Decimal;
use common::{balance_of, dec, seed_receiver, test_service, test_service_with_rate};
use uuid::Uuid;

#[tokio::test]
async fn test_create_confirm_and_reconfirm_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;

    let op = service.create_operation("R1", dec("100")).await?;
    assert_eq!(op.gross_cents, 10000);
    assert_eq!(op.fee_cents, 300);
    assert_eq!(op.net_cents, 9700);
    assert_eq!(op.status, OperationStatus::Pending);
    assert_eq!(balance_of(&service, "R1").await?, 0, "No credit before confirm");

    let confirmed = service.confirm_operation(op.id).await?;
    assert_eq!(confirmed.id, op.id);
    assert_eq!(confirmed.status, OperationStatus::Confirmed);
    assert_eq!(balance_of(&service, "R1").await?, 9700);

    let err = service.confirm_operation(op.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyConfirmed(_)));
    assert_eq!(balance_of(&service, "R1").await?, 9700);

    Ok(())
}

#[tokio::test]
async fn test_created_operation_is_persisted_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;

    let created = service.create_operation("R1", dec("250.50")).await?;
    let fetched = service.get_operation(created.id).await?;

    assert_eq!(fetched.receiver_id, "R1");
    assert_eq!(fetched.gross_cents, 25050);
    assert_eq!(fetched.fee_cents + fetched.net_cents, fetched.gross_cents);
    assert_eq!(fetched.status, OperationStatus::Pending);
    assert_eq!(
        fetched.created_at.timestamp_millis(),
        created.created_at.timestamp_millis()
    );

    Ok(())
}

#[tokio::test]
async fn test_create_for_unknown_receiver_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;

    let err = service.create_operation("ghost", dec("100")).await.unwrap_err();
    assert!(matches!(err, AppError::ReceiverNotFound(ref id) if id == "ghost"));

    Ok(())
}

#[tokio::test]
async fn test_create_rejects_invalid_input() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;

    for (receiver, gross) in [
        ("", "100"),
        ("   ", "100"),
        ("R1", "0"),
        ("R1", "-10"),
        ("R1", "10.005"),
    ] {
        let err = service
            .create_operation(receiver, dec(gross))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::InvalidInput(_)),
            "receiver {:?} gross {} gave {:?}",
            receiver,
            gross,
            err
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_fee_rate_is_injected() -> Result<()> {
    let (service, _temp) = test_service_with_rate("0.10".parse::<FeeRate>()?).await?;
    seed_receiver(&service, "R1", 500).await?;

    let op = service.create_operation("R1", dec("80")).await?;
    assert_eq!(op.fee_cents, 800);
    assert_eq!(op.net_cents, 7200);

    service.confirm_operation(op.id).await?;
    assert_eq!(balance_of(&service, "R1").await?, 500 + 7200);

    Ok(())
}

#[tokio::test]
async fn test_fee_and_net_always_sum_to_gross() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;

    for gross in ["0.01", "0.50", "1.17", "33.33", "999.99", "1234567.89"] {
        let op = service.create_operation("R1", dec(gross)).await?;
        assert_eq!(op.fee_cents + op.net_cents, op.gross_cents, "gross {}", gross);
        assert!(op.net_cents <= op.gross_cents);
    }

    Ok(())
}

#[tokio::test]
async fn test_get_unknown_operation_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.get_operation(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::OperationNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_confirm_unknown_operation_fails_without_writes() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 1000).await?;

    let err = service.confirm_operation(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::OperationNotFound(_)));
    assert_eq!(balance_of(&service, "R1").await?, 1000);

    Ok(())
}

#[tokio::test]
async fn test_confirmations_accumulate_per_receiver() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;
    seed_receiver(&service, "R2", 0).await?;

    let a = service.create_operation("R1", dec("100")).await?;
    let b = service.create_operation("R1", dec("50")).await?;
    let c = service.create_operation("R2", dec("10")).await?;

    service.confirm_operation(a.id).await?;
    service.confirm_operation(b.id).await?;

    assert_eq!(balance_of(&service, "R1").await?, 9700 + 4850);
    assert_eq!(balance_of(&service, "R2").await?, 0, "Pending op must not credit");

    service.confirm_operation(c.id).await?;
    assert_eq!(balance_of(&service, "R2").await?, 970);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirms_credit_exactly_once() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;
    let id = service.create_operation("R1", dec("100")).await?.id;

    let service = Arc::new(service);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(
            async move { service.confirm_operation(id).await },
        ));
    }

    let mut confirmed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => confirmed += 1,
            Err(AppError::AlreadyConfirmed(_)) => rejected += 1,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(confirmed, 1);
    assert_eq!(rejected, 7);
    assert_eq!(balance_of(&service, "R1").await?, 9700);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirms_of_distinct_operations_lose_no_updates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;

    let mut ids = Vec::new();
    for _ in 0..10 {
        ids.push(service.create_operation("R1", dec("10")).await?.id);
    }

    let service = Arc::new(service);
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.confirm_operation(id).await })
        })
        .collect();

    for handle in handles {
        handle.await??;
    }

    assert_eq!(balance_of(&service, "R1").await?, 10 * 970);

    Ok(())
}

#[tokio::test]
async fn test_create_rejects_gross_beyond_cents_range() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;

    let huge = Decimal::from_scientific("1e28").unwrap();
    let err = service.create_operation("R1", huge).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    Ok(())
}

#[tokio::test]
async fn test_confirm_that_would_overflow_balance_is_rolled_back() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;

    // Each net is 8.73e18 cents; two of them do not fit in an i64
    let first = service
        .create_operation("R1", dec("90000000000000000.00"))
        .await?;
    let second = service
        .create_operation("R1", dec("90000000000000000.00"))
        .await?;

    service.confirm_operation(first.id).await?;
    let credited = balance_of(&service, "R1").await?;
    assert_eq!(credited, first.net_cents);

    let err = service.confirm_operation(second.id).await.unwrap_err();
    assert!(matches!(err, AppError::Store(_)), "got: {:?}", err);

    let stored = service.get_operation(second.id).await?;
    assert_eq!(stored.status, OperationStatus::Pending);
    assert_eq!(balance_of(&service, "R1").await?, credited);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_confirmation_still_settles() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_receiver(&service, "R1", 0).await?;
    let id = service.create_operation("R1", dec("100")).await?.id;

    // The caller gives up immediately; the transaction must run to the end
    let _ = tokio::time::timeout(Duration::ZERO, service.confirm_operation(id)).await;

    let mut settled = false;
    for _ in 0..200 {
        // Balance first: a pending status seen afterwards means the credit
        // cannot have been committed when the balance was read.
        let balance = balance_of(&service, "R1").await?;
        let operation = service.get_operation(id).await?;
        if operation.is_confirmed() {
            settled = true;
            break;
        }
        assert_eq!(balance, 0, "credit visible while operation still pending");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert!(settled, "abandoned confirmation never committed");
    assert_eq!(balance_of(&service, "R1").await?, 9700);

    Ok(())
}
