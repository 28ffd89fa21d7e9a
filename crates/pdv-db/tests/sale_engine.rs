//! Sale creation and cancellation against a real SQLite database.

mod common;

use common::*;
use pdv_core::{ErrorKind, Money, PaymentMethod, SaleStatus};
use pdv_db::{Database, DbConfig, SaleError};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};

// =============================================================================
// create_sale
// =============================================================================

#[tokio::test]
async fn test_cash_sale_computes_change_and_takes_stock() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 10).await;

    let mut req = request(vec![line(&water, 2)], PaymentMethod::Cash);
    req.amount_received = Some(Money::from_cents(1000));

    let detail = db.create_sale(&req, &user).await.unwrap();

    assert_eq!(detail.sale.total_cents, 700);
    assert_eq!(detail.sale.discount_cents, 0);
    assert_eq!(detail.sale.tax_cents, 0);
    assert_eq!(detail.sale.final_total_cents, 700);
    assert_eq!(detail.sale.amount_received_cents, Some(1000));
    assert_eq!(detail.sale.change_cents, Some(300));
    assert_eq!(detail.sale.status, SaleStatus::Completed);
    assert_eq!(detail.sale.user_id, user);

    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].unit_price_cents, 350);
    assert_eq!(detail.items[0].total_cents, 700);

    assert_eq!(stock_of(&db, &water).await, 8);

    // What was returned is what was stored.
    let stored = db.sales().get_detail(&detail.sale.id).await.unwrap().unwrap();
    assert_eq!(stored.sale.final_total_cents, 700);
    assert_eq!(stored.items.len(), 1);
}

#[tokio::test]
async fn test_percentage_discount() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 10).await;

    let mut req = request(vec![line(&water, 2)], PaymentMethod::Cash);
    req.amount_received = Some(Money::from_cents(1000));
    req.discount_percentage = Some(10.0);

    let detail = db.create_sale(&req, &user).await.unwrap();

    assert_eq!(detail.sale.total_cents, 700);
    assert_eq!(detail.sale.discount_cents, 70);
    assert_eq!(detail.sale.final_total_cents, 630);
    assert_eq!(detail.sale.change_cents, Some(370));
}

#[tokio::test]
async fn test_quantity_above_stock_writes_nothing() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let cake = product(&db, "Bolo", 1890, 3).await;

    let req = request(vec![line(&cake, 4)], PaymentMethod::Pix);
    let err = db.create_sale(&req, &user).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(stock_of(&db, &cake).await, 3);
    assert_eq!(sale_count(&db).await, 0);
    assert_eq!(item_count(&db).await, 0);
}

#[tokio::test]
async fn test_repeated_lines_count_against_the_same_stock() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let bread = product(&db, "Pão", 100, 5).await;

    let req = request(vec![line(&bread, 3), line(&bread, 3)], PaymentMethod::DebitCard);
    let err = db.create_sale(&req, &user).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(stock_of(&db, &bread).await, 5);

    let req = request(vec![line(&bread, 2), line(&bread, 3)], PaymentMethod::DebitCard);
    let detail = db.create_sale(&req, &user).await.unwrap();
    assert_eq!(detail.items.len(), 2);
    assert_eq!(stock_of(&db, &bread).await, 0);
}

#[tokio::test]
async fn test_insufficient_cash_writes_nothing() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 10).await;

    let mut req = request(vec![line(&water, 2)], PaymentMethod::Cash);
    req.amount_received = Some(Money::from_cents(500));

    let err = db.create_sale(&req, &user).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientPayment);
    assert_eq!(stock_of(&db, &water).await, 10);
    assert_eq!(sale_count(&db).await, 0);
}

#[tokio::test]
async fn test_card_sale_ignores_amount_received() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 10).await;

    let mut req = request(vec![line(&water, 2)], PaymentMethod::CreditCard);
    req.amount_received = Some(Money::from_cents(100));

    let detail = db.create_sale(&req, &user).await.unwrap();
    assert_eq!(detail.sale.amount_received_cents, None);
    assert_eq!(detail.sale.change_cents, None);
}

#[tokio::test]
async fn test_unknown_and_inactive_products_are_rejected() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 10).await;

    let req = request(vec![line(&water, 1), line("missing", 1)], PaymentMethod::Pix);
    let err = db.create_sale(&req, &user).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProductNotFound);

    sqlx::query("UPDATE products SET active = 0 WHERE id = ?1")
        .bind(&water)
        .execute(db.pool())
        .await
        .unwrap();

    let req = request(vec![line(&water, 1)], PaymentMethod::Pix);
    let err = db.create_sale(&req, &user).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProductInactive);

    assert_eq!(stock_of(&db, &water).await, 10);
    assert_eq!(sale_count(&db).await, 0);
}

#[tokio::test]
async fn test_empty_cart_is_a_validation_error() {
    let db = memory_db().await;
    let user = cashier(&db).await;

    let err = db
        .create_sale(&request(vec![], PaymentMethod::Cash), &user)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn test_failure_after_reserving_rolls_stock_back() {
    let db = memory_db().await;
    let water = product(&db, "Água 500ml", 350, 10).await;

    // No such user: the sale insert fails on its foreign key after the
    // stock has already been reserved inside the transaction.
    let req = request(vec![line(&water, 4)], PaymentMethod::Pix);
    let err = db.create_sale(&req, "ghost-user").await.unwrap_err();

    assert!(matches!(err, SaleError::Persistence(_)));
    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    assert_eq!(stock_of(&db, &water).await, 10);
    assert_eq!(sale_count(&db).await, 0);
    assert_eq!(item_count(&db).await, 0);
}

#[tokio::test]
async fn test_sale_total_equals_sum_of_items() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let a = product(&db, "Arroz", 2790, 10).await;
    let b = product(&db, "Feijão", 849, 10).await;

    let mut req = request(vec![line(&a, 1), line(&b, 3)], PaymentMethod::Pix);
    req.discount = Some(Money::from_cents(500));
    req.tax = Some(Money::from_cents(120));

    let detail = db.create_sale(&req, &user).await.unwrap();
    let sum: i64 = detail.items.iter().map(|i| i.total_cents).sum();

    assert_eq!(sum, detail.sale.total_cents);
    assert_eq!(detail.sale.total_cents, 2790 + 3 * 849);
    assert_eq!(
        detail.sale.final_total_cents,
        (detail.sale.total_cents - 500 + 120).max(0)
    );
}

// =============================================================================
// cancel_sale
// =============================================================================

#[tokio::test]
async fn test_cancel_restores_stock_and_keeps_items() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let a = product(&db, "Arroz", 2790, 10).await;
    let b = product(&db, "Feijão", 849, 10).await;

    let req = request(vec![line(&a, 2), line(&b, 5)], PaymentMethod::Pix);
    let detail = db.create_sale(&req, &user).await.unwrap();
    assert_eq!(stock_of(&db, &a).await, 8);
    assert_eq!(stock_of(&db, &b).await, 5);

    let cancelled = db.cancel_sale(&detail.sale.id).await.unwrap();
    assert_eq!(cancelled.sale.status, SaleStatus::Cancelled);

    assert_eq!(stock_of(&db, &a).await, 10);
    assert_eq!(stock_of(&db, &b).await, 10);

    let stored = db.sales().get_detail(&detail.sale.id).await.unwrap().unwrap();
    assert_eq!(stored.sale.status, SaleStatus::Cancelled);
    assert_eq!(stored.items.len(), 2);
}

#[tokio::test]
async fn test_second_cancel_is_rejected_without_touching_stock() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 10).await;

    let detail = db
        .create_sale(&request(vec![line(&water, 3)], PaymentMethod::Pix), &user)
        .await
        .unwrap();
    db.cancel_sale(&detail.sale.id).await.unwrap();
    assert_eq!(stock_of(&db, &water).await, 10);

    let err = db.cancel_sale(&detail.sale.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyCancelled);
    assert_eq!(stock_of(&db, &water).await, 10);
}

#[tokio::test]
async fn test_cancel_unknown_sale() {
    let db = memory_db().await;

    let err = db.cancel_sale("does-not-exist").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SaleNotFound);
}

#[tokio::test]
async fn test_create_cancel_sequences_never_go_negative() {
    let db = memory_db().await;
    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 4).await;

    let mut sale_ids = Vec::new();
    for qty in [1, 2, 1, 1] {
        match db
            .create_sale(&request(vec![line(&water, qty)], PaymentMethod::Pix), &user)
            .await
        {
            Ok(detail) => sale_ids.push(detail.sale.id),
            Err(err) => assert_eq!(err.kind(), ErrorKind::InsufficientStock),
        }
        assert!(stock_of(&db, &water).await >= 0);
    }
    assert_eq!(stock_of(&db, &water).await, 0);

    for id in &sale_ids {
        db.cancel_sale(id).await.unwrap();
    }
    assert_eq!(stock_of(&db, &water).await, 4);
}

#[tokio::test]
async fn test_failed_cancel_restores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pdv.db");
    let db = Database::new(DbConfig::new(&path)).await.unwrap();

    let user = cashier(&db).await;
    let a = product(&db, "Arroz", 2790, 10).await;
    let b = product(&db, "Feijão", 849, 10).await;

    let detail = db
        .create_sale(&request(vec![line(&a, 2), line(&b, 5)], PaymentMethod::Pix), &user)
        .await
        .unwrap();
    assert_eq!(stock_of(&db, &a).await, 8);

    // Remove the second line's product behind the schema's back, so its
    // restore fails after the first line's restore has already run.
    let mut raw = SqliteConnectOptions::new()
        .filename(&path)
        .foreign_keys(false)
        .connect()
        .await
        .unwrap();
    sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(&b)
        .execute(&mut raw)
        .await
        .unwrap();
    raw.close().await.unwrap();

    let err = db.cancel_sale(&detail.sale.id).await.unwrap_err();
    assert!(matches!(err, SaleError::Persistence(_)));
    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);

    assert_eq!(stock_of(&db, &a).await, 8);
    let stored = db.sales().get_detail(&detail.sale.id).await.unwrap().unwrap();
    assert_eq!(stored.sale.status, SaleStatus::Completed);
    assert_eq!(stored.items.len(), 2);

    db.close().await;
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_sales_never_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("pdv.db")).max_connections(4))
        .await
        .unwrap();

    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 5).await;

    let spawn_sale = |db: Database| {
        let req = request(vec![line(&water, 3)], PaymentMethod::Pix);
        let user = user.clone();
        tokio::spawn(async move { db.create_sale(&req, &user).await })
    };

    let first = spawn_sale(db.clone());
    let second = spawn_sale(db.clone());
    let results = [first.await.unwrap(), second.await.unwrap()];

    let committed = results.iter().filter(|r| r.is_ok()).count();
    let rejected: Vec<ErrorKind> = results
        .iter()
        .filter_map(|r| r.as_ref().err().map(|e| e.kind()))
        .collect();

    assert_eq!(committed, 1);
    assert_eq!(rejected, vec![ErrorKind::InsufficientStock]);
    assert_eq!(stock_of(&db, &water).await, 2);
    assert_eq!(sale_count(&db).await, 1);

    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_single_unit_sales() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("pdv.db")).max_connections(8))
        .await
        .unwrap();

    let user = cashier(&db).await;
    let water = product(&db, "Água 500ml", 350, 5).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        let req = request(vec![line(&water, 1)], PaymentMethod::Pix);
        let user = user.clone();
        handles.push(tokio::spawn(async move { db.create_sale(&req, &user).await }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::InsufficientStock),
        }
    }

    assert_eq!(committed, 5);
    assert_eq!(stock_of(&db, &water).await, 0);

    db.close().await;
}
