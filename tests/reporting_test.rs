mod common;

use anyhow::Result;
use common::{expense, income, logged_in_user, test_service};

#[tokio::test]
async fn test_expenses_by_category() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    expense(&service, user_id, "Food", "12.50").await?;
    expense(&service, user_id, "Food", "7.50").await?;
    expense(&service, user_id, "Rent", "800").await?;
    income(&service, user_id, "Food", "1000").await?;
    income(&service, user_id, "Salary", "3000").await?;

    let totals = service.expenses_by_category(user_id).await?;
    assert_eq!(totals.len(), 2);
    assert_eq!(totals.get("Food"), Some(&2000));
    assert_eq!(totals.get("Rent"), Some(&80000));
    // Income-only category is absent rather than zero
    assert!(!totals.contains_key("Salary"));

    Ok(())
}

#[tokio::test]
async fn test_expenses_by_category_empty() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    assert!(service.expenses_by_category(user_id).await?.is_empty());

    income(&service, user_id, "Salary", "3000").await?;
    assert!(service.expenses_by_category(user_id).await?.is_empty());
    assert!(service.expense_breakdown(user_id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_expense_breakdown_shares() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;
    let other = logged_in_user(&service, "bob").await?;

    expense(&service, user_id, "Food", "25").await?;
    expense(&service, user_id, "Food", "25").await?;
    expense(&service, user_id, "Fun", "50").await?;
    expense(&service, user_id, "Rent", "100").await?;
    expense(&service, other, "Rent", "9999").await?;

    let report = service.expense_breakdown(user_id).await?;
    assert_eq!(report.total, 20000);
    assert_eq!(report.categories.len(), 3);

    let food = report.categories.iter().find(|c| c.category == "Food").unwrap();
    assert_eq!(food.total, 5000);
    assert_eq!(food.count, 2);
    assert!((food.percentage - 25.0).abs() < 1e-9);

    let rent = report.categories.iter().find(|c| c.category == "Rent").unwrap();
    assert!((rent.percentage - 50.0).abs() < 1e-9);

    let share_sum: f64 = report.categories.iter().map(|c| c.percentage).sum();
    assert!((share_sum - 100.0).abs() < 1e-9);

    Ok(())
}
