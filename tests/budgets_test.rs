mod common;

use anyhow::Result;
use common::{expense, income, logged_in_user, test_service};
use pennywise::application::AppError;
use pennywise::domain::{TransactionType, MAX_AMOUNT_CENTS};

#[tokio::test]
async fn test_overrun_after_two_expenses() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    service.set_category_budget(user_id, "Food", "100").await?;
    expense(&service, user_id, "Food", "60").await?;
    expense(&service, user_id, "Food", "50").await?;

    let overrun = service
        .check_category_overrun(user_id, "Food")
        .await?
        .expect("Food should be over budget");
    assert_eq!(overrun.category, "Food");
    assert_eq!(overrun.budget_cents, 10000);
    assert_eq!(overrun.total_expenses_cents, 11000);

    Ok(())
}

#[tokio::test]
async fn test_add_transaction_reports_overrun() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    service.set_category_budget(user_id, "Food", "100").await?;

    let first = service
        .add_transaction(user_id, "2024-03-01", "Food", "60", TransactionType::Expense)
        .await?;
    assert!(first.overrun.is_none());

    let second = service
        .add_transaction(user_id, "2024-03-02", "Food", "50", TransactionType::Expense)
        .await?;
    let overrun = second.overrun.expect("second expense should trigger an alert");
    assert_eq!(overrun.total_expenses_cents, 11000);
    assert_eq!(overrun.budget_cents, 10000);

    // Income in an over-budget category still reports the current overrun
    let third = service
        .add_transaction(user_id, "2024-03-03", "Food", "500", TransactionType::Income)
        .await?;
    assert_eq!(third.overrun.map(|o| o.total_expenses_cents), Some(11000));

    Ok(())
}

#[tokio::test]
async fn test_no_budget_means_no_overrun() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    let outcome = service
        .add_transaction(user_id, "2024-03-01", "Travel", "99999", TransactionType::Expense)
        .await?;
    assert!(outcome.overrun.is_none());
    assert!(service.check_category_overrun(user_id, "Travel").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_exactly_at_budget_is_not_overrun() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    service.set_category_budget(user_id, "Food", "100").await?;
    expense(&service, user_id, "Food", "100").await?;
    assert!(service.check_category_overrun(user_id, "Food").await?.is_none());

    service.set_category_budget(user_id, "Gifts", "0").await?;
    assert!(service.check_category_overrun(user_id, "Gifts").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_income_ignored_and_category_match_is_exact() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    service.set_category_budget(user_id, "Food", "100").await?;
    income(&service, user_id, "Food", "500").await?;
    expense(&service, user_id, "food", "500").await?;
    expense(&service, user_id, "Food ", "500").await?;

    assert!(service.check_category_overrun(user_id, "Food").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_set_budget_replaces_previous_value() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    service.set_category_budget(user_id, "Food", "100").await?;
    expense(&service, user_id, "Food", "150").await?;
    assert!(service.check_category_overrun(user_id, "Food").await?.is_some());

    service.set_category_budget(user_id, "Food", "200").await?;
    assert!(service.check_category_overrun(user_id, "Food").await?.is_none());

    let budgets = service.list_category_budgets(user_id).await?;
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].budget_cents, 20000);

    let food = service.get_category_budget(user_id, "Food").await?.unwrap();
    assert_eq!(food.budget_cents, 20000);

    Ok(())
}

#[tokio::test]
async fn test_invalid_budget_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    let err = service
        .set_category_budget(user_id, "Food", "lots")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));
    assert!(service.get_category_budget(user_id, "Food").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_alice_scenario_all_alerts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    service.set_category_budget(user_id, "Food", "100").await?;
    expense(&service, user_id, "Food", "40").await?;
    expense(&service, user_id, "Food", "70").await?;

    let alerts = service.check_all_budget_alerts(user_id).await?;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category, "Food");
    assert_eq!(alerts[0].total_expenses_cents, 11000);
    assert_eq!(alerts[0].budget_cents, 10000);

    Ok(())
}

#[tokio::test]
async fn test_all_alerts_only_lists_overrun_categories() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;
    let other = logged_in_user(&service, "bob").await?;

    service.set_category_budget(user_id, "Food", "100").await?;
    service.set_category_budget(user_id, "Rent", "1000").await?;
    service.set_category_budget(user_id, "Fun", "10").await?;
    expense(&service, user_id, "Food", "50").await?;
    expense(&service, user_id, "Rent", "1200").await?;
    expense(&service, user_id, "Fun", "10.01").await?;

    // Another user's spending does not count
    service.set_category_budget(other, "Food", "1").await?;
    expense(&service, other, "Food", "5").await?;

    let mut categories: Vec<String> = service
        .check_all_budget_alerts(user_id)
        .await?
        .into_iter()
        .map(|o| o.category)
        .collect();
    categories.sort();
    assert_eq!(categories, vec!["Fun", "Rent"]);

    assert!(service.check_all_budget_alerts(logged_in_user(&service, "carol").await?)
        .await?
        .is_empty());

    Ok(())
}

#[tokio::test]
async fn test_budget_statuses() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    service.set_category_budget(user_id, "Food", "100").await?;
    service.set_category_budget(user_id, "Rent", "800").await?;
    expense(&service, user_id, "Food", "120").await?;

    let statuses = service.budget_statuses(user_id).await?;
    assert_eq!(statuses.len(), 2);

    let food = statuses.iter().find(|s| s.budget.category == "Food").unwrap();
    assert_eq!(food.spent, 12000);
    assert_eq!(food.remaining, -2000);
    assert!(food.is_overrun);

    let rent = statuses.iter().find(|s| s.budget.category == "Rent").unwrap();
    assert_eq!(rent.spent, 0);
    assert_eq!(rent.remaining, 80000);
    assert!(!rent.is_overrun);

    Ok(())
}

#[tokio::test]
async fn test_extra_decimals_cannot_hide_an_overrun() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    service.set_category_budget(user_id, "Food", "100").await?;

    let result = service
        .add_transaction(user_id, "2024-03-01", "Food", "100.009", TransactionType::Expense)
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    assert!(service.list_transactions(user_id).await?.is_empty());
    assert!(matches!(
        service.set_category_budget(user_id, "Food", "99.999").await,
        Err(AppError::InvalidAmount(_))
    ));

    let outcome = service
        .add_transaction(user_id, "2024-03-01", "Food", "100.01", TransactionType::Expense)
        .await?;
    assert_eq!(outcome.overrun.map(|o| o.total_expenses_cents), Some(10001));

    Ok(())
}

#[tokio::test]
async fn test_extreme_negative_budget_statuses() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user_id = logged_in_user(&service, "alice").await?;

    assert!(matches!(
        service
            .set_category_budget(user_id, "Food", "-92233720368547758.08")
            .await,
        Err(AppError::InvalidAmount(_))
    ));

    service
        .set_category_budget(user_id, "Food", "-10000000000000")
        .await?;
    expense(&service, user_id, "Food", "10000000000000").await?;
    expense(&service, user_id, "Food", "10000000000000").await?;

    let statuses = service.budget_statuses(user_id).await?;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].spent, 2 * MAX_AMOUNT_CENTS);
    assert_eq!(statuses[0].remaining, -3 * MAX_AMOUNT_CENTS);
    assert!(statuses[0].is_overrun);

    let alerts = service.check_all_budget_alerts(user_id).await?;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].excess(), 3 * MAX_AMOUNT_CENTS);

    Ok(())
}
