//! Integration tests for the synthetic data generator on SQLite.

#![cfg(feature = "sqlite")]

use std::collections::HashSet;

use dbsteward_core::demo::{self, CUSTOMERS, DELIVERIES, ORDERS, RESTAURANTS};
use dbsteward_core::{
    AdminError, DataAdmin, GeneratorConfig, QueryOutcome, Result, SyntheticDataGenerator, Value,
    catalog,
};

async fn demo_admin() -> Result<DataAdmin> {
    let admin = DataAdmin::connect("sqlite::memory:").await?;
    demo::install_schema(admin.adapter()).await?;
    Ok(admin)
}

async fn key_set(admin: &DataAdmin, table: &str, column: &str) -> Result<HashSet<i64>> {
    let result = admin.read(table).await?;
    Ok(result
        .column_values(column)
        .into_iter()
        .filter_map(|value| match value {
            Value::Integer(i) => Some(*i),
            _ => None,
        })
        .collect())
}

#[tokio::test]
async fn test_default_population_counts() -> Result<()> {
    let admin = demo_admin().await?;
    let mut generator = SyntheticDataGenerator::new(GeneratorConfig::default().with_seed(7));

    let report = generator.populate(&admin).await?;
    assert_eq!(report.customers.len(), 10);
    assert_eq!(report.restaurants.len(), 20);
    assert_eq!(report.orders.len(), 20);
    assert_eq!(report.deliveries.len(), 20);
    assert_eq!(report.total_rows(), 70);

    assert_eq!(admin.read(CUSTOMERS).await?.len(), 10);
    assert_eq!(admin.read(RESTAURANTS).await?.len(), 20);
    assert_eq!(admin.read(ORDERS).await?.len(), 20);
    assert_eq!(admin.read(DELIVERIES).await?.len(), 20);
    Ok(())
}

#[tokio::test]
async fn test_generated_rows_reference_existing_parents() -> Result<()> {
    let admin = demo_admin().await?;
    SyntheticDataGenerator::new(GeneratorConfig::default().with_seed(42))
        .populate(&admin)
        .await?;

    let customers = key_set(&admin, CUSTOMERS, "customer_id").await?;
    let restaurants = key_set(&admin, RESTAURANTS, "restaurant_id").await?;
    let orders = admin.read(ORDERS).await?;
    for row in 0..orders.len() {
        let Some(Value::Integer(customer)) = orders.get(row, "customer_id") else {
            panic!("order {} has no customer", row);
        };
        let Some(Value::Integer(restaurant)) = orders.get(row, "restaurant_id") else {
            panic!("order {} has no restaurant", row);
        };
        assert!(customers.contains(customer));
        assert!(restaurants.contains(restaurant));

        match (orders.get(row, "order_date"), orders.get(row, "delivery_time")) {
            (Some(Value::Timestamp(placed)), Some(Value::Timestamp(delivered))) => {
                let minutes = (*delivered - *placed).num_minutes();
                assert!((15..=90).contains(&minutes), "delivery after {} minutes", minutes);
            }
            other => panic!("unexpected order timestamps {:?}", other),
        }
    }

    let order_keys = key_set(&admin, ORDERS, "order_id").await?;
    let delivery_orders = key_set(&admin, DELIVERIES, "order_id").await?;
    assert!(delivery_orders.is_subset(&order_keys));
    Ok(())
}

#[tokio::test]
async fn test_children_reuse_existing_parents() -> Result<()> {
    let admin = demo_admin().await?;
    SyntheticDataGenerator::new(GeneratorConfig {
        customers: 3,
        restaurants: 2,
        orders: 0,
        deliveries: 0,
        seed: Some(1),
    })
    .populate(&admin)
    .await?;

    let report = SyntheticDataGenerator::new(GeneratorConfig {
        customers: 0,
        restaurants: 0,
        orders: 5,
        deliveries: 5,
        seed: Some(2),
    })
    .populate(&admin)
    .await?;
    assert_eq!(report.orders.len(), 5);
    assert_eq!(report.deliveries.len(), 5);

    let customers = key_set(&admin, CUSTOMERS, "customer_id").await?;
    let ordering = key_set(&admin, ORDERS, "customer_id").await?;
    assert!(ordering.is_subset(&customers));
    Ok(())
}

#[tokio::test]
async fn test_orders_without_parents_are_rejected() -> Result<()> {
    let admin = demo_admin().await?;
    let result = SyntheticDataGenerator::new(GeneratorConfig {
        customers: 0,
        restaurants: 0,
        orders: 3,
        deliveries: 0,
        seed: Some(3),
    })
    .populate(&admin)
    .await;

    assert!(matches!(result, Err(AdminError::Validation { .. })));
    assert!(admin.read(ORDERS).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_catalog_queries_run_on_generated_data() -> Result<()> {
    let admin = demo_admin().await?;
    SyntheticDataGenerator::new(GeneratorConfig::default().with_seed(2025))
        .populate(&admin)
        .await?;

    for query in catalog::CATALOG {
        match admin.run_catalog_query(query).await {
            QueryOutcome::Rows(result) => assert!(!result.columns.is_empty(), "query {}", query),
            QueryOutcome::Failed { message } => panic!("catalog query {} failed: {}", query, message),
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_deleting_generated_customer_leaves_no_orphans() -> Result<()> {
    let admin = demo_admin().await?;
    let report = SyntheticDataGenerator::new(GeneratorConfig::default().with_seed(11))
        .populate(&admin)
        .await?;

    for customer in report.customers.iter().take(3) {
        admin.delete(CUSTOMERS, "customer_id", customer.clone()).await?;
    }

    let customers = key_set(&admin, CUSTOMERS, "customer_id").await?;
    let ordering = key_set(&admin, ORDERS, "customer_id").await?;
    assert_eq!(customers.len(), 7);
    assert!(ordering.is_subset(&customers));

    let order_keys = key_set(&admin, ORDERS, "order_id").await?;
    let delivery_orders = key_set(&admin, DELIVERIES, "order_id").await?;
    assert!(delivery_orders.is_subset(&order_keys));
    Ok(())
}
