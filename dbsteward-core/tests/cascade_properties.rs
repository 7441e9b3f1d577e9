//! Property-based tests for cascade-aware deletes using proptest.
//!
//! Each case builds a random demo dataset in a fresh in-memory database,
//! deletes one row and compares the survivors with a model computed in Rust.

#![cfg(feature = "sqlite")]

use std::collections::BTreeSet;

use dbsteward_core::demo::{self, CUSTOMERS, DELIVERIES, ORDERS, RESTAURANTS};
use dbsteward_core::{DataAdmin, Result, Value};
use proptest::prelude::*;

/// Orders as `(customer, restaurant)` and deliveries as order indices.
#[derive(Debug, Clone)]
struct Dataset {
    customers: usize,
    restaurants: usize,
    orders: Vec<(usize, usize)>,
    deliveries: Vec<usize>,
}

fn dataset() -> impl Strategy<Value = Dataset> {
    (1usize..4, 1usize..4)
        .prop_flat_map(|(customers, restaurants)| {
            (
                Just(customers),
                Just(restaurants),
                prop::collection::vec((0..customers, 0..restaurants), 1..8),
            )
        })
        .prop_flat_map(|(customers, restaurants, orders)| {
            let order_count = orders.len();
            (
                Just(customers),
                Just(restaurants),
                Just(orders),
                prop::collection::vec(0..order_count, 0..10),
            )
        })
        .prop_map(|(customers, restaurants, orders, deliveries)| Dataset {
            customers,
            restaurants,
            orders,
            deliveries,
        })
}

/// Row keys start at 1, so index `i` is stored under key `i + 1`.
fn key(index: usize) -> Value {
    Value::Integer(index as i64 + 1)
}

async fn load(dataset: &Dataset) -> Result<DataAdmin> {
    let admin = DataAdmin::connect("sqlite::memory:").await?;
    demo::install_schema(admin.adapter()).await?;

    for i in 0..dataset.customers {
        let mut row = vec![key(i), Value::from(format!("customer {}", i))];
        row.resize(10, Value::Null);
        admin.insert(CUSTOMERS, row).await?;
    }
    for i in 0..dataset.restaurants {
        let mut row = vec![key(i), Value::from(format!("restaurant {}", i))];
        row.resize(10, Value::Null);
        admin.insert(RESTAURANTS, row).await?;
    }
    for (i, (customer, restaurant)) in dataset.orders.iter().enumerate() {
        let mut row = vec![key(i), key(*customer), key(*restaurant)];
        row.resize(10, Value::Null);
        admin.insert(ORDERS, row).await?;
    }
    for (i, order) in dataset.deliveries.iter().enumerate() {
        let mut row = vec![key(i), key(*order)];
        row.resize(8, Value::Null);
        admin.insert(DELIVERIES, row).await?;
    }
    Ok(admin)
}

async fn surviving(admin: &DataAdmin, table: &str, column: &str) -> Result<BTreeSet<i64>> {
    let result = admin.read(table).await?;
    Ok(result
        .column_values(column)
        .into_iter()
        .filter_map(|value| match value {
            Value::Integer(i) => Some(*i - 1),
            _ => None,
        })
        .collect())
}

/// Which parent row a deletion starts from.
#[derive(Debug, Clone, Copy)]
enum Target {
    Customer,
    Restaurant,
    Order,
}

/// Surviving order and delivery indices after deleting `target` row `index`.
fn expected(dataset: &Dataset, target: Target, index: usize) -> (BTreeSet<i64>, BTreeSet<i64>) {
    let orders: BTreeSet<i64> = dataset
        .orders
        .iter()
        .enumerate()
        .filter(|(i, (customer, restaurant))| match target {
            Target::Customer => *customer != index,
            Target::Restaurant => *restaurant != index,
            Target::Order => *i != index,
        })
        .map(|(i, _)| i as i64)
        .collect();
    let deliveries = dataset
        .deliveries
        .iter()
        .enumerate()
        .filter(|(_, order)| orders.contains(&(**order as i64)))
        .map(|(i, _)| i as i64)
        .collect();
    (orders, deliveries)
}

fn check_delete(dataset: &Dataset, target: Target, index: usize) -> Result<(BTreeSet<i64>, BTreeSet<i64>)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| dbsteward_core::AdminError::configuration(e.to_string()))?;

    runtime.block_on(async {
        let admin = load(dataset).await?;
        let (table, column) = match target {
            Target::Customer => (CUSTOMERS, "customer_id"),
            Target::Restaurant => (RESTAURANTS, "restaurant_id"),
            Target::Order => (ORDERS, "order_id"),
        };
        admin.delete(table, column, key(index)).await?;

        let orders = surviving(&admin, ORDERS, "order_id").await?;
        let deliveries = surviving(&admin, DELIVERIES, "delivery_id").await?;
        admin.close().await;
        Ok((orders, deliveries))
    })
}

fn target() -> impl Strategy<Value = Target> {
    prop_oneof![
        Just(Target::Customer),
        Just(Target::Restaurant),
        Just(Target::Order),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Deleting a row removes exactly its transitive dependents.
    #[test]
    fn delete_removes_exactly_the_dependents(
        data in dataset(),
        target in target(),
        pick in any::<prop::sample::Index>(),
    ) {
        let bound = match target {
            Target::Customer => data.customers,
            Target::Restaurant => data.restaurants,
            Target::Order => data.orders.len(),
        };
        let index = pick.index(bound);

        let (orders, deliveries) = check_delete(&data, target, index)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let (expected_orders, expected_deliveries) = expected(&data, target, index);

        prop_assert_eq!(orders, expected_orders);
        prop_assert_eq!(deliveries, expected_deliveries);
    }
}
