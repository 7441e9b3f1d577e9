//! Synthetic demo data for the delivery schema.
//!
//! Rows are assembled by column name, aligned to the introspected column
//! order and written through [`DataAdmin::insert`], so every generated row
//! passes through the same validation as user input. Orders only reference
//! customers and restaurants that exist, deliveries only reference existing
//! orders.

use crate::Result;
use crate::admin::DataAdmin;
use crate::demo::{CUSTOMERS, DELIVERIES, ORDERS, RESTAURANTS};
use crate::error::AdminError;
use crate::models::Value;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;

const FIRST_NAMES: &[&str] = &[
    "Aarav", "Maya", "Lucas", "Priya", "Noah", "Chen", "Sofia", "Omar", "Hana", "Diego", "Amara",
    "Ivan", "Leila", "Mateo", "Yuki", "Zara",
];
const LAST_NAMES: &[&str] = &[
    "Sharma", "Garcia", "Nguyen", "Okafor", "Rossi", "Kim", "Haddad", "Novak", "Silva", "Patel",
    "Mueller", "Tanaka", "Brown", "Kowalski",
];
const STREETS: &[&str] = &[
    "Main Street", "Oak Avenue", "Harbor Road", "Maple Lane", "Station Road", "Market Square",
    "Hillside Drive", "River Walk",
];
const CITIES: &[&str] = &[
    "Springfield", "Riverton", "Lakeside", "Fairview", "Greenville", "Brookfield",
];
const RESTAURANT_SUFFIXES: &[&str] = &[
    "Kitchen", "Bistro", "Grill", "Diner", "Eatery", "Cantina", "Trattoria", "Express",
];
const CUISINES: &[&str] = &["Indian", "Chinese", "Italian", "Mexican"];
const ORDER_STATUSES: &[&str] = &["Pending", "Completed", "Cancelled"];
const PAYMENT_MODES: &[&str] = &["Cash", "Card", "Online"];
const DELIVERY_STATUSES: &[&str] = &["Pending", "Completed", "Cancelled", "Delayed"];
const VEHICLE_TYPES: &[&str] = &["Car", "Bike", "Truck"];

/// How many rows of each table to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Customers to create
    pub customers: usize,
    /// Restaurants to create
    pub restaurants: usize,
    /// Orders to create
    pub orders: usize,
    /// Deliveries to create
    pub deliveries: usize,
    /// Fixed seed for reproducible data; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            customers: 10,
            restaurants: 20,
            orders: 20,
            deliveries: 20,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Makes every run with this config produce the same rows.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Primary keys of the rows created by one run, per table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    /// Keys of the new customers
    pub customers: Vec<Value>,
    /// Keys of the new restaurants
    pub restaurants: Vec<Value>,
    /// Keys of the new orders
    pub orders: Vec<Value>,
    /// Keys of the new deliveries
    pub deliveries: Vec<Value>,
}

impl SeedReport {
    /// Rows created across all four tables.
    pub fn total_rows(&self) -> usize {
        self.customers.len() + self.restaurants.len() + self.orders.len() + self.deliveries.len()
    }
}

type Row = BTreeMap<&'static str, Value>;

/// Produces customers, restaurants, orders and deliveries.
pub struct SyntheticDataGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl SyntheticDataGenerator {
    /// Seeds the RNG from `config.seed`, or from the OS when unset.
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    /// Counts and seed this generator was built with.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Inserts the configured number of rows into the four demo tables.
    ///
    /// When this run creates no customers (or restaurants, or orders), rows
    /// already present in the table are referenced instead.
    ///
    /// # Errors
    /// Returns `Validation` when orders are requested without any customer or
    /// restaurant to reference, or deliveries without any order.
    pub async fn populate(&mut self, admin: &DataAdmin) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        for _ in 0..self.config.customers {
            let row = self.customer();
            report.customers.push(insert_row(admin, CUSTOMERS, row).await?);
        }
        for _ in 0..self.config.restaurants {
            let row = self.restaurant();
            report.restaurants.push(insert_row(admin, RESTAURANTS, row).await?);
        }

        if self.config.orders > 0 {
            let customers = keys_or_existing(admin, CUSTOMERS, &report.customers).await?;
            let restaurants = keys_or_existing(admin, RESTAURANTS, &report.restaurants).await?;
            if customers.is_empty() || restaurants.is_empty() {
                return Err(AdminError::validation(
                    "cannot generate orders without customers and restaurants",
                ));
            }
            for _ in 0..self.config.orders {
                let row = self.order(&customers, &restaurants);
                report.orders.push(insert_row(admin, ORDERS, row).await?);
            }
        }

        if self.config.deliveries > 0 {
            let orders = keys_or_existing(admin, ORDERS, &report.orders).await?;
            if orders.is_empty() {
                return Err(AdminError::validation(
                    "cannot generate deliveries without orders",
                ));
            }
            for _ in 0..self.config.deliveries {
                let row = self.delivery(&orders);
                report.deliveries.push(insert_row(admin, DELIVERIES, row).await?);
            }
        }

        tracing::info!(
            "Generated {} customers, {} restaurants, {} orders, {} deliveries",
            report.customers.len(),
            report.restaurants.len(),
            report.orders.len(),
            report.deliveries.len()
        );
        Ok(report)
    }

    fn pick(&mut self, choices: &[&'static str]) -> &'static str {
        choices.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn person_name(&mut self) -> String {
        format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES))
    }

    fn address(&mut self) -> String {
        format!(
            "{} {}, {}",
            self.rng.random_range(1..=999),
            self.pick(STREETS),
            self.pick(CITIES)
        )
    }

    fn phone(&mut self) -> String {
        format!(
            "555-{:03}-{:04}",
            self.rng.random_range(100..1000),
            self.rng.random_range(0..10000)
        )
    }

    /// Uniform value in `[low, high]` rounded to `decimals` places.
    fn rounded(&mut self, low: f64, high: f64, decimals: i32) -> Value {
        let scale = 10f64.powi(decimals);
        Value::Real((self.rng.random_range(low..=high) * scale).round() / scale)
    }

    fn customer(&mut self) -> Row {
        let name = self.person_name();
        let email = format!(
            "{}{}@example.com",
            name.to_lowercase().replace(' ', "."),
            self.rng.random_range(1..100)
        );
        let signup_date = NaiveDate::from_ymd_opt(2020, 1, 1)
            .map(|start| start + Duration::days(self.rng.random_range(0..2190)));

        let mut row = Row::new();
        row.insert("name", Value::Text(name));
        row.insert("email", Value::Text(email));
        row.insert("phone", Value::Text(self.phone()));
        row.insert("location", Value::Text(self.address()));
        row.insert("signup_date", Value::from(signup_date));
        row.insert("is_premium", Value::Bool(self.rng.random_bool(0.5)));
        row.insert("preferred_cuisine", Value::from(self.pick(CUISINES)));
        row.insert("total_orders", Value::Integer(self.rng.random_range(0..=100)));
        row.insert("average_rating", self.rounded(1.0, 5.0, 2));
        row
    }

    fn restaurant(&mut self) -> Row {
        let name = format!("{} {}", self.pick(LAST_NAMES), self.pick(RESTAURANT_SUFFIXES));

        let mut row = Row::new();
        row.insert("name", Value::Text(name));
        row.insert("cuisine_type", Value::from(self.pick(CUISINES)));
        row.insert("location", Value::Text(self.address()));
        row.insert("owner_name", Value::Text(self.person_name()));
        row.insert("average_delivery_time", Value::Integer(self.rng.random_range(20..=60)));
        row.insert("contact_number", Value::Text(self.phone()));
        row.insert("rating", self.rounded(1.0, 5.0, 1));
        row.insert("total_orders", Value::Integer(self.rng.random_range(0..=1000)));
        row.insert("is_active", Value::Bool(self.rng.random_bool(0.5)));
        row
    }

    fn order(&mut self, customers: &[Value], restaurants: &[Value]) -> Row {
        let order_date = self.order_timestamp();
        let delivery_time =
            order_date.map(|placed| placed + Duration::minutes(self.rng.random_range(15..=90)));

        let mut row = Row::new();
        row.insert("customer_id", customers.choose(&mut self.rng).cloned().unwrap_or_default());
        row.insert(
            "restaurant_id",
            restaurants.choose(&mut self.rng).cloned().unwrap_or_default(),
        );
        row.insert("order_date", Value::from(order_date));
        row.insert("delivery_time", Value::from(delivery_time));
        row.insert("status", Value::from(self.pick(ORDER_STATUSES)));
        row.insert("total_amount", self.rounded(10.0, 200.0, 2));
        row.insert("payment_mode", Value::from(self.pick(PAYMENT_MODES)));
        row.insert("discount_applied", self.rounded(0.0, 20.0, 2));
        row.insert(
            "feedback_rating",
            Value::Real(f64::from(self.rng.random_range(1..=5_i32))),
        );
        row
    }

    fn delivery(&mut self, orders: &[Value]) -> Row {
        let mut row = Row::new();
        row.insert("order_id", orders.choose(&mut self.rng).cloned().unwrap_or_default());
        row.insert("delivery_status", Value::from(self.pick(DELIVERY_STATUSES)));
        row.insert("distance", self.rounded(1.0, 50.0, 2));
        row.insert("delivery_time", Value::Integer(self.rng.random_range(10..=60)));
        row.insert("estimated_time", Value::Integer(self.rng.random_range(10..=60)));
        row.insert("delivery_fee", self.rounded(5.0, 50.0, 2));
        row.insert("vehicle_type", Value::from(self.pick(VEHICLE_TYPES)));
        row
    }

    /// A second-resolution timestamp within 2025.
    fn order_timestamp(&mut self) -> Option<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)?.and_hms_opt(0, 0, 0)?;
        Some(start + Duration::seconds(self.rng.random_range(0..365 * 24 * 3600)))
    }
}

/// Aligns `row` to the column order of `table` and inserts it.
///
/// Columns the row does not mention, including the generated key, are null.
async fn insert_row(admin: &DataAdmin, table: &str, mut row: Row) -> Result<Value> {
    let columns = admin.list_columns(table).await?;
    let values: Vec<Value> = columns
        .iter()
        .map(|column| row.remove(column.as_str()).unwrap_or_default())
        .collect();

    if !row.is_empty() {
        tracing::debug!(
            "Table '{}' has no column for generated fields {:?}",
            table,
            row.keys().collect::<Vec<_>>()
        );
    }

    admin.insert(table, values).await
}

/// `created` when non-empty, otherwise the primary keys already in `table`.
async fn keys_or_existing(admin: &DataAdmin, table: &str, created: &[Value]) -> Result<Vec<Value>> {
    if !created.is_empty() {
        return Ok(created.to_vec());
    }

    let pk = admin.describe_table(table).await?.primary_key_column()?.name.clone();
    let rows = admin.read(table).await?;
    Ok(rows.column_values(&pk).into_iter().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> SyntheticDataGenerator {
        SyntheticDataGenerator::new(GeneratorConfig::default().with_seed(seed))
    }

    fn real(row: &Row, column: &str) -> f64 {
        match row.get(column) {
            Some(Value::Real(r)) => *r,
            other => panic!("expected real in {}, got {:?}", column, other),
        }
    }

    fn integer(row: &Row, column: &str) -> i64 {
        match row.get(column) {
            Some(Value::Integer(i)) => *i,
            other => panic!("expected integer in {}, got {:?}", column, other),
        }
    }

    #[test]
    fn test_default_counts() {
        let config = GeneratorConfig::default();
        assert_eq!(
            (config.customers, config.restaurants, config.orders, config.deliveries),
            (10, 20, 20, 20)
        );
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let mut first = seeded(7);
        let mut second = seeded(7);
        for _ in 0..5 {
            assert_eq!(first.customer(), second.customer());
            assert_eq!(first.restaurant(), second.restaurant());
        }
    }

    #[test]
    fn test_customer_ranges() {
        let mut generator = seeded(1);
        for _ in 0..200 {
            let row = generator.customer();
            assert!((0..=100).contains(&integer(&row, "total_orders")));
            let rating = real(&row, "average_rating");
            assert!((1.0..=5.0).contains(&rating));
            assert_eq!((rating * 100.0).round() / 100.0, rating);
            assert!(matches!(row.get("signup_date"), Some(Value::Date(_))));
            match row.get("phone") {
                Some(Value::Text(phone)) => assert!(phone.len() <= 15),
                other => panic!("unexpected phone {:?}", other),
            }
        }
    }

    #[test]
    fn test_restaurant_and_delivery_ranges() {
        let mut generator = seeded(2);
        let orders = vec![Value::Integer(3), Value::Integer(4)];
        for _ in 0..200 {
            let restaurant = generator.restaurant();
            assert!((20..=60).contains(&integer(&restaurant, "average_delivery_time")));
            assert!((0..=1000).contains(&integer(&restaurant, "total_orders")));

            let delivery = generator.delivery(&orders);
            assert!(orders.contains(&delivery["order_id"]));
            assert!((1.0..=50.0).contains(&real(&delivery, "distance")));
            assert!((5.0..=50.0).contains(&real(&delivery, "delivery_fee")));
            assert!((10..=60).contains(&integer(&delivery, "estimated_time")));
        }
    }

    #[test]
    fn test_orders_reference_given_keys() {
        let mut generator = seeded(3);
        let customers = vec![Value::Integer(1)];
        let restaurants = vec![Value::Integer(8), Value::Integer(9)];
        for _ in 0..50 {
            let order = generator.order(&customers, &restaurants);
            assert_eq!(order["customer_id"], Value::Integer(1));
            assert!(restaurants.contains(&order["restaurant_id"]));
            assert!((10.0..=200.0).contains(&real(&order, "total_amount")));
            assert!((0.0..=20.0).contains(&real(&order, "discount_applied")));

            match (&order["order_date"], &order["delivery_time"]) {
                (Value::Timestamp(placed), Value::Timestamp(delivered)) => {
                    assert!(delivered > placed)
                }
                other => panic!("unexpected timestamps {:?}", other),
            }
        }
    }
}
