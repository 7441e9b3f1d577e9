//! The food-delivery demo schema.
//!
//! Four tables in a two-level chain: `orders` references `customers` and
//! `restaurants`, `deliveries` references `orders`. Every foreign key cascades
//! on delete and update, so storage and the planned deletes agree on the
//! order in which rows go away.

use crate::Result;
use crate::adapters::DatabaseAdapter;
use crate::cascade::DependencyGraph;
use crate::sql::Dialect;

/// Demo customers table.
pub const CUSTOMERS: &str = "customers";
/// Demo restaurants table.
pub const RESTAURANTS: &str = "restaurants";
/// Demo orders table; references customers and restaurants.
pub const ORDERS: &str = "orders";
/// Demo deliveries table; references orders.
pub const DELIVERIES: &str = "deliveries";

/// Demo tables, parents before children.
pub const TABLES: &[&str] = &[CUSTOMERS, RESTAURANTS, ORDERS, DELIVERIES];

const SQLITE_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS customers (
        customer_id INTEGER PRIMARY KEY,
        name VARCHAR(100),
        email VARCHAR(100),
        phone VARCHAR(15),
        location VARCHAR(200),
        signup_date DATE,
        is_premium BOOLEAN,
        preferred_cuisine VARCHAR(50),
        total_orders INTEGER,
        average_rating REAL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS restaurants (
        restaurant_id INTEGER PRIMARY KEY,
        name VARCHAR(100),
        cuisine_type VARCHAR(50),
        location VARCHAR(200),
        owner_name VARCHAR(100),
        average_delivery_time INTEGER,
        contact_number VARCHAR(15),
        rating REAL,
        total_orders INTEGER,
        is_active BOOLEAN DEFAULT TRUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS orders (
        order_id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL
            REFERENCES customers(customer_id) ON DELETE CASCADE ON UPDATE CASCADE,
        restaurant_id INTEGER NOT NULL
            REFERENCES restaurants(restaurant_id) ON DELETE CASCADE ON UPDATE CASCADE,
        order_date TIMESTAMP,
        delivery_time TIMESTAMP,
        status VARCHAR(20),
        total_amount REAL,
        payment_mode VARCHAR(50),
        discount_applied REAL,
        feedback_rating REAL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS deliveries (
        delivery_id INTEGER PRIMARY KEY,
        order_id INTEGER NOT NULL
            REFERENCES orders(order_id) ON DELETE CASCADE ON UPDATE CASCADE,
        delivery_status VARCHAR(50),
        distance REAL,
        delivery_time INTEGER,
        estimated_time INTEGER,
        delivery_fee REAL,
        vehicle_type VARCHAR(50)
    )"#,
];

// Floating-point columns use DOUBLE PRECISION so they decode as f64
const POSTGRES_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS customers (
        customer_id SERIAL PRIMARY KEY,
        name VARCHAR(100),
        email VARCHAR(100),
        phone VARCHAR(15),
        location VARCHAR(200),
        signup_date DATE,
        is_premium BOOLEAN,
        preferred_cuisine VARCHAR(50),
        total_orders INTEGER,
        average_rating DOUBLE PRECISION
    )"#,
    r#"CREATE TABLE IF NOT EXISTS restaurants (
        restaurant_id SERIAL PRIMARY KEY,
        name VARCHAR(100),
        cuisine_type VARCHAR(50),
        location VARCHAR(200),
        owner_name VARCHAR(100),
        average_delivery_time INTEGER,
        contact_number VARCHAR(15),
        rating DOUBLE PRECISION,
        total_orders INTEGER,
        is_active BOOLEAN DEFAULT TRUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS orders (
        order_id SERIAL PRIMARY KEY,
        customer_id INTEGER NOT NULL
            REFERENCES customers(customer_id) ON DELETE CASCADE ON UPDATE CASCADE,
        restaurant_id INTEGER NOT NULL
            REFERENCES restaurants(restaurant_id) ON DELETE CASCADE ON UPDATE CASCADE,
        order_date TIMESTAMP,
        delivery_time TIMESTAMP,
        status VARCHAR(20),
        total_amount DOUBLE PRECISION,
        payment_mode VARCHAR(50),
        discount_applied DOUBLE PRECISION,
        feedback_rating DOUBLE PRECISION
    )"#,
    r#"CREATE TABLE IF NOT EXISTS deliveries (
        delivery_id SERIAL PRIMARY KEY,
        order_id INTEGER NOT NULL
            REFERENCES orders(order_id) ON DELETE CASCADE ON UPDATE CASCADE,
        delivery_status VARCHAR(50),
        distance DOUBLE PRECISION,
        delivery_time INTEGER,
        estimated_time INTEGER,
        delivery_fee DOUBLE PRECISION,
        vehicle_type VARCHAR(50)
    )"#,
];

/// DDL creating the demo tables in `dialect`, parents first.
pub fn schema_statements(dialect: Dialect) -> &'static [&'static str] {
    match dialect {
        Dialect::Sqlite => SQLITE_SCHEMA,
        Dialect::Postgres => POSTGRES_SCHEMA,
    }
}

/// Creates the demo tables that do not exist yet.
pub async fn install_schema(adapter: &dyn DatabaseAdapter) -> Result<()> {
    adapter
        .execute_script(schema_statements(adapter.dialect()))
        .await?;
    tracing::info!("Demo schema installed ({} tables)", TABLES.len());
    Ok(())
}

/// The foreign keys of the demo schema as a fixed dependency graph.
pub fn dependency_graph() -> DependencyGraph {
    DependencyGraph::new()
        .with_dependency(CUSTOMERS, ORDERS, "customer_id", "customer_id")
        .with_dependency(RESTAURANTS, ORDERS, "restaurant_id", "restaurant_id")
        .with_dependency(ORDERS, DELIVERIES, "order_id", "order_id")
}
