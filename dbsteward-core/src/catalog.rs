//! Canned analytical queries over the delivery schema.
//!
//! The catalog is fixed and numbered from 1. Most statements are portable;
//! the few that truncate dates or subtract timestamps carry a PostgreSQL
//! variant. Every aggregate is aliased so both dialects report the same
//! column names.

use crate::sql::Dialect;

/// One named read-only statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CannedQuery {
    /// Position in the catalog, 1-20
    pub number: u32,
    /// Title shown in listings
    pub name: &'static str,
    sqlite: &'static str,
    postgres: Option<&'static str>,
}

impl CannedQuery {
    const fn portable(number: u32, name: &'static str, sql: &'static str) -> Self {
        Self {
            number,
            name,
            sqlite: sql,
            postgres: None,
        }
    }

    const fn per_dialect(
        number: u32,
        name: &'static str,
        sqlite: &'static str,
        postgres: &'static str,
    ) -> Self {
        Self {
            number,
            name,
            sqlite,
            postgres: Some(postgres),
        }
    }

    /// SQL text for `dialect`.
    pub fn sql_for(&self, dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Sqlite => self.sqlite,
            Dialect::Postgres => self.postgres.unwrap_or(self.sqlite),
        }
    }

    /// Whether the statement differs between dialects.
    pub fn is_dialect_specific(&self) -> bool {
        self.postgres.is_some()
    }
}

impl std::fmt::Display for CannedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>2}. {}", self.number, self.name)
    }
}

/// All canned queries, in catalog order.
pub const CATALOG: &[CannedQuery] = &[
    CannedQuery::per_dialect(
        1,
        "Peak Ordering Dates",
        "SELECT DATE(order_date) AS order_day, COUNT(*) AS total_orders FROM orders \
         GROUP BY DATE(order_date) ORDER BY total_orders DESC LIMIT 5",
        "SELECT CAST(order_date AS DATE) AS order_day, COUNT(*) AS total_orders FROM orders \
         GROUP BY CAST(order_date AS DATE) ORDER BY total_orders DESC LIMIT 5",
    ),
    CannedQuery::portable(
        2,
        "Delayed and Cancelled Deliveries",
        "SELECT order_id, delivery_status FROM deliveries \
         WHERE delivery_status IN ('Delayed', 'Cancelled') ORDER BY order_id",
    ),
    CannedQuery::portable(
        3,
        "Customer Preferences",
        "SELECT preferred_cuisine, COUNT(*) AS total_customers FROM customers \
         GROUP BY preferred_cuisine ORDER BY total_customers DESC",
    ),
    CannedQuery::portable(
        4,
        "Top Customers by Order Frequency",
        "SELECT customers.customer_id, customers.name, COUNT(orders.order_id) AS order_count \
         FROM orders JOIN customers ON orders.customer_id = customers.customer_id \
         GROUP BY customers.customer_id, customers.name \
         ORDER BY order_count DESC LIMIT 5",
    ),
    CannedQuery::portable(
        5,
        "Top Customers by Order Value",
        "SELECT customers.customer_id, customers.name, SUM(orders.total_amount) AS total_spent \
         FROM orders JOIN customers ON orders.customer_id = customers.customer_id \
         GROUP BY customers.customer_id, customers.name \
         ORDER BY total_spent DESC LIMIT 5",
    ),
    CannedQuery::per_dialect(
        6,
        "Delivery Times and Delays",
        "SELECT order_id, \
         ROUND((julianday(delivery_time) - julianday(order_date)) * 1440.0, 1) AS delivery_minutes \
         FROM orders ORDER BY delivery_minutes DESC LIMIT 5",
        "SELECT order_id, \
         ROUND(CAST(EXTRACT(EPOCH FROM (delivery_time - order_date)) / 60.0 AS NUMERIC), 1)::DOUBLE PRECISION \
         AS delivery_minutes \
         FROM orders ORDER BY delivery_minutes DESC NULLS LAST LIMIT 5",
    ),
    CannedQuery::portable(
        7,
        "Delivery Personnel Performance",
        "SELECT delivery_id, delivery_status, distance, delivery_fee FROM deliveries \
         ORDER BY delivery_fee DESC LIMIT 5",
    ),
    CannedQuery::portable(
        8,
        "Most Popular Restaurants",
        "SELECT name, total_orders FROM restaurants ORDER BY total_orders DESC LIMIT 5",
    ),
    CannedQuery::portable(
        9,
        "Order Frequency by Restaurant",
        "SELECT restaurants.restaurant_id, restaurants.name, COUNT(orders.order_id) AS order_count \
         FROM orders JOIN restaurants ON orders.restaurant_id = restaurants.restaurant_id \
         GROUP BY restaurants.restaurant_id, restaurants.name \
         ORDER BY order_count DESC",
    ),
    CannedQuery::portable(
        10,
        "Average Rating by Restaurant",
        "SELECT name, AVG(rating) AS average_rating FROM restaurants \
         GROUP BY name ORDER BY average_rating DESC",
    ),
    CannedQuery::portable(
        11,
        "Most Common Payment Modes",
        "SELECT payment_mode, COUNT(*) AS payments FROM orders \
         GROUP BY payment_mode ORDER BY payments DESC",
    ),
    CannedQuery::portable(
        12,
        "Average Order Value",
        "SELECT AVG(total_amount) AS avg_order_value FROM orders",
    ),
    CannedQuery::portable(
        13,
        "Premium Customers",
        "SELECT name FROM customers WHERE is_premium = TRUE ORDER BY name",
    ),
    CannedQuery::portable(
        14,
        "Restaurants with Fastest Delivery Time",
        "SELECT name, average_delivery_time FROM restaurants \
         ORDER BY average_delivery_time ASC LIMIT 5",
    ),
    CannedQuery::portable(
        15,
        "Total Revenue",
        "SELECT SUM(total_amount) AS total_revenue FROM orders",
    ),
    CannedQuery::portable(
        16,
        "Completed Deliveries",
        "SELECT COUNT(*) AS completed_deliveries FROM deliveries WHERE delivery_status = 'Completed'",
    ),
    CannedQuery::portable(
        17,
        "Average Feedback Rating",
        "SELECT AVG(feedback_rating) AS average_feedback FROM orders",
    ),
    CannedQuery::portable(
        18,
        "Cancelled Orders",
        "SELECT COUNT(*) AS cancelled_orders FROM orders WHERE status = 'Cancelled'",
    ),
    CannedQuery::portable(
        19,
        "Highest Delivery Fee",
        "SELECT MAX(delivery_fee) AS highest_fee FROM deliveries",
    ),
    CannedQuery::portable(
        20,
        "Active Restaurants",
        "SELECT name FROM restaurants WHERE is_active = TRUE ORDER BY name",
    ),
];

/// Looks a query up by number (`"7"`) or by name, ignoring case.
pub fn find(selector: &str) -> Option<&'static CannedQuery> {
    let selector = selector.trim();
    if let Ok(number) = selector.parse::<u32>() {
        return CATALOG.iter().find(|q| q.number == number);
    }
    CATALOG.iter().find(|q| q.name.eq_ignore_ascii_case(selector))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_numbered_in_order() {
        assert_eq!(CATALOG.len(), 20);
        for (index, query) in CATALOG.iter().enumerate() {
            assert_eq!(query.number as usize, index + 1);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<String> = CATALOG.iter().map(|q| q.name.to_lowercase()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_find_by_number_and_name() {
        assert_eq!(find("15").map(|q| q.name), Some("Total Revenue"));
        assert_eq!(find(" 7 ").map(|q| q.number), Some(7));
        assert_eq!(find("total revenue").map(|q| q.number), Some(15));
        assert_eq!(find("ACTIVE RESTAURANTS").map(|q| q.number), Some(20));
        assert!(find("0").is_none());
        assert!(find("21").is_none());
        assert!(find("Most Profitable Drivers").is_none());
    }

    #[test]
    fn test_dialect_variants() {
        let peak = find("1").unwrap();
        assert!(peak.is_dialect_specific());
        assert!(peak.sql_for(Dialect::Sqlite).contains("DATE(order_date)"));
        assert!(peak.sql_for(Dialect::Postgres).contains("CAST(order_date AS DATE)"));

        let durations = find("6").unwrap();
        assert!(durations.sql_for(Dialect::Sqlite).contains("julianday"));
        assert!(durations.sql_for(Dialect::Postgres).contains("EPOCH"));

        let revenue = find("15").unwrap();
        assert!(!revenue.is_dialect_specific());
        assert_eq!(
            revenue.sql_for(Dialect::Sqlite),
            revenue.sql_for(Dialect::Postgres)
        );
    }

    #[test]
    fn test_queries_are_read_only() {
        for query in CATALOG {
            for dialect in [Dialect::Sqlite, Dialect::Postgres] {
                assert!(
                    query.sql_for(dialect).starts_with("SELECT "),
                    "query {} is not a SELECT",
                    query.number
                );
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(find("3").unwrap().to_string(), " 3. Customer Preferences");
    }
}
