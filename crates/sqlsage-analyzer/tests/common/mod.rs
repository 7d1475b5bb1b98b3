//! Shared fixtures for the analyzer scenario tests

#![allow(dead_code)]

use sqlsage_analyzer::AnalysisReport;
use sqlsage_core::Severity;

/// Three-table shop schema with one foreign key and one secondary index
pub const SHOP_SCHEMA: &str = "
    CREATE TABLE users (
        id INT PRIMARY KEY,
        name TEXT,
        email VARCHAR(255) UNIQUE,
        spend DECIMAL(10, 2),
        created_at TIMESTAMP
    );
    CREATE TABLE orders (
        id INT PRIMARY KEY,
        user_id INT NOT NULL,
        total DECIMAL(10, 2),
        status VARCHAR(20),
        FOREIGN KEY (user_id) REFERENCES users (id)
    );
    CREATE TABLE products (
        id INT PRIMARY KEY,
        name TEXT,
        price DECIMAL(10, 2)
    );
    CREATE INDEX idx_orders_status ON orders (status);
";

/// Minimal schema used by the worked examples
pub const USERS_SCHEMA: &str = "CREATE TABLE users(id INT PRIMARY KEY, name TEXT, spend DECIMAL)";

pub fn rule_ids(report: &AnalysisReport) -> Vec<&str> {
    report.findings.iter().map(|f| f.rule_id.as_str()).collect()
}

pub fn severities(report: &AnalysisReport) -> Vec<Severity> {
    report.findings.iter().map(|f| f.severity).collect()
}
