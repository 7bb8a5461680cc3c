//! API Route Handlers

pub mod customers;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod instances;
pub mod settings;
pub mod workflows;
