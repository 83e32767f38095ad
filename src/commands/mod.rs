pub mod auth;
pub mod branches;
pub mod employees;
pub mod plans;
pub mod progress;
pub mod sales;
