use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub password: String,
}

/// Authenticated caller. Every command that mutates shared data takes one.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<i64>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{} is not an administrator",
                self.username
            )))
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub manager: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBranch {
    pub name: String,
    pub address: Option<String>,
    pub manager: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateBranch {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub manager: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<i64>,
    pub branch_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEmployee {
    pub name: String,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEmployee {
    pub id: i64,
    pub name: String,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Sale {
    pub id: i64,
    pub date: String, // YYYY-MM-DD
    pub revenue: f64,
    pub transaction_count: i64,
    pub average_check: f64,
    pub employee_id: Option<i64>,
    pub employee_name: Option<String>,
    pub branch_id: Option<i64>,
    pub branch_name: Option<String>,
    pub notes: Option<String>,
    pub author_id: i64,
    pub author_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSale {
    pub date: String,
    pub revenue: f64,
    pub transaction_count: i64,
    pub employee_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSale {
    pub id: i64,
    pub date: String,
    pub revenue: f64,
    pub transaction_count: i64,
    pub employee_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub notes: Option<String>,
}

/// Mean ticket size for a sale row. Zero transactions means zero, not NaN.
pub fn average_check(revenue: f64, transaction_count: i64) -> f64 {
    if transaction_count > 0 {
        revenue / transaction_count as f64
    } else {
        0.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Plan {
    pub id: i64,
    pub branch_id: i64,
    pub branch_name: Option<String>,
    pub year: i32,
    pub month: u32,
    pub daily_target: f64,
    pub monthly_target: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePlan {
    pub branch_id: i64,
    pub year: i32,
    pub month: u32,
    pub daily_target: f64,
    pub monthly_target: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub id: i64,
    pub branch_id: i64,
    pub year: i32,
    pub month: u32,
    pub daily_target: f64,
    pub monthly_target: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SavedPlan {
    pub plan: Plan,
    pub warning: Option<String>,
}
