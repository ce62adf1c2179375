//! Income and expense transactions: `/api/accounting/transactions`.
//!
//! Any member may record a transaction. Creating one moves its account's balance by the signed
//! amount and deleting it moves the balance back, so amount, kind and account are fixed once
//! recorded; only the descriptive fields can be edited.

use rust_decimal::Decimal;

use crate::{
    api::{
        handlers::tenant::{TenantResource, bad_request},
        models::users::Role,
    },
    auth::permissions::{MANAGERS, MEMBERS},
    db::models::transactions::{Transaction, TransactionCreate},
    errors::Result,
};

impl TenantResource for Transaction {
    const BASE_PATH: &'static str = "/api/accounting/transactions";

    const CREATE_ROLES: &'static [Role] = MEMBERS;
    const DELETE_ROLES: &'static [Role] = MANAGERS;

    fn validate_create(request: &TransactionCreate) -> Result<()> {
        if request.amount <= Decimal::ZERO {
            return Err(bad_request("amount must be greater than zero"));
        }
        Ok(())
    }
}
