//! Accounting accounts: `/api/accounting/accounts`.

use crate::{
    api::handlers::tenant::{TenantResource, bad_request, require_text},
    db::models::accounts::{Account, AccountCreate, AccountUpdate},
    errors::Result,
};

/// ISO 4217 style: three uppercase ASCII letters.
fn validate_currency(currency: &str) -> Result<()> {
    if currency.len() == 3 && currency.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(bad_request("currency must be a three-letter uppercase code"))
    }
}

impl TenantResource for Account {
    const BASE_PATH: &'static str = "/api/accounting/accounts";

    fn validate_create(request: &AccountCreate) -> Result<()> {
        require_text(&request.name, "name")?;
        validate_currency(&request.currency)
    }

    fn validate_update(request: &AccountUpdate) -> Result<()> {
        if let Some(name) = &request.name {
            require_text(name, "name")?;
        }
        Ok(())
    }
}
