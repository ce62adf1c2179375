//! Raw-material purchases: `/api/manufacturing/purchases`.
//!
//! `total_amount` is always `quantity × unit_price`, computed on create and never editable.
//! Payments are recorded by raising `amount_paid`, which may never exceed the total.

use rust_decimal::Decimal;

use crate::{
    api::handlers::tenant::{TenantResource, bad_request, require_text},
    db::models::purchases::{MaterialPurchase, MaterialPurchaseCreate, MaterialPurchaseUpdate},
    errors::Result,
};

impl TenantResource for MaterialPurchase {
    const BASE_PATH: &'static str = "/api/manufacturing/purchases";

    fn validate_create(request: &MaterialPurchaseCreate) -> Result<()> {
        require_text(&request.material_name, "material_name")?;
        if request.quantity <= Decimal::ZERO {
            return Err(bad_request("quantity must be greater than zero"));
        }
        if request.unit_price < Decimal::ZERO {
            return Err(bad_request("unit_price must not be negative"));
        }
        let total_amount = request
            .total_amount()
            .ok_or_else(|| bad_request("total amount is too large"))?;
        if request.amount_paid < Decimal::ZERO || request.amount_paid > total_amount {
            return Err(bad_request("amount_paid must be between 0 and the total amount"));
        }
        Ok(())
    }

    // The upper bound on amount_paid needs the stored total and is enforced by the store
    fn validate_update(request: &MaterialPurchaseUpdate) -> Result<()> {
        if let Some(material_name) = &request.material_name {
            require_text(material_name, "material_name")?;
        }
        if request.amount_paid.is_some_and(|paid| paid < Decimal::ZERO) {
            return Err(bad_request("amount_paid must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::Role;
    use crate::test_utils::{auth_cookie, create_test_app, create_test_company, create_test_user};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[test_log::test(tokio::test)]
    async fn test_purchase_total_and_payments() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let manager = create_test_user(&state, Some(company.id), Role::Manager).await;
        let (name, value) = auth_cookie(&state, &manager);

        let response = server
            .post("/api/manufacturing/purchases")
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "material_name": "Steel sheet",
                "quantity": "10",
                "unit_price": "12.50",
                "amount_paid": "25.00",
                "purchase_date": "2025-02-14"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["total_amount"], "125.00");
        assert_eq!(body["data"]["purchase_date"], "2025-02-14");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let response = server
            .patch(&format!("/api/manufacturing/purchases/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"amount_paid": "125.00"}))
            .await;
        response.assert_status_ok();

        let response = server
            .patch(&format!("/api/manufacturing/purchases/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"amount_paid": "125.01"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .get("/api/manufacturing/purchases?unpaid_only=true")
            .add_header(name, value)
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["total_count"], 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_purchase_validation() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin = create_test_user(&state, Some(company.id), Role::Admin).await;
        let (name, value) = auth_cookie(&state, &admin);

        for payload in [
            json!({"material_name": "Wood", "quantity": "0", "unit_price": "1"}),
            json!({"material_name": "Wood", "quantity": "1", "unit_price": "-1"}),
            json!({"material_name": "Wood", "quantity": "2", "unit_price": "5", "amount_paid": "11"}),
            json!({"material_name": "", "quantity": "2", "unit_price": "5"}),
        ] {
            let response = server
                .post("/api/manufacturing/purchases")
                .add_header(name.clone(), value.clone())
                .json(&payload)
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_vendor_must_belong_to_company() {
        let (server, state) = create_test_app().await;
        let acme = create_test_company(&state, "Acme").await;
        let globex = create_test_company(&state, "Globex").await;
        let acme_cookie = auth_cookie(&state, &create_test_user(&state, Some(acme.id), Role::Admin).await);
        let globex_cookie = auth_cookie(&state, &create_test_user(&state, Some(globex.id), Role::Admin).await);

        let response = server
            .post("/api/shop/vendors")
            .add_header(globex_cookie.0, globex_cookie.1)
            .json(&json!({"name": "Globex Supplies"}))
            .await;
        let body: Value = response.json();
        let vendor_id = body["data"]["id"].as_str().unwrap().to_string();

        let response = server
            .post("/api/manufacturing/purchases")
            .add_header(acme_cookie.0, acme_cookie.1)
            .json(&json!({"vendor_id": vendor_id, "material_name": "Wood", "quantity": "1", "unit_price": "1"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_total_amount_overflow_is_rejected() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin = create_test_user(&state, Some(company.id), Role::Admin).await;
        let (name, value) = auth_cookie(&state, &admin);

        let response = server
            .post("/api/manufacturing/purchases")
            .add_header(name.clone(), value.clone())
            .json(&json!({"material_name": "Wood", "quantity": "79228162514264337593543950335", "unit_price": "2"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "total amount is too large");

        let response = server
            .get("/api/manufacturing/purchases")
            .add_header(name, value)
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["total_count"], 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_only_admins_delete_purchases() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin_cookie = auth_cookie(&state, &create_test_user(&state, Some(company.id), Role::Admin).await);
        let manager_cookie = auth_cookie(&state, &create_test_user(&state, Some(company.id), Role::Manager).await);

        let response = server
            .post("/api/manufacturing/purchases")
            .add_header(manager_cookie.0.clone(), manager_cookie.1.clone())
            .json(&json!({"material_name": "Wood", "quantity": "3", "unit_price": "4"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let id = body["data"]["id"].as_str().unwrap().to_string();

        server
            .delete(&format!("/api/manufacturing/purchases/{id}"))
            .add_header(manager_cookie.0.clone(), manager_cookie.1.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .get(&format!("/api/manufacturing/purchases/{id}"))
            .add_header(manager_cookie.0, manager_cookie.1)
            .await
            .assert_status_ok();

        server
            .delete(&format!("/api/manufacturing/purchases/{id}"))
            .add_header(admin_cookie.0, admin_cookie.1)
            .await
            .assert_status_ok();
    }
}
