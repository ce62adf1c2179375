//! Shop vendors: `/api/shop/vendors`.

use crate::{
    api::handlers::tenant::{TenantResource, require_text},
    db::models::vendors::{ShopVendor, ShopVendorCreate, ShopVendorUpdate},
    errors::Result,
};

impl TenantResource for ShopVendor {
    const BASE_PATH: &'static str = "/api/shop/vendors";

    fn validate_create(request: &ShopVendorCreate) -> Result<()> {
        require_text(&request.name, "name")
    }

    fn validate_update(request: &ShopVendorUpdate) -> Result<()> {
        match &request.name {
            Some(name) => require_text(name, "name"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::Role;
    use crate::test_utils::{auth_cookie, create_test_app, create_test_company, create_test_user};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[test_log::test(tokio::test)]
    async fn test_vendor_crud() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin = create_test_user(&state, Some(company.id), Role::Admin).await;
        let (name, value) = auth_cookie(&state, &admin);

        let response = server
            .post("/api/shop/vendors")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Steel Co", "phone": "+254700000000"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["message"], "Vendor created");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let response = server
            .patch(&format!("/api/shop/vendors/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"email": "sales@steel.test"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["email"], "sales@steel.test");
        assert_eq!(body["data"]["phone"], "+254700000000");

        let response = server
            .get("/api/shop/vendors?search=steel")
            .add_header(name.clone(), value.clone())
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["total_count"], 1);

        let response = server
            .delete(&format!("/api/shop/vendors/{id}"))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Vendor deleted");
        assert!(body.get("data").is_none());

        server
            .get(&format!("/api/shop/vendors/{id}"))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_vendor_with_purchases_cannot_be_deleted() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin = create_test_user(&state, Some(company.id), Role::Admin).await;
        let (name, value) = auth_cookie(&state, &admin);

        let response = server
            .post("/api/shop/vendors")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Timber Ltd"}))
            .await;
        let body: Value = response.json();
        let vendor_id = body["data"]["id"].as_str().unwrap().to_string();

        server
            .post("/api/manufacturing/purchases")
            .add_header(name.clone(), value.clone())
            .json(&json!({"vendor_id": vendor_id, "material_name": "Oak", "quantity": "3", "unit_price": "8"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .delete(&format!("/api/shop/vendors/{vendor_id}"))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_malformed_ids_are_rejected_in_envelope() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let staff = create_test_user(&state, Some(company.id), Role::Staff).await;
        let (name, value) = auth_cookie(&state, &staff);

        let response = server.get("/api/shop/vendors/not-a-uuid").add_header(name, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }
}
