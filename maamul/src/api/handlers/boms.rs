//! Bills of materials: `/api/manufacturing/boms`.

use rust_decimal::Decimal;

use crate::{
    api::{
        handlers::tenant::{TenantResource, bad_request, require_text},
        models::users::Role,
    },
    auth::permissions::MANAGERS,
    db::models::boms::{BillOfMaterial, BillOfMaterialCreate, BillOfMaterialUpdate, BomItem, total_cost},
    errors::Result,
};

fn validate_items(items: &[BomItem]) -> Result<()> {
    for (index, item) in items.iter().enumerate() {
        if item.material_name.trim().is_empty() {
            return Err(bad_request(format!("items[{index}].material_name is required")));
        }
        if item.quantity <= Decimal::ZERO {
            return Err(bad_request(format!("items[{index}].quantity must be greater than zero")));
        }
        if item.unit_cost < Decimal::ZERO {
            return Err(bad_request(format!("items[{index}].unit_cost must not be negative")));
        }
    }
    if total_cost(items).is_none() {
        return Err(bad_request("total cost is too large"));
    }
    Ok(())
}

impl TenantResource for BillOfMaterial {
    const BASE_PATH: &'static str = "/api/manufacturing/boms";

    const DELETE_ROLES: &'static [Role] = MANAGERS;

    fn validate_create(request: &BillOfMaterialCreate) -> Result<()> {
        require_text(&request.product_name, "product_name")?;
        validate_items(&request.items)
    }

    fn validate_update(request: &BillOfMaterialUpdate) -> Result<()> {
        if let Some(product_name) = &request.product_name {
            require_text(product_name, "product_name")?;
        }
        if let Some(items) = &request.items {
            validate_items(items)?;
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
    async fn test_bom_total_is_computed_and_recomputed() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let manager = create_test_user(&state, Some(company.id), Role::Manager).await;
        let (name, value) = auth_cookie(&state, &manager);

        let response = server
            .post("/api/manufacturing/boms")
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "product_name": "Table",
                "items": [
                    {"material_name": "Plank", "quantity": "4", "unit": "pcs", "unit_cost": "2.50"},
                    {"material_name": "Screw", "quantity": "16", "unit_cost": "0.10"}
                ]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["total_cost"], "11.60");
        assert_eq!(body["data"]["items"][0]["material_name"], "Plank");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        // Notes-only updates keep the total
        let response = server
            .patch(&format!("/api/manufacturing/boms/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"notes": "oak"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["total_cost"], "11.60");
        assert_eq!(body["data"]["notes"], "oak");

        let response = server
            .patch(&format!("/api/manufacturing/boms/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"items": [{"material_name": "Plank", "quantity": "2", "unit_cost": "3.00"}]}))
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["total_cost"], "6.00");

        // Managers may delete bills of materials
        server
            .delete(&format!("/api/manufacturing/boms/{id}"))
            .add_header(name, value)
            .await
            .assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_bom_item_validation() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin = create_test_user(&state, Some(company.id), Role::Admin).await;
        let (name, value) = auth_cookie(&state, &admin);

        let response = server
            .post("/api/manufacturing/boms")
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "product_name": "Chair",
                "items": [{"material_name": "Leg", "quantity": "0", "unit_cost": "1"}]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "items[0].quantity must be greater than zero");

        let response = server
            .post("/api/manufacturing/boms")
            .add_header(name, value)
            .json(&json!({
                "product_name": "Chair",
                "items": [{"material_name": "Leg", "quantity": "4", "unit_cost": "-1"}]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_staff_cannot_create_boms() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let staff = create_test_user(&state, Some(company.id), Role::Staff).await;
        let (name, value) = auth_cookie(&state, &staff);

        let response = server
            .post("/api/manufacturing/boms")
            .add_header(name, value)
            .json(&json!({"product_name": "Table", "items": []}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_total_cost_overflow_is_rejected() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin = create_test_user(&state, Some(company.id), Role::Admin).await;
        let (name, value) = auth_cookie(&state, &admin);

        let response = server
            .post("/api/manufacturing/boms")
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "product_name": "Chair",
                "items": [{"material_name": "Leg", "quantity": "79228162514264337593543950335", "unit_cost": "3"}]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "total cost is too large");

        // Lines that fit individually can still overflow the total
        let response = server
            .post("/api/manufacturing/boms")
            .add_header(name, value)
            .json(&json!({
                "product_name": "Chair",
                "items": [
                    {"material_name": "Leg", "quantity": "79228162514264337593543950335", "unit_cost": "1"},
                    {"material_name": "Seat", "quantity": "1", "unit_cost": "1"}
                ]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_other_company_cannot_change_bom() {
        let (server, state) = create_test_app().await;
        let acme = create_test_company(&state, "Acme").await;
        let globex = create_test_company(&state, "Globex").await;
        let acme_cookie = auth_cookie(&state, &create_test_user(&state, Some(acme.id), Role::Admin).await);
        let globex_cookie = auth_cookie(&state, &create_test_user(&state, Some(globex.id), Role::Admin).await);

        let response = server
            .post("/api/manufacturing/boms")
            .add_header(acme_cookie.0.clone(), acme_cookie.1.clone())
            .json(&json!({
                "product_name": "Stool",
                "items": [{"material_name": "Leg", "quantity": "3", "unit_cost": "2"}]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let id = body["data"]["id"].as_str().unwrap().to_string();

        server
            .patch(&format!("/api/manufacturing/boms/{id}"))
            .add_header(globex_cookie.0.clone(), globex_cookie.1.clone())
            .json(&json!({"items": []}))
            .await
            .assert_status_not_found();
        server
            .delete(&format!("/api/manufacturing/boms/{id}"))
            .add_header(globex_cookie.0, globex_cookie.1)
            .await
            .assert_status_not_found();

        let response = server
            .get(&format!("/api/manufacturing/boms/{id}"))
            .add_header(acme_cookie.0, acme_cookie.1)
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["total_cost"], "6");
    }
}
