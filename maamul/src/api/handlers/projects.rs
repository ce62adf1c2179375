//! Projects: `/api/projects`.

use rust_decimal::Decimal;

use crate::{
    api::handlers::tenant::{TenantResource, bad_request, require_text},
    db::models::projects::{Project, ProjectCreate, ProjectUpdate, dates_ordered},
    errors::Result,
};

fn validate_budget(budget: Option<Decimal>) -> Result<()> {
    if budget.is_some_and(|budget| budget < Decimal::ZERO) {
        return Err(bad_request("budget must not be negative"));
    }
    Ok(())
}

impl TenantResource for Project {
    const BASE_PATH: &'static str = "/api/projects";

    fn validate_create(request: &ProjectCreate) -> Result<()> {
        require_text(&request.name, "name")?;
        validate_budget(request.budget)?;
        if !dates_ordered(request.start_date, request.end_date) {
            return Err(bad_request("end_date must not be before start_date"));
        }
        Ok(())
    }

    // Only dates sent together can be compared here; the store checks the merged row
    fn validate_update(request: &ProjectUpdate) -> Result<()> {
        if let Some(name) = &request.name {
            require_text(name, "name")?;
        }
        validate_budget(request.budget)?;
        if !dates_ordered(request.start_date, request.end_date) {
            return Err(bad_request("end_date must not be before start_date"));
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
    async fn test_project_lifecycle() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let manager = create_test_user(&state, Some(company.id), Role::Manager).await;
        let (name, value) = auth_cookie(&state, &manager);

        let response = server
            .post("/api/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Warehouse fit-out", "budget": "5000", "start_date": "2025-01-01"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["status"], "PLANNED");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let response = server
            .patch(&format!("/api/projects/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": "ON_HOLD"}))
            .await;
        response.assert_status_ok();

        let response = server
            .get("/api/projects?status=ON_HOLD")
            .add_header(name.clone(), value.clone())
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["total_count"], 1);

        // An end date before the stored start date is rejected by the store
        let response = server
            .patch(&format!("/api/projects/{id}"))
            .add_header(name, value)
            .json(&json!({"end_date": "2024-12-31"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_project_validation() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin = create_test_user(&state, Some(company.id), Role::Admin).await;
        let (name, value) = auth_cookie(&state, &admin);

        let response = server
            .post("/api/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Roof", "start_date": "2025-06-01", "end_date": "2025-05-01"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "end_date must not be before start_date");

        let response = server
            .post("/api/projects")
            .add_header(name, value)
            .json(&json!({"name": "Roof", "budget": "-1"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_project_with_transactions_cannot_be_deleted() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin = create_test_user(&state, Some(company.id), Role::Admin).await;
        let (name, value) = auth_cookie(&state, &admin);

        let response = server
            .post("/api/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Roof"}))
            .await;
        let body: Value = response.json();
        let project_id = body["data"]["id"].as_str().unwrap().to_string();

        let response = server
            .post("/api/accounting/accounts")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Main", "account_type": "CASH"}))
            .await;
        let body: Value = response.json();
        let account_id = body["data"]["id"].as_str().unwrap().to_string();

        server
            .post("/api/accounting/transactions")
            .add_header(name.clone(), value.clone())
            .json(&json!({"account_id": account_id, "project_id": project_id, "kind": "EXPENSE", "amount": "40"}))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .delete(&format!("/api/projects/{project_id}"))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_end_date_is_checked_against_stored_start_date() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let manager = create_test_user(&state, Some(company.id), Role::Manager).await;
        let (name, value) = auth_cookie(&state, &manager);

        let response = server
            .post("/api/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Roof", "start_date": "2025-06-01"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let response = server
            .patch(&format!("/api/projects/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"end_date": "2025-05-01"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "end_date must not be before start_date");

        let response = server
            .get(&format!("/api/projects/{id}"))
            .add_header(name, value)
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["end_date"], Value::Null);
    }

    #[test_log::test(tokio::test)]
    async fn test_only_admins_delete_projects() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let admin_cookie = auth_cookie(&state, &create_test_user(&state, Some(company.id), Role::Admin).await);
        let manager_cookie = auth_cookie(&state, &create_test_user(&state, Some(company.id), Role::Manager).await);
        let staff_cookie = auth_cookie(&state, &create_test_user(&state, Some(company.id), Role::Staff).await);

        // Staff cannot create projects
        server
            .post("/api/projects")
            .add_header(staff_cookie.0, staff_cookie.1)
            .json(&json!({"name": "Roof"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .post("/api/projects")
            .add_header(manager_cookie.0.clone(), manager_cookie.1.clone())
            .json(&json!({"name": "Roof"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let id = body["data"]["id"].as_str().unwrap().to_string();

        server
            .delete(&format!("/api/projects/{id}"))
            .add_header(manager_cookie.0, manager_cookie.1)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format!("/api/projects/{id}"))
            .add_header(admin_cookie.0, admin_cookie.1)
            .await
            .assert_status_ok();
    }
}
