//! Database repository for users.

use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    PgStore,
    errors::Result,
    handlers::{fetch_page, repository::UserRepository},
    models::{
        ilike_pattern,
        users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest, normalize_email},
    },
};
use crate::api::models::pagination::Pagination;
use crate::types::{CompanyId, UserId, abbrev_uuid};

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &UserFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(role) = filter.role {
        query.push(" AND role = ").push_bind(role);
    }
    if let Some(search) = &filter.search {
        let pattern = ilike_pattern(search);
        query
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Insert a user on any executor, so company registration can reuse it inside its transaction.
pub(crate) async fn insert_user<'e, E>(executor: E, request: &UserCreateDBRequest) -> Result<UserDBResponse>
where
    E: sqlx::PgExecutor<'e>,
{
    let user = sqlx::query_as::<_, UserDBResponse>(
        r#"
        INSERT INTO users (id, company_id, email, name, role, password_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.company_id)
    .bind(normalize_email(&request.email))
    .bind(&request.name)
    .bind(request.role)
    .bind(&request.password_hash)
    .fetch_one(executor)
    .await?;
    Ok(user)
}

#[async_trait::async_trait]
impl UserRepository for PgStore {
    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        insert_user(self.pool(), request).await
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    #[instrument(skip(self, email), err)]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id), limit = filter.limit, skip = filter.skip), err)]
    async fn list_users(&self, company_id: CompanyId, filter: &UserFilter) -> Result<(Vec<UserDBResponse>, i64)> {
        let pagination = Pagination {
            skip: Some(filter.skip),
            limit: Some(filter.limit),
        };
        fetch_page(self.pool(), "users", &pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update_user(
        &self,
        company_id: CompanyId,
        id: UserId,
        request: &UserUpdateDBRequest,
    ) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                name = COALESCE($3, name),
                role = COALESCE($4, role),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(&request.name)
        .bind(request.role)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete_user(&self, company_id: CompanyId, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn record_login(&self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    #[instrument(skip(self, password_hash), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::errors::DbError;
    use crate::test_utils::seed_company;
    use sqlx::PgPool;

    fn user(company_id: CompanyId, email: &str, name: &str, role: Role) -> UserCreateDBRequest {
        UserCreateDBRequest {
            company_id: Some(company_id),
            email: email.to_string(),
            name: name.to_string(),
            role,
            password_hash: Some("$argon2id$placeholder".to_string()),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_emails_are_stored_folded_and_unique(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        let (globex, _) = seed_company(&store, "Globex").await;

        let created = store
            .create_user(&user(acme.id, "  Ayaan@Acme.Test ", "Ayaan", Role::Staff))
            .await
            .unwrap();
        assert_eq!(created.email, "ayaan@acme.test");

        let found = store.get_user_by_email("AYAAN@acme.test").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        // Emails are unique across companies, not just within one
        let err = store
            .create_user(&user(globex.id, "ayaan@ACME.test", "Imposter", Role::Admin))
            .await
            .unwrap_err();
        match err {
            DbError::UniqueViolation { constraint, .. } => assert_eq!(constraint.as_deref(), Some("users_email_key")),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_delete_are_company_scoped(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        let (globex, _) = seed_company(&store, "Globex").await;
        let created = store
            .create_user(&user(acme.id, "hodan@acme.test", "Hodan", Role::Staff))
            .await
            .unwrap();

        let promote = UserUpdateDBRequest {
            role: Some(Role::Manager),
            ..Default::default()
        };
        assert!(store.update_user(globex.id, created.id, &promote).await.unwrap().is_none());
        assert!(!store.delete_user(globex.id, created.id).await.unwrap());

        let updated = store.update_user(acme.id, created.id, &promote).await.unwrap().unwrap();
        assert_eq!(updated.role, Role::Manager);
        assert_eq!(updated.name, "Hodan");
        assert_eq!(updated.password_hash, created.password_hash);

        assert!(store.delete_user(acme.id, created.id).await.unwrap());
        assert!(store.get_user(created.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_and_password_bookkeeping(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, admin) = seed_company(&store, "Acme").await;
        assert!(admin.last_login_at.is_none());

        store.record_login(admin.id).await.unwrap();
        let reloaded = store.get_user(admin.id).await.unwrap().unwrap();
        assert!(reloaded.last_login_at.is_some());
        assert_eq!(reloaded.company_id, Some(acme.id));

        assert!(store.set_password_hash(admin.id, "$argon2id$rotated").await.unwrap());
        let reloaded = store.get_user(admin.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash.as_deref(), Some("$argon2id$rotated"));

        assert!(!store.set_password_hash(Uuid::new_v4(), "$argon2id$nobody").await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_users_filters_and_pages(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        let (globex, _) = seed_company(&store, "Globex").await;
        for (email, name) in [("a@acme.test", "Amina"), ("b@acme.test", "Bashir"), ("c@acme.test", "Cawo")] {
            store.create_user(&user(acme.id, email, name, Role::Staff)).await.unwrap();
        }
        store
            .create_user(&user(globex.id, "d@globex.test", "Deeqa", Role::Staff))
            .await
            .unwrap();

        let staff = UserFilter {
            skip: 0,
            limit: 2,
            role: Some(Role::Staff),
            search: None,
        };
        let (items, total) = store.list_users(acme.id, &staff).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Cawo");

        let search = UserFilter {
            skip: 0,
            limit: 10,
            role: None,
            search: Some("BASH".to_string()),
        };
        let (items, total) = store.list_users(acme.id, &search).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].email, "b@acme.test");

        // The seeded administrator plus three staff
        let all = UserFilter {
            skip: 0,
            limit: 10,
            ..Default::default()
        };
        let (_, total) = store.list_users(acme.id, &all).await.unwrap();
        assert_eq!(total, 4);
    }
}
