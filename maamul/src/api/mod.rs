//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures
//! - **[`response`]**: The `{ success, message, data }` envelope
//!
//! # API Structure
//!
//! - **Authentication** (`/api/auth/*`): Registration, login, logout, password change, 2FA hooks
//! - **Company** (`/api/company`) and **Users** (`/api/users/*`)
//! - **Accounting** (`/api/accounting/*`): Accounts and transactions
//! - **Manufacturing** (`/api/manufacturing/*`): Bills of materials and material purchases
//! - **Shop** (`/api/shop/vendors/*`), **Projects** (`/api/projects/*`),
//!   **Telegram** (`/api/telegram/links/*`)
//! - **Audit** (`/api/audit-logs`) and **Reports** (`/api/reports/*`)
//! - **Site** (`/robots.txt`, `/healthz`)

pub mod handlers;
pub mod models;
pub mod response;
