//! Telegram chat links: `/api/telegram/links`.
//!
//! A link maps one Telegram chat to one user of the company. Chat ids are unique across all
//! companies. Only administrators manage links.

use crate::{
    api::{handlers::tenant::TenantResource, models::users::Role},
    auth::permissions::ADMINS,
    db::models::telegram::TelegramUserLink,
};

impl TenantResource for TelegramUserLink {
    const BASE_PATH: &'static str = "/api/telegram/links";

    const CREATE_ROLES: &'static [Role] = ADMINS;
    const UPDATE_ROLES: &'static [Role] = ADMINS;
    const DELETE_ROLES: &'static [Role] = ADMINS;
}
