//! Read-only Discord proxy routes for the dashboard.
//!
//! Every route goes through [`DiscordClient`](vaultcord_infra::DiscordClient),
//! so responses are served from the cache when fresh and upstream calls are
//! serialized by the rate limiter's queue.

use actix_web::{HttpResponse, web};
use vaultcord_shared::ApiResponse;
use vaultcord_shared::dto::{BotUserResponse, ChannelSummary, GuildSummary};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Guild ids are snowflakes: decimal digits only.
fn guild_id(path: web::Path<String>) -> AppResult<String> {
    let id = path.into_inner();
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::NotFound(format!("Guild {id} not found")));
    }
    Ok(id)
}

/// GET /api/discord/me
pub async fn bot_user(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let user = state.discord.current_user().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(BotUserResponse::from(user))))
}

/// GET /api/discord/guilds
pub async fn list_guilds(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let guilds: Vec<GuildSummary> = state
        .discord
        .current_user_guilds()
        .await?
        .into_iter()
        .map(GuildSummary::from)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(guilds)))
}

/// GET /api/discord/guilds/{guild_id}
pub async fn get_guild(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let guild = state.discord.guild(&guild_id(path)?).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(guild)))
}

/// GET /api/discord/guilds/{guild_id}/channels
pub async fn list_channels(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let mut channels = state.discord.guild_channels(&guild_id(path)?).await?;
    channels.sort_by_key(|c| c.position);

    let channels: Vec<ChannelSummary> = channels.into_iter().map(ChannelSummary::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(channels)))
}

/// GET /api/discord/guilds/{guild_id}/roles
pub async fn list_roles(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let roles = state.discord.guild_roles(&guild_id(path)?).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(roles)))
}

/// Force the next read of this guild to hit Discord.
///
/// DELETE /api/discord/guilds/{guild_id}/cache
pub async fn invalidate_guild(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.discord.invalidate_guild(&guild_id(path)?).await;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::empty()))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test, web};
    use serde_json::json;
    use vaultcord_core::ports::ResponseCache;

    use crate::handlers::{configure_routes, test_support};

    #[actix_web::test]
    async fn test_missing_token_is_service_unavailable() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::state()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/discord/guilds").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 503);
        assert_eq!(body["title"], "Service Unavailable");
    }

    #[actix_web::test]
    async fn test_cached_guilds_are_served_without_token() {
        let state = test_support::state();
        state
            .cache
            .set(
                "discord:users/@me/guilds",
                json!([
                    {"id": "10", "name": "Vault", "icon": null, "owner": true, "permissions": "8"},
                    {"id": "11", "name": "Other", "icon": null, "owner": false, "permissions": "0"}
                ]),
                None,
            )
            .await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/discord/guilds").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["id"], "10");
        assert_eq!(body["data"][0]["can_manage"], true);
        assert_eq!(body["data"][1]["can_manage"], false);
    }

    #[actix_web::test]
    async fn test_invalidate_guild_drops_cached_channels() {
        let state = test_support::state();
        state
            .cache
            .set("discord:guilds/10/channels", json!([]), None)
            .await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/api/discord/guilds/10/cache")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!state.cache.has("discord:guilds/10/channels").await);
    }

    #[actix_web::test]
    async fn test_non_numeric_guild_id_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::state()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/discord/guilds/abc/roles")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
