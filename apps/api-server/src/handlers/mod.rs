//! HTTP handlers and route configuration.

mod cache;
mod discord;
mod health;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .route("/cache/status", web::get().to(cache::cache_status))
            .service(
                web::scope("/discord")
                    .route("/me", web::get().to(discord::bot_user))
                    .route("/guilds", web::get().to(discord::list_guilds))
                    .route("/guilds/{guild_id}", web::get().to(discord::get_guild))
                    .route(
                        "/guilds/{guild_id}/channels",
                        web::get().to(discord::list_channels),
                    )
                    .route("/guilds/{guild_id}/roles", web::get().to(discord::list_roles))
                    .route(
                        "/guilds/{guild_id}/cache",
                        web::delete().to(discord::invalidate_guild),
                    ),
            ),
    );
}
