use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Anti-Matter API",
        version = "1.0.0",
        description = "Store backend for Anti-Matter: app submission with a free upload quota, a review period before downloads open, and subscription checks.\n\n## Identity\n\nThere are no accounts. Clients send a stable `deviceId`, which keys both the upload quota and app ownership.\n\n## Errors\n\nFailures use `{ \"error\": { \"code\", \"id\"?, \"message\" } }`. Clients branch on `SUBSCRIPTION_REQUIRED` (402) to show the paywall."
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "apps", description = "App submission, listing and download checks"),
        (name = "developer", description = "Upload quota and subscription verification"),
        (name = "push", description = "Push notification registration"),
        (name = "webhooks", description = "Payment provider webhooks")
    ),
    paths(
        // Health routes
        crate::routes::health::health,
        // App routes
        crate::routes::apps::submit_app,
        crate::routes::apps::list_apps,
        crate::routes::apps::get_app,
        crate::routes::apps::delete_app,
        crate::routes::apps::download_app,
        // Developer routes
        crate::routes::developer::usage,
        crate::routes::developer::verify_subscription,
        // Push routes
        crate::routes::push::register,
        // Webhook routes
        crate::routes::webhook::stripe_webhook,
    )
)]
pub struct ApiDoc;
