use aws_sdk_s3::Client as S3Client;
use image_loader_shared::{AppState, LoaderConfig};
use lambda_http::{run, service_fn, tracing, Error, Request};
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = LoaderConfig::from_env()?;
    tracing::info!(
        bucket = %config.bucket,
        fallback = config.use_transparent_fallback,
        cache_time = config.standard_cache_time,
        "image loader configured"
    );

    // Initialize AWS clients once at startup
    let aws_config = aws_config::load_from_env().await;
    let state = AppState::new(S3Client::new(&aws_config), config);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
