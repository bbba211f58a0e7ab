use async_trait::async_trait;
use bytes::Bytes;
use image_loader_shared::{
    parse_flag, respond, AppState, ImageLoaderError, ImageReference, LoaderConfig, LoaderOptions,
    ResponderOptions, ResponseSink,
};
use lambda_http::{
    http::{header::HeaderName, Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;

/// Main Lambda handler - maps the URL onto an image in the configured bucket
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    tracing::info!(method = %method, path = %path, "image request received");

    if method != Method::GET {
        return json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    let Some((loader, image_path)) = route(path, &state.config) else {
        return json_error(StatusCode::NOT_FOUND, "Not found");
    };

    let image_path = urlencoding::decode(image_path)
        .map_err(|e| format!("Invalid path encoding: {}", e))?
        .into_owned();

    let sharpen = event
        .query_string_parameters()
        .first("sharpen")
        .and_then(parse_flag)
        .unwrap_or(false);

    let options = ResponderOptions::new(loader.with_sharpen(sharpen))
        .with_transparent_fallback(state.config.use_transparent_fallback)
        .with_on_error(log_error_chain);
    let image = ImageReference::new(state.config.bucket.clone(), image_path);

    let mut sink = BufferedResponse::default();
    respond(&mut sink, &state.s3_client, &image, &options).await;
    sink.into_response()
}

/// `/thumbnail/{path}` and `/full/{path}` select the preset
fn route<'a>(path: &'a str, config: &LoaderConfig) -> Option<(LoaderOptions, &'a str)> {
    if let Some(rest) = path.strip_prefix("/thumbnail/") {
        return Some((config.thumbnail_options(), rest));
    }
    if let Some(rest) = path.strip_prefix("/full/") {
        return Some((config.full_options(), rest));
    }
    None
}

fn log_error_chain(err: &ImageLoaderError) {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        tracing::warn!(cause = %cause, "caused by");
        source = cause.source();
    }
}

fn json_error(status: StatusCode, message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({ "error": message }).to_string().into())
        .map_err(Box::new)?)
}

/// Collects the streamed response into a single Lambda response
#[derive(Debug, Default)]
struct BufferedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, String)>,
    body: Vec<u8>,
    complete: bool,
    aborted: bool,
}

impl BufferedResponse {
    fn into_response(self) -> Result<Response<Body>, Error> {
        if self.aborted || !self.complete {
            return Err("image response was aborted before completion".into());
        }

        let mut builder = Response::builder()
            .status(self.status)
            .header("Access-Control-Allow-Origin", "*");
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        Ok(builder.body(Body::Binary(self.body)).map_err(Box::new)?)
    }
}

#[async_trait]
impl ResponseSink for BufferedResponse {
    async fn write_head(
        &mut self,
        status: StatusCode,
        headers: Vec<(HeaderName, String)>,
    ) -> std::io::Result<()> {
        self.status = status;
        self.headers = headers;
        self.body.clear();
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()> {
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn end(&mut self) -> std::io::Result<()> {
        self.complete = true;
        Ok(())
    }

    async fn abort(&mut self) {
        self.aborted = true;
    }
}
