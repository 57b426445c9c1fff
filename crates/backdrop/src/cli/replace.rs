//! The `backdrop replace` command: one replacement without a server.

use anyhow::Context;
use backdrop_core::{
    map_outcome, Backdrop, CallOutcome, Config, ImagePayload, ReplaceBackgroundRequest,
};
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the `replace` command.
#[derive(Args, Debug)]
pub struct ReplaceArgs {
    /// Car photograph to edit (file path or http(s) URL)
    #[arg(long)]
    pub car: String,

    /// Reference image for the new background (file path or http(s) URL)
    #[arg(long)]
    pub background: Option<String>,

    /// Description of the desired background
    #[arg(long)]
    pub prompt: String,

    /// Where to write the generated image [default: <car>-backdrop.<ext>]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the replace command.
pub async fn execute(args: ReplaceArgs, config: Config) -> anyhow::Result<()> {
    let car = load_image(&args.car).await?;
    let background = match &args.background {
        Some(source) => Some(load_image(source).await?),
        None => None,
    };

    let backdrop = Backdrop::new(config)?;
    let request = ReplaceBackgroundRequest {
        car_image_b64: Some(car.to_base64()),
        background_image_b64: background.map(|image| image.to_base64()),
        prompt: Some(args.prompt),
    };

    let outcome = backdrop.replacer().run(request).await;
    if let CallOutcome::Success { image, .. } = &outcome {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&args.car, image));
        std::fs::write(&output, image)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        tracing::info!("Wrote {} bytes to {}", image.len(), output.display());
    }

    let response = map_outcome(&outcome);
    let mut json = serde_json::to_value(&response.body)?;
    elide_image(&mut json);
    println!("{}", serde_json::to_string_pretty(&json)?);

    if !response.is_success() {
        anyhow::bail!(
            "Background replacement failed with HTTP {} ({})",
            response.status,
            json["code"].as_str().unwrap_or("UNKNOWN")
        );
    }
    Ok(())
}

fn read_image_file(path: &Path) -> anyhow::Result<ImagePayload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImagePayload::from_bytes(bytes))
}

/// Load an image from disk or, for http(s) sources, over the network.
async fn load_image(source: &str) -> anyhow::Result<ImagePayload> {
    if !is_url(source) {
        return read_image_file(Path::new(source));
    }

    tracing::debug!("Fetching image from {source}");
    let response = reqwest::get(source)
        .await
        .with_context(|| format!("Failed to fetch {source}"))?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Failed to fetch {source}: HTTP {status}");
    }
    let bytes = response.bytes().await?;
    Ok(ImagePayload::from_bytes(bytes.to_vec()))
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// `<dir>/<car stem>-backdrop.<ext>`, with the extension taken from the image bytes.
///
/// A car fetched by URL is named after its last path segment and written to
/// the working directory.
fn default_output_path(car: &str, image: &[u8]) -> PathBuf {
    let car = if is_url(car) {
        let path = car.split(['?', '#']).next().unwrap_or(car);
        PathBuf::from(path.rsplit('/').next().unwrap_or_default())
    } else {
        PathBuf::from(car)
    };
    let stem = car
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    let ext = match ImagePayload::from_bytes(image.to_vec()).media_type.as_str() {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    };
    car.with_file_name(format!("{stem}-backdrop.{ext}"))
}

/// Replace the base64 image with a short placeholder for terminal output.
fn elide_image(json: &mut serde_json::Value) {
    if let Some(image) = json.get_mut("image") {
        let len = image.as_str().map(str::len).unwrap_or(0);
        *image = serde_json::Value::String(format!("<{len} base64 chars elided>"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/bg.jpg"));
        assert!(is_url("http://localhost:8080/bg.png"));
        assert!(!is_url("./backgrounds/beach.jpg"));
        assert!(!is_url("ftp://example.com/bg.jpg"));
    }

    #[test]
    fn test_default_output_path_follows_format() {
        let car = "/photos/red-coupe.jpg";
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A];
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];

        assert_eq!(
            default_output_path(car, &png),
            PathBuf::from("/photos/red-coupe-backdrop.png")
        );
        assert_eq!(
            default_output_path(car, &jpeg),
            PathBuf::from("/photos/red-coupe-backdrop.jpg")
        );
    }

    #[test]
    fn test_default_output_path_for_url_car() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A];

        assert_eq!(
            default_output_path("https://cdn.example.com/stock/suv.jpg?w=1024", &png),
            PathBuf::from("suv-backdrop.png")
        );
        assert_eq!(
            default_output_path("https://cdn.example.com/", &png),
            PathBuf::from("image-backdrop.png")
        );
    }

    #[test]
    fn test_elide_image() {
        let mut success = json!({
            "image": "iVBORw0KGgo=",
            "metadata": {"processingTime": 12, "timestamp": "2024-01-01T00:00:00.000Z"}
        });
        elide_image(&mut success);
        assert_eq!(success["image"], "<12 base64 chars elided>");
        assert_eq!(success["metadata"]["processingTime"], 12);

        let mut failure = json!({"error": "nope", "code": "AUTH_ERROR", "processingTime": 3});
        elide_image(&mut failure);
        assert!(failure.get("image").is_none());
    }

    #[tokio::test]
    async fn test_load_image_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xDB, 0x00]).unwrap();

        let payload = load_image(path.to_str().unwrap()).await.unwrap();
        assert_eq!(payload.media_type, "image/jpeg");
        assert_eq!(payload.bytes.len(), 5);
    }

    #[tokio::test]
    async fn test_load_image_missing_file() {
        let err = load_image("/definitely/not/here.png").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn test_load_image_over_http() {
        use axum::{routing::get, Router};

        let app = Router::new().route(
            "/car.jpg",
            get(|| async { vec![0xFFu8, 0xD8, 0xFF, 0xE0, 0x01, 0x02] }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let payload = load_image(&format!("http://{addr}/car.jpg")).await.unwrap();
        assert_eq!(payload.media_type, "image/jpeg");
        assert_eq!(payload.bytes.len(), 6);

        let err = load_image(&format!("http://{addr}/missing.jpg"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
