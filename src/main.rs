//! Face detection and recognition CLI
//!
//! Usage:
//!   facegrid detect <image>
//!   facegrid compare <image-a> <image-b>
//!   facegrid identify <gallery-dir> <image>

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use facegrid::config::Config;
use facegrid::engine::ModelContext;
use facegrid::service::FaceService;
use facegrid::storage::MemoryStore;

fn main() -> Result<()> {
    let (config, config_error) = match Config::load(Config::default_path()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(&config.inference.log_level))
        .with_target(false)
        .init();

    if let Some(e) = config_error {
        info!("Using default config ({})", e);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .max_blocking_threads(config.inference.num_threads.max(1) as usize)
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    info!("Device: {}", config.inference.device);
    let context = Arc::new(ModelContext::load(&config)?);
    let store = Arc::new(MemoryStore::new());
    let service = FaceService::new(context, store, config);

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["detect", image] => {
            let result = service.detect(open(image)?).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        ["compare", a, b] => {
            let result = service.compare(open(a)?, open(b)?).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        ["identify", gallery, image] => {
            for entry in std::fs::read_dir(gallery)? {
                let path = entry?.path();
                let Some(face_id) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let registered = service.register(face_id, open(&path)?).await?;
                if !registered.success {
                    info!("Skipping {}: {}", path.display(), registered.message);
                }
            }
            let result = service.identify(open(image)?, None, None).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => bail!("usage: facegrid detect <image> | compare <a> <b> | identify <gallery-dir> <image>"),
    }

    Ok(())
}

fn open(path: impl AsRef<Path>) -> Result<image::DynamicImage> {
    let path = path.as_ref();
    image::open(path).with_context(|| format!("Failed to decode {}", path.display()))
}
