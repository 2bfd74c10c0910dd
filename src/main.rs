use anyhow::Result;
use tracing::info;

use crop_recommender::api;
use crop_recommender::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crop_recommender=info,warp=info")),
		)
		.init();

	let config = ServerConfig::from_env()?;
	let model = api::load_model(&config.model_path);

	info!(addr = %config.addr(), model_loaded = model.is_some(), "starting crop recommendation service");
	warp::serve(api::routes(model)).run(config.addr()).await;

	Ok(())
}
