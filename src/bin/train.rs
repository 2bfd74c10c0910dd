use anyhow::Result;
use crop_recommender::training::{self, TrainConfig};

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crop_recommender=warn")),
		)
		.init();

	training::train(&TrainConfig::default())?;

	Ok(())
}
