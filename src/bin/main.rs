use std::sync::Arc;

use anyhow::Result;
use fpma::cli::{parse_params, Cli, Commands};
use fpma::{
    AnalysisEngine, AnalysisRequest, AppConfig, DataSourceConfig, DefaultRenderer, IngestionPipeline,
    OutputFormat, Renderer, ResultCache, SqliteStore, Store,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config = if let Some(path) = &cli.config {
        AppConfig::from_file(path)?
    } else {
        AppConfig::from_env().unwrap_or_default()
    };

    let tracing_config = fpma::TracingConfig::from_env();
    fpma::init_tracing(&tracing_config).ok();

    info!("fpma v{}", fpma::VERSION);

    let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&config.database.url).await?);
    let pipeline = IngestionPipeline::new(store.clone()).with_batch_size(config.ingest_batch_size);
    let cache = Arc::new(ResultCache::with_default_ttl(config.cache_ttl()));
    let engine = AnalysisEngine::new(store.clone(), None, cache);

    match cli.command {
        Commands::RegisterSource { file } => {
            let contents = tokio::fs::read_to_string(&file).await?;
            let source: DataSourceConfig = serde_json::from_str(&contents)?;
            let id = pipeline.register_data_source(source).await?;
            println!("{}", id);
        }
        Commands::Ingest { source_id, params } => {
            let query_params = parse_params(&params);
            let job = pipeline
                .ingest(source_id, (!query_params.is_empty()).then_some(query_params))
                .await?;
            println!("{}", job.summary());
        }
        Commands::Preview {
            source_id,
            params,
            limit,
        } => {
            let query_params = parse_params(&params);
            let records = pipeline
                .preview(
                    source_id,
                    (!query_params.is_empty()).then_some(query_params),
                    limit,
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Schedule { source_id, expr } => {
            let job_id = pipeline
                .schedule(source_id, expr, std::collections::HashMap::new())
                .await?;
            println!("{}", job_id);
        }
        Commands::Analyze { file, output } => {
            let contents = tokio::fs::read_to_string(&file).await?;
            let request: AnalysisRequest = serde_json::from_str(&contents)?;
            let result = engine.analyze(request).await?;
            let format = match output.as_str() {
                "csv" => OutputFormat::Csv,
                "text" => OutputFormat::Text,
                _ => OutputFormat::Json,
            };
            let rendered = DefaultRenderer.render(&result, format)?;
            println!("{}", rendered);
        }
        Commands::JobStatus { job_id } => {
            let job = pipeline.get_job(job_id).await?;
            println!("{}", job.summary());
        }
    }

    Ok(())
}
