use tracing::info;
use tracing_subscriber::EnvFilter;
use wt_optimizer::{OutputFormat, SweepConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SweepConfig::from_env()?;
    let sweep = config.build()?;
    let plan = sweep.plan()?;

    println!("{}", plan.banner());
    info!(
        "Sweeping {} dimensions: {}",
        config.dimensions.len(),
        config.names().join(", ")
    );

    let outcome = sweep.run()?;

    match config.output {
        OutputFormat::Text => {
            println!();
            print!("{}", outcome.report.render());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    Ok(())
}
