//! Accident severity - Main Entry Point

use accident_severity::cli::{
    cmd_batch_predict, cmd_evaluate, cmd_info, cmd_interactive, cmd_predict, cmd_run,
    cmd_train, cmd_transform, Cli, Commands,
};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accident_severity=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = &cli.settings;

    match cli.command {
        Some(Commands::Run) => cmd_run(settings)?,
        Some(Commands::Transform) => cmd_transform(settings)?,
        Some(Commands::Train) => cmd_train(settings)?,
        Some(Commands::Evaluate) => cmd_evaluate(settings)?,
        Some(Commands::Predict { fields }) => cmd_predict(settings, &fields)?,
        Some(Commands::BatchPredict { input, output }) => {
            cmd_batch_predict(settings, &input, &output)?
        }
        Some(Commands::Info { file }) => cmd_info(settings, file.as_deref())?,
        None => cmd_interactive(settings)?,
    }

    Ok(())
}
