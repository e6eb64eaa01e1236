use crate::cli::args::RunArgs;
use crate::exit_codes::{CONFIG_ERROR, SUCCESS};
use crate::output;
use tracing::info;
use tunnelcheck_core::config::{load_config, EngineConfig};
use tunnelcheck_core::runner::{RunOptions, Runner};

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let config = if args.config.exists() {
        info!(config = %args.config.display(), "loading configuration");
        match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", e);
                return Ok(CONFIG_ERROR);
            }
        }
    } else {
        EngineConfig::default()
    };

    let runner = match Runner::new(config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(CONFIG_ERROR);
        }
    };

    let opts = RunOptions {
        skip_baseline: args.skip_baseline,
        stability_duration: args.stability_duration,
        output_dir: Some(args.output_dir.clone()),
    };
    let report = runner.run(&opts).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output::format_report(&report));
    }

    // The verdict is data; a completed run exits 0 either way.
    Ok(SUCCESS)
}
