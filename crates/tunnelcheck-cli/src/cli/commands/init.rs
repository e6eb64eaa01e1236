use crate::cli::args::InitArgs;
use crate::exit_codes::{CONFIG_ERROR, SUCCESS};
use tunnelcheck_core::config::write_sample_config;

pub fn run(args: InitArgs) -> anyhow::Result<i32> {
    if args.path.exists() && !args.force {
        eprintln!(
            "{} already exists (use --force to overwrite)",
            args.path.display()
        );
        return Ok(CONFIG_ERROR);
    }
    write_sample_config(&args.path)?;
    println!("wrote {}", args.path.display());
    Ok(SUCCESS)
}
