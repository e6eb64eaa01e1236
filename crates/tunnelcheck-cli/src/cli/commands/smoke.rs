use crate::cli::args::SmokeArgs;
use crate::exit_codes::{RUN_FAILED, SUCCESS};
use tunnelcheck_core::smoke::SmokeClient;

pub async fn run(args: SmokeArgs) -> anyhow::Result<i32> {
    let client = SmokeClient::new(&args.base_url)?;
    let steps = client.run_suite(&args.email, &args.password).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
    } else {
        for step in &steps {
            let mark = if step.ok { "ok " } else { "FAIL" };
            let status = step
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("[{}] {:<18} {:>4}  {}", mark, step.name, status, step.detail);
        }
    }

    if steps.iter().all(|s| s.ok) {
        Ok(SUCCESS)
    } else {
        Ok(RUN_FAILED)
    }
}
