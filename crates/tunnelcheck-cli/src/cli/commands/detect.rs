use crate::cli::args::DetectArgs;
use crate::exit_codes::SUCCESS;
use tunnelcheck_core::detect::detect_tunnel;

pub async fn run(args: DetectArgs) -> anyhow::Result<i32> {
    let detection = detect_tunnel().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
        return Ok(SUCCESS);
    }

    if detection.active {
        println!(
            "tunnel active: {} (via {})",
            detection.interface.as_deref().unwrap_or("?"),
            detection.method.as_deref().unwrap_or("?"),
        );
        if let Some(addr) = &detection.address {
            println!("address: {}", addr);
        }
    } else {
        println!("no tunnel detected");
    }
    Ok(SUCCESS)
}
