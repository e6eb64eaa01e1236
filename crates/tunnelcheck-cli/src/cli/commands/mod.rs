pub mod detect;
pub mod init;
pub mod run;
pub mod smoke;

use super::args::{Cli, Command};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Detect(args) => detect::run(args).await,
        Command::Smoke(args) => smoke::run(args).await,
        Command::Init(args) => init::run(args),
    }
}
