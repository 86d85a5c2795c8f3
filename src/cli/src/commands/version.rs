//! `a3s-ferry version` command.

use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub async fn execute(_args: VersionArgs) -> Result<bool, Box<dyn std::error::Error>> {
    println!("a3s-ferry version {}", a3s_ferry_core::VERSION);
    Ok(true)
}
