//! `clawvisor status`: one-shot manual status check.

use anyhow::Result;
use clawvisor_runtime::{CliStatusProbe, HttpProbe};
use serde::Serialize;

use crate::bootstrap::CliContext;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct StatusView<'a> {
    gateway_url: &'a str,
    gateway_alive: bool,
    node: clawvisor_core::ConnectionState,
    exit_code: Option<i32>,
    output: String,
}

pub async fn execute(ctx: &CliContext, json: bool) -> Result<()> {
    let config = &ctx.config;

    let gateway_alive = HttpProbe::new(config.probe_timeout)
        .probe(&config.probe_url)
        .await;

    let probe = CliStatusProbe::new(
        config.status_command.clone(),
        config.status_timeout,
        config.working_dir.clone(),
    );
    let report = probe.report().await.map_err(CliError::from)?;

    let output = if report.stdout.is_empty() {
        report.stderr.clone()
    } else {
        report.stdout.clone()
    };

    if json {
        let view = StatusView {
            gateway_url: &config.probe_url,
            gateway_alive,
            node: report.state,
            exit_code: report.exit_code,
            output,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!(
        "Gateway ({}): {}",
        config.probe_url,
        if gateway_alive { "up" } else { "down" }
    );
    println!("Node: {}", report.state);
    println!("$ {}", probe.command());
    if output.is_empty() {
        println!("(no output)");
    } else {
        println!("{output}");
    }
    Ok(())
}
