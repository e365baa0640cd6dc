// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Runs the phone service against a simulated radio and SIM card. Several caller
//! threads hit the owner loop at once; the log shows every radio call landing on the
//! one owner thread, and the PIN check running on its own worker thread.

use clap::{Parser, ValueEnum};
use phone_bridge::{init_tracing, AllowAll, DisplayPreference, DriverFailure,
                   DriverOutcome, NeighboringCell, NeighboringCellsReply, OwnerLoop,
                   OwnerLoopConfig, PhoneInterface, PhoneResource, Radio,
                   RunLoopCallback, SecurityElementDriver, SyncOverAsyncConfig,
                   TracingConfig};
use std::{sync::Arc, thread, time::Duration};
use tracing_core::LevelFilter;

#[derive(Debug, Parser)]
#[command(bin_name = "phone_bridge_demo")]
#[command(about = "Drive a simulated radio through the owner-thread bridge")]
#[command(version)]
#[command(next_line_help = true)]
/// More info: <https://docs.rs/clap/latest/clap/_derive/#overview>
struct CLIArg {
    #[arg(long, default_value = "1234", help = "PIN to submit to the simulated SIM")]
    pin: String,

    #[arg(
        long,
        default_value = "**04*1234*5678*5678#",
        help = "MMI dial string each caller thread submits"
    )]
    dial: String,

    #[arg(long, default_value_t = 4, help = "Number of concurrent caller threads")]
    callers: usize,

    #[arg(
        long,
        default_value_t = 250,
        help = "How long the simulated SIM takes to answer"
    )]
    driver_delay_ms: u64,

    #[arg(
        long,
        help = "Give up on owner-thread calls after this many milliseconds"
    )]
    deadline_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogLevel::Debug)]
    log_level: LogLevel,

    #[arg(long, help = "Also write the log to this file")]
    log_file: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Answers MMI codes starting with `**04*` and reports two neighbors after a short
/// scan on a separate thread.
#[derive(Debug, Default)]
struct SimulatedRadio {
    ringing: bool,
    in_call: bool,
}

impl Radio for SimulatedRadio {
    fn handle_pin_mmi(&mut self, dial_string: &str) -> bool {
        tracing::info!(dial_string, "radio: handle_pin_mmi");
        dial_string.starts_with("**04*")
    }

    fn request_neighboring_cells(&mut self, reply: NeighboringCellsReply) {
        tracing::info!("radio: scanning neighbors");
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            reply.cells(vec![
                NeighboringCell {
                    cell_id: 0x1a2b,
                    rssi: -71,
                },
                NeighboringCell {
                    cell_id: 0x3c4d,
                    rssi: -88,
                },
            ]);
        });
    }

    fn answer_ringing_call(&mut self) {
        if std::mem::replace(&mut self.ringing, false) {
            self.in_call = true;
        }
        tracing::info!(in_call = self.in_call, "radio: answer_ringing_call");
    }

    fn silence_ringer(&mut self) {
        tracing::info!(ringing = self.ringing, "radio: silence_ringer");
    }

    fn hang_up(&mut self) -> bool {
        let hung_up = std::mem::replace(&mut self.in_call, false);
        tracing::info!(hung_up, "radio: hang_up");
        hung_up
    }

    fn is_sim_pin_enabled(&self) -> bool { true }
}

#[derive(Debug)]
struct SimulatedSim {
    delay: Duration,
}

impl SecurityElementDriver for SimulatedSim {
    fn supply_pin(&self, pin: &str, callback: RunLoopCallback<DriverOutcome>) {
        let outcome = if pin == "1234" {
            Ok(())
        } else {
            Err(DriverFailure("incorrect PIN".to_string()))
        };
        let delay = self.delay;
        // Answer from an async task on the worker's own run-loop.
        let runtime = callback.runtime_handle();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback.complete(outcome);
        });
    }
}

fn main() -> miette::Result<()> {
    let cli_arg = CLIArg::parse();

    let mut tracing_config = TracingConfig::new_display(DisplayPreference::Stderr)
        .with_level_filter(cli_arg.log_level.into());
    if let Some(log_file) = &cli_arg.log_file {
        tracing_config = tracing_config.with_file(log_file);
    }
    init_tracing(tracing_config)?;
    // % is Display, ? is Debug.
    tracing::debug!(message = "Start logging...", cli_arg = ?cli_arg);

    let mut owner_loop_config = OwnerLoopConfig::default().with_thread_name("radio");
    if let Some(deadline_ms) = cli_arg.deadline_ms {
        owner_loop_config =
            owner_loop_config.with_default_deadline(Duration::from_millis(deadline_ms));
    }

    let radio = SimulatedRadio {
        ringing: true,
        in_call: false,
    };
    let owner_loop = OwnerLoop::spawn(PhoneResource::new(radio), owner_loop_config)?;
    let phone = PhoneInterface::new(
        owner_loop.dispatcher(),
        Arc::new(SimulatedSim {
            delay: Duration::from_millis(cli_arg.driver_delay_ms),
        }),
        Arc::new(AllowAll),
    )
    .with_worker_config(SyncOverAsyncConfig {
        thread_name: "sim-pin".to_string(),
    });

    let callers: Vec<_> = (0..cli_arg.callers)
        .map(|index| {
            let phone = phone.clone();
            let dial = cli_arg.dial.clone();
            thread::Builder::new()
                .name(format!("caller-{index}"))
                .spawn(move || phone.handle_pin_mmi(&dial))
                .map_err(|err| miette::miette!("failed to spawn caller thread: {err}"))
        })
        .collect::<miette::Result<_>>()?;

    for caller in callers {
        let handled = caller
            .join()
            .map_err(|_| miette::miette!("caller thread panicked"))??;
        tracing::info!(handled, "handle_pin_mmi answered");
    }

    let cells = phone.neighboring_cell_info()?;
    tracing::info!(?cells, "neighboring cells");

    phone.silence_ringer()?;
    phone.answer_ringing_call()?;
    let hung_up = phone.end_call()?;
    tracing::info!(hung_up, "end_call answered");

    let pin_accepted = phone.supply_pin(&cli_arg.pin)?;
    tracing::info!(pin_accepted, "supply_pin answered");

    owner_loop.shutdown()?;
    tracing::debug!(message = "Stop logging...");
    Ok(())
}
