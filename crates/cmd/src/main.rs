// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fs, path::PathBuf, time::Duration};

use addrpool_app::AppConfig;
use addrpool_common_runtime::{GlobalRuntimeOptions, init_global_runtimes};
use addrpool_common_storage_kv::StoreConfig;
use addrpool_common_telemetry::LogFormat;
use clap::{Args, Parser, Subcommand};
use snafu::{ResultExt, Whatever};

#[derive(Debug, Parser)]
#[command(name = "addrpool", about = "Address pool service", author, version)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Server(ServerArgs),
    Inspect(InspectArgs),
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Starts the address pool server.
Examples:

addrpool server
addrpool server --config addrpool.json --bind 0.0.0.0:3000

")]
struct ServerArgs {
    /// JSON config file. Flags and environment variables override it.
    #[arg(long, env = "ADDRPOOL_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "ADDRPOOL_BIND")]
    bind: Option<String>,

    /// Path of the durable store file.
    #[arg(long, env = "ADDRPOOL_DATA")]
    data: Option<PathBuf>,

    /// Generation pauses at this pool size. 0 disables throttling.
    #[arg(long, env = "ADDRPOOL_SOFT_LIMIT")]
    soft_limit: Option<usize>,

    #[arg(long, env = "ADDRPOOL_WORKERS")]
    workers: Option<usize>,

    /// Lowercase hex suffix for generated addresses.
    #[arg(long, env = "ADDRPOOL_SUFFIX")]
    suffix: Option<String>,

    #[arg(long, env = "ADDRPOOL_CHECKPOINT_INTERVAL", value_parser = parse_duration)]
    checkpoint_interval: Option<Duration>,

    #[arg(long, env = "ADDRPOOL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for rotated log files. Stdout only when unset.
    #[arg(long, env = "ADDRPOOL_LOG_DIR")]
    log_dir: Option<String>,

    #[arg(long, env = "ADDRPOOL_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    #[arg(long, env = "ADDRPOOL_BACKGROUND_THREADS")]
    background_threads: Option<usize>,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unknown log format '{other}', expected text or json")),
    }
}

impl ServerArgs {
    fn load_config(&self) -> Result<AppConfig, Whatever> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_whatever_context(|_| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_whatever_context(|_| format!("Invalid config {}", path.display()))?
            }
            None => AppConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.http.bind_address.clone_from(bind);
        }
        if let Some(data) = &self.data {
            config.store.path.clone_from(data);
        }
        if let Some(soft_limit) = self.soft_limit {
            config.pool.soft_limit = soft_limit;
        }
        if let Some(workers) = self.workers {
            config.generation.workers = workers;
        }
        if let Some(suffix) = &self.suffix {
            config.generation.suffix.clone_from(suffix);
        }
        if let Some(interval) = self.checkpoint_interval {
            config.pool.checkpoint_interval = interval;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = Some(level.clone());
        }
        if let Some(dir) = &self.log_dir {
            config.logging.dir.clone_from(dir);
        }
        if let Some(format) = self.log_format {
            config.logging.log_format = format;
        }
        Ok(config)
    }

    async fn run(&self) -> Result<(), Whatever> {
        let app = self.load_config()?.open();
        let _guards = app.init_logging();
        app.run().await
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Reports what a server start would restore from the store, as JSON, without
serving or modifying anything.
Examples:

addrpool inspect --data ./data/addrpool.redb

")]
struct InspectArgs {
    #[arg(long, env = "ADDRPOOL_DATA")]
    data: Option<PathBuf>,
}

impl InspectArgs {
    fn run(&self) -> Result<(), Whatever> {
        let mut config = StoreConfig::default();
        if let Some(data) = &self.data {
            config.path.clone_from(data);
        }
        let report = addrpool_app::inspect(&config)?;
        let rendered =
            serde_json::to_string_pretty(&report).whatever_context("Failed to render report")?;
        println!("{rendered}");
        Ok(())
    }
}

fn main() -> Result<(), Whatever> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    match cli.commands {
        Commands::Server(args) => {
            let mut runtime_options = GlobalRuntimeOptions::default();
            if let Some(threads) = args.background_threads {
                runtime_options.background_threads = threads;
            }
            init_global_runtimes(&runtime_options)
                .whatever_context("Failed to start background runtimes")?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("addrpool-main")
                .build()
                .whatever_context("Failed to build main runtime")?
                .block_on(args.run())
        }
        Commands::Inspect(args) => args.run(),
    }
}
