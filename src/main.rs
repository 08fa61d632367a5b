use clap::{Arg, Command};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use backupsync::config::{CliOverrides, Config};
use backupsync::destination::DropboxAuth;
use backupsync::logging::{self, *};
use backupsync::scheduler::Scheduler;
use backupsync::serve;
use backupsync::service::{AppContext, BackupService};
use backupsync::source::SupervisorClient;
use backupsync::state::TokenStore;
use backupsync::types::Tokens;
use backupsync::utils::shutdown_signal;

///////////////////////
// Utility functions //
///////////////////////

async fn build_context(config: &Config) -> Result<AppContext, Box<dyn Error>> {
	let source = SupervisorClient::new(&config.supervisor_url, &config.supervisor_token)?;
	let auth = DropboxAuth::new(&config.app_key, &config.app_secret, TokenStore::new(&config.state_dir))?;

	let service = BackupService::new(
		Arc::new(source),
		Arc::new(auth),
		&config.state_dir,
		config.service_settings(),
	)
	.await;

	Ok(AppContext::new(Arc::new(service), Arc::new(Scheduler::new(config.interval_hours))))
}

async fn serve(config: &Config) -> Result<(), Box<dyn Error>> {
	let ctx = build_context(config).await?;

	ctx.scheduler.start(ctx.service.clone());
	let stdin_reader = serve::spawn_stdin_reader(ctx.service.clone());

	info!("Starting backupsync on {}", config.listen);
	let result = serve::serve_http(ctx.clone(), &config.listen, shutdown_signal()).await;

	stdin_reader.abort();
	ctx.scheduler.stop();
	result?;
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let log_level = std::env::var("BACKUPSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
	logging::init_tracing(&log_level);

	let matches = Command::new("backupsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Copies Home Assistant backups to Dropbox")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.help("Options file (.toml or JSON)"),
		)
		.arg(
			Arg::new("state-dir")
				.long("state-dir")
				.value_name("DIR")
				.help("Directory for tokens, transfer state and options"),
		)
		.subcommand(
			Command::new("serve")
				.about("Run the scheduler and the HTTP control surface")
				.arg(Arg::new("listen").long("listen").value_name("ADDR").help("host:port")),
		)
		.subcommand(Command::new("run").about("Run one backup cycle now"))
		.subcommand(Command::new("status").about("Show tracked uploads and the last run"))
		.subcommand(
			Command::new("set-token")
				.about("Store a Dropbox refresh token obtained out of band")
				.arg(Arg::new("refresh-token").required(true)),
		)
		.get_matches();

	let mut cli = CliOverrides {
		config_path: matches.get_one::<String>("config").map(PathBuf::from),
		state_dir: matches.get_one::<String>("state-dir").map(PathBuf::from),
		listen: None,
	};
	if let Some(sub) = matches.subcommand_matches("serve") {
		cli.listen = sub.get_one::<String>("listen").cloned();
	}
	let config = Config::load(&cli)?;

	match matches.subcommand() {
		Some(("serve", _)) => serve(&config).await?,
		Some(("run", _)) => {
			let ctx = build_context(&config).await?;
			let outcome = ctx.service.trigger().await?;
			println!("{}", serde_json::to_string_pretty(&outcome)?);
		}
		Some(("status", _)) => {
			let ctx = build_context(&config).await?;
			let state = ctx.service.transfer_store().load().await;
			let history = ctx.service.history().await;
			let report = serde_json::json!({
				"authorized": ctx.service.is_authorized().await,
				"lastRun": history.last_run,
				"lastResult": history.last_result,
				"uploaded": state,
			});
			println!("{}", serde_json::to_string_pretty(&report)?);
		}
		Some(("set-token", sub)) => {
			let token = sub
				.get_one::<String>("refresh-token")
				.ok_or("set-token: refresh token argument required")?;
			let tokens = Tokens { refresh_token: Some(token.clone()), ..Tokens::default() };
			TokenStore::new(&config.state_dir).save(&tokens).await?;
			info!("Refresh token stored in {}", config.state_dir.display());
		}
		_ => {}
	}

	Ok(())
}

// vim: ts=4
