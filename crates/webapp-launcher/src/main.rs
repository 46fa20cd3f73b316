mod bridge;
mod bus;
mod extensions;
mod host;
mod launcher;
mod runtime;
mod settings;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bus::NullBus;
use host::DefaultHost;
use runtime::AppRuntime;
use settings::{Settings, SETTINGS_ENV_VAR};

#[derive(Parser, Debug)]
#[command(name = "webapp-launcher", version, about = "Runs a single web application")]
struct Cli {
    /// Application manifest of the application to start
    #[arg(short = 'a', long)]
    appinfo: PathBuf,

    /// Launch parameters passed to the application
    #[arg(short = 'p', long)]
    parameters: Option<String>,

    /// Raise the default log level to debug
    #[arg(short = 'd', long)]
    debug: bool,

    /// Settings file, overriding WEBAPP_LAUNCHER_SETTINGS
    #[arg(short = 's', long)]
    settings: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(message) = run(cli) {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();
}

fn run(cli: Cli) -> Result<(), String> {
    let settings = Settings::resolve(cli.settings.as_deref(), std::env::var_os(SETTINGS_ENV_VAR))
        .map_err(|error| format!("webapp-launcher: invalid settings\n  {error}"))?;

    let description = launcher::load_description(&cli.appinfo)
        .map_err(|error| format!("webapp-launcher: cannot launch {}\n  {error}", cli.appinfo.display()))?;
    let parameters = launcher::normalize_parameters(cli.parameters.as_deref())
        .map_err(|error| format!("webapp-launcher: {error}"))?;

    let mut runtime = AppRuntime::bootstrap(
        DefaultHost::default(),
        Box::new(NullBus),
        settings,
        description,
        parameters,
    )
    .map_err(|error| format!("webapp-launcher: bootstrap failed\n  {error}"))?;

    runtime
        .run()
        .map_err(|error| format!("webapp-launcher: event loop failed\n  {error}"))?;
    info!(
        app_id = runtime.application().id(),
        closed = runtime.application().is_closed(),
        "event loop finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn parses_launch_flags() {
        let cli = Cli::try_parse_from([
            "webapp-launcher",
            "--appinfo",
            "/usr/palm/applications/com.palm.app.email/appinfo.json",
            "-p",
            "{\"compose\":true}",
            "--debug",
        ])
        .expect("flags should parse");

        assert_eq!(
            cli.appinfo.to_string_lossy(),
            "/usr/palm/applications/com.palm.app.email/appinfo.json"
        );
        assert_eq!(cli.parameters.as_deref(), Some("{\"compose\":true}"));
        assert!(cli.debug);
        assert!(cli.settings.is_none());
    }

    #[test]
    fn appinfo_is_required() {
        assert!(Cli::try_parse_from(["webapp-launcher"]).is_err());
    }
}
