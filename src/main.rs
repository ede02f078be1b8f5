//! Headless driver: loads data through the viewer controller and prints the
//! event stream as JSON lines.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use clap::Parser;
    use medview::{App, AppConfig, EventType, LogLevel, UrlOptions};

    #[derive(Debug, Parser)]
    #[command(name = "medview-cli", version, about = "Load medical images and print viewer events")]
    pub struct Cli {
        /// Image or state files to load
        pub files: Vec<PathBuf>,

        /// URLs to load instead of files
        #[arg(long = "url")]
        pub urls: Vec<String>,

        /// Page URI whose `input` query names the URLs to load
        #[arg(long)]
        pub uri: Option<String>,

        /// Configuration file (defaults to the user config, then built-in defaults)
        #[arg(long)]
        pub config: Option<PathBuf>,

        /// Write the viewing state to this file after loading
        #[arg(long)]
        pub state_out: Option<PathBuf>,

        /// Override the configured log level (error, warn, info, debug, trace)
        #[arg(long, value_parser = parse_log_level)]
        pub log_level: Option<LogLevel>,

        /// Store the effective configuration as the user config
        #[arg(long)]
        pub save_config: bool,
    }

    fn parse_log_level(name: &str) -> Result<LogLevel, String> {
        LogLevel::from_name(name).ok_or_else(|| format!("unknown log level '{}'", name))
    }

    fn load_config(path: Option<&PathBuf>) -> Result<AppConfig, String> {
        match path {
            Some(path) => AppConfig::load_from_path(path).map_err(|e| e.to_string()),
            None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
        }
    }

    pub fn run(cli: Cli) -> ExitCode {
        let mut config = match load_config(cli.config.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if let Some(level) = cli.log_level {
            config.log_level = level;
        }
        env_logger::Builder::new()
            .filter_level(config.log_level.to_level_filter())
            .parse_default_env()
            .init();
        log::info!("medview-cli v{}", env!("CARGO_PKG_VERSION"));

        if cli.save_config {
            match config.save_to_default_path() {
                Ok(path) => eprintln!("Configuration saved to {}", path.display()),
                Err(e) => {
                    eprintln!("Cannot save configuration: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }

        let mut app = App::new(config);
        let printed = [
            "loadstart", "loadprogress", "loaditem", "load", "loadend", "error", "abort",
        ];
        for name in printed {
            app.add_event_listener(EventType::from_name(name), |event| {
                match event.to_json() {
                    Ok(json) => println!("{}", json),
                    Err(e) => log::error!("Cannot serialize event: {}", e),
                }
            });
        }

        let errored = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag = std::rc::Rc::clone(&errored);
        app.add_event_listener(EventType::Error, move |_| flag.set(true));

        if let Some(uri) = &cli.uri {
            if !app.load_from_uri(uri) {
                eprintln!("Nothing to load in '{}'", uri);
                return ExitCode::FAILURE;
            }
        } else if !cli.urls.is_empty() {
            app.load_urls(cli.urls, UrlOptions::default());
        } else {
            app.load_files(cli.files);
        }
        log::debug!("Load finished in state {:?}", app.load_state());

        if let Some(path) = &cli.state_out {
            let written = app
                .get_state()
                .map_err(|e| e.to_string())
                .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
            if let Err(e) = written {
                eprintln!("Cannot write state to {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            log::info!("State written to {}", path.display());
        }

        if errored.get() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use clap::Parser;
    cli::run(cli::Cli::parse())
}

// WASM builds use the library through `WebViewer`
#[cfg(target_arch = "wasm32")]
fn main() {}
