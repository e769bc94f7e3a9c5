// bgmode-cli — Background-mode bridge simulator
//
// Drives the bridge against a simulated native side, so hosts can see which
// events fire and which native calls go out for a given platform and config.

mod config;

use anyhow::{Context, Result};
use bgmode_core::platform::testing::{RecordingSurface, ReplyMode};
use bgmode_core::{
    listener, BackgroundMode, BridgeConfig, NativeCall, NativeControlSurface, NativeReply,
    NotificationContent, NotificationSettings, PlatformCapability,
};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bgmode")]
#[command(about = "Background-mode bridge simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Also write logs to a daily-rolling file in the data directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Config file (defaults to the per-user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full lifecycle against a simulated native side
    Simulate {
        /// Platform name reported at readiness ("android", "browser", "ios", ...)
        #[arg(short, long)]
        platform: Option<String>,
        /// Native side rejects enable/disable with this message
        #[arg(long)]
        fail_enable: Option<String>,
        /// Report the screen as off
        #[arg(long)]
        screen_off: bool,
        /// Options passed to configure while active (JSON object)
        #[arg(long, default_value = r#"{"text":"Working..."}"#)]
        configure: String,
    },
    /// Show the notification native code would render for the given settings
    Render {
        /// Runtime settings as a JSON object, layered over the defaults
        #[arg(default_value = "{}")]
        settings: String,
    },
    /// Decode a native call from its wire form
    Decode {
        action: String,
        /// Positional arguments as a JSON array
        #[arg(default_value = "[]")]
        args: String,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    Path,
}

/// Prints every native call, then answers it like the recording surface
struct ConsoleSurface {
    inner: RecordingSurface,
}

impl NativeControlSurface for ConsoleSurface {
    fn exec(&self, call: NativeCall, reply: Option<NativeReply>) {
        let args = serde_json::to_string(&call.args()).unwrap_or_else(|_| "[]".to_string());
        println!(
            "  {} {}.{} {}",
            "→".bright_blue(),
            call.service().as_str(),
            call.action().bright_white(),
            args.dimmed()
        );
        self.inner.exec(call, reply);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };

    let _log_guard = if cli.log_file {
        bgmode_core::logging::init_file_logging(
            config::Config::log_dir()?,
            &config.bridge.log_filter,
        )
    } else {
        bgmode_core::logging::init_logging(&config.bridge.log_filter);
        None
    };

    tracing::debug!("Using config {}", config.path().display());

    match cli.command {
        Commands::Simulate {
            platform,
            fail_enable,
            screen_off,
            configure,
        } => cmd_simulate(&config.bridge, platform, fail_enable, screen_off, &configure).await,
        Commands::Render { settings } => cmd_render(&config.bridge, &settings),
        Commands::Decode { action, args } => cmd_decode(&action, &args),
        Commands::Config { action } => cmd_config(config, action),
    }
}

async fn cmd_simulate(
    bridge: &BridgeConfig,
    platform: Option<String>,
    fail_enable: Option<String>,
    screen_off: bool,
    configure: &str,
) -> Result<()> {
    let platform = platform
        .or_else(|| bridge.platform.clone())
        .unwrap_or_else(|| "android".to_string());
    let options =
        NotificationSettings::from_json(configure).context("Invalid --configure options")?;

    let surface = Arc::new(ConsoleSurface {
        inner: RecordingSurface::new(match fail_enable {
            Some(message) => ReplyMode::Fail(message),
            None => ReplyMode::Succeed,
        }),
    });
    surface.inner.set_screen_off(screen_off);

    let mode = BackgroundMode::with_config(
        Arc::clone(&surface) as Arc<dyn NativeControlSurface>,
        bridge,
    );

    tracing::info!("Simulating platform '{}'", platform);

    println!("{}", "Platform ready".bold());
    let capability = mode.initialize_for_platform(&platform)?;
    println!("  {} {} ({})", "✓".green(), platform, capability.to_string().bright_cyan());

    for event in ["enable", "disable", "activate", "deactivate", "failure"] {
        mode.on(
            event,
            listener(|delivery| {
                println!(
                    "  {} {} {}",
                    "●".bright_yellow(),
                    delivery.event.bold(),
                    serde_json::to_string(delivery.args)?.dimmed()
                );
                Ok(())
            }),
        );
    }

    println!("{}", "Application ready".bold());
    mode.application_ready();

    println!("{}", "Enable".bold());
    if let Err(e) = mode.enable_async().await {
        println!("  {} {}", "✗".red(), e.message);
    }

    println!("{}", "App moves to background".bold());
    mode.move_to_background();
    if capability == PlatformCapability::BackgroundCapable {
        mode.fire_event("activate", &[]);
    }

    println!("{}", "Configure".bold());
    mode.configure(options);
    let settings = mode.get_settings();
    println!("  settings: {}", settings.to_json_value());

    match mode.is_screen_off_async().await {
        Some(off) => println!("  screen off: {}", off),
        None => println!("  screen off: {}", "unknown".dimmed()),
    }

    println!("{}", "App returns to foreground".bold());
    mode.move_to_foreground();
    if capability == PlatformCapability::BackgroundCapable {
        mode.fire_event("deactivate", &[]);
    }

    println!("{}", "Disable".bold());
    if let Err(e) = mode.disable_async().await {
        println!("  {} {}", "✗".red(), e.message);
    }

    let state = mode.state();
    println!();
    println!(
        "{} enabled={} active={} native calls={}",
        "Final state:".bold(),
        state.enabled,
        state.active,
        surface.inner.call_count()
    );

    Ok(())
}

fn cmd_render(bridge: &BridgeConfig, settings: &str) -> Result<()> {
    let runtime = NotificationSettings::from_json(settings).context("Invalid settings JSON")?;
    let merged = runtime.fill_missing(&bridge.effective_defaults());
    let content = NotificationContent::resolve(&merged);

    println!("{}", "Notification".bold());
    println!("  Title:    {}", content.title.bright_cyan());
    println!("  Text:     {}", content.text);
    println!("  Icon:     {}", content.icon);
    println!("  Big text: {}", content.big_text_style);
    println!("  Resume:   {}", content.reopen_on_tap);
    match content.color_argb {
        Some(argb) => println!("  Color:    #{:08X}", argb),
        None => println!("  Color:    {}", "(system)".dimmed()),
    }

    Ok(())
}

fn cmd_decode(action: &str, args: &str) -> Result<()> {
    let args: Vec<Value> = serde_json::from_str(args).context("Arguments must be a JSON array")?;
    let call = NativeCall::from_wire(action, &args)
        .with_context(|| format!("Invalid action: {}", action))?;

    println!("{}", "Native call".bold());
    println!("  Service: {}", call.service().as_str().bright_cyan());
    println!("  Action:  {}", call.action());
    println!("  Decoded: {:?}", call);

    Ok(())
}

fn cmd_config(mut config: config::Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            println!("{} {} = {}", "✓".green(), key, value.bright_cyan());
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => println!("{}", "(unset)".dimmed()),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<26} {}", key, value);
            }
        }
        ConfigAction::Path => println!("{}", config.path().display()),
    }

    Ok(())
}
