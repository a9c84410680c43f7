use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use zeroize::Zeroizing;

use pin_gate::api::{ApiClient, OfflineBackend, PinBackend};
use pin_gate::config::{self, GateConfig};
use pin_gate::crypto::DeviceFingerprint;
use pin_gate::storage::{self, StoreKind};
use pin_gate::{validate_pin, GateStatus, PinGate};

/// Manage the local PIN that authorizes sensitive actions on this device.
#[derive(Parser, Debug)]
#[command(name = "pin-gate", version)]
struct Args {
    /// Gateway base URL (overrides PIN_GATE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Never call the backend
    #[arg(long, global = true)]
    offline: bool,

    /// Where the sealed PIN lives: file, keychain or memory
    #[arg(long, global = true)]
    store: Option<StoreKind>,

    /// Directory of the file store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Language part of the device fingerprint
    #[arg(long, global = true)]
    language: Option<String>,

    /// Screen part of the device fingerprint, WIDTHxHEIGHT
    #[arg(long, global = true, value_parser = parse_screen_arg)]
    screen: Option<(u32, u32)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a PIN against the complexity rules
    Validate { pin: String },
    /// Report whether a PIN is set
    Status,
    /// Create the device PIN
    Setup {
        #[arg(long)]
        pin: Option<String>,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Check a PIN against the stored one
    Verify {
        #[arg(long)]
        pin: Option<String>,
    },
    /// Replace the device PIN
    Change {
        #[arg(long)]
        current: Option<String>,
        #[arg(long)]
        new: Option<String>,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Delete the local PIN
    Clear,
    /// Run a named action behind the PIN gate
    Authorize {
        /// Label of the action, e.g. "transfer 5000 XOF"
        #[arg(long, default_value = "confirm payment")]
        action: String,
        #[arg(long)]
        pin: Option<String>,
    },
}

fn parse_screen_arg(raw: &str) -> Result<(u32, u32), String> {
    config::parse_screen(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args = Args::parse();

    let mut config = match GateConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    apply_overrides(&mut config, &args);

    if let Command::Validate { pin } = &args.command {
        let validation = validate_pin(pin);
        let ok = validation.valid;
        return print_and_exit(&validation, ok);
    }

    let store = match storage::open_store(config.store, &config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: cannot open {} store: {}", config.store.as_str(), e);
            return ExitCode::FAILURE;
        }
    };
    let fingerprint = DeviceFingerprint::detect(config.language.as_deref(), config.screen);
    log::debug!("Device storage key: {}", fingerprint.storage_key());

    if config.offline {
        log::info!("Offline mode: backend calls disabled");
        run(store, Arc::new(OfflineBackend), &fingerprint, args.command).await
    } else {
        let client = ApiClient::new(&config.api_base_url);
        if let Some(token) = config.access_token.clone() {
            client.set_access_token(token).await;
        }
        run(store, Arc::new(client), &fingerprint, args.command).await
    }
}

fn apply_overrides(config: &mut GateConfig, args: &Args) {
    if let Some(url) = &args.api_url {
        config.api_base_url = url.clone();
    }
    if args.offline {
        config.offline = true;
    }
    if let Some(store) = args.store {
        config.store = store;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(language) = &args.language {
        config.language = Some(language.clone());
    }
    if args.screen.is_some() {
        config.screen = args.screen;
    }
}

async fn run<B: PinBackend>(
    store: Box<dyn storage::KeyValueStore>,
    backend: Arc<B>,
    fingerprint: &DeviceFingerprint,
    command: Command,
) -> ExitCode {
    let gate = match PinGate::new(store, backend, fingerprint) {
        Ok(gate) => gate,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match command {
        Command::Validate { pin } => {
            let validation = validate_pin(&pin);
            let ok = validation.valid;
            print_and_exit(&validation, ok)
        }
        Command::Status => {
            let has_pin = gate.check_pin_status().await;
            print_and_exit(&gate.state(), has_pin)
        }
        Command::Setup { pin, confirm } => {
            let pin = secret_or_prompt(pin, "New PIN");
            let confirm = secret_or_prompt(confirm, "Confirm PIN");
            let outcome = gate.setup_pin(&pin, &confirm).await;
            let ok = outcome.success;
            // Let the best-effort backend notification go out before exiting.
            tokio::task::yield_now().await;
            print_and_exit(&outcome, ok)
        }
        Command::Verify { pin } => {
            let pin = secret_or_prompt(pin, "PIN");
            let result = gate.verify_pin(&pin).await;
            let ok = result.valid;
            print_and_exit(&result, ok)
        }
        Command::Change { current, new, confirm } => {
            let current = secret_or_prompt(current, "Current PIN");
            let new = secret_or_prompt(new, "New PIN");
            let confirm = secret_or_prompt(confirm, "Confirm new PIN");
            let outcome = gate.change_pin(&current, &new, &confirm).await;
            let ok = outcome.success;
            print_and_exit(&outcome, ok)
        }
        Command::Clear => match gate.clear_pin() {
            Ok(()) => print_and_exit(&gate.state(), true),
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Authorize { action, pin } => {
            let report = authorize(&gate, action, pin).await;
            let ok = report.authorized;
            print_and_exit(&report, ok)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeReport {
    action: String,
    authorized: bool,
    message: Option<String>,
}

/// Gate a logging action behind the PIN, the way a payment screen would.
async fn authorize<B: PinBackend>(
    gate: &PinGate<B>,
    action: String,
    pin: Option<String>,
) -> AuthorizeReport {
    gate.check_pin_status().await;

    let label = action.clone();
    let prompt = gate.require_pin(move |_pin| async move {
        log::info!("Authorized action: {}", label);
        Ok::<(), String>(())
    });

    let mut message = None;
    match gate.status() {
        GateStatus::AwaitingSetup => {
            message = Some("No PIN on this device, run `pin-gate setup` first".to_string());
            gate.close_modals();
        }
        _ => {
            let pin = secret_or_prompt(pin, "PIN");
            let result = gate.verify_pin(&pin).await;
            if result.valid {
                gate.execute_pending_action(Some(pin.as_str())).await;
            } else {
                message = result.message;
                gate.close_modals();
            }
        }
    }

    AuthorizeReport {
        action,
        authorized: prompt.await,
        message,
    }
}

/// Use the flag value, or read one line from stdin.
fn secret_or_prompt(value: Option<String>, label: &str) -> Zeroizing<String> {
    if let Some(v) = value {
        return Zeroizing::new(v);
    }

    eprint!("{}: ", label);
    let _ = std::io::stderr().flush();

    let mut line = Zeroizing::new(String::new());
    if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
        log::warn!("Failed to read {} from stdin: {}", label, e);
    }
    Zeroizing::new(line.trim().to_string())
}

fn print_and_exit<T: Serialize>(value: &T, ok: bool) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("error: {}", e),
    }
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "pin-gate",
            "verify",
            "--pin",
            "13579",
            "--store",
            "memory",
            "--screen",
            "412x915",
            "--offline",
        ])
        .unwrap();
        assert!(args.offline);
        assert_eq!(args.store, Some(StoreKind::Memory));
        assert_eq!(args.screen, Some((412, 915)));
        assert!(matches!(args.command, Command::Verify { pin: Some(ref p) } if p == "13579"));
    }

    #[test]
    fn test_cli_rejects_bad_screen() {
        assert!(Args::try_parse_from(["pin-gate", "status", "--screen", "big"]).is_err());
    }

    #[test]
    fn test_overrides_win_over_env() {
        let mut config = GateConfig::from_lookup(|key| match key {
            config::DATA_DIR_ENV => Some("/tmp/env".to_string()),
            config::API_URL_ENV => Some("https://env.example".to_string()),
            _ => None,
        })
        .unwrap();
        let args = Args::try_parse_from([
            "pin-gate",
            "--api-url",
            "https://flag.example",
            "--data-dir",
            "/tmp/flag",
            "status",
        ])
        .unwrap();

        apply_overrides(&mut config, &args);
        assert_eq!(config.api_base_url, "https://flag.example");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/flag"));
        assert_eq!(config.store, StoreKind::File);
    }

    #[tokio::test]
    async fn test_authorize_with_valid_pin() {
        let gate = PinGate::new(
            Box::new(storage::MemoryStore::new()),
            Arc::new(OfflineBackend),
            &DeviceFingerprint::new("test", "fr-FR", 1, 1),
        )
        .unwrap();
        assert!(gate.setup_pin("13579", "13579").await.success);

        let report = authorize(&gate, "transfer".to_string(), Some("13579".to_string())).await;
        assert!(report.authorized);
        assert!(report.message.is_none());

        let report = authorize(&gate, "transfer".to_string(), Some("24680".to_string())).await;
        assert!(!report.authorized);
        assert!(report.message.is_some());
    }

    #[tokio::test]
    async fn test_authorize_without_pin_asks_for_setup() {
        let gate = PinGate::new(
            Box::new(storage::MemoryStore::new()),
            Arc::new(OfflineBackend),
            &DeviceFingerprint::new("test", "fr-FR", 1, 1),
        )
        .unwrap();

        let report = authorize(&gate, "transfer".to_string(), None).await;
        assert!(!report.authorized);
        assert!(report.message.unwrap().contains("setup"));
        assert_eq!(gate.status(), GateStatus::NoPin);
    }
}
