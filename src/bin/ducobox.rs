#![warn(clippy::unwrap_used)]
use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use ducobox_connectivity::{
    commands::SET_VENTILATION_STATE,
    config_flow,
    coordinator::{CoordinatorState, DucoboxCoordinator, DEFAULT_POLL_INTERVAL},
    ducoapi::DucoClient,
    entities::{self, EntitySet, SetupOutcome},
    Error, Result,
};
use tokio::time;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PACKAGE: &str = env!("CARGO_PKG_NAME");

#[derive(Parser, Debug)]
#[clap(name = "ducobox", about = "Reads and controls a Duco connectivity board over its local API")]
struct Opt {
    // base url of the connectivity board, e.g. https://192.168.1.20
    #[clap(long = "base-url", env = "DUCO_BASE_URL")]
    base_url: String,

    #[clap(long = "poll-interval", env = "DUCO_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    poll_interval: u64,

    #[clap(long = "validate-certificates", env = "DUCO_VALIDATE_CERTS", default_value_t = false)]
    validate_certificates: bool,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the board is reachable
    Probe,
    /// Print all entities with their current state
    Entities,
    /// Poll the board and log every changed reading
    Run,
    /// Write a numeric node configuration value
    SetValue { node: u16, key: String, value: f64 },
    /// Change the ventilation state of a node
    SetVentilationState { node: u16, option: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opt = Opt::parse();

    env_logger::Builder::new()
        .filter_level(opt.verbose.log_level_filter())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    log::info!("{} version {}", PACKAGE, VERSION);

    if let Err(err) = run(opt).await {
        log::error!("{err}");
        std::process::exit(1);
    }
}

async fn run(opt: Opt) -> Result<()> {
    config_flow::validate_base_url(&opt.base_url)?;
    let client = Arc::new(DucoClient::new(&opt.base_url, opt.validate_certificates)?);
    let poll_interval = Duration::from_secs(opt.poll_interval);

    match opt.command {
        Command::Probe => {
            let entry = config_flow::entry_from_user(client.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Command::Entities => {
            let coordinator = setup_coordinator(client, None).await?;
            let entities = load_entities(&coordinator).await?;
            println!("{}", serde_json::to_string_pretty(&entities)?);
        }
        Command::Run => {
            let coordinator = setup_coordinator(client, Some(poll_interval)).await?;
            poll(&coordinator, poll_interval).await;
        }
        Command::SetValue { node, key, value } => {
            let coordinator = setup_coordinator(client.clone(), None).await?;
            let mut entities = load_entities(&coordinator).await?;
            let unique_id = format!("{}-{}-{}", entities.board.identifier, node, key);
            let number = entities
                .number_mut(&unique_id)
                .ok_or_else(|| Error::Runtime(format!("Node {node} has no writable setting '{key}'")))?;
            number.set_native_value(client.as_ref(), value).await?;
        }
        Command::SetVentilationState { node, option } => {
            let coordinator = setup_coordinator(client.clone(), None).await?;
            let mut entities = load_entities(&coordinator).await?;
            let select = entities
                .select_mut(node)
                .ok_or_else(|| Error::Runtime(format!("Node {node} does not support {SET_VENTILATION_STATE}")))?;
            select.select_option(client.as_ref(), &option).await?;
        }
    }

    Ok(())
}

/// Without a retry interval a failing setup is returned as error.
async fn setup_coordinator(
    client: Arc<DucoClient>,
    retry_interval: Option<Duration>,
) -> Result<DucoboxCoordinator<DucoClient>> {
    let mut coordinator = DucoboxCoordinator::new(client);
    while let Err(err) = coordinator.setup().await {
        match retry_interval {
            Some(interval) => {
                log::warn!("Board not ready ({err}), retrying in {}s", interval.as_secs());
                time::sleep(interval).await;
            }
            None => return Err(err),
        }
    }

    Ok(coordinator)
}

async fn load_entities(coordinator: &DucoboxCoordinator<DucoClient>) -> Result<EntitySet> {
    let snapshot = coordinator.refresh().await?;
    match entities::build_entities(&snapshot) {
        SetupOutcome::Ready(mut entities) => {
            entities.update(&coordinator.state());
            Ok(entities)
        }
        SetupOutcome::NotReady => Err(Error::Runtime("Board is not ready yet".to_string())),
    }
}

async fn poll(coordinator: &DucoboxCoordinator<DucoClient>, poll_interval: Duration) {
    let mut receiver = coordinator.subscribe();
    let mut entities: Option<EntitySet> = None;

    let poller = coordinator.run(poll_interval);
    tokio::pin!(poller);

    loop {
        tokio::select! {
            _ = &mut poller => break,
            changed = receiver.changed() => {
                if changed.is_err() {
                    break;
                }

                let state = receiver.borrow_and_update().clone();
                handle_state(&mut entities, &state);
            }
        }
    }
}

fn handle_state(entities: &mut Option<EntitySet>, state: &CoordinatorState) {
    if !state.last_update_success {
        log::warn!("Board unavailable, keeping last known values");
        return;
    }

    if entities.is_none() {
        if let Some(snapshot) = &state.snapshot {
            match entities::build_entities(snapshot) {
                SetupOutcome::Ready(set) => {
                    log::info!("Registered {} entities for board {}", set.len(), set.board.identifier);
                    *entities = Some(set);
                }
                SetupOutcome::NotReady => log::info!("Board not ready, waiting for the next poll"),
            }
        }
    }

    if let Some(set) = entities.as_mut() {
        for sensor in set.update(state) {
            match sensor.state() {
                Some(value) => log::info!("{} = {}{}", sensor.unique_id, value, sensor.unit.unwrap_or("")),
                None => log::info!("{} = unknown", sensor.unique_id),
            }
        }
    }
}
