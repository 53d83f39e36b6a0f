// src/main.rs - FermaSense controller binary
use std::sync::Arc;

use clap::Parser;
use tokio::time::{Duration, MissedTickBehavior, interval};

use fermasense_rs::clock::{Clock, SystemClock};
use fermasense_rs::config::load_config;
use fermasense_rs::controller::Controller;
use fermasense_rs::display::ConsoleDisplay;
use fermasense_rs::hardware::serial::{open_serial_link, open_stdio_link};
use fermasense_rs::simulator::{SimulatedOutputs, SimulatedProbe, VesselModel, shared_vessel};

#[derive(Parser, Debug)]
#[command(name = "fermasense", about = "Fermentation vessel temperature controller")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(default_value = "fermasense.toml")]
    config: String,

    /// Use stdin/stdout as the host link instead of the serial port
    #[arg(long)]
    stdio: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    tracing::info!("Starting FermaSense controller");
    tracing::info!("Loading configuration from: {}", args.config);

    let config = load_config(&args.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", args.config, e);
        e
    })?;

    tracing::info!(
        "Target range {:.1}-{:.1}C, hysteresis {:.2}C, tick every {} ms",
        config.control.target_min,
        config.control.target_max,
        config.control.hysteresis,
        config.control.read_interval_ms
    );

    let (line_rx, line_tx) = if args.stdio {
        tracing::info!("Host link: stdio");
        open_stdio_link()
    } else {
        tracing::info!("Host link: {} @ {} baud", config.link.serial, config.link.baud);
        open_serial_link(&config.link.serial, config.link.baud)?
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    // Bundled vessel simulation backend; real hardware implements the same
    // probe/output traits out of tree.
    let mut model = VesselModel::new(config.simulation.start_temp_c, config.simulation.ambient_c);
    model.heat_rate_c_per_s = config.simulation.heat_rate_c_per_s;
    model.cool_rate_c_per_s = config.simulation.cool_rate_c_per_s;
    model.loss_coefficient = config.simulation.loss_coefficient;
    let vessel = shared_vessel(model);

    let probe = SimulatedProbe::new(
        vessel.clone(),
        clock.clone(),
        config.simulation.conversion_ms,
        config.simulation.noise_c,
    );
    let outputs = SimulatedOutputs::new(vessel.clone());

    // step vessel physics in real time
    let physics = vessel.clone();
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(100));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            physics.lock().unwrap().step(0.1);
        }
    });

    let mut controller = Controller::new(
        config.control_params(),
        probe,
        outputs,
        ConsoleDisplay,
        clock,
        line_tx,
    );

    controller.initialize().await?;
    tracing::info!("FermaSense controller ready");

    controller.run(line_rx).await?;
    Ok(())
}
