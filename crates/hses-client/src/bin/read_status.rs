//! Read and print the controller status and current position.

use std::time::Duration;

use clap::Parser;
use hses_client::udp::Client;
use hses_proto::types::CoordinateSystemType;
use hses_proto::udp::{ReadCurrentPosition, ReadStatus};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Read the status and current position of a controller")]
struct Args {
    /// Hostname or IP address of the controller.
    host: String,

    /// UDP port of the high speed ethernet server.
    #[arg(long, default_value_t = hses_proto::DEFAULT_UDP_PORT)]
    port: u16,

    /// Timeout per request in milliseconds.
    #[arg(long, default_value_t = 200)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), hses_client::Error> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let timeout = Duration::from_millis(args.timeout);

    let client = Client::connect(&args.host, args.port, timeout).await?;

    let (status, position) = client
        .send_commands(
            (
                ReadStatus,
                ReadCurrentPosition {
                    control_group: 0,
                    coordinate_system: CoordinateSystemType::RobotPulse,
                },
            ),
            timeout,
        )
        .await?;

    tracing::info!(?status, "controller status");
    tracing::info!(?position, "current position");
    Ok(())
}
