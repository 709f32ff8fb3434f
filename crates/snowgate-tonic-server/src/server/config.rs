use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;
use snowgate_tonic_core::{
    snowgate::{Component, SnowflakeLayout, unix_millis},
    types::NodeIds,
};
use tokio::sync::Semaphore;

/// Which [`TimeSource`](snowgate_tonic_core::snowgate::TimeSource) drives the
/// generator.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    /// Wall clock. Backward steps are detected and reported per request.
    System,
    /// Ticker-thread clock anchored once at startup; never moves backward.
    Monotonic,
}

/// Runtime configuration for the `snowgate-tonic-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults matching the classic Twitter
/// Snowflake layout.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "snowgate-tonic-server",
    version,
    about = "A gRPC service issuing Snowflake IDs behind an admission gate"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/snowgate.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Number of requests that may be generating an ID at the same time.
    ///
    /// Environment variable: `MAX_CONCURRENT_REQUESTS`
    #[arg(long, env = "MAX_CONCURRENT_REQUESTS", default_value_t = 1024)]
    pub max_concurrent_requests: usize,

    /// How long a request waits for admission before it is answered with `-1`.
    ///
    /// Zero makes admission a single non-blocking attempt.
    ///
    /// Environment variable: `ADMISSION_TIMEOUT_MS`
    #[arg(long, env = "ADMISSION_TIMEOUT_MS", default_value_t = 100)]
    pub admission_timeout_ms: u64,

    /// Environment variable: `DATACENTER_ID_BITS`
    #[arg(long, env = "DATACENTER_ID_BITS", default_value_t = 5)]
    pub datacenter_id_bits: u8,

    /// Environment variable: `MACHINE_ID_BITS`
    #[arg(long, env = "MACHINE_ID_BITS", default_value_t = 5)]
    pub machine_id_bits: u8,

    /// Environment variable: `SEQUENCE_BITS`
    #[arg(long, env = "SEQUENCE_BITS", default_value_t = 12)]
    pub sequence_bits: u8,

    /// Milliseconds since 1970-01-01 UTC that generated timestamps count from.
    ///
    /// Environment variable: `EPOCH_MS`
    #[arg(long, env = "EPOCH_MS", default_value_t = 1_288_834_974_657)]
    pub epoch_ms: u64,

    /// Datacenter id used when a request does not carry one.
    ///
    /// Environment variable: `DATACENTER_ID`
    #[arg(long, env = "DATACENTER_ID", default_value_t = 0)]
    pub datacenter_id: i32,

    /// Machine id used when a request does not carry one.
    ///
    /// Environment variable: `MACHINE_ID`
    #[arg(long, env = "MACHINE_ID", default_value_t = 0)]
    pub machine_id: i32,

    /// Environment variable: `CLOCK`
    #[arg(long, env = "CLOCK", value_enum, default_value_t = ClockKind::System)]
    pub clock: ClockKind,

    /// Responses buffered per session before the server waits on the client.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 16)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for admitted requests to finish during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub max_concurrent_requests: usize,
    pub admission_timeout: Duration,
    pub layout: SnowflakeLayout,
    pub epoch: Duration,
    pub node: NodeIds,
    pub clock: ClockKind,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_concurrent_requests == 0 {
            bail!("MAX_CONCURRENT_REQUESTS must be greater than 0");
        }

        if args.max_concurrent_requests > Semaphore::MAX_PERMITS {
            bail!(
                "MAX_CONCURRENT_REQUESTS ({}) exceeds the supported maximum ({})",
                args.max_concurrent_requests,
                Semaphore::MAX_PERMITS
            );
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        let layout = SnowflakeLayout::new(
            args.datacenter_id_bits,
            args.machine_id_bits,
            args.sequence_bits,
        )?;

        let now = unix_millis();
        if args.epoch_ms > now {
            bail!("EPOCH_MS ({}) is in the future (now = {now})", args.epoch_ms);
        }
        if now - args.epoch_ms > layout.max_timestamp() {
            bail!(
                "EPOCH_MS ({}) is too old: {} timestamp bits only cover {}ms",
                args.epoch_ms,
                layout.timestamp_bits(),
                layout.max_timestamp()
            );
        }

        layout.check_component(Component::Datacenter, i64::from(args.datacenter_id))?;
        layout.check_component(Component::Machine, i64::from(args.machine_id))?;

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            max_concurrent_requests: args.max_concurrent_requests,
            admission_timeout: Duration::from_millis(args.admission_timeout_ms),
            layout,
            epoch: Duration::from_millis(args.epoch_ms),
            node: NodeIds {
                datacenter_id: args.datacenter_id,
                machine_id: args.machine_id,
            },
            clock: args.clock,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}
