use std::thread;
use std::time::{Duration, Instant};

use cantel_pipeline::{Pipeline, PipelineConfig, ShutdownToken, StoreConfig, TelemetryStore};
use cantel_transport::{UdpConfig, UdpTransport};
use tracing::info;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{pipeline_error, store_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_dashboard, print_summary, OutputFormat};

// Upper bound on how late a refresh, deadline or Ctrl-C is noticed.
const POLL_TICK: Duration = Duration::from_millis(20);

// Short enough that the ingestion thread notices shutdown promptly.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let deadline = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|span| Instant::now() + span);

    let (store, writer) = TelemetryStore::new(StoreConfig {
        history_capacity: args.history,
        event_log_capacity: args.event_log,
    })
    .map_err(|err| store_error("invalid store configuration", err))?;

    let udp = UdpConfig {
        bind: args.bind,
        multicast_group: (!args.no_multicast).then_some(args.group),
        interface: args.interface,
        read_timeout: READ_TIMEOUT,
        ..UdpConfig::default()
    };
    let transport = UdpTransport::open(udp).map_err(|err| transport_error("bind failed", err))?;
    info!(
        local = ?transport.local_addr(),
        group = ?transport.config().multicast_group,
        "listening for telemetry"
    );

    let pipeline = Pipeline::with_config(
        transport,
        writer,
        PipelineConfig {
            max_frames: args.count,
            ..PipelineConfig::default()
        },
    );

    let shutdown = ShutdownToken::new();
    install_ctrlc_handler(shutdown.clone())?;
    let handle = pipeline
        .spawn_with_shutdown(shutdown.clone())
        .map_err(|err| pipeline_error("failed to start ingestion", err))?;

    let mut next_refresh = Instant::now() + interval;
    while !handle.is_finished() && !shutdown.is_cancelled() {
        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            info!("listen duration elapsed");
            break;
        }
        if now >= next_refresh {
            print_dashboard(
                &store.latest_all(),
                &handle.diagnostics().snapshot(),
                store.total_recorded(),
                format,
            );
            next_refresh = now + interval;
        }
        thread::sleep(POLL_TICK);
    }

    let report = handle
        .stop()
        .map_err(|err| pipeline_error("ingestion stopped", err))?;

    print_dashboard(
        &store.latest_all(),
        &report.diagnostics,
        store.total_recorded(),
        format,
    );
    print_summary(&report, store.total_recorded(), format);

    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: ShutdownToken) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.cancel()).map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
