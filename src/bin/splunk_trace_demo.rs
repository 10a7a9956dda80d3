//! Send a handful of events to a Splunk HTTP input.
//!
//! Settings are read from an optional INI file given as the first argument,
//! overlaid with `SPLUNK_*` environment variables, for example:
//!
//! ```text
//! SPLUNK_HOST_NAME=input.splunkstorm.com SPLUNK_PROJECT_ID=proj \
//! SPLUNK_ACCESS_TOKEN=token SPLUNK_SOURCE=demo splunk-trace-demo
//! ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use log::LevelFilter;
use splunk_trace_sink::{
    ConfigError, LogicalOperation, SinkConfig, SinkConfigBuilder, SplunkSink, TraceSink,
    install_global_logger,
};

fn load_config() -> Result<SinkConfig, ConfigError> {
    let from_file = match env::args_os().nth(1) {
        Some(path) => SinkConfigBuilder::from_ini_file(path)?,
        None => SinkConfigBuilder::new(),
    };
    from_file
        .merge(SinkConfigBuilder::from_env()?)
        .with_shutdown_grace_ms(5_000)
        .build()
}

fn test_function() {
    let _operation = LogicalOperation::start("TestFunction");
    log::warn!("Warning");
}

fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("splunk-trace-demo: {err}");
            return ExitCode::FAILURE;
        }
    };

    let sink = Arc::new(SplunkSink::new(config));
    if let Err(err) = sink.open() {
        eprintln!("splunk-trace-demo: {err}");
        return ExitCode::FAILURE;
    }
    if let Err(err) = install_global_logger(sink.clone(), LevelFilter::Info) {
        eprintln!("splunk-trace-demo: {err}");
        return ExitCode::FAILURE;
    }

    {
        let _operation = LogicalOperation::start("Main");
        log::info!("Test message");
        test_function();
    }
    sink.write("partial ");
    sink.write_line("line written as text");

    let idle = sink.flush();
    sink.close();
    let stats = sink.stats();
    println!(
        "delivered {} entries, lost {}{}",
        stats.entries_delivered,
        stats.lost(),
        if idle { "" } else { " (flush timed out)" }
    );
    ExitCode::SUCCESS
}
