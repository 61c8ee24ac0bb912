//! Supervisor entry — `harvest run` and `harvest run --once`.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use harvest::config::Config;
use harvest::daemon::Daemon;
use harvest::logging;
use harvest::shutdown::{self, ShutdownFlag};

pub async fn cmd_run(
    work_dir: &Path,
    config_path: Option<&Path>,
    once: bool,
    verbose: bool,
) -> Result<()> {
    let config = Config::load(work_dir, config_path)?;
    let _guard = logging::init(&config.log_dir, verbose)?;

    info!(
        work_dir = %config.work_dir.display(),
        status_file = %config.status_file.display(),
        "harvest starting"
    );

    let flag = ShutdownFlag::new();
    shutdown::install_signal_handlers(&flag).context("Failed to install signal handlers")?;

    let daemon = Daemon::new(config, flag);
    if once {
        daemon.run_once().await;
    } else {
        daemon.run().await;
    }

    Ok(())
}
