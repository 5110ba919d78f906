//! Entry points for node binaries.

use crate::args::CommonArgs;
use crate::logging::{self, LogLevel};
use crate::node::Node;
use crate::process::{Application, Process, StopHandle};
use crate::system::System;
use anyhow::{anyhow, Context, Result};
use log::{error, info};

/// Installs the logger, creates the system directories and opens the system
/// the node will join.
pub fn boot(args: &CommonArgs) -> Result<System> {
    let level: LogLevel = args.get_log_level().parse().map_err(|e: String| anyhow!(e))?;
    logging::init(args.is_stdout(), level);

    let system = System::from_args(args);
    system
        .get_paths()
        .ensure_dirs()
        .with_context(|| format!("Failed to create directories under {:?}", args.get_root_dir()))?;
    info!(
        "system '{}' booted at {:?}",
        args.get_system(),
        system.get_paths().get_root_dir()
    );
    Ok(system)
}

/// Registers the node named in `args`, builds its application and runs the
/// process loop until shutdown.
///
/// `on_ready` receives the stop handle before the loop starts, for callers
/// that stop the process from another thread. Any failure after boot is
/// logged with its full cause chain before it is returned.
pub fn run<A, F>(args: &CommonArgs, build: F, on_ready: impl FnOnce(StopHandle)) -> Result<()>
where
    A: Application,
    F: FnOnce(&Node) -> Result<A>,
{
    let system = boot(args)?;
    let result = serve(&system, args, build, on_ready);
    if let Err(e) = &result {
        error!("node '{}' failed: {:#}", args.get_name(), e);
    }
    result
}

fn serve<A, F>(
    system: &System,
    args: &CommonArgs,
    build: F,
    on_ready: impl FnOnce(StopHandle),
) -> Result<()>
where
    A: Application,
    F: FnOnce(&Node) -> Result<A>,
{
    let name = args.get_name();
    let node = Node::new(system, &name, args.is_out_of_system())
        .with_context(|| format!("Failed to register node '{}'", name))?;
    let app = build(&node).with_context(|| format!("Failed to build node '{}'", name))?;
    let mut process = Process::new(node, app)?;
    on_ready(process.stop_handle());
    process.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl Application for Idle {}

    fn args(root: &std::path::Path, name: &str) -> CommonArgs {
        CommonArgs::parse_args(vec![
            "robot".into(),
            "--name".into(),
            name.into(),
            "--root-dir".into(),
            root.display().to_string(),
            "--out-of-system".into(),
        ])
    }

    #[test]
    fn test_build_failure_keeps_the_cause_chain() {
        let root = tempfile::tempdir().unwrap();
        let result = run(
            &args(root.path(), "broken"),
            |_node: &Node| -> Result<Idle> { Err(anyhow!("no order engine configured")) },
            |_stop| {},
        );

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Failed to build node 'broken'"));
        assert!(message.contains("no order engine configured"));
    }

    #[test]
    fn test_stop_handle_ends_the_node() {
        let root = tempfile::tempdir().unwrap();
        run(
            &args(root.path(), "stopped"),
            |_node: &Node| Ok(Idle),
            |stop| stop.stop(),
        )
        .unwrap();
        assert!(root.path().join("data").is_dir());
    }
}
