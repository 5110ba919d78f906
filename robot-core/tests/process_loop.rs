use anyhow::Result;
use robot::{FieldValue, NodeStatus, Object, Payload, ResetHint, TimerId};
use robot_core::fs::PathManager;
use robot_core::process::ControlCommand;
use robot_core::{Application, Config, HookResult, Node, Process, StopHandle, System};
use serde_json::json;
use std::time::Duration;

#[derive(Default)]
struct Probe {
    stop: Option<StopHandle>,
    fields: Vec<String>,
    resets: usize,
    reconfigs: usize,
    stops: usize,
    deactivates: usize,
    finished: bool,
}

impl Application for Probe {
    fn finish(&mut self, _node: &mut Node) {
        self.finished = true;
    }

    fn stop(&mut self, _node: &mut Node) -> HookResult {
        self.stops += 1;
        Ok(())
    }

    fn deactivate(&mut self, _node: &mut Node) -> HookResult {
        self.deactivates += 1;
        Ok(())
    }

    fn reset(&mut self, _node: &mut Node, _hint: ResetHint) -> HookResult {
        self.resets += 1;
        Ok(())
    }

    fn reconfig(&mut self, _node: &mut Node) -> HookResult {
        self.reconfigs += 1;
        Ok(())
    }

    fn on_field(&mut self, _node: &mut Node, name: &str, value: &FieldValue) -> HookResult {
        if name == "boom" {
            panic!("field handler exploded");
        }
        self.fields.push(format!("{}={}", name, value.as_string()));
        Ok(())
    }

    fn on_timer(&mut self, _node: &mut Node, _id: TimerId) -> HookResult {
        if let Some(stop) = &self.stop {
            stop.stop();
        }
        Ok(())
    }
}

fn field(name: &str, value: FieldValue) -> Object {
    Object::new(
        0,
        Payload::Field {
            name: name.into(),
            value,
        },
    )
}

fn probe_process(system: &System, name: &str) -> Result<Process<Probe>> {
    let config = Config::from_value(name, json!({ "node": { "wait_timeout_ms": 10 } }))?;
    let node = Node::with_config(system, name, true, config)?;
    let mut process = Process::new(node, Probe::default())?;
    let stop = process.stop_handle();
    process.app_mut().stop = Some(stop);
    Ok(process)
}

#[test]
fn test_panicking_handler_does_not_end_the_loop() -> Result<()> {
    let root = tempfile::tempdir()?;
    let system = System::new("test", PathManager::from_root(root.path()));
    let mut process = probe_process(&system, "probe")?;
    let id = process.node().id();

    process
        .node()
        .send_object(field("boom", FieldValue::Boolean(true)), id)?;
    process
        .node()
        .send_object(field("after", FieldValue::Integer(1)), id)?;
    process.node_mut().start_timer(Duration::from_millis(50));
    process.run()?;

    assert!(process.app().finished);
    assert!(!process.is_running());
    // the event queued behind the panicking one is still delivered
    assert_eq!(process.app().fields, vec!["after=1"]);
    assert_eq!(process.node().statistic()?.error_cnt, 1);
    Ok(())
}

#[test]
fn test_fields_reset_and_reconfig_reach_the_application() -> Result<()> {
    let root = tempfile::tempdir()?;
    let system = System::new("test", PathManager::from_root(root.path()));
    let mut process = probe_process(&system, "probe")?;
    let id = process.node().id();
    let node = process.node();

    node.send_object(field("limit", FieldValue::Integer(5)), id)?;
    node.send_object(
        ControlCommand::Reset(ResetHint::STATISTIC).to_object(),
        id,
    )?;
    node.send_object(ControlCommand::Reconfig.to_object(), id)?;
    node.event_sender().signal(libc::SIGHUP)?;

    let mut dispatched = 0;
    for _ in 0..50 {
        dispatched += process.receive()?;
        if dispatched >= 4 {
            break;
        }
    }

    let app = process.app();
    assert_eq!(app.fields, vec!["limit=5"]);
    assert_eq!(app.resets, 1);
    assert_eq!(app.reconfigs, 2);
    // all four events arrive in one batch, counted before the reset
    let statistic = process.node().statistic()?;
    assert_eq!(statistic.msg_out_cnt, 0);
    assert_eq!(statistic.msg_in_cnt, 0);
    assert!(process.is_running());
    Ok(())
}

#[test]
fn test_control_objects_respect_node_status() -> Result<()> {
    let root = tempfile::tempdir()?;
    let system = System::new("test", PathManager::from_root(root.path()));
    let mut process = probe_process(&system, "guarded")?;
    let id = process.node().id();
    assert_eq!(process.node().status()?, NodeStatus::Inactive);

    let node = process.node();
    node.send_object(ControlCommand::Deactivate.to_object(), id)?;
    node.send_object(ControlCommand::Stop.to_object(), id)?;
    node.send_object(ControlCommand::Stop.to_object(), id)?;

    let mut dispatched = 0;
    for _ in 0..50 {
        dispatched += process.receive()?;
        if dispatched >= 3 {
            break;
        }
    }

    assert_eq!(process.app().deactivates, 0);
    assert_eq!(process.app().stops, 1);
    assert_eq!(process.node().status()?, NodeStatus::Offline);
    Ok(())
}

#[test]
fn test_stop_handle_ends_run_from_another_thread() -> Result<()> {
    let root = tempfile::tempdir()?;
    let system = System::new("test", PathManager::from_root(root.path()));
    let mut process = probe_process(&system, "remote")?;
    let stop = process.stop_handle();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        stop.stop();
    });
    process.run()?;
    stopper.join().map_err(|_| anyhow::anyhow!("stopper panicked"))?;

    assert!(process.app().finished);
    Ok(())
}
