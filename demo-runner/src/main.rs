//! Runs a toy market-making robot against a simulated exchange and feed.
//!
//! ```text
//! demo-runner --name mm --root-dir /tmp/robot --stdout --duration-secs 5
//! ```

mod market_maker;
mod sim;

use clap::Parser;
use log::info;
use market_maker::MarketMaker;
use robot_core::launcher;
use robot_core::{CommonArgs, Node, Robot};
use sim::{SimExchange, SimFeed};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct DemoArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Stop after this many seconds (0 runs until SIGTERM/SIGINT)
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,

    /// Interval between simulated book updates
    #[arg(long, default_value_t = 200)]
    feed_period_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let args = DemoArgs::parse();
    let feed_period = Duration::from_millis(args.feed_period_ms);

    let build = |node: &Node| {
        let exchange = SimExchange::new(node.event_sender());
        let feed = SimFeed::new(node.event_sender(), feed_period);
        Robot::for_node(node, Box::new(exchange), Box::new(feed), MarketMaker::default())
    };

    let duration_secs = args.duration_secs;
    launcher::run(&args.common, build, |stop| {
        if duration_secs == 0 {
            return;
        }
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(duration_secs));
            info!("demo time is up");
            stop.stop();
        });
    })
}
