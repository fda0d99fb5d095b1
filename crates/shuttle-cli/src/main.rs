//! Shuttle reader simulator.
//!
//! Replays a detect/swipe scenario against the mock driver and prints every
//! reply as a JSON line, in the shape the host bridge receives.
//!
//! ```text
//! shuttle-sim --scenario swipe
//! shuttle-sim --scenario cancel
//! RUST_LOG=debug shuttle-sim --scenario timeout
//! shuttle-sim --scenario swipe --unplugged
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde_json::json;
use shuttle_core::Action;
use shuttle_hardware::mock::{MockDriver, MockDriverHandle};
use shuttle_hardware::{HeadsetMonitor, PlugEvent};
use shuttle_reader::{ReaderConfig, Replies, Reply, ShuttleReader};
use std::time::Duration;
use tracing::info;

/// Driver behaviour to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Handshake succeeds and a card is swiped.
    Swipe,
    /// Handshake succeeds but the user never swipes.
    Timeout,
    /// Handshake succeeds and a card without track 2 is swiped.
    NoTrack2,
    /// The reader never answers the handshake.
    HandshakeTimeout,
    /// The swipe is cancelled while the reader is armed.
    Cancel,
}

#[derive(Parser, Debug)]
#[command(name = "shuttle-sim")]
#[command(about = "Replay Shuttle card reader scenarios against a mock driver", long_about = None)]
struct Args {
    /// Scenario to replay.
    #[arg(long, value_enum, default_value = "swipe")]
    scenario: Scenario,

    /// Simulate an empty headset jack.
    #[arg(long)]
    unplugged: bool,

    /// Track data delivered for a swipe.
    #[arg(long, default_value = ";4111111111111111=25121010000000000000?")]
    track: String,

    /// Swipe timeout requested from the driver, in seconds.
    #[arg(long, default_value_t = 60)]
    swipe_timeout: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let (driver, handle) = MockDriver::new();
    let headset = HeadsetMonitor::new();
    if !args.unplugged {
        headset.on_plug_event(PlugEvent::plugged_with_microphone());
    }

    let config = ReaderConfig {
        swipe_timeout_secs: args.swipe_timeout,
        ..Default::default()
    };
    let reader = ShuttleReader::with_config(driver, headset, config)
        .context("invalid reader configuration")?;

    info!("Replaying {:?} scenario", args.scenario);
    let result = run(&reader, &handle, &args).await;
    reader.shutdown().await;
    result
}

async fn run(
    reader: &ShuttleReader<MockDriver>,
    handle: &MockDriverHandle,
    args: &Args,
) -> Result<()> {
    let mut detect = reader.dispatch(Action::DetectReader);
    if reader.has_connection() {
        match args.scenario {
            Scenario::HandshakeTimeout => handle.handshake_timeout()?,
            _ => handle.connected()?,
        }
    }
    let detected = print_until_terminal(Action::DetectReader, &mut detect).await?;
    if !detected.is_success() {
        return Ok(());
    }

    let mut swipe = reader.dispatch(Action::GetSwipe);
    handle.serial_number_ack()?;
    handle.swipe_armed()?;

    match args.scenario {
        Scenario::Swipe => handle.card_data(0, args.track.as_bytes())?,
        Scenario::NoTrack2 => handle.card_data(0, b"%B4111111111111111^DOE/JOHN^2512101?")?,
        Scenario::Timeout => handle.card_data(0x01, &[0xff; 16])?,
        Scenario::Cancel => {
            // Wait for the reader to be armed before cancelling.
            print(Action::GetSwipe, &next(&mut swipe).await?);

            let mut cancel = reader.dispatch(Action::CancelSwipe);
            print_until_terminal(Action::GetSwipe, &mut swipe).await?;

            handle.disconnected()?;
            print_until_terminal(Action::CancelSwipe, &mut cancel).await?;
            return Ok(());
        }
        Scenario::HandshakeTimeout => bail!("handshake unexpectedly succeeded"),
    }

    print_until_terminal(Action::GetSwipe, &mut swipe).await?;
    Ok(())
}

async fn next(replies: &mut Replies) -> Result<Reply> {
    tokio::time::timeout(Duration::from_secs(5), replies.next())
        .await
        .context("timed out waiting for reply")?
        .context("request dropped without a reply")
}

async fn print_until_terminal(action: Action, replies: &mut Replies) -> Result<Reply> {
    loop {
        let reply = next(replies).await?;
        print(action, &reply);
        if reply.is_terminal() {
            return Ok(reply);
        }
    }
}

fn print(action: Action, reply: &Reply) {
    println!(
        "{}",
        json!({ "action": action.as_str(), "reply": reply.to_json() })
    );
}
