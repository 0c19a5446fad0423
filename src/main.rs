use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use points_ledger::Ledger;
use points_ledger::csv::{read_operations, write_balances};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "points-ledger", about = "Replay point operations and print payer balances")]
struct Args {
    /// CSV file with `op,payer,points,timestamp` rows
    input: PathBuf,

    /// Operations buffered between the reader and the ledger
    #[arg(long, default_value_t = 16)]
    channel_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if args.input.extension().is_none_or(|ext| ext != "csv") {
        warn!(path = %args.input.display(), "input file seems to not be a csv file");
    }

    let operations = read_operations(args.input.clone())?;

    let mut ledger = Ledger::new();
    let (op_sender, op_receiver) = tokio::sync::mpsc::channel(args.channel_capacity.max(1));

    tokio::spawn(async move {
        for result in operations {
            match result {
                Ok(op) => {
                    if op_sender.send(op).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    ledger.run(ReceiverStream::new(op_receiver)).await;

    write_balances(io::stdout().lock(), ledger.balances())?;
    Ok(())
}
