use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use btidx::btree::{self, BTree, BTreeError, Key, Value};

//-------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "btidx")]
#[command(about = "Disk-resident B-tree index over u64 key/value pairs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh, empty index file
    Create { index: PathBuf },

    /// Insert a key/value pair
    Insert {
        index: PathBuf,
        key: u64,
        value: u64,
    },

    /// Look up a key and print its pair
    Search { index: PathBuf, key: u64 },

    /// Bulk insert key,value pairs from a CSV file
    Load { index: PathBuf, file: PathBuf },

    /// Print every pair in key order
    Print { index: PathBuf },
}

//-------------------------------------------------------------------------

fn parse_record(record: csv::Result<csv::StringRecord>) -> btree::Result<(Key, Value)> {
    let record = record.map_err(|e| BTreeError::BadPair(e.to_string()))?;

    if record.len() != 2 {
        return Err(BTreeError::BadPair(format!(
            "expected key,value but got {} fields",
            record.len()
        )));
    }

    let key = record[0]
        .parse::<Key>()
        .map_err(|_| BTreeError::BadPair(format!("bad key {:?}", &record[0])))?;
    let value = record[1]
        .parse::<Value>()
        .map_err(|_| BTreeError::BadPair(format!("bad value {:?}", &record[1])))?;

    Ok((key, value))
}

fn csv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("unable to read {}", path.display()))
}

//-------------------------------------------------------------------------

// Every command that opens the index closes it again on both the success
// and the error path, so the header gets rewritten either way.

fn run(cmd: Command) -> Result<()> {
    match cmd {
        Command::Create { index } => {
            BTree::create(index)?.close()?;
            Ok(())
        }

        Command::Insert { index, key, value } => {
            let mut tree = BTree::open(index)?;
            let res = tree.insert(key, value);
            let closed = tree.close();
            res?;
            closed?;
            Ok(())
        }

        Command::Search { index, key } => {
            let mut tree = BTree::open(index)?;
            let res = tree.lookup(key);
            let closed = tree.close();
            let found = res?;
            closed?;

            match found {
                Some(value) => {
                    println!("{} {}", key, value);
                    Ok(())
                }
                None => bail!("key {} not found", key),
            }
        }

        Command::Load { index, file } => {
            let reader = csv_reader(&file)?;
            let mut tree = BTree::open(index)?;
            let res = tree.load(reader.into_records().map(parse_record));
            let closed = tree.close();
            res?;
            closed?;
            Ok(())
        }

        Command::Print { index } => {
            let mut tree = BTree::open(index)?;
            let res = tree.traverse(&mut |k, v| println!("{} {}", k, v));
            let closed = tree.close();
            res?;
            closed?;
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    run(cli.command)
}

//-------------------------------------------------------------------------
