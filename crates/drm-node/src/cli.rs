use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "drm-node", about = "Peer-to-peer digital-rights registry node")]
pub struct Cli {
    /// Data directory holding the node's KV store.
    #[arg(long, env = "DRM_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Directory holding the sealed wallet key material.
    #[arg(long, env = "DRM_KEY_DIR", default_value = "./keys")]
    pub key_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full node: validator tasks, gossip, ledger replication.
    Serve,
    /// Upload a file to the content store and register it on the ledger.
    Upload {
        #[arg(long, short = 'f')]
        file: PathBuf,
        #[arg(long, default_value = "view")]
        license: String,
    },
    /// Purchase a license for an already-registered asset.
    Purchase {
        #[arg(long, short = 'a')]
        asset: String,
    },
    /// Check a license and print the content store's gateway URL.
    Access {
        #[arg(long, short = 'a')]
        asset: String,
    },
    /// List every asset registered on the local ledger replica.
    ListAssets,
    /// List assets owned by or licensed to the local wallet identity.
    MyAssets,
    /// Dump the local chain.
    Blockchain {
        #[arg(long, short = 'v')]
        verbose: bool,
    },
}
