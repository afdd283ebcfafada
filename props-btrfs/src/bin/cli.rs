// SPDX-License-Identifier: GPL-3.0-only

//! CLI wrapper around the props-btrfs library for manual operations

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use props_btrfs::{ObjectType, PROPERTIES, applicable_to, lookup};
use std::path::PathBuf;

/// Property tool for BTRFS filesystem objects
#[derive(Parser)]
#[command(name = "props-btrfs-cli")]
#[command(about = "Get and set properties of btrfs objects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ObjectKind {
    Subvol,
    Device,
    Root,
    Inode,
}

impl From<ObjectKind> for ObjectType {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Subvol => ObjectType::Subvolume,
            ObjectKind::Device => ObjectType::Device,
            ObjectKind::Root => ObjectType::Root,
            ObjectKind::Inode => ObjectType::Inode,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Read one property of an object
    Get {
        /// Kind of object the path refers to
        #[arg(value_enum)]
        object_type: ObjectKind,
        /// Path of the object
        path: PathBuf,
        /// Property name
        name: String,
    },
    /// Write one property of an object
    Set {
        /// Kind of object the path refers to
        #[arg(value_enum)]
        object_type: ObjectKind,
        /// Path of the object
        path: PathBuf,
        /// Property name
        name: String,
        /// New value
        value: String,
    },
    /// List known properties, optionally only those applicable to one
    /// object type
    List {
        #[arg(value_enum)]
        object_type: Option<ObjectKind>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Get {
            object_type,
            path,
            name,
        } => {
            let Some(descriptor) = lookup(&name) else {
                bail!("unknown property: {name}");
            };
            // An unset property yields no line at all.
            if let Some(value) = descriptor.get(object_type.into(), &path)? {
                println!("{name}={value}");
            }
        }
        Commands::Set {
            object_type,
            path,
            name,
            value,
        } => {
            let Some(descriptor) = lookup(&name) else {
                bail!("unknown property: {name}");
            };
            descriptor.set(object_type.into(), &path, &value)?;
        }
        Commands::List { object_type } => match object_type {
            Some(kind) => {
                for descriptor in applicable_to(kind.into()) {
                    println!("{}: {}", descriptor.name, descriptor.description);
                }
            }
            None => {
                for descriptor in PROPERTIES {
                    let types: Vec<String> = descriptor
                        .types
                        .iter()
                        .map(|object_type| object_type.to_string())
                        .collect();
                    println!(
                        "{} ({}): {}",
                        descriptor.name,
                        types.join(", "),
                        descriptor.description
                    );
                }
            }
        },
    }

    Ok(())
}
