use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dotinterop - interop binding generation from Windows metadata
#[derive(Debug, Parser)]
#[command(name = "dotinterop", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate bindings for a builder configuration.
    Generate {
        /// Path to the JSON builder configuration.
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Metadata image to read instead of the configured WinMdPath.
        #[arg(long, value_name = "FILE")]
        winmd: Option<PathBuf>,

        /// Output directory instead of the configured OutputDirectoryPath.
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Produce the units without writing any file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which types a builder configuration selects.
    Select {
        /// Path to the JSON builder configuration.
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Metadata image to read instead of the configured WinMdPath.
        #[arg(long, value_name = "FILE")]
        winmd: Option<PathBuf>,
    },

    /// List type definitions of a metadata image.
    Types {
        /// Path to the WinMD file.
        #[arg(value_name = "WINMD")]
        path: PathBuf,

        /// Filter by namespace.
        #[arg(long)]
        namespace: Option<String>,

        /// Filter by kind: interface, structure, enum, delegate or class.
        #[arg(long)]
        kind: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_with_overrides() {
        let cli = Cli::parse_from([
            "dotinterop",
            "generate",
            "win32.json",
            "--winmd",
            "Windows.Win32.winmd",
            "-o",
            "out",
            "--json",
        ]);

        assert!(cli.global.json);
        assert!(!cli.global.verbose);
        match cli.command {
            Command::Generate {
                config,
                winmd,
                output,
                dry_run,
            } => {
                assert_eq!(config, PathBuf::from("win32.json"));
                assert_eq!(winmd, Some(PathBuf::from("Windows.Win32.winmd")));
                assert_eq!(output, Some(PathBuf::from("out")));
                assert!(!dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "dotinterop",
            "types",
            "Windows.Win32.winmd",
            "--namespace",
            "Windows.Win32.Foundation",
            "-v",
        ]);

        assert!(cli.global.verbose);
        match cli.command {
            Command::Types {
                path,
                namespace,
                kind,
            } => {
                assert_eq!(path, PathBuf::from("Windows.Win32.winmd"));
                assert_eq!(namespace.as_deref(), Some("Windows.Win32.Foundation"));
                assert!(kind.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_is_required() {
        assert!(Cli::try_parse_from(["dotinterop", "select"]).is_err());
        assert!(Cli::try_parse_from(["dotinterop", "generate"]).is_err());
    }
}
