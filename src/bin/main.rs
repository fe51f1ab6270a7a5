use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use abistub::codegen::descriptor::return_category;
use abistub::codegen::flag::is_bodiless;
use abistub::codegen::ClassReader;
use abistub::Config;
use std::fs;

#[derive(Parser)]
#[command(name = "abistub")]
#[command(about = "Replace JVM method bodies with minimal stubs")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stub every concrete method of a .class file
    Stub {
        /// Input .class file
        #[arg(value_name = "IN")]
        input: PathBuf,

        /// Where to write the stubbed class
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,

        /// Error class thrown by stubbed constructors (dotted or internal form)
        #[arg(long, value_name = "NAME")]
        error_class: Option<String>,

        /// Skip the structural check of the produced class
        #[arg(long)]
        no_verify: bool,
    },

    /// List the methods of a .class file
    Dump {
        /// Input .class file
        #[arg(value_name = "IN")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Stub { input, output, error_class, no_verify } => {
            let mut config = Config::new().with_verify(!*no_verify);
            if let Some(name) = error_class {
                config = config.with_exception_class(name)?;
            }
            abistub::stub_file(input, output, &config)
                .with_context(|| format!("failed to stub {}", input.display()))?;
        }
        Commands::Dump { input } => {
            dump_file(input)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

fn dump_file(input: &Path) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("cannot read {}", input.display()))?;
    let reader = ClassReader::parse(&bytes)?;
    let class_file = reader.class_file();
    let pool = reader.constant_pool();

    println!("class {}", reader.class_name()?);
    for method in &class_file.methods {
        let name = pool.utf8(method.name_index)?;
        let descriptor = pool.utf8(method.descriptor_index)?;
        let category = return_category(descriptor)?;
        let body = match (is_bodiless(method.access_flags), method.code(pool)?) {
            (true, _) => "no body".to_string(),
            (false, Some(code)) => format!("code {} bytes, max_stack={}", code.code.len(), code.max_stack),
            (false, None) => "missing code".to_string(),
        };
        println!("  0x{:04x} {}{} -> {} [{}]", method.access_flags, name, descriptor, category, body);
    }
    Ok(())
}
