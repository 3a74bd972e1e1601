use clap::Parser;
use std::path::PathBuf;
use std::process;

use dsdlc_compiler::gen_c::CGenerator;
use dsdlc_compiler::parser::DsdlParser;
use dsdlc_compiler::{compile, CompileOptions};

#[derive(Parser)]
#[command(name = "dsdlc")]
#[command(about = "Compile DSDL type definitions into C headers and sources", long_about = None)]
struct Cli {
    /// Root namespace directory with DSDL files to compile (repeatable)
    #[arg(short = 'd', long = "dsdl", required = true)]
    dsdl: Vec<PathBuf>,

    /// Additional root namespace directory with referenced types (repeatable)
    #[arg(short = 'I', long = "include")]
    include: Vec<PathBuf>,

    /// Output directory for the generated tree
    #[arg(short, long)]
    outdir: PathBuf,

    /// Append the code text into each header instead of writing .c files
    #[arg(long)]
    header_only: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Source directories are searchable for references as well.
    let mut search_dirs = cli.include.clone();
    search_dirs.extend(cli.dsdl.iter().cloned());

    let options = CompileOptions {
        source_dirs: cli.dsdl,
        search_dirs,
        output_dir: cli.outdir,
        header_only: cli.header_only,
    };

    match compile(&DsdlParser, &CGenerator, &options) {
        Ok(report) => {
            println!(
                "Generated {} file(s), {} unchanged",
                report.written, report.unchanged
            );
        }
        Err(err) => {
            eprintln!("dsdlc: {err}");
            process::exit(1);
        }
    }
}
