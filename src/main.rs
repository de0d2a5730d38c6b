// LOSAP Points - CLI driver
// Runs the import steps in the order given on the command line, then writes
// the points summary workbook. The GUI front-end drives the same library
// calls through its menus.

use anyhow::{bail, Result};
use std::env;
use std::path::{Path, PathBuf};

use losap_points::{
    default_output_path, write_xlsx, AttendanceImporter, CancelToken, EngineConfig, Ledger,
    NameNormalizer, ResponseLogImporter, SelfReportImporter, SourceImporter,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" {
        print_usage();
        return Ok(());
    }

    let mut config = EngineConfig::default();
    let mut ledger = Ledger::new();
    let mut output_path: Option<PathBuf> = None;
    let mut imported_anything = false;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = match args.get(i + 1) {
            Some(v) => v.as_str(),
            None => bail!("{} requires a value", flag),
        };
        i += 2;

        match flag {
            "--config" => {
                config = EngineConfig::load(Path::new(value))?;
                println!("✓ Loaded config from {}", value);
            }
            "--attendance" => {
                let names = NameNormalizer::with_corrections(config.name_corrections.clone());
                let import =
                    AttendanceImporter::new().import(Path::new(value), &config, &names)?;
                println!("✓ {}", import.report.summary());
                ledger.apply(&import.updates);
                imported_anything = true;
            }
            "--responses" => {
                let names = NameNormalizer::with_corrections(config.name_corrections.clone());
                let import =
                    ResponseLogImporter::new().import(Path::new(value), &config, &names)?;
                println!("✓ {}", import.report.summary());
                ledger.apply(&import.updates);
                imported_anything = true;
            }
            "--self-reports" => {
                let names = NameNormalizer::with_corrections(config.name_corrections.clone());
                let batch = SelfReportImporter::new().import_dir(
                    Path::new(value),
                    &config,
                    &names,
                    |progress| {
                        println!(
                            "  [{}/{}] {}",
                            progress.processed, progress.total, progress.file
                        );
                    },
                    &CancelToken::new(),
                )?;
                println!("✓ {}", batch.report.summary());
                for skipped in &batch.report.skipped {
                    eprintln!("  ! skipped {}: {}", skipped.path.display(), skipped.reason);
                }
                ledger.apply(&batch.updates);
                imported_anything = true;
            }
            "--out" => {
                output_path = Some(PathBuf::from(value));
            }
            other => bail!("unknown option: {}", other),
        }
    }

    if !imported_anything {
        println!("Nothing imported; nothing to export.");
        return Ok(());
    }

    let path = output_path.unwrap_or_else(|| default_output_path(&config));
    write_xlsx(&ledger, &path, &config.output_sheet_name)?;
    println!(
        "✓ Exported {} members to {} (sheet '{}')",
        ledger.len(),
        path.display(),
        config.output_sheet_name
    );

    Ok(())
}

fn print_usage() {
    println!("LOSAP Points Calculator {}", losap_points::VERSION);
    println!();
    println!("Usage: losap-points [OPTIONS]");
    println!();
    println!("Options (imports run in the order given):");
    println!("  --config <file>        Load engine settings from a JSON file");
    println!("  --attendance <file>    Import the I Am Responding report (xls)");
    println!("  --responses <file>     Import the ePCR report (csv)");
    println!("  --self-reports <dir>   Import member self-report spreadsheets (xlsx)");
    println!("  --out <file>           Output workbook path");
}
