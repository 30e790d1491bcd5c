use crate::cli::args::{Cli, Commands};
use crate::config::RunConfig;
use crate::error::Result;
use crate::processors::{
    ClimatologyAverager, DiagnosticReport, Pipeline, PointRasterizer, RasterOutput,
};
use crate::utils::progress::ProgressReporter;

pub fn run(cli: Cli) -> Result<()> {
    let mut config = RunConfig::load(cli.config.as_deref())?;
    let silent = cli.quiet;

    match cli.command {
        Commands::Run {
            input_dir,
            output_dir,
            max_workers,
        } => {
            if let Some(dir) = input_dir {
                config.input_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            let config = config.checked()?;

            println!("Processing daily rainfall...");
            println!("Input directory: {}", config.input_dir.display());
            println!("Output directory: {}", config.output_dir.display());
            println!(
                "Cell size: {}, Merge: {:?}, Grid sizing: {:?}, Workers: {}",
                config.cell_size, config.merge_mode, config.grid_sizing, config.max_workers
            );

            let progress = ProgressReporter::new_spinner("Running pipeline...", silent);
            let pipeline = Pipeline::new(config);
            let report = pipeline.run(Some(&progress))?;
            progress.finish_with_message(&format!("Wrote {} outputs", report.output_count()));

            println!("\n{}", report.diagnostics.generate_summary());
            println!("Monthly tables: {}", report.monthly_tables.len());
            match report.merged_table {
                Some(ref path) => println!("Merged table: {}", path.display()),
                None => println!("Merged table: not written"),
            }
            println!("Monthly rasters: {}", report.monthly_rasters.len());
            println!("Climatology rasters: {}", report.climatology_rasters.len());
            println!("Run report: {}", pipeline.config().run_report_file().display());
        }

        Commands::Aggregate {
            input_dir,
            output_dir,
        } => {
            if let Some(dir) = input_dir {
                config.input_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            let config = config.checked()?;
            config.prepare_directories()?;

            let progress = ProgressReporter::new_spinner("Aggregating daily files...", silent);
            let pipeline = Pipeline::new(config);
            let (written, report) = pipeline.aggregate(Some(&progress))?;
            progress.finish_with_message(&format!("Wrote {} monthly tables", written.len()));

            print_summary(&report);
            for path in &written {
                println!("  {}", path.display());
            }
        }

        Commands::Merge { output_dir } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            let config = config.checked()?;
            config.prepare_directories()?;

            let progress = ProgressReporter::new_spinner("Merging monthly tables...", silent);
            let pipeline = Pipeline::new(config);
            let (merged, report) = pipeline.merge()?;

            match merged {
                Some((path, table)) => {
                    progress.finish_with_message(&format!(
                        "Merged {} stations x {} months",
                        table.station_count(),
                        table.columns().len()
                    ));
                    print_summary(&report);
                    println!("Merged table: {}", path.display());
                }
                None => {
                    progress.finish_with_message("Nothing to merge");
                    print_summary(&report);
                }
            }
        }

        Commands::Rasterize { input, output_dir } => {
            let output_dir = output_dir.unwrap_or_else(|| config.monthly_raster_dir());
            std::fs::create_dir_all(&output_dir)?;

            let progress = ProgressReporter::new_spinner("Rasterizing points...", silent);
            let rasterizer = PointRasterizer::from_config(&config);
            let (outputs, report) = rasterizer.rasterize_file(&input, &output_dir, config.schema_mode)?;
            progress.finish_with_message(&format!("Wrote {} rasters", outputs.len()));

            print_summary(&report);
            print_rasters(&outputs);
        }

        Commands::Climatology { input, output_dir } => {
            let output_dir = output_dir.unwrap_or_else(|| config.climatology_raster_dir());
            std::fs::create_dir_all(&output_dir)?;

            let progress = ProgressReporter::new_spinner("Computing climatology...", silent);
            let averager = ClimatologyAverager::from_config(&config);
            let (outputs, report) = averager.rasterize_file(&input, &output_dir)?;
            progress.finish_with_message(&format!("Wrote {} climatology rasters", outputs.len()));

            print_summary(&report);
            print_rasters(&outputs);
        }
    }

    Ok(())
}

fn print_summary(report: &DiagnosticReport) {
    println!("\n{}", report.generate_summary());
}

fn print_rasters(outputs: &[RasterOutput]) {
    for output in outputs {
        println!(
            "  {} ({}x{}, {} data cells)",
            output.path.display(),
            output.width,
            output.height,
            output.data_cells
        );
    }
}
