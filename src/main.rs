use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use vascii::{ConverterConfig, FfmpegBackend, FfmpegConfig, FontPainter, GlyphRamp, GridWidth, Pipeline, ProgressPhase};

const RULE: &str = "========================================";

#[derive(Parser, Debug)]
#[command(version, about = "Convert a video into a colored ASCII art video.")]
struct Args {
    /// Input video file
    input: Option<PathBuf>,

    /// Output video file
    output: Option<PathBuf>,

    /// Grid width in glyph columns, 20-300 (default 80)
    grid_width: Option<String>,

    /// TrueType/OpenType font used to draw glyphs (default: a monospace system font)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Glyph height as a fraction of the cell height
    #[arg(long)]
    font_scale: Option<f32>,

    /// Cell width in pixels
    #[arg(long)]
    cell_width: Option<u32>,

    /// Cell height in pixels
    #[arg(long)]
    cell_height: Option<u32>,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe executable
    #[arg(long, default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Print the glyph ramp and the first frame's first cells
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Show a progress bar instead of progress lines
    #[arg(long, default_value_t = false)]
    bar: bool,
}

fn usage() -> String {
    let mut cmd = Args::command();
    format!(
        "{}\nExample: vascii input.mp4 ascii.mp4\nExample: vascii miku.mp4 ascii.mp4 120\nSuggested grid width: 60-150 (wider is sharper but makes bigger files)",
        cmd.render_usage()
    )
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    let (Some(input), Some(output)) = (args.input.clone(), args.output.clone()) else {
        println!("{}", usage());
        return ExitCode::from(1);
    };

    // Checked before anything touches the filesystem.
    let grid_width = match args.grid_width.as_deref().map(GridWidth::parse).transpose() {
        Ok(width) => width.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", usage());
            return ExitCode::from(1);
        }
    };

    match run(&args, &input, &output, grid_width) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", RULE);
            eprintln!("Error: {:#}", e);
            eprintln!("Conversion failed!");
            eprintln!("{}", RULE);
            ExitCode::from(1)
        }
    }
}

fn build_config(args: &Args) -> ConverterConfig {
    let mut config = ConverterConfig::default();
    if let Some(scale) = args.font_scale {
        config = config.with_font_scale(scale);
    }
    if args.cell_width.is_some() || args.cell_height.is_some() {
        let width = args.cell_width.unwrap_or(config.cell.width);
        let height = args.cell_height.unwrap_or(config.cell.height);
        config = config.with_cell_size(width, height);
    }
    config
}

fn print_ramp_table(ramp: &GlyphRamp) {
    println!("Glyph ramp: {}", ramp.glyphs().iter().collect::<String>());
    println!("Glyph count: {}", ramp.len());
    println!("Brightness per glyph:");
    for (i, (glyph, brightness)) in ramp.levels().enumerate() {
        print!("'{}' -> {:.2}", glyph, brightness);
        if i % 8 == 7 {
            println!();
        } else {
            print!(" | ");
        }
    }
    println!();
}

fn new_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        }
        None => ProgressBar::new_spinner(),
    }
}

fn run(args: &Args, input: &Path, output: &Path, grid_width: GridWidth) -> Result<()> {
    let painter = match &args.font {
        Some(path) => FontPainter::from_path(path)?,
        None => FontPainter::discover()?,
    };
    let backend = FfmpegBackend::new(FfmpegConfig {
        ffmpeg: args.ffmpeg.clone(),
        ffprobe: args.ffprobe.clone(),
    });
    let mut pipeline = Pipeline::new(build_config(args), backend, painter)?;

    println!("{}", RULE);
    println!("Colored ASCII video converter");
    println!("{}", RULE);
    println!("Font: {}", pipeline.rasterizer().painter().path().display());

    if args.debug {
        print_ramp_table(pipeline.rasterizer().ramp());
        pipeline = pipeline.with_cell_trace(|trace| {
            let cell = &trace.cell;
            if trace.frame == 0 && cell.column < 3 && cell.row < 2 {
                println!(
                    "Cell ({},{}): brightness={:.3}, glyph='{}'",
                    cell.column,
                    cell.row,
                    cell.brightness.value(),
                    cell.glyph
                );
            }
        });
    }

    let use_bar = args.bar;
    let mut bar: Option<ProgressBar> = None;
    let result = pipeline.convert(input, output, grid_width, |progress| match progress.phase {
        ProgressPhase::Opened => {
            println!("{}", progress.message);
            println!("Converting video...");
            if use_bar {
                bar = Some(new_bar(progress.total));
            }
        }
        ProgressPhase::Converting => match &bar {
            Some(pb) => pb.set_position(progress.completed),
            None => println!("{}", progress.message),
        },
        ProgressPhase::Complete => {
            if let Some(pb) = bar.take() {
                pb.finish_with_message("Done");
            }
            println!("{}", progress.message);
        }
    });
    if let Some(pb) = bar.take() {
        pb.abandon();
    }
    result?;

    println!("Output file: {}", output.display());
    println!("{}", RULE);
    println!("Successfully created colored ASCII art video!");
    println!("{}", RULE);
    Ok(())
}
