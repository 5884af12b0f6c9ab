// aidetect - chunked AI-text detection for text, PPTX, PDF and images
use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use aidetect::classifier::OnnxLoader;
use aidetect::cli::{Cli, Command, DetectArgs, ExtractArgs, OutputFormat};
use aidetect::config::{Settings, PRESET_MODELS};
use aidetect::logging::init_tracing;
use aidetect::report;
use aidetect::{AppContext, DetectRequest, DetectorError, InputSource};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Detect(args) => run_detect(settings, args).await,
        Command::Extract(args) => run_extract(settings, args),
        Command::Models => run_models(&settings),
    }
}

async fn run_detect(mut settings: Settings, args: DetectArgs) -> Result<ExitCode> {
    args.apply(&mut settings);
    settings.validate().context("invalid option")?;
    let display = args.display_options(&settings);

    let source = args
        .source
        .clone()
        .into_source(args.mode)
        .context("failed to read stdin")?;
    let request = DetectRequest {
        source,
        model: settings.detector.model.clone(),
        chunk_size: settings.detector.chunk_size,
        workers: settings.detector.workers,
    };

    let ctx = AppContext::new(settings);
    let outcome = match ctx.detect(&request).await {
        Ok(outcome) => outcome,
        Err(DetectorError::EmptyInput) => {
            eprintln!("warning: {}", DetectorError::EmptyInput);
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(e).context("detection failed"),
    };

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }

    let rendered = match args.format {
        OutputFormat::Text => report::render_text(&outcome.model_id, &outcome.detection, &display),
        OutputFormat::Json => report::render_json(&outcome.model_id, &outcome.detection, &display)
            .context("failed to serialize report")?,
    };
    println!("{}", rendered.trim_end());
    Ok(ExitCode::SUCCESS)
}

fn run_extract(settings: Settings, args: ExtractArgs) -> Result<ExitCode> {
    let ctx = AppContext::new(settings);
    let source = InputSource::File {
        path: args.file.clone(),
        mode: args.mode,
    };
    let text = ctx
        .extract(&source)
        .with_context(|| format!("failed to extract {}", args.file.display()))?;
    println!("{text}");
    Ok(ExitCode::SUCCESS)
}

fn run_models(settings: &Settings) -> Result<ExitCode> {
    let loader = OnnxLoader::new(settings.detector.models_dir.clone());
    println!("Models directory: {}", settings.detector.models_dir.display());
    for model_id in PRESET_MODELS {
        let dir = loader.model_dir(model_id)?;
        let status = if dir.join("model.onnx").is_file() {
            "installed"
        } else {
            "missing"
        };
        let marker = if *model_id == settings.detector.model { "*" } else { " " };
        println!("{marker} {model_id:<32} {status}");
    }
    Ok(ExitCode::SUCCESS)
}
