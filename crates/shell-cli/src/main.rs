//! tabshell - command line tablet shell generator

mod args;

use clap::Parser;
use shell_core::{
    ShellError, ShellGenerator, ShellParams, Variant, WeldGroove, export_visible, write_report,
};

use args::Options;

fn main() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shell_core=info,shell_cad=info,tabshell=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = Options::parse();

    if let Err(e) = run(&options) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(options: &Options) -> Result<(), ShellError> {
    let mut params = match &options.params {
        Some(path) => {
            tracing::info!("Loading parameters from {}", path.display());
            ShellParams::load(path)?
        }
        None => ShellParams::default(),
    };
    if options.weld_groove && params.weld_groove.is_none() {
        params.weld_groove = Some(WeldGroove::default());
    }

    let variant = if options.engraved() {
        let mut text = params.text.clone();
        if let Some(font) = &options.font {
            text.font = font.clone();
        }
        if let Some(s) = &options.text {
            text.text = s.clone();
        }
        Variant::Engraved(text)
    } else {
        Variant::Plain
    };

    let kernel = options.kernel.build();
    let output = ShellGenerator::new(kernel.as_ref(), params).generate(variant)?;

    for record in &output.report.fillets {
        tracing::info!("Fillet {:?} r={}: {:?}", record.class, record.radius, record.outcome);
    }

    if options.no_export {
        tracing::info!("Export disabled, nothing written");
        return Ok(());
    }

    let resolution = options.resolution.unwrap_or(0.0);
    let written = export_visible(kernel.as_ref(), &output.document, &options.out, resolution)?;
    let report_path = options.out.join("report.json");
    write_report(&output.report, &report_path)?;

    tracing::info!(
        "Wrote {} meshes and {} to {}",
        written.len(),
        report_path.display(),
        options.out.display()
    );
    Ok(())
}
