//! CLI smoke entry point.
//!
//! # Responsibility
//! - Refresh a small demo container to verify `bootweave_core` wiring.
//! - Print the refresh report as JSON so runs can be diffed.
//!
//! Usage: `bootweave_cli [settings.json]`

use bootweave_core::{
    init_logging, BootstrapContext, BootstrapSettings, ClassCatalog, ClassMetadata, EngineResult,
    FactoryMethodDecl, ScanDecl,
};
use std::process::ExitCode;
use std::rc::Rc;

fn demo_catalog() -> ClassCatalog {
    ClassCatalog::new()
        .with(
            ClassMetadata::new("demo.app.AppConfig")
                .configuration()
                .importing("demo.data.DataConfig")
                .scanning(ScanDecl::new("demo.app.web"))
                .with_factory_method(FactoryMethodDecl::new("clock", "demo.app.Clock")),
        )
        .with(
            ClassMetadata::new("demo.data.DataConfig")
                .configuration()
                .with_factory_method(FactoryMethodDecl::new("dataSource", "demo.data.DataSource"))
                .with_factory_method(
                    FactoryMethodDecl::new("cache", "demo.data.Cache").conditional_on("cache"),
                ),
        )
        .with(ClassMetadata::new("demo.app.web.HomeController").component())
}

fn load_settings() -> EngineResult<BootstrapSettings> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).map_err(|err| {
                bootweave_core::EngineError::Settings(format!("cannot read `{path}`: {err}"))
            })?;
            BootstrapSettings::from_json_str(&raw)
        }
        None => Ok(BootstrapSettings::default()),
    }
}

fn run() -> EngineResult<()> {
    let settings = load_settings()?;
    let log_dir = std::env::temp_dir().join("bootweave");
    init_logging(&settings.log_level, &log_dir.to_string_lossy())?;
    log::info!("event=cli_started module=cli version={}", bootweave_core::core_version());

    let mut ctx = BootstrapContext::new(settings, Rc::new(demo_catalog()))?;
    ctx.register_class("demo.app.AppConfig")?;
    let report = ctx.refresh()?;

    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| bootweave_core::EngineError::Settings(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bootweave_cli: {err}");
            ExitCode::FAILURE
        }
    }
}
