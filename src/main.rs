//! Demo application.
//!
//! ```text
//! liftoff [--metrics-address 127.0.0.1:9000] [-- --greeting.name=Ada extra]
//! ```
//!
//! Runs a small catalog of runners through the full lifecycle, then exits
//! with the code resolved from the container.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;

use liftoff::application::ApplicationBuilder;
use liftoff::container::{ComponentDefinition, Container, SourceCatalog};
use liftoff::failure::{self, ExitCodeGenerator, FailureHandler};
use liftoff::lifecycle::{listener_fn, AppEvent, ApplicationRunner, CommandLineRunner};
use liftoff::{ApplicationArguments, BoxError};

#[derive(Parser)]
#[command(name = "liftoff")]
#[command(about = "Runs the liftoff demo application", long_about = None)]
struct Cli {
    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,

    /// Arguments handed to the application.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

struct Greeter {
    name: String,
}

impl ApplicationRunner for Greeter {
    fn run(&self, args: &ApplicationArguments) -> Result<(), BoxError> {
        tracing::info!(non_option_args = ?args.non_option_args(), "Hello, {}!", self.name);
        Ok(())
    }
}

struct ArgumentCounter;

impl CommandLineRunner for ArgumentCounter {
    fn run(&self, args: &[String]) -> Result<(), BoxError> {
        tracing::info!(count = args.len(), "Received arguments");
        Ok(())
    }
}

struct Clean;

impl ExitCodeGenerator for Clean {
    fn exit_code(&self) -> i32 {
        0
    }
}

fn greeter(container: &Container) -> Result<Greeter, BoxError> {
    let name = container
        .environment()
        .get_or("greeting.name", "world".to_string())?;
    Ok(Greeter { name })
}

fn catalog() -> SourceCatalog {
    SourceCatalog::new()
        .source("demo.Main", |ctx| {
            vec![ComponentDefinition::builder(ctx.default_name.clone(), greeter)
                .order(1)
                .provides::<dyn ApplicationRunner, _>(|g| g as Arc<dyn ApplicationRunner>)
                .build()]
        })
        .source("demo.jobs.ArgumentCounter", |ctx| {
            vec![ComponentDefinition::builder(ctx.default_name.clone(), |_| Ok(ArgumentCounter))
                .order(2)
                .provides::<dyn CommandLineRunner, _>(|c| c as Arc<dyn CommandLineRunner>)
                .build()]
        })
        .source("demo.jobs.Clean", |ctx| {
            vec![ComponentDefinition::builder(ctx.default_name.clone(), |_| Ok(Clean))
                .provides::<dyn ExitCodeGenerator, _>(|c| c as Arc<dyn ExitCodeGenerator>)
                .build()]
        })
}

fn main() {
    let cli = Cli::parse();
    liftoff::observability::init_logging("liftoff=info");

    if let Some(addr) = cli.metrics_address {
        if let Err(err) = liftoff::observability::init_metrics(addr) {
            tracing::error!(metrics_address = %addr, error = %err, "Failed to install metrics exporter");
        }
    }

    let application = ApplicationBuilder::new(["demo.Main"])
        .main_name("liftoff-demo")
        .source("demo.jobs.*")
        .definition_loader(Arc::new(catalog()))
        .listener(listener_fn(|event| {
            if let AppEvent::Ready { time_taken, .. } = event {
                tracing::info!(ready_ms = time_taken.as_millis() as u64, "Demo ready");
            }
            Ok(())
        }))
        .build();

    let application = match application {
        Ok(application) => application,
        Err(err) => {
            tracing::error!(error = %err, "Extension discovery failed");
            std::process::exit(1);
        }
    };

    match application.run(cli.args) {
        Ok(container) => std::process::exit(failure::exit(&container, &[])),
        Err(_) => {
            let code = FailureHandler::current()
                .map(|handler| handler.exit_code())
                .filter(|code| *code != 0)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}
