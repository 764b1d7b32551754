//! Runner components called once the container is refreshed.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::application::ApplicationArguments;
use crate::container::Container;
use crate::error::{BoxError, BootError};
use crate::extension::sort_by_order;

/// Runner that receives the parsed arguments.
pub trait ApplicationRunner: Send + Sync {
    fn run(&self, args: &ApplicationArguments) -> Result<(), BoxError>;
}

/// Runner that receives the raw argument strings.
pub trait CommandLineRunner: Send + Sync {
    fn run(&self, args: &[String]) -> Result<(), BoxError>;
}

/// Which runner facet failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerKind {
    ApplicationRunner,
    CommandLineRunner,
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerKind::ApplicationRunner => f.write_str("ApplicationRunner"),
            RunnerKind::CommandLineRunner => f.write_str("CommandLineRunner"),
        }
    }
}

enum Runner {
    Application(Arc<dyn ApplicationRunner>),
    CommandLine(Arc<dyn CommandLineRunner>),
}

impl Runner {
    fn call(&self, args: &ApplicationArguments) -> Result<(), BootError> {
        let (kind, result) = match self {
            Runner::Application(runner) => (RunnerKind::ApplicationRunner, runner.run(args)),
            Runner::CommandLine(runner) => (RunnerKind::CommandLineRunner, runner.run(args.source_args())),
        };
        result.map_err(|source| BootError::Runner { kind, source })
    }
}

/// Call every runner in the container, lowest order first.
///
/// A component providing both facets is called once, as an application
/// runner. The first failure stops the remaining runners.
pub fn call_runners(container: &Container, args: &ApplicationArguments) -> Result<usize, BootError> {
    let mut seen = HashSet::new();
    let mut runners = Vec::new();

    for component in container.components_of::<dyn ApplicationRunner>()? {
        if seen.insert(component.name.clone()) {
            runners.push((component.order, component.name, Runner::Application(component.instance)));
        }
    }
    for component in container.components_of::<dyn CommandLineRunner>()? {
        if seen.insert(component.name.clone()) {
            runners.push((component.order, component.name, Runner::CommandLine(component.instance)));
        }
    }
    sort_by_order(&mut runners, |(order, _, _)| *order);

    for (_, name, runner) in &runners {
        tracing::debug!(runner = %name, "Calling runner");
        runner.call(args)?;
    }
    Ok(runners.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ComponentDefinition, ContainerKind};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recording {
        label: &'static str,
        log: Log,
        fail: bool,
    }

    impl Recording {
        fn push(&self, detail: String) -> Result<(), BoxError> {
            self.log.lock().unwrap().push(detail);
            if self.fail {
                return Err(format!("{} failed", self.label).into());
            }
            Ok(())
        }
    }

    impl ApplicationRunner for Recording {
        fn run(&self, args: &ApplicationArguments) -> Result<(), BoxError> {
            self.push(format!("{}:app:{}", self.label, args.non_option_args().len()))
        }
    }

    impl CommandLineRunner for Recording {
        fn run(&self, args: &[String]) -> Result<(), BoxError> {
            self.push(format!("{}:cli:{}", self.label, args.len()))
        }
    }

    fn app_runner(name: &'static str, order: i32, log: &Log, fail: bool) -> ComponentDefinition {
        let log = Arc::clone(log);
        ComponentDefinition::builder(name, move |_| {
            Ok(Recording {
                label: name,
                log: Arc::clone(&log),
                fail,
            })
        })
        .order(order)
        .provides::<dyn ApplicationRunner, _>(|r| r as Arc<dyn ApplicationRunner>)
        .build()
    }

    fn cli_runner(name: &'static str, order: i32, log: &Log) -> ComponentDefinition {
        let log = Arc::clone(log);
        ComponentDefinition::builder(name, move |_| {
            Ok(Recording {
                label: name,
                log: Arc::clone(&log),
                fail: false,
            })
        })
        .order(order)
        .provides::<dyn CommandLineRunner, _>(|r| r as Arc<dyn CommandLineRunner>)
        .build()
    }

    fn arguments() -> ApplicationArguments {
        ApplicationArguments::parse(vec!["--debug".to_string(), "input".to_string()]).unwrap()
    }

    #[test]
    fn test_runners_called_in_order_across_facets() {
        let log: Log = Arc::default();
        let container = Container::new(ContainerKind::Plain);
        container.definitions().register(app_runner("second", 2, &log, false)).unwrap();
        container.definitions().register(cli_runner("first", 1, &log)).unwrap();
        container.definitions().register(cli_runner("third", 3, &log)).unwrap();

        let called = call_runners(&container, &arguments()).unwrap();
        assert_eq!(called, 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:cli:2", "second:app:1", "third:cli:2"]
        );
    }

    #[test]
    fn test_component_with_both_facets_called_once() {
        let log: Log = Arc::default();
        let container = Container::new(ContainerKind::Plain);
        let both = {
            let log = Arc::clone(&log);
            ComponentDefinition::builder("both", move |_| {
                Ok(Recording {
                    label: "both",
                    log: Arc::clone(&log),
                    fail: false,
                })
            })
            .provides::<dyn ApplicationRunner, _>(|r| r as Arc<dyn ApplicationRunner>)
            .provides::<dyn CommandLineRunner, _>(|r| r as Arc<dyn CommandLineRunner>)
            .build()
        };
        container.definitions().register(both).unwrap();

        assert_eq!(call_runners(&container, &arguments()).unwrap(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["both:app:1"]);
    }

    #[test]
    fn test_first_failure_stops_remaining_runners() {
        let log: Log = Arc::default();
        let container = Container::new(ContainerKind::Plain);
        container.definitions().register(app_runner("broken", 1, &log, true)).unwrap();
        container.definitions().register(cli_runner("never", 2, &log)).unwrap();

        let err = call_runners(&container, &arguments()).unwrap_err();
        assert_eq!(err.to_string(), "Failed to execute ApplicationRunner");
        assert_eq!(*log.lock().unwrap(), vec!["broken:app:1"]);
    }
}
