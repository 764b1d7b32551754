//! Standalone exit helper.

use std::sync::Arc;

use crate::container::Container;
use crate::error::display_chain;
use crate::failure::exit_code::{ExitCodeGenerator, ExitCodeGenerators};
use crate::lifecycle::AppEvent;

/// Compute the exit code for a running application and close it.
///
/// `generators` are pooled with every container-managed
/// [`ExitCodeGenerator`]. Never fails: a problem is printed to stderr and the
/// result is at least 1.
pub fn exit(container: &Container, generators: &[Arc<dyn ExitCodeGenerator>]) -> i32 {
    let mut code = 0;
    let mut pool = ExitCodeGenerators::new();
    pool.add_all(generators);

    let outcome = container
        .components_of::<dyn ExitCodeGenerator>()
        .map_err(|err| Box::new(err) as crate::error::BoxError)
        .and_then(|managed| {
            for component in &managed {
                pool.add(component.instance.as_ref());
            }
            code = pool.exit_code();
            if code != 0 {
                container.publish_event(&mut AppEvent::ExitCode { code })?;
            }
            Ok(())
        });
    let closed = container.close();

    let failure = match (outcome, closed) {
        (Err(err), _) => Some(display_chain(&*err)),
        (Ok(()), Err(err)) => Some(display_chain(&err)),
        (Ok(()), Ok(())) => None,
    };
    if let Some(failure) = failure {
        eprintln!("{failure}");
        if code == 0 {
            code = 1;
        }
    }
    code
}
