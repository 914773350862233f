//! `jbridge call`: Call a static method by dotted path.

use anyhow::Context;
use jbridge::{Bridge, BoundaryConfig, Resolver, ReturnValue};

use crate::args::{parse_args, parse_return_kind, render};
use crate::output::StyledOutput;

pub fn execute(
    out: &mut StyledOutput,
    config: &BoundaryConfig,
    path: &str,
    args: &[String],
    returns: Option<&str>,
) -> anyhow::Result<()> {
    let values = parse_args(args)?;
    let kind = parse_return_kind(returns)?;

    let bridge = Bridge::open(config)?;
    let method = Resolver::new(&bridge)
        .resolve_path(path)?
        .into_method()
        .with_context(|| format!("`{}` does not name a method", path))?;

    let result = method.call_as(&values, kind)?;
    print_result(out, &result);

    // Objects are released when `result` drops, before the library unloads.
    drop(result);
    tracing::debug!(live = bridge.live_handles(), "call finished");
    Ok(())
}

fn print_result(out: &mut StyledOutput, result: &ReturnValue) {
    out.result(&render(result), result.kind_name());
    out.flush();
}
