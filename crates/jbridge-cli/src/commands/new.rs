//! `jbridge new`: Construct an object, then release it.

use jbridge::{Bridge, BoundaryConfig};

use crate::args::parse_args;
use crate::output::StyledOutput;

pub fn execute(
    out: &mut StyledOutput,
    config: &BoundaryConfig,
    class: &str,
    args: &[String],
) -> anyhow::Result<()> {
    let values = parse_args(args)?;
    let descriptor = jbridge::derive_constructor(&values)?;

    let bridge = Bridge::open(config)?;
    let object = bridge.construct(class, &values)?;

    out.field("Class", class);
    out.field("Signature", &descriptor);

    let released = object.release();
    out.field("Released", if released { "yes" } else { "already released" });
    out.flush();
    Ok(())
}
