//! `jbridge signature`: Derive a method descriptor offline.

use anyhow::bail;

use crate::args::{parse_args, parse_return_kind};
use crate::output::StyledOutput;

pub fn execute(
    out: &mut StyledOutput,
    args: &[String],
    returns: Option<&str>,
    constructor: bool,
) -> anyhow::Result<()> {
    let values = parse_args(args)?;
    let kind = parse_return_kind(returns)?;

    let descriptor = if constructor {
        if kind.is_some() {
            bail!("--returns cannot be combined with --constructor");
        }
        jbridge::derive_constructor(&values)?
    } else {
        jbridge::derive(&values, kind)?
    };

    out.descriptor(&descriptor);
    out.flush();
    Ok(())
}
