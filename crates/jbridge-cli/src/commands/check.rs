//! `jbridge check`: Load the boundary library and bind every entry point.

use anyhow::Context;
use jbridge::{BoundaryConfig, NativeBoundary};
use jbridge_sdk::SYMBOL_NAMES;

use crate::output::StyledOutput;

pub fn execute(out: &mut StyledOutput, config: &BoundaryConfig) -> anyhow::Result<()> {
    let boundary = NativeBoundary::open(&config.library, &config.symbol_prefix)
        .with_context(|| format!("checking {}", config.library))?;

    out.field("Library", boundary.path());
    if !config.symbol_prefix.is_empty() {
        out.field("Prefix", &config.symbol_prefix);
    }
    for symbol in SYMBOL_NAMES {
        out.bound(&format!("{}{}", config.symbol_prefix, symbol));
    }
    out.success(&format!("All {} entry points bound", SYMBOL_NAMES.len()));
    out.flush();
    Ok(())
}
