pub mod artifact;
pub mod generate;
pub mod page;
pub mod prompt;
pub mod session;

use anyhow::{Result, bail};

/// Converts a 1-based number typed by the user into an index.
pub(crate) fn to_index(number: usize, what: &str) -> Result<usize> {
    if number == 0 {
        bail!("{what} numbers start at 1");
    }
    Ok(number - 1)
}
