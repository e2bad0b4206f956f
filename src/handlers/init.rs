use anyhow::Result;

use crate::{config::Config, prompts::install_defaults};

pub fn run(cfg: &Config) -> Result<()> {
    let written = install_defaults(cfg)?;
    if written.is_empty() {
        println!("Prompt files already present in {}", cfg.prompts_dir().display());
    }
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
