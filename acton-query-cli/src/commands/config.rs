use acton_query::config::Config;
use anyhow::{Context, Result};

use super::Outcome;

pub fn execute(config: &Config) -> Result<Outcome> {
    print!("{}", render(config)?);
    Ok(Outcome::Done)
}

fn render(config: &Config) -> Result<String> {
    config
        .to_toml()
        .context("Failed to render configuration as TOML")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default() {
        let rendered = render(&Config::default()).unwrap();
        assert!(rendered.contains("[query]"));
        assert!(rendered.contains("default_page_size = 20"));
        assert!(rendered.contains("[logging]"));
        assert!(rendered.contains("level = \"info\""));
    }
}
