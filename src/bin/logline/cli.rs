// CLI argument definitions using clap

use clap::{Parser, ValueEnum};
use logline::log::{Destination, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "logline")]
#[command(author = "hatlonely <hatlonely@foxmail.com>")]
#[command(version = "0.1.0")]
#[command(about = "Format line-delimited JSON logs from stdin", long_about = None)]
pub struct Cli {
    /// Path to config file (.json, .json5, .yaml, .yml or .toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Emit canonical JSON instead of colorized text
    #[arg(long)]
    pub json: bool,

    /// Output target: a file path or a file descriptor number (default: stdout)
    #[arg(short, long)]
    pub dest: Option<String>,

    /// Width of the logger name column
    #[arg(long)]
    pub target_padding: Option<usize>,

    /// Timezone for timestamps: local, utc or an offset like +08:00
    #[arg(long)]
    pub timezone: Option<String>,

    /// When to use colors
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl Cli {
    /// Command line flags override values from the config file
    pub fn apply(&self, config: &mut PipelineConfig) {
        if self.json {
            config.json = true;
        }
        if let Some(dest) = &self.dest {
            config.dest = Some(Destination::parse(dest));
        }
        if let Some(padding) = self.target_padding {
            config.formatter.target_padding = padding;
        }
        if let Some(timezone) = &self.timezone {
            config.formatter.timestamp.timezone = timezone.clone();
        }
        match self.color {
            ColorChoice::Auto => {}
            ColorChoice::Always => config.formatter.colored = Some(true),
            ColorChoice::Never => config.formatter.colored = Some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "logline",
            "--json",
            "--dest",
            "3",
            "--target-padding",
            "12",
            "--timezone",
            "utc",
            "--color",
            "never",
        ]);
        let mut config = PipelineConfig::default();
        cli.apply(&mut config);

        assert!(config.json);
        assert_eq!(config.dest, Some(Destination::Fd(3)));
        assert_eq!(config.formatter.target_padding, 12);
        assert_eq!(config.formatter.timestamp.timezone, "utc");
        assert_eq!(config.formatter.colored, Some(false));
    }

    #[test]
    fn test_defaults_keep_config() {
        let cli = Cli::parse_from(["logline"]);
        let mut config = PipelineConfig::from_json("{ formatter: { colored: true } }").unwrap();
        cli.apply(&mut config);

        assert!(!config.json);
        assert_eq!(config.dest, None);
        assert_eq!(config.formatter.colored, Some(true));
    }
}
