use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "food-snap")]
#[command(about = "Photo-based nutrition summaries from a multimodal model", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the analysis bridge HTTP server
    Serve {
        /// Address to bind (overrides BIND_ADDR)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Upload a photo to a running bridge and print the summary
    Analyze {
        /// Image file to analyze
        #[arg(required = true)]
        file: PathBuf,

        /// Bridge base URL (overrides BRIDGE_URL)
        #[arg(short, long)]
        url: Option<String>,
    },
}

/// MIME type from the file extension; unknown extensions are not images.
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("meal.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("/tmp/plate.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("notes.txt")), "application/octet-stream");
        assert_eq!(mime_type_for(Path::new("no_extension")), "application/octet-stream");
    }

    #[test]
    fn test_parse_analyze_command() {
        let cli = Cli::try_parse_from(["food-snap", "analyze", "lunch.png", "--url", "http://bridge:8080"]).unwrap();
        match cli.command {
            Commands::Analyze { file, url } => {
                assert_eq!(file, PathBuf::from("lunch.png"));
                assert_eq!(url.as_deref(), Some("http://bridge:8080"));
            }
            _ => panic!("expected analyze"),
        }
    }
}
