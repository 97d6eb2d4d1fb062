//! URL collection and batch bookkeeping for the command line front end.

use crate::fetch::{Fetcher, Outcome};
use log::{debug, info};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

const PROMPT: &str = "Please enter image URLs (comma-separated): ";

/// Where the list of URLs comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    /// URLs given as positional arguments
    Args(Vec<String>),
    /// File with comma or newline separated URLs (`-` for stdin)
    File(PathBuf),
    /// Ask for one comma-separated line interactively
    Prompt,
}

impl UrlSource {
    /// Positional arguments win over an input file; with neither, prompt.
    pub fn select(args: Vec<String>, input: Option<PathBuf>) -> Self {
        if !args.is_empty() {
            UrlSource::Args(args)
        } else if let Some(path) = input {
            UrlSource::File(path)
        } else {
            UrlSource::Prompt
        }
    }

    pub fn collect(self) -> io::Result<Vec<String>> {
        match self {
            UrlSource::Args(args) => Ok(args
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect()),
            UrlSource::File(path) => {
                let text = if path.as_os_str() == "-" {
                    let mut content = String::new();
                    io::stdin().read_to_string(&mut content)?;
                    content
                } else {
                    fs::read_to_string(&path)?
                };
                Ok(parse_url_list(&text))
            }
            UrlSource::Prompt => {
                let mut stdout = io::stdout();
                write!(stdout, "{}", PROMPT)?;
                stdout.flush()?;
                let mut line = String::new();
                io::stdin().lock().read_line(&mut line)?;
                Ok(parse_url_list(&line))
            }
        }
    }
}

/// Split on commas and newlines, trim, and drop empty entries and `#` comment lines.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Per-batch tally of outcomes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub fetched: usize,
    pub duplicates: usize,
    pub not_images: usize,
    pub errors: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Fetched { .. } => self.fetched += 1,
            Outcome::SkippedDuplicate { .. } => self.duplicates += 1,
            Outcome::SkippedNotImage { .. } => self.not_images += 1,
            Outcome::SkippedError(_) => self.errors += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.duplicates + self.not_images + self.errors
    }

    pub fn total(&self) -> usize {
        self.fetched + self.skipped()
    }

    pub fn render(&self) -> String {
        format!(
            "Summary:\n   Fetched: {}\n   Skipped: {} (duplicates: {}, not images: {}, errors: {})",
            self.fetched,
            self.skipped(),
            self.duplicates,
            self.not_images,
            self.errors
        )
    }
}

/// Fetch every URL in order, one at a time.
pub fn run_batch(fetcher: &mut Fetcher, urls: &[String]) -> Summary {
    let mut summary = Summary::default();
    for url in urls {
        let outcome = fetcher.fetch(url);
        summary.record(&outcome);
    }
    debug!("Processed {} URL(s)", summary.total());
    if summary.errors > 0 {
        info!("{} URL(s) failed", summary.errors);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use tempfile::TempDir;

    #[test]
    fn test_parse_url_list_commas() {
        assert_eq!(
            parse_url_list("https://a.com/x.png, https://b.com/y.jpg ,,https://c.com/z\n"),
            vec![
                "https://a.com/x.png".to_string(),
                "https://b.com/y.jpg".to_string(),
                "https://c.com/z".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_url_list_lines_and_comments() {
        let text = "# favourites\nhttps://a.com/x.png\n\n   \nhttps://b.com/y.jpg, https://c.com/z\n";
        assert_eq!(
            parse_url_list(text),
            vec![
                "https://a.com/x.png".to_string(),
                "https://b.com/y.jpg".to_string(),
                "https://c.com/z".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_url_list_empty() {
        assert!(parse_url_list("").is_empty());
        assert!(parse_url_list(" , ,\n").is_empty());
    }

    #[test]
    fn test_url_source_select() {
        assert_eq!(
            UrlSource::select(vec!["u".to_string()], Some(PathBuf::from("list.txt"))),
            UrlSource::Args(vec!["u".to_string()])
        );
        assert_eq!(
            UrlSource::select(Vec::new(), Some(PathBuf::from("list.txt"))),
            UrlSource::File(PathBuf::from("list.txt"))
        );
        assert_eq!(UrlSource::select(Vec::new(), None), UrlSource::Prompt);
    }

    #[test]
    fn test_url_source_args_trimmed() {
        let urls = UrlSource::Args(vec![
            "  https://a.com/x.png ".to_string(),
            "".to_string(),
            "   ".to_string(),
        ])
        .collect()
        .unwrap();
        assert_eq!(urls, vec!["https://a.com/x.png".to_string()]);
    }

    #[test]
    fn test_url_source_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("urls.txt");
        fs::write(&path, "https://a.com/x.png\nhttps://b.com/y.png\n").unwrap();

        let urls = UrlSource::File(path).collect().unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_url_source_missing_file() {
        let result = UrlSource::File(PathBuf::from("/nonexistent/urls.txt")).collect();
        assert!(result.is_err());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        summary.record(&Outcome::Fetched {
            filename: "a.png".to_string(),
            path: PathBuf::from("dir/a.png"),
        });
        summary.record(&Outcome::SkippedDuplicate {
            filename: "b.png".to_string(),
            existing: "a.png".to_string(),
        });
        summary.record(&Outcome::SkippedNotImage {
            content_type: "text/html".to_string(),
        });
        summary.record(&Outcome::SkippedError(FetchError::Connection(
            "http://x".to_string(),
            "refused".to_string(),
        )));

        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.skipped(), 3);
        assert_eq!(summary.total(), 4);
        assert_eq!(
            summary.render(),
            "Summary:\n   Fetched: 1\n   Skipped: 3 (duplicates: 1, not images: 1, errors: 1)"
        );
    }
}
