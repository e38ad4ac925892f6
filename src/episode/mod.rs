mod download;
mod filename;

pub use download::{DownloadContext, Downloader, RetryPolicy};
pub use filename::{TemplateContext, format_filename, render_template, sanitize_path_component};
