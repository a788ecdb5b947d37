use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::fs;

use crate::config::Config;
use crate::fetcher::{DownloadTarget, Fetcher, Outcome};
use crate::page::Presentation;
use crate::progress::ConsoleProgress;
use crate::utils::{resolve_url, sanitize_title};

/// Mirrors one presentation: fetches and rewrites the page, saves every
/// slide that is not already present, then runs the resumable video fetch.
pub async fn run(url: String, config: Config) -> Result<()> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new());

    println!("Downloading HTML file");
    let html = client
        .get(&url)
        .send()
        .await
        .context("Failed to fetch presentation page")?
        .error_for_status()
        .context("Presentation page request was rejected")?
        .text()
        .await
        .context("Failed to read presentation page body")?;

    let presentation = Presentation::parse(&html, &config.cleanup)?;

    let presentation_dir = config.download_dir.join(sanitize_title(&presentation.title));
    let slides_dir = presentation_dir.join("slides");
    fs::create_dir_all(&slides_dir)
        .await
        .context("Failed to create slides directory")?;

    fs::write(presentation_dir.join("index.html"), &presentation.html)
        .await
        .context("Failed to write index.html")?;

    download_slides(&client, &url, &presentation, &slides_dir).await?;

    let video_path = presentation_dir.join(&presentation.video_file);
    let target = DownloadTarget::new(presentation.video_url.clone(), video_path);
    let fetcher = Fetcher::new(&config);
    let mut progress = ConsoleProgress::new("Downloading video");

    let outcome = fetcher
        .ensure_downloaded(&target, |percent| progress.update(percent))
        .await?;
    match outcome {
        Outcome::Skipped => println!("Video file already exists"),
        Outcome::Completed => progress.finish(),
    }

    Ok(())
}

async fn download_slides(
    client: &Client,
    page_url: &str,
    presentation: &Presentation,
    slides_dir: &std::path::Path,
) -> Result<()> {
    let pb = ProgressBar::new(presentation.slides.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("Downloading slides");

    for slide in &presentation.slides {
        let filename = slide.rsplit('/').next().unwrap_or(slide);
        let slide_path = slides_dir.join(filename);
        if slide_path.exists() {
            pb.inc(1);
            continue;
        }

        let slide_url = resolve_url(page_url, slide)?;
        let body = client
            .get(&slide_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch slide {}", slide_url))?
            .error_for_status()
            .with_context(|| format!("Slide request was rejected: {}", slide_url))?
            .bytes()
            .await
            .context("Failed to read slide body")?;
        fs::write(&slide_path, &body)
            .await
            .context("Failed to write slide")?;
        pb.inc(1);
    }

    pb.finish_with_message("Slides complete");
    Ok(())
}
