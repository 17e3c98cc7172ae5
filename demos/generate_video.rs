//! Basic video generation example.
//!
//! Run with: `cargo run --example generate_video`
//!
//! Requires `EVOLINK_API_KEY` environment variable.

use seedance::{EvolinkProvider, Resolution, VideoGenerationRequest, VideoProvider, VideoProviderExt};

#[tokio::main]
async fn main() -> seedance::Result<()> {
    let provider = EvolinkProvider::builder().build()?;

    let request = VideoGenerationRequest::new("Ocean waves crashing on a rocky shore at sunset")
        .with_duration(5)
        .with_resolution(Resolution::P720)
        .with_aspect_ratio("16:9");
    println!("Cost: {} credits", request.cost());

    let task_id = provider.submit(&request).await?;
    println!("Submitted task {task_id}, generating (this may take a few minutes)...");

    let status = provider
        .wait_for_completion(&task_id, provider.poll_interval(), provider.timeout())
        .await?;
    let Some(url) = status.video_url else {
        return Err(seedance::SeedanceError::UnexpectedResponse(
            "completed task has no video URL".into(),
        ));
    };

    let video = provider.download(&url).await?;
    std::fs::write("output.mp4", &video)?;
    println!("Generated video: {} bytes from {url}", video.len());

    Ok(())
}
