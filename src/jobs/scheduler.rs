use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::Result;

use super::DigestPipeline;

fn digest_job(cron: &str, pipeline: Arc<DigestPipeline>) -> Result<Job> {
    let job = Job::new_async(cron, move |_uuid, _scheduler| {
        let pipeline = Arc::clone(&pipeline);
        Box::pin(async move {
            match pipeline.run().await {
                Ok(outcome) => {
                    tracing::info!(success = outcome.success, "daily-news: {}", outcome.message)
                }
                Err(e) => tracing::error!("daily-news: run failed: {e}"),
            }
        })
    })?;
    Ok(job)
}

/// Register the digest on `cron` (six fields, UTC) and start ticking. The
/// caller owns the returned scheduler and shuts it down.
pub async fn start_digest_schedule(cron: &str, pipeline: Arc<DigestPipeline>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    scheduler.add(digest_job(cron, pipeline)?).await?;
    scheduler.start().await?;
    tracing::info!(%cron, "daily-news: scheduled");
    Ok(scheduler)
}
