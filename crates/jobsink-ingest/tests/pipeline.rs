//! End-to-end pipeline tests: wiremock feeds, in-memory stores, real queue
//! and worker pool.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobsink_core::{JobProcessor, JobStore, RunStatus, RunStore};
use jobsink_feeds::FeedClient;
use jobsink_ingest::{ImportPipeline, MemoryJobStore, MemoryRunStore, Processor};
use jobsink_queue::{JobQueue, QueueConfig, WorkerPool};

const RSS_TWO_ITEMS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Acme Careers</title>
    <item>
      <title>Backend Engineer</title>
      <company>Acme</company>
      <link>https://jobs.acme.test/1</link>
      <guid>acme-1</guid>
      <description>Build services.</description>
      <pubDate>Mon, 06 Jul 2026 09:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Data Engineer</title>
      <company>Acme</company>
      <link>https://jobs.acme.test/2</link>
      <guid>acme-2</guid>
      <description>Move data.</description>
    </item>
  </channel>
</rss>"#;

const ATOM_ONE_ENTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Platform Engineer</title>
    <company>Beta Corp</company>
    <url>https://jobs.beta.test/77</url>
    <id>beta-77</id>
    <published>2026-07-01T08:00:00Z</published>
  </entry>
</feed>"#;

struct Harness {
    pipeline: ImportPipeline,
    queue: Arc<JobQueue>,
    pool: WorkerPool,
    job_store: Arc<MemoryJobStore>,
    run_store: Arc<MemoryRunStore>,
}

fn harness() -> Harness {
    let job_store = Arc::new(MemoryJobStore::default());
    let run_store = Arc::new(MemoryRunStore::default());
    let processor = Arc::new(Processor::new(
        Arc::clone(&job_store) as Arc<dyn JobStore>
    ));
    let queue = Arc::new(JobQueue::new(QueueConfig {
        concurrency: 3,
        backoff_base_secs: 0,
        poll_interval_ms: 10,
        ..QueueConfig::default()
    }));
    let pool = WorkerPool::start(
        Arc::clone(&queue),
        Arc::clone(&processor) as Arc<dyn JobProcessor>,
        Arc::clone(&run_store) as Arc<dyn RunStore>,
    );
    let client = FeedClient::new(5, "jobsink-test/0.1").expect("build feed client");
    let pipeline = ImportPipeline::new(
        client,
        Arc::clone(&queue),
        Arc::clone(&run_store) as Arc<dyn RunStore>,
        processor,
    );
    Harness {
        pipeline,
        queue,
        pool,
        job_store,
        run_store,
    }
}

#[tokio::test]
async fn full_sweep_queues_processes_and_accounts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_TWO_ITEMS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/atom.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ATOM_ONE_ENTRY))
        .mount(&server)
        .await;

    let h = harness();
    let urls = vec![
        format!("{}/rss.xml", server.uri()),
        format!("{}/atom.xml", server.uri()),
    ];
    let summary = h
        .pipeline
        .run_import(&urls, "test sweep")
        .await
        .expect("run import");
    assert_eq!(summary.total_jobs, 3);

    h.queue.wait_until_idle().await;
    h.pool.shutdown(&h.queue, Duration::from_secs(5)).await;

    assert_eq!(h.job_store.len().await, 3);

    let run = h.run_store.get(summary.run_id).await.expect("run exists");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.total_fetched, 3);
    assert_eq!(run.new_jobs, 3);
    assert_eq!(run.updated_jobs, 0);
    assert_eq!(run.failed_jobs, 0);
    assert!(run.failed_reasons.is_empty());
    assert!(run.duration_ms.is_some());
}

#[tokio::test]
async fn second_sweep_updates_instead_of_duplicating() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_TWO_ITEMS))
        .mount(&server)
        .await;

    let h = harness();
    let urls = vec![format!("{}/rss.xml", server.uri())];

    let first = h
        .pipeline
        .run_import(&urls, "sweep 1")
        .await
        .expect("first run");
    h.queue.wait_until_idle().await;

    let second = h
        .pipeline
        .run_import(&urls, "sweep 2")
        .await
        .expect("second run");
    h.queue.wait_until_idle().await;
    h.pool.shutdown(&h.queue, Duration::from_secs(5)).await;

    assert_eq!(h.job_store.len().await, 2, "no duplicate records");

    let run1 = h.run_store.get(first.run_id).await.expect("run 1");
    assert_eq!(run1.new_jobs, 2);
    let run2 = h.run_store.get(second.run_id).await.expect("run 2");
    assert_eq!(run2.new_jobs, 0);
    assert_eq!(run2.updated_jobs, 2);
}

#[tokio::test]
async fn sweep_with_only_fetch_errors_is_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down.xml"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let h = harness();
    let urls = vec![format!("{}/down.xml", server.uri())];
    let summary = h
        .pipeline
        .run_import(&urls, "dead feed")
        .await
        .expect("run completes despite fetch failure");
    h.pool.shutdown(&h.queue, Duration::from_secs(5)).await;

    assert_eq!(summary.total_jobs, 0);
    let run = h.run_store.get(summary.run_id).await.expect("run exists");
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.total_fetched, 0);
    assert_eq!(run.failed_reasons.len(), 1);
    assert!(run.failed_reasons[0].contains("502"));
}

#[tokio::test]
async fn sweep_with_empty_feed_and_no_errors_is_completed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<rss version=\"2.0\"><channel></channel></rss>"),
        )
        .mount(&server)
        .await;

    let h = harness();
    let urls = vec![format!("{}/empty.xml", server.uri())];
    let summary = h
        .pipeline
        .run_import(&urls, "empty feed")
        .await
        .expect("run import");
    h.pool.shutdown(&h.queue, Duration::from_secs(5)).await;

    let run = h.run_store.get(summary.run_id).await.expect("run exists");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.total_fetched, 0);
    assert!(run.failed_reasons.is_empty());
}

#[tokio::test]
async fn one_bad_feed_does_not_block_the_good_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_TWO_ITEMS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let h = harness();
    let urls = vec![
        format!("{}/rss.xml", server.uri()),
        format!("{}/down.xml", server.uri()),
    ];
    let summary = h
        .pipeline
        .run_import(&urls, "mixed sweep")
        .await
        .expect("run import");

    h.queue.wait_until_idle().await;
    h.pool.shutdown(&h.queue, Duration::from_secs(5)).await;

    let run = h.run_store.get(summary.run_id).await.expect("run exists");
    // Jobs were fetched, so the sweep completed with the error recorded.
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.total_fetched, 2);
    assert_eq!(run.failed_reasons.len(), 1);
    assert_eq!(h.job_store.len().await, 2);
}

#[tokio::test]
async fn sync_sweep_records_exact_counts_without_queueing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_TWO_ITEMS))
        .mount(&server)
        .await;

    let h = harness();
    let urls = vec![format!("{}/rss.xml", server.uri())];
    let summary = h
        .pipeline
        .run_import_sync(&urls, "sync sweep", 4)
        .await
        .expect("sync run");
    h.pool.shutdown(&h.queue, Duration::from_secs(5)).await;

    assert_eq!(summary.total_jobs, 2);
    assert_eq!(h.job_store.len().await, 2);
    assert_eq!(h.queue.completed().await.len(), 0, "nothing went through the queue");

    let run = h.run_store.get(summary.run_id).await.expect("run exists");
    assert_eq!(run.new_jobs, 2);
    assert_eq!(run.failed_jobs, 0);
}

#[tokio::test]
async fn aggregate_stats_reflect_completed_and_failed_sweeps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_TWO_ITEMS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let h = harness();
    let good = vec![format!("{}/rss.xml", server.uri())];
    let bad = vec![format!("{}/down.xml", server.uri())];

    for _ in 0..3 {
        h.pipeline.run_import(&good, "good").await.expect("good run");
        h.queue.wait_until_idle().await;
    }
    h.pipeline.run_import(&bad, "bad").await.expect("bad run");
    h.pool.shutdown(&h.queue, Duration::from_secs(5)).await;

    let stats = h.run_store.aggregate_stats().await.expect("stats");
    assert_eq!(stats.total_runs, 4);
    assert_eq!(stats.success_rate_pct, 75.0);
    assert!(stats.most_recent.is_some());
}
