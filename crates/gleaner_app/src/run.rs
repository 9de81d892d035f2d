use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use engine_logging::{engine_error, engine_info, engine_warn};
use gleaner_core::{domain_tally, filter_candidates, FilterSettings, ProxyAddress, Report};
use gleaner_engine::{
    extract_image_urls, fetch_page, write_report_files, write_text_atomic, FetchSettings,
    ImageStore, Orchestrator, OrchestratorSettings, ReqwestFetcher, RetrySettings,
    ValidationSettings,
};

use crate::cli::Cli;
use crate::options::{load_options, RunOptions};

const DEBUG_PAGE_FILENAME: &str = "page_debug.html";

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let options = match &cli.options {
        Some(path) => load_options(path)?,
        None => RunOptions::default(),
    };

    let proxy = cli
        .proxy
        .as_deref()
        .map(ProxyAddress::parse)
        .transpose()
        .context("invalid --proxy value")?;
    let proxy_label = proxy.as_ref().map(ToString::to_string);
    if let Some(label) = &proxy_label {
        engine_info!("routing through proxy {label}");
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let mut fetch_settings = FetchSettings {
        request_timeout: Duration::from_secs(cli.timeout_secs),
        proxy,
        ..FetchSettings::default()
    };
    if let Some(user_agent) = options.user_agent {
        fetch_settings.user_agent = user_agent;
    }
    let fetcher = ReqwestFetcher::new(fetch_settings).context("failed to build HTTP client")?;

    engine_info!("fetching {}", cli.url);
    let page = match fetch_page(&fetcher, &cli.url).await {
        Ok(page) => page,
        Err(err) => {
            // No page, no candidates: report the empty run and bail out.
            engine_error!("page fetch failed: {err}");
            let report = Report::failed_run(err.to_string());
            write_report_files(
                &cli.output_dir,
                &report,
                &cli.url,
                proxy_label.as_deref(),
                &timestamp,
            )?;
            anyhow::bail!("page fetch failed: {err}");
        }
    };
    engine_info!(
        "page decoded as {} ({} bytes of markup)",
        page.encoding_label,
        page.html.len()
    );
    write_text_atomic(&cli.output_dir, DEBUG_PAGE_FILENAME, &page.html)?;

    let mut filter_settings = FilterSettings::default();
    if let Some(keywords) = options.skip_keywords {
        filter_settings.skip_keywords = keywords;
    }
    if let Some(paths) = options.masquerade_paths {
        filter_settings.masquerade_paths = paths;
    }

    let raw = extract_image_urls(&page.html, &cli.url);
    let candidates = filter_candidates(&raw, &filter_settings);
    engine_info!(
        "{} image links after filtering ({} raw)",
        candidates.len(),
        raw.len()
    );
    for (host, count) in domain_tally(&candidates).into_iter().take(10) {
        engine_info!("  {host}: {count}");
    }

    let mut validation = ValidationSettings {
        min_bytes: cli.min_bytes,
        min_width: cli.min_width,
        min_height: cli.min_height,
        ..ValidationSettings::default()
    };
    if let Some(types) = options.accepted_types {
        validation.accepted_types = types;
    }
    let retry = RetrySettings {
        max_attempts: cli.retries.max(1),
        delay_min: Duration::from_secs_f64(cli.delay_min.max(0.0)),
        delay_max: Duration::from_secs_f64(cli.delay_max.max(0.0)),
        ..RetrySettings::default()
    };
    let orchestration = OrchestratorSettings {
        concurrency: cli.workers.max(1),
        max_images: cli.max_images,
    };

    let store = ImageStore::create(cli.output_dir.clone())?;
    let orchestrator = Orchestrator::new(
        Arc::new(fetcher),
        Arc::new(store),
        validation,
        retry,
        orchestration,
    );

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_warn!("stop requested; in-flight downloads finish their current attempt");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(candidates, &cli.url).await;

    let artifacts = write_report_files(
        &cli.output_dir,
        &report,
        &cli.url,
        proxy_label.as_deref(),
        &timestamp,
    )?;
    engine_info!(
        "stored {}/{} images ({:.1}%)",
        report.stored,
        report.attempted,
        report.success_rate()
    );
    engine_info!("report written to {}", artifacts.report_path.display());

    Ok(())
}
