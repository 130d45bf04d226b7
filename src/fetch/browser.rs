//! Headless browser fetcher
//!
//! One Chromium process is launched per spider. Every fetch runs in its own
//! browser context so concurrent fetches within a batch never share cookies
//! or storage; the context is disposed once the markup has been captured.

use crate::config::UserAgentConfig;
use crate::fetch::{FetchTimeouts, PageContent, PageFetcher, WaitCondition};
use crate::FetchError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Browser-driven fetcher backed by chromiumoxide
pub struct BrowserFetcher {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    user_agent: String,
    timeouts: FetchTimeouts,
}

impl BrowserFetcher {
    /// Launches a headless Chromium instance
    pub async fn launch(
        config: &UserAgentConfig,
        timeouts: FetchTimeouts,
    ) -> Result<Self, FetchError> {
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(timeouts.request)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Launched headless browser");

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            user_agent: config.header_value(),
            timeouts,
        })
    }

    /// Creates an isolated context and a blank page inside it
    async fn open_isolated_page(&self) -> Result<(BrowserContextId, Page), FetchError> {
        let browser = self.browser.lock().await;

        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| FetchError::Browser(format!("Failed to create context: {}", e)))?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(FetchError::Browser)?;

        match browser.new_page(target).await {
            Ok(page) => Ok((context_id, page)),
            Err(e) => {
                let _ = browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await;
                Err(FetchError::Browser(format!("Failed to open page: {}", e)))
            }
        }
    }

    async fn dispose_context(&self, context_id: BrowserContextId) {
        let browser = self.browser.lock().await;
        if let Err(e) = browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
        {
            tracing::debug!("Failed to dispose browser context: {}", e);
        }
    }

    async fn navigate_and_capture(
        &self,
        page: &Page,
        url: &str,
        wait: &WaitCondition,
    ) -> Result<String, FetchError> {
        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        tokio::time::timeout(self.timeouts.request, page.goto(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        self.wait_for(page, url, wait).await?;

        page.content().await.map_err(|e| FetchError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn wait_for(
        &self,
        page: &Page,
        url: &str,
        wait: &WaitCondition,
    ) -> Result<(), FetchError> {
        let deadline = Instant::now() + self.timeouts.navigation;

        match wait {
            WaitCondition::None => Ok(()),
            WaitCondition::Delay { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            WaitCondition::Selector { selector } => loop {
                if page.find_element(selector.as_str()).await.is_ok() {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                    });
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            },
            WaitCondition::ContentStable { interval_ms } => {
                wait_for_stable_content(page, *interval_ms, deadline, false).await;
                Ok(())
            }
            WaitCondition::ScrollToBottom { interval_ms } => {
                wait_for_stable_content(page, *interval_ms, deadline, true).await;
                Ok(())
            }
        }
    }
}

/// Polls the rendered markup until its length stops growing or the deadline passes
async fn wait_for_stable_content(page: &Page, interval_ms: u64, deadline: Instant, scroll: bool) {
    let interval = Duration::from_millis(interval_ms);
    let mut last_len = 0;

    loop {
        if scroll {
            if let Err(e) = page.evaluate(SCROLL_TO_BOTTOM_SCRIPT).await {
                tracing::debug!("Scroll failed: {}", e);
            }
        }

        tokio::time::sleep(interval).await;

        let len = page.content().await.map(|html| html.len()).unwrap_or(last_len);
        if len <= last_len || Instant::now() >= deadline {
            return;
        }
        last_len = len;
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, wait: &WaitCondition) -> Result<PageContent, FetchError> {
        let (context_id, page) = self.open_isolated_page().await?;

        let result = self.navigate_and_capture(&page, url, wait).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {}", url, e);
        }
        self.dispose_context(context_id).await;

        result.map(|html| PageContent {
            url: url.to_string(),
            html,
        })
    }

    async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        self.handler.abort();
    }
}
