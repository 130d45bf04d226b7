/// Crawl phase definitions for the orchestrator state machine
///
/// A run moves strictly forward through these phases:
/// `Idle -> DiscoveringListings -> ScrapingContent -> Done`, with the
/// discovery phase skipped when listing groups are already persisted.
use std::fmt;

/// Represents the current phase of one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Run constructed, nothing fetched yet
    Idle,

    /// Listing strategies are producing content URLs
    DiscoveringListings,

    /// Content URLs are being drained through the batch scheduler
    ScrapingContent,

    /// All work for this run has settled
    Done,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this phase
    ///
    /// `Idle -> ScrapingContent` is the resume shortcut taken when cached
    /// listing groups exist.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::DiscoveringListings)
                | (Self::Idle, Self::ScrapingContent)
                | (Self::DiscoveringListings, Self::ScrapingContent)
                | (Self::ScrapingContent, Self::Done)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DiscoveringListings => "discovering_listings",
            Self::ScrapingContent => "scraping_content",
            Self::Done => "done",
        }
    }

    /// Returns all phases in run order
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::DiscoveringListings,
            Self::ScrapingContent,
            Self::Done,
        ]
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
