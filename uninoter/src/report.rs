//! Report templates and the offline report strategy.
//!
//! [`render_report`] is the fixed template the development backend serves
//! from `generate-summary`; [`TemplateReport`] reuses it on the client when
//! generation fails so the screen still has something to show.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{Contribution, Summary, SummaryOrigin, Topic};
use crate::notify::plural;

/// Contributions quoted in the insights section.
const MAX_INSIGHTS: usize = 3;
/// Characters kept from each quoted contribution.
const EXCERPT_CHARS: usize = 200;

const RECOMMENDATIONS: &str = "## Recommendations

1. **Continue the discussion** - The contributions show diverse perspectives that merit further exploration
2. **Action items** - Consider implementing the practical suggestions mentioned in the contributions
3. **Follow-up** - Schedule regular reviews to track progress on discussed topics

## Conclusion

The collaborative effort has produced valuable insights that can guide future decision-making and strategy development.";

/// First [`EXCERPT_CHARS`] characters of `content`, with `...` if cut.
fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Render the report body for `title` from `contributions` (display order).
pub fn render_report(title: &str, contributions: &[Contribution], now: DateTime<Utc>) -> String {
    let count = contributions.len();
    let mut out = format!(
        "# Summary Report for {title}\n\n\
         This document presents a comprehensive analysis of all contributions submitted for this topic.\n\n\
         ## Key Insights\n\n\
         Based on the {} received, several important themes emerge:\n\n",
        plural(count, "contribution")
    );

    for (i, contribution) in contributions.iter().take(MAX_INSIGHTS).enumerate() {
        let _ = write!(
            out,
            "### Insight {}\n{}\n\n",
            i + 1,
            excerpt(&contribution.content)
        );
    }

    out.push_str(RECOMMENDATIONS);
    let _ = write!(
        out,
        "\n\n*Report generated on {} from {count} contributions*",
        now.format("%B %d, %Y")
    );
    out
}

/// Produces a stand-in report when the service cannot generate one.
pub trait ReportSynthesizer: Send + Sync {
    fn synthesize(
        &self,
        topic: &Topic,
        contributions: &[Contribution],
        now: DateTime<Utc>,
    ) -> Option<Summary>;
}

/// Renders the fixed template, marked as an offline report.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateReport;

impl ReportSynthesizer for TemplateReport {
    fn synthesize(
        &self,
        topic: &Topic,
        contributions: &[Contribution],
        now: DateTime<Utc>,
    ) -> Option<Summary> {
        Some(Summary {
            topic_id: topic.id.clone(),
            content: render_report(&topic.title, contributions, now),
            generated_at: now,
            origin: SummaryOrigin::Offline,
        })
    }
}

/// Offline reports disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOfflineReports;

impl ReportSynthesizer for NoOfflineReports {
    fn synthesize(&self, _: &Topic, _: &[Contribution], _: DateTime<Utc>) -> Option<Summary> {
        None
    }
}
