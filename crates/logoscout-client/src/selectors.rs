use std::sync::Arc;

use logoscout_core::error::AppError;
use logoscout_core::models::{Candidate, LogoSource};
use logoscout_core::traits::Transformer;
use scraper::{Html, Selector};
use url::Url;

/// One extraction strategy: a markup pattern, the attribute carrying the
/// reference, and the tag attached to every candidate it yields.
///
/// Defined at configuration time and shared read-only across tasks.
struct SelectorSpec {
    name: &'static str,
    css: &'static str,
    target_attr: &'static str,
    source: LogoSource,
}

/// The chain, in priority order. With eager mode off, every selector runs and
/// its candidates keep this ordering; with eager mode on, the chain stops at
/// the first selector that yields a match.
const SELECTOR_SPECS: [SelectorSpec; 8] = [
    SelectorSpec {
        name: "og-logo",
        css: r#"meta[property="og:logo"]"#,
        target_attr: "content",
        source: LogoSource::OgLogo,
    },
    SelectorSpec {
        name: "og-image",
        css: r#"meta[property="og:image"]"#,
        target_attr: "content",
        source: LogoSource::OgImage,
    },
    SelectorSpec {
        name: "apple-touch-startup-image",
        css: r#"link[rel="apple-touch-startup-image"]"#,
        target_attr: "href",
        source: LogoSource::AppleTouchStartupImage,
    },
    SelectorSpec {
        name: "shortcut-icon",
        css: r#"link[rel="shortcut icon"]"#,
        target_attr: "href",
        source: LogoSource::ShortcutIcon,
    },
    SelectorSpec {
        name: "apple-touch-icon",
        css: r#"link[rel="apple-touch-icon"]"#,
        target_attr: "href",
        source: LogoSource::AppleTouchIcon,
    },
    SelectorSpec {
        name: "mask-icon",
        css: r#"link[rel="mask-icon"]"#,
        target_attr: "href",
        source: LogoSource::MaskIcon,
    },
    SelectorSpec {
        name: "favicon",
        css: r#"link[rel="icon"]"#,
        target_attr: "href",
        source: LogoSource::Favicon,
    },
    SelectorSpec {
        name: "fluid-icon",
        css: r#"link[rel="fluid-icon"]"#,
        target_attr: "href",
        source: LogoSource::FluidIcon,
    },
];

struct CompiledSelector {
    name: &'static str,
    target_attr: &'static str,
    source: LogoSource,
    matcher: Selector,
}

/// The Transform stage: parses a page body once and walks the selector chain,
/// emitting normalized absolute logo URLs.
#[derive(Clone)]
pub struct LogoTransformer {
    selectors: Arc<Vec<CompiledSelector>>,
    eager: bool,
}

impl LogoTransformer {
    pub fn new() -> Result<Self, AppError> {
        Self::with_eager(false)
    }

    /// `eager` stops the chain at the first selector that yields a candidate.
    pub fn with_eager(eager: bool) -> Result<Self, AppError> {
        let selectors = SELECTOR_SPECS
            .iter()
            .map(|spec| {
                Selector::parse(spec.css)
                    .map(|matcher| CompiledSelector {
                        name: spec.name,
                        target_attr: spec.target_attr,
                        source: spec.source,
                        matcher,
                    })
                    .map_err(|e| {
                        AppError::TransformError(format!("invalid selector {}: {e}", spec.name))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            selectors: Arc::new(selectors),
            eager,
        })
    }

    /// Run the chain over `body`. Candidates appear grouped by selector in
    /// chain priority order, document order within a selector. A selector
    /// that matches nothing contributes nothing and the chain moves on.
    pub fn process(
        &self,
        domain: &str,
        body: &str,
        eager: bool,
    ) -> Result<Vec<Candidate>, AppError> {
        let document = Html::parse_document(body);
        let base = Url::parse(&format!("http://{domain}"))
            .map_err(|e| AppError::TransformError(format!("invalid domain '{domain}': {e}")))?;

        let mut candidates = Vec::new();
        for selector in self.selectors.iter() {
            let mut found = 0usize;
            for element in document.select(&selector.matcher) {
                let Some(raw) = element.value().attr(selector.target_attr) else {
                    continue;
                };
                match normalize_url(&base, raw) {
                    Some(url) => {
                        candidates.push(Candidate::new(selector.source, url));
                        found += 1;
                    }
                    None => {
                        tracing::debug!(
                            %domain,
                            selector = selector.name,
                            value = raw,
                            "Skipping unresolvable reference"
                        );
                    }
                }
            }
            if found == 0 {
                tracing::debug!(%domain, selector = selector.name, "Selector matched nothing");
            }
            if eager && found > 0 {
                break;
            }
        }

        tracing::debug!(%domain, count = candidates.len(), "Found potential logos");
        Ok(candidates)
    }
}

impl Transformer for LogoTransformer {
    fn transform(&self, domain: &str, body: &str) -> Result<Vec<Candidate>, AppError> {
        self.process(domain, body, self.eager)
    }
}

/// Resolve a raw attribute value against `http://{domain}`: relative paths
/// join the base, protocol-relative references adopt the base scheme, and
/// absolute URLs pass through unchanged.
fn normalize_url(base: &Url, raw: &str) -> Option<String> {
    base.join(raw.trim()).ok().map(|u| u.to_string())
}
