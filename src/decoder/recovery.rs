//! Best-effort fragment recovery for payloads that failed strict parsing.
//!
//! This is a tokenizer for the two tag shapes seen in real payloads,
//! `<tag ...>...</tag>` and `<tag .../>`, not a general recovery engine.
//! Openers and closers are paired in document order, so the same tag must not
//! nest inside itself. When the counts disagree nothing is returned rather than
//! guessing an alignment.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use tracing::{debug, warn};

/// Compiled opener and closer patterns for one tag name.
#[derive(Clone)]
struct TagPatterns {
    open: Regex,
    close: Regex,
}

impl TagPatterns {
    fn compile(tag: &str) -> Option<Self> {
        let escaped = regex::escape(tag);
        Some(Self {
            open: Regex::new(&format!(r"<{escaped}[\s/>]")).ok()?,
            close: Regex::new(&format!(r"</{escaped}\s*>")).ok()?,
        })
    }

    /// Patterns for `tag`, compiled on first use.
    fn for_tag(tag: &str) -> Option<Self> {
        static CACHE: OnceLock<Mutex<HashMap<String, TagPatterns>>> = OnceLock::new();
        let mut cache = CACHE
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(patterns) = cache.get(tag) {
            return Some(patterns.clone());
        }
        let patterns = Self::compile(tag)?;
        cache.insert(tag.to_string(), patterns.clone());
        Some(patterns)
    }
}

/// Cut `document` into one span per `tag` element.
///
/// Returns `None` when no opener is present, when the opener and closer
/// counts differ, or when a closer appears before its opener.
pub(crate) fn fragments<'a>(document: &'a str, tag: &str) -> Option<Vec<&'a str>> {
    let TagPatterns { open, close } = TagPatterns::for_tag(tag)?;

    let openers: Vec<Opener> = open
        .find_iter(document)
        .map(|m| Opener::scan(document, m.start()))
        .collect();
    let closers: Vec<(usize, usize)> = close.find_iter(document).map(|m| (m.start(), m.end())).collect();

    let self_closed = openers.iter().filter(|o| o.self_closing_end.is_some()).count();
    let closer_count = closers.len() + self_closed;

    if openers.is_empty() || openers.len() != closer_count {
        warn!(
            tag,
            openers = openers.len(),
            closers = closer_count,
            "Cannot recover <{}> fragments: opener/closer counts do not match",
            tag
        );
        return None;
    }

    let mut spans = Vec::with_capacity(openers.len());
    let mut pending = closers.into_iter();
    for opener in openers {
        if let Some(end) = opener.self_closing_end {
            spans.push(&document[opener.start..end]);
            continue;
        }
        let (close_start, close_end) = pending.next()?;
        if close_start < opener.start {
            warn!(tag, "Cannot recover <{}> fragments: closer precedes its opener", tag);
            return None;
        }
        spans.push(&document[opener.start..close_end]);
    }

    debug!(tag, count = spans.len(), "Recovered fragments");
    Some(spans)
}

struct Opener {
    start: usize,
    /// End offset of the opener when it is self-closing (`<tag .../>`).
    self_closing_end: Option<usize>,
}

impl Opener {
    fn scan(document: &str, start: usize) -> Self {
        let self_closing_end = document[start..]
            .find('>')
            .filter(|&gt| gt > 0 && document[start..start + gt].ends_with('/'))
            .map(|gt| start + gt + 1);
        Self {
            start,
            self_closing_end,
        }
    }
}
