use crate::browser::{Locator, Scope, Selector};

/// Ordered fallback chain for one logical field.
///
/// Candidates are tried most specific first. A candidate that matches nothing,
/// renders blank, or fails to resolve is simply not applicable; the cascade
/// moves on and only reports absence once every candidate has been tried.
#[derive(Debug, Clone, Copy)]
pub struct Cascade<'a> {
    candidates: &'a [Selector],
    strip_prefix: Option<&'a str>,
    reject: Option<&'a str>,
}

impl<'a> Cascade<'a> {
    pub const fn new(candidates: &'a [Selector]) -> Self {
        Self {
            candidates,
            strip_prefix: None,
            reject: None,
        }
    }

    /// Drop a leading header phrase (e.g. a panel heading) from the value.
    pub const fn strip_prefix(mut self, prefix: &'a str) -> Self {
        self.strip_prefix = Some(prefix);
        self
    }

    /// Treat a value equal to `marker` (ignoring case) as a miss.
    pub const fn reject(mut self, marker: &'a str) -> Self {
        self.reject = Some(marker);
        self
    }

    /// First non-empty, cleaned text among the candidates, if any.
    pub async fn extract<S: Scope>(&self, scope: &S) -> Option<String> {
        for candidate in self.candidates {
            let element = scope.locate(candidate).first();
            match element.count().await {
                Ok(0) => continue,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Candidate {candidate} not applicable: {e}");
                    continue;
                }
            }

            let text = match element.inner_text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("Could not read {candidate}: {e}");
                    continue;
                }
            };

            if let Some(value) = self.clean(&text) {
                return Some(value);
            }
        }
        None
    }

    fn clean(&self, text: &str) -> Option<String> {
        let mut value = text.trim();
        if let Some(prefix) = self.strip_prefix
            && let Some(rest) = value.strip_prefix(prefix)
        {
            value = rest.trim_start();
        }
        if value.is_empty() {
            return None;
        }
        if let Some(marker) = self.reject
            && value.eq_ignore_ascii_case(marker)
        {
            return None;
        }
        Some(value.to_string())
    }
}

/// Convenience for the common case: plain cascade, no cleaning rules.
pub async fn first_text<S: Scope>(scope: &S, candidates: &[Selector]) -> Option<String> {
    Cascade::new(candidates).extract(scope).await
}

/// First candidate that currently matches at least one element.
pub async fn first_present<S: Scope>(scope: &S, candidates: &[Selector]) -> Option<S::Locator> {
    for candidate in candidates {
        let element = scope.locate(candidate).first();
        match element.count().await {
            Ok(n) if n > 0 => return Some(element),
            Ok(_) => {}
            Err(e) => tracing::debug!("Candidate {candidate} not applicable: {e}"),
        }
    }
    None
}
