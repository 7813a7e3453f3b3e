// Collector module - the extraction core.
// A collection walk populates the virtualized list, parses cards through
// per-field fallback cascades, deduplicates, paginates, and optionally opens
// each record's detail panel. The runner wraps a walk in the service-side job
// lifecycle.

pub mod card;
pub mod cascade;
pub mod detail;
pub mod populate;
pub mod progress;
pub mod runner;
pub mod walker;
