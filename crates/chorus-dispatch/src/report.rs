use serde::Serialize;
use uuid::Uuid;

use chorus_llm::ProviderSpec;
use chorus_types::{FailureKind, ProviderResult};

/// One provider's slot in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub spec: ProviderSpec,
    /// Display label from the catalog, or the spec itself when unresolved.
    pub label: String,
    /// Wire model string, `None` when the spec never resolved.
    pub model: Option<String>,
    pub result: ProviderResult,
}

/// Ordered outcome of one dispatch: one entry per distinct requested
/// provider, in the caller's selection order.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    /// Correlates log lines of one dispatch. Not part of result content.
    pub id: Uuid,
    pub entries: Vec<ReportEntry>,
}

impl DispatchReport {
    pub(crate) fn new(id: Uuid, entries: Vec<ReportEntry>) -> Self {
        Self { id, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReportEntry> {
        self.entries.iter()
    }

    pub fn get(&self, spec: &ProviderSpec) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| &e.spec == spec)
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ReportEntry, FailureKind)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.failure_kind().map(|k| (e, k)))
    }
}

impl<'a> IntoIterator for &'a DispatchReport {
    type Item = &'a ReportEntry;
    type IntoIter = std::slice::Iter<'a, ReportEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
