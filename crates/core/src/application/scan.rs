// Scan iteration control and the paged index cursor

use crate::domain::keys;
use crate::error::Result;
use crate::port::{KeyValueStore, KvEntry, Namespace};

/// Decision returned by a scan callback for each visited job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Keep going with the next entry
    Continue,
    /// End the scan after the current entry
    Stop,
}

/// Summary of a finished scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Number of jobs handed to the callback
    pub visited: usize,
    /// True when the callback ended the scan
    pub stopped: bool,
}

/// Ascending cursor over one namespace, read page by page
///
/// Each page is a fresh `scan` starting at the successor of the last key
/// seen. The cursor is consumed by iteration and cannot be rewound.
pub(crate) struct IndexCursor<'a> {
    kv: &'a dyn KeyValueStore,
    ns: Namespace,
    page_size: usize,
    next_from: Option<Vec<u8>>,
    page: std::vec::IntoIter<KvEntry>,
}

impl<'a> IndexCursor<'a> {
    pub(crate) fn new(
        kv: &'a dyn KeyValueStore,
        ns: Namespace,
        from: Vec<u8>,
        page_size: usize,
    ) -> Self {
        Self {
            kv,
            ns,
            page_size,
            next_from: Some(from),
            page: Vec::new().into_iter(),
        }
    }

    pub(crate) async fn next_entry(&mut self) -> Result<Option<KvEntry>> {
        loop {
            if let Some(entry) = self.page.next() {
                return Ok(Some(entry));
            }

            let Some(from) = self.next_from.take() else {
                return Ok(None);
            };

            let page = self.kv.scan(self.ns, &from, self.page_size).await?;
            if page.len() >= self.page_size {
                self.next_from = page.last().map(|last| keys::successor(&last.key));
            }
            if page.is_empty() {
                return Ok(None);
            }
            self.page = page.into_iter();
        }
    }
}
